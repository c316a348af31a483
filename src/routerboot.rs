//! RouterBOOT hard/soft config discovery on the boot flash.
//!
//! RouterBOOT keeps its configuration in erase-block sized blocks near the start of
//! the SPI NOR, each starting with a magic word. The hard config is a list of tags:
//! a 32-bit node word holding the tag id in its low half and the payload length in
//! its high half, followed by the payload padded to 4 bytes. Words are big-endian,
//! as written by the MIPS bootloader.

use embedded_storage::nor_flash::ReadNorFlash;

use crate::board::InfoRegion;
use crate::mac::{MacAddress, ETH_ALEN};
use crate::model::*;
use crate::setup::InfoSource;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InfoError {
    /// Region size is zero or not a whole number of config blocks.
    InvalidRegion,
    Flash,
    NoHardConfig,
    NoSoftConfig,
    BadMagic,
}

fn get_u32(buf: &[u8]) -> Option<u32> {
    Some(u32::from_be_bytes(buf.get(..4)?.try_into().ok()?))
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Tag<'a> {
    pub id: u16,
    pub data: &'a [u8],
}

/// Iterator over the tags of a config block, stopping at the terminator or at the
/// first node whose payload runs past the block.
#[derive(Clone)]
pub struct Tags<'a> {
    buf: &'a [u8],
}

impl<'a> Iterator for Tags<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Tag<'a>> {
        let node = get_u32(self.buf)?;
        let id = node as u16;
        let len = (node >> 16) as usize;
        if id == TAG_TERMINATOR {
            self.buf = &[];
            return None;
        }

        let rest = &self.buf[4..];
        let Some(data) = rest.get(..len) else {
            trace!("tag {:#x}: length {} past end of block", id, len);
            self.buf = &[];
            return None;
        };

        let padded = (len + 3) & !3;
        self.buf = rest.get(padded..).unwrap_or(&[]);
        Some(Tag { id, data })
    }
}

/// A hard config block, magic already checked.
#[derive(Copy, Clone)]
pub struct HardConfig<'a> {
    block: &'a [u8],
}

impl<'a> HardConfig<'a> {
    pub fn new(block: &'a [u8]) -> Result<Self, InfoError> {
        if get_u32(block) != Some(MAGIC_HARD) {
            info!("hard_config: bad magic");
            return Err(InfoError::BadMagic);
        }
        Ok(Self { block })
    }

    pub fn tags(&self) -> Tags<'a> {
        Tags { buf: &self.block[4..] }
    }

    pub fn find(&self, id: u16) -> Option<&'a [u8]> {
        self.tags().find(|t| t.id == id).map(|t| t.data)
    }

    pub fn board_name(&self) -> Option<BoardName> {
        BoardName::from_tag(self.find(TAG_BOARD_NAME)?)
    }

    /// Missing or short options tag reads as no options at all.
    pub fn hw_options(&self) -> HwOptions {
        HwOptions(self.find(TAG_HW_OPTIONS).and_then(get_u32).unwrap_or(0))
    }

    pub fn mac_base(&self) -> Option<MacAddress> {
        let data = self.find(TAG_MAC_ADDRESS_PACK)?;
        let octets: [u8; ETH_ALEN] = data.get(..ETH_ALEN)?.try_into().ok()?;
        Some(MacAddress::new(octets))
    }

    pub fn mac_count(&self) -> Option<u32> {
        self.find(TAG_MAC_ADDRESS_COUNT).and_then(get_u32)
    }

    /// Raw (compressed) radio calibration payload.
    pub fn wlan_data(&self) -> Option<&'a [u8]> {
        self.find(TAG_WLAN_DATA)
    }
}

/// Reads the RouterBOOT configuration off the boot flash.
///
/// The hard config block is copied into `hard_cfg`, which stays available through
/// [`RouterbootReader::hard_config`] after a successful read.
pub struct RouterbootReader<'b, F> {
    flash: F,
    hard_cfg: &'b mut [u8; BLOCK_SIZE as usize],
    loaded: bool,
}

impl<'b, F: ReadNorFlash> RouterbootReader<'b, F> {
    pub fn new(flash: F, hard_cfg: &'b mut [u8; BLOCK_SIZE as usize]) -> Self {
        Self {
            flash,
            hard_cfg,
            loaded: false,
        }
    }

    pub fn hard_config(&self) -> Option<HardConfig<'_>> {
        if !self.loaded {
            return None;
        }
        HardConfig::new(&self.hard_cfg[..]).ok()
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    /// Reads the magic word of the block at `offset`, in the driver's read granularity.
    fn read_magic(&mut self, offset: u32) -> Result<u32, InfoError> {
        let chunk = F::READ_SIZE.max(4);
        let head = &mut self.hard_cfg[..chunk];
        self.flash.read(offset, head).map_err(|_| InfoError::Flash)?;
        get_u32(head).ok_or(InfoError::Flash)
    }

    pub fn read(&mut self, region: InfoRegion) -> Result<HardwareInfo, InfoError> {
        if region.size == 0 || region.size % BLOCK_SIZE != 0 {
            return Err(InfoError::InvalidRegion);
        }
        let end = region.offset.checked_add(region.size).ok_or(InfoError::InvalidRegion)?;
        if end as usize > self.flash.capacity() {
            return Err(InfoError::InvalidRegion);
        }
        // Reads are block aligned, so blocks must split evenly into read units.
        if F::READ_SIZE == 0 || BLOCK_SIZE as usize % F::READ_SIZE != 0 {
            return Err(InfoError::Flash);
        }

        self.loaded = false;
        let mut hard_cfg_found = 0;
        let mut soft_cfg_found = 0;
        for offset in (0..region.size).step_by(BLOCK_SIZE as usize) {
            match self.read_magic(region.offset + offset)? {
                MAGIC_HARD => hard_cfg_found = offset,
                MAGIC_SOFT => soft_cfg_found = offset,
                _ => {}
            }
        }

        // The first block of the region is RouterBOOT itself, so it doubles as "not found".
        if hard_cfg_found == 0 {
            error!("could not find a valid RouterBOOT hard config");
            return Err(InfoError::NoHardConfig);
        }
        if soft_cfg_found == 0 {
            error!("could not find a valid RouterBOOT soft config");
            return Err(InfoError::NoSoftConfig);
        }
        // Partitions are laid out in device offsets.
        let hard_cfg_offset = region.offset + hard_cfg_found;
        let soft_cfg_offset = region.offset + soft_cfg_found;

        self.flash
            .read(hard_cfg_offset, &mut self.hard_cfg[..])
            .map_err(|_| InfoError::Flash)?;
        self.loaded = true;

        let hard_cfg = HardConfig::new(&self.hard_cfg[..])?;
        let info = HardwareInfo {
            board_name: hard_cfg.board_name(),
            hw_options: hard_cfg.hw_options(),
            hard_cfg_offset,
            hard_cfg_size: BLOCK_SIZE,
            soft_cfg_offset,
        };
        info!(
            "routerboot: hard_config {:#x} soft_config {:#x} options {:#x}",
            info.hard_cfg_offset,
            info.soft_cfg_offset,
            info.hw_options.0
        );

        Ok(info)
    }
}

impl<'b, F: ReadNorFlash> InfoSource for RouterbootReader<'b, F> {
    fn read_info(&mut self, region: InfoRegion) -> Result<HardwareInfo, InfoError> {
        self.read(region)
    }
}
