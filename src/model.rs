use core::str;

pub const MAGIC_HARD: u32 = 0x64726148; // "Hard"
pub const MAGIC_SOFT: u32 = 0x74666f53; // "Soft"

/// RouterBOOT config blocks are aligned to, and exactly as large as, one erase block.
pub const BLOCK_SIZE: u32 = 0x1000;

pub const TAG_TERMINATOR: u16 = 0x00;
pub const TAG_MAC_ADDRESS_PACK: u16 = 0x04;
pub const TAG_BOARD_NAME: u16 = 0x05;
pub const TAG_MAC_ADDRESS_COUNT: u16 = 0x0e;
pub const TAG_HW_OPTIONS: u16 = 0x15;
pub const TAG_WLAN_DATA: u16 = 0x16;

pub const BOARD_NAME_MAX: usize = 32;

/// Hardware option bits from the hard config.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwOptions(pub u32);

impl HwOptions {
    pub const NO_UART: u32 = 1 << 0;
    pub const HAS_GPS: u32 = 1 << 1;
    pub const NO_NAND: u32 = 1 << 14;
    pub const HAS_LCD: u32 = 1 << 15;
    pub const HAS_POE_OUT: u32 = 1 << 16;
    pub const HAS_USD: u32 = 1 << 17;
    pub const HAS_SIM: u32 = 1 << 18;
    pub const HAS_SFP: u32 = 1 << 20;
    pub const HAS_WIFI: u32 = 1 << 21;
    pub const HAS_TS_FOR_ADC: u32 = 1 << 22;
    pub const HAS_PLC: u32 = 1 << 29;

    pub const fn contains(&self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    /// Boards without NAND keep everything, firmware included, on the SPI NOR.
    pub const fn nor_only(&self) -> bool {
        self.contains(Self::NO_NAND)
    }
}

/// Board name copied out of the hard config, so that `HardwareInfo` stays `Copy`.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct BoardName {
    bytes: [u8; BOARD_NAME_MAX],
    len: u8,
}

impl BoardName {
    /// Takes the text up to the first NUL. Names that are not UTF-8 are rejected;
    /// overlong names are cut at the last char boundary that fits.
    pub fn from_tag(data: &[u8]) -> Option<Self> {
        let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
        let text = str::from_utf8(&data[..end]).ok()?;
        Some(Self::new(text))
    }

    pub fn new(text: &str) -> Self {
        let mut len = text.len().min(BOARD_NAME_MAX);
        while !text.is_char_boundary(len) {
            len -= 1;
        }

        let mut bytes = [0; BOARD_NAME_MAX];
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        // Only ever filled from a `&str` cut at a char boundary.
        str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl core::fmt::Debug for BoardName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self.as_str(), f)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BoardName {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// What the bootloader tells us about the board and its flash layout.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HardwareInfo {
    pub board_name: Option<BoardName>,
    pub hw_options: HwOptions,
    pub hard_cfg_offset: u32,
    pub hard_cfg_size: u32,
    pub soft_cfg_offset: u32,
}

impl HardwareInfo {
    pub fn board_name(&self) -> Option<&str> {
        self.board_name.as_ref().map(BoardName::as_str)
    }
}
