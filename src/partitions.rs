use crate::model::HardwareInfo;

pub const BIOS_SIZE: u32 = 0x1000;
pub const SOFT_CFG_SIZE: u32 = 0x1000;

pub const PARTITION_COUNT: usize = 6;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LayoutError {
    /// The hard config sits at the start of flash, leaving no room for RouterBOOT.
    EmptyBootloader,
    EmptyHardConfig,
    /// The soft config starts before the bios partition ends.
    BooterUnderflow,
    Overflow,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    Bootloader,
    HardConfig,
    Bios,
    Booter,
    SoftConfig,
    Firmware,
}

impl Role {
    pub const ALL: [Role; PARTITION_COUNT] = [
        Role::Bootloader,
        Role::HardConfig,
        Role::Bios,
        Role::Booter,
        Role::SoftConfig,
        Role::Firmware,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Role::Bootloader => "routerboot",
            Role::HardConfig => "hard_config",
            Role::Bios => "bios",
            Role::Booter => "booter",
            Role::SoftConfig => "soft_config",
            Role::Firmware => "firmware",
        }
    }

    /// Everything RouterBOOT owns is masked writeable; only its soft config and the firmware are ours.
    pub const fn read_only(&self) -> bool {
        !matches!(self, Role::SoftConfig | Role::Firmware)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Size {
    Bytes(u32),
    /// Up to the end of the flash device, resolved when the partitions are registered.
    Remainder,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Partition {
    pub role: Role,
    pub offset: u32,
    pub size: Size,
}

impl Partition {
    pub const fn name(&self) -> &'static str {
        self.role.name()
    }

    pub const fn read_only(&self) -> bool {
        self.role.read_only()
    }

    /// Exclusive end offset, `None` for the remainder partition.
    pub const fn end(&self) -> Option<u32> {
        match self.size {
            Size::Bytes(size) => self.offset.checked_add(size),
            Size::Remainder => None,
        }
    }

    /// Size in bytes on a device of `device_size` bytes, `None` if the partition does not fit.
    pub fn resolved_size(&self, device_size: u32) -> Option<u32> {
        match self.size {
            Size::Bytes(size) => match self.offset.checked_add(size) {
                Some(end) if end <= device_size => Some(size),
                _ => None,
            },
            Size::Remainder => device_size.checked_sub(self.offset),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PartitionTable([Partition; PARTITION_COUNT]);

impl PartitionTable {
    pub fn as_slice(&self) -> &[Partition] {
        &self.0
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Partition> {
        self.0.iter()
    }

    pub fn get(&self, role: Role) -> &Partition {
        &self.0[role as usize]
    }
}

impl<'a> IntoIterator for &'a PartitionTable {
    type Item = &'a Partition;
    type IntoIter = core::slice::Iter<'a, Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Lays out the SPI NOR from the offsets RouterBOOT reported.
///
/// RouterBOOT fills everything in front of its hard config. The bios block follows
/// the hard config, the booter gets whatever is left up to the soft config, and the
/// firmware runs from the end of the soft config to the end of the device.
pub fn build(info: &HardwareInfo) -> Result<PartitionTable, LayoutError> {
    if info.hard_cfg_offset == 0 {
        return Err(LayoutError::EmptyBootloader);
    }
    if info.hard_cfg_size == 0 {
        return Err(LayoutError::EmptyHardConfig);
    }

    let bios_offset = end_of(info.hard_cfg_offset, info.hard_cfg_size)?;
    let booter_offset = end_of(bios_offset, BIOS_SIZE)?;
    let booter_size = info
        .soft_cfg_offset
        .checked_sub(booter_offset)
        .ok_or(LayoutError::BooterUnderflow)?;
    let firmware_offset = end_of(info.soft_cfg_offset, SOFT_CFG_SIZE)?;

    #[rustfmt::skip]
    let table = PartitionTable([
        Partition { role: Role::Bootloader, offset: 0,                    size: Size::Bytes(info.hard_cfg_offset) },
        Partition { role: Role::HardConfig, offset: info.hard_cfg_offset, size: Size::Bytes(info.hard_cfg_size) },
        Partition { role: Role::Bios,       offset: bios_offset,          size: Size::Bytes(BIOS_SIZE) },
        Partition { role: Role::Booter,     offset: booter_offset,        size: Size::Bytes(booter_size) },
        Partition { role: Role::SoftConfig, offset: info.soft_cfg_offset, size: Size::Bytes(SOFT_CFG_SIZE) },
        Partition { role: Role::Firmware,   offset: firmware_offset,      size: Size::Remainder },
    ]);

    for p in &table {
        debug!("partition {} at {:#x} {:?}", p.name(), p.offset, p.size);
    }

    Ok(table)
}

fn end_of(offset: u32, size: u32) -> Result<u32, LayoutError> {
    offset.checked_add(size).ok_or(LayoutError::Overflow)
}
