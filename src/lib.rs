//! Board bring-up for the MikroTik RouterBOARD 911 Lite2/Lite5.
//!
//! The SPI flash layout is derived from the RouterBOOT hard/soft config
//! positions, interface MACs from the bootloader's base address, and the radio
//! EEPROM from the staged ART blob. Everything is handed to a [`setup::Registrar`].
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod board;
pub mod calibration;
pub mod devices;
pub mod mac;
pub mod model;
pub mod partitions;
pub mod routerboot;
pub mod setup;

pub use board::BoardConfig;
pub use mac::MacAddress;
pub use model::HardwareInfo;
pub use partitions::{Partition, PartitionTable};
pub use setup::{run, Registrar, Report, State};
