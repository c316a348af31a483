use crate::mac::MacAddress;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DefaultState {
    Off,
    On,
    /// Leave the line as the bootloader configured it.
    Keep,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedSpec {
    pub name: &'static str,
    pub gpio: u8,
    pub polarity: Polarity,
    pub default_state: DefaultState,
    /// Turn the LED off by switching the line to input instead of driving it.
    pub input_when_off: bool,
}

impl LedSpec {
    pub const fn active_low(name: &'static str, gpio: u8) -> Self {
        Self {
            name,
            gpio,
            polarity: Polarity::ActiveLow,
            default_state: DefaultState::Off,
            input_when_off: false,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyAction {
    Restart,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonSpec {
    pub desc: &'static str,
    pub gpio: u8,
    pub polarity: Polarity,
    pub debounce_ms: u32,
    pub action: KeyAction,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhyMode {
    Mii,
    Rmii,
    Gmii,
    Rgmii,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Duplex {
    Half,
    Full,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MdioDescriptor {
    pub bus: u8,
    pub phy_mask: u32,
}

/// Link parameters of an Ethernet port; the MAC is filled in at bring-up.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EthernetLink {
    pub port: u8,
    pub phy_mode: PhyMode,
    pub speed_mbps: u32,
    pub duplex: Duplex,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EthernetDescriptor {
    pub link: EthernetLink,
    pub mac: MacAddress,
}

/// Built-in radio, with its EEPROM image borrowed from the staged calibration blob.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RadioDescriptor<'a> {
    pub mac: MacAddress,
    pub eeprom: &'a [u8],
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ButtonsDescriptor<'a> {
    pub poll_interval_ms: u32,
    pub buttons: &'a [ButtonSpec],
}
