use crate::devices::*;

/// Byte range of the boot flash scanned for RouterBOOT config blocks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InfoRegion {
    pub offset: u32,
    pub size: u32,
}

/// Where the radio EEPROM image sits inside the staged calibration blob.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationWindow {
    pub offset: usize,
    pub len: usize,
}

/// Everything about a board that is fixed at build time.
#[derive(Debug, Copy, Clone)]
pub struct BoardConfig {
    pub vendor_name: &'static str,
    pub info_region: InfoRegion,
    pub mdio: MdioDescriptor,
    pub ethernet: EthernetLink,
    pub eth_mac_index: u8,
    pub wlan_mac_index: u8,
    pub calibration: CalibrationWindow,
    pub leds: &'static [LedSpec],
    pub buttons: &'static [ButtonSpec],
    pub keys_poll_interval_ms: u32,
}

#[rustfmt::skip]
mod rb911l {
    use super::*;

    pub const GPIO_LED_1:       u8 = 13;
    pub const GPIO_LED_2:       u8 = 12;
    pub const GPIO_LED_3:       u8 = 4;
    pub const GPIO_LED_4:       u8 = 21;
    pub const GPIO_LED_5:       u8 = 18;
    pub const GPIO_LED_POWER:   u8 = 11;
    pub const GPIO_LED_USER:    u8 = 3;
    pub const GPIO_LED_ETH:     u8 = 20;
    pub const GPIO_BTN_RESET:   u8 = 15;

    pub const KEYS_POLL_INTERVAL_MS:        u32 = 20;
    pub const KEYS_DEBOUNCE_INTERVAL_MS:    u32 = 3 * KEYS_POLL_INTERVAL_MS;

    pub const INFO_REGION:  InfoRegion = InfoRegion { offset: 0x0, size: 0x20000 };

    // The ART blob is 64K; the radio EEPROM image is its second 4K block.
    pub const ART_SIZE:     usize = 0x10000;
    pub const CALIBRATION:  CalibrationWindow = CalibrationWindow { offset: 0x1000, len: 0x1000 };

    pub const LEDS: [LedSpec; 7] = [
        LedSpec::active_low("rb:green:led1", GPIO_LED_1),
        LedSpec::active_low("rb:green:led2", GPIO_LED_2),
        LedSpec::active_low("rb:green:led3", GPIO_LED_3),
        LedSpec::active_low("rb:green:led4", GPIO_LED_4),
        LedSpec::active_low("rb:green:led5", GPIO_LED_5),
        LedSpec { input_when_off: true, ..LedSpec::active_low("rb:green:user", GPIO_LED_USER) },
        LedSpec {
            name: "rb:green:power",
            gpio: GPIO_LED_POWER,
            polarity: Polarity::ActiveHigh,
            default_state: DefaultState::On,
            input_when_off: false,
        },
    ];

    pub const BUTTONS: [ButtonSpec; 1] = [
        ButtonSpec {
            desc: "Reset button",
            gpio: GPIO_BTN_RESET,
            polarity: Polarity::ActiveLow,
            debounce_ms: KEYS_DEBOUNCE_INTERVAL_MS,
            action: KeyAction::Restart,
        },
    ];
}

pub use self::rb911l::ART_SIZE;

impl BoardConfig {
    /// RouterBOARD 911 Lite2/Lite5.
    pub const RB911L: BoardConfig = BoardConfig {
        vendor_name: "MikroTik RouterBOARD",
        info_region: rb911l::INFO_REGION,
        mdio: MdioDescriptor { bus: 1, phy_mask: 0 },
        ethernet: EthernetLink {
            port: 1,
            phy_mode: PhyMode::Gmii,
            speed_mbps: 1000,
            duplex: Duplex::Full,
        },
        eth_mac_index: 0,
        wlan_mac_index: 1,
        calibration: rb911l::CALIBRATION,
        leds: &rb911l::LEDS,
        buttons: &rb911l::BUTTONS,
        keys_poll_interval_ms: rb911l::KEYS_POLL_INTERVAL_MS,
    };
}
