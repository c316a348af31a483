//! Board bring-up sequence.
//!
//! Runs once at boot: read the RouterBOOT info, lay out the SPI flash, derive the
//! interface addresses, stage the radio calibration and hand every descriptor to the
//! [`Registrar`]. Only a missing info block stops the sequence; every other problem
//! just drops the affected device.

use core::fmt;

use crate::board::{BoardConfig, InfoRegion};
use crate::calibration::{self, CalibrationError, CalibrationSource, StagedCalibration};
use crate::devices::*;
use crate::mac::MacAddress;
use crate::model::{BoardName, HardwareInfo};
use crate::partitions::{self, LayoutError, PartitionTable};
use crate::routerboot::InfoError;

/// Where the RouterBOOT info comes from.
pub trait InfoSource {
    fn read_info(&mut self, region: InfoRegion) -> Result<HardwareInfo, InfoError>;
}

/// Receives the board's devices, in the order they must be claimed.
pub trait Registrar {
    fn set_machine_name(&mut self, name: MachineName<'_>);
    fn register_storage(&mut self, partitions: &PartitionTable);
    fn register_mdio(&mut self, mdio: &MdioDescriptor);
    fn register_ethernet(&mut self, eth: &EthernetDescriptor);
    fn register_radio(&mut self, radio: &RadioDescriptor<'_>);
    fn register_leds(&mut self, leds: &[LedSpec]);
    fn register_buttons(&mut self, buttons: &ButtonsDescriptor<'_>);
}

/// `<vendor> <board>`, e.g. "MikroTik RouterBOARD 911L".
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MachineName<'a> {
    pub vendor: &'a str,
    pub board: Option<&'a str>,
}

impl fmt::Display for MachineName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.vendor, self.board.unwrap_or(""))
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Start,
    InfoRead,
    LayoutBuilt,
    LayoutSkipped,
    RadioInitialized,
    RadioSkipped,
    DescriptorsAssembled,
    HandedOff,
    AbortedNoInfo,
}

impl State {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, State::HandedOff | State::AbortedNoInfo)
    }

    pub const fn can_advance_to(&self, next: State) -> bool {
        use State::*;
        matches!(
            (*self, next),
            (Start, InfoRead)
                | (Start, AbortedNoInfo)
                | (InfoRead, LayoutBuilt)
                | (InfoRead, LayoutSkipped)
                | (LayoutBuilt | LayoutSkipped, RadioInitialized)
                | (LayoutBuilt | LayoutSkipped, RadioSkipped)
                | (RadioInitialized | RadioSkipped, DescriptorsAssembled)
                | (DescriptorsAssembled, HandedOff)
        )
    }
}

/// Longest path through [`State`]: Start, InfoRead, Layout*, Radio*, DescriptorsAssembled, HandedOff.
const MAX_TRAIL: usize = 6;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageStatus {
    NotAttempted,
    Registered,
    /// The board boots from NAND, which has no driver here.
    UnsupportedVariant,
    InvalidGeometry(LayoutError),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioStatus {
    NotAttempted,
    Initialized { mac: MacAddress },
    NoCalibration,
    BadCalibration(CalibrationError),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Warning {
    UnsupportedVariant,
    InvalidGeometry(LayoutError),
    BadCalibration(CalibrationError),
}

/// Outcome of a bring-up run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Report {
    trail: [State; MAX_TRAIL],
    len: usize,
    pub info_error: Option<InfoError>,
    pub board_name: Option<BoardName>,
    pub storage: StorageStatus,
    pub ethernet_mac: Option<MacAddress>,
    pub radio: RadioStatus,
}

impl Report {
    fn new() -> Self {
        Self {
            trail: [State::Start; MAX_TRAIL],
            len: 1,
            info_error: None,
            board_name: None,
            storage: StorageStatus::NotAttempted,
            ethernet_mac: None,
            radio: RadioStatus::NotAttempted,
        }
    }

    fn enter(&mut self, next: State) {
        debug_assert!(self.state().can_advance_to(next), "{:?} -> {:?}", self.state(), next);
        debug!("setup: {:?} -> {:?}", self.state(), next);
        self.trail[self.len] = next;
        self.len += 1;
    }

    pub fn state(&self) -> State {
        self.trail[self.len - 1]
    }

    /// Every state the run went through, starting with `Start`.
    pub fn trail(&self) -> &[State] {
        &self.trail[..self.len]
    }

    pub fn warnings(&self) -> impl Iterator<Item = Warning> {
        let storage = match self.storage {
            StorageStatus::UnsupportedVariant => Some(Warning::UnsupportedVariant),
            StorageStatus::InvalidGeometry(e) => Some(Warning::InvalidGeometry(e)),
            _ => None,
        };
        let radio = match self.radio {
            RadioStatus::BadCalibration(e) => Some(Warning::BadCalibration(e)),
            _ => None,
        };
        storage.into_iter().chain(radio)
    }
}

fn plan_storage(info: &HardwareInfo) -> Result<PartitionTable, StorageStatus> {
    if !info.hw_options.nor_only() {
        warn!(
            "The {} with NAND flash is not supported yet",
            info.board_name().unwrap_or("board")
        );
        return Err(StorageStatus::UnsupportedVariant);
    }

    partitions::build(info).map_err(|e| {
        warn!("invalid flash layout, not registering partitions: {:?}", e);
        StorageStatus::InvalidGeometry(e)
    })
}

/// Brings the board up.
///
/// `base_mac` is the board's first address as handed over by the bootloader.
pub fn run(
    config: &BoardConfig,
    base_mac: MacAddress,
    info_source: &mut dyn InfoSource,
    cal_source: &mut dyn CalibrationSource,
    registrar: &mut dyn Registrar,
) -> Report {
    let mut report = Report::new();

    let info = match info_source.read_info(config.info_region) {
        Ok(info) => info,
        Err(e) => {
            error!("setup: no RouterBOOT info: {:?}", e);
            report.info_error = Some(e);
            report.enter(State::AbortedNoInfo);
            return report;
        }
    };
    report.enter(State::InfoRead);
    report.board_name = info.board_name;

    let storage = match plan_storage(&info) {
        Ok(table) => {
            report.enter(State::LayoutBuilt);
            Some(table)
        }
        Err(status) => {
            report.storage = status;
            report.enter(State::LayoutSkipped);
            None
        }
    };

    let eth = EthernetDescriptor {
        link: config.ethernet,
        mac: base_mac.derive(config.eth_mac_index),
    };
    report.ethernet_mac = Some(eth.mac);

    // Held until the radio has been handed off; dropping it frees the blob.
    let staged = StagedCalibration::acquire(cal_source);
    let radio = match &staged {
        None => {
            report.radio = RadioStatus::NoCalibration;
            None
        }
        Some(staged) => match calibration::extract(
            staged.data(),
            base_mac,
            config.wlan_mac_index,
            config.calibration,
        ) {
            Ok(radio) => {
                report.radio = RadioStatus::Initialized { mac: radio.mac };
                Some(radio)
            }
            Err(e) => {
                warn!("setup: unusable radio calibration: {:?}", e);
                report.radio = RadioStatus::BadCalibration(e);
                None
            }
        },
    };
    report.enter(if radio.is_some() {
        State::RadioInitialized
    } else {
        State::RadioSkipped
    });

    let buttons = ButtonsDescriptor {
        poll_interval_ms: config.keys_poll_interval_ms,
        buttons: config.buttons,
    };
    report.enter(State::DescriptorsAssembled);

    registrar.set_machine_name(MachineName {
        vendor: config.vendor_name,
        board: info.board_name(),
    });
    if let Some(table) = &storage {
        registrar.register_storage(table);
        report.storage = StorageStatus::Registered;
    }
    registrar.register_mdio(&config.mdio);
    registrar.register_ethernet(&eth);
    if let Some(radio) = &radio {
        registrar.register_radio(radio);
    }
    registrar.register_leds(config.leds);
    registrar.register_buttons(&buttons);

    drop(staged);
    report.enter(State::HandedOff);
    info!("setup: {:?} up", info.board_name());

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::testing::FakeSource;
    use crate::model::{HwOptions, BLOCK_SIZE, MAGIC_HARD, MAGIC_SOFT, TAG_BOARD_NAME, TAG_HW_OPTIONS};
    use crate::partitions::Role;
    use crate::routerboot::testing::{block, MemFlash};
    use crate::routerboot::RouterbootReader;
    use hex_literal::hex;
    use std::string::{String, ToString};
    use std::vec::Vec;

    const BASE: MacAddress = MacAddress::new(hex!("4c 5e 0c 11 22 33"));

    struct FixedInfo(Result<HardwareInfo, InfoError>);

    impl InfoSource for FixedInfo {
        fn read_info(&mut self, region: InfoRegion) -> Result<HardwareInfo, InfoError> {
            assert_eq!(region, BoardConfig::RB911L.info_region);
            self.0
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Name(String),
        Storage(PartitionTable),
        Mdio(MdioDescriptor),
        Ethernet(EthernetDescriptor),
        Radio { mac: MacAddress, eeprom_len: usize, fill: u8 },
        Leds(Vec<LedSpec>),
        Buttons(u32, Vec<ButtonSpec>),
    }

    #[derive(Default)]
    struct Recorder(Vec<Event>);

    impl Recorder {
        fn kinds(&self) -> Vec<&'static str> {
            self.0
                .iter()
                .map(|e| match e {
                    Event::Name(_) => "name",
                    Event::Storage(_) => "storage",
                    Event::Mdio(_) => "mdio",
                    Event::Ethernet(_) => "ethernet",
                    Event::Radio { .. } => "radio",
                    Event::Leds(_) => "leds",
                    Event::Buttons(..) => "buttons",
                })
                .collect()
        }
    }

    impl Registrar for Recorder {
        fn set_machine_name(&mut self, name: MachineName<'_>) {
            self.0.push(Event::Name(name.to_string()));
        }
        fn register_storage(&mut self, partitions: &PartitionTable) {
            self.0.push(Event::Storage(*partitions));
        }
        fn register_mdio(&mut self, mdio: &MdioDescriptor) {
            self.0.push(Event::Mdio(*mdio));
        }
        fn register_ethernet(&mut self, eth: &EthernetDescriptor) {
            self.0.push(Event::Ethernet(*eth));
        }
        fn register_radio(&mut self, radio: &RadioDescriptor<'_>) {
            self.0.push(Event::Radio {
                mac: radio.mac,
                eeprom_len: radio.eeprom.len(),
                fill: radio.eeprom[0],
            });
        }
        fn register_leds(&mut self, leds: &[LedSpec]) {
            self.0.push(Event::Leds(leds.to_vec()));
        }
        fn register_buttons(&mut self, buttons: &ButtonsDescriptor<'_>) {
            self.0.push(Event::Buttons(buttons.poll_interval_ms, buttons.buttons.to_vec()));
        }
    }

    fn info(hw_options: u32) -> HardwareInfo {
        HardwareInfo {
            board_name: Some(BoardName::new("911L")),
            hw_options: HwOptions(hw_options),
            hard_cfg_offset: 0xb000,
            hard_cfg_size: 0x1000,
            soft_cfg_offset: 0xf000,
        }
    }

    fn bring_up(
        info: Result<HardwareInfo, InfoError>,
        cal: &mut FakeSource,
    ) -> (Report, Recorder) {
        let mut registrar = Recorder::default();
        let report = run(
            &BoardConfig::RB911L,
            BASE,
            &mut FixedInfo(info),
            cal,
            &mut registrar,
        );
        (report, registrar)
    }

    #[test]
    fn full_bring_up() {
        let mut cal = FakeSource::art(0x5a);
        let (report, registrar) = bring_up(Ok(info(HwOptions::NO_NAND)), &mut cal);

        use State::*;
        assert_eq!(
            report.trail(),
            [Start, InfoRead, LayoutBuilt, RadioInitialized, DescriptorsAssembled, HandedOff]
        );
        assert_eq!(report.state(), HandedOff);
        assert!(report.state().is_terminal());
        assert_eq!(report.storage, StorageStatus::Registered);
        assert_eq!(report.board_name.map(|n| n.as_str().to_string()), Some("911L".to_string()));
        assert_eq!(report.warnings().count(), 0);

        assert_eq!(
            registrar.kinds(),
            ["name", "storage", "mdio", "ethernet", "radio", "leds", "buttons"]
        );

        let events = &registrar.0;
        assert_eq!(events[0], Event::Name("MikroTik RouterBOARD 911L".to_string()));

        let Event::Storage(table) = &events[1] else { panic!() };
        assert_eq!(table.get(Role::Booter).offset, 0xd000);
        assert_eq!(table.get(Role::Firmware).offset, 0x10000);

        assert_eq!(events[2], Event::Mdio(MdioDescriptor { bus: 1, phy_mask: 0 }));
        assert_eq!(
            events[3],
            Event::Ethernet(EthernetDescriptor {
                link: EthernetLink {
                    port: 1,
                    phy_mode: PhyMode::Gmii,
                    speed_mbps: 1000,
                    duplex: Duplex::Full,
                },
                mac: BASE,
            })
        );
        assert_eq!(
            events[4],
            Event::Radio {
                mac: MacAddress::new(hex!("4c 5e 0c 11 22 34")),
                eeprom_len: 0x1000,
                fill: 0x5a,
            }
        );
        assert_eq!(events[5], Event::Leds(BoardConfig::RB911L.leds.to_vec()));
        assert_eq!(events[6], Event::Buttons(20, BoardConfig::RB911L.buttons.to_vec()));

        assert_eq!(report.ethernet_mac, Some(BASE));
        assert_eq!(
            report.radio,
            RadioStatus::Initialized { mac: MacAddress::new(hex!("4c 5e 0c 11 22 34")) }
        );
        assert_eq!((cal.acquired, cal.released), (1, 1));
        assert!(!cal.staged);
    }

    #[test]
    fn nand_variant_skips_storage() {
        let mut cal = FakeSource::art(0);
        let (report, registrar) = bring_up(Ok(info(HwOptions::HAS_WIFI)), &mut cal);

        use State::*;
        assert_eq!(
            report.trail(),
            [Start, InfoRead, LayoutSkipped, RadioInitialized, DescriptorsAssembled, HandedOff]
        );
        assert_eq!(report.storage, StorageStatus::UnsupportedVariant);
        assert_eq!(report.warnings().collect::<Vec<_>>(), [Warning::UnsupportedVariant]);
        assert_eq!(registrar.kinds(), ["name", "mdio", "ethernet", "radio", "leds", "buttons"]);
    }

    #[test]
    fn missing_info_aborts_before_any_registration() {
        let mut cal = FakeSource::art(0);
        let (report, registrar) = bring_up(Err(InfoError::NoHardConfig), &mut cal);

        assert_eq!(report.trail(), [State::Start, State::AbortedNoInfo]);
        assert!(report.state().is_terminal());
        assert_eq!(report.info_error, Some(InfoError::NoHardConfig));
        assert_eq!(report.board_name, None);
        assert_eq!(report.storage, StorageStatus::NotAttempted);
        assert_eq!(report.radio, RadioStatus::NotAttempted);
        assert_eq!(report.ethernet_mac, None);
        assert!(registrar.0.is_empty());
        assert_eq!((cal.acquired, cal.released), (0, 0));
    }

    #[test]
    fn missing_calibration_skips_radio_silently() {
        let mut with_cal = FakeSource::art(0);
        let (_, expected) = bring_up(Ok(info(HwOptions::NO_NAND)), &mut with_cal);

        let mut cal = FakeSource::new(None);
        let (report, registrar) = bring_up(Ok(info(HwOptions::NO_NAND)), &mut cal);

        assert_eq!(report.trail()[3], State::RadioSkipped);
        assert_eq!(report.state(), State::HandedOff);
        assert_eq!(report.radio, RadioStatus::NoCalibration);
        assert_eq!(report.warnings().count(), 0);

        let without_radio: Vec<Event> = expected
            .0
            .into_iter()
            .filter(|e| !matches!(e, Event::Radio { .. }))
            .collect();
        assert_eq!(registrar.0, without_radio);
        assert_eq!((cal.acquired, cal.released), (0, 0));
    }

    #[test]
    fn short_calibration_skips_radio_with_warning() {
        let mut cal = FakeSource::new(Some(std::vec![0; 0x1000]));
        let (report, registrar) = bring_up(Ok(info(HwOptions::NO_NAND)), &mut cal);

        assert_eq!(report.trail()[3], State::RadioSkipped);
        assert_eq!(
            report.warnings().collect::<Vec<_>>(),
            [Warning::BadCalibration(CalibrationError::Truncated { len: 0x1000 })]
        );
        assert!(!registrar.kinds().contains(&"radio"));
        assert_eq!((cal.acquired, cal.released), (1, 1));
    }

    #[test]
    fn bad_geometry_skips_only_storage() {
        let mut bad = info(HwOptions::NO_NAND);
        bad.soft_cfg_offset = 0xc000;

        let mut cal = FakeSource::art(0);
        let (report, registrar) = bring_up(Ok(bad), &mut cal);

        assert_eq!(report.trail()[2], State::LayoutSkipped);
        assert_eq!(report.state(), State::HandedOff);
        assert_eq!(report.storage, StorageStatus::InvalidGeometry(LayoutError::BooterUnderflow));
        assert_eq!(
            report.warnings().collect::<Vec<_>>(),
            [Warning::InvalidGeometry(LayoutError::BooterUnderflow)]
        );
        assert_eq!(registrar.kinds(), ["name", "mdio", "ethernet", "radio", "leds", "buttons"]);
    }

    #[test]
    fn unnamed_board_keeps_vendor_prefix() {
        let mut unnamed = info(HwOptions::NO_NAND);
        unnamed.board_name = None;

        let mut cal = FakeSource::new(None);
        let (_, registrar) = bring_up(Ok(unnamed), &mut cal);
        assert_eq!(registrar.0[0], Event::Name("MikroTik RouterBOARD ".to_string()));
    }

    #[test]
    fn transition_guard() {
        use State::*;
        assert!(Start.can_advance_to(InfoRead));
        assert!(Start.can_advance_to(AbortedNoInfo));
        assert!(LayoutSkipped.can_advance_to(RadioSkipped));
        assert!(!Start.can_advance_to(LayoutBuilt));
        assert!(!InfoRead.can_advance_to(AbortedNoInfo));
        assert!(!RadioInitialized.can_advance_to(HandedOff));
        assert!(!HandedOff.can_advance_to(Start));
        assert!(!AbortedNoInfo.can_advance_to(InfoRead));
    }

    #[test]
    fn reads_info_from_flash() {
        let mut flash = MemFlash::new(0x20000);
        flash.put(
            0xb000,
            &block(
                MAGIC_HARD,
                &[
                    (TAG_BOARD_NAME, &b"911L\0"[..]),
                    (TAG_HW_OPTIONS, &HwOptions::NO_NAND.to_be_bytes()[..]),
                ],
            ),
        );
        flash.put(0xf000, &block(MAGIC_SOFT, &[]));

        let mut buf = [0; BLOCK_SIZE as usize];
        let mut reader = RouterbootReader::new(flash, &mut buf);
        let mut cal = FakeSource::new(None);
        let mut registrar = Recorder::default();
        let report = run(&BoardConfig::RB911L, BASE, &mut reader, &mut cal, &mut registrar);

        assert_eq!(report.state(), State::HandedOff);
        assert_eq!(report.storage, StorageStatus::Registered);
        assert_eq!(registrar.0[0], Event::Name("MikroTik RouterBOARD 911L".to_string()));
    }
}
