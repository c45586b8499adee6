//! Simulated card implementation.
//!
//! The `SimulatedCard` implements the `DeviceGateway` trait in software so
//! the session layer can be exercised without an RTC card on the network.
//! It follows the vendor library's conventions: numeric return codes for
//! every call and a sticky error register that only `clear_errors` resets.

use super::lists::ListModel;
use rtc_common::card::consts::{
    CARD_INFO_ACQUIRED, CARD_INFO_ADDRESS, CARD_INFO_BLOCK_LEN, CARD_INFO_FIRMWARE,
    CARD_INFO_SERIAL, CARD_SLOT,
};
use rtc_common::card::gateway::DeviceGateway;
use rtc_common::card::status::ErrorMask;
use rtc_common::card::types::{CardAddress, CardInfoBlock, ListBuffer};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Behaviour knobs for the simulated card.
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Code returned by `init` (an Ethernet-only host reports "no PCIe card")
    pub init_code: u32,
    /// Address the card answers on; `None` answers on any address
    pub card_address: Option<String>,
    /// Card number handed out by `assign_slot`
    pub card_no: u32,
    /// Card is already acquired by another process
    pub owned_elsewhere: bool,
    /// Code returned by `load_program`
    pub program_code: u32,
    /// Code returned by `load_correction`
    pub correction_code: u32,
    /// Reported firmware version
    pub firmware_version: u32,
    /// Reported serial number
    pub serial_number: u32,
    /// Result of the liveness probe
    pub link_up: bool,
    /// Status reads a list execution lasts
    pub execution_polls: u32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            init_code: ErrorMask::NO_CARD.bits(),
            card_address: None,
            card_no: 1,
            owned_elsewhere: false,
            program_code: 0,
            correction_code: 0,
            firmware_version: 617,
            serial_number: 100_200,
            link_up: true,
            execution_polls: 3,
        }
    }
}

/// Highest scanner speed the card accepts, in bits/ms.
const MAX_SPEED: f64 = 800_000.0;

/// Highest laser mode code.
const MAX_LASER_MODE: u32 = 6;

/// Laser and scanner settings last written to the simulated card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlState {
    /// Laser mode code
    pub laser_mode: Option<u32>,
    /// Laser control word
    pub laser_control: Option<u32>,
    /// Jump speed in bits/ms
    pub jump_speed: Option<f64>,
    /// Mark speed in bits/ms
    pub mark_speed: Option<f64>,
    /// Jump, mark and polygon delays
    pub delays: Option<(u32, u32, u32)>,
}

/// Software stand-in for one Ethernet RTC card.
pub struct SimulatedCard {
    /// Behaviour knobs
    options: SimulationOptions,
    /// `init` has been called
    initialized: bool,
    /// Packed address assigned to the slot
    assigned_address: Option<u32>,
    /// Card is acquired by this process
    acquired: bool,
    /// Number of successful releases
    release_count: u32,
    /// Last uploaded program path
    program: Option<PathBuf>,
    /// Last uploaded correction path, table and dimensions
    correction: Option<(PathBuf, u32, u32)>,
    /// Sticky error register
    errors: ErrorMask,
    /// List buffers
    lists: ListModel,
    /// Laser and scanner settings
    control: ControlState,
}

impl SimulatedCard {
    /// Create a simulated card with default behaviour.
    pub fn new() -> Self {
        Self::with_options(SimulationOptions::default())
    }

    /// Create a simulated card with the given behaviour.
    pub fn with_options(options: SimulationOptions) -> Self {
        let lists = ListModel::new(options.execution_polls);
        Self {
            options,
            initialized: false,
            assigned_address: None,
            acquired: false,
            release_count: 0,
            program: None,
            correction: None,
            errors: ErrorMask::empty(),
            lists,
            control: ControlState::default(),
        }
    }

    /// Behaviour knobs, mutable so tests can change them mid-session.
    pub fn options_mut(&mut self) -> &mut SimulationOptions {
        &mut self.options
    }

    /// Returns true while this process holds the card.
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    /// Number of successful releases so far.
    pub fn release_count(&self) -> u32 {
        self.release_count
    }

    /// Last uploaded program path.
    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    /// Last uploaded correction path, table and dimensions.
    pub fn correction(&self) -> Option<(&Path, u32, u32)> {
        self.correction
            .as_ref()
            .map(|(path, table, dims)| (path.as_path(), *table, *dims))
    }

    /// Current error register contents.
    pub fn errors(&self) -> ErrorMask {
        self.errors
    }

    /// List model (read-only).
    pub fn lists(&self) -> &ListModel {
        &self.lists
    }

    /// Laser and scanner settings written so far.
    pub fn control(&self) -> &ControlState {
        &self.control
    }

    fn fail(&mut self, mask: ErrorMask) -> u32 {
        self.errors |= mask;
        0
    }

    /// Return code for a settings write: access and range checks.
    fn setting_code(&mut self, in_range: bool) -> u32 {
        let mask = if !self.acquired {
            ErrorMask::ACCESS_DENIED
        } else if !in_range {
            ErrorMask::PARAM_ERROR
        } else {
            return 0;
        };
        self.errors |= mask;
        mask.bits()
    }

    fn answers_on(&self, address: u32) -> bool {
        match &self.options.card_address {
            None => true,
            Some(text) => CardAddress::parse(text, CARD_SLOT)
                .map(|expected| expected.packed() == address)
                .unwrap_or(false),
        }
    }
}

impl Default for SimulatedCard {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceGateway for SimulatedCard {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn init(&mut self) -> u32 {
        info!("Initializing simulated RTC card");
        self.initialized = true;
        self.options.init_code
    }

    fn resolve_address(&mut self, text: &str) -> u32 {
        match CardAddress::parse(text, CARD_SLOT) {
            Some(address) => address.packed(),
            None => self.fail(ErrorMask::PARAM_ERROR),
        }
    }

    fn assign_slot(&mut self, address: u32, slot: u32) -> u32 {
        if !self.initialized || address == 0 || slot != CARD_SLOT {
            return self.fail(ErrorMask::PARAM_ERROR);
        }
        self.assigned_address = Some(address);
        self.options.card_no
    }

    fn acquire(&mut self, card_no: u32) -> u32 {
        let Some(address) = self.assigned_address else {
            return self.fail(ErrorMask::NO_CARD);
        };
        if card_no != self.options.card_no || !self.answers_on(address) {
            return self.fail(ErrorMask::NO_CARD | ErrorMask::TIMEOUT);
        }
        if self.options.owned_elsewhere {
            return self.fail(ErrorMask::ACCESS_DENIED);
        }
        self.acquired = true;
        debug!("Simulated card {} acquired", card_no);
        card_no
    }

    fn release(&mut self, card_no: u32) -> bool {
        if !self.acquired || card_no != self.options.card_no {
            self.errors |= ErrorMask::IGNORED;
            return false;
        }
        self.acquired = false;
        self.release_count += 1;
        self.lists.reset();
        self.control = ControlState::default();
        debug!("Simulated card {} released", card_no);
        true
    }

    fn load_program(&mut self, card_no: u32, path: &Path) -> u32 {
        if !self.acquired || card_no != self.options.card_no {
            self.errors |= ErrorMask::ACCESS_DENIED;
            return ErrorMask::ACCESS_DENIED.bits();
        }
        if self.options.program_code != 0 {
            self.errors |= ErrorMask::DOWNLOAD_ERROR;
            return self.options.program_code;
        }
        self.program = Some(path.to_path_buf());
        0
    }

    fn load_correction(&mut self, card_no: u32, path: &Path, table: u32, dims: u32) -> u32 {
        if !self.acquired || card_no != self.options.card_no {
            self.errors |= ErrorMask::ACCESS_DENIED;
            return ErrorMask::ACCESS_DENIED.bits();
        }
        if !(1..=8).contains(&table) || !(2..=3).contains(&dims) {
            self.errors |= ErrorMask::PARAM_ERROR;
            return ErrorMask::PARAM_ERROR.bits();
        }
        if self.options.correction_code != 0 {
            self.errors |= ErrorMask::VERIFY_ERROR;
            return self.options.correction_code;
        }
        self.correction = Some((path.to_path_buf(), table, dims));
        0
    }

    fn read_serial(&mut self, card_no: u32) -> u32 {
        if card_no != self.options.card_no {
            return self.fail(ErrorMask::NO_CARD);
        }
        self.options.serial_number
    }

    fn check_link(&mut self) -> bool {
        if !self.options.link_up {
            self.errors |= ErrorMask::TIMEOUT | ErrorMask::ETH_ERROR;
        }
        self.options.link_up
    }

    fn read_error_register(&mut self) -> u32 {
        self.errors.bits()
    }

    fn clear_errors(&mut self, scope: u32) {
        self.errors = ErrorMask::from_bits_retain(self.errors.bits() & !scope);
    }

    fn read_card_info_block(&mut self, _slot: u32) -> CardInfoBlock {
        let mut block = [0; CARD_INFO_BLOCK_LEN];
        block[CARD_INFO_FIRMWARE] = self.options.firmware_version;
        block[CARD_INFO_SERIAL] = self.options.serial_number;
        block[CARD_INFO_ACQUIRED] = u32::from(self.acquired);
        block[CARD_INFO_ADDRESS] = self.assigned_address.unwrap_or(0);
        block
    }

    fn start_list(&mut self, buffer_no: u32, position: u32) -> u32 {
        if !self.acquired {
            return self.fail(ErrorMask::ACCESS_DENIED);
        }
        let Some(buffer) = ListBuffer::from_number(buffer_no) else {
            return self.fail(ErrorMask::PARAM_ERROR);
        };
        match self.lists.start(buffer, position) {
            Ok(()) => buffer_no,
            Err(mask) => self.fail(mask),
        }
    }

    fn set_end_of_list(&mut self) {
        if let Err(mask) = self.lists.end_load() {
            self.errors |= mask;
        }
    }

    fn execute_list(&mut self, buffer_no: u32) -> u32 {
        if !self.acquired {
            self.errors |= ErrorMask::ACCESS_DENIED;
            return ErrorMask::ACCESS_DENIED.bits();
        }
        let Some(buffer) = ListBuffer::from_number(buffer_no) else {
            self.errors |= ErrorMask::PARAM_ERROR;
            return ErrorMask::PARAM_ERROR.bits();
        };
        match self.lists.execute(buffer) {
            Ok(()) => 0,
            Err(mask) => {
                self.errors |= mask;
                mask.bits()
            }
        }
    }

    fn read_list_status_register(&mut self) -> u32 {
        u32::from(self.lists.observe().bits())
    }

    fn set_laser_mode(&mut self, mode: u32) -> u32 {
        let code = self.setting_code(mode <= MAX_LASER_MODE);
        if code == 0 {
            self.control.laser_mode = Some(mode);
        }
        code
    }

    fn set_laser_control(&mut self, control: u32) -> u32 {
        let code = self.setting_code(true);
        if code == 0 {
            self.control.laser_control = Some(control);
        }
        code
    }

    fn set_jump_speed(&mut self, speed: f64) -> u32 {
        let code = self.setting_code(speed > 0.0 && speed <= MAX_SPEED);
        if code == 0 {
            self.control.jump_speed = Some(speed);
        }
        code
    }

    fn set_mark_speed(&mut self, speed: f64) -> u32 {
        let code = self.setting_code(speed > 0.0 && speed <= MAX_SPEED);
        if code == 0 {
            self.control.mark_speed = Some(speed);
        }
        code
    }

    fn set_scanner_delays(&mut self, jump: u32, mark: u32, polygon: u32) -> u32 {
        let code = self.setting_code(true);
        if code == 0 {
            self.control.delays = Some((jump, mark, polygon));
        }
        code
    }
}
