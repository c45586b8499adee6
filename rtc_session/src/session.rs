//! Connection session and session handle.
//!
//! `ConnectionSession` owns the gateway and the lifecycle of the one card
//! this process controls:
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──ok──► Acquired
//!       ▲                         │                 │
//!       └─────────── error ───────┘   disconnect()  │
//!       └───────────────────────────────────────────┘
//! ```
//!
//! A successful `connect` returns a [`SessionHandle`]; every later call
//! takes that handle and fails with `ConnectionLost` once it is stale.
//!
//! At most one handle is live in the process at a time. Handle generations
//! are drawn from a process-wide counter, so a handle is only ever accepted
//! by the session that issued it.

use rtc_common::card::consts::{
    CARD_INFO_ACQUIRED, CARD_INFO_FIRMWARE, CARD_SLOT, CLEAR_ALL_ERRORS, CORRECTION_DIMENSIONS,
    CORRECTION_TABLE, MANUAL_PAGE_ACQUIRE, MANUAL_PAGE_LOAD_CORRECTION, MANUAL_PAGE_LOAD_PROGRAM,
    MANUAL_PAGE_RELEASE,
};
use rtc_common::card::error::RtcError;
use rtc_common::card::gateway::DeviceGateway;
use rtc_common::card::status::{ErrorMask, decode_errors, format_failure};
use rtc_common::card::types::{CardAddress, CardInfo};
use rtc_common::config::ControlConfig;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::list::ListScheduler;

/// Next handle generation. Never 0.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Generation of the live handle in this process, 0 when none.
static LIVE_GENERATION: AtomicU64 = AtomicU64::new(0);

/// Claim the process-wide card slot for `generation`.
fn claim(generation: u64) -> Result<(), u64> {
    LIVE_GENERATION
        .compare_exchange(0, generation, Ordering::SeqCst, Ordering::SeqCst)
        .map(|_| ())
}

/// Drop the claim if `generation` still holds it.
fn unclaim(generation: u64) {
    let _ = LIVE_GENERATION.compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst);
}

/// Lifecycle state of a [`ConnectionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No card held
    Disconnected,
    /// `connect` in progress
    Connecting,
    /// Card acquired and configured
    Acquired,
}

/// Proof of exclusive ownership of the card.
///
/// Only [`ConnectionSession::connect`] creates one. It is not `Clone`: the
/// card is a singleton resource.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionHandle {
    address: CardAddress,
    card_no: u32,
    firmware_version: u32,
    serial_number: u32,
    acquired: bool,
    generation: u64,
}

impl SessionHandle {
    /// Logical slot index.
    pub fn slot(&self) -> u32 {
        self.address.slot()
    }

    /// Card number assigned by the gateway.
    pub fn card_no(&self) -> u32 {
        self.card_no
    }

    /// Card address.
    pub fn address(&self) -> CardAddress {
        self.address
    }

    /// Firmware version read at connect time.
    pub fn firmware_version(&self) -> u32 {
        self.firmware_version
    }

    /// Serial number read at connect time.
    pub fn serial_number(&self) -> u32 {
        self.serial_number
    }

    /// Acquisition flag reported by the card at connect time.
    pub fn is_acquired(&self) -> bool {
        self.acquired
    }
}

/// The card currently held by a session.
#[derive(Debug, Clone, Copy)]
struct ActiveCard {
    card_no: u32,
    slot: u32,
    generation: u64,
}

/// Exclusive session with one card.
///
/// Generic over the gateway so tests can inspect a concrete gateway;
/// defaults to a boxed gateway created from the registry.
pub struct ConnectionSession<G: DeviceGateway = Box<dyn DeviceGateway>> {
    /// Device gateway
    gateway: G,
    /// Lifecycle state
    state: SessionState,
    /// Held card, if any
    active: Option<ActiveCard>,
}

impl<G: DeviceGateway> ConnectionSession<G> {
    /// Create a disconnected session over the given gateway.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            state: SessionState::Disconnected,
            active: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The underlying gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// The underlying gateway, mutably.
    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Acquire the card at `address` and upload its configuration.
    ///
    /// # Errors
    /// - `FatalInit` if the device library reports anything beyond the
    ///   benign "no PCIe card" / "version mismatch" bits
    /// - `AcquisitionFailed` if the address does not resolve, no card
    ///   answers, the card is owned elsewhere, or a handle is already live
    ///   in this process
    /// - `ConfigLoadFailed` if the program or correction upload is rejected;
    ///   the card has been released by the time this is returned
    pub fn connect(
        &mut self,
        address: &str,
        program_path: &Path,
        correction_path: &Path,
    ) -> Result<SessionHandle, RtcError> {
        if let Some(active) = self.active {
            return Err(RtcError::AcquisitionFailed(format!(
                "card {} is already held by this session; disconnect first",
                active.card_no
            )));
        }

        let generation = NEXT_GENERATION.fetch_add(1, Ordering::SeqCst);
        if let Err(holder) = claim(generation) {
            return Err(RtcError::AcquisitionFailed(format!(
                "another session in this process holds the card (handle {holder}); disconnect it first"
            )));
        }

        info!("Connecting to RTC card at {}", address);
        self.state = SessionState::Connecting;

        match self.establish(generation, address, program_path, correction_path) {
            Ok(handle) => {
                self.state = SessionState::Acquired;
                info!(
                    "Connected to card {} (serial {}, firmware {})",
                    handle.card_no, handle.serial_number, handle.firmware_version
                );
                Ok(handle)
            }
            Err(e) => {
                unclaim(generation);
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    fn establish(
        &mut self,
        generation: u64,
        address: &str,
        program_path: &Path,
        correction_path: &Path,
    ) -> Result<SessionHandle, RtcError> {
        let init_code = self.gateway.init();
        if init_code != 0 {
            let mask = decode_errors(init_code);
            if !mask.is_benign_init() {
                return Err(RtcError::FatalInit(format!(
                    "{} [{}]",
                    format_failure("init_rtc6_dll", CARD_SLOT, i64::from(init_code), None),
                    mask.message()
                )));
            }
            debug!(
                "Ignoring init code {} on Ethernet-only host ({})",
                init_code,
                mask.message()
            );
        }

        let packed = self.gateway.resolve_address(address);
        if packed == 0 {
            return Err(RtcError::AcquisitionFailed(format!(
                "could not resolve card address '{address}'"
            )));
        }
        let card_address = CardAddress::from_packed(packed, CARD_SLOT);

        let card_no = self.gateway.assign_slot(packed, CARD_SLOT);
        if card_no == 0 {
            return Err(RtcError::AcquisitionFailed(format!(
                "{}: address {} could not be assigned [{}]",
                format_failure("eth_assign_card", CARD_SLOT, 0, None),
                card_address,
                self.error_text()
            )));
        }
        debug!("Address {} assigned to slot {} as card {}", card_address, CARD_SLOT, card_no);

        let acquired = self.gateway.acquire(card_no);
        if acquired != card_no {
            return Err(RtcError::AcquisitionFailed(format!(
                "{}: no card answered at {} or it is already acquired by another process [{}]",
                format_failure(
                    "acquire_rtc",
                    CARD_SLOT,
                    i64::from(acquired),
                    Some(MANUAL_PAGE_ACQUIRE)
                ),
                card_address,
                self.error_text()
            )));
        }

        if let Err(e) = self.upload(card_no, program_path, correction_path) {
            // Leaving the card acquired would lock it for the rest of the process.
            if !self.gateway.release(card_no) {
                warn!("Card {} could not be released after failed upload", card_no);
                return Err(append_context(e, "card release after the failure was not confirmed"));
            }
            return Err(e);
        }

        let serial_number = self.gateway.read_serial(card_no);
        let block = self.gateway.read_card_info_block(CARD_SLOT);

        self.active = Some(ActiveCard {
            card_no,
            slot: CARD_SLOT,
            generation,
        });

        Ok(SessionHandle {
            address: card_address,
            card_no,
            firmware_version: block[CARD_INFO_FIRMWARE],
            serial_number,
            acquired: block[CARD_INFO_ACQUIRED] != 0,
            generation,
        })
    }

    fn upload(
        &mut self,
        card_no: u32,
        program_path: &Path,
        correction_path: &Path,
    ) -> Result<(), RtcError> {
        debug!("Loading program file {:?}", program_path);
        let code = self.gateway.load_program(card_no, program_path);
        if code != 0 {
            return Err(RtcError::ConfigLoadFailed(format!(
                "{}: program file {:?}",
                format_failure(
                    "load_program_file",
                    CARD_SLOT,
                    i64::from(code),
                    Some(MANUAL_PAGE_LOAD_PROGRAM)
                ),
                program_path
            )));
        }

        debug!("Loading correction file {:?}", correction_path);
        let code = self.gateway.load_correction(
            card_no,
            correction_path,
            CORRECTION_TABLE,
            CORRECTION_DIMENSIONS,
        );
        if code != 0 {
            return Err(RtcError::ConfigLoadFailed(format!(
                "{}: correction file {:?} (table {}, {}D)",
                format_failure(
                    "load_correction_file",
                    CARD_SLOT,
                    i64::from(code),
                    Some(MANUAL_PAGE_LOAD_CORRECTION)
                ),
                correction_path,
                CORRECTION_TABLE,
                CORRECTION_DIMENSIONS
            )));
        }
        Ok(())
    }

    /// Release the card.
    ///
    /// Calling this on a session that no longer holds the card (or with a
    /// handle from an earlier connect) does nothing.
    ///
    /// # Errors
    /// `ReleaseFailed` if the gateway does not confirm the release. The
    /// session is disconnected either way.
    pub fn disconnect(&mut self, handle: &SessionHandle) -> Result<(), RtcError> {
        let active = match self.active {
            Some(active) if active.generation == handle.generation => active,
            _ => {
                debug!("Disconnect on card {} ignored: not connected", handle.card_no);
                return Ok(());
            }
        };

        self.invalidate(active);

        if !self.gateway.release(active.card_no) {
            return Err(RtcError::ReleaseFailed(format!(
                "{}: card was not released [{}]",
                format_failure("release_rtc", active.slot, 0, Some(MANUAL_PAGE_RELEASE)),
                self.error_text()
            )));
        }
        info!("Released card {}", active.card_no);
        Ok(())
    }

    /// Probe the card.
    ///
    /// A failed probe invalidates the handle. Errors stay set on the card
    /// until [`clear_errors`](Self::clear_errors) is called.
    ///
    /// # Errors
    /// `ConnectionLost` with the probe result and decoded error register, or
    /// if the handle is stale.
    pub fn check_connection(&mut self, handle: &SessionHandle) -> Result<(), RtcError> {
        let active = self.validate(handle)?;

        let link = self.gateway.check_link();
        if link {
            return Ok(());
        }

        // Best effort: the card may still think it is owned. The register is
        // read afterwards so it also shows what the release reported.
        let released = self.gateway.release(active.card_no);
        self.invalidate(active);
        let mask = self.error_mask();

        let mut message = format!(
            "link check on card {} returned {}; errors 0x{:08X} [{}]",
            active.slot,
            link,
            mask.bits(),
            mask.message()
        );
        if !released {
            warn!("Card {} could not be released after failed probe", active.card_no);
            message.push_str("; card release not confirmed");
        }
        Err(RtcError::ConnectionLost(message))
    }

    /// Read the card identity block. Probes the connection first.
    ///
    /// # Errors
    /// `ConnectionLost` as for [`check_connection`](Self::check_connection).
    pub fn get_card_info(&mut self, handle: &SessionHandle) -> Result<CardInfo, RtcError> {
        self.check_connection(handle)?;
        let block = self.gateway.read_card_info_block(handle.slot());
        Ok(CardInfo::from_block(&block))
    }

    /// Current error register, decoded.
    pub fn error_mask(&mut self) -> ErrorMask {
        decode_errors(self.gateway.read_error_register())
    }

    /// Current error register as text. Empty when no error is set.
    pub fn get_error_text(&mut self) -> String {
        self.error_text()
    }

    /// Clear every error bit at once.
    pub fn clear_errors(&mut self) {
        self.gateway.clear_errors(CLEAR_ALL_ERRORS);
    }

    /// Write laser and scanner settings to the held card.
    ///
    /// Call after `connect` and before the first list is loaded. Unset
    /// speeds and delays are left untouched.
    ///
    /// # Errors
    /// - `ConnectionLost` if the handle is stale
    /// - `ConfigLoadFailed` naming the first setting the card rejected;
    ///   settings written before it stay in effect
    pub fn apply_control_settings(
        &mut self,
        handle: &SessionHandle,
        control: &ControlConfig,
    ) -> Result<(), RtcError> {
        let active = self.validate(handle)?;

        let code = self.gateway.set_laser_mode(control.laser_mode.code());
        self.setting_applied("set_laser_mode", active.slot, code)?;

        let code = self.gateway.set_laser_control(control.laser_control);
        self.setting_applied("set_laser_control", active.slot, code)?;

        if let Some(speed) = control.jump_speed {
            let code = self.gateway.set_jump_speed(speed);
            self.setting_applied("set_jump_speed", active.slot, code)?;
        }
        if let Some(speed) = control.mark_speed {
            let code = self.gateway.set_mark_speed(speed);
            self.setting_applied("set_mark_speed", active.slot, code)?;
        }
        if let Some(delays) = control.delays {
            let code = self
                .gateway
                .set_scanner_delays(delays.jump, delays.mark, delays.polygon);
            self.setting_applied("set_scanner_delays", active.slot, code)?;
        }

        info!(
            "Laser mode {} applied to card {}",
            control.laser_mode, active.card_no
        );
        Ok(())
    }

    fn setting_applied(&mut self, task: &str, slot: u32, code: u32) -> Result<(), RtcError> {
        if code == 0 {
            return Ok(());
        }
        Err(RtcError::ConfigLoadFailed(format!(
            "{} [{}]",
            format_failure(task, slot, i64::from(code), None),
            self.error_text()
        )))
    }

    /// List scheduler for the held card.
    ///
    /// The scheduler borrows the session, so the session cannot be
    /// disconnected while list operations are outstanding.
    ///
    /// # Errors
    /// `ConnectionLost` if the handle is stale.
    pub fn lists(&mut self, handle: &SessionHandle) -> Result<ListScheduler<'_, G>, RtcError> {
        let active = self.validate(handle)?;
        Ok(ListScheduler::new(&mut self.gateway, active.slot))
    }

    fn validate(&self, handle: &SessionHandle) -> Result<ActiveCard, RtcError> {
        match self.active {
            Some(active) if active.generation == handle.generation => Ok(active),
            _ => Err(RtcError::ConnectionLost(format!(
                "session handle for card {} is no longer valid",
                handle.card_no
            ))),
        }
    }

    fn invalidate(&mut self, active: ActiveCard) {
        self.active = None;
        self.state = SessionState::Disconnected;
        unclaim(active.generation);
    }

    fn error_text(&mut self) -> String {
        self.error_mask().message()
    }
}

impl<G: DeviceGateway> Drop for ConnectionSession<G> {
    fn drop(&mut self) {
        if let Some(active) = self.active {
            warn!("Session dropped while holding card {}; releasing", active.card_no);
            self.gateway.release(active.card_no);
            self.invalidate(active);
        }
    }
}

fn append_context(error: RtcError, context: &str) -> RtcError {
    match error {
        RtcError::ConfigLoadFailed(msg) => RtcError::ConfigLoadFailed(format!("{msg}; {context}")),
        other => other,
    }
}
