//! Status register codec.
//!
//! Pure decoding of the card's error register and list status register.
//! Both registers are flag sets: several bits can be asserted at once and
//! none of them exclude each other. Nothing in this module performs I/O or
//! returns an error.

use crate::card::types::{ListBuffer, ListState};
use bitflags::bitflags;

bitflags! {
    /// Fault bits of the card error register.
    ///
    /// Unknown bits are retained by [`decode_errors`] so that nothing the
    /// card reports is dropped; they simply carry no description.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorMask: u32 {
        /// No board found at the requested address (or no PCIe board).
        const NO_CARD               = 1 << 0;
        /// Board is owned by another process.
        const ACCESS_DENIED         = 1 << 1;
        /// Command could not be forwarded to the board.
        const SEND_ERROR            = 1 << 2;
        /// Board did not answer.
        const TIMEOUT               = 1 << 3;
        /// Invalid parameter.
        const PARAM_ERROR           = 1 << 4;
        /// List processing active, command refused.
        const BUSY                  = 1 << 5;
        /// Invalid pointer.
        const REJECTED              = 1 << 6;
        /// Command ignored.
        const IGNORED               = 1 << 7;
        /// Firmware / library version mismatch.
        const VERSION_MISMATCH      = 1 << 8;
        /// Download verification failed.
        const VERIFY_ERROR          = 1 << 9;
        /// Protocol mismatch.
        const TYPE_REJECTED         = 1 << 10;
        /// Memory allocation failed.
        const OUT_OF_MEMORY         = 1 << 11;
        /// Download error.
        const DOWNLOAD_ERROR        = 1 << 12;
        /// General Ethernet error.
        const ETH_ERROR             = 1 << 13;
        /// Unsupported platform.
        const UNSUPPORTED_PLATFORM  = 1 << 15;
    }
}

/// Descriptions for bits 0..=15. Bit 14 is reserved.
const ERROR_DESCRIPTIONS: [&str; 16] = [
    "board not found",
    "access denied",
    "command not forwarded",
    "no response",
    "invalid parameter",
    "busy",
    "invalid pointer",
    "command ignored",
    "version mismatch",
    "download verification failed",
    "protocol mismatch",
    "memory allocation failed",
    "download error",
    "general Ethernet error",
    "",
    "unsupported platform",
];

impl ErrorMask {
    /// Bits an initialisation may report on an Ethernet-only host without
    /// anything being wrong: no PCIe board, and the PCIe version check
    /// that comes with it.
    pub const BENIGN_INIT: Self =
        Self::from_bits_truncate(Self::NO_CARD.bits() | Self::VERSION_MISMATCH.bits());

    /// Description of a single bit, empty for reserved or unmapped bits.
    pub fn bit_description(bit: u32) -> &'static str {
        ERROR_DESCRIPTIONS.get(bit as usize).copied().unwrap_or("")
    }

    /// Descriptions of all set bits in ascending bit order, reserved bits skipped.
    pub fn descriptions(&self) -> Vec<&'static str> {
        let raw = self.bits();
        (0..u32::BITS)
            .filter(|bit| raw & (1 << bit) != 0)
            .map(Self::bit_description)
            .filter(|text| !text.is_empty())
            .collect()
    }

    /// Composite human-readable message, space-separated.
    ///
    /// Reserved and unmapped bits produce neither text nor a separator.
    pub fn message(&self) -> String {
        self.descriptions().join(" ")
    }

    /// Returns true if every set bit is one an Ethernet-only host may ignore
    /// at initialisation.
    #[inline]
    pub const fn is_benign_init(&self) -> bool {
        self.difference(Self::BENIGN_INIT).is_empty()
    }
}

impl Default for ErrorMask {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Combined list status register (2 buffers x 4 states).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ListStatus: u8 {
        /// List 1 is loading.
        const LIST1_LOAD  = 0x01;
        /// List 2 is loading.
        const LIST2_LOAD  = 0x02;
        /// List 1 is ready.
        const LIST1_READY = 0x04;
        /// List 2 is ready.
        const LIST2_READY = 0x08;
        /// List 1 is executing.
        const LIST1_BUSY  = 0x10;
        /// List 2 is executing.
        const LIST2_BUSY  = 0x20;
        /// List 1 has been executed.
        const LIST1_USED  = 0x40;
        /// List 2 has been executed.
        const LIST2_USED  = 0x80;
    }
}

impl ListStatus {
    /// Flag for one (buffer, state) pair.
    pub const fn flag(buffer: ListBuffer, state: ListState) -> Self {
        Self::from_bits_truncate(1 << (state.index() * 2 + buffer.index()))
    }

    /// Returns true if the given pair is asserted.
    pub fn has(&self, buffer: ListBuffer, state: ListState) -> bool {
        self.contains(Self::flag(buffer, state))
    }

    /// All asserted pairs in ascending bit order.
    pub fn pairs(&self) -> Vec<(ListBuffer, ListState)> {
        ListState::ALL
            .iter()
            .flat_map(|&state| ListBuffer::ALL.iter().map(move |&buffer| (buffer, state)))
            .filter(|&(buffer, state)| self.has(buffer, state))
            .collect()
    }

    /// States asserted for one buffer, in register order.
    pub fn states_of(&self, buffer: ListBuffer) -> Vec<ListState> {
        ListState::ALL
            .into_iter()
            .filter(|&state| self.has(buffer, state))
            .collect()
    }

    /// Returns true if the buffer is neither loading nor executing.
    pub fn is_free(&self, buffer: ListBuffer) -> bool {
        !self.has(buffer, ListState::Load) && !self.has(buffer, ListState::Busy)
    }

    /// First buffer that is neither loading nor executing.
    pub fn free_buffer(&self) -> Option<ListBuffer> {
        ListBuffer::ALL
            .into_iter()
            .find(|&buffer| self.is_free(buffer))
    }
}

impl Default for ListStatus {
    fn default() -> Self {
        Self::empty()
    }
}

/// Decode the raw error register. Unknown bits are kept.
pub fn decode_errors(raw: u32) -> ErrorMask {
    ErrorMask::from_bits_retain(raw)
}

/// Decode the raw list status register. Only the low 8 bits carry meaning.
pub fn decode_list_status(raw: u32) -> ListStatus {
    ListStatus::from_bits_truncate((raw & 0xFF) as u8)
}

/// Build a diagnostic line for a failed card operation.
pub fn format_failure(task: &str, card: u32, code: i64, manual_page: Option<u32>) -> String {
    match manual_page {
        Some(page) => format!(
            "{task} failed on card {card} with code {code} (see RTC manual page {page})"
        ),
        None => format!("{task} failed on card {card} with code {code}"),
    }
}
