//! RTC card constants.
//!
//! Fixed slot, register layout and manual cross-references used by the
//! session layer.

use static_assertions::const_assert;

/// Logical slot every card is assigned to. One process drives one card.
pub const CARD_SLOT: u32 = 0;

/// Correction table index the correction file is loaded into.
pub const CORRECTION_TABLE: u32 = 1;

/// Correction file interpretation (2D).
pub const CORRECTION_DIMENSIONS: u32 = 2;

/// Position inside a list buffer at which loading starts.
pub const LIST_START_POSITION: u32 = 0;

/// Scope argument for clearing every error bit at once.
pub const CLEAR_ALL_ERRORS: u32 = u32::MAX;

/// Number of words in the card info block.
pub const CARD_INFO_BLOCK_LEN: usize = 16;

/// Card info block: firmware version.
pub const CARD_INFO_FIRMWARE: usize = 0;

/// Card info block: serial number.
pub const CARD_INFO_SERIAL: usize = 1;

/// Card info block: acquisition flag (non-zero when acquired).
pub const CARD_INFO_ACQUIRED: usize = 5;

/// Card info block: packed IPv4 address.
pub const CARD_INFO_ADDRESS: usize = 8;

const_assert!(CARD_INFO_FIRMWARE < CARD_INFO_BLOCK_LEN);
const_assert!(CARD_INFO_SERIAL < CARD_INFO_BLOCK_LEN);
const_assert!(CARD_INFO_ACQUIRED < CARD_INFO_BLOCK_LEN);
const_assert!(CARD_INFO_ADDRESS < CARD_INFO_BLOCK_LEN);

/// Manual page for `acquire_rtc`.
pub const MANUAL_PAGE_ACQUIRE: u32 = 256;

/// Manual page for `load_program_file`.
pub const MANUAL_PAGE_LOAD_PROGRAM: u32 = 479;

/// Manual page for `load_correction_file`.
pub const MANUAL_PAGE_LOAD_CORRECTION: u32 = 473;

/// Manual page for `release_rtc`.
pub const MANUAL_PAGE_RELEASE: u32 = 552;

/// Manual page for `load_list`.
pub const MANUAL_PAGE_LOAD_LIST: u32 = 475;

/// Manual page for `execute_list`.
pub const MANUAL_PAGE_EXECUTE_LIST: u32 = 401;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/rtc/rtc.toml";
