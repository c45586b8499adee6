//! Prelude module for common re-exports.
//!
//! ```rust
//! use rtc_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControlConfig, LogLevel, ScannerDelays, SessionConfig, SharedConfig,
};

// ─── Card ───────────────────────────────────────────────────────────
pub use crate::card::consts::CARD_SLOT;
pub use crate::card::error::RtcError;
pub use crate::card::gateway::{DeviceGateway, GatewayFactory};
pub use crate::card::status::{
    ErrorMask, ListStatus, decode_errors, decode_list_status, format_failure,
};
pub use crate::card::types::{
    CardAddress, CardInfo, CardInfoBlock, LaserMode, ListBuffer, ListState,
};
