//! Card-level types, constants and contracts.
//!
//! This module contains everything needed to describe one RTC card
//! independently of how it is driven.

pub mod consts;
pub mod error;
pub mod gateway;
pub mod status;
pub mod types;
