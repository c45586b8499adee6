//! RTC Common Library
//!
//! This crate provides the shared building blocks for talking to an
//! Ethernet-attached RTC laser-scanning controller card.
//!
//! # Module Structure
//!
//! - [`card`] - Card types, status register codec, error type and the
//!   `DeviceGateway` contract implemented by hardware backends
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rtc_common::card::status::{decode_errors, decode_list_status};
//!
//! let errors = decode_errors(0b1001);
//! assert_eq!(errors.message(), "board not found no response");
//!
//! let lists = decode_list_status(0b0000_0101);
//! assert_eq!(lists.pairs().len(), 2);
//! ```

pub mod card;
pub mod config;
pub mod prelude;
