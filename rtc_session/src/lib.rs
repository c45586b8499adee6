//! # RTC Session Library
//!
//! Exclusive session management and dual-buffer list scheduling for an
//! Ethernet-attached RTC laser-scanning controller card.
//!
//! Gateways implement the `DeviceGateway` trait defined in
//! `rtc_common::card::gateway`.
//!
//! # Module Structure
//!
//! - [`session`] - ConnectionSession state machine and SessionHandle
//! - [`list`] - ListScheduler for the two command buffers
//! - [`gateway_registry`] - Gateway factory registration
//! - [`gateways`] - Gateway implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        rtc_session                               │
//! │  ┌──────────────┐    ┌───────────────────┐    ┌───────────────┐  │
//! │  │ StatusCodec  │◄──►│ ConnectionSession │◄──►│ Gateway       │  │
//! │  │ (rtc_common) │    │  └ ListScheduler  │    │ Registry      │  │
//! │  └──────────────┘    └─────────┬─────────┘    └───────────────┘  │
//! │                                │                                 │
//! │                                ▼                                 │
//! │                       ┌────────────────┐                         │
//! │                       │ DeviceGateway  │ (simulation, native)    │
//! │                       │ trait          │                         │
//! │                       └────────────────┘                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use rtc_session::gateways::simulation::SimulatedCard;
//! use rtc_session::session::ConnectionSession;
//! use rtc_common::card::types::ListBuffer;
//! use std::path::Path;
//!
//! let mut session = ConnectionSession::new(SimulatedCard::new());
//! let handle = session
//!     .connect("172.23.17.192", Path::new("program"), Path::new("D2_2034.ct5"))
//!     .unwrap();
//!
//! let mut lists = session.lists(&handle).unwrap();
//! lists.begin_load(ListBuffer::List1).unwrap();
//! lists.end_load();
//! drop(lists);
//!
//! session.disconnect(&handle).unwrap();
//! ```

#![deny(missing_docs)]

pub mod gateway_registry;
pub mod gateways;
pub mod list;
pub mod session;

// Re-export key types for convenience
pub use crate::gateway_registry::{GatewayNotFound, GatewayRegistry};
pub use crate::list::ListScheduler;
pub use crate::session::{ConnectionSession, SessionHandle, SessionState};
