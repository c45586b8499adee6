//! Simulation gateway module.
//!
//! This module provides a software card for development and testing
//! without an RTC card on the network.

mod card;
mod lists;

pub use card::{ControlState, SimulatedCard, SimulationOptions};
pub use lists::ListModel;

use rtc_common::card::gateway::DeviceGateway;

/// Factory function to create a simulated card instance.
pub fn create_gateway() -> Box<dyn DeviceGateway> {
    Box::new(SimulatedCard::new())
}
