//! Device gateway implementations.
//!
//! - [`simulation`] - Software card for development and testing
//!
//! # Adding New Gateways
//!
//! 1. Create a new submodule under `gateways/`
//! 2. Implement the `DeviceGateway` trait from `rtc_common::card::gateway`
//! 3. Register it in [`register_all_gateways`]

pub mod simulation;

use crate::gateway_registry::GatewayRegistry;

/// Register all built-in gateways.
pub fn register_all_gateways(registry: &mut GatewayRegistry) {
    registry.register("simulation", simulation::create_gateway);
}
