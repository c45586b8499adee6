//! Gateway registry.
//!
//! Provides a `GatewayRegistry` struct for registering and retrieving
//! device gateway factories by name. The registry is constructed at startup
//! and passed where needed; there is no global state.

use rtc_common::card::gateway::{DeviceGateway, GatewayFactory};
use std::collections::HashMap;
use thiserror::Error;

use crate::gateways::register_all_gateways;

/// Error returned when a gateway name is unknown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Gateway not found: {0}")]
pub struct GatewayNotFound(pub String);

/// Registry of available device gateways.
pub struct GatewayRegistry {
    factories: HashMap<&'static str, GatewayFactory>,
}

impl GatewayRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in gateway.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        register_all_gateways(&mut registry);
        registry
    }

    /// Register a gateway factory.
    ///
    /// # Panics
    /// Panics if a gateway with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: GatewayFactory) {
        if self.factories.contains_key(name) {
            panic!("Gateway '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a gateway factory by name.
    pub fn get_factory(&self, name: &str) -> Option<GatewayFactory> {
        self.factories.get(name).copied()
    }

    /// Create a gateway instance by name.
    ///
    /// # Errors
    /// Returns `GatewayNotFound` if no gateway with the given name is registered.
    pub fn create_gateway(&self, name: &str) -> Result<Box<dyn DeviceGateway>, GatewayNotFound> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| GatewayNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered gateway names.
    pub fn list_gateways(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for GatewayRegistry {
    fn default() -> Self {
        Self::new()
    }
}
