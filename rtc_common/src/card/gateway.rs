//! Device gateway trait.
//!
//! This module defines:
//! - `DeviceGateway` trait - The native card SDK surface the session layer needs
//! - `GatewayFactory` type alias - Factory function type
//!
//! Gateways report failure the way the vendor library does: through numeric
//! return codes and the sticky error register. Interpreting those codes is
//! the job of the session layer and [`crate::card::status`].

use crate::card::types::CardInfoBlock;
use std::path::Path;

/// Factory function type for creating gateway instances.
pub type GatewayFactory = fn() -> Box<dyn DeviceGateway>;

/// Trait defining the card SDK surface used by the session layer.
///
/// All calls are synchronous and blocking. A gateway holds no internal
/// lock; callers serialize access.
///
/// # Return conventions
///
/// | Operation | Success | Failure |
/// |-----------|---------|---------|
/// | `init()` | `0` | error bitmask |
/// | `resolve_address()` | packed address | `0` |
/// | `assign_slot()` | card number | `0` |
/// | `acquire()` | the requested card number | anything else |
/// | `release()` | `true` | `false` |
/// | `load_program()` / `load_correction()` | `0` | non-zero code |
/// | `start_list()` | the requested buffer number | anything else |
/// | `execute_list()` | `0` | non-zero code |
/// | `set_laser_mode()` and the other `set_*()` calls | `0` | non-zero code |
pub trait DeviceGateway: Send {
    /// Returns the gateway's identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Initialise the device library.
    fn init(&mut self) -> u32;

    /// Convert a textual address into the packed representation.
    fn resolve_address(&mut self, text: &str) -> u32;

    /// Assign the packed address to a logical slot; returns the card number.
    fn assign_slot(&mut self, address: u32, slot: u32) -> u32;

    /// Claim exclusive control of a card.
    fn acquire(&mut self, card_no: u32) -> u32;

    /// Give up exclusive control of a card.
    fn release(&mut self, card_no: u32) -> bool;

    /// Upload the program file(s).
    fn load_program(&mut self, card_no: u32, path: &Path) -> u32;

    /// Upload a correction file into `table` with `dims` dimensions.
    fn load_correction(&mut self, card_no: u32, path: &Path, table: u32, dims: u32) -> u32;

    /// Read the card serial number.
    fn read_serial(&mut self, card_no: u32) -> u32;

    /// Liveness probe.
    fn check_link(&mut self) -> bool;

    /// Read the sticky error register.
    fn read_error_register(&mut self) -> u32;

    /// Clear the error register bits selected by `scope`.
    fn clear_errors(&mut self, scope: u32);

    /// Read the fixed-size card info block for a slot.
    fn read_card_info_block(&mut self, slot: u32) -> CardInfoBlock;

    /// Open a list buffer for loading at `position`.
    fn start_list(&mut self, buffer_no: u32, position: u32) -> u32;

    /// Close the buffer currently being loaded.
    fn set_end_of_list(&mut self);

    /// Start executing a closed buffer.
    fn execute_list(&mut self, buffer_no: u32) -> u32;

    /// Read the combined list status register.
    fn read_list_status_register(&mut self) -> u32;

    /// Select the laser signal timing mode.
    fn set_laser_mode(&mut self, mode: u32) -> u32;

    /// Write the laser control word.
    fn set_laser_control(&mut self, control: u32) -> u32;

    /// Jump speed in bits/ms.
    fn set_jump_speed(&mut self, speed: f64) -> u32;

    /// Mark speed in bits/ms.
    fn set_mark_speed(&mut self, speed: f64) -> u32;

    /// Jump, mark and polygon delays in 10 µs units.
    fn set_scanner_delays(&mut self, jump: u32, mark: u32, polygon: u32) -> u32;
}

// Lets registry-created `Box<dyn DeviceGateway>` values drive a session
// exactly like a concrete gateway.
impl<G: DeviceGateway + ?Sized> DeviceGateway for Box<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init(&mut self) -> u32 {
        (**self).init()
    }

    fn resolve_address(&mut self, text: &str) -> u32 {
        (**self).resolve_address(text)
    }

    fn assign_slot(&mut self, address: u32, slot: u32) -> u32 {
        (**self).assign_slot(address, slot)
    }

    fn acquire(&mut self, card_no: u32) -> u32 {
        (**self).acquire(card_no)
    }

    fn release(&mut self, card_no: u32) -> bool {
        (**self).release(card_no)
    }

    fn load_program(&mut self, card_no: u32, path: &Path) -> u32 {
        (**self).load_program(card_no, path)
    }

    fn load_correction(&mut self, card_no: u32, path: &Path, table: u32, dims: u32) -> u32 {
        (**self).load_correction(card_no, path, table, dims)
    }

    fn read_serial(&mut self, card_no: u32) -> u32 {
        (**self).read_serial(card_no)
    }

    fn check_link(&mut self) -> bool {
        (**self).check_link()
    }

    fn read_error_register(&mut self) -> u32 {
        (**self).read_error_register()
    }

    fn clear_errors(&mut self, scope: u32) {
        (**self).clear_errors(scope)
    }

    fn read_card_info_block(&mut self, slot: u32) -> CardInfoBlock {
        (**self).read_card_info_block(slot)
    }

    fn start_list(&mut self, buffer_no: u32, position: u32) -> u32 {
        (**self).start_list(buffer_no, position)
    }

    fn set_end_of_list(&mut self) {
        (**self).set_end_of_list()
    }

    fn execute_list(&mut self, buffer_no: u32) -> u32 {
        (**self).execute_list(buffer_no)
    }

    fn read_list_status_register(&mut self) -> u32 {
        (**self).read_list_status_register()
    }

    fn set_laser_mode(&mut self, mode: u32) -> u32 {
        (**self).set_laser_mode(mode)
    }

    fn set_laser_control(&mut self, control: u32) -> u32 {
        (**self).set_laser_control(control)
    }

    fn set_jump_speed(&mut self, speed: f64) -> u32 {
        (**self).set_jump_speed(speed)
    }

    fn set_mark_speed(&mut self, speed: f64) -> u32 {
        (**self).set_mark_speed(speed)
    }

    fn set_scanner_delays(&mut self, jump: u32, mark: u32, polygon: u32) -> u32 {
        (**self).set_scanner_delays(jump, mark, polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::consts::CARD_INFO_BLOCK_LEN;

    /// Card that answers nothing.
    struct AbsentGateway;

    impl DeviceGateway for AbsentGateway {
        fn name(&self) -> &'static str {
            "absent"
        }
        fn init(&mut self) -> u32 {
            1
        }
        fn resolve_address(&mut self, _text: &str) -> u32 {
            0
        }
        fn assign_slot(&mut self, _address: u32, _slot: u32) -> u32 {
            0
        }
        fn acquire(&mut self, _card_no: u32) -> u32 {
            0
        }
        fn release(&mut self, _card_no: u32) -> bool {
            false
        }
        fn load_program(&mut self, _card_no: u32, _path: &Path) -> u32 {
            1
        }
        fn load_correction(&mut self, _card_no: u32, _path: &Path, _table: u32, _dims: u32) -> u32 {
            1
        }
        fn read_serial(&mut self, _card_no: u32) -> u32 {
            0
        }
        fn check_link(&mut self) -> bool {
            false
        }
        fn read_error_register(&mut self) -> u32 {
            1
        }
        fn clear_errors(&mut self, _scope: u32) {}
        fn read_card_info_block(&mut self, _slot: u32) -> CardInfoBlock {
            [0; CARD_INFO_BLOCK_LEN]
        }
        fn start_list(&mut self, _buffer_no: u32, _position: u32) -> u32 {
            0
        }
        fn set_end_of_list(&mut self) {}
        fn execute_list(&mut self, _buffer_no: u32) -> u32 {
            1
        }
        fn read_list_status_register(&mut self) -> u32 {
            0
        }
        fn set_laser_mode(&mut self, _mode: u32) -> u32 {
            1
        }
        fn set_laser_control(&mut self, _control: u32) -> u32 {
            1
        }
        fn set_jump_speed(&mut self, _speed: f64) -> u32 {
            1
        }
        fn set_mark_speed(&mut self, _speed: f64) -> u32 {
            1
        }
        fn set_scanner_delays(&mut self, _jump: u32, _mark: u32, _polygon: u32) -> u32 {
            1
        }
    }

    fn create_absent() -> Box<dyn DeviceGateway> {
        Box::new(AbsentGateway)
    }

    #[test]
    fn test_gateway_is_object_safe() {
        let factory: GatewayFactory = create_absent;
        let mut gateway = factory();
        assert_eq!(gateway.name(), "absent");
        assert!(!gateway.check_link());
        assert_eq!(gateway.read_card_info_block(0), [0; CARD_INFO_BLOCK_LEN]);
        assert_ne!(gateway.set_laser_mode(5), 0);
    }
}
