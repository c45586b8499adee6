//! Property-based tests for the status register codec.
//!
//! Error decoding must be total and deterministic, reserved bit 14 must never
//! add text, and list status decoding must map each bit to exactly one
//! (buffer, state) pair.

use proptest::prelude::*;
use rtc_common::card::status::{ErrorMask, decode_errors, decode_list_status};
use rtc_common::card::types::{ListBuffer, ListState};

proptest! {
    #[test]
    fn prop_decode_errors_is_deterministic(raw in any::<u32>()) {
        prop_assert_eq!(decode_errors(raw).message(), decode_errors(raw).message());
        prop_assert_eq!(decode_errors(raw).bits(), raw);
    }

    #[test]
    fn prop_bit_14_never_contributes_text(raw in any::<u32>()) {
        let with = decode_errors(raw | (1 << 14)).message();
        let without = decode_errors(raw & !(1 << 14)).message();
        prop_assert_eq!(with, without);
    }

    #[test]
    fn prop_one_description_per_mapped_bit(raw in any::<u32>()) {
        let mask = decode_errors(raw);
        let described = (0..16)
            .filter(|&bit| bit != 14 && raw & (1 << bit) != 0)
            .count();
        prop_assert_eq!(mask.descriptions().len(), described);
        prop_assert!(!mask.message().contains("  "));
    }

    #[test]
    fn prop_list_pair_count_matches_popcount(raw in any::<u32>()) {
        let status = decode_list_status(raw);
        prop_assert_eq!(status.pairs().len() as u32, (raw & 0xFF).count_ones());
    }
}

#[test]
fn test_bit_descriptions() {
    assert_eq!(ErrorMask::bit_description(0), "board not found");
    assert_eq!(ErrorMask::bit_description(14), "");
    assert_eq!(ErrorMask::bit_description(15), "unsupported platform");
    assert_eq!(ErrorMask::bit_description(40), "");
}

#[test]
fn test_list_status_example() {
    let raw = (1 << 0) | (1 << 2) | (1 << 5);
    let pairs = decode_list_status(raw).pairs();
    assert_eq!(
        pairs,
        vec![
            (ListBuffer::List1, ListState::Load),
            (ListBuffer::List1, ListState::Ready),
            (ListBuffer::List2, ListState::Busy),
        ]
    );
}
