//! Card data types.
//!
//! This module defines the value types exchanged with a card:
//! - `CardAddress` - Packed IPv4 address plus logical slot
//! - `CardInfo` / `CardInfoBlock` - Identity snapshot and its raw register block
//! - `ListBuffer` / `ListState` - The two command buffers and their states
//! - `LaserMode` - Laser signal timing mode

use crate::card::consts::{
    CARD_INFO_ACQUIRED, CARD_INFO_ADDRESS, CARD_INFO_BLOCK_LEN, CARD_INFO_FIRMWARE,
    CARD_INFO_SERIAL,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Network address of a card plus the logical slot it is assigned to.
///
/// The raw value uses the card's packing: the first octet of the dotted
/// form lives in the least significant byte, so `"123.0.0.1"` packs to
/// `16777339`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CardAddress {
    raw: u32,
    slot: u32,
}

impl CardAddress {
    /// Build from an already packed address.
    pub const fn from_packed(raw: u32, slot: u32) -> Self {
        Self { raw, slot }
    }

    /// Parse a dotted IPv4 string. Returns `None` for anything else.
    pub fn parse(text: &str, slot: u32) -> Option<Self> {
        let ip: Ipv4Addr = text.trim().parse().ok()?;
        Some(Self::from_packed(u32::from_le_bytes(ip.octets()), slot))
    }

    /// Packed 32-bit representation.
    pub const fn packed(&self) -> u32 {
        self.raw
    }

    /// Logical slot index.
    pub const fn slot(&self) -> u32 {
        self.slot
    }
}

impl fmt::Display for CardAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv4Addr::from(self.raw.to_le_bytes()))
    }
}

/// Raw card info register block as returned by the gateway.
pub type CardInfoBlock = [u32; CARD_INFO_BLOCK_LEN];

/// Snapshot of card identity, read fresh on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Firmware version
    pub firmware_version: u32,
    /// Serial number
    pub serial_number: u32,
    /// Dotted IPv4 address
    pub ip_address: String,
    /// Whether the card reports itself as acquired
    pub is_acquired: bool,
}

impl CardInfo {
    /// Extract the fields from a raw info block.
    pub fn from_block(block: &CardInfoBlock) -> Self {
        let address = CardAddress::from_packed(block[CARD_INFO_ADDRESS], 0);
        Self {
            firmware_version: block[CARD_INFO_FIRMWARE],
            serial_number: block[CARD_INFO_SERIAL],
            ip_address: address.to_string(),
            is_acquired: block[CARD_INFO_ACQUIRED] != 0,
        }
    }
}

/// One of the two alternating command buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ListBuffer {
    /// List 1
    List1,
    /// List 2
    List2,
}

impl ListBuffer {
    /// Both buffers in register order.
    pub const ALL: [ListBuffer; 2] = [ListBuffer::List1, ListBuffer::List2];

    /// Device-side buffer number (1 or 2).
    pub const fn number(self) -> u32 {
        match self {
            ListBuffer::List1 => 1,
            ListBuffer::List2 => 2,
        }
    }

    /// Map a device-side buffer number back to a buffer.
    pub const fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(ListBuffer::List1),
            2 => Some(ListBuffer::List2),
            _ => None,
        }
    }

    pub(crate) const fn index(self) -> u32 {
        match self {
            ListBuffer::List1 => 0,
            ListBuffer::List2 => 1,
        }
    }
}

impl fmt::Display for ListBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list {}", self.number())
    }
}

/// State flag of a list buffer.
///
/// A buffer can show several of these at once in the status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListState {
    /// Accepting commands
    Load,
    /// Closed and ready to execute
    Ready,
    /// Executing
    Busy,
    /// Executed, may be reloaded
    Used,
}

impl ListState {
    /// All states in register order.
    pub const ALL: [ListState; 4] = [
        ListState::Load,
        ListState::Ready,
        ListState::Busy,
        ListState::Used,
    ];

    pub(crate) const fn index(self) -> u32 {
        match self {
            ListState::Load => 0,
            ListState::Ready => 1,
            ListState::Busy => 2,
            ListState::Used => 3,
        }
    }
}

impl fmt::Display for ListState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListState::Load => "LOAD",
            ListState::Ready => "READY",
            ListState::Busy => "BUSY",
            ListState::Used => "USED",
        };
        f.write_str(s)
    }
}

/// Laser signal timing mode, as selected with `set_laser_mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LaserMode {
    /// CO2 mode
    Co2,
    /// YAG mode 1
    Yag1,
    /// YAG mode 2
    Yag2,
    /// YAG mode 3
    Yag3,
    /// Laser mode 4
    Laser4,
    /// YAG mode 5
    #[default]
    Yag5,
    /// Laser mode 6
    Laser6,
}

impl LaserMode {
    /// Mode code passed to the card.
    pub const fn code(self) -> u32 {
        match self {
            LaserMode::Co2 => 0,
            LaserMode::Yag1 => 1,
            LaserMode::Yag2 => 2,
            LaserMode::Yag3 => 3,
            LaserMode::Laser4 => 4,
            LaserMode::Yag5 => 5,
            LaserMode::Laser6 => 6,
        }
    }
}

impl fmt::Display for LaserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LaserMode::Co2 => "CO2",
            LaserMode::Yag1 => "YAG1",
            LaserMode::Yag2 => "YAG2",
            LaserMode::Yag3 => "YAG3",
            LaserMode::Laser4 => "LASER4",
            LaserMode::Yag5 => "YAG5",
            LaserMode::Laser6 => "LASER6",
        };
        f.write_str(s)
    }
}
