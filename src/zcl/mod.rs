//! Zigbee Cluster Library (ZCL) definitions shared by the cluster glue.
//!
//! The protocol stack itself is external. This module only models what the
//! stack hands over (a parsed frame header plus payload bytes) and what the
//! cluster hands back (an outgoing frame description).

#![allow(missing_docs)]
#![deny(unsafe_code)]

pub mod basic;
pub mod stack;

pub use stack::{AttributeStore, SendStatus, ZclStack};

/// Home Automation profile identifier.
pub const HA_PROFILE_ID: u16 = 0x0104;

/// Global `ClusterRevision` attribute identifier.
pub const ATTR_GLOBAL_CLUSTER_REVISION_ID: u16 = 0xFFFD;

/// Direction of a ZCL frame relative to the cluster roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameDirection {
    /// Client to server.
    #[default]
    ToServer,
    /// Server to client.
    ToClient,
}

/// Side of a cluster hosted on an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClusterRole {
    /// Server side: owns attributes and receives requests.
    Server,
    /// Client side: issues requests.
    Client,
}

/// Destination addressing mode of an outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddrMode {
    /// 16-bit network short address with endpoint.
    Short,
    /// 16-bit group address, no endpoint.
    Group,
    /// Destination resolved through the binding table.
    NoAddrNoEndpoint,
}

/// Header fields of an incoming ZCL command, as parsed by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParsedHeader {
    pub cluster_id: u16,
    pub cmd_id: u8,
    pub seq_number: u8,
    pub direction: FrameDirection,
    pub disable_default_response: bool,
    pub profile_id: u16,
    /// Short address of the sender.
    pub src_addr: u16,
    pub src_endpoint: u8,
    pub dst_endpoint: u8,
}

/// A command delivered by the stack's command-received callback.
///
/// The payload borrows the stack's transient buffer and must be copied out
/// before the callback returns.
#[derive(Debug, Clone, Copy)]
pub struct IncomingCommand<'a> {
    pub header: ParsedHeader,
    pub payload: &'a [u8],
}

impl<'a> IncomingCommand<'a> {
    /// Wrap a parsed header and its payload.
    pub fn new(header: ParsedHeader, payload: &'a [u8]) -> Self {
        Self { header, payload }
    }
}

/// Correlates an outgoing frame with its later completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SendToken {
    /// Pool slot the transaction lives in.
    pub slot: u8,
    /// Transmission counter of the issuing dispatcher. Distinguishes
    /// successive transactions that reuse a slot.
    pub generation: u16,
}

/// A cluster-specific command ready to be framed and transmitted.
#[derive(Debug, Clone, Copy)]
pub struct OutgoingFrame<'a> {
    pub dst_addr: u16,
    pub dst_addr_mode: AddrMode,
    pub dst_endpoint: u8,
    pub src_endpoint: u8,
    pub profile_id: u16,
    pub cluster_id: u16,
    pub cmd_id: u8,
    pub seq_number: u8,
    pub direction: FrameDirection,
    pub disable_default_response: bool,
    pub payload: &'a [u8],
    /// Handed back by the stack when transmission finishes.
    pub token: SendToken,
}

/// Value of a single attribute read from the stack's attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttrValue {
    Enum8(u8),
    U8(u8),
    U16(u16),
}

impl AttrValue {
    /// Decode a raw little-endian attribute value of the given width.
    pub fn from_le_bytes(raw: &[u8]) -> Option<Self> {
        match raw {
            [b] => Some(AttrValue::U8(*b)),
            [lo, hi] => Some(AttrValue::U16(u16::from_le_bytes([*lo, *hi]))),
            _ => None,
        }
    }
}
