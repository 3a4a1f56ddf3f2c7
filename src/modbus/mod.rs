//! # Modbus vendor cluster
//!
//! A manufacturer-specific ZCL cluster (`0xFC00`) that tunnels Modbus
//! requests, encoded as short JSON strings, from the Zigbee network to a
//! serial Modbus bus attached to the device.
//!
//! ## Design
//!
//! Commands arrive from the stack's command callback and must not be worked
//! on there. Each one is copied into a slot of a fixed [`pool::SlotPool`],
//! queued on the [`queue::Dispatcher`], and later drained one per scheduler
//! turn. A record moves through these states:
//!
//! ```text
//! Received ──▶ Queued ──▶ Processing ──▶ AwaitingSend ──▶ Completed
//!                              │                              ▲
//!                              └──── not processed / error ───┘
//! ```
//!
//! The slot is released on every path into `Completed`, including the send
//! timeout, so a stalled transmission cannot starve the pool.

#![allow(missing_docs)]
#![deny(unsafe_code)]

use crate::error::Error;
use crate::zcl::{ATTR_GLOBAL_CLUSTER_REVISION_ID, AttrValue, ClusterRole};

pub mod client;
pub mod handler;
pub mod pool;
pub mod queue;
pub mod wire;

pub use handler::{CommandHandler, JsonModbusHandler, ModbusBus, ModbusRequest};
pub use pool::{SlotId, SlotPool};
pub use queue::{CommandAddr, CommandRecord, Dispatcher, DrainOutcome, QueueTask, RecordState};
pub use wire::{DataPacketResponse, JsonCommandRequest};

/// Cluster identifier of the Modbus cluster.
pub const CLUSTER_ID: u16 = 0xFC00;

/// Baudrate attribute identifier.
pub const ATTR_BAUDRATE_ID: u16 = 0x0000;

/// Implemented cluster revision.
pub const CLUSTER_REVISION_DEFAULT: u16 = 0x0001;
/// Highest cluster revision this implementation accepts.
pub const CLUSTER_REVISION_MAX: u16 = CLUSTER_REVISION_DEFAULT;

/// JSON command request identifier.
pub const CMD_JSON_COMMAND_REQ_ID: u8 = 0xF1;
/// JSON command response identifier.
pub const CMD_JSON_COMMAND_RESP_ID: u8 = 0xF2;

/// Longest request or response body, in bytes.
pub const MAX_STRING_LENGTH: usize = 82;

/// Packed size of the response header preceding the register values.
pub const RESPONSE_HEADER_LEN: usize = 7;

/// Number of 16-bit registers that fit in one response.
pub const MAX_NUM_REGISTERS: usize = (MAX_STRING_LENGTH - RESPONSE_HEADER_LEN) / 2;

/// Default capacity of the slot pool and the dispatch queue.
pub const MAX_FIFO_SIZE: usize = 10;

/// How long a response transmission may stay outstanding.
pub const SEND_TIMEOUT_MS: u32 = 1000;

/// Serial line speed of the attached Modbus bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Baudrate {
    B9600 = 0,
    #[default]
    B19200 = 1,
    B115200 = 2,
}

impl Baudrate {
    /// Smallest raw attribute value.
    pub const MIN_VALUE: u8 = Baudrate::B9600 as u8;
    /// Largest raw attribute value.
    pub const MAX_VALUE: u8 = Baudrate::B115200 as u8;

    /// Decode the raw enum attribute value.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Baudrate::B9600),
            1 => Some(Baudrate::B19200),
            2 => Some(Baudrate::B115200),
            _ => None,
        }
    }

    /// Bits per second.
    pub fn bps(self) -> u32 {
        match self {
            Baudrate::B9600 => 9600,
            Baudrate::B19200 => 19200,
            Baudrate::B115200 => 115_200,
        }
    }
}

impl TryFrom<AttrValue> for Baudrate {
    type Error = Error;

    fn try_from(value: AttrValue) -> Result<Self, Self::Error> {
        match value {
            AttrValue::Enum8(raw) | AttrValue::U8(raw) => {
                Baudrate::from_raw(raw).ok_or(Error::InvalidValue)
            }
            AttrValue::U16(_) => Err(Error::InvalidValue),
        }
    }
}

/// Modbus exception responses, numbered as on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Exception {
    IllegalFunction = 0x01,
    IllegalDataAddress = 0x02,
    IllegalDataValue = 0x03,
    ServerDeviceFailure = 0x04,
    Acknowledge = 0x05,
    ServerDeviceBusy = 0x06,
    NegativeAcknowledge = 0x07,
    MemoryParityError = 0x08,
    GatewayPathUnavailable = 0x0A,
    GatewayTargetFailedToRespond = 0x0B,
}

impl Exception {
    /// Decode an exception code.
    pub fn from_code(code: u8) -> Option<Self> {
        let exception = match code {
            0x01 => Exception::IllegalFunction,
            0x02 => Exception::IllegalDataAddress,
            0x03 => Exception::IllegalDataValue,
            0x04 => Exception::ServerDeviceFailure,
            0x05 => Exception::Acknowledge,
            0x06 => Exception::ServerDeviceBusy,
            0x07 => Exception::NegativeAcknowledge,
            0x08 => Exception::MemoryParityError,
            0x0A => Exception::GatewayPathUnavailable,
            0x0B => Exception::GatewayTargetFailedToRespond,
            _ => return None,
        };
        Some(exception)
    }
}

/// Overall status carried by a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseStatus {
    Ok,
    ModbusError(Exception),
    UnknownError,
}

impl ResponseStatus {
    /// `err` value meaning "failed for a reason other than a bus exception".
    pub const UNKNOWN_ERROR_CODE: i16 = -1;

    /// Encode as the signed `err` field of a response.
    pub fn to_err(self) -> i16 {
        match self {
            ResponseStatus::Ok => 0,
            ResponseStatus::ModbusError(e) => i16::from(e as u8),
            ResponseStatus::UnknownError => Self::UNKNOWN_ERROR_CODE,
        }
    }

    /// Decode the signed `err` field of a response.
    pub fn from_err(err: i16) -> Self {
        match err {
            0 => ResponseStatus::Ok,
            1..=0xFF => Exception::from_code(err as u8)
                .map(ResponseStatus::ModbusError)
                .unwrap_or(ResponseStatus::UnknownError),
            _ => ResponseStatus::UnknownError,
        }
    }
}

/// Commands a role receives and generates, for command discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLists {
    pub received: &'static [u8],
    pub generated: &'static [u8],
}

const JSON_COMMANDS: &[u8] = &[CMD_JSON_COMMAND_REQ_ID];

/// Command lists reported by the given side of the cluster.
pub fn command_lists(role: ClusterRole) -> CommandLists {
    match role {
        ClusterRole::Server => CommandLists {
            received: JSON_COMMANDS,
            generated: &[],
        },
        ClusterRole::Client => CommandLists {
            received: &[],
            generated: JSON_COMMANDS,
        },
    }
}

/// Validate an attribute write before the stack stores it.
///
/// Both roles share the same rules.
pub fn check_value(role: ClusterRole, attr_id: u16, _endpoint: u8, value: &[u8]) -> Result<(), Error> {
    match (role, attr_id) {
        (_, ATTR_GLOBAL_CLUSTER_REVISION_ID) => {
            let rev = match AttrValue::from_le_bytes(value) {
                Some(AttrValue::U16(rev)) => rev,
                _ => return Err(Error::InvalidValue),
            };
            if rev > CLUSTER_REVISION_MAX {
                return Err(Error::InvalidValue);
            }
            Ok(())
        }
        (ClusterRole::Server, ATTR_BAUDRATE_ID) => match value {
            [raw] if (Baudrate::MIN_VALUE..=Baudrate::MAX_VALUE).contains(raw) => Ok(()),
            _ => Err(Error::InvalidValue),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_registers_from_string_length() {
        assert_eq!(MAX_NUM_REGISTERS, 37);
    }

    #[test]
    fn test_baudrate_attribute() {
        assert_eq!(Baudrate::default(), Baudrate::B19200);
        assert_eq!(Baudrate::try_from(AttrValue::Enum8(2)), Ok(Baudrate::B115200));
        assert_eq!(Baudrate::try_from(AttrValue::Enum8(3)), Err(Error::InvalidValue));
        assert_eq!(Baudrate::B9600.bps(), 9600);
    }

    #[test]
    fn test_check_cluster_revision() {
        let ok = 1u16.to_le_bytes();
        let too_new = 2u16.to_le_bytes();
        assert!(check_value(ClusterRole::Server, ATTR_GLOBAL_CLUSTER_REVISION_ID, 2, &ok).is_ok());
        assert_eq!(
            check_value(ClusterRole::Client, ATTR_GLOBAL_CLUSTER_REVISION_ID, 2, &too_new),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn test_check_baudrate_range() {
        assert!(check_value(ClusterRole::Server, ATTR_BAUDRATE_ID, 2, &[2]).is_ok());
        assert_eq!(
            check_value(ClusterRole::Server, ATTR_BAUDRATE_ID, 2, &[3]),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn test_command_lists_mirror_each_other() {
        let srv = command_lists(ClusterRole::Server);
        let cli = command_lists(ClusterRole::Client);
        assert_eq!(srv.received, cli.generated);
        assert!(srv.generated.is_empty());
        assert!(cli.received.is_empty());
    }

    #[test]
    fn test_response_status_codes() {
        assert_eq!(ResponseStatus::Ok.to_err(), 0);
        assert_eq!(ResponseStatus::ModbusError(Exception::IllegalDataAddress).to_err(), 2);
        assert_eq!(ResponseStatus::from_err(0x0B), ResponseStatus::ModbusError(Exception::GatewayTargetFailedToRespond));
        assert_eq!(ResponseStatus::from_err(9), ResponseStatus::UnknownError);
        assert_eq!(ResponseStatus::from_err(-1), ResponseStatus::UnknownError);
    }
}
