//! Command handlers invoked when a queued record is drained.
//!
//! The dispatcher knows nothing about Modbus itself; it hands the parsed
//! request of a JSON command to a [`CommandHandler`] and sends back whatever
//! response the handler filled in. [`JsonModbusHandler`] is the stock
//! handler: it decodes the JSON body with `serde-json-core` and runs the
//! transaction on a [`ModbusBus`].

use super::queue::CommandAddr;
use super::wire::{DataPacketResponse, JsonCommandRequest};
use super::{Exception, MAX_NUM_REGISTERS, MAX_STRING_LENGTH, ResponseStatus};
use crate::error::Error;
use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Modbus function codes understood by [`JsonModbusHandler`].
pub mod function {
    pub const READ_COILS: u8 = 0x01;
    pub const READ_DISCRETE_INPUTS: u8 = 0x02;
    pub const READ_HOLDING_REGISTERS: u8 = 0x03;
    pub const READ_INPUT_REGISTERS: u8 = 0x04;
    pub const WRITE_SINGLE_COIL: u8 = 0x05;
    pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
    pub const WRITE_MULTIPLE_COILS: u8 = 0x0F;
    pub const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
}

/// Handles the cluster's JSON command.
pub trait CommandHandler {
    /// Process one request and fill `resp`.
    ///
    /// The returned status is written into `resp.err` by the caller, so the
    /// handler does not need to set it.
    fn handle_json_command(
        &mut self,
        addr: &CommandAddr,
        request: &JsonCommandRequest,
        resp: &mut DataPacketResponse,
    ) -> ResponseStatus;
}

/// A Modbus transaction decoded from a JSON command body.
///
/// ```json
/// {"fc":3,"id":1,"addr":100,"n":2}
/// {"fc":16,"id":1,"addr":100,"data":[1,2]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModbusRequest {
    /// Function code.
    pub fc: u8,
    /// Target device.
    #[serde(rename = "id")]
    pub slave_id: u8,
    /// First register or coil address.
    pub addr: u16,
    /// Number of values to read.
    #[serde(rename = "n", default)]
    pub count: u8,
    /// Values to write.
    #[serde(default, skip_serializing_if = "no_values")]
    pub data: Vec<u16, MAX_NUM_REGISTERS>,
}

fn no_values(data: &Vec<u16, MAX_NUM_REGISTERS>) -> bool {
    data.is_empty()
}

impl ModbusRequest {
    /// Decode a JSON command body.
    pub fn from_json(body: &[u8]) -> Result<Self, Error> {
        let (request, _) = serde_json_core::from_slice(body).map_err(|_| Error::ParseFailure)?;
        Ok(request)
    }

    /// Encode as a JSON command request.
    pub fn to_request(&self) -> Result<JsonCommandRequest, Error> {
        let mut buf = [0u8; MAX_STRING_LENGTH];
        let len = serde_json_core::to_slice(self, &mut buf).map_err(|_| Error::BufferOverflow)?;
        JsonCommandRequest::new(&buf[..len])
    }

    fn validate(&self) -> Result<(), Exception> {
        use function::*;

        match self.fc {
            READ_COILS | READ_DISCRETE_INPUTS | READ_HOLDING_REGISTERS | READ_INPUT_REGISTERS => {
                if self.count == 0 || usize::from(self.count) > MAX_NUM_REGISTERS {
                    return Err(Exception::IllegalDataValue);
                }
            }
            WRITE_SINGLE_COIL | WRITE_SINGLE_REGISTER => {
                if self.data.len() != 1 {
                    return Err(Exception::IllegalDataValue);
                }
            }
            WRITE_MULTIPLE_COILS | WRITE_MULTIPLE_REGISTERS => {
                if self.data.is_empty() {
                    return Err(Exception::IllegalDataValue);
                }
            }
            _ => return Err(Exception::IllegalFunction),
        }
        Ok(())
    }
}

/// Access to the serial Modbus bus.
pub trait ModbusBus {
    /// Run one transaction.
    ///
    /// Reads push the values they obtained into `registers`; writes leave it
    /// empty.
    fn transact(
        &mut self,
        request: &ModbusRequest,
        registers: &mut Vec<u16, MAX_NUM_REGISTERS>,
    ) -> Result<(), Exception>;
}

/// Handler that decodes JSON requests and forwards them to a bus.
#[derive(Debug)]
pub struct JsonModbusHandler<B> {
    bus: B,
}

impl<B: ModbusBus> JsonModbusHandler<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}

impl<B: ModbusBus> CommandHandler for JsonModbusHandler<B> {
    fn handle_json_command(
        &mut self,
        addr: &CommandAddr,
        request: &JsonCommandRequest,
        resp: &mut DataPacketResponse,
    ) -> ResponseStatus {
        let req = match ModbusRequest::from_json(request.data()) {
            Ok(req) => req,
            Err(_) => {
                warn!("json command from {} is not a modbus request", addr.src_addr);
                return ResponseStatus::UnknownError;
            }
        };

        resp.fc = req.fc;
        resp.slave_id = req.slave_id;
        resp.addr = req.addr;

        if let Err(e) = req.validate() {
            return ResponseStatus::ModbusError(e);
        }

        match self.bus.transact(&req, &mut resp.registers) {
            Ok(()) => ResponseStatus::Ok,
            Err(e) => {
                resp.registers.clear();
                ResponseStatus::ModbusError(e)
            }
        }
    }
}
