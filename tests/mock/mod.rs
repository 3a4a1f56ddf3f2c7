//! Test doubles for the collaborator traits.

#![allow(dead_code)]

use zb_modbus::device::{IdentifyError, Platform};
use zb_modbus::error::Error;
use zb_modbus::gpio::{Buttons, Leds};
use zb_modbus::modbus::{
    self, CommandAddr, CommandHandler, DataPacketResponse, JsonCommandRequest, MAX_NUM_REGISTERS,
    ModbusBus, ModbusRequest, ResponseStatus,
};
use zb_modbus::zcl::{
    AttrValue, AttributeStore, ClusterRole, FrameDirection, IncomingCommand, OutgoingFrame,
    ParsedHeader, SendToken, ZclStack,
};

/// Owned copy of a frame handed to the stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    pub dst_addr: u16,
    pub dst_endpoint: u8,
    pub src_endpoint: u8,
    pub cluster_id: u16,
    pub cmd_id: u8,
    pub seq_number: u8,
    pub direction: FrameDirection,
    pub disable_default_response: bool,
    pub payload: Vec<u8>,
    pub token: SendToken,
}

#[derive(Debug, Default)]
pub struct MockStack {
    pub sent: Vec<SentFrame>,
    pub refuse: bool,
}

impl ZclStack for MockStack {
    fn send_command(&mut self, frame: &OutgoingFrame<'_>) -> Result<(), Error> {
        if self.refuse {
            return Err(Error::SendFailed);
        }
        self.sent.push(SentFrame {
            dst_addr: frame.dst_addr,
            dst_endpoint: frame.dst_endpoint,
            src_endpoint: frame.src_endpoint,
            cluster_id: frame.cluster_id,
            cmd_id: frame.cmd_id,
            seq_number: frame.seq_number,
            direction: frame.direction,
            disable_default_response: frame.disable_default_response,
            payload: frame.payload.to_vec(),
            token: frame.token,
        });
        Ok(())
    }
}

/// Attribute table with only the baudrate attribute.
#[derive(Debug, Default)]
pub struct MockAttrs {
    pub baudrate: Option<u8>,
    pub reads: core::cell::Cell<usize>,
}

impl AttributeStore for MockAttrs {
    fn read_attribute(
        &self,
        _endpoint: u8,
        cluster_id: u16,
        role: ClusterRole,
        attr_id: u16,
    ) -> Option<AttrValue> {
        self.reads.set(self.reads.get() + 1);
        if cluster_id == modbus::CLUSTER_ID && role == ClusterRole::Server && attr_id == modbus::ATTR_BAUDRATE_ID {
            self.baudrate.map(AttrValue::Enum8)
        } else {
            None
        }
    }
}

/// Handler that records what it was asked and echoes the body length.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub seen: Vec<u8>,
    pub status: Option<ResponseStatus>,
}

impl CommandHandler for RecordingHandler {
    fn handle_json_command(
        &mut self,
        addr: &CommandAddr,
        request: &JsonCommandRequest,
        resp: &mut DataPacketResponse,
    ) -> ResponseStatus {
        self.seen.push(addr.seq_number);
        resp.fc = request.len();
        self.status.unwrap_or(ResponseStatus::Ok)
    }
}

/// Holding registers `0..8`, initialised to `100 + index`.
#[derive(Debug)]
pub struct MockBus {
    pub registers: [u16; 8],
    pub transactions: usize,
}

impl Default for MockBus {
    fn default() -> Self {
        let mut registers = [0u16; 8];
        for (i, r) in registers.iter_mut().enumerate() {
            *r = 100 + i as u16;
        }
        Self {
            registers,
            transactions: 0,
        }
    }
}

impl ModbusBus for MockBus {
    fn transact(
        &mut self,
        request: &ModbusRequest,
        registers: &mut heapless::Vec<u16, MAX_NUM_REGISTERS>,
    ) -> Result<(), modbus::Exception> {
        self.transactions += 1;
        let start = usize::from(request.addr);
        let end = start + usize::from(request.count);
        let values = self
            .registers
            .get(start..end)
            .ok_or(modbus::Exception::IllegalDataAddress)?;
        for v in values {
            registers
                .push(*v)
                .map_err(|_| modbus::Exception::ServerDeviceFailure)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MockLeds {
    pub state: u32,
    pub writes: usize,
}

impl Leds for MockLeds {
    fn set_leds(&mut self, leds: u32) {
        self.state = leds;
        self.writes += 1;
    }

    fn leds(&self) -> u32 {
        self.state
    }
}

#[derive(Debug, Default)]
pub struct MockButtons {
    pub raw: u32,
}

impl Buttons for MockButtons {
    fn read_raw(&mut self) -> u32 {
        self.raw
    }
}

#[derive(Debug, Default)]
pub struct MockPlatform {
    pub joined: bool,
    pub factory_reset: bool,
    pub busy: bool,
    pub finding_binding: Vec<u8>,
    pub cancelled: usize,
    pub image_confirmed: bool,
    pub reboots: usize,
}

impl Platform for MockPlatform {
    fn is_joined(&self) -> bool {
        self.joined
    }

    fn start_finding_binding(&mut self, endpoint: u8) -> Result<(), IdentifyError> {
        if self.busy {
            return Err(IdentifyError::InvalidState);
        }
        self.finding_binding.push(endpoint);
        Ok(())
    }

    fn cancel_finding_binding(&mut self) {
        self.cancelled += 1;
    }

    fn factory_reset_done(&self) -> bool {
        self.factory_reset
    }

    fn confirm_image(&mut self) {
        self.image_confirmed = true;
    }

    fn reboot(&mut self) {
        self.reboots += 1;
    }
}

/// Header of a JSON command request from `0x1234` endpoint 1 to endpoint 2.
pub fn request_header(seq_number: u8) -> ParsedHeader {
    ParsedHeader {
        cluster_id: modbus::CLUSTER_ID,
        cmd_id: modbus::CMD_JSON_COMMAND_REQ_ID,
        seq_number,
        direction: FrameDirection::ToServer,
        profile_id: zb_modbus::zcl::HA_PROFILE_ID,
        src_addr: 0x1234,
        src_endpoint: 1,
        dst_endpoint: 2,
        ..ParsedHeader::default()
    }
}

/// Length-prefixed request body.
pub fn json_payload(body: &[u8]) -> Vec<u8> {
    let mut payload = vec![body.len() as u8];
    payload.extend_from_slice(body);
    payload
}

pub fn command<'a>(header: ParsedHeader, payload: &'a [u8]) -> IncomingCommand<'a> {
    IncomingCommand::new(header, payload)
}
