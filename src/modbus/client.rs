//! Client side of the cluster: issuing JSON commands to a remote bridge.

use super::wire::{DataPacketResponse, JsonCommandRequest};
use super::{CLUSTER_ID, CLUSTER_REVISION_MAX, CMD_JSON_COMMAND_REQ_ID, CMD_JSON_COMMAND_RESP_ID};
use crate::error::Error;
use crate::zcl::{AddrMode, FrameDirection, OutgoingFrame, ParsedHeader, SendToken, ZclStack};

/// Where and how to send a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub addr: u16,
    pub addr_mode: AddrMode,
    pub endpoint: u8,
    /// Local endpoint the request is sent from.
    pub src_endpoint: u8,
    pub profile_id: u16,
    pub disable_default_response: bool,
}

/// Send a JSON command request.
///
/// `peer_revision` is the cluster revision reported by the remote server, if
/// known. Only revision 1 framing exists so far, which every revision falls
/// back to.
pub fn send_json_command<Z: ZclStack + ?Sized>(
    stack: &mut Z,
    dst: &Destination,
    peer_revision: Option<u16>,
    seq_number: u8,
    request: &JsonCommandRequest,
    token: SendToken,
) -> Result<(), Error> {
    let rev = peer_revision.unwrap_or(CLUSTER_REVISION_MAX);
    trace!("sending json command, peer revision {}", rev);

    if rev > CLUSTER_REVISION_MAX {
        debug!("peer revision {} is newer, using revision 1 framing", rev);
    }
    send_json_command_rev1(stack, dst, seq_number, request, token)
}

fn send_json_command_rev1<Z: ZclStack + ?Sized>(
    stack: &mut Z,
    dst: &Destination,
    seq_number: u8,
    request: &JsonCommandRequest,
    token: SendToken,
) -> Result<(), Error> {
    let payload = request.to_frame();
    let frame = OutgoingFrame {
        dst_addr: dst.addr,
        dst_addr_mode: dst.addr_mode,
        dst_endpoint: dst.endpoint,
        src_endpoint: dst.src_endpoint,
        profile_id: dst.profile_id,
        cluster_id: CLUSTER_ID,
        cmd_id: CMD_JSON_COMMAND_REQ_ID,
        seq_number,
        direction: FrameDirection::ToServer,
        disable_default_response: dst.disable_default_response,
        payload: &payload,
        token,
    };
    stack.send_command(&frame)
}

/// Decode a JSON command response delivered to the client side.
pub fn parse_json_command_response(header: &ParsedHeader, payload: &[u8]) -> Result<DataPacketResponse, Error> {
    if header.cluster_id != CLUSTER_ID
        || header.direction != FrameDirection::ToClient
        || header.cmd_id != CMD_JSON_COMMAND_RESP_ID
    {
        return Err(Error::NotForCluster);
    }
    DataPacketResponse::parse_frame(payload)
}
