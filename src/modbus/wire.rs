//! On-the-wire payloads of the JSON command and its response.
//!
//! ```text
//! request:   | len: u8 | data: len bytes (<= 82) | padding... |
//! response:  | len: u8 | fc: u8 | slave_id: u8 | addr: u16 | err: i16 | nb_regs: u8 | regs: u16 * nb_regs |
//! ```
//!
//! Multi-byte fields are little endian, as everywhere in ZCL. The response
//! header is packed (7 bytes), which is what bounds a response to
//! [`MAX_NUM_REGISTERS`] registers.

use super::{MAX_NUM_REGISTERS, MAX_STRING_LENGTH, RESPONSE_HEADER_LEN, ResponseStatus};
use crate::error::Error;
use heapless::Vec;

/// Longest frame either direction can produce: length byte plus body.
pub const MAX_FRAME_LEN: usize = MAX_STRING_LENGTH + 1;

/// A length-prefixed frame as handed to the send primitive.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// JSON command request payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JsonCommandRequest {
    data: Vec<u8, MAX_STRING_LENGTH>,
}

impl JsonCommandRequest {
    /// Build a request from its body bytes.
    pub fn new(data: &[u8]) -> Result<Self, Error> {
        let data = Vec::from_slice(data).map_err(|_| Error::BufferOverflow)?;
        Ok(Self { data })
    }

    /// Parse a request out of a received payload.
    ///
    /// The declared length must not exceed [`MAX_STRING_LENGTH`] and the
    /// buffer must actually hold that many bytes after the length byte.
    /// Anything after them is delimiter padding and is ignored.
    pub fn parse(buf: &[u8]) -> Result<Self, Error> {
        let (&len, rest) = buf.split_first().ok_or(Error::ParseFailure)?;
        let len = usize::from(len);
        if len > MAX_STRING_LENGTH {
            return Err(Error::ParseFailure);
        }
        let body = rest.get(..len).ok_or(Error::ParseFailure)?;
        let data = Vec::from_slice(body).map_err(|_| Error::ParseFailure)?;
        Ok(Self { data })
    }

    /// Declared length of the body.
    pub fn len(&self) -> u8 {
        // Bounded by MAX_STRING_LENGTH.
        self.data.len() as u8
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Body bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length byte followed by the body.
    pub fn to_frame(&self) -> Frame {
        let mut frame = Frame::new();
        // Capacity is exactly one length byte plus MAX_STRING_LENGTH.
        let _ = frame.push(self.len());
        let _ = frame.extend_from_slice(&self.data);
        frame
    }
}

/// Result of one Modbus transaction, sent back as the JSON command response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataPacketResponse {
    /// Modbus function code.
    pub fc: u8,
    /// Target device on the Modbus bus.
    pub slave_id: u8,
    /// First register address.
    pub addr: u16,
    /// 0 on success, the exception code on a bus exception, negative otherwise.
    pub err: i16,
    /// Register values; the length is the register count on the wire.
    pub registers: Vec<u16, MAX_NUM_REGISTERS>,
}

impl DataPacketResponse {
    /// Status encoded in `err`.
    pub fn status(&self) -> ResponseStatus {
        ResponseStatus::from_err(self.err)
    }

    /// Packed body length.
    pub fn encoded_len(&self) -> usize {
        RESPONSE_HEADER_LEN + self.registers.len() * 2
    }

    /// Serialize the packed body without the length prefix.
    pub fn encode(&self) -> Vec<u8, MAX_STRING_LENGTH> {
        let mut out = Vec::new();
        // At most 7 + 37 * 2 = 81 bytes, below capacity.
        let _ = out.push(self.fc);
        let _ = out.push(self.slave_id);
        let _ = out.extend_from_slice(&self.addr.to_le_bytes());
        let _ = out.extend_from_slice(&self.err.to_le_bytes());
        let _ = out.push(self.registers.len() as u8);
        for reg in &self.registers {
            let _ = out.extend_from_slice(&reg.to_le_bytes());
        }
        out
    }

    /// Length byte followed by the packed body.
    pub fn to_frame(&self) -> Frame {
        let body = self.encode();
        let mut frame = Frame::new();
        let _ = frame.push(body.len() as u8);
        let _ = frame.extend_from_slice(&body);
        frame
    }

    /// Deserialize a packed body.
    ///
    /// The register count must account for every remaining byte.
    pub fn decode(body: &[u8]) -> Result<Self, Error> {
        if body.len() < RESPONSE_HEADER_LEN {
            return Err(Error::ParseFailure);
        }
        let (header, regs) = body.split_at(RESPONSE_HEADER_LEN);
        let nb_regs = usize::from(header[6]);
        if nb_regs > MAX_NUM_REGISTERS || regs.len() != nb_regs * 2 {
            return Err(Error::ParseFailure);
        }

        let mut registers = Vec::new();
        for pair in regs.chunks_exact(2) {
            registers
                .push(u16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|_| Error::ParseFailure)?;
        }

        Ok(Self {
            fc: header[0],
            slave_id: header[1],
            addr: u16::from_le_bytes([header[2], header[3]]),
            err: i16::from_le_bytes([header[4], header[5]]),
            registers,
        })
    }

    /// Parse a received response frame.
    ///
    /// The length byte must describe the rest of the buffer exactly.
    pub fn parse_frame(buf: &[u8]) -> Result<Self, Error> {
        let (&len, body) = buf.split_first().ok_or(Error::ParseFailure)?;
        if usize::from(len) + 1 != buf.len() {
            return Err(Error::ParseFailure);
        }
        Self::decode(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_parse_keeps_declared_bytes() {
        let buf = [5, b'h', b'e', b'l', b'l', b'o', 0, 0];
        let req = JsonCommandRequest::parse(&buf).unwrap();
        assert_eq!(req.len(), 5);
        assert_eq!(req.data(), b"hello");
        assert_eq!(req.to_frame().as_slice(), &buf[..6]);
    }

    #[test]
    fn test_request_every_valid_length() {
        let mut buf = [0u8; MAX_FRAME_LEN];
        for len in 1..=MAX_STRING_LENGTH {
            buf[0] = len as u8;
            for (i, b) in buf[1..=len].iter_mut().enumerate() {
                *b = b'a' + (i % 26) as u8;
            }
            let req = JsonCommandRequest::parse(&buf[..=len]).unwrap();
            assert_eq!(usize::from(req.len()), len);
            assert_eq!(req.data(), &buf[1..=len]);
            assert_eq!(req.to_frame()[0], len as u8);
        }
    }

    #[test]
    fn test_request_rejects_oversized_length() {
        let mut buf = [0u8; 100];
        buf[0] = 90;
        assert_eq!(JsonCommandRequest::parse(&buf), Err(Error::ParseFailure));
    }

    #[test]
    fn test_request_rejects_truncated_body() {
        assert_eq!(JsonCommandRequest::parse(&[4, b'a', b'b']), Err(Error::ParseFailure));
        assert_eq!(JsonCommandRequest::parse(&[]), Err(Error::ParseFailure));
    }

    #[test]
    fn test_response_layout_is_packed_le() {
        let mut resp = DataPacketResponse {
            fc: 3,
            slave_id: 0x11,
            addr: 0x0102,
            err: -1,
            registers: Vec::new(),
        };
        resp.registers.push(0xBEEF).unwrap();

        let frame = resp.to_frame();
        assert_eq!(
            frame.as_slice(),
            &[9, 3, 0x11, 0x02, 0x01, 0xFF, 0xFF, 1, 0xEF, 0xBE]
        );
        assert_eq!(DataPacketResponse::parse_frame(&frame).unwrap(), resp);
    }

    #[test]
    fn test_full_response_fits_one_frame() {
        let mut resp = DataPacketResponse::default();
        for i in 0..MAX_NUM_REGISTERS {
            resp.registers.push(i as u16).unwrap();
        }
        let frame = resp.to_frame();
        assert_eq!(frame.len(), 82);
        assert_eq!(usize::from(frame[0]), resp.encoded_len());
    }

    #[test]
    fn test_response_frame_length_must_match() {
        let frame = DataPacketResponse::default().to_frame();
        let mut padded: Vec<u8, 16> = Vec::from_slice(&frame).unwrap();
        padded.push(0).unwrap();
        assert_eq!(DataPacketResponse::parse_frame(&padded), Err(Error::ParseFailure));
        assert_eq!(DataPacketResponse::parse_frame(&frame[..frame.len() - 1]), Err(Error::ParseFailure));
    }

    #[test]
    fn test_response_register_count_must_match() {
        // nb_regs says 2, only one register present.
        let body = [3, 1, 0, 0, 0, 0, 2, 0xAA, 0xBB];
        assert_eq!(DataPacketResponse::decode(&body), Err(Error::ParseFailure));
    }
}
