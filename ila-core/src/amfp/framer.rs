//! Length-prefixed frame reassembly for a single AMFP connection.

use bytes::BytesMut;

use crate::error::{IlaError, IlaResult};

/// Per-connection framer state. Tracks only how many bytes are needed to
/// complete the frame currently being assembled, mirroring the original
/// `want_bytes` field carried on each connection context.
pub struct Framer {
    buf: BytesMut,
    want_bytes: usize,
}

impl Framer {
    pub fn new() -> Self {
        Framer { buf: BytesMut::new(), want_bytes: 0 }
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pops one complete frame (header included) off the buffer, if one is
    /// ready. Returns `Err` on a malformed common header — the caller must
    /// treat that as fatal for the connection.
    pub fn next_frame(&mut self) -> IlaResult<Option<Vec<u8>>> {
        if self.want_bytes == 0 {
            if self.buf.len() < 3 {
                return Ok(None);
            }
            let declared = ((self.buf[1] as usize) << 8) | self.buf[2] as usize;
            if declared < 3 {
                return Err(IlaError::AmfpProtocol(format!("declared frame length {declared} below minimum 3")));
            }
            self.want_bytes = declared;
        }

        if self.buf.len() < self.want_bytes {
            return Ok(None);
        }

        let frame = self.buf.split_to(self.want_bytes).to_vec();
        self.want_bytes = 0;
        Ok(Some(frame))
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amfp::wire::AmfpMessage;
    use crate::model::Address;

    #[test]
    fn single_frame_decodes_once_complete() {
        let mut framer = Framer::new();
        let msg = AmfpMessage::MapRequest { id_type: 1, identifiers: vec![Address::from_parts(0, 1)] };
        let encoded = msg.encode();
        framer.push(&encoded[..2]);
        assert!(framer.next_frame().unwrap().is_none());
        framer.push(&encoded[2..]);
        let frame = framer.next_frame().unwrap().unwrap();
        assert_eq!(frame, encoded);
        assert!(framer.next_frame().unwrap().is_none());
    }

    #[test]
    fn two_frames_fed_byte_by_byte_decode_in_order() {
        let mut framer = Framer::new();
        let a = AmfpMessage::MapRequest { id_type: 1, identifiers: vec![Address::from_parts(0, 1)] }.encode();
        let b = AmfpMessage::map_info_reply(vec![(Address::UNSPECIFIED, Address::UNSPECIFIED)]).encode();
        let mut stream = a.clone();
        stream.extend_from_slice(&b);

        let mut decoded = Vec::new();
        for byte in stream {
            framer.push(&[byte]);
            while let Some(frame) = framer.next_frame().unwrap() {
                decoded.push(frame);
            }
        }
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn frame_below_minimum_length_is_rejected() {
        let mut framer = Framer::new();
        framer.push(&[1, 0, 2]);
        assert!(framer.next_frame().is_err());
    }
}
