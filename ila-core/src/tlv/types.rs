//! Wire shapes shared by the TLV editor operations.

/// Pad1 option type (RFC 8200 §4.3).
pub const PAD1: u8 = 0;
/// PadN option type.
pub const PADN: u8 = 1;

/// Maximum padding a single insert/delete can introduce: up to 3 bytes of
/// leading alignment padding plus up to 7 bytes of trailer padding.
pub const MAX_PAD: usize = 3 + 7;

/// Leading-pad length needed to align a TLV's option-data start to `4n + 2`,
/// indexed by `current_offset & 3`.
pub const PAD_TABLE: [usize; 4] = [2, 1, 0, 3];

/// A single non-pad TLV to insert, keyed by option type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub option_type: u8,
    pub data: Vec<u8>,
}

impl Tlv {
    pub fn new(option_type: u8, data: Vec<u8>) -> Self {
        assert!(option_type != PAD1 && option_type != PADN, "pad types are not insertable TLVs");
        Tlv { option_type, data }
    }

    /// Total on-wire size of this TLV: type + length + data.
    pub fn wire_len(&self) -> usize {
        2 + self.data.len()
    }
}

/// An IPv6 hop-by-hop or destination options extension header.
///
/// `body` holds everything after the `hdrlen` byte: the TLV sequence plus
/// trailing padding. Its length is always `8*(hdrlen+1) - 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsHeader {
    pub next_header: u8,
    pub body: Vec<u8>,
}

impl OptionsHeader {
    /// An empty (all-padding, minimum-size) options header.
    pub fn empty() -> Self {
        OptionsHeader {
            next_header: 0,
            body: vec![PAD1; 6],
        }
    }

    /// `hdrlen` field value: total header length in 8-byte units, minus one.
    pub fn hdrlen(&self) -> u8 {
        (((self.body.len() + 2) / 8) - 1) as u8
    }

    /// Total encoded length in bytes, including next_header and hdrlen.
    pub fn total_len(&self) -> usize {
        self.body.len() + 2
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_len());
        out.push(self.next_header);
        out.push(self.hdrlen());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, super::TlvError> {
        if bytes.len() < 8 {
            return Err(super::TlvError::Invalid("options header shorter than minimum 8 bytes"));
        }
        let next_header = bytes[0];
        let hdrlen = bytes[1] as usize;
        let total = (hdrlen + 1) * 8;
        if bytes.len() < total {
            return Err(super::TlvError::Invalid("options header shorter than declared hdrlen"));
        }
        Ok(OptionsHeader {
            next_header,
            body: bytes[2..total].to_vec(),
        })
    }
}
