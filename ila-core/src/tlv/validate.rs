use super::types::{OptionsHeader, PAD1, PADN};
use super::TlvError;

/// Walks every TLV in `opt`, checking that each non-pad TLV's declared
/// length fits within the body. Pad1/PadN entries are always well-formed by
/// construction (their length is self-describing and bounded).
pub fn validate(opt: &OptionsHeader) -> Result<(), TlvError> {
    validate_body(&opt.body)
}

pub(super) fn validate_body(body: &[u8]) -> Result<(), TlvError> {
    let mut offset = 0usize;
    while offset < body.len() {
        let opt_type = body[offset];
        if opt_type == PAD1 {
            offset += 1;
            continue;
        }
        if offset + 2 > body.len() {
            return Err(TlvError::Invalid("TLV header truncated"));
        }
        let data_len = body[offset + 1] as usize;
        if offset + 2 > body.len() {
            return Err(TlvError::Invalid("TLV offset exceeds option length"));
        }
        if offset + 2 + data_len > body.len() {
            return Err(TlvError::Invalid("TLV data exceeds option length"));
        }
        if opt_type == PADN {
            offset += 2 + data_len;
            continue;
        }
        offset += 2 + data_len;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::types::Tlv;
    use super::*;

    #[test]
    fn empty_header_validates() {
        let opt = OptionsHeader::empty();
        assert!(validate(&opt).is_ok());
    }

    #[test]
    fn truncated_tlv_is_rejected() {
        let opt = OptionsHeader {
            next_header: 0,
            body: vec![0x3e, 0x05, 0x01, 0x02],
        };
        assert!(validate(&opt).is_err());
    }

    #[test]
    fn well_formed_tlv_validates() {
        let opt = OptionsHeader {
            next_header: 0,
            body: vec![0x3e, 0x02, 0xab, 0xcd, PAD1, PAD1],
        };
        assert!(validate(&opt).is_ok());
        let _ = Tlv::new(0x3e, vec![0xab, 0xcd]);
    }
}
