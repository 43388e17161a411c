use super::find::find;
use super::types::{OptionsHeader, PAD1, PADN, PAD_TABLE};
use super::{last_non_pad_end, pad_to_eight, write_pad, TlvError};

/// Removes the TLV of type `target_type` from `opt`.
///
/// Fails with [`TlvError::NotFound`] if no such TLV exists. If removing it
/// would leave only padding behind, returns a minimal empty header.
pub fn delete(opt: &OptionsHeader, target_type: u8) -> Result<OptionsHeader, TlvError> {
    let result = find(opt, target_type);
    if !result.found {
        return Err(TlvError::NotFound);
    }

    let body = &opt.body;
    let mut suffix_start = result.end;
    while suffix_start < body.len() {
        match body[suffix_start] {
            PAD1 => suffix_start += 1,
            PADN => {
                let len = body[suffix_start + 1] as usize;
                suffix_start += 2 + len;
            }
            _ => break,
        }
    }
    let tail_end = suffix_start + last_non_pad_end(&body[suffix_start..]);

    if result.pad_start == 0 && tail_end == suffix_start {
        return Ok(OptionsHeader::empty());
    }

    let prefix = &body[..result.pad_start];
    let suffix = &body[suffix_start..tail_end];

    let mut new_body = Vec::with_capacity(prefix.len() + suffix.len() + super::MAX_PAD);
    new_body.extend_from_slice(prefix);

    if !suffix.is_empty() {
        let pad_len = PAD_TABLE[(new_body.len() + 2) & 3];
        write_pad(&mut new_body, pad_len);
        new_body.extend_from_slice(suffix);
    }

    pad_to_eight(&mut new_body);

    Ok(OptionsHeader {
        next_header: 0,
        body: new_body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::{insert, validate, Tlv};

    #[test]
    fn delete_missing_type_fails() {
        let opt = OptionsHeader::empty();
        assert_eq!(delete(&opt, 0x3e), Err(TlvError::NotFound));
    }

    #[test]
    fn delete_only_tlv_yields_empty_header() {
        let opt = OptionsHeader {
            next_header: 0,
            body: vec![0x3e, 0x02, 0xab, 0xcd, PAD1, PAD1],
        };
        let out = delete(&opt, 0x3e).unwrap();
        assert_eq!(out, OptionsHeader::empty());
    }

    #[test]
    fn delete_preserves_other_tlvs() {
        let opt = OptionsHeader {
            next_header: 0,
            body: vec![0x20, 0x01, 0x01, PAD1, 0x40, 0x01, 0x09, PAD1],
        };
        let out = delete(&opt, 0x20).unwrap();
        assert!(validate(&out).is_ok());
        let r = crate::tlv::find(&out, 0x40);
        assert!(r.found);
    }

    #[test]
    fn insert_then_delete_round_trips_other_tlv() {
        let opt = OptionsHeader::empty();
        let tlv = Tlv::new(0x3e, vec![1, 2, 3]);
        let with_tlv = insert(&opt, &tlv);
        let back = delete(&with_tlv, 0x3e).unwrap();
        assert_eq!(back, OptionsHeader::empty());
    }
}
