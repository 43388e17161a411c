use super::find::find;
use super::types::{OptionsHeader, Tlv, PAD1, PADN, PAD_TABLE};
use super::{last_non_pad_end, pad_to_eight, write_pad};

/// Inserts or replaces `tlv` in `opt`.
///
/// If a TLV of the same type and identical data length already exists, its
/// data is overwritten in place and the header's length is unchanged.
/// Otherwise a new header is built: the prefix up to the insertion point is
/// kept, leading padding aligns the new TLV's data to a `4n+2` offset, any
/// trailing TLVs are preserved (realigned the same way), and the whole
/// header is padded to an 8-byte boundary.
pub fn insert(opt: &OptionsHeader, tlv: &Tlv) -> OptionsHeader {
    let body = &opt.body;
    let result = find(opt, tlv.option_type);

    if result.found {
        if let Some(existing_start) = tlv_start_in_range(body, result.pad_start, result.end) {
            let existing_len = body[existing_start + 1] as usize;
            if existing_len == tlv.data.len() {
                let mut new_body = body.clone();
                new_body[existing_start + 2..existing_start + 2 + tlv.data.len()]
                    .copy_from_slice(&tlv.data);
                return OptionsHeader {
                    next_header: opt.next_header,
                    body: new_body,
                };
            }
        }
    }

    let prefix = &body[..result.pad_start];
    let suffix_start = result.end;
    let tail_end = suffix_start + last_non_pad_end(&body[suffix_start..]);
    let suffix = &body[suffix_start..tail_end];

    let mut new_body = Vec::with_capacity(prefix.len() + tlv.wire_len() + suffix.len() + super::MAX_PAD);
    new_body.extend_from_slice(prefix);

    let lead_pad = PAD_TABLE[(new_body.len() + 2) & 3];
    write_pad(&mut new_body, lead_pad);

    new_body.push(tlv.option_type);
    new_body.push(tlv.data.len() as u8);
    new_body.extend_from_slice(&tlv.data);

    if !suffix.is_empty() {
        let gap_pad = PAD_TABLE[(new_body.len() + 2) & 3];
        write_pad(&mut new_body, gap_pad);
        new_body.extend_from_slice(suffix);
    }

    pad_to_eight(&mut new_body);

    OptionsHeader {
        next_header: 0,
        body: new_body,
    }
}

/// Finds the byte offset of the non-pad TLV type byte within
/// `body[pad_start..end]`, skipping any leading pad1/padN.
fn tlv_start_in_range(body: &[u8], pad_start: usize, end: usize) -> Option<usize> {
    let mut offset = pad_start;
    while offset < end {
        match body[offset] {
            PAD1 => offset += 1,
            PADN => {
                let len = body[offset + 1] as usize;
                offset += 2 + len;
            }
            _ => return Some(offset),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::{find, validate};

    #[test]
    fn insert_into_empty_header_pads_to_eight() {
        let opt = OptionsHeader::empty();
        let tlv = Tlv::new(0x3e, vec![0xab, 0xcd]);
        let out = insert(&opt, &tlv);
        assert_eq!(out.total_len() % 8, 0);
        assert_eq!(out.hdrlen(), 0);
        let r = find(&out, 0x3e);
        assert!(r.found);
        // Data starts on a 4n+2 boundary (full-header offset 2 == body offset 0).
        assert_eq!(out.body[0], 0x3e);
        assert!(validate(&out).is_ok());
    }

    #[test]
    fn insert_overwrites_same_length_in_place() {
        let opt = OptionsHeader {
            next_header: 0,
            body: vec![0x3e, 0x02, 0xab, 0xcd, PAD1, PAD1],
        };
        let tlv = Tlv::new(0x3e, vec![0x11, 0x22]);
        let out = insert(&opt, &tlv);
        assert_eq!(out.total_len(), opt.total_len());
        assert_eq!(out.body[2..4], [0x11, 0x22]);
    }

    #[test]
    fn insert_preserves_trailing_tlv_in_ascending_order() {
        let opt = OptionsHeader {
            next_header: 0,
            body: vec![0x40, 0x01, 0x09, PAD1, PAD1, PAD1],
        };
        let tlv = Tlv::new(0x20, vec![0x01]);
        let out = insert(&opt, &tlv);
        assert!(validate(&out).is_ok());
        let r20 = find(&out, 0x20);
        let r40 = find(&out, 0x40);
        assert!(r20.found && r40.found);
        assert!(r20.end <= r40.pad_start || r20.pad_start <= r40.pad_start);
    }

    #[test]
    fn insert_different_length_reallocates() {
        let opt = OptionsHeader {
            next_header: 0,
            body: vec![0x3e, 0x01, 0xab, PAD1, PAD1, PAD1],
        };
        let tlv = Tlv::new(0x3e, vec![0x11, 0x22, 0x33]);
        let out = insert(&opt, &tlv);
        assert!(validate(&out).is_ok());
        let r = find(&out, 0x3e);
        assert!(r.found);
        assert_eq!(out.body[r.end - 3..r.end], [0x11, 0x22, 0x33]);
    }
}
