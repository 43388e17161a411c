use super::types::{OptionsHeader, PAD1, PADN};

/// Result of locating (or locating the insertion point for) a TLV type.
///
/// `pad_start` is the offset where any padding immediately preceding the
/// relevant TLV begins (or, if not found, where padding preceding the next
/// greater-typed TLV begins — the correct insertion point). `end` is the
/// offset just past the TLV itself when found, or equal to `pad_start` when
/// not found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindResult {
    pub found: bool,
    pub pad_start: usize,
    pub end: usize,
}

/// Walks `opt`'s TLVs in order, looking for `target_type`.
///
/// TLVs are expected in ascending type order (excluding pad1/padN, which
/// are not addressable by type). If `target_type` is absent, the returned
/// `pad_start`/`end` mark the point just before the first TLV whose type
/// exceeds `target_type` — the correct place to insert one in order. If no
/// such TLV exists, the point is just before the header's trailing padding.
pub fn find(opt: &OptionsHeader, target_type: u8) -> FindResult {
    let body = &opt.body;
    let mut offset = 0usize;
    let mut last_s = 0usize; // end of the last non-pad TLV seen (or 0)

    while offset < body.len() {
        let opt_type = body[offset];
        if opt_type == PAD1 {
            offset += 1;
            continue;
        }
        if offset + 2 > body.len() {
            break;
        }
        let data_len = body[offset + 1] as usize;
        let tlv_end = offset + 2 + data_len;
        if opt_type == PADN {
            offset = tlv_end;
            continue;
        }

        if opt_type == target_type {
            return FindResult {
                found: true,
                pad_start: last_s,
                end: tlv_end,
            };
        }
        if opt_type > target_type {
            return FindResult {
                found: false,
                pad_start: last_s,
                end: last_s,
            };
        }

        last_s = tlv_end;
        offset = tlv_end;
    }

    FindResult {
        found: false,
        pad_start: last_s,
        end: last_s,
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::Tlv;
    use super::*;

    fn opt_with(body: Vec<u8>) -> OptionsHeader {
        OptionsHeader { next_header: 0, body }
    }

    #[test]
    fn finds_existing_tlv() {
        let opt = opt_with(vec![0x3e, 0x02, 0xab, 0xcd, PAD1, PAD1]);
        let r = find(&opt, 0x3e);
        assert!(r.found);
        assert_eq!(r.pad_start, 0);
        assert_eq!(r.end, 4);
    }

    #[test]
    fn not_found_inserts_before_greater_type() {
        let opt = opt_with(vec![0x10, 0x00, 0x50, 0x00, PAD1, PAD1]);
        let r = find(&opt, 0x20);
        assert!(!r.found);
        assert_eq!(r.pad_start, 2);
        assert_eq!(r.end, 2);
    }

    #[test]
    fn not_found_empty_header_inserts_at_zero() {
        let opt = OptionsHeader::empty();
        let r = find(&opt, 0x3e);
        assert!(!r.found);
        assert_eq!(r.pad_start, 0);
        let _ = Tlv::new(0x3e, vec![1]);
    }
}
