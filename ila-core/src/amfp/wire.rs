//! AMFP wire encoding: the common header plus the four message bodies.

use crate::error::{IlaError, IlaResult};
use crate::model::Address;

pub const MSG_MAP_REQUEST: u8 = 1;
pub const MSG_MAP_INFO: u8 = 2;
pub const MSG_EXT_MAP_INFO: u8 = 3;
pub const MSG_LOCATOR_UNREACHABLE: u8 = 4;

pub const IDLOC_TYPE_IPV6_ADDR: u8 = 1;

pub const SUB_TYPE_MAP_REPLY: u8 = 1;
pub const SUB_TYPE_REDIRECT: u8 = 2;

const COMMON_HEADER_LEN: usize = 3;
const MAP_INFO_HEADER_LEN: usize = COMMON_HEADER_LEN + 4;
const MAP_REQUEST_HEADER_LEN: usize = COMMON_HEADER_LEN + 2;
const PAIR_LEN: usize = 32;
const ADDR_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmfpMessage {
    MapRequest {
        id_type: u8,
        identifiers: Vec<Address>,
    },
    MapInfo {
        sub_type: u8,
        loc_type: u8,
        id_type: u8,
        /// (identifier, locator) pairs.
        pairs: Vec<(Address, Address)>,
    },
    ExtMapInfo,
    LocatorUnreachable,
}

impl AmfpMessage {
    pub fn map_info_reply(pairs: Vec<(Address, Address)>) -> Self {
        AmfpMessage::MapInfo {
            sub_type: SUB_TYPE_MAP_REPLY,
            loc_type: IDLOC_TYPE_IPV6_ADDR,
            id_type: IDLOC_TYPE_IPV6_ADDR,
            pairs,
        }
    }

    pub fn redirect(dest: Address, locator_half: Address) -> Self {
        AmfpMessage::MapInfo {
            sub_type: SUB_TYPE_REDIRECT,
            loc_type: IDLOC_TYPE_IPV6_ADDR,
            id_type: IDLOC_TYPE_IPV6_ADDR,
            pairs: vec![(dest, locator_half)],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            AmfpMessage::MapRequest { id_type, identifiers } => {
                let total = MAP_REQUEST_HEADER_LEN + identifiers.len() * ADDR_LEN;
                let mut out = Vec::with_capacity(total);
                push_common_header(&mut out, MSG_MAP_REQUEST, total);
                out.push(*id_type);
                out.push(0); // padding
                for addr in identifiers {
                    out.extend_from_slice(&addr.0);
                }
                out
            }
            AmfpMessage::MapInfo { sub_type, loc_type, id_type, pairs } => {
                let total = MAP_INFO_HEADER_LEN + pairs.len() * PAIR_LEN;
                let mut out = Vec::with_capacity(total);
                push_common_header(&mut out, MSG_MAP_INFO, total);
                out.push(*sub_type);
                out.push(0); // reserved
                out.push(*loc_type);
                out.push(*id_type);
                for (ident, loc) in pairs {
                    out.extend_from_slice(&ident.0);
                    out.extend_from_slice(&loc.0);
                }
                out
            }
            AmfpMessage::ExtMapInfo => {
                let mut out = Vec::with_capacity(COMMON_HEADER_LEN);
                push_common_header(&mut out, MSG_EXT_MAP_INFO, COMMON_HEADER_LEN);
                out
            }
            AmfpMessage::LocatorUnreachable => {
                let mut out = Vec::with_capacity(COMMON_HEADER_LEN);
                push_common_header(&mut out, MSG_LOCATOR_UNREACHABLE, COMMON_HEADER_LEN);
                out
            }
        }
    }

    /// Decodes one complete frame (as delimited by [`super::framer::Framer`]).
    pub fn decode(frame: &[u8]) -> IlaResult<Self> {
        if frame.len() < COMMON_HEADER_LEN {
            return Err(IlaError::AmfpProtocol("frame shorter than common header".into()));
        }
        let msg_type = frame[0];
        let declared = ((frame[1] as usize) << 8) | frame[2] as usize;
        if declared < COMMON_HEADER_LEN {
            return Err(IlaError::AmfpProtocol("declared length below minimum".into()));
        }
        if declared != frame.len() {
            return Err(IlaError::AmfpProtocol("declared length does not match frame size".into()));
        }

        match msg_type {
            MSG_MAP_REQUEST => decode_map_request(frame),
            MSG_MAP_INFO => decode_map_info(frame),
            MSG_EXT_MAP_INFO => Ok(AmfpMessage::ExtMapInfo),
            MSG_LOCATOR_UNREACHABLE => Ok(AmfpMessage::LocatorUnreachable),
            other => Err(IlaError::AmfpProtocol(format!("unknown message type {other}"))),
        }
    }
}

fn push_common_header(out: &mut Vec<u8>, msg_type: u8, total_len: usize) {
    out.push(msg_type);
    out.push((total_len >> 8) as u8);
    out.push((total_len & 0xff) as u8);
}

fn decode_map_request(frame: &[u8]) -> IlaResult<AmfpMessage> {
    if frame.len() < MAP_REQUEST_HEADER_LEN {
        return Err(IlaError::AmfpProtocol("MAP_REQUEST header truncated".into()));
    }
    let id_type = frame[3];
    if id_type != IDLOC_TYPE_IPV6_ADDR {
        return Err(IlaError::AmfpProtocol(format!("unsupported id_type {id_type} in MAP_REQUEST")));
    }
    let payload = &frame[MAP_REQUEST_HEADER_LEN..];
    if payload.len() % ADDR_LEN != 0 {
        return Err(IlaError::AmfpProtocol("MAP_REQUEST payload not a multiple of address size".into()));
    }
    let identifiers = payload
        .chunks_exact(ADDR_LEN)
        .map(|chunk| {
            let mut bytes = [0u8; 16];
            bytes.copy_from_slice(chunk);
            Address(bytes)
        })
        .collect();
    Ok(AmfpMessage::MapRequest { id_type, identifiers })
}

fn decode_map_info(frame: &[u8]) -> IlaResult<AmfpMessage> {
    if frame.len() < MAP_INFO_HEADER_LEN {
        return Err(IlaError::AmfpProtocol("MAP_INFO header truncated".into()));
    }
    let sub_type = frame[3];
    let loc_type = frame[5];
    let id_type = frame[6];
    if loc_type != IDLOC_TYPE_IPV6_ADDR || id_type != IDLOC_TYPE_IPV6_ADDR {
        return Err(IlaError::AmfpProtocol("unsupported loc_type/id_type in MAP_INFO".into()));
    }
    let payload = &frame[MAP_INFO_HEADER_LEN..];
    if payload.len() % PAIR_LEN != 0 {
        return Err(IlaError::AmfpProtocol("MAP_INFO payload not a multiple of pair size".into()));
    }
    let pairs = payload
        .chunks_exact(PAIR_LEN)
        .map(|chunk| {
            let mut ident = [0u8; 16];
            let mut loc = [0u8; 16];
            ident.copy_from_slice(&chunk[..16]);
            loc.copy_from_slice(&chunk[16..]);
            (Address(ident), Address(loc))
        })
        .collect();
    Ok(AmfpMessage::MapInfo { sub_type, loc_type, id_type, pairs })
}
