//! Fixed-size binary encodings for the model types, as carried (hex-encoded)
//! over the reference store's wire protocol.

use crate::error::IlaError;
use crate::model::{
    Address, ChecksumMode, HookType, IdentKey, IdentType, IdentValue, LocKey, LocValue, MapKey,
    MapValue,
};

/// A type that can be losslessly encoded to and decoded from a fixed-size
/// byte record for storage.
pub trait WireCodec: Sized {
    fn encode(&self) -> Vec<u8>;
    fn decode(bytes: &[u8]) -> Result<Self, IlaError>;
}

fn short(bytes: &[u8], expected: usize) -> Result<(), IlaError> {
    if bytes.len() != expected {
        return Err(IlaError::StoreProtocol(format!(
            "expected {expected}-byte record, got {}",
            bytes.len()
        )));
    }
    Ok(())
}

impl WireCodec for IdentKey {
    fn encode(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, IlaError> {
        short(bytes, 8)?;
        Ok(IdentKey(u64::from_be_bytes(bytes.try_into().unwrap())))
    }
}

impl WireCodec for IdentValue {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(24);
        out.extend_from_slice(&self.addr.0);
        out.extend_from_slice(&self.loc_num.to_be_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, IlaError> {
        short(bytes, 24)?;
        let mut addr = [0u8; 16];
        addr.copy_from_slice(&bytes[..16]);
        let loc_num = u64::from_be_bytes(bytes[16..24].try_into().unwrap());
        Ok(IdentValue { addr: Address(addr), loc_num })
    }
}

impl WireCodec for LocKey {
    fn encode(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, IlaError> {
        short(bytes, 8)?;
        Ok(LocKey(u64::from_be_bytes(bytes.try_into().unwrap())))
    }
}

impl WireCodec for LocValue {
    fn encode(&self) -> Vec<u8> {
        self.locator.to_be_bytes().to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, IlaError> {
        short(bytes, 8)?;
        Ok(LocValue { locator: u64::from_be_bytes(bytes.try_into().unwrap()) })
    }
}

impl WireCodec for MapKey {
    fn encode(&self) -> Vec<u8> {
        self.0 .0.to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, IlaError> {
        short(bytes, 16)?;
        let mut addr = [0u8; 16];
        addr.copy_from_slice(bytes);
        Ok(MapKey(Address(addr)))
    }
}

fn csum_mode_to_byte(mode: ChecksumMode) -> u8 {
    match mode {
        ChecksumMode::None => 0,
        ChecksumMode::AdjustTransport => 1,
        ChecksumMode::NeutralMap => 2,
        ChecksumMode::NeutralMapAuto => 3,
    }
}

fn csum_mode_from_byte(b: u8) -> Result<ChecksumMode, IlaError> {
    Ok(match b {
        0 => ChecksumMode::None,
        1 => ChecksumMode::AdjustTransport,
        2 => ChecksumMode::NeutralMap,
        3 => ChecksumMode::NeutralMapAuto,
        other => return Err(IlaError::StoreProtocol(format!("bad csum_mode byte {other}"))),
    })
}

fn ident_type_to_byte(t: IdentType) -> u8 {
    match t {
        IdentType::Iid => 0,
        IdentType::Luid => 1,
        IdentType::VirtV4 => 2,
        IdentType::VirtUniV6 => 3,
        IdentType::VirtMultiV6 => 4,
        IdentType::NonLocal => 5,
    }
}

fn ident_type_from_byte(b: u8) -> Result<IdentType, IlaError> {
    Ok(match b {
        0 => IdentType::Iid,
        1 => IdentType::Luid,
        2 => IdentType::VirtV4,
        3 => IdentType::VirtUniV6,
        4 => IdentType::VirtMultiV6,
        5 => IdentType::NonLocal,
        other => return Err(IlaError::StoreProtocol(format!("bad ident_type byte {other}"))),
    })
}

fn hook_type_to_byte(t: HookType) -> u8 {
    match t {
        HookType::RouteOutput => 0,
        HookType::RouteInput => 1,
    }
}

fn hook_type_from_byte(b: u8) -> Result<HookType, IlaError> {
    Ok(match b {
        0 => HookType::RouteOutput,
        1 => HookType::RouteInput,
        other => return Err(IlaError::StoreProtocol(format!("bad hook_type byte {other}"))),
    })
}

impl WireCodec for MapValue {
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 4 + 1 + 1 + 1);
        out.extend_from_slice(&self.loc.to_be_bytes());
        out.extend_from_slice(&self.ifindex.to_be_bytes());
        out.push(csum_mode_to_byte(self.csum_mode));
        out.push(ident_type_to_byte(self.ident_type));
        out.push(hook_type_to_byte(self.hook_type));
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self, IlaError> {
        short(bytes, 15)?;
        let loc = u64::from_be_bytes(bytes[0..8].try_into().unwrap());
        let ifindex = u32::from_be_bytes(bytes[8..12].try_into().unwrap());
        Ok(MapValue {
            loc,
            ifindex,
            csum_mode: csum_mode_from_byte(bytes[12])?,
            ident_type: ident_type_from_byte(bytes[13])?,
            hook_type: hook_type_from_byte(bytes[14])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_value_round_trips() {
        let v = MapValue::derived(0xfeed);
        let encoded = v.encode();
        let decoded = MapValue::decode(&encoded).unwrap();
        assert_eq!(v, decoded);
    }

    #[test]
    fn ident_value_round_trips() {
        let v = IdentValue { addr: Address::from_parts(1, 2), loc_num: 7 };
        let decoded = IdentValue::decode(&v.encode()).unwrap();
        assert_eq!(v, decoded);
    }
}
