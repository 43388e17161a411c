//! Core data model: addresses, identifier/locator rows, and derived map entries.

use std::net::Ipv6Addr;

/// A 128-bit IPv6 address, viewable as a (locator, identifier) pair.
///
/// The locator occupies the high 64 bits, the identifier the low 64 bits,
/// matching the network byte order of the address itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 16]);

impl Address {
    pub const UNSPECIFIED: Address = Address([0u8; 16]);

    pub fn from_parts(locator: u64, identifier: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&locator.to_be_bytes());
        bytes[8..].copy_from_slice(&identifier.to_be_bytes());
        Address(bytes)
    }

    pub fn locator(&self) -> u64 {
        u64::from_be_bytes(self.0[..8].try_into().unwrap())
    }

    pub fn identifier(&self) -> u64 {
        u64::from_be_bytes(self.0[8..].try_into().unwrap())
    }

    pub fn with_locator(&self, locator: u64) -> Self {
        Address::from_parts(locator, self.identifier())
    }

    /// Extracts the AMFP connection-slot locator-id from bytes 2-3 of this
    /// address, treated as a big-endian u16.
    pub fn amfp_locator_id(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    /// Extracts the redirect locator-id from bytes 6-7, used when deriving a
    /// slot index from a locator value rather than a full address.
    pub fn redirect_locator_id(&self) -> u16 {
        u16::from_be_bytes([self.0[6], self.0[7]])
    }
}

impl From<Ipv6Addr> for Address {
    fn from(addr: Ipv6Addr) -> Self {
        Address(addr.octets())
    }
}

impl From<Address> for Ipv6Addr {
    fn from(addr: Address) -> Self {
        Ipv6Addr::from(addr.0)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Ipv6Addr::from(self.0))
    }
}

/// Checksum-neutral mapping strategy applied to a forwarded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumMode {
    None,
    AdjustTransport,
    NeutralMap,
    NeutralMapAuto,
}

/// Identifier encoding carried in a map value, determining how the
/// identifier bits are rewritten at the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentType {
    Iid,
    Luid,
    VirtV4,
    VirtUniV6,
    VirtMultiV6,
    NonLocal,
}

/// Which netfilter-style hook the route/encapsulation applies at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookType {
    RouteOutput,
    RouteInput,
}

/// Key into the *ident* store: a 64-bit identifier number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentKey(pub u64);

/// Value stored against an `IdentKey`: the endpoint address and the locator
/// number it currently resolves through. `loc_num == 0` means unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentValue {
    pub addr: Address,
    pub loc_num: u64,
}

/// Key into the *loc* store: a locator number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocKey(pub u64);

/// Value stored against a `LocKey`: the 64-bit locator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocValue {
    pub locator: u64,
}

/// Key into the *map* store: a destination address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapKey(pub Address);

/// Value stored against a `MapKey`: everything needed to install a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapValue {
    pub loc: u64,
    pub ifindex: u32,
    pub csum_mode: ChecksumMode,
    pub ident_type: IdentType,
    pub hook_type: HookType,
}

impl MapValue {
    /// The derived value written by the control daemon when joining ident
    /// and loc: `{ifindex=0, csum_mode=NEUTRAL_MAP_AUTO, ident_type=LUID,
    /// hook_type=ROUTE_OUTPUT}`.
    pub fn derived(loc: u64) -> Self {
        MapValue {
            loc,
            ifindex: 0,
            csum_mode: ChecksumMode::NeutralMapAuto,
            ident_type: IdentType::Luid,
            hook_type: HookType::RouteOutput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_splits_locator_and_identifier() {
        let addr = Address::from_parts(0xfe80_0000_0000_0001, 0x0000_0000_0000_0005);
        assert_eq!(addr.locator(), 0xfe80_0000_0000_0001);
        assert_eq!(addr.identifier(), 0x0000_0000_0000_0005);
    }

    #[test]
    fn amfp_locator_id_reads_bytes_2_3_big_endian() {
        let addr = Address([0x20, 0x01, 0x12, 0x34, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(addr.amfp_locator_id(), 0x1234);
    }

    #[test]
    fn redirect_locator_id_reads_bytes_6_7_big_endian() {
        let addr = Address([0, 0, 0, 0, 0, 0, 0xab, 0xcd, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(addr.redirect_locator_id(), 0xabcd);
    }

    #[test]
    fn with_locator_preserves_identifier() {
        let addr = Address::from_parts(1, 42);
        let moved = addr.with_locator(99);
        assert_eq!(moved.locator(), 99);
        assert_eq!(moved.identifier(), 42);
    }
}
