//! Reference route installer: installs ILA-encapsulated host routes via
//! `rtnetlink`, tagging every route this process owns with a private
//! protocol number so a later dump can find and purge exactly those.

use std::net::Ipv6Addr;

use async_trait::async_trait;
use futures::TryStreamExt;
use netlink_packet_route::route::{RouteAttribute, RouteMessage, RouteProtocol, RouteScope, RouteType};
use netlink_packet_route::AddressFamily;
use netlink_packet_utils::nla::DefaultNla;
use rtnetlink::Handle;

use super::{RouteConfig, RouteInstaller};
use crate::error::{IlaError, IlaResult};
use crate::model::{ChecksumMode, HookType, IdentType, MapKey, MapValue};

/// Protocol number this installer tags every route it creates with, so a
/// startup purge only ever touches routes it previously owned.
const RTPROT_ILACORE: u8 = 200;

const LWTUNNEL_ENCAP_ILA: u16 = 3;
const ILA_ATTR_LOCATOR: u16 = 1;
const ILA_ATTR_CSUM_MODE: u16 = 2;
const ILA_ATTR_IDENT_TYPE: u16 = 3;
const ILA_ATTR_HOOK_TYPE: u16 = 4;

const RTA_ENCAP: u16 = 22;
const RTA_ENCAP_TYPE: u16 = 21;

fn csum_mode_byte(mode: ChecksumMode) -> u8 {
    match mode {
        ChecksumMode::None => 0,
        ChecksumMode::AdjustTransport => 1,
        ChecksumMode::NeutralMap => 2,
        ChecksumMode::NeutralMapAuto => 3,
    }
}

fn ident_type_byte(t: IdentType) -> u8 {
    match t {
        IdentType::Iid => 0,
        IdentType::Luid => 1,
        IdentType::VirtV4 => 2,
        IdentType::VirtUniV6 => 3,
        IdentType::VirtMultiV6 => 4,
        IdentType::NonLocal => 5,
    }
}

fn hook_type_byte(t: HookType) -> u8 {
    match t {
        HookType::RouteOutput => 0,
        HookType::RouteInput => 1,
    }
}

/// Encodes a single 1-byte-value netlink attribute, padded to 4-byte
/// alignment, in the nested-attribute byte stream that forms `RTA_ENCAP`.
fn push_u8_attr(buf: &mut Vec<u8>, kind: u16, value: u8) {
    push_attr(buf, kind, &[value]);
}

fn push_u64_attr(buf: &mut Vec<u8>, kind: u16, value: u64) {
    push_attr(buf, kind, &value.to_ne_bytes());
}

fn push_attr(buf: &mut Vec<u8>, kind: u16, value: &[u8]) {
    let len = 4 + value.len();
    buf.extend_from_slice(&(len as u16).to_ne_bytes());
    buf.extend_from_slice(&kind.to_ne_bytes());
    buf.extend_from_slice(value);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

fn encap_attrs(value: &MapValue) -> DefaultNla {
    let mut nested = Vec::new();
    push_u64_attr(&mut nested, ILA_ATTR_LOCATOR, value.loc);
    push_u8_attr(&mut nested, ILA_ATTR_CSUM_MODE, csum_mode_byte(value.csum_mode));
    push_u8_attr(&mut nested, ILA_ATTR_IDENT_TYPE, ident_type_byte(value.ident_type));
    push_u8_attr(&mut nested, ILA_ATTR_HOOK_TYPE, hook_type_byte(value.hook_type));
    DefaultNla::new(RTA_ENCAP, nested)
}

fn encap_type_attr() -> DefaultNla {
    DefaultNla::new(RTA_ENCAP_TYPE, LWTUNNEL_ENCAP_ILA.to_ne_bytes().to_vec())
}

pub struct NetlinkRouteInstaller {
    config: Option<RouteConfig>,
    ifindex: u32,
    handle: Option<Handle>,
}

impl NetlinkRouteInstaller {
    pub fn new() -> Self {
        NetlinkRouteInstaller { config: None, ifindex: 0, handle: None }
    }

    fn handle(&self) -> IlaResult<&Handle> {
        self.handle.as_ref().ok_or_else(|| IlaError::Route("installer not started".into()))
    }

    fn config(&self) -> IlaResult<&RouteConfig> {
        self.config.as_ref().ok_or_else(|| IlaError::Route("installer not configured".into()))
    }

    async fn resolve_ifindex(&self, dev: &str) -> IlaResult<u32> {
        let handle = self.handle()?;
        let mut links = handle.link().get().match_name(dev.to_string()).execute();
        match links
            .try_next()
            .await
            .map_err(|e| IlaError::Netlink(e.to_string()))?
        {
            Some(link) => Ok(link.header.index),
            None => Err(IlaError::Route(format!("no such interface: {dev}"))),
        }
    }

    async fn flush_owned_routes(&self) -> IlaResult<()> {
        let handle = self.handle()?;
        let mut routes = handle.route().get(rtnetlink::IpVersion::V6).execute();
        while let Some(route) = routes
            .try_next()
            .await
            .map_err(|e| IlaError::Netlink(e.to_string()))?
        {
            if u8::from(route.header.protocol) != RTPROT_ILACORE {
                continue;
            }
            handle
                .route()
                .del(route)
                .execute()
                .await
                .map_err(|e| IlaError::Netlink(e.to_string()))?;
        }
        Ok(())
    }

    fn build_message(&self, dst: Ipv6Addr, value: &MapValue, config: &RouteConfig) -> RouteMessage {
        let mut message = RouteMessage::default();
        message.header.address_family = AddressFamily::Inet6;
        message.header.destination_prefix_length = 128;
        message.header.protocol = RouteProtocol::from(RTPROT_ILACORE);
        message.header.scope = RouteScope::Universe;
        message.header.kind = RouteType::Unicast;
        message.attributes.push(RouteAttribute::Destination(dst.into()));
        message.attributes.push(RouteAttribute::Gateway(config.via.into()));
        message.attributes.push(RouteAttribute::Other(encap_attrs(value)));
        message.attributes.push(RouteAttribute::Other(encap_type_attr()));
        let oif = if value.ifindex != 0 { value.ifindex } else { self.ifindex };
        message.attributes.push(RouteAttribute::Oif(oif));
        message
    }
}

impl Default for NetlinkRouteInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RouteInstaller for NetlinkRouteInstaller {
    async fn init(&mut self) -> IlaResult<()> {
        let (connection, handle, _) =
            rtnetlink::new_connection().map_err(|e| IlaError::Netlink(e.to_string()))?;
        tokio::spawn(connection);
        self.handle = Some(handle);
        Ok(())
    }

    async fn configure(&mut self, config: RouteConfig) -> IlaResult<()> {
        self.ifindex = self.resolve_ifindex(&config.dev).await?;
        self.config = Some(config);
        Ok(())
    }

    async fn start(&mut self) -> IlaResult<()> {
        self.flush_owned_routes().await
    }

    async fn set_route(&self, key: MapKey, value: MapValue) -> IlaResult<()> {
        let config = self.config()?;
        if value.loc == config.local_locator {
            return self.del_route(key).await;
        }
        let handle = self.handle()?;
        let message = self.build_message(key.0.into(), &value, config);
        handle
            .route()
            .add(message)
            .execute()
            .await
            .map_err(|e| IlaError::Netlink(e.to_string()))
    }

    async fn del_route(&self, key: MapKey) -> IlaResult<()> {
        let handle = self.handle()?;
        let dst: Ipv6Addr = key.0.into();
        let mut routes = handle.route().get(rtnetlink::IpVersion::V6).execute();
        while let Some(route) = routes
            .try_next()
            .await
            .map_err(|e| IlaError::Netlink(e.to_string()))?
        {
            let matches = route.attributes.iter().any(|attr| {
                matches!(attr, RouteAttribute::Destination(addr) if addr.to_string() == dst.to_string())
            });
            if matches {
                return handle
                    .route()
                    .del(route)
                    .execute()
                    .await
                    .map_err(|e| IlaError::Netlink(e.to_string()));
            }
        }
        // Already absent: deletion of a missing route is not an error here.
        Ok(())
    }
}
