use std::net::SocketAddr;

use crate::amfp::MAX_ROUTERS;
use crate::error::{IlaError, IlaResult};

/// Parsed `-A/--amfpopts router=ADDR[,router=ADDR...]` (forwarder mode).
#[derive(Debug, Clone)]
pub struct AmfpOpts {
    pub routers: Vec<SocketAddr>,
}

impl AmfpOpts {
    pub fn parse(input: &str) -> IlaResult<Self> {
        let mut routers = Vec::new();
        for pair in input.split(',').filter(|s| !s.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| IlaError::Config(format!("malformed amfpopts entry {pair:?}")))?;
            if key != "router" {
                return Err(IlaError::Config(format!("unknown amfpopts key {key:?}")));
            }
            if routers.len() >= MAX_ROUTERS {
                return Err(IlaError::Config(format!("too many routers configured, max {MAX_ROUTERS}")));
            }
            let addr: std::net::Ipv6Addr = value
                .parse()
                .map_err(|_| IlaError::Config(format!("invalid router address {value:?}")))?;
            routers.push(SocketAddr::new(addr.into(), 5555));
        }
        Ok(AmfpOpts { routers })
    }
}
