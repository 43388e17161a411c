use std::net::Ipv6Addr;

use crate::error::{IlaError, IlaResult};
use crate::route::RouteConfig;

use super::subopts::{parse_subopts, require};

/// Parsed `-R/--routeopts dev=IF,via=ADDR,local-locator=LOC`.
#[derive(Debug, Clone)]
pub struct RouteOpts {
    pub dev: String,
    pub via: Ipv6Addr,
    pub local_locator: u64,
}

impl RouteOpts {
    pub fn parse(input: &str) -> IlaResult<Self> {
        let opts = parse_subopts(input)?;
        let dev = require(&opts, "dev", "-R/--routeopts")?.to_string();
        let via: Ipv6Addr = require(&opts, "via", "-R/--routeopts")?
            .parse()
            .map_err(|_| IlaError::Config("invalid via address".into()))?;
        let local_locator = u64::from_str_radix(
            require(&opts, "local-locator", "-R/--routeopts")?.trim_start_matches("0x"),
            16,
        )
        .map_err(|_| IlaError::Config("invalid local-locator, expected hex".into()))?;
        Ok(RouteOpts { dev, via, local_locator })
    }

    pub fn into_route_config(self) -> RouteConfig {
        RouteConfig { dev: self.dev, via: self.via, local_locator: self.local_locator }
    }
}
