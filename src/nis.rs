//! Directory service (NIS) lookup strategy
//!
//! The directory is reached through a [`DirectoryService`]. Map values are
//! hosts-file lines, possibly several separated by newlines, which are
//! merged into one record.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::arena::{AddressFamily, HostBuf, HostLayout};
use crate::error::{ResolveError, Result};
use crate::hosts::{HostLine, HostMerge};

pub const HOSTS_BYNAME: &str = "hosts.byname";
pub const IPNODES_BYNAME: &str = "ipnodes.byname";
pub const HOSTS_BYADDR: &str = "hosts.byaddr";
pub const IPNODES_BYADDR: &str = "ipnodes.byaddr";

/// Key lookup in a named map
pub trait DirectoryService: Send + Sync {
    /// Value stored under `key` in `map`, `None` if there is no entry
    fn match_key(&self, map: &str, key: &str) -> Result<Option<String>>;
}

/// Directory service strategy
pub struct NisSource<'a> {
    service: &'a dyn DirectoryService,
}

impl<'a> NisSource<'a> {
    pub fn new(service: &'a dyn DirectoryService) -> Self {
        Self { service }
    }

    fn lookup(&self, map: &str, key: &str) -> Result<String> {
        match self.service.match_key(map, key) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(ResolveError::NotFound),
            Err(ResolveError::TryAgain) => Err(ResolveError::TryAgain),
            Err(err) => {
                log::debug!("yp_match {} {} failed: {}", map, key, err);
                Err(ResolveError::NotFound)
            }
        }
    }

    pub fn gethtbyname(&self, name: &str, family: AddressFamily, buf: &mut [u8]) -> Result<HostLayout> {
        let map = match family {
            AddressFamily::Inet => HOSTS_BYNAME,
            AddressFamily::Inet6 => IPNODES_BYNAME,
        };
        let value = self.lookup(map, name)?;
        yp_hostent(&value, family, buf)
    }

    pub fn gethtbyaddr(&self, addr: &[u8], family: AddressFamily, buf: &mut [u8]) -> Result<HostLayout> {
        let (map, key) = match family {
            AddressFamily::Inet => {
                let octets: [u8; 4] = addr.try_into().map_err(|_| bad_len(family, addr))?;
                (HOSTS_BYADDR, Ipv4Addr::from(octets).to_string())
            }
            AddressFamily::Inet6 => {
                let octets: [u8; 16] = addr.try_into().map_err(|_| bad_len(family, addr))?;
                (IPNODES_BYADDR, Ipv6Addr::from(octets).to_string())
            }
        };
        let value = self.lookup(map, &key)?;
        yp_hostent(&value, family, buf)
    }
}

fn bad_len(family: AddressFamily, addr: &[u8]) -> ResolveError {
    ResolveError::InvalidAddressLength {
        expected: family.addr_len(),
        got: addr.len(),
    }
}

/// Merge the lines of a map value. Scanning stops at the first line whose
/// address does not parse in `family`.
fn yp_hostent(value: &str, family: AddressFamily, buf: &mut [u8]) -> Result<HostLayout> {
    let mut merge = HostMerge::new(HostBuf::new(buf), family);
    for line in value.lines() {
        match HostLine::parse(line, false) {
            Some(entry) if entry.family == family => merge.add_line(&entry)?,
            _ => break,
        }
    }
    if merge.addr_count() == 0 {
        return Err(ResolveError::NotFound);
    }
    merge.finish()
}
