//! Hosts file lookup
//!
//! Lines have the form `address name [alias...]`, with `#` starting a
//! comment. The file is read on every call.

use std::fs;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::arena::{AddressFamily, HostBuf, HostLayout};
use crate::config::ResolverConfig;
use crate::constants::MAXADDRS;
use crate::error::{ResolveError, Result};
use crate::postproc::map_v4v6_address;

/// One parsed hosts-format line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLine<'l> {
    pub family: AddressFamily,
    addr: [u8; 16],
    pub name: &'l str,
    pub aliases: Vec<&'l str>,
}

impl<'l> HostLine<'l> {
    /// Parse one line. IPv4 addresses are returned as mapped IPv6 when
    /// `map_inet6` is set. Blank, comment-only and unparsable lines yield
    /// `None`.
    pub fn parse(line: &'l str, map_inet6: bool) -> Option<Self> {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        };
        let mut parts = line.split_whitespace();
        let addr_str = parts.next()?;
        let name = parts.next()?;

        let mut addr = [0u8; 16];
        let family = if let Ok(v6) = addr_str.parse::<Ipv6Addr>() {
            addr = v6.octets();
            AddressFamily::Inet6
        } else {
            let v4 = addr_str.parse::<Ipv4Addr>().ok()?.octets();
            if map_inet6 {
                addr = map_v4v6_address(v4);
                AddressFamily::Inet6
            } else {
                addr[..4].copy_from_slice(&v4);
                AddressFamily::Inet
            }
        };

        Some(Self {
            family,
            addr,
            name,
            aliases: parts.collect(),
        })
    }

    pub fn addr(&self) -> &[u8] {
        &self.addr[..self.family.addr_len()]
    }

    /// Canonical name followed by the aliases
    pub fn names(&self) -> impl Iterator<Item = &'l str> + '_ {
        core::iter::once(self.name).chain(self.aliases.iter().copied())
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.names().any(|n| n.eq_ignore_ascii_case(name))
    }
}

/// Merges hosts-format entries into one record as they are found
pub(crate) struct HostMerge<'b> {
    arena: HostBuf<'b>,
    family: AddressFamily,
    name: Option<usize>,
    seen: Vec<String>,
    aliases: Vec<usize>,
    addrs: Vec<usize>,
}

impl<'b> HostMerge<'b> {
    pub(crate) fn new(arena: HostBuf<'b>, family: AddressFamily) -> Self {
        Self {
            arena,
            family,
            name: None,
            seen: Vec::new(),
            aliases: Vec::new(),
            addrs: Vec::new(),
        }
    }

    /// First name becomes canonical, later distinct names become aliases
    pub(crate) fn add_name(&mut self, name: &str) -> Result<()> {
        if self.seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            return Ok(());
        }
        let off = self.arena.write_str(name)?;
        if self.name.is_none() {
            self.name = Some(off);
        } else {
            self.aliases.push(off);
        }
        self.seen.push(name.to_string());
        Ok(())
    }

    /// Add an address; extras beyond the record limit are dropped
    pub(crate) fn add_addr(&mut self, addr: &[u8]) -> Result<()> {
        if self.addrs.len() >= MAXADDRS - 1 {
            return Ok(());
        }
        let off = self.arena.write_addr(addr)?;
        self.addrs.push(off);
        Ok(())
    }

    pub(crate) fn add_line(&mut self, line: &HostLine<'_>) -> Result<()> {
        for name in line.names() {
            self.add_name(name)?;
        }
        self.add_addr(line.addr())
    }

    #[cfg_attr(not(feature = "nis"), allow(dead_code))]
    pub(crate) fn addr_count(&self) -> usize {
        self.addrs.len()
    }

    pub(crate) fn finish(self) -> Result<HostLayout> {
        let name = self.name.ok_or(ResolveError::NotFound)?;
        self.arena.finish(name, &self.aliases, &self.addrs, self.family)
    }
}

/// Hosts file strategy
pub struct FilesSource<'c> {
    config: &'c ResolverConfig,
}

impl<'c> FilesSource<'c> {
    pub fn new(config: &'c ResolverConfig) -> Self {
        Self { config }
    }

    fn read(&self) -> Result<String> {
        match fs::read_to_string(&self.config.hosts_path) {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("hosts file {} missing", self.config.hosts_path.display());
                Err(ResolveError::NotFound)
            }
            Err(err) => {
                log::debug!(
                    "cannot read hosts file {}: {}",
                    self.config.hosts_path.display(),
                    err
                );
                Err(ResolveError::NotFound)
            }
        }
    }

    /// Merge every matching line of `family` into one record
    pub fn gethtbyname(
        &self,
        name: &str,
        family: AddressFamily,
        buf: &mut [u8],
    ) -> Result<HostLayout> {
        let content = self.read()?;
        let map_inet6 = self.config.options.use_inet6;
        let mut merge = HostMerge::new(HostBuf::new(buf), family);
        let mut found = false;

        for line in content.lines() {
            let Some(entry) = HostLine::parse(line, map_inet6) else {
                continue;
            };
            if entry.family != family || !entry.matches_name(name) {
                continue;
            }
            merge.add_line(&entry)?;
            found = true;
        }

        if !found {
            return Err(ResolveError::NotFound);
        }
        merge.finish()
    }

    /// First line whose address equals `addr`
    pub fn gethtbyaddr(
        &self,
        addr: &[u8],
        family: AddressFamily,
        buf: &mut [u8],
    ) -> Result<HostLayout> {
        let content = self.read()?;
        let map_inet6 = self.config.options.use_inet6;

        let entry = content
            .lines()
            .filter_map(|line| HostLine::parse(line, map_inet6))
            .find(|entry| entry.family == family && entry.addr() == addr)
            .ok_or(ResolveError::NotFound)?;

        let mut merge = HostMerge::new(HostBuf::new(buf), family);
        merge.add_line(&entry)?;
        merge.finish()
    }
}
