//! Resolution dispatcher
//!
//! Every lookup first offers the query to the resolver daemon through the
//! proxy channel. When the daemon cannot be reached the lookup runs here,
//! walking the configured sources in order:
//!
//! ```text
//! START -> TRY_PROXY -> PROXY_OK
//!                    -> PROXY_UNAVAILABLE -> FALLBACK_SOURCES -> DONE | FAILED
//! ```
//!
//! A source either produces the record, misses (the next source is tried),
//! or fails in a way that ends the call.

use crate::arena::{AddressFamily, HostBuf, HostEnt, HostLayout};
use crate::config::{NetContext, NssSource, ResolverConfig};
use crate::constants::{AF_INET, AF_INET6, NS_IN6ADDRSZ, NS_INADDRSZ};
use crate::dns::{DnsSource, DnsTransport};
use crate::error::{ResolveError, Result};
use crate::hosts::FilesSource;
#[cfg(feature = "nis")]
use crate::nis::{DirectoryService, NisSource};
use crate::postproc::{is_v4_mapped, map_v4v6};
use crate::proxy::{self, NoProxy, ProxyConnector, UnixProxy};

/// Host name and address resolver
pub struct Resolver {
    config: ResolverConfig,
    proxy: Box<dyn ProxyConnector>,
    transport: Option<Box<dyn DnsTransport>>,
    #[cfg(feature = "nis")]
    directory: Option<Box<dyn DirectoryService>>,
}

enum Query<'q> {
    Name(&'q str, AddressFamily),
    Addr(&'q [u8], AddressFamily),
}

impl Resolver {
    /// Resolver without a proxy, DNS transport or directory service
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            config,
            proxy: Box::new(NoProxy),
            transport: None,
            #[cfg(feature = "nis")]
            directory: None,
        }
    }

    /// System configuration, talking to the daemon at its default socket
    pub fn from_system() -> Self {
        Self::new(ResolverConfig::load_system()).with_proxy(UnixProxy::default())
    }

    pub fn with_proxy(mut self, proxy: impl ProxyConnector + 'static) -> Self {
        self.proxy = Box::new(proxy);
        self
    }

    pub fn with_transport(mut self, transport: impl DnsTransport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    #[cfg(feature = "nis")]
    pub fn with_directory(mut self, directory: impl DirectoryService + 'static) -> Self {
        self.directory = Some(Box::new(directory));
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Forward lookups
    // ------------------------------------------------------------------------

    /// Look up `name`, trying IPv6 first when the configuration prefers it
    pub fn gethostbyname_r<'b>(&self, name: &str, buf: &'b mut [u8]) -> Result<HostEnt<'b>> {
        if self.config.options.use_inet6 {
            match self.byname(name, AF_INET6, &NetContext::UNSET, &mut *buf) {
                Ok(layout) => return Ok(materialize(buf, layout)),
                Err(err) => log::trace!("gethostbyname {}: AF_INET6 failed ({}), trying AF_INET", name, err),
            }
        }
        let layout = self.byname(name, AF_INET, &NetContext::UNSET, &mut *buf)?;
        Ok(materialize(buf, layout))
    }

    /// Look up `name` in address family `af`
    pub fn gethostbyname2_r<'b>(&self, name: &str, af: i32, buf: &'b mut [u8]) -> Result<HostEnt<'b>> {
        self.gethostbyname_for_net(name, af, &NetContext::UNSET, buf)
    }

    /// Look up `name` on a specific network
    pub fn gethostbyname_for_net<'b>(
        &self,
        name: &str,
        af: i32,
        ctx: &NetContext,
        buf: &'b mut [u8],
    ) -> Result<HostEnt<'b>> {
        let layout = self.byname(name, af, ctx, &mut *buf)?;
        Ok(materialize(buf, layout))
    }

    fn byname(&self, name: &str, af: i32, ctx: &NetContext, buf: &mut [u8]) -> Result<HostLayout> {
        AddressFamily::from_raw(af)?;
        log::trace!("gethostbyname {} af={}: TRY_PROXY", name, af);
        match proxy::gethostbyname(self.proxy.as_ref(), name, af, ctx, buf) {
            Err(ResolveError::TransportUnavailable) => {
                log::trace!("gethostbyname {}: PROXY_UNAVAILABLE", name);
                self.byname_real(name, af, ctx, buf)
            }
            result => result,
        }
    }

    fn byname_real(&self, name: &str, af: i32, ctx: &NetContext, buf: &mut [u8]) -> Result<HostLayout> {
        let family = AddressFamily::from_raw(af)?;
        if buf.len() < family.addr_len() {
            return Err(ResolveError::BufferExhausted);
        }

        let name = match self.config.host_alias(name) {
            Some(target) => {
                log::debug!("{} is an alias for {}", name, target);
                target
            }
            None => name,
        };

        if is_numeric_literal(name) {
            return self.fake_hostent(name, family, buf);
        }

        self.dispatch(Query::Name(name, family), ctx, buf)
    }

    /// Record for a name that is already an address literal
    fn fake_hostent(&self, name: &str, family: AddressFamily, buf: &mut [u8]) -> Result<HostLayout> {
        let parsed: Option<Vec<u8>> = match family {
            AddressFamily::Inet => name
                .parse::<std::net::Ipv4Addr>()
                .ok()
                .map(|a| a.octets().to_vec()),
            AddressFamily::Inet6 => name
                .parse::<std::net::Ipv6Addr>()
                .ok()
                .map(|a| a.octets().to_vec()),
        };
        let addr = parsed.ok_or(ResolveError::NotFound)?;

        let mut arena = HostBuf::new(buf);
        let mut family = family;
        let mut addrs = [arena.write_addr(&addr)?];
        let name_off = arena.write_str(name)?;
        if self.config.options.use_inet6 {
            map_v4v6(&mut arena, &mut family, &mut addrs)?;
        }
        arena.finish(name_off, &[], &addrs, family)
    }

    // ------------------------------------------------------------------------
    // Reverse lookups
    // ------------------------------------------------------------------------

    /// Look up the name of `addr`
    pub fn gethostbyaddr_r<'b>(&self, addr: &[u8], af: i32, buf: &'b mut [u8]) -> Result<HostEnt<'b>> {
        self.gethostbyaddr_for_net(addr, af, &NetContext::UNSET, buf)
    }

    /// Look up the name of `addr` on a specific network
    pub fn gethostbyaddr_for_net<'b>(
        &self,
        addr: &[u8],
        af: i32,
        ctx: &NetContext,
        buf: &'b mut [u8],
    ) -> Result<HostEnt<'b>> {
        let layout = self.byaddr(addr, af, ctx, &mut *buf)?;
        Ok(materialize(buf, layout))
    }

    fn byaddr(&self, addr: &[u8], af: i32, ctx: &NetContext, buf: &mut [u8]) -> Result<HostLayout> {
        log::trace!("gethostbyaddr af={}: TRY_PROXY", af);
        let family = AddressFamily::from_raw(af)?;
        match proxy::gethostbyaddr(self.proxy.as_ref(), addr, family, ctx, buf) {
            Err(ResolveError::TransportUnavailable) => {
                log::trace!("gethostbyaddr: PROXY_UNAVAILABLE");
                self.byaddr_real(addr, af, ctx, buf)
            }
            result => result,
        }
    }

    fn byaddr_real(&self, addr: &[u8], af: i32, ctx: &NetContext, buf: &mut [u8]) -> Result<HostLayout> {
        let mut addr = addr;
        let mut af = af;

        if af == AF_INET6 && addr.len() == NS_IN6ADDRSZ {
            if is_link_local(addr) || is_site_local(addr) {
                return Err(ResolveError::NotFound);
            }
            if is_v4_mapped(addr) || is_v4_compat(addr) {
                addr = &addr[NS_IN6ADDRSZ - NS_INADDRSZ..];
                af = AF_INET;
            }
        }

        let family = AddressFamily::from_raw(af)?;
        if addr.len() != family.addr_len() {
            return Err(ResolveError::InvalidAddressLength {
                expected: family.addr_len(),
                got: addr.len(),
            });
        }

        self.dispatch(Query::Addr(addr, family), ctx, buf)
    }

    // ------------------------------------------------------------------------
    // Sources
    // ------------------------------------------------------------------------

    fn dispatch(&self, query: Query<'_>, ctx: &NetContext, buf: &mut [u8]) -> Result<HostLayout> {
        let mut last = ResolveError::NotFound;

        for (i, source) in self.config.sources.iter().enumerate() {
            log::trace!("FALLBACK_SOURCES: source {} ({:?})", i, source);
            let result = match source {
                NssSource::Files => self.files(&query, buf),
                NssSource::Dns => self.dns(&query, ctx, buf),
                NssSource::Nis => self.nis(&query, buf),
            };
            match result {
                Ok(layout) => return Ok(layout),
                Err(err) if err.is_miss() => {
                    log::debug!("{:?} source: {}", source, err);
                    last = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last)
    }

    fn files(&self, query: &Query<'_>, buf: &mut [u8]) -> Result<HostLayout> {
        let files = FilesSource::new(&self.config);
        match *query {
            Query::Name(name, family) => files.gethtbyname(name, family, buf),
            Query::Addr(addr, family) => files.gethtbyaddr(addr, family, buf),
        }
    }

    fn dns(&self, query: &Query<'_>, ctx: &NetContext, buf: &mut [u8]) -> Result<HostLayout> {
        let Some(transport) = self.transport.as_deref() else {
            log::debug!("no DNS transport configured");
            return Err(ResolveError::NotFound);
        };
        let dns = DnsSource::new(&self.config, transport);
        match *query {
            Query::Name(name, family) => dns.gethtbyname(name, family, ctx, buf),
            Query::Addr(addr, family) => dns.gethtbyaddr(addr, family, ctx, buf),
        }
    }

    #[cfg(feature = "nis")]
    fn nis(&self, query: &Query<'_>, buf: &mut [u8]) -> Result<HostLayout> {
        let Some(directory) = self.directory.as_deref() else {
            log::debug!("no directory service configured");
            return Err(ResolveError::NotFound);
        };
        let nis = NisSource::new(directory);
        match *query {
            Query::Name(name, family) => nis.gethtbyname(name, family, buf),
            Query::Addr(addr, family) => nis.gethtbyaddr(addr, family, buf),
        }
    }

    #[cfg(not(feature = "nis"))]
    fn nis(&self, _query: &Query<'_>, _buf: &mut [u8]) -> Result<HostLayout> {
        Err(ResolveError::NotFound)
    }
}

fn materialize(buf: &mut [u8], layout: HostLayout) -> HostEnt<'_> {
    let buf: &[u8] = buf;
    HostEnt::new(buf, layout)
}

/// Digits and dots not ending in a dot, or hex digits, colons and dots with
/// at least one colon (or a leading colon), not ending in a dot
fn is_numeric_literal(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(&first), Some(&last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    if last == b'.' {
        return false;
    }
    if first.is_ascii_digit() && bytes.iter().all(|&c| c.is_ascii_digit() || c == b'.') {
        return true;
    }
    ((first.is_ascii_hexdigit() && name.contains(':')) || first == b':')
        && bytes
            .iter()
            .all(|&c| c.is_ascii_hexdigit() || c == b':' || c == b'.')
}

/// fe80::/10
fn is_link_local(addr: &[u8]) -> bool {
    addr[0] == 0xfe && addr[1] & 0xc0 == 0x80
}

/// fec0::/10
fn is_site_local(addr: &[u8]) -> bool {
    addr[0] == 0xfe && addr[1] & 0xc0 == 0xc0
}

/// `::a.b.c.d`, excluding `::` and `::1`
fn is_v4_compat(addr: &[u8]) -> bool {
    addr[..12].iter().all(|&b| b == 0)
        && u32::from_be_bytes([addr[12], addr[13], addr[14], addr[15]]) > 1
}
