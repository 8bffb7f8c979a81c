//! Resolver daemon proxy channel
//!
//! Requests are single text lines terminated by a NUL byte:
//!
//! ```text
//! gethostbyname <netid> <name|^> <af>
//! gethostbyaddr <address> <len> <af> <netid>
//! ```
//!
//! The reply starts with a four byte ASCII status. Status 222 is followed by
//! a serialized host record made of big-endian `u32` length-prefixed fields:
//! the name, the aliases (ended by a zero-length field), the address family
//! and length as plain `u32` values, then the addresses (ended by a
//! zero-length field). Any other status is followed by one `u32` that is
//! read and discarded.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use crate::arena::{AddressFamily, HostBuf, HostEnt, HostLayout};
use crate::config::NetContext;
use crate::constants::{DNS_PROXY_QUERY_RESULT, MAXADDRS, MAXALIASES};
use crate::error::{ResolveError, Result};

/// Default socket of the resolver daemon
pub const DNS_PROXY_SOCKET: &str = "/dev/socket/dnsproxyd";

/// A connected request/response channel
pub trait ProxyStream: Read + Write {}

impl<T: Read + Write> ProxyStream for T {}

/// Opens a fresh channel per request. Shared by concurrent lookups.
pub trait ProxyConnector: Send + Sync {
    /// Connect to the daemon, or fail with
    /// [`ResolveError::TransportUnavailable`] when it cannot be reached
    fn connect(&self) -> Result<Box<dyn ProxyStream + '_>>;
}

/// Proxy reached over a Unix domain stream socket
#[derive(Debug, Clone)]
pub struct UnixProxy {
    path: PathBuf,
}

impl UnixProxy {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Default for UnixProxy {
    fn default() -> Self {
        Self::new(DNS_PROXY_SOCKET)
    }
}

impl ProxyConnector for UnixProxy {
    fn connect(&self) -> Result<Box<dyn ProxyStream + '_>> {
        match UnixStream::connect(&self.path) {
            Ok(stream) => Ok(Box::new(stream)),
            Err(err) => {
                log::debug!("proxy {} unavailable: {}", self.path.display(), err);
                Err(ResolveError::TransportUnavailable)
            }
        }
    }
}

/// Connector for processes that never use the proxy
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProxy;

impl ProxyConnector for NoProxy {
    fn connect(&self) -> Result<Box<dyn ProxyStream + '_>> {
        Err(ResolveError::TransportUnavailable)
    }
}

// ============================================================================
// Requests
// ============================================================================

/// `gethostbyname <netid> <name|^> <af>\0`
pub fn encode_gethostbyname(netid: u32, name: Option<&str>, af: i32) -> Vec<u8> {
    let mut req = format!("gethostbyname {} {} {}", netid, name.unwrap_or("^"), af).into_bytes();
    req.push(0);
    req
}

/// `gethostbyaddr <address> <len> <af> <netid>\0`
pub fn encode_gethostbyaddr(addr: &[u8], family: AddressFamily, netid: u32) -> Result<Vec<u8>> {
    let text = match family {
        AddressFamily::Inet => <[u8; 4]>::try_from(addr).map(|o| Ipv4Addr::from(o).to_string()),
        AddressFamily::Inet6 => <[u8; 16]>::try_from(addr).map(|o| Ipv6Addr::from(o).to_string()),
    }
    .map_err(|_| ResolveError::InvalidAddressLength {
        expected: family.addr_len(),
        got: addr.len(),
    })?;
    let mut req = format!(
        "gethostbyaddr {} {} {} {}",
        text,
        addr.len(),
        family.as_raw(),
        netid
    )
    .into_bytes();
    req.push(0);
    Ok(req)
}

fn exchange<S: ProxyStream + ?Sized>(stream: &mut S, request: &[u8], buf: &mut [u8]) -> Result<HostLayout> {
    stream.write_all(request)?;
    stream.flush()?;
    read_hostent(stream, buf)
}

/// Forward lookup through the proxy
pub fn gethostbyname(
    connector: &dyn ProxyConnector,
    name: &str,
    af: i32,
    ctx: &NetContext,
    buf: &mut [u8],
) -> Result<HostLayout> {
    let mut stream = connector.connect()?;
    let request = encode_gethostbyname(ctx.resolv_netid(), Some(name), af);
    exchange(stream.as_mut(), &request, buf)
}

/// Reverse lookup through the proxy
pub fn gethostbyaddr(
    connector: &dyn ProxyConnector,
    addr: &[u8],
    family: AddressFamily,
    ctx: &NetContext,
    buf: &mut [u8],
) -> Result<HostLayout> {
    let mut stream = connector.connect()?;
    let request = encode_gethostbyaddr(addr, family, ctx.resolv_netid())?;
    exchange(stream.as_mut(), &request, buf)
}

// ============================================================================
// Replies
// ============================================================================

fn read_u32<R: Read + ?Sized>(reader: &mut R) -> io::Result<u32> {
    let mut word = [0u8; 4];
    reader.read_exact(&mut word)?;
    Ok(u32::from_be_bytes(word))
}

/// Leading decimal number of the status field, 0 if there is none
fn parse_status(raw: &[u8]) -> i32 {
    let text = raw.iter().skip_while(|b| b.is_ascii_whitespace());
    let mut value: i32 = 0;
    for &b in text.take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i32);
    }
    value
}

/// Read one NUL-terminated string field of `len` bytes into the arena
fn read_string<R: Read + ?Sized>(reader: &mut R, arena: &mut HostBuf<'_>, len: usize) -> Result<usize> {
    let (off, slot) = arena.alloc(len)?;
    reader.read_exact(slot)?;
    if slot.last() != Some(&0) {
        return Err(ResolveError::Malformed("proxy string field not terminated"));
    }
    Ok(off)
}

/// Decode a reply into `buf`
pub fn read_hostent<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<HostLayout> {
    let mut status = [0u8; 4];
    reader.read_exact(&mut status)?;
    let code = parse_status(&status);
    if code != DNS_PROXY_QUERY_RESULT {
        log::debug!("proxy returned status {}", code);
        let _ = read_u32(reader);
        return Err(ResolveError::NotFound);
    }

    let mut arena = HostBuf::new(buf);

    let len = read_u32(reader)? as usize;
    let name = read_string(reader, &mut arena, len)?;

    let mut aliases = Vec::new();
    loop {
        let len = read_u32(reader)? as usize;
        if len == 0 {
            break;
        }
        let off = read_string(reader, &mut arena, len)?;
        if aliases.len() < MAXALIASES - 1 {
            aliases.push(off);
        }
    }

    let af = read_u32(reader)? as i32;
    let family = AddressFamily::from_raw(af)
        .map_err(|_| ResolveError::Malformed("proxy address family"))?;
    let addr_len = read_u32(reader)? as usize;
    if addr_len != family.addr_len() {
        return Err(ResolveError::Malformed("proxy address length"));
    }

    let mut addrs = Vec::new();
    loop {
        let len = read_u32(reader)? as usize;
        if len == 0 {
            break;
        }
        if len != addr_len {
            return Err(ResolveError::Malformed("proxy address length"));
        }
        let (off, slot) = arena.alloc_addr(len)?;
        reader.read_exact(slot)?;
        if addrs.len() < MAXADDRS - 1 {
            addrs.push(off);
        }
    }

    arena.finish(name, &aliases, &addrs, family)
}

fn write_field<W: Write + ?Sized>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(&(bytes.len() as u32).to_be_bytes())?;
    writer.write_all(bytes)
}

fn write_string<W: Write + ?Sized>(writer: &mut W, s: &str) -> io::Result<()> {
    writer.write_all(&(s.len() as u32 + 1).to_be_bytes())?;
    writer.write_all(s.as_bytes())?;
    writer.write_all(&[0])
}

/// Serialize a successful reply, as the daemon sends it
pub fn write_hostent<W: Write + ?Sized>(writer: &mut W, host: &HostEnt<'_>) -> io::Result<()> {
    writer.write_all(format!("{}\0", DNS_PROXY_QUERY_RESULT).as_bytes())?;
    write_string(writer, host.name())?;
    for alias in host.aliases() {
        write_string(writer, alias)?;
    }
    writer.write_all(&0u32.to_be_bytes())?;
    writer.write_all(&(host.family().as_raw() as u32).to_be_bytes())?;
    writer.write_all(&(host.addr_len() as u32).to_be_bytes())?;
    for addr in host.addresses() {
        write_field(writer, addr)?;
    }
    writer.write_all(&0u32.to_be_bytes())
}

/// Serialize a failure reply carrying `status`
pub fn write_failure<W: Write + ?Sized>(writer: &mut W, status: i32) -> io::Result<()> {
    writer.write_all(format!("{:03}\0", status).as_bytes())?;
    writer.write_all(&0u32.to_be_bytes())
}
