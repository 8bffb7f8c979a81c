//! Host record arena
//!
//! A host record is carved out of one caller-supplied buffer. Payload (names,
//! aliases, raw addresses) is written front to back as it is discovered; the
//! alias and address pointer arrays are written last, once their lengths are
//! known. Everything is tracked as an offset until [`HostBuf::finish`] writes
//! the pointer arrays, which is the only place real addresses are produced.
//!
//! The finished record is described by a [`HostLayout`] (offsets only, no
//! borrow) and read back through a [`HostEnt`] view over the same buffer.

use core::ffi::{c_char, CStr};
use core::mem::size_of;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::constants::{AF_INET, AF_INET6, NS_IN6ADDRSZ, NS_INADDRSZ};
use crate::error::{ResolveError, Result};

const PTR_SIZE: usize = size_of::<usize>();
/// Raw addresses are kept on 32-bit boundaries
const ADDR_ALIGN: usize = 4;

/// Address family of a host record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl AddressFamily {
    pub fn from_raw(af: i32) -> Result<Self> {
        match af {
            AF_INET => Ok(AddressFamily::Inet),
            AF_INET6 => Ok(AddressFamily::Inet6),
            other => Err(ResolveError::UnsupportedFamily(other)),
        }
    }

    pub const fn as_raw(self) -> i32 {
        match self {
            AddressFamily::Inet => AF_INET,
            AddressFamily::Inet6 => AF_INET6,
        }
    }

    /// Fixed address length for the family
    pub const fn addr_len(self) -> usize {
        match self {
            AddressFamily::Inet => NS_INADDRSZ,
            AddressFamily::Inet6 => NS_IN6ADDRSZ,
        }
    }
}

/// Bump allocator over the caller's buffer
pub struct HostBuf<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> HostBuf<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far, padding included
    pub fn used(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn reserve(&mut self, len: usize) -> Result<usize> {
        if len > self.remaining() {
            return Err(ResolveError::BufferExhausted);
        }
        let off = self.pos;
        self.pos += len;
        Ok(off)
    }

    /// Advance the cursor so the next write lands on an `align` boundary
    /// of the real address
    fn align_to(&mut self, align: usize) -> Result<()> {
        let addr = self.buf.as_ptr() as usize + self.pos;
        let pad = (align - addr % align) % align;
        self.reserve(pad).map(|_| ())
    }

    /// Append a NUL-terminated string, returning its offset
    pub fn write_str(&mut self, s: &str) -> Result<usize> {
        let off = self.reserve(s.len() + 1)?;
        self.buf[off..off + s.len()].copy_from_slice(s.as_bytes());
        self.buf[off + s.len()] = 0;
        Ok(off)
    }

    /// Append raw bytes at the cursor with no alignment
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<usize> {
        let off = self.reserve(bytes.len())?;
        self.buf[off..off + bytes.len()].copy_from_slice(bytes);
        Ok(off)
    }

    /// Append a raw address on a 32-bit boundary
    pub fn write_addr(&mut self, addr: &[u8]) -> Result<usize> {
        self.align_to(ADDR_ALIGN)?;
        self.write_bytes(addr)
    }

    /// Reserve `len` bytes for the caller to fill in place
    pub fn alloc(&mut self, len: usize) -> Result<(usize, &mut [u8])> {
        let off = self.reserve(len)?;
        Ok((off, &mut self.buf[off..off + len]))
    }

    /// Like [`HostBuf::alloc`], on the boundary used for raw addresses
    pub fn alloc_addr(&mut self, len: usize) -> Result<(usize, &mut [u8])> {
        self.align_to(ADDR_ALIGN)?;
        self.alloc(len)
    }

    /// Append a NULL-terminated pointer array whose entries point at the
    /// given offsets, aligned to pointer width
    pub fn write_pointer_array(&mut self, offsets: &[usize]) -> Result<usize> {
        self.align_to(PTR_SIZE)?;
        let off = self.reserve((offsets.len() + 1) * PTR_SIZE)?;
        let base = self.buf.as_ptr() as usize;
        for (i, &target) in offsets.iter().enumerate() {
            let slot = off + i * PTR_SIZE;
            self.buf[slot..slot + PTR_SIZE].copy_from_slice(&(base + target).to_ne_bytes());
        }
        let end = off + offsets.len() * PTR_SIZE;
        self.buf[end..end + PTR_SIZE].fill(0);
        Ok(off)
    }

    /// Read back bytes already written
    pub fn get(&self, off: usize, len: usize) -> &[u8] {
        &self.buf[off..off + len]
    }

    /// Write both pointer arrays and seal the record
    pub fn finish(
        mut self,
        name: usize,
        aliases: &[usize],
        addrs: &[usize],
        family: AddressFamily,
    ) -> Result<HostLayout> {
        let alias_list = self.write_pointer_array(aliases)?;
        let addr_list = self.write_pointer_array(addrs)?;
        Ok(HostLayout {
            name,
            aliases: alias_list,
            addr_list,
            family,
            alias_count: aliases.len(),
            addr_count: addrs.len(),
            used: self.pos,
        })
    }
}

/// Offsets of a finished record inside its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostLayout {
    pub name: usize,
    pub aliases: usize,
    pub addr_list: usize,
    pub family: AddressFamily,
    pub alias_count: usize,
    pub addr_count: usize,
    /// Bytes of the buffer the record occupies
    pub used: usize,
}

/// Read-only view of a host record living in a caller buffer
#[derive(Debug, Clone, Copy)]
pub struct HostEnt<'a> {
    buf: &'a [u8],
    layout: HostLayout,
}

impl<'a> HostEnt<'a> {
    /// `buf` must be the buffer the layout was produced in
    pub(crate) fn new(buf: &'a [u8], layout: HostLayout) -> Self {
        Self { buf, layout }
    }

    pub fn layout(&self) -> HostLayout {
        self.layout
    }

    /// Canonical name
    pub fn name(&self) -> &'a str {
        self.cstr_at(self.layout.name)
            .and_then(|s| s.to_str().ok())
            .unwrap_or("")
    }

    pub fn aliases(&self) -> impl Iterator<Item = &'a str> + 'a {
        let buf = self.buf;
        PtrArray::new(buf, self.layout.aliases).filter_map(move |off| {
            CStr::from_bytes_until_nul(&buf[off..])
                .ok()
                .and_then(|s| s.to_str().ok())
        })
    }

    pub fn family(&self) -> AddressFamily {
        self.layout.family
    }

    pub fn addr_len(&self) -> usize {
        self.layout.family.addr_len()
    }

    /// Raw address byte-strings, in record order
    pub fn addresses(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let buf = self.buf;
        let len = self.addr_len();
        PtrArray::new(buf, self.layout.addr_list)
            .filter(move |&off| off + len <= buf.len())
            .map(move |off| &buf[off..off + len])
    }

    /// Addresses as `IpAddr`
    pub fn ip_addrs(&self) -> impl Iterator<Item = IpAddr> + 'a {
        self.addresses().filter_map(|raw| match raw.len() {
            NS_INADDRSZ => <[u8; 4]>::try_from(raw).ok().map(|o| IpAddr::V4(Ipv4Addr::from(o))),
            NS_IN6ADDRSZ => <[u8; 16]>::try_from(raw).ok().map(|o| IpAddr::V6(Ipv6Addr::from(o))),
            _ => None,
        })
    }

    /// The record as a C `hostent`. Every pointer refers into the buffer the
    /// record was written to and is only valid while that buffer is.
    pub fn to_hostent(&self) -> libc::hostent {
        libc::hostent {
            h_name: self.buf[self.layout.name..].as_ptr() as *mut c_char,
            h_aliases: self.buf[self.layout.aliases..].as_ptr() as *mut *mut c_char,
            h_addrtype: self.layout.family.as_raw(),
            h_length: self.addr_len() as i32,
            h_addr_list: self.buf[self.layout.addr_list..].as_ptr() as *mut *mut c_char,
        }
    }

    fn cstr_at(&self, off: usize) -> Option<&'a CStr> {
        self.buf
            .get(off..)
            .and_then(|tail| CStr::from_bytes_until_nul(tail).ok())
    }
}

/// Walks a NULL-terminated pointer array, yielding offsets into the buffer
struct PtrArray<'a> {
    buf: &'a [u8],
    slot: usize,
}

impl<'a> PtrArray<'a> {
    fn new(buf: &'a [u8], slot: usize) -> Self {
        Self { buf, slot }
    }
}

impl Iterator for PtrArray<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let raw = self.buf.get(self.slot..self.slot + PTR_SIZE)?;
        let ptr = usize::from_ne_bytes(raw.try_into().ok()?);
        if ptr == 0 {
            return None;
        }
        self.slot += PTR_SIZE;
        let off = ptr.checked_sub(self.buf.as_ptr() as usize)?;
        if off >= self.buf.len() {
            return None;
        }
        Some(off)
    }
}
