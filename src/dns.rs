//! DNS lookup strategy
//!
//! Sending the query is left to a [`DnsTransport`]; this module chooses the
//! query names and types, checks the response header and hands the answer
//! to the assembler.

use crate::arena::{AddressFamily, HostBuf, HostLayout};
use crate::assembler::{getanswer, AnswerQuery};
use crate::config::{NetContext, ResolverConfig};
use crate::constants::{type_name, C_IN, MAXPACKET, T_A, T_AAAA, T_PTR};
use crate::error::{ResolveError, Result};
use crate::name::reverse_name;
use crate::wire::Header;

const RCODE_NOERROR: u8 = 0;
const RCODE_SERVFAIL: u8 = 2;
const RCODE_NXDOMAIN: u8 = 3;

/// Sends one query and receives the raw response. Shared by concurrent
/// lookups.
pub trait DnsTransport: Send + Sync {
    /// Write the response for (`name`, `class`, `rtype`) into `answer` and
    /// return its length. A length larger than `answer` means the response
    /// was truncated to fit.
    fn query(
        &self,
        name: &str,
        class: u16,
        rtype: u16,
        ctx: &NetContext,
        answer: &mut [u8],
    ) -> Result<usize>;
}

/// Map the response code and answer count the way a stub resolver does
/// before parsing
fn check_response(answer: &[u8]) -> Result<()> {
    let header = Header::parse(answer)?;
    match header.rcode() {
        RCODE_NOERROR if header.ancount == 0 => Err(ResolveError::NoAnswer),
        RCODE_NOERROR => Ok(()),
        RCODE_NXDOMAIN => Err(ResolveError::NotFound),
        RCODE_SERVFAIL => Err(ResolveError::TryAgain),
        _ => Err(ResolveError::NoAnswer),
    }
}

/// DNS strategy
pub struct DnsSource<'a> {
    config: &'a ResolverConfig,
    transport: &'a dyn DnsTransport,
}

impl<'a> DnsSource<'a> {
    pub fn new(config: &'a ResolverConfig, transport: &'a dyn DnsTransport) -> Self {
        Self { config, transport }
    }

    /// Names to try: as given, then with each search domain if the name
    /// has no dot
    fn candidates(&self, name: &str) -> Vec<String> {
        let mut names = vec![name.to_string()];
        if !name.contains('.') {
            names.extend(
                self.config
                    .search
                    .iter()
                    .map(|domain| format!("{}.{}", name, domain)),
            );
        }
        names
    }

    fn send(&self, name: &str, rtype: u16, ctx: &NetContext, answer: &mut [u8]) -> Result<usize> {
        let len = self.transport.query(name, C_IN, rtype, ctx, answer)?;
        if len > answer.len() {
            log::debug!("response for {} truncated ({} > {})", name, len, answer.len());
        }
        let len = len.min(answer.len());
        check_response(&answer[..len])?;
        Ok(len)
    }

    pub fn gethtbyname(
        &self,
        name: &str,
        family: AddressFamily,
        ctx: &NetContext,
        buf: &mut [u8],
    ) -> Result<HostLayout> {
        let qtype = match family {
            AddressFamily::Inet => T_A,
            AddressFamily::Inet6 => T_AAAA,
        };
        let mut answer = vec![0u8; MAXPACKET];
        let mut last = ResolveError::NotFound;

        for candidate in self.candidates(name) {
            let len = match self.send(&candidate, qtype, ctx, &mut answer) {
                Ok(len) => len,
                Err(ResolveError::TryAgain) => return Err(ResolveError::TryAgain),
                Err(err) => {
                    log::debug!("res_nquery {} {} failed: {}", candidate, type_name(qtype), err);
                    if err.is_miss() {
                        last = err;
                    }
                    continue;
                }
            };
            let query = AnswerQuery {
                name: &candidate,
                qtype,
                family,
                addr: None,
            };
            match getanswer(&answer[..len], &query, self.config, HostBuf::new(&mut *buf)) {
                Ok(layout) => return Ok(layout),
                Err(err) if err.is_miss() => {
                    log::debug!("no usable answer for {}: {}", candidate, err);
                    last = err;
                }
                Err(err) => return Err(err),
            }
        }
        Err(last)
    }

    pub fn gethtbyaddr(
        &self,
        addr: &[u8],
        family: AddressFamily,
        ctx: &NetContext,
        buf: &mut [u8],
    ) -> Result<HostLayout> {
        let qname = reverse_name(addr).ok_or(ResolveError::InvalidAddressLength {
            expected: family.addr_len(),
            got: addr.len(),
        })?;
        let mut answer = vec![0u8; MAXPACKET];
        let len = match self.send(&qname, T_PTR, ctx, &mut answer) {
            Ok(len) => len,
            Err(ResolveError::TryAgain) => return Err(ResolveError::TryAgain),
            Err(err) => {
                log::debug!("res_nquery {} PTR failed: {}", qname, err);
                return Err(if err.is_miss() { err } else { ResolveError::NotFound });
            }
        };
        let query = AnswerQuery {
            name: &qname,
            qtype: T_PTR,
            family,
            addr: Some(addr),
        };
        getanswer(&answer[..len], &query, self.config, HostBuf::new(buf))
    }
}
