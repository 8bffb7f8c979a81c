//! Address post-processing
//!
//! Runs on an assembled address list before its pointer array is written:
//! IPv4-in-IPv6 synthesis for callers that prefer IPv6, and sortlist
//! ordering of multi-address IPv4 answers.

use std::net::Ipv4Addr;

use crate::arena::{AddressFamily, HostBuf};
use crate::config::SortRule;
use crate::constants::NS_INADDRSZ;
use crate::error::Result;

/// `::ffff:0:0/96`
const V4MAPPED_PREFIX: [u8; 12] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff];

/// IPv4-mapped IPv6 form of a raw IPv4 address
pub fn map_v4v6_address(v4: [u8; 4]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..12].copy_from_slice(&V4MAPPED_PREFIX);
    out[12..].copy_from_slice(&v4);
    out
}

pub fn is_v4_mapped(addr: &[u8]) -> bool {
    addr.len() == 16 && addr[..12] == V4MAPPED_PREFIX
}

/// Rewrite every pending IPv4 address as its mapped IPv6 form.
///
/// The wider copies are appended to the arena and `addrs` is updated to
/// point at them. A record that is already IPv6 is left alone.
pub fn map_v4v6(
    arena: &mut HostBuf<'_>,
    family: &mut AddressFamily,
    addrs: &mut [usize],
) -> Result<()> {
    if *family != AddressFamily::Inet {
        return Ok(());
    }
    for off in addrs.iter_mut() {
        let mut v4 = [0u8; NS_INADDRSZ];
        v4.copy_from_slice(arena.get(*off, NS_INADDRSZ));
        *off = arena.write_addr(&map_v4v6_address(v4))?;
    }
    *family = AddressFamily::Inet6;
    Ok(())
}

/// Index of the first rule matching `addr`, or the rule count
pub fn sort_rank(addr: Ipv4Addr, rules: &[SortRule]) -> usize {
    rules
        .iter()
        .position(|rule| rule.matches(addr))
        .unwrap_or(rules.len())
}

/// Stable insertion sort by rank that only starts moving entries at the
/// first one ranked better than its predecessor.
pub fn sort_by_rank<T>(items: &mut [T], ranks: &mut [usize]) {
    debug_assert_eq!(items.len(), ranks.len());
    let num = items.len().min(ranks.len());

    let needsort = match (1..num).find(|&i| ranks[i] < ranks[i - 1]) {
        Some(i) => i,
        None => return,
    };

    for i in needsort..num {
        let mut j = i;
        while j > 0 && ranks[j - 1] > ranks[j] {
            ranks.swap(j - 1, j);
            items.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Reorder pending IPv4 addresses by the configured sortlist
pub fn addrsort(arena: &HostBuf<'_>, addrs: &mut [usize], rules: &[SortRule]) {
    if rules.is_empty() || addrs.len() < 2 {
        return;
    }
    let mut ranks: Vec<usize> = addrs
        .iter()
        .map(|&off| {
            let mut v4 = [0u8; NS_INADDRSZ];
            v4.copy_from_slice(arena.get(off, NS_INADDRSZ));
            sort_rank(Ipv4Addr::from(v4), rules)
        })
        .collect();
    sort_by_rank(addrs, &mut ranks);
}
