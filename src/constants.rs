//! Resolver constants
//!
//! Record types and classes, buffer limits, address families and the
//! proxy protocol status value.

// ============================================================================
// Address families
// ============================================================================

pub const AF_INET: i32 = libc::AF_INET;
pub const AF_INET6: i32 = libc::AF_INET6;

/// Size of an IPv4 address in bytes
pub const NS_INADDRSZ: usize = 4;
/// Size of an IPv6 address in bytes
pub const NS_IN6ADDRSZ: usize = 16;

// ============================================================================
// Limits
// ============================================================================

/// Maximum host name length including the terminating NUL
pub const MAXHOSTNAMELEN: usize = 256;
/// Maximum presentation-format domain name length
pub const MAXDNAME: usize = 1025;
/// Maximum wire-format (compressed) domain name length
pub const MAXCDNAME: usize = 255;
/// Address pointer slots in a host record (one is reserved for the terminator)
pub const MAXADDRS: usize = 35;
/// Alias pointer slots in a host record (one is reserved for the terminator)
pub const MAXALIASES: usize = 35;
/// Largest answer the DNS strategy will accept from a transport
pub const MAXPACKET: usize = 8 * 1024;
/// Sort rules kept from configuration
pub const MAXRESOLVSORT: usize = 10;
/// Search domains kept from configuration
pub const MAXDNSRCH: usize = 6;

// ============================================================================
// Wire format
// ============================================================================

/// Fixed DNS header size
pub const HFIXEDSZ: usize = 12;
/// Fixed part of a question entry (type + class)
pub const QFIXEDSZ: usize = 4;
/// Fixed part of a resource record after the owner name
pub const RRFIXEDSZ: usize = 10;

pub const T_A: u16 = 1;
pub const T_NS: u16 = 2;
pub const T_CNAME: u16 = 5;
pub const T_SOA: u16 = 6;
pub const T_PTR: u16 = 12;
pub const T_MX: u16 = 15;
pub const T_TXT: u16 = 16;
pub const T_SIG: u16 = 24;
pub const T_KEY: u16 = 25;
pub const T_AAAA: u16 = 28;

/// Internet class
pub const C_IN: u16 = 1;

// ============================================================================
// Proxy protocol
// ============================================================================

/// Status the resolver daemon sends ahead of a serialized host record
pub const DNS_PROXY_QUERY_RESULT: i32 = 222;
/// Network id meaning "no network selected"
pub const NETID_UNSET: u32 = 0;
/// Socket mark meaning "no mark"
pub const MARK_UNSET: u32 = 0;
/// Uid meaning "no uid"
pub const NET_CONTEXT_INVALID_UID: u32 = u32::MAX;

/// Mnemonic for a record type, used in diagnostics
pub fn type_name(rtype: u16) -> &'static str {
    match rtype {
        T_A => "A",
        T_NS => "NS",
        T_CNAME => "CNAME",
        T_SOA => "SOA",
        T_PTR => "PTR",
        T_MX => "MX",
        T_TXT => "TXT",
        T_SIG => "SIG",
        T_KEY => "KEY",
        T_AAAA => "AAAA",
        _ => "UNKNOWN",
    }
}
