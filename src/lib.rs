//! nresolv - reentrant host name and address resolution
//!
//! Resolves host names to addresses and addresses to names, writing the
//! result into a caller-supplied buffer instead of shared static storage.
//!
//! Lookups are first offered to the resolver daemon over its local socket.
//! Without a daemon they fall back to the configured sources: the hosts
//! file, DNS and (with the `nis` feature) a directory service.
//!
//! ## Module Structure
//!
//! - `constants`: record types, size limits, address families
//! - `error`: `ResolveError` and the netdb status codes
//! - `arena`: record layout inside the caller buffer
//! - `name`: domain name decompression and validation
//! - `wire`: DNS message header, question and record iteration
//! - `assembler`: turns a DNS answer into a host record
//! - `postproc`: IPv4-in-IPv6 mapping and sortlist ordering
//! - `config`: resolv.conf, nsswitch.conf and HOSTALIASES parsing
//! - `hosts`, `dns`, `nis`: lookup sources
//! - `proxy`: daemon request/reply codec
//! - `resolver`: the `Resolver` dispatcher
//! - `ffi`: C entry points (`ffi` feature)

pub mod arena;
pub mod assembler;
pub mod config;
pub mod constants;
pub mod dns;
pub mod error;
pub mod hosts;
pub mod name;
pub mod postproc;
pub mod proxy;
pub mod resolver;
pub mod wire;

#[cfg(feature = "nis")]
pub mod nis;

#[cfg(feature = "ffi")]
pub mod ffi;

// Re-export public API

// Records
pub use arena::{AddressFamily, HostBuf, HostEnt, HostLayout};

// Errors
pub use error::{hstrerror_str, NetdbStatus, ResolveError, Result};

// Configuration
pub use config::{NetContext, NssSource, ResolverConfig, ResolverOptions, SortRule};

// Sources and transports
pub use dns::DnsTransport;
#[cfg(feature = "nis")]
pub use nis::DirectoryService;
pub use proxy::{NoProxy, ProxyConnector, ProxyStream, UnixProxy};

// Dispatcher
pub use resolver::Resolver;
