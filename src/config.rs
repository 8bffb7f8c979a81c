//! Resolver configuration
//!
//! [`ResolverConfig`] is an immutable value borrowed by every lookup. It is
//! usually assembled from `/etc/resolv.conf`, `/etc/nsswitch.conf` and the
//! `HOSTALIASES` file, but can be built by hand.

use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use crate::constants::{MAXDNSRCH, MAXRESOLVSORT, NETID_UNSET, MARK_UNSET, NET_CONTEXT_INVALID_UID};

pub const RESOLV_CONF_PATH: &str = "/etc/resolv.conf";
pub const NSSWITCH_CONF_PATH: &str = "/etc/nsswitch.conf";
pub const HOSTS_PATH: &str = "/etc/hosts";
pub const HOSTALIASES_ENV: &str = "HOSTALIASES";

/// Lookup source, in nsswitch order
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NssSource {
    /// Local hosts file
    Files,
    /// DNS query
    Dns,
    /// Directory service (NIS)
    Nis,
}

/// Resolver option flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Prefer IPv6 and return IPv4 results as v4-mapped addresses
    pub use_inet6: bool,
    /// Skip host/domain name syntax checks on answers
    pub no_check_names: bool,
    /// Ignore `HOSTALIASES`
    pub no_aliases: bool,
}

/// One sortlist entry: addresses matching `net` under `mask` rank by
/// position in the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortRule {
    pub net: Ipv4Addr,
    pub mask: u32,
}

impl SortRule {
    pub fn new(net: Ipv4Addr, mask: u32) -> Self {
        Self { net, mask }
    }

    /// Rule with the classful mask of `net`
    pub fn classful(net: Ipv4Addr) -> Self {
        Self::new(net, classful_mask(net))
    }

    pub fn matches(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & self.mask == u32::from(self.net) & self.mask
    }
}

/// Class A/B/C network mask of an address
pub fn classful_mask(addr: Ipv4Addr) -> u32 {
    let a = u32::from(addr);
    if a & 0x8000_0000 == 0 {
        0xFF00_0000
    } else if a & 0xC000_0000 == 0x8000_0000 {
        0xFFFF_0000
    } else {
        0xFFFF_FF00
    }
}

/// Network identity forwarded to the proxy and the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetContext {
    pub app_netid: u32,
    pub app_mark: u32,
    pub dns_netid: u32,
    pub dns_mark: u32,
    pub uid: u32,
}

impl NetContext {
    pub const UNSET: NetContext = NetContext {
        app_netid: NETID_UNSET,
        app_mark: MARK_UNSET,
        dns_netid: NETID_UNSET,
        dns_mark: MARK_UNSET,
        uid: NET_CONTEXT_INVALID_UID,
    };

    /// Context for an explicit network, used on both the app and DNS side
    pub fn for_net(netid: u32, mark: u32) -> Self {
        Self {
            app_netid: netid,
            app_mark: mark,
            dns_netid: netid,
            dns_mark: mark,
            uid: NET_CONTEXT_INVALID_UID,
        }
    }

    /// Network id sent to the resolver daemon
    pub fn resolv_netid(&self) -> u32 {
        self.app_netid
    }
}

impl Default for NetContext {
    fn default() -> Self {
        Self::UNSET
    }
}

/// Resolver configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub options: ResolverOptions,
    pub sort_list: Vec<SortRule>,
    pub search: Vec<String>,
    pub sources: Vec<NssSource>,
    /// `(alias, target)` pairs from `HOSTALIASES`
    pub host_aliases: Vec<(String, String)>,
    pub hosts_path: PathBuf,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            options: ResolverOptions::default(),
            sort_list: Vec::new(),
            search: Vec::new(),
            sources: vec![NssSource::Files, NssSource::Dns],
            host_aliases: Vec::new(),
            hosts_path: PathBuf::from(HOSTS_PATH),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the standard system files. Missing or unreadable files
    /// leave the defaults in place.
    pub fn load_system() -> Self {
        let mut config = Self::new();
        if let Some(content) = read_optional(Path::new(RESOLV_CONF_PATH)) {
            config.parse_resolv_conf(&content);
        }
        if let Some(content) = read_optional(Path::new(NSSWITCH_CONF_PATH)) {
            config.parse_nsswitch(&content);
        }
        config.load_host_aliases_from_env();
        config
    }

    /// Read the file named by `HOSTALIASES`, unless aliases are disabled
    pub fn load_host_aliases_from_env(&mut self) {
        if self.options.no_aliases {
            return;
        }
        let Some(path) = std::env::var_os(HOSTALIASES_ENV) else {
            return;
        };
        if let Some(content) = read_optional(Path::new(&path)) {
            self.parse_host_aliases(&content);
        }
    }

    /// Parse resolv.conf content
    pub fn parse_resolv_conf(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let first = match parts.next() {
                Some(s) => s,
                None => continue,
            };

            match first {
                "domain" => {
                    // "domain" replaces the search list with a single entry
                    if let Some(domain) = parts.next() {
                        self.search.clear();
                        self.add_search_domain(domain);
                    }
                }
                "search" => {
                    self.search.clear();
                    for domain in parts {
                        self.add_search_domain(domain);
                    }
                }
                "sortlist" => {
                    self.sort_list.clear();
                    for entry in parts {
                        if self.sort_list.len() >= MAXRESOLVSORT {
                            break;
                        }
                        if let Some(rule) = parse_sort_rule(entry) {
                            self.sort_list.push(rule);
                        }
                    }
                }
                "options" => {
                    for opt in parts {
                        match opt {
                            "inet6" => self.options.use_inet6 = true,
                            "no-check-names" => self.options.no_check_names = true,
                            "no-aliases" => self.options.no_aliases = true,
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn add_search_domain(&mut self, domain: &str) {
        if self.search.len() < MAXDNSRCH {
            self.search.push(domain.trim_end_matches('.').to_string());
        }
    }

    /// Parse nsswitch.conf content; only the `hosts:` line matters
    pub fn parse_nsswitch(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(hosts_line) = line.strip_prefix("hosts:") {
                let mut sources = Vec::new();
                for token in hosts_line.split_whitespace() {
                    let source = match token {
                        "files" => NssSource::Files,
                        "dns" => NssSource::Dns,
                        "nis" | "yp" => NssSource::Nis,
                        _ => continue,
                    };
                    if !sources.contains(&source) {
                        sources.push(source);
                    }
                }
                if !sources.is_empty() {
                    self.sources = sources;
                }
                break;
            }
        }
    }

    /// Parse `alias canonical` lines
    pub fn parse_host_aliases(&mut self, content: &str) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            if let (Some(alias), Some(target)) = (parts.next(), parts.next()) {
                self.host_aliases.push((alias.to_string(), target.to_string()));
            }
        }
    }

    /// Target of a user-level alias for a dot-less name
    pub fn host_alias(&self, name: &str) -> Option<&str> {
        if self.options.no_aliases || name.contains('.') {
            return None;
        }
        self.host_aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, target)| target.as_str())
    }
}

/// `addr[/mask]` or `addr[&mask]`, mask in dotted-quad form. A missing or
/// unparsable mask falls back to the classful mask.
fn parse_sort_rule(entry: &str) -> Option<SortRule> {
    let (addr, mask) = match entry.find(|c| c == '/' || c == '&') {
        Some(idx) => (&entry[..idx], Some(&entry[idx + 1..])),
        None => (entry, None),
    };
    let net: Ipv4Addr = addr.parse().ok()?;
    let mask = mask
        .and_then(|m| m.parse::<Ipv4Addr>().ok())
        .map(u32::from)
        .unwrap_or_else(|| classful_mask(net));
    Some(SortRule::new(net, mask))
}

fn read_optional(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            log::debug!("cannot read {}: {}", path.display(), err);
            None
        }
    }
}
