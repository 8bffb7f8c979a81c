//! End-to-end lookups through `Resolver` with in-memory DNS answers

mod common;

use common::{init_logging, name_rdata, MessageBuilder, MockTransport};
use nresolv::constants::{AF_INET, AF_INET6, T_A, T_AAAA, T_CNAME, T_PTR};
use nresolv::{AddressFamily, NssSource, ResolveError, Resolver, ResolverConfig, SortRule};

fn dns_config() -> ResolverConfig {
    ResolverConfig {
        sources: vec![NssSource::Dns],
        ..ResolverConfig::new()
    }
}

fn chain_response() -> Vec<u8> {
    MessageBuilder::new("alias1.example", T_A)
        .answer("alias1.example", T_CNAME, &name_rdata("alias2.example"))
        .answer("alias2.example", T_A, &[5, 6, 7, 8])
        .answer("alias2.example", T_A, &[5, 6, 7, 9])
        .build()
}

/// `[lo, hi)` address range of a buffer
fn span(buf: &[u8]) -> (usize, usize) {
    let lo = buf.as_ptr() as usize;
    (lo, lo + buf.len())
}

// =========================================================================
// CNAME chains
// =========================================================================

#[test]
fn test_cname_chain_becomes_alias() {
    init_logging();
    let transport = MockTransport::default().with("alias1.example", T_A, chain_response());
    let resolver = Resolver::new(dns_config()).with_transport(transport);

    let mut buf = vec![0u8; 1024];
    let host = resolver.gethostbyname2_r("alias1.example", AF_INET, &mut buf).unwrap();

    assert_eq!(host.name(), "alias2.example");
    assert_eq!(host.aliases().collect::<Vec<_>>(), vec!["alias1.example"]);
    assert_eq!(host.family(), AddressFamily::Inet);
    assert_eq!(
        host.addresses().collect::<Vec<_>>(),
        vec![&[5u8, 6, 7, 8][..], &[5u8, 6, 7, 9][..]]
    );
}

#[test]
fn test_record_pointers_stay_inside_buffer() {
    init_logging();
    let transport = MockTransport::default().with("alias1.example", T_A, chain_response());
    let resolver = Resolver::new(dns_config()).with_transport(transport);

    let mut buf = vec![0u8; 1024];
    let (lo, hi) = span(&buf);
    let host = resolver.gethostbyname2_r("alias1.example", AF_INET, &mut buf).unwrap();
    let used = host.layout().used;
    assert!(used <= hi - lo);

    let raw = host.to_hostent();
    let inside = |p: usize| p >= lo && p < lo + used;
    assert!(inside(raw.h_name as usize));
    assert!(inside(raw.h_aliases as usize));
    assert!(inside(raw.h_addr_list as usize));
    unsafe {
        let mut i = 0;
        while !(*raw.h_aliases.add(i)).is_null() {
            assert!(inside(*raw.h_aliases.add(i) as usize));
            i += 1;
        }
        let mut i = 0;
        while !(*raw.h_addr_list.add(i)).is_null() {
            let addr = *raw.h_addr_list.add(i) as usize;
            assert!(inside(addr));
            assert!(addr + raw.h_length as usize <= lo + used);
            assert_eq!(addr % 4, 0);
            i += 1;
        }
        assert_eq!(i, 2);
    }
}

// =========================================================================
// Buffer exhaustion and truncated answers
// =========================================================================

#[test]
fn test_one_byte_short_is_exhaustion() {
    init_logging();
    let transport = MockTransport::default().with("alias1.example", T_A, chain_response());
    let resolver = Resolver::new(dns_config()).with_transport(transport);

    let mut buf = vec![0u8; 1024];
    let used = resolver
        .gethostbyname2_r("alias1.example", AF_INET, &mut buf)
        .unwrap()
        .layout()
        .used;

    // Same base address, so alignment padding is identical
    let err = resolver
        .gethostbyname2_r("alias1.example", AF_INET, &mut buf[..used - 1])
        .unwrap_err();
    assert!(matches!(err, ResolveError::BufferExhausted));

    let host = resolver
        .gethostbyname2_r("alias1.example", AF_INET, &mut buf[..used])
        .unwrap();
    assert_eq!(host.name(), "alias2.example");
}

#[test]
fn test_truncated_answers_never_escape() {
    init_logging();
    let full = chain_response();

    for cut in 0..full.len() {
        let transport = MockTransport::default().with("alias1.example", T_A, full[..cut].to_vec());
        let resolver = Resolver::new(dns_config()).with_transport(transport);
        let mut buf = vec![0u8; 1024];
        let (lo, hi) = span(&buf);

        match resolver.gethostbyname2_r("alias1.example", AF_INET, &mut buf) {
            Ok(host) => {
                // A cut on a record boundary keeps the records before it
                assert_eq!(host.name(), "alias2.example");
                for addr in host.addresses() {
                    let p = addr.as_ptr() as usize;
                    assert!(p >= lo && p + 4 <= hi);
                    assert!(addr == [5, 6, 7, 8] || addr == [5, 6, 7, 9]);
                }
            }
            Err(err) => assert!(
                matches!(
                    err,
                    ResolveError::Malformed(_) | ResolveError::NoAnswer | ResolveError::NotFound
                ),
                "cut {}: unexpected {:?}",
                cut,
                err
            ),
        }
    }
}

// =========================================================================
// Address post-processing
// =========================================================================

#[test]
fn test_sortlist_orders_forward_answers() {
    init_logging();
    let response = MessageBuilder::new("multi.example", T_A)
        .answer("multi.example", T_A, &[10, 2, 0, 1])
        .answer("multi.example", T_A, &[10, 1, 0, 1])
        .answer("multi.example", T_A, &[192, 0, 2, 1])
        .build();
    let transport = MockTransport::default().with("multi.example", T_A, response);
    let mut config = dns_config();
    config.sort_list = vec![
        SortRule::new("10.1.0.0".parse().unwrap(), 0xffff_0000),
        SortRule::new("10.2.0.0".parse().unwrap(), 0xffff_0000),
    ];
    let resolver = Resolver::new(config).with_transport(transport);

    let mut buf = vec![0u8; 1024];
    let host = resolver.gethostbyname2_r("multi.example", AF_INET, &mut buf).unwrap();
    let order: Vec<String> = host.ip_addrs().map(|a| a.to_string()).collect();
    assert_eq!(order, vec!["10.1.0.1", "10.2.0.1", "192.0.2.1"]);
}

#[test]
fn test_inet6_preference_maps_ipv4_answers() {
    init_logging();
    let response = MessageBuilder::new("v4only.example", T_A)
        .answer("v4only.example", T_A, &[203, 0, 113, 7])
        .build();
    let transport = MockTransport::default().with("v4only.example", T_A, response);
    let mut config = dns_config();
    config.options.use_inet6 = true;
    let resolver = Resolver::new(config).with_transport(transport);

    let mut buf = vec![0u8; 1024];
    let host = resolver.gethostbyname_r("v4only.example", &mut buf).unwrap();
    assert_eq!(host.family(), AddressFamily::Inet6);
    assert_eq!(host.addr_len(), 16);
    assert_eq!(host.ip_addrs().next().unwrap().to_string(), "::ffff:203.0.113.7");
}

#[test]
fn test_ipv6_answer_not_synthesized_again() {
    init_logging();
    let v6 = [0x20, 1, 0xd, 0xb8, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x42];
    let response = MessageBuilder::new("dual.example", T_AAAA)
        .answer("dual.example", T_AAAA, &v6)
        .build();
    let transport = MockTransport::default().with("dual.example", T_AAAA, response);
    let mut config = dns_config();
    config.options.use_inet6 = true;
    let resolver = Resolver::new(config).with_transport(transport);

    let mut buf = vec![0u8; 1024];
    let host = resolver.gethostbyname2_r("dual.example", AF_INET6, &mut buf).unwrap();
    assert_eq!(host.addresses().collect::<Vec<_>>(), vec![&v6[..]]);
}

// =========================================================================
// Reverse lookups
// =========================================================================

#[test]
fn test_reverse_lookup_through_dns() {
    init_logging();
    let response = MessageBuilder::new("7.113.0.203.in-addr.arpa", T_PTR)
        .answer("7.113.0.203.in-addr.arpa", T_PTR, &name_rdata("seven.example"))
        .answer("7.113.0.203.in-addr.arpa", T_PTR, &name_rdata("other.example"))
        .build();
    let transport = MockTransport::default().with("7.113.0.203.in-addr.arpa", T_PTR, response);
    let resolver = Resolver::new(dns_config()).with_transport(transport);

    let mut buf = vec![0u8; 1024];
    let host = resolver.gethostbyaddr_r(&[203, 0, 113, 7], AF_INET, &mut buf).unwrap();
    assert_eq!(host.name(), "seven.example");
    assert_eq!(host.aliases().collect::<Vec<_>>(), vec!["other.example"]);
    assert_eq!(host.addresses().collect::<Vec<_>>(), vec![&[203u8, 0, 113, 7][..]]);
}

#[test]
fn test_reverse_without_answer_is_not_found() {
    init_logging();
    let transport = MockTransport::default();
    let resolver = Resolver::new(dns_config()).with_transport(transport);
    let mut addr = [0u8; 16];
    addr[0] = 0x20;
    addr[1] = 0x01;
    addr[15] = 0x01;

    let mut buf = vec![0u8; 256];
    let err = resolver.gethostbyaddr_r(&addr, AF_INET6, &mut buf).unwrap_err();
    assert!(matches!(err, ResolveError::NotFound));
}

// =========================================================================
// Shared resolver
// =========================================================================

/// Owned copy of one answer: name, aliases, addresses
type Snapshot = (String, Vec<String>, Vec<Vec<u8>>);

fn snapshot_within(host: &nresolv::HostEnt<'_>, lo: usize, hi: usize) -> Snapshot {
    let inside = |p: usize| p >= lo && p < hi;
    assert!(inside(host.name().as_ptr() as usize));
    for alias in host.aliases() {
        assert!(inside(alias.as_ptr() as usize));
    }
    for addr in host.addresses() {
        assert!(inside(addr.as_ptr() as usize));
    }
    (
        host.name().to_string(),
        host.aliases().map(str::to_string).collect(),
        host.addresses().map(<[u8]>::to_vec).collect(),
    )
}

#[test]
fn test_shared_resolver_across_threads() {
    use std::io::Write;
    use std::sync::Arc;
    use std::thread;

    init_logging();
    let mut hosts = tempfile::NamedTempFile::new().unwrap();
    hosts.write_all(b"192.0.2.50 local.example local\n").unwrap();
    let transport = MockTransport::default().with("alias1.example", T_A, chain_response());
    let config = ResolverConfig {
        sources: vec![NssSource::Files, NssSource::Dns],
        hosts_path: hosts.path().to_path_buf(),
        ..ResolverConfig::new()
    };
    let resolver = Arc::new(Resolver::new(config).with_transport(transport));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                let mut results = Vec::new();
                for _ in 0..16 {
                    let mut buf = vec![0u8; 1024];
                    let (lo, hi) = span(&buf);
                    let host = resolver
                        .gethostbyname2_r("alias1.example", AF_INET, &mut buf)
                        .unwrap();
                    let remote = snapshot_within(&host, lo, hi);

                    let mut buf = vec![0u8; 1024];
                    let (lo, hi) = span(&buf);
                    let host = resolver.gethostbyname2_r("local", AF_INET, &mut buf).unwrap();
                    let local = snapshot_within(&host, lo, hi);
                    results.push((remote, local));
                }
                results
            })
        })
        .collect();

    let results: Vec<_> = workers
        .into_iter()
        .flat_map(|worker| worker.join().unwrap())
        .collect();
    drop(hosts);

    assert_eq!(results.len(), 8 * 16);
    let (remote, local) = &results[0];
    assert_eq!(remote.0, "alias2.example");
    assert_eq!(remote.1, vec!["alias1.example"]);
    assert_eq!(remote.2, vec![vec![5, 6, 7, 8], vec![5, 6, 7, 9]]);
    assert_eq!(local.0, "local.example");
    assert_eq!(local.1, vec!["local"]);
    assert_eq!(local.2, vec![vec![192, 0, 2, 50]]);
    assert!(results.iter().all(|r| r == &results[0]));
}
