//! Answer assembly
//!
//! Turns the answer section of a DNS response into a host record inside the
//! caller's arena. CNAME chains are followed, records of the wrong type or
//! owner are skipped, and aliases and addresses are collected in scratch
//! lists of offsets until the record is sealed.
//!
//! Two kinds of failure are distinguished. Structural damage (a read past
//! the end of the message, rdata that does not end where its length says)
//! aborts assembly with [`ResolveError::Malformed`]. A record that merely
//! fails a semantic check is skipped; a name that fails the syntax check
//! stops the scan but keeps whatever was already collected.

use crate::arena::{AddressFamily, HostBuf, HostLayout};
use crate::config::ResolverConfig;
use crate::constants::{
    type_name, C_IN, MAXADDRS, MAXHOSTNAMELEN, T_A, T_AAAA, T_CNAME, T_KEY, T_PTR, T_SIG,
};
use crate::error::{ResolveError, Result};
use crate::name::{dns_name_equals, res_dnok, res_hnok};
use crate::postproc::{addrsort, is_v4_mapped, map_v4v6};
use crate::wire::Message;

/// What the response is expected to answer
#[derive(Debug, Clone, Copy)]
pub struct AnswerQuery<'q> {
    /// Name the query was sent for
    pub name: &'q str,
    /// T_A, T_AAAA or T_PTR
    pub qtype: u16,
    /// Family of the record being built
    pub family: AddressFamily,
    /// For PTR queries, the address the answer describes
    pub addr: Option<&'q [u8]>,
}

struct Scan {
    /// Canonical name; for forward queries starts as the question name
    name: Option<String>,
    /// Comparison name for PTR answers
    target: String,
    aliases: Vec<usize>,
    addrs: Vec<usize>,
    have_answer: usize,
    too_many: bool,
}

/// Assemble a host record from `answer` into `arena`
pub fn getanswer(
    answer: &[u8],
    query: &AnswerQuery<'_>,
    config: &ResolverConfig,
    mut arena: HostBuf<'_>,
) -> Result<HostLayout> {
    let name_ok: fn(&str) -> bool = match query.qtype {
        T_A | T_AAAA => res_hnok,
        T_PTR => res_dnok,
        _ => return Err(ResolveError::Malformed("unsupported query type")),
    };
    let check = |name: &str| config.options.no_check_names || name_ok(name);
    let forward = query.qtype != T_PTR;

    let msg = Message::new(answer)?;
    let question = msg.question()?;
    if !check(&question.name) {
        return Err(ResolveError::Malformed("query name fails syntax check"));
    }
    if forward && question.name.len() + 1 >= MAXHOSTNAMELEN {
        return Err(ResolveError::Malformed("query name too long"));
    }

    let mut scan = Scan {
        name: forward.then(|| question.name.clone()),
        target: question.name.clone(),
        aliases: Vec::new(),
        addrs: Vec::new(),
        have_answer: 0,
        too_many: false,
    };

    for record in msg.answers(&question) {
        let record = record?;
        if !check(&record.name) {
            break;
        }
        if record.class != C_IN {
            continue;
        }

        if record.rtype == T_CNAME {
            // A target that does not decode drops the whole answer, addresses
            // already collected included
            let target = record.rdata_name()?;
            if !check(&target) {
                break;
            }
            if forward {
                if record.name.len() + 1 >= MAXHOSTNAMELEN
                    || target.len() + 1 >= MAXHOSTNAMELEN
                {
                    break;
                }
                scan.aliases.push(arena.write_str(&record.name)?);
                scan.name = Some(target);
            } else {
                if target.len() + 1 >= MAXHOSTNAMELEN {
                    break;
                }
                scan.target = target;
            }
            continue;
        }

        if record.rtype != query.qtype {
            if record.rtype != T_KEY && record.rtype != T_SIG {
                log::info!(
                    "gethostby*.getanswer: asked for \"{} IN {}\", got type \"{}\"",
                    question.name,
                    type_name(query.qtype),
                    type_name(record.rtype)
                );
            }
            continue;
        }

        match record.rtype {
            T_PTR => {
                if !dns_name_equals(&scan.target, &record.name) {
                    log::info!(
                        "gethostby*.getanswer: asked for \"{}\", got \"{}\"",
                        scan.target,
                        record.name
                    );
                    continue;
                }
                // Same for a PTR target: the answer fails as Malformed
                let host = record.rdata_name()?;
                let host_ok = config.options.no_check_names || res_hnok(&host);
                if !host_ok || host.len() + 1 >= MAXHOSTNAMELEN {
                    break;
                }
                if scan.have_answer == 0 {
                    scan.name = Some(host);
                } else {
                    scan.aliases.push(arena.write_str(&host)?);
                }
            }
            _ => {
                let current = scan.name.as_deref().unwrap_or(&question.name);
                if !dns_name_equals(current, &record.name) {
                    log::info!(
                        "gethostby*.getanswer: asked for \"{}\", got \"{}\"",
                        current,
                        record.name
                    );
                    continue;
                }
                let rdata = record.rdata();
                if rdata.len() != query.family.addr_len() {
                    continue;
                }
                if record.rtype == T_AAAA && is_v4_mapped(rdata) {
                    continue;
                }
                if scan.have_answer == 0 {
                    scan.name = Some(record.name.clone());
                }
                if scan.addrs.len() >= MAXADDRS - 1 {
                    if !scan.too_many {
                        scan.too_many = true;
                        log::debug!("too many addresses ({})", MAXADDRS);
                    }
                    continue;
                }
                scan.addrs.push(arena.write_addr(rdata)?);
            }
        }
        scan.have_answer += 1;
    }

    if scan.have_answer == 0 {
        return Err(ResolveError::NoAnswer);
    }

    finish(scan, query.name, query, config, arena)
}

fn finish(
    mut scan: Scan,
    qname: &str,
    query: &AnswerQuery<'_>,
    config: &ResolverConfig,
    mut arena: HostBuf<'_>,
) -> Result<HostLayout> {
    let mut family = query.family;

    if query.qtype == T_A && scan.have_answer > 1 && !config.sort_list.is_empty() {
        addrsort(&arena, &mut scan.addrs, &config.sort_list);
    }

    let name = match scan.name.take() {
        Some(name) => name,
        None => {
            if qname.len() + 1 >= MAXHOSTNAMELEN {
                return Err(ResolveError::Malformed("query name too long"));
            }
            qname.to_string()
        }
    };
    let name_off = arena.write_str(&name)?;

    if let Some(addr) = query.addr {
        scan.addrs.clear();
        scan.addrs.push(arena.write_addr(addr)?);
    }

    if config.options.use_inet6 {
        map_v4v6(&mut arena, &mut family, &mut scan.addrs)?;
    }

    arena.finish(name_off, &scan.aliases, &scan.addrs, family)
}
