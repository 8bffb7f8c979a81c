//! Domain name handling
//!
//! Decompression of wire-format names into presentation form, the host and
//! domain name syntax checks applied to answers, and reverse-lookup query
//! names.

use crate::constants::{MAXCDNAME, MAXDNAME, NS_IN6ADDRSZ, NS_INADDRSZ};
use crate::error::{ResolveError, Result};

const INDIR_MASK: u8 = 0xC0;

/// Expand the (possibly compressed) name starting at `pos` in `msg`.
///
/// Returns the name in presentation form and the number of bytes the name
/// occupies at `pos`. The root name expands to an empty string. Compression
/// pointers may target any offset inside the message; pointer loops are
/// caught by bounding the number of bytes examined by the message length.
pub fn expand_name(msg: &[u8], pos: usize) -> Result<(String, usize)> {
    let mut out = String::new();
    let consumed = unpack_name(msg, pos, &mut out)?;
    if out.len() + 1 > MAXDNAME {
        return Err(ResolveError::Malformed("dns name too long"));
    }
    Ok((out, consumed))
}

fn unpack_name(msg: &[u8], pos: usize, out: &mut String) -> Result<usize> {
    let mut src = pos;
    let mut consumed: Option<usize> = None;
    let mut checked = 0usize;
    let mut wire_len = 0usize;

    loop {
        let n = *msg
            .get(src)
            .ok_or(ResolveError::Malformed("dns name exceeds message"))?;
        src += 1;

        match n & INDIR_MASK {
            0 => {
                if n == 0 {
                    break;
                }
                let len = n as usize;
                wire_len += len + 1;
                if wire_len + 1 > MAXCDNAME {
                    return Err(ResolveError::Malformed("dns name too long"));
                }
                let label = msg
                    .get(src..src + len)
                    .ok_or(ResolveError::Malformed("dns label exceeds message"))?;
                if wire_len > len + 1 {
                    out.push('.');
                }
                push_label(out, label);
                src += len;
                checked += len + 1;
            }
            INDIR_MASK => {
                let low = *msg
                    .get(src)
                    .ok_or(ResolveError::Malformed("dns name pointer overflow"))?;
                if consumed.is_none() {
                    consumed = Some(src + 1 - pos);
                }
                let target = (((n & !INDIR_MASK) as usize) << 8) | low as usize;
                if target >= msg.len() {
                    return Err(ResolveError::Malformed("dns name pointer out of bounds"));
                }
                src = target;
                checked += 2;
                if checked >= msg.len() {
                    return Err(ResolveError::Malformed("dns name pointer loop"));
                }
            }
            _ => return Err(ResolveError::Malformed("dns invalid label type")),
        }
    }

    Ok(consumed.unwrap_or(src - pos))
}

fn push_label(out: &mut String, label: &[u8]) {
    for &c in label {
        if is_special(c) {
            out.push('\\');
            out.push(c as char);
        } else if is_printable(c) {
            out.push(c as char);
        } else {
            out.push_str(&format!("\\{:03}", c));
        }
    }
}

#[inline]
fn is_special(c: u8) -> bool {
    matches!(c, b'"' | b'.' | b';' | b'\\' | b'(' | b')' | b'@' | b'$')
}

#[inline]
fn is_printable(c: u8) -> bool {
    c > 0x20 && c < 0x7f
}

// ============================================================================
// Syntax checks
// ============================================================================

#[inline]
fn is_border(c: u8) -> bool {
    c.is_ascii_alphanumeric()
}

#[inline]
fn is_middle(c: u8) -> bool {
    is_border(c) || c == b'-' || c == b'_'
}

/// Host name check: every label starts and ends with a letter or digit and
/// contains only letters, digits, hyphens and underscores in between.
pub fn res_hnok(name: &str) -> bool {
    let bytes = name.as_bytes();
    let mut prev = b'.';
    for (i, &ch) in bytes.iter().enumerate() {
        let next = bytes.get(i + 1).copied().unwrap_or(0);
        let ok = if ch == b'.' {
            true
        } else if prev == b'.' || next == b'.' || next == 0 {
            is_border(ch)
        } else {
            is_middle(ch)
        };
        if !ok {
            return false;
        }
        prev = ch;
    }
    true
}

/// Domain name check: printable ASCII other than space
pub fn res_dnok(name: &str) -> bool {
    name.bytes().all(is_printable)
}

/// Case-insensitive name comparison
pub fn dns_name_equals(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

// ============================================================================
// Reverse lookup names
// ============================================================================

/// Query name for a PTR lookup of a raw IPv4 or IPv6 address
pub fn reverse_name(addr: &[u8]) -> Option<String> {
    match addr.len() {
        NS_INADDRSZ => Some(format!(
            "{}.{}.{}.{}.in-addr.arpa",
            addr[3], addr[2], addr[1], addr[0]
        )),
        NS_IN6ADDRSZ => {
            let mut name = String::with_capacity(72);
            for &b in addr.iter().rev() {
                name.push_str(&format!("{:x}.{:x}.", b & 0xf, b >> 4));
            }
            name.push_str("ip6.arpa");
            Some(name)
        }
        _ => None,
    }
}
