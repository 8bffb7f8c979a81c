//! C ABI
//!
//! Reentrant entry points following the `gethostbyname_r` convention: the
//! record is written into the caller's buffer, `*result` points at the
//! filled `hostent` (or is NULL), `*h_errnop` receives the netdb status and
//! the return value is 0, `ERANGE` when the buffer is too small, or the
//! status code for any other failure.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;
use std::slice;

use crate::arena::HostEnt;
use crate::error::{ResolveError, Result, HOST_NOT_FOUND, NETDB_INTERNAL, NETDB_SUCCESS};
use crate::resolver::Resolver;

/// Store a lookup result in the caller's out-parameters
///
/// # Safety
/// `ret`, `result` and `h_errnop` must be valid for writes.
unsafe fn complete(
    outcome: Result<HostEnt<'_>>,
    ret: *mut libc::hostent,
    result: *mut *mut libc::hostent,
    h_errnop: *mut c_int,
) -> c_int {
    match outcome {
        Ok(host) => {
            *ret = host.to_hostent();
            *result = ret;
            *h_errnop = NETDB_SUCCESS;
            0
        }
        Err(err) => {
            *result = ptr::null_mut();
            let status = err.status().as_raw();
            *h_errnop = status;
            log::debug!("lookup failed: {}", err);
            match err {
                ResolveError::BufferExhausted => libc::ERANGE,
                _ if status == HOST_NOT_FOUND => 0,
                _ => status,
            }
        }
    }
}

/// # Safety
/// `buf` must be valid for `buflen` bytes of writes.
unsafe fn caller_buf<'b>(buf: *mut c_char, buflen: usize) -> &'b mut [u8] {
    if buf.is_null() || buflen == 0 {
        &mut []
    } else {
        slice::from_raw_parts_mut(buf.cast::<u8>(), buflen)
    }
}

/// # Safety
/// `name` must be NUL-terminated.
unsafe fn c_name<'n>(name: *const c_char) -> Option<&'n str> {
    if name.is_null() {
        return None;
    }
    CStr::from_ptr(name).to_str().ok()
}

unsafe fn invalid(result: *mut *mut libc::hostent, h_errnop: *mut c_int) -> c_int {
    *result = ptr::null_mut();
    *h_errnop = NETDB_INTERNAL;
    libc::EINVAL
}

/// # Safety
/// `resolver` must come from a live [`Resolver`]; `name` must be a
/// NUL-terminated string; `ret`, `result` and `h_errnop` must be writable;
/// `buf` must be writable for `buflen` bytes and outlive every use of the
/// returned record.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn nr_gethostbyname_r(
    resolver: *const Resolver,
    name: *const c_char,
    ret: *mut libc::hostent,
    buf: *mut c_char,
    buflen: usize,
    result: *mut *mut libc::hostent,
    h_errnop: *mut c_int,
) -> c_int {
    let (Some(resolver), Some(name)) = (resolver.as_ref(), c_name(name)) else {
        return invalid(result, h_errnop);
    };
    let outcome = resolver.gethostbyname_r(name, caller_buf(buf, buflen));
    complete(outcome, ret, result, h_errnop)
}

/// # Safety
/// As [`nr_gethostbyname_r`].
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn nr_gethostbyname2_r(
    resolver: *const Resolver,
    name: *const c_char,
    af: c_int,
    ret: *mut libc::hostent,
    buf: *mut c_char,
    buflen: usize,
    result: *mut *mut libc::hostent,
    h_errnop: *mut c_int,
) -> c_int {
    let (Some(resolver), Some(name)) = (resolver.as_ref(), c_name(name)) else {
        return invalid(result, h_errnop);
    };
    let outcome = resolver.gethostbyname2_r(name, af, caller_buf(buf, buflen));
    complete(outcome, ret, result, h_errnop)
}

/// # Safety
/// `addr` must be readable for `len` bytes; otherwise as
/// [`nr_gethostbyname_r`].
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn nr_gethostbyaddr_r(
    resolver: *const Resolver,
    addr: *const c_void,
    len: libc::socklen_t,
    af: c_int,
    ret: *mut libc::hostent,
    buf: *mut c_char,
    buflen: usize,
    result: *mut *mut libc::hostent,
    h_errnop: *mut c_int,
) -> c_int {
    let Some(resolver) = resolver.as_ref() else {
        return invalid(result, h_errnop);
    };
    if addr.is_null() {
        return invalid(result, h_errnop);
    }
    let addr = slice::from_raw_parts(addr.cast::<u8>(), len as usize);
    let outcome = resolver.gethostbyaddr_r(addr, af, caller_buf(buf, buflen));
    complete(outcome, ret, result, h_errnop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use std::ffi::CString;
    use std::mem::MaybeUninit;

    fn resolver() -> Resolver {
        Resolver::new(ResolverConfig {
            sources: Vec::new(),
            ..ResolverConfig::new()
        })
    }

    #[test]
    fn test_literal_fills_hostent() {
        let resolver = resolver();
        let name = CString::new("10.9.8.7").unwrap();
        let mut ret = MaybeUninit::<libc::hostent>::zeroed();
        let mut buf = [0 as c_char; 128];
        let mut result: *mut libc::hostent = ptr::null_mut();
        let mut h_errno = -99;

        let rc = unsafe {
            nr_gethostbyname2_r(
                &resolver,
                name.as_ptr(),
                libc::AF_INET,
                ret.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
                &mut h_errno,
            )
        };
        assert_eq!(rc, 0);
        assert_eq!(h_errno, NETDB_SUCCESS);
        assert_eq!(result, ret.as_mut_ptr());

        let host = unsafe { &*result };
        assert_eq!(host.h_addrtype, libc::AF_INET);
        assert_eq!(host.h_length, 4);
        let hname = unsafe { CStr::from_ptr(host.h_name) };
        assert_eq!(hname.to_str().unwrap(), "10.9.8.7");
        unsafe {
            assert!((*host.h_aliases).is_null());
            let first = *host.h_addr_list;
            assert_eq!(slice::from_raw_parts(first.cast::<u8>(), 4), &[10, 9, 8, 7]);
            assert!((*host.h_addr_list.add(1)).is_null());
        }
        let base = buf.as_ptr() as usize;
        let end = base + buf.len();
        assert!((host.h_name as usize) >= base && (host.h_name as usize) < end);
    }

    #[test]
    fn test_not_found_returns_zero() {
        let resolver = resolver();
        let name = CString::new("nowhere").unwrap();
        let mut ret = MaybeUninit::<libc::hostent>::zeroed();
        let mut buf = [0 as c_char; 128];
        let mut result: *mut libc::hostent = ret.as_mut_ptr();
        let mut h_errno = 0;

        let rc = unsafe {
            nr_gethostbyname_r(
                &resolver,
                name.as_ptr(),
                ret.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
                &mut h_errno,
            )
        };
        assert_eq!(rc, 0);
        assert!(result.is_null());
        assert_eq!(h_errno, HOST_NOT_FOUND);
    }

    #[test]
    fn test_small_buffer_is_erange() {
        let resolver = resolver();
        let name = CString::new("2001:db8::1").unwrap();
        let mut ret = MaybeUninit::<libc::hostent>::zeroed();
        let mut buf = [0 as c_char; 20];
        let mut result: *mut libc::hostent = ptr::null_mut();
        let mut h_errno = 0;

        let rc = unsafe {
            nr_gethostbyname2_r(
                &resolver,
                name.as_ptr(),
                libc::AF_INET6,
                ret.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
                &mut h_errno,
            )
        };
        assert_eq!(rc, libc::ERANGE);
        assert!(result.is_null());
        assert_eq!(h_errno, NETDB_INTERNAL);
    }

    #[test]
    fn test_reverse_link_local() {
        let resolver = resolver();
        let mut addr = [0u8; 16];
        addr[0] = 0xfe;
        addr[1] = 0x80;
        let mut ret = MaybeUninit::<libc::hostent>::zeroed();
        let mut buf = [0 as c_char; 64];
        let mut result: *mut libc::hostent = ptr::null_mut();
        let mut h_errno = 0;

        let rc = unsafe {
            nr_gethostbyaddr_r(
                &resolver,
                addr.as_ptr().cast(),
                addr.len() as libc::socklen_t,
                libc::AF_INET6,
                ret.as_mut_ptr(),
                buf.as_mut_ptr(),
                buf.len(),
                &mut result,
                &mut h_errno,
            )
        };
        assert_eq!(rc, 0);
        assert_eq!(h_errno, HOST_NOT_FOUND);
    }

    #[test]
    fn test_null_name_is_einval() {
        let resolver = resolver();
        let mut ret = MaybeUninit::<libc::hostent>::zeroed();
        let mut result: *mut libc::hostent = ptr::null_mut();
        let mut h_errno = 0;
        let rc = unsafe {
            nr_gethostbyname_r(
                &resolver,
                ptr::null(),
                ret.as_mut_ptr(),
                ptr::null_mut(),
                0,
                &mut result,
                &mut h_errno,
            )
        };
        assert_eq!(rc, libc::EINVAL);
        assert_eq!(h_errno, NETDB_INTERNAL);
    }
}
