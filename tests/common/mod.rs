//! Shared fixtures for the integration tests: a DNS message builder, an
//! in-memory DNS transport and an in-memory proxy connector.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use nresolv::constants::C_IN;
use nresolv::{NetContext, ProxyConnector, ProxyStream, ResolveError, Result};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =========================================================================
// DNS messages
// =========================================================================

pub fn encode_name(out: &mut Vec<u8>, name: &str) {
    for label in name.split('.').filter(|l| !l.is_empty()) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
}

pub fn name_rdata(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    encode_name(&mut out, name);
    out
}

/// Response with one question and uncompressed answer records
pub struct MessageBuilder {
    msg: Vec<u8>,
    ancount: u16,
}

impl MessageBuilder {
    pub fn new(qname: &str, qtype: u16) -> Self {
        let mut msg = vec![0x12, 0x34, 0x81, 0x80, 0, 1, 0, 0, 0, 0, 0, 0];
        encode_name(&mut msg, qname);
        msg.extend_from_slice(&qtype.to_be_bytes());
        msg.extend_from_slice(&C_IN.to_be_bytes());
        Self { msg, ancount: 0 }
    }

    pub fn answer(mut self, owner: &str, rtype: u16, rdata: &[u8]) -> Self {
        encode_name(&mut self.msg, owner);
        self.msg.extend_from_slice(&rtype.to_be_bytes());
        self.msg.extend_from_slice(&C_IN.to_be_bytes());
        self.msg.extend_from_slice(&300u32.to_be_bytes());
        self.msg.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        self.msg.extend_from_slice(rdata);
        self.ancount += 1;
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        self.msg[6..8].copy_from_slice(&self.ancount.to_be_bytes());
        self.msg
    }
}

// =========================================================================
// DNS transport
// =========================================================================

#[derive(Default)]
pub struct MockTransport {
    responses: HashMap<(String, u16), Vec<u8>>,
    pub queries: Mutex<Vec<(String, u16)>>,
}

impl MockTransport {
    pub fn with(mut self, name: &str, rtype: u16, response: Vec<u8>) -> Self {
        self.responses.insert((name.to_string(), rtype), response);
        self
    }
}

impl nresolv::DnsTransport for MockTransport {
    fn query(
        &self,
        name: &str,
        _class: u16,
        rtype: u16,
        _ctx: &NetContext,
        answer: &mut [u8],
    ) -> Result<usize> {
        self.queries.lock().unwrap().push((name.to_string(), rtype));
        let response = self
            .responses
            .get(&(name.to_string(), rtype))
            .ok_or(ResolveError::NotFound)?;
        let n = response.len().min(answer.len());
        answer[..n].copy_from_slice(&response[..n]);
        Ok(response.len())
    }
}

// =========================================================================
// Proxy
// =========================================================================

struct CannedStream {
    reply: Cursor<Vec<u8>>,
    sent: Arc<Mutex<Vec<u8>>>,
}

impl Read for CannedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reply.read(buf)
    }
}

impl Write for CannedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sent.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Answers every connection with the same reply bytes
pub struct CannedProxy {
    reply: Vec<u8>,
    pub sent: Arc<Mutex<Vec<u8>>>,
}

impl CannedProxy {
    pub fn new(reply: Vec<u8>) -> Self {
        Self {
            reply,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ProxyConnector for CannedProxy {
    fn connect(&self) -> Result<Box<dyn ProxyStream + '_>> {
        Ok(Box::new(CannedStream {
            reply: Cursor::new(self.reply.clone()),
            sent: Arc::clone(&self.sent),
        }))
    }
}
