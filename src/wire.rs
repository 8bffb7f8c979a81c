//! DNS wire message parser
//!
//! A read-only cursor over a raw response. Every read is checked against the
//! end of the message; running past it is a [`ResolveError::Malformed`]
//! failure, never a panic.

use crate::constants::{HFIXEDSZ, QFIXEDSZ, RRFIXEDSZ};
use crate::error::{ResolveError, Result};
use crate::name::expand_name;

/// DNS header (12 bytes), host byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub flags: u16,
    pub qdcount: u16,
    pub ancount: u16,
    pub nscount: u16,
    pub arcount: u16,
}

impl Header {
    pub const SIZE: usize = HFIXEDSZ;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(ResolveError::Malformed("dns response too short"));
        }
        let word = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);
        Ok(Self {
            id: word(0),
            flags: word(2),
            qdcount: word(4),
            ancount: word(6),
            nscount: word(8),
            arcount: word(10),
        })
    }

    /// Check if this is a response
    pub fn is_response(&self) -> bool {
        self.flags & 0x8000 != 0
    }

    /// Truncation bit
    pub fn is_truncated(&self) -> bool {
        self.flags & 0x0200 != 0
    }

    pub fn rcode(&self) -> u8 {
        (self.flags & 0x000F) as u8
    }
}

/// The single question of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: String,
    pub qtype: u16,
    pub qclass: u16,
    /// Offset of the first answer record
    end: usize,
}

/// A parsed response
#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    data: &'a [u8],
    header: Header,
}

impl<'a> Message<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let header = Header::parse(data)?;
        Ok(Self { data, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode the question section, which must hold exactly one entry
    pub fn question(&self) -> Result<Question> {
        if self.header.qdcount != 1 {
            return Err(ResolveError::Malformed("dns question count is not one"));
        }
        let (name, used) = expand_name(self.data, HFIXEDSZ)?;
        let pos = HFIXEDSZ + used;
        let fixed = self
            .data
            .get(pos..pos + QFIXEDSZ)
            .ok_or(ResolveError::Malformed("dns question overflow"))?;
        Ok(Question {
            name,
            qtype: u16::from_be_bytes([fixed[0], fixed[1]]),
            qclass: u16::from_be_bytes([fixed[2], fixed[3]]),
            end: pos + QFIXEDSZ,
        })
    }

    /// Answer records following `question`, up to the advertised count.
    ///
    /// Iteration ends early, without error, if the cursor reaches the end of
    /// the message. After the first error the iterator is exhausted.
    pub fn answers(&self, question: &Question) -> Answers<'a> {
        Answers {
            data: self.data,
            pos: question.end,
            remaining: self.header.ancount,
            failed: false,
        }
    }
}

/// One resource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    msg: &'a [u8],
    rdata_start: usize,
    rdata_len: usize,
}

impl<'a> Record<'a> {
    pub fn rdata(&self) -> &'a [u8] {
        &self.msg[self.rdata_start..self.rdata_start + self.rdata_len]
    }

    pub fn rdlength(&self) -> usize {
        self.rdata_len
    }

    /// Decode rdata consisting of exactly one domain name (CNAME, PTR).
    ///
    /// Compression pointers resolve against the whole message. The name must
    /// end exactly where the record data ends.
    pub fn rdata_name(&self) -> Result<String> {
        let (name, used) = expand_name(self.msg, self.rdata_start)?;
        if used != self.rdata_len {
            return Err(ResolveError::Malformed("dns rdata length mismatch"));
        }
        Ok(name)
    }
}

/// Iterator over the answer section
pub struct Answers<'a> {
    data: &'a [u8],
    pos: usize,
    remaining: u16,
    failed: bool,
}

impl<'a> Answers<'a> {
    fn read_record(&mut self) -> Result<Record<'a>> {
        let (name, used) = expand_name(self.data, self.pos)?;
        let mut offset = self.pos + used;

        let fixed = self
            .data
            .get(offset..offset + RRFIXEDSZ)
            .ok_or(ResolveError::Malformed("dns answer header overflow"))?;
        let rtype = u16::from_be_bytes([fixed[0], fixed[1]]);
        let class = u16::from_be_bytes([fixed[2], fixed[3]]);
        let ttl = u32::from_be_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]);
        let rdata_len = u16::from_be_bytes([fixed[8], fixed[9]]) as usize;
        offset += RRFIXEDSZ;

        if rdata_len > self.data.len() - offset {
            return Err(ResolveError::Malformed("dns answer data overflow"));
        }
        self.pos = offset + rdata_len;

        Ok(Record {
            name,
            rtype,
            class,
            ttl,
            msg: self.data,
            rdata_start: offset,
            rdata_len,
        })
    }
}

impl<'a> Iterator for Answers<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 || self.pos >= self.data.len() {
            return None;
        }
        self.remaining -= 1;
        let record = self.read_record();
        if record.is_err() {
            self.failed = true;
        }
        Some(record)
    }
}
