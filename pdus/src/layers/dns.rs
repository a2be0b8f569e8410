// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Domain Name System message format.
//!
//! A DNS message is one 12-byte fixed header followed by four
//! count-driven record sections. Domain names are label sequences that
//! may end in a compression pointer; the pointer is modelled explicitly
//! (rather than eagerly resolved) so a compressed message re-serializes
//! byte-exactly. [`DnsName::decoded`] chases pointers against the whole
//! message when the textual name is wanted.

use std::net::{Ipv4Addr, Ipv6Addr};

use pdus_common::Reader;

use crate::dispatch::DecodeCx;
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::{DnsClass, DnsOpCode, DnsRCode, DnsType};
use crate::tlv;

pub(crate) fn decode_dns(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Dns::from_bytes_in(bytes, cx)?))
}

const DNS_FIXED_HEADER_LEN: usize = 12;
const MAX_LABEL_LEN: usize = 63;
const POINTER_MASK: u8 = 0xC0;

/// A domain name: a label sequence optionally terminated by a
/// compression pointer instead of the root label.
///
/// Keeping the pointer un-resolved preserves the wire form exactly;
/// [`decoded`](Self::decoded) resolves the full name when needed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DnsName {
    labels: Vec<Vec<u8>>,
    pointer: Option<u16>,
}

impl DnsName {
    /// Builds an uncompressed name from a dotted string.
    pub fn parse(name: &str) -> Self {
        DnsName {
            labels: name
                .split('.')
                .filter(|l| !l.is_empty())
                .map(|l| l.as_bytes().to_vec())
                .collect(),
            pointer: None,
        }
    }

    #[inline]
    pub fn labels(&self) -> &[Vec<u8>] {
        &self.labels
    }

    /// The compression pointer terminating this name, if any.
    #[inline]
    pub fn pointer(&self) -> Option<u16> {
        self.pointer
    }

    /// The serialized length of the name.
    pub fn byte_len(&self) -> usize {
        let labels: usize = self.labels.iter().map(|l| 1 + l.len()).sum();
        labels + if self.pointer.is_some() { 2 } else { 1 }
    }

    /// Resolves the full dotted name against the enclosing message,
    /// chasing compression pointers. Returns `None` on a pointer loop
    /// or a pointer past the message end.
    pub fn decoded(&self, message: &[u8]) -> Option<String> {
        let mut parts: Vec<String> = self
            .labels
            .iter()
            .map(|l| String::from_utf8_lossy(l).into_owned())
            .collect();

        let mut pointer = self.pointer;
        let mut last_offset = usize::MAX;
        while let Some(offset) = pointer {
            let offset = offset as usize;
            // Pointers must refer to earlier bytes; enforcing a strictly
            // decreasing offset rules out loops.
            if offset >= last_offset || offset >= message.len() {
                return None;
            }
            last_offset = offset;

            let mut reader = Reader::new(&message[offset..]);
            let name = DnsName::read(&mut reader).ok()?;
            parts.extend(
                name.labels
                    .iter()
                    .map(|l| String::from_utf8_lossy(l).into_owned()),
            );
            pointer = name.pointer;
        }

        Some(parts.join("."))
    }

    /// Reads a name off the reader: labels until a root octet or a
    /// compression pointer.
    fn read(reader: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let mut labels = Vec::new();
        loop {
            let len = reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Dns", e))?;
            if len == 0 {
                return Ok(DnsName {
                    labels,
                    pointer: None,
                });
            }
            if len & POINTER_MASK == POINTER_MASK {
                let low = reader
                    .u8()
                    .map_err(|e| DecodeError::from_bounds("Dns", e))?;
                let pointer = (((len & !POINTER_MASK) as u16) << 8) | low as u16;
                return Ok(DnsName {
                    labels,
                    pointer: Some(pointer),
                });
            }
            if len as usize > MAX_LABEL_LEN {
                return Err(DecodeError::invalid_value(
                    "Dns",
                    "label length uses a reserved prefix",
                ));
            }
            labels.push(
                reader
                    .take(len as usize)
                    .map_err(|e| DecodeError::from_bounds("Dns", e))?
                    .to_vec(),
            );
        }
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        for label in &self.labels {
            bytes.push(label.len() as u8);
            bytes.extend(label);
        }
        match self.pointer {
            Some(pointer) => {
                bytes.push(POINTER_MASK | (pointer >> 8) as u8);
                bytes.push(pointer as u8);
            }
            None => bytes.push(0),
        }
    }
}

/// One entry of the question section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsQuestion {
    pub qname: DnsName,
    pub qtype: DnsType,
    pub qclass: DnsClass,
}

impl DnsQuestion {
    pub fn new(qname: DnsName, qtype: DnsType, qclass: DnsClass) -> Self {
        DnsQuestion {
            qname,
            qtype,
            qclass,
        }
    }

    #[inline]
    fn byte_len(&self) -> usize {
        self.qname.byte_len() + 4
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.qname.to_bytes_extended(bytes);
        bytes.extend(self.qtype.value().to_be_bytes());
        bytes.extend(self.qclass.value().to_be_bytes());
    }

    fn read_one(bytes: &[u8]) -> Result<(DnsQuestion, usize), DecodeError> {
        let mut reader = Reader::new(bytes);
        let qname = DnsName::read(&mut reader)?;
        let qtype = DnsType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Dns", e))?,
        );
        let qclass = DnsClass::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Dns", e))?,
        );
        Ok((DnsQuestion::new(qname, qtype, qclass), reader.pos()))
    }
}

/// Typed RDATA of a resource record; types without a structured
/// representation (and structurally invalid registered types) are
/// preserved verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DnsRData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Ns(DnsName),
    Cname(DnsName),
    Ptr(DnsName),
    Mx {
        preference: u16,
        exchange: DnsName,
    },
    Txt(Vec<Vec<u8>>),
    Soa {
        mname: DnsName,
        rname: DnsName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Unrecognized(Vec<u8>),
}

impl DnsRData {
    fn byte_len(&self) -> usize {
        match self {
            DnsRData::A(_) => 4,
            DnsRData::Aaaa(_) => 16,
            DnsRData::Ns(name) | DnsRData::Cname(name) | DnsRData::Ptr(name) => name.byte_len(),
            DnsRData::Mx { exchange, .. } => 2 + exchange.byte_len(),
            DnsRData::Txt(strings) => strings.iter().map(|s| 1 + s.len()).sum(),
            DnsRData::Soa { mname, rname, .. } => mname.byte_len() + rname.byte_len() + 20,
            DnsRData::Unrecognized(data) => data.len(),
        }
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        match self {
            DnsRData::A(addr) => bytes.extend(addr.octets()),
            DnsRData::Aaaa(addr) => bytes.extend(addr.octets()),
            DnsRData::Ns(name) | DnsRData::Cname(name) | DnsRData::Ptr(name) => {
                name.to_bytes_extended(bytes)
            }
            DnsRData::Mx {
                preference,
                exchange,
            } => {
                bytes.extend(preference.to_be_bytes());
                exchange.to_bytes_extended(bytes);
            }
            DnsRData::Txt(strings) => {
                for string in strings {
                    bytes.push(string.len() as u8);
                    bytes.extend(string);
                }
            }
            DnsRData::Soa {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                mname.to_bytes_extended(bytes);
                rname.to_bytes_extended(bytes);
                bytes.extend(serial.to_be_bytes());
                bytes.extend(refresh.to_be_bytes());
                bytes.extend(retry.to_be_bytes());
                bytes.extend(expire.to_be_bytes());
                bytes.extend(minimum.to_be_bytes());
            }
            DnsRData::Unrecognized(data) => bytes.extend(data),
        }
    }

    /// Parses the RDATA region for `rtype`, falling back to the
    /// verbatim variant when the structure does not fit.
    fn parse(rtype: DnsType, region: &[u8]) -> DnsRData {
        let parsed = Self::try_parse(rtype, region);
        match parsed {
            Some(rdata) if rdata.byte_len() == region.len() => rdata,
            _ => DnsRData::Unrecognized(region.to_vec()),
        }
    }

    fn try_parse(rtype: DnsType, region: &[u8]) -> Option<DnsRData> {
        let mut reader = Reader::new(region);
        let rdata = match rtype {
            DnsType::A => DnsRData::A(Ipv4Addr::from(reader.array::<4>().ok()?)),
            DnsType::Aaaa => DnsRData::Aaaa(Ipv6Addr::from(reader.array::<16>().ok()?)),
            DnsType::Ns => DnsRData::Ns(DnsName::read(&mut reader).ok()?),
            DnsType::Cname => DnsRData::Cname(DnsName::read(&mut reader).ok()?),
            DnsType::Ptr => DnsRData::Ptr(DnsName::read(&mut reader).ok()?),
            DnsType::Mx => DnsRData::Mx {
                preference: reader.u16().ok()?,
                exchange: DnsName::read(&mut reader).ok()?,
            },
            DnsType::Txt => {
                let mut strings = Vec::new();
                while !reader.is_empty() {
                    let len = reader.u8().ok()?;
                    strings.push(reader.take(len as usize).ok()?.to_vec());
                }
                DnsRData::Txt(strings)
            }
            DnsType::Soa => DnsRData::Soa {
                mname: DnsName::read(&mut reader).ok()?,
                rname: DnsName::read(&mut reader).ok()?,
                serial: reader.u32().ok()?,
                refresh: reader.u32().ok()?,
                retry: reader.u32().ok()?,
                expire: reader.u32().ok()?,
                minimum: reader.u32().ok()?,
            },
            _ => return None,
        };
        Some(rdata)
    }
}

/// One resource record of the answer, authority or additional section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DnsResourceRecord {
    pub name: DnsName,
    pub rtype: DnsType,
    pub rclass: DnsClass,
    pub ttl: u32,
    pub rdata: DnsRData,
}

impl DnsResourceRecord {
    pub fn new(
        name: DnsName,
        rtype: DnsType,
        rclass: DnsClass,
        ttl: u32,
        rdata: DnsRData,
    ) -> Self {
        DnsResourceRecord {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    fn byte_len(&self) -> usize {
        self.name.byte_len() + 10 + self.rdata.byte_len()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.name.to_bytes_extended(bytes);
        bytes.extend(self.rtype.value().to_be_bytes());
        bytes.extend(self.rclass.value().to_be_bytes());
        bytes.extend(self.ttl.to_be_bytes());
        bytes.extend((self.rdata.byte_len() as u16).to_be_bytes());
        self.rdata.to_bytes_extended(bytes);
    }

    fn read_one(bytes: &[u8]) -> Result<(DnsResourceRecord, usize), DecodeError> {
        let mut reader = Reader::new(bytes);
        let name = DnsName::read(&mut reader)?;
        let rtype = DnsType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Dns", e))?,
        );
        let rclass = DnsClass::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Dns", e))?,
        );
        let ttl = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;
        let rdlength = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;
        let region = reader.take(rdlength as usize).map_err(|_| {
            DecodeError::invalid_size("Dns", "record data length exceeds the message")
        })?;

        Ok((
            DnsResourceRecord::new(name, rtype, rclass, ttl, DnsRData::parse(rtype, region)),
            reader.pos(),
        ))
    }
}

/// A DNS message. The record sections are part of the header in this
/// model — a DNS packet carries no further protocol layer.
#[derive(Clone, Debug)]
pub struct Dns {
    id: u16,
    response: bool,
    opcode: DnsOpCode,
    authoritative: bool,
    truncated: bool,
    recursion_desired: bool,
    recursion_available: bool,
    reserved: u8,
    rcode: DnsRCode,
    questions: Vec<DnsQuestion>,
    answers: Vec<DnsResourceRecord>,
    authorities: Vec<DnsResourceRecord>,
    additionals: Vec<DnsResourceRecord>,
}

impl Dns {
    #[inline]
    pub fn builder() -> DnsBuilder {
        DnsBuilder::new()
    }

    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Whether the message is a response (QR bit).
    #[inline]
    pub fn is_response(&self) -> bool {
        self.response
    }

    #[inline]
    pub fn opcode(&self) -> DnsOpCode {
        self.opcode
    }

    #[inline]
    pub fn is_authoritative(&self) -> bool {
        self.authoritative
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    #[inline]
    pub fn recursion_desired(&self) -> bool {
        self.recursion_desired
    }

    #[inline]
    pub fn recursion_available(&self) -> bool {
        self.recursion_available
    }

    #[inline]
    pub fn rcode(&self) -> DnsRCode {
        self.rcode
    }

    #[inline]
    pub fn questions(&self) -> &[DnsQuestion] {
        &self.questions
    }

    #[inline]
    pub fn answers(&self) -> &[DnsResourceRecord] {
        &self.answers
    }

    #[inline]
    pub fn authorities(&self) -> &[DnsResourceRecord] {
        &self.authorities
    }

    #[inline]
    pub fn additionals(&self) -> &[DnsResourceRecord] {
        &self.additionals
    }

    fn flags_word(&self) -> u16 {
        ((self.response as u16) << 15)
            | (((self.opcode.value() & 0xF) as u16) << 11)
            | ((self.authoritative as u16) << 10)
            | ((self.truncated as u16) << 9)
            | ((self.recursion_desired as u16) << 8)
            | ((self.recursion_available as u16) << 7)
            | (((self.reserved & 0x7) as u16) << 4)
            | ((self.rcode.value() & 0xF) as u16)
    }

    pub fn to_builder(&self) -> DnsBuilder {
        DnsBuilder {
            inner: self.clone(),
        }
    }
}

impl FromBytes for Dns {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let id = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;
        let flags = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;
        let qdcount = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;
        let ancount = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;
        let nscount = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;
        let arcount = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dns", e))?;

        let rest = reader.take_rest();
        let (questions, rest) =
            tlv::walk_count(rest, qdcount as usize, "Dns", DnsQuestion::read_one)?;
        let (answers, rest) =
            tlv::walk_count(rest, ancount as usize, "Dns", DnsResourceRecord::read_one)?;
        let (authorities, rest) =
            tlv::walk_count(rest, nscount as usize, "Dns", DnsResourceRecord::read_one)?;
        let (additionals, _) =
            tlv::walk_count(rest, arcount as usize, "Dns", DnsResourceRecord::read_one)?;

        Ok(Dns {
            id,
            response: flags & 0x8000 != 0,
            opcode: DnsOpCode::from(((flags >> 11) & 0xF) as u8),
            authoritative: flags & 0x0400 != 0,
            truncated: flags & 0x0200 != 0,
            recursion_desired: flags & 0x0100 != 0,
            recursion_available: flags & 0x0080 != 0,
            reserved: ((flags >> 4) & 0x7) as u8,
            rcode: DnsRCode::from((flags & 0xF) as u8),
            questions,
            answers,
            authorities,
            additionals,
        })
    }
}

impl LayerObject for Dns {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Dns"
    }

    fn len(&self) -> usize {
        DNS_FIXED_HEADER_LEN
            + self.questions.iter().map(DnsQuestion::byte_len).sum::<usize>()
            + self
                .answers
                .iter()
                .chain(&self.authorities)
                .chain(&self.additionals)
                .map(DnsResourceRecord::byte_len)
                .sum::<usize>()
    }

    #[inline]
    fn header_len(&self) -> usize {
        // The record sections are header sub-elements; a DNS message
        // has no payload layer beneath it.
        self.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.id.to_be_bytes());
        bytes.extend(self.flags_word().to_be_bytes());
        bytes.extend((self.questions.len() as u16).to_be_bytes());
        bytes.extend((self.answers.len() as u16).to_be_bytes());
        bytes.extend((self.authorities.len() as u16).to_be_bytes());
        bytes.extend((self.additionals.len() as u16).to_be_bytes());
        for question in &self.questions {
            question.to_bytes_extended(bytes);
        }
        for record in self
            .answers
            .iter()
            .chain(&self.authorities)
            .chain(&self.additionals)
        {
            record.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Dns);

/// Staging object for [`Dns`] messages.
///
/// Section counts are always derived from the staged records, so there
/// is no length-correction policy to enable.
#[derive(Clone, Debug)]
pub struct DnsBuilder {
    inner: Dns,
}

impl DnsBuilder {
    pub fn new() -> Self {
        DnsBuilder {
            inner: Dns {
                id: 0,
                response: false,
                opcode: DnsOpCode::Query,
                authoritative: false,
                truncated: false,
                recursion_desired: false,
                recursion_available: false,
                reserved: 0,
                rcode: DnsRCode::NoError,
                questions: Vec::new(),
                answers: Vec::new(),
                authorities: Vec::new(),
                additionals: Vec::new(),
            },
        }
    }

    #[inline]
    pub fn id(mut self, id: u16) -> Self {
        self.inner.id = id;
        self
    }

    #[inline]
    pub fn response(mut self, response: bool) -> Self {
        self.inner.response = response;
        self
    }

    #[inline]
    pub fn opcode(mut self, opcode: DnsOpCode) -> Self {
        self.inner.opcode = opcode;
        self
    }

    #[inline]
    pub fn authoritative(mut self, authoritative: bool) -> Self {
        self.inner.authoritative = authoritative;
        self
    }

    #[inline]
    pub fn truncated(mut self, truncated: bool) -> Self {
        self.inner.truncated = truncated;
        self
    }

    #[inline]
    pub fn recursion_desired(mut self, rd: bool) -> Self {
        self.inner.recursion_desired = rd;
        self
    }

    #[inline]
    pub fn recursion_available(mut self, ra: bool) -> Self {
        self.inner.recursion_available = ra;
        self
    }

    #[inline]
    pub fn rcode(mut self, rcode: DnsRCode) -> Self {
        self.inner.rcode = rcode;
        self
    }

    #[inline]
    pub fn question(mut self, question: DnsQuestion) -> Self {
        self.inner.questions.push(question);
        self
    }

    #[inline]
    pub fn answer(mut self, answer: DnsResourceRecord) -> Self {
        self.inner.answers.push(answer);
        self
    }

    #[inline]
    pub fn authority(mut self, authority: DnsResourceRecord) -> Self {
        self.inner.authorities.push(authority);
        self
    }

    #[inline]
    pub fn additional(mut self, additional: DnsResourceRecord) -> Self {
        self.inner.additionals.push(additional);
        self
    }
}

impl Default for DnsBuilder {
    #[inline]
    fn default() -> Self {
        DnsBuilder::new()
    }
}

impl Build for DnsBuilder {
    type Packet = Dns;

    fn build(self) -> Result<Dns, BuildError> {
        if self.inner.opcode.value() > 0xF {
            return Err(BuildError::out_of_range(
                "Dns",
                "opcode",
                "opcode is a 4-bit field",
            ));
        }
        if self.inner.rcode.value() > 0xF {
            return Err(BuildError::out_of_range(
                "Dns",
                "rcode",
                "response code is a 4-bit field",
            ));
        }
        for section in [
            self.inner.questions.len(),
            self.inner.answers.len(),
            self.inner.authorities.len(),
            self.inner.additionals.len(),
        ] {
            if section > u16::MAX as usize {
                return Err(BuildError::too_long(
                    "Dns",
                    "records",
                    "section count exceeds its 16-bit field",
                ));
            }
        }
        for question in &self.inner.questions {
            validate_name("Dns", &question.qname)?;
        }
        for record in self
            .inner
            .answers
            .iter()
            .chain(&self.inner.authorities)
            .chain(&self.inner.additionals)
        {
            validate_name("Dns", &record.name)?;
            if record.rdata.byte_len() > u16::MAX as usize {
                return Err(BuildError::too_long(
                    "Dns",
                    "records",
                    "record data exceeds its 16-bit length field",
                ));
            }
        }
        Ok(self.inner)
    }
}

fn validate_name(layer: &'static str, name: &DnsName) -> Result<(), BuildError> {
    for label in name.labels() {
        if label.len() > MAX_LABEL_LEN {
            return Err(BuildError::too_long(
                layer,
                "qname",
                "label exceeds 63 octets",
            ));
        }
    }
    if let Some(pointer) = name.pointer() {
        if pointer > 0x3FFF {
            return Err(BuildError::out_of_range(
                layer,
                "qname",
                "compression pointer is a 14-bit field",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_round_trips() {
        let dns = Dns::builder()
            .id(0xBEEF)
            .recursion_desired(true)
            .question(DnsQuestion::new(
                DnsName::parse("example.com"),
                DnsType::A,
                DnsClass::In,
            ))
            .build()
            .unwrap();

        let bytes = dns.to_bytes();
        assert_eq!(bytes.len(), dns.len());

        let decoded = Dns::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, dns);
        assert_eq!(decoded.id(), 0xBEEF);
        assert!(!decoded.is_response());
        assert_eq!(decoded.questions().len(), 1);
        assert_eq!(
            decoded.questions()[0].qname.decoded(&bytes).unwrap(),
            "example.com"
        );
    }

    #[test]
    fn compressed_response_round_trips_and_resolves() {
        // Header + question "example.com" + answer whose name is a
        // pointer back to offset 12.
        let mut bytes = vec![
            0x12, 0x34, 0x81, 0x80, // id, QR+RD+RA
            0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ];
        bytes.extend([7]);
        bytes.extend(b"example");
        bytes.extend([3]);
        bytes.extend(b"com");
        bytes.extend([0, 0x00, 0x01, 0x00, 0x01]); // root, A, IN
        bytes.extend([0xC0, 0x0C]); // pointer to offset 12
        bytes.extend([0x00, 0x01, 0x00, 0x01]); // A, IN
        bytes.extend([0x00, 0x00, 0x0E, 0x10]); // TTL 3600
        bytes.extend([0x00, 0x04, 93, 184, 216, 34]); // RDATA

        let dns = Dns::from_bytes(&bytes).unwrap();
        assert!(dns.is_response());
        assert_eq!(dns.answers().len(), 1);

        let answer = &dns.answers()[0];
        assert_eq!(answer.name.pointer(), Some(12));
        assert_eq!(answer.name.decoded(&bytes).unwrap(), "example.com");
        assert_eq!(answer.rdata, DnsRData::A(Ipv4Addr::new(93, 184, 216, 34)));

        // The compression pointer is preserved, so the bytes round-trip.
        assert_eq!(dns.to_bytes(), bytes);
    }

    #[test]
    fn count_exceeding_records_is_malformed() {
        let dns = Dns::builder()
            .question(DnsQuestion::new(
                DnsName::parse("a.example"),
                DnsType::A,
                DnsClass::In,
            ))
            .build()
            .unwrap();
        let mut bytes = dns.to_bytes();
        bytes[4..6].copy_from_slice(&2u16.to_be_bytes()); // qdcount 2, one present
        assert!(Dns::from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_rdata_is_malformed() {
        let dns = Dns::builder()
            .answer(DnsResourceRecord::new(
                DnsName::parse("a.example"),
                DnsType::A,
                DnsClass::In,
                60,
                DnsRData::A(Ipv4Addr::LOCALHOST),
            ))
            .build()
            .unwrap();
        let mut bytes = dns.to_bytes();
        let len = bytes.len();
        bytes.truncate(len - 2);
        assert!(Dns::from_bytes(&bytes).is_err());
    }

    #[test]
    fn pointer_loop_resolution_is_rejected() {
        let name = DnsName {
            labels: vec![b"x".to_vec()],
            pointer: Some(20),
        };
        // A message whose offset 20 contains a pointer to itself.
        let mut message = vec![0u8; 20];
        message.extend([0xC0, 20]);
        assert_eq!(name.decoded(&message), None);
    }

    #[test]
    fn unknown_rtype_preserves_rdata() {
        let mut bytes = vec![
            0, 1, 0x80, 0, 0, 0, 0, 1, 0, 0, 0, 0, // header, ancount 1
        ];
        bytes.extend([1, b'x', 0]); // name "x"
        bytes.extend([0x00, 0xFA, 0x00, 0x01]); // type 250, IN
        bytes.extend([0, 0, 0, 0]); // TTL
        bytes.extend([0x00, 0x03, 9, 9, 9]); // 3 RDATA bytes
        let dns = Dns::from_bytes(&bytes).unwrap();
        assert_eq!(
            dns.answers()[0].rdata,
            DnsRData::Unrecognized(vec![9, 9, 9])
        );
        assert_eq!(dns.to_bytes(), bytes);
    }
}
