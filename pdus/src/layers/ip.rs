// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Internet Protocol: IPv4 with options, IPv6, and the IPv6
//! extension-header chain.
//!
//! Both versions decode their fixed header and then hand their trailing
//! bytes to the dispatcher keyed by protocol number / next header. The
//! IPv6 extension headers are themselves dispatch targets that wrap
//! further dispatch, so an arbitrary chain decodes into nested layers.

use std::net::{Ipv4Addr, Ipv6Addr};

use bitflags::bitflags;
use pdus_common::{padded_length, Reader};

use crate::dispatch::{self, DecodeCx, Registry};
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::{IpProto, Ipv4OptionType, Ipv6OptionType};
use crate::tlv::{self, Step};
use crate::utils;

pub(crate) fn decode_ipv4(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Ipv4::from_bytes_in(bytes, cx)?))
}

pub(crate) fn decode_ipv6(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Ipv6::from_bytes_in(bytes, cx)?))
}

pub(crate) fn decode_ipv6_hop_by_hop(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Ipv6HopByHop::from_bytes_in(bytes, cx)?))
}

pub(crate) fn decode_ipv6_dest_options(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Ipv6DestOptions::from_bytes_in(bytes, cx)?))
}

pub(crate) fn decode_ipv6_routing(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Ipv6Routing::from_bytes_in(bytes, cx)?))
}

pub(crate) fn decode_ipv6_fragment(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Ipv6Fragment::from_bytes_in(bytes, cx)?))
}

/// Decoder for raw-IP link types: the first nibble selects the version.
pub(crate) fn decode_ip_auto(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    match bytes.first().map(|b| b >> 4) {
        Some(4) => decode_ipv4(bytes, cx),
        Some(6) => decode_ipv6(bytes, cx),
        Some(_) => Err(DecodeError::invalid_value(
            "Ip",
            "first nibble selects neither IPv4 nor IPv6",
        )),
        None => Err(DecodeError::insufficient("Ip", "empty byte window")),
    }
}

bitflags! {
    /// The three control bits of the IPv4 flags field.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Ipv4Flags: u8 {
        const RESERVED = 0b100;
        const DONT_FRAGMENT = 0b010;
        const MORE_FRAGMENTS = 0b001;
    }
}

/// A single IPv4 option.
///
/// Option types without a structured representation are preserved
/// verbatim in the [`Unrecognized`](Ipv4Option::Unrecognized) variant so
/// unknown options round-trip losslessly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ipv4Option {
    /// End of option list; terminates the option walk. Any bytes after
    /// it are kept as option-region padding.
    Eool,
    /// No-operation filler.
    Nop,
    /// Record-route: a pointer plus the route slots accumulated so far.
    RecordRoute { pointer: u8, routes: Vec<Ipv4Addr> },
    Unrecognized { option_type: Ipv4OptionType, data: Vec<u8> },
}

impl Ipv4Option {
    /// The option's type code.
    #[inline]
    pub fn option_type(&self) -> Ipv4OptionType {
        match self {
            Ipv4Option::Eool => Ipv4OptionType::Eool,
            Ipv4Option::Nop => Ipv4OptionType::Nop,
            Ipv4Option::RecordRoute { .. } => Ipv4OptionType::RecordRoute,
            Ipv4Option::Unrecognized { option_type, .. } => *option_type,
        }
    }

    /// The option's self-reported serialized length.
    pub fn byte_len(&self) -> usize {
        match self {
            Ipv4Option::Eool | Ipv4Option::Nop => 1,
            Ipv4Option::RecordRoute { routes, .. } => 3 + 4 * routes.len(),
            Ipv4Option::Unrecognized { data, .. } => 2 + data.len(),
        }
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        match self {
            Ipv4Option::Eool => bytes.push(0),
            Ipv4Option::Nop => bytes.push(1),
            Ipv4Option::RecordRoute { pointer, routes } => {
                bytes.push(Ipv4OptionType::RecordRoute.value());
                bytes.push((3 + 4 * routes.len()) as u8);
                bytes.push(*pointer);
                for route in routes {
                    bytes.extend(route.octets());
                }
            }
            Ipv4Option::Unrecognized { option_type, data } => {
                bytes.push(option_type.value());
                bytes.push((2 + data.len()) as u8);
                bytes.extend(data);
            }
        }
    }

    /// Reads a single option off the front of `bytes` for the option
    /// walker.
    fn read_one(bytes: &[u8]) -> Result<Step<Ipv4Option>, DecodeError> {
        match Ipv4OptionType::from(bytes[0]) {
            Ipv4OptionType::Eool => Ok(Step::Terminator(Ipv4Option::Eool, 1)),
            Ipv4OptionType::Nop => Ok(Step::Element(Ipv4Option::Nop, 1)),
            option_type => {
                let len = *bytes.get(1).ok_or_else(|| {
                    DecodeError::insufficient("Ipv4", "option truncated before length octet")
                })? as usize;
                if len < 2 {
                    return Err(DecodeError::invalid_size(
                        "Ipv4",
                        "option length below the two-octet minimum",
                    ));
                }
                let data = bytes.get(2..len).ok_or_else(|| {
                    DecodeError::invalid_size("Ipv4", "option length exceeds the option region")
                })?;

                let option = match option_type {
                    Ipv4OptionType::RecordRoute if len >= 3 && (len - 3) % 4 == 0 => {
                        Ipv4Option::RecordRoute {
                            pointer: data[0],
                            routes: data[1..]
                                .chunks_exact(4)
                                .map(|c| {
                                    Ipv4Addr::new(c[0], c[1], c[2], c[3])
                                })
                                .collect(),
                        }
                    }
                    _ => Ipv4Option::Unrecognized {
                        option_type,
                        data: data.to_vec(),
                    },
                };
                Ok(Step::Element(option, len))
            }
        }
    }
}

const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV4_MAX_OPTIONS_LEN: usize = 40;

/// The fixed fields and options of an IPv4 header.
///
/// The `total_length` and `chksum` fields hold whatever was on the wire
/// (or was staged in the builder); they are only recomputed when the
/// corresponding build-time correction is requested.
#[derive(Clone, Debug)]
pub struct Ipv4Header {
    version: u8,
    dscp: u8,
    ecn: u8,
    total_length: u16,
    identification: u16,
    flags: Ipv4Flags,
    frag_offset: u16,
    ttl: u8,
    protocol: IpProto,
    chksum: u16,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    options: Vec<Ipv4Option>,
    options_pad: Vec<u8>,
}

impl Ipv4Header {
    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Internet header length in 32-bit words, derived from the options.
    #[inline]
    pub fn ihl(&self) -> u8 {
        (Header::len(self) / 4) as u8
    }

    /// Differentiated services code point (6 bits).
    #[inline]
    pub fn dscp(&self) -> u8 {
        self.dscp
    }

    /// Explicit congestion notification (2 bits).
    #[inline]
    pub fn ecn(&self) -> u8 {
        self.ecn
    }

    /// The total-length field as carried on the wire.
    #[inline]
    pub fn total_length(&self) -> u16 {
        self.total_length
    }

    #[inline]
    pub fn identification(&self) -> u16 {
        self.identification
    }

    #[inline]
    pub fn flags(&self) -> Ipv4Flags {
        self.flags
    }

    /// Fragment offset in 8-octet units (13 bits).
    #[inline]
    pub fn frag_offset(&self) -> u16 {
        self.frag_offset
    }

    #[inline]
    pub fn ttl(&self) -> u8 {
        self.ttl
    }

    #[inline]
    pub fn protocol(&self) -> IpProto {
        self.protocol
    }

    #[inline]
    pub fn chksum(&self) -> u16 {
        self.chksum
    }

    #[inline]
    pub fn src(&self) -> Ipv4Addr {
        self.src
    }

    #[inline]
    pub fn dst(&self) -> Ipv4Addr {
        self.dst
    }

    #[inline]
    pub fn options(&self) -> &[Ipv4Option] {
        &self.options
    }

    /// Bytes following an end-of-option-list option, preserved verbatim.
    #[inline]
    pub fn options_pad(&self) -> &[u8] {
        &self.options_pad
    }

    fn options_byte_len(&self) -> usize {
        self.options.iter().map(Ipv4Option::byte_len).sum::<usize>() + self.options_pad.len()
    }

    /// The checksum this header should carry, computed over the header
    /// bytes with the checksum field zeroed.
    pub fn compute_chksum(&self) -> u16 {
        let mut bytes = Header::to_bytes(self);
        bytes[10] = 0;
        bytes[11] = 0;
        let mut chksum = utils::InternetChecksum::new();
        chksum.add_bytes(&bytes);
        chksum.finish()
    }
}

impl Header for Ipv4Header {
    #[inline]
    fn len(&self) -> usize {
        IPV4_MIN_HEADER_LEN + self.options_byte_len()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push((self.version << 4) | self.ihl());
        bytes.push((self.dscp << 2) | self.ecn);
        bytes.extend(self.total_length.to_be_bytes());
        bytes.extend(self.identification.to_be_bytes());
        bytes.extend((((self.flags.bits() as u16) << 13) | self.frag_offset).to_be_bytes());
        bytes.push(self.ttl);
        bytes.push(self.protocol.value());
        bytes.extend(self.chksum.to_be_bytes());
        bytes.extend(self.src.octets());
        bytes.extend(self.dst.octets());
        for option in &self.options {
            option.to_bytes_extended(bytes);
        }
        bytes.extend(&self.options_pad);
    }
}

/// An IPv4 packet.
#[derive(Clone, Debug)]
pub struct Ipv4 {
    header: Ipv4Header,
    payload: Option<Box<dyn LayerObject>>,
}

impl Ipv4 {
    #[inline]
    pub fn builder() -> Ipv4Builder {
        Ipv4Builder::new()
    }

    #[inline]
    pub fn header(&self) -> &Ipv4Header {
        &self.header
    }

    /// Whether the header checksum field matches a recomputation over
    /// the header bytes.
    #[inline]
    pub fn has_valid_chksum(&self) -> bool {
        self.header.chksum == self.header.compute_chksum()
    }

    pub fn to_builder(&self) -> Ipv4Builder {
        Ipv4Builder {
            version: self.header.version,
            dscp: self.header.dscp,
            ecn: self.header.ecn,
            total_length: self.header.total_length,
            identification: self.header.identification,
            flags: self.header.flags,
            frag_offset: self.header.frag_offset,
            ttl: self.header.ttl,
            protocol: self.header.protocol,
            chksum: self.header.chksum,
            src: self.header.src,
            dst: self.header.dst,
            options: self.header.options.clone(),
            options_pad: self.header.options_pad.clone(),
            payload: self.payload.clone(),
            correct_length: false,
            correct_chksum: false,
        }
    }
}

impl FromBytes for Ipv4 {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let vi = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv4", e))?;
        let version = vi >> 4;
        let ihl = (vi & 0x0F) as usize;
        if version != 4 {
            return Err(DecodeError::invalid_value(
                "Ipv4",
                "version field is not 4",
            ));
        }
        if ihl < 5 {
            return Err(DecodeError::invalid_value(
                "Ipv4",
                "header length field below the 20-byte minimum",
            ));
        }

        let tos = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv4", e))?;
        let total_length = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Ipv4", e))?;
        let identification = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Ipv4", e))?;
        let flags_frag = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Ipv4", e))?;
        let ttl = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv4", e))?;
        let protocol = IpProto::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Ipv4", e))?,
        );
        let chksum = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Ipv4", e))?;
        let src = Ipv4Addr::from(
            reader
                .array::<4>()
                .map_err(|e| DecodeError::from_bounds("Ipv4", e))?,
        );
        let dst = Ipv4Addr::from(
            reader
                .array::<4>()
                .map_err(|e| DecodeError::from_bounds("Ipv4", e))?,
        );

        let header_len = ihl * 4;
        if (total_length as usize) < header_len {
            return Err(DecodeError::invalid_size(
                "Ipv4",
                "total length field below the header length",
            ));
        }
        if total_length as usize > bytes.len() {
            return Err(DecodeError::invalid_size(
                "Ipv4",
                "total length field exceeds the available bytes",
            ));
        }

        let options_region = reader
            .take(header_len - IPV4_MIN_HEADER_LEN)
            .map_err(|_| {
                DecodeError::invalid_size(
                    "Ipv4",
                    "header length field exceeds the available bytes",
                )
            })?;
        let (options, options_pad) = tlv::walk(options_region, "Ipv4", Ipv4Option::read_one)?;

        // Bytes beyond total_length belong to the enclosing layer (frame
        // padding), so only the declared span is consumed here.
        let payload_region = &bytes[header_len..total_length as usize];
        let payload = if payload_region.is_empty() {
            None
        } else {
            Some(dispatch::dispatch(
                Registry::IpProto,
                protocol.value() as u32,
                payload_region,
                cx,
            ))
        };

        Ok(Ipv4 {
            header: Ipv4Header {
                version,
                dscp: tos >> 2,
                ecn: tos & 0x3,
                total_length,
                identification,
                flags: Ipv4Flags::from_bits_truncate((flags_frag >> 13) as u8),
                frag_offset: flags_frag & 0x1FFF,
                ttl,
                protocol,
                chksum,
                src,
                dst,
                options,
                options_pad: options_pad.to_vec(),
            },
            payload,
        })
    }
}

impl LayerObject for Ipv4 {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Ipv4"
    }

    #[inline]
    fn len(&self) -> usize {
        Header::len(&self.header) + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        Header::len(&self.header)
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.header.to_bytes_extended(bytes);
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Ipv4);

/// Staging object for [`Ipv4`] packets.
#[derive(Clone, Debug)]
pub struct Ipv4Builder {
    version: u8,
    dscp: u8,
    ecn: u8,
    total_length: u16,
    identification: u16,
    flags: Ipv4Flags,
    frag_offset: u16,
    ttl: u8,
    protocol: IpProto,
    chksum: u16,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    options: Vec<Ipv4Option>,
    options_pad: Vec<u8>,
    payload: Option<Box<dyn LayerObject>>,
    correct_length: bool,
    correct_chksum: bool,
}

impl Ipv4Builder {
    pub fn new() -> Self {
        Ipv4Builder {
            version: 4,
            dscp: 0,
            ecn: 0,
            total_length: 0,
            identification: 0,
            flags: Ipv4Flags::empty(),
            frag_offset: 0,
            ttl: 64,
            protocol: IpProto::Exp1,
            chksum: 0,
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
            options: Vec::new(),
            options_pad: Vec::new(),
            payload: None,
            correct_length: false,
            correct_chksum: false,
        }
    }

    #[inline]
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    #[inline]
    pub fn dscp(mut self, dscp: u8) -> Self {
        self.dscp = dscp;
        self
    }

    #[inline]
    pub fn ecn(mut self, ecn: u8) -> Self {
        self.ecn = ecn;
        self
    }

    /// The literal total-length field; overwritten when
    /// [`correct_length`](Self::correct_length) is set.
    #[inline]
    pub fn total_length(mut self, total_length: u16) -> Self {
        self.total_length = total_length;
        self
    }

    #[inline]
    pub fn identification(mut self, identification: u16) -> Self {
        self.identification = identification;
        self
    }

    #[inline]
    pub fn flags(mut self, flags: Ipv4Flags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn frag_offset(mut self, frag_offset: u16) -> Self {
        self.frag_offset = frag_offset;
        self
    }

    #[inline]
    pub fn ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    #[inline]
    pub fn protocol(mut self, protocol: IpProto) -> Self {
        self.protocol = protocol;
        self
    }

    /// The literal checksum field; overwritten when
    /// [`correct_chksum`](Self::correct_chksum) is set.
    #[inline]
    pub fn chksum(mut self, chksum: u16) -> Self {
        self.chksum = chksum;
        self
    }

    #[inline]
    pub fn src(mut self, src: Ipv4Addr) -> Self {
        self.src = src;
        self
    }

    #[inline]
    pub fn dst(mut self, dst: Ipv4Addr) -> Self {
        self.dst = dst;
        self
    }

    #[inline]
    pub fn option(mut self, option: Ipv4Option) -> Self {
        self.options.push(option);
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    /// When set, `build()` pads the option region to a 32-bit boundary
    /// and recomputes the total-length field.
    #[inline]
    pub fn correct_length(mut self, correct: bool) -> Self {
        self.correct_length = correct;
        self
    }

    /// When set, `build()` recomputes the header checksum (after any
    /// length correction, which it covers).
    #[inline]
    pub fn correct_chksum(mut self, correct: bool) -> Self {
        self.correct_chksum = correct;
        self
    }
}

impl Default for Ipv4Builder {
    #[inline]
    fn default() -> Self {
        Ipv4Builder::new()
    }
}

impl Build for Ipv4Builder {
    type Packet = Ipv4;

    fn build(self) -> Result<Ipv4, BuildError> {
        if self.version > 0xF {
            return Err(BuildError::out_of_range(
                "Ipv4",
                "version",
                "version is a 4-bit field",
            ));
        }
        if self.dscp > 0x3F {
            return Err(BuildError::out_of_range(
                "Ipv4",
                "dscp",
                "DSCP is a 6-bit field",
            ));
        }
        if self.ecn > 0x3 {
            return Err(BuildError::out_of_range(
                "Ipv4",
                "ecn",
                "ECN is a 2-bit field",
            ));
        }
        if self.frag_offset > 0x1FFF {
            return Err(BuildError::out_of_range(
                "Ipv4",
                "frag_offset",
                "fragment offset is a 13-bit field",
            ));
        }

        // Padding decisions run before length correction, which in turn
        // runs before checksum correction.
        let mut options_pad = self.options_pad;
        let raw_options_len: usize = self.options.iter().map(Ipv4Option::byte_len).sum();
        if self.correct_length {
            options_pad = vec![0; padded_length::<4>(raw_options_len) - raw_options_len];
        }

        let options_len = raw_options_len + options_pad.len();
        if options_len > IPV4_MAX_OPTIONS_LEN {
            return Err(BuildError::too_long(
                "Ipv4",
                "options",
                "options exceed the 40-byte maximum",
            ));
        }
        if options_len % 4 != 0 {
            return Err(BuildError::out_of_range(
                "Ipv4",
                "options",
                "options region must end on a 32-bit boundary",
            ));
        }

        let header_len = IPV4_MIN_HEADER_LEN + options_len;
        let payload_len = self.payload.as_ref().map_or(0, |p| p.len());
        let total_length = if self.correct_length {
            u16::try_from(header_len + payload_len).map_err(|_| {
                BuildError::too_long(
                    "Ipv4",
                    "payload",
                    "header and payload exceed the 16-bit total length",
                )
            })?
        } else {
            self.total_length
        };

        let mut header = Ipv4Header {
            version: self.version,
            dscp: self.dscp,
            ecn: self.ecn,
            total_length,
            identification: self.identification,
            flags: self.flags,
            frag_offset: self.frag_offset,
            ttl: self.ttl,
            protocol: self.protocol,
            chksum: self.chksum,
            src: self.src,
            dst: self.dst,
            options: self.options,
            options_pad,
        };
        if self.correct_chksum {
            header.chksum = header.compute_chksum();
        }

        Ok(Ipv4 {
            header,
            payload: self.payload,
        })
    }
}

const IPV6_HEADER_LEN: usize = 40;

/// The fixed 40-byte IPv6 header.
#[derive(Clone, Copy, Debug)]
pub struct Ipv6Header {
    version: u8,
    traffic_class: u8,
    flow_label: u32,
    payload_length: u16,
    next_header: IpProto,
    hop_limit: u8,
    src: Ipv6Addr,
    dst: Ipv6Addr,
}

impl Ipv6Header {
    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    #[inline]
    pub fn traffic_class(&self) -> u8 {
        self.traffic_class
    }

    /// Flow label (20 bits).
    #[inline]
    pub fn flow_label(&self) -> u32 {
        self.flow_label
    }

    /// The payload-length field as carried on the wire.
    #[inline]
    pub fn payload_length(&self) -> u16 {
        self.payload_length
    }

    #[inline]
    pub fn next_header(&self) -> IpProto {
        self.next_header
    }

    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    #[inline]
    pub fn src(&self) -> Ipv6Addr {
        self.src
    }

    #[inline]
    pub fn dst(&self) -> Ipv6Addr {
        self.dst
    }
}

impl Header for Ipv6Header {
    #[inline]
    fn len(&self) -> usize {
        IPV6_HEADER_LEN
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        let first = ((self.version as u32) << 28)
            | ((self.traffic_class as u32) << 20)
            | self.flow_label;
        bytes.extend(first.to_be_bytes());
        bytes.extend(self.payload_length.to_be_bytes());
        bytes.push(self.next_header.value());
        bytes.push(self.hop_limit);
        bytes.extend(self.src.octets());
        bytes.extend(self.dst.octets());
    }
}

/// An IPv6 packet.
#[derive(Clone, Debug)]
pub struct Ipv6 {
    header: Ipv6Header,
    payload: Option<Box<dyn LayerObject>>,
}

impl Ipv6 {
    #[inline]
    pub fn builder() -> Ipv6Builder {
        Ipv6Builder::new()
    }

    #[inline]
    pub fn header(&self) -> &Ipv6Header {
        &self.header
    }

    pub fn to_builder(&self) -> Ipv6Builder {
        Ipv6Builder {
            version: self.header.version,
            traffic_class: self.header.traffic_class,
            flow_label: self.header.flow_label,
            payload_length: self.header.payload_length,
            next_header: self.header.next_header,
            hop_limit: self.header.hop_limit,
            src: self.header.src,
            dst: self.header.dst,
            payload: self.payload.clone(),
            correct_length: false,
        }
    }
}

impl FromBytes for Ipv6 {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let first = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Ipv6", e))?;
        let version = (first >> 28) as u8;
        if version != 6 {
            return Err(DecodeError::invalid_value(
                "Ipv6",
                "version field is not 6",
            ));
        }

        let payload_length = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Ipv6", e))?;
        let next_header = IpProto::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Ipv6", e))?,
        );
        let hop_limit = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv6", e))?;
        let src = Ipv6Addr::from(
            reader
                .array::<16>()
                .map_err(|e| DecodeError::from_bounds("Ipv6", e))?,
        );
        let dst = Ipv6Addr::from(
            reader
                .array::<16>()
                .map_err(|e| DecodeError::from_bounds("Ipv6", e))?,
        );

        let payload_region = reader.take(payload_length as usize).map_err(|_| {
            DecodeError::invalid_size(
                "Ipv6",
                "payload length field exceeds the available bytes",
            )
        })?;
        let payload = if payload_region.is_empty() {
            None
        } else {
            Some(dispatch::dispatch(
                Registry::IpProto,
                next_header.value() as u32,
                payload_region,
                cx,
            ))
        };

        Ok(Ipv6 {
            header: Ipv6Header {
                version,
                traffic_class: ((first >> 20) & 0xFF) as u8,
                flow_label: first & 0x000F_FFFF,
                payload_length,
                next_header,
                hop_limit,
                src,
                dst,
            },
            payload,
        })
    }
}

impl LayerObject for Ipv6 {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Ipv6"
    }

    #[inline]
    fn len(&self) -> usize {
        IPV6_HEADER_LEN + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        IPV6_HEADER_LEN
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.header.to_bytes_extended(bytes);
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Ipv6);

/// Staging object for [`Ipv6`] packets.
#[derive(Clone, Debug)]
pub struct Ipv6Builder {
    version: u8,
    traffic_class: u8,
    flow_label: u32,
    payload_length: u16,
    next_header: IpProto,
    hop_limit: u8,
    src: Ipv6Addr,
    dst: Ipv6Addr,
    payload: Option<Box<dyn LayerObject>>,
    correct_length: bool,
}

impl Ipv6Builder {
    pub fn new() -> Self {
        Ipv6Builder {
            version: 6,
            traffic_class: 0,
            flow_label: 0,
            payload_length: 0,
            next_header: IpProto::Ipv6NoNext,
            hop_limit: 64,
            src: Ipv6Addr::UNSPECIFIED,
            dst: Ipv6Addr::UNSPECIFIED,
            payload: None,
            correct_length: false,
        }
    }

    #[inline]
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    #[inline]
    pub fn traffic_class(mut self, traffic_class: u8) -> Self {
        self.traffic_class = traffic_class;
        self
    }

    #[inline]
    pub fn flow_label(mut self, flow_label: u32) -> Self {
        self.flow_label = flow_label;
        self
    }

    /// The literal payload-length field; overwritten when
    /// [`correct_length`](Self::correct_length) is set.
    #[inline]
    pub fn payload_length(mut self, payload_length: u16) -> Self {
        self.payload_length = payload_length;
        self
    }

    #[inline]
    pub fn next_header(mut self, next_header: IpProto) -> Self {
        self.next_header = next_header;
        self
    }

    #[inline]
    pub fn hop_limit(mut self, hop_limit: u8) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    #[inline]
    pub fn src(mut self, src: Ipv6Addr) -> Self {
        self.src = src;
        self
    }

    #[inline]
    pub fn dst(mut self, dst: Ipv6Addr) -> Self {
        self.dst = dst;
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    #[inline]
    pub fn correct_length(mut self, correct: bool) -> Self {
        self.correct_length = correct;
        self
    }
}

impl Default for Ipv6Builder {
    #[inline]
    fn default() -> Self {
        Ipv6Builder::new()
    }
}

impl Build for Ipv6Builder {
    type Packet = Ipv6;

    fn build(self) -> Result<Ipv6, BuildError> {
        if self.version > 0xF {
            return Err(BuildError::out_of_range(
                "Ipv6",
                "version",
                "version is a 4-bit field",
            ));
        }
        if self.flow_label > 0x000F_FFFF {
            return Err(BuildError::out_of_range(
                "Ipv6",
                "flow_label",
                "flow label is a 20-bit field",
            ));
        }

        let payload_len = self.payload.as_ref().map_or(0, |p| p.len());
        let payload_length = if self.correct_length {
            u16::try_from(payload_len).map_err(|_| {
                BuildError::too_long(
                    "Ipv6",
                    "payload",
                    "payload exceeds the 16-bit payload length",
                )
            })?
        } else {
            self.payload_length
        };

        Ok(Ipv6 {
            header: Ipv6Header {
                version: self.version,
                traffic_class: self.traffic_class,
                flow_label: self.flow_label,
                payload_length,
                next_header: self.next_header,
                hop_limit: self.hop_limit,
                src: self.src,
                dst: self.dst,
            },
            payload: self.payload,
        })
    }
}

/// A single option inside an IPv6 hop-by-hop or destination-options
/// extension header.
///
/// `Pad1` is the one-octet padding option with no length octet; all
/// other options are type/length/value encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ipv6Option {
    Pad1,
    /// Multi-octet padding; the pad bytes are zeros on any conforming
    /// wire but are preserved verbatim regardless.
    PadN { data: Vec<u8> },
    RouterAlert { value: u16 },
    Unrecognized { option_type: Ipv6OptionType, data: Vec<u8> },
}

impl Ipv6Option {
    #[inline]
    pub fn option_type(&self) -> Ipv6OptionType {
        match self {
            Ipv6Option::Pad1 => Ipv6OptionType::Pad1,
            Ipv6Option::PadN { .. } => Ipv6OptionType::PadN,
            Ipv6Option::RouterAlert { .. } => Ipv6OptionType::RouterAlert,
            Ipv6Option::Unrecognized { option_type, .. } => *option_type,
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            Ipv6Option::Pad1 => 1,
            Ipv6Option::PadN { data } => 2 + data.len(),
            Ipv6Option::RouterAlert { .. } => 4,
            Ipv6Option::Unrecognized { data, .. } => 2 + data.len(),
        }
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        match self {
            Ipv6Option::Pad1 => bytes.push(0),
            Ipv6Option::PadN { data } => {
                bytes.push(Ipv6OptionType::PadN.value());
                bytes.push(data.len() as u8);
                bytes.extend(data);
            }
            Ipv6Option::RouterAlert { value } => {
                bytes.push(Ipv6OptionType::RouterAlert.value());
                bytes.push(2);
                bytes.extend(value.to_be_bytes());
            }
            Ipv6Option::Unrecognized { option_type, data } => {
                bytes.push(option_type.value());
                bytes.push(data.len() as u8);
                bytes.extend(data);
            }
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<Ipv6Option>, DecodeError> {
        match Ipv6OptionType::from(bytes[0]) {
            Ipv6OptionType::Pad1 => Ok(Step::Element(Ipv6Option::Pad1, 1)),
            option_type => {
                let len = *bytes.get(1).ok_or_else(|| {
                    DecodeError::insufficient(
                        "Ipv6 extension",
                        "option truncated before length octet",
                    )
                })? as usize;
                let data = bytes.get(2..2 + len).ok_or_else(|| {
                    DecodeError::invalid_size(
                        "Ipv6 extension",
                        "option length exceeds the option region",
                    )
                })?;

                let option = match option_type {
                    Ipv6OptionType::PadN => Ipv6Option::PadN {
                        data: data.to_vec(),
                    },
                    Ipv6OptionType::RouterAlert if len == 2 => Ipv6Option::RouterAlert {
                        value: u16::from_be_bytes([data[0], data[1]]),
                    },
                    _ => Ipv6Option::Unrecognized {
                        option_type,
                        data: data.to_vec(),
                    },
                };
                Ok(Step::Element(option, 2 + len))
            }
        }
    }
}

macro_rules! ipv6_options_header {
    (
        $(#[$outer:meta])*
        $Layer:ident, $Builder:ident, $name:literal
    ) => {
        $(#[$outer])*
        #[derive(Clone, Debug)]
        pub struct $Layer {
            next_header: IpProto,
            options: Vec<Ipv6Option>,
            payload: Option<Box<dyn LayerObject>>,
        }

        impl $Layer {
            #[inline]
            pub fn builder() -> $Builder {
                $Builder::new()
            }

            #[inline]
            pub fn next_header(&self) -> IpProto {
                self.next_header
            }

            #[inline]
            pub fn options(&self) -> &[Ipv6Option] {
                &self.options
            }

            pub fn to_builder(&self) -> $Builder {
                $Builder {
                    next_header: self.next_header,
                    options: self.options.clone(),
                    payload: self.payload.clone(),
                    correct_length: false,
                }
            }

            fn options_byte_len(&self) -> usize {
                self.options.iter().map(Ipv6Option::byte_len).sum()
            }
        }

        impl FromBytes for $Layer {
            fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
                let mut reader = Reader::new(bytes);
                let next_header = IpProto::from(
                    reader
                        .u8()
                        .map_err(|e| DecodeError::from_bounds($name, e))?,
                );
                let hdr_ext_len = reader
                    .u8()
                    .map_err(|e| DecodeError::from_bounds($name, e))?
                    as usize;

                let options_region =
                    reader.take((hdr_ext_len + 1) * 8 - 2).map_err(|_| {
                        DecodeError::invalid_size(
                            $name,
                            "extension length field exceeds the available bytes",
                        )
                    })?;
                let (options, rest) = tlv::walk(options_region, $name, Ipv6Option::read_one)?;
                if !rest.is_empty() {
                    // Ipv6Option has no terminator variant, so the walker
                    // always consumes the region exactly.
                    return Err(DecodeError::invalid_size(
                        $name,
                        "option walk ended before the extension region",
                    ));
                }

                let payload_region = reader.take_rest();
                let payload = if payload_region.is_empty() {
                    None
                } else {
                    Some(dispatch::dispatch(
                        Registry::IpProto,
                        next_header.value() as u32,
                        payload_region,
                        cx,
                    ))
                };

                Ok($Layer {
                    next_header,
                    options,
                    payload,
                })
            }
        }

        impl LayerObject for $Layer {
            #[inline]
            fn layer_name(&self) -> &'static str {
                $name
            }

            #[inline]
            fn len(&self) -> usize {
                self.header_len() + self.payload.as_ref().map_or(0, |p| p.len())
            }

            #[inline]
            fn header_len(&self) -> usize {
                2 + self.options_byte_len()
            }

            #[inline]
            fn payload(&self) -> Option<&dyn LayerObject> {
                self.payload.as_deref()
            }

            fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
                bytes.push(self.next_header.value());
                bytes.push((self.header_len() / 8).saturating_sub(1) as u8);
                for option in &self.options {
                    option.to_bytes_extended(bytes);
                }
                if let Some(payload) = self.payload.as_ref() {
                    payload.to_bytes_extended(bytes);
                }
            }

            #[inline]
            fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
                Box::new(self.clone())
            }
        }

        impl_byte_eq!($Layer);

        #[doc = concat!("Staging object for [`", stringify!($Layer), "`] headers.")]
        #[derive(Clone, Debug)]
        pub struct $Builder {
            next_header: IpProto,
            options: Vec<Ipv6Option>,
            payload: Option<Box<dyn LayerObject>>,
            correct_length: bool,
        }

        impl $Builder {
            pub fn new() -> Self {
                $Builder {
                    next_header: IpProto::Ipv6NoNext,
                    options: Vec::new(),
                    payload: None,
                    correct_length: false,
                }
            }

            #[inline]
            pub fn next_header(mut self, next_header: IpProto) -> Self {
                self.next_header = next_header;
                self
            }

            #[inline]
            pub fn option(mut self, option: Ipv6Option) -> Self {
                self.options.push(option);
                self
            }

            #[inline]
            pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
                self.payload = Some(Box::new(payload));
                self
            }

            /// When set, `build()` appends Pad1/PadN options so the
            /// header ends on an 8-octet boundary.
            #[inline]
            pub fn correct_length(mut self, correct: bool) -> Self {
                self.correct_length = correct;
                self
            }
        }

        impl Default for $Builder {
            #[inline]
            fn default() -> Self {
                $Builder::new()
            }
        }

        impl Build for $Builder {
            type Packet = $Layer;

            fn build(self) -> Result<$Layer, BuildError> {
                let mut options = self.options;
                let mut total = 2 + options.iter().map(Ipv6Option::byte_len).sum::<usize>();

                if self.correct_length {
                    let short = padded_length::<8>(total) - total;
                    match short {
                        0 => (),
                        1 => options.push(Ipv6Option::Pad1),
                        n => options.push(Ipv6Option::PadN {
                            data: vec![0; n - 2],
                        }),
                    }
                    total = padded_length::<8>(total);
                }

                if total % 8 != 0 {
                    return Err(BuildError::out_of_range(
                        $name,
                        "options",
                        "extension header must end on an 8-octet boundary",
                    ));
                }
                if total / 8 > 256 {
                    return Err(BuildError::too_long(
                        $name,
                        "options",
                        "options exceed the 8-bit extension length",
                    ));
                }

                Ok($Layer {
                    next_header: self.next_header,
                    options,
                    payload: self.payload,
                })
            }
        }
    };
}

ipv6_options_header! {
    /// The IPv6 hop-by-hop options extension header.
    Ipv6HopByHop, Ipv6HopByHopBuilder, "Ipv6HopByHop"
}

ipv6_options_header! {
    /// The IPv6 destination-options extension header.
    Ipv6DestOptions, Ipv6DestOptionsBuilder, "Ipv6DestOptions"
}

/// The IPv6 routing extension header.
///
/// The routing-type-specific data (e.g. the address list of a type 0
/// header) is preserved as raw bytes.
#[derive(Clone, Debug)]
pub struct Ipv6Routing {
    next_header: IpProto,
    routing_type: u8,
    segments_left: u8,
    type_data: Vec<u8>,
    payload: Option<Box<dyn LayerObject>>,
}

impl Ipv6Routing {
    #[inline]
    pub fn builder() -> Ipv6RoutingBuilder {
        Ipv6RoutingBuilder::new()
    }

    pub fn to_builder(&self) -> Ipv6RoutingBuilder {
        Ipv6RoutingBuilder {
            next_header: self.next_header,
            routing_type: self.routing_type,
            segments_left: self.segments_left,
            type_data: self.type_data.clone(),
            payload: self.payload.clone(),
        }
    }

    #[inline]
    pub fn next_header(&self) -> IpProto {
        self.next_header
    }

    #[inline]
    pub fn routing_type(&self) -> u8 {
        self.routing_type
    }

    #[inline]
    pub fn segments_left(&self) -> u8 {
        self.segments_left
    }

    #[inline]
    pub fn type_data(&self) -> &[u8] {
        &self.type_data
    }
}

impl FromBytes for Ipv6Routing {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let next_header = IpProto::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Ipv6Routing", e))?,
        );
        let hdr_ext_len = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv6Routing", e))? as usize;
        let routing_type = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv6Routing", e))?;
        let segments_left = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv6Routing", e))?;

        let type_data = reader
            .take((hdr_ext_len + 1) * 8 - 4)
            .map_err(|_| {
                DecodeError::invalid_size(
                    "Ipv6Routing",
                    "extension length field exceeds the available bytes",
                )
            })?
            .to_vec();

        let payload_region = reader.take_rest();
        let payload = if payload_region.is_empty() {
            None
        } else {
            Some(dispatch::dispatch(
                Registry::IpProto,
                next_header.value() as u32,
                payload_region,
                cx,
            ))
        };

        Ok(Ipv6Routing {
            next_header,
            routing_type,
            segments_left,
            type_data,
            payload,
        })
    }
}

impl LayerObject for Ipv6Routing {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Ipv6Routing"
    }

    #[inline]
    fn len(&self) -> usize {
        self.header_len() + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        4 + self.type_data.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.next_header.value());
        bytes.push((self.header_len() / 8).saturating_sub(1) as u8);
        bytes.push(self.routing_type);
        bytes.push(self.segments_left);
        bytes.extend(&self.type_data);
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Ipv6Routing);

/// Staging object for [`Ipv6Routing`] headers.
#[derive(Clone, Debug)]
pub struct Ipv6RoutingBuilder {
    next_header: IpProto,
    routing_type: u8,
    segments_left: u8,
    type_data: Vec<u8>,
    payload: Option<Box<dyn LayerObject>>,
}

impl Ipv6RoutingBuilder {
    pub fn new() -> Self {
        Ipv6RoutingBuilder {
            next_header: IpProto::Ipv6NoNext,
            routing_type: 0,
            segments_left: 0,
            type_data: vec![0; 4],
            payload: None,
        }
    }

    #[inline]
    pub fn next_header(mut self, next_header: IpProto) -> Self {
        self.next_header = next_header;
        self
    }

    #[inline]
    pub fn routing_type(mut self, routing_type: u8) -> Self {
        self.routing_type = routing_type;
        self
    }

    #[inline]
    pub fn segments_left(mut self, segments_left: u8) -> Self {
        self.segments_left = segments_left;
        self
    }

    /// The routing-type-specific data following the fixed four octets.
    /// Its length must make the header a multiple of 8 octets.
    #[inline]
    pub fn type_data(mut self, type_data: Vec<u8>) -> Self {
        self.type_data = type_data;
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }
}

impl Default for Ipv6RoutingBuilder {
    #[inline]
    fn default() -> Self {
        Ipv6RoutingBuilder::new()
    }
}

impl Build for Ipv6RoutingBuilder {
    type Packet = Ipv6Routing;

    fn build(self) -> Result<Ipv6Routing, BuildError> {
        let total = 4 + self.type_data.len();
        if total % 8 != 0 {
            return Err(BuildError::out_of_range(
                "Ipv6Routing",
                "type_data",
                "routing header must end on an 8-octet boundary",
            ));
        }
        if total / 8 > 256 {
            return Err(BuildError::too_long(
                "Ipv6Routing",
                "type_data",
                "routing data exceeds the 8-bit extension length",
            ));
        }

        Ok(Ipv6Routing {
            next_header: self.next_header,
            routing_type: self.routing_type,
            segments_left: self.segments_left,
            type_data: self.type_data,
            payload: self.payload,
        })
    }
}

/// The fixed 8-byte IPv6 fragment extension header.
///
/// Only a first fragment (offset zero) has a decodable payload; later
/// fragments carry mid-stream bytes that are preserved as `Raw`.
#[derive(Clone, Debug)]
pub struct Ipv6Fragment {
    next_header: IpProto,
    reserved: u8,
    frag_offset: u16,
    reserved2: u8,
    more_fragments: bool,
    identification: u32,
    payload: Option<Box<dyn LayerObject>>,
}

impl Ipv6Fragment {
    #[inline]
    pub fn builder() -> Ipv6FragmentBuilder {
        Ipv6FragmentBuilder::new()
    }

    pub fn to_builder(&self) -> Ipv6FragmentBuilder {
        Ipv6FragmentBuilder {
            next_header: self.next_header,
            reserved: self.reserved,
            frag_offset: self.frag_offset,
            reserved2: self.reserved2,
            more_fragments: self.more_fragments,
            identification: self.identification,
            payload: self.payload.clone(),
        }
    }

    #[inline]
    pub fn next_header(&self) -> IpProto {
        self.next_header
    }

    /// Fragment offset in 8-octet units (13 bits).
    #[inline]
    pub fn frag_offset(&self) -> u16 {
        self.frag_offset
    }

    #[inline]
    pub fn more_fragments(&self) -> bool {
        self.more_fragments
    }

    #[inline]
    pub fn identification(&self) -> u32 {
        self.identification
    }
}

impl FromBytes for Ipv6Fragment {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let next_header = IpProto::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Ipv6Fragment", e))?,
        );
        let reserved = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Ipv6Fragment", e))?;
        let offset_field = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Ipv6Fragment", e))?;
        let identification = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Ipv6Fragment", e))?;

        let frag_offset = offset_field >> 3;
        let payload_region = reader.take_rest();
        let payload = if payload_region.is_empty() {
            None
        } else if frag_offset == 0 {
            Some(dispatch::dispatch(
                Registry::IpProto,
                next_header.value() as u32,
                payload_region,
                cx,
            ))
        } else {
            Some(Box::new(crate::layers::Raw::from(payload_region)) as Box<dyn LayerObject>)
        };

        Ok(Ipv6Fragment {
            next_header,
            reserved,
            frag_offset,
            reserved2: ((offset_field >> 1) & 0x3) as u8,
            more_fragments: offset_field & 0x1 != 0,
            identification,
            payload,
        })
    }
}

impl LayerObject for Ipv6Fragment {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Ipv6Fragment"
    }

    #[inline]
    fn len(&self) -> usize {
        8 + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        8
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.next_header.value());
        bytes.push(self.reserved);
        let offset_field = (self.frag_offset << 3)
            | ((self.reserved2 as u16) << 1)
            | self.more_fragments as u16;
        bytes.extend(offset_field.to_be_bytes());
        bytes.extend(self.identification.to_be_bytes());
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Ipv6Fragment);

/// Staging object for [`Ipv6Fragment`] headers.
#[derive(Clone, Debug)]
pub struct Ipv6FragmentBuilder {
    next_header: IpProto,
    reserved: u8,
    frag_offset: u16,
    reserved2: u8,
    more_fragments: bool,
    identification: u32,
    payload: Option<Box<dyn LayerObject>>,
}

impl Ipv6FragmentBuilder {
    pub fn new() -> Self {
        Ipv6FragmentBuilder {
            next_header: IpProto::Ipv6NoNext,
            reserved: 0,
            frag_offset: 0,
            reserved2: 0,
            more_fragments: false,
            identification: 0,
            payload: None,
        }
    }

    #[inline]
    pub fn next_header(mut self, next_header: IpProto) -> Self {
        self.next_header = next_header;
        self
    }

    #[inline]
    pub fn frag_offset(mut self, frag_offset: u16) -> Self {
        self.frag_offset = frag_offset;
        self
    }

    #[inline]
    pub fn more_fragments(mut self, more_fragments: bool) -> Self {
        self.more_fragments = more_fragments;
        self
    }

    #[inline]
    pub fn identification(mut self, identification: u32) -> Self {
        self.identification = identification;
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }
}

impl Default for Ipv6FragmentBuilder {
    #[inline]
    fn default() -> Self {
        Ipv6FragmentBuilder::new()
    }
}

impl Build for Ipv6FragmentBuilder {
    type Packet = Ipv6Fragment;

    fn build(self) -> Result<Ipv6Fragment, BuildError> {
        if self.frag_offset > 0x1FFF {
            return Err(BuildError::out_of_range(
                "Ipv6Fragment",
                "frag_offset",
                "fragment offset is a 13-bit field",
            ));
        }

        Ok(Ipv6Fragment {
            next_header: self.next_header,
            reserved: self.reserved,
            frag_offset: self.frag_offset,
            reserved2: self.reserved2,
            more_fragments: self.more_fragments,
            identification: self.identification,
            payload: self.payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Raw;

    fn minimal_ipv4(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![
            0x45, 0x00, // version/IHL, DSCP/ECN
            0x00, 0x00, // total length (patched below)
            0x12, 0x34, // identification
            0x40, 0x00, // DF, offset 0
            0x40, 0xFD, // TTL 64, protocol 253 (experimental)
            0x00, 0x00, // checksum
            10, 0, 0, 1, // src
            10, 0, 0, 2, // dst
        ];
        bytes.extend(payload);
        let total = bytes.len() as u16;
        bytes[2..4].copy_from_slice(&total.to_be_bytes());
        bytes
    }

    #[test]
    fn ipv4_round_trips() {
        let bytes = minimal_ipv4(&[0xAA, 0xBB, 0xCC]);
        let ip = Ipv4::from_bytes(&bytes).unwrap();
        assert_eq!(ip.header().version(), 4);
        assert_eq!(ip.header().ihl(), 5);
        assert_eq!(ip.header().ttl(), 64);
        assert_eq!(ip.header().src(), Ipv4Addr::new(10, 0, 0, 1));
        assert!(ip.header().flags().contains(Ipv4Flags::DONT_FRAGMENT));
        assert_eq!(ip.len(), bytes.len());
        assert_eq!(ip.to_bytes(), bytes);
    }

    #[test]
    fn ipv4_wrong_version_is_malformed() {
        let mut bytes = minimal_ipv4(&[]);
        bytes[0] = 0x65;
        assert!(Ipv4::from_bytes(&bytes).is_err());
    }

    #[test]
    fn ipv4_total_length_overrun_is_malformed() {
        let mut bytes = minimal_ipv4(&[1, 2, 3]);
        bytes[2..4].copy_from_slice(&100u16.to_be_bytes());
        assert!(Ipv4::from_bytes(&bytes).is_err());
    }

    #[test]
    fn ipv4_excess_bytes_left_to_enclosing_layer() {
        let mut bytes = minimal_ipv4(&[1, 2]);
        bytes.extend([0xFF; 4]); // frame padding past total_length
        let ip = Ipv4::from_bytes(&bytes).unwrap();
        assert_eq!(ip.len(), bytes.len() - 4);
    }

    #[test]
    fn ipv4_options_walk_and_round_trip() {
        // IHL=7: 8 option bytes = NOP + record-route (len 7, ptr 4, one route)
        let mut bytes = vec![
            0x47, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0xFD, 0x00, 0x00, 10, 0, 0, 1,
            10, 0, 0, 2,
        ];
        bytes.extend([
            0x01, // NOP
            0x07, 0x07, 0x04, 192, 168, 0, 1, // record route
        ]);
        let total = bytes.len() as u16;
        bytes[2..4].copy_from_slice(&total.to_be_bytes());

        let ip = Ipv4::from_bytes(&bytes).unwrap();
        assert_eq!(ip.header().options().len(), 2);
        assert_eq!(
            ip.header().options()[1],
            Ipv4Option::RecordRoute {
                pointer: 4,
                routes: vec![Ipv4Addr::new(192, 168, 0, 1)],
            }
        );
        assert_eq!(ip.to_bytes(), bytes);
    }

    #[test]
    fn ipv4_builder_corrects_length_and_checksum() {
        let ip = Ipv4::builder()
            .protocol(IpProto::Exp1)
            .src(Ipv4Addr::new(1, 1, 1, 1))
            .dst(Ipv4Addr::new(2, 2, 2, 2))
            .payload(Raw::from(vec![0x55; 11]))
            .correct_length(true)
            .correct_chksum(true)
            .build()
            .unwrap();

        assert_eq!(ip.header().total_length(), 31);
        assert_ne!(ip.header().chksum(), 0);
        assert!(ip.has_valid_chksum());

        let decoded = Ipv4::from_bytes(&ip.to_bytes()).unwrap();
        assert_eq!(decoded, ip);
    }

    #[test]
    fn ipv4_bit_fields_validate_range() {
        assert!(Ipv4::builder().dscp(0x3F).correct_length(true).build().is_ok());
        assert!(Ipv4::builder().dscp(0x40).build().is_err());
        assert!(Ipv4::builder().ecn(4).build().is_err());
        assert!(Ipv4::builder().frag_offset(0x2000).build().is_err());
        assert!(Ipv4::builder().version(16).build().is_err());
    }

    #[test]
    fn ipv6_round_trips_with_extension_chain() {
        // IPv6 / hop-by-hop (PadN filler) / no next header
        let mut bytes = vec![
            0x60, 0x00, 0x00, 0x00, // version 6
            0x00, 0x08, // payload length
            0x00, 0x40, // next header: hop-by-hop, hop limit 64
        ];
        bytes.extend([0x20; 16]); // src
        bytes.extend([0x21; 16]); // dst
        bytes.extend([
            59, 0x00, // next header: none, ext len 0
            0x01, 0x04, 0x00, 0x00, 0x00, 0x00, // PadN(4)
        ]);

        let ip = Ipv6::from_bytes(&bytes).unwrap();
        assert_eq!(ip.header().version(), 6);
        assert_eq!(ip.header().next_header(), IpProto::HopByHop);

        let hop: &Ipv6HopByHop = ip.get_layer().unwrap();
        assert_eq!(hop.next_header(), IpProto::Ipv6NoNext);
        assert_eq!(hop.options(), &[Ipv6Option::PadN { data: vec![0; 4] }]);

        assert_eq!(ip.to_bytes(), bytes);
    }

    #[test]
    fn ipv6_payload_length_overrun_is_malformed() {
        let mut bytes = vec![0x60, 0, 0, 0, 0x00, 0x20, 59, 64];
        bytes.extend([0; 32]);
        // declares 32 payload bytes, none present
        assert!(Ipv6::from_bytes(&bytes).is_err());
    }

    #[test]
    fn ipv6_flow_label_validates_range() {
        assert!(Ipv6::builder().flow_label(0xFFFFF).build().is_ok());
        assert!(Ipv6::builder().flow_label(0x100000).build().is_err());
    }

    #[test]
    fn hop_by_hop_builder_pads_to_boundary() {
        let hop = Ipv6HopByHop::builder()
            .next_header(IpProto::Ipv6NoNext)
            .option(Ipv6Option::RouterAlert { value: 0 })
            .correct_length(true)
            .build()
            .unwrap();
        assert_eq!(hop.header_len() % 8, 0);
        assert_eq!(hop.to_builder().build().unwrap(), hop);
    }

    #[test]
    fn fragment_mid_stream_payload_stays_raw() {
        let mut bytes = vec![
            6, 0, // next header TCP, reserved
            0x00, 0x59, // offset 11, more fragments
            0x00, 0x00, 0x00, 0x07, // identification
        ];
        bytes.extend([0xEE; 12]);
        let frag = Ipv6Fragment::from_bytes(&bytes).unwrap();
        assert_eq!(frag.frag_offset(), 11);
        assert!(frag.more_fragments());
        assert_eq!(frag.payload().unwrap().layer_name(), "Raw");
        assert_eq!(frag.to_bytes(), bytes);
    }
}
