// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The ICMPv4 and ICMPv6 families.
//!
//! Both share a 4-byte type/code/checksum header; the message body is a
//! type-selected sub-layer (echo, an error report carrying the invoking
//! packet, or a neighbor-discovery message with its option sequence).
//! ICMPv4 checksums cover the message alone; ICMPv6 checksums include
//! the IPv6 pseudo-header, so verification and build-time correction
//! take the enclosing address pair.

use std::net::{Ipv4Addr, Ipv6Addr};

use pdus_common::Reader;

use crate::dispatch::DecodeCx;
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::layers::Raw;
use crate::nums::{IcmpV4Type, IcmpV6Type, IpProto, NdpOptionType};
use crate::tlv::{self, Step};
use crate::utils;

pub(crate) fn decode_icmpv4(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(IcmpV4::from_bytes_in(bytes, cx)?))
}

pub(crate) fn decode_icmpv6(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(IcmpV6::from_bytes_in(bytes, cx)?))
}

/// An echo request/reply body, shared by both ICMP families.
#[derive(Clone, Debug)]
pub struct IcmpEcho {
    identifier: u16,
    seq: u16,
    payload: Option<Box<dyn LayerObject>>,
}

impl IcmpEcho {
    pub fn new(identifier: u16, seq: u16, data: Vec<u8>) -> Self {
        IcmpEcho {
            identifier,
            seq,
            payload: if data.is_empty() {
                None
            } else {
                Some(Box::new(Raw::from(data)) as Box<dyn LayerObject>)
            },
        }
    }

    #[inline]
    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    #[inline]
    pub fn seq(&self) -> u16 {
        self.seq
    }
}

impl FromBytes for IcmpEcho {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let identifier = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("IcmpEcho", e))?;
        let seq = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("IcmpEcho", e))?;
        Ok(IcmpEcho::new(identifier, seq, reader.take_rest().to_vec()))
    }
}

impl LayerObject for IcmpEcho {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "IcmpEcho"
    }

    #[inline]
    fn len(&self) -> usize {
        4 + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        4
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.identifier.to_be_bytes());
        bytes.extend(self.seq.to_be_bytes());
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(IcmpEcho);

/// An ICMP error-report body: a 32-bit rest-of-header word followed by
/// the leading fragment of the invoking packet, preserved verbatim.
///
/// Used for destination-unreachable, time-exceeded, source-quench and
/// parameter-problem messages (the word's interpretation varies by
/// type; for parameter-problem its top octet is the pointer).
#[derive(Clone, Debug)]
pub struct IcmpInvoking {
    info: u32,
    payload: Option<Box<dyn LayerObject>>,
}

impl IcmpInvoking {
    pub fn new(info: u32, invoking_packet: Vec<u8>) -> Self {
        IcmpInvoking {
            info,
            payload: if invoking_packet.is_empty() {
                None
            } else {
                Some(Box::new(Raw::from(invoking_packet)) as Box<dyn LayerObject>)
            },
        }
    }

    /// The rest-of-header word following type/code/checksum.
    #[inline]
    pub fn info(&self) -> u32 {
        self.info
    }

    /// The invoking packet fragment, when present.
    pub fn invoking_packet(&self) -> Option<&[u8]> {
        self.payload
            .as_deref()
            .and_then(|p| p.as_any().downcast_ref::<Raw>())
            .map(Raw::data)
    }
}

impl FromBytes for IcmpInvoking {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let info = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("IcmpInvoking", e))?;
        Ok(IcmpInvoking::new(info, reader.take_rest().to_vec()))
    }
}

impl LayerObject for IcmpInvoking {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "IcmpInvoking"
    }

    #[inline]
    fn len(&self) -> usize {
        4 + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        4
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.info.to_be_bytes());
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(IcmpInvoking);

/// An ICMPv4 redirect body: the gateway address plus the invoking
/// packet fragment.
#[derive(Clone, Debug)]
pub struct IcmpRedirect {
    gateway: Ipv4Addr,
    payload: Option<Box<dyn LayerObject>>,
}

impl IcmpRedirect {
    pub fn new(gateway: Ipv4Addr, invoking_packet: Vec<u8>) -> Self {
        IcmpRedirect {
            gateway,
            payload: if invoking_packet.is_empty() {
                None
            } else {
                Some(Box::new(Raw::from(invoking_packet)) as Box<dyn LayerObject>)
            },
        }
    }

    #[inline]
    pub fn gateway(&self) -> Ipv4Addr {
        self.gateway
    }
}

impl FromBytes for IcmpRedirect {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let gateway = Ipv4Addr::from(
            reader
                .array::<4>()
                .map_err(|e| DecodeError::from_bounds("IcmpRedirect", e))?,
        );
        Ok(IcmpRedirect::new(gateway, reader.take_rest().to_vec()))
    }
}

impl LayerObject for IcmpRedirect {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "IcmpRedirect"
    }

    #[inline]
    fn len(&self) -> usize {
        4 + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        4
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.gateway.octets());
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(IcmpRedirect);

/// An ICMPv4 message.
#[derive(Clone, Debug)]
pub struct IcmpV4 {
    icmp_type: IcmpV4Type,
    code: u8,
    chksum: u16,
    payload: Option<Box<dyn LayerObject>>,
}

impl IcmpV4 {
    #[inline]
    pub fn builder() -> IcmpV4Builder {
        IcmpV4Builder::new()
    }

    #[inline]
    pub fn icmp_type(&self) -> IcmpV4Type {
        self.icmp_type
    }

    #[inline]
    pub fn code(&self) -> u8 {
        self.code
    }

    #[inline]
    pub fn chksum(&self) -> u16 {
        self.chksum
    }

    /// The checksum the message should carry (no pseudo-header in v4).
    pub fn compute_chksum(&self) -> u16 {
        let mut bytes = self.to_bytes();
        bytes[2] = 0;
        bytes[3] = 0;
        let mut chksum = utils::InternetChecksum::new();
        chksum.add_bytes(&bytes);
        chksum.finish()
    }

    #[inline]
    pub fn has_valid_chksum(&self) -> bool {
        self.chksum == self.compute_chksum()
    }

    pub fn to_builder(&self) -> IcmpV4Builder {
        IcmpV4Builder {
            icmp_type: self.icmp_type,
            code: self.code,
            chksum: self.chksum,
            payload: self.payload.clone(),
            correct_chksum: false,
        }
    }
}

impl FromBytes for IcmpV4 {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let icmp_type = IcmpV4Type::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("IcmpV4", e))?,
        );
        let code = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("IcmpV4", e))?;
        let chksum = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("IcmpV4", e))?;

        let body = reader.take_rest();
        let payload: Option<Box<dyn LayerObject>> = if body.is_empty() {
            None
        } else {
            Some(match icmp_type {
                IcmpV4Type::Echo | IcmpV4Type::EchoReply => {
                    Box::new(IcmpEcho::from_bytes_in(body, cx)?)
                }
                IcmpV4Type::DestinationUnreachable
                | IcmpV4Type::TimeExceeded
                | IcmpV4Type::SourceQuench
                | IcmpV4Type::ParameterProblem => Box::new(IcmpInvoking::from_bytes_in(body, cx)?),
                IcmpV4Type::Redirect => Box::new(IcmpRedirect::from_bytes_in(body, cx)?),
                _ => Box::new(Raw::from(body)),
            })
        };

        Ok(IcmpV4 {
            icmp_type,
            code,
            chksum,
            payload,
        })
    }
}

impl LayerObject for IcmpV4 {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "IcmpV4"
    }

    #[inline]
    fn len(&self) -> usize {
        4 + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        4
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.icmp_type.value());
        bytes.push(self.code);
        bytes.extend(self.chksum.to_be_bytes());
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(IcmpV4);

/// Staging object for [`IcmpV4`] messages.
#[derive(Clone, Debug)]
pub struct IcmpV4Builder {
    icmp_type: IcmpV4Type,
    code: u8,
    chksum: u16,
    payload: Option<Box<dyn LayerObject>>,
    correct_chksum: bool,
}

impl IcmpV4Builder {
    pub fn new() -> Self {
        IcmpV4Builder {
            icmp_type: IcmpV4Type::Echo,
            code: 0,
            chksum: 0,
            payload: None,
            correct_chksum: false,
        }
    }

    #[inline]
    pub fn icmp_type(mut self, icmp_type: IcmpV4Type) -> Self {
        self.icmp_type = icmp_type;
        self
    }

    #[inline]
    pub fn code(mut self, code: u8) -> Self {
        self.code = code;
        self
    }

    #[inline]
    pub fn chksum(mut self, chksum: u16) -> Self {
        self.chksum = chksum;
        self
    }

    /// The message body (e.g. an [`IcmpEcho`]).
    #[inline]
    pub fn body(mut self, body: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(body));
        self
    }

    #[inline]
    pub fn correct_chksum(mut self, correct: bool) -> Self {
        self.correct_chksum = correct;
        self
    }
}

impl Default for IcmpV4Builder {
    #[inline]
    fn default() -> Self {
        IcmpV4Builder::new()
    }
}

impl Build for IcmpV4Builder {
    type Packet = IcmpV4;

    fn build(self) -> Result<IcmpV4, BuildError> {
        let mut icmp = IcmpV4 {
            icmp_type: self.icmp_type,
            code: self.code,
            chksum: self.chksum,
            payload: self.payload,
        };
        if self.correct_chksum {
            icmp.chksum = icmp.compute_chksum();
        }
        Ok(icmp)
    }
}

/// A single NDP option inside a neighbor-discovery message.
///
/// Lengths are carried in 8-octet units; an unrecognized type keeps its
/// raw content verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NdpOption {
    SourceLinkLayerAddress(Vec<u8>),
    TargetLinkLayerAddress(Vec<u8>),
    Mtu { reserved: u16, mtu: u32 },
    Unrecognized { option_type: NdpOptionType, data: Vec<u8> },
}

impl NdpOption {
    #[inline]
    pub fn option_type(&self) -> NdpOptionType {
        match self {
            NdpOption::SourceLinkLayerAddress(_) => NdpOptionType::SourceLinkLayerAddress,
            NdpOption::TargetLinkLayerAddress(_) => NdpOptionType::TargetLinkLayerAddress,
            NdpOption::Mtu { .. } => NdpOptionType::Mtu,
            NdpOption::Unrecognized { option_type, .. } => *option_type,
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            NdpOption::SourceLinkLayerAddress(addr)
            | NdpOption::TargetLinkLayerAddress(addr) => 2 + addr.len(),
            NdpOption::Mtu { .. } => 8,
            NdpOption::Unrecognized { data, .. } => 2 + data.len(),
        }
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.option_type().value());
        bytes.push((self.byte_len() / 8) as u8);
        match self {
            NdpOption::SourceLinkLayerAddress(addr)
            | NdpOption::TargetLinkLayerAddress(addr) => bytes.extend(addr),
            NdpOption::Mtu { reserved, mtu } => {
                bytes.extend(reserved.to_be_bytes());
                bytes.extend(mtu.to_be_bytes());
            }
            NdpOption::Unrecognized { data, .. } => bytes.extend(data),
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<NdpOption>, DecodeError> {
        let option_type = NdpOptionType::from(bytes[0]);
        let len = *bytes.get(1).ok_or_else(|| {
            DecodeError::insufficient("IcmpV6", "NDP option truncated before length octet")
        })? as usize
            * 8;
        if len == 0 {
            return Err(DecodeError::invalid_size(
                "IcmpV6",
                "NDP option length of zero",
            ));
        }
        let data = bytes.get(2..len).ok_or_else(|| {
            DecodeError::invalid_size("IcmpV6", "NDP option length exceeds the option region")
        })?;

        let option = match option_type {
            NdpOptionType::SourceLinkLayerAddress => {
                NdpOption::SourceLinkLayerAddress(data.to_vec())
            }
            NdpOptionType::TargetLinkLayerAddress => {
                NdpOption::TargetLinkLayerAddress(data.to_vec())
            }
            NdpOptionType::Mtu if len == 8 => NdpOption::Mtu {
                reserved: u16::from_be_bytes([data[0], data[1]]),
                mtu: u32::from_be_bytes([data[2], data[3], data[4], data[5]]),
            },
            _ => NdpOption::Unrecognized {
                option_type,
                data: data.to_vec(),
            },
        };
        Ok(Step::Element(option, len))
    }
}

fn walk_ndp_options(region: &[u8]) -> Result<Vec<NdpOption>, DecodeError> {
    let (options, rest) = tlv::walk(region, "IcmpV6", NdpOption::read_one)?;
    debug_assert!(rest.is_empty());
    Ok(options)
}

/// A neighbor-solicitation body: the target address plus options.
#[derive(Clone, Debug)]
pub struct NdpNeighborSolicit {
    reserved: u32,
    target: Ipv6Addr,
    options: Vec<NdpOption>,
}

impl NdpNeighborSolicit {
    pub fn new(target: Ipv6Addr, options: Vec<NdpOption>) -> Self {
        NdpNeighborSolicit {
            reserved: 0,
            target,
            options,
        }
    }

    #[inline]
    pub fn target(&self) -> Ipv6Addr {
        self.target
    }

    #[inline]
    pub fn options(&self) -> &[NdpOption] {
        &self.options
    }
}

impl FromBytes for NdpNeighborSolicit {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let reserved = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let target = Ipv6Addr::from(
            reader
                .array::<16>()
                .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?,
        );
        let options = walk_ndp_options(reader.take_rest())?;
        Ok(NdpNeighborSolicit {
            reserved,
            target,
            options,
        })
    }
}

impl LayerObject for NdpNeighborSolicit {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "NdpNeighborSolicit"
    }

    #[inline]
    fn len(&self) -> usize {
        20 + self.options.iter().map(NdpOption::byte_len).sum::<usize>()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.reserved.to_be_bytes());
        bytes.extend(self.target.octets());
        for option in &self.options {
            option.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(NdpNeighborSolicit);

/// A neighbor-advertisement body.
#[derive(Clone, Debug)]
pub struct NdpNeighborAdvert {
    flags_reserved: u32,
    target: Ipv6Addr,
    options: Vec<NdpOption>,
}

impl NdpNeighborAdvert {
    /// Router/solicited/override flag bits.
    pub const ROUTER: u32 = 0x8000_0000;
    pub const SOLICITED: u32 = 0x4000_0000;
    pub const OVERRIDE: u32 = 0x2000_0000;

    pub fn new(flags: u32, target: Ipv6Addr, options: Vec<NdpOption>) -> Self {
        NdpNeighborAdvert {
            flags_reserved: flags,
            target,
            options,
        }
    }

    #[inline]
    pub fn is_router(&self) -> bool {
        self.flags_reserved & Self::ROUTER != 0
    }

    #[inline]
    pub fn is_solicited(&self) -> bool {
        self.flags_reserved & Self::SOLICITED != 0
    }

    #[inline]
    pub fn target(&self) -> Ipv6Addr {
        self.target
    }

    #[inline]
    pub fn options(&self) -> &[NdpOption] {
        &self.options
    }
}

impl FromBytes for NdpNeighborAdvert {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let flags_reserved = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let target = Ipv6Addr::from(
            reader
                .array::<16>()
                .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?,
        );
        let options = walk_ndp_options(reader.take_rest())?;
        Ok(NdpNeighborAdvert {
            flags_reserved,
            target,
            options,
        })
    }
}

impl LayerObject for NdpNeighborAdvert {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "NdpNeighborAdvert"
    }

    #[inline]
    fn len(&self) -> usize {
        20 + self.options.iter().map(NdpOption::byte_len).sum::<usize>()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.flags_reserved.to_be_bytes());
        bytes.extend(self.target.octets());
        for option in &self.options {
            option.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(NdpNeighborAdvert);

/// A router-advertisement body.
#[derive(Clone, Debug)]
pub struct NdpRouterAdvert {
    hop_limit: u8,
    flags: u8,
    router_lifetime: u16,
    reachable_time: u32,
    retrans_timer: u32,
    options: Vec<NdpOption>,
}

impl NdpRouterAdvert {
    #[inline]
    pub fn hop_limit(&self) -> u8 {
        self.hop_limit
    }

    #[inline]
    pub fn router_lifetime(&self) -> u16 {
        self.router_lifetime
    }

    #[inline]
    pub fn options(&self) -> &[NdpOption] {
        &self.options
    }
}

impl FromBytes for NdpRouterAdvert {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let hop_limit = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let flags = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let router_lifetime = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let reachable_time = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let retrans_timer = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let options = walk_ndp_options(reader.take_rest())?;
        Ok(NdpRouterAdvert {
            hop_limit,
            flags,
            router_lifetime,
            reachable_time,
            retrans_timer,
            options,
        })
    }
}

impl LayerObject for NdpRouterAdvert {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "NdpRouterAdvert"
    }

    #[inline]
    fn len(&self) -> usize {
        12 + self.options.iter().map(NdpOption::byte_len).sum::<usize>()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.hop_limit);
        bytes.push(self.flags);
        bytes.extend(self.router_lifetime.to_be_bytes());
        bytes.extend(self.reachable_time.to_be_bytes());
        bytes.extend(self.retrans_timer.to_be_bytes());
        for option in &self.options {
            option.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(NdpRouterAdvert);

/// A router-solicitation body: reserved word plus options.
#[derive(Clone, Debug)]
pub struct NdpRouterSolicit {
    reserved: u32,
    options: Vec<NdpOption>,
}

impl NdpRouterSolicit {
    pub fn new(options: Vec<NdpOption>) -> Self {
        NdpRouterSolicit {
            reserved: 0,
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &[NdpOption] {
        &self.options
    }
}

impl FromBytes for NdpRouterSolicit {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let reserved = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let options = walk_ndp_options(reader.take_rest())?;
        Ok(NdpRouterSolicit { reserved, options })
    }
}

impl LayerObject for NdpRouterSolicit {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "NdpRouterSolicit"
    }

    #[inline]
    fn len(&self) -> usize {
        4 + self.options.iter().map(NdpOption::byte_len).sum::<usize>()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.reserved.to_be_bytes());
        for option in &self.options {
            option.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(NdpRouterSolicit);

/// An ICMPv6 message.
#[derive(Clone, Debug)]
pub struct IcmpV6 {
    icmp_type: IcmpV6Type,
    code: u8,
    chksum: u16,
    payload: Option<Box<dyn LayerObject>>,
}

impl IcmpV6 {
    #[inline]
    pub fn builder() -> IcmpV6Builder {
        IcmpV6Builder::new()
    }

    #[inline]
    pub fn icmp_type(&self) -> IcmpV6Type {
        self.icmp_type
    }

    #[inline]
    pub fn code(&self) -> u8 {
        self.code
    }

    #[inline]
    pub fn chksum(&self) -> u16 {
        self.chksum
    }

    /// The checksum the message should carry; ICMPv6 always includes
    /// the IPv6 pseudo-header.
    pub fn compute_chksum(&self, src: Ipv6Addr, dst: Ipv6Addr) -> u16 {
        let mut bytes = self.to_bytes();
        bytes[2] = 0;
        bytes[3] = 0;
        let mut chksum = utils::pseudo_header_checksum_v6(
            src,
            dst,
            IpProto::Icmpv6.value(),
            bytes.len(),
        );
        chksum.add_bytes(&bytes);
        chksum.finish()
    }

    /// Whether the checksum field matches a recomputation.
    ///
    /// Some stacks emit the all-ones alternate encoding when the
    /// computed sum is zero; `all_ones_as_zero` opts into tolerating
    /// that reading.
    pub fn has_valid_chksum(&self, src: Ipv6Addr, dst: Ipv6Addr, all_ones_as_zero: bool) -> bool {
        let expected = self.compute_chksum(src, dst);
        if self.chksum == expected {
            return true;
        }
        all_ones_as_zero && self.chksum == 0xFFFF && expected == 0
    }

    pub fn to_builder(&self) -> IcmpV6Builder {
        IcmpV6Builder {
            icmp_type: self.icmp_type,
            code: self.code,
            chksum: self.chksum,
            payload: self.payload.clone(),
            src_addr: None,
            dst_addr: None,
            correct_chksum: false,
        }
    }
}

impl FromBytes for IcmpV6 {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let icmp_type = IcmpV6Type::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?,
        );
        let code = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;
        let chksum = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("IcmpV6", e))?;

        let body = reader.take_rest();
        let payload: Option<Box<dyn LayerObject>> = if body.is_empty() {
            None
        } else {
            Some(match icmp_type {
                IcmpV6Type::EchoRequest | IcmpV6Type::EchoReply => {
                    Box::new(IcmpEcho::from_bytes_in(body, cx)?)
                }
                IcmpV6Type::DestinationUnreachable
                | IcmpV6Type::PacketTooBig
                | IcmpV6Type::TimeExceeded
                | IcmpV6Type::ParameterProblem => Box::new(IcmpInvoking::from_bytes_in(body, cx)?),
                IcmpV6Type::RouterSolicitation => {
                    Box::new(NdpRouterSolicit::from_bytes_in(body, cx)?)
                }
                IcmpV6Type::RouterAdvertisement => {
                    Box::new(NdpRouterAdvert::from_bytes_in(body, cx)?)
                }
                IcmpV6Type::NeighborSolicitation => {
                    Box::new(NdpNeighborSolicit::from_bytes_in(body, cx)?)
                }
                IcmpV6Type::NeighborAdvertisement => {
                    Box::new(NdpNeighborAdvert::from_bytes_in(body, cx)?)
                }
                _ => Box::new(Raw::from(body)),
            })
        };

        Ok(IcmpV6 {
            icmp_type,
            code,
            chksum,
            payload,
        })
    }
}

impl LayerObject for IcmpV6 {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "IcmpV6"
    }

    #[inline]
    fn len(&self) -> usize {
        4 + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        4
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.icmp_type.value());
        bytes.push(self.code);
        bytes.extend(self.chksum.to_be_bytes());
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(IcmpV6);

/// Staging object for [`IcmpV6`] messages.
#[derive(Clone, Debug)]
pub struct IcmpV6Builder {
    icmp_type: IcmpV6Type,
    code: u8,
    chksum: u16,
    payload: Option<Box<dyn LayerObject>>,
    src_addr: Option<Ipv6Addr>,
    dst_addr: Option<Ipv6Addr>,
    correct_chksum: bool,
}

impl IcmpV6Builder {
    pub fn new() -> Self {
        IcmpV6Builder {
            icmp_type: IcmpV6Type::EchoRequest,
            code: 0,
            chksum: 0,
            payload: None,
            src_addr: None,
            dst_addr: None,
            correct_chksum: false,
        }
    }

    #[inline]
    pub fn icmp_type(mut self, icmp_type: IcmpV6Type) -> Self {
        self.icmp_type = icmp_type;
        self
    }

    #[inline]
    pub fn code(mut self, code: u8) -> Self {
        self.code = code;
        self
    }

    #[inline]
    pub fn chksum(mut self, chksum: u16) -> Self {
        self.chksum = chksum;
        self
    }

    /// The message body (e.g. an [`IcmpEcho`] or NDP message).
    #[inline]
    pub fn body(mut self, body: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(body));
        self
    }

    /// The enclosing IPv6 addresses; required by
    /// [`correct_chksum`](Self::correct_chksum) since the v6 checksum
    /// always covers the pseudo-header.
    #[inline]
    pub fn addrs(mut self, src: Ipv6Addr, dst: Ipv6Addr) -> Self {
        self.src_addr = Some(src);
        self.dst_addr = Some(dst);
        self
    }

    #[inline]
    pub fn correct_chksum(mut self, correct: bool) -> Self {
        self.correct_chksum = correct;
        self
    }
}

impl Default for IcmpV6Builder {
    #[inline]
    fn default() -> Self {
        IcmpV6Builder::new()
    }
}

fn body_ndp_options(body: &dyn LayerObject) -> &[NdpOption] {
    let any = body.as_any();
    if let Some(solicit) = any.downcast_ref::<NdpNeighborSolicit>() {
        solicit.options()
    } else if let Some(advert) = any.downcast_ref::<NdpNeighborAdvert>() {
        advert.options()
    } else if let Some(advert) = any.downcast_ref::<NdpRouterAdvert>() {
        advert.options()
    } else if let Some(solicit) = any.downcast_ref::<NdpRouterSolicit>() {
        solicit.options()
    } else {
        &[]
    }
}

impl Build for IcmpV6Builder {
    type Packet = IcmpV6;

    fn build(self) -> Result<IcmpV6, BuildError> {
        if let Some(body) = self.payload.as_ref() {
            for option in body_ndp_options(body.as_ref()) {
                if option.byte_len() % 8 != 0 || option.byte_len() / 8 > u8::MAX as usize {
                    return Err(BuildError::out_of_range(
                        "IcmpV6",
                        "options",
                        "NDP options are length-prefixed in 8-octet units",
                    ));
                }
            }
        }

        let mut icmp = IcmpV6 {
            icmp_type: self.icmp_type,
            code: self.code,
            chksum: self.chksum,
            payload: self.payload,
        };
        if self.correct_chksum {
            let (src, dst) = match (self.src_addr, self.dst_addr) {
                (Some(src), Some(dst)) => (src, dst),
                _ => {
                    return Err(BuildError::missing_context(
                        "IcmpV6",
                        "addrs",
                        "checksum correction requires the enclosing IPv6 addresses",
                    ))
                }
            };
            icmp.chksum = icmp.compute_chksum(src, dst);
        }
        Ok(icmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_request_round_trips_with_valid_checksum() {
        let icmp = IcmpV4::builder()
            .icmp_type(IcmpV4Type::Echo)
            .body(IcmpEcho::new(0x1234, 1, b"ping".to_vec()))
            .correct_chksum(true)
            .build()
            .unwrap();

        assert!(icmp.has_valid_chksum());
        let bytes = icmp.to_bytes();
        let decoded = IcmpV4::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, icmp);

        let echo: &IcmpEcho = decoded.get_layer().unwrap();
        assert_eq!(echo.identifier(), 0x1234);
        assert_eq!(echo.seq(), 1);
    }

    #[test]
    fn corrupted_checksum_is_detected() {
        let mut icmp = IcmpV4::builder()
            .icmp_type(IcmpV4Type::Echo)
            .body(IcmpEcho::new(1, 1, Vec::new()))
            .correct_chksum(true)
            .build()
            .unwrap();
        icmp.chksum ^= 0x0001;
        assert!(!icmp.has_valid_chksum());
    }

    #[test]
    fn destination_unreachable_keeps_invoking_packet() {
        let invoking = vec![0x45, 0x00, 0x00, 0x1C, 1, 2, 3, 4];
        let icmp = IcmpV4::builder()
            .icmp_type(IcmpV4Type::DestinationUnreachable)
            .code(3)
            .body(IcmpInvoking::new(0, invoking.clone()))
            .correct_chksum(true)
            .build()
            .unwrap();

        let decoded = IcmpV4::from_bytes(&icmp.to_bytes()).unwrap();
        let body: &IcmpInvoking = decoded.get_layer().unwrap();
        assert_eq!(body.invoking_packet(), Some(invoking.as_slice()));
    }

    #[test]
    fn neighbor_solicit_walks_ndp_options() {
        let target = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
        let body = NdpNeighborSolicit::new(
            target,
            vec![NdpOption::SourceLinkLayerAddress(vec![1, 2, 3, 4, 5, 6])],
        );
        let src = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
        let dst = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 1, 0xff00, 1);

        let icmp = IcmpV6::builder()
            .icmp_type(IcmpV6Type::NeighborSolicitation)
            .body(body)
            .addrs(src, dst)
            .correct_chksum(true)
            .build()
            .unwrap();

        assert!(icmp.has_valid_chksum(src, dst, false));
        let decoded = IcmpV6::from_bytes(&icmp.to_bytes()).unwrap();
        assert_eq!(decoded, icmp);

        let solicit: &NdpNeighborSolicit = decoded.get_layer().unwrap();
        assert_eq!(solicit.target(), target);
        assert_eq!(
            solicit.options(),
            &[NdpOption::SourceLinkLayerAddress(vec![1, 2, 3, 4, 5, 6])]
        );
    }

    #[test]
    fn unknown_icmpv6_type_preserves_body() {
        let bytes = [200, 0, 0xAB, 0xCD, 9, 9, 9, 9];
        let icmp = IcmpV6::from_bytes(&bytes).unwrap();
        assert_eq!(icmp.icmp_type(), IcmpV6Type::Other(200));
        assert_eq!(icmp.payload().unwrap().layer_name(), "Raw");
        assert_eq!(icmp.to_bytes(), bytes.to_vec());
    }

    #[test]
    fn truncated_ndp_option_is_malformed() {
        // neighbor solicitation whose option claims 2 units (16 bytes)
        // with only 8 present
        let mut bytes = vec![135, 0, 0, 0, 0, 0, 0, 0];
        bytes.extend([0u8; 16]); // target
        bytes.extend([1, 2, 0, 0, 0, 0, 0, 0]); // option type 1, len 2
        assert!(IcmpV6::from_bytes(&bytes).is_err());
    }
}
