// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Transmission Control Protocol and its option sequence.

use std::net::IpAddr;

use bitflags::bitflags;
use pdus_common::{padded_length, Reader};

use crate::dispatch::{self, DecodeCx, Registry};
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::{IpProto, TcpOptionKind};
use crate::tlv::{self, Step};
use crate::utils;

pub(crate) fn decode_tcp(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Tcp::from_bytes_in(bytes, cx)?))
}

bitflags! {
    /// The nine TCP control bits (NS through FIN).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TcpFlags: u16 {
        const NS  = 0b_1_0000_0000;
        const CWR = 0b_0_1000_0000;
        const ECE = 0b_0_0100_0000;
        const URG = 0b_0_0010_0000;
        const ACK = 0b_0_0001_0000;
        const PSH = 0b_0_0000_1000;
        const RST = 0b_0_0000_0100;
        const SYN = 0b_0_0000_0010;
        const FIN = 0b_0_0000_0001;
    }
}

const TCP_MIN_HEADER_LEN: usize = 20;
const TCP_MAX_OPTIONS_LEN: usize = 40;

/// A single TCP option.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TcpOption {
    /// End of option list; terminates the walk, remaining bytes pad.
    Eol,
    Nop,
    Mss(u16),
    WindowScale(u8),
    SackPermitted,
    Sack { blocks: Vec<(u32, u32)> },
    Timestamp { tsval: u32, tsecr: u32 },
    Unrecognized { kind: TcpOptionKind, data: Vec<u8> },
}

impl TcpOption {
    #[inline]
    pub fn kind(&self) -> TcpOptionKind {
        match self {
            TcpOption::Eol => TcpOptionKind::Eol,
            TcpOption::Nop => TcpOptionKind::Nop,
            TcpOption::Mss(_) => TcpOptionKind::Mss,
            TcpOption::WindowScale(_) => TcpOptionKind::WindowScale,
            TcpOption::SackPermitted => TcpOptionKind::SackPermitted,
            TcpOption::Sack { .. } => TcpOptionKind::Sack,
            TcpOption::Timestamp { .. } => TcpOptionKind::Timestamp,
            TcpOption::Unrecognized { kind, .. } => *kind,
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            TcpOption::Eol | TcpOption::Nop => 1,
            TcpOption::Mss(_) => 4,
            TcpOption::WindowScale(_) => 3,
            TcpOption::SackPermitted => 2,
            TcpOption::Sack { blocks } => 2 + 8 * blocks.len(),
            TcpOption::Timestamp { .. } => 10,
            TcpOption::Unrecognized { data, .. } => 2 + data.len(),
        }
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        match self {
            TcpOption::Eol => bytes.push(0),
            TcpOption::Nop => bytes.push(1),
            TcpOption::Mss(mss) => {
                bytes.extend([TcpOptionKind::Mss.value(), 4]);
                bytes.extend(mss.to_be_bytes());
            }
            TcpOption::WindowScale(shift) => {
                bytes.extend([TcpOptionKind::WindowScale.value(), 3, *shift]);
            }
            TcpOption::SackPermitted => {
                bytes.extend([TcpOptionKind::SackPermitted.value(), 2]);
            }
            TcpOption::Sack { blocks } => {
                bytes.extend([TcpOptionKind::Sack.value(), (2 + 8 * blocks.len()) as u8]);
                for (left, right) in blocks {
                    bytes.extend(left.to_be_bytes());
                    bytes.extend(right.to_be_bytes());
                }
            }
            TcpOption::Timestamp { tsval, tsecr } => {
                bytes.extend([TcpOptionKind::Timestamp.value(), 10]);
                bytes.extend(tsval.to_be_bytes());
                bytes.extend(tsecr.to_be_bytes());
            }
            TcpOption::Unrecognized { kind, data } => {
                bytes.push(kind.value());
                bytes.push((2 + data.len()) as u8);
                bytes.extend(data);
            }
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<TcpOption>, DecodeError> {
        let kind = TcpOptionKind::from(bytes[0]);
        match kind {
            TcpOptionKind::Eol => return Ok(Step::Terminator(TcpOption::Eol, 1)),
            TcpOptionKind::Nop => return Ok(Step::Element(TcpOption::Nop, 1)),
            _ => (),
        }

        let len = *bytes.get(1).ok_or_else(|| {
            DecodeError::insufficient("Tcp", "option truncated before length octet")
        })? as usize;
        if len < 2 {
            return Err(DecodeError::invalid_size(
                "Tcp",
                "option length below the two-octet minimum",
            ));
        }
        let data = bytes.get(2..len).ok_or_else(|| {
            DecodeError::invalid_size("Tcp", "option length exceeds the option region")
        })?;

        // A registered kind with an off-spec length is preserved verbatim
        // rather than rejected, so the packet still round-trips.
        let option = match kind {
            TcpOptionKind::Mss if len == 4 => {
                TcpOption::Mss(u16::from_be_bytes([data[0], data[1]]))
            }
            TcpOptionKind::WindowScale if len == 3 => TcpOption::WindowScale(data[0]),
            TcpOptionKind::SackPermitted if len == 2 => TcpOption::SackPermitted,
            TcpOptionKind::Sack if len >= 2 && (len - 2) % 8 == 0 => TcpOption::Sack {
                blocks: data
                    .chunks_exact(8)
                    .map(|c| {
                        (
                            u32::from_be_bytes([c[0], c[1], c[2], c[3]]),
                            u32::from_be_bytes([c[4], c[5], c[6], c[7]]),
                        )
                    })
                    .collect(),
            },
            TcpOptionKind::Timestamp if len == 10 => TcpOption::Timestamp {
                tsval: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
                tsecr: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            },
            _ => TcpOption::Unrecognized {
                kind,
                data: data.to_vec(),
            },
        };
        Ok(Step::Element(option, len))
    }
}

/// The fixed fields and options of a TCP header.
#[derive(Clone, Debug)]
pub struct TcpHeader {
    sport: u16,
    dport: u16,
    seq: u32,
    ack: u32,
    data_offset: u8,
    reserved: u8,
    flags: TcpFlags,
    window: u16,
    chksum: u16,
    urgent_ptr: u16,
    options: Vec<TcpOption>,
    options_pad: Vec<u8>,
}

impl TcpHeader {
    #[inline]
    pub fn sport(&self) -> u16 {
        self.sport
    }

    #[inline]
    pub fn dport(&self) -> u16 {
        self.dport
    }

    #[inline]
    pub fn seq(&self) -> u32 {
        self.seq
    }

    #[inline]
    pub fn ack(&self) -> u32 {
        self.ack
    }

    /// The data-offset field as carried on the wire, in 32-bit words.
    #[inline]
    pub fn data_offset(&self) -> u8 {
        self.data_offset
    }

    #[inline]
    pub fn flags(&self) -> TcpFlags {
        self.flags
    }

    #[inline]
    pub fn window(&self) -> u16 {
        self.window
    }

    #[inline]
    pub fn chksum(&self) -> u16 {
        self.chksum
    }

    #[inline]
    pub fn urgent_ptr(&self) -> u16 {
        self.urgent_ptr
    }

    #[inline]
    pub fn options(&self) -> &[TcpOption] {
        &self.options
    }

    /// Bytes following an end-of-option-list option, preserved verbatim.
    #[inline]
    pub fn options_pad(&self) -> &[u8] {
        &self.options_pad
    }

    fn options_byte_len(&self) -> usize {
        self.options.iter().map(TcpOption::byte_len).sum::<usize>() + self.options_pad.len()
    }
}

impl Header for TcpHeader {
    #[inline]
    fn len(&self) -> usize {
        TCP_MIN_HEADER_LEN + self.options_byte_len()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.sport.to_be_bytes());
        bytes.extend(self.dport.to_be_bytes());
        bytes.extend(self.seq.to_be_bytes());
        bytes.extend(self.ack.to_be_bytes());
        let offset_flags = ((self.data_offset as u16) << 12)
            | ((self.reserved as u16) << 9)
            | self.flags.bits();
        bytes.extend(offset_flags.to_be_bytes());
        bytes.extend(self.window.to_be_bytes());
        bytes.extend(self.chksum.to_be_bytes());
        bytes.extend(self.urgent_ptr.to_be_bytes());
        for option in &self.options {
            option.to_bytes_extended(bytes);
        }
        bytes.extend(&self.options_pad);
    }
}

/// A TCP segment.
///
/// The pseudo-header checksum needs the enclosing IP layer's addresses;
/// they are build-time-only context, never part of the segment's own
/// bytes, so both checksum verification and build-time correction take
/// the address pair as arguments.
#[derive(Clone, Debug)]
pub struct Tcp {
    header: TcpHeader,
    payload: Option<Box<dyn LayerObject>>,
}

impl Tcp {
    #[inline]
    pub fn builder() -> TcpBuilder {
        TcpBuilder::new()
    }

    #[inline]
    pub fn header(&self) -> &TcpHeader {
        &self.header
    }

    #[inline]
    pub fn sport(&self) -> u16 {
        self.header.sport
    }

    #[inline]
    pub fn dport(&self) -> u16 {
        self.header.dport
    }

    /// The checksum the segment should carry given the enclosing
    /// address pair.
    pub fn compute_chksum(&self, src: IpAddr, dst: IpAddr) -> u16 {
        let mut bytes = self.to_bytes();
        bytes[16] = 0;
        bytes[17] = 0;
        let mut chksum =
            utils::pseudo_header_checksum(src, dst, IpProto::Tcp.value(), bytes.len());
        chksum.add_bytes(&bytes);
        chksum.finish()
    }

    /// Whether the checksum field matches a recomputation over the
    /// pseudo-header, header and payload.
    ///
    /// A wire value of zero is structurally possible but never produced
    /// by a correct sender; `acceptable_as_zero` controls whether it is
    /// tolerated.
    pub fn has_valid_chksum(&self, src: IpAddr, dst: IpAddr, acceptable_as_zero: bool) -> bool {
        if self.header.chksum == 0 {
            return acceptable_as_zero;
        }
        self.header.chksum == self.compute_chksum(src, dst)
    }

    pub fn to_builder(&self) -> TcpBuilder {
        TcpBuilder {
            sport: self.header.sport,
            dport: self.header.dport,
            seq: self.header.seq,
            ack: self.header.ack,
            data_offset: self.header.data_offset,
            reserved: self.header.reserved,
            flags: self.header.flags,
            window: self.header.window,
            chksum: self.header.chksum,
            urgent_ptr: self.header.urgent_ptr,
            options: self.header.options.clone(),
            options_pad: self.header.options_pad.clone(),
            payload: self.payload.clone(),
            src_addr: None,
            dst_addr: None,
            correct_length: false,
            correct_chksum: false,
        }
    }
}

impl FromBytes for Tcp {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let sport = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;
        let dport = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;
        let seq = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;
        let ack = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;
        let offset_flags = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;
        let window = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;
        let chksum = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;
        let urgent_ptr = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tcp", e))?;

        let data_offset = (offset_flags >> 12) as u8;
        if data_offset < 5 {
            return Err(DecodeError::invalid_value(
                "Tcp",
                "data offset field below the 20-byte minimum",
            ));
        }

        let options_region = reader
            .take(data_offset as usize * 4 - TCP_MIN_HEADER_LEN)
            .map_err(|_| {
                DecodeError::invalid_size(
                    "Tcp",
                    "data offset field exceeds the available bytes",
                )
            })?;
        let (options, options_pad) = tlv::walk(options_region, "Tcp", TcpOption::read_one)?;

        let payload_region = reader.take_rest();
        let payload = if payload_region.is_empty() {
            None
        } else {
            Some(dispatch::dispatch_ports(
                Registry::TcpPort,
                dport,
                sport,
                payload_region,
                cx,
            ))
        };

        Ok(Tcp {
            header: TcpHeader {
                sport,
                dport,
                seq,
                ack,
                data_offset,
                reserved: ((offset_flags >> 9) & 0x7) as u8,
                flags: TcpFlags::from_bits_truncate(offset_flags & 0x1FF),
                window,
                chksum,
                urgent_ptr,
                options,
                options_pad: options_pad.to_vec(),
            },
            payload,
        })
    }
}

impl LayerObject for Tcp {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Tcp"
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

impl_byte_eq!(Tcp);

/// Staging object for [`Tcp`] segments.
#[derive(Clone, Debug)]
pub struct TcpBuilder {
    sport: u16,
    dport: u16,
    seq: u32,
    ack: u32,
    data_offset: u8,
    reserved: u8,
    flags: TcpFlags,
    window: u16,
    chksum: u16,
    urgent_ptr: u16,
    options: Vec<TcpOption>,
    options_pad: Vec<u8>,
    payload: Option<Box<dyn LayerObject>>,
    src_addr: Option<IpAddr>,
    dst_addr: Option<IpAddr>,
    correct_length: bool,
    correct_chksum: bool,
}

impl TcpBuilder {
    pub fn new() -> Self {
        TcpBuilder {
            sport: 0,
            dport: 0,
            seq: 0,
            ack: 0,
            data_offset: 5,
            reserved: 0,
            flags: TcpFlags::empty(),
            window: 0,
            chksum: 0,
            urgent_ptr: 0,
            options: Vec::new(),
            options_pad: Vec::new(),
            payload: None,
            src_addr: None,
            dst_addr: None,
            correct_length: false,
            correct_chksum: false,
        }
    }

    #[inline]
    pub fn sport(mut self, sport: u16) -> Self {
        self.sport = sport;
        self
    }

    #[inline]
    pub fn dport(mut self, dport: u16) -> Self {
        self.dport = dport;
        self
    }

    #[inline]
    pub fn seq(mut self, seq: u32) -> Self {
        self.seq = seq;
        self
    }

    #[inline]
    pub fn ack(mut self, ack: u32) -> Self {
        self.ack = ack;
        self
    }

    /// The literal data-offset field; overwritten when
    /// [`correct_length`](Self::correct_length) is set.
    #[inline]
    pub fn data_offset(mut self, data_offset: u8) -> Self {
        self.data_offset = data_offset;
        self
    }

    #[inline]
    pub fn flags(mut self, flags: TcpFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    #[inline]
    pub fn chksum(mut self, chksum: u16) -> Self {
        self.chksum = chksum;
        self
    }

    #[inline]
    pub fn urgent_ptr(mut self, urgent_ptr: u16) -> Self {
        self.urgent_ptr = urgent_ptr;
        self
    }

    #[inline]
    pub fn option(mut self, option: TcpOption) -> Self {
        self.options.push(option);
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    /// The enclosing IP addresses, needed only when
    /// [`correct_chksum`](Self::correct_chksum) is set.
    #[inline]
    pub fn addrs(mut self, src: IpAddr, dst: IpAddr) -> Self {
        self.src_addr = Some(src);
        self.dst_addr = Some(dst);
        self
    }

    /// When set, `build()` pads the option region to a 32-bit boundary
    /// and recomputes the data-offset field.
    #[inline]
    pub fn correct_length(mut self, correct: bool) -> Self {
        self.correct_length = correct;
        self
    }

    /// When set, `build()` recomputes the pseudo-header checksum; the
    /// address pair must have been supplied via [`addrs`](Self::addrs).
    #[inline]
    pub fn correct_chksum(mut self, correct: bool) -> Self {
        self.correct_chksum = correct;
        self
    }
}

impl Default for TcpBuilder {
    #[inline]
    fn default() -> Self {
        TcpBuilder::new()
    }
}

impl Build for TcpBuilder {
    type Packet = Tcp;

    fn build(self) -> Result<Tcp, BuildError> {
        if self.reserved > 0x7 {
            return Err(BuildError::out_of_range(
                "Tcp",
                "reserved",
                "reserved is a 3-bit field",
            ));
        }

        let mut options_pad = self.options_pad;
        let raw_options_len: usize = self.options.iter().map(TcpOption::byte_len).sum();
        if self.correct_length {
            options_pad = vec![0; padded_length::<4>(raw_options_len) - raw_options_len];
        }

        let options_len = raw_options_len + options_pad.len();
        if options_len > TCP_MAX_OPTIONS_LEN {
            return Err(BuildError::too_long(
                "Tcp",
                "options",
                "options exceed the 40-byte maximum",
            ));
        }

        let header_len = TCP_MIN_HEADER_LEN + options_len;
        let data_offset = if self.correct_length {
            if header_len % 4 != 0 {
                return Err(BuildError::out_of_range(
                    "Tcp",
                    "options",
                    "options region must end on a 32-bit boundary",
                ));
            }
            (header_len / 4) as u8
        } else {
            if self.data_offset > 0xF {
                return Err(BuildError::out_of_range(
                    "Tcp",
                    "data_offset",
                    "data offset is a 4-bit field",
                ));
            }
            self.data_offset
        };

        let mut tcp = Tcp {
            header: TcpHeader {
                sport: self.sport,
                dport: self.dport,
                seq: self.seq,
                ack: self.ack,
                data_offset,
                reserved: self.reserved,
                flags: self.flags,
                window: self.window,
                chksum: self.chksum,
                urgent_ptr: self.urgent_ptr,
                options: self.options,
                options_pad,
            },
            payload: self.payload,
        };

        if self.correct_chksum {
            let (src, dst) = match (self.src_addr, self.dst_addr) {
                (Some(src), Some(dst)) => (src, dst),
                _ => {
                    return Err(BuildError::missing_context(
                        "Tcp",
                        "addrs",
                        "checksum correction requires the enclosing IP addresses",
                    ))
                }
            };
            tcp.header.chksum = tcp.compute_chksum(src, dst);
        }

        Ok(tcp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn syn_segment() -> Vec<u8> {
        vec![
            0xC0, 0x00, // sport 49152
            0x00, 0x50, // dport 80
            0x00, 0x00, 0x00, 0x64, // seq
            0x00, 0x00, 0x00, 0x00, // ack
            0x70, 0x02, // data offset 7, SYN
            0xFF, 0xFF, // window
            0x00, 0x00, // checksum
            0x00, 0x00, // urgent
            0x02, 0x04, 0x05, 0xB4, // MSS 1460
            0x04, 0x02, // SACK permitted
            0x01, // NOP
            0x00, // EOL terminates the walk
        ]
    }

    #[test]
    fn options_decode_and_round_trip() {
        let bytes = syn_segment();
        let tcp = Tcp::from_bytes(&bytes).unwrap();
        assert_eq!(tcp.sport(), 49152);
        assert!(tcp.header().flags().contains(TcpFlags::SYN));
        assert_eq!(
            tcp.header().options(),
            &[
                TcpOption::Mss(1460),
                TcpOption::SackPermitted,
                TcpOption::Nop,
                TcpOption::Eol,
            ]
        );
        assert_eq!(tcp.to_bytes(), bytes);
    }

    #[test]
    fn eol_preserves_trailing_pad() {
        let mut bytes = syn_segment();
        // rewrite the NOP as EOL so a pad byte follows the terminator
        bytes[26] = 0x00;
        let tcp = Tcp::from_bytes(&bytes).unwrap();
        assert_eq!(tcp.header().options_pad(), &[0x00]);
        assert_eq!(tcp.to_bytes(), bytes);
    }

    #[test]
    fn truncated_options_region_is_malformed() {
        let mut bytes = syn_segment();
        bytes.truncate(24); // data offset still claims 28 header bytes
        assert!(Tcp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn overrunning_option_is_malformed() {
        let mut bytes = syn_segment();
        bytes[21] = 40; // MSS option now claims 40 bytes in an 8-byte region
        assert!(Tcp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn checksum_correction_and_verification() {
        let src = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
        let dst = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2));

        let tcp = Tcp::builder()
            .sport(4433)
            .dport(443)
            .seq(7)
            .flags(TcpFlags::SYN | TcpFlags::ECE)
            .window(1024)
            .option(TcpOption::Mss(1400))
            .addrs(src, dst)
            .correct_length(true)
            .correct_chksum(true)
            .build()
            .unwrap();

        assert_eq!(tcp.header().data_offset(), 6);
        assert_ne!(tcp.header().chksum(), 0);
        assert!(tcp.has_valid_chksum(src, dst, false));

        // Any other address pair must fail verification.
        let other = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert!(!tcp.has_valid_chksum(other, dst, false));
    }

    #[test]
    fn builder_without_addrs_cannot_correct_checksum() {
        let err = Tcp::builder().correct_chksum(true).build().unwrap_err();
        assert_eq!(err.field, "addrs");
    }

    #[test]
    fn data_offset_is_a_4_bit_field() {
        assert!(Tcp::builder().data_offset(15).build().is_ok());
        assert!(Tcp::builder().data_offset(16).build().is_err());
    }

    #[test]
    fn builder_is_idempotent() {
        let bytes = syn_segment();
        let tcp = Tcp::from_bytes(&bytes).unwrap();
        assert_eq!(tcp.to_builder().build().unwrap(), tcp);
    }
}
