// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The User Datagram Protocol.

use std::net::IpAddr;

use pdus_common::Reader;

use crate::dispatch::{self, DecodeCx, Registry};
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::IpProto;
use crate::utils;

pub(crate) fn decode_udp(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Udp::from_bytes_in(bytes, cx)?))
}

const UDP_HEADER_LEN: usize = 8;

/// The fixed 8-byte UDP header.
#[derive(Clone, Copy, Debug)]
pub struct UdpHeader {
    sport: u16,
    dport: u16,
    length: u16,
    chksum: u16,
}

impl UdpHeader {
    #[inline]
    pub fn sport(&self) -> u16 {
        self.sport
    }

    #[inline]
    pub fn dport(&self) -> u16 {
        self.dport
    }

    /// The length field as carried on the wire (header plus payload).
    #[inline]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// The checksum field; zero means "not computed" over IPv4.
    #[inline]
    pub fn chksum(&self) -> u16 {
        self.chksum
    }
}

impl Header for UdpHeader {
    #[inline]
    fn len(&self) -> usize {
        UDP_HEADER_LEN
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.sport.to_be_bytes());
        bytes.extend(self.dport.to_be_bytes());
        bytes.extend(self.length.to_be_bytes());
        bytes.extend(self.chksum.to_be_bytes());
    }
}

/// A UDP datagram.
///
/// Like TCP, the pseudo-header checksum borrows the enclosing IP
/// addresses as build-time-only context. Payloads are selected by the
/// well-known-port registry (DNS on 53 and GTP on 2123/2152 by default;
/// further bindings via [`dispatch::register`](crate::dispatch::register)).
#[derive(Clone, Debug)]
pub struct Udp {
    header: UdpHeader,
    payload: Option<Box<dyn LayerObject>>,
}

impl Udp {
    #[inline]
    pub fn builder() -> UdpBuilder {
        UdpBuilder::new()
    }

    #[inline]
    pub fn header(&self) -> &UdpHeader {
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

    /// The checksum the datagram should carry given the enclosing
    /// address pair. A computed value of zero is returned as its
    /// all-ones alternate encoding, since a zero field means "not
    /// computed".
    pub fn compute_chksum(&self, src: IpAddr, dst: IpAddr) -> u16 {
        let mut bytes = self.to_bytes();
        bytes[6] = 0;
        bytes[7] = 0;
        let mut chksum =
            utils::pseudo_header_checksum(src, dst, IpProto::Udp.value(), bytes.len());
        chksum.add_bytes(&bytes);
        chksum.finish_nonzero()
    }

    /// Whether the checksum field matches a recomputation.
    ///
    /// A wire value of zero means the sender did not compute a checksum
    /// (legal over IPv4, illegal over IPv6); `acceptable_as_zero`
    /// controls whether that counts as valid.
    pub fn has_valid_chksum(&self, src: IpAddr, dst: IpAddr, acceptable_as_zero: bool) -> bool {
        if self.header.chksum == 0 {
            return acceptable_as_zero;
        }
        self.header.chksum == self.compute_chksum(src, dst)
    }

    pub fn to_builder(&self) -> UdpBuilder {
        UdpBuilder {
            sport: self.header.sport,
            dport: self.header.dport,
            length: self.header.length,
            chksum: self.header.chksum,
            payload: self.payload.clone(),
            src_addr: None,
            dst_addr: None,
            correct_length: false,
            correct_chksum: false,
        }
    }
}

impl FromBytes for Udp {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let sport = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Udp", e))?;
        let dport = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Udp", e))?;
        let length = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Udp", e))?;
        let chksum = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Udp", e))?;

        if (length as usize) < UDP_HEADER_LEN {
            return Err(DecodeError::invalid_size(
                "Udp",
                "length field below the 8-byte header minimum",
            ));
        }
        let payload_region = reader.take(length as usize - UDP_HEADER_LEN).map_err(|_| {
            DecodeError::invalid_size("Udp", "length field exceeds the available bytes")
        })?;

        let payload = if payload_region.is_empty() {
            None
        } else {
            Some(dispatch::dispatch_ports(
                Registry::UdpPort,
                dport,
                sport,
                payload_region,
                cx,
            ))
        };

        Ok(Udp {
            header: UdpHeader {
                sport,
                dport,
                length,
                chksum,
            },
            payload,
        })
    }
}

impl LayerObject for Udp {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Udp"
    }

    #[inline]
    fn len(&self) -> usize {
        UDP_HEADER_LEN + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        UDP_HEADER_LEN
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

impl_byte_eq!(Udp);

/// Staging object for [`Udp`] datagrams.
#[derive(Clone, Debug)]
pub struct UdpBuilder {
    sport: u16,
    dport: u16,
    length: u16,
    chksum: u16,
    payload: Option<Box<dyn LayerObject>>,
    src_addr: Option<IpAddr>,
    dst_addr: Option<IpAddr>,
    correct_length: bool,
    correct_chksum: bool,
}

impl UdpBuilder {
    pub fn new() -> Self {
        UdpBuilder {
            sport: 0,
            dport: 0,
            length: 0,
            chksum: 0,
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

    /// The literal length field; overwritten when
    /// [`correct_length`](Self::correct_length) is set.
    #[inline]
    pub fn length(mut self, length: u16) -> Self {
        self.length = length;
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

    #[inline]
    pub fn correct_length(mut self, correct: bool) -> Self {
        self.correct_length = correct;
        self
    }

    /// When set, `build()` recomputes the pseudo-header checksum after
    /// any length correction (which the checksum covers).
    #[inline]
    pub fn correct_chksum(mut self, correct: bool) -> Self {
        self.correct_chksum = correct;
        self
    }
}

impl Default for UdpBuilder {
    #[inline]
    fn default() -> Self {
        UdpBuilder::new()
    }
}

impl Build for UdpBuilder {
    type Packet = Udp;

    fn build(self) -> Result<Udp, BuildError> {
        let payload_len = self.payload.as_ref().map_or(0, |p| p.len());
        let length = if self.correct_length {
            u16::try_from(UDP_HEADER_LEN + payload_len).map_err(|_| {
                BuildError::too_long(
                    "Udp",
                    "payload",
                    "payload exceeds the 16-bit length field",
                )
            })?
        } else {
            self.length
        };

        let mut udp = Udp {
            header: UdpHeader {
                sport: self.sport,
                dport: self.dport,
                length,
                chksum: self.chksum,
            },
            payload: self.payload,
        };

        if self.correct_chksum {
            let (src, dst) = match (self.src_addr, self.dst_addr) {
                (Some(src), Some(dst)) => (src, dst),
                _ => {
                    return Err(BuildError::missing_context(
                        "Udp",
                        "addrs",
                        "checksum correction requires the enclosing IP addresses",
                    ))
                }
            };
            udp.header.chksum = udp.compute_chksum(src, dst);
        }

        Ok(udp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Raw;
    use std::net::Ipv4Addr;

    #[test]
    fn datagram_round_trips() {
        let bytes = [
            0x30, 0x39, // sport 12345
            0x30, 0x3A, // dport 12346
            0x00, 0x0C, // length 12
            0x00, 0x00, // checksum
            1, 2, 3, 4, // payload
        ];
        let udp = Udp::from_bytes(&bytes).unwrap();
        assert_eq!(udp.sport(), 12345);
        assert_eq!(udp.header().length(), 12);
        assert_eq!(udp.len(), 12);
        assert_eq!(udp.to_bytes(), bytes.to_vec());
    }

    #[test]
    fn length_overrun_is_malformed() {
        let bytes = [0x00, 0x35, 0x00, 0x35, 0x00, 0x20, 0x00, 0x00, 1, 2];
        assert!(Udp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn length_below_header_is_malformed() {
        let bytes = [0x00, 0x35, 0x00, 0x35, 0x00, 0x04, 0x00, 0x00];
        assert!(Udp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn corrected_checksum_verifies() {
        let src = IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1));
        let dst = IpAddr::V4(Ipv4Addr::new(172, 16, 0, 2));

        let udp = Udp::builder()
            .sport(1024)
            .dport(4096)
            .payload(Raw::from(vec![0x42; 5]))
            .addrs(src, dst)
            .correct_length(true)
            .correct_chksum(true)
            .build()
            .unwrap();

        assert_eq!(udp.header().length(), 13);
        assert_ne!(udp.header().chksum(), 0);
        assert!(udp.has_valid_chksum(src, dst, false));
        assert!(!udp.has_valid_chksum(dst, src, false));
    }

    #[test]
    fn zero_checksum_honours_tolerance_flag() {
        let src = IpAddr::V4(Ipv4Addr::new(172, 16, 0, 1));
        let dst = IpAddr::V4(Ipv4Addr::new(172, 16, 0, 2));

        let udp = Udp::builder().correct_length(true).build().unwrap();
        assert_eq!(udp.header().chksum(), 0);
        assert!(udp.has_valid_chksum(src, dst, true));
        assert!(!udp.has_valid_chksum(src, dst, false));
    }

    #[test]
    fn builder_is_idempotent() {
        let bytes = [0x12, 0x34, 0x43, 0x21, 0x00, 0x09, 0xAB, 0xCD, 0x7F];
        let udp = Udp::from_bytes(&bytes).unwrap();
        assert_eq!(udp.to_builder().build().unwrap(), udp);
    }
}
