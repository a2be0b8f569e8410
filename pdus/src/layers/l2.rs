// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Ethernet and associated link-layer protocols.

use macaddr::MacAddr6;
use pdus_common::Reader;

use crate::dispatch::{self, DecodeCx, Registry};
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::EtherType;

/// Ethernet frames shorter than this (without FCS) are padded on the
/// wire.
pub const ETHER_MIN_FRAME_LEN: usize = 60;

const ETHER_HEADER_LEN: usize = 14;

pub(crate) fn decode_ether(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Ether::from_bytes_in(bytes, cx)?))
}

pub(crate) fn decode_dot1q(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Dot1q::from_bytes_in(bytes, cx)?))
}

/// The fixed fields of an Ethernet II frame.
#[derive(Clone, Copy, Debug)]
pub struct EtherHeader {
    dst: MacAddr6,
    src: MacAddr6,
    eth_type: EtherType,
}

impl EtherHeader {
    /// The destination MAC address of the frame.
    #[inline]
    pub fn dst_mac(&self) -> MacAddr6 {
        self.dst
    }

    /// The source MAC address of the frame.
    #[inline]
    pub fn src_mac(&self) -> MacAddr6 {
        self.src
    }

    /// The EtherType selecting the structure of the frame's payload.
    #[inline]
    pub fn eth_type(&self) -> EtherType {
        self.eth_type
    }
}

impl Header for EtherHeader {
    #[inline]
    fn len(&self) -> usize {
        ETHER_HEADER_LEN
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.dst.as_bytes());
        bytes.extend(self.src.as_bytes());
        bytes.extend(self.eth_type.value().to_be_bytes());
    }
}

/// A basic Ethernet II frame.
///
/// Consists of destination and source MAC addresses, an EtherType and a
/// payload selected by that type. Trailing bytes beyond the payload's
/// self-declared length (the pad of a minimum-length frame) are kept as
/// padding so the frame re-serializes exactly. The frame check sequence
/// is assumed to have been stripped by the capture source.
#[derive(Clone, Debug)]
pub struct Ether {
    header: EtherHeader,
    payload: Option<Box<dyn LayerObject>>,
    padding: Vec<u8>,
}

impl Ether {
    #[inline]
    pub fn builder() -> EtherBuilder {
        EtherBuilder::new()
    }

    #[inline]
    pub fn header(&self) -> &EtherHeader {
        &self.header
    }

    /// A builder pre-populated with this frame's current field values;
    /// building it unmodified reproduces the frame.
    pub fn to_builder(&self) -> EtherBuilder {
        EtherBuilder {
            dst: self.header.dst,
            src: self.header.src,
            eth_type: self.header.eth_type,
            payload: self.payload.clone(),
            padding: self.padding.clone(),
            pad_to_minimum: false,
        }
    }
}

impl FromBytes for Ether {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let dst = MacAddr6::from(
            reader
                .array::<6>()
                .map_err(|e| DecodeError::from_bounds("Ether", e))?,
        );
        let src = MacAddr6::from(
            reader
                .array::<6>()
                .map_err(|e| DecodeError::from_bounds("Ether", e))?,
        );
        let eth_type = EtherType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Ether", e))?,
        );

        let rest = reader.take_rest();
        let (payload, padding) = if rest.is_empty() {
            (None, Vec::new())
        } else {
            let payload = dispatch::dispatch(Registry::Ether, eth_type.value() as u32, rest, cx);
            let padding = rest[payload.len()..].to_vec();
            (Some(payload), padding)
        };

        Ok(Ether {
            header: EtherHeader { dst, src, eth_type },
            payload,
            padding,
        })
    }
}

impl LayerObject for Ether {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Ether"
    }

    #[inline]
    fn len(&self) -> usize {
        ETHER_HEADER_LEN + self.payload.as_ref().map_or(0, |p| p.len()) + self.padding.len()
    }

    #[inline]
    fn header_len(&self) -> usize {
        ETHER_HEADER_LEN
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    #[inline]
    fn padding(&self) -> &[u8] {
        &self.padding
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.header.to_bytes_extended(bytes);
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
        bytes.extend(&self.padding);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Ether);

/// Staging object for [`Ether`] frames.
#[derive(Clone, Debug)]
pub struct EtherBuilder {
    dst: MacAddr6,
    src: MacAddr6,
    eth_type: EtherType,
    payload: Option<Box<dyn LayerObject>>,
    padding: Vec<u8>,
    pad_to_minimum: bool,
}

impl EtherBuilder {
    pub fn new() -> Self {
        EtherBuilder {
            dst: MacAddr6::nil(),
            src: MacAddr6::nil(),
            eth_type: EtherType::Experimental,
            payload: None,
            padding: Vec::new(),
            pad_to_minimum: false,
        }
    }

    #[inline]
    pub fn dst(mut self, dst: MacAddr6) -> Self {
        self.dst = dst;
        self
    }

    #[inline]
    pub fn src(mut self, src: MacAddr6) -> Self {
        self.src = src;
        self
    }

    #[inline]
    pub fn eth_type(mut self, eth_type: EtherType) -> Self {
        self.eth_type = eth_type;
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    /// Explicit trailing pad bytes; overridden by
    /// [`pad_to_minimum`](Self::pad_to_minimum) when that policy is set.
    #[inline]
    pub fn padding(mut self, padding: Vec<u8>) -> Self {
        self.padding = padding;
        self
    }

    /// When set, `build()` appends zero padding up to the 60-byte
    /// minimum Ethernet frame length.
    #[inline]
    pub fn pad_to_minimum(mut self, pad: bool) -> Self {
        self.pad_to_minimum = pad;
        self
    }
}

impl Default for EtherBuilder {
    #[inline]
    fn default() -> Self {
        EtherBuilder::new()
    }
}

impl Build for EtherBuilder {
    type Packet = Ether;

    fn build(self) -> Result<Ether, BuildError> {
        let mut padding = self.padding;
        if self.pad_to_minimum {
            let unpadded = ETHER_HEADER_LEN + self.payload.as_ref().map_or(0, |p| p.len());
            padding = vec![0; ETHER_MIN_FRAME_LEN.saturating_sub(unpadded)];
        }

        Ok(Ether {
            header: EtherHeader {
                dst: self.dst,
                src: self.src,
                eth_type: self.eth_type,
            },
            payload: self.payload,
            padding,
        })
    }
}

const DOT1Q_HEADER_LEN: usize = 4;

/// The tag control fields and inner EtherType of an 802.1Q VLAN tag.
#[derive(Clone, Copy, Debug)]
pub struct Dot1qHeader {
    pcp: u8,
    dei: bool,
    vid: u16,
    eth_type: EtherType,
}

impl Dot1qHeader {
    /// Priority code point (3 bits).
    #[inline]
    pub fn pcp(&self) -> u8 {
        self.pcp
    }

    /// Drop eligible indicator.
    #[inline]
    pub fn dei(&self) -> bool {
        self.dei
    }

    /// VLAN identifier (12 bits).
    #[inline]
    pub fn vid(&self) -> u16 {
        self.vid
    }

    /// The EtherType of the tagged payload.
    #[inline]
    pub fn eth_type(&self) -> EtherType {
        self.eth_type
    }

    #[inline]
    fn tci(&self) -> u16 {
        ((self.pcp as u16) << 13) | ((self.dei as u16) << 12) | self.vid
    }
}

impl Header for Dot1qHeader {
    #[inline]
    fn len(&self) -> usize {
        DOT1Q_HEADER_LEN
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.tci().to_be_bytes());
        bytes.extend(self.eth_type.value().to_be_bytes());
    }
}

/// An 802.1Q VLAN tag.
///
/// Sits between an Ethernet header and its payload; Q-in-Q (802.1ad)
/// stacking decodes as one `Dot1q` layer nested in another.
#[derive(Clone, Debug)]
pub struct Dot1q {
    header: Dot1qHeader,
    payload: Option<Box<dyn LayerObject>>,
    padding: Vec<u8>,
}

impl Dot1q {
    #[inline]
    pub fn builder() -> Dot1qBuilder {
        Dot1qBuilder::new()
    }

    #[inline]
    pub fn header(&self) -> &Dot1qHeader {
        &self.header
    }

    pub fn to_builder(&self) -> Dot1qBuilder {
        Dot1qBuilder {
            pcp: self.header.pcp,
            dei: self.header.dei,
            vid: self.header.vid,
            eth_type: self.header.eth_type,
            payload: self.payload.clone(),
            padding: self.padding.clone(),
        }
    }
}

impl FromBytes for Dot1q {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let tci = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Dot1q", e))?;
        let eth_type = EtherType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Dot1q", e))?,
        );

        let rest = reader.take_rest();
        let (payload, padding) = if rest.is_empty() {
            (None, Vec::new())
        } else {
            let payload = dispatch::dispatch(Registry::Ether, eth_type.value() as u32, rest, cx);
            let padding = rest[payload.len()..].to_vec();
            (Some(payload), padding)
        };

        Ok(Dot1q {
            header: Dot1qHeader {
                pcp: (tci >> 13) as u8,
                dei: tci & 0x1000 != 0,
                vid: tci & 0x0FFF,
                eth_type,
            },
            payload,
            padding,
        })
    }
}

impl LayerObject for Dot1q {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Dot1q"
    }

    #[inline]
    fn len(&self) -> usize {
        DOT1Q_HEADER_LEN + self.payload.as_ref().map_or(0, |p| p.len()) + self.padding.len()
    }

    #[inline]
    fn header_len(&self) -> usize {
        DOT1Q_HEADER_LEN
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    #[inline]
    fn padding(&self) -> &[u8] {
        &self.padding
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.header.to_bytes_extended(bytes);
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
        bytes.extend(&self.padding);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Dot1q);

/// Staging object for [`Dot1q`] tags.
#[derive(Clone, Debug, Default)]
pub struct Dot1qBuilder {
    pcp: u8,
    dei: bool,
    vid: u16,
    eth_type: EtherType,
    payload: Option<Box<dyn LayerObject>>,
    padding: Vec<u8>,
}

impl Dot1qBuilder {
    pub fn new() -> Self {
        Dot1qBuilder::default()
    }

    #[inline]
    pub fn pcp(mut self, pcp: u8) -> Self {
        self.pcp = pcp;
        self
    }

    #[inline]
    pub fn dei(mut self, dei: bool) -> Self {
        self.dei = dei;
        self
    }

    #[inline]
    pub fn vid(mut self, vid: u16) -> Self {
        self.vid = vid;
        self
    }

    #[inline]
    pub fn eth_type(mut self, eth_type: EtherType) -> Self {
        self.eth_type = eth_type;
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(payload));
        self
    }

    #[inline]
    pub fn padding(mut self, padding: Vec<u8>) -> Self {
        self.padding = padding;
        self
    }
}

impl Build for Dot1qBuilder {
    type Packet = Dot1q;

    fn build(self) -> Result<Dot1q, BuildError> {
        if self.pcp > 0x7 {
            return Err(BuildError::out_of_range(
                "Dot1q",
                "pcp",
                "priority code point is a 3-bit field",
            ));
        }
        if self.vid > 0x0FFF {
            return Err(BuildError::out_of_range(
                "Dot1q",
                "vid",
                "VLAN identifier is a 12-bit field",
            ));
        }

        Ok(Dot1q {
            header: Dot1qHeader {
                pcp: self.pcp,
                dei: self.dei,
                vid: self.vid,
                eth_type: self.eth_type,
            },
            payload: self.payload,
            padding: self.padding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Raw;

    #[test]
    fn ether_round_trips_unknown_payload() {
        let mut frame = vec![
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, // dst
            0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, // src
            0x88, 0xB5, // experimental EtherType
        ];
        frame.extend([0xDE, 0xAD, 0xBE, 0xEF]);

        let ether = Ether::from_bytes(&frame).unwrap();
        assert_eq!(ether.header().dst_mac(), MacAddr6::new(1, 2, 3, 4, 5, 6));
        assert_eq!(ether.header().eth_type(), EtherType::Experimental);
        assert_eq!(ether.len(), frame.len());
        assert_eq!(ether.to_bytes(), frame);

        let payload = ether.payload().unwrap();
        assert_eq!(payload.layer_name(), "Raw");
    }

    #[test]
    fn ether_too_short_for_header_is_malformed() {
        assert!(Ether::from_bytes(&[0u8; 13]).is_err());
    }

    #[test]
    fn pad_to_minimum_pads_and_round_trips() {
        let ether = Ether::builder()
            .dst(MacAddr6::broadcast())
            .src(MacAddr6::new(2, 2, 2, 2, 2, 2))
            .eth_type(EtherType::Experimental)
            .payload(Raw::from(vec![0x11; 10]))
            .pad_to_minimum(true)
            .build()
            .unwrap();

        assert_eq!(ether.len(), ETHER_MIN_FRAME_LEN);
        assert_eq!(ether.padding().len(), ETHER_MIN_FRAME_LEN - 14 - 10);

        let decoded = Ether::from_bytes(&ether.to_bytes()).unwrap();
        // The payload decodes as Raw and absorbs the pad, so compare bytes.
        assert_eq!(decoded.to_bytes(), ether.to_bytes());
    }

    #[test]
    fn builder_is_idempotent() {
        let ether = Ether::builder()
            .dst(MacAddr6::new(6, 5, 4, 3, 2, 1))
            .src(MacAddr6::new(1, 2, 3, 4, 5, 6))
            .eth_type(EtherType::Ipv4)
            .build()
            .unwrap();
        assert_eq!(ether.to_builder().build().unwrap(), ether);
    }

    #[test]
    fn dot1q_bit_fields_validate_range() {
        assert!(Dot1q::builder().pcp(7).vid(0x0FFF).build().is_ok());
        assert!(Dot1q::builder().pcp(8).build().is_err());
        assert!(Dot1q::builder().vid(0x1000).build().is_err());
    }

    #[test]
    fn dot1q_decodes_tci_fields() {
        // pcp=5, dei=1, vid=0x123, inner type experimental, no payload
        let bytes = [0xB1, 0x23, 0x88, 0xB5];
        let tag = Dot1q::from_bytes(&bytes).unwrap();
        assert_eq!(tag.header().pcp(), 5);
        assert!(tag.header().dei());
        assert_eq!(tag.header().vid(), 0x123);
        assert_eq!(tag.to_bytes(), bytes.to_vec());
    }
}
