// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The GPRS Tunnelling Protocol, version 1 (GTP-U/GTP-C framing).
//!
//! The 8-byte mandatory header is followed by a 4-byte optional block
//! (sequence number, N-PDU number, next-extension type) present when
//! any of the E/S/PN flags is set, then a chain of 4-byte-unit
//! extension headers linked by next-extension types. A G-PDU carries a
//! complete tunnelled IP packet as its payload.

use pdus_common::Reader;

use crate::dispatch::{self, DecodeCx, Registry};
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::{GtpExtensionType, GtpMessageType, LinkType};

pub(crate) fn decode_gtp(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Gtp::from_bytes_in(bytes, cx)?))
}

const GTP_MANDATORY_HEADER_LEN: usize = 8;

/// The optional sequence/N-PDU/next-extension block, present as a unit
/// when any of the E/S/PN flags is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GtpOptFields {
    pub seq: u16,
    pub npdu: u8,
    pub next_ext: GtpExtensionType,
}

/// One extension header of the chain. The trailing next-extension
/// octet is derived from the following entry at serialization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GtpExtension {
    ext_type: GtpExtensionType,
    content: Vec<u8>,
}

impl GtpExtension {
    /// Content length must make the whole extension (length octet,
    /// content, next-type octet) a multiple of 4.
    pub fn new(ext_type: GtpExtensionType, content: Vec<u8>) -> Self {
        GtpExtension { ext_type, content }
    }

    #[inline]
    pub fn ext_type(&self) -> GtpExtensionType {
        self.ext_type
    }

    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Serialized length: length octet + content + next-type octet.
    #[inline]
    pub fn byte_len(&self) -> usize {
        2 + self.content.len()
    }
}

/// A GTPv1 message.
///
/// The E/S/PN flag bits are stored individually: any of them implies
/// the 4-byte optional block, but the bits themselves must survive a
/// round-trip unchanged.
#[derive(Clone, Debug)]
pub struct Gtp {
    version: u8,
    protocol_type: bool,
    reserved: bool,
    ext_flag: bool,
    seq_flag: bool,
    npdu_flag: bool,
    msg_type: GtpMessageType,
    length: u16,
    teid: u32,
    opt: Option<GtpOptFields>,
    extensions: Vec<GtpExtension>,
    payload: Option<Box<dyn LayerObject>>,
}

impl Gtp {
    #[inline]
    pub fn builder() -> GtpBuilder {
        GtpBuilder::new()
    }

    /// GTP version (3 bits); this codec models version 1.
    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The protocol-type bit: set for GTP, clear for GTP'.
    #[inline]
    pub fn protocol_type(&self) -> bool {
        self.protocol_type
    }

    #[inline]
    pub fn msg_type(&self) -> GtpMessageType {
        self.msg_type
    }

    /// The length field as carried on the wire: bytes following the
    /// mandatory 8-byte header.
    #[inline]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Tunnel endpoint identifier.
    #[inline]
    pub fn teid(&self) -> u32 {
        self.teid
    }

    #[inline]
    pub fn opt_fields(&self) -> Option<&GtpOptFields> {
        self.opt.as_ref()
    }

    #[inline]
    pub fn seq(&self) -> Option<u16> {
        self.opt.map(|o| o.seq)
    }

    #[inline]
    pub fn extensions(&self) -> &[GtpExtension] {
        &self.extensions
    }

    fn flags_octet(&self) -> u8 {
        (self.version << 5)
            | ((self.protocol_type as u8) << 4)
            | ((self.reserved as u8) << 3)
            | ((self.ext_flag as u8) << 2)
            | ((self.seq_flag as u8) << 1)
            | self.npdu_flag as u8
    }

    pub fn to_builder(&self) -> GtpBuilder {
        GtpBuilder {
            version: self.version,
            protocol_type: self.protocol_type,
            reserved: self.reserved,
            ext_flag: self.ext_flag,
            seq_flag: self.seq_flag,
            npdu_flag: self.npdu_flag,
            msg_type: self.msg_type,
            length: self.length,
            teid: self.teid,
            opt: self.opt,
            extensions: self.extensions.clone(),
            payload: self.payload.clone(),
            correct_length: false,
        }
    }
}

impl FromBytes for Gtp {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let flags = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Gtp", e))?;
        let version = flags >> 5;
        if version != 1 {
            return Err(DecodeError::invalid_value(
                "Gtp",
                "version field is not 1",
            ));
        }
        let msg_type = GtpMessageType::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Gtp", e))?,
        );
        let length = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Gtp", e))?;
        let teid = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Gtp", e))?;

        let mut body = reader.sub(length as usize).map_err(|_| {
            DecodeError::invalid_size("Gtp", "length field exceeds the available bytes")
        })?;

        let has_opt = flags & 0b0111 != 0;
        let ext_flag = flags & 0b0100 != 0;
        let opt = if has_opt {
            Some(GtpOptFields {
                seq: body
                    .u16()
                    .map_err(|e| DecodeError::from_bounds("Gtp", e))?,
                npdu: body
                    .u8()
                    .map_err(|e| DecodeError::from_bounds("Gtp", e))?,
                next_ext: GtpExtensionType::from(
                    body.u8().map_err(|e| DecodeError::from_bounds("Gtp", e))?,
                ),
            })
        } else {
            None
        };

        let mut extensions = Vec::new();
        if ext_flag {
            let mut next = opt.map(|o| o.next_ext).unwrap_or(GtpExtensionType::NoMore);
            while next != GtpExtensionType::NoMore {
                let ext_len = body
                    .u8()
                    .map_err(|e| DecodeError::from_bounds("Gtp", e))? as usize
                    * 4;
                if ext_len == 0 {
                    return Err(DecodeError::invalid_size(
                        "Gtp",
                        "extension header length of zero",
                    ));
                }
                let content = body.take(ext_len - 2).map_err(|_| {
                    DecodeError::invalid_size(
                        "Gtp",
                        "extension header exceeds the message length",
                    )
                })?;
                extensions.push(GtpExtension::new(next, content.to_vec()));
                next = GtpExtensionType::from(
                    body.u8().map_err(|e| DecodeError::from_bounds("Gtp", e))?,
                );
            }
        }

        let payload_region = body.take_rest();
        let payload = if payload_region.is_empty() {
            None
        } else if msg_type == GtpMessageType::GPdu {
            // A G-PDU tunnels a raw IP packet; the raw-IP link entry
            // selects v4/v6 by the leading nibble.
            Some(dispatch::dispatch(
                Registry::Link,
                LinkType::Raw.value() as u32,
                payload_region,
                cx,
            ))
        } else {
            Some(Box::new(crate::layers::Raw::from(payload_region)) as Box<dyn LayerObject>)
        };

        Ok(Gtp {
            version,
            protocol_type: flags & 0x10 != 0,
            reserved: flags & 0x08 != 0,
            ext_flag,
            seq_flag: flags & 0x02 != 0,
            npdu_flag: flags & 0x01 != 0,
            msg_type,
            length,
            teid,
            opt,
            extensions,
            payload,
        })
    }
}

impl LayerObject for Gtp {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Gtp"
    }

    fn len(&self) -> usize {
        self.header_len() + self.payload.as_ref().map_or(0, |p| p.len())
    }

    fn header_len(&self) -> usize {
        GTP_MANDATORY_HEADER_LEN
            + if self.opt.is_some() { 4 } else { 0 }
            + self
                .extensions
                .iter()
                .map(GtpExtension::byte_len)
                .sum::<usize>()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.flags_octet());
        bytes.push(self.msg_type.value());
        bytes.extend(self.length.to_be_bytes());
        bytes.extend(self.teid.to_be_bytes());
        if let Some(opt) = &self.opt {
            bytes.extend(opt.seq.to_be_bytes());
            bytes.push(opt.npdu);
            bytes.push(opt.next_ext.value());
        }
        for (i, ext) in self.extensions.iter().enumerate() {
            bytes.push((ext.byte_len() / 4) as u8);
            bytes.extend(&ext.content);
            bytes.push(
                self.extensions
                    .get(i + 1)
                    .map(|e| e.ext_type.value())
                    .unwrap_or(GtpExtensionType::NoMore.value()),
            );
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

impl_byte_eq!(Gtp);

/// Staging object for [`Gtp`] messages.
#[derive(Clone, Debug)]
pub struct GtpBuilder {
    version: u8,
    protocol_type: bool,
    reserved: bool,
    ext_flag: bool,
    seq_flag: bool,
    npdu_flag: bool,
    msg_type: GtpMessageType,
    length: u16,
    teid: u32,
    opt: Option<GtpOptFields>,
    extensions: Vec<GtpExtension>,
    payload: Option<Box<dyn LayerObject>>,
    correct_length: bool,
}

impl GtpBuilder {
    pub fn new() -> Self {
        GtpBuilder {
            version: 1,
            protocol_type: true,
            reserved: false,
            ext_flag: false,
            seq_flag: false,
            npdu_flag: false,
            msg_type: GtpMessageType::GPdu,
            length: 0,
            teid: 0,
            opt: None,
            extensions: Vec::new(),
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
    pub fn protocol_type(mut self, protocol_type: bool) -> Self {
        self.protocol_type = protocol_type;
        self
    }

    #[inline]
    pub fn msg_type(mut self, msg_type: GtpMessageType) -> Self {
        self.msg_type = msg_type;
        self
    }

    /// The literal length field; overwritten when
    /// [`correct_length`](Self::correct_length) is set.
    #[inline]
    pub fn length(mut self, length: u16) -> Self {
        self.length = length;
        self
    }

    #[inline]
    pub fn teid(mut self, teid: u32) -> Self {
        self.teid = teid;
        self
    }

    /// Sets the sequence number, raising the S flag and enabling the
    /// optional field block.
    #[inline]
    pub fn seq(mut self, seq: u16) -> Self {
        let mut opt = self.opt.unwrap_or(GtpOptFields {
            seq: 0,
            npdu: 0,
            next_ext: GtpExtensionType::NoMore,
        });
        opt.seq = seq;
        self.opt = Some(opt);
        self.seq_flag = true;
        self
    }

    #[inline]
    pub fn opt_fields(mut self, opt: GtpOptFields) -> Self {
        self.opt = Some(opt);
        self
    }

    /// Appends an extension header; implies the optional field block.
    #[inline]
    pub fn extension(mut self, extension: GtpExtension) -> Self {
        self.extensions.push(extension);
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

impl Default for GtpBuilder {
    #[inline]
    fn default() -> Self {
        GtpBuilder::new()
    }
}

impl Build for GtpBuilder {
    type Packet = Gtp;

    fn build(self) -> Result<Gtp, BuildError> {
        if self.version > 0x7 {
            return Err(BuildError::out_of_range(
                "Gtp",
                "version",
                "version is a 3-bit field",
            ));
        }
        for ext in &self.extensions {
            if ext.byte_len() % 4 != 0 {
                return Err(BuildError::out_of_range(
                    "Gtp",
                    "extensions",
                    "extension header must be a multiple of 4 octets",
                ));
            }
            if ext.byte_len() / 4 > u8::MAX as usize {
                return Err(BuildError::too_long(
                    "Gtp",
                    "extensions",
                    "extension header exceeds its 8-bit length",
                ));
            }
        }

        // The extension chain rides in the optional block, so staging
        // extensions raises the E flag, forces the block into existence
        // and points its next-extension octet at the first entry.
        let mut ext_flag = self.ext_flag;
        let mut opt = self.opt;
        if !self.extensions.is_empty() {
            ext_flag = true;
            let mut fields = opt.unwrap_or(GtpOptFields {
                seq: 0,
                npdu: 0,
                next_ext: GtpExtensionType::NoMore,
            });
            fields.next_ext = self.extensions[0].ext_type;
            opt = Some(fields);
        }
        if (ext_flag || self.seq_flag || self.npdu_flag) && opt.is_none() {
            opt = Some(GtpOptFields {
                seq: 0,
                npdu: 0,
                next_ext: GtpExtensionType::NoMore,
            });
        }
        if opt.is_some() && !(ext_flag || self.seq_flag || self.npdu_flag) {
            return Err(BuildError::out_of_range(
                "Gtp",
                "opt_fields",
                "the optional block requires one of the E/S/PN flags",
            ));
        }

        let mut gtp = Gtp {
            version: self.version,
            protocol_type: self.protocol_type,
            reserved: self.reserved,
            ext_flag,
            seq_flag: self.seq_flag,
            npdu_flag: self.npdu_flag,
            msg_type: self.msg_type,
            length: self.length,
            teid: self.teid,
            opt,
            extensions: self.extensions,
            payload: self.payload,
        };
        if self.correct_length {
            let body_len =
                gtp.len() - GTP_MANDATORY_HEADER_LEN;
            gtp.length = u16::try_from(body_len).map_err(|_| {
                BuildError::too_long(
                    "Gtp",
                    "payload",
                    "message exceeds the 16-bit length field",
                )
            })?;
        }
        Ok(gtp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::ip::Ipv4;
    use crate::layers::Raw;
    use crate::nums::IpProto;
    use std::net::Ipv4Addr;

    #[test]
    fn g_pdu_tunnels_an_ip_packet() {
        let inner = Ipv4::builder()
            .protocol(IpProto::Exp1)
            .src(Ipv4Addr::new(10, 1, 0, 1))
            .dst(Ipv4Addr::new(10, 1, 0, 2))
            .payload(Raw::from(vec![0xAB; 4]))
            .correct_length(true)
            .correct_chksum(true)
            .build()
            .unwrap();

        let gtp = Gtp::builder()
            .teid(0x0042_4242)
            .seq(7)
            .payload(inner)
            .correct_length(true)
            .build()
            .unwrap();

        let bytes = gtp.to_bytes();
        assert_eq!(bytes.len(), gtp.len());

        let decoded = Gtp::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, gtp);
        assert_eq!(decoded.seq(), Some(7));
        assert_eq!(decoded.teid(), 0x0042_4242);

        let tunnelled: &Ipv4 = decoded.get_layer().unwrap();
        assert_eq!(tunnelled.header().src(), Ipv4Addr::new(10, 1, 0, 1));
    }

    #[test]
    fn extension_chain_round_trips() {
        let gtp = Gtp::builder()
            .msg_type(GtpMessageType::GPdu)
            .extension(GtpExtension::new(
                GtpExtensionType::UdpPort,
                vec![0x1F, 0x90],
            ))
            .extension(GtpExtension::new(
                GtpExtensionType::PdcpPduNumber,
                vec![0x00, 0x05],
            ))
            .correct_length(true)
            .build()
            .unwrap();

        let bytes = gtp.to_bytes();
        let decoded = Gtp::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, gtp);
        assert_eq!(decoded.extensions().len(), 2);
        assert_eq!(decoded.extensions()[0].ext_type(), GtpExtensionType::UdpPort);
    }

    #[test]
    fn wrong_version_is_malformed() {
        let bytes = [0x50, 0xFF, 0x00, 0x00, 0, 0, 0, 0];
        assert!(Gtp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn length_overrun_is_malformed() {
        let bytes = [0x30, 0xFF, 0x00, 0x20, 0, 0, 0, 0, 1, 2];
        assert!(Gtp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn non_gpdu_payload_stays_raw() {
        let gtp = Gtp::builder()
            .msg_type(GtpMessageType::EchoRequest)
            .payload(Raw::from(vec![0, 0, 0, 0]))
            .correct_length(true)
            .build()
            .unwrap();
        let decoded = Gtp::from_bytes(&gtp.to_bytes()).unwrap();
        assert_eq!(decoded.payload().unwrap().layer_name(), "Raw");
    }
}
