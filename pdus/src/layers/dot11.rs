// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! 802.11 management frames and their information elements.
//!
//! Only management frames get a structured decode; control and data
//! frames degrade to `Raw` through the dispatcher, preserving their
//! bytes. The multi-octet header fields (duration, sequence control,
//! beacon fixed fields) are little-endian per the 802.11 wire format.

use bitflags::bitflags;
use macaddr::MacAddr6;
use pdus_common::Reader;

use crate::dispatch::DecodeCx;
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::layers::Raw;
use crate::nums::{Dot11ElementId, Dot11MgmtSubtype};
use crate::tlv::{self, Step};

pub(crate) fn decode_dot11(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Dot11Mgmt::from_bytes_in(bytes, cx)?))
}

const DOT11_MGMT_HEADER_LEN: usize = 24;
const FRAME_TYPE_MGMT: u8 = 0;

bitflags! {
    /// The flag octet of the 802.11 frame-control field.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Dot11FcFlags: u8 {
        const TO_DS      = 0b0000_0001;
        const FROM_DS    = 0b0000_0010;
        const MORE_FRAG  = 0b0000_0100;
        const RETRY      = 0b0000_1000;
        const PWR_MGT    = 0b0001_0000;
        const MORE_DATA  = 0b0010_0000;
        const PROTECTED  = 0b0100_0000;
        const ORDER      = 0b1000_0000;
    }
}

/// The 16-bit 802.11 frame-control field, unpacked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dot11FrameControl {
    version: u8,
    frame_type: u8,
    subtype: u8,
    flags: Dot11FcFlags,
}

impl Dot11FrameControl {
    /// A management frame control field for the given subtype.
    pub fn mgmt(subtype: Dot11MgmtSubtype) -> Self {
        Dot11FrameControl {
            version: 0,
            frame_type: FRAME_TYPE_MGMT,
            subtype: subtype.value(),
            flags: Dot11FcFlags::empty(),
        }
    }

    /// Protocol version (2 bits).
    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Frame type (2 bits): 0 management, 1 control, 2 data.
    #[inline]
    pub fn frame_type(&self) -> u8 {
        self.frame_type
    }

    /// Frame subtype (4 bits).
    #[inline]
    pub fn subtype(&self) -> u8 {
        self.subtype
    }

    #[inline]
    pub fn flags(&self) -> Dot11FcFlags {
        self.flags
    }

    fn from_wire(bytes: [u8; 2]) -> Self {
        Dot11FrameControl {
            version: bytes[0] & 0x3,
            frame_type: (bytes[0] >> 2) & 0x3,
            subtype: bytes[0] >> 4,
            flags: Dot11FcFlags::from_bits_truncate(bytes[1]),
        }
    }

    fn to_wire(self) -> [u8; 2] {
        [
            self.version | (self.frame_type << 2) | (self.subtype << 4),
            self.flags.bits(),
        ]
    }
}

/// A single 802.11 information element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Dot11Element {
    Ssid(Vec<u8>),
    SupportedRates(Vec<u8>),
    /// DS parameter set: the current channel.
    DsParameter(u8),
    Tim {
        dtim_count: u8,
        dtim_period: u8,
        bitmap_control: u8,
        bitmap: Vec<u8>,
    },
    Unrecognized {
        element_id: Dot11ElementId,
        data: Vec<u8>,
    },
}

impl Dot11Element {
    #[inline]
    pub fn element_id(&self) -> Dot11ElementId {
        match self {
            Dot11Element::Ssid(_) => Dot11ElementId::Ssid,
            Dot11Element::SupportedRates(_) => Dot11ElementId::SupportedRates,
            Dot11Element::DsParameter(_) => Dot11ElementId::DsParameter,
            Dot11Element::Tim { .. } => Dot11ElementId::Tim,
            Dot11Element::Unrecognized { element_id, .. } => *element_id,
        }
    }

    fn data_len(&self) -> usize {
        match self {
            Dot11Element::Ssid(ssid) => ssid.len(),
            Dot11Element::SupportedRates(rates) => rates.len(),
            Dot11Element::DsParameter(_) => 1,
            Dot11Element::Tim { bitmap, .. } => 3 + bitmap.len(),
            Dot11Element::Unrecognized { data, .. } => data.len(),
        }
    }

    pub fn byte_len(&self) -> usize {
        2 + self.data_len()
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.element_id().value());
        bytes.push(self.data_len() as u8);
        match self {
            Dot11Element::Ssid(ssid) => bytes.extend(ssid),
            Dot11Element::SupportedRates(rates) => bytes.extend(rates),
            Dot11Element::DsParameter(channel) => bytes.push(*channel),
            Dot11Element::Tim {
                dtim_count,
                dtim_period,
                bitmap_control,
                bitmap,
            } => {
                bytes.extend([*dtim_count, *dtim_period, *bitmap_control]);
                bytes.extend(bitmap);
            }
            Dot11Element::Unrecognized { data, .. } => bytes.extend(data),
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<Dot11Element>, DecodeError> {
        let element_id = Dot11ElementId::from(bytes[0]);
        let len = *bytes.get(1).ok_or_else(|| {
            DecodeError::insufficient("Dot11", "element truncated before length octet")
        })? as usize;
        let data = bytes.get(2..2 + len).ok_or_else(|| {
            DecodeError::invalid_size("Dot11", "element length exceeds the frame body")
        })?;

        let element = match element_id {
            Dot11ElementId::Ssid => Dot11Element::Ssid(data.to_vec()),
            Dot11ElementId::SupportedRates => Dot11Element::SupportedRates(data.to_vec()),
            Dot11ElementId::DsParameter if len == 1 => Dot11Element::DsParameter(data[0]),
            Dot11ElementId::Tim if len >= 3 => Dot11Element::Tim {
                dtim_count: data[0],
                dtim_period: data[1],
                bitmap_control: data[2],
                bitmap: data[3..].to_vec(),
            },
            _ => Dot11Element::Unrecognized {
                element_id,
                data: data.to_vec(),
            },
        };
        Ok(Step::Element(element, 2 + len))
    }
}

fn walk_elements(region: &[u8]) -> Result<Vec<Dot11Element>, DecodeError> {
    let (elements, _) = tlv::walk(region, "Dot11", Dot11Element::read_one)?;
    Ok(elements)
}

fn elements_byte_len(elements: &[Dot11Element]) -> usize {
    elements.iter().map(Dot11Element::byte_len).sum()
}

fn elements_to_bytes(elements: &[Dot11Element], bytes: &mut Vec<u8>) {
    for element in elements {
        element.to_bytes_extended(bytes);
    }
}

/// A beacon frame body: fixed fields plus information elements.
#[derive(Clone, Debug)]
pub struct Dot11Beacon {
    timestamp: u64,
    interval: u16,
    capabilities: u16,
    elements: Vec<Dot11Element>,
}

impl Dot11Beacon {
    pub fn new(timestamp: u64, interval: u16, capabilities: u16, elements: Vec<Dot11Element>) -> Self {
        Dot11Beacon {
            timestamp,
            interval,
            capabilities,
            elements,
        }
    }

    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    pub fn interval(&self) -> u16 {
        self.interval
    }

    #[inline]
    pub fn capabilities(&self) -> u16 {
        self.capabilities
    }

    #[inline]
    pub fn elements(&self) -> &[Dot11Element] {
        &self.elements
    }

    /// The SSID element's contents, when one is present.
    pub fn ssid(&self) -> Option<&[u8]> {
        self.elements.iter().find_map(|e| match e {
            Dot11Element::Ssid(ssid) => Some(ssid.as_slice()),
            _ => None,
        })
    }
}

impl FromBytes for Dot11Beacon {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let timestamp = reader
            .u64_le()
            .map_err(|e| DecodeError::from_bounds("Dot11", e))?;
        let interval = reader
            .u16_le()
            .map_err(|e| DecodeError::from_bounds("Dot11", e))?;
        let capabilities = reader
            .u16_le()
            .map_err(|e| DecodeError::from_bounds("Dot11", e))?;
        let elements = walk_elements(reader.take_rest())?;
        Ok(Dot11Beacon {
            timestamp,
            interval,
            capabilities,
            elements,
        })
    }
}

impl LayerObject for Dot11Beacon {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Dot11Beacon"
    }

    #[inline]
    fn len(&self) -> usize {
        12 + elements_byte_len(&self.elements)
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
        bytes.extend(self.timestamp.to_le_bytes());
        bytes.extend(self.interval.to_le_bytes());
        bytes.extend(self.capabilities.to_le_bytes());
        elements_to_bytes(&self.elements, bytes);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Dot11Beacon);

/// A probe-request body: information elements only.
#[derive(Clone, Debug)]
pub struct Dot11ProbeRequest {
    elements: Vec<Dot11Element>,
}

impl Dot11ProbeRequest {
    pub fn new(elements: Vec<Dot11Element>) -> Self {
        Dot11ProbeRequest { elements }
    }

    #[inline]
    pub fn elements(&self) -> &[Dot11Element] {
        &self.elements
    }
}

impl FromBytes for Dot11ProbeRequest {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        Ok(Dot11ProbeRequest {
            elements: walk_elements(bytes)?,
        })
    }
}

impl LayerObject for Dot11ProbeRequest {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Dot11ProbeRequest"
    }

    #[inline]
    fn len(&self) -> usize {
        elements_byte_len(&self.elements)
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
        elements_to_bytes(&self.elements, bytes);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Dot11ProbeRequest);

/// A probe-response body; same fixed-field layout as a beacon.
#[derive(Clone, Debug)]
pub struct Dot11ProbeResponse {
    inner: Dot11Beacon,
}

impl Dot11ProbeResponse {
    pub fn new(timestamp: u64, interval: u16, capabilities: u16, elements: Vec<Dot11Element>) -> Self {
        Dot11ProbeResponse {
            inner: Dot11Beacon::new(timestamp, interval, capabilities, elements),
        }
    }

    #[inline]
    pub fn elements(&self) -> &[Dot11Element] {
        self.inner.elements()
    }

    #[inline]
    pub fn ssid(&self) -> Option<&[u8]> {
        self.inner.ssid()
    }
}

impl FromBytes for Dot11ProbeResponse {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        Ok(Dot11ProbeResponse {
            inner: Dot11Beacon::from_bytes_in(bytes, cx)?,
        })
    }
}

impl LayerObject for Dot11ProbeResponse {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Dot11ProbeResponse"
    }

    #[inline]
    fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.inner.to_bytes_extended(bytes);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Dot11ProbeResponse);

/// An 802.11 management frame: fixed header plus a subtype-selected
/// body.
///
/// The frame check sequence is assumed stripped by the capture source
/// (Radiotap flags indicate when it is not; that case is out of scope).
#[derive(Clone, Debug)]
pub struct Dot11Mgmt {
    frame_control: Dot11FrameControl,
    duration: u16,
    addr1: MacAddr6,
    addr2: MacAddr6,
    addr3: MacAddr6,
    seq_control: u16,
    payload: Option<Box<dyn LayerObject>>,
}

impl Dot11Mgmt {
    #[inline]
    pub fn builder() -> Dot11MgmtBuilder {
        Dot11MgmtBuilder::new()
    }

    #[inline]
    pub fn frame_control(&self) -> Dot11FrameControl {
        self.frame_control
    }

    #[inline]
    pub fn subtype(&self) -> Dot11MgmtSubtype {
        Dot11MgmtSubtype::from(self.frame_control.subtype)
    }

    #[inline]
    pub fn duration(&self) -> u16 {
        self.duration
    }

    /// Receiver address.
    #[inline]
    pub fn addr1(&self) -> MacAddr6 {
        self.addr1
    }

    /// Transmitter address.
    #[inline]
    pub fn addr2(&self) -> MacAddr6 {
        self.addr2
    }

    /// BSSID (for management frames).
    #[inline]
    pub fn addr3(&self) -> MacAddr6 {
        self.addr3
    }

    /// Raw sequence-control field: fragment number in the low 4 bits,
    /// sequence number in the upper 12.
    #[inline]
    pub fn seq_control(&self) -> u16 {
        self.seq_control
    }

    #[inline]
    pub fn seq_number(&self) -> u16 {
        self.seq_control >> 4
    }

    pub fn to_builder(&self) -> Dot11MgmtBuilder {
        Dot11MgmtBuilder {
            frame_control: self.frame_control,
            duration: self.duration,
            addr1: self.addr1,
            addr2: self.addr2,
            addr3: self.addr3,
            seq_control: self.seq_control,
            payload: self.payload.clone(),
        }
    }
}

impl FromBytes for Dot11Mgmt {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let frame_control = Dot11FrameControl::from_wire(
            reader
                .array::<2>()
                .map_err(|e| DecodeError::from_bounds("Dot11", e))?,
        );
        if frame_control.frame_type != FRAME_TYPE_MGMT {
            return Err(DecodeError::invalid_value(
                "Dot11",
                "only management frames have a structured decode",
            ));
        }

        let duration = reader
            .u16_le()
            .map_err(|e| DecodeError::from_bounds("Dot11", e))?;
        let addr1 = MacAddr6::from(
            reader
                .array::<6>()
                .map_err(|e| DecodeError::from_bounds("Dot11", e))?,
        );
        let addr2 = MacAddr6::from(
            reader
                .array::<6>()
                .map_err(|e| DecodeError::from_bounds("Dot11", e))?,
        );
        let addr3 = MacAddr6::from(
            reader
                .array::<6>()
                .map_err(|e| DecodeError::from_bounds("Dot11", e))?,
        );
        let seq_control = reader
            .u16_le()
            .map_err(|e| DecodeError::from_bounds("Dot11", e))?;

        let body = reader.take_rest();
        let payload: Option<Box<dyn LayerObject>> = if body.is_empty() {
            None
        } else {
            Some(match Dot11MgmtSubtype::from(frame_control.subtype) {
                Dot11MgmtSubtype::Beacon => Box::new(Dot11Beacon::from_bytes_in(body, cx)?),
                Dot11MgmtSubtype::ProbeRequest => {
                    Box::new(Dot11ProbeRequest::from_bytes_in(body, cx)?)
                }
                Dot11MgmtSubtype::ProbeResponse => {
                    Box::new(Dot11ProbeResponse::from_bytes_in(body, cx)?)
                }
                _ => Box::new(Raw::from(body)),
            })
        };

        Ok(Dot11Mgmt {
            frame_control,
            duration,
            addr1,
            addr2,
            addr3,
            seq_control,
            payload,
        })
    }
}

impl LayerObject for Dot11Mgmt {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Dot11Mgmt"
    }

    #[inline]
    fn len(&self) -> usize {
        DOT11_MGMT_HEADER_LEN + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        DOT11_MGMT_HEADER_LEN
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.frame_control.to_wire());
        bytes.extend(self.duration.to_le_bytes());
        bytes.extend(self.addr1.as_bytes());
        bytes.extend(self.addr2.as_bytes());
        bytes.extend(self.addr3.as_bytes());
        bytes.extend(self.seq_control.to_le_bytes());
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Dot11Mgmt);

/// Staging object for [`Dot11Mgmt`] frames.
#[derive(Clone, Debug)]
pub struct Dot11MgmtBuilder {
    frame_control: Dot11FrameControl,
    duration: u16,
    addr1: MacAddr6,
    addr2: MacAddr6,
    addr3: MacAddr6,
    seq_control: u16,
    payload: Option<Box<dyn LayerObject>>,
}

impl Dot11MgmtBuilder {
    pub fn new() -> Self {
        Dot11MgmtBuilder {
            frame_control: Dot11FrameControl::mgmt(Dot11MgmtSubtype::Beacon),
            duration: 0,
            addr1: MacAddr6::broadcast(),
            addr2: MacAddr6::nil(),
            addr3: MacAddr6::nil(),
            seq_control: 0,
            payload: None,
        }
    }

    #[inline]
    pub fn subtype(mut self, subtype: Dot11MgmtSubtype) -> Self {
        self.frame_control.subtype = subtype.value();
        self
    }

    #[inline]
    pub fn fc_flags(mut self, flags: Dot11FcFlags) -> Self {
        self.frame_control.flags = flags;
        self
    }

    #[inline]
    pub fn duration(mut self, duration: u16) -> Self {
        self.duration = duration;
        self
    }

    #[inline]
    pub fn addr1(mut self, addr1: MacAddr6) -> Self {
        self.addr1 = addr1;
        self
    }

    #[inline]
    pub fn addr2(mut self, addr2: MacAddr6) -> Self {
        self.addr2 = addr2;
        self
    }

    #[inline]
    pub fn addr3(mut self, addr3: MacAddr6) -> Self {
        self.addr3 = addr3;
        self
    }

    #[inline]
    pub fn seq_control(mut self, seq_control: u16) -> Self {
        self.seq_control = seq_control;
        self
    }

    /// The frame body (e.g. a [`Dot11Beacon`]).
    #[inline]
    pub fn body(mut self, body: impl LayerObject + 'static) -> Self {
        self.payload = Some(Box::new(body));
        self
    }
}

impl Default for Dot11MgmtBuilder {
    #[inline]
    fn default() -> Self {
        Dot11MgmtBuilder::new()
    }
}

impl Build for Dot11MgmtBuilder {
    type Packet = Dot11Mgmt;

    fn build(self) -> Result<Dot11Mgmt, BuildError> {
        if self.frame_control.version > 0x3 {
            return Err(BuildError::out_of_range(
                "Dot11",
                "version",
                "protocol version is a 2-bit field",
            ));
        }
        if self.frame_control.subtype > 0xF {
            return Err(BuildError::out_of_range(
                "Dot11",
                "subtype",
                "subtype is a 4-bit field",
            ));
        }
        if let Some(payload) = self.payload.as_ref() {
            for element in body_elements(payload.as_ref()) {
                if element.data_len() > u8::MAX as usize {
                    return Err(BuildError::too_long(
                        "Dot11",
                        "elements",
                        "information element exceeds its 8-bit length",
                    ));
                }
            }
        }

        Ok(Dot11Mgmt {
            frame_control: self.frame_control,
            duration: self.duration,
            addr1: self.addr1,
            addr2: self.addr2,
            addr3: self.addr3,
            seq_control: self.seq_control,
            payload: self.payload,
        })
    }
}

fn body_elements(body: &dyn LayerObject) -> &[Dot11Element] {
    let any = body.as_any();
    if let Some(beacon) = any.downcast_ref::<Dot11Beacon>() {
        beacon.elements()
    } else if let Some(probe) = any.downcast_ref::<Dot11ProbeRequest>() {
        probe.elements()
    } else if let Some(probe) = any.downcast_ref::<Dot11ProbeResponse>() {
        probe.elements()
    } else {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beacon_frame() -> Dot11Mgmt {
        Dot11Mgmt::builder()
            .subtype(Dot11MgmtSubtype::Beacon)
            .addr2(MacAddr6::new(0xAA, 0xBB, 0xCC, 0x00, 0x00, 0x01))
            .addr3(MacAddr6::new(0xAA, 0xBB, 0xCC, 0x00, 0x00, 0x01))
            .seq_control(0x0560)
            .body(Dot11Beacon::new(
                0x0000_0012_3456_789A,
                100,
                0x0431,
                vec![
                    Dot11Element::Ssid(b"lab-net".to_vec()),
                    Dot11Element::SupportedRates(vec![0x82, 0x84, 0x8B, 0x96]),
                    Dot11Element::DsParameter(6),
                ],
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn beacon_round_trips() {
        let frame = beacon_frame();
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), frame.len());

        let decoded = Dot11Mgmt::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, frame);
        assert_eq!(decoded.subtype(), Dot11MgmtSubtype::Beacon);
        assert_eq!(decoded.seq_number(), 0x56);

        let beacon: &Dot11Beacon = decoded.get_layer().unwrap();
        assert_eq!(beacon.ssid(), Some(b"lab-net".as_slice()));
        assert_eq!(beacon.interval(), 100);
        assert_eq!(beacon.elements().len(), 3);
    }

    #[test]
    fn unrecognized_element_is_preserved() {
        let mut bytes = beacon_frame().to_bytes();
        bytes.extend([221, 3, 0x00, 0x11, 0x22]); // vendor-specific IE
        let decoded = Dot11Mgmt::from_bytes(&bytes).unwrap();
        let beacon: &Dot11Beacon = decoded.get_layer().unwrap();
        assert_eq!(
            beacon.elements().last().unwrap(),
            &Dot11Element::Unrecognized {
                element_id: Dot11ElementId::VendorSpecific,
                data: vec![0x00, 0x11, 0x22],
            }
        );
        assert_eq!(decoded.to_bytes(), bytes);
    }

    #[test]
    fn element_overrunning_body_is_malformed() {
        let mut bytes = beacon_frame().to_bytes();
        bytes.extend([0, 200]); // SSID claiming 200 bytes at the end
        assert!(Dot11Mgmt::from_bytes(&bytes).is_err());
    }

    #[test]
    fn non_management_frame_is_rejected() {
        // type bits = data (2)
        let bytes = [0x08, 0x00, 0, 0, 1, 2, 3, 4, 5, 6];
        assert!(Dot11Mgmt::from_bytes(&bytes).is_err());
    }

    #[test]
    fn builder_is_idempotent() {
        let frame = beacon_frame();
        assert_eq!(frame.to_builder().build().unwrap(), frame);
    }
}
