// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Address Resolution Protocol.

use std::net::Ipv4Addr;

use macaddr::MacAddr6;
use pdus_common::Reader;

use crate::dispatch::DecodeCx;
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::{ArpHardwareType, ArpOperation, EtherType};

pub(crate) fn decode_arp(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Arp::from_bytes_in(bytes, cx)?))
}

/// An ARP message.
///
/// The hardware and protocol address fields are variable length, driven
/// by the `hln`/`pln` octets; typed accessors are provided for the
/// ubiquitous Ethernet/IPv4 case. ARP is a terminal layer — any trailing
/// bytes are frame padding accounted to the enclosing layer.
#[derive(Clone, Debug)]
pub struct Arp {
    header: ArpHeader,
}

/// All fields of an ARP message (the message is nothing but header).
#[derive(Clone, Debug)]
pub struct ArpHeader {
    hardware_type: ArpHardwareType,
    protocol_type: EtherType,
    operation: ArpOperation,
    sender_hardware_addr: Vec<u8>,
    sender_protocol_addr: Vec<u8>,
    target_hardware_addr: Vec<u8>,
    target_protocol_addr: Vec<u8>,
}

impl ArpHeader {
    #[inline]
    pub fn hardware_type(&self) -> ArpHardwareType {
        self.hardware_type
    }

    #[inline]
    pub fn protocol_type(&self) -> EtherType {
        self.protocol_type
    }

    /// Hardware address length in octets.
    #[inline]
    pub fn hardware_addr_len(&self) -> u8 {
        self.sender_hardware_addr.len() as u8
    }

    /// Protocol address length in octets.
    #[inline]
    pub fn protocol_addr_len(&self) -> u8 {
        self.sender_protocol_addr.len() as u8
    }

    #[inline]
    pub fn operation(&self) -> ArpOperation {
        self.operation
    }

    #[inline]
    pub fn sender_hardware_addr(&self) -> &[u8] {
        &self.sender_hardware_addr
    }

    #[inline]
    pub fn sender_protocol_addr(&self) -> &[u8] {
        &self.sender_protocol_addr
    }

    #[inline]
    pub fn target_hardware_addr(&self) -> &[u8] {
        &self.target_hardware_addr
    }

    #[inline]
    pub fn target_protocol_addr(&self) -> &[u8] {
        &self.target_protocol_addr
    }

    /// The sender hardware address as a MAC, when it is 6 octets long.
    #[inline]
    pub fn sender_mac(&self) -> Option<MacAddr6> {
        mac_from(&self.sender_hardware_addr)
    }

    #[inline]
    pub fn target_mac(&self) -> Option<MacAddr6> {
        mac_from(&self.target_hardware_addr)
    }

    /// The sender protocol address as IPv4, when it is 4 octets long.
    #[inline]
    pub fn sender_ipv4(&self) -> Option<Ipv4Addr> {
        ipv4_from(&self.sender_protocol_addr)
    }

    #[inline]
    pub fn target_ipv4(&self) -> Option<Ipv4Addr> {
        ipv4_from(&self.target_protocol_addr)
    }
}

fn mac_from(bytes: &[u8]) -> Option<MacAddr6> {
    let array: [u8; 6] = bytes.try_into().ok()?;
    Some(MacAddr6::from(array))
}

fn ipv4_from(bytes: &[u8]) -> Option<Ipv4Addr> {
    let array: [u8; 4] = bytes.try_into().ok()?;
    Some(Ipv4Addr::from(array))
}

impl Header for ArpHeader {
    #[inline]
    fn len(&self) -> usize {
        8 + 2 * (self.sender_hardware_addr.len() + self.sender_protocol_addr.len())
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.hardware_type.value().to_be_bytes());
        bytes.extend(self.protocol_type.value().to_be_bytes());
        bytes.push(self.hardware_addr_len());
        bytes.push(self.protocol_addr_len());
        bytes.extend(self.operation.value().to_be_bytes());
        bytes.extend(&self.sender_hardware_addr);
        bytes.extend(&self.sender_protocol_addr);
        bytes.extend(&self.target_hardware_addr);
        bytes.extend(&self.target_protocol_addr);
    }
}

impl Arp {
    #[inline]
    pub fn builder() -> ArpBuilder {
        ArpBuilder::new()
    }

    #[inline]
    pub fn header(&self) -> &ArpHeader {
        &self.header
    }

    pub fn to_builder(&self) -> ArpBuilder {
        ArpBuilder {
            hardware_type: self.header.hardware_type,
            protocol_type: self.header.protocol_type,
            operation: self.header.operation,
            sender_hardware_addr: self.header.sender_hardware_addr.clone(),
            sender_protocol_addr: self.header.sender_protocol_addr.clone(),
            target_hardware_addr: self.header.target_hardware_addr.clone(),
            target_protocol_addr: self.header.target_protocol_addr.clone(),
        }
    }
}

impl FromBytes for Arp {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let hardware_type = ArpHardwareType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Arp", e))?,
        );
        let protocol_type = EtherType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Arp", e))?,
        );
        let hln = reader.u8().map_err(|e| DecodeError::from_bounds("Arp", e))? as usize;
        let pln = reader.u8().map_err(|e| DecodeError::from_bounds("Arp", e))? as usize;
        let operation = ArpOperation::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Arp", e))?,
        );

        let mut addr = |len: usize| -> Result<Vec<u8>, DecodeError> {
            reader.take(len).map(|bytes| bytes.to_vec()).map_err(|_| {
                DecodeError::invalid_size(
                    "Arp",
                    "declared address lengths exceed the available bytes",
                )
            })
        };

        let sender_hardware_addr = addr(hln)?;
        let sender_protocol_addr = addr(pln)?;
        let target_hardware_addr = addr(hln)?;
        let target_protocol_addr = addr(pln)?;

        Ok(Arp {
            header: ArpHeader {
                hardware_type,
                protocol_type,
                operation,
                sender_hardware_addr,
                sender_protocol_addr,
                target_hardware_addr,
                target_protocol_addr,
            },
        })
    }
}

impl LayerObject for Arp {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Arp"
    }

    #[inline]
    fn len(&self) -> usize {
        self.header.len()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.header.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.header.to_bytes_extended(bytes);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Arp);

/// Staging object for [`Arp`] messages.
///
/// Defaults to an Ethernet/IPv4 request; the typed setters fix the
/// address lengths at 6/4 octets, while the raw setters permit any
/// hardware/protocol address pair of consistent lengths.
#[derive(Clone, Debug)]
pub struct ArpBuilder {
    hardware_type: ArpHardwareType,
    protocol_type: EtherType,
    operation: ArpOperation,
    sender_hardware_addr: Vec<u8>,
    sender_protocol_addr: Vec<u8>,
    target_hardware_addr: Vec<u8>,
    target_protocol_addr: Vec<u8>,
}

impl ArpBuilder {
    pub fn new() -> Self {
        ArpBuilder {
            hardware_type: ArpHardwareType::Ethernet,
            protocol_type: EtherType::Ipv4,
            operation: ArpOperation::Request,
            sender_hardware_addr: vec![0; 6],
            sender_protocol_addr: vec![0; 4],
            target_hardware_addr: vec![0; 6],
            target_protocol_addr: vec![0; 4],
        }
    }

    #[inline]
    pub fn hardware_type(mut self, hardware_type: ArpHardwareType) -> Self {
        self.hardware_type = hardware_type;
        self
    }

    #[inline]
    pub fn protocol_type(mut self, protocol_type: EtherType) -> Self {
        self.protocol_type = protocol_type;
        self
    }

    #[inline]
    pub fn operation(mut self, operation: ArpOperation) -> Self {
        self.operation = operation;
        self
    }

    #[inline]
    pub fn sender_mac(mut self, mac: MacAddr6) -> Self {
        self.sender_hardware_addr = mac.as_bytes().to_vec();
        self
    }

    #[inline]
    pub fn sender_ipv4(mut self, addr: Ipv4Addr) -> Self {
        self.sender_protocol_addr = addr.octets().to_vec();
        self
    }

    #[inline]
    pub fn target_mac(mut self, mac: MacAddr6) -> Self {
        self.target_hardware_addr = mac.as_bytes().to_vec();
        self
    }

    #[inline]
    pub fn target_ipv4(mut self, addr: Ipv4Addr) -> Self {
        self.target_protocol_addr = addr.octets().to_vec();
        self
    }

    #[inline]
    pub fn sender_hardware_addr(mut self, addr: Vec<u8>) -> Self {
        self.sender_hardware_addr = addr;
        self
    }

    #[inline]
    pub fn sender_protocol_addr(mut self, addr: Vec<u8>) -> Self {
        self.sender_protocol_addr = addr;
        self
    }

    #[inline]
    pub fn target_hardware_addr(mut self, addr: Vec<u8>) -> Self {
        self.target_hardware_addr = addr;
        self
    }

    #[inline]
    pub fn target_protocol_addr(mut self, addr: Vec<u8>) -> Self {
        self.target_protocol_addr = addr;
        self
    }
}

impl Default for ArpBuilder {
    #[inline]
    fn default() -> Self {
        ArpBuilder::new()
    }
}

impl Build for ArpBuilder {
    type Packet = Arp;

    fn build(self) -> Result<Arp, BuildError> {
        if self.sender_hardware_addr.len() != self.target_hardware_addr.len() {
            return Err(BuildError::out_of_range(
                "Arp",
                "target_hardware_addr",
                "sender and target hardware addresses differ in length",
            ));
        }
        if self.sender_protocol_addr.len() != self.target_protocol_addr.len() {
            return Err(BuildError::out_of_range(
                "Arp",
                "target_protocol_addr",
                "sender and target protocol addresses differ in length",
            ));
        }
        if self.sender_hardware_addr.len() > u8::MAX as usize {
            return Err(BuildError::too_long(
                "Arp",
                "sender_hardware_addr",
                "hardware address length must fit an octet",
            ));
        }
        if self.sender_protocol_addr.len() > u8::MAX as usize {
            return Err(BuildError::too_long(
                "Arp",
                "sender_protocol_addr",
                "protocol address length must fit an octet",
            ));
        }

        Ok(Arp {
            header: ArpHeader {
                hardware_type: self.hardware_type,
                protocol_type: self.protocol_type,
                operation: self.operation,
                sender_hardware_addr: self.sender_hardware_addr,
                sender_protocol_addr: self.sender_protocol_addr,
                target_hardware_addr: self.target_hardware_addr,
                target_protocol_addr: self.target_protocol_addr,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trips() {
        let arp = Arp::builder()
            .sender_mac(MacAddr6::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55))
            .sender_ipv4(Ipv4Addr::new(192, 168, 0, 1))
            .target_ipv4(Ipv4Addr::new(192, 168, 0, 2))
            .build()
            .unwrap();

        assert_eq!(arp.len(), 28);
        let bytes = arp.to_bytes();
        let decoded = Arp::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, arp);
        assert_eq!(decoded.header().operation(), ArpOperation::Request);
        assert_eq!(
            decoded.header().sender_ipv4(),
            Some(Ipv4Addr::new(192, 168, 0, 1))
        );
        assert_eq!(
            decoded.header().sender_mac(),
            Some(MacAddr6::new(0x00, 0x11, 0x22, 0x33, 0x44, 0x55))
        );
    }

    #[test]
    fn truncated_addresses_are_malformed() {
        // hln=6/pln=4 but only two address bytes present.
        let bytes = [
            0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01, // fixed header
            0xAA, 0xBB, // truncated sender hardware address
        ];
        assert!(Arp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn mismatched_address_lengths_fail_build() {
        let err = Arp::builder()
            .sender_hardware_addr(vec![1, 2, 3, 4, 5, 6])
            .target_hardware_addr(vec![1, 2])
            .build()
            .unwrap_err();
        assert_eq!(err.field, "target_hardware_addr");
    }

    #[test]
    fn builder_is_idempotent() {
        let arp = Arp::builder()
            .operation(ArpOperation::Reply)
            .target_mac(MacAddr6::broadcast())
            .build()
            .unwrap();
        assert_eq!(arp.to_builder().build().unwrap(), arp);
    }
}
