// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The collection of protocol layers implemented by this library.
//!
//! Most communication protocols are built from multiple encapsulated
//! layers of data, each generalizable into a header and a payload where
//! the payload is the next layer down. Decoding produces an immutable
//! tree of such layers; each layer type also ships a builder for
//! assembling packets field by field.
//!
//! Tightly related layers share a module: [`Ipv4`], [`Ipv6`] and the
//! IPv6 extension headers all live in [`ip`], Ethernet and 802.1Q
//! tagging in [`l2`], and so on. The [`traits`] module holds the
//! contract every layer implements.
//!
//! [`Ipv4`]: crate::layers::ip::Ipv4
//! [`Ipv6`]: crate::layers::ip::Ipv6

pub mod arp;
pub mod dns;
pub mod dot11;
pub mod gtp;
pub mod icmp;
pub mod ip;
pub mod l2;
pub mod radiotap;
pub mod sctp;
pub mod tcp;
pub mod tls;
pub mod traits;
pub mod udp;

use crate::dispatch::DecodeCx;
use crate::error::DecodeError;
use crate::layers::traits::*;

/// A terminal layer of unstructured bytes.
///
/// `Raw` is the designed fallback of the dispatcher: trailing content
/// whose next-protocol code has no registered decoder, or that a
/// registered decoder rejected as malformed, is wrapped verbatim so that
/// nothing is ever dropped. A `Raw` layer does not necessarily indicate
/// unstructured data on the wire — there may be further encapsulated
/// layers within its bytes that simply were not decoded.
#[derive(Clone, Debug)]
pub struct Raw {
    data: Vec<u8>,
}

impl Raw {
    /// The entire contents of the layer.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl From<&[u8]> for Raw {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Raw {
            data: bytes.to_vec(),
        }
    }
}

impl From<Vec<u8>> for Raw {
    #[inline]
    fn from(data: Vec<u8>) -> Self {
        Raw { data }
    }
}

impl FromBytes for Raw {
    #[inline]
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        Ok(Raw::from(bytes))
    }
}

impl LayerObject for Raw {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Raw"
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    #[inline]
    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(&self.data);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Raw);

/// A terminal layer recording a *successful* decode of bytes that
/// matched a protocol's framing but failed a structural check.
///
/// Unlike a [`DecodeError`], which is thrown and caught, an `Illegal`
/// layer is a valid node of the packet tree: it retains the raw bytes
/// verbatim alongside the diagnostic, so tooling can still inspect what
/// was recovered. Produced by the dispatcher in strict mode.
#[derive(Clone, Debug)]
pub struct Illegal {
    err: DecodeError,
    data: Vec<u8>,
}

impl Illegal {
    #[inline]
    pub(crate) fn new(err: DecodeError, bytes: &[u8]) -> Self {
        Illegal {
            err,
            data: bytes.to_vec(),
        }
    }

    /// The diagnostic recorded when the structural check failed.
    #[inline]
    pub fn error(&self) -> &DecodeError {
        &self.err
    }

    /// The name of the layer whose decoder rejected the bytes.
    #[inline]
    pub fn offending_layer(&self) -> &'static str {
        self.err.layer
    }

    /// The rejected bytes, preserved verbatim.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl LayerObject for Illegal {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Illegal"
    }

    #[inline]
    fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    #[inline]
    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(&self.data);
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Illegal);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_preserves_bytes_exactly() {
        let bytes = [0x00, 0xFF, 0x13, 0x37];
        let raw = Raw::from(bytes.as_slice());
        assert_eq!(raw.len(), 4);
        assert_eq!(raw.to_bytes(), bytes.to_vec());
        assert_eq!(raw, Raw::from(bytes.to_vec()));
    }

    #[test]
    fn illegal_retains_bytes_and_diagnostic() {
        let err = DecodeError::invalid_size("Udp", "length field exceeds available bytes");
        let illegal = Illegal::new(err, &[1, 2, 3]);
        assert_eq!(illegal.offending_layer(), "Udp");
        assert_eq!(illegal.to_bytes(), vec![1, 2, 3]);
    }
}
