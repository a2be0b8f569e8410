// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Traits forming the Header/Packet/Builder contract every protocol
//! layer implements.
//!
//! A decoded packet is an immutable tree: each node owns exactly one
//! header, at most one payload (the next layer down) and optional trailing
//! padding. All modification goes through the layer's builder type, which
//! stages the same logical fields plus build-time policy flags and
//! produces a fresh packet on [`build()`](Build::build).

use core::any;
use core::fmt;

use crate::dispatch::DecodeCx;
use crate::error::{BuildError, DecodeError};

/// An extension to [`any::Any`]; adds methods for retrieving a `dyn Any`
/// reference from a layer held behind a trait object.
pub trait AsAny: any::Any {
    fn as_any(&self) -> &dyn any::Any;
}

impl<T: any::Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn any::Any {
        self
    }
}

/// An object-safe protocol layer: one node of a decoded packet tree.
///
/// Implementations are immutable value objects. Two layers are equal when
/// their serialized bytes are equal, regardless of how they were produced.
pub trait LayerObject: AsAny + fmt::Debug + Send + Sync {
    /// The name of the layer, usually the same as the name of the struct.
    fn layer_name(&self) -> &'static str;

    /// The total serialized length (in bytes) of the layer: header plus
    /// payload plus trailing padding.
    fn len(&self) -> usize;

    /// The serialized length of this layer's header alone.
    fn header_len(&self) -> usize;

    /// The layer's payload — the next protocol layer down — if any.
    fn payload(&self) -> Option<&dyn LayerObject>;

    /// Trailing bytes that belong to neither header nor payload (e.g. the
    /// pad of a minimum-length Ethernet frame).
    #[inline]
    fn padding(&self) -> &[u8] {
        &[]
    }

    /// Appends the layer's byte representation, including payload and
    /// padding, to `bytes`.
    fn to_bytes_extended(&self, bytes: &mut Vec<u8>);

    /// Serializes the layer into a fresh byte vector.
    #[inline]
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        self.to_bytes_extended(&mut bytes);
        bytes
    }

    /// Clones the layer into a boxed trait object.
    fn to_boxed_layer(&self) -> Box<dyn LayerObject>;
}

impl Clone for Box<dyn LayerObject> {
    #[inline]
    fn clone(&self) -> Self {
        self.to_boxed_layer()
    }
}

impl PartialEq for dyn LayerObject {
    /// Layers compare by their serialized byte-exact form.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for dyn LayerObject {}

impl dyn LayerObject {
    /// Retrieves a reference to the first layer of type `T` at or below
    /// this one, if such a layer exists.
    ///
    /// Since every layer has at most one payload, the search is a
    /// simple walk down the chain; the base layer itself counts if it
    /// is of type `T`.
    pub fn get_layer<T: LayerObject>(&self) -> Option<&T> {
        if let Some(base) = self.as_any().downcast_ref::<T>() {
            return Some(base);
        }

        let mut curr = self.payload();
        while let Some(layer) = curr {
            if let Some(found) = layer.as_any().downcast_ref::<T>() {
                return Some(found);
            }
            curr = layer.payload();
        }

        None
    }
}

/// Typed indexing into the sublayers of a packet tree, for use on
/// concrete layer types ([`dyn LayerObject`](LayerObject) has the
/// equivalent inherent method).
pub trait IndexLayer: LayerObject + Sized {
    /// Retrieves a reference to the first layer of type `T` at or below
    /// this one, if such a layer exists.
    #[inline]
    fn get_layer<T: LayerObject>(&self) -> Option<&T> {
        <dyn LayerObject>::get_layer(self)
    }
}

impl<T: LayerObject + Sized> IndexLayer for T {}

/// Decoding a layer (and, recursively, its payload) from bytes.
pub trait FromBytes: Sized {
    /// Decodes a layer from `bytes`, consuming nested payloads through the
    /// dispatcher. Fails with a [`DecodeError`] on malformed input.
    #[inline]
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::from_bytes_in(bytes, &DecodeCx::default())
    }

    /// Decodes a layer under an explicit decode context (strict-mode flag
    /// and recursion budget).
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError>;
}

/// The fixed-format leading portion of a protocol layer.
///
/// A header knows its own serialized length independent of any payload.
pub trait Header {
    /// The serialized length of the header in bytes.
    fn len(&self) -> usize;

    /// Appends the header's byte representation to `bytes`.
    fn to_bytes_extended(&self, bytes: &mut Vec<u8>);

    #[inline]
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        self.to_bytes_extended(&mut bytes);
        bytes
    }
}

/// A mutable staging object that validates its fields and produces an
/// immutable packet.
///
/// Build-time corrections run in a fixed order: padding first, then
/// length fields, then checksums, because checksums cover the corrected
/// lengths.
pub trait Build {
    type Packet;

    /// Validates the staged fields and assembles the packet, applying any
    /// requested build-time corrections. Fails with a [`BuildError`] when
    /// a field value violates its declared bit-width or range.
    fn build(self) -> Result<Self::Packet, BuildError>;
}

/// Implements byte-exact `PartialEq`/`Eq`/`Hash` for a concrete layer
/// type, as required of every packet value object.
macro_rules! impl_byte_eq {
    ($layer:ty) => {
        impl PartialEq for $layer {
            #[inline]
            fn eq(&self, other: &Self) -> bool {
                use $crate::layers::traits::LayerObject;
                self.to_bytes() == other.to_bytes()
            }
        }

        impl Eq for $layer {}

        impl core::hash::Hash for $layer {
            #[inline]
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                use $crate::layers::traits::LayerObject;
                state.write(&self.to_bytes());
            }
        }
    };
}

pub(crate) use impl_byte_eq;
