// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for decoding, building and re-serializing layered network
//! protocol packets.
//!
//! Raw link-layer bytes go in; an immutable tree of typed layers comes
//! out, and serializes back to the original bytes exactly. Malformed or
//! unrecognized content never aborts a decode — it degrades to
//! [`Raw`](layers::Raw) or [`Illegal`](layers::Illegal) nodes with the
//! input preserved verbatim.
//!
//! ```
//! use pdus::layers::traits::{FromBytes, IndexLayer, LayerObject};
//! use pdus::layers::udp::Udp;
//! use pdus::nums::LinkType;
//!
//! # fn example(frame: &[u8]) -> Option<()> {
//! let packet = pdus::decode(frame, 0, frame.len(), LinkType::En10Mb).ok()?;
//! let udp: &Udp = packet.get_layer()?;
//! println!("{} -> {}", udp.sport(), udp.dport());
//! assert_eq!(packet.to_bytes(), frame);
//! # Some(())
//! # }
//! ```

#![allow(clippy::len_without_is_empty)]

pub mod dispatch;
pub mod error;
pub mod layers;
pub mod nums;
pub mod tlv;
pub mod utils;

pub mod prelude {
    //! Commonly used traits, re-exported for glob import.
    pub use crate::layers::traits::{Build, FromBytes, Header, IndexLayer, LayerObject};
}

use dispatch::{DecodeCx, Registry};
use error::DecodeError;
use layers::traits::LayerObject;
use nums::LinkType;

/// Decodes the `(offset, length)` window of a captured frame, selecting
/// the first decoder from the frame's link-layer type.
///
/// The window bounds are the only thing that can fail here; within the
/// window, unrecognized or malformed content degrades to
/// [`Raw`](layers::Raw) nodes rather than an error, so a corrupt layer
/// never loses the capture's bytes.
pub fn decode(
    bytes: &[u8],
    offset: usize,
    length: usize,
    link_type: LinkType,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    decode_in(bytes, offset, length, link_type, &DecodeCx::default())
}

/// Like [`decode`], but malformed content at a recognized protocol code
/// produces an [`Illegal`](layers::Illegal) node carrying the diagnostic
/// instead of silently downgrading to [`Raw`](layers::Raw).
pub fn decode_strict(
    bytes: &[u8],
    offset: usize,
    length: usize,
    link_type: LinkType,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    decode_in(bytes, offset, length, link_type, &DecodeCx::strict())
}

fn decode_in(
    bytes: &[u8],
    offset: usize,
    length: usize,
    link_type: LinkType,
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    let reader = pdus_common::Reader::window(bytes, offset, length)
        .map_err(|err| DecodeError::from_bounds("frame", err))?;
    Ok(dispatch::dispatch(
        Registry::Link,
        link_type.value() as u32,
        reader.remaining(),
        cx,
    ))
}
