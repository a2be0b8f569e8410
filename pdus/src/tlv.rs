// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The generic element-sequence walker.
//!
//! Options, extension-header options, information elements, TLS
//! extensions, SCTP chunks and DNS records all share one shape: a byte
//! region holding an ordered sequence of self-describing sub-elements.
//! The walker owns the loop and its edge-case policy; each protocol
//! supplies only the "read one element" step, which knows whether its
//! elements are length-prefixed, single-byte, bitmask-selected or run to
//! the end of the region.

use crate::error::DecodeError;

/// The outcome of reading a single element from the front of a region.
pub enum Step<T> {
    /// An ordinary element that consumed the given number of bytes.
    Element(T, usize),
    /// A terminator element (e.g. end-of-option-list): consumed bytes,
    /// then the walk stops and any remaining bytes are handed back to
    /// the caller untouched.
    Terminator(T, usize),
}

/// Walks `region` as a sequence of elements until it is exhausted or a
/// terminator is read.
///
/// Returns the ordered elements together with the bytes following a
/// terminator (empty when the region was consumed exactly). An element
/// claiming more bytes than remain, or consuming none at all, is
/// malformed input attributed to `layer`.
pub fn walk<'a, T, F>(
    region: &'a [u8],
    layer: &'static str,
    mut read_one: F,
) -> Result<(Vec<T>, &'a [u8]), DecodeError>
where
    F: FnMut(&'a [u8]) -> Result<Step<T>, DecodeError>,
{
    let mut elements = Vec::new();
    let mut cursor = region;

    while !cursor.is_empty() {
        let (element, consumed, stop) = match read_one(cursor)? {
            Step::Element(element, consumed) => (element, consumed, false),
            Step::Terminator(element, consumed) => (element, consumed, true),
        };

        if consumed == 0 || consumed > cursor.len() {
            return Err(DecodeError::invalid_size(
                layer,
                "element length inconsistent with the enclosing region",
            ));
        }

        elements.push(element);
        cursor = &cursor[consumed..];
        if stop {
            break;
        }
    }

    Ok((elements, cursor))
}

/// Walks exactly `count` elements off the front of `region`, returning
/// them along with the unconsumed remainder.
///
/// Used where the enclosing header declares an element count (DNS
/// sections) rather than a region length.
pub fn walk_count<'a, T, F>(
    region: &'a [u8],
    count: usize,
    layer: &'static str,
    mut read_one: F,
) -> Result<(Vec<T>, &'a [u8]), DecodeError>
where
    F: FnMut(&'a [u8]) -> Result<(T, usize), DecodeError>,
{
    let mut elements = Vec::with_capacity(count.min(64));
    let mut cursor = region;

    for _ in 0..count {
        if cursor.is_empty() {
            return Err(DecodeError::insufficient(
                layer,
                "declared element count exceeds the available bytes",
            ));
        }

        let (element, consumed) = read_one(cursor)?;
        if consumed == 0 || consumed > cursor.len() {
            return Err(DecodeError::invalid_size(
                layer,
                "element length inconsistent with the enclosing region",
            ));
        }

        elements.push(element);
        cursor = &cursor[consumed..];
    }

    Ok((elements, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorClass;

    // A toy tag/length/value format: tag 0 terminates, anything else is
    // followed by a length byte and that many value bytes.
    fn read_toy(bytes: &[u8]) -> Result<Step<(u8, Vec<u8>)>, DecodeError> {
        let tag = bytes[0];
        if tag == 0 {
            return Ok(Step::Terminator((0, Vec::new()), 1));
        }

        let len = *bytes.get(1).ok_or_else(|| {
            DecodeError::insufficient("Toy", "element truncated before length octet")
        })? as usize;
        let value = bytes.get(2..2 + len).ok_or_else(|| {
            DecodeError::invalid_size("Toy", "element length extends past the region")
        })?;
        Ok(Step::Element((tag, value.to_vec()), 2 + len))
    }

    #[test]
    fn walks_region_to_exhaustion() {
        let region = [5, 2, 0xAA, 0xBB, 7, 0, 9, 1, 0xCC];
        let (elements, rest) = walk(&region, "Toy", read_toy).unwrap();
        assert_eq!(
            elements,
            vec![
                (5, vec![0xAA, 0xBB]),
                (7, vec![]),
                (9, vec![0xCC]),
            ]
        );
        assert!(rest.is_empty());
    }

    #[test]
    fn terminator_stops_walk_and_preserves_tail() {
        let region = [5, 1, 0xAA, 0, 0xDE, 0xAD];
        let (elements, rest) = walk(&region, "Toy", read_toy).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(rest, &[0xDE, 0xAD]);
    }

    #[test]
    fn overrunning_element_is_malformed() {
        // Outer region claims 4 bytes; the element claims 200.
        let region = [5, 200, 0x01, 0x02];
        let err = walk(&region, "Toy", read_toy).unwrap_err();
        assert_eq!(err.class, DecodeErrorClass::InvalidSize);
    }

    #[test]
    fn count_walk_checks_exhaustion() {
        let region = [5, 1, 0xAA, 9, 0, 0xFF];
        let (elements, rest) = walk_count(&region, 2, "Toy", |bytes| {
            match read_toy(bytes)? {
                Step::Element(e, n) | Step::Terminator(e, n) => Ok((e, n)),
            }
        })
        .unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(rest, &[0xFF]);

        let err = walk_count(&region, 4, "Toy", |bytes| {
            match read_toy(bytes)? {
                Step::Element(e, n) | Step::Terminator(e, n) => Ok((e, n)),
            }
        })
        .unwrap_err();
        assert_eq!(err.class, DecodeErrorClass::InsufficientBytes);
    }
}
