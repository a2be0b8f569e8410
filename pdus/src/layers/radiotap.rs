// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Radiotap capture pseudo-header.
//!
//! Radiotap is the odd one out among the element sequences: the "tag"
//! of each data field is implicit in its bit position within the
//! present bitmask chain, fields are little-endian, and each field
//! self-aligns to its natural boundary. Field parsing stops at the
//! first unknown present bit (field sizes beyond it are unknowable);
//! the remainder of the header is preserved verbatim so the frame
//! still round-trips.

use pdus_common::Reader;

use crate::dispatch::{self, DecodeCx, Registry};
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::LinkType;

pub(crate) fn decode_radiotap(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Radiotap::from_bytes_in(bytes, cx)?))
}

/// The extended-presence bit chaining one present word to the next.
const PRESENT_EXT: u32 = 1 << 31;

/// A single Radiotap data field, identified by its present-bit
/// position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RadiotapField {
    /// Bit 0: TSFT, microseconds (8 bytes, aligned 8).
    Tsft(u64),
    /// Bit 1: flags octet.
    Flags(u8),
    /// Bit 2: data rate in 500 kbps units.
    Rate(u8),
    /// Bit 3: channel frequency (MHz) and flags (4 bytes, aligned 2).
    Channel { freq: u16, flags: u16 },
    /// Bit 5: antenna signal, dBm.
    AntennaSignal(i8),
    /// Bit 6: antenna noise, dBm.
    AntennaNoise(i8),
    /// Bit 11: antenna index.
    Antenna(u8),
}

impl RadiotapField {
    /// The field's present-bit position.
    #[inline]
    pub fn bit(&self) -> u32 {
        match self {
            RadiotapField::Tsft(_) => 0,
            RadiotapField::Flags(_) => 1,
            RadiotapField::Rate(_) => 2,
            RadiotapField::Channel { .. } => 3,
            RadiotapField::AntennaSignal(_) => 5,
            RadiotapField::AntennaNoise(_) => 6,
            RadiotapField::Antenna(_) => 11,
        }
    }

    fn alignment(bit: u32) -> usize {
        match bit {
            0 => 8,
            3 => 2,
            _ => 1,
        }
    }

    /// Reads the field for `bit` at the reader's (aligned) cursor, or
    /// `None` for an unknown bit position.
    fn read(bit: u32, reader: &mut Reader<'_>) -> Result<Option<RadiotapField>, DecodeError> {
        let field = match bit {
            0 => RadiotapField::Tsft(
                reader
                    .u64_le()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
            ),
            1 => RadiotapField::Flags(
                reader
                    .u8()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
            ),
            2 => RadiotapField::Rate(
                reader
                    .u8()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
            ),
            3 => RadiotapField::Channel {
                freq: reader
                    .u16_le()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
                flags: reader
                    .u16_le()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
            },
            5 => RadiotapField::AntennaSignal(
                reader
                    .i8()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
            ),
            6 => RadiotapField::AntennaNoise(
                reader
                    .i8()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
            ),
            11 => RadiotapField::Antenna(
                reader
                    .u8()
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?,
            ),
            _ => return Ok(None),
        };
        Ok(Some(field))
    }

    fn to_bytes_aligned(&self, header: &mut Vec<u8>, base: usize) {
        let align = Self::alignment(self.bit());
        let pos = header.len() - base;
        let pad = (align - (pos % align)) % align;
        header.extend(core::iter::repeat(0).take(pad));
        match self {
            RadiotapField::Tsft(tsft) => header.extend(tsft.to_le_bytes()),
            RadiotapField::Flags(flags) => header.push(*flags),
            RadiotapField::Rate(rate) => header.push(*rate),
            RadiotapField::Channel { freq, flags } => {
                header.extend(freq.to_le_bytes());
                header.extend(flags.to_le_bytes());
            }
            RadiotapField::AntennaSignal(dbm) => header.push(*dbm as u8),
            RadiotapField::AntennaNoise(dbm) => header.push(*dbm as u8),
            RadiotapField::Antenna(antenna) => header.push(*antenna),
        }
    }
}

/// A Radiotap header and its encapsulated 802.11 frame.
#[derive(Clone, Debug)]
pub struct Radiotap {
    version: u8,
    pad: u8,
    length: u16,
    present: Vec<u32>,
    fields: Vec<RadiotapField>,
    /// Header bytes from the first unknown present bit to the declared
    /// header end, preserved verbatim.
    skipped: Vec<u8>,
    payload: Option<Box<dyn LayerObject>>,
}

impl Radiotap {
    #[inline]
    pub fn builder() -> RadiotapBuilder {
        RadiotapBuilder::new()
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// The header length field as carried on the wire.
    #[inline]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// The present-word chain as carried on the wire.
    #[inline]
    pub fn present(&self) -> &[u32] {
        &self.present
    }

    #[inline]
    pub fn fields(&self) -> &[RadiotapField] {
        &self.fields
    }

    /// The antenna signal strength, when that field is present.
    pub fn antenna_signal(&self) -> Option<i8> {
        self.fields.iter().find_map(|f| match f {
            RadiotapField::AntennaSignal(dbm) => Some(*dbm),
            _ => None,
        })
    }

    fn header_to_bytes(&self, bytes: &mut Vec<u8>) {
        let base = bytes.len();
        bytes.push(self.version);
        bytes.push(self.pad);
        bytes.extend(self.length.to_le_bytes());
        for word in &self.present {
            bytes.extend(word.to_le_bytes());
        }
        for field in &self.fields {
            field.to_bytes_aligned(bytes, base);
        }
        bytes.extend(&self.skipped);
    }

    pub fn to_builder(&self) -> RadiotapBuilder {
        RadiotapBuilder {
            version: self.version,
            pad: self.pad,
            length: self.length,
            present: self.present.clone(),
            fields: self.fields.clone(),
            skipped: self.skipped.clone(),
            payload: self.payload.clone(),
            correct_length: false,
        }
    }

    fn computed_header_len(&self) -> usize {
        let mut len = 4 + 4 * self.present.len();
        for field in &self.fields {
            let align = RadiotapField::alignment(field.bit());
            len += (align - (len % align)) % align;
            len += match field {
                RadiotapField::Tsft(_) => 8,
                RadiotapField::Channel { .. } => 4,
                _ => 1,
            };
        }
        len + self.skipped.len()
    }
}

impl FromBytes for Radiotap {
    fn from_bytes_in(bytes: &[u8], cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let version = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Radiotap", e))?;
        if version != 0 {
            return Err(DecodeError::invalid_value(
                "Radiotap",
                "version field is not 0",
            ));
        }
        let pad = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Radiotap", e))?;
        let length = reader
            .u16_le()
            .map_err(|e| DecodeError::from_bounds("Radiotap", e))?;
        if (length as usize) < 8 || length as usize > bytes.len() {
            return Err(DecodeError::invalid_size(
                "Radiotap",
                "header length field inconsistent with the available bytes",
            ));
        }

        let mut present = Vec::new();
        loop {
            if reader.pos() + 4 > length as usize {
                return Err(DecodeError::invalid_size(
                    "Radiotap",
                    "present chain extends past the declared header length",
                ));
            }
            let word = reader
                .u32_le()
                .map_err(|e| DecodeError::from_bounds("Radiotap", e))?;
            present.push(word);
            if word & PRESENT_EXT == 0 {
                break;
            }
        }

        // The data fields live between the present chain and the header
        // end; the walker below is the implicit-tag variant where the
        // bitmask position selects the field. Field alignment is
        // relative to the start of the radiotap header, so the reader
        // windows the whole header and skips the fixed prefix.
        let mut field_reader = Reader::new(&bytes[..length as usize]);
        field_reader
            .skip(reader.pos())
            .map_err(|e| DecodeError::from_bounds("Radiotap", e))?;
        let mut fields = Vec::new();
        let mut skipped = Vec::new();
        'words: for (word_idx, &word) in present.iter().enumerate() {
            for bit in 0..31 {
                if word & (1 << bit) == 0 {
                    continue;
                }
                let global_bit = word_idx as u32 * 32 + bit;
                field_reader
                    .align(RadiotapField::alignment(global_bit))
                    .map_err(|e| DecodeError::from_bounds("Radiotap", e))?;
                match RadiotapField::read(global_bit, &mut field_reader)? {
                    Some(field) => fields.push(field),
                    None => {
                        // Unknown field sizes cannot be skipped; keep the
                        // rest of the header verbatim.
                        skipped = field_reader.take_rest().to_vec();
                        break 'words;
                    }
                }
            }
        }
        if skipped.is_empty() {
            skipped = field_reader.take_rest().to_vec();
        }

        let payload_region = &bytes[length as usize..];
        let payload = if payload_region.is_empty() {
            None
        } else {
            Some(dispatch::dispatch(
                Registry::Link,
                LinkType::Ieee80211.value() as u32,
                payload_region,
                cx,
            ))
        };

        Ok(Radiotap {
            version,
            pad,
            length,
            present,
            fields,
            skipped,
            payload,
        })
    }
}

impl LayerObject for Radiotap {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Radiotap"
    }

    #[inline]
    fn len(&self) -> usize {
        self.computed_header_len() + self.payload.as_ref().map_or(0, |p| p.len())
    }

    #[inline]
    fn header_len(&self) -> usize {
        self.computed_header_len()
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        self.payload.as_deref()
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.header_to_bytes(bytes);
        if let Some(payload) = self.payload.as_ref() {
            payload.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Radiotap);

/// Staging object for [`Radiotap`] headers.
#[derive(Clone, Debug)]
pub struct RadiotapBuilder {
    version: u8,
    pad: u8,
    length: u16,
    present: Vec<u32>,
    fields: Vec<RadiotapField>,
    skipped: Vec<u8>,
    payload: Option<Box<dyn LayerObject>>,
    correct_length: bool,
}

impl RadiotapBuilder {
    pub fn new() -> Self {
        RadiotapBuilder {
            version: 0,
            pad: 0,
            length: 0,
            present: Vec::new(),
            fields: Vec::new(),
            skipped: Vec::new(),
            payload: None,
            correct_length: false,
        }
    }

    /// Adds a data field. Fields must be pushed in present-bit order;
    /// `build()` rejects out-of-order sequences since the bitmask
    /// cannot express them.
    #[inline]
    pub fn field(mut self, field: RadiotapField) -> Self {
        self.fields.push(field);
        self
    }

    /// The literal present words; left empty, `build()` derives them
    /// from the staged fields.
    #[inline]
    pub fn present(mut self, present: Vec<u32>) -> Self {
        self.present = present;
        self
    }

    /// The literal header length field; overwritten when
    /// [`correct_length`](Self::correct_length) is set.
    #[inline]
    pub fn length(mut self, length: u16) -> Self {
        self.length = length;
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

impl Default for RadiotapBuilder {
    #[inline]
    fn default() -> Self {
        RadiotapBuilder::new()
    }
}

impl Build for RadiotapBuilder {
    type Packet = Radiotap;

    fn build(self) -> Result<Radiotap, BuildError> {
        let mut last_bit = None;
        for field in &self.fields {
            if let Some(last) = last_bit {
                if field.bit() <= last {
                    return Err(BuildError::out_of_range(
                        "Radiotap",
                        "fields",
                        "fields must appear in ascending present-bit order",
                    ));
                }
            }
            last_bit = Some(field.bit());
        }

        let present = if self.present.is_empty() {
            let mut word = 0u32;
            for field in &self.fields {
                word |= 1 << field.bit();
            }
            vec![word]
        } else {
            self.present
        };

        let mut radiotap = Radiotap {
            version: self.version,
            pad: self.pad,
            length: self.length,
            present,
            fields: self.fields,
            skipped: self.skipped,
            payload: self.payload,
        };
        if self.correct_length {
            radiotap.length =
                u16::try_from(radiotap.computed_header_len()).map_err(|_| {
                    BuildError::too_long(
                        "Radiotap",
                        "fields",
                        "header exceeds the 16-bit length field",
                    )
                })?;
        }
        Ok(radiotap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_aligned_fields_round_trips() {
        let radiotap = Radiotap::builder()
            .field(RadiotapField::Tsft(0x0102_0304_0506_0708))
            .field(RadiotapField::Flags(0x10))
            .field(RadiotapField::Rate(0x0C))
            .field(RadiotapField::Channel {
                freq: 2437,
                flags: 0x00A0,
            })
            .field(RadiotapField::AntennaSignal(-40))
            .field(RadiotapField::Antenna(1))
            .correct_length(true)
            .build()
            .unwrap();

        // version/pad/len/present = 8, tsft aligned at 8 = +8, flags,
        // rate, channel aligned at 18 = +4, signal, antenna
        assert_eq!(radiotap.length(), 8 + 8 + 1 + 1 + 4 + 1 + 1);

        let bytes = radiotap.to_bytes();
        assert_eq!(bytes.len(), radiotap.len());

        let decoded = Radiotap::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, radiotap);
        assert_eq!(decoded.antenna_signal(), Some(-40));
        assert_eq!(decoded.fields().len(), 6);
    }

    #[test]
    fn unknown_present_bit_preserves_rest_of_header() {
        // present word sets bit 2 (rate) and bit 7 (lock quality, not
        // structured here); the bytes after the rate field survive
        // verbatim.
        let bytes = [
            0x00, 0x00, 0x0C, 0x00, // version, pad, length 12
            0x84, 0x00, 0x00, 0x00, // present: rate + bit 7
            0x0C, // rate
            0xAA, 0xBB, 0xCC, // unparsed field bytes
        ];
        let radiotap = Radiotap::from_bytes(&bytes).unwrap();
        assert_eq!(radiotap.fields(), &[RadiotapField::Rate(0x0C)]);
        assert_eq!(radiotap.skipped, vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(radiotap.to_bytes(), bytes.to_vec());
    }

    #[test]
    fn length_overrun_is_malformed() {
        let bytes = [0x00, 0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00];
        assert!(Radiotap::from_bytes(&bytes).is_err());
    }

    #[test]
    fn out_of_order_fields_fail_build() {
        let err = Radiotap::builder()
            .field(RadiotapField::Rate(2))
            .field(RadiotapField::Flags(0))
            .build()
            .unwrap_err();
        assert_eq!(err.field, "fields");
    }

    #[test]
    fn encapsulated_frame_is_dispatched() {
        // Minimal radiotap header followed by bytes that do not form a
        // management frame; the payload degrades to Raw.
        let mut bytes = vec![0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
        bytes.extend([0x08, 0x01, 0xFF]); // data frame bytes
        let radiotap = Radiotap::from_bytes(&bytes).unwrap();
        assert_eq!(radiotap.payload().unwrap().layer_name(), "Raw");
        assert_eq!(radiotap.to_bytes(), bytes);
    }
}
