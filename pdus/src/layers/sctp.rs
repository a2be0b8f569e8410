// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Stream Control Transmission Protocol.
//!
//! An SCTP packet is a 12-byte common header followed by a sequence of
//! chunks, each itself a type/flags/length/value element padded to a
//! 32-bit boundary. INIT-family and heartbeat chunks nest a further
//! parameter sequence of the same shape. The packet checksum is CRC32c
//! rather than the Internet checksum.

use pdus_common::{padded_length, Reader};

use crate::dispatch::DecodeCx;
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::{SctpChunkType, SctpParameterType};
use crate::tlv::{self, Step};
use crate::utils;

pub(crate) fn decode_sctp(
    bytes: &[u8],
    cx: &DecodeCx,
) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Sctp::from_bytes_in(bytes, cx)?))
}

const SCTP_COMMON_HEADER_LEN: usize = 12;

/// A variable-length chunk parameter (INIT, heartbeat and error
/// chunks), kept as a generic type/value pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SctpParameter {
    param_type: SctpParameterType,
    value: Vec<u8>,
}

impl SctpParameter {
    pub fn new(param_type: SctpParameterType, value: Vec<u8>) -> Self {
        SctpParameter { param_type, value }
    }

    #[inline]
    pub fn param_type(&self) -> SctpParameterType {
        self.param_type
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Serialized length including the 4-byte parameter header but not
    /// the inter-parameter padding.
    #[inline]
    pub fn byte_len(&self) -> usize {
        4 + self.value.len()
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.param_type.value().to_be_bytes());
        bytes.extend((self.byte_len() as u16).to_be_bytes());
        bytes.extend(&self.value);
    }

    fn read_one(bytes: &[u8]) -> Result<Step<SctpParameter>, DecodeError> {
        let mut reader = Reader::new(bytes);
        let param_type = SctpParameterType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Sctp", e))?,
        );
        let length = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Sctp", e))? as usize;
        if length < 4 {
            return Err(DecodeError::invalid_size(
                "Sctp",
                "parameter length below the 4-byte header minimum",
            ));
        }
        let value = bytes.get(4..length).ok_or_else(|| {
            DecodeError::invalid_size("Sctp", "parameter length exceeds the chunk region")
        })?;

        // Parameters are padded to 32 bits; the final one may run to the
        // end of the region unpadded.
        let consumed = padded_length::<4>(length).min(bytes.len());
        Ok(Step::Element(
            SctpParameter::new(param_type, value.to_vec()),
            consumed,
        ))
    }
}

fn walk_parameters(region: &[u8]) -> Result<Vec<SctpParameter>, DecodeError> {
    let (params, _) = tlv::walk(region, "Sctp", SctpParameter::read_one)?;
    Ok(params)
}

fn parameters_to_bytes(params: &[SctpParameter], bytes: &mut Vec<u8>) {
    for param in params {
        param.to_bytes_extended(bytes);
        let pad = padded_length::<4>(param.byte_len()) - param.byte_len();
        bytes.extend(core::iter::repeat(0).take(pad));
    }
}

fn parameters_byte_len(params: &[SctpParameter]) -> usize {
    params
        .iter()
        .map(|p| padded_length::<4>(p.byte_len()))
        .sum()
}

/// The fixed fields of an INIT or INIT ACK chunk (both share one
/// layout).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SctpInit {
    pub init_tag: u32,
    pub a_rwnd: u32,
    pub outbound_streams: u16,
    pub inbound_streams: u16,
    pub initial_tsn: u32,
    pub params: Vec<SctpParameter>,
}

/// A single SCTP chunk.
///
/// Chunk types without a structured representation are preserved in the
/// [`Unknown`](SctpChunk::Unknown) variant with their flags and value
/// bytes verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SctpChunk {
    Data {
        flags: u8,
        tsn: u32,
        stream_id: u16,
        stream_seq: u16,
        ppid: u32,
        user_data: Vec<u8>,
    },
    Init(SctpInit),
    InitAck(SctpInit),
    Sack {
        flags: u8,
        cum_tsn: u32,
        a_rwnd: u32,
        gap_blocks: Vec<(u16, u16)>,
        dup_tsns: Vec<u32>,
    },
    Heartbeat {
        flags: u8,
        params: Vec<SctpParameter>,
    },
    HeartbeatAck {
        flags: u8,
        params: Vec<SctpParameter>,
    },
    Abort {
        flags: u8,
        error_causes: Vec<u8>,
    },
    Shutdown {
        flags: u8,
        cum_tsn: u32,
    },
    ShutdownAck {
        flags: u8,
    },
    Error {
        flags: u8,
        error_causes: Vec<u8>,
    },
    CookieEcho {
        flags: u8,
        cookie: Vec<u8>,
    },
    CookieAck {
        flags: u8,
    },
    ShutdownComplete {
        flags: u8,
    },
    Unknown {
        chunk_type: SctpChunkType,
        flags: u8,
        data: Vec<u8>,
    },
}

impl SctpChunk {
    #[inline]
    pub fn chunk_type(&self) -> SctpChunkType {
        match self {
            SctpChunk::Data { .. } => SctpChunkType::Data,
            SctpChunk::Init(_) => SctpChunkType::Init,
            SctpChunk::InitAck(_) => SctpChunkType::InitAck,
            SctpChunk::Sack { .. } => SctpChunkType::Sack,
            SctpChunk::Heartbeat { .. } => SctpChunkType::Heartbeat,
            SctpChunk::HeartbeatAck { .. } => SctpChunkType::HeartbeatAck,
            SctpChunk::Abort { .. } => SctpChunkType::Abort,
            SctpChunk::Shutdown { .. } => SctpChunkType::Shutdown,
            SctpChunk::ShutdownAck { .. } => SctpChunkType::ShutdownAck,
            SctpChunk::Error { .. } => SctpChunkType::Error,
            SctpChunk::CookieEcho { .. } => SctpChunkType::CookieEcho,
            SctpChunk::CookieAck { .. } => SctpChunkType::CookieAck,
            SctpChunk::ShutdownComplete { .. } => SctpChunkType::ShutdownComplete,
            SctpChunk::Unknown { chunk_type, .. } => *chunk_type,
        }
    }

    fn flags(&self) -> u8 {
        match self {
            SctpChunk::Data { flags, .. }
            | SctpChunk::Sack { flags, .. }
            | SctpChunk::Heartbeat { flags, .. }
            | SctpChunk::HeartbeatAck { flags, .. }
            | SctpChunk::Abort { flags, .. }
            | SctpChunk::Shutdown { flags, .. }
            | SctpChunk::ShutdownAck { flags }
            | SctpChunk::Error { flags, .. }
            | SctpChunk::CookieEcho { flags, .. }
            | SctpChunk::CookieAck { flags }
            | SctpChunk::ShutdownComplete { flags }
            | SctpChunk::Unknown { flags, .. } => *flags,
            SctpChunk::Init(_) | SctpChunk::InitAck(_) => 0,
        }
    }

    /// Serialized length excluding inter-chunk padding.
    pub fn byte_len(&self) -> usize {
        4 + match self {
            SctpChunk::Data { user_data, .. } => 12 + user_data.len(),
            SctpChunk::Init(init) | SctpChunk::InitAck(init) => {
                16 + parameters_byte_len(&init.params)
            }
            SctpChunk::Sack {
                gap_blocks,
                dup_tsns,
                ..
            } => 12 + 4 * gap_blocks.len() + 4 * dup_tsns.len(),
            SctpChunk::Heartbeat { params, .. } | SctpChunk::HeartbeatAck { params, .. } => {
                parameters_byte_len(params)
            }
            SctpChunk::Abort { error_causes, .. } | SctpChunk::Error { error_causes, .. } => {
                error_causes.len()
            }
            SctpChunk::Shutdown { .. } => 4,
            SctpChunk::CookieEcho { cookie, .. } => cookie.len(),
            SctpChunk::ShutdownAck { .. }
            | SctpChunk::CookieAck { .. }
            | SctpChunk::ShutdownComplete { .. } => 0,
            SctpChunk::Unknown { data, .. } => data.len(),
        }
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.chunk_type().value());
        bytes.push(self.flags());
        bytes.extend((self.byte_len() as u16).to_be_bytes());
        match self {
            SctpChunk::Data {
                tsn,
                stream_id,
                stream_seq,
                ppid,
                user_data,
                ..
            } => {
                bytes.extend(tsn.to_be_bytes());
                bytes.extend(stream_id.to_be_bytes());
                bytes.extend(stream_seq.to_be_bytes());
                bytes.extend(ppid.to_be_bytes());
                bytes.extend(user_data);
            }
            SctpChunk::Init(init) | SctpChunk::InitAck(init) => {
                bytes.extend(init.init_tag.to_be_bytes());
                bytes.extend(init.a_rwnd.to_be_bytes());
                bytes.extend(init.outbound_streams.to_be_bytes());
                bytes.extend(init.inbound_streams.to_be_bytes());
                bytes.extend(init.initial_tsn.to_be_bytes());
                parameters_to_bytes(&init.params, bytes);
            }
            SctpChunk::Sack {
                cum_tsn,
                a_rwnd,
                gap_blocks,
                dup_tsns,
                ..
            } => {
                bytes.extend(cum_tsn.to_be_bytes());
                bytes.extend(a_rwnd.to_be_bytes());
                bytes.extend((gap_blocks.len() as u16).to_be_bytes());
                bytes.extend((dup_tsns.len() as u16).to_be_bytes());
                for (start, end) in gap_blocks {
                    bytes.extend(start.to_be_bytes());
                    bytes.extend(end.to_be_bytes());
                }
                for tsn in dup_tsns {
                    bytes.extend(tsn.to_be_bytes());
                }
            }
            SctpChunk::Heartbeat { params, .. } | SctpChunk::HeartbeatAck { params, .. } => {
                parameters_to_bytes(params, bytes);
            }
            SctpChunk::Abort { error_causes, .. } | SctpChunk::Error { error_causes, .. } => {
                bytes.extend(error_causes);
            }
            SctpChunk::Shutdown { cum_tsn, .. } => bytes.extend(cum_tsn.to_be_bytes()),
            SctpChunk::CookieEcho { cookie, .. } => bytes.extend(cookie),
            SctpChunk::ShutdownAck { .. }
            | SctpChunk::CookieAck { .. }
            | SctpChunk::ShutdownComplete { .. } => (),
            SctpChunk::Unknown { data, .. } => bytes.extend(data),
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<SctpChunk>, DecodeError> {
        let mut reader = Reader::new(bytes);
        let chunk_type = SctpChunkType::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Sctp", e))?,
        );
        let flags = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Sctp", e))?;
        let length = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Sctp", e))? as usize;
        if length < 4 {
            return Err(DecodeError::invalid_size(
                "Sctp",
                "chunk length below the 4-byte header minimum",
            ));
        }
        let value = bytes.get(4..length).ok_or_else(|| {
            DecodeError::invalid_size("Sctp", "chunk length exceeds the packet region")
        })?;
        let mut value_reader = Reader::new(value);

        let chunk = match chunk_type {
            SctpChunkType::Data if value.len() >= 12 => SctpChunk::Data {
                flags,
                tsn: value_reader.u32().map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                stream_id: value_reader.u16().map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                stream_seq: value_reader.u16().map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                ppid: value_reader.u32().map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                user_data: value_reader.take_rest().to_vec(),
            },
            SctpChunkType::Init | SctpChunkType::InitAck if value.len() >= 16 => {
                let init = SctpInit {
                    init_tag: value_reader.u32().map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                    a_rwnd: value_reader.u32().map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                    outbound_streams: value_reader
                        .u16()
                        .map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                    inbound_streams: value_reader
                        .u16()
                        .map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                    initial_tsn: value_reader
                        .u32()
                        .map_err(|e| DecodeError::from_bounds("Sctp", e))?,
                    params: walk_parameters(value_reader.take_rest())?,
                };
                if chunk_type == SctpChunkType::Init {
                    SctpChunk::Init(init)
                } else {
                    SctpChunk::InitAck(init)
                }
            }
            SctpChunkType::Sack if value.len() >= 12 => {
                let cum_tsn = value_reader.u32().map_err(|e| DecodeError::from_bounds("Sctp", e))?;
                let a_rwnd = value_reader.u32().map_err(|e| DecodeError::from_bounds("Sctp", e))?;
                let n_gaps = value_reader.u16().map_err(|e| DecodeError::from_bounds("Sctp", e))?;
                let n_dups = value_reader.u16().map_err(|e| DecodeError::from_bounds("Sctp", e))?;
                let mut gap_blocks = Vec::with_capacity(n_gaps as usize);
                for _ in 0..n_gaps {
                    let start = value_reader.u16().map_err(|_| {
                        DecodeError::invalid_size(
                            "Sctp",
                            "SACK gap count exceeds the chunk length",
                        )
                    })?;
                    let end = value_reader.u16().map_err(|_| {
                        DecodeError::invalid_size(
                            "Sctp",
                            "SACK gap count exceeds the chunk length",
                        )
                    })?;
                    gap_blocks.push((start, end));
                }
                let mut dup_tsns = Vec::with_capacity(n_dups as usize);
                for _ in 0..n_dups {
                    dup_tsns.push(value_reader.u32().map_err(|_| {
                        DecodeError::invalid_size(
                            "Sctp",
                            "SACK duplicate count exceeds the chunk length",
                        )
                    })?);
                }
                SctpChunk::Sack {
                    flags,
                    cum_tsn,
                    a_rwnd,
                    gap_blocks,
                    dup_tsns,
                }
            }
            SctpChunkType::Heartbeat => SctpChunk::Heartbeat {
                flags,
                params: walk_parameters(value)?,
            },
            SctpChunkType::HeartbeatAck => SctpChunk::HeartbeatAck {
                flags,
                params: walk_parameters(value)?,
            },
            SctpChunkType::Abort => SctpChunk::Abort {
                flags,
                error_causes: value.to_vec(),
            },
            SctpChunkType::Shutdown if value.len() == 4 => SctpChunk::Shutdown {
                flags,
                cum_tsn: value_reader.u32().map_err(|e| DecodeError::from_bounds("Sctp", e))?,
            },
            SctpChunkType::ShutdownAck if value.is_empty() => SctpChunk::ShutdownAck { flags },
            SctpChunkType::Error => SctpChunk::Error {
                flags,
                error_causes: value.to_vec(),
            },
            SctpChunkType::CookieEcho => SctpChunk::CookieEcho {
                flags,
                cookie: value.to_vec(),
            },
            SctpChunkType::CookieAck if value.is_empty() => SctpChunk::CookieAck { flags },
            SctpChunkType::ShutdownComplete if value.is_empty() => {
                SctpChunk::ShutdownComplete { flags }
            }
            _ => SctpChunk::Unknown {
                chunk_type,
                flags,
                data: value.to_vec(),
            },
        };

        // Chunks are padded to 32 bits; the final chunk may run to the
        // end of the packet unpadded.
        let consumed = padded_length::<4>(length).min(bytes.len());
        Ok(Step::Element(chunk, consumed))
    }
}

/// The 12-byte SCTP common header.
#[derive(Clone, Copy, Debug)]
pub struct SctpHeader {
    sport: u16,
    dport: u16,
    verification_tag: u32,
    chksum: u32,
}

impl SctpHeader {
    #[inline]
    pub fn sport(&self) -> u16 {
        self.sport
    }

    #[inline]
    pub fn dport(&self) -> u16 {
        self.dport
    }

    #[inline]
    pub fn verification_tag(&self) -> u32 {
        self.verification_tag
    }

    /// The CRC32c checksum of the SCTP packet.
    #[inline]
    pub fn chksum(&self) -> u32 {
        self.chksum
    }
}

impl Header for SctpHeader {
    #[inline]
    fn len(&self) -> usize {
        SCTP_COMMON_HEADER_LEN
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.sport.to_be_bytes());
        bytes.extend(self.dport.to_be_bytes());
        bytes.extend(self.verification_tag.to_be_bytes());
        bytes.extend(self.chksum.to_be_bytes());
    }
}

/// An SCTP packet: common header plus chunk sequence.
#[derive(Clone, Debug)]
pub struct Sctp {
    header: SctpHeader,
    chunks: Vec<SctpChunk>,
}

impl Sctp {
    #[inline]
    pub fn builder() -> SctpBuilder {
        SctpBuilder::new()
    }

    #[inline]
    pub fn header(&self) -> &SctpHeader {
        &self.header
    }

    #[inline]
    pub fn chunks(&self) -> &[SctpChunk] {
        &self.chunks
    }

    /// The CRC32c this packet should carry, computed with the checksum
    /// field zeroed. The result is byte-swapped because the CRC is
    /// carried little-endian on the wire (RFC 4960 appendix B).
    pub fn compute_chksum(&self) -> u32 {
        let mut bytes = self.to_bytes();
        bytes[8..12].copy_from_slice(&[0; 4]);
        utils::crc32c(&bytes).swap_bytes()
    }

    #[inline]
    pub fn has_valid_chksum(&self) -> bool {
        self.header.chksum == self.compute_chksum()
    }

    pub fn to_builder(&self) -> SctpBuilder {
        SctpBuilder {
            sport: self.header.sport,
            dport: self.header.dport,
            verification_tag: self.header.verification_tag,
            chksum: self.header.chksum,
            chunks: self.chunks.clone(),
            correct_chksum: false,
        }
    }
}

impl FromBytes for Sctp {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);
        let sport = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Sctp", e))?;
        let dport = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Sctp", e))?;
        let verification_tag = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Sctp", e))?;
        let chksum = reader
            .u32()
            .map_err(|e| DecodeError::from_bounds("Sctp", e))?;

        let (chunks, _) = tlv::walk(reader.take_rest(), "Sctp", SctpChunk::read_one)?;

        Ok(Sctp {
            header: SctpHeader {
                sport,
                dport,
                verification_tag,
                chksum,
            },
            chunks,
        })
    }
}

impl LayerObject for Sctp {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Sctp"
    }

    fn len(&self) -> usize {
        let mut len = SCTP_COMMON_HEADER_LEN;
        for (i, chunk) in self.chunks.iter().enumerate() {
            len += if i + 1 == self.chunks.len() {
                chunk.byte_len()
            } else {
                padded_length::<4>(chunk.byte_len())
            };
        }
        len
    }

    #[inline]
    fn header_len(&self) -> usize {
        SCTP_COMMON_HEADER_LEN
    }

    #[inline]
    fn payload(&self) -> Option<&dyn LayerObject> {
        None
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        self.header.to_bytes_extended(bytes);
        for (i, chunk) in self.chunks.iter().enumerate() {
            chunk.to_bytes_extended(bytes);
            if i + 1 != self.chunks.len() {
                let pad = padded_length::<4>(chunk.byte_len()) - chunk.byte_len();
                bytes.extend(core::iter::repeat(0).take(pad));
            }
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Sctp);

/// Staging object for [`Sctp`] packets.
#[derive(Clone, Debug)]
pub struct SctpBuilder {
    sport: u16,
    dport: u16,
    verification_tag: u32,
    chksum: u32,
    chunks: Vec<SctpChunk>,
    correct_chksum: bool,
}

impl SctpBuilder {
    pub fn new() -> Self {
        SctpBuilder {
            sport: 0,
            dport: 0,
            verification_tag: 0,
            chksum: 0,
            chunks: Vec::new(),
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

    #[inline]
    pub fn verification_tag(mut self, verification_tag: u32) -> Self {
        self.verification_tag = verification_tag;
        self
    }

    #[inline]
    pub fn chksum(mut self, chksum: u32) -> Self {
        self.chksum = chksum;
        self
    }

    #[inline]
    pub fn chunk(mut self, chunk: SctpChunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    /// When set, `build()` recomputes the CRC32c checksum.
    #[inline]
    pub fn correct_chksum(mut self, correct: bool) -> Self {
        self.correct_chksum = correct;
        self
    }
}

impl Default for SctpBuilder {
    #[inline]
    fn default() -> Self {
        SctpBuilder::new()
    }
}

impl Build for SctpBuilder {
    type Packet = Sctp;

    fn build(self) -> Result<Sctp, BuildError> {
        for chunk in &self.chunks {
            if chunk.byte_len() > u16::MAX as usize {
                return Err(BuildError::too_long(
                    "Sctp",
                    "chunks",
                    "chunk exceeds the 16-bit length field",
                ));
            }
            if let SctpChunk::Sack {
                gap_blocks,
                dup_tsns,
                ..
            } = chunk
            {
                if gap_blocks.len() > u16::MAX as usize || dup_tsns.len() > u16::MAX as usize {
                    return Err(BuildError::too_long(
                        "Sctp",
                        "chunks",
                        "SACK block count exceeds its 16-bit field",
                    ));
                }
            }
        }

        let mut sctp = Sctp {
            header: SctpHeader {
                sport: self.sport,
                dport: self.dport,
                verification_tag: self.verification_tag,
                chksum: self.chksum,
            },
            chunks: self.chunks,
        };
        if self.correct_chksum {
            sctp.header.chksum = sctp.compute_chksum();
        }
        Ok(sctp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_data_round_trip() {
        let sctp = Sctp::builder()
            .sport(5000)
            .dport(5001)
            .verification_tag(0)
            .chunk(SctpChunk::Init(SctpInit {
                init_tag: 0xDEADBEEF,
                a_rwnd: 65536,
                outbound_streams: 10,
                inbound_streams: 10,
                initial_tsn: 1,
                params: vec![SctpParameter::new(
                    SctpParameterType::CookiePreservative,
                    vec![0, 0, 0x75, 0x30],
                )],
            }))
            .chunk(SctpChunk::Data {
                flags: 0x03,
                tsn: 1,
                stream_id: 0,
                stream_seq: 0,
                ppid: 0,
                user_data: b"hello world!".to_vec(),
            })
            .correct_chksum(true)
            .build()
            .unwrap();

        assert!(sctp.has_valid_chksum());
        let bytes = sctp.to_bytes();
        assert_eq!(bytes.len(), sctp.len());

        let decoded = Sctp::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, sctp);
        assert_eq!(decoded.chunks().len(), 2);
        match &decoded.chunks()[0] {
            SctpChunk::Init(init) => {
                assert_eq!(init.init_tag, 0xDEADBEEF);
                assert_eq!(init.params.len(), 1);
            }
            other => panic!("expected INIT, got {other:?}"),
        }
    }

    #[test]
    fn unknown_chunk_type_is_preserved() {
        let mut bytes = vec![
            0x13, 0x88, 0x13, 0x89, // ports
            0, 0, 0, 0, // verification tag
            0, 0, 0, 0, // checksum
        ];
        bytes.extend([0xC0, 0x07, 0x00, 0x08, 1, 2, 3, 4]); // chunk type 192
        let sctp = Sctp::from_bytes(&bytes).unwrap();
        match &sctp.chunks()[0] {
            SctpChunk::Unknown {
                chunk_type,
                flags,
                data,
            } => {
                assert_eq!(chunk_type.value(), 0xC0);
                assert_eq!(*flags, 0x07);
                assert_eq!(data, &[1, 2, 3, 4]);
            }
            other => panic!("expected unknown chunk, got {other:?}"),
        }
        assert_eq!(sctp.to_bytes(), bytes);
    }

    #[test]
    fn chunk_length_overrun_is_malformed() {
        let mut bytes = vec![0; 12];
        bytes.extend([0x00, 0x00, 0x00, 0x40]); // DATA chunk claiming 64 bytes
        assert!(Sctp::from_bytes(&bytes).is_err());
    }

    #[test]
    fn corrupting_a_byte_invalidates_the_crc() {
        let mut sctp = Sctp::builder()
            .sport(1)
            .dport(2)
            .chunk(SctpChunk::ShutdownComplete { flags: 0 })
            .correct_chksum(true)
            .build()
            .unwrap();
        assert!(sctp.has_valid_chksum());
        sctp.header.verification_tag ^= 1;
        assert!(!sctp.has_valid_chksum());
    }

    #[test]
    fn sack_blocks_round_trip() {
        let sctp = Sctp::builder()
            .chunk(SctpChunk::Sack {
                flags: 0,
                cum_tsn: 100,
                a_rwnd: 4096,
                gap_blocks: vec![(2, 3), (5, 5)],
                dup_tsns: vec![101],
            })
            .correct_chksum(true)
            .build()
            .unwrap();

        let decoded = Sctp::from_bytes(&sctp.to_bytes()).unwrap();
        assert_eq!(decoded, sctp);
    }
}
