// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structural TLS parsing: record framing, handshake framing, and the
//! hello extension sequence.
//!
//! Only the framing is modelled — record contents other than handshakes
//! and handshake bodies other than the hellos are carried opaque, and
//! no cryptographic processing is done. TLS is not bound to a TCP port
//! by default (segment reassembly is outside the codec); callers
//! register it via [`dispatch::register`](crate::dispatch::register) or
//! decode explicitly with [`Tls::from_bytes`].

use pdus_common::Reader;

use crate::dispatch::DecodeCx;
use crate::error::{BuildError, DecodeError};
use crate::layers::traits::*;
use crate::nums::{TlsContentType, TlsExtensionType, TlsHandshakeType, TlsVersion};
use crate::tlv::{self, Step};

pub fn decode_tls(bytes: &[u8], cx: &DecodeCx) -> Result<Box<dyn LayerObject>, DecodeError> {
    Ok(Box::new(Tls::from_bytes_in(bytes, cx)?))
}

const TLS_RECORD_HEADER_LEN: usize = 5;
const TLS_HANDSHAKE_HEADER_LEN: usize = 4;

/// A single hello extension.
///
/// Registered types with a structured representation are decoded;
/// everything else (including structurally off-spec instances of
/// registered types) is preserved verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TlsExtension {
    /// Server Name Indication, single host-name entry form.
    ServerName { host: Vec<u8> },
    /// The ClientHello list form of supported_versions.
    SupportedVersions { versions: Vec<TlsVersion> },
    Alpn { protocols: Vec<Vec<u8>> },
    Unrecognized { ext_type: TlsExtensionType, data: Vec<u8> },
}

impl TlsExtension {
    #[inline]
    pub fn ext_type(&self) -> TlsExtensionType {
        match self {
            TlsExtension::ServerName { .. } => TlsExtensionType::ServerName,
            TlsExtension::SupportedVersions { .. } => TlsExtensionType::SupportedVersions,
            TlsExtension::Alpn { .. } => TlsExtensionType::Alpn,
            TlsExtension::Unrecognized { ext_type, .. } => *ext_type,
        }
    }

    fn data_len(&self) -> usize {
        match self {
            TlsExtension::ServerName { host } => 5 + host.len(),
            TlsExtension::SupportedVersions { versions } => 1 + 2 * versions.len(),
            TlsExtension::Alpn { protocols } => {
                2 + protocols.iter().map(|p| 1 + p.len()).sum::<usize>()
            }
            TlsExtension::Unrecognized { data, .. } => data.len(),
        }
    }

    pub fn byte_len(&self) -> usize {
        4 + self.data_len()
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.ext_type().value().to_be_bytes());
        bytes.extend((self.data_len() as u16).to_be_bytes());
        match self {
            TlsExtension::ServerName { host } => {
                bytes.extend(((3 + host.len()) as u16).to_be_bytes());
                bytes.push(0); // name type: host_name
                bytes.extend((host.len() as u16).to_be_bytes());
                bytes.extend(host);
            }
            TlsExtension::SupportedVersions { versions } => {
                bytes.push((2 * versions.len()) as u8);
                for version in versions {
                    bytes.extend(version.value().to_be_bytes());
                }
            }
            TlsExtension::Alpn { protocols } => {
                let list_len: usize = protocols.iter().map(|p| 1 + p.len()).sum();
                bytes.extend((list_len as u16).to_be_bytes());
                for protocol in protocols {
                    bytes.push(protocol.len() as u8);
                    bytes.extend(protocol);
                }
            }
            TlsExtension::Unrecognized { data, .. } => bytes.extend(data),
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<TlsExtension>, DecodeError> {
        let mut reader = Reader::new(bytes);
        let ext_type = TlsExtensionType::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Tls", e))?,
        );
        let len = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
        let data = reader.take(len).map_err(|_| {
            DecodeError::invalid_size("Tls", "extension length exceeds the extensions block")
        })?;

        let extension = match Self::try_parse(ext_type, data) {
            Some(ext) if ext.data_len() == len => ext,
            _ => TlsExtension::Unrecognized {
                ext_type,
                data: data.to_vec(),
            },
        };
        Ok(Step::Element(extension, 4 + len))
    }

    fn try_parse(ext_type: TlsExtensionType, data: &[u8]) -> Option<TlsExtension> {
        let mut reader = Reader::new(data);
        let extension = match ext_type {
            TlsExtensionType::ServerName => {
                let _list_len = reader.u16().ok()?;
                let name_type = reader.u8().ok()?;
                if name_type != 0 {
                    return None;
                }
                let host_len = reader.u16().ok()? as usize;
                TlsExtension::ServerName {
                    host: reader.take(host_len).ok()?.to_vec(),
                }
            }
            TlsExtensionType::SupportedVersions => {
                // ClientHello list form only; the ServerHello's single
                // selected version stays unrecognized/verbatim.
                let list_len = reader.u8().ok()? as usize;
                if list_len % 2 != 0 {
                    return None;
                }
                let mut versions = Vec::with_capacity(list_len / 2);
                for _ in 0..list_len / 2 {
                    versions.push(TlsVersion::from(reader.u16().ok()?));
                }
                TlsExtension::SupportedVersions { versions }
            }
            TlsExtensionType::Alpn => {
                let list_len = reader.u16().ok()? as usize;
                let mut list = Reader::new(reader.take(list_len).ok()?);
                let mut protocols = Vec::new();
                while !list.is_empty() {
                    let len = list.u8().ok()? as usize;
                    protocols.push(list.take(len).ok()?.to_vec());
                }
                TlsExtension::Alpn { protocols }
            }
            _ => return None,
        };
        Some(extension)
    }
}

fn walk_extensions(region: &[u8]) -> Result<Vec<TlsExtension>, DecodeError> {
    let (extensions, _) = tlv::walk(region, "Tls", TlsExtension::read_one)?;
    Ok(extensions)
}

fn extensions_byte_len(extensions: &Option<Vec<TlsExtension>>) -> usize {
    match extensions {
        None => 0,
        Some(list) => 2 + list.iter().map(TlsExtension::byte_len).sum::<usize>(),
    }
}

fn extensions_to_bytes(extensions: &Option<Vec<TlsExtension>>, bytes: &mut Vec<u8>) {
    if let Some(list) = extensions {
        let len: usize = list.iter().map(TlsExtension::byte_len).sum();
        bytes.extend((len as u16).to_be_bytes());
        for extension in list {
            extension.to_bytes_extended(bytes);
        }
    }
}

/// A ClientHello body.
///
/// `extensions` is `None` when the hello ends after the compression
/// methods (legacy clients), distinct from an empty extensions block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsClientHello {
    pub version: TlsVersion,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suites: Vec<u16>,
    pub compression_methods: Vec<u8>,
    pub extensions: Option<Vec<TlsExtension>>,
}

impl TlsClientHello {
    fn byte_len(&self) -> usize {
        2 + 32
            + 1
            + self.session_id.len()
            + 2
            + 2 * self.cipher_suites.len()
            + 1
            + self.compression_methods.len()
            + extensions_byte_len(&self.extensions)
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.version.value().to_be_bytes());
        bytes.extend(self.random);
        bytes.push(self.session_id.len() as u8);
        bytes.extend(&self.session_id);
        bytes.extend((2 * self.cipher_suites.len() as u16).to_be_bytes());
        for suite in &self.cipher_suites {
            bytes.extend(suite.to_be_bytes());
        }
        bytes.push(self.compression_methods.len() as u8);
        bytes.extend(&self.compression_methods);
        extensions_to_bytes(&self.extensions, bytes);
    }

    fn read(region: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(region);
        let version = TlsVersion::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Tls", e))?,
        );
        let random = reader
            .array::<32>()
            .map_err(|e| DecodeError::from_bounds("Tls", e))?;
        let sid_len = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
        let session_id = reader
            .take(sid_len)
            .map_err(|e| DecodeError::from_bounds("Tls", e))?
            .to_vec();
        let cs_len = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
        if cs_len % 2 != 0 {
            return Err(DecodeError::invalid_size(
                "Tls",
                "cipher suite list length is odd",
            ));
        }
        let mut cs_reader = reader
            .sub(cs_len)
            .map_err(|e| DecodeError::from_bounds("Tls", e))?;
        let mut cipher_suites = Vec::with_capacity(cs_len / 2);
        while !cs_reader.is_empty() {
            cipher_suites.push(
                cs_reader
                    .u16()
                    .map_err(|e| DecodeError::from_bounds("Tls", e))?,
            );
        }
        let cm_len = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
        let compression_methods = reader
            .take(cm_len)
            .map_err(|e| DecodeError::from_bounds("Tls", e))?
            .to_vec();

        let extensions = read_extensions_block(&mut reader)?;

        Ok(TlsClientHello {
            version,
            random,
            session_id,
            cipher_suites,
            compression_methods,
            extensions,
        })
    }
}

/// A ServerHello body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsServerHello {
    pub version: TlsVersion,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: u16,
    pub compression_method: u8,
    pub extensions: Option<Vec<TlsExtension>>,
}

impl TlsServerHello {
    fn byte_len(&self) -> usize {
        2 + 32 + 1 + self.session_id.len() + 2 + 1 + extensions_byte_len(&self.extensions)
    }

    fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.extend(self.version.value().to_be_bytes());
        bytes.extend(self.random);
        bytes.push(self.session_id.len() as u8);
        bytes.extend(&self.session_id);
        bytes.extend(self.cipher_suite.to_be_bytes());
        bytes.push(self.compression_method);
        extensions_to_bytes(&self.extensions, bytes);
    }

    fn read(region: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(region);
        let version = TlsVersion::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Tls", e))?,
        );
        let random = reader
            .array::<32>()
            .map_err(|e| DecodeError::from_bounds("Tls", e))?;
        let sid_len = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
        let session_id = reader
            .take(sid_len)
            .map_err(|e| DecodeError::from_bounds("Tls", e))?
            .to_vec();
        let cipher_suite = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tls", e))?;
        let compression_method = reader
            .u8()
            .map_err(|e| DecodeError::from_bounds("Tls", e))?;

        let extensions = read_extensions_block(&mut reader)?;

        Ok(TlsServerHello {
            version,
            random,
            session_id,
            cipher_suite,
            compression_method,
            extensions,
        })
    }
}

/// Reads the optional trailing extensions block of a hello body.
fn read_extensions_block(
    reader: &mut Reader<'_>,
) -> Result<Option<Vec<TlsExtension>>, DecodeError> {
    if reader.is_empty() {
        return Ok(None);
    }
    let len = reader
        .u16()
        .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
    let region = reader.take(len).map_err(|_| {
        DecodeError::invalid_size(
            "Tls",
            "extensions length exceeds the handshake body",
        )
    })?;
    Ok(Some(walk_extensions(region)?))
}

/// The body of a handshake message; non-hello types stay opaque.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TlsHandshakeBody {
    ClientHello(TlsClientHello),
    ServerHello(TlsServerHello),
    Opaque(Vec<u8>),
}

/// One handshake message inside a handshake record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsHandshake {
    handshake_type: TlsHandshakeType,
    body: TlsHandshakeBody,
}

impl TlsHandshake {
    pub fn new(handshake_type: TlsHandshakeType, body: TlsHandshakeBody) -> Self {
        TlsHandshake {
            handshake_type,
            body,
        }
    }

    #[inline]
    pub fn handshake_type(&self) -> TlsHandshakeType {
        self.handshake_type
    }

    #[inline]
    pub fn body(&self) -> &TlsHandshakeBody {
        &self.body
    }

    fn body_len(&self) -> usize {
        match &self.body {
            TlsHandshakeBody::ClientHello(hello) => hello.byte_len(),
            TlsHandshakeBody::ServerHello(hello) => hello.byte_len(),
            TlsHandshakeBody::Opaque(data) => data.len(),
        }
    }

    pub fn byte_len(&self) -> usize {
        TLS_HANDSHAKE_HEADER_LEN + self.body_len()
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.handshake_type.value());
        let len = self.body_len() as u32;
        bytes.extend([(len >> 16) as u8, (len >> 8) as u8, len as u8]);
        match &self.body {
            TlsHandshakeBody::ClientHello(hello) => hello.to_bytes_extended(bytes),
            TlsHandshakeBody::ServerHello(hello) => hello.to_bytes_extended(bytes),
            TlsHandshakeBody::Opaque(data) => bytes.extend(data),
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<TlsHandshake>, DecodeError> {
        let mut reader = Reader::new(bytes);
        let handshake_type = TlsHandshakeType::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Tls", e))?,
        );
        let len = reader
            .u24()
            .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
        let region = reader.take(len).map_err(|_| {
            DecodeError::invalid_size("Tls", "handshake length exceeds the record fragment")
        })?;

        let body = match handshake_type {
            TlsHandshakeType::ClientHello => {
                TlsHandshakeBody::ClientHello(TlsClientHello::read(region)?)
            }
            TlsHandshakeType::ServerHello => {
                TlsHandshakeBody::ServerHello(TlsServerHello::read(region)?)
            }
            _ => TlsHandshakeBody::Opaque(region.to_vec()),
        };

        Ok(Step::Element(
            TlsHandshake::new(handshake_type, body),
            TLS_HANDSHAKE_HEADER_LEN + len,
        ))
    }
}

/// The content of a TLS record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TlsFragment {
    /// A handshake record's message sequence.
    Handshakes(Vec<TlsHandshake>),
    /// Alert, change-cipher-spec, application data, or anything
    /// encrypted: opaque bytes.
    Opaque(Vec<u8>),
}

/// One TLS record: content type, version, length and content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsRecord {
    content_type: TlsContentType,
    version: TlsVersion,
    fragment: TlsFragment,
}

impl TlsRecord {
    pub fn new(content_type: TlsContentType, version: TlsVersion, fragment: TlsFragment) -> Self {
        TlsRecord {
            content_type,
            version,
            fragment,
        }
    }

    #[inline]
    pub fn content_type(&self) -> TlsContentType {
        self.content_type
    }

    #[inline]
    pub fn version(&self) -> TlsVersion {
        self.version
    }

    #[inline]
    pub fn fragment(&self) -> &TlsFragment {
        &self.fragment
    }

    fn fragment_len(&self) -> usize {
        match &self.fragment {
            TlsFragment::Handshakes(handshakes) => {
                handshakes.iter().map(TlsHandshake::byte_len).sum()
            }
            TlsFragment::Opaque(data) => data.len(),
        }
    }

    pub fn byte_len(&self) -> usize {
        TLS_RECORD_HEADER_LEN + self.fragment_len()
    }

    pub fn to_bytes_extended(&self, bytes: &mut Vec<u8>) {
        bytes.push(self.content_type.value());
        bytes.extend(self.version.value().to_be_bytes());
        bytes.extend((self.fragment_len() as u16).to_be_bytes());
        match &self.fragment {
            TlsFragment::Handshakes(handshakes) => {
                for handshake in handshakes {
                    handshake.to_bytes_extended(bytes);
                }
            }
            TlsFragment::Opaque(data) => bytes.extend(data),
        }
    }

    fn read_one(bytes: &[u8]) -> Result<Step<TlsRecord>, DecodeError> {
        let mut reader = Reader::new(bytes);
        let content_type = TlsContentType::from(
            reader
                .u8()
                .map_err(|e| DecodeError::from_bounds("Tls", e))?,
        );
        let version = TlsVersion::from(
            reader
                .u16()
                .map_err(|e| DecodeError::from_bounds("Tls", e))?,
        );
        let len = reader
            .u16()
            .map_err(|e| DecodeError::from_bounds("Tls", e))? as usize;
        let region = reader.take(len).map_err(|_| {
            DecodeError::invalid_size("Tls", "record length exceeds the available bytes")
        })?;

        let fragment = match content_type {
            TlsContentType::Handshake => {
                let (handshakes, _) = tlv::walk(region, "Tls", TlsHandshake::read_one)?;
                TlsFragment::Handshakes(handshakes)
            }
            _ => TlsFragment::Opaque(region.to_vec()),
        };

        Ok(Step::Element(
            TlsRecord::new(content_type, version, fragment),
            TLS_RECORD_HEADER_LEN + len,
        ))
    }
}

/// A sequence of TLS records occupying one transport payload.
///
/// The record sequence is the whole of the layer; TLS carries no
/// further decodable protocol beneath it here.
#[derive(Clone, Debug)]
pub struct Tls {
    records: Vec<TlsRecord>,
}

impl Tls {
    #[inline]
    pub fn builder() -> TlsBuilder {
        TlsBuilder::new()
    }

    #[inline]
    pub fn records(&self) -> &[TlsRecord] {
        &self.records
    }

    pub fn to_builder(&self) -> TlsBuilder {
        TlsBuilder {
            records: self.records.clone(),
        }
    }
}

impl FromBytes for Tls {
    fn from_bytes_in(bytes: &[u8], _cx: &DecodeCx) -> Result<Self, DecodeError> {
        let (records, _) = tlv::walk(bytes, "Tls", TlsRecord::read_one)?;
        if records.is_empty() {
            return Err(DecodeError::insufficient("Tls", "empty byte window"));
        }
        Ok(Tls { records })
    }
}

impl LayerObject for Tls {
    #[inline]
    fn layer_name(&self) -> &'static str {
        "Tls"
    }

    #[inline]
    fn len(&self) -> usize {
        self.records.iter().map(TlsRecord::byte_len).sum()
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
        for record in &self.records {
            record.to_bytes_extended(bytes);
        }
    }

    #[inline]
    fn to_boxed_layer(&self) -> Box<dyn LayerObject> {
        Box::new(self.clone())
    }
}

impl_byte_eq!(Tls);

/// Staging object for [`Tls`] record sequences.
#[derive(Clone, Debug, Default)]
pub struct TlsBuilder {
    records: Vec<TlsRecord>,
}

impl TlsBuilder {
    pub fn new() -> Self {
        TlsBuilder::default()
    }

    #[inline]
    pub fn record(mut self, record: TlsRecord) -> Self {
        self.records.push(record);
        self
    }
}

impl Build for TlsBuilder {
    type Packet = Tls;

    fn build(self) -> Result<Tls, BuildError> {
        for record in &self.records {
            if record.fragment_len() > u16::MAX as usize {
                return Err(BuildError::too_long(
                    "Tls",
                    "records",
                    "record fragment exceeds the 16-bit length field",
                ));
            }
            if let TlsFragment::Handshakes(handshakes) = &record.fragment {
                for handshake in handshakes {
                    if handshake.body_len() > 0x00FF_FFFF {
                        return Err(BuildError::too_long(
                            "Tls",
                            "records",
                            "handshake body exceeds the 24-bit length field",
                        ));
                    }
                }
            }
        }
        Ok(Tls {
            records: self.records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_client_hello() -> TlsClientHello {
        TlsClientHello {
            version: TlsVersion::Tls12,
            random: [0x5A; 32],
            session_id: vec![1, 2, 3, 4],
            cipher_suites: vec![0x1301, 0x1302, 0xC02F],
            compression_methods: vec![0],
            extensions: Some(vec![
                TlsExtension::ServerName {
                    host: b"example.net".to_vec(),
                },
                TlsExtension::SupportedVersions {
                    versions: vec![TlsVersion::Tls13, TlsVersion::Tls12],
                },
                TlsExtension::Alpn {
                    protocols: vec![b"h2".to_vec(), b"http/1.1".to_vec()],
                },
            ]),
        }
    }

    #[test]
    fn client_hello_round_trips() {
        let tls = Tls::builder()
            .record(TlsRecord::new(
                TlsContentType::Handshake,
                TlsVersion::Tls10,
                TlsFragment::Handshakes(vec![TlsHandshake::new(
                    TlsHandshakeType::ClientHello,
                    TlsHandshakeBody::ClientHello(sample_client_hello()),
                )]),
            ))
            .build()
            .unwrap();

        let bytes = tls.to_bytes();
        assert_eq!(bytes.len(), tls.len());

        let decoded = Tls::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, tls);

        match decoded.records()[0].fragment() {
            TlsFragment::Handshakes(handshakes) => match handshakes[0].body() {
                TlsHandshakeBody::ClientHello(hello) => {
                    assert_eq!(hello.version, TlsVersion::Tls12);
                    assert_eq!(hello.cipher_suites.len(), 3);
                    let extensions = hello.extensions.as_ref().unwrap();
                    assert_eq!(
                        extensions[0],
                        TlsExtension::ServerName {
                            host: b"example.net".to_vec()
                        }
                    );
                }
                other => panic!("expected client hello, got {other:?}"),
            },
            other => panic!("expected handshakes, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_extension_is_preserved() {
        let hello = TlsClientHello {
            extensions: Some(vec![TlsExtension::Unrecognized {
                ext_type: TlsExtensionType::Other(0xFF01),
                data: vec![0x00],
            }]),
            ..sample_client_hello()
        };
        let tls = Tls::builder()
            .record(TlsRecord::new(
                TlsContentType::Handshake,
                TlsVersion::Tls12,
                TlsFragment::Handshakes(vec![TlsHandshake::new(
                    TlsHandshakeType::ClientHello,
                    TlsHandshakeBody::ClientHello(hello),
                )]),
            ))
            .build()
            .unwrap();

        let decoded = Tls::from_bytes(&tls.to_bytes()).unwrap();
        assert_eq!(decoded, tls);
    }

    #[test]
    fn application_data_stays_opaque() {
        let bytes = [
            23, 0x03, 0x03, 0x00, 0x05, // application data, TLS 1.2, 5 bytes
            0xDE, 0xAD, 0xBE, 0xEF, 0x99,
        ];
        let tls = Tls::from_bytes(&bytes).unwrap();
        assert_eq!(tls.records().len(), 1);
        assert_eq!(
            tls.records()[0].fragment(),
            &TlsFragment::Opaque(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x99])
        );
        assert_eq!(tls.to_bytes(), bytes.to_vec());
    }

    #[test]
    fn truncated_record_is_malformed() {
        // Record claims 10 fragment bytes; only 4 present.
        let bytes = [22, 0x03, 0x01, 0x00, 0x0A, 1, 2, 3, 4];
        assert!(Tls::from_bytes(&bytes).is_err());
    }

    #[test]
    fn handshake_overrunning_record_is_malformed() {
        // The record is well-formed (4 fragment bytes) but the nested
        // handshake claims 12 body bytes.
        let bytes = [22, 0x03, 0x01, 0x00, 0x04, 1, 0x00, 0x00, 0x0C];
        assert!(Tls::from_bytes(&bytes).is_err());
    }

    #[test]
    fn multiple_records_in_one_payload() {
        let ccs = TlsRecord::new(
            TlsContentType::ChangeCipherSpec,
            TlsVersion::Tls12,
            TlsFragment::Opaque(vec![1]),
        );
        let alert = TlsRecord::new(
            TlsContentType::Alert,
            TlsVersion::Tls12,
            TlsFragment::Opaque(vec![2, 40]),
        );
        let tls = Tls::builder().record(ccs).record(alert).build().unwrap();
        let decoded = Tls::from_bytes(&tls.to_bytes()).unwrap();
        assert_eq!(decoded.records().len(), 2);
        assert_eq!(decoded, tls);
    }
}
