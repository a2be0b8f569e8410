// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Capture source and sink interfaces for the `pdus` codec.
//!
//! The codec itself never performs I/O: a [`CaptureSource`] hands it
//! `(bytes, offset, length)` windows tagged with a link-layer type and
//! timestamp, and a [`CaptureSink`] accepts serialized packets for
//! persistence. Sources may reuse their internal buffer between
//! frames, which is why [`Frame`] borrows rather than owns its bytes
//! and why the codec copies what it keeps.
//!
//! Only in-memory implementations live here; OS capture backends and
//! dump-file formats are separate concerns built on the same traits.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::time::SystemTime;

use thiserror::Error;

pub use pdus::nums::LinkType;

/// An error raised by a capture source or sink.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The source or sink has been closed and accepts no further
    /// operations.
    #[error("capture handle is closed")]
    Closed,
    /// A frame's `(offset, length)` window does not fit its buffer.
    #[error("frame window out of bounds: offset {offset} + length {length} > buffer {buffer_len}")]
    InvalidWindow {
        offset: usize,
        length: usize,
        buffer_len: usize,
    },
}

/// One captured frame: a byte window plus capture metadata.
///
/// The buffer is borrowed from the source and is only valid until the
/// next frame is pulled.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    buffer: &'a [u8],
    offset: usize,
    length: usize,
    link_type: LinkType,
    timestamp: SystemTime,
}

impl<'a> Frame<'a> {
    /// Creates a frame over the `(offset, length)` window of `buffer`.
    pub fn new(
        buffer: &'a [u8],
        offset: usize,
        length: usize,
        link_type: LinkType,
        timestamp: SystemTime,
    ) -> Result<Self, CaptureError> {
        if pdus_common::Reader::window(buffer, offset, length).is_err() {
            return Err(CaptureError::InvalidWindow {
                offset,
                length,
                buffer_len: buffer.len(),
            });
        }
        Ok(Frame {
            buffer,
            offset,
            length,
            link_type,
            timestamp,
        })
    }

    /// The whole backing buffer (possibly larger than the frame).
    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buffer
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    /// The frame's bytes within the buffer window.
    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        &self.buffer[self.offset..self.offset + self.length]
    }

    #[inline]
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    #[inline]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

/// Supplies captured frames one at a time.
///
/// `next_frame` lends a [`Frame`] borrowing the source's buffer; pull
/// the next frame only after the previous one is done with. `Ok(None)`
/// marks the end of the capture.
pub trait CaptureSource {
    /// The link-layer type of every frame this source produces; used by
    /// the codec to select the first decoder.
    fn link_type(&self) -> LinkType;

    fn next_frame(&mut self) -> Result<Option<Frame<'_>>, CaptureError>;
}

/// Accepts serialized packets plus a timestamp for persistence.
///
/// Sinks have no knowledge of packet structure.
pub trait CaptureSink {
    fn write_frame(&mut self, bytes: &[u8], timestamp: SystemTime) -> Result<(), CaptureError>;
}

/// An in-memory capture source that replays queued frames through a
/// reused internal buffer, the way an OS capture handle would.
#[derive(Debug)]
pub struct MemorySource {
    link_type: LinkType,
    queue: VecDeque<(Vec<u8>, SystemTime)>,
    buffer: Vec<u8>,
    closed: bool,
}

impl MemorySource {
    pub fn new(link_type: LinkType) -> Self {
        MemorySource {
            link_type,
            queue: VecDeque::new(),
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Queues a frame for replay.
    pub fn push(&mut self, bytes: Vec<u8>, timestamp: SystemTime) {
        self.queue.push_back((bytes, timestamp));
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl CaptureSource for MemorySource {
    #[inline]
    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn next_frame(&mut self) -> Result<Option<Frame<'_>>, CaptureError> {
        if self.closed {
            return Err(CaptureError::Closed);
        }
        let (bytes, timestamp) = match self.queue.pop_front() {
            Some(frame) => frame,
            None => return Ok(None),
        };

        self.buffer.clear();
        self.buffer.extend(&bytes);
        Ok(Some(Frame::new(
            &self.buffer,
            0,
            bytes.len(),
            self.link_type,
            timestamp,
        )?))
    }
}

/// An in-memory capture sink collecting written frames.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<(Vec<u8>, SystemTime)>,
    closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    #[inline]
    pub fn frames(&self) -> &[(Vec<u8>, SystemTime)] {
        &self.frames
    }

    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl CaptureSink for MemorySink {
    fn write_frame(&mut self, bytes: &[u8], timestamp: SystemTime) -> Result<(), CaptureError> {
        if self.closed {
            return Err(CaptureError::Closed);
        }
        self.frames.push((bytes.to_vec(), timestamp));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use macaddr::MacAddr6;
    use pdus::layers::l2::Ether;
    use pdus::layers::udp::Udp;
    use pdus::layers::Raw;
    use pdus::prelude::*;

    #[test]
    fn frame_window_is_validated() {
        let buffer = [0u8; 16];
        let now = SystemTime::now();
        assert!(Frame::new(&buffer, 4, 12, LinkType::En10Mb, now).is_ok());
        assert!(matches!(
            Frame::new(&buffer, 4, 13, LinkType::En10Mb, now),
            Err(CaptureError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn source_decode_serialize_sink_loop() {
        let frame = Ether::builder()
            .dst(MacAddr6::broadcast())
            .src(MacAddr6::new(2, 4, 6, 8, 10, 12))
            .payload(Raw::from(vec![0x42; 8]))
            .pad_to_minimum(true)
            .build()
            .unwrap();
        let wire = frame.to_bytes();
        let ts = SystemTime::UNIX_EPOCH;

        let mut source = MemorySource::new(LinkType::En10Mb);
        source.push(wire.clone(), ts);
        source.push(wire.clone(), ts);

        let mut sink = MemorySink::new();
        while let Some(frame) = source.next_frame().unwrap() {
            let packet = pdus::decode(
                frame.buffer(),
                frame.offset(),
                frame.length(),
                frame.link_type(),
            )
            .unwrap();
            sink.write_frame(&packet.to_bytes(), frame.timestamp())
                .unwrap();
        }

        assert_eq!(sink.frames().len(), 2);
        for (bytes, timestamp) in sink.frames() {
            assert_eq!(bytes, &wire);
            assert_eq!(*timestamp, ts);
        }
    }

    #[test]
    fn closed_handles_reject_operations() {
        let mut source = MemorySource::new(LinkType::En10Mb);
        source.close();
        assert_eq!(source.next_frame().unwrap_err(), CaptureError::Closed);

        let mut sink = MemorySink::new();
        sink.close();
        assert_eq!(
            sink.write_frame(&[1], SystemTime::now()).unwrap_err(),
            CaptureError::Closed
        );
    }

    #[test]
    fn codec_only_needs_the_window() {
        // A frame sitting mid-buffer decodes identically to one at the
        // start; the codec never assumes it owns the whole buffer.
        let udp = Udp::builder()
            .sport(7)
            .dport(7)
            .payload(Raw::from(vec![1, 2, 3]))
            .correct_length(true)
            .build()
            .unwrap();
        let ether = Ether::builder().payload(udp).build().unwrap();
        let wire = ether.to_bytes();

        let mut buffer = vec![0xEE; 10];
        buffer.extend(&wire);
        buffer.extend([0xEE; 10]);

        let frame = Frame::new(
            &buffer,
            10,
            wire.len(),
            LinkType::En10Mb,
            SystemTime::UNIX_EPOCH,
        )
        .unwrap();
        let packet = pdus::decode(
            frame.buffer(),
            frame.offset(),
            frame.length(),
            frame.link_type(),
        )
        .unwrap();
        assert_eq!(packet.to_bytes(), wire);
    }
}
