// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The protocol dispatcher: a registry from (layer context, next-protocol
//! code) to decode functions.
//!
//! Decoding a layer ends with the dispatcher being handed the layer's
//! trailing bytes together with whatever next-protocol code the header
//! carried. The fallback chain never fails: an unregistered code, a
//! decoder that rejects the bytes, or an exhausted recursion budget all
//! degrade to a [`Raw`] payload (or, in strict mode, an [`Illegal`] one)
//! that preserves the bytes verbatim.
//!
//! The table is populated once at startup with the built-in protocol
//! bindings; [`register`] adds further bindings at runtime behind a lock,
//! so concurrent readers never observe a partial update.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::{DecodeError, DecodeErrorClass};
use crate::layers::traits::LayerObject;
use crate::layers::{self, Illegal, Raw};

/// The layer context a next-protocol code is interpreted in.
///
/// The same numeric code means different things in different headers: 6
/// is TCP as an IP protocol number but nothing in particular as an
/// EtherType, so the registry is keyed by context as well as code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Registry {
    /// Link-layer types reported by a capture source (LINKTYPE values).
    Link,
    /// EtherType codes in Ethernet frames and VLAN tags.
    Ether,
    /// IP protocol numbers / IPv6 next-header codes.
    IpProto,
    /// Well-known UDP port bindings.
    UdpPort,
    /// Well-known TCP port bindings.
    TcpPort,
}

/// A registered decode function: bytes plus context in, boxed layer out.
pub type DecodeFn = fn(&[u8], &DecodeCx) -> Result<Box<dyn LayerObject>, DecodeError>;

/// Per-decode-call context: strict-mode flag and remaining recursion
/// budget for nested payloads.
#[derive(Clone, Copy, Debug)]
pub struct DecodeCx {
    /// In strict mode, malformed content at a recognized code becomes an
    /// [`Illegal`] layer carrying the diagnostic instead of downgrading
    /// silently to [`Raw`].
    pub strict: bool,
    depth: usize,
}

/// Nesting deeper than this is treated as malformed rather than decoded.
/// Each layer consumes at least one byte, so the bound only triggers on
/// pathological input.
const MAX_DECODE_DEPTH: usize = 128;

impl Default for DecodeCx {
    #[inline]
    fn default() -> Self {
        DecodeCx {
            strict: false,
            depth: 0,
        }
    }
}

impl DecodeCx {
    #[inline]
    pub fn strict() -> Self {
        DecodeCx {
            strict: true,
            depth: 0,
        }
    }

    /// Context for one nesting level further down, or a `DepthExceeded`
    /// error once the defensive bound is reached.
    pub(crate) fn descend(&self, layer: &'static str) -> Result<DecodeCx, DecodeError> {
        if self.depth >= MAX_DECODE_DEPTH {
            Err(DecodeError {
                layer,
                class: DecodeErrorClass::DepthExceeded,
                reason: "payload nesting exceeds the maximum decode depth",
            })
        } else {
            Ok(DecodeCx {
                strict: self.strict,
                depth: self.depth + 1,
            })
        }
    }
}

static DISPATCH_TABLE: Lazy<RwLock<HashMap<(Registry, u32), DecodeFn>>> =
    Lazy::new(|| RwLock::new(default_table()));

fn default_table() -> HashMap<(Registry, u32), DecodeFn> {
    use crate::nums::{EtherType, IpProto, LinkType};

    let mut table: HashMap<(Registry, u32), DecodeFn> = HashMap::new();

    table.insert(
        (Registry::Link, LinkType::En10Mb.value() as u32),
        layers::l2::decode_ether,
    );
    table.insert(
        (Registry::Link, LinkType::Raw.value() as u32),
        layers::ip::decode_ip_auto,
    );
    table.insert(
        (Registry::Link, LinkType::Ieee80211.value() as u32),
        layers::dot11::decode_dot11,
    );
    table.insert(
        (Registry::Link, LinkType::Radiotap.value() as u32),
        layers::radiotap::decode_radiotap,
    );

    table.insert(
        (Registry::Ether, EtherType::Ipv4.value() as u32),
        layers::ip::decode_ipv4,
    );
    table.insert(
        (Registry::Ether, EtherType::Ipv6.value() as u32),
        layers::ip::decode_ipv6,
    );
    table.insert(
        (Registry::Ether, EtherType::Arp.value() as u32),
        layers::arp::decode_arp,
    );
    table.insert(
        (Registry::Ether, EtherType::Dot1q.value() as u32),
        layers::l2::decode_dot1q,
    );
    table.insert(
        (Registry::Ether, EtherType::QinQ.value() as u32),
        layers::l2::decode_dot1q,
    );

    table.insert(
        (Registry::IpProto, IpProto::HopByHop.value() as u32),
        layers::ip::decode_ipv6_hop_by_hop,
    );
    table.insert(
        (Registry::IpProto, IpProto::Icmp.value() as u32),
        layers::icmp::decode_icmpv4,
    );
    table.insert(
        (Registry::IpProto, IpProto::Tcp.value() as u32),
        layers::tcp::decode_tcp,
    );
    table.insert(
        (Registry::IpProto, IpProto::Udp.value() as u32),
        layers::udp::decode_udp,
    );
    table.insert(
        (Registry::IpProto, IpProto::Ipv6Route.value() as u32),
        layers::ip::decode_ipv6_routing,
    );
    table.insert(
        (Registry::IpProto, IpProto::Ipv6Frag.value() as u32),
        layers::ip::decode_ipv6_fragment,
    );
    table.insert(
        (Registry::IpProto, IpProto::Icmpv6.value() as u32),
        layers::icmp::decode_icmpv6,
    );
    table.insert(
        (Registry::IpProto, IpProto::Ipv6DestOpts.value() as u32),
        layers::ip::decode_ipv6_dest_options,
    );
    table.insert(
        (Registry::IpProto, IpProto::Sctp.value() as u32),
        layers::sctp::decode_sctp,
    );

    table.insert((Registry::UdpPort, 53), layers::dns::decode_dns);
    table.insert((Registry::UdpPort, 2123), layers::gtp::decode_gtp);
    table.insert((Registry::UdpPort, 2152), layers::gtp::decode_gtp);

    table
}

fn read_table() -> std::sync::RwLockReadGuard<'static, HashMap<(Registry, u32), DecodeFn>> {
    match DISPATCH_TABLE.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Registers `decoder` for `code` within `registry`, replacing any
/// previous binding and returning it.
///
/// Registration is synchronized; it is intended for a single-threaded
/// startup phase but remains safe (if briefly blocking) at runtime.
pub fn register(registry: Registry, code: u32, decoder: DecodeFn) -> Option<DecodeFn> {
    let mut table = match DISPATCH_TABLE.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    table.insert((registry, code), decoder)
}

/// Looks up the decoder registered for `code`, without any fallback.
pub fn lookup(registry: Registry, code: u32) -> Option<DecodeFn> {
    read_table().get(&(registry, code)).copied()
}

/// Runs `decoder` over `bytes`, degrading failures per the fallback
/// policy: malformed content yields [`Illegal`] in strict mode and
/// [`Raw`] otherwise. Never fails and never returns an empty node for
/// non-empty input.
pub(crate) fn run_decoder(
    decoder: DecodeFn,
    bytes: &[u8],
    cx: &DecodeCx,
) -> Box<dyn LayerObject> {
    let result = cx
        .descend("payload")
        .and_then(|nested| decoder(bytes, &nested));
    match result {
        Ok(layer) => layer,
        Err(err) if cx.strict => Box::new(Illegal::new(err, bytes)),
        Err(_) => Box::new(Raw::from(bytes)),
    }
}

/// Selects and invokes the decoder for `code`, wrapping the bytes as a
/// [`Raw`] layer when no decoder is registered.
pub(crate) fn dispatch(
    registry: Registry,
    code: u32,
    bytes: &[u8],
    cx: &DecodeCx,
) -> Box<dyn LayerObject> {
    match lookup(registry, code) {
        Some(decoder) => run_decoder(decoder, bytes, cx),
        None => Box::new(Raw::from(bytes)),
    }
}

/// Port-pair dispatch for the transport layers: tries the destination
/// port binding first, then the source port, then falls back to
/// [`Raw`].
pub(crate) fn dispatch_ports(
    registry: Registry,
    dport: u16,
    sport: u16,
    bytes: &[u8],
    cx: &DecodeCx,
) -> Box<dyn LayerObject> {
    match lookup(registry, dport as u32).or_else(|| lookup(registry, sport as u32)) {
        Some(decoder) => run_decoder(decoder, bytes, cx),
        None => Box::new(Raw::from(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_code_yields_raw_with_original_bytes() {
        let bytes = [0xAB, 0xCD, 0xEF];
        let layer = dispatch(Registry::Ether, 0xFFFF, &bytes, &DecodeCx::default());
        assert_eq!(layer.layer_name(), "Raw");
        assert_eq!(layer.to_bytes(), bytes.to_vec());
    }

    #[test]
    fn depth_budget_is_enforced() {
        let cx = DecodeCx::default();
        let mut nested = cx;
        for _ in 0..MAX_DECODE_DEPTH {
            nested = nested.descend("Test").unwrap();
        }
        let err = nested.descend("Test").unwrap_err();
        assert_eq!(err.class, DecodeErrorClass::DepthExceeded);
    }

    #[test]
    fn registration_replaces_and_returns_previous_binding() {
        fn reject(_: &[u8], _: &DecodeCx) -> Result<Box<dyn LayerObject>, DecodeError> {
            Err(DecodeError {
                layer: "Test",
                class: DecodeErrorClass::InvalidValue,
                reason: "always rejects",
            })
        }

        assert!(register(Registry::TcpPort, 65000, reject).is_none());
        let prev = register(Registry::TcpPort, 65000, reject);
        assert!(prev.is_some());

        // A rejecting decoder degrades to Raw outside strict mode...
        let bytes = [1, 2, 3, 4];
        let layer = dispatch(Registry::TcpPort, 65000, &bytes, &DecodeCx::default());
        assert_eq!(layer.layer_name(), "Raw");

        // ...and surfaces as Illegal in strict mode.
        let layer = dispatch(Registry::TcpPort, 65000, &bytes, &DecodeCx::strict());
        assert_eq!(layer.layer_name(), "Illegal");
        assert_eq!(layer.to_bytes(), bytes.to_vec());
    }
}
