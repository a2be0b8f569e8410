// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end scenarios exercising multi-layer composition, the
//! dispatcher fallback chain, and the build-time correction policies.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr};

use macaddr::MacAddr6;

use pdus::dispatch::{self, Registry};
use pdus::layers::arp::Arp;
use pdus::layers::ip::Ipv4;
use pdus::layers::l2::Ether;
use pdus::layers::tcp::Tcp;
use pdus::layers::tls::{self, Tls};
use pdus::layers::udp::Udp;
use pdus::layers::{Illegal, Raw};
use pdus::nums::{ArpOperation, EtherType, IpProto, LinkType};
use pdus::prelude::*;

#[test]
fn arp_request_over_ethernet_round_trips() {
    let sender_mac = MacAddr6::new(0x00, 0x1B, 0x44, 0x11, 0x3A, 0xB7);
    let arp = Arp::builder()
        .sender_mac(sender_mac)
        .sender_ipv4(Ipv4Addr::new(192, 168, 1, 10))
        .target_ipv4(Ipv4Addr::new(192, 168, 1, 1))
        .operation(ArpOperation::Request)
        .build()
        .unwrap();

    let frame = Ether::builder()
        .dst(MacAddr6::broadcast())
        .src(sender_mac)
        .eth_type(EtherType::Arp)
        .payload(arp.clone())
        .build()
        .unwrap();

    let wire = frame.to_bytes();
    let packet = pdus::decode(&wire, 0, wire.len(), LinkType::En10Mb).unwrap();

    assert_eq!(packet.to_bytes(), wire);
    let decoded_frame: &Ether = packet.get_layer().unwrap();
    assert_eq!(decoded_frame, &frame);

    let decoded_arp: &Arp = decoded_frame.get_layer().unwrap();
    assert_eq!(decoded_arp, &arp);
    assert_eq!(decoded_arp.header().operation(), ArpOperation::Request);
    assert_eq!(decoded_arp.header().sender_mac(), Some(sender_mac));
}

#[test]
fn udp_over_ipv4_checksum_correction() {
    let src = Ipv4Addr::new(10, 0, 0, 1);
    let dst = Ipv4Addr::new(10, 0, 0, 99);

    let udp = Udp::builder()
        .sport(33000)
        .dport(33001)
        .payload(Raw::from(b"correct me".to_vec()))
        .chksum(0)
        .addrs(IpAddr::V4(src), IpAddr::V4(dst))
        .correct_length(true)
        .correct_chksum(true)
        .build()
        .unwrap();

    assert_ne!(udp.header().chksum(), 0);
    assert!(udp.has_valid_chksum(IpAddr::V4(src), IpAddr::V4(dst), false));

    let ip = Ipv4::builder()
        .protocol(IpProto::Udp)
        .src(src)
        .dst(dst)
        .payload(udp)
        .correct_length(true)
        .correct_chksum(true)
        .build()
        .unwrap();

    assert!(ip.has_valid_chksum());

    // The corrections survive a wire round-trip.
    let decoded = Ipv4::from_bytes(&ip.to_bytes()).unwrap();
    assert_eq!(decoded, ip);
    let udp: &Udp = decoded.get_layer().unwrap();
    assert!(udp.has_valid_chksum(IpAddr::V4(src), IpAddr::V4(dst), false));
}

/// A TCP segment whose option region (4 declared bytes) contains an MSS
/// option claiming 12 bytes.
fn frame_with_overrunning_tcp_option() -> Vec<u8> {
    let mut tcp = vec![
        0x00, 0x50, 0xC0, 0x00, // ports
        0, 0, 0, 0, 0, 0, 0, 0, // seq, ack
        0x60, 0x10, // data offset 6, ACK
        0x00, 0x20, 0x00, 0x00, 0x00, 0x00, // window, checksum, urgent
    ];
    tcp.extend([0x02, 0x0C, 0x00, 0x00]); // MSS option, length 12, in 4 bytes

    let mut ip = vec![
        0x45, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x40, 0x06, 0x00, 0x00, 10, 0, 0, 1, 10,
        0, 0, 2,
    ];
    ip.extend(&tcp);
    let total = ip.len() as u16;
    ip[2..4].copy_from_slice(&total.to_be_bytes());

    let mut frame = vec![0xFF; 6];
    frame.extend([2; 6]);
    frame.extend([0x08, 0x00]);
    frame.extend(&ip);
    frame
}

#[test]
fn truncated_tlv_region_degrades_to_unknown() {
    let wire = frame_with_overrunning_tcp_option();

    // Decoding never throws past the enclosing layer: the TCP decoder
    // rejects the bytes and the IPv4 layer wraps them as Raw.
    let packet = pdus::decode(&wire, 0, wire.len(), LinkType::En10Mb).unwrap();
    assert_eq!(packet.to_bytes(), wire);

    let ip: &Ipv4 = packet.get_layer().unwrap();
    assert_eq!(ip.payload().unwrap().layer_name(), "Raw");
    assert!(packet.get_layer::<Tcp>().is_none());
}

#[test]
fn truncated_tlv_region_degrades_to_illegal_in_strict_mode() {
    let wire = frame_with_overrunning_tcp_option();

    let packet = pdus::decode_strict(&wire, 0, wire.len(), LinkType::En10Mb).unwrap();
    assert_eq!(packet.to_bytes(), wire);

    let illegal: &Illegal = packet.get_layer().unwrap();
    assert_eq!(illegal.offending_layer(), "Tcp");
    // The rejected bytes are retrievable in full.
    assert_eq!(illegal.data().len(), 24);
}

#[test]
fn unregistered_ether_type_yields_unknown_with_exact_bytes() {
    let mut wire = vec![1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 0xD0, 0x0D];
    wire.extend([0x13, 0x37, 0x42]);

    let packet = pdus::decode(&wire, 0, wire.len(), LinkType::En10Mb).unwrap();
    let raw: &Raw = packet.get_layer().unwrap();
    assert_eq!(raw.data(), &[0x13, 0x37, 0x42]);
    assert_eq!(packet.to_bytes(), wire);
}

#[test]
fn open_registry_accepts_new_port_binding() {
    // TLS is not decoded from TCP by default...
    let tls = Tls::builder()
        .record(tls::TlsRecord::new(
            pdus::nums::TlsContentType::ApplicationData,
            pdus::nums::TlsVersion::Tls12,
            tls::TlsFragment::Opaque(vec![9, 8, 7]),
        ))
        .build()
        .unwrap();
    let tcp = Tcp::builder()
        .sport(50000)
        .dport(443)
        .payload(tls)
        .correct_length(true)
        .build()
        .unwrap();
    let wire = tcp.to_bytes();

    let before = Tcp::from_bytes(&wire).unwrap();
    assert_eq!(before.payload().unwrap().layer_name(), "Raw");

    // ...until a caller registers the binding.
    dispatch::register(Registry::TcpPort, 443, tls::decode_tls);
    let after = Tcp::from_bytes(&wire).unwrap();
    assert_eq!(after.payload().unwrap().layer_name(), "Tls");
    assert_eq!(after.to_bytes(), wire);
}

#[test]
fn packets_compare_and_hash_by_serialized_bytes() {
    let a = Ether::builder()
        .dst(MacAddr6::new(1, 2, 3, 4, 5, 6))
        .eth_type(EtherType::Experimental)
        .payload(Raw::from(vec![0xAB, 0xCD]))
        .build()
        .unwrap();

    // The same bytes arrived at differently: decoded from the wire.
    let b = Ether::from_bytes(&a.to_bytes()).unwrap();
    assert_eq!(a, b);

    let hash = |e: &Ether| {
        let mut hasher = DefaultHasher::new();
        e.hash(&mut hasher);
        hasher.finish()
    };
    assert_eq!(hash(&a), hash(&b));

    let c = a.to_builder().padding(vec![0]).build().unwrap();
    assert_ne!(a, c);
}

#[test]
fn length_consistency_across_the_tree() {
    let udp = Udp::builder()
        .sport(1)
        .dport(2)
        .payload(Raw::from(vec![0x11; 9]))
        .correct_length(true)
        .build()
        .unwrap();
    let ip = Ipv4::builder()
        .protocol(IpProto::Udp)
        .payload(udp)
        .correct_length(true)
        .correct_chksum(true)
        .build()
        .unwrap();
    let frame = Ether::builder()
        .eth_type(EtherType::Ipv4)
        .payload(ip)
        .pad_to_minimum(true)
        .build()
        .unwrap();

    // len() equals the serialized length at every node, and each node's
    // length is header + payload + padding.
    let mut node: Option<&dyn LayerObject> = Some(&frame);
    while let Some(layer) = node {
        assert_eq!(layer.to_bytes().len(), layer.len());
        assert_eq!(
            layer.len(),
            layer.header_len()
                + layer.payload().map_or(0, |p| p.len())
                + layer.padding().len()
        );
        node = layer.payload();
    }

    // The decoded form preserves the padding accounting.
    let wire = frame.to_bytes();
    assert_eq!(wire.len(), 60);
    let decoded = pdus::decode(&wire, 0, wire.len(), LinkType::En10Mb).unwrap();
    assert_eq!(decoded.len(), 60);
    let ip: &Ipv4 = decoded.get_layer().unwrap();
    assert_eq!(ip.len(), 37);
    assert_eq!(decoded.padding().len(), 60 - 14 - 37);
}

#[test]
fn decode_window_bounds_are_enforced() {
    let bytes = [0u8; 32];
    assert!(pdus::decode(&bytes, 0, 32, LinkType::En10Mb).is_ok());
    assert!(pdus::decode(&bytes, 16, 17, LinkType::En10Mb).is_err());
    assert!(pdus::decode(&bytes, 33, 0, LinkType::En10Mb).is_err());
}

#[test]
fn builder_round_trip_is_identity_for_decoded_packets() {
    let wire = frame_with_overrunning_tcp_option();
    let frame = Ether::from_bytes(&wire).unwrap();
    assert_eq!(frame.to_builder().build().unwrap(), frame);

    let ip: &Ipv4 = frame.get_layer().unwrap();
    assert_eq!(ip.to_builder().build().unwrap(), *ip);
}
