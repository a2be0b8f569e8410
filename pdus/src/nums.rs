// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Named numbers: the symbolic enumerations carried in protocol fields.
//!
//! Every wire code that selects a protocol, option kind, message type or
//! record type is modelled as an open enumeration: one variant per
//! registered value plus an `Other` variant that preserves any
//! unregistered code verbatim, so conversion from the wire is total and
//! round-trips losslessly.

/// Declares an open named-number enumeration over a fixed-width integer.
///
/// Generates the enum with a trailing `Other(repr)` catch-all, total
/// `From` conversions in both directions, and a `name()` accessor for
/// diagnostics.
macro_rules! named_number {
    (
        $(#[$outer:meta])*
        $vis:vis enum $Name:ident($repr:ty) {
            $(
                $(#[$inner:meta])*
                $Variant:ident = $value:literal => $name:literal,
            )*
        }
    ) => {
        $(#[$outer])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        $vis enum $Name {
            $(
                $(#[$inner])*
                $Variant,
            )*
            /// A value with no registered name.
            Other($repr),
        }

        impl $Name {
            /// The wire representation of this value.
            #[inline]
            $vis fn value(self) -> $repr {
                match self {
                    $(Self::$Variant => $value,)*
                    Self::Other(value) => value,
                }
            }

            /// The registered name of this value, or `"unknown"`.
            #[inline]
            $vis fn name(self) -> &'static str {
                match self {
                    $(Self::$Variant => $name,)*
                    Self::Other(_) => "unknown",
                }
            }
        }

        impl From<$repr> for $Name {
            #[inline]
            fn from(value: $repr) -> Self {
                match value {
                    $($value => Self::$Variant,)*
                    other => Self::Other(other),
                }
            }
        }

        impl From<$Name> for $repr {
            #[inline]
            fn from(value: $Name) -> $repr {
                value.value()
            }
        }

        impl core::fmt::Display for $Name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{} ({})", self.name(), self.value())
            }
        }
    };
}

named_number! {
    /// Link-layer header type of a captured frame, as reported by the
    /// capture source. Values follow the tcpdump LINKTYPE registry.
    pub enum LinkType(u16) {
        /// BSD loopback encapsulation.
        Null = 0 => "NULL",
        En10Mb = 1 => "EN10MB (Ethernet)",
        /// Raw IP, version selected by the first nibble.
        Raw = 101 => "RAW (raw IP)",
        LinuxSll = 113 => "LINUX_SLL",
        Ieee80211 = 105 => "IEEE802_11",
        Radiotap = 127 => "IEEE802_11_RADIOTAP",
    }
}

named_number! {
    /// EtherType codes selecting the payload of an Ethernet frame or
    /// VLAN tag.
    pub enum EtherType(u16) {
        Ipv4 = 0x0800 => "IPv4",
        Arp = 0x0806 => "ARP",
        Dot1q = 0x8100 => "802.1Q VLAN",
        Ipv6 = 0x86DD => "IPv6",
        QinQ = 0x88A8 => "802.1ad Q-in-Q",
        /// Local experimental; used when a frame is built without a payload.
        Experimental = 0x88B5 => "experimental",
    }
}

impl Default for EtherType {
    /// Frames built without a payload default to the experimental type.
    #[inline]
    fn default() -> Self {
        EtherType::Experimental
    }
}

named_number! {
    /// IP protocol numbers, shared by the IPv4 protocol field and the
    /// IPv6 next-header chain.
    pub enum IpProto(u8) {
        /// IPv6 hop-by-hop options extension header.
        HopByHop = 0 => "IPv6 hop-by-hop options",
        Icmp = 1 => "ICMP",
        Tcp = 6 => "TCP",
        Udp = 17 => "UDP",
        Ipv6Route = 43 => "IPv6 routing",
        Ipv6Frag = 44 => "IPv6 fragment",
        Icmpv6 = 58 => "ICMPv6",
        /// No next header: nothing follows the extension chain.
        Ipv6NoNext = 59 => "IPv6 no next header",
        Ipv6DestOpts = 60 => "IPv6 destination options",
        Sctp = 132 => "SCTP",
        /// RFC 3692 experiment number 1.
        Exp1 = 253 => "experiment 1",
    }
}

named_number! {
    pub enum ArpHardwareType(u16) {
        Ethernet = 1 => "Ethernet",
        Ieee802 = 6 => "IEEE 802",
    }
}

named_number! {
    pub enum ArpOperation(u16) {
        Request = 1 => "REQUEST",
        Reply = 2 => "REPLY",
        RarpRequest = 3 => "RARP REQUEST",
        RarpReply = 4 => "RARP REPLY",
    }
}

named_number! {
    pub enum IcmpV4Type(u8) {
        EchoReply = 0 => "echo reply",
        DestinationUnreachable = 3 => "destination unreachable",
        SourceQuench = 4 => "source quench",
        Redirect = 5 => "redirect",
        Echo = 8 => "echo",
        TimeExceeded = 11 => "time exceeded",
        ParameterProblem = 12 => "parameter problem",
        Timestamp = 13 => "timestamp",
        TimestampReply = 14 => "timestamp reply",
    }
}

named_number! {
    pub enum IcmpV6Type(u8) {
        DestinationUnreachable = 1 => "destination unreachable",
        PacketTooBig = 2 => "packet too big",
        TimeExceeded = 3 => "time exceeded",
        ParameterProblem = 4 => "parameter problem",
        EchoRequest = 128 => "echo request",
        EchoReply = 129 => "echo reply",
        RouterSolicitation = 133 => "router solicitation",
        RouterAdvertisement = 134 => "router advertisement",
        NeighborSolicitation = 135 => "neighbor solicitation",
        NeighborAdvertisement = 136 => "neighbor advertisement",
        Redirect = 137 => "redirect",
    }
}

named_number! {
    /// NDP option types carried in ICMPv6 neighbor-discovery messages.
    pub enum NdpOptionType(u8) {
        SourceLinkLayerAddress = 1 => "source link-layer address",
        TargetLinkLayerAddress = 2 => "target link-layer address",
        PrefixInformation = 3 => "prefix information",
        RedirectedHeader = 4 => "redirected header",
        Mtu = 5 => "MTU",
    }
}

named_number! {
    pub enum TcpOptionKind(u8) {
        Eol = 0 => "end of option list",
        Nop = 1 => "no operation",
        Mss = 2 => "maximum segment size",
        WindowScale = 3 => "window scale",
        SackPermitted = 4 => "SACK permitted",
        Sack = 5 => "SACK",
        Timestamp = 8 => "timestamps",
    }
}

named_number! {
    pub enum Ipv4OptionType(u8) {
        /// End of option list; terminates the walk, remaining bytes pad.
        Eool = 0 => "end of option list",
        Nop = 1 => "no operation",
        RecordRoute = 7 => "record route",
        Timestamp = 68 => "timestamp",
        Security = 130 => "security",
        LooseSourceRoute = 131 => "loose source route",
        StrictSourceRoute = 137 => "strict source route",
    }
}

named_number! {
    /// Option types inside IPv6 hop-by-hop and destination-options
    /// extension headers.
    pub enum Ipv6OptionType(u8) {
        /// Single-byte padding; carries no length octet.
        Pad1 = 0 => "Pad1",
        PadN = 1 => "PadN",
        RouterAlert = 5 => "router alert",
        Jumbo = 0xC2 => "jumbo payload",
    }
}

named_number! {
    pub enum SctpChunkType(u8) {
        Data = 0 => "DATA",
        Init = 1 => "INIT",
        InitAck = 2 => "INIT ACK",
        Sack = 3 => "SACK",
        Heartbeat = 4 => "HEARTBEAT",
        HeartbeatAck = 5 => "HEARTBEAT ACK",
        Abort = 6 => "ABORT",
        Shutdown = 7 => "SHUTDOWN",
        ShutdownAck = 8 => "SHUTDOWN ACK",
        Error = 9 => "ERROR",
        CookieEcho = 10 => "COOKIE ECHO",
        CookieAck = 11 => "COOKIE ACK",
        ShutdownComplete = 14 => "SHUTDOWN COMPLETE",
    }
}

named_number! {
    pub enum SctpParameterType(u16) {
        HeartbeatInfo = 1 => "heartbeat info",
        Ipv4Address = 5 => "IPv4 address",
        Ipv6Address = 6 => "IPv6 address",
        StateCookie = 7 => "state cookie",
        UnrecognizedParameter = 8 => "unrecognized parameter",
        CookiePreservative = 9 => "cookie preservative",
        HostNameAddress = 11 => "host name address",
        SupportedAddressTypes = 12 => "supported address types",
    }
}

named_number! {
    pub enum DnsOpCode(u8) {
        Query = 0 => "QUERY",
        IQuery = 1 => "IQUERY",
        Status = 2 => "STATUS",
        Notify = 4 => "NOTIFY",
        Update = 5 => "UPDATE",
    }
}

named_number! {
    pub enum DnsRCode(u8) {
        NoError = 0 => "NOERROR",
        FormErr = 1 => "FORMERR",
        ServFail = 2 => "SERVFAIL",
        NxDomain = 3 => "NXDOMAIN",
        NotImp = 4 => "NOTIMP",
        Refused = 5 => "REFUSED",
    }
}

named_number! {
    /// DNS resource record types.
    pub enum DnsType(u16) {
        A = 1 => "A",
        Ns = 2 => "NS",
        Cname = 5 => "CNAME",
        Soa = 6 => "SOA",
        Ptr = 12 => "PTR",
        Mx = 15 => "MX",
        Txt = 16 => "TXT",
        Aaaa = 28 => "AAAA",
        Opt = 41 => "OPT",
        Any = 255 => "ANY",
    }
}

named_number! {
    pub enum DnsClass(u16) {
        In = 1 => "IN",
        Ch = 3 => "CH",
        Hs = 4 => "HS",
        Any = 255 => "ANY",
    }
}

named_number! {
    pub enum TlsContentType(u8) {
        ChangeCipherSpec = 20 => "change cipher spec",
        Alert = 21 => "alert",
        Handshake = 22 => "handshake",
        ApplicationData = 23 => "application data",
    }
}

named_number! {
    /// TLS record/handshake protocol versions.
    pub enum TlsVersion(u16) {
        Ssl30 = 0x0300 => "SSL 3.0",
        Tls10 = 0x0301 => "TLS 1.0",
        Tls11 = 0x0302 => "TLS 1.1",
        Tls12 = 0x0303 => "TLS 1.2",
        Tls13 = 0x0304 => "TLS 1.3",
    }
}

named_number! {
    pub enum TlsHandshakeType(u8) {
        HelloRequest = 0 => "hello request",
        ClientHello = 1 => "client hello",
        ServerHello = 2 => "server hello",
        Certificate = 11 => "certificate",
        ServerKeyExchange = 12 => "server key exchange",
        CertificateRequest = 13 => "certificate request",
        ServerHelloDone = 14 => "server hello done",
        ClientKeyExchange = 16 => "client key exchange",
        Finished = 20 => "finished",
    }
}

named_number! {
    pub enum TlsExtensionType(u16) {
        ServerName = 0 => "server name",
        SupportedGroups = 10 => "supported groups",
        Alpn = 16 => "ALPN",
        SupportedVersions = 43 => "supported versions",
        KeyShare = 51 => "key share",
    }
}

named_number! {
    /// 802.11 information element identifiers.
    pub enum Dot11ElementId(u8) {
        Ssid = 0 => "SSID",
        SupportedRates = 1 => "supported rates",
        DsParameter = 3 => "DS parameter set",
        Tim = 5 => "TIM",
        Country = 7 => "country",
        HtCapabilities = 45 => "HT capabilities",
        Rsn = 48 => "RSN",
        ExtendedRates = 50 => "extended supported rates",
        VendorSpecific = 221 => "vendor specific",
    }
}

named_number! {
    /// 802.11 management frame subtypes.
    pub enum Dot11MgmtSubtype(u8) {
        AssociationRequest = 0 => "association request",
        AssociationResponse = 1 => "association response",
        ProbeRequest = 4 => "probe request",
        ProbeResponse = 5 => "probe response",
        Beacon = 8 => "beacon",
        Disassociation = 10 => "disassociation",
        Authentication = 11 => "authentication",
        Deauthentication = 12 => "deauthentication",
    }
}

named_number! {
    pub enum GtpMessageType(u8) {
        EchoRequest = 1 => "echo request",
        EchoResponse = 2 => "echo response",
        ErrorIndication = 26 => "error indication",
        SupportedExtensionHeaders = 31 => "supported extension headers notification",
        EndMarker = 254 => "end marker",
        /// Tunnelled user payload (an encapsulated IP packet).
        GPdu = 255 => "G-PDU",
    }
}

named_number! {
    /// GTP extension-header types; `NoMore` terminates the chain.
    pub enum GtpExtensionType(u8) {
        NoMore = 0 => "no more extension headers",
        UdpPort = 0x40 => "UDP port",
        PdcpPduNumber = 0xC0 => "PDCP PDU number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_values_round_trip() {
        assert_eq!(EtherType::from(0x0800), EtherType::Ipv4);
        assert_eq!(EtherType::Ipv4.value(), 0x0800);
        assert_eq!(EtherType::Ipv4.name(), "IPv4");
        assert_eq!(u16::from(EtherType::Arp), 0x0806);
    }

    #[test]
    fn unregistered_values_are_preserved() {
        let proto = IpProto::from(200);
        assert_eq!(proto, IpProto::Other(200));
        assert_eq!(proto.value(), 200);
        assert_eq!(proto.name(), "unknown");
    }
}
