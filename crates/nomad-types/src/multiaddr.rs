use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::TypeError;

/// A single component of a [`Multiaddr`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Ip4(Ipv4Addr),
    Ip6(Ipv6Addr),
    Dns(String),
    Dns4(String),
    Dns6(String),
    Tcp(u16),
    Udp(u16),
    /// Peer identity. `/ipfs/<id>` is accepted and normalized to this.
    P2p(String),
    Quic,
    QuicV1,
    Ws,
    Wss,
    Http,
    Https,
    P2pCircuit,
    WebTransport,
}

impl Protocol {
    /// Protocol name as it appears in the text form.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ip4(_) => "ip4",
            Self::Ip6(_) => "ip6",
            Self::Dns(_) => "dns",
            Self::Dns4(_) => "dns4",
            Self::Dns6(_) => "dns6",
            Self::Tcp(_) => "tcp",
            Self::Udp(_) => "udp",
            Self::P2p(_) => "p2p",
            Self::Quic => "quic",
            Self::QuicV1 => "quic-v1",
            Self::Ws => "ws",
            Self::Wss => "wss",
            Self::Http => "http",
            Self::Https => "https",
            Self::P2pCircuit => "p2p-circuit",
            Self::WebTransport => "webtransport",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name())?;
        match self {
            Self::Ip4(ip) => write!(f, "/{ip}"),
            Self::Ip6(ip) => write!(f, "/{ip}"),
            Self::Dns(host) | Self::Dns4(host) | Self::Dns6(host) => write!(f, "/{host}"),
            Self::Tcp(port) | Self::Udp(port) => write!(f, "/{port}"),
            Self::P2p(id) => write!(f, "/{id}"),
            _ => Ok(()),
        }
    }
}

/// A validated network address in multiaddr text form, such as
/// `/ip4/127.0.0.1/tcp/4001`.
///
/// Parsing normalizes the address (`/ipfs/` becomes `/p2p/`, IP literals are
/// re-rendered canonically), and equality is defined on the normalized
/// components. Two addresses that print the same are the same address.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Multiaddr {
    components: Vec<Protocol>,
}

impl Multiaddr {
    /// Parse and normalize a multiaddr string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidMultiaddr {
            addr: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;
        if rest.is_empty() {
            return Err(invalid("no protocol components"));
        }

        let mut parts = rest.split('/');
        let mut components = Vec::new();
        while let Some(name) = parts.next() {
            let mut value = |proto: &str| {
                parts
                    .next()
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| invalid(&format!("missing value for /{proto}")))
            };
            let component = match name {
                "ip4" => Protocol::Ip4(
                    value("ip4")?
                        .parse()
                        .map_err(|_| invalid("invalid ip4 address"))?,
                ),
                "ip6" => Protocol::Ip6(
                    value("ip6")?
                        .parse()
                        .map_err(|_| invalid("invalid ip6 address"))?,
                ),
                "dns" => Protocol::Dns(value("dns")?.to_ascii_lowercase()),
                "dns4" => Protocol::Dns4(value("dns4")?.to_ascii_lowercase()),
                "dns6" => Protocol::Dns6(value("dns6")?.to_ascii_lowercase()),
                "tcp" => Protocol::Tcp(
                    value("tcp")?
                        .parse()
                        .map_err(|_| invalid("invalid tcp port"))?,
                ),
                "udp" => Protocol::Udp(
                    value("udp")?
                        .parse()
                        .map_err(|_| invalid("invalid udp port"))?,
                ),
                "p2p" | "ipfs" => Protocol::P2p(value(name)?.to_string()),
                "quic" => Protocol::Quic,
                "quic-v1" => Protocol::QuicV1,
                "ws" => Protocol::Ws,
                "wss" => Protocol::Wss,
                "http" => Protocol::Http,
                "https" => Protocol::Https,
                "p2p-circuit" => Protocol::P2pCircuit,
                "webtransport" => Protocol::WebTransport,
                "" => return Err(invalid("empty protocol component")),
                other => return Err(invalid(&format!("unsupported protocol {other:?}"))),
            };
            components.push(component);
        }

        Ok(Self { components })
    }

    /// The normalized components, outermost first.
    pub fn components(&self) -> &[Protocol] {
        &self.components
    }

    /// The peer identity carried by a trailing `/p2p/<id>`, if any.
    pub fn peer_id(&self) -> Option<&str> {
        self.components.iter().rev().find_map(|p| match p {
            Protocol::P2p(id) => Some(id.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.components {
            write!(f, "{component}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Multiaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiaddr({self})")
    }
}

impl FromStr for Multiaddr {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Multiaddr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Multiaddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MultiaddrVisitor;

        impl Visitor<'_> for MultiaddrVisitor {
            type Value = Multiaddr;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a multiaddr string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Multiaddr, E> {
                Multiaddr::parse(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(MultiaddrVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_ip4_tcp() {
        let addr = Multiaddr::parse("/ip4/127.0.0.1/tcp/4001").unwrap();
        assert_eq!(
            addr.components(),
            &[Protocol::Ip4(Ipv4Addr::LOCALHOST), Protocol::Tcp(4001)]
        );
        assert_eq!(addr.to_string(), "/ip4/127.0.0.1/tcp/4001");
    }

    #[test]
    fn ipfs_is_normalized_to_p2p() {
        let a = Multiaddr::parse("/ip4/10.0.0.1/tcp/1/ipfs/QmPeer").unwrap();
        let b = Multiaddr::parse("/ip4/10.0.0.1/tcp/1/p2p/QmPeer").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "/ip4/10.0.0.1/tcp/1/p2p/QmPeer");
        assert_eq!(a.peer_id(), Some("QmPeer"));
    }

    #[test]
    fn ip6_is_rendered_canonically() {
        let a = Multiaddr::parse("/ip6/0:0:0:0:0:0:0:1/udp/9/quic-v1").unwrap();
        assert_eq!(a.to_string(), "/ip6/::1/udp/9/quic-v1");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "/",
            "ip4/1.2.3.4",
            "/ip4/999.1.1.1",
            "/ip4/1.2.3.4/tcp",
            "/ip4/1.2.3.4/tcp/70000",
            "/ip4/1.2.3.4//tcp/1",
            "/carrier-pigeon/1",
        ] {
            assert!(Multiaddr::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn serde_roundtrip_as_string() {
        let addr = Multiaddr::parse("/dns4/Example.COM/tcp/443/wss").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"/dns4/example.com/tcp/443/wss\"");
        let parsed: Multiaddr = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, parsed);
    }

    proptest! {
        #[test]
        fn display_then_parse_is_identity(
            a in any::<u8>(),
            b in any::<u8>(),
            c in any::<u8>(),
            d in any::<u8>(),
            port in any::<u16>(),
        ) {
            let text = format!("/ip4/{a}.{b}.{c}.{d}/tcp/{port}");
            let addr = Multiaddr::parse(&text).unwrap();
            prop_assert_eq!(addr.to_string(), text);
        }
    }
}
