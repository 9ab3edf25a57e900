use super::LinkError;
use std::str::FromStr;

/// Connection string of a `UdpLink`, in the familiar `udpin:`/`udpout:` notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAddress {
    /// Bind to `host:port` and answer whoever talks to us first.
    Listen(String),
    /// Send to the fixed peer `host:port` from an ephemeral local port.
    Connect(String),
}

impl LinkAddress {
    pub fn host_port(&self) -> &str {
        match self {
            LinkAddress::Listen(hp) | LinkAddress::Connect(hp) => hp.as_str(),
        }
    }
}

impl FromStr for LinkAddress {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((scheme, host_port)) = s.trim().split_once(':') else {
            return Err(LinkError::InvalidAddress(s.to_string()));
        };
        let valid_host_port = host_port
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !valid_host_port {
            return Err(LinkError::InvalidAddress(s.to_string()));
        }
        match scheme.to_lowercase().as_str() {
            // plain `udp:` listens, as ground stations usually do
            "udpin" | "udp" => Ok(LinkAddress::Listen(host_port.to_string())),
            "udpout" => Ok(LinkAddress::Connect(host_port.to_string())),
            _ => Err(LinkError::InvalidAddress(s.to_string())),
        }
    }
}
