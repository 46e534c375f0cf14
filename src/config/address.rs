//! Listen address parsing
//!
//! Accepts the short `":port"` form meaning "every IPv4 interface", plain
//! socket addresses, and `host:port` pairs that need name resolution.

use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

use crate::error::{Result, ServerError};

/// Resolve a listen address string into a socket address
///
/// | Input              | Result             |
/// |--------------------|--------------------|
/// | `:8080`            | `0.0.0.0:8080`     |
/// | `127.0.0.1:9000`   | `127.0.0.1:9000`   |
/// | `[::1]:8080`       | `[::1]:8080`       |
/// | `localhost:8080`   | first resolved     |
pub fn resolve_listen_addr(listen: &str) -> Result<SocketAddr> {
    let listen = listen.trim();
    let invalid = |reason: &str| ServerError::InvalidAddress {
        addr: listen.to_string(),
        reason: reason.to_string(),
    };

    let Some((host, port)) = listen.rsplit_once(':') else {
        return Err(invalid("expected host:port or :port"));
    };

    let port: u16 = port
        .parse()
        .map_err(|_| invalid(&format!("invalid port '{port}'")))?;

    if host.is_empty() {
        return Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
    }

    if let Ok(addr) = listen.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // Bracketed hosts that failed to parse above are not valid IPv6 literals
    if host.starts_with('[') {
        return Err(invalid("invalid IPv6 literal"));
    }

    (host, port)
        .to_socket_addrs()
        .map_err(|e| invalid(&format!("cannot resolve host '{host}': {e}")))?
        .next()
        .ok_or_else(|| invalid(&format!("host '{host}' resolved to no addresses")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv6Addr};

    #[test]
    fn test_port_only_listens_on_all_interfaces() {
        let addr = resolve_listen_addr(":8080").unwrap();
        assert_eq!(addr, SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)));
    }

    #[test]
    fn test_explicit_ipv4() {
        let addr = resolve_listen_addr("127.0.0.1:9000").unwrap();
        assert_eq!(addr, SocketAddr::from((Ipv4Addr::LOCALHOST, 9000)));
    }

    #[test]
    fn test_explicit_ipv6() {
        let addr = resolve_listen_addr("[::1]:8080").unwrap();
        assert_eq!(addr.ip(), IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_hostname_resolves() {
        let addr = resolve_listen_addr("localhost:0").unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 0);
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let addr = resolve_listen_addr("  :80 ").unwrap();
        assert_eq!(addr.port(), 80);
    }

    #[test]
    fn test_rejects_missing_port() {
        assert!(matches!(
            resolve_listen_addr("8080"),
            Err(ServerError::InvalidAddress { .. })
        ));
        assert!(resolve_listen_addr("").is_err());
    }

    #[test]
    fn test_rejects_bad_port() {
        let err = resolve_listen_addr(":http").unwrap_err();
        assert!(err.to_string().contains("invalid port 'http'"));
        assert!(resolve_listen_addr(":70000").is_err());
    }

    #[test]
    fn test_rejects_bad_ipv6_literal() {
        assert!(resolve_listen_addr("[::zz]:80").is_err());
    }
}
