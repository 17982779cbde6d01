use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// The scheme for addresses of a `flowerdb_server`.
pub const TCP_SCHEME: &str = "flowerdb://";

/// The scheme selecting a fresh in-process store.
pub const MEMORY_SCHEME: &str = "mem://";

/// Where a client should find its store.
///
/// Parsed from `mem://`, `flowerdb://host:port[/]` or a bare `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    Memory,
    Tcp { host: String, port: u16 },
}

impl FromStr for Address {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::InvalidAddress(s.to_string());
        let trimmed = s.trim();
        if trimmed == MEMORY_SCHEME || trimmed == "mem" {
            return Ok(Address::Memory);
        }

        let rest = trimmed.strip_prefix(TCP_SCHEME).unwrap_or(trimmed);
        if rest.contains("://") {
            return Err(invalid());
        }
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || host.contains('/') {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(Address::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Memory => write!(f, "{}", MEMORY_SCHEME),
            Address::Tcp { host, port } => write!(f, "{}{}:{}", TCP_SCHEME, host, port),
        }
    }
}
