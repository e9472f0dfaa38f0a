//! IP address pattern lists.
//!
//! A pattern is a single address (`10.0.0.5`, `2001:db8::1`) or a CIDR
//! network (`10.0.0.0/8`, `2001:db8::/32`). IPv4-mapped IPv6 client
//! addresses are compared as IPv4, and IPv4 clients also match patterns
//! written in mapped form (`::ffff:10.0.0.0/104`).

use ipnetwork::IpNetwork;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid IP pattern '{pattern}': {reason}")]
pub struct IpPatternError {
    pub pattern: String,
    pub reason: String,
}

impl IpPatternError {
    fn new(pattern: &str, reason: impl Into<String>) -> Self {
        Self {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

/// A single address or network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPattern(IpNetwork);

impl IpPattern {
    /// IPv4 clients also match networks written in IPv4-mapped IPv6 form.
    pub fn matches(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();
        if self.0.contains(ip) {
            return true;
        }
        match (self.0, ip) {
            (IpNetwork::V6(net), IpAddr::V4(v4)) => net.contains(v4.to_ipv6_mapped()),
            _ => false,
        }
    }
}

impl FromStr for IpPattern {
    type Err = IpPatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IpPatternError::new(s, "empty pattern"));
        }

        let network = match trimmed.parse::<IpAddr>() {
            Ok(ip) => IpNetwork::from(ip.to_canonical()),
            Err(_) => IpNetwork::from_str(trimmed)
                .map_err(|e| IpPatternError::new(s, e.to_string()))?,
        };
        Ok(IpPattern(network))
    }
}

impl fmt::Display for IpPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.prefix() == max_prefix(self.0) {
            write!(f, "{}", self.0.ip())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn max_prefix(network: IpNetwork) -> u8 {
    match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    }
}

/// An ordered set of IP patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpList {
    patterns: Vec<IpPattern>,
}

impl IpList {
    /// Parse every pattern, failing on the first malformed one.
    pub fn parse<I, S>(patterns: I) -> Result<Self, IpPatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Parse a list file: one pattern per line, blank lines and `#` comments ignored.
    pub fn parse_lines(contents: &str) -> Result<Self, IpPatternError> {
        Self::parse(
            contents
                .lines()
                .map(|line| line.split('#').next().unwrap_or("").trim())
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn extend(&mut self, other: IpList) {
        self.patterns.extend(other.patterns);
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.patterns.iter().any(|p| p.matches(ip))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}
