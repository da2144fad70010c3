//! Network and DNS helpers used by manifest validation

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 network in CIDR notation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Parse `a.b.c.d/n`. Host bits must be zero.
    pub fn parse(s: &str) -> Result<Self, String> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| format!("{:?} is not in CIDR notation", s))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| format!("{:?} has an invalid IPv4 address", s))?;
        let prefix: u8 = prefix
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| format!("{:?} has an invalid prefix length", s))?;

        let cidr = Self {
            network: addr,
            prefix,
        };
        if u32::from(addr) & !cidr.mask() != 0 {
            return Err(format!("{:?} has host bits set", s));
        }
        Ok(cidr)
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    fn mask(&self) -> u32 {
        if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - self.prefix)
        }
    }

    fn first(&self) -> u32 {
        u32::from(self.network)
    }

    fn last(&self) -> u32 {
        self.first() | !self.mask()
    }

    /// True if `other` lies entirely inside this network
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.prefix >= self.prefix && (other.first() & self.mask()) == self.first()
    }

    /// True if the two networks share any address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() <= other.last() && other.first() <= self.last()
    }
}

impl FromStr for Ipv4Cidr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Validate a single DNS label (RFC 1123): lowercase alphanumerics and
/// hyphens, at most 63 characters, no leading or trailing hyphen.
pub fn validate_dns_label(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s.len() > 63 {
        return Err(format!("{:?} is longer than 63 characters", s));
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(format!(
            "{:?} must contain only lowercase alphanumerics and hyphens",
            s
        ));
    }
    if s.starts_with('-') || s.ends_with('-') {
        return Err(format!("{:?} must not start or end with a hyphen", s));
    }
    Ok(())
}

/// Validate a fully qualified DNS name: at least two labels, at most 253
/// characters. Upper case is accepted and compared case-insensitively.
pub fn validate_dns_name(s: &str) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s.len() > 253 {
        return Err(format!("{:?} is longer than 253 characters", s));
    }
    let lower = s.to_ascii_lowercase();
    let labels: Vec<&str> = lower.split('.').collect();
    if labels.len() < 2 {
        return Err(format!("{:?} must contain at least two labels", s));
    }
    for label in labels {
        validate_dns_label(label).map_err(|e| format!("{:?}: label {}", s, e))?;
    }
    Ok(())
}
