use ipnet::{IpNet, Ipv4Net};
use std::net::{IpAddr, Ipv4Addr};

use crate::error::{Result, ScanError};

/// Expand a target argument into the hosts to scan.
///
/// Accepts an IPv4 range within one /24 (`192.168.1.1-192.168.1.10`), a CIDR
/// (`10.0.0.0/30`), or a single host name / IP.
pub fn expand_targets(target: &str) -> Result<Vec<String>> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ScanError::InvalidTarget("empty target".into()));
    }
    if target.contains('/') {
        let net: IpNet = target
            .parse()
            .map_err(|e| ScanError::InvalidTarget(format!("invalid CIDR {target}: {e}")))?;
        return Ok(expand_cidr_to_ips(net)
            .into_iter()
            .map(|ip| ip.to_string())
            .collect());
    }
    if looks_like_ip_range(target) {
        return expand_ip_range(target);
    }
    Ok(vec![target.to_string()])
}

fn looks_like_ip_range(target: &str) -> bool {
    target.split_once('-')
        .is_some_and(|(a, _)| a.trim().parse::<Ipv4Addr>().is_ok())
}

/// Expand `a.b.c.x-a.b.c.y` into every address from `x` to `y` inclusive.
///
/// Both ends must share the first three octets.
pub fn expand_ip_range(range: &str) -> Result<Vec<String>> {
    let (a, b) = range.split_once('-').ok_or_else(|| {
        ScanError::InvalidTarget(
            "invalid IP range format (use: 192.168.1.1-192.168.1.10)".into(),
        )
    })?;
    let start: Ipv4Addr = a
        .trim()
        .parse()
        .map_err(|_| ScanError::InvalidTarget("invalid start IP address".into()))?;
    let end: Ipv4Addr = b
        .trim()
        .parse()
        .map_err(|_| ScanError::InvalidTarget("invalid end IP address".into()))?;

    let (so, eo) = (start.octets(), end.octets());
    if so[..3] != eo[..3] {
        return Err(ScanError::InvalidTarget(
            "IP range must be in the same /24 subnet".into(),
        ));
    }
    if so[3] > eo[3] {
        return Err(ScanError::InvalidTarget(
            "start IP must be less than or equal to end IP".into(),
        ));
    }
    Ok((so[3]..=eo[3])
        .map(|last| Ipv4Addr::new(so[0], so[1], so[2], last).to_string())
        .collect())
}

/// Expand a CIDR into host addresses.
///
/// For IPv4, excludes the network and broadcast addresses.
/// IPv6 networks are not expanded and return an empty list.
pub fn expand_cidr_to_ips(cidr: IpNet) -> Vec<IpAddr> {
    match cidr {
        IpNet::V4(n4) => expand_ipv4net_hosts(n4)
            .into_iter()
            .map(IpAddr::V4)
            .collect(),
        IpNet::V6(_) => Vec::new(),
    }
}

fn expand_ipv4net_hosts(net: Ipv4Net) -> Vec<Ipv4Addr> {
    let start = u32::from(net.network());
    let end = u32::from(net.broadcast());
    if end <= start + 1 {
        return Vec::new();
    }
    (start + 1..end).map(Ipv4Addr::from).collect()
}
