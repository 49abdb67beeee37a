// ssrf.rs — SSRF defense for every HTTP/HTTPS URL reached by any handler,
// including each hop of a redirect chain.
//
// On each URL: extract and lowercase the host, resolve it (or take it
// directly if it's already an IP literal), then require that either the
// host is in the internal-mirror allowlist or every resolved address is
// global unicast (or individually allowlisted). `allow_non_global` is the
// `--allow-non-global-download-hosts` opt-out, disabling the check
// entirely.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, ToSocketAddrs};

use crate::error::NetError;

/// Hosts/IPs/CIDRs exempted from the global-unicast requirement. Hostname
/// entries with a leading `.` match as a suffix (any subdomain); all
/// others match exactly. IP entries may be a bare address or a CIDR block.
#[derive(Debug, Clone, Default)]
pub struct InternalMirrorAllowlist {
    hostname_suffixes: Vec<String>,
    exact_hostnames: Vec<String>,
    ips: Vec<IpAddr>,
    cidrs: Vec<Cidr>,
}

#[derive(Debug, Clone, Copy)]
struct Cidr {
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    fn parse(s: &str) -> Option<Self> {
        let (net, len) = s.split_once('/')?;
        let network: IpAddr = net.parse().ok()?;
        let prefix_len: u8 = len.parse().ok()?;
        Some(Self { network, prefix_len })
    }

    fn contains(&self, ip: IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let bits = self.prefix_len.min(32);
                let mask: u32 = if bits == 0 { 0 } else { !0u32 << (32 - bits) };
                (u32::from(net) & mask) == (u32::from(ip) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let bits = self.prefix_len.min(128);
                let mask: u128 = if bits == 0 { 0 } else { !0u128 << (128 - bits) };
                (u128::from(net) & mask) == (u128::from(ip) & mask)
            }
            _ => false,
        }
    }
}

impl InternalMirrorAllowlist {
    /// Parse entries as given on the `--internal-mirror-allowlist` flag
    /// (repeatable): each is a hostname (optionally `.`-prefixed for
    /// suffix matching), a bare IP, or a CIDR block.
    pub fn parse(entries: &[String]) -> Self {
        let mut allowlist = Self::default();
        for entry in entries {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            if let Some(cidr) = Cidr::parse(entry) {
                allowlist.cidrs.push(cidr);
            } else if let Ok(ip) = entry.parse::<IpAddr>() {
                allowlist.ips.push(ip);
            } else if let Some(suffix) = entry.strip_prefix('.') {
                allowlist.hostname_suffixes.push(suffix.to_lowercase());
            } else {
                allowlist.exact_hostnames.push(entry.to_lowercase());
            }
        }
        allowlist
    }

    pub fn allows_host(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.exact_hostnames.iter().any(|h| h == &host)
            || self
                .hostname_suffixes
                .iter()
                .any(|suffix| host == *suffix || host.ends_with(&format!(".{suffix}")))
    }

    pub fn allows_ip(&self, ip: IpAddr) -> bool {
        self.ips.contains(&ip) || self.cidrs.iter().any(|c| c.contains(ip))
    }
}

fn ipv4_is_global_unicast(ip: Ipv4Addr) -> bool {
    if ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
    {
        return false;
    }
    let o = ip.octets();
    if o[0] == 10 {
        return false; // 10.0.0.0/8
    }
    if o[0] == 172 && (16..=31).contains(&o[1]) {
        return false; // 172.16.0.0/12
    }
    if o[0] == 192 && o[1] == 168 {
        return false; // 192.168.0.0/16
    }
    if o[0] == 100 && (64..=127).contains(&o[1]) {
        return false; // 100.64.0.0/10 carrier-grade NAT
    }
    if o[0] >= 240 {
        return false; // 240.0.0.0/4 reserved
    }
    true
}

fn ipv6_is_global_unicast(ip: Ipv6Addr) -> bool {
    if ip.is_unspecified() || ip.is_loopback() || ip.is_multicast() {
        return false;
    }
    let s = ip.segments();
    if (s[0] & 0xfe00) == 0xfc00 {
        return false; // fc00::/7 unique local
    }
    if (s[0] & 0xffc0) == 0xfe80 {
        return false; // fe80::/10 link-local
    }
    if s[0] == 0x2001 && s[1] == 0x0db8 {
        return false; // 2001:db8::/32 documentation
    }
    if s[0] == 0 && s[1] == 0 && s[2] == 0 && s[3] == 0 && s[4] == 0 && s[5] == 0xffff {
        let v4 = Ipv4Addr::new((s[6] >> 8) as u8, (s[6] & 0xff) as u8, (s[7] >> 8) as u8, (s[7] & 0xff) as u8);
        return ipv4_is_global_unicast(v4);
    }
    true
}

/// `true` if `ip` is a global unicast address — routable on the public
/// internet, not private/loopback/link-local/documentation/reserved.
pub fn is_global_unicast(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => ipv4_is_global_unicast(v4),
        IpAddr::V6(v6) => ipv6_is_global_unicast(v6),
    }
}

/// Extract and normalize the host from a URL (lowercased, trailing dot
/// stripped).
pub fn extract_host(url: &reqwest::Url) -> Option<String> {
    url.host_str().map(|h| h.trim_end_matches('.').to_lowercase())
}

/// Validate one URL against the SSRF policy. Called on the initial request
/// and on every redirect hop.
pub fn check_url(url: &reqwest::Url, allowlist: &InternalMirrorAllowlist, allow_non_global: bool) -> Result<(), NetError> {
    if allow_non_global {
        return Ok(());
    }
    let host = extract_host(url).ok_or_else(|| NetError::BlockedHost {
        host: url.as_str().to_string(),
    })?;

    if allowlist.allows_host(&host) {
        return Ok(());
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return if is_global_unicast(ip) || allowlist.allows_ip(ip) {
            Ok(())
        } else {
            Err(NetError::BlockedIp {
                addr: ip,
                reason: "not_global".to_string(),
            })
        };
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = (host.as_str(), port).to_socket_addrs().map_err(|e| NetError::Dns {
        host: host.clone(),
        source: e,
    })?;

    let mut saw_any = false;
    for socket_addr in addrs {
        saw_any = true;
        let ip = socket_addr.ip();
        if !is_global_unicast(ip) && !allowlist.allows_ip(ip) {
            return Err(NetError::BlockedIp {
                addr: ip,
                reason: "not_global".to_string(),
            });
        }
    }
    if !saw_any {
        return Err(NetError::BlockedHost { host });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_and_private_are_not_global() {
        assert!(!is_global_unicast("127.0.0.1".parse().unwrap()));
        assert!(!is_global_unicast("10.0.0.5".parse().unwrap()));
        assert!(!is_global_unicast("172.16.0.1".parse().unwrap()));
        assert!(!is_global_unicast("192.168.1.1".parse().unwrap()));
        assert!(!is_global_unicast("169.254.1.1".parse().unwrap()));
        assert!(!is_global_unicast("::1".parse().unwrap()));
        assert!(!is_global_unicast("fe80::1".parse().unwrap()));
        assert!(!is_global_unicast("fc00::1".parse().unwrap()));
    }

    #[test]
    fn public_addresses_are_global() {
        assert!(is_global_unicast("8.8.8.8".parse().unwrap()));
        assert!(is_global_unicast("2001:4860:4860::8888".parse().unwrap()));
    }

    #[test]
    fn ip_literal_url_is_checked_directly() {
        let url = reqwest::Url::parse("http://127.0.0.1/x").unwrap();
        let allowlist = InternalMirrorAllowlist::default();
        let err = check_url(&url, &allowlist, false).unwrap_err();
        assert!(matches!(err, NetError::BlockedIp { .. }));
    }

    #[test]
    fn allow_non_global_disables_check_entirely() {
        let url = reqwest::Url::parse("http://127.0.0.1/x").unwrap();
        let allowlist = InternalMirrorAllowlist::default();
        assert!(check_url(&url, &allowlist, true).is_ok());
    }

    #[test]
    fn ip_allowlist_exempts_specific_address() {
        let url = reqwest::Url::parse("http://127.0.0.1/x").unwrap();
        let allowlist = InternalMirrorAllowlist::parse(&["127.0.0.1".to_string()]);
        assert!(check_url(&url, &allowlist, false).is_ok());
    }

    #[test]
    fn cidr_allowlist_exempts_whole_block() {
        let url = reqwest::Url::parse("http://10.1.2.3/x").unwrap();
        let allowlist = InternalMirrorAllowlist::parse(&["10.0.0.0/8".to_string()]);
        assert!(check_url(&url, &allowlist, false).is_ok());
    }

    #[test]
    fn hostname_suffix_allowlist_matches_subdomains() {
        let allowlist = InternalMirrorAllowlist::parse(&[".internal.example".to_string()]);
        assert!(allowlist.allows_host("mirror.internal.example"));
        assert!(allowlist.allows_host("internal.example"));
        assert!(!allowlist.allows_host("notinternal.example"));
    }
}
