//! Guard against fetching internal addresses on behalf of a caller.

use std::net::{IpAddr, Ipv6Addr};

use reqwest::Url;
use tokio::net::lookup_host;

/// Check that `url` points at a public http(s) host.
///
/// Literal IPs, well-known internal hostnames and every address the name resolves to are
/// checked against private ranges unless `allow_private_ips` is set. When an allowlist
/// is given the host must equal one of its entries or be a subdomain of one.
pub async fn validate_remote_url(
    url: &Url,
    allow_private_ips: bool,
    allowlist: Option<&[String]>,
) -> Result<(), String> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("Unsupported URL scheme: {}", url.scheme()));
    }

    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_lowercase())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| "URL must have a host".to_string())?;

    if let Some(allowed) = allowlist {
        let permitted = allowed.iter().any(|domain| {
            let domain = domain.to_lowercase();
            host == domain || host.ends_with(&format!(".{}", domain))
        });
        if !permitted {
            return Err(format!("Host '{}' is not in the upload allowlist", host));
        }
    }

    if allow_private_ips {
        return Ok(());
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err("Private or internal IP addresses are not allowed".to_string());
        }
    }

    if host == "localhost"
        || host.ends_with(".localhost")
        || host.ends_with(".local")
        || host.ends_with(".internal")
    {
        return Err("Internal hostnames are not allowed".to_string());
    }

    let port = url.port_or_known_default().unwrap_or(80);
    match lookup_host((host.as_str(), port)).await {
        Ok(addrs) => {
            for addr in addrs {
                if is_private_ip(&addr.ip()) {
                    return Err(format!(
                        "Host resolves to a private address: {}",
                        addr.ip()
                    ));
                }
            }
        }
        Err(e) => {
            // The request itself will fail if the name really does not resolve.
            tracing::warn!(host = %host, error = %e, "Failed to resolve host during URL validation");
        }
    }

    Ok(())
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_multicast()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.octets()[0] == 0
                // 100.64.0.0/10 carrier-grade NAT
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64)
        }
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || is_unicast_link_local(v6)
                || is_unique_local(v6)
        }
    }
}

// fe80::/10
fn is_unicast_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

// fc00::/7
fn is_unique_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xfe00 == 0xfc00
}
