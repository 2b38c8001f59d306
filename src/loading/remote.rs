//! Remote (http/https) sources.

use std::net::{IpAddr, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;
use url::{Host, Url};

use crate::error::{Result, VisualDataError};

/// True for `http://` and `https://` sources.
pub fn is_remote(source: &str) -> bool {
    let lower = source.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().map_or(false, |v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}

/// Parse and vet a remote source.
///
/// Only http/https URLs with a host are accepted. Unless `allow_private`,
/// hosts that are or resolve to loopback, private or link-local addresses
/// are refused.
pub fn validate_url(source: &str, allow_private: bool) -> Result<Url> {
    let url = Url::parse(source.trim())
        .map_err(|e| VisualDataError::SourceUnreachable(format!("invalid URL '{}': {}", source, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(VisualDataError::AccessDenied(format!(
            "scheme '{}' is not allowed",
            url.scheme()
        )));
    }
    let host = url
        .host()
        .ok_or_else(|| VisualDataError::SourceUnreachable(format!("URL '{}' has no host", source)))?;
    if allow_private {
        return Ok(url);
    }
    let host_label = host.to_string();

    let addresses: Vec<IpAddr> = match host {
        Host::Ipv4(v4) => vec![IpAddr::V4(v4)],
        Host::Ipv6(v6) => vec![IpAddr::V6(v6)],
        Host::Domain(domain) => {
            if domain.eq_ignore_ascii_case("localhost") {
                return Err(VisualDataError::AccessDenied(format!("host '{}' is private", domain)));
            }
            let port = url.port_or_known_default().unwrap_or(80);
            (domain, port)
                .to_socket_addrs()
                .map_err(|e| {
                    VisualDataError::SourceUnreachable(format!("cannot resolve '{}': {}", domain, e))
                })?
                .map(|addr| addr.ip())
                .collect()
        }
    };
    if let Some(ip) = addresses.into_iter().find(|ip| is_private_ip(*ip)) {
        return Err(VisualDataError::AccessDenied(format!(
            "host '{}' resolves to a private address ({})",
            host_label, ip
        )));
    }
    Ok(url)
}

/// Fetch the body of a remote source.
///
/// Redirects are not followed: the target of a redirect never went through
/// [`validate_url`], so a 3xx answer is reported as unreachable.
pub fn fetch(url: &Url, timeout: Duration) -> Result<Vec<u8>> {
    debug!(url = %url, timeout_secs = timeout.as_secs(), "Fetching remote source");
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| VisualDataError::Internal(format!("http client: {}", e)))?;
    let response = client
        .get(url.clone())
        .send()
        .map_err(|e| VisualDataError::SourceUnreachable(format!("{}: {}", url, e)))?;
    let status = response.status();
    if !status.is_success() {
        return Err(VisualDataError::SourceUnreachable(format!(
            "{} answered with status {}",
            url, status
        )));
    }
    let bytes = response
        .bytes()
        .map_err(|e| VisualDataError::SourceUnreachable(format!("{}: {}", url, e)))?;
    Ok(bytes.to_vec())
}
