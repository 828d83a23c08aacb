//! Client identification
//!
//! Sessions are bound to a User-Agent hash; anonymous API traffic is rate
//! limited by client IP.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

use crate::crypto::sha256;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";

/// Client fingerprint derived from request headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFingerprint {
    /// SHA-256 of the User-Agent header (empty string when absent)
    pub hash: [u8; 32],
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

impl ClientFingerprint {
    pub fn from_headers(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Self {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            hash: sha256(user_agent.as_deref().unwrap_or_default().as_bytes()),
            ip: extract_client_ip(headers, direct_ip),
            user_agent,
        }
    }

    /// Whether a stored fingerprint hash belongs to this client
    pub fn matches(&self, stored: &[u8]) -> bool {
        crate::crypto::constant_time_eq(&self.hash, stored)
    }

    pub fn hash_vec(&self) -> Vec<u8> {
        self.hash.to_vec()
    }

    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

/// Client IP address
///
/// The first entry of X-Forwarded-For wins, then X-Real-IP, then the
/// connection address.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());

    forwarded
        .or_else(|| {
            headers
                .get(REAL_IP)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
        })
        .or(direct_ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_fingerprint_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 Test Browser"),
        );

        let fp = ClientFingerprint::from_headers(&headers, None);
        assert_eq!(fp.hash, sha256(b"Mozilla/5.0 Test Browser"));
        assert_eq!(fp.user_agent.as_deref(), Some("Mozilla/5.0 Test Browser"));
        assert!(fp.matches(&sha256(b"Mozilla/5.0 Test Browser")));
        assert!(!fp.matches(&sha256(b"curl/8.0")));
    }

    #[test]
    fn test_fingerprint_without_user_agent() {
        let fp = ClientFingerprint::from_headers(&HeaderMap::new(), None);
        assert_eq!(fp.hash, sha256(b""));
        assert!(fp.user_agent.is_none());
    }

    #[test]
    fn test_extract_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(FORWARDED_FOR, HeaderValue::from_static("192.168.1.1, 10.0.0.1"));
        headers.insert(REAL_IP, HeaderValue::from_static("10.9.9.9"));

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert(REAL_IP, HeaderValue::from_static("10.9.9.9"));
        assert_eq!(
            extract_client_ip(&headers, None),
            Some("10.9.9.9".parse().unwrap())
        );

        let direct: IpAddr = "127.0.0.1".parse().unwrap();
        assert_eq!(extract_client_ip(&HeaderMap::new(), Some(direct)), Some(direct));
    }
}
