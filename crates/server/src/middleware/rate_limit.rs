//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `generate_rate_limiter`: `/generate`, ~100 requests per minute per IP
//! - `auth_rate_limiter`: `/auth/*`, ~10 requests per minute per IP

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Proxy headers carrying the client IP, in order of trust.
const CLIENT_IP_HEADERS: &[&str] = &["cf-connecting-ip", "x-real-ip", "fly-client-ip"];

/// Key extractor for deployments behind Cloudflare or another proxy.
///
/// Checks `CF-Connecting-IP`, then the first `X-Forwarded-For` hop, then
/// the other proxy headers, and finally the socket peer address.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        let (first, rest) = CLIENT_IP_HEADERS.split_at(1);
        first
            .iter()
            .chain(std::iter::once(&"x-forwarded-for"))
            .chain(rest)
            .find_map(|name| header_ip(*name))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for sign-in endpoints: ~10 requests per minute per IP.
///
/// Replenishes one token every 6 seconds with a burst of 5.
///
/// # Panics
///
/// Never: both settings are non-zero constants.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config))
}

/// Rate limiter for generation: ~100 requests per minute per IP.
///
/// Replenishes one token every 600 ms with a burst of 20. Each request costs
/// a provider call, so this is tighter than a plain API limit.
///
/// # Panics
///
/// Never: both settings are non-zero constants.
#[must_use]
pub fn generate_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_millisecond(600)
        .burst_size(20)
        .finish()
        .expect("rate limiter config with per_millisecond(600) and burst_size(20) is valid");
    GovernorLayer::new(Arc::new(config))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn extract(req: &Request<()>) -> Option<IpAddr> {
        ClientIpKeyExtractor.extract(req).ok()
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let req = Request::builder()
            .header("x-forwarded-for", "10.0.0.1")
            .header("cf-connecting-ip", "203.0.113.7")
            .body(())
            .unwrap();
        assert_eq!(extract(&req), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_first_forwarded_hop() {
        let req = Request::builder()
            .header("x-forwarded-for", "198.51.100.2, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(extract(&req), Some("198.51.100.2".parse().unwrap()));
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 9], 4000))));
        assert_eq!(extract(&req), Some("192.0.2.9".parse().unwrap()));
    }

    #[test]
    fn test_no_source_is_error() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(extract(&req), None);
    }
}
