use axum::http::Request;
use std::net::IpAddr;
use tower_governor::{key_extractor::KeyExtractor, GovernorError};

/// IP key extractor that works behind reverse proxies and in Docker.
/// Tries X-Forwarded-For, then X-Real-IP, then the peer address; requests
/// with no identifiable IP share one localhost bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackIpKeyExtractor;

impl KeyExtractor for FallbackIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let from_header = |name: &str| -> Option<IpAddr> {
            let value = req.headers().get(name)?.to_str().ok()?;
            // X-Forwarded-For may carry a chain; the first hop is the client
            value.split(',').next()?.trim().parse().ok()
        };

        if let Some(ip) = from_header("x-forwarded-for").or_else(|| from_header("x-real-ip")) {
            return Ok(ip);
        }

        if let Some(connect_info) = req
            .extensions()
            .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        {
            return Ok(connect_info.0.ip());
        }

        Ok(IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)))
    }
}
