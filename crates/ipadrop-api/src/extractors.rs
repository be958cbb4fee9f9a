//! # Request Context Extractors
//!
//! - [`PublicOrigin`]: scheme and host used to build the URLs handed back
//!   to clients, taken from forwarded headers when a proxy sets them.
//! - [`Requester`]: user-agent and socket address recorded with access
//!   events.
//! - [`extract_multipart`]: maps a rejected multipart body onto [`AppError`]
//!   so clients get the structured error body.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{ConnectInfo, FromRequestParts, Multipart};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use ipadrop_core::Slug;

use crate::config::AppConfig;
use crate::error::AppError;

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Public scheme and host of this service as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicOrigin {
    pub scheme: String,
    pub host: String,
}

impl PublicOrigin {
    /// Host: `X-Forwarded-Host`, then `Host`, then the configured default.
    /// Scheme: `X-Forwarded-Proto`, then the configured default.
    pub fn from_headers(headers: &HeaderMap, config: &AppConfig) -> Self {
        let host = first_value(headers, X_FORWARDED_HOST)
            .or_else(|| first_value(headers, header::HOST.as_str()))
            .unwrap_or_else(|| config.public_host.clone());
        let scheme = first_value(headers, X_FORWARDED_PROTO)
            .unwrap_or_else(|| config.public_scheme.clone());
        Self { scheme, host }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }

    /// Direct download URL for a slug.
    pub fn download_url(&self, slug: &Slug) -> String {
        format!("{}/ipa/{}", self.base_url(), slug)
    }

    /// Landing page URL for a slug.
    pub fn install_url(&self, slug: &Slug) -> String {
        format!("{}/l/{}", self.base_url(), slug)
    }
}

/// First comma-separated entry of a header, trimmed, if non-empty.
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Unwrap a multipart extraction, turning a rejection into a 400.
///
/// Usage in handlers:
/// ```ignore
/// async fn handler(body: Result<Multipart, MultipartRejection>) -> Result<..., AppError> {
///     let mut multipart = extract_multipart(body)?;
/// }
/// ```
pub fn extract_multipart(result: Result<Multipart, MultipartRejection>) -> Result<Multipart, AppError> {
    result.map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Who is asking, as far as the transport can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub user_agent: Option<String>,
    /// Peer IP address. Absent when the server runs without connect info.
    pub address: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for Requester {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let address = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        Ok(Self {
            user_agent,
            address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn no_headers_uses_configured_defaults() {
        let origin = PublicOrigin::from_headers(&HeaderMap::new(), &AppConfig::default());
        assert_eq!(origin.base_url(), "http://localhost:3000");
    }

    #[test]
    fn host_header_is_used_without_forwarding() {
        let origin =
            PublicOrigin::from_headers(&headers(&[("host", "10.1.2.3:3000")]), &AppConfig::default());
        assert_eq!(origin.base_url(), "http://10.1.2.3:3000");
    }

    #[test]
    fn forwarded_headers_take_precedence() {
        let origin = PublicOrigin::from_headers(
            &headers(&[
                ("host", "internal:3000"),
                ("x-forwarded-host", "apps.example.com"),
                ("x-forwarded-proto", "https"),
            ]),
            &AppConfig::default(),
        );
        let slug = Slug::parse("k3j9x0ab").unwrap();
        assert_eq!(origin.download_url(&slug), "https://apps.example.com/ipa/k3j9x0ab");
        assert_eq!(origin.install_url(&slug), "https://apps.example.com/l/k3j9x0ab");
    }

    #[test]
    fn forwarded_lists_use_first_entry() {
        let origin = PublicOrigin::from_headers(
            &headers(&[
                ("x-forwarded-host", " edge.example.com , lb.internal"),
                ("x-forwarded-proto", "https,http"),
            ]),
            &AppConfig::default(),
        );
        assert_eq!(origin.base_url(), "https://edge.example.com");
    }

    #[test]
    fn blank_forwarded_host_falls_through() {
        let origin = PublicOrigin::from_headers(
            &headers(&[("x-forwarded-host", ""), ("host", "fallback:3000")]),
            &AppConfig::default(),
        );
        assert_eq!(origin.host, "fallback:3000");
    }

    #[tokio::test]
    async fn requester_reads_user_agent_and_connect_info() {
        let mut request = Request::builder()
            .header("user-agent", "iOS/17.4")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 51000))));
        let (mut parts, ()) = request.into_parts();

        let requester = Requester::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(requester.user_agent.as_deref(), Some("iOS/17.4"));
        assert_eq!(requester.address.as_deref(), Some("192.168.1.20"));
    }

    #[tokio::test]
    async fn requester_without_connect_info_has_no_address() {
        let (mut parts, ()) = Request::builder().body(()).unwrap().into_parts();
        let requester = Requester::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(requester, Requester::default());
    }
}
