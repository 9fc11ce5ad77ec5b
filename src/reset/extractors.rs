use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::{config::ServerConfig, state::AppState};

/// Scheme, host and port the client used to reach us; reset links point back there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: &'static str,
    pub host: String,
    pub port: u16,
}

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap, fallback: &ServerConfig) -> Self {
        let scheme = match headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Some("https") => "https",
            _ => "http",
        };
        let default_port = if scheme == "https" { 443 } else { 80 };

        // A configured public host wins; otherwise the client's Host header is trusted,
        // which assumes a proxy in front that only forwards known hosts.
        let host = fallback.public_host.as_deref().or_else(|| {
            headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|h| !h.is_empty())
        });

        match host {
            Some(host) => {
                let (host, port) = split_host_port(host);
                Self {
                    scheme,
                    host: host.to_string(),
                    port: port.unwrap_or(default_port),
                }
            }
            None => Self {
                scheme,
                host: "localhost".to_string(),
                port: fallback.port,
            },
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!(
            "{}://{}:{}/resetpassword/{}",
            self.scheme, self.host, self.port, token
        )
    }
}

fn split_host_port(value: &str) -> (&str, Option<u16>) {
    if let Some((host, port)) = value.rsplit_once(':') {
        // "[::1]" has colons but no port; only a bracketed v6 host may contain ':'.
        let plain = !host.contains(':') || host.ends_with(']');
        if plain && !host.is_empty() {
            if let Ok(port) = port.parse::<u16>() {
                return (host, Some(port));
            }
        }
    }
    (value, None)
}

#[async_trait]
impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers, &state.config.server))
    }
}
