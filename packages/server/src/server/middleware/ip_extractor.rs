use axum::{
    extract::{ConnectInfo, Request},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::net::{IpAddr, SocketAddr};

/// Extension key for storing extracted IP address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

/// Middleware to extract client IP address from request
///
/// Priority:
/// 1. X-Forwarded-For header (for requests through proxies)
/// 2. X-Real-IP header (for Nginx)
/// 3. ConnectInfo socket address (direct connection)
pub async fn extract_client_ip(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut request: Request,
    next: Next,
) -> Response {
    let ip = client_ip_from_headers(request.headers()).unwrap_or_else(|| addr.ip());
    request.extensions_mut().insert(ClientIp(ip));

    next.run(request).await
}

/// First parseable address from the proxy headers, if any
pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        // Comma-separated list, the first entry is the original client
        return forwarded
            .to_str()
            .ok()
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}
