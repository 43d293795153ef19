//! Upgrade-aware duplex proxying.
//!
//! No middleware with a hidden upgrade hook: the gateway takes over the
//! client socket, replays the upgrade handshake against the backend over a
//! fresh TCP connection, and then pumps bytes both ways until either side
//! closes. Once upgraded, frames are never inspected.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::proxy::backend_unavailable;
use crate::routes::Backend;
use crate::state::GatewayState;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// A backend that cannot produce its handshake response headers within this
/// window is treated as down.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// True when the request carries the duplex-upgrade signal.
pub fn wants_upgrade(req: &Request) -> bool {
    let connection_has_upgrade = req
        .headers()
        .get(header::CONNECTION)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        })
        .unwrap_or(false);
    let upgrade_is_websocket = req
        .headers()
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    connection_has_upgrade && upgrade_is_websocket
}

pub async fn proxy_upgrade(
    state: &GatewayState,
    backend: Backend,
    upstream_path: &str,
    mut req: Request,
) -> Response {
    let Some(on_upgrade) = req.extensions_mut().remove::<OnUpgrade>() else {
        debug!("Upgrade request without an upgradable connection");
        return StatusCode::BAD_REQUEST.into_response();
    };

    let Some((host, port)) = host_port(state.backend_url(backend)) else {
        warn!(backend = backend.name(), "Unparseable backend URL");
        return backend_unavailable(backend);
    };

    let mut upstream =
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect((host.as_str(), port)))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                warn!(backend = backend.name(), error = %e, "Backend dial failed");
                return backend_unavailable(backend);
            }
            Err(_) => {
                warn!(backend = backend.name(), "Backend dial timed out");
                return backend_unavailable(backend);
            }
        };

    // Replay the handshake with the original upgrade headers.
    let mut head = Vec::with_capacity(512);
    head.extend_from_slice(b"GET ");
    head.extend_from_slice(upstream_path.as_bytes());
    if let Some(query) = req.uri().query() {
        head.push(b'?');
        head.extend_from_slice(query.as_bytes());
    }
    head.extend_from_slice(b" HTTP/1.1\r\nhost: ");
    head.extend_from_slice(format!("{host}:{port}").as_bytes());
    head.extend_from_slice(b"\r\n");
    for (name, value) in req.headers() {
        if name == header::HOST {
            continue;
        }
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");

    if let Err(e) = upstream.write_all(&head).await {
        warn!(backend = backend.name(), error = %e, "Handshake write failed");
        return backend_unavailable(backend);
    }

    let head = match tokio::time::timeout(HANDSHAKE_TIMEOUT, read_response_head(&mut upstream))
        .await
    {
        Ok(Ok(head)) => head,
        Ok(Err(e)) => {
            warn!(backend = backend.name(), error = %e, "Handshake read failed");
            return backend_unavailable(backend);
        }
        Err(_) => {
            warn!(backend = backend.name(), "Backend handshake timed out");
            return backend_unavailable(backend);
        }
    };

    let Some((status, headers, leftover)) = parse_response_head(&head) else {
        warn!(backend = backend.name(), "Unparseable handshake response");
        return backend_unavailable(backend);
    };

    let mut response = Response::builder().status(status);
    for (name, value) in &headers {
        // A declined upgrade is forwarded without its body, so body-framing
        // headers must not survive the trip.
        if status != StatusCode::SWITCHING_PROTOCOLS
            && (name.eq_ignore_ascii_case("content-length")
                || name.eq_ignore_ascii_case("transfer-encoding"))
        {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            response = response.header(name, value);
        }
    }
    let response = response
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::BAD_GATEWAY.into_response());

    if status != StatusCode::SWITCHING_PROTOCOLS {
        debug!(backend = backend.name(), %status, "Backend declined the upgrade");
        return response;
    }

    // The 101 goes back to the client; once hyper hands us the raw
    // connection, splice it to the backend until either side closes.
    let backend_name = backend.name();
    tokio::spawn(async move {
        let upgraded = match on_upgrade.await {
            Ok(upgraded) => upgraded,
            Err(e) => {
                warn!(backend = backend_name, error = %e, "Client upgrade failed");
                return;
            }
        };
        let mut client = TokioIo::new(upgraded);

        if !leftover.is_empty() {
            if let Err(e) = client.write_all(&leftover).await {
                debug!(backend = backend_name, error = %e, "Client write failed");
                return;
            }
        }

        match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
            Ok((to_backend, to_client)) => {
                info!(
                    backend = backend_name,
                    to_backend, to_client, "Duplex session closed"
                );
            }
            Err(e) => {
                debug!(backend = backend_name, error = %e, "Duplex session errored");
            }
        }
        // copy_bidirectional shuts the surviving half down on return.
    });

    response
}

/// Read from the stream until the end of the response head, returning the
/// whole buffer (which may include payload bytes past the terminator).
async fn read_response_head(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed during handshake",
            ));
        }
        buffer.extend_from_slice(&chunk[..n]);
        if find_head_end(&buffer).is_some() {
            return Ok(buffer);
        }
        if buffer.len() > MAX_HEAD_BYTES {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "handshake response head too large",
            ));
        }
    }
}

fn find_head_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Split a raw response head into status, headers, and any payload bytes
/// already read past the head.
fn parse_response_head(raw: &[u8]) -> Option<(StatusCode, Vec<(String, String)>, Vec<u8>)> {
    let head_end = find_head_end(raw)?;
    let head = std::str::from_utf8(&raw[..head_end]).ok()?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next()?;
    let mut parts = status_line.splitn(3, ' ');
    let _version = parts.next()?;
    let status = parts.next()?.parse::<u16>().ok()?;
    let status = StatusCode::from_u16(status).ok()?;

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':')?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    Some((status, headers, raw[head_end..].to_vec()))
}

/// Pull host and port out of an upstream base URL.
fn host_port(base: &str) -> Option<(String, u16)> {
    let rest = base
        .strip_prefix("http://")
        .or_else(|| base.strip_prefix("ws://"))?;
    let authority = rest.split('/').next()?;
    match authority.split_once(':') {
        Some((host, port)) => Some((host.to_string(), port.parse().ok()?)),
        None => Some((authority.to_string(), 80)),
    }
}
