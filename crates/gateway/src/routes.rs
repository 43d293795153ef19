//! The routing table: longest prefix wins, and each backend keeps its own
//! path namespace after the rewrite.

/// A proxied backend. Each one fails independently; an outage on one never
/// turns into errors for the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Auth,
    Chat,
    Video,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Auth => "auth",
            Backend::Chat => "chat",
            Backend::Video => "video",
        }
    }
}

/// Resolve a request path to a backend and the rewritten upstream path.
///
/// `/api/auth/*` keeps an `/auth` prefix upstream; chat and video are
/// mounted at their roots. A bare `/ws` (the default duplex path with no
/// identifying prefix) maps to chat.
pub fn route_for_path(path: &str) -> Option<(Backend, String)> {
    if let Some(rest) = path.strip_prefix("/api/auth") {
        return Some((Backend::Auth, format!("/auth{}", ensure_slash(rest))));
    }
    if let Some(rest) = path.strip_prefix("/api/chat") {
        return Some((Backend::Chat, ensure_slash(rest).to_string()));
    }
    if let Some(rest) = path.strip_prefix("/api/video") {
        return Some((Backend::Video, ensure_slash(rest).to_string()));
    }
    if path == "/ws" {
        return Some((Backend::Chat, "/ws".to_string()));
    }
    None
}

fn ensure_slash(rest: &str) -> &str {
    if rest.is_empty() {
        "/"
    } else {
        rest
    }
}
