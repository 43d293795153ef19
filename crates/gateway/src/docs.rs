//! Static API documentation pages. Side-effect free, rendered inline so the
//! gateway has no asset pipeline to deploy.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

const INDEX: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>huddle API docs</title></head>
<body>
<h1>huddle API documentation</h1>
<ul>
  <li><a href="/api-docs/gateway">Gateway</a> — routing, health</li>
  <li><a href="/api-docs/auth">Identity</a> — register, login, OAuth, token verification</li>
  <li><a href="/api-docs/chat">Chat</a> — realtime rooms, messages, presence</li>
  <li><a href="/api-docs/video">Video</a> — rooms, participants, signaling relay</li>
</ul>
</body>
</html>
"#;

const GATEWAY: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>huddle gateway API</title></head>
<body>
<h1>Gateway</h1>
<ul>
  <li><code>GET /health</code> — gateway status plus configured backend URLs</li>
  <li><code>/api/auth/*</code> — proxied to the identity service</li>
  <li><code>/api/chat/*</code> — proxied to the chat service (WebSocket upgrades supported)</li>
  <li><code>/api/video/*</code> — proxied to the video service (WebSocket upgrades supported)</li>
</ul>
</body>
</html>
"#;

const AUTH: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>huddle identity API</title></head>
<body>
<h1>Identity</h1>
<p>Proxied under <code>/api/auth</code>:</p>
<ul>
  <li><code>POST /api/auth/register</code></li>
  <li><code>POST /api/auth/login</code></li>
  <li><code>POST /api/auth/google</code></li>
  <li><code>POST /api/auth/verify</code></li>
  <li><code>GET /api/auth/me</code></li>
  <li><code>POST /api/auth/logout</code></li>
</ul>
</body>
</html>
"#;

const CHAT: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>huddle chat API</title></head>
<body>
<h1>Chat</h1>
<p>WebSocket endpoint: <code>/api/chat/ws?token=&lt;jwt&gt;</code> (or <code>/ws</code>).</p>
<p>Client events: <code>room:create</code>, <code>room:join</code>, <code>room:join-by-code</code>,
<code>room:leave</code>, <code>room:get</code>, <code>message:send</code>, <code>messages:get</code>.</p>
<p>Server events: <code>rooms:list</code>, <code>room:created</code>, <code>room:joined</code>,
<code>room:left</code>, <code>room:details</code>, <code>room:user-joined</code>, <code>room:user-left</code>,
<code>message:new</code>, <code>messages:list</code>, <code>user:online</code>, <code>user:offline</code>,
<code>error</code>.</p>
</body>
</html>
"#;

const VIDEO: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>huddle video API</title></head>
<body>
<h1>Video</h1>
<p>WebSocket endpoint: <code>/api/video/ws</code> (token optional; guests are admitted).</p>
<p>HTTP:</p>
<ul>
  <li><code>GET /api/video/rooms/{roomId}</code></li>
  <li><code>GET /api/video/rooms/{roomId}/participants</code></li>
  <li><code>GET /api/video/rooms/{roomId}/participants/{userId}/screen-sharing</code></li>
</ul>
<p>Signaling: <code>video:signal</code> with <code>kind</code> of <code>offer</code>,
<code>answer</code> or <code>ice-candidate</code>; offers and answers require a
<code>targetUserId</code>.</p>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX)
}

pub async fn service(Path(service): Path<String>) -> Response {
    match service.as_str() {
        "gateway" => Html(GATEWAY).into_response(),
        "auth" => Html(AUTH).into_response(),
        "chat" => Html(CHAT).into_response(),
        "video" => Html(VIDEO).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
