use std::{net::SocketAddr, time::Instant};

use axum::{
    extract::{ConnectInfo, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{field, Instrument, Level};
use uuid::Uuid;

/// Per-request correlation id. Stored in request extensions and recorded as the
/// `request_id` field of the `http_request` span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

pub fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "clerk_users=debug,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or_else(|_| std::env::var("APP_ENV").map(|v| v == "production").unwrap_or(false));

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

pub fn level_for(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}

fn is_exempt(path: &str) -> bool {
    path.contains("favicon")
}

/// Opens the `http_request` span carrying the correlation id, runs the inner
/// service inside it and emits one summary event once the response is known.
pub async fn log_request(mut req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    req.extensions_mut().insert(RequestId(request_id));

    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".into());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_owned();

    let span = tracing::info_span!(
        "http_request",
        request_id = %request_id,
        clerk_user_id = field::Empty,
    );

    let res = next.run(req).instrument(span.clone()).await;

    if is_exempt(&path) {
        return res;
    }

    let status = res.status();
    let processing_ms = start.elapsed().as_millis() as u64;
    let _entered = span.enter();
    macro_rules! emit {
        ($lvl:expr) => {
            tracing::event!(
                $lvl,
                method = %method,
                path = %path,
                status_code = status.as_u16(),
                processing_ms,
                client_ip = %client_ip,
                user_agent = %user_agent,
                "{} {} {}", method, path, status.as_u16()
            )
        };
    }
    let level = level_for(status);
    if level == Level::ERROR {
        emit!(Level::ERROR);
    } else if level == Level::WARN {
        emit!(Level::WARN);
    } else {
        emit!(Level::INFO);
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use axum::{body::Body, http::Request, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;

    use crate::{app::build_app, state::testing::fake};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn drain(&self) -> Vec<String> {
            let bytes = std::mem::take(&mut *self.0.lock().unwrap());
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::to_owned)
                .collect()
        }
    }

    fn summaries(lines: &[String]) -> Vec<&String> {
        lines.iter().filter(|l| l.contains("status_code=")).collect()
    }

    #[test]
    fn severity_follows_status_class() {
        assert_eq!(level_for(StatusCode::OK), Level::INFO);
        assert_eq!(level_for(StatusCode::NO_CONTENT), Level::INFO);
        assert_eq!(level_for(StatusCode::PERMANENT_REDIRECT), Level::INFO);
        assert_eq!(level_for(StatusCode::UNAUTHORIZED), Level::WARN);
        assert_eq!(level_for(StatusCode::NOT_FOUND), Level::WARN);
        assert_eq!(level_for(StatusCode::INTERNAL_SERVER_ERROR), Level::ERROR);
    }

    #[test]
    fn favicon_requests_are_not_logged() {
        assert!(is_exempt("/favicon.ico"));
        assert!(is_exempt("/static/favicon-32x32.png"));
        assert!(!is_exempt("/v1/users"));
    }

    #[tokio::test]
    async fn one_summary_per_request_and_none_for_favicon() {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let request = |path: &str| Request::get(path).body(Body::empty()).unwrap();

        let res = build_app(fake()).oneshot(request("/v1/users")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let lines = out.drain();
        let logged = summaries(&lines);
        assert_eq!(logged.len(), 1, "{lines:#?}");
        let line = logged[0];
        assert!(line.contains("WARN"), "{line}");
        assert!(line.contains("request_id="), "{line}");
        assert!(line.contains("method=GET"), "{line}");
        assert!(line.contains("path=/v1/users "), "{line}");
        assert!(line.contains("status_code=401"), "{line}");
        assert_eq!(lines.iter().filter(|l| l.contains("request rejected")).count(), 1);

        // matched by the protected route, so the logger runs and stays quiet
        let res = build_app(fake()).oneshot(request("/v1/users/favicon.ico")).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(summaries(&out.drain()).is_empty());

        let res = build_app(fake()).oneshot(request("/static/favicon.ico")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(summaries(&out.drain()).is_empty());
    }

    #[tokio::test]
    async fn logger_leaves_the_response_untouched() {
        let plain: Router = Router::new().route("/", get(|| async { "ok" }));
        let logged = plain.clone().layer(from_fn(log_request));

        let a = plain.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
        let b = logged.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();

        assert_eq!(a.status(), b.status());
        assert_eq!(a.headers(), b.headers());
        let a = axum::body::to_bytes(a.into_body(), usize::MAX).await.unwrap();
        let b = axum::body::to_bytes(b.into_body(), usize::MAX).await.unwrap();
        assert_eq!(a, b);
    }
}
