use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    handler::Handler,
    middleware::{from_fn, from_fn_with_state},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use tokio::sync::Notify;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{error, info, warn};

use crate::{auth, logging, state::AppState, users, webhooks};

pub const API_VERSION: &str = "v1";
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Cross-cutting layers a route can opt into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Middleware {
    Logging,
    Auth,
}

const PUBLIC: &[Middleware] = &[Middleware::Logging];
const PROTECTED: &[Middleware] = &[Middleware::Logging, Middleware::Auth];

/// One row of the route table. `middleware` is applied left to right: the
/// first entry is the outermost layer.
pub struct RouteSpec {
    pub method: MethodFilter,
    pub path: String,
    pub middleware: &'static [Middleware],
    handler: MethodRouter<AppState>,
}

impl RouteSpec {
    fn new<H, T>(
        method: MethodFilter,
        path: impl Into<String>,
        handler: H,
        middleware: &'static [Middleware],
    ) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        Self {
            method,
            path: path.into(),
            middleware,
            handler: on(method, handler),
        }
    }

    fn compose(self, state: &AppState) -> MethodRouter<AppState> {
        self.middleware
            .iter()
            .rev()
            .fold(self.handler, |handler, mw| match mw {
                Middleware::Logging => handler.route_layer(from_fn(logging::log_request)),
                Middleware::Auth => handler.route_layer(from_fn_with_state(
                    state.clone(),
                    auth::middleware::require_session,
                )),
            })
    }
}

pub fn route_table() -> Vec<RouteSpec> {
    let v = API_VERSION;
    vec![
        RouteSpec::new(
            MethodFilter::POST,
            format!("/{v}/signup"),
            users::handlers::signup,
            PUBLIC,
        ),
        RouteSpec::new(
            MethodFilter::GET,
            format!("/{v}/users"),
            users::handlers::list_users,
            PROTECTED,
        ),
        RouteSpec::new(
            MethodFilter::GET,
            format!("/{v}/users/:id"),
            users::handlers::get_user_by_clerk_id,
            PROTECTED,
        ),
        RouteSpec::new(
            MethodFilter::DELETE,
            format!("/{v}/users/:id"),
            users::handlers::delete_user,
            PROTECTED,
        ),
        RouteSpec::new(
            MethodFilter::POST,
            "/webhooks/clerk",
            webhooks::handlers::clerk_webhook,
            PUBLIC,
        ),
    ]
}

pub fn build_app(state: AppState) -> Router {
    let router = route_table()
        .into_iter()
        .fold(Router::new(), |router, spec| {
            let path = spec.path.clone();
            router.route(&path, spec.compose(&state))
        });

    // static files bypass every middleware
    router
        .nest_service("/static", ServeDir::new(&state.config.static_dir))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Serve until SIGINT/SIGTERM, then drain in-flight requests for at most
/// `SHUTDOWN_GRACE`.
pub async fn serve(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server started on http://{}", listener.local_addr()?);

    let stop = Arc::new(Notify::new());
    let server = tokio::spawn({
        let stop = stop.clone();
        async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { stop.notified().await })
            .await
        }
    });

    shutdown_signal().await;
    stop.notify_one();

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Ok(()))) => info!("graceful server shutdown complete"),
        Ok(Ok(Err(e))) => error!(error = %e, "HTTP server closed early"),
        Ok(Err(e)) => error!(error = %e, "server task failed"),
        Err(_) => warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "grace period elapsed, abandoning in-flight requests"
        ),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!(signal = "SIGINT", "received signal"),
        _ = terminate => warn!(signal = "SIGTERM", "received signal"),
    }
}
