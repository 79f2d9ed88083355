//! Starting, running and stopping the service.
//!
//! Startup connects the database and the cache before the HTTP listener is
//! bound. Shutdown stops the listener, gives in-flight requests until the
//! configured deadline, and only then closes the data stores.

use crate::infra::{
    cache::Cache,
    config::Config,
    database::Database,
    error::{InternalError, PanicHandler, StartupError, SupervisorError},
    middleware::MakeRequestIdSpan,
    shutdown::shutdown_signal,
    state::AppState,
};
use axum::{error_handling::HandleErrorLayer, response::IntoResponse, Router};
use http::{header::AUTHORIZATION, StatusCode};
use std::{future::Future, iter, net::SocketAddr, time::Duration};
use tokio::{net::TcpListener, sync::oneshot};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
    timeout::TimeoutLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Constructs the full axum application.
pub fn app(state: AppState) -> Router {
    with_layers(Router::new().nest("/api", crate::api::api(state)))
}

/// Wraps a router in the middleware every route gets.
pub(crate) fn with_layers(router: Router) -> Router {
    // Fallible middleware from tower, mapped to infallible response with [`HandleErrorLayer`].
    let tower_middleware = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e| async move {
            InternalError::Other(format!("Tower middleware failed: {e}")).into_response()
        }))
        .concurrency_limit(500);

    router
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(MakeRequestIdSpan)
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO))
                .on_failure(()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(SetSensitiveRequestHeadersLayer::new(iter::once(
            AUTHORIZATION,
        )))
        .layer(tower_middleware)
        .layer(CatchPanicLayer::custom(PanicHandler))
}

/// A started service that has not yet been asked to stop.
#[derive(Debug)]
pub struct Running {
    listener: TcpListener,
    router: Router,
    db: Database,
    cache: Cache,
    shutdown_timeout: Duration,
}

/// Connects the data stores, then binds the HTTP listener.
///
/// Nothing is bound if a data store cannot be reached.
pub async fn start(config: Config) -> Result<Running, StartupError> {
    let db = Database::connect(&config.database).await?;
    let cache = match Cache::connect(&config.cache).await {
        Ok(cache) => cache,
        Err(e) => {
            db.close().await;
            return Err(e.into());
        }
    };

    let addr = config.server.bind_address();
    let shutdown_timeout = config.server.shutdown_timeout;
    let router = app(AppState::new(db.clone(), cache.clone()));

    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(source) => {
            cache.close().await;
            db.close().await;
            return Err(StartupError::Bind { addr, source });
        }
    };

    Ok(Running {
        listener,
        router,
        db,
        cache,
        shutdown_timeout,
    })
}

impl Running {
    /// The address the HTTP listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves until SIGINT or SIGTERM, then shuts down.
    pub async fn run(self) -> Result<(), SupervisorError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serves until `signal` completes, then shuts down.
    pub async fn run_until<S>(self, signal: S) -> Result<(), SupervisorError>
    where
        S: Future<Output = ()>,
    {
        let Running {
            listener,
            router,
            db,
            cache,
            shutdown_timeout,
        } = self;
        supervise(listener, router, signal, shutdown_timeout, || async move {
            cache.close().await;
            db.close().await;
        })
        .await
    }
}

/// Serves `router` on a background task until `signal` completes.
///
/// The listener then stops accepting connections and in-flight requests get
/// until `deadline` to finish. `teardown` runs once the server task is gone,
/// whether or not the deadline was met.
pub async fn supervise<S, T, F>(
    listener: TcpListener,
    router: Router,
    signal: S,
    deadline: Duration,
    teardown: T,
) -> Result<(), SupervisorError>
where
    S: Future<Output = ()>,
    T: FnOnce() -> F,
    F: Future<Output = ()>,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Starting axum on {}", addr);
    }

    let app = router.into_make_service_with_connect_info::<SocketAddr>();
    let serve = |stop: oneshot::Receiver<()>| async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.await;
            })
            .await
    };
    supervise_server(serve, signal, deadline, teardown).await
}

/// Runs the server built by `serve` on a background task.
///
/// `serve` is handed a receiver that completes when the server should stop
/// accepting connections.
async fn supervise_server<V, W, S, T, F>(
    serve: V,
    signal: S,
    deadline: Duration,
    teardown: T,
) -> Result<(), SupervisorError>
where
    V: FnOnce(oneshot::Receiver<()>) -> W,
    W: Future<Output = std::io::Result<()>> + Send + 'static,
    S: Future<Output = ()>,
    T: FnOnce() -> F,
    F: Future<Output = ()>,
{
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(serve(stop_rx));

    let outcome = tokio::select! {
        _ = signal => {
            tracing::info!("Shutting down server");
            let _ = stop_tx.send(());
            match tokio::time::timeout(deadline, &mut server).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(SupervisorError::Serve(e)),
                Ok(Err(e)) => Err(SupervisorError::Join(e)),
                Err(_) => {
                    server.abort();
                    let _ = server.await;
                    Err(SupervisorError::ShutdownTimeout(deadline))
                }
            }
        }
        exit = &mut server => match exit {
            Ok(Ok(())) => Err(SupervisorError::Stopped),
            Ok(Err(e)) => Err(SupervisorError::Serve(e)),
            Err(e) => Err(SupervisorError::Join(e)),
        },
    };

    match &outcome {
        Ok(()) => tracing::info!("Server stopped"),
        Err(e) => tracing::error!("Server did not stop cleanly: {}", e),
    }

    teardown().await;
    outcome
}
