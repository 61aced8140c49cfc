//! HTTP server and graceful shutdown.
//!
//! The server accepts connections, collects each request body, and hands the
//! request to a shared [`Dispatcher`]. On SIGTERM or Ctrl-C it:
//! 1. stops accepting new connections,
//! 2. lets every in-flight connection task run to completion,
//! 3. returns from [`Server::serve`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// The HTTP server.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Binds to the configured `listen` address.
    pub fn from_config(config: &Config) -> Self {
        Self::bind(config.listen)
    }

    /// Accepts connections and dispatches every request through `dispatcher`.
    ///
    /// Returns after a graceful shutdown, once all in-flight connections
    /// have finished.
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let dispatcher = Arc::new(dispatcher);

        info!(addr = %self.addr, groups = dispatcher.registry().len(), "relay listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Shutdown first, so a signal stops accepting even when more
                // connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let dispatcher = Arc::clone(&dispatcher);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move { handle(dispatcher, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("relay stopped");
        Ok(())
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Collects the body and runs the request through the dispatcher. Never fails:
/// unreadable bodies answer `400`, handler panics `500`.
async fn handle(
    dispatcher: Arc<Dispatcher>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_inner());
        }
    };

    let request = Request::from_parts(parts, body, remote_addr);
    Ok(dispatcher.dispatch(request).await.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or Ctrl-C. A signal that cannot be installed is logged
/// and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
