//! HTTP/1 listener on hyper and Tokio.
//!
//! Each connection runs on its own task. A request body is collected up to
//! the configured size limit (`payload_too_large`, 413, beyond it), handed to
//! [`FeastService::handle`], and the whole exchange is bounded by the
//! configured request timeout, which answers `request_timeout` (504).
//!
//! ```rust,no_run
//! use feast_server::{FeastService, Server, ServerConfig};
//!
//! # async fn run() -> Result<(), feast_server::ServerError> {
//! let service = FeastService::builder()
//!     .config(ServerConfig::builder().http_addr("127.0.0.1:8080").build())
//!     .build();
//! Server::new(service).run().await
//! # }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use feast_core::ApiError;
use feast_telemetry::metrics::UNROUTED;
use feast_telemetry::record_request;
use http::{HeaderValue, Method, Request, Response};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ServerError;
use crate::request::request_id;
use crate::response::{serialize_error, REQUEST_ID_HEADER};
use crate::service::FeastService;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// HTTP response type produced by the server.
pub type HttpResponse = Response<Full<Bytes>>;

/// Serves a [`FeastService`] over TCP.
#[derive(Debug, Clone)]
pub struct Server {
    service: FeastService,
}

impl Server {
    /// Wraps a service. Listener settings come from its [`ServerConfig`](crate::ServerConfig).
    #[must_use]
    pub fn new(service: FeastService) -> Self {
        Self { service }
    }

    /// The served service.
    #[must_use]
    pub fn service(&self) -> &FeastService {
        &self.service
    }

    /// Binds the configured address and serves until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Fails when the address is invalid or cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals()).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Fails when the address is invalid or cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let config = self.service.config();
        let addr = config
            .socket_addr()
            .map_err(|source| ServerError::InvalidAddress {
                addr: config.http_addr().to_string(),
                source,
            })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener.
    ///
    /// After `shutdown` fires, open connections finish their current
    /// request; the call returns once they close or the shutdown timeout
    /// elapses.
    ///
    /// # Errors
    ///
    /// Fails when the listener has no local address.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local = listener.local_addr()?;
        let config = self.service.config().clone();
        let limit = config.max_connections().map(|n| Arc::new(Semaphore::new(n)));
        let tracker = ConnectionTracker::new();

        tracing::info!(addr = %local, prefix = config.route_prefix(), "listening");

        loop {
            let permit = match &limit {
                Some(sem) => tokio::select! {
                    permit = Arc::clone(sem).acquire_owned() => permit.ok(),
                    () = shutdown.recv() => break,
                },
                None => None,
            };

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        let service = self.service.clone();
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            let served =
                                serve_connection(service, stream, remote, shutdown, permit).await;
                            if let Err(e) = served {
                                tracing::debug!(%remote, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "accept failed"),
                },
                () = shutdown.recv() => break,
            }
        }

        tracing::info!(
            open = tracker.active_connections(),
            timeout_secs = config.shutdown_timeout().as_secs(),
            "shutting down"
        );

        if tokio::time::timeout(config.shutdown_timeout(), tracker.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                open = tracker.active_connections(),
                "shutdown timeout reached with open connections"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }
}

async fn serve_connection(
    service: FeastService,
    stream: TcpStream,
    remote: SocketAddr,
    shutdown: ShutdownSignal,
    _permit: Option<OwnedSemaphorePermit>,
) -> Result<(), hyper::Error> {
    let timeout = service.config().request_timeout();
    let svc = service_fn(move |req: Request<Incoming>| {
        let service = service.clone();
        async move { Ok::<_, Infallible>(handle_request(&service, req, timeout).await) }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), svc);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            tracing::debug!(%remote, "closing connection for shutdown");
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

async fn handle_request(
    service: &FeastService,
    mut req: Request<Incoming>,
    timeout: Duration,
) -> HttpResponse {
    let started = Instant::now();
    let head = req.method() == Method::HEAD;
    let content_type = service.config().content_type();
    let limit = service.config().max_body_size();

    // Pin the ID on the request so every branch below reports the same one.
    let id = request_id(req.headers());
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        req.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let transport_error = |err: ApiError| {
        let response = serialize_error(err, head);
        record_request(UNROUTED, response.status().as_u16(), started.elapsed());
        response.into_http(&content_type, id)
    };

    let exchange = async {
        let (parts, body) = req.into_parts();
        match Limited::new(body, limit).collect().await {
            Ok(collected) => {
                service
                    .handle(Request::from_parts(parts, collected.to_bytes()))
                    .await
            }
            Err(e) if e.is::<LengthLimitError>() => {
                tracing::debug!(request_id = %id, limit, "request body too large");
                transport_error(ApiError::payload_too_large(limit))
            }
            Err(e) => {
                tracing::debug!(request_id = %id, error = %e, "failed to read request body");
                transport_error(ApiError::invalid_body())
            }
        }
    };

    match tokio::time::timeout(timeout, exchange).await {
        Ok(response) => response,
        Err(_) => {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            tracing::warn!(request_id = %id, timeout_ms, "request timed out");
            transport_error(ApiError::request_timeout())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HandlerRegistry, ServerConfig};
    use feast_core::{FnHandler, ParamSpec};
    use feast_router::{HandlerEntry, MethodMask, Route, RouteTable};
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn service(config: ServerConfig) -> FeastService {
        let routes = RouteTable::new()
            .with(
                Route::new("/ping")
                    .unwrap()
                    .entry(HandlerEntry::new("ping", MethodMask::READABLE)),
            )
            .with(
                Route::new("/slow")
                    .unwrap()
                    .entry(HandlerEntry::new("slow", MethodMask::READABLE)),
            );
        let handlers = HandlerRegistry::new()
            .with(
                "ping",
                FnHandler::new(vec![ParamSpec::optional("n", 1)], |_ctx, args| async move {
                    let [n] = args.into_array()?;
                    Ok(json!({ "pong": n }))
                }),
            )
            .with(
                "slow",
                FnHandler::new(Vec::new(), |_ctx, _args| async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(json!(null))
                }),
            );
        FeastService::builder()
            .config(config)
            .routes(routes, handlers)
            .build()
    }

    type Running = tokio::task::JoinHandle<Result<(), ServerError>>;

    async fn start_with(config: ServerConfig) -> (SocketAddr, ShutdownSignal, Running) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn(Server::new(service(config)).serve(listener, shutdown.clone()));
        (addr, shutdown, handle)
    }

    async fn start(timeout: Duration) -> (SocketAddr, ShutdownSignal, Running) {
        start_with(ServerConfig::builder().request_timeout(timeout).build()).await
    }

    async fn raw(addr: SocketAddr, request: String) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        out
    }

    async fn raw_get(addr: SocketAddr, target: &str) -> String {
        raw(
            addr,
            format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"),
        )
        .await
    }

    #[tokio::test]
    async fn test_serves_json_over_tcp() {
        let (addr, shutdown, handle) = start(Duration::from_secs(5)).await;

        let response = raw_get(addr, "/feast/api/ping?n=7").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response
            .to_ascii_lowercase()
            .contains("content-type: application/json; charset=utf-8"));
        assert!(response.ends_with(r#"{"pong":"7"}"#), "{response}");

        shutdown.trigger();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_request_timeout_is_504() {
        let (addr, shutdown, handle) = start(Duration::from_millis(50)).await;

        let response = raw_get(addr, "/feast/api/slow").await;
        assert!(response.starts_with("HTTP/1.1 504"), "{response}");
        assert!(response.contains("request_timeout"));

        shutdown.trigger();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_timeout_keeps_client_request_id() {
        let (addr, shutdown, handle) = start(Duration::from_millis(50)).await;

        let id = feast_core::RequestId::new();
        let response = raw(
            addr,
            format!(
                "GET /feast/api/slow HTTP/1.1\r\nHost: localhost\r\nX-Request-Id: {id}\r\nConnection: close\r\n\r\n"
            ),
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 504"), "{response}");
        assert!(
            response.to_ascii_lowercase().contains(&format!("x-request-id: {id}")),
            "{response}"
        );

        shutdown.trigger();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_body_is_413() {
        let config = ServerConfig::builder().max_body_size(16).build();
        let (addr, shutdown, handle) = start_with(config).await;

        let body = "n=".to_string() + &"9".repeat(64);
        let response = raw(
            addr,
            format!(
                "POST /feast/api/ping HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            ),
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 413"), "{response}");
        assert!(response.contains("payload_too_large"), "{response}");

        let small = raw(
            addr,
            "POST /feast/api/ping HTTP/1.1\r\nHost: localhost\r\nContent-Length: 3\r\nConnection: close\r\n\r\nn=1"
                .to_string(),
        )
        .await;
        assert!(small.starts_with("HTTP/1.1 405"), "{small}");

        shutdown.trigger();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_without_connections() {
        let (_addr, shutdown, handle) = start(Duration::from_secs(1)).await;
        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("server should stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let service = FeastService::builder()
            .config(ServerConfig::builder().http_addr("nowhere").build())
            .build();
        let err = Server::new(service)
            .run_with_shutdown(ShutdownSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }
}
