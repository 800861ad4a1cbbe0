//! Server lifecycle: start, stop, restart and status of the HTTP listener.
//!
//! [`LifecycleManager`] exclusively owns the listener task. Transitions are
//! serialised by one async mutex so concurrent `start`/`stop`/`restart`
//! calls cannot interleave; [`LifecycleManager::status`] only takes a short
//! synchronous lock and never waits on a transition in progress.
//!
//! ```text
//! Stopped ──start──▶ Starting ──bind ok──▶ Running ──stop──▶ Stopping ──drained──▶ Stopped
//!                        │
//!                        └──bind failed──▶ Stopped
//! ```
//!
//! Dropping the manager drops the shutdown sender, which also triggers a
//! graceful shutdown of a running listener.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::mcp::router::ProtocolRouter;
use crate::mcp::transport;

/// Returns the MCP endpoint URL for `port`.
#[must_use]
pub fn endpoint_url(port: u16) -> String {
    format!("http://localhost:{port}/mcp")
}

/// Snapshot of the server's state, computed on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerStatus {
    /// Whether a listener is currently serving requests.
    pub running: bool,
    /// Bound port while running, otherwise the last requested port.
    pub port: u16,
    /// MCP endpoint URL for `port`.
    pub endpoint: String,
}

impl ServerStatus {
    fn new(running: bool, port: u16) -> Self {
        Self {
            running,
            port,
            endpoint: endpoint_url(port),
        }
    }
}

/// Lifecycle phase of the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No listener. Initial state.
    Stopped,
    /// Binding the listener.
    Starting,
    /// Serving requests.
    Running,
    /// Draining in-flight requests.
    Stopping,
}

struct ListenerHandle {
    port: u16,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<io::Result<()>>,
}

struct Lifecycle {
    phase: LifecyclePhase,
    port: u16,
    listener: Option<ListenerHandle>,
}

/// Owns the HTTP listener and drives its lifecycle.
pub struct LifecycleManager {
    host: String,
    drain_timeout: Duration,
    transitions: tokio::sync::Mutex<()>,
    state: Mutex<Lifecycle>,
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("host", &self.host)
            .field("drain_timeout", &self.drain_timeout)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl LifecycleManager {
    /// Creates a stopped manager from the listener configuration.
    ///
    /// `config.port` is what [`status`](Self::status) reports until the
    /// first `start`.
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            drain_timeout: config.drain_timeout(),
            transitions: tokio::sync::Mutex::new(()),
            state: Mutex::new(Lifecycle {
                phase: LifecyclePhase::Stopped,
                port: config.port,
                listener: None,
            }),
        }
    }

    /// Returns the current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.lock_state().phase
    }

    /// Returns the current status. Never fails.
    #[must_use]
    pub fn status(&self) -> ServerStatus {
        let state = self.lock_state();
        let running = state.phase == LifecyclePhase::Running
            && state
                .listener
                .as_ref()
                .is_some_and(|listener| !listener.task.is_finished());
        ServerStatus::new(running, state.port)
    }

    /// Binds `port` and starts serving.
    ///
    /// Port `0` binds an ephemeral port; the returned status carries the
    /// port actually bound.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`] if a listener is serving, and
    /// [`ServerError::Bind`] if the port cannot be bound.
    pub async fn start(&self, port: u16) -> Result<ServerStatus, ServerError> {
        let _transition = self.transitions.lock().await;
        self.start_locked(port).await
    }

    /// Stops the listener, letting in-flight requests finish.
    ///
    /// A no-op when already stopped. The port is released as soon as the
    /// shutdown signal is delivered. Once the drain timeout elapses the
    /// serving task is aborted and `stop` returns; connections still open at
    /// that point run on their own tasks and are not cancelled.
    pub async fn stop(&self) {
        let _transition = self.transitions.lock().await;
        self.stop_locked().await;
    }

    /// Stops, then starts on `port`, as one transition.
    ///
    /// If the start fails the manager is left stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound.
    pub async fn restart(&self, port: u16) -> Result<ServerStatus, ServerError> {
        let _transition = self.transitions.lock().await;
        self.stop_locked().await;
        self.start_locked(port).await
    }

    async fn start_locked(&self, port: u16) -> Result<ServerStatus, ServerError> {
        {
            let mut state = self.lock_state();
            if let Some(listener) = &state.listener {
                if !listener.task.is_finished() {
                    return Err(ServerError::AlreadyRunning {
                        port: listener.port,
                    });
                }
                warn!(port = listener.port, "Reclaiming listener that exited on its own");
            }
            state.listener = None;
            state.phase = LifecyclePhase::Starting;
            state.port = port;
        }

        let listener = match TcpListener::bind((self.host.as_str(), port)).await {
            Ok(listener) => listener,
            Err(source) => {
                self.lock_state().phase = LifecyclePhase::Stopped;
                warn!(host = %self.host, port, error = %source, "Failed to bind MCP server");
                return Err(ServerError::Bind { port, source });
            }
        };
        let bound_port = listener.local_addr().map_or(port, |addr| addr.port());

        let router = Arc::new(ProtocolRouter::with_defaults(bound_port));
        let app = transport::build_app(router, bound_port);
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(transport::serve(listener, app, async move {
            // A dropped sender also means shut down.
            shutdown_rx.await.ok();
        }));

        info!(
            host = %self.host,
            port = bound_port,
            endpoint = %endpoint_url(bound_port),
            "MCP server started"
        );

        let mut state = self.lock_state();
        state.phase = LifecyclePhase::Running;
        state.port = bound_port;
        state.listener = Some(ListenerHandle {
            port: bound_port,
            shutdown,
            task,
        });

        Ok(ServerStatus::new(true, bound_port))
    }

    async fn stop_locked(&self) {
        let handle = {
            let mut state = self.lock_state();
            let Some(handle) = state.listener.take() else {
                state.phase = LifecyclePhase::Stopped;
                debug!("Stop requested while already stopped");
                return;
            };
            state.phase = LifecyclePhase::Stopping;
            handle
        };

        let ListenerHandle {
            port,
            shutdown,
            mut task,
        } = handle;

        // The receiver is gone only if the serve task already ended.
        shutdown.send(()).ok();

        match tokio::time::timeout(self.drain_timeout, &mut task).await {
            Ok(Ok(Ok(()))) => info!(port, "MCP server stopped"),
            Ok(Ok(Err(e))) => warn!(port, error = %e, "MCP server exited with error"),
            Ok(Err(e)) => error!(port, error = %e, "MCP server task failed"),
            Err(_) => {
                warn!(
                    port,
                    timeout_secs = self.drain_timeout.as_secs(),
                    "Drain timed out, abandoning open connections"
                );
                task.abort();
                let _ = task.await;
            }
        }

        self.lock_state().phase = LifecyclePhase::Stopped;
    }

    fn lock_state(&self) -> MutexGuard<'_, Lifecycle> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> LifecycleManager {
        LifecycleManager::new(&ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3999,
            drain_timeout_secs: 2,
        })
    }

    #[test]
    fn status_before_start() {
        let status = manager().status();
        assert_eq!(
            status,
            ServerStatus {
                running: false,
                port: 3999,
                endpoint: "http://localhost:3999/mcp".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn stop_without_start_is_noop() {
        let manager = manager();
        manager.stop().await;
        manager.stop().await;
        assert_eq!(manager.phase(), LifecyclePhase::Stopped);
        assert!(!manager.status().running);
    }

    #[tokio::test]
    async fn start_stop_cycle() {
        let manager = manager();
        let status = manager.start(0).await.unwrap();
        assert!(status.running);
        assert_ne!(status.port, 0);
        assert_eq!(manager.status(), status);
        assert_eq!(manager.phase(), LifecyclePhase::Running);

        manager.stop().await;
        let stopped = manager.status();
        assert!(!stopped.running);
        assert_eq!(stopped.port, status.port);
        assert_eq!(manager.phase(), LifecyclePhase::Stopped);
    }

    #[tokio::test]
    async fn double_start_rejected() {
        let manager = manager();
        let first = manager.start(0).await.unwrap();

        let err = manager.start(first.port).await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning { port } if port == first.port));
        assert_eq!(manager.status(), first);

        manager.stop().await;
    }

    #[tokio::test]
    async fn bind_failure_leaves_stopped() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let manager = manager();
        let err = manager.start(port).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { port: p, .. } if p == port));
        assert_eq!(manager.phase(), LifecyclePhase::Stopped);
        assert!(!manager.status().running);
    }

    #[tokio::test]
    async fn restart_rebinds_same_port() {
        let manager = manager();
        let first = manager.start(0).await.unwrap();

        let second = manager.restart(first.port).await.unwrap();
        assert!(second.running);
        assert_eq!(second.port, first.port);
        assert!(manager.status().running);

        manager.stop().await;
    }

    #[tokio::test]
    async fn restart_failure_ends_stopped() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let busy_port = occupied.local_addr().unwrap().port();

        let manager = manager();
        manager.start(0).await.unwrap();

        let err = manager.restart(busy_port).await.unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
        assert_eq!(manager.phase(), LifecyclePhase::Stopped);
        assert!(!manager.status().running);
    }
}
