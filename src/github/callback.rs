//! Loopback listener for the OAuth redirect
//!
//! GitHub redirects the browser to the registered `redirect_uri` with `code`
//! and `state` query parameters. This server accepts exactly one such
//! request and hands both values back to the caller. Checking `state`
//! against the issued nonce is left to [`crate::github::auth::OAuthExchanger`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::{oneshot, Mutex};
use url::Url;

use crate::error::AuthError;

/// Query parameters GitHub appends to the redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code (on success)
    pub code: Option<String>,
    /// Echoed `state` nonce
    pub state: Option<String>,
    /// Error code (on failure)
    pub error: Option<String>,
    /// Error description (on failure)
    pub error_description: Option<String>,
}

/// Code and state received on the redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResult {
    pub code: String,
    pub state: String,
}

type ResultSender = oneshot::Sender<Result<CallbackResult, AuthError>>;

/// How long open connections get to finish after the callback arrived
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Single-shot loopback HTTP server
pub struct CallbackServer {
    addr: SocketAddr,
    path: String,
}

impl CallbackServer {
    /// Listen on `port` at `path`
    pub fn new(port: u16, path: impl Into<String>) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], port)),
            path: path.into(),
        }
    }

    /// Derive address and path from the configured redirect URI
    ///
    /// Only plain-HTTP loopback redirects can be served locally.
    pub fn from_redirect_uri(redirect_uri: &str) -> Result<Self, AuthError> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| AuthError::Callback(format!("Invalid redirect URI: {}", e)))?;

        let host_ok = matches!(url.host_str(), Some("127.0.0.1") | Some("localhost"));
        if url.scheme() != "http" || !host_ok {
            return Err(AuthError::Callback(format!(
                "Redirect URI '{}' is not a local http://127.0.0.1 address",
                redirect_uri
            )));
        }

        let port = url.port_or_known_default().unwrap_or(80);
        Ok(Self::new(port, url.path().to_string()))
    }

    /// Bind the loopback listener
    ///
    /// Binding up front surfaces a busy port before the user is sent to
    /// GitHub.
    pub async fn bind(self) -> Result<CallbackListener, AuthError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| AuthError::Callback(format!("Failed to bind to {}: {}", self.addr, e)))?;

        Ok(CallbackListener {
            listener,
            path: self.path,
        })
    }
}

/// A bound [`CallbackServer`] ready to receive the redirect
pub struct CallbackListener {
    listener: tokio::net::TcpListener,
    path: String,
}

impl CallbackListener {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, AuthError> {
        self.listener
            .local_addr()
            .map_err(|e| AuthError::Callback(e.to_string()))
    }

    /// Serve until one callback arrives or `timeout` elapses
    pub async fn wait_for_callback(self, timeout: Duration) -> Result<CallbackResult, AuthError> {
        let (tx, rx) = oneshot::channel();
        let tx: Arc<Mutex<Option<ResultSender>>> = Arc::new(Mutex::new(Some(tx)));

        let app = Router::new()
            .route(&self.path, get(handle_callback))
            .with_state(tx);

        if let Ok(addr) = self.listener.local_addr() {
            tracing::debug!("OAuth callback server listening on http://{}{}", addr, self.path);
        }

        let listener = self.listener;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let outcome = tokio::select! {
            result = rx => {
                result.unwrap_or_else(|_| Err(AuthError::Callback("Callback channel closed unexpectedly".into())))
            }
            _ = tokio::time::sleep(timeout) => Err(AuthError::CallbackTimeout),
        };

        // Let the browser receive its page before the listener goes away
        let _ = shutdown_tx.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::debug!(error = %e, "callback server error"),
            Ok(Err(e)) => tracing::debug!(error = %e, "callback server task failed"),
            Err(_) => tracing::debug!("callback server did not shut down in time"),
        }

        outcome
    }
}

async fn handle_callback(
    State(tx): State<Arc<Mutex<Option<ResultSender>>>>,
    Query(params): Query<CallbackParams>,
) -> Html<&'static str> {
    let result = process_callback(params);
    let page = if result.is_ok() { SUCCESS_HTML } else { ERROR_HTML };

    if let Some(tx) = tx.lock().await.take() {
        let _ = tx.send(result);
    }

    Html(page)
}

/// Turn raw query parameters into a code/state pair
fn process_callback(params: CallbackParams) -> Result<CallbackResult, AuthError> {
    if let Some(error) = params.error {
        if error == "access_denied" {
            return Err(AuthError::AccessDenied);
        }
        let message = params.error_description.unwrap_or(error);
        return Err(AuthError::ExchangeFailed(message));
    }

    let code = params.code.filter(|c| !c.is_empty()).ok_or(AuthError::MissingCode)?;

    Ok(CallbackResult {
        code,
        // An absent state can never match a nonce; the exchanger rejects it
        state: params.state.unwrap_or_default(),
    })
}

const SUCCESS_HTML: &str = "<!doctype html><html><body>\
<h2>zip2repo is connected to GitHub</h2>\
<p>You can close this tab and return to the terminal.</p>\
</body></html>";

const ERROR_HTML: &str = "<!doctype html><html><body>\
<h2>GitHub authorization failed</h2>\
<p>Return to the terminal for details.</p>\
</body></html>";
