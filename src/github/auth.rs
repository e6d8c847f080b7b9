//! OAuth authorization-code handshake for GitHub
//!
//! The CLI sends the user to GitHub's authorize page with a random `state`
//! nonce, receives `code` and `state` back on a loopback redirect, checks the
//! nonce, and hands the code to a backend proxy. Only the proxy knows the
//! OAuth App's client secret; it performs the code-to-token exchange and
//! returns the access token.
//!
//! See: https://docs.github.com/en/apps/oauth-apps/building-oauth-apps/authorizing-oauth-apps#web-application-flow

use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::core::credentials::TOKEN_LIFETIME_SECS;
use crate::error::AuthError;

/// GitHub authorize endpoint
pub const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

/// Scope needed to create repositories and write contents
pub const OAUTH_SCOPE: &str = "repo";

/// Where the handshake is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Idle,
    Initiated,
    AwaitingCallback,
    Exchanged,
    Failed,
}

impl HandshakeStage {
    /// Whether no further transitions are possible
    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeStage::Exchanged | HandshakeStage::Failed)
    }
}

/// Pending CSRF nonce issued by [`OAuthExchanger::initiate`]
#[derive(Debug, Clone)]
pub struct AuthorizationState {
    /// Random value sent as `state`
    pub nonce: String,
    /// When the nonce was issued
    pub issued_at: DateTime<Utc>,
    /// Set once a callback has been checked against this nonce
    pub consumed: bool,
}

/// Access token returned by the exchange proxy
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The bearer token
    pub value: SecretString,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// Granted scopes
    pub scope: String,
}

/// Settings for the handshake
///
/// Holds no client secret; the proxy owns it.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    /// OAuth App client ID
    pub client_id: String,
    /// Redirect URI registered with the OAuth App
    pub redirect_uri: String,
    /// Requested scope
    pub scope: String,
    /// Provider authorize endpoint
    pub authorize_url: String,
    /// Backend endpoint performing the code exchange
    pub proxy_url: String,
}

impl OAuthSettings {
    /// Settings for github.com with the default scope
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        proxy_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scope: OAUTH_SCOPE.to_string(),
            authorize_url: AUTHORIZE_URL.to_string(),
            proxy_url: proxy_url.into(),
        }
    }
}

/// Exchange request body sent to the proxy
#[derive(Debug, Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
    state: &'a str,
}

/// Exchange response from the proxy
///
/// The proxy may relay GitHub's token endpoint verbatim, which reports
/// failures as a 200 with an `error` field.
#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    /// Unix seconds
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth authorization-code handshake driver
pub struct OAuthExchanger {
    client: Client,
    settings: OAuthSettings,
    pending: Option<AuthorizationState>,
    stage: HandshakeStage,
}

impl OAuthExchanger {
    /// Create a new exchanger in the `Idle` stage
    pub fn new(settings: OAuthSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
            pending: None,
            stage: HandshakeStage::Idle,
        }
    }

    /// Current stage
    pub fn stage(&self) -> HandshakeStage {
        self.stage
    }

    /// Pending nonce, if one has been issued and not yet discarded
    pub fn pending_state(&self) -> Option<&AuthorizationState> {
        self.pending.as_ref()
    }

    /// Issue a fresh nonce and build the authorize redirect URL
    ///
    /// Re-initiating replaces any earlier unconsumed nonce.
    pub fn initiate(&mut self) -> Result<Url, AuthError> {
        if self.stage.is_terminal() {
            return Err(AuthError::HandshakeFinished);
        }

        let nonce = Uuid::new_v4().to_string();
        let mut url = Url::parse(&self.settings.authorize_url)
            .map_err(|e| AuthError::Callback(format!("Invalid authorize URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_uri)
            .append_pair("scope", &self.settings.scope)
            .append_pair("state", &nonce);

        self.pending = Some(AuthorizationState {
            nonce,
            issued_at: Utc::now(),
            consumed: false,
        });
        self.stage = HandshakeStage::Initiated;
        tracing::debug!("authorization initiated");

        Ok(url)
    }

    /// Record that the redirect has been handed to the browser
    pub fn await_callback(&mut self) {
        if self.stage == HandshakeStage::Initiated {
            self.stage = HandshakeStage::AwaitingCallback;
        }
    }

    /// Verify the callback state and exchange the code via the proxy
    ///
    /// The pending nonce is consumed whether or not it matches. Without a
    /// live nonce (never initiated, already consumed, or already exchanged)
    /// every callback is a `StateMismatch`.
    pub async fn complete_callback(
        &mut self,
        code: &str,
        returned_state: &str,
    ) -> Result<AccessToken, AuthError> {
        let matched = match self.pending.as_mut() {
            Some(pending) if !pending.consumed => {
                pending.consumed = true;
                pending.nonce == returned_state
            }
            _ => false,
        };

        if !matched {
            tracing::warn!("OAuth callback state mismatch");
            if !self.stage.is_terminal() {
                self.stage = HandshakeStage::Failed;
            }
            return Err(AuthError::StateMismatch);
        }

        match self.exchange(code, returned_state).await {
            Ok(token) => {
                self.pending = None;
                self.stage = HandshakeStage::Exchanged;
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "code exchange failed");
                self.stage = HandshakeStage::Failed;
                Err(e)
            }
        }
    }

    async fn exchange(&self, code: &str, state: &str) -> Result<AccessToken, AuthError> {
        let response = self
            .client
            .post(&self.settings.proxy_url)
            .header("Accept", "application/json")
            .json(&ExchangeRequest { code, state })
            .send()
            .await
            .map_err(|e| AuthError::ExchangeFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::ExchangeFailed(format!(
                "proxy responded with {}",
                status
            )));
        }

        let body: ExchangeResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("invalid proxy response: {}", e)))?;

        parse_exchange_response(body, Utc::now())
    }
}

fn parse_exchange_response(
    body: ExchangeResponse,
    now: DateTime<Utc>,
) -> Result<AccessToken, AuthError> {
    if let Some(error) = body.error {
        return Err(AuthError::ExchangeFailed(
            body.error_description.unwrap_or(error),
        ));
    }

    let access_token = body
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::ExchangeFailed("proxy returned no access token".into()))?;

    let expires_at = body
        .expires_at
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(|| now + Duration::seconds(TOKEN_LIFETIME_SECS));

    Ok(AccessToken {
        value: SecretString::from(access_token),
        expires_at,
        scope: body.scope.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(proxy_url: &str) -> OAuthSettings {
        OAuthSettings::new(
            "Iv1.testclient",
            "http://127.0.0.1:18484/callback",
            proxy_url,
        )
    }

    fn state_param(url: &Url) -> String {
        url.query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter")
    }

    #[test]
    fn test_initiate_builds_authorize_url() {
        let mut exchanger = OAuthExchanger::new(settings("http://127.0.0.1:1/exchange"));
        let url = exchanger.initiate().unwrap();

        assert!(url.as_str().starts_with(AUTHORIZE_URL));
        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("client_id".into(), "Iv1.testclient".into())));
        assert!(params.contains(&(
            "redirect_uri".into(),
            "http://127.0.0.1:18484/callback".into()
        )));
        assert!(params.contains(&("scope".into(), "repo".into())));

        let pending = exchanger.pending_state().unwrap();
        assert_eq!(state_param(&url), pending.nonce);
        assert!(!pending.consumed);
        assert_eq!(exchanger.stage(), HandshakeStage::Initiated);

        exchanger.await_callback();
        assert_eq!(exchanger.stage(), HandshakeStage::AwaitingCallback);
    }

    #[test]
    fn test_each_initiation_issues_a_fresh_nonce() {
        let mut exchanger = OAuthExchanger::new(settings("http://127.0.0.1:1/exchange"));
        let first = state_param(&exchanger.initiate().unwrap());
        let second = state_param(&exchanger.initiate().unwrap());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_state_mismatch_consumes_nonce() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut exchanger = OAuthExchanger::new(settings(&format!("{}/exchange", server.uri())));
        let url = exchanger.initiate().unwrap();
        exchanger.await_callback();
        let nonce = state_param(&url);

        let result = exchanger.complete_callback("code", "forged").await;
        assert_eq!(result.unwrap_err(), AuthError::StateMismatch);
        assert!(exchanger.pending_state().unwrap().consumed);
        assert_eq!(exchanger.stage(), HandshakeStage::Failed);

        // The genuine nonce is no longer accepted either
        let result = exchanger.complete_callback("code", &nonce).await;
        assert_eq!(result.unwrap_err(), AuthError::StateMismatch);
    }

    #[tokio::test]
    async fn test_callback_without_initiation_is_rejected() {
        let mut exchanger = OAuthExchanger::new(settings("http://127.0.0.1:1/exchange"));
        let result = exchanger.complete_callback("code", "anything").await;
        assert_eq!(result.unwrap_err(), AuthError::StateMismatch);
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let server = MockServer::start().await;
        let mut exchanger = OAuthExchanger::new(settings(&format!("{}/api/auth/github", server.uri())));
        let url = exchanger.initiate().unwrap();
        let nonce = state_param(&url);

        Mock::given(method("POST"))
            .and(path("/api/auth/github"))
            .and(body_json(json!({ "code": "auth_code_123", "state": nonce.clone() })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "gho_exchanged",
                "expires_at": 1_900_000_000,
                "scope": "repo"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = exchanger
            .complete_callback("auth_code_123", &nonce)
            .await
            .unwrap();

        assert_eq!(token.value.expose_secret(), "gho_exchanged");
        assert_eq!(token.scope, "repo");
        assert_eq!(token.expires_at.timestamp(), 1_900_000_000);
        assert_eq!(exchanger.stage(), HandshakeStage::Exchanged);
        assert!(exchanger.pending_state().is_none());

        // Replaying the same callback never succeeds
        let replay = exchanger.complete_callback("auth_code_123", &nonce).await;
        assert_eq!(replay.unwrap_err(), AuthError::StateMismatch);
        assert_eq!(exchanger.stage(), HandshakeStage::Exchanged);
        assert_eq!(exchanger.initiate().unwrap_err(), AuthError::HandshakeFinished);
    }

    #[tokio::test]
    async fn test_proxy_error_status_fails_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": "Failed to exchange code for token"
            })))
            .mount(&server)
            .await;

        let mut exchanger = OAuthExchanger::new(settings(&server.uri()));
        let nonce = state_param(&exchanger.initiate().unwrap());

        let result = exchanger.complete_callback("code", &nonce).await;
        assert!(matches!(result, Err(AuthError::ExchangeFailed(_))));
        assert_eq!(exchanger.stage(), HandshakeStage::Failed);
    }

    #[tokio::test]
    async fn test_relayed_provider_error_fails_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired."
            })))
            .mount(&server)
            .await;

        let mut exchanger = OAuthExchanger::new(settings(&server.uri()));
        let nonce = state_param(&exchanger.initiate().unwrap());

        let result = exchanger.complete_callback("stale", &nonce).await;
        assert_eq!(
            result.unwrap_err(),
            AuthError::ExchangeFailed("The code passed is incorrect or expired.".into())
        );
    }

    #[test]
    fn test_missing_expiry_defaults_to_one_day() {
        let now = Utc::now();
        let body = ExchangeResponse {
            access_token: Some("gho_x".into()),
            expires_at: None,
            scope: None,
            error: None,
            error_description: None,
        };

        let token = parse_exchange_response(body, now).unwrap();
        assert_eq!(token.expires_at, now + Duration::days(1));
        assert_eq!(token.scope, "");
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let body = ExchangeResponse {
            access_token: Some(String::new()),
            expires_at: None,
            scope: None,
            error: None,
            error_description: None,
        };
        assert!(matches!(
            parse_exchange_response(body, Utc::now()),
            Err(AuthError::ExchangeFailed(_))
        ));
    }
}
