//! Authentication CLI command handlers

use std::io::{self, Write};

use chrono::Utc;
use secrecy::SecretString;

use crate::cli::commands::{AuthCommand, ConfigOverrides};
use crate::core::config::Config;
use crate::core::credentials::{CredentialStore, TOKEN_LIFETIME_SECS};
use crate::error::{AuthError, Result, Zip2RepoError};
use crate::github::auth::{AccessToken, OAuthExchanger, OAuthSettings, OAUTH_SCOPE};
use crate::github::callback::CallbackServer;
use crate::github::client::{GitHubClient, RemoteRepoClient};
use crate::github::error_handler::open_browser;

/// Handle authentication commands
pub async fn handle_auth(command: AuthCommand, overrides: &ConfigOverrides) -> Result<()> {
    match command {
        AuthCommand::Login { pat } => {
            let config = overrides.load_config()?;
            if pat {
                handle_login_pat(&config).await
            } else {
                handle_login_oauth(&config).await
            }
        }
        AuthCommand::Logout => handle_logout(),
        AuthCommand::Status => handle_status(),
    }
}

fn already_authenticated() -> Result<bool> {
    if CredentialStore::has_token()? {
        println!("✓ Already authenticated with GitHub.");
        println!();
        println!("  To re-authenticate, first run: z2r auth logout");
        return Ok(true);
    }
    Ok(false)
}

/// Handle the login command using the browser authorization-code flow
async fn handle_login_oauth(config: &Config) -> Result<()> {
    if already_authenticated()? {
        return Ok(());
    }

    let client_id = config.client_id.clone().ok_or_else(|| {
        Zip2RepoError::Config(
            "No OAuth client ID configured.\n\n  → Run 'z2r config set client-id <ID>' or set ZIP2REPO_CLIENT_ID.".to_string(),
        )
    })?;

    let settings = OAuthSettings::new(client_id, &config.redirect_uri, &config.proxy_url);
    let listener = CallbackServer::from_redirect_uri(&config.redirect_uri)?
        .bind()
        .await?;
    let mut exchanger = OAuthExchanger::new(settings);
    let authorize_url = exchanger.initiate()?;

    let waiter = tokio::spawn(listener.wait_for_callback(config.callback_timeout()));

    println!("Starting GitHub authentication...\n");
    println!("Open this URL in your browser:");
    println!("  {}", authorize_url);
    println!();

    if open_browser(authorize_url.as_str()) {
        println!("✓ Browser opened automatically.");
    }
    exchanger.await_callback();

    println!("Waiting for authorization...");

    let callback = waiter
        .await
        .map_err(|e| AuthError::Callback(e.to_string()))??;
    let token = exchanger
        .complete_callback(&callback.code, &callback.state)
        .await?;

    CredentialStore::store_token(&token)?;

    println!("\n✓ Successfully authenticated with GitHub!");
    report_login(config, &token.value).await;
    Ok(())
}

/// Handle login using a Personal Access Token
async fn handle_login_pat(config: &Config) -> Result<()> {
    if already_authenticated()? {
        return Ok(());
    }

    println!("Personal Access Token Authentication");
    println!("====================================");
    println!();
    println!("To create a token:");
    println!("  1. Go to: https://github.com/settings/tokens/new");
    println!("  2. Give it a name (e.g., 'zip2repo')");
    println!("  3. Select the 'repo' scope");
    println!("  4. Click 'Generate token' and copy it");
    println!();

    let token_url = "https://github.com/settings/tokens/new?scopes=repo&description=zip2repo";
    if open_browser(token_url) {
        println!("✓ Browser opened to token creation page.");
        println!();
    }

    print!("Paste your token here: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();

    if input.is_empty() {
        return Err(Zip2RepoError::InvalidInput("No token provided".to_string()));
    }

    let value = SecretString::from(input);

    println!();
    println!("Validating token...");
    let client = GitHubClient::new(&value, &config.api_base)?;
    let login = client.authenticated_user().await.map_err(|_| {
        Zip2RepoError::InvalidInput(
            "Invalid token. Please check the token and try again.".to_string(),
        )
    })?;

    CredentialStore::store_token(&pat_token(value))?;

    println!("✓ Token valid! Logged in as @{}", login);
    println!("  Stored for 24 hours; run 'z2r auth login --pat' again after that.");
    Ok(())
}

/// Wrap a pasted token with the store's standard lifetime
fn pat_token(value: SecretString) -> AccessToken {
    AccessToken {
        value,
        expires_at: Utc::now() + chrono::Duration::seconds(TOKEN_LIFETIME_SECS),
        scope: OAUTH_SCOPE.to_string(),
    }
}

/// Print who the new token belongs to
async fn report_login(config: &Config, token: &SecretString) {
    let login = match GitHubClient::new(token, &config.api_base) {
        Ok(client) => client.authenticated_user().await,
        Err(e) => Err(e),
    };
    match login {
        Ok(login) => println!("  Logged in as @{}", login),
        Err(e) => tracing::warn!(error = %e, "could not look up authenticated user"),
    }
}

/// Handle the logout command
fn handle_logout() -> Result<()> {
    // Expired tokens are still removed
    if CredentialStore::get_token()?.is_none() {
        println!("Not currently authenticated.");
        return Ok(());
    }

    CredentialStore::delete_token()?;
    println!("Successfully logged out.");
    Ok(())
}

/// Handle the status command
fn handle_status() -> Result<()> {
    println!("Authentication Status:");

    if let Some(token) = CredentialStore::env_token() {
        println!("  GitHub: Authenticated (GITHUB_TOKEN)");
        println!("\n  GitHub token: {}", CredentialStore::mask_token(&token));
        return Ok(());
    }

    let Some(token) = CredentialStore::get_token()? else {
        println!("  GitHub: Not authenticated");
        return Ok(());
    };

    if CredentialStore::is_token_expired(&token) {
        println!("  GitHub: Session expired (run 'z2r auth login' again)");
        return Ok(());
    }

    println!("  GitHub: Authenticated");
    println!("\n  GitHub token: {}", CredentialStore::mask_token(&token.value));
    println!("  Scope: {}", token.scope);

    let expires_in = token.expires_at.signed_duration_since(Utc::now());
    let hours = expires_in.num_hours();
    let minutes = expires_in.num_minutes() % 60;
    if hours > 0 {
        println!("  Token expires in: {}h {}m", hours, minutes);
    } else {
        println!("  Token expires in: {}m", minutes);
    }

    Ok(())
}
