use crate::config::{AuthStrategy, Settings};
use crate::domain::model::Credential;
use crate::domain::ports::{AuthPrompt, CredentialProvider};
use crate::utils::error::{AuthError, ConfigError};
use async_trait::async_trait;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// 解析 token 端點回應 `{ "access_token": ..., "expires_in": ... }`
fn parse_token(body: &str) -> Result<Credential, AuthError> {
    let token: TokenResponse =
        serde_json::from_str(body).map_err(|e| AuthError::MalformedResponse {
            message: e.to_string(),
        })?;

    let access_token = token
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::MalformedResponse {
            message: "response has no access_token".to_string(),
        })?;

    let expires_at = token
        .expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| Utc::now() + chrono::Duration::seconds(secs));

    Ok(Credential::new(access_token, expires_at))
}

/// Exchanges the client id/secret pair directly for a token.
pub struct ClientCredentialsProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: Option<String>,
}

impl ClientCredentialsProvider {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: Option<String>) -> Self {
        self.scope = scope;
        self
    }
}

#[async_trait]
impl CredentialProvider for ClientCredentialsProvider {
    async fn acquire(&self) -> Result<Credential, AuthError> {
        let mut form = vec![("grant_type", "client_credentials")];
        if let Some(scope) = &self.scope {
            form.push(("scope", scope.as_str()));
        }

        tracing::debug!("🔑 Requesting client-credentials token from {}", self.token_url);
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::InvalidCredentials {
                status: status.as_u16(),
                body,
            });
        }

        parse_token(&body)
    }
}

const PROMPT_GRACE: Duration = Duration::from_millis(250);

/// 互動式授權碼流程：顯示授權網址，等待使用者貼上授權碼後換取 token
pub struct InteractiveGrantProvider {
    client: Client,
    token_url: String,
    authorize_url: Url,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: Option<String>,
    code_timeout: Duration,
    prompt: Arc<dyn AuthPrompt>,
}

impl InteractiveGrantProvider {
    pub fn new(
        client: Client,
        settings: &Settings,
        prompt: Arc<dyn AuthPrompt>,
    ) -> Result<Self, ConfigError> {
        let authorize_url =
            Url::parse(&settings.endpoints.authorize_url).map_err(|e| ConfigError::Invalid {
                field: "endpoints.authorize_url".to_string(),
                value: settings.endpoints.authorize_url.clone(),
                reason: e.to_string(),
            })?;
        let redirect_uri = settings
            .redirect_uri
            .clone()
            .ok_or_else(|| ConfigError::Missing {
                field: "redirect_uri".to_string(),
            })?;

        Ok(Self {
            client,
            token_url: settings.endpoints.token_url.clone(),
            authorize_url,
            client_id: settings.effective_client_id().to_string(),
            client_secret: settings.client_secret.clone(),
            redirect_uri,
            scope: settings.scope.clone(),
            code_timeout: settings.code_timeout(),
            prompt,
        })
    }

    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_uri)
                .append_pair("state", state);
            if let Some(scope) = &self.scope {
                query.append_pair("scope", scope);
            }
        }
        url
    }

    async fn wait_for_code(&self, state: &str) -> Result<String, AuthError> {
        let url = self.authorization_url(state);
        self.prompt.present(&url);

        let timeout = self.code_timeout;
        let expired = || AuthError::Cancelled {
            reason: format!("no authorization code within {:?}", timeout),
        };

        let prompt = Arc::clone(&self.prompt);
        let reader = tokio::task::spawn_blocking(move || prompt.read_code(timeout));

        // 提示本身會在期限內返回；外層期限只防止不守規矩的實作卡住流程
        let input = match tokio::time::timeout(timeout + PROMPT_GRACE, reader).await {
            Err(_) => return Err(expired()),
            Ok(Err(join_error)) => {
                return Err(AuthError::Cancelled {
                    reason: format!("prompt task ended unexpectedly: {}", join_error),
                })
            }
            Ok(Ok(Err(e))) if e.kind() == std::io::ErrorKind::TimedOut => return Err(expired()),
            Ok(Ok(read)) => read?,
        };

        match input.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => extract_code(code, state),
            _ => Err(AuthError::Cancelled {
                reason: "no authorization code supplied".to_string(),
            }),
        }
    }
}

/// Accepts a bare code or the full redirect URL the browser landed on.
fn extract_code(input: &str, expected_state: &str) -> Result<String, AuthError> {
    let url = match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        _ => return Ok(input.to_string()),
    };

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error_description" | "error" => {
                error.get_or_insert(value.into_owned());
            }
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(AuthError::GrantDenied { status: 0, body: error });
    }
    if state.as_deref().is_some_and(|s| s != expected_state) {
        return Err(AuthError::GrantDenied {
            status: 0,
            body: "state parameter does not match the authorization request".to_string(),
        });
    }
    code.ok_or_else(|| AuthError::Cancelled {
        reason: "redirect URL did not contain a code".to_string(),
    })
}

fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

#[async_trait]
impl CredentialProvider for InteractiveGrantProvider {
    async fn acquire(&self) -> Result<Credential, AuthError> {
        let state = random_state();
        let code = self.wait_for_code(&state).await?;

        tracing::debug!("🔑 Exchanging authorization code at {}", self.token_url);
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = self.client.post(&self.token_url).form(&form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::GrantDenied {
                status: status.as_u16(),
                body,
            });
        }

        parse_token(&body)
    }
}

/// Strategy chosen by `auth_strategy`.
pub enum CredentialStrategy {
    ClientCredentials(ClientCredentialsProvider),
    Interactive(InteractiveGrantProvider),
}

impl CredentialStrategy {
    pub fn from_settings(
        settings: &Settings,
        client: Client,
        prompt: Arc<dyn AuthPrompt>,
    ) -> Result<Self, ConfigError> {
        Ok(match settings.auth_strategy {
            AuthStrategy::ClientCredentials => Self::ClientCredentials(
                ClientCredentialsProvider::new(
                    client,
                    settings.endpoints.token_url.clone(),
                    settings.effective_client_id(),
                    settings.client_secret.clone(),
                )
                .with_scope(settings.scope.clone()),
            ),
            AuthStrategy::Interactive => {
                Self::Interactive(InteractiveGrantProvider::new(client, settings, prompt)?)
            }
        })
    }
}

#[async_trait]
impl CredentialProvider for CredentialStrategy {
    async fn acquire(&self) -> Result<Credential, AuthError> {
        match self {
            CredentialStrategy::ClientCredentials(provider) => provider.acquire().await,
            CredentialStrategy::Interactive(provider) => provider.acquire().await,
        }
    }
}
