use std::fmt;

use engine_logging::{engine_debug, engine_info};
use thiserror::Error;

use crate::client::ApiClient;
use crate::decode::{decode_login, decode_token, LoginReply, TokenReply};
use crate::{FailureKind, FetchError};

/// Login result code that marks a successful handshake.
pub const LOGIN_SUCCESS: &str = "Success";

/// Bot-password credentials. The password is never printed.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    TokenRequest(#[source] FetchError),
    #[error("token request failed: {0}")]
    MissingToken(String),
    #[error("login request failed: {0}")]
    LoginRequest(#[source] FetchError),
    #[error("login failed: {result}{}", reason_suffix(.reason))]
    LoginRejected {
        result: String,
        reason: Option<String>,
    },
    #[error("unexpected login response: {0}")]
    UnexpectedLoginResponse(String),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|text| format!(" ({text})"))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Token,
    Login,
}

impl AuthError {
    /// Which of the two handshake steps failed.
    pub fn stage(&self) -> AuthStage {
        match self {
            AuthError::TokenRequest(_) | AuthError::MissingToken(_) => AuthStage::Token,
            AuthError::LoginRequest(_)
            | AuthError::LoginRejected { .. }
            | AuthError::UnexpectedLoginResponse(_) => AuthStage::Login,
        }
    }
}

/// A logged-in API channel. Owns the client whose cookie jar holds the
/// session identity.
#[derive(Debug)]
pub struct Session {
    client: ApiClient,
    username: String,
}

impl Session {
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Performs the token + login handshake. Credentials are dropped once the
/// login call returns.
pub async fn authenticate(client: ApiClient, credentials: Credentials) -> Result<Session, AuthError> {
    engine_info!("logging in as {}", credentials.username);

    let token = fetch_login_token(&client).await?;
    engine_info!("got login token");

    let body = client
        .post_form(&[
            ("action", "login"),
            ("lgname", credentials.username.as_str()),
            ("lgpassword", credentials.password.as_str()),
            ("lgtoken", token.as_str()),
            ("format", "json"),
        ])
        .await
        .map_err(AuthError::LoginRequest)?;

    let reply = decode_login(&body).map_err(|err| {
        AuthError::LoginRequest(FetchError::new(FailureKind::Decode, err.to_string()))
    })?;

    match reply {
        LoginReply::Result { result, .. } if result == LOGIN_SUCCESS => {
            engine_info!("successfully logged in as {}", credentials.username);
            Ok(Session {
                client,
                username: credentials.username,
            })
        }
        LoginReply::Result { result, reason } => Err(AuthError::LoginRejected { result, reason }),
        LoginReply::ApiError(error) => Err(AuthError::LoginRejected {
            result: error.code,
            reason: error.info,
        }),
        LoginReply::Unexpected(body) => Err(AuthError::UnexpectedLoginResponse(body)),
    }
}

async fn fetch_login_token(client: &ApiClient) -> Result<String, AuthError> {
    let body = client
        .get(&[
            ("action", "query"),
            ("meta", "tokens"),
            ("type", "login"),
            ("format", "json"),
        ])
        .await
        .map_err(AuthError::TokenRequest)?;

    let reply = decode_token(&body).map_err(|err| {
        AuthError::TokenRequest(FetchError::new(FailureKind::Decode, err.to_string()))
    })?;

    match reply {
        TokenReply::Token(token) => Ok(token),
        TokenReply::Missing(detail) => {
            engine_debug!("token response without logintoken: {}", detail);
            Err(AuthError::MissingToken(format!(
                "failed to get login token: {detail}"
            )))
        }
    }
}
