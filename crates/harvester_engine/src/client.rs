use std::time::Duration;

use engine_logging::engine_debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;

use crate::{FailureKind, FetchError};

pub const DEFAULT_USER_AGENT: &str = concat!("wiki-link-harvester/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// HTTP channel to a single API endpoint.
///
/// Cookies set by the server are kept for the lifetime of the client, which is
/// what carries the logged-in identity between calls.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl ApiClient {
    pub fn new(endpoint: &str, settings: &ClientSettings) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(FetchError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {}", endpoint.scheme()),
            ));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent.as_str())
            .cookie_store(true)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `GET endpoint?params` and return the raw body of a successful response.
    pub async fn get<K, V>(&self, params: &[(K, V)]) -> Result<Vec<u8>, FetchError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())));
        engine_debug!("GET {}", url);

        let response = self.http.get(url).send().await.map_err(map_reqwest_error)?;
        read_body(response).await
    }

    /// `POST endpoint` with an url-encoded form body.
    pub async fn post_form<K, V>(&self, fields: &[(K, V)]) -> Result<Vec<u8>, FetchError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .finish();
        engine_debug!("POST {} ({} form fields)", self.endpoint, fields.len());

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    Ok(bytes.to_vec())
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return FetchError::new(FailureKind::Decode, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
