//! HTTP client implementation

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::CliError;

/// HTTP client for brain communication
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str) -> Result<Self, CliError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Create a new HTTP client that authenticates every request with `token`
    pub fn with_token(base_url: &str, token: SecretString) -> Result<Self, CliError> {
        let mut client = Self::new(base_url)?;
        client.token = Some(token);
        Ok(client)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let request = self.client.request(method, &url);
        match &self.token {
            Some(token) => request.header(
                header::AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            ),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CliError> {
        let response = self.request(Method::GET, path).send().await?;
        let response = ensure_success(Method::GET, response).await?;
        Ok(response.json().await?)
    }

    /// Make a POST request and decode the JSON response
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        let response = self.post_raw(path, body).await?;
        let response = ensure_success(Method::POST, response).await?;
        Ok(response.json().await?)
    }

    /// Make a POST request whose response body is ignored
    pub async fn post_no_content<B: Serialize>(&self, path: &str, body: &B) -> Result<(), CliError> {
        let response = self.post_raw(path, body).await?;
        ensure_success(Method::POST, response).await?;
        Ok(())
    }

    /// Make a POST request and hand back the response regardless of status
    pub async fn post_raw<B: Serialize>(&self, path: &str, body: &B) -> Result<Response, CliError> {
        Ok(self.request(Method::POST, path).json(body).send().await?)
    }
}

/// Turn a non-2xx response into [`CliError::ApiError`]
pub async fn ensure_success(method: Method, response: Response) -> Result<Response, CliError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!("HTTP {} failed: {} - {}", method, status, body);

    let body = match serde_json::from_str::<brain_client::ErrorResponse>(&body) {
        Ok(err) if !err.message.is_empty() => format!("{}: {}", err.error, err.message),
        Ok(err) => err.error,
        Err(_) => body,
    };
    Err(CliError::ApiError {
        status: status.as_u16(),
        body,
    })
}
