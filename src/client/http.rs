//! reqwest-based transport and the HTTP implementation of [`ProjectBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{ProjectBackend, ProjectResources};
use crate::auth::API_KEY_HEADER;
use crate::config::Config;
use crate::errors::{ConsoleError, ConsoleResult};
use crate::models::{CreateNetworkRequest, Network, Project};

/// Thin JSON-over-HTTP client rooted at the console API base URL.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    pub fn new(base_url: &str, api_psk: Option<&str>, timeout: Duration) -> ConsoleResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConsoleError::BadRequest(format!("Invalid API URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConsoleError::BadRequest(format!(
                "API URL {} cannot be used as a base",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = api_psk {
            let value = HeaderValue::from_str(key).map_err(|_| {
                ConsoleError::BadRequest("API key contains invalid header characters".to_string())
            })?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> ConsoleResult<Self> {
        Self::new(
            &config.api_url,
            config.api_psk.as_deref(),
            config.request_timeout,
        )
    }

    /// Absolute URL for the given path segments; each segment is percent-encoded.
    pub fn url(&self, segments: &[&str]) -> ConsoleResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConsoleError::Internal(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ConsoleResult<T> {
        let request = self.client.get(self.url(segments)?);
        Ok(self.send(request).await?.json().await?)
    }

    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> ConsoleResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.post(self.url(segments)?).json(body);
        Ok(self.send(request).await?.json().await?)
    }

    /// POST without a request body, decoding the answer.
    pub async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> ConsoleResult<T> {
        let request = self.client.post(self.url(segments)?);
        Ok(self.send(request).await?.json().await?)
    }

    /// POST without a request body, ignoring the answer's body.
    pub async fn post_no_content(&self, segments: &[&str]) -> ConsoleResult<()> {
        let request = self.client.post(self.url(segments)?);
        self.send(request).await?;
        Ok(())
    }

    pub async fn put_json<B, T>(&self, segments: &[&str], body: &B) -> ConsoleResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.client.put(self.url(segments)?).json(body);
        Ok(self.send(request).await?.json().await?)
    }

    pub async fn delete(&self, segments: &[&str]) -> ConsoleResult<()> {
        let request = self.client.delete(self.url(segments)?);
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ConsoleResult<T> {
        let request = self.client.delete(self.url(segments)?);
        Ok(self.send(request).await?.json().await?)
    }

    async fn send(&self, request: RequestBuilder) -> ConsoleResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!("{} answered {}", url, status);
        Err(ConsoleError::from_response(status, &body))
    }
}

/// [`ProjectBackend`] over the console REST API.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    http: HttpClient,
}

impl HttpBackend {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn from_config(config: &Config) -> ConsoleResult<Self> {
        Ok(Self::new(HttpClient::from_config(config)?))
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Sub-resource client bound to `project`.
    pub fn resources(&self, project: &Project) -> ProjectResources {
        ProjectResources::new(self.http.clone(), project)
    }
}

#[async_trait]
impl ProjectBackend for HttpBackend {
    async fn list_projects(&self) -> ConsoleResult<Vec<Project>> {
        self.http.get_json(&["projects"]).await
    }

    async fn create_project(&self, draft: &Project) -> ConsoleResult<Project> {
        self.http.post_json(&["projects"], draft).await
    }

    async fn update_project(&self, resource_name: &str, body: &Value) -> ConsoleResult<Project> {
        self.http.put_json(&["projects", resource_name], body).await
    }

    async fn delete_project(&self, resource_name: &str) -> ConsoleResult<()> {
        self.http.delete(&["projects", resource_name]).await
    }

    async fn set_default_project(&self, resource_name: &str) -> ConsoleResult<Project> {
        self.http
            .post_empty(&["projects", resource_name, "defaultProject"])
            .await
    }

    async fn revoke_authorization(&self, resource_name: &str) -> ConsoleResult<Project> {
        self.http
            .delete_json(&["projects", resource_name, "authorized"])
            .await
    }

    async fn verify_authorization(&self, resource_name: &str) -> ConsoleResult<bool> {
        match self
            .http
            .post_no_content(&["projects", resource_name, "authorized"])
            .await
        {
            Ok(()) => Ok(true),
            Err(ConsoleError::Backend { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16() =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_network(
        &self,
        resource_name: &str,
        request: &CreateNetworkRequest,
    ) -> ConsoleResult<Network> {
        self.http
            .post_json(&["projects", resource_name, "networks"], request)
            .await
    }
}
