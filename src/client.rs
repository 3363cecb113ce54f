use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUESTS, CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS};
use crate::transport::Transport;
use crate::types::{
    AddChatMessageRequest, AddChatMessageResponse, ErrorBody, Heartbeat, StartChatRequest,
    StartChatResponse,
};

/// Environment variable consulted when no backend URL is given.
pub const BACKEND_URL_ENV: &str = "CLERK_BACKEND_URL";

const DEFAULT_BACKEND_URL: &str = "http://localhost:5555/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const START_CHAT_PATH: &str = "api/start_chat";
const ADD_CHAT_MESSAGE_PATH: &str = "api/add_chat_message";
const HEARTBEAT_PATH: &str = "api/heartbeat";

/// HTTP client for the agent backend.
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
}

impl AgentClient {
    /// Create a new agent client.
    ///
    /// The backend URL can be provided directly or read from the
    /// CLERK_BACKEND_URL environment variable; failing both, the local
    /// development server is used.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = match base_url {
            Some(url) => url,
            None => env::var(BACKEND_URL_ENV).unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string()),
        };
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Process API response errors and convert to our Error type.
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {}", e),
                    Some(Box::new(e)),
                );
            }
        };

        let parsed = ErrorBody::parse(&error_body);
        let message = match parsed.error {
            Some(message) => message,
            None if !error_body.trim().is_empty() => error_body,
            None => status
                .canonical_reason()
                .unwrap_or("unrecognized status")
                .to_string(),
        };
        Error::api(status_code, parsed.error_type, message)
    }

    async fn execute<T: DeserializeOwned>(&self, path: &str, request: RequestBuilder) -> Result<T> {
        let start = Instant::now();
        CLIENT_REQUESTS.click();
        tracing::debug!(endpoint = path, "sending request to agent backend");
        let result = self.execute_inner(request).await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
        if let Err(err) = &result {
            CLIENT_REQUEST_ERRORS.click();
            tracing::debug!(endpoint = path, error = %err, "agent backend request failed");
        }
        result
    }

    async fn execute_inner<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .headers(Self::default_headers())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                Error::timeout(
                    format!("Response timed out: {}", e),
                    Some(self.timeout.as_secs_f64()),
                )
            } else {
                Error::serialization(
                    format!("Failed to parse response: {}", e),
                    Some(Box::new(e)),
                )
            }
        })
    }
}

#[async_trait]
impl Transport for AgentClient {
    async fn begin_session(&self, request: &StartChatRequest) -> Result<StartChatResponse> {
        let url = self.endpoint(START_CHAT_PATH)?;
        self.execute(START_CHAT_PATH, self.client.post(url).json(request))
            .await
    }

    async fn send_message(
        &self,
        request: &AddChatMessageRequest,
    ) -> Result<AddChatMessageResponse> {
        let url = self.endpoint(ADD_CHAT_MESSAGE_PATH)?;
        self.execute(ADD_CHAT_MESSAGE_PATH, self.client.post(url).json(request))
            .await
    }

    async fn heartbeat(&self) -> Result<Heartbeat> {
        let url = self.endpoint(HEARTBEAT_PATH)?;
        self.execute(HEARTBEAT_PATH, self.client.get(url)).await
    }
}
