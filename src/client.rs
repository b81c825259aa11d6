//! PuppetDB REST client
//!
//! HTTP transport for sending built queries to PuppetDB's v4 query API.
//! The [`Transport`] trait is the seam between query building and I/O;
//! [`PuppetDbClient`] is its `reqwest` implementation.
//!
//! Besides entity queries the client covers PQL, command submission, and the
//! status, metadata and metrics reads.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError, CatalogRecord};
use crate::config::{ConfigError, PuppetDbConfig, RequestMethod};
use crate::query::{Comparison, Entity, Expression, QueryError};

/// Header carrying the RBAC token
pub const AUTH_HEADER: &str = "x-authentication";

/// Path of the server version endpoint
pub const VERSION_PATH: &str = "pdb/meta/v1/version";

/// Path of the server clock endpoint
pub const SERVER_TIME_PATH: &str = "pdb/meta/v1/server-time";

/// Root of the query API; PQL is sent here
pub const PQL_PATH: &str = "pdb/query/v4";

/// Command submission endpoint
pub const COMMAND_PATH: &str = "pdb/cmd/v1";

/// PuppetDB service status
pub const STATUS_PATH: &str = "status/v1/services/puppetdb-status";

/// Commands PuppetDB accepts, each pinned to the wire version this client
/// sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    DeactivateNode,
    ReplaceCatalog,
    ReplaceFacts,
    StoreReport,
}

impl Command {
    pub const ALL: [Command; 4] = [
        Self::DeactivateNode,
        Self::ReplaceCatalog,
        Self::ReplaceFacts,
        Self::StoreReport,
    ];

    /// Name sent in the `command` parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeactivateNode => "deactivate node",
            Self::ReplaceCatalog => "replace catalog",
            Self::ReplaceFacts => "replace facts",
            Self::StoreReport => "store report",
        }
    }

    /// Payload version sent in the `version` parameter
    pub fn version(&self) -> u32 {
        match self {
            Self::DeactivateNode => 3,
            Self::ReplaceCatalog => 9,
            Self::ReplaceFacts => 5,
            Self::StoreReport => 8,
        }
    }

    /// Look a command up by its wire name
    pub fn parse(name: &str) -> ClientResult<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.as_str() == name)
            .ok_or_else(|| ClientError::UnsupportedCommand(name.to_string()))
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A command ready to post: URL parameters plus the JSON body they checksum
#[derive(Debug, Clone, PartialEq)]
pub struct CommandRequest {
    pub command: Command,
    pub certname: String,
    pub body: String,
    /// Hex SHA-1 of `body`
    pub checksum: String,
}

impl CommandRequest {
    /// Serialize the payload and checksum it
    ///
    /// The payload must be an object with a string `certname`.
    pub fn new(command: Command, payload: &Value) -> ClientResult<Self> {
        let certname = payload
            .get("certname")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::InvalidCommand(format!("{command} payload has no certname"))
            })?
            .to_string();

        let body = serde_json::to_string(payload).map_err(|e| ClientError::Decode(e.to_string()))?;
        let mut hasher = Sha1::new();
        hasher.update(body.as_bytes());
        let checksum = format!("{:x}", hasher.finalize());

        Ok(Self {
            command,
            certname,
            body,
            checksum,
        })
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("command", self.command.as_str().to_string()),
            ("version", self.command.version().to_string()),
            ("certname", self.certname.clone()),
            ("checksum", self.checksum.clone()),
        ]
    }
}

/// Generation of the metrics API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetricsApi {
    /// `metrics/v1/mbeans`
    V1,
    /// `metrics/v2`, backed by Jolokia
    #[default]
    V2,
}

impl MetricsApi {
    /// Path of one metric, or of the metric listing when `name` is `None`
    pub fn path(&self, name: Option<&str>) -> String {
        match (self, name) {
            (Self::V1, None) => "metrics/v1/mbeans".to_string(),
            (Self::V1, Some(name)) => format!("metrics/v1/mbeans/{}", encode_path(name)),
            (Self::V2, None) => "metrics/v2/list".to_string(),
            (Self::V2, Some(name)) => {
                format!("metrics/v2/read/{}", encode_path(&escape_metric_name(name)))
            }
        }
    }
}

/// Jolokia GET escaping: `!` doubles, `/` and `"` take a `!` prefix
fn escape_metric_name(name: &str) -> String {
    name.replace('!', "!!").replace('/', "!/").replace('"', "!\"")
}

/// Percent-encode each segment of a path, keeping `/` separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// One request against an entity endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// JSON text, e.g. `[{"field": "certname", "order": "desc"}]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_total: bool,
    /// `None` sends with the client's configured method
    #[serde(skip)]
    pub method: Option<RequestMethod>,
}

impl QueryRequest {
    /// Request with the text form of a built query
    pub fn from_expression(query: &dyn Expression) -> Result<Self, QueryError> {
        Ok(Self {
            query: Some(query.to_query_string()?),
            ..Default::default()
        })
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_order_by(mut self, order_by: &Value) -> Self {
        self.order_by = Some(order_by.to_string());
        self
    }

    pub fn with_include_total(mut self) -> Self {
        self.include_total = true;
        self
    }

    pub fn with_method(mut self, method: RequestMethod) -> Self {
        self.method = Some(method);
        self
    }

    /// Request carrying a PQL string; surrounding whitespace is dropped
    pub fn pql(query: &str) -> Result<Self, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::Incomplete("PQL query must not be empty"));
        }
        Ok(Self {
            query: Some(query.to_string()),
            ..Default::default()
        })
    }

    /// URL parameters for a GET request
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(query) = &self.query {
            params.push(("query", query.clone()));
        }
        if let Some(order_by) = &self.order_by {
            params.push(("order_by", order_by.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if self.include_total {
            params.push(("include_total", "true".to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        params
    }
}

/// Executes requests against PuppetDB entity endpoints
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request to the endpoint of `entity` and return the decoded body
    async fn execute(&self, entity: Entity, request: &QueryRequest) -> ClientResult<Value>;
}

/// PuppetDB REST API client
pub struct PuppetDbClient {
    client: Client,
    config: PuppetDbConfig,
    base_url: String,
}

impl PuppetDbClient {
    /// Create a client from connection settings
    pub fn new(config: PuppetDbConfig) -> ClientResult<Self> {
        let base_url = config.base_url()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(token).map_err(|_| {
                ConfigError::Invalid("token contains characters not allowed in a header".to_string())
            })?;
            headers.insert(AUTH_HEADER, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.ssl_verify)
            .default_headers(headers)
            .build()
            .map_err(ClientError::Request)?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Get the current configuration
    pub fn config(&self) -> &PuppetDbConfig {
        &self.config
    }

    /// `proto://host:port{url_path}`
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Version string reported by the server
    pub async fn server_version(&self) -> ClientResult<String> {
        #[derive(Deserialize)]
        struct VersionResponse {
            version: String,
        }

        let body: VersionResponse = serde_json::from_value(self.get(VERSION_PATH).await?)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(body.version)
    }

    /// Current time on the server's clock
    pub async fn server_time(&self) -> ClientResult<DateTime<FixedOffset>> {
        #[derive(Deserialize)]
        struct ServerTimeResponse {
            server_time: String,
        }

        let body: ServerTimeResponse = serde_json::from_value(self.get(SERVER_TIME_PATH).await?)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        DateTime::parse_from_rfc3339(&body.server_time)
            .map_err(|e| ClientError::Decode(format!("server_time '{}': {}", body.server_time, e)))
    }

    /// Status document of the PuppetDB service
    pub async fn status(&self) -> ClientResult<Value> {
        self.get(STATUS_PATH).await
    }

    /// Read one metric, or list the available ones when `name` is `None`
    ///
    /// The v2 API wraps results in a Jolokia envelope; its `value` is
    /// returned and an `error` member becomes [`ClientError::Metric`].
    pub async fn metric(&self, api: MetricsApi, name: Option<&str>) -> ClientResult<Value> {
        let body = self.get(&api.path(name)).await?;
        match api {
            MetricsApi::V1 => Ok(body),
            MetricsApi::V2 => unwrap_jolokia(body),
        }
    }

    /// Run a PQL query against the query root
    pub async fn pql(&self, query: &str) -> ClientResult<Value> {
        let request = QueryRequest::pql(query)?;
        self.send_query(PQL_PATH, &request).await
    }

    /// Submit a command with its payload
    pub async fn command(&self, command: Command, payload: &Value) -> ClientResult<Value> {
        let request = CommandRequest::new(command, payload)?;
        let url = self.url(COMMAND_PATH);
        tracing::debug!(
            url = %url,
            command = %request.command,
            version = request.command.version(),
            certname = %request.certname,
            "Submitting command"
        );

        let builder = self
            .client
            .post(&url)
            .query(&request.params())
            .header(CONTENT_TYPE, "application/json")
            .body(request.body);
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_body(response).await
    }

    async fn get(&self, path: &str) -> ClientResult<Value> {
        let url = self.url(path);
        tracing::debug!(url = %url, "Sending request");
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_body(response).await
    }

    async fn send_query(&self, path: &str, request: &QueryRequest) -> ClientResult<Value> {
        let url = self.url(path);
        let method = request.method.unwrap_or(self.config.request_method);
        tracing::debug!(
            url = %url,
            method = ?method,
            query = request.query.as_deref().unwrap_or(""),
            limit = ?request.limit,
            offset = ?request.offset,
            "Sending query"
        );

        let builder = match method {
            RequestMethod::Get => self.client.get(&url).query(&request.params()),
            RequestMethod::Post => self.client.post(&url).json(request),
        };

        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_body(response).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.basic_auth() {
            Some((user, pass)) => request.basic_auth(user, Some(pass)),
            None => request,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        let err = if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_connect() {
            ClientError::Unavailable
        } else {
            ClientError::Request(e)
        };
        tracing::error!(base_url = %self.base_url, error = %err, "PuppetDB request failed");
        err
    }

    async fn read_body(&self, response: reqwest::Response) -> ClientResult<Value> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), message = %text, "PuppetDB returned an error");
            return Err(ClientError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let text = response.text().await.map_err(ClientError::Request)?;
        decode_body(&text)
    }
}

#[async_trait]
impl Transport for PuppetDbClient {
    async fn execute(&self, entity: Entity, request: &QueryRequest) -> ClientResult<Value> {
        self.send_query(&entity.endpoint_path(), request).await
    }
}

/// Decode a response body; an empty body or JSON `null` is an error
fn decode_body(text: &str) -> ClientResult<Value> {
    if text.trim().is_empty() {
        return Err(ClientError::EmptyResponse);
    }
    match serde_json::from_str(text) {
        Ok(Value::Null) => Err(ClientError::EmptyResponse),
        Ok(value) => Ok(value),
        Err(e) => Err(ClientError::Decode(e.to_string())),
    }
}

/// Take `value` out of a Jolokia response, failing on its `error` member
fn unwrap_jolokia(body: Value) -> ClientResult<Value> {
    match body {
        Value::Object(mut map) => {
            if let Some(error) = map.get("error") {
                let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
                return Err(ClientError::Metric(message));
            }
            map.remove("value")
                .ok_or_else(|| ClientError::Decode("metrics response has no value".to_string()))
        }
        other => Err(ClientError::Decode(format!("unexpected metrics response: {}", other))),
    }
}

/// Run a built query against an entity endpoint
pub async fn run_query<T: Transport + ?Sized>(
    transport: &T,
    entity: Entity,
    query: &(dyn Expression + Sync),
) -> ClientResult<Value> {
    let request = QueryRequest::from_expression(query)?;
    transport.execute(entity, &request).await
}

/// Fetch the latest catalog of a node and assemble its graph
pub async fn fetch_catalog<T: Transport + ?Sized>(transport: &T, node: &str) -> ClientResult<Catalog> {
    let body = run_query(transport, Entity::Catalogs, &Comparison::equals("certname", node)).await?;

    let record = match body {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        Value::Array(_) => return Err(ClientError::NotFound(node.to_string())),
        other => other,
    };
    let record: CatalogRecord =
        serde_json::from_value(record).map_err(|e| ClientError::Decode(e.to_string()))?;
    Ok(record.into_catalog()?)
}

// ============================================
// Errors
// ============================================

/// Errors that can occur when talking to PuppetDB
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("PuppetDB unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Empty response from PuppetDB")]
    EmptyResponse,

    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("No catalog found for {0}")]
    NotFound(String),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("Invalid command payload: {0}")]
    InvalidCommand(String),

    #[error("Metric error: {0}")]
    Metric(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
