use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_stream::try_stream;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::{Method, RequestBuilder as ReqwestRequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::convert::{self, BinaryPayload};
use crate::error::{self, RequestError};
use crate::route::{PathParam, RouteBuilder};
use crate::sse::{SseField, SseParser};

/// File downloads retry up to this many attempts, with no backoff between
/// them.
const DOWNLOAD_ATTEMPTS: u32 = 3;

/// HTTP method for API endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
        }
    }
}

/// Authentication method for API requests
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// Bearer token authentication (Authorization: Bearer <token>)
    Bearer(String),
    /// API key header (e.g., x-api-key: <key>)
    ApiKey { header_name: String, key: String },
    /// Query parameter authentication (e.g., ?key=<key>)
    QueryParam(String, String),
}

/// An API endpoint: a path relative to the configured base URL plus the
/// ordered path-parameter directives applied while building the final URL.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub params: Vec<PathParam>,
    pub extra_headers: Option<HashMap<String, String>>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            params: Vec::new(),
            extra_headers: None,
        }
    }

    #[must_use]
    pub fn with_param(mut self, param: PathParam) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_param(PathParam::Id(id.into()))
    }

    #[must_use]
    pub fn with_query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_param(PathParam::Query {
            key: key.into(),
            value: value.into(),
        })
    }

    #[must_use]
    pub fn with_rpc_method(self, method: impl Into<String>) -> Self {
        self.with_param(PathParam::Method(method.into()))
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers = self.extra_headers.unwrap_or_default();
        headers.insert(key.into(), value.into());
        self.extra_headers = Some(headers);
        self
    }
}

/// Configuration for request building
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub base_url: String,
    /// Substituted into the `{version}` placeholder of every route.
    pub api_version: Option<String>,
    pub auth: Option<AuthMethod>,
    pub default_headers: HashMap<String, String>,
    pub user_agent: Option<String>,
}

impl RequestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_version: None,
            auth: None,
            default_headers: HashMap::new(),
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Options that control how streaming requests are constructed.
#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Whether to set `"stream": true` in the JSON body before sending.
    pub set_stream_field: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            set_stream_field: true,
        }
    }
}

/// Generic request dispatcher shared by all provider clients.
///
/// Builds the URL through the route builder, attaches auth and headers,
/// dispatches, and hands the response to the content-type converters.
#[derive(Debug)]
pub struct RequestBuilder {
    client: reqwest::Client,
    config: RequestConfig,
    sse: SseParser,
}

impl RequestBuilder {
    pub fn new(client: reqwest::Client, config: RequestConfig) -> Self {
        Self {
            client,
            config,
            sse: SseParser::new(),
        }
    }

    /// Replace the SSE parser used for streaming endpoints.
    #[must_use]
    pub fn with_sse_parser(mut self, sse: SseParser) -> Self {
        self.sse = sse;
        self
    }

    /// Assemble the final URL for an endpoint through the route builder.
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<String, RequestError> {
        let base = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path.trim_start_matches('/')
        );
        let mut route = RouteBuilder::new(base);
        if let Some(version) = &self.config.api_version {
            route = route.version(version.clone());
        }
        for param in &endpoint.params {
            route = route.param(param.clone());
        }
        Ok(route.build()?)
    }

    /// Build a reqwest request for the given endpoint.
    pub fn build_request(
        &self,
        endpoint: &Endpoint,
    ) -> Result<ReqwestRequestBuilder, RequestError> {
        self.build_request_with_options(endpoint, true)
    }

    /// Build a reqwest request, optionally without the JSON content type.
    pub fn build_request_with_options(
        &self,
        endpoint: &Endpoint,
        add_json_content_type: bool,
    ) -> Result<ReqwestRequestBuilder, RequestError> {
        let url = self.url_for(endpoint)?;
        let method: Method = endpoint.method.into();

        let mut req = self.client.request(method, &url);

        if let Some(auth) = &self.config.auth {
            req = match auth {
                AuthMethod::Bearer(token) => req.bearer_auth(token),
                AuthMethod::ApiKey { header_name, key } => req.header(header_name, key),
                AuthMethod::QueryParam(param_name, value) => req.query(&[(param_name, value)]),
            };
        }

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        if let Some(headers) = &endpoint.extra_headers {
            for (key, value) in headers {
                req = req.header(key, value);
            }
        }

        if let Some(user_agent) = &self.config.user_agent {
            req = req.header("user-agent", user_agent);
        }

        if add_json_content_type
            && matches!(
                endpoint.method,
                HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch
            )
        {
            req = req.header("content-type", "application/json");
        }

        Ok(req)
    }

    /// Execute a request with a JSON body and return the converted response.
    pub async fn request_json<T, B>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<T, RequestError>
    where
        T: for<'de> Deserialize<'de> + Default,
        B: Serialize,
    {
        let mut req = self.build_request(endpoint)?;
        if let Some(body) = body {
            // Normalize to a Value so a pre-serialized body is never double-encoded
            let value = serde_json::to_value(body)?;
            req = req.json(&value);
        }
        let res = req.send().await?;
        self.handle_response(res).await
    }

    /// Execute a request without a body and return the converted response.
    pub async fn request<T>(&self, endpoint: &Endpoint) -> Result<T, RequestError>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        let req = self.build_request(endpoint)?;
        let res = req.send().await?;
        self.handle_response(res).await
    }

    /// Execute a request and discard the body (delete operations).
    pub async fn request_unit(&self, endpoint: &Endpoint) -> Result<(), RequestError> {
        let req = self.build_request(endpoint)?;
        let res = req.send().await?;

        if res.status().is_success() {
            Ok(())
        } else {
            let status = res.status();
            let bytes = res.bytes().await?;
            Err(error::parse_error_response(status, bytes))
        }
    }

    /// Execute a request and return the raw bytes plus the declared content
    /// type.
    pub async fn request_bytes(
        &self,
        endpoint: &Endpoint,
    ) -> Result<(bytes::Bytes, String), RequestError> {
        self.request_bytes_with_body::<Value>(endpoint, None).await
    }

    async fn request_bytes_with_body<B: Serialize>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<(bytes::Bytes, String), RequestError> {
        let mut req = self.build_request(endpoint)?;
        if let Some(body) = body {
            let value = serde_json::to_value(body)?;
            req = req.json(&value);
        }
        let res = req.send().await?;

        let status = res.status();
        let content_type = content_type_of(&res);
        let bytes = res.bytes().await?;
        if status.is_success() {
            Ok((bytes, content_type))
        } else {
            Err(error::parse_error_response(status, bytes))
        }
    }

    /// Execute a binary-mode request and convert the payload by content type.
    ///
    /// Audio decodes into a playable buffer, images into a pixel buffer, and
    /// anything else is saved opaquely when `output_path` is given.
    pub async fn request_media<B: Serialize>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
        output_path: Option<&Path>,
    ) -> Result<BinaryPayload, RequestError> {
        let (bytes, content_type) = self.request_bytes_with_body(endpoint, body).await?;
        convert::convert_binary(&content_type, bytes, output_path).await
    }

    /// Download the response body to `path`, retrying up to three attempts
    /// with no backoff. Parent directories are created on demand.
    pub async fn download(
        &self,
        endpoint: &Endpoint,
        path: &Path,
    ) -> Result<PathBuf, RequestError> {
        let mut last_err: Option<RequestError> = None;

        for attempt in 1..=DOWNLOAD_ATTEMPTS {
            match self.try_download(endpoint, path).await {
                Ok(()) => return Ok(path.to_path_buf()),
                Err(err) => {
                    warn!(attempt, "download attempt failed: {err}");
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            RequestError::UnexpectedResponse("download failed with no recorded error".to_string())
        }))
    }

    async fn try_download(&self, endpoint: &Endpoint, path: &Path) -> Result<(), RequestError> {
        let req = self.build_request(endpoint)?;
        let res = req.send().await?;

        let status = res.status();
        let bytes = res.bytes().await?;
        if !status.is_success() {
            return Err(error::parse_error_response(status, bytes));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }

    /// Execute a streaming request, yielding one deserialized chunk per SSE
    /// Data value until the done sentinel or the end of the transport stream.
    pub fn stream<T, B>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> BoxStream<'static, Result<T, RequestError>>
    where
        T: for<'de> Deserialize<'de> + Send + 'static,
        B: Serialize,
    {
        let body_value = match body {
            Some(b) => match serde_json::to_value(b) {
                Ok(value) => Some(value),
                Err(e) => {
                    return Box::pin(stream::once(async move { Err(RequestError::Json(e)) }));
                }
            },
            None => None,
        };

        self.stream_with_options(endpoint, body_value, StreamOptions::default())
    }

    /// Execute a streaming request with fine-grained configuration.
    pub fn stream_with_options<T>(
        &self,
        endpoint: &Endpoint,
        body: Option<Value>,
        options: StreamOptions,
    ) -> BoxStream<'static, Result<T, RequestError>>
    where
        T: for<'de> Deserialize<'de> + Send + 'static,
    {
        let client = self.client.clone();
        let config = self.config.clone();
        let endpoint = endpoint.clone();
        let sse = self.sse.clone();

        Box::pin(try_stream! {
            let builder = RequestBuilder::new(client, config);
            let mut req = builder.build_request(&endpoint)?;

            if let Some(body_value) = body {
                let mut obj = match body_value {
                    Value::Object(map) => map,
                    other => {
                        Err(RequestError::InvalidEventData(format!(
                            "streaming body must be a JSON object, got {other}"
                        )))?
                    }
                };

                if options.set_stream_field {
                    obj.insert("stream".to_string(), Value::Bool(true));
                }

                req = req.json(&Value::Object(obj));
            }

            let response = req.send().await?;
            let status = response.status();

            if !status.is_success() {
                let bytes = response.bytes().await?;
                Err(error::parse_error_response(status, bytes))?;
            } else {
                let mut byte_stream = response.bytes_stream();
                let mut buffer: Vec<u8> = Vec::new();
                let mut finished = false;

                'transport: while let Some(chunk_result) = byte_stream.next().await {
                    let chunk = chunk_result?;
                    buffer.extend_from_slice(&chunk);

                    // Bytes are buffered raw and only complete lines are
                    // decoded, so a multi-byte character split across
                    // transport fragments stays intact.
                    while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline).collect();
                        let line = String::from_utf8(line_bytes)?;
                        for parsed in sse.parse(&line) {
                            if parsed.field != SseField::Data {
                                continue;
                            }
                            if sse.is_done(&parsed.value) {
                                debug!("stream done sentinel received");
                                finished = true;
                                break 'transport;
                            }
                            let chunk: T = serde_json::from_str(&parsed.value)
                                .map_err(|e| RequestError::InvalidEventData(
                                    format!("JSON parse error: {e}"),
                                ))?;
                            yield chunk;
                        }
                    }
                }

                // The final data line may arrive without a terminating
                // newline; flush whatever is still buffered.
                if !finished && !buffer.is_empty() {
                    let line = String::from_utf8(std::mem::take(&mut buffer))?;
                    for parsed in sse.parse(&line) {
                        if parsed.field != SseField::Data {
                            continue;
                        }
                        if sse.is_done(&parsed.value) {
                            debug!("stream done sentinel received");
                            break;
                        }
                        let chunk: T = serde_json::from_str(&parsed.value)
                            .map_err(|e| RequestError::InvalidEventData(
                                format!("JSON parse error: {e}"),
                            ))?;
                        yield chunk;
                    }
                }
            }
        })
    }

    /// Convert a successful response body by content type. JSON decode
    /// failures yield the default body; unsupported text types yield the
    /// default body with a warning.
    async fn handle_response<T>(&self, res: Response) -> Result<T, RequestError>
    where
        T: for<'de> Deserialize<'de> + Default,
    {
        let status = res.status();
        let content_type = content_type_of(&res);
        let bytes = res.bytes().await?;

        if status.is_success() {
            Ok(convert::parse_text_body(&content_type, &bytes).unwrap_or_default())
        } else {
            Err(error::parse_error_response(status, bytes))
        }
    }
}

fn content_type_of(res: &Response) -> String {
    res.headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string()
}
