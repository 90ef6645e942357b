//! The network seam under `SessionClient`.
//!
//! # Design
//! `Transport` performs exactly one round-trip per call and never retries.
//! Every failure to get a response (DNS, refused connection, timeout, a body
//! that cannot be read) comes back as `ClientError::Network`; any status code
//! the server sends is a successful `HttpResponse`.
//!
//! `ReqwestTransport` keeps a cookie jar, which is how session cookies travel
//! with every request without the client ever seeing them.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// `reqwest`-backed transport with a persistent cookie store.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut builder = self.client.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            Some(RequestBody::Json(text)) => builder.body(text),
            Some(RequestBody::Multipart(form)) => builder.multipart(multipart(form)?),
            None => builder,
        };

        let response = builder.send().await.map_err(network)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(network)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

fn multipart(form: MultipartForm) -> Result<Form, ClientError> {
    let mut out = Form::new();
    for part in form.parts {
        let file = Part::bytes(part.bytes)
            .file_name(part.file_name)
            .mime_str(&part.content_type)
            .map_err(|e| ClientError::Serialization(e.to_string()))?;
        out = out.part(part.field, file);
    }
    Ok(out)
}

fn network(err: reqwest::Error) -> ClientError {
    ClientError::Network(err.to_string())
}
