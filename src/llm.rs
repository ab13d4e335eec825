use anyhow::{anyhow, bail, Context, Result};
use async_stream::try_stream;
use futures_core::stream::Stream;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;
use std::time::Duration;

pub const MOCK_RESPONSE_ENV: &str = "CODEMATE_MOCK_RESPONSE";

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub endpoint: String,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

pub struct GenerateClient {
    http: Client,
}

impl GenerateClient {
    pub fn new_with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub async fn send(&self, req: &GenerateRequest) -> Result<String> {
        let url = generate_url(&req.endpoint);
        let body = GenerateBody { model: &req.model, prompt: &req.prompt, stream: false };
        let res = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("sending generate request to {}", url))?;
        if res.status() != StatusCode::OK {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            bail!("generate endpoint error {}: {}", status, text);
        }
        let text = res.text().await.context("reading generate response body")?;
        decode_generate_body(&text)
    }

    /// Stream NDJSON chunks as they arrive, yielding each `response` piece.
    pub async fn send_stream(
        &self,
        req: &GenerateRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        let url = generate_url(&req.endpoint);
        let body = GenerateBody { model: &req.model, prompt: &req.prompt, stream: true };
        let res = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("sending generate request to {}", url))?;
        if res.status() != StatusCode::OK {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            bail!("generate endpoint error {}: {}", status, text);
        }

        let byte_stream = res.bytes_stream();
        let s = try_stream! {
            use futures_util::StreamExt;
            futures_util::pin_mut!(byte_stream);
            let mut pending = String::new();
            while let Some(chunk) = byte_stream.next().await {
                let bytes = chunk.map_err(|e| anyhow!(e))?;
                pending.push_str(&String::from_utf8_lossy(&bytes));
                while let Some(nl) = pending.find('\n') {
                    let line: String = pending.drain(..=nl).collect();
                    if let Some(piece) = decode_stream_line(line.trim())? {
                        yield piece;
                    }
                }
            }
            if let Some(piece) = decode_stream_line(pending.trim())? {
                yield piece;
            }
        };
        Ok(Box::pin(s))
    }
}

fn generate_url(endpoint: &str) -> String {
    format!("{}/api/generate", endpoint.trim_end_matches('/'))
}

fn decode_stream_line(line: &str) -> Result<Option<String>> {
    if line.is_empty() {
        return Ok(None);
    }
    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(_) => return Ok(None),
    };
    if let Some(err) = value.get("error").and_then(Value::as_str) {
        bail!("generate endpoint error: {}", err);
    }
    match value.get("response").and_then(Value::as_str) {
        Some(piece) if !piece.is_empty() => Ok(Some(piece.to_string())),
        _ => Ok(None),
    }
}

/// Decode a non-streaming reply. The endpoint returns either a single JSON
/// object with a string `response`, or newline-delimited objects whose
/// `response` fields concatenate in order.
pub fn decode_generate_body(body: &str) -> Result<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body.trim()) {
        if let Some(err) = value.get("error").and_then(Value::as_str) {
            bail!("generate endpoint error: {}", err);
        }
        if let Some(resp) = value.get("response").and_then(Value::as_str) {
            return Ok(resp.to_string());
        }
    }
    let mut out = String::new();
    let mut found = false;
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => continue,
        };
        if let Some(err) = value.get("error").and_then(Value::as_str) {
            bail!("generate endpoint error: {}", err);
        }
        if let Some(piece) = value.get("response").and_then(Value::as_str) {
            out.push_str(piece);
            found = true;
        }
    }
    if !found {
        bail!("generate endpoint returned no response field");
    }
    Ok(out)
}

// Backend seam so commands can run offline against the mock provider
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn send(&self, req: &GenerateRequest) -> Result<String>;
    async fn send_stream(
        &self,
        req: &GenerateRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>>;
}

pub struct HttpBackend {
    client: GenerateClient,
}

impl HttpBackend {
    pub fn new_with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self { client: GenerateClient::new_with_timeout(timeout)? })
    }
}

#[async_trait::async_trait]
impl GenerationBackend for HttpBackend {
    async fn send(&self, req: &GenerateRequest) -> Result<String> {
        self.client.send(req).await
    }

    async fn send_stream(
        &self,
        req: &GenerateRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        self.client.send_stream(req).await
    }
}

/// Offline stand-in. `CODEMATE_MOCK_RESPONSE` scripts the reply for tests.
pub struct MockBackend;

#[async_trait::async_trait]
impl GenerationBackend for MockBackend {
    async fn send(&self, req: &GenerateRequest) -> Result<String> {
        Ok(std::env::var(MOCK_RESPONSE_ENV)
            .unwrap_or_else(|_| format!("[stub response] {}", req.prompt)))
    }

    async fn send_stream(
        &self,
        req: &GenerateRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<String>> + Send>>> {
        let full = self.send(req).await?;
        let s = try_stream! {
            yield full;
        };
        Ok(Box::pin(s))
    }
}

pub fn backend_for(provider: &str, timeout: Duration) -> Result<Box<dyn GenerationBackend>> {
    match provider.to_lowercase().as_str() {
        "ollama" | "local" => Ok(Box::new(HttpBackend::new_with_timeout(timeout)?)),
        "mock" => Ok(Box::new(MockBackend)),
        other => bail!("unsupported provider: {}", other),
    }
}
