use std::time::Duration;

use serde_json::{Map, Value};
use tracing::debug;

use super::{BoxFuture, RemoteCallError, YastService};

const MAX_ERROR_BODY_BYTES: usize = 512;

/// `YastService` over HTTP: `POST {base}/call/{method}` with the args object as body.
///
/// A 2xx body that is exactly `{"error": "<string>"}` is taken as a remote-side
/// rejection and returned as [`RemoteCallError::Remote`]. A result with that
/// exact shape therefore never reaches the caller as data; an `error` key next
/// to any other key is passed through unchanged.
#[derive(Clone)]
pub struct HttpYastService {
    base: String,
    client: reqwest::Client,
}

impl HttpYastService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(format!("smt-ws/{}", crate::version::VERSION))
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base: base_url.into(),
            client,
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/call/{}", self.base.trim_end_matches('/'), method)
    }

    async fn post(&self, method: &str, args: Map<String, Value>) -> Result<Value, RemoteCallError> {
        let transport = |source| RemoteCallError::Transport {
            method: method.to_string(),
            source,
        };

        let resp = self
            .client
            .post(self.url(method))
            .json(&args)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(transport)?;
        debug!(method, status = status.as_u16(), len = bytes.len(), "yast call returned");

        if !status.is_success() {
            return Err(RemoteCallError::Status {
                method: method.to_string(),
                status: status.as_u16(),
                body: truncate_body(&bytes),
            });
        }

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| RemoteCallError::Decode {
                method: method.to_string(),
                message: e.to_string(),
            })?;

        if let Some(message) = remote_error_message(&value) {
            return Err(RemoteCallError::Remote {
                method: method.to_string(),
                message,
            });
        }

        Ok(value)
    }
}

impl YastService for HttpYastService {
    fn call<'a>(
        &'a self,
        method: &'a str,
        args: Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, RemoteCallError>> {
        Box::pin(self.post(method, args))
    }
}

// A rejection is reported as a bare `{"error": "..."}` object.
fn remote_error_message(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    if obj.len() != 1 {
        return None;
    }
    obj.get("error")?.as_str().map(str::to_string)
}

fn truncate_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.len() <= MAX_ERROR_BODY_BYTES {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
