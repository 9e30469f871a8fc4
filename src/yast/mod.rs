use std::{future::Future, pin::Pin};

use serde_json::{Map, Value};

mod http;

#[cfg(test)]
pub(crate) mod fake;

pub use http::HttpYastService;

pub const SMT_READ: &str = "YaPI::SMT::Read";
pub const SMT_WRITE: &str = "YaPI::SMT::Write";

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Call surface of the system-management RPC layer.
///
/// Implementations carry the transport; callers only name the method and pass
/// a JSON object of arguments.
pub trait YastService: Send + Sync + 'static {
    fn call<'a>(
        &'a self,
        method: &'a str,
        args: Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, RemoteCallError>>;
}

#[derive(Debug)]
pub enum RemoteCallError {
    Transport {
        method: String,
        source: reqwest::Error,
    },
    Status {
        method: String,
        status: u16,
        body: String,
    },
    Decode {
        method: String,
        message: String,
    },
    Remote {
        method: String,
        message: String,
    },
}

impl RemoteCallError {
    pub fn method(&self) -> &str {
        match self {
            Self::Transport { method, .. }
            | Self::Status { method, .. }
            | Self::Decode { method, .. }
            | Self::Remote { method, .. } => method,
        }
    }
}

impl std::fmt::Display for RemoteCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { method, source } => write!(f, "{method}: transport error: {source}"),
            Self::Status {
                method,
                status,
                body,
            } => {
                if body.is_empty() {
                    write!(f, "{method}: remote returned http {status}")
                } else {
                    write!(f, "{method}: remote returned http {status}: {body}")
                }
            }
            Self::Decode { method, message } => write!(f, "{method}: invalid response: {message}"),
            Self::Remote { method, message } => write!(f, "{method}: remote error: {message}"),
        }
    }
}

impl std::error::Error for RemoteCallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Status { .. } | Self::Decode { .. } | Self::Remote { .. } => None,
        }
    }
}
