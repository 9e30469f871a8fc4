use std::{collections::VecDeque, sync::Mutex};

use serde_json::{Map, Value};

use super::{BoxFuture, RemoteCallError, YastService};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub method: String,
    pub args: Map<String, Value>,
}

/// Scripted `YastService`: answers calls in order and records what it was asked.
#[derive(Default)]
pub(crate) struct FakeYast {
    replies: Mutex<VecDeque<Result<Value, RemoteCallError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeYast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, value: Value) -> Self {
        self.push(Ok(value));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.push(Err(RemoteCallError::Remote {
            method: String::new(),
            message: message.to_string(),
        }));
        self
    }

    fn push(&self, reply: Result<Value, RemoteCallError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl YastService for FakeYast {
    fn call<'a>(
        &'a self,
        method: &'a str,
        args: Map<String, Value>,
    ) -> BoxFuture<'a, Result<Value, RemoteCallError>> {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            args,
        });
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Value::Object(Map::new())));
        // Failures carry the method they were raised for.
        let reply = reply.map_err(|e| match e {
            RemoteCallError::Remote { message, .. } => RemoteCallError::Remote {
                method: method.to_string(),
                message,
            },
            other => other,
        });
        Box::pin(async move { reply })
    }
}
