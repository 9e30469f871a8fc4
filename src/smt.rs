//! The SMT configuration resource as seen through the system-management RPC layer.
//!
//! There is exactly one SMT configuration per managed system, so nothing here
//! takes an identifier. Reads produce a fresh [`ConfigSnapshot`] every time and
//! nothing is cached between calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    oplog::OpLog,
    yast::{RemoteCallError, SMT_READ, SMT_WRITE, YastService},
};

/// One point-in-time view of the remote SMT configuration.
///
/// The remote service owns the schema, so the payload is carried as opaque JSON
/// and no consistency is checked here. Known keys that are present keep their
/// value even when it is `null`; every other top-level key, including the legacy
/// `smt`, is kept verbatim in `extra` so remote schema changes stay visible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct ConfigSnapshot {
    /// Full configuration payload. Filled from `smt` when the remote only
    /// reports the legacy key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,

    /// Status indicator, meaningful only to the remote service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<Map<String, Value>> for ConfigSnapshot {
    fn from(mut fields: Map<String, Value>) -> Self {
        let configuration = fields
            .remove("configuration")
            .or_else(|| fields.get("smt").cloned());
        let status = fields.remove("status");
        Self {
            configuration,
            status,
            extra: fields,
        }
    }
}

impl ConfigSnapshot {
    /// Wraps a raw `Read` result. Any JSON object is accepted as-is.
    pub fn from_remote(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn status_str(&self) -> Option<&str> {
        self.status.as_ref().and_then(Value::as_str)
    }

    /// Looks up a top-level key of the configuration payload, if it is an object.
    pub fn configuration_field(&self, key: &str) -> Option<&Value> {
        self.configuration.as_ref()?.as_object()?.get(key)
    }
}

/// Reads and writes the SMT configuration through an injected [`YastService`].
#[derive(Clone)]
pub struct ConfigProxy {
    yast: Arc<dyn YastService>,
    log: Arc<dyn OpLog>,
}

impl ConfigProxy {
    pub fn new(yast: Arc<dyn YastService>, log: Arc<dyn OpLog>) -> Self {
        Self { yast, log }
    }

    pub async fn retrieve(&self) -> Result<ConfigSnapshot, RemoteCallError> {
        let ret = self.yast.call(SMT_READ, Map::new()).await?;
        self.log.info(&format!("Read SMT config: {ret}"));
        ConfigSnapshot::from_remote(ret).map_err(|e| RemoteCallError::Decode {
            method: SMT_READ.to_string(),
            message: e.to_string(),
        })
    }

    /// Asks the remote service to write the SMT configuration.
    ///
    /// The write is always sent with an empty argument map; the fields of
    /// `snapshot` are logged but not transmitted. Whether the remote side is
    /// meant to recompute the configuration on its own is unresolved, so this
    /// must not start forwarding the snapshot without confirming the remote
    /// contract first. The acknowledgement is discarded.
    pub async fn submit(&self, snapshot: &ConfigSnapshot) -> Result<(), RemoteCallError> {
        self.log.info(&format!("Writing SMT config: {snapshot:?}"));
        let _ack = self.yast.call(SMT_WRITE, Map::new()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{oplog::RecordingLog, yast::fake::FakeYast};

    fn proxy(yast: FakeYast) -> (ConfigProxy, Arc<FakeYast>, Arc<RecordingLog>) {
        let yast = Arc::new(yast);
        let log = Arc::new(RecordingLog::default());
        (ConfigProxy::new(yast.clone(), log.clone()), yast, log)
    }

    #[tokio::test]
    async fn retrieve_wraps_remote_value_without_transforming_it() {
        let remote = json!({
            "status": "enabled",
            "configuration": { "proxy_url": "https://smt.example.com" }
        });
        let (proxy, yast, _log) = proxy(FakeYast::new().reply(remote));

        let snapshot = proxy.retrieve().await.unwrap();

        assert_eq!(snapshot.status_str(), Some("enabled"));
        assert_eq!(
            snapshot.configuration_field("proxy_url"),
            Some(&json!("https://smt.example.com"))
        );
        assert_eq!(
            snapshot.configuration,
            Some(json!({ "proxy_url": "https://smt.example.com" }))
        );
        assert!(snapshot.extra.is_empty());

        let calls = yast.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, SMT_READ);
        assert!(calls[0].args.is_empty());
    }

    #[tokio::test]
    async fn retrieve_logs_the_raw_remote_value() {
        let (proxy, _yast, log) = proxy(FakeYast::new().reply(json!({ "status": "disabled" })));

        proxy.retrieve().await.unwrap();

        assert_eq!(
            log.lines(),
            vec![r#"Read SMT config: {"status":"disabled"}"#.to_string()]
        );
    }

    #[tokio::test]
    async fn retrieve_accepts_legacy_smt_key_and_keeps_unknown_fields() {
        let remote = json!({
            "smt": { "NUUrl": "https://nu.novell.com/" },
            "status": true,
            "schema": 2
        });
        let (proxy, _yast, _log) = proxy(FakeYast::new().reply(remote));

        let snapshot = proxy.retrieve().await.unwrap();

        assert_eq!(
            snapshot.configuration,
            Some(json!({ "NUUrl": "https://nu.novell.com/" }))
        );
        assert_eq!(snapshot.status, Some(json!(true)));
        assert_eq!(snapshot.status_str(), None);
        assert_eq!(snapshot.extra.get("schema"), Some(&json!(2)));
        assert_eq!(
            snapshot.extra.get("smt"),
            Some(&json!({ "NUUrl": "https://nu.novell.com/" }))
        );
    }

    #[tokio::test]
    async fn retrieve_keeps_both_legacy_and_current_configuration_keys() {
        let remote = json!({ "smt": { "a": 1 }, "configuration": { "b": 2 } });
        let (proxy, _yast, _log) = proxy(FakeYast::new().reply(remote.clone()));

        let snapshot = proxy.retrieve().await.unwrap();

        assert_eq!(snapshot.configuration, Some(json!({ "b": 2 })));
        assert_eq!(snapshot.extra.get("smt"), Some(&json!({ "a": 1 })));
        assert_eq!(serde_json::to_value(&snapshot).unwrap(), remote);
    }

    #[tokio::test]
    async fn retrieve_keeps_explicit_nulls() {
        let remote = json!({ "status": null, "configuration": null });
        let (proxy, _yast, _log) = proxy(FakeYast::new().reply(remote.clone()));

        let snapshot = proxy.retrieve().await.unwrap();

        assert_eq!(snapshot.status, Some(Value::Null));
        assert_eq!(snapshot.configuration, Some(Value::Null));
        assert_eq!(serde_json::to_value(&snapshot).unwrap(), remote);
    }

    #[tokio::test]
    async fn retrieve_carries_error_key_next_to_other_fields() {
        let remote = json!({ "error": "stale cache", "status": "enabled" });
        let (proxy, _yast, _log) = proxy(FakeYast::new().reply(remote.clone()));

        let snapshot = proxy.retrieve().await.unwrap();

        assert_eq!(snapshot.status_str(), Some("enabled"));
        assert_eq!(snapshot.configuration, None);
        assert_eq!(snapshot.extra.get("error"), Some(&json!("stale cache")));
        assert_eq!(serde_json::to_value(&snapshot).unwrap(), remote);
    }

    #[tokio::test]
    async fn retrieve_passes_unexpected_shapes_through() {
        let (proxy, _yast, _log) = proxy(FakeYast::new().reply(json!({ "configuration": [1, 2] })));

        let snapshot = proxy.retrieve().await.unwrap();

        assert_eq!(snapshot.configuration, Some(json!([1, 2])));
        assert_eq!(snapshot.configuration_field("proxy_url"), None);
    }

    #[tokio::test]
    async fn retrieve_propagates_remote_failure_and_logs_nothing() {
        let (proxy, _yast, log) = proxy(FakeYast::new().fail("service unavailable"));

        let err = proxy.retrieve().await.unwrap_err();

        assert!(matches!(
            &err,
            RemoteCallError::Remote { method, message }
                if method == SMT_READ && message == "service unavailable"
        ));
        assert!(log.lines().is_empty());
    }

    #[tokio::test]
    async fn retrieve_rejects_non_object_response_as_decode_error() {
        let (proxy, _yast, _log) = proxy(FakeYast::new().reply(json!("enabled")));

        let err = proxy.retrieve().await.unwrap_err();

        assert!(matches!(err, RemoteCallError::Decode { .. }));
        assert_eq!(err.method(), SMT_READ);
    }

    #[tokio::test]
    async fn consecutive_retrieves_return_independent_snapshots() {
        let (proxy, _yast, _log) = proxy(
            FakeYast::new()
                .reply(json!({ "status": "enabled", "configuration": { "a": 1 } }))
                .reply(json!({ "status": "disabled", "configuration": { "a": 2 } })),
        );

        let mut first = proxy.retrieve().await.unwrap();
        let second = proxy.retrieve().await.unwrap();

        assert_eq!(first.status_str(), Some("enabled"));
        assert_eq!(second.status_str(), Some("disabled"));

        first.configuration = Some(json!({ "a": 99 }));
        assert_eq!(second.configuration_field("a"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn submit_sends_empty_payload_regardless_of_snapshot() {
        let (proxy, yast, _log) = proxy(FakeYast::new().reply(json!({ "ok": true })));
        let snapshot = ConfigSnapshot {
            configuration: Some(json!({ "proxy_url": "https://smt.example.com" })),
            status: Some(json!("enabled")),
            extra: Map::new(),
        };

        proxy.submit(&snapshot).await.unwrap();

        let calls = yast.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, SMT_WRITE);
        assert_eq!(calls[0].args, Map::new());
    }

    #[tokio::test]
    async fn submit_logs_snapshot_before_calling_remote() {
        let (proxy, _yast, log) = proxy(FakeYast::new().fail("denied"));
        let snapshot = ConfigSnapshot {
            status: Some(json!("enabled")),
            ..ConfigSnapshot::default()
        };

        let _ = proxy.submit(&snapshot).await;

        let lines = log.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Writing SMT config: ConfigSnapshot"));
        assert!(lines[0].contains("enabled"));
    }

    #[tokio::test]
    async fn submit_propagates_remote_failure() {
        let (proxy, _yast, _log) = proxy(FakeYast::new().fail("write rejected"));

        let err = proxy.submit(&ConfigSnapshot::default()).await.unwrap_err();

        assert!(matches!(
            &err,
            RemoteCallError::Remote { method, message }
                if method == SMT_WRITE && message == "write rejected"
        ));
    }

    #[test]
    fn snapshot_serializes_known_fields_and_extras_flat() {
        let mut extra = Map::new();
        extra.insert("schema".to_string(), json!(2));
        let snapshot = ConfigSnapshot {
            configuration: Some(json!({ "proxy_url": "https://smt.example.com" })),
            status: None,
            extra,
        };

        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({
                "configuration": { "proxy_url": "https://smt.example.com" },
                "schema": 2
            })
        );
    }
}
