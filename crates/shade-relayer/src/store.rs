//! durable request log
//!
//! every relay attempt gets a record keyed by request id, moving
//! `RECEIVED → BROADCASTED` on success or `RECEIVED → FAILED` otherwise;
//! both end states are terminal. big integers inside the persisted
//! payload are wrapped as `{"$bigint": "<dec>"}` so round-tripping never
//! loses precision. open failures abort startup.

use std::path::Path;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{RelayerError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Received,
    Broadcasted,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayRequestRecord {
    pub id: Uuid,
    pub timestamp_ms: u64,
    pub request: Value,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// wrap a big integer for lossless json persistence
pub fn bigint_json(value: U256) -> Value {
    json!({ "$bigint": value.to_string() })
}

/// unwrap a `{"$bigint": "<dec>"}` value
pub fn bigint_from_json(value: &Value) -> Option<U256> {
    value
        .get("$bigint")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
}

pub struct RequestStore {
    db: sled::Db,
}

impl RequestStore {
    pub fn open(path: &Path) -> Result<Self> {
        let db = sled::open(path).map_err(|e| RelayerError::Store(format!("open: {e}")))?;
        Ok(Self { db })
    }

    /// insert a fresh `RECEIVED` record
    pub fn create_new_request(&self, id: Uuid, timestamp_ms: u64, request: Value) -> Result<()> {
        if self.get(id)?.is_some() {
            return Err(RelayerError::Store(format!("duplicate request id {id}")));
        }
        let record = RelayRequestRecord {
            id,
            timestamp_ms,
            request,
            status: RequestStatus::Received,
            tx_hash: None,
            error: None,
        };
        self.put(&record)
    }

    /// terminal success; only legal from `RECEIVED`
    pub fn update_broadcasted_request(&self, id: Uuid, tx_hash: &str) -> Result<()> {
        let mut record = self.expect_received(id)?;
        record.status = RequestStatus::Broadcasted;
        record.tx_hash = Some(tx_hash.to_string());
        self.put(&record)
    }

    /// terminal failure; only legal from `RECEIVED`
    pub fn update_failed_request(&self, id: Uuid, error: &str) -> Result<()> {
        let mut record = self.expect_received(id)?;
        record.status = RequestStatus::Failed;
        record.error = Some(error.to_string());
        self.put(&record)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<RelayRequestRecord>> {
        let raw = self
            .db
            .get(id.as_bytes())
            .map_err(|e| RelayerError::Store(format!("get: {e}")))?;
        match raw {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| RelayerError::Store(format!("decode {id}: {e}"))),
        }
    }

    fn expect_received(&self, id: Uuid) -> Result<RelayRequestRecord> {
        let record = self
            .get(id)?
            .ok_or_else(|| RelayerError::Store(format!("unknown request id {id}")))?;
        if record.status != RequestStatus::Received {
            return Err(RelayerError::Store(format!(
                "request {id} already terminal ({:?})",
                record.status
            )));
        }
        Ok(record)
    }

    fn put(&self, record: &RelayRequestRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| RelayerError::Store(format!("encode: {e}")))?;
        self.db
            .insert(record.id.as_bytes(), bytes)
            .map_err(|e| RelayerError::Store(format!("insert: {e}")))?;
        self.db
            .flush()
            .map_err(|e| RelayerError::Store(format!("flush: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (RequestStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        (RequestStore::open(dir.path()).unwrap(), dir)
    }

    #[test]
    fn test_lifecycle_to_broadcasted() {
        let (store, _dir) = store();
        let id = Uuid::new_v4();
        store
            .create_new_request(id, 1_700_000_000_000, json!({"scope": bigint_json(U256::from(9u64))}))
            .unwrap();

        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Received);

        store.update_broadcasted_request(id, "0xabc").unwrap();
        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Broadcasted);
        assert_eq!(record.tx_hash.as_deref(), Some("0xabc"));
        assert!(record.error.is_none());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let (store, _dir) = store();
        let id = Uuid::new_v4();
        store.create_new_request(id, 0, json!({})).unwrap();
        store.update_failed_request(id, "boom").unwrap();

        // no transition out of FAILED, in either direction
        assert!(store.update_broadcasted_request(id, "0x1").is_err());
        assert!(store.update_failed_request(id, "again").is_err());

        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.status, RequestStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let (store, _dir) = store();
        let id = Uuid::new_v4();
        store.create_new_request(id, 0, json!({})).unwrap();
        assert!(store.create_new_request(id, 1, json!({})).is_err());
    }

    #[test]
    fn test_bigint_roundtrip_preserves_precision() {
        let value = U256::from_str_radix(
            "115792089237316195423570985008687907853269984665640564039457584007913129639935",
            10,
        )
        .unwrap();
        let wrapped = bigint_json(value);
        assert_eq!(bigint_from_json(&wrapped), Some(value));

        // survives a store round trip inside a payload
        let (store, _dir) = store();
        let id = Uuid::new_v4();
        store
            .create_new_request(id, 0, json!({"amount": wrapped}))
            .unwrap();
        let record = store.get(id).unwrap().unwrap();
        assert_eq!(bigint_from_json(&record.request["amount"]), Some(value));
    }
}
