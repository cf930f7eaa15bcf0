//! Schema versioning for stored payloads.
//!
//! A feature whose payload shape changes incompatibly registers a [`Schema`]
//! for its key instead of moving to a new key. Payloads for such keys are
//! stored inside an envelope:
//!
//! ```json
//! { "schema_version": 2, "data": { ... } }
//! ```
//!
//! Values written before the key had a schema are bare payloads and are read
//! as version 0. On read, migrations run one step at a time (`0 -> 1 -> 2`)
//! until the payload reaches the current version; writes always store the
//! current version.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Result, TrackerError};

/// One migration step, turning a payload of version `n` into version `n + 1`.
pub type MigrationFn = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Wrap `payload` in an envelope of the given version.
pub fn wrap(version: u32, payload: &Value) -> Value {
    serde_json::json!({
        "schema_version": version,
        "data": payload,
    })
}

/// Split a stored envelope into its version and payload.
///
/// Returns `None` for bare (version 0) values.
pub fn unwrap(stored: &Value) -> Option<(u32, &Value)> {
    let object = stored.as_object()?;
    if object.len() != 2 {
        return None;
    }
    let version = u32::try_from(object.get("schema_version")?.as_u64()?).ok()?;
    Some((version, object.get("data")?))
}

/// Versioning rules for the payload stored under one key.
#[derive(Clone)]
pub struct Schema {
    version: u32,
    migrations: BTreeMap<u32, MigrationFn>,
}

impl Schema {
    /// Create a schema whose current payload version is `version`.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            migrations: BTreeMap::new(),
        }
    }

    /// Register the step migrating payloads from version `from` to `from + 1`.
    pub fn migration<F>(mut self, from: u32, step: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.migrations.insert(from, Arc::new(step));
        self
    }

    /// Wrap a current-version payload for storage.
    pub fn encode(&self, payload: &Value) -> Value {
        wrap(self.version, payload)
    }

    /// Unwrap a stored value and migrate it to the current version.
    pub fn decode(&self, key: &str, stored: Value) -> Result<Value> {
        let (mut version, mut payload) = match unwrap(&stored) {
            Some((version, data)) => (version, data.clone()),
            None => (0, stored),
        };

        if version > self.version {
            return Err(TrackerError::SchemaTooNew {
                key: key.to_string(),
                found: version,
                supported: self.version,
            });
        }

        while version < self.version {
            let step = self
                .migrations
                .get(&version)
                .ok_or_else(|| TrackerError::MissingMigration {
                    key: key.to_string(),
                    from: version,
                })?;
            payload = step(payload).map_err(|reason| TrackerError::Migration {
                key: key.to_string(),
                from: version,
                reason,
            })?;
            version += 1;
        }

        Ok(payload)
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("version", &self.version)
            .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Splits went from a list of names to a list of objects, then gained a rest day field.
    fn workout_schema() -> Schema {
        Schema::new(2)
            .migration(0, |legacy| {
                let names = legacy.as_array().ok_or("expected an array of split names")?;
                Ok(Value::Array(
                    names.iter().map(|name| json!({ "name": name })).collect(),
                ))
            })
            .migration(1, |mut splits| {
                for split in splits.as_array_mut().ok_or("expected an array")? {
                    split["rest_day"] = json!(false);
                }
                Ok(splits)
            })
    }

    #[test]
    fn test_legacy_payload_runs_all_steps() {
        let decoded = workout_schema()
            .decode("workout_splits", json!(["push", "pull"]))
            .unwrap();

        assert_eq!(
            decoded,
            json!([
                { "name": "push", "rest_day": false },
                { "name": "pull", "rest_day": false }
            ])
        );
    }

    #[test]
    fn test_current_envelope_is_unwrapped() {
        let schema = workout_schema();
        let payload = json!([{ "name": "legs", "rest_day": true }]);

        let decoded = schema.decode("workout_splits", schema.encode(&payload)).unwrap();

        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_intermediate_version_migrates_once() {
        let stored = json!({ "schema_version": 1, "data": [{ "name": "legs" }] });
        let decoded = workout_schema().decode("workout_splits", stored).unwrap();

        assert_eq!(decoded, json!([{ "name": "legs", "rest_day": false }]));
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let stored = json!({ "schema_version": 5, "data": [] });
        let err = workout_schema().decode("workout_splits", stored).unwrap_err();

        assert!(matches!(err, TrackerError::SchemaTooNew { found: 5, supported: 2, .. }));
    }

    #[test]
    fn test_missing_step_is_rejected() {
        let schema = Schema::new(1);
        let err = schema.decode("budget", json!({"rent": 1})).unwrap_err();

        assert!(matches!(err, TrackerError::MissingMigration { from: 0, .. }));
    }

    #[test]
    fn test_failing_step_reports_reason() {
        let err = workout_schema()
            .decode("workout_splits", json!("not a list"))
            .unwrap_err();

        match err {
            TrackerError::Migration { from, reason, .. } => {
                assert_eq!(from, 0);
                assert!(reason.contains("array"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unwrap_recognizes_envelopes_only() {
        let stored = wrap(3, &json!({ "rent": 1 }));
        assert_eq!(unwrap(&stored), Some((3, &json!({ "rent": 1 }))));

        assert_eq!(unwrap(&json!({ "rent": 1 })), None);
        assert_eq!(unwrap(&json!({ "schema_version": "1", "data": 1 })), None);
        assert_eq!(unwrap(&json!([1, 2])), None);
    }

    #[test]
    fn test_object_with_extra_fields_is_not_an_envelope() {
        let schema = Schema::new(1).migration(0, |v| Ok(json!({ "legacy": v })));
        let stored = json!({ "schema_version": 1, "data": 2, "other": true });

        let decoded = schema.decode("k", stored.clone()).unwrap();

        assert_eq!(decoded, json!({ "legacy": stored }));
    }
}
