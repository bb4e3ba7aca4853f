use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors produced while building or editing a `Settings` value.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Stored value was valid JSON but not an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
    /// A field was assigned a value of the wrong shape.
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("malformed settings: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// User-facing application settings, persisted by the settings store.
///
/// Keys are camelCase on disk. Keys this build does not know about are kept in
/// `extra` and written back unchanged, so a newer release's settings survive a
/// round-trip through an older one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Launch hidden instead of showing the main window.
    pub start_minimized: bool,
    /// Closing the window hides it to the tray instead of quitting.
    pub minimize_to_tray: bool,
    /// Register the app to launch at login.
    pub start_at_login: bool,
    /// Unrecognised keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_minimized: false,
            minimize_to_tray: true,
            start_at_login: false,
            extra: Map::new(),
        }
    }
}

impl Settings {
    /// Shallow-merge a loaded value onto the defaults: every key present in
    /// `value` wins, every missing key keeps its default.
    pub fn merge_onto_defaults(value: Value) -> Result<Self, SettingsError> {
        let loaded = match value {
            Value::Object(map) => map,
            other => {
                return Err(SettingsError::NotAnObject {
                    found: json_kind(&other),
                })
            }
        };

        let mut merged = Settings::default().to_map()?;
        merged.extend(loaded);
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    /// Read a field by its serialized name (known or extra).
    pub fn get(&self, key: &str) -> Option<Value> {
        self.to_map().ok()?.remove(key)
    }

    /// Assign a field by its serialized name. Unknown names land in `extra`.
    /// On error `self` is left unchanged.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut map = self.to_map()?;
        map.insert(key.to_string(), value);
        let updated: Settings =
            serde_json::from_value(Value::Object(map)).map_err(|e| SettingsError::InvalidValue {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
        *self = updated;
        Ok(())
    }

    /// Flatten into a single JSON object (known fields plus extras).
    pub fn to_map(&self) -> Result<Map<String, Value>, SettingsError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(SettingsError::NotAnObject {
                found: json_kind(&other),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
