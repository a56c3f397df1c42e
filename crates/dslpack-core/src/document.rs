use std::collections::BTreeMap;

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// On-disk shape of a workshop manifest.
///
/// Field order is the serialization order: `require` first, then `replace`.
/// `replace` is a sorted map so repeated saves are byte-stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub require: Vec<PackageRecord>,
    #[serde(default)]
    pub replace: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub spec: String,
    pub alias: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subpath: String,
    pub version: String,
    #[serde(default)]
    pub indirect: bool,
}

impl ManifestDocument {
    /// Parses a manifest. The top level must be a JSON object; serde would
    /// otherwise accept a sequence in place of the struct.
    pub fn from_json_slice(input: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(input)?;
        let unexpected = match &value {
            Value::Object(_) => return serde_json::from_value(value),
            Value::Array(_) => Unexpected::Seq,
            Value::String(text) => Unexpected::Str(text),
            Value::Bool(flag) => Unexpected::Bool(*flag),
            Value::Number(_) => Unexpected::Other("number"),
            Value::Null => Unexpected::Unit,
        };
        Err(serde_json::Error::invalid_type(
            unexpected,
            &"a manifest object with require and replace sections",
        ))
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }
}
