//! Plugin properties files with `${name}` macro resolution.
//!
//! ```yaml
//! plugin: sink
//! properties:
//!   referenceName: events_sink
//!   master: ${masters}
//!   name: events
//! arguments:
//!   masters: kudu-1:7051,kudu-2:7051
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use kuduflow_sdk::macros::resolve_macros;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Source,
    Sink,
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "Kudu source",
            Self::Sink => "Kudu sink",
        })
    }
}

/// What to do with a macro that has no argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unresolved {
    /// Leave the raw `${name}` in place, as at deployment time.
    Keep,
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginFile {
    pub plugin: PluginKind,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Runtime arguments that macros resolve from.
    #[serde(default)]
    pub arguments: HashMap<String, String>,
}

impl PluginFile {
    /// Properties with macros in string values substituted.
    ///
    /// # Errors
    ///
    /// With [`Unresolved::Fail`], returns every property that references a
    /// missing argument.
    pub fn resolved_properties(&self, unresolved: Unresolved) -> Result<Value> {
        let mut resolved = Map::with_capacity(self.properties.len());
        let mut errors = Vec::new();

        for (key, value) in &self.properties {
            let value = match value {
                Value::String(raw) => match resolve_macros(raw, &self.arguments) {
                    Ok(v) => Value::String(v),
                    Err(missing) => {
                        if unresolved == Unresolved::Fail {
                            errors.push(format!("{key}: {missing}"));
                        } else {
                            debug!(property = %key, "left unresolved: {missing}");
                        }
                        value.clone()
                    }
                },
                other => other.clone(),
            };
            resolved.insert(key.clone(), value);
        }

        if !errors.is_empty() {
            anyhow::bail!("Unresolved macro(s): {}", errors.join("; "));
        }
        Ok(Value::Object(resolved))
    }

    /// Deserialize the resolved properties into a plugin config.
    ///
    /// # Errors
    ///
    /// Fails on unresolved macros (see [`Self::resolved_properties`]) or when
    /// a property has the wrong shape.
    pub fn config<T: DeserializeOwned>(&self, unresolved: Unresolved) -> Result<T> {
        let properties = self.resolved_properties(unresolved)?;
        serde_json::from_value(properties)
            .with_context(|| format!("Invalid {} properties", self.plugin))
    }
}

/// Parse a plugin file from YAML (or JSON) text.
///
/// # Errors
///
/// Returns an error if the text is not a valid plugin file.
pub fn parse_plugin_str(text: &str) -> Result<PluginFile> {
    serde_yaml::from_str(text).context("Failed to parse plugin file")
}

/// Parse a plugin file from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid plugin file.
pub fn parse_plugin(path: &Path) -> Result<PluginFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plugin file: {}", path.display()))?;
    parse_plugin_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SINK: &str = r#"
plugin: sink
properties:
  referenceName: events_sink
  master: ${masters}
  name: ${table}
  schema: '{"type":"record","name":"r","fields":[{"name":"id","type":"long"}]}'
  buckets: 8
arguments:
  masters: kudu-1:7051
"#;

    #[test]
    fn keeps_unresolved_macros_for_checking() {
        let file = parse_plugin_str(SINK).unwrap();
        assert_eq!(file.plugin, PluginKind::Sink);

        let props = file.resolved_properties(Unresolved::Keep).unwrap();
        assert_eq!(props["master"], "kudu-1:7051");
        assert_eq!(props["name"], "${table}");
        assert_eq!(props["buckets"], 8);
    }

    #[test]
    fn missing_arguments_fail_when_required() {
        let file = parse_plugin_str(SINK).unwrap();
        let err = file.resolved_properties(Unresolved::Fail).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("name"), "{msg}");
        assert!(msg.contains("table"), "{msg}");
        assert!(!msg.contains("masters"), "{msg}");
    }

    #[test]
    fn deserializes_sink_config() {
        let mut file = parse_plugin_str(SINK).unwrap();
        file.arguments.insert("table".into(), "events".into());
        let config: dest_kudu::Config = file.config(Unresolved::Fail).unwrap();
        assert_eq!(config.table_name(), "events");
        assert_eq!(config.buckets().unwrap(), 8);
    }

    #[test]
    fn accepts_json_files() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"{{"plugin":"source","properties":{{"referenceName":"r","name":"users"}}}}"#
        )
        .unwrap();
        let file = parse_plugin(tmp.path()).unwrap();
        assert_eq!(file.plugin, PluginKind::Source);
        assert!(file.arguments.is_empty());
        let config: source_kudu::Config = file.config(Unresolved::Keep).unwrap();
        assert_eq!(config.table_name(), "users");
    }

    #[test]
    fn rejects_unknown_plugin_kind() {
        assert!(parse_plugin_str("plugin: transform\n").is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = parse_plugin(Path::new("/nonexistent/plugin.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read plugin file"));
    }
}
