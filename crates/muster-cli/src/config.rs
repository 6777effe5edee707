//! Tool configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use muster_core::semantics::SemanticMapping;

/// Run configuration, loaded from a TOML file.
///
/// Without a file the defaults apply: no semantic mappings, so missions
/// whose goal models carry no context conditions run unchanged, and the
/// report goes to stdout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Semantic mapping table for grounding context conditions. Entries
    /// with an unknown kind fail the load.
    #[serde(default)]
    pub mappings: Vec<SemanticMapping>,

    /// Default report target; the `--output` flag overrides it.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl RunConfig {
    /// Load the configuration, falling back to defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::semantics::MappingKind;
    use std::io::Write;

    #[test]
    fn test_defaults_without_a_file() {
        let config = RunConfig::load(None).unwrap();
        assert!(config.mappings.is_empty());
        assert!(config.output.is_none());
    }

    #[test]
    fn test_parse_mapping_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
output = "plans.json"

[[mappings]]
kind = "attribute"
name = "clean"
predicate = {{ name = "clean", argument_sorts = ["room"] }}

[[mappings]]
kind = "relationship"
name = "inside"
predicate = {{ name = "inside", argument_sorts = ["object", "room"] }}
"#
        )
        .unwrap();

        let config = RunConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.output, Some(PathBuf::from("plans.json")));
        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[0].kind, MappingKind::Attribute);
        assert_eq!(config.mappings[0].name, "clean");
        assert_eq!(config.mappings[1].predicate.argument_sorts.len(), 2);
    }

    #[test]
    fn test_unknown_mapping_kind_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[[mappings]]
kind = "ownership"
name = "owns"
predicate = {{ name = "owns", argument_sorts = ["robot"] }}
"#
        )
        .unwrap();

        let error = RunConfig::load(Some(file.path())).unwrap_err();
        assert!(error.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "mappings = 3").unwrap();

        let error = RunConfig::load(Some(file.path())).unwrap_err();
        assert!(error.to_string().contains("Failed to parse"));
    }
}
