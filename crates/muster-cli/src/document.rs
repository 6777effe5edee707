//! Mission document loading.
//!
//! A mission arrives as a single JSON document: the annotation tree, the
//! goal model it references, declared task instances with their candidate
//! paths, variable assignments, and optionally the initial world facts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use muster_core::annotation::{AnnotationNode, GoalModel, VariableValue};
use muster_core::predicate::GroundLiteral;
use muster_core::state::WorldState;
use muster_core::task::{AbstractTask, PrimitiveTask};

/// Everything a decomposition run consumes, as serialized by the upstream
/// modeling tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionDocument {
    /// Declared task instances, keyed by abstract task name.
    pub instances: HashMap<String, Vec<AbstractTask>>,

    /// Candidate paths per abstract task name.
    pub paths: HashMap<String, Vec<Vec<PrimitiveTask>>>,

    /// The annotation tree giving the mission its structure.
    pub annotation: AnnotationNode,

    /// Goal model entries the annotation tree refers to.
    #[serde(default)]
    pub goal_model: GoalModel,

    /// Collection and object assignments for goal-model variables.
    #[serde(default)]
    pub variables: HashMap<String, VariableValue>,

    /// Initial world facts. A standalone world file takes precedence.
    #[serde(default)]
    pub world: Vec<GroundLiteral>,
}

impl MissionDocument {
    /// Load and parse a mission document.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mission document {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse mission document {}", path.display()))
    }

    /// The initial world state, preferring a standalone world file over the
    /// facts embedded in the document.
    pub fn initial_state(&self, world_file: Option<&Path>) -> Result<WorldState> {
        let facts: Vec<GroundLiteral> = match world_file {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read world file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse world file {}", path.display()))?
            }
            None => self.world.clone(),
        };
        Ok(WorldState::from_facts(facts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MISSION: &str = r#"{
        "instances": {
            "CleanRoom": [
                {
                    "id": "AT1_1",
                    "name": "CleanRoom",
                    "robots": {"fixed": 1},
                    "location": {"single": "room1"},
                    "bindings": [{"variable": "?rm", "value": {"object": "room1"}}],
                    "triggers": []
                }
            ]
        },
        "paths": {
            "CleanRoom": [
                [
                    {
                        "name": "vacuum",
                        "parameters": [{"name": "?rm", "sort": "room"}],
                        "capabilities": ["vacuuming"],
                        "preconditions": [],
                        "effects": [
                            {"predicate": "clean", "args": [{"variable": "?rm"}], "positive": true}
                        ]
                    }
                ]
            ]
        },
        "annotation": {
            "kind": "task",
            "content": "AT1_1"
        },
        "world": [
            {"predicate": "clean", "args": ["room1"], "positive": false}
        ]
    }"#;

    #[test]
    fn test_parse_mission_document() {
        let document: MissionDocument = serde_json::from_str(MISSION).unwrap();

        assert_eq!(document.instances["CleanRoom"].len(), 1);
        assert_eq!(document.instances["CleanRoom"][0].id, "AT1_1");
        assert_eq!(document.paths["CleanRoom"].len(), 1);
        assert_eq!(document.annotation.content, "AT1_1");
        assert!(document.goal_model.entries().is_empty());
        assert_eq!(document.world.len(), 1);
    }

    #[test]
    fn test_initial_state_from_embedded_facts() {
        let document: MissionDocument = serde_json::from_str(MISSION).unwrap();
        let state = document.initial_state(None).unwrap();

        assert_eq!(state.len(), 1);
        assert!(state.supports(&GroundLiteral::new(
            "clean",
            vec!["room1".to_string()],
            false,
        )));
    }

    #[test]
    fn test_world_file_overrides_embedded_facts() {
        let document: MissionDocument = serde_json::from_str(MISSION).unwrap();

        let mut world_file = tempfile::NamedTempFile::new().unwrap();
        write!(
            world_file,
            r#"[{{"predicate": "clean", "args": ["room1"], "positive": true}}]"#
        )
        .unwrap();

        let state = document.initial_state(Some(world_file.path())).unwrap();
        assert!(state.supports(&GroundLiteral::new(
            "clean",
            vec!["room1".to_string()],
            true,
        )));
    }

    #[test]
    fn test_missing_document_is_an_error() {
        let error = MissionDocument::load(Path::new("/nonexistent/mission.json")).unwrap_err();
        assert!(error.to_string().contains("Failed to read"));
    }
}
