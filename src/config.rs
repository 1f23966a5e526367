//! Scene configuration loading.
//!
//! A scene is described by a JSON document with an optional top-level `goal`
//! object plus arbitrary engine-specific fields (room layout, objects, ...).
//! The extra fields are not interpreted here; the whole document is forwarded
//! to the engine verbatim on Initialize.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The raw `goal` object as it appears in a scene configuration file.
///
/// Every field is optional; missing fields are defaulted during goal
/// resolution rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_list: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_step: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A scene configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Scene name; supplied by the loader from the file stem when the
    /// document does not carry one. Names the debug output directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<GoalDefinition>,
    /// Everything else in the document, forwarded to the engine untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Load a scene configuration from a JSON file.
///
/// The file stem supplies the scene name when the document itself does not.
pub fn load_scene_file(path: &Path) -> Result<SceneConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file {}", path.display()))?;
    let mut config: SceneConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse scene file {}", path.display()))?;

    if config.name.is_none() {
        config.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn loader_fills_name_from_the_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playroom_scene.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", json!({"objects": [], "goal": {"last_step": 3}})).unwrap();

        let config = load_scene_file(&path).unwrap();
        assert_eq!(config.name.as_deref(), Some("playroom_scene"));
        assert_eq!(config.goal.unwrap().last_step, Some(3));
        assert!(config.extra.contains_key("objects"));
    }

    #[test]
    fn loader_keeps_a_name_present_in_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("on_disk_name.json");
        std::fs::write(&path, json!({"name": "inner"}).to_string()).unwrap();

        let config = load_scene_file(&path).unwrap();
        assert_eq!(config.name.as_deref(), Some("inner"));
    }

    #[test]
    fn missing_file_is_an_error_with_context() {
        let err = load_scene_file(Path::new("/nonexistent/scene.json")).unwrap_err();
        assert!(err.to_string().contains("scene.json"));
    }

    #[test]
    fn malformed_goal_fields_do_not_reject_the_document() {
        let config: SceneConfig = serde_json::from_value(json!({
            "name": "sparse",
            "goal": {}
        }))
        .unwrap();
        let goal = config.goal.unwrap();
        assert!(goal.action_list.is_none());
        assert!(goal.type_list.is_none());
        assert!(goal.last_step.is_none());
    }
}
