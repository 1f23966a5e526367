//! Goal resolution from scene configuration.
//!
//! A [`Goal`] is built once per scene at start and is immutable for the
//! scene's lifetime; every step reads it for the per-step action whitelist and
//! the hard step ceiling.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SceneConfig;

/// The resolved goal for one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Per-step whitelist of permitted actions, when the scene constrains
    /// them. Index N holds the whitelist for step number N.
    #[serde(default)]
    pub action_list: Option<Vec<Vec<String>>>,
    #[serde(default)]
    pub info_list: Vec<String>,
    /// Hard step ceiling; steps at or past this number are refused.
    #[serde(default)]
    pub last_step: Option<u32>,
    #[serde(default)]
    pub task_list: Vec<String>,
    #[serde(default)]
    pub type_list: Vec<String>,
    /// Free-form goal metadata, passed through untouched.
    #[serde(default)]
    pub metadata: Value,
}

impl Default for Goal {
    fn default() -> Self {
        Self {
            action_list: None,
            info_list: Vec::new(),
            last_step: None,
            task_list: Vec::new(),
            type_list: Vec::new(),
            metadata: Value::Object(Default::default()),
        }
    }
}

impl Goal {
    /// The whitelist for the given step number, when one is configured and
    /// non-empty.
    pub fn whitelist_for_step(&self, step_number: usize) -> Option<&[String]> {
        self.action_list
            .as_deref()
            .and_then(|list| list.get(step_number))
            .filter(|entry| !entry.is_empty())
            .map(Vec::as_slice)
    }
}

/// Build the scene's [`Goal`] from its configuration, defaulting every
/// missing field.
//
// TODO: info_list and task_list are gated on the presence of the type_list
// key; confirm the intended gating before keying them on their own fields.
pub fn resolve_goal(config: &SceneConfig) -> Goal {
    let definition = config.goal.clone().unwrap_or_default();
    let gated_in = definition.type_list.is_some();

    Goal {
        action_list: definition.action_list,
        info_list: if gated_in {
            definition.info_list.unwrap_or_default()
        } else {
            Vec::new()
        },
        last_step: definition.last_step,
        task_list: if gated_in {
            definition.task_list.unwrap_or_default()
        } else {
            Vec::new()
        },
        type_list: definition.type_list.unwrap_or_default(),
        metadata: definition
            .metadata
            .unwrap_or_else(|| Value::Object(Default::default())),
    }
}
