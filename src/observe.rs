//! State reconstruction: raw engine metadata to typed domain objects.
//!
//! Every function here is a pure read of a scene event (plus the immutable
//! goal) and is guaranteed non-raising: malformed metadata degrades to
//! defaults or skipped entries with a diagnostic, never an error.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::action::Action;
use crate::engine::SceneEvent;
use crate::goal::Goal;
use crate::output::{Material, Pose, ReturnStatus, WorldObject};
use crate::params::{Vector3, MAX_MOVE_DISTANCE};

/// Per-object metadata as the engine reports it. Sparse input is fine: every
/// field except the id defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    object_id: String,
    #[serde(default)]
    direction: Vector3,
    #[serde(default)]
    distance_x_z: f64,
    #[serde(default)]
    is_picked_up: bool,
    #[serde(default)]
    mass: f64,
    #[serde(default)]
    salient_materials: Option<Vec<String>>,
    #[serde(default)]
    points: Vec<Vector3>,
    #[serde(default)]
    visible_in_camera: bool,
}

/// Camera pitch in degrees. Trusted engine output; defaults to 0 when the
/// agent block is absent (e.g. a degenerate Initialize).
pub fn head_tilt(metadata: &Value) -> f64 {
    metadata["agent"]["cameraHorizon"].as_f64().unwrap_or(0.0)
}

/// Reconstruct the world-object list from a scene event.
///
/// Entries that fail to decode are skipped with a warning; an empty or
/// missing objects array yields an empty list. The result is sorted
/// ascending by uuid.
pub fn object_list(event: &SceneEvent) -> Vec<WorldObject> {
    let entries = match event.metadata["objects"].as_array() {
        Some(entries) => entries,
        None => return Vec::new(),
    };

    let mut objects: Vec<WorldObject> = entries
        .iter()
        .filter_map(|entry| match ObjectMetadata::deserialize(entry) {
            Ok(object) => Some(world_object(object, event)),
            Err(err) => {
                warn!(%err, "skipping undecodable object metadata entry");
                None
            }
        })
        .collect();

    objects.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    objects
}

fn world_object(metadata: ObjectMetadata, event: &SceneEvent) -> WorldObject {
    let materials: Vec<Material> = metadata
        .salient_materials
        .unwrap_or_default()
        .iter()
        .filter_map(|name| Material::from_name(&name.to_uppercase()))
        .collect();

    let color = event
        .object_id_to_color
        .get(&metadata.object_id)
        .copied()
        .unwrap_or_default();

    WorldObject {
        color,
        direction: metadata.direction,
        distance: metadata.distance_x_z / MAX_MOVE_DISTANCE,
        held: metadata.is_picked_up,
        mass: metadata.mass,
        material_list: if materials.is_empty() {
            None
        } else {
            Some(materials)
        },
        point_list: metadata.points,
        visible: metadata.visible_in_camera || metadata.is_picked_up,
        uuid: metadata.object_id,
    }
}

/// Map the engine's last-action status string into the closed status set.
///
/// Unknown or missing strings degrade to [`ReturnStatus::Undefined`] with a
/// diagnostic; this lookup never fails.
pub fn return_status(metadata: &Value) -> ReturnStatus {
    match metadata["lastActionStatus"].as_str() {
        Some(name) => ReturnStatus::from_name(name).unwrap_or_else(|| {
            warn!(status = name, "return status is not currently supported");
            ReturnStatus::Undefined
        }),
        None => {
            debug!("no last-action status in metadata");
            ReturnStatus::Undefined
        }
    }
}

/// The actions permitted on the given step: the goal's whitelist when one is
/// configured and non-empty, otherwise the full vocabulary.
pub fn allowed_actions(goal: &Goal, step_number: usize) -> Vec<String> {
    match goal.whitelist_for_step(step_number) {
        Some(whitelist) => whitelist.to_vec(),
        None => Action::vocabulary(),
    }
}

/// The agent's pose. The engine does not report pose yet, so this is always
/// [`Pose::Stand`].
pub fn pose(_event: &SceneEvent) -> Pose {
    Pose::Stand
}
