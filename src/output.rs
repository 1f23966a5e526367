//! Typed step-output domain objects.
//!
//! A [`StepOutput`] is the immutable snapshot handed back to the client after
//! every start/step call: the frame images, the reconstructed world objects,
//! the agent's camera state, and the engine's verdict on the last action.

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::goal::Goal;
use crate::params::Vector3;

// ---------------------------------------------------------------------------
// Colors and materials
// ---------------------------------------------------------------------------

/// An RGB color from the engine's object-id segmentation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl From<[u8; 3]> for Color {
    fn from(rgb: [u8; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
        }
    }
}

/// The salient materials the engine can report for an object.
///
/// Anything outside this set is dropped during reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Material {
    Ceramic,
    Fabric,
    Food,
    Glass,
    Hollow,
    Metal,
    Organic,
    Paper,
    Plastic,
    Rubber,
    Soap,
    Sponge,
    Stone,
    Wax,
    Wood,
}

impl Material {
    /// Parse an upper-cased material name against the allowlist.
    pub fn from_name(name: &str) -> Option<Material> {
        match name {
            "CERAMIC" => Some(Material::Ceramic),
            "FABRIC" => Some(Material::Fabric),
            "FOOD" => Some(Material::Food),
            "GLASS" => Some(Material::Glass),
            "HOLLOW" => Some(Material::Hollow),
            "METAL" => Some(Material::Metal),
            "ORGANIC" => Some(Material::Organic),
            "PAPER" => Some(Material::Paper),
            "PLASTIC" => Some(Material::Plastic),
            "RUBBER" => Some(Material::Rubber),
            "SOAP" => Some(Material::Soap),
            "SPONGE" => Some(Material::Sponge),
            "STONE" => Some(Material::Stone),
            "WAX" => Some(Material::Wax),
            "WOOD" => Some(Material::Wood),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pose and return status
// ---------------------------------------------------------------------------

/// The agent's body pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Pose {
    Stand,
    Crawl,
    Lie,
}

/// The engine's classification of whether (and why) the last action
/// succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    Successful,
    Failed,
    Obstructed,
    OutOfReach,
    NotObject,
    NotReceptacle,
    NotOpenable,
    NotPickupable,
    NotHeld,
    NotVisible,
    /// Sentinel for an unmapped or missing status string.
    Undefined,
}

impl ReturnStatus {
    /// Exact-name lookup against the closed status set.
    pub fn from_name(name: &str) -> Option<ReturnStatus> {
        match name {
            "SUCCESSFUL" => Some(ReturnStatus::Successful),
            "FAILED" => Some(ReturnStatus::Failed),
            "OBSTRUCTED" => Some(ReturnStatus::Obstructed),
            "OUT_OF_REACH" => Some(ReturnStatus::OutOfReach),
            "NOT_OBJECT" => Some(ReturnStatus::NotObject),
            "NOT_RECEPTACLE" => Some(ReturnStatus::NotReceptacle),
            "NOT_OPENABLE" => Some(ReturnStatus::NotOpenable),
            "NOT_PICKUPABLE" => Some(ReturnStatus::NotPickupable),
            "NOT_HELD" => Some(ReturnStatus::NotHeld),
            "NOT_VISIBLE" => Some(ReturnStatus::NotVisible),
            "UNDEFINED" => Some(ReturnStatus::Undefined),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Successful => "SUCCESSFUL",
            ReturnStatus::Failed => "FAILED",
            ReturnStatus::Obstructed => "OBSTRUCTED",
            ReturnStatus::OutOfReach => "OUT_OF_REACH",
            ReturnStatus::NotObject => "NOT_OBJECT",
            ReturnStatus::NotReceptacle => "NOT_RECEPTACLE",
            ReturnStatus::NotOpenable => "NOT_OPENABLE",
            ReturnStatus::NotPickupable => "NOT_PICKUPABLE",
            ReturnStatus::NotHeld => "NOT_HELD",
            ReturnStatus::NotVisible => "NOT_VISIBLE",
            ReturnStatus::Undefined => "UNDEFINED",
        }
    }
}

impl std::fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// World objects
// ---------------------------------------------------------------------------

/// One object in the scene, reconstructed fresh from engine metadata every
/// step. Identity across steps is by `uuid` equality only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldObject {
    pub uuid: String,
    pub color: Color,
    pub direction: Vector3,
    /// Distance normalized by the single-step move distance.
    pub distance: f64,
    pub held: bool,
    pub mass: f64,
    /// Salient materials filtered to the known set; absent when none survive
    /// the filter.
    pub material_list: Option<Vec<Material>>,
    pub point_list: Vec<Vector3>,
    /// Visible in the camera frame, or currently held.
    pub visible: bool,
}

// ---------------------------------------------------------------------------
// Step output
// ---------------------------------------------------------------------------

/// The snapshot returned to the client for one step.
///
/// Owned by the caller after return; image buffers are excluded from the JSON
/// debug dump.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutput {
    /// Monotonic step counter owned by the controller; 0 for scene start.
    pub step_number: u32,
    /// Actions permitted on the upcoming step: the goal's whitelist when one
    /// applies, otherwise the full vocabulary.
    pub action_list: Vec<String>,
    #[serde(skip)]
    pub image_list: Vec<RgbImage>,
    #[serde(skip)]
    pub depth_mask_list: Vec<GrayImage>,
    #[serde(skip)]
    pub object_mask_list: Vec<RgbImage>,
    /// Camera pitch in degrees, as reported by the engine.
    pub head_tilt: f64,
    /// The scene's goal; identical on every output of the scene.
    pub goal: Goal,
    /// All scene objects, sorted ascending by uuid.
    pub object_list: Vec<WorldObject>,
    pub pose: Pose,
    pub return_status: ReturnStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_status_lookup_is_exact() {
        assert_eq!(
            ReturnStatus::from_name("SUCCESSFUL"),
            Some(ReturnStatus::Successful)
        );
        assert_eq!(ReturnStatus::from_name("SUCCESS"), None);
        assert_eq!(ReturnStatus::from_name("successful"), None);
    }

    #[test]
    fn material_allowlist_rejects_unknown_names() {
        assert_eq!(Material::from_name("METAL"), Some(Material::Metal));
        assert_eq!(Material::from_name("ADAMANTIUM"), None);
        assert_eq!(Material::from_name("metal"), None);
    }

    #[test]
    fn enums_serialize_to_screaming_snake_case() {
        assert_eq!(
            serde_json::to_value(ReturnStatus::OutOfReach).unwrap(),
            "OUT_OF_REACH"
        );
        assert_eq!(serde_json::to_value(Pose::Stand).unwrap(), "STAND");
        assert_eq!(serde_json::to_value(Material::Wood).unwrap(), "WOOD");
    }
}
