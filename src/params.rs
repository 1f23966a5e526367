//! Parameter validation, normalization, and the outbound step payload.
//!
//! Clients hand us a loosely-typed parameter map; the engine wants a complete,
//! fully-typed payload. [`ParamNormalizer`] bridges the two: every numeric
//! parameter is independently type-checked and range-checked, with invalid or
//! out-of-range values replaced by their documented defaults (never clamped to
//! a boundary). The derived `moveMagnitude` depends on the action's semantic
//! class, and optional jitter can be applied to rotation, horizon, and
//! moveMagnitude for noise-tolerance experiments.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::action::{Action, ActionClass};
use crate::config::SceneConfig;

/// The loosely-typed parameter map accepted on the client-facing surface.
pub type ParamMap = HashMap<String, Value>;

/// Side length of the engine's snap-to-grid square. Mostly irrelevant since
/// every step sets `continuous`, but the engine still requires it.
pub const GRID_SIZE: f64 = 0.1;

/// How far the agent can move with a single step.
pub const MAX_MOVE_DISTANCE: f64 = 0.5;

/// Scale applied to the client-facing `force` parameter to produce the
/// engine's moveMagnitude for force actions.
pub const FORCE_SCALE: f64 = 25.0;

/// How far the agent can reach. Must stay larger than [`MAX_MOVE_DISTANCE`]
/// or some objects become unreachable from any position.
pub const MAX_REACH_DISTANCE: f64 = 1.0;

pub const DEFAULT_ROTATION: f64 = 0.0;
pub const DEFAULT_HORIZON: f64 = 0.0;
pub const DEFAULT_FORCE: f64 = 0.5;
pub const DEFAULT_AMOUNT: f64 = 0.5;
pub const DEFAULT_DIRECTION: f64 = 0.0;
/// The `amount` default for open/close actions.
pub const DEFAULT_OBJECT_MOVE_AMOUNT: f64 = 1.0;

pub const MIN_HORIZON: f64 = -180.0;
pub const MAX_HORIZON: f64 = 180.0;
pub const MIN_AMOUNT: f64 = 0.0;
pub const MAX_AMOUNT: f64 = 1.0;
pub const MIN_FORCE: f64 = 0.0;
pub const MAX_FORCE: f64 = 1.0;

pub const ROTATION_KEY: &str = "rotation";
pub const HORIZON_KEY: &str = "horizon";
pub const AMOUNT_KEY: &str = "amount";
pub const FORCE_KEY: &str = "force";
pub const OBJECT_ID_KEY: &str = "objectId";
pub const RECEPTACLE_OBJECT_ID_KEY: &str = "receptacleObjectId";
pub const OBJECT_DIRECTION_X_KEY: &str = "objectDirectionX";
pub const OBJECT_DIRECTION_Y_KEY: &str = "objectDirectionY";
pub const OBJECT_DIRECTION_Z_KEY: &str = "objectDirectionZ";
pub const RECEPTACLE_DIRECTION_X_KEY: &str = "receptacleObjectDirectionX";
pub const RECEPTACLE_DIRECTION_Y_KEY: &str = "receptacleObjectDirectionY";
pub const RECEPTACLE_DIRECTION_Z_KEY: &str = "receptacleObjectDirectionZ";

// ---------------------------------------------------------------------------
// Vectors
// ---------------------------------------------------------------------------

/// A 3-axis vector as the engine expects it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Rotation wrapped into a single-axis (yaw) vector, the shape the engine
/// expects for agent rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotationVector {
    pub y: f64,
}

// ---------------------------------------------------------------------------
// Normalized parameters
// ---------------------------------------------------------------------------

/// A complete, normalized parameter record for one engine step.
///
/// Every numeric field is either the validated client-supplied value or its
/// documented default; fields are never absent and never out of range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receptacle_object_id: Option<String>,
    pub rotation: RotationVector,
    pub horizon: f64,
    pub move_magnitude: f64,
    pub object_direction: Vector3,
    pub receptacle_object_direction: Vector3,
}

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

/// The jitter policy applied to rotation, horizon, and moveMagnitude.
///
/// Kept pluggable so tests can run deterministically: use
/// [`NoiseModel::Disabled`], or seed the normalizer's rng.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseModel {
    /// No jitter; normalization is a pure function of its inputs.
    Disabled,
    /// Multiply each affected value by `1 + u` with `u` uniform in
    /// `[-amplitude, amplitude]`.
    Uniform { amplitude: f64 },
}

impl NoiseModel {
    /// The stock jitter amplitude (5%).
    pub const DEFAULT_AMPLITUDE: f64 = 0.05;

    /// The stock enabled policy.
    pub fn uniform() -> Self {
        NoiseModel::Uniform {
            amplitude: Self::DEFAULT_AMPLITUDE,
        }
    }

    fn sample(&self, rng: &mut StdRng) -> f64 {
        match self {
            NoiseModel::Disabled => 0.0,
            NoiseModel::Uniform { amplitude } => rng.gen_range(-amplitude..=*amplitude),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Converts a loosely-typed parameter map into a complete [`StepParameters`]
/// record for a given action.
#[derive(Debug)]
pub struct ParamNormalizer {
    noise: NoiseModel,
    rng: StdRng,
}

impl ParamNormalizer {
    /// Create a normalizer with the given noise policy and an entropy-seeded rng.
    pub fn new(noise: NoiseModel) -> Self {
        Self {
            noise,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a normalizer with a fixed rng seed, for deterministic tests.
    pub fn with_seed(noise: NoiseModel, seed: u64) -> Self {
        Self {
            noise,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A normalizer with jitter disabled.
    pub fn disabled() -> Self {
        Self::new(NoiseModel::Disabled)
    }

    /// Normalize the parameter map for `action`.
    ///
    /// `&mut self` only because the noise rng advances; with
    /// [`NoiseModel::Disabled`] the result is a pure function of the inputs.
    pub fn normalize(&mut self, action: Action, params: &ParamMap) -> StepParameters {
        let rotation = numeric_or(params, ROTATION_KEY, DEFAULT_ROTATION);
        let horizon = numeric_or(params, HORIZON_KEY, DEFAULT_HORIZON);

        // The amount default depends on the action class: open/close moves the
        // whole receptacle by default, locomotion takes a half step.
        let amount_default = match action.class() {
            ActionClass::ObjectMove => DEFAULT_OBJECT_MOVE_AMOUNT,
            _ => DEFAULT_AMOUNT,
        };
        let amount = numeric_or(params, AMOUNT_KEY, amount_default);
        let force = numeric_or(params, FORCE_KEY, DEFAULT_FORCE);

        let object_direction = Vector3::new(
            numeric_or(params, OBJECT_DIRECTION_X_KEY, DEFAULT_DIRECTION),
            numeric_or(params, OBJECT_DIRECTION_Y_KEY, DEFAULT_DIRECTION),
            numeric_or(params, OBJECT_DIRECTION_Z_KEY, DEFAULT_DIRECTION),
        );
        let receptacle_object_direction = Vector3::new(
            numeric_or(params, RECEPTACLE_DIRECTION_X_KEY, DEFAULT_DIRECTION),
            numeric_or(params, RECEPTACLE_DIRECTION_Y_KEY, DEFAULT_DIRECTION),
            numeric_or(params, RECEPTACLE_DIRECTION_Z_KEY, DEFAULT_DIRECTION),
        );

        // Out-of-range values fall back to the default, not the boundary.
        let mut horizon = in_range_or(horizon, MIN_HORIZON, MAX_HORIZON, DEFAULT_HORIZON, HORIZON_KEY);
        let amount = in_range_or(amount, MIN_AMOUNT, MAX_AMOUNT, amount_default, AMOUNT_KEY);
        let force = in_range_or(force, MIN_FORCE, MAX_FORCE, DEFAULT_FORCE, FORCE_KEY);

        let mut move_magnitude = match action.class() {
            ActionClass::Force => force * FORCE_SCALE,
            ActionClass::ObjectMove => amount,
            ActionClass::Move => amount * MAX_MOVE_DISTANCE,
            ActionClass::Other => MAX_MOVE_DISTANCE,
        };

        let mut rotation = rotation;
        if !matches!(self.noise, NoiseModel::Disabled) {
            rotation *= 1.0 + self.noise.sample(&mut self.rng);
            horizon *= 1.0 + self.noise.sample(&mut self.rng);
            move_magnitude *= 1.0 + self.noise.sample(&mut self.rng);
        }

        StepParameters {
            object_id: string_param(params, OBJECT_ID_KEY),
            receptacle_object_id: string_param(params, RECEPTACLE_OBJECT_ID_KEY),
            rotation: RotationVector { y: rotation },
            horizon,
            move_magnitude,
            object_direction,
            receptacle_object_direction,
        }
    }
}

/// Read a numeric parameter, falling back to `default` when absent or not a
/// number.
fn numeric_or(params: &ParamMap, key: &str, default: f64) -> f64 {
    match params.get(key) {
        None => default,
        Some(value) => match value.as_f64() {
            Some(number) => number,
            None => {
                warn!(key, %value, "parameter is not a number; using default {default}");
                default
            }
        },
    }
}

/// Replace an out-of-range value with the parameter's default.
fn in_range_or(value: f64, min: f64, max: f64, default: f64, key: &str) -> f64 {
    if value < min || value > max {
        warn!(key, value, "parameter outside [{min}, {max}]; using default {default}");
        default
    } else {
        value
    }
}

fn string_param(params: &ParamMap, key: &str) -> Option<String> {
    params.get(key).and_then(Value::as_str).map(String::from)
}

// ---------------------------------------------------------------------------
// Outbound payload
// ---------------------------------------------------------------------------

/// The step payload sent to the engine: the translated action name, the fixed
/// per-step fields, and the normalized parameters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepData {
    pub action: String,
    pub continuous: bool,
    pub grid_size: f64,
    pub logs: bool,
    pub render_depth_image: bool,
    pub render_object_image: bool,
    /// The agent's reach is governed by the engine's visibility distance.
    pub visibility_distance: f64,
    #[serde(flatten)]
    pub parameters: Option<StepParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_config: Option<SceneConfig>,
}

impl StepData {
    /// Payload for a normal action step.
    pub fn new(action: impl Into<String>, parameters: StepParameters) -> Self {
        Self {
            action: action.into(),
            continuous: true,
            grid_size: GRID_SIZE,
            logs: true,
            render_depth_image: true,
            render_object_image: true,
            visibility_distance: MAX_REACH_DISTANCE,
            parameters: Some(parameters),
            scene_config: None,
        }
    }

    /// Payload for the Initialize call issued at scene start, carrying the
    /// whole scene configuration.
    pub fn initialize(scene: SceneConfig) -> Self {
        Self {
            action: "Initialize".to_string(),
            continuous: true,
            grid_size: GRID_SIZE,
            logs: true,
            render_depth_image: true,
            render_object_image: true,
            visibility_distance: MAX_REACH_DISTANCE,
            parameters: None,
            scene_config: Some(scene),
        }
    }
}
