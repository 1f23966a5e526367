//! The step orchestrator: per-scene state and the client-facing surface.
//!
//! A [`ThorController`] owns one engine session and the mutable state of the
//! scene running on it (step counter, resolved goal, head-tilt cache, debug
//! output folder). Each `step` call runs the fixed sequence: termination
//! guard, command pre-parse, vocabulary check, parameter normalization,
//! action translation, engine call, state reconstruction.
//!
//! Nothing on this surface raises for bad input; malformed parameters,
//! unknown actions, and exhausted scenes all degrade with a warning. Engine
//! failures are the one exception and propagate untouched.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::action::Action;
use crate::command;
use crate::config::SceneConfig;
use crate::debug::{print_object_table, print_step_banner, DebugWriter};
use crate::engine::{AnyEngine, Engine, SceneEvent};
use crate::goal::{resolve_goal, Goal};
use crate::observe;
use crate::output::StepOutput;
use crate::params::{NoiseModel, ParamMap, ParamNormalizer, StepData};

/// The capability contract for a simulator-backed controller.
///
/// One concrete implementation exists; the seam is here so tests (and future
/// backends) can substitute their own.
pub trait Controller {
    /// Begin a new scene, returning the observation for step 0.
    fn start_scene(&mut self, config: SceneConfig) -> Result<StepOutput>;

    /// Execute one action. Returns `Ok(None)` when the scene has no steps
    /// left (or no scene is active); the caller should move on to
    /// [`Controller::end_scene`].
    fn step(&mut self, action: &str, params: ParamMap) -> Result<Option<StepOutput>>;

    /// End the active scene, recording the caller's classification and
    /// confidence for later scoring.
    fn end_scene(&mut self, classification: &str, confidence: f64) -> Result<()>;
}

/// Construction options for [`ThorController`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Write per-step artifacts into `<output_root>/<scene name>/`.
    pub debug_to_file: bool,
    /// Echo step banners and object tables to stdout.
    pub debug_to_terminal: bool,
    /// Jitter policy for rotation, horizon, and moveMagnitude.
    pub noise: NoiseModel,
    /// Fixed rng seed for the noise policy; entropy-seeded when unset.
    pub noise_seed: Option<u64>,
    /// Parent directory for per-scene debug output.
    pub output_root: PathBuf,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            debug_to_file: false,
            debug_to_terminal: false,
            noise: NoiseModel::Disabled,
            noise_seed: None,
            output_root: PathBuf::from("."),
        }
    }
}

/// The record written when a scene ends.
#[derive(Debug, Clone, Serialize)]
pub struct SceneReport {
    pub scene_name: Option<String>,
    pub classification: String,
    pub confidence: f64,
    pub steps_taken: u32,
    pub ended_at: DateTime<Utc>,
}

/// The concrete AI2-THOR-backed controller.
pub struct ThorController {
    engine: AnyEngine,
    normalizer: ParamNormalizer,
    debug_to_file: bool,
    debug_to_terminal: bool,
    output_root: PathBuf,
    writer: Option<DebugWriter>,
    scene: Option<SceneConfig>,
    goal: Goal,
    step_number: u32,
    head_tilt: f64,
}

impl ThorController {
    pub fn new(engine: AnyEngine, options: ControllerOptions) -> Self {
        let normalizer = match options.noise_seed {
            Some(seed) => ParamNormalizer::with_seed(options.noise, seed),
            None => ParamNormalizer::new(options.noise),
        };
        Self {
            engine,
            normalizer,
            debug_to_file: options.debug_to_file,
            debug_to_terminal: options.debug_to_terminal,
            output_root: options.output_root,
            writer: None,
            scene: None,
            goal: Goal::default(),
            step_number: 0,
            head_tilt: 0.0,
        }
    }

    /// The step counter: number of steps taken in the active scene.
    pub fn step_number(&self) -> u32 {
        self.step_number
    }

    /// The camera pitch observed on the most recent output.
    pub fn head_tilt(&self) -> f64 {
        self.head_tilt
    }

    /// The underlying engine (tests inspect the mock through this).
    pub fn engine(&self) -> &AnyEngine {
        &self.engine
    }

    fn wrap_output(&mut self, event: SceneEvent) -> StepOutput {
        if let Some(writer) = &self.writer {
            writer.engine_output(self.step_number, &event.metadata);
        }

        let depth_mask = event.depth_frame.to_grayscale();
        if let Some(writer) = &self.writer {
            writer.images(self.step_number, &event.frame, &depth_mask, &event.object_mask);
        }

        let output = StepOutput {
            step_number: self.step_number,
            action_list: observe::allowed_actions(&self.goal, self.step_number as usize),
            head_tilt: observe::head_tilt(&event.metadata),
            goal: self.goal.clone(),
            object_list: observe::object_list(&event),
            pose: observe::pose(&event),
            return_status: observe::return_status(&event.metadata),
            image_list: vec![event.frame],
            depth_mask_list: vec![depth_mask],
            object_mask_list: vec![event.object_mask],
        };

        self.head_tilt = output.head_tilt;

        if self.debug_to_terminal {
            println!("RETURN STATUS: {}", output.return_status);
            print_object_table(&output.object_list);
        }
        if let Some(writer) = &self.writer {
            writer.step_output(self.step_number, &output);
        }

        output
    }
}

impl Controller for ThorController {
    fn start_scene(&mut self, config: SceneConfig) -> Result<StepOutput> {
        self.step_number = 0;
        self.head_tilt = 0.0;
        self.goal = resolve_goal(&config);

        self.writer = match (&config.name, self.debug_to_file) {
            (Some(name), true) => match DebugWriter::create(&self.output_root, name) {
                Ok(writer) => Some(writer),
                Err(err) => {
                    warn!(%err, "debug output disabled for this scene");
                    None
                }
            },
            _ => None,
        };

        self.scene = Some(config.clone());
        let data = StepData::initialize(config);
        if let Some(writer) = &self.writer {
            writer.engine_input(self.step_number, &data);
        }
        let event = self.engine.step(&data)?;
        Ok(self.wrap_output(event))
    }

    fn step(&mut self, action: &str, params: ParamMap) -> Result<Option<StepOutput>> {
        if self.scene.is_none() {
            warn!("no active scene; call start_scene first");
            return Ok(None);
        }

        if let Some(last_step) = self.goal.last_step {
            if self.step_number >= last_step {
                warn!(
                    last_step,
                    "the scene has passed its last step; skipping the action. \
                     Call end_scene now."
                );
                return Ok(None);
            }
        }

        // The single-string command form carries its parameters inline.
        let (action_name, params) = if action.contains(',') {
            command::parse(action)
        } else {
            (action.to_string(), params)
        };

        let action = match Action::parse(&action_name) {
            Some(action) => action,
            None => {
                warn!(
                    action = action_name,
                    "not a valid action; exchanging it with Pass"
                );
                Action::Pass
            }
        };

        self.step_number += 1;

        if self.debug_to_terminal {
            print_step_banner(self.step_number, action.as_str());
        }

        let parameters = self.normalizer.normalize(action, &params);
        // Translation must follow normalization: normalization dispatches on
        // the abstract action's class.
        let data = StepData::new(action.to_native(), parameters);

        if let Some(writer) = &self.writer {
            writer.engine_input(self.step_number, &data);
        }
        let event = self.engine.step(&data)?;
        Ok(Some(self.wrap_output(event)))
    }

    fn end_scene(&mut self, classification: &str, confidence: f64) -> Result<()> {
        let report = SceneReport {
            scene_name: self.scene.as_ref().and_then(|scene| scene.name.clone()),
            classification: classification.to_string(),
            confidence,
            steps_taken: self.step_number,
            ended_at: Utc::now(),
        };

        info!(
            scene = report.scene_name.as_deref().unwrap_or("<unnamed>"),
            classification,
            confidence,
            steps = report.steps_taken,
            "scene ended"
        );

        if let Some(writer) = &self.writer {
            writer.record("scene_report.json", &report);
        }

        self.scene = None;
        self.writer = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;
    use crate::output::ReturnStatus;
    use serde_json::json;

    fn scene(value: serde_json::Value) -> SceneConfig {
        serde_json::from_value(value).unwrap()
    }

    fn controller() -> ThorController {
        ThorController::new(
            AnyEngine::Mock(MockEngine::new()),
            ControllerOptions::default(),
        )
    }

    fn mock(controller: &ThorController) -> &MockEngine {
        controller.engine().as_mock().unwrap()
    }

    #[test]
    fn start_scene_initializes_and_returns_step_zero() {
        let mut controller = controller();
        let output = controller
            .start_scene(scene(json!({"name": "kitchen"})))
            .unwrap();
        assert_eq!(output.step_number, 0);
        assert_eq!(output.return_status, ReturnStatus::Successful);

        let request = mock(&controller).last_request().unwrap().clone();
        assert_eq!(request["action"], "Initialize");
        assert_eq!(request["sceneConfig"]["name"], "kitchen");
    }

    #[test]
    fn step_without_a_scene_is_refused() {
        let mut controller = controller();
        let result = controller.step("MoveAhead", ParamMap::new()).unwrap();
        assert!(result.is_none());
        assert_eq!(mock(&controller).calls(), 0);
    }

    #[test]
    fn step_counter_increments_once_per_accepted_call() {
        let mut controller = controller();
        controller.start_scene(scene(json!({}))).unwrap();

        let first = controller.step("MoveAhead", ParamMap::new()).unwrap().unwrap();
        assert_eq!(first.step_number, 1);

        // Unknown actions are substituted with Pass but still count.
        let second = controller.step("Fly", ParamMap::new()).unwrap().unwrap();
        assert_eq!(second.step_number, 2);
        assert_eq!(controller.step_number(), 2);
    }

    #[test]
    fn unknown_action_reaches_the_engine_as_pass() {
        let mut controller = controller();
        controller.start_scene(scene(json!({}))).unwrap();
        controller.step("Fly", ParamMap::new()).unwrap().unwrap();
        assert_eq!(mock(&controller).last_request().unwrap()["action"], "Pass");
    }

    #[test]
    fn translated_names_reach_the_engine() {
        let mut controller = controller();
        controller.start_scene(scene(json!({}))).unwrap();
        controller.step("OpenObject", ParamMap::new()).unwrap();
        assert_eq!(
            mock(&controller).last_request().unwrap()["action"],
            "StagehandOpenObject"
        );
        controller.step("DropObject", ParamMap::new()).unwrap();
        assert_eq!(
            mock(&controller).last_request().unwrap()["action"],
            "DropHandObject"
        );
    }

    #[test]
    fn comma_form_matches_the_typed_call() {
        let mut controller = controller();
        controller.start_scene(scene(json!({}))).unwrap();
        controller
            .step("RotateLook, rotation=45, horizon=15", ParamMap::new())
            .unwrap();
        let from_string = mock(&controller).last_request().unwrap().clone();

        let mut params = ParamMap::new();
        params.insert("rotation".into(), json!(45.0));
        params.insert("horizon".into(), json!(15.0));
        controller.step("RotateLook", params).unwrap();
        let from_map = mock(&controller).last_request().unwrap().clone();

        assert_eq!(from_string, from_map);
        assert_eq!(from_map["rotation"]["y"], json!(45.0));
        assert_eq!(from_map["horizon"], json!(15.0));
    }

    #[test]
    fn last_step_guard_refuses_without_an_engine_call() {
        let mut controller = controller();
        controller
            .start_scene(scene(json!({"goal": {"last_step": 2}})))
            .unwrap();
        let calls_after_start = mock(&controller).calls();

        assert!(controller.step("MoveAhead", ParamMap::new()).unwrap().is_some());
        assert!(controller.step("MoveAhead", ParamMap::new()).unwrap().is_some());

        // Third step: refused, no engine call, counter untouched.
        let refused = controller.step("MoveAhead", ParamMap::new()).unwrap();
        assert!(refused.is_none());
        assert_eq!(mock(&controller).calls(), calls_after_start + 2);
        assert_eq!(controller.step_number(), 2);
    }

    #[test]
    fn action_whitelist_flows_into_the_output() {
        let mut controller = controller();
        let output = controller
            .start_scene(scene(json!({
                "goal": {"action_list": [["Pass"], ["MoveAhead", "MoveBack"]]}
            })))
            .unwrap();
        // Step 0 (scene start) reads whitelist entry 0.
        assert_eq!(output.action_list, vec!["Pass"]);

        let output = controller.step("Pass", ParamMap::new()).unwrap().unwrap();
        assert_eq!(output.action_list, vec!["MoveAhead", "MoveBack"]);

        let output = controller.step("MoveAhead", ParamMap::new()).unwrap().unwrap();
        assert_eq!(output.action_list, Action::vocabulary());
    }

    #[test]
    fn head_tilt_is_cached_from_the_latest_output() {
        let events = vec![
            MockEngine::event(
                json!({"agent": {"cameraHorizon": 0.0}, "lastActionStatus": "SUCCESSFUL"}),
                &[],
            ),
            MockEngine::event(
                json!({"agent": {"cameraHorizon": 15.0}, "lastActionStatus": "SUCCESSFUL"}),
                &[],
            ),
        ];
        let mut controller = ThorController::new(
            AnyEngine::Mock(MockEngine::with_events(events)),
            ControllerOptions::default(),
        );
        controller.start_scene(scene(json!({}))).unwrap();
        assert_eq!(controller.head_tilt(), 0.0);
        controller.step("RotateLook, horizon=15", ParamMap::new()).unwrap();
        assert_eq!(controller.head_tilt(), 15.0);
    }

    #[test]
    fn end_scene_closes_the_scene() {
        let mut controller = controller();
        controller.start_scene(scene(json!({}))).unwrap();
        controller.step("MoveAhead", ParamMap::new()).unwrap();
        controller.end_scene("plausible", 0.8).unwrap();

        let refused = controller.step("MoveAhead", ParamMap::new()).unwrap();
        assert!(refused.is_none());
    }

    #[test]
    fn restarting_a_scene_resets_the_counter() {
        let mut controller = controller();
        controller.start_scene(scene(json!({}))).unwrap();
        controller.step("MoveAhead", ParamMap::new()).unwrap();
        assert_eq!(controller.step_number(), 1);

        controller.start_scene(scene(json!({}))).unwrap();
        assert_eq!(controller.step_number(), 0);
    }

    #[test]
    fn debug_mode_writes_the_artifact_set() {
        let root = tempfile::tempdir().unwrap();
        let mut controller = ThorController::new(
            AnyEngine::Mock(MockEngine::new()),
            ControllerOptions {
                debug_to_file: true,
                output_root: root.path().to_path_buf(),
                ..ControllerOptions::default()
            },
        );
        controller
            .start_scene(scene(json!({"name": "artifacts"})))
            .unwrap();
        controller.step("MoveAhead", ParamMap::new()).unwrap();
        controller.end_scene("implausible", 0.3).unwrap();

        let folder = root.path().join("artifacts");
        for file in [
            "ai2thor_input_0.json",
            "ai2thor_output_0.json",
            "step_output_0.json",
            "frame_image_0.png",
            "depth_mask_0.png",
            "object_mask_0.png",
            "ai2thor_input_1.json",
            "ai2thor_output_1.json",
            "step_output_1.json",
            "frame_image_1.png",
            "scene_report.json",
        ] {
            assert!(folder.join(file).exists(), "missing artifact {file}");
        }

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(folder.join("scene_report.json")).unwrap())
                .unwrap();
        assert_eq!(report["classification"], "implausible");
        assert_eq!(report["steps_taken"], 1);
    }
}
