//! The simulator engine seam.
//!
//! Everything below the adapter talks to the engine through the [`Engine`]
//! trait: one blocking `step(payload) -> scene event` call. Included engines:
//! - **AI2-THOR session** ([`thor`]) -- drives a running engine process over
//!   its local HTTP session, optionally launching the binary itself.
//! - **Mock** ([`mock`]) -- replays scripted scene events and records the
//!   payloads it was sent, for tests.

pub mod mock;
pub mod thor;

use std::collections::HashMap;

use anyhow::Result;
use image::{GrayImage, Luma, RgbImage};

use crate::output::Color;
use crate::params::StepData;

pub use mock::MockEngine;
pub use thor::ThorHttpEngine;

/// Divisor applied to raw depth values before grayscale conversion; without
/// it the depth mask renders almost entirely white.
pub const DEPTH_DIVISOR: f32 = 30.0;

// ---------------------------------------------------------------------------
// Scene events
// ---------------------------------------------------------------------------

/// Raw depth output for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major depth values.
    pub values: Vec<f32>,
}

impl DepthFrame {
    /// Render the depth values into an 8-bit grayscale mask.
    pub fn to_grayscale(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let index = (y * self.width + x) as usize;
            let value = self.values.get(index).copied().unwrap_or(0.0) / DEPTH_DIVISOR;
            Luma([value.clamp(0.0, 255.0) as u8])
        })
    }
}

/// One raw observation from the engine: frames plus the metadata blob.
///
/// The object-id color table rides along on every event rather than living as
/// hidden engine state, so state reconstruction stays a pure function of the
/// event.
#[derive(Debug, Clone)]
pub struct SceneEvent {
    pub frame: RgbImage,
    pub depth_frame: DepthFrame,
    /// Instance-segmentation frame.
    pub object_mask: RgbImage,
    /// The raw metadata mapping, kept untyped; reconstruction decodes the
    /// pieces it needs tolerantly.
    pub metadata: serde_json::Value,
    /// Engine object id to segmentation color.
    pub object_id_to_color: HashMap<String, Color>,
}

impl Default for SceneEvent {
    fn default() -> Self {
        Self {
            frame: RgbImage::new(0, 0),
            depth_frame: DepthFrame::default(),
            object_mask: RgbImage::new(0, 0),
            metadata: serde_json::Value::Null,
            object_id_to_color: HashMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine trait and dispatch
// ---------------------------------------------------------------------------

/// A single-session simulator backend.
///
/// The call blocks until the engine returns a scene event; there is no
/// timeout, and engine failures propagate to the caller untouched.
pub trait Engine {
    fn step(&mut self, data: &StepData) -> Result<SceneEvent>;
}

/// Enum dispatch over the concrete engines, so the controller can be handed
/// either at runtime without generics at the call site.
pub enum AnyEngine {
    Thor(ThorHttpEngine),
    Mock(MockEngine),
}

impl AnyEngine {
    /// The mock engine, when this is one. Tests use this to inspect the
    /// payloads a controller sent.
    pub fn as_mock(&self) -> Option<&MockEngine> {
        match self {
            AnyEngine::Mock(engine) => Some(engine),
            AnyEngine::Thor(_) => None,
        }
    }
}

impl Engine for AnyEngine {
    fn step(&mut self, data: &StepData) -> Result<SceneEvent> {
        match self {
            AnyEngine::Thor(engine) => engine.step(data),
            AnyEngine::Mock(engine) => engine.step(data),
        }
    }
}
