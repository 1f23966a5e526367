//! A scripted mock engine for testing.
//!
//! Replays predefined scene events and records every payload it receives, so
//! tests can drive the full controller without a running engine process and
//! assert on exactly what would have been sent.

use anyhow::{Context, Result};
use image::RgbImage;
use serde_json::Value;

use super::{Engine, SceneEvent};
use crate::params::StepData;

/// A mock engine that replays canned events.
///
/// Events are consumed in order; once the script runs out, the last event is
/// repeated, so open-ended tests keep receiving observations.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    events: Vec<SceneEvent>,
    next_event: usize,
    requests: Vec<Value>,
}

impl MockEngine {
    /// A mock that always answers with a minimal successful event.
    pub fn new() -> Self {
        Self::with_events(vec![Self::event(
            serde_json::json!({
                "agent": {"cameraHorizon": 0.0},
                "lastActionStatus": "SUCCESSFUL",
                "objects": []
            }),
            &[],
        )])
    }

    /// A mock replaying the given events in order.
    pub fn with_events(events: Vec<SceneEvent>) -> Self {
        Self {
            events,
            next_event: 0,
            requests: Vec::new(),
        }
    }

    /// Build a synthetic scene event with small non-empty frames.
    pub fn event(metadata: Value, colors: &[(&str, [u8; 3])]) -> SceneEvent {
        SceneEvent {
            frame: RgbImage::from_pixel(4, 3, image::Rgb([40, 80, 120])),
            depth_frame: super::DepthFrame {
                width: 4,
                height: 3,
                values: vec![30.0; 12],
            },
            object_mask: RgbImage::from_pixel(4, 3, image::Rgb([1, 2, 3])),
            metadata,
            object_id_to_color: colors
                .iter()
                .map(|(id, rgb)| (id.to_string(), crate::output::Color::from(*rgb)))
                .collect(),
        }
    }

    /// Every payload this mock has been sent, as JSON values, in call order.
    pub fn requests(&self) -> &[Value] {
        &self.requests
    }

    /// The most recent payload, if any call was made.
    pub fn last_request(&self) -> Option<&Value> {
        self.requests.last()
    }

    /// Number of step calls received.
    pub fn calls(&self) -> usize {
        self.requests.len()
    }
}

impl Engine for MockEngine {
    fn step(&mut self, data: &StepData) -> Result<SceneEvent> {
        let payload = serde_json::to_value(data).context("failed to snapshot step payload")?;
        self.requests.push(payload);

        let event = self
            .events
            .get(self.next_event)
            .or_else(|| self.events.last())
            .cloned()
            .unwrap_or_default();
        if self.next_event + 1 < self.events.len() {
            self.next_event += 1;
        }
        Ok(event)
    }
}
