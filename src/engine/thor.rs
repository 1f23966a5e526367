//! AI2-THOR engine session over its local HTTP endpoint.
//!
//! The engine runs as a separate process (a Unity build) exposing a local
//! HTTP session. Each step POSTs the payload as JSON and decodes the
//! response: base64 PNG frames, a raw depth array, the metadata blob, and the
//! per-event object-id color table.

use std::collections::HashMap;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::RgbImage;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{DepthFrame, Engine, SceneEvent};
use crate::output::Color;
use crate::params::StepData;

/// How many times to poll the session endpoint after launching the binary.
const READY_ATTEMPTS: u32 = 20;
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A live engine session reached over HTTP.
pub struct ThorHttpEngine {
    base_url: String,
    http: reqwest::blocking::Client,
    /// The engine process, when this session launched it. Killed on drop.
    child: Option<Child>,
}

/// The JSON shape of an engine step response.
#[derive(Debug, Deserialize)]
struct EngineResponse {
    /// Base64-encoded PNG of the rendered frame.
    #[serde(default)]
    frame: Option<String>,
    #[serde(default)]
    depth: Option<DepthPayload>,
    /// Base64-encoded PNG of the instance-segmentation frame.
    #[serde(default)]
    object_mask: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
    /// Object id -> segmentation RGB.
    #[serde(default)]
    colors: HashMap<String, [u8; 3]>,
}

#[derive(Debug, Deserialize)]
struct DepthPayload {
    width: u32,
    height: u32,
    #[serde(default)]
    values: Vec<f32>,
}

impl ThorHttpEngine {
    /// Connect to an engine session that is already running.
    ///
    /// The client is built without a request timeout: a step blocks for as
    /// long as the engine takes, and a hung engine hangs the caller.
    pub fn connect(base_url: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .context("failed to build engine HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            child: None,
        })
    }

    /// Launch the engine binary and connect to its session on `port`.
    ///
    /// The child process is killed when this engine is dropped.
    pub fn launch(executable: &Path, port: u16) -> Result<Self> {
        info!(executable = %executable.display(), port, "launching engine process");

        let child = Command::new(executable)
            .arg("--port")
            .arg(port.to_string())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to launch engine binary {}", executable.display()))?;

        let mut engine = Self::connect(&format!("http://127.0.0.1:{port}"))?;
        engine.child = Some(child);
        engine.wait_until_ready()?;
        Ok(engine)
    }

    fn wait_until_ready(&self) -> Result<()> {
        for attempt in 1..=READY_ATTEMPTS {
            match self.http.get(format!("{}/ping", self.base_url)).send() {
                Ok(response) if response.status().is_success() => {
                    debug!(attempt, "engine session is up");
                    return Ok(());
                }
                Ok(response) => {
                    debug!(attempt, status = %response.status(), "engine session not ready")
                }
                Err(err) => debug!(attempt, %err, "engine session not reachable yet"),
            }
            std::thread::sleep(READY_POLL_INTERVAL);
        }
        anyhow::bail!(
            "engine session at {} did not come up after {} attempts",
            self.base_url,
            READY_ATTEMPTS
        )
    }

    fn decode_event(&self, response: EngineResponse) -> SceneEvent {
        let frame = response
            .frame
            .as_deref()
            .map(|data| decode_png(data, "frame"))
            .unwrap_or_else(|| RgbImage::new(0, 0));
        let object_mask = response
            .object_mask
            .as_deref()
            .map(|data| decode_png(data, "object mask"))
            .unwrap_or_else(|| RgbImage::new(0, 0));
        let depth_frame = response
            .depth
            .map(|payload| DepthFrame {
                width: payload.width,
                height: payload.height,
                values: payload.values,
            })
            .unwrap_or_default();

        SceneEvent {
            frame,
            depth_frame,
            object_mask,
            metadata: response.metadata,
            object_id_to_color: response
                .colors
                .into_iter()
                .map(|(id, rgb)| (id, Color::from(rgb)))
                .collect(),
        }
    }
}

impl Engine for ThorHttpEngine {
    fn step(&mut self, data: &StepData) -> Result<SceneEvent> {
        let response: EngineResponse = self
            .http
            .post(format!("{}/step", self.base_url))
            .json(data)
            .send()
            .context("failed to reach engine session on step")?
            .json()
            .context("failed to parse engine step response")?;

        Ok(self.decode_event(response))
    }
}

impl Drop for ThorHttpEngine {
    fn drop(&mut self) {
        if let Some(child) = &mut self.child {
            if let Err(err) = child.kill() {
                warn!(%err, "failed to kill engine process");
            }
            let _ = child.wait();
        }
    }
}

/// Decode a base64 PNG into an RGB buffer; a bad frame yields an empty buffer
/// rather than failing the step.
fn decode_png(data: &str, label: &str) -> RgbImage {
    let bytes = match BASE64.decode(data) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, label, "engine sent undecodable base64; dropping image");
            return RgbImage::new(0, 0);
        }
    };
    match image::load_from_memory(&bytes) {
        Ok(decoded) => decoded.to_rgb8(),
        Err(err) => {
            warn!(%err, label, "engine sent an unreadable image; dropping it");
            RgbImage::new(0, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_decodes_with_every_field_missing() {
        let engine = ThorHttpEngine::connect("http://127.0.0.1:9").unwrap();
        let response: EngineResponse = serde_json::from_value(json!({})).unwrap();
        let event = engine.decode_event(response);
        assert_eq!(event.frame.dimensions(), (0, 0));
        assert_eq!(event.depth_frame, DepthFrame::default());
        assert!(event.object_id_to_color.is_empty());
        assert!(event.metadata.is_null());
    }

    #[test]
    fn response_decodes_colors_and_metadata() {
        let engine = ThorHttpEngine::connect("http://127.0.0.1:9").unwrap();
        let response: EngineResponse = serde_json::from_value(json!({
            "metadata": {"lastActionStatus": "SUCCESSFUL"},
            "colors": {"ball_1": [250, 10, 20]},
            "depth": {"width": 2, "height": 1, "values": [0.5, 1.5]}
        }))
        .unwrap();
        let event = engine.decode_event(response);
        assert_eq!(event.metadata["lastActionStatus"], "SUCCESSFUL");
        assert_eq!(
            event.object_id_to_color["ball_1"],
            Color { r: 250, g: 10, b: 20 }
        );
        assert_eq!(event.depth_frame.values, vec![0.5, 1.5]);
    }

    #[test]
    fn bad_base64_degrades_to_an_empty_image() {
        let image = decode_png("not-base64!!", "frame");
        assert_eq!(image.dimensions(), (0, 0));
    }
}
