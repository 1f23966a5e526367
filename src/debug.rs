//! Debug artifact output.
//!
//! When enabled, every step of a scene drops its frames and payloads into a
//! per-scene directory: frame/depth/mask PNGs plus the engine input, engine
//! output, and step-output JSON dumps. Writes are fire-and-forget side
//! effects; a failed write logs a warning and never disturbs the step.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{GrayImage, RgbImage};
use serde::Serialize;
use tracing::warn;

use crate::output::{StepOutput, WorldObject};
use crate::params::StepData;

/// Writes per-step artifacts into one scene's output directory.
#[derive(Debug)]
pub struct DebugWriter {
    folder: PathBuf,
}

impl DebugWriter {
    /// Create (and clear) the output directory for a scene.
    ///
    /// Any plain files left over from a previous run of the same scene are
    /// removed; subdirectories are left alone.
    pub fn create(root: &Path, scene_name: &str) -> Result<Self> {
        let folder = root.join(scene_name);
        std::fs::create_dir_all(&folder)
            .with_context(|| format!("failed to create output folder {}", folder.display()))?;

        for entry in std::fs::read_dir(&folder)
            .with_context(|| format!("failed to list output folder {}", folder.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Err(err) = std::fs::remove_file(entry.path()) {
                    warn!(%err, path = %entry.path().display(), "failed to clear stale artifact");
                }
            }
        }

        Ok(Self { folder })
    }

    /// The directory artifacts are written into.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Dump the payload about to be sent to the engine.
    pub fn engine_input(&self, step_number: u32, data: &StepData) {
        self.write_json(&format!("ai2thor_input_{step_number}.json"), data);
    }

    /// Dump the raw metadata the engine returned.
    pub fn engine_output(&self, step_number: u32, metadata: &serde_json::Value) {
        self.write_json(
            &format!("ai2thor_output_{step_number}.json"),
            &serde_json::json!({ "metadata": metadata }),
        );
    }

    /// Dump the assembled step output (images excluded).
    pub fn step_output(&self, step_number: u32, output: &StepOutput) {
        self.write_json(&format!("step_output_{step_number}.json"), output);
    }

    /// Save the step's frame, depth mask, and object mask as PNGs.
    pub fn images(
        &self,
        step_number: u32,
        frame: &RgbImage,
        depth_mask: &GrayImage,
        object_mask: &RgbImage,
    ) {
        self.save_png(&format!("frame_image_{step_number}.png"), frame);
        self.save_gray_png(&format!("depth_mask_{step_number}.png"), depth_mask);
        self.save_png(&format!("object_mask_{step_number}.png"), object_mask);
    }

    /// Write an arbitrary serializable record (used for the end-of-scene
    /// report).
    pub fn record<T: Serialize>(&self, file_name: &str, value: &T) {
        self.write_json(file_name, value);
    }

    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) {
        let path = self.folder.join(file_name);
        let result = serde_json::to_string_pretty(value)
            .map_err(anyhow::Error::from)
            .and_then(|text| std::fs::write(&path, text).map_err(anyhow::Error::from));
        if let Err(err) = result {
            warn!(%err, path = %path.display(), "failed to write debug artifact");
        }
    }

    fn save_png(&self, file_name: &str, image: &RgbImage) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let path = self.folder.join(file_name);
        if let Err(err) = image.save(&path) {
            warn!(%err, path = %path.display(), "failed to save debug image");
        }
    }

    fn save_gray_png(&self, file_name: &str, image: &GrayImage) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        let path = self.folder.join(file_name);
        if let Err(err) = image.save(&path) {
            warn!(%err, path = %path.display(), "failed to save debug image");
        }
    }
}

/// Print the step banner used by the terminal echo mode.
pub fn print_step_banner(step_number: u32, action: &str) {
    println!("===============================================================================");
    println!("STEP: {step_number}");
    println!("ACTION: {action}");
}

/// Print a compact object table for the terminal echo mode.
pub fn print_object_table(objects: &[WorldObject]) {
    println!("OBJECTS ({} TOTAL):", objects.len());
    for object in objects {
        println!(
            "    {} distance={:.2} held={} visible={} mass={:.2}",
            object.uuid, object.distance, object.held, object.visible, object.mass
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::params::{ParamMap, ParamNormalizer};

    #[test]
    fn create_clears_stale_files_but_keeps_subdirectories() {
        let root = tempfile::tempdir().unwrap();
        let scene_dir = root.path().join("kitchen");
        std::fs::create_dir_all(scene_dir.join("nested")).unwrap();
        std::fs::write(scene_dir.join("frame_image_1.png"), b"stale").unwrap();

        let writer = DebugWriter::create(root.path(), "kitchen").unwrap();
        assert!(!scene_dir.join("frame_image_1.png").exists());
        assert!(scene_dir.join("nested").exists());
        assert_eq!(writer.folder(), scene_dir);
    }

    #[test]
    fn engine_input_writes_pretty_json() {
        let root = tempfile::tempdir().unwrap();
        let writer = DebugWriter::create(root.path(), "scene").unwrap();

        let mut normalizer = ParamNormalizer::disabled();
        let data = StepData::new(
            Action::MoveAhead.to_native(),
            normalizer.normalize(Action::MoveAhead, &ParamMap::new()),
        );
        writer.engine_input(3, &data);

        let text =
            std::fs::read_to_string(writer.folder().join("ai2thor_input_3.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["action"], "MoveAhead");
        assert!(text.contains('\n'));
    }

    #[test]
    fn images_skip_empty_buffers() {
        let root = tempfile::tempdir().unwrap();
        let writer = DebugWriter::create(root.path(), "scene").unwrap();
        writer.images(
            1,
            &RgbImage::new(0, 0),
            &GrayImage::new(0, 0),
            &RgbImage::new(0, 0),
        );
        assert!(!writer.folder().join("frame_image_1.png").exists());
    }

    #[test]
    fn images_write_pngs_for_real_buffers() {
        let root = tempfile::tempdir().unwrap();
        let writer = DebugWriter::create(root.path(), "scene").unwrap();
        writer.images(
            2,
            &RgbImage::from_pixel(4, 3, image::Rgb([10, 20, 30])),
            &GrayImage::from_pixel(4, 3, image::Luma([128])),
            &RgbImage::from_pixel(4, 3, image::Rgb([1, 2, 3])),
        );
        assert!(writer.folder().join("frame_image_2.png").exists());
        assert!(writer.folder().join("depth_mask_2.png").exists());
        assert!(writer.folder().join("object_mask_2.png").exists());
    }
}
