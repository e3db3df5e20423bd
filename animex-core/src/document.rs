//! Raw timeline export document
//!
//! The export is a JSON record with a `_meta` block and parallel collections
//! of bitmaps, shapes, sounds, texts, timelines and tweens. Geometry payloads
//! are carried opaquely; only the fields the pipeline reads are typed.

use crate::command::Command;
use crate::transform::Transform;
use crate::Result;
use serde::Deserialize;
use std::io::Read;

/// Build settings recorded by the exporter
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportMeta {
    /// Frames per second of the main stage
    pub framerate: f64,
    /// Stage width in pixels
    pub width: u32,
    /// Stage height in pixels
    pub height: u32,
    /// Stage background color as hex digits, e.g. `ffffff`
    pub background: String,
    /// Namespace the generated library is published under
    #[serde(rename = "nameSpace")]
    pub name_space: String,
    /// Name of the main stage class; reserved among movie clip names
    #[serde(rename = "stageName")]
    pub stage_name: String,
    /// `cjs` requests a CommonJS module wrapper
    #[serde(rename = "outputFormat")]
    pub output_format: String,
    /// Version of the output templates, e.g. `1.0`
    #[serde(rename = "outputVersion")]
    pub output_version: String,
    /// Use short helper names in the generated code
    #[serde(rename = "compressJS")]
    pub compress_js: bool,
    /// Loop the main stage timeline
    #[serde(rename = "loopTimeline")]
    pub loop_timeline: bool,
}

impl Default for ExportMeta {
    fn default() -> Self {
        Self {
            framerate: 24.0,
            width: 550,
            height: 400,
            background: "ffffff".to_string(),
            name_space: "lib".to_string(),
            stage_name: "stage".to_string(),
            output_format: String::new(),
            output_version: "1.0".to_string(),
            compress_js: false,
            loop_timeline: true,
        }
    }
}

impl ExportMeta {
    /// Major template version parsed from `outputVersion`
    pub fn template_version(&self) -> u32 {
        self.output_version
            .split('.')
            .next()
            .and_then(|major| major.trim().parse().ok())
            .unwrap_or(1)
    }

    /// True when a CommonJS module wrapper is requested
    pub fn is_common_js(&self) -> bool {
        self.output_format == "cjs"
    }
}

/// Bitmap record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBitmap {
    pub asset_id: u32,
    pub name: String,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Vector shape record; the draw data is kept opaque
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawShape {
    pub asset_id: u32,
    #[serde(default)]
    pub name: Option<String>,
}

/// Sound record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSound {
    pub asset_id: u32,
    pub name: String,
    #[serde(default)]
    pub src: String,
}

/// Text field record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawText {
    pub asset_id: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub txt: String,
}

/// Timeline type as written by the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawTimelineType {
    MovieClip,
    Graphic,
    Stage,
}

/// One exported frame: the commands that change something on it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFrame {
    /// Frame index within the timeline
    pub frame: u32,
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub scripts: Vec<String>,
}

/// Timeline record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTimeline {
    pub asset_id: u32,
    pub name: String,
    #[serde(rename = "type")]
    pub timeline_type: RawTimelineType,
    pub total_frames: u32,
    #[serde(default)]
    pub frames: Vec<RawFrame>,
}

/// Start and end of one tweened property
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTweenProperty {
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub ease_type: Option<String>,
    #[serde(default)]
    pub ease_strength: Option<f64>,
}

/// Tween record
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTween {
    pub start: u32,
    pub end: u32,
    pub start_transform: Transform,
    #[serde(default)]
    pub end_transform: Option<Transform>,
    #[serde(default)]
    pub x: Option<RawTweenProperty>,
    #[serde(default)]
    pub y: Option<RawTweenProperty>,
    #[serde(default)]
    pub scale_x: Option<RawTweenProperty>,
    #[serde(default)]
    pub scale_y: Option<RawTweenProperty>,
    #[serde(default)]
    pub rotation: Option<RawTweenProperty>,
    #[serde(default)]
    pub skew_x: Option<RawTweenProperty>,
    #[serde(default)]
    pub skew_y: Option<RawTweenProperty>,
    #[serde(default)]
    pub alpha: Option<RawTweenProperty>,
}

impl RawTween {
    /// The tweened property blocks that are present
    pub fn properties(&self) -> impl Iterator<Item = &RawTweenProperty> {
        [
            &self.x,
            &self.y,
            &self.scale_x,
            &self.scale_y,
            &self.rotation,
            &self.skew_x,
            &self.skew_y,
            &self.alpha,
        ]
        .into_iter()
        .flatten()
    }
}

/// Tweens recorded for one timeline
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTweenGroup {
    pub timeline_name: String,
    #[serde(default)]
    pub tweens: Vec<RawTween>,
}

/// Complete export document
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExportDocument {
    #[serde(rename = "_meta", default)]
    pub meta: ExportMeta,
    #[serde(rename = "Bitmaps", default)]
    pub bitmaps: Vec<RawBitmap>,
    #[serde(rename = "Shapes", default)]
    pub shapes: Vec<RawShape>,
    #[serde(rename = "Sounds", default)]
    pub sounds: Vec<RawSound>,
    #[serde(rename = "Texts", default)]
    pub texts: Vec<RawText>,
    #[serde(rename = "Timelines", default)]
    pub timelines: Vec<RawTimeline>,
    #[serde(rename = "Tweens", default)]
    pub tweens: Vec<RawTweenGroup>,
}

impl ExportDocument {
    /// Reads an export document from a reader
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parses an export document from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses an export document from an already decoded JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
