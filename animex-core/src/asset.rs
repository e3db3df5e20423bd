//! Typed library assets

use crate::document::{RawFrame, RawTimelineType};

/// Kind of library asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Bitmap,
    Shape,
    Text,
    Sound,
    Timeline,
}

/// Variant of a timeline asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimelineKind {
    /// Static display container with at most one frame
    Container,
    /// Graphic symbol; names are local and may collide
    Graphic,
    /// Main stage
    Stage,
    /// Multi-frame movie clip with a globally unique name
    MovieClip,
}

impl TimelineKind {
    /// Classifies a timeline from its exported type and length.
    /// Anything but the stage with one frame or less is a static container.
    pub fn classify(timeline_type: RawTimelineType, total_frames: u32) -> Self {
        match timeline_type {
            RawTimelineType::Stage => TimelineKind::Stage,
            _ if total_frames <= 1 => TimelineKind::Container,
            RawTimelineType::Graphic => TimelineKind::Graphic,
            RawTimelineType::MovieClip => TimelineKind::MovieClip,
        }
    }

    /// True for timelines that play over more than one frame
    pub fn is_animated(self) -> bool {
        self != TimelineKind::Container
    }
}

/// Bitmap image asset
#[derive(Debug, Clone, PartialEq)]
pub struct BitmapAsset {
    pub asset_id: u32,
    pub name: String,
    pub src: String,
    pub width: u32,
    pub height: u32,
}

/// Vector shape asset
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeAsset {
    pub asset_id: u32,
    pub name: String,
    /// Position in the exported shape list, used to address the shape cache
    pub index: usize,
}

/// Text field asset
#[derive(Debug, Clone, PartialEq)]
pub struct TextAsset {
    pub asset_id: u32,
    pub name: String,
    pub text: String,
}

/// Sound asset
#[derive(Debug, Clone, PartialEq)]
pub struct SoundAsset {
    pub asset_id: u32,
    pub name: String,
    pub src: String,
}

/// Timeline asset with its exported frames
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineAsset {
    pub asset_id: u32,
    /// Final, unique name used for output
    pub name: String,
    /// Name as written by the exporter; tween groups are keyed by it
    pub source_name: String,
    pub kind: TimelineKind,
    pub total_frames: u32,
    /// Exported frames in ascending frame order
    pub frames: Vec<RawFrame>,
}

impl TimelineAsset {
    /// Script attached to the first frame, if any
    pub fn first_frame_script(&self) -> Option<&str> {
        self.frames
            .first()
            .filter(|f| f.frame == 0)
            .and_then(|f| f.scripts.first())
            .map(String::as_str)
    }
}

/// Borrowed view of any asset in the catalog
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Asset<'a> {
    Bitmap(&'a BitmapAsset),
    Shape(&'a ShapeAsset),
    Text(&'a TextAsset),
    Sound(&'a SoundAsset),
    Timeline(&'a TimelineAsset),
}

impl<'a> Asset<'a> {
    /// Global asset identifier
    pub fn asset_id(&self) -> u32 {
        match self {
            Asset::Bitmap(a) => a.asset_id,
            Asset::Shape(a) => a.asset_id,
            Asset::Text(a) => a.asset_id,
            Asset::Sound(a) => a.asset_id,
            Asset::Timeline(a) => a.asset_id,
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'a str {
        match self {
            Asset::Bitmap(a) => &a.name,
            Asset::Shape(a) => &a.name,
            Asset::Text(a) => &a.name,
            Asset::Sound(a) => &a.name,
            Asset::Timeline(a) => &a.name,
        }
    }

    /// Kind of the asset
    pub fn kind(&self) -> AssetKind {
        match self {
            Asset::Bitmap(_) => AssetKind::Bitmap,
            Asset::Shape(_) => AssetKind::Shape,
            Asset::Text(_) => AssetKind::Text,
            Asset::Sound(_) => AssetKind::Sound,
            Asset::Timeline(_) => AssetKind::Timeline,
        }
    }

    /// Timeline variant, for timeline assets
    pub fn timeline_kind(&self) -> Option<TimelineKind> {
        match self {
            Asset::Timeline(t) => Some(t.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_timelines() {
        assert_eq!(
            TimelineKind::classify(RawTimelineType::MovieClip, 1),
            TimelineKind::Container
        );
        assert_eq!(
            TimelineKind::classify(RawTimelineType::Graphic, 0),
            TimelineKind::Container
        );
        assert_eq!(
            TimelineKind::classify(RawTimelineType::Stage, 1),
            TimelineKind::Stage
        );
        assert_eq!(
            TimelineKind::classify(RawTimelineType::Graphic, 5),
            TimelineKind::Graphic
        );
        assert_eq!(
            TimelineKind::classify(RawTimelineType::MovieClip, 5),
            TimelineKind::MovieClip
        );
    }
}
