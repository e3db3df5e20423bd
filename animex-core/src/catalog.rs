//! Asset catalog: typed assets plus lookups by id and by name

use crate::asset::{
    Asset, BitmapAsset, ShapeAsset, SoundAsset, TextAsset, TimelineAsset, TimelineKind,
};
use crate::command::CommandKind;
use crate::document::{ExportDocument, ExportMeta, RawTimeline, RawTimelineType};
use crate::{Error, Result};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Position of an asset inside its typed collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssetSlot {
    Bitmap(usize),
    Shape(usize),
    Text(usize),
    Sound(usize),
    Timeline(usize),
}

/// Owns every asset of one export document
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    /// Build settings of the export
    pub meta: ExportMeta,
    bitmaps: Vec<BitmapAsset>,
    shapes: Vec<ShapeAsset>,
    texts: Vec<TextAsset>,
    sounds: Vec<SoundAsset>,
    timelines: Vec<TimelineAsset>,
    by_id: HashMap<u32, AssetSlot>,
    by_name: HashMap<String, usize>,
    stage: Option<usize>,
}

impl AssetCatalog {
    /// Converts every raw record into its typed asset.
    ///
    /// Declaration order is kept within each kind. Timelines placed as
    /// graphics are retyped first, then movie clip names are made unique.
    pub fn new(doc: &ExportDocument) -> Result<Self> {
        let mut catalog = Self {
            meta: doc.meta.clone(),
            bitmaps: Vec::with_capacity(doc.bitmaps.len()),
            shapes: Vec::with_capacity(doc.shapes.len()),
            texts: Vec::with_capacity(doc.texts.len()),
            sounds: Vec::with_capacity(doc.sounds.len()),
            timelines: Vec::with_capacity(doc.timelines.len()),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            stage: None,
        };

        for raw in &doc.bitmaps {
            catalog.insert_id(raw.asset_id, AssetSlot::Bitmap(catalog.bitmaps.len()))?;
            catalog.bitmaps.push(BitmapAsset {
                asset_id: raw.asset_id,
                name: raw.name.clone(),
                src: raw.src.clone(),
                width: raw.width,
                height: raw.height,
            });
        }

        for (index, raw) in doc.shapes.iter().enumerate() {
            catalog.insert_id(raw.asset_id, AssetSlot::Shape(index))?;
            catalog.shapes.push(ShapeAsset {
                asset_id: raw.asset_id,
                name: raw.name.clone().unwrap_or_else(|| format!("Shape{}", index)),
                index,
            });
        }

        for raw in &doc.sounds {
            catalog.insert_id(raw.asset_id, AssetSlot::Sound(catalog.sounds.len()))?;
            catalog.sounds.push(SoundAsset {
                asset_id: raw.asset_id,
                name: raw.name.clone(),
                src: raw.src.clone(),
            });
        }

        for (index, raw) in doc.texts.iter().enumerate() {
            catalog.insert_id(raw.asset_id, AssetSlot::Text(index))?;
            catalog.texts.push(TextAsset {
                asset_id: raw.asset_id,
                name: raw.name.clone().unwrap_or_else(|| format!("Text{}", index)),
                text: raw.txt.clone(),
            });
        }

        let source_names: Vec<String> = doc.timelines.iter().map(|t| t.name.clone()).collect();
        let mut raw_timelines = doc.timelines.clone();
        promote_graphics(&mut raw_timelines)?;

        for (raw, source_name) in raw_timelines.into_iter().zip(source_names) {
            catalog.insert_timeline(raw, source_name)?;
        }

        catalog.check_references()?;

        debug!(
            "Catalog: {} bitmaps, {} shapes, {} texts, {} sounds, {} timelines",
            catalog.bitmaps.len(),
            catalog.shapes.len(),
            catalog.texts.len(),
            catalog.sounds.len(),
            catalog.timelines.len()
        );

        Ok(catalog)
    }

    fn insert_id(&mut self, asset_id: u32, slot: AssetSlot) -> Result<()> {
        if self.by_id.insert(asset_id, slot).is_some() {
            return Err(Error::DuplicateAssetId(asset_id));
        }
        Ok(())
    }

    fn insert_timeline(&mut self, raw: RawTimeline, source_name: String) -> Result<()> {
        let kind = TimelineKind::classify(raw.timeline_type, raw.total_frames);
        let index = self.timelines.len();
        self.insert_id(raw.asset_id, AssetSlot::Timeline(index))?;

        let mut name = raw.name;
        // Graphic names are local; only movie clips need global names
        if kind == TimelineKind::MovieClip {
            let stage_name = self.meta.stage_name.as_str();
            let by_name = &self.by_name;
            name = uniquify_name(&name, |candidate| {
                by_name.contains_key(candidate) || candidate == stage_name
            });
            if name != source_name {
                debug!("Renamed movie clip '{}' to '{}'", source_name, name);
            }
            self.by_name.insert(name.clone(), index);
        }
        if kind == TimelineKind::Stage {
            self.stage = Some(index);
        }

        let mut frames = raw.frames;
        frames.sort_by_key(|f| f.frame);

        self.timelines.push(TimelineAsset {
            asset_id: raw.asset_id,
            name,
            source_name,
            kind,
            total_frames: raw.total_frames,
            frames,
        });
        Ok(())
    }

    /// Every asset a place command refers to must exist
    fn check_references(&self) -> Result<()> {
        for timeline in &self.timelines {
            for frame in &timeline.frames {
                for command in &frame.commands {
                    if let Some(asset_id) = command.asset_id {
                        if !self.by_id.contains_key(&asset_id) {
                            return Err(Error::MalformedExport(format!(
                                "timeline '{}' frame {} references missing asset {}",
                                timeline.name, frame.frame, asset_id
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Gets an asset by id
    pub fn get(&self, asset_id: u32) -> Option<Asset<'_>> {
        let slot = self.by_id.get(&asset_id)?;
        Some(match *slot {
            AssetSlot::Bitmap(i) => Asset::Bitmap(&self.bitmaps[i]),
            AssetSlot::Shape(i) => Asset::Shape(&self.shapes[i]),
            AssetSlot::Text(i) => Asset::Text(&self.texts[i]),
            AssetSlot::Sound(i) => Asset::Sound(&self.sounds[i]),
            AssetSlot::Timeline(i) => Asset::Timeline(&self.timelines[i]),
        })
    }

    /// Gets an asset by id, failing if it does not exist
    pub fn require(&self, asset_id: u32) -> Result<Asset<'_>> {
        self.get(asset_id).ok_or(Error::AssetNotFound(asset_id))
    }

    /// Gets a movie clip by its unique name
    pub fn by_name(&self, name: &str) -> Option<&TimelineAsset> {
        self.by_name.get(name).map(|i| &self.timelines[*i])
    }

    /// Bitmaps in declaration order
    pub fn bitmaps(&self) -> &[BitmapAsset] {
        &self.bitmaps
    }

    /// Shapes in declaration order
    pub fn shapes(&self) -> &[ShapeAsset] {
        &self.shapes
    }

    /// Texts in declaration order
    pub fn texts(&self) -> &[TextAsset] {
        &self.texts
    }

    /// Sounds in declaration order
    pub fn sounds(&self) -> &[SoundAsset] {
        &self.sounds
    }

    /// Timelines in declaration order
    pub fn timelines(&self) -> &[TimelineAsset] {
        &self.timelines
    }

    /// The main stage timeline
    pub fn stage(&self) -> Option<&TimelineAsset> {
        self.stage.map(|i| &self.timelines[i])
    }

    /// True if any timeline is a static container
    pub fn has_container(&self) -> bool {
        self.timelines
            .iter()
            .any(|t| t.kind == TimelineKind::Container)
    }
}

/// Retypes every timeline placed with the graphic flag as a graphic symbol.
///
/// A retyped timeline gets the name `Graphic<N>` with the smallest `N` not
/// already used by a timeline.
pub fn promote_graphics(timelines: &mut [RawTimeline]) -> Result<()> {
    let mut targets = Vec::new();
    for timeline in timelines.iter() {
        for frame in &timeline.frames {
            for command in &frame.commands {
                if let CommandKind::Place {
                    is_graphic: true, ..
                } = command.kind
                {
                    let asset_id = command.asset_id.ok_or_else(|| {
                        Error::MalformedExport(format!(
                            "graphic placement of instance {} has no asset id",
                            command.instance_id
                        ))
                    })?;
                    targets.push(asset_id);
                }
            }
        }
    }

    let mut names: HashSet<String> = timelines.iter().map(|t| t.name.clone()).collect();
    let mut counter = 0u32;
    for asset_id in targets {
        let timeline = timelines
            .iter_mut()
            .find(|t| t.asset_id == asset_id)
            .ok_or_else(|| {
                Error::MalformedExport(format!("graphic placement of missing timeline {}", asset_id))
            })?;
        if timeline.timeline_type == RawTimelineType::Graphic {
            continue;
        }
        timeline.timeline_type = RawTimelineType::Graphic;
        let name = loop {
            counter += 1;
            let candidate = format!("Graphic{}", counter);
            if !names.contains(&candidate) {
                break candidate;
            }
        };
        debug!("Promoted timeline '{}' to graphic '{}'", timeline.name, name);
        names.insert(name.clone());
        timeline.name = name;
    }
    Ok(())
}

/// Appends or increments a `_<n>` suffix until `is_taken` rejects no more.
///
/// An existing trailing `_<digits>` is incremented rather than stacked, so
/// `button` becomes `button_1`, then `button_2`.
pub fn uniquify_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let mut name = name.to_string();
    while is_taken(&name) {
        name = match name.rsplit_once('_') {
            Some((base, digits))
                if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
            {
                match digits.parse::<u64>() {
                    Ok(version) => format!("{}_{}", base, version + 1),
                    Err(_) => format!("{}_1", name),
                }
            }
            _ => format!("{}_1", name),
        };
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn timeline(asset_id: u32, name: &str, kind: &str, total_frames: u32) -> serde_json::Value {
        json!({"assetId": asset_id, "name": name, "type": kind, "totalFrames": total_frames})
    }

    fn catalog(value: serde_json::Value) -> Result<AssetCatalog> {
        AssetCatalog::new(&ExportDocument::from_value(value)?)
    }

    #[test]
    fn test_uniquify_name() {
        let taken = ["button", "button_1", "stage"];
        assert_eq!(uniquify_name("button", |n| taken.contains(&n)), "button_2");
        assert_eq!(uniquify_name("free", |n| taken.contains(&n)), "free");
        assert_eq!(uniquify_name("stage", |n| taken.contains(&n)), "stage_1");
        assert_eq!(uniquify_name("a_b", |n| n == "a_b"), "a_b_1");
        assert_eq!(uniquify_name("clip_7", |n| n == "clip_7"), "clip_8");
    }

    #[test]
    fn test_duplicate_movie_clip_names() {
        let catalog = catalog(json!({
            "Timelines": [
                timeline(1, "button", "movieclip", 5),
                timeline(2, "button", "movieclip", 5),
                timeline(3, "button", "movieclip", 5),
            ]
        }))
        .unwrap();
        let names: Vec<&str> = catalog.timelines().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["button", "button_1", "button_2"]);
        assert_eq!(catalog.by_name("button_1").unwrap().asset_id, 2);
        assert_eq!(catalog.timelines()[2].source_name, "button");
    }

    #[test]
    fn test_movie_clip_cannot_take_stage_name() {
        let catalog = catalog(json!({
            "_meta": {"stageName": "main"},
            "Timelines": [timeline(1, "main", "movieclip", 5), timeline(2, "main", "stage", 5)]
        }))
        .unwrap();
        assert_eq!(catalog.timelines()[0].name, "main_1");
        assert_eq!(catalog.stage().unwrap().asset_id, 2);
    }

    #[test]
    fn test_graphic_names_may_collide() {
        let catalog = catalog(json!({
            "Timelines": [timeline(1, "leaf", "graphic", 5), timeline(2, "leaf", "graphic", 5)]
        }))
        .unwrap();
        assert_eq!(catalog.timelines()[1].name, "leaf");
        assert_eq!(catalog.timelines()[1].kind, TimelineKind::Graphic);
        assert!(catalog.by_name("leaf").is_none());
    }

    #[test]
    fn test_promote_graphics() {
        let catalog = catalog(json!({
            "Timelines": [
                timeline(1, "Graphic1", "graphic", 4),
                timeline(2, "spinner", "movieclip", 4),
                timeline(3, "wheel", "movieclip", 4),
                {"assetId": 4, "name": "root", "type": "stage", "totalFrames": 4, "frames": [
                    {"frame": 0, "commands": [
                        {"type": "Place", "instanceId": 1, "assetId": 2, "isGraphic": true},
                        {"type": "Place", "instanceId": 2, "assetId": 3, "isGraphic": true},
                        {"type": "Place", "instanceId": 3, "assetId": 1, "isGraphic": true}
                    ]}
                ]}
            ]
        }))
        .unwrap();
        let spinner = catalog.get(2).unwrap();
        assert_eq!(spinner.name(), "Graphic2");
        assert_eq!(spinner.timeline_kind(), Some(TimelineKind::Graphic));
        assert_eq!(catalog.get(3).unwrap().name(), "Graphic3");
        assert_eq!(catalog.get(1).unwrap().name(), "Graphic1");
        assert_eq!(catalog.timelines()[1].source_name, "spinner");
    }

    #[test]
    fn test_lookup_by_id_and_kinds() {
        let catalog = catalog(json!({
            "Bitmaps": [{"assetId": 10, "name": "sky"}],
            "Shapes": [{"assetId": 11}, {"assetId": 12}],
            "Sounds": [{"assetId": 13, "name": "pop"}],
            "Texts": [{"assetId": 14, "txt": "Hello"}],
            "Timelines": [timeline(15, "still", "movieclip", 1)]
        }))
        .unwrap();
        assert_eq!(catalog.get(10).unwrap().kind(), crate::AssetKind::Bitmap);
        assert_eq!(catalog.get(12).unwrap().name(), "Shape1");
        assert_eq!(catalog.get(13).unwrap().kind(), crate::AssetKind::Sound);
        assert_eq!(catalog.get(15).unwrap().timeline_kind(), Some(TimelineKind::Container));
        assert!(catalog.has_container());
        assert!(catalog.get(99).is_none());
        assert!(matches!(catalog.require(99), Err(Error::AssetNotFound(99))));
    }

    #[test]
    fn test_missing_asset_reference_is_malformed() {
        let result = catalog(json!({
            "Timelines": [{"assetId": 1, "name": "root", "type": "stage", "totalFrames": 2,
                "frames": [{"frame": 0, "commands": [{"type": "Place", "instanceId": 1, "assetId": 42}]}]}]
        }));
        assert!(matches!(result, Err(Error::MalformedExport(_))));
    }

    #[test]
    fn test_duplicate_asset_id_is_rejected() {
        let result = catalog(json!({
            "Bitmaps": [{"assetId": 1, "name": "a"}],
            "Sounds": [{"assetId": 1, "name": "b"}]
        }));
        assert!(matches!(result, Err(Error::DuplicateAssetId(1))));
    }

    #[test]
    fn test_frames_are_sorted() {
        let catalog = catalog(json!({
            "Timelines": [{"assetId": 1, "name": "clip", "type": "movieclip", "totalFrames": 9,
                "frames": [{"frame": 8}, {"frame": 2}, {"frame": 5}]}]
        }))
        .unwrap();
        let frames: Vec<u32> = catalog.timelines()[0].frames.iter().map(|f| f.frame).collect();
        assert_eq!(frames, vec![2, 5, 8]);
    }
}
