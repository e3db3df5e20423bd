//! Tween descriptors grouped per timeline and start frame

use crate::document::{RawTween, RawTweenGroup};
use crate::frame::{FrameState, FrameTween, Property};
use crate::transform::Transform;
use std::collections::{BTreeMap, HashMap};

/// Index of a tween inside its timeline group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TweenId(pub usize);

/// Smooth interpolation of an instance's transform between two frames
#[derive(Debug, Clone, PartialEq)]
pub struct Tween {
    /// First frame of the interpolation
    pub start_frame: u32,
    /// Frame on which the end values are reached
    pub end_frame: u32,
    /// Transform recorded on the start frame
    pub start_transform: Transform,
    /// Transform reached on the end frame
    pub end_transform: Transform,
    /// Alpha endpoints, when the tween animates alpha
    pub start_alpha: Option<f64>,
    pub end_alpha: Option<f64>,
    /// Classic ease strength
    pub ease: Option<f64>,
    /// Color endpoints captured from color transform commands
    pub start_color: Option<FrameState>,
    pub end_color: Option<FrameState>,
    consumed: bool,
}

impl Tween {
    /// Creates a transform-only tween
    pub fn new(
        start_frame: u32,
        end_frame: u32,
        start_transform: Transform,
        end_transform: Transform,
    ) -> Self {
        Self {
            start_frame,
            end_frame,
            start_transform,
            end_transform,
            start_alpha: None,
            end_alpha: None,
            ease: None,
            start_color: None,
            end_color: None,
            consumed: false,
        }
    }

    /// Builds a tween from its export record.
    ///
    /// Without an explicit end transform, the end is the start transform with
    /// every per-property end value applied. Rotation and skew blocks are
    /// recorded in degrees and converted to radians.
    pub fn from_raw(raw: &RawTween) -> Self {
        let end_transform = raw.end_transform.unwrap_or_else(|| {
            let mut end = raw.start_transform;
            let linear = [
                (&raw.x, &mut end.x),
                (&raw.y, &mut end.y),
                (&raw.scale_x, &mut end.scale_x),
                (&raw.scale_y, &mut end.scale_y),
            ];
            for (prop, value) in linear {
                if let Some(prop) = prop {
                    *value = prop.end;
                }
            }
            let angular = [
                (&raw.rotation, &mut end.rotation),
                (&raw.skew_x, &mut end.skew_x),
                (&raw.skew_y, &mut end.skew_y),
            ];
            for (prop, value) in angular {
                if let Some(prop) = prop {
                    *value = prop.end.to_radians();
                }
            }
            end
        });

        let ease = raw
            .properties()
            .find(|p| p.ease_type.as_deref() != Some("custom") && p.ease_strength.is_some())
            .and_then(|p| p.ease_strength);

        Self {
            start_alpha: raw.alpha.as_ref().map(|a| a.start),
            end_alpha: raw.alpha.as_ref().map(|a| a.end),
            ease,
            ..Self::new(raw.start, raw.end, raw.start_transform, end_transform)
        }
    }

    /// Number of frames the tween runs for
    pub fn duration(&self) -> u32 {
        self.end_frame.saturating_sub(self.start_frame)
    }

    /// True if `transform` equals the recorded start transform
    pub fn matches_start(&self, transform: &Transform) -> bool {
        self.start_transform.approx_eq(transform)
    }

    /// True if `transform` equals the recorded end transform
    pub fn matches_end(&self, transform: &Transform) -> bool {
        self.end_transform.approx_eq(transform)
    }

    /// Marks the tween as used; later match attempts skip it
    pub fn consume(&mut self) {
        self.consumed = true;
    }

    /// True once the tween has been matched to an instance
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Records color endpoints; identical endpoints are dropped
    pub fn add_colors(&mut self, start: &FrameState, end: &FrameState) {
        let start = start.color_part();
        let mut end_color = start.clone();
        end.color_part().apply_onto(&mut end_color);
        if start != end_color {
            self.start_color = Some(start);
            self.end_color = Some(end_color);
        }
    }

    /// Transform-related part of the tween as a frame state at `progress`
    /// (0 = start frame, 1 = end frame)
    pub fn state_at(&self, progress: f64) -> FrameState {
        let mut state = FrameState::default();
        if progress >= 1.0 {
            state.set_transform(&self.end_transform);
            state.alpha = self.end_alpha;
            if let Some(color) = &self.end_color {
                color.apply_onto(&mut state);
            }
        } else {
            state.set_transform(&self.start_transform.lerp(&self.end_transform, progress));
            if let (Some(start), Some(end)) = (self.start_alpha, self.end_alpha) {
                state.alpha = Some(start + (end - start) * progress);
            }
        }
        state
    }

    /// Render-facing description: the duration plus every value that differs
    /// between the start and end of the tween
    pub fn to_frame_tween(&self) -> FrameTween {
        let mut start = FrameState::default();
        start.set_transform(&self.start_transform);
        start.alpha = self.start_alpha;
        if let Some(color) = &self.start_color {
            color.apply_onto(&mut start);
        }
        let end_full = self.state_at(1.0);

        let mut end = FrameState::default();
        for property in Property::ALL {
            if end_full.is_set(property) && !end_full.same_property(&start, property) {
                end.copy_property(&end_full, property);
            }
        }

        FrameTween {
            duration: self.duration(),
            end: Box::new(end),
            ease: self.ease,
        }
    }
}

/// Tweens of one parent timeline, grouped by start frame
#[derive(Debug, Clone, Default)]
pub struct TimelineTweens {
    /// Name of the parent timeline in the export
    pub name: String,
    tweens: Vec<Tween>,
    by_start: BTreeMap<u32, Vec<TweenId>>,
}

impl TimelineTweens {
    /// Creates an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a tween; several tweens may share a start frame
    pub fn push(&mut self, tween: Tween) -> TweenId {
        let id = TweenId(self.tweens.len());
        self.by_start.entry(tween.start_frame).or_default().push(id);
        self.tweens.push(tween);
        id
    }

    /// All tweens starting on `frame`, consumed or not
    pub fn starting_on(&self, frame: u32) -> &[TweenId] {
        self.by_start.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Unconsumed tweens starting on `frame`, in declaration order
    pub fn candidates(&self, frame: u32) -> Vec<TweenId> {
        self.starting_on(frame)
            .iter()
            .copied()
            .filter(|id| !self.tweens[id.0].is_consumed())
            .collect()
    }

    /// Gets a tween by id
    pub fn get(&self, id: TweenId) -> Option<&Tween> {
        self.tweens.get(id.0)
    }

    /// Marks a tween as used
    pub fn consume(&mut self, id: TweenId) {
        if let Some(tween) = self.tweens.get_mut(id.0) {
            tween.consume();
        }
    }

    /// Number of tweens in the group
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    /// True if the group holds no tweens
    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Number of tweens matched to an instance
    pub fn consumed_count(&self) -> usize {
        self.tweens.iter().filter(|t| t.is_consumed()).count()
    }

    /// Iterates over the tweens in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Tween> {
        self.tweens.iter()
    }
}

/// Tween groups keyed by parent timeline name
#[derive(Debug, Clone, Default)]
pub struct TweenIndex {
    timelines: HashMap<String, TimelineTweens>,
}

impl TweenIndex {
    /// Groups export tween records by timeline name and start frame.
    /// Records naming the same timeline are merged.
    pub fn new(groups: &[RawTweenGroup]) -> Self {
        let mut timelines: HashMap<String, TimelineTweens> = HashMap::new();
        for group in groups {
            let entry = timelines
                .entry(group.timeline_name.clone())
                .or_insert_with(|| TimelineTweens::new(group.timeline_name.clone()));
            for raw in &group.tweens {
                entry.push(Tween::from_raw(raw));
            }
        }
        Self { timelines }
    }

    /// Gets the group for a timeline
    pub fn timeline(&self, name: &str) -> Option<&TimelineTweens> {
        self.timelines.get(name)
    }

    /// Gets the group for a timeline, mutably
    pub fn timeline_mut(&mut self, name: &str) -> Option<&mut TimelineTweens> {
        self.timelines.get_mut(name)
    }

    /// Names of every timeline that has tweens
    pub fn timeline_names(&self) -> impl Iterator<Item = &str> {
        self.timelines.keys().map(String::as_str)
    }

    /// Total number of tweens
    pub fn len(&self) -> usize {
        self.timelines.values().map(TimelineTweens::len).sum()
    }

    /// True if no timeline has tweens
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
