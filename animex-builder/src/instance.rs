//! Reconstructed display instances

use animex_core::{
    Asset, AssetKind, Command, FrameState, Property, TimelineKind, Transform, Tween,
};
use std::collections::BTreeMap;

/// Frame interval during which one instance clips another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskSpan {
    /// Instance used as the mask
    pub mask: u32,
    /// Instance being clipped
    pub instance: u32,
    /// Frame the mask starts on
    pub start_frame: u32,
    /// Number of frames masked; `None` while the span is still open
    pub duration: Option<u32>,
}

impl MaskSpan {
    /// True if the span covers `frame`
    pub fn covers(&self, frame: u32) -> bool {
        frame >= self.start_frame
            && self
                .duration
                .map_or(true, |duration| frame < self.start_frame + duration)
    }
}

/// One placed occurrence of an asset inside a parent timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    /// Identifier, unique within the parent timeline
    pub id: u32,
    /// Library asset the instance displays
    pub asset_id: u32,
    pub kind: AssetKind,
    /// Variant of the placed timeline, for timeline instances
    pub timeline_kind: Option<TimelineKind>,
    /// First frame the instance appears on
    pub start_frame: u32,
    /// Instance this one renders immediately above
    pub place_after: Option<u32>,
    /// True once the instance has been used as a mask
    pub is_mask: bool,
    keyframes: BTreeMap<u32, FrameState>,
    tweens: BTreeMap<u32, Tween>,
}

impl Instance {
    /// Creates an instance of `asset` first seen on `start_frame`
    pub fn new(id: u32, asset: Asset<'_>, start_frame: u32) -> Self {
        Self {
            id,
            asset_id: asset.asset_id(),
            kind: asset.kind(),
            timeline_kind: asset.timeline_kind(),
            start_frame,
            place_after: None,
            is_mask: false,
            keyframes: BTreeMap::new(),
            tweens: BTreeMap::new(),
        }
    }

    /// Writes the values set by `command` onto the keyframe at `frame`
    pub fn add_to_frame(&mut self, frame: u32, command: &Command) {
        command.apply(self.keyframes.entry(frame).or_default());
    }

    /// Attaches a matched tween; it owns the motion over its frame range
    pub fn start_tween(&mut self, tween: Tween) {
        self.tweens.insert(tween.start_frame, tween);
    }

    /// Tween starting on `start_frame`
    pub fn tween(&self, start_frame: u32) -> Option<&Tween> {
        self.tweens.get(&start_frame)
    }

    /// Tween starting on `start_frame`, mutably
    pub fn tween_mut(&mut self, start_frame: u32) -> Option<&mut Tween> {
        self.tweens.get_mut(&start_frame)
    }

    /// Tween whose last frame is `frame`
    pub fn tween_ending_on(&self, frame: u32) -> Option<&Tween> {
        self.tweens.values().find(|t| t.end_frame == frame)
    }

    /// Attached tweens in start order
    pub fn tweens(&self) -> impl Iterator<Item = &Tween> {
        self.tweens.values()
    }

    /// Keyframes in frame order
    pub fn keyframes(&self) -> impl Iterator<Item = (u32, &FrameState)> {
        self.keyframes.iter().map(|(frame, state)| (*frame, state))
    }

    /// Last frame carrying a keyframe or ending a tween
    pub fn last_frame(&self) -> u32 {
        let key = self.keyframes.keys().next_back().copied();
        let tween = self.tweens.values().map(|t| t.end_frame).max();
        key.max(tween).unwrap_or(self.start_frame)
    }

    /// Fully resolved state on `frame`, replaying keyframes and tweens
    pub fn state_at(&self, frame: u32) -> FrameState {
        self.resolve(frame, true)
    }

    /// Resolved transform on `frame`
    pub fn transform_at(&self, frame: u32) -> Transform {
        self.state_at(frame).transform()
    }

    /// Dense per-frame sequence from the start frame up to `total_frames`
    pub fn expand(&self, total_frames: u32) -> Vec<FrameState> {
        (self.start_frame..total_frames.max(self.start_frame + 1))
            .map(|frame| self.state_at(frame))
            .collect()
    }

    fn resolve(&self, frame: u32, include_own_key: bool) -> FrameState {
        let mut state = FrameState::default();
        let mut tweens = self
            .tweens
            .values()
            .filter(|t| t.start_frame <= frame)
            .peekable();

        for (key_frame, key) in self.keyframes.range(..=frame) {
            // a tween ending on a keyframe is applied before the keyframe
            while let Some(tween) = tweens.next_if(|t| t.end_frame <= *key_frame) {
                tween.state_at(1.0).apply_onto(&mut state);
            }
            if *key_frame == frame && !include_own_key {
                break;
            }
            key.apply_onto(&mut state);
        }
        while let Some(tween) = tweens.next_if(|t| t.end_frame <= frame) {
            tween.state_at(1.0).apply_onto(&mut state);
        }
        if let Some(tween) = tweens.next() {
            if frame > tween.start_frame {
                let progress = f64::from(frame - tween.start_frame) / f64::from(tween.duration());
                tween.state_at(progress).apply_onto(&mut state);
            }
        }
        state
    }

    /// Reduces every keyframe after the first to the values it changes and
    /// writes the attached tweens onto their start keyframes
    pub fn finalize(&mut self) {
        let frames: Vec<u32> = self.keyframes.keys().skip(1).copied().collect();
        let previous: Vec<FrameState> = frames
            .iter()
            .map(|frame| self.resolve(*frame, false))
            .collect();

        for (frame, previous) in frames.iter().zip(previous) {
            if let Some(key) = self.keyframes.get_mut(frame) {
                for property in key.valid_keys() {
                    if key.same_property(&previous, property) {
                        key.unset(property);
                    }
                }
            }
        }

        let first = self.keyframes.keys().next().copied();
        self.keyframes
            .retain(|frame, key| Some(*frame) == first || key.has_values());

        for tween in self.tweens.values() {
            self.keyframes.entry(tween.start_frame).or_default().tween =
                Some(tween.to_frame_tween());
        }
    }

    /// State on the first frame without any tween attached
    pub fn initial_state(&self) -> FrameState {
        let mut state = self.state_at(self.start_frame);
        state.tween = None;
        state
    }

    /// Properties that change at some point after the first frame
    pub fn used_properties(&self) -> Vec<Property> {
        let mut used = Vec::new();
        for (_, key) in self.keyframes.iter().skip(1) {
            used.extend(key.valid_keys());
        }
        for tween in self.tweens.values() {
            used.extend(tween.to_frame_tween().end.valid_keys());
        }
        if used.contains(&Property::Tint) || used.contains(&Property::ColorTransform) {
            used.extend([Property::Tint, Property::ColorTransform]);
        }
        Property::ALL
            .into_iter()
            .filter(|p| used.contains(p))
            .collect()
    }

    /// True if the instance changes after its first frame
    pub fn is_animated(&self) -> bool {
        self.keyframes.len() > 1 || !self.tweens.is_empty()
    }

    /// False if the instance stays hidden over its whole span
    pub fn renderable(&self) -> bool {
        let hidden_at_start = self.initial_state().visible == Some(false);
        !(hidden_at_start && self.keyframes.values().all(|k| k.visible != Some(true)))
    }
}
