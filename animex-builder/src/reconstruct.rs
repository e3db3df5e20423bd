//! Timeline reconstruction
//!
//! Walks the sparse command stream of one timeline in frame order and
//! rebuilds one [`Instance`] per instance id. Commands that are driven by a
//! tween are folded into the tween instead of being replayed frame by frame.
//!
//! Tween matching reads transforms only from the keyframes already
//! committed on an instance plus a bounded forward scan over the exported
//! frames, never from half-applied state.

use crate::instance::{Instance, MaskSpan};
use crate::{Error, Result};
use animex_core::document::RawFrame;
use animex_core::{
    AssetCatalog, AssetKind, Command, CommandKind, FrameState, TimelineAsset, TimelineKind,
    TimelineTweens, Transform, TweenId,
};
use log::{debug, trace};
use std::collections::BTreeMap;

/// Script attached to a timeline frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameScript {
    pub frame: u32,
    pub script: String,
}

/// Reconstructed model of one timeline
#[derive(Debug, Clone)]
pub struct AnimatedTimeline {
    pub asset_id: u32,
    pub name: String,
    pub kind: TimelineKind,
    pub total_frames: u32,
    /// Every instance, sounds included, keyed by instance id
    pub instances: BTreeMap<u32, Instance>,
    /// Displayable instances in first-appearance order
    pub children: Vec<u32>,
    pub masks: Vec<MaskSpan>,
    pub scripts: Vec<FrameScript>,
}

impl AnimatedTimeline {
    /// Gets an instance by id
    pub fn instance(&self, id: u32) -> Option<&Instance> {
        self.instances.get(&id)
    }

    /// Gets an instance by id, failing if it does not exist
    pub fn require(&self, id: u32) -> Result<&Instance> {
        self.instances.get(&id).ok_or_else(|| Error::InstanceNotFound {
            timeline: self.name.clone(),
            instance: id,
        })
    }

    /// Displayable instances in first-appearance order
    pub fn children(&self) -> impl Iterator<Item = &Instance> {
        self.children.iter().filter_map(|id| self.instances.get(id))
    }

    /// Sound instances in start order
    pub fn sounds(&self) -> Vec<&Instance> {
        let mut sounds: Vec<&Instance> = self
            .instances
            .values()
            .filter(|i| i.kind == AssetKind::Sound)
            .collect();
        sounds.sort_by_key(|i| i.start_frame);
        sounds
    }

    /// Mask spans that clip `instance`
    pub fn masks_of(&self, instance: u32) -> impl Iterator<Item = &MaskSpan> {
        self.masks.iter().filter(move |m| m.instance == instance)
    }

    /// True if the timeline only ever shows its first frame
    pub fn is_static(&self) -> bool {
        self.kind == TimelineKind::Container
    }
}

/// Per-instance state that only matters during the pass
#[derive(Debug, Clone, Copy)]
struct Track {
    last_frame: u32,
    /// Start frame of the tween currently driving the instance
    active: Option<u32>,
}

/// Rebuilds one timeline from its export frames
pub struct TimelineBuilder<'a> {
    catalog: &'a AssetCatalog,
    timeline: &'a TimelineAsset,
    tweens: Option<&'a mut TimelineTweens>,
    instances: BTreeMap<u32, Instance>,
    tracks: BTreeMap<u32, Track>,
    children: Vec<u32>,
    masks: Vec<MaskSpan>,
}

impl<'a> TimelineBuilder<'a> {
    /// Creates a builder; `tweens` is the group recorded for this timeline
    pub fn new(
        catalog: &'a AssetCatalog,
        timeline: &'a TimelineAsset,
        tweens: Option<&'a mut TimelineTweens>,
    ) -> Self {
        Self {
            catalog,
            timeline,
            tweens,
            instances: BTreeMap::new(),
            tracks: BTreeMap::new(),
            children: Vec::new(),
            masks: Vec::new(),
        }
    }

    /// Runs the single ordered pass and returns the reconstructed timeline
    pub fn build(mut self) -> Result<AnimatedTimeline> {
        let timeline = self.timeline;
        for frame in &timeline.frames {
            for command in &frame.commands {
                self.process(frame.frame, command)?;
            }
        }

        for span in &self.masks {
            for id in [span.mask, span.instance] {
                if !self.instances.contains_key(&id) {
                    return Err(Error::InstanceNotFound {
                        timeline: timeline.name.clone(),
                        instance: id,
                    });
                }
            }
        }

        for instance in self.instances.values_mut() {
            instance.finalize();
        }

        let scripts = timeline
            .frames
            .iter()
            .flat_map(|f| {
                f.scripts.iter().map(move |script| FrameScript {
                    frame: f.frame,
                    script: script.clone(),
                })
            })
            .collect();

        let tweened = self
            .instances
            .values()
            .map(|i| i.tweens().count())
            .sum::<usize>();
        debug!(
            "Timeline '{}': {} instances, {} tweens attached, {} mask spans",
            timeline.name,
            self.instances.len(),
            tweened,
            self.masks.len()
        );

        Ok(AnimatedTimeline {
            asset_id: timeline.asset_id,
            name: timeline.name.clone(),
            kind: timeline.kind,
            total_frames: timeline.total_frames,
            instances: self.instances,
            children: self.children,
            masks: self.masks,
            scripts,
        })
    }

    fn process(&mut self, frame: u32, command: &Command) -> Result<()> {
        let id = command.instance_id;
        self.materialize(frame, command)?;

        let mut track = self.tracks.get(&id).copied().unwrap_or(Track {
            last_frame: frame,
            active: None,
        });

        // A tween that ended before this frame no longer owns the motion
        if let Some(start) = track.active {
            if self.tween_end(id, start).map_or(true, |end| end < frame) {
                track.active = None;
            }
        }

        if track.active.is_none() && track.last_frame + 1 < frame {
            let transform = self.instance(id)?.transform_at(track.last_frame);
            for skipped in track.last_frame + 1..frame {
                if self.try_attach(id, skipped, &transform) {
                    track.active = Some(skipped);
                    break;
                }
            }
        }
        track.last_frame = frame;

        match (&command.kind, track.active) {
            (CommandKind::Place { .. } | CommandKind::Move { .. }, Some(start)) => {
                if self.tween_end(id, start) == Some(frame) {
                    track.active = None;
                } else {
                    trace!("Instance {} frame {}: motion owned by tween", id, frame);
                }
            }
            (CommandKind::ColorTransform { .. }, active) => {
                self.apply_color(id, frame, command, active)?
            }
            (CommandKind::MaskBegin { mask_till }, _) => {
                self.instance_mut(id)?.is_mask = true;
                self.masks.push(MaskSpan {
                    mask: id,
                    instance: *mask_till,
                    start_frame: frame,
                    duration: None,
                });
            }
            (CommandKind::MaskEnd, _) => {
                for span in self.masks.iter_mut() {
                    if span.mask == id && span.duration.is_none() {
                        span.duration = Some(frame.saturating_sub(span.start_frame));
                    }
                }
            }
            _ => self.instance_mut(id)?.add_to_frame(frame, command),
        }

        // any command on a tween's start frame can open it, not only motion
        if track.active.is_none() {
            let transform = self.instance(id)?.transform_at(frame);
            if self.try_attach(id, frame, &transform) {
                track.active = Some(frame);
            }
        }

        self.tracks.insert(id, track);
        Ok(())
    }

    /// Creates the instance on first sight and records its draw links
    fn materialize(&mut self, frame: u32, command: &Command) -> Result<()> {
        let id = command.instance_id;
        if !self.instances.contains_key(&id) {
            let asset_id = command.asset_id.ok_or_else(|| {
                Error::MalformedExport(format!(
                    "timeline '{}' frame {}: instance {} appears without an asset id",
                    self.timeline.name, frame, id
                ))
            })?;
            let asset = self.catalog.require(asset_id)?;
            let instance = Instance::new(id, asset, frame);
            if instance.kind != AssetKind::Sound {
                self.children.push(id);
            }
            self.instances.insert(id, instance);
        }

        if let CommandKind::Place { place_after, .. } = command.kind {
            let instance = self.instance_mut(id)?;
            if instance.place_after.is_none() && place_after != 0 {
                instance.place_after = Some(place_after);
            }
        }
        Ok(())
    }

    /// Routes a color command to the instance or to the tween it belongs to
    fn apply_color(
        &mut self,
        id: u32,
        frame: u32,
        command: &Command,
        active: Option<u32>,
    ) -> Result<()> {
        let tween_start = match active {
            Some(start) => Some(start),
            None => self
                .instance(id)?
                .tween_ending_on(frame)
                .map(|t| t.start_frame),
        };
        let Some(start) = tween_start else {
            self.instance_mut(id)?.add_to_frame(frame, command);
            return Ok(());
        };

        if frame == start {
            self.instance_mut(id)?.add_to_frame(frame, command);
        } else if self.tween_end(id, start) == Some(frame) {
            // the start keyframe stays as committed; only the tween learns the colors
            let start_state = self.instance(id)?.state_at(start);
            let mut end_state = FrameState::default();
            command.apply(&mut end_state);
            if let Some(tween) = self.instance_mut(id)?.tween_mut(start) {
                tween.add_colors(&start_state, &end_state);
            }
        } else {
            trace!("Instance {} frame {}: color inside tween dropped", id, frame);
        }
        Ok(())
    }

    /// Looks for an unused tween starting on `start` whose endpoints match
    /// this instance and attaches the first one found
    fn try_attach(&mut self, id: u32, start: u32, transform: &Transform) -> bool {
        let Some(tweens) = self.tweens.as_deref_mut() else {
            return false;
        };

        let mut matched: Option<TweenId> = None;
        for candidate in tweens.candidates(start) {
            let Some(tween) = tweens.get(candidate) else {
                continue;
            };
            if !tween.matches_start(transform) {
                continue;
            }
            if find_tween_end(&self.timeline.frames, id, tween.start_frame, tween.end_frame, |t| {
                tween.matches_end(t)
            }) {
                matched = Some(candidate);
                break;
            }
            trace!(
                "Instance {}: tween {}..{} starts here but its end never matches, replaying commands",
                id,
                tween.start_frame,
                tween.end_frame
            );
        }

        let Some(matched) = matched else {
            return false;
        };
        tweens.consume(matched);
        let Some(tween) = tweens.get(matched).cloned() else {
            return false;
        };
        trace!(
            "Instance {}: attached tween {}..{}",
            id,
            tween.start_frame,
            tween.end_frame
        );
        match self.instances.get_mut(&id) {
            Some(instance) => {
                instance.start_tween(tween);
                true
            }
            None => false,
        }
    }

    fn tween_end(&self, id: u32, start: u32) -> Option<u32> {
        self.instances
            .get(&id)
            .and_then(|i| i.tween(start))
            .map(|t| t.end_frame)
    }

    fn instance(&self, id: u32) -> Result<&Instance> {
        self.instances.get(&id).ok_or_else(|| Error::InstanceNotFound {
            timeline: self.timeline.name.clone(),
            instance: id,
        })
    }

    fn instance_mut(&mut self, id: u32) -> Result<&mut Instance> {
        let timeline = &self.timeline.name;
        self.instances
            .get_mut(&id)
            .ok_or_else(|| Error::InstanceNotFound {
                timeline: timeline.clone(),
                instance: id,
            })
    }
}

/// True if a Move for `instance` on a frame in `(start, end]` lands on the
/// tween's end transform
fn find_tween_end(
    frames: &[RawFrame],
    instance: u32,
    start: u32,
    end: u32,
    matches_end: impl Fn(&Transform) -> bool,
) -> bool {
    frames
        .iter()
        .filter(|f| f.frame > start && f.frame <= end)
        .flat_map(|f| f.commands.iter())
        .filter(|c| c.instance_id == instance)
        .filter_map(Command::move_transform)
        .any(matches_end)
}
