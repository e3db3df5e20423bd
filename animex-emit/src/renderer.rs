//! Script emission for a reconstructed document

use crate::draw_order::{draw_order, DrawItem};
use crate::stringify::{quote, stringify_simple};
use crate::templates::{TemplateCache, TemplateSource};
use crate::{Error, Result};
use animex_builder::{AnimatedDocument, AnimatedTimeline, Instance};
use animex_core::{Asset, ExportMeta, TimelineKind};
use log::debug;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const INDENT: &str = "    ";

/// Output settings for one conversion
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Short helper names and compact keyframes
    pub compress: bool,
    /// Append a CommonJS module wrapper
    pub common_js: bool,
    /// Namespace the library classes are published under
    pub name_space: String,
    pub stage_name: String,
    /// Loop the main stage
    pub loop_timeline: bool,
    /// Major version of the templates to use
    pub template_version: u32,
}

impl RenderConfig {
    /// Derives the output settings recorded in the export
    pub fn from_meta(meta: &ExportMeta) -> Self {
        Self {
            compress: meta.compress_js,
            common_js: meta.is_common_js(),
            name_space: meta.name_space.clone(),
            stage_name: meta.stage_name.clone(),
            loop_timeline: meta.loop_timeline,
            template_version: meta.template_version(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::from_meta(&ExportMeta::default())
    }
}

/// Helper method names in verbose and compressed form
#[derive(Debug, Clone, Copy)]
enum Helper {
    AddChild,
    AddTimedChild,
    AddAction,
    SetMask,
    DrawCommands,
    PlaySound,
}

impl Helper {
    fn name(self, compress: bool) -> &'static str {
        match (self, compress) {
            (Helper::AddChild, false) => "addChild",
            (Helper::AddChild, true) => "ac",
            (Helper::AddTimedChild, false) => "addTimedChild",
            (Helper::AddTimedChild, true) => "at",
            (Helper::AddAction, false) => "addAction",
            (Helper::AddAction, true) => "aa",
            (Helper::SetMask, false) => "setMask",
            (Helper::SetMask, true) => "ma",
            (Helper::DrawCommands, false) => "drawCommands",
            (Helper::DrawCommands, true) => "d",
            (Helper::PlaySound, false) => "playSound",
            (Helper::PlaySound, true) => "ps",
        }
    }
}

/// Renders a reconstructed document through a template source
pub struct Renderer<'a> {
    doc: &'a AnimatedDocument,
    config: RenderConfig,
    templates: TemplateCache<'a>,
}

impl<'a> Renderer<'a> {
    /// Creates a renderer; templates are loaded lazily and at most once
    pub fn new(
        doc: &'a AnimatedDocument,
        source: &'a dyn TemplateSource,
        config: RenderConfig,
    ) -> Self {
        let templates = TemplateCache::new(source, config.template_version, config.compress);
        Self {
            doc,
            config,
            templates,
        }
    }

    /// Renders the header, every timeline, the footer and the optional
    /// module wrapper into one buffer
    pub fn render(&mut self) -> Result<String> {
        let declarations = self.declarations();
        let mut buffer = self
            .templates
            .render("header", &[("declarations", json!(declarations))])?;

        let doc = self.doc;
        let (stage, library): (Vec<_>, Vec<_>) = doc
            .timelines
            .iter()
            .partition(|t| t.kind == TimelineKind::Stage);
        for timeline in library.into_iter().chain(stage) {
            buffer.push_str(&self.render_timeline(timeline)?);
        }

        let meta = doc.meta();
        let mut assets = Map::new();
        for bitmap in doc.catalog.bitmaps() {
            assets.insert(bitmap.name.clone(), json!(bitmap.src));
        }
        buffer.push_str(&self.templates.render(
            "footer",
            &[
                ("nameSpace", json!(self.config.name_space)),
                ("stageName", json!(self.config.stage_name)),
                ("width", json!(meta.width)),
                ("height", json!(meta.height)),
                ("framerate", json!(meta.framerate)),
                ("background", json!(format!("0x{}", meta.background))),
                ("assets", Value::Object(assets)),
            ],
        )?);

        if self.config.common_js {
            buffer.push_str(
                &self
                    .templates
                    .render("commonjs", &[("nameSpace", json!(self.config.name_space))])?,
            );
        }

        debug!(
            "Rendered {} timelines with {} templates",
            doc.timelines.len(),
            self.templates.len()
        );
        Ok(buffer)
    }

    /// Runtime classes the generated code refers to
    fn declarations(&self) -> String {
        let catalog = &self.doc.catalog;
        let mut lines = Vec::new();
        if catalog.has_container() {
            lines.push("var Container = PIXI.Container;".to_string());
        }
        if catalog
            .timelines()
            .iter()
            .any(|t| t.kind != TimelineKind::Container)
        {
            lines.push("var MovieClip = PIXI.animate.MovieClip;".to_string());
        }
        if !catalog.bitmaps().is_empty() {
            lines.push("var Sprite = PIXI.Sprite;".to_string());
            lines.push("var fromFrame = PIXI.Texture.fromFrame;".to_string());
        }
        if !catalog.texts().is_empty() {
            lines.push("var Text = PIXI.Text;".to_string());
        }
        if !catalog.shapes().is_empty() {
            lines.push("var Graphics = PIXI.Graphics;".to_string());
        }
        lines.join("\n")
    }

    /// Renders one timeline class
    pub fn render_timeline(&mut self, timeline: &AnimatedTimeline) -> Result<String> {
        let contents = self.contents(timeline)?;
        let template = match timeline.kind {
            TimelineKind::Container => "container",
            TimelineKind::Stage => "stage",
            TimelineKind::MovieClip | TimelineKind::Graphic => "timeline",
        };
        // the stage class is published under the reserved stage name
        let (id, loop_timeline) = match timeline.kind {
            TimelineKind::Stage => (&self.config.stage_name, self.config.loop_timeline),
            _ => (&timeline.name, true),
        };
        let values = [
            ("id", json!(id)),
            ("nameSpace", json!(self.config.name_space)),
            ("contents", json!(contents)),
            ("duration", json!(timeline.total_frames)),
            ("framerate", json!(self.doc.meta().framerate)),
            ("loop", json!(loop_timeline)),
        ];
        self.templates.render(template, &values)
    }

    /// Instance declarations, add calls, sounds and frame scripts
    fn contents(&self, timeline: &AnimatedTimeline) -> Result<String> {
        let compress = self.config.compress;
        let items: Vec<DrawItem> = timeline
            .children()
            .map(|i| DrawItem {
                id: i.id,
                start_frame: i.start_frame,
                place_after: i.place_after,
            })
            .collect();
        let order = draw_order(&items)?;

        let mut emitted: Vec<&Instance> = Vec::new();
        for span in &timeline.masks {
            if !emitted.iter().any(|i| i.id == span.mask) {
                emitted.push(timeline.require(span.mask)?);
            }
        }
        for id in order {
            let instance = timeline.require(id)?;
            if instance.is_mask || !instance.renderable() {
                continue;
            }
            emitted.push(instance);
        }

        let mut lines = Vec::new();
        for instance in &emitted {
            lines.push(self.declaration(timeline, instance)?);
        }

        let statics: Vec<String> = emitted
            .iter()
            .filter(|i| timeline.is_static() || (!i.is_animated() && i.start_frame == 0))
            .map(|i| format!("instance{}", i.id))
            .collect();
        if !statics.is_empty() {
            lines.push(format!(
                "this.{}({});",
                Helper::AddChild.name(compress),
                statics.join(", ")
            ));
        }

        if !timeline.is_static() {
            for instance in emitted
                .iter()
                .filter(|i| i.is_animated() || i.start_frame > 0)
            {
                lines.push(self.timed_child(timeline, instance));
            }

            for sound in timeline.sounds() {
                let name = self.asset(sound.asset_id)?.name();
                lines.push(format!(
                    "this.{}(function() {{ this.{}({}); }}, {});",
                    Helper::AddAction.name(compress),
                    Helper::PlaySound.name(compress),
                    quote(name),
                    sound.start_frame
                ));
            }
        }

        for script in &timeline.scripts {
            if timeline.is_static() {
                lines.push(script.script.clone());
            } else {
                lines.push(format!(
                    "this.{}(function() {{\n{}\n}}.bind(this), {});",
                    Helper::AddAction.name(compress),
                    script.script,
                    script.frame
                ));
            }
        }

        Ok(lines
            .iter()
            .map(|line| format!("{}{}", INDENT, line))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn asset(&self, asset_id: u32) -> Result<Asset<'a>> {
        self.doc
            .catalog
            .get(asset_id)
            .ok_or_else(|| Error::MalformedExport(format!("unknown asset {}", asset_id)))
    }

    /// `var instanceN = <constructor><initial state><mask>;`
    fn declaration(&self, timeline: &AnimatedTimeline, instance: &Instance) -> Result<String> {
        let compress = self.config.compress;
        let asset = self.asset(instance.asset_id)?;
        let constructor = match asset {
            Asset::Bitmap(bitmap) => format!("new Sprite(fromFrame({}))", quote(&bitmap.name)),
            Asset::Shape(shape) => format!(
                "new Graphics().{}(shapes[{}])",
                Helper::DrawCommands.name(compress),
                shape.index
            ),
            Asset::Text(text) => format!("new Text({})", quote(&text.text)),
            Asset::Timeline(clip) if clip.kind == TimelineKind::Graphic => format!(
                "new {}.{}({{ mode: MovieClip.SYNCHED, startPosition: 0, loop: true }})",
                self.config.name_space, clip.name
            ),
            Asset::Timeline(clip) => format!("new {}.{}()", self.config.name_space, clip.name),
            Asset::Sound(sound) => {
                return Err(Error::MalformedExport(format!(
                    "sound '{}' cannot be displayed",
                    sound.name
                )))
            }
        };

        let mut line = format!(
            "var instance{} = {}{}",
            instance.id,
            constructor,
            instance.initial_state().render(compress)
        );
        if let Some(span) = timeline.masks_of(instance.id).next() {
            line.push_str(&format!(
                ".{}(instance{})",
                Helper::SetMask.name(compress),
                span.mask
            ));
        }
        line.push(';');
        Ok(line)
    }

    /// `this.addTimedChild(instanceN, start, duration, keyframes);`
    fn timed_child(&self, timeline: &AnimatedTimeline, instance: &Instance) -> String {
        let compress = self.config.compress;
        let used = instance.used_properties();
        let mut keyframes: BTreeMap<u32, Value> = BTreeMap::new();
        for (index, (frame, key)) in instance.keyframes().enumerate() {
            let mut key = key.clone();
            if index == 0 {
                key.clean(&used);
            }
            if !key.has_values() {
                continue;
            }
            let value = if compress {
                json!(key.serialize())
            } else {
                key.to_json()
            };
            keyframes.insert(frame, value);
        }

        let duration = timeline
            .total_frames
            .saturating_sub(instance.start_frame)
            .max(1);
        let mut line = format!(
            "this.{}(instance{}, {}, {}",
            Helper::AddTimedChild.name(compress),
            instance.id,
            instance.start_frame,
            duration
        );
        if !keyframes.is_empty() {
            // frame keys in numeric order
            let entries: Vec<String> = keyframes
                .iter()
                .map(|(frame, value)| format!("{}:{}", frame, stringify_simple(value)))
                .collect();
            line.push_str(&format!(", {{{}}}", entries.join(",")));
        }
        line.push_str(");");
        line
    }
}

/// Renders a whole document with the given templates and settings
pub fn render_document(
    doc: &AnimatedDocument,
    source: &dyn TemplateSource,
    config: RenderConfig,
) -> Result<String> {
    Renderer::new(doc, source, config).render()
}
