//! Animex Builder Library
//!
//! This library rebuilds dense, per-instance animation from the sparse
//! command stream of a timeline export, splicing recorded tweens in place of
//! the commands they produced.

pub mod instance;
pub mod reconstruct;

pub use instance::{Instance, MaskSpan};
pub use reconstruct::{AnimatedTimeline, FrameScript, TimelineBuilder};

use animex_core::{AssetCatalog, ExportDocument, ExportMeta, TweenIndex};
use log::debug;

/// Result type for animex-builder operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for animex-builder operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Animex core error: {0}")]
    Core(#[from] animex_core::Error),

    #[error("Malformed export: {0}")]
    MalformedExport(String),

    #[error("Instance {instance} not found in timeline '{timeline}'")]
    InstanceNotFound { timeline: String, instance: u32 },

    #[error("Tweens recorded for unknown timeline '{0}'")]
    UnknownTimeline(String),
}

impl Error {
    /// Returns true for errors caused by an inconsistent export document
    pub fn is_malformed_export(&self) -> bool {
        match self {
            Error::Core(err) => err.is_malformed_export(),
            Error::MalformedExport(_)
            | Error::InstanceNotFound { .. }
            | Error::UnknownTimeline(_) => true,
        }
    }
}

/// Reconstruction configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Match recorded tweens; when off every command is replayed literally
    pub tweens: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { tweens: true }
    }
}

/// Every timeline of an export, reconstructed
#[derive(Debug, Clone)]
pub struct AnimatedDocument {
    pub catalog: AssetCatalog,
    /// Timelines in declaration order
    pub timelines: Vec<AnimatedTimeline>,
}

impl AnimatedDocument {
    /// Build settings of the export
    pub fn meta(&self) -> &ExportMeta {
        &self.catalog.meta
    }

    /// Gets a reconstructed timeline by asset id
    pub fn timeline(&self, asset_id: u32) -> Option<&AnimatedTimeline> {
        self.timelines.iter().find(|t| t.asset_id == asset_id)
    }

    /// The reconstructed main stage
    pub fn stage(&self) -> Option<&AnimatedTimeline> {
        let stage = self.catalog.stage()?;
        self.timeline(stage.asset_id)
    }
}

/// Converts a whole export document into its animated model
pub struct DocumentBuilder {
    config: BuildConfig,
}

impl DocumentBuilder {
    /// Creates a new document builder with the given configuration
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Builds the catalog, indexes the tweens and reconstructs every timeline.
    ///
    /// Any unresolvable reference aborts the whole document.
    pub fn build(&self, doc: &ExportDocument) -> Result<AnimatedDocument> {
        let catalog = AssetCatalog::new(doc)?;
        let mut tweens = if self.config.tweens {
            TweenIndex::new(&doc.tweens)
        } else {
            TweenIndex::default()
        };

        for name in tweens.timeline_names() {
            if !catalog.timelines().iter().any(|t| t.source_name == name) {
                return Err(Error::UnknownTimeline(name.to_string()));
            }
        }

        let mut timelines = Vec::with_capacity(catalog.timelines().len());
        for timeline in catalog.timelines() {
            let group = tweens.timeline_mut(&timeline.source_name);
            timelines.push(TimelineBuilder::new(&catalog, timeline, group).build()?);
        }

        debug!(
            "Built {} timelines, {} of {} tweens matched",
            timelines.len(),
            tweens_matched(&tweens),
            tweens.len()
        );

        Ok(AnimatedDocument {
            catalog,
            timelines,
        })
    }
}

fn tweens_matched(tweens: &TweenIndex) -> usize {
    tweens
        .timeline_names()
        .filter_map(|name| tweens.timeline(name))
        .map(|group| group.consumed_count())
        .sum()
}

/// Builds an export document with the given configuration
pub fn build_document(doc: &ExportDocument, config: BuildConfig) -> Result<AnimatedDocument> {
    DocumentBuilder::new(config).build(doc)
}
