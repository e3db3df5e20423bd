//! Animex Core Library
//!
//! This library provides the data structures shared by every stage of the
//! animex pipeline: the raw timeline export document, the typed asset
//! catalog, the display command union, per-frame animation state and the
//! tween index.

pub mod asset;
pub mod catalog;
pub mod command;
pub mod document;
pub mod frame;
pub mod transform;
pub mod tween;

pub use asset::{Asset, AssetKind, TimelineAsset, TimelineKind};
pub use catalog::AssetCatalog;
pub use command::{Command, CommandKind};
pub use document::{ExportDocument, ExportMeta};
pub use frame::{FrameState, FrameTween, Property};
pub use transform::{ColorTransform, Tint, Transform};
pub use tween::{TimelineTweens, Tween, TweenId, TweenIndex};

/// Result type for animex-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for animex-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed export: {0}")]
    MalformedExport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Asset not found: {0}")]
    AssetNotFound(u32),

    #[error("Duplicate asset ID: {0}")]
    DuplicateAssetId(u32),

    #[error("Invalid frame encoding: {0}")]
    InvalidFrameEncoding(String),
}

impl Error {
    /// Returns true for errors caused by an inconsistent export document
    pub fn is_malformed_export(&self) -> bool {
        matches!(
            self,
            Error::MalformedExport(_)
                | Error::Json(_)
                | Error::AssetNotFound(_)
                | Error::DuplicateAssetId(_)
        )
    }
}
