//! Animex Emit Library
//!
//! This library turns a reconstructed animex document into script text using
//! externally supplied templates.

pub mod draw_order;
pub mod renderer;
pub mod stringify;
pub mod templates;

pub use draw_order::{draw_order, DrawItem};
pub use renderer::{render_document, RenderConfig, Renderer};
pub use stringify::stringify_simple;
pub use templates::{DirTemplates, MemoryTemplates, TemplateCache, TemplateSource};

/// Result type for animex-emit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for animex-emit operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Animex core error: {0}")]
    Core(#[from] animex_core::Error),

    #[error("Animex builder error: {0}")]
    Build(#[from] animex_builder::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template '{name}' version {version} not found")]
    TemplateMissing { name: String, version: u32 },

    #[error("Malformed export: {0}")]
    MalformedExport(String),
}
