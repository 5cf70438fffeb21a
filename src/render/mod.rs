//! Document rendering.
//!
//! The layout is computed first; this module only serializes it.

pub mod html;

pub use html::render_document;
