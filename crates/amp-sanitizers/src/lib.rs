//! HTML to AMP sanitizer stages for Amped.
//!
//! A [`Pipeline`] runs an ordered list of [`Sanitizer`] stages over one
//! [`Document`](amp_dom::Document). Each stage owns one concern (images,
//! video, Facebook embeds, inline styles, the allow-list, ...) and rewrites
//! matching elements in place.
//!
//! Stages are configured by [`StageRegistration`]s: a stage identifier plus
//! its [`Args`]. The identifier is resolved through [`StageId`]; unknown
//! identifiers are skipped when the pipeline is built.
//!
//! # Example
//!
//! ```
//! use amp_dom::Document;
//! use amp_sanitizers::{Args, Pipeline, SanitizeContext, default_sanitizers};
//!
//! let mut pipeline =
//!     Pipeline::from_registrations(&default_sanitizers(), &Args::new(), &SanitizeContext::new());
//!
//! let mut doc = Document::parse(r#"<p onclick="x()">Hi<script>track()</script></p>"#);
//! let report = pipeline.run(&mut doc);
//!
//! assert_eq!(doc.to_html(), "<p>Hi</p>");
//! assert_eq!(report.converted("script"), Some(1));
//! ```

mod args;
mod context;
mod error;
mod pipeline;
mod registry;
mod sanitizer;
mod stages;

pub use args::Args;
pub use context::SanitizeContext;
pub use error::SanitizeError;
pub use pipeline::{Pipeline, PipelineReport, StageOutcome, StageReport};
pub use registry::{StageId, StageRegistration, UnknownStage, default_sanitizers};
pub use sanitizer::Sanitizer;
pub use stages::{
    AudioSanitizer, BlockSanitizer, FacebookSanitizer, GallerySanitizer, IframeSanitizer,
    ImageSanitizer, ScriptSanitizer, StyleSanitizer, TagAndAttributeSanitizer, VideoSanitizer,
};
