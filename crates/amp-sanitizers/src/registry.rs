//! Stage identifiers and registrations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stages::{
    AudioSanitizer, BlockSanitizer, FacebookSanitizer, GallerySanitizer, IframeSanitizer,
    ImageSanitizer, ScriptSanitizer, StyleSanitizer, TagAndAttributeSanitizer, VideoSanitizer,
};
use crate::{Args, SanitizeContext, Sanitizer};

/// Built-in sanitizer stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageId {
    /// `img` to `amp-img`.
    Image,
    /// `video` to `amp-video`.
    Video,
    /// `audio` to `amp-audio`.
    Audio,
    /// `iframe` to `amp-iframe`.
    Iframe,
    /// Facebook embed containers to `amp-facebook*`.
    Facebook,
    /// Gallery blocks to `amp-carousel`. Must run after `image`.
    Gallery,
    /// Aspect ratios of embed blocks. Must run after the media stages.
    Block,
    /// Removes author scripts.
    Script,
    /// Moves inline CSS into a stylesheet.
    Style,
    /// Allow-list enforcement. Must run last.
    TagAndAttribute,
}

impl StageId {
    /// Every built-in stage, in the default order.
    pub const ALL: [StageId; 10] = [
        Self::Image,
        Self::Video,
        Self::Audio,
        Self::Iframe,
        Self::Facebook,
        Self::Gallery,
        Self::Block,
        Self::Script,
        Self::Style,
        Self::TagAndAttribute,
    ];

    /// Parse a stage identifier.
    ///
    /// Accepts the snake-case name (`tag_and_attribute`) and the dashed form
    /// (`tag-and-attribute`).
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|stage| stage.as_str() == id)
    }

    /// Canonical identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Iframe => "iframe",
            Self::Facebook => "facebook",
            Self::Gallery => "gallery",
            Self::Block => "block",
            Self::Script => "script",
            Self::Style => "style",
            Self::TagAndAttribute => "tag_and_attribute",
        }
    }

    /// Instantiate the stage.
    #[must_use]
    pub fn build(self, ctx: &SanitizeContext) -> Box<dyn Sanitizer> {
        match self {
            Self::Image => Box::new(ImageSanitizer::new(ctx)),
            Self::Video => Box::new(VideoSanitizer::new(ctx)),
            Self::Audio => Box::new(AudioSanitizer::new()),
            Self::Iframe => Box::new(IframeSanitizer::new()),
            Self::Facebook => Box::new(FacebookSanitizer::new()),
            Self::Gallery => Box::new(GallerySanitizer::new()),
            Self::Block => Box::new(BlockSanitizer::new()),
            Self::Script => Box::new(ScriptSanitizer::new()),
            Self::Style => Box::new(StyleSanitizer::new()),
            Self::TagAndAttribute => Box::new(TagAndAttributeSanitizer::new()),
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown stage identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sanitizer stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for StageId {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownStage(s.to_owned()))
    }
}

/// One configured stage: an identifier plus its arguments.
///
/// The identifier is kept as written so that configurations naming stages
/// this build does not know about still load; the pipeline skips them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageRegistration {
    /// Stage identifier (e.g., "image").
    pub stage: String,
    /// Stage arguments.
    #[serde(default)]
    pub args: Args,
}

impl StageRegistration {
    /// Create a registration.
    pub fn new(stage: impl Into<String>, args: Args) -> Self {
        Self {
            stage: stage.into(),
            args,
        }
    }

    /// The built-in stage this registration names, if any.
    #[must_use]
    pub fn stage_id(&self) -> Option<StageId> {
        StageId::parse(&self.stage)
    }
}

/// The default sanitizer registry. Order is load-bearing.
#[must_use]
pub fn default_sanitizers() -> Vec<StageRegistration> {
    vec![
        StageRegistration::new("image", Args::new().with("align_wide_support", false)),
        StageRegistration::new("video", Args::new()),
        StageRegistration::new("audio", Args::new()),
        StageRegistration::new("iframe", Args::new().with("add_placeholder", true)),
        StageRegistration::new(
            "facebook",
            Args::new().with("width", 600).with("height", 380),
        ),
        StageRegistration::new("gallery", Args::new().with("carousel_required", false)),
        StageRegistration::new("block", Args::new()),
        StageRegistration::new("script", Args::new()),
        StageRegistration::new(
            "style",
            Args::new().with("include_manifest_comment", "when_excessive"),
        ),
        StageRegistration::new("tag_and_attribute", Args::new()),
    ]
}
