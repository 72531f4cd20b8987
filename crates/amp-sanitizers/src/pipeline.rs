//! Pipeline orchestrator.
//!
//! Runs an ordered list of stages over one document. Stage order comes from
//! configuration and is never inferred: later stages rely on artifacts left by
//! earlier ones (`gallery` consumes `amp-img` produced by `image`, and
//! `tag_and_attribute` cleans up whatever the others left behind).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use amp_dom::Document;

use crate::{Args, SanitizeContext, Sanitizer, StageRegistration};

/// Outcome of one stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage finished, converting this many elements.
    Converted(usize),
    /// The stage aborted; the rest of the pipeline still ran.
    Failed(String),
}

/// Per-stage summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageReport {
    /// Stage identifier.
    pub name: &'static str,
    /// What happened.
    pub outcome: StageOutcome,
}

/// Summary of a pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// One entry per stage, in run order.
    pub stages: Vec<StageReport>,
    /// CSS rules collected by stages, in collection order.
    pub styles: Vec<String>,
}

impl PipelineReport {
    /// Converted-element count for the first stage called `name`.
    ///
    /// Returns `None` when no such stage ran or it failed.
    #[must_use]
    pub fn converted(&self, name: &str) -> Option<usize> {
        self.stages
            .iter()
            .find(|stage| stage.name == name)
            .and_then(|stage| match stage.outcome {
                StageOutcome::Converted(count) => Some(count),
                StageOutcome::Failed(_) => None,
            })
    }

    /// Stages that aborted, with their error messages.
    pub fn failures(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.stages.iter().filter_map(|stage| match &stage.outcome {
            StageOutcome::Failed(message) => Some((stage.name, message.as_str())),
            StageOutcome::Converted(_) => None,
        })
    }

    /// All collected CSS rules as one stylesheet.
    #[must_use]
    pub fn stylesheet(&self) -> String {
        self.styles.join("")
    }
}

/// An ordered sequence of configured stages.
///
/// # Example
///
/// ```
/// use amp_dom::Document;
/// use amp_sanitizers::{Args, Pipeline, SanitizeContext, StageRegistration};
///
/// let registrations = vec![
///     StageRegistration::new("facebook", Args::new().with("width", 600).with("height", 380)),
///     StageRegistration::new("tag_and_attribute", Args::new()),
/// ];
/// let mut pipeline =
///     Pipeline::from_registrations(&registrations, &Args::new(), &SanitizeContext::new());
///
/// let mut doc = Document::parse(r#"<div class="fb-page" data-href="https://facebook.com/x"></div>"#);
/// pipeline.run(&mut doc);
///
/// assert_eq!(
///     doc.to_html(),
///     r#"<amp-facebook-page layout="responsive" width="600" height="380" data-href="https://facebook.com/x"></amp-facebook-page>"#
/// );
/// ```
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<(Box<dyn Sanitizer>, Args)>,
}

impl Pipeline {
    /// Create an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pipeline from configured registrations.
    ///
    /// Each stage receives `global` overlaid with its own arguments.
    /// Registrations naming an unknown stage are skipped with a warning.
    #[must_use]
    pub fn from_registrations(
        registrations: &[StageRegistration],
        global: &Args,
        ctx: &SanitizeContext,
    ) -> Self {
        let mut pipeline = Self::new();
        for registration in registrations {
            let Some(id) = registration.stage_id() else {
                tracing::warn!(stage = %registration.stage, "skipping unknown sanitizer stage");
                continue;
            };
            pipeline.push(id.build(ctx), global.overlay(&registration.args));
        }
        pipeline
    }

    /// Append a stage.
    #[must_use]
    pub fn with_stage<S: Sanitizer + 'static>(mut self, stage: S, args: Args) -> Self {
        self.push(Box::new(stage), args);
        self
    }

    /// Append a boxed stage.
    pub fn push(&mut self, stage: Box<dyn Sanitizer>, args: Args) {
        self.stages.push((stage, args));
    }

    /// Stage identifiers in run order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|(stage, _)| stage.name()).collect()
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the pipeline has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over `doc`, in order.
    ///
    /// A stage that fails or panics is logged and recorded in the report;
    /// the remaining stages still run on whatever it left behind.
    pub fn run(&mut self, doc: &mut Document) -> PipelineReport {
        let mut report = PipelineReport::default();

        for (stage, args) in &mut self.stages {
            let name = stage.name();
            let result = panic::catch_unwind(AssertUnwindSafe(|| stage.sanitize(doc, args)));
            let outcome = match result {
                Ok(Ok(count)) => {
                    tracing::debug!(stage = name, converted = count, "stage finished");
                    StageOutcome::Converted(count)
                }
                Ok(Err(e)) => {
                    tracing::warn!(stage = name, "sanitizer stage failed: {e}");
                    StageOutcome::Failed(e.to_string())
                }
                Err(payload) => {
                    let message = panic_message(&*payload);
                    tracing::warn!(stage = name, "sanitizer stage panicked: {message}");
                    StageOutcome::Failed(format!("stage panicked: {message}"))
                }
            };
            report.styles.extend(stage.styles().iter().cloned());
            report.stages.push(StageReport { name, outcome });
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
