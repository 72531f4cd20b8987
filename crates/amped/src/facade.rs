//! The conversion facade.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use amp_cache::{Cache, FileCache, MemoryCache};
use amp_config::Config;
use amp_dimensions::{DimensionResolver, HttpFetcher, UrlNormalizer};
use amp_dom::Document;
use amp_sanitizers::{Args, Pipeline, SanitizeContext, StageId, StageRegistration};

use crate::{AmpedError, Optimizer};

/// Query fragment that makes the AMP runtime validate the page in the
/// browser console.
const DEV_PARAM: &str = "#development=1";

/// Converted markup plus the stylesheet collected from it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Converted {
    /// AMP body markup.
    pub html: String,
    /// CSS moved out of the markup, for `<style amp-custom>`.
    pub stylesheet: String,
}

/// Build the dimension resolver described by `config`.
///
/// Uses a [`FileCache`] under `dimensions.cache_dir` when set and a
/// [`MemoryCache`] otherwise. Remote sizes are fetched over HTTP.
pub fn dimension_resolver(config: &Config) -> Result<DimensionResolver, AmpedError> {
    let dims = &config.dimensions;
    let cache: Box<dyn Cache> = match &dims.cache_dir {
        Some(dir) => Box::new(FileCache::new(dir.clone(), env!("CARGO_PKG_VERSION"))),
        None => Box::new(MemoryCache::new()),
    };
    let fetcher =
        HttpFetcher::with_options(config.user_agent(), dims.timeout(), dims.max_probe_bytes);
    let resolver = DimensionResolver::new(
        &*cache,
        Arc::new(fetcher),
        UrlNormalizer::new(&config.base_origin)?,
    )
    .with_ttls(dims.cache_ttl(), dims.failure_ttl(), dims.lock_ttl())?;
    Ok(resolver)
}

/// Entry point for HTML to AMP conversion.
///
/// Holds the embed and sanitizer registries, the global stage arguments and
/// the services stages need. Every [`convert`](Self::convert) call builds a
/// fresh pipeline and document, so one `Amped` can serve concurrent
/// requests.
///
/// # Example
///
/// ```
/// use amp_sanitizers::{Args, StageRegistration};
/// use amped::Amped;
///
/// let mut amped = Amped::new();
/// amped.set_sanitizers(vec![
///     StageRegistration::new("script", Args::new()),
///     StageRegistration::new("tag_and_attribute", Args::new()),
/// ]);
///
/// let html = amped.convert(r#"<p onclick="go()">Hi</p><script>go()</script>"#).unwrap();
/// assert_eq!(html, "<p>Hi</p>");
/// ```
#[derive(Default)]
pub struct Amped {
    embeds: Option<Vec<StageRegistration>>,
    sanitizers: Option<Vec<StageRegistration>>,
    args: Args,
    context: SanitizeContext,
    optimizer: Option<Box<dyn Optimizer>>,
    css_dir: Option<PathBuf>,
    css_max_size: u64,
    debug: bool,
}

impl Amped {
    /// Create an unconfigured facade.
    ///
    /// [`convert`](Self::convert) fails with [`AmpedError::ConfigMissing`]
    /// until a registry is set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a facade from loaded configuration.
    ///
    /// Sets up the dimension resolver (file-backed cache when
    /// `dimensions.cache_dir` is set, in-memory otherwise) and copies the
    /// registries, arguments and CSS settings. `base_origin` doubles as the
    /// iframe stage's `current_origin` unless the arguments set one.
    pub fn from_config(config: &Config) -> Result<Self, AmpedError> {
        let dims = &config.dimensions;
        let resolver = dimension_resolver(config)?;

        let mut args = config.args.clone();
        if args.get("current_origin").is_none() {
            args.set("current_origin", config.base_origin.clone());
        }

        let mut sanitizers = config.sanitizers.clone();
        if config.debug {
            for registration in &mut sanitizers {
                if registration.stage_id() == Some(StageId::Style) {
                    registration.args.set("include_manifest_comment", "always");
                }
            }
        }

        tracing::info!(
            base_origin = %config.base_origin,
            persistent_cache = dims.cache_dir.is_some(),
            "Amped configured"
        );

        Ok(Self {
            embeds: Some(config.embeds.clone()),
            sanitizers: Some(sanitizers),
            args,
            context: SanitizeContext::new()
                .with_resolver(Arc::new(resolver))
                .with_scheme(config.scheme),
            optimizer: None,
            css_dir: config.css.path.clone(),
            css_max_size: config.css.max_size,
            debug: config.debug,
        })
    }

    /// Set the services handed to stages.
    #[must_use]
    pub fn with_context(mut self, context: SanitizeContext) -> Self {
        self.context = context;
        self
    }

    /// Set the post-render optimizer.
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: impl Optimizer + 'static) -> Self {
        self.optimizer = Some(Box::new(optimizer));
        self
    }

    /// Set the stylesheet directory and size limit used by
    /// [`inline_css`](Self::inline_css).
    #[must_use]
    pub fn with_css(mut self, dir: impl Into<PathBuf>, max_size: u64) -> Self {
        self.css_dir = Some(dir.into());
        self.css_max_size = max_size;
        self
    }

    /// Set development mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Merge embed registrations into the embed registry.
    ///
    /// A stage already registered keeps its position and takes the new
    /// arguments; new stages are appended.
    pub fn set_embeds(&mut self, registrations: impl IntoIterator<Item = StageRegistration>) {
        merge_registrations(self.embeds.get_or_insert_with(Vec::new), registrations);
    }

    /// Merge sanitizer registrations into the sanitizer registry.
    ///
    /// Same merge rules as [`set_embeds`](Self::set_embeds).
    pub fn set_sanitizers(&mut self, registrations: impl IntoIterator<Item = StageRegistration>) {
        merge_registrations(self.sanitizers.get_or_insert_with(Vec::new), registrations);
    }

    /// Merge global stage arguments; keys in `args` win.
    pub fn set_args(&mut self, args: &Args) {
        self.args.merge(args);
    }

    /// Registered embed stages.
    #[must_use]
    pub fn embeds(&self) -> &[StageRegistration] {
        self.embeds.as_deref().unwrap_or_default()
    }

    /// Registered sanitizer stages.
    #[must_use]
    pub fn sanitizers(&self) -> &[StageRegistration] {
        self.sanitizers.as_deref().unwrap_or_default()
    }

    /// Global stage arguments.
    #[must_use]
    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Convert HTML to AMP HTML.
    ///
    /// Only a missing registry is an error. Everything else (stage failures,
    /// unresolvable images, unknown stages) degrades the output and is
    /// logged.
    pub fn convert(&self, html: &str) -> Result<String, AmpedError> {
        self.convert_with_styles(html).map(|converted| converted.html)
    }

    /// Convert HTML to AMP HTML, also returning the collected stylesheet.
    pub fn convert_with_styles(&self, html: &str) -> Result<Converted, AmpedError> {
        if self.embeds.is_none() && self.sanitizers.is_none() {
            return Err(AmpedError::ConfigMissing);
        }

        let registrations: Vec<StageRegistration> = self
            .embeds()
            .iter()
            .chain(self.sanitizers())
            .cloned()
            .collect();
        let mut pipeline = Pipeline::from_registrations(&registrations, &self.args, &self.context);

        let mut doc = Document::parse(html);
        let report = pipeline.run(&mut doc);
        tracing::debug!(
            stages = report.stages.len(),
            failed = report.failures().count(),
            "conversion finished"
        );

        Ok(Converted {
            html: doc.to_html(),
            stylesheet: report.stylesheet(),
        })
    }

    /// Run the configured optimizer over a rendered page.
    ///
    /// Returns `html` unchanged when it is empty, when no optimizer is set,
    /// or when the optimizer fails.
    #[must_use]
    pub fn optimize(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        let Some(optimizer) = &self.optimizer else {
            return html.to_owned();
        };
        match optimizer.optimize(html) {
            Ok(optimized) => optimized,
            Err(e) => {
                tracing::warn!("optimizer failed, serving unoptimized page: {e}");
                html.to_owned()
            }
        }
    }

    /// Inline a stylesheet from the CSS directory as `<style {attr}>...</style>`.
    ///
    /// Returns an empty string unless `file` names a `.css` file inside the
    /// CSS directory no larger than the configured limit.
    #[must_use]
    pub fn inline_css(&self, file: &str, attr: &str) -> String {
        let Some(path) = self.css_file(file) else {
            return String::new();
        };
        match std::fs::read_to_string(&path) {
            Ok(css) if attr.is_empty() => format!("<style>{css}</style>"),
            Ok(css) => format!("<style {attr}>{css}</style>"),
            Err(e) => {
                tracing::warn!(path = %path.display(), "cannot read stylesheet: {e}");
                String::new()
            }
        }
    }

    fn css_file(&self, file: &str) -> Option<PathBuf> {
        let dir = self.css_dir.as_ref()?;
        let relative = Path::new(file);
        let inside = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !inside {
            return None;
        }
        let path = dir.join(relative);
        if path.extension().is_none_or(|ext| ext != "css") {
            return None;
        }
        let metadata = std::fs::metadata(&path).ok()?;
        (metadata.is_file() && metadata.len() <= self.css_max_size).then_some(path)
    }

    /// `#development=1` in development mode, otherwise empty.
    #[must_use]
    pub fn dev_param(&self) -> &'static str {
        if self.debug { DEV_PARAM } else { "" }
    }
}

/// Merge `incoming` into `registry` by stage identifier.
fn merge_registrations(
    registry: &mut Vec<StageRegistration>,
    incoming: impl IntoIterator<Item = StageRegistration>,
) {
    for registration in incoming {
        let key = stage_key(&registration.stage);
        match registry.iter_mut().find(|existing| stage_key(&existing.stage) == key) {
            Some(existing) => existing.args = registration.args,
            None => registry.push(registration),
        }
    }
}

/// Identity of a registration: the canonical id for built-in stages, the
/// name as written otherwise.
fn stage_key(stage: &str) -> String {
    StageId::parse(stage)
        .map_or_else(|| stage.to_owned(), |id| id.as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn names(registrations: &[StageRegistration]) -> Vec<&str> {
        registrations.iter().map(|r| r.stage.as_str()).collect()
    }

    #[test]
    fn test_merge_keeps_position_and_appends() {
        let mut amped = Amped::new();
        amped.set_sanitizers(vec![
            StageRegistration::new("image", Args::new()),
            StageRegistration::new("facebook", Args::new().with("width", 600)),
            StageRegistration::new("tag_and_attribute", Args::new()),
        ]);
        amped.set_sanitizers(vec![
            StageRegistration::new("Facebook", Args::new().with("width", 500)),
            StageRegistration::new("script", Args::new()),
        ]);

        assert_eq!(
            names(amped.sanitizers()),
            vec!["image", "facebook", "tag_and_attribute", "script"]
        );
        assert_eq!(amped.sanitizers()[1].args.get_u32("width"), Some(500));
    }

    #[test]
    fn test_set_args_merges_keys() {
        let mut amped = Amped::new();
        amped.set_args(&Args::new().with("content_max_width", 720).with("a", 1));
        amped.set_args(&Args::new().with("content_max_width", 640));
        assert_eq!(amped.args().get_u32("content_max_width"), Some(640));
        assert_eq!(amped.args().get_u32("a"), Some(1));
    }

    #[test]
    fn test_convert_without_registry_fails() {
        let err = Amped::new().convert("<p>x</p>").unwrap_err();
        assert!(matches!(err, AmpedError::ConfigMissing));
    }

    #[test]
    fn test_empty_registry_is_configured() {
        let mut amped = Amped::new();
        amped.set_embeds(Vec::new());
        assert_eq!(amped.convert("<p>x</p>").unwrap(), "<p>x</p>");
    }

    #[test]
    fn test_dev_param() {
        assert_eq!(Amped::new().dev_param(), "");
        assert_eq!(Amped::new().with_debug(true).dev_param(), "#development=1");
    }

    #[test]
    fn test_css_file_stays_inside_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("amp.css"), "p{}").unwrap();
        let amped = Amped::new().with_css(temp_dir.path(), 100);

        assert!(amped.css_file("amp.css").is_some());
        assert!(amped.css_file("../amp.css").is_none());
        assert!(amped.css_file("/etc/passwd").is_none());
    }
}
