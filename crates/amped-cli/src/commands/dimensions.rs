//! `amped dimensions` command implementation.

use std::io::{self, Write};

use amp_dimensions::Dimensions;
use clap::Args;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the dimensions command.
#[derive(Args)]
pub(crate) struct DimensionsArgs {
    /// Image URLs, absolute or relative to the base origin.
    #[arg(required = true)]
    urls: Vec<String>,

    #[command(flatten)]
    config: ConfigArgs,
}

impl DimensionsArgs {
    /// Execute the dimensions command.
    ///
    /// Prints `url width height` per resolved URL and `url -` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or stdout is closed.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load(&output)?;
        let resolver = amped::dimension_resolver(&config)?;

        output.note(&format!("Base origin: {}", config.base_origin));
        let sizes = resolver.resolve(&self.urls, config.scheme);

        let mut stdout = io::stdout().lock();
        let mut unresolved = 0;
        for url in &self.urls {
            let size = sizes.get(url.as_str()).copied().flatten();
            if size.is_none() {
                unresolved += 1;
            }
            writeln!(stdout, "{}", format_line(url, size))?;
        }

        if unresolved > 0 {
            output.warning(&format!("{unresolved} URL(s) could not be resolved"));
        }
        Ok(())
    }
}

/// Format one result line.
fn format_line(url: &str, size: Option<Dimensions>) -> String {
    match size {
        Some(size) => format!("{url} {} {}", size.width, size.height),
        None => format!("{url} -"),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_format_line_resolved() {
        assert_eq!(
            format_line("https://example.com/a.png", Some(Dimensions::new(640, 480))),
            "https://example.com/a.png 640 480"
        );
    }

    #[test]
    fn test_format_line_unresolved() {
        assert_eq!(format_line("/missing.png", None), "/missing.png -");
    }
}
