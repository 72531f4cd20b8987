//! `amped convert` command implementation.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use amped::Amped;
use clap::Args;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// HTML file to convert (default: read stdin).
    file: Option<PathBuf>,

    /// Write AMP markup to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the collected stylesheet to this file.
    #[arg(long)]
    stylesheet: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, input or output fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.config.load(&output)?;
        let amped = Amped::from_config(&config)?;

        let html = match &self.file {
            Some(path) => fs::read_to_string(path)?,
            None => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        tracing::debug!(bytes = html.len(), "Converting input");
        let converted = amped.convert_with_styles(&html)?;

        match &self.output {
            Some(path) => {
                fs::write(path, &converted.html)?;
                output.written("AMP markup", path);
            }
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(converted.html.as_bytes())?;
                writeln!(stdout)?;
            }
        }

        match &self.stylesheet {
            Some(path) => {
                fs::write(path, &converted.stylesheet)?;
                output.written("Stylesheet", path);
            }
            None if !converted.stylesheet.is_empty() => {
                output.warning(&format!(
                    "{} bytes of CSS collected, use --stylesheet to save them",
                    converted.stylesheet.len()
                ));
            }
            None => {}
        }

        Ok(())
    }
}
