//! Container structure analysis command
//!
//! This module implements the command for analyzing and displaying
//! the structure and scene metadata of a container.

use std::path::PathBuf;

use clap::ArgMatches;
use log::{debug, info};

use crate::api::SpotKit;
use crate::commands::command_traits::Command;
use crate::commands::{field_policy, input_path};
use crate::errors::SpotResult;

/// Command for analyzing a container
pub struct AnalyzeCommand {
    /// Container directory
    input: PathBuf,
    /// Whether to enable verbose output
    verbose: bool,
    kit: SpotKit,
}

impl AnalyzeCommand {
    /// Create a new analyze command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    ///
    /// # Returns
    /// A new AnalyzeCommand instance or an error
    pub fn new(args: &ArgMatches) -> SpotResult<Self> {
        Ok(AnalyzeCommand {
            input: input_path(args)?,
            verbose: args.get_flag("verbose"),
            kit: SpotKit::new(field_policy(args)).with_progress(true),
        })
    }
}

impl Command for AnalyzeCommand {
    fn execute(&self) -> SpotResult<()> {
        debug!("Analyzing {}", self.input.display());
        let summary = self.kit.analyze(&self.input)?;
        for line in summary.lines() {
            info!("{}", line);
        }

        if self.verbose {
            let mut handle = self.kit.manager().open_read(&self.input, None)?;
            let meta = handle.metadata()?;
            handle.close()?;
            info!("Production: {:?}", meta.production);
            info!("Source: {:?}", meta.source);
            for vertex in &meta.frame.vertices {
                info!("Vertex: {:?}", vertex);
            }
            for band in &meta.bands {
                for bad in &band.bad_lines {
                    info!("  Band {} line {}: {}", band.index, bad.line, bad.status.name());
                }
            }
        }
        Ok(())
    }
}
