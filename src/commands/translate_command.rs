//! Translation command
//!
//! Decodes a container and writes its DIMAP metadata document.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::SpotKit;
use crate::commands::command_traits::Command;
use crate::commands::{field_policy, input_path, output_path};
use crate::errors::SpotResult;

/// Command writing the DIMAP document of a container
pub struct TranslateCommand {
    input: PathBuf,
    output: PathBuf,
    kit: SpotKit,
}

impl TranslateCommand {
    /// Create a new translate command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    pub fn new(args: &ArgMatches) -> SpotResult<Self> {
        Ok(TranslateCommand {
            input: input_path(args)?,
            output: output_path(args, "translation")?,
            kit: SpotKit::new(field_policy(args)).with_progress(true),
        })
    }
}

impl Command for TranslateCommand {
    fn execute(&self) -> SpotResult<()> {
        let meta = self.kit.translate(&self.input, &self.output)?;
        info!("Dataset: {}", meta.identification.dataset_name);
        info!("Document written to {}", self.output.display());
        Ok(())
    }
}
