//! Container listing command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::SpotKit;
use crate::commands::command_traits::Command;
use crate::commands::input_path;
use crate::errors::SpotResult;

/// Command listing the containers under a directory
pub struct ListCommand {
    root: PathBuf,
    kit: SpotKit,
}

impl ListCommand {
    pub fn new(args: &ArgMatches) -> SpotResult<Self> {
        Ok(ListCommand { root: input_path(args)?, kit: SpotKit::default() })
    }
}

impl Command for ListCommand {
    fn execute(&self) -> SpotResult<()> {
        let entries = self.kit.list_images(&self.root)?;
        if entries.is_empty() {
            info!("No container found under {}", self.root.display());
        }
        for entry in entries {
            info!("{:8} {}", entry.kind.name(), entry.path.display());
        }
        Ok(())
    }
}
