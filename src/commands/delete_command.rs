//! Container deletion command

use std::path::PathBuf;

use clap::ArgMatches;

use crate::api::SpotKit;
use crate::commands::command_traits::Command;
use crate::commands::{declared_kind, input_path};
use crate::container::ContainerKind;
use crate::errors::SpotResult;

/// Command removing a container directory
pub struct DeleteCommand {
    input: PathBuf,
    kind: Option<ContainerKind>,
    kit: SpotKit,
}

impl DeleteCommand {
    pub fn new(args: &ArgMatches) -> SpotResult<Self> {
        Ok(DeleteCommand { input: input_path(args)?, kind: declared_kind(args)?, kit: SpotKit::default() })
    }
}

impl Command for DeleteCommand {
    fn execute(&self) -> SpotResult<()> {
        self.kit.delete(&self.input, self.kind)
    }
}
