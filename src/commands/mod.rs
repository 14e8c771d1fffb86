//! CLI command implementations
//!
//! This module contains implementations of various commands
//! supported by the CLI application using the Command pattern.

pub mod command_traits;
pub mod analyze_command;
pub mod translate_command;
pub mod extract_command;
pub mod create_command;
pub mod delete_command;
pub mod list_command;

pub use command_traits::{Command, CommandFactory};
pub use analyze_command::AnalyzeCommand;
pub use translate_command::TranslateCommand;
pub use extract_command::ExtractCommand;
pub use create_command::CreateCommand;
pub use delete_command::DeleteCommand;
pub use list_command::ListCommand;

use std::path::PathBuf;

use clap::ArgMatches;

use crate::codec::FieldPolicy;
use crate::container::ContainerKind;
use crate::errors::{SpotError, SpotResult};

/// Path given as the positional input argument
pub(crate) fn input_path(args: &ArgMatches) -> SpotResult<PathBuf> {
    args.get_one::<String>("input")
        .map(PathBuf::from)
        .ok_or_else(|| SpotError::GenericError("Missing input container".to_string()))
}

/// Path given with `--output`, required by the calling command
pub(crate) fn output_path(args: &ArgMatches, command: &str) -> SpotResult<PathBuf> {
    args.get_one::<String>("output")
        .map(PathBuf::from)
        .ok_or_else(|| SpotError::GenericError(format!("Missing output file path for {}", command)))
}

/// Field policy selected by `--legacy`
pub(crate) fn field_policy(args: &ArgMatches) -> FieldPolicy {
    if args.get_flag("legacy") {
        FieldPolicy::Legacy
    } else {
        FieldPolicy::Strict
    }
}

/// Container family given with `--kind`, if any
pub(crate) fn declared_kind(args: &ArgMatches) -> SpotResult<Option<ContainerKind>> {
    match args.get_one::<String>("kind") {
        Some(name) => ContainerKind::from_name(name)
            .map(Some)
            .ok_or_else(|| SpotError::GenericError(format!("Unknown container family: {}", name))),
        None => Ok(None),
    }
}

/// Unsigned integer option, if given
pub(crate) fn u32_arg(args: &ArgMatches, name: &str) -> SpotResult<Option<u32>> {
    args.get_one::<String>(name)
        .map(|value| {
            value
                .trim()
                .parse::<u32>()
                .map_err(|_| SpotError::GenericError(format!("Invalid value for --{}: {}", name, value)))
        })
        .transpose()
}

/// Factory for creating command instances based on CLI arguments
///
/// This factory examines the command-line arguments and creates
/// the appropriate command instance for execution.
#[derive(Default)]
pub struct SpotkitCommandFactory;

impl SpotkitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        SpotkitCommandFactory
    }
}

impl CommandFactory for SpotkitCommandFactory {
    fn create_command(&self, args: &ArgMatches) -> SpotResult<Box<dyn Command>> {
        if args.get_flag("create") {
            Ok(Box::new(CreateCommand::new(args)?))
        } else if args.get_flag("delete") {
            Ok(Box::new(DeleteCommand::new(args)?))
        } else if args.get_flag("list") {
            Ok(Box::new(ListCommand::new(args)?))
        } else if args.get_flag("translate") {
            Ok(Box::new(TranslateCommand::new(args)?))
        } else if args.get_flag("extract") {
            Ok(Box::new(ExtractCommand::new(args)?))
        } else {
            // Default to analyze command
            Ok(Box::new(AnalyzeCommand::new(args)?))
        }
    }
}
