//! Quicklook extraction command
//!
//! This module implements the command for extracting an RGB quicklook
//! of a container, with support for window selection and subsampling.

use std::path::PathBuf;

use clap::ArgMatches;
use log::{debug, info};

use crate::api::SpotKit;
use crate::cap::region::Window;
use crate::commands::command_traits::Command;
use crate::commands::{field_policy, input_path, output_path, u32_arg};
use crate::errors::{SpotError, SpotResult};

/// Command for extracting a quicklook image from a container
pub struct ExtractCommand {
    /// Container directory
    input: PathBuf,
    /// Image file to write, format chosen from its extension
    output: PathBuf,
    /// Window to read, whole image when absent
    window: Option<Window>,
    /// Subsampling step on both axes
    step: u32,
    kit: SpotKit,
}

impl ExtractCommand {
    /// Create a new extract command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    ///
    /// # Returns
    /// A new ExtractCommand instance or an error
    pub fn new(args: &ArgMatches) -> SpotResult<Self> {
        let input = input_path(args)?;
        let output = output_path(args, "extraction")?;

        let window = match args.get_one::<String>("window") {
            Some(text) => Some(parse_window(text)?),
            None => None,
        };
        debug!("Window: {:?}", window);

        let step = u32_arg(args, "step")?.unwrap_or(1);
        if step == 0 {
            return Err(SpotError::InvalidWindow("subsampling step of zero".to_string()));
        }

        Ok(ExtractCommand { input, output, window, step, kit: SpotKit::new(field_policy(args)).with_progress(true) })
    }
}

impl Command for ExtractCommand {
    fn execute(&self) -> SpotResult<()> {
        info!("Extracting quicklook from {}", self.input.display());
        self.kit.extract(&self.input, &self.output, self.window, self.step)
    }
}

/// Parses a window given as "first_line,first_column,lines,columns"
pub fn parse_window(text: &str) -> SpotResult<Window> {
    let parts: Vec<u32> = text
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<_, _>>()
        .map_err(|_| SpotError::InvalidWindow(format!("Invalid window: {}", text)))?;

    match parts.as_slice() {
        [first_line, first_column, lines, columns] => Ok(Window::new(*first_line, *first_column, *lines, *columns)),
        _ => Err(SpotError::InvalidWindow(format!(
            "Window must have 4 values (first_line,first_column,lines,columns): {}",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window() {
        assert_eq!(parse_window("1, 2,30,40").unwrap(), Window::new(1, 2, 30, 40));
        assert!(parse_window("1,2,3").is_err());
        assert!(parse_window("a,2,3,4").is_err());
    }
}
