//! Command pattern interfaces
//!
//! Every CLI operation is a `Command` built by a `CommandFactory` from the
//! parsed arguments.

use crate::errors::SpotResult;

/// One CLI operation, ready to run
pub trait Command {
    /// Runs the operation
    fn execute(&self) -> SpotResult<()>;
}

/// Builds the command selected by the CLI flags
pub trait CommandFactory {
    /// Create the command for the parsed arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    ///
    /// # Returns
    /// The boxed command, or an error when its arguments are invalid
    fn create_command(&self, args: &clap::ArgMatches) -> SpotResult<Box<dyn Command>>;
}
