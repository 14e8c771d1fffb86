//! Container creation command

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::api::SpotKit;
use crate::commands::command_traits::Command;
use crate::commands::{declared_kind, input_path, u32_arg};
use crate::container::{ContainerKind, ImageSpec};
use crate::errors::{SpotError, SpotResult};
use crate::io::byte_order::ByteOrder;

/// Command creating an empty container
pub struct CreateCommand {
    dir: PathBuf,
    kind: ContainerKind,
    spec: ImageSpec,
    kit: SpotKit,
}

impl CreateCommand {
    /// Create a new create command
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    pub fn new(args: &ArgMatches) -> SpotResult<Self> {
        let dir = input_path(args)?;
        let kind = declared_kind(args)?.unwrap_or(ContainerKind::Dimap);

        let require = |name: &str| -> SpotResult<u32> {
            u32_arg(args, name)?
                .ok_or_else(|| SpotError::GenericError(format!("--{} is required to create a container", name)))
        };
        let lines = require("lines")?;
        let columns = require("columns")?;
        let bands = u32_arg(args, "bands")?.unwrap_or(1);

        let sample_bytes = match u32_arg(args, "nbits")?.unwrap_or(8) {
            8 => 1,
            16 => 2,
            other => return Err(SpotError::Unsupported(format!("{} bits per sample", other))),
        };

        let mut spec = ImageSpec::new(lines, columns, bands, sample_bytes);
        if let Some(code) = args.get_one::<String>("byte-order") {
            let order = ByteOrder::from_cap_code(&code.trim().to_ascii_uppercase())
                .ok_or_else(|| SpotError::GenericError(format!("Unknown byte order: {}", code)))?;
            spec = spec.with_byte_order(order);
        }

        Ok(CreateCommand { dir, kind, spec, kit: SpotKit::default() })
    }
}

impl Command for CreateCommand {
    fn execute(&self) -> SpotResult<()> {
        let handle = self.kit.create(&self.dir, self.kind, &self.spec)?;
        info!(
            "Created {} container {} ({} lines x {} columns x {} bands)",
            self.kind,
            self.dir.display(),
            self.spec.lines,
            self.spec.columns,
            self.spec.bands
        );
        self.kit.manager().close(handle)
    }
}
