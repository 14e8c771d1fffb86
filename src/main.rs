use clap::{Arg, Command as ClapCommand, ArgAction};
use std::path::Path;
use std::process;
use log::{error, Level};

use spotkit::utils::logger::Logger;
use spotkit::commands::{CommandFactory, SpotkitCommandFactory};

fn main() {
    let matches = ClapCommand::new("spotkit")
        .version("0.1")
        .author("Maurice Schilpp")
        .about("Inspect, translate and create SPOT CAP/DIMAP containers")
        .arg(
            Arg::new("input")
                .help("Container directory (or search root with --list)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Also write the log to this file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("legacy")
                .long("legacy")
                .help("Accept blank required record fields with their documented defaults")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("translate")
                .short('t')
                .long("translate")
                .help("Write the DIMAP metadata document of the container")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("extract")
                .short('e')
                .long("extract")
                .help("Extract an RGB quicklook image")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("create")
                .long("create")
                .help("Create an empty container")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("delete")
                .long("delete")
                .help("Delete a container")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list")
                .long("list")
                .help("List the containers found under a directory")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("window")
                .long("window")
                .help("Window to extract (first_line,first_column,lines,columns)")
                .value_name("WINDOW")
                .required(false),
        )
        .arg(
            Arg::new("step")
                .long("step")
                .help("Subsampling step for extraction")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("kind")
                .long("kind")
                .help("Container family (CAP or DIMAP)")
                .value_name("KIND")
                .required(false),
        )
        .arg(
            Arg::new("lines")
                .long("lines")
                .help("Number of lines of the created image")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("columns")
                .long("columns")
                .help("Number of columns of the created image")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("bands")
                .long("bands")
                .help("Number of bands of the created image")
                .value_name("N")
                .default_value("1")
                .required(false),
        )
        .arg(
            Arg::new("nbits")
                .long("nbits")
                .help("Bits per sample of the created image (8 or 16)")
                .value_name("BITS")
                .default_value("8")
                .required(false),
        )
        .arg(
            Arg::new("byte-order")
                .long("byte-order")
                .help("Stored byte order of the created image (LE or BE)")
                .value_name("ORDER")
                .required(false),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") { Level::Debug } else { Level::Info };
    match matches.get_one::<String>("log-file") {
        Some(log_file) => {
            if let Err(e) = Logger::init_global_logger(Path::new(log_file), level) {
                eprintln!("Error setting up global logger: {}", e);
                process::exit(1);
            }
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str().to_ascii_lowercase()))
                .init();
        }
    }

    let factory = SpotkitCommandFactory::new();

    let command_result = factory.create_command(&matches);
    match command_result {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                process::exit(1);
            }
        },
        Err(e) => {
            error!("Failed to create command: {}", e);
            process::exit(1);
        }
    };
}
