use std::path::PathBuf;

use clap::Parser;
use mysql_bulk::{manifest::yaml::YAML_CONFIG_NAME, setup_info_logger};

use crate::{
    cli_interface::{Commands, CLI},
    commands::{render::handle_render_command, validate::handle_validate_command},
    console::print_error_message,
};

mod cli_interface;
mod commands;
mod console;

fn resolve_manifest_path(manifest: &Option<String>) -> PathBuf {
    match manifest {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(YAML_CONFIG_NAME),
    }
}

fn main() {
    setup_info_logger();

    let cli = CLI::parse();
    let manifest_path = resolve_manifest_path(&cli.manifest);

    let result = match &cli.command {
        Commands::Validate => handle_validate_command(&manifest_path).map_err(|e| e.to_string()),
        Commands::Render { events, inline, batch_size } => {
            handle_render_command(&manifest_path, events, *inline, *batch_size)
                .map_err(|e| e.to_string())
        }
    };

    if let Err(e) = result {
        print_error_message(&e);
        std::process::exit(1);
    }
}
