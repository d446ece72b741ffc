//! Command-line interface.
//!
//! The CLI is a thin stand-in for the suite's UI shell: `list` prints the
//! annotated catalog as JSON (the same payload the UI renders) and
//! `install` runs one install request.

use crate::suite::Suite;
use clap::{Parser, Subcommand};

/// Atelier - creative desktop suite installer.
#[derive(Debug, Parser)]
#[command(name = "atelier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the program catalog with installed status as JSON
    List,

    /// Install a program variant
    Install {
        /// Program name (e.g., "GIMP")
        program: String,

        /// Variant tag (e.g., "apt", "flatpak+patch")
        #[arg(default_value = "apt")]
        variant: String,
    },
}

/// Dispatch a parsed command; the return value is the process exit code.
pub fn run(cli: &Cli) -> u8 {
    let suite = Suite::new();

    match &cli.command {
        Commands::List => {
            let programs = suite.get_programs();
            match serde_json::to_string_pretty(&programs) {
                Ok(json) => {
                    println!("{}", json);
                    0
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    1
                }
            }
        }
        Commands::Install { program, variant } => {
            let result = suite.install_program(program, variant);
            if result.success {
                println!("{}", result.message);
                0
            } else {
                eprintln!("{}", result.message);
                1
            }
        }
    }
}
