//! specimen: populate schema types with random, reproducible values
//!
//! ## Features
//!
//! - **generate**: Populate a type and print one JSON document per value
//! - **inspect**: Print the resolved field tree of a type
//!
//! ## Example Usage
//!
//! ```bash
//! # Three orders, reproducible with the same seed
//! specimen generate --schema types.json --type Order --count 3 --seed 42
//!
//! # Fix some fields, leave one out, allow another to be null
//! specimen generate --schema types.json --type Order \
//!     --set status='"NEW"' --ignore notes --nullable coupon --pretty
//!
//! # Generic root
//! specimen generate --schema types.json --type Pair --type-arg String --type-arg i32
//!
//! # Show what would be populated
//! specimen inspect --schema types.json --type Order
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod specimen_cli;

use specimen_cli::{generate::GenerateCmd, inspect::InspectCmd};

#[derive(Parser)]
#[command(
    name = "specimen",
    author,
    version,
    about = "Populate schema types with random test data",
    long_about = "Generates fully populated values of the types described in a JSON schema.\n\n\
                  Output is reproducible for a given seed (--seed or SPECIMEN_SEED)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as a single JSON report instead of plain documents
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (debug logging on stderr)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate a type and print the values as JSON
    Generate(GenerateCmd),

    /// Print the resolved field tree of a type
    Inspect(InspectCmd),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Generate(_) => "generate",
            Commands::Inspect(_) => "inspect",
        }
    }
}

fn main() -> Result<()> {
    let Cli {
        command,
        json,
        verbose,
    } = Cli::parse();
    specimen_cli::init_tracing(verbose);
    tracing::debug!(command = command.name(), "starting");

    match command {
        Commands::Generate(cmd) => cmd.execute(json),
        Commands::Inspect(cmd) => cmd.execute(json),
    }
}
