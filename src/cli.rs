use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// devsetup - Set up a Ruby/Rails development machine on macOS
#[derive(Parser, Debug)]
#[command(name = "devsetup")]
#[command(about = "Install a macOS development toolchain through Homebrew, rbenv and gem")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: log install commands instead of running them.
    ///
    /// Presence checks and read-only queries still execute so the plan
    /// reflects the real machine.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Answer yes to every confirmation
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Configuration file (defaults to $DEVSETUP_CONFIG, then built-ins)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install packages without the menu
    Install {
        /// Package ids (see `devsetup list`)
        ids: Vec<String>,

        /// Install the default set
        #[arg(short, long, conflicts_with = "ids")]
        defaults: bool,
    },
    /// Show every package, its method and whether it is installed
    List,
    /// Print the install order for packages without installing anything
    Plan {
        /// Package ids (see `devsetup list`)
        ids: Vec<String>,

        /// Plan the default set
        #[arg(short, long, conflicts_with = "ids")]
        defaults: bool,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        file: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
