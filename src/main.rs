//! Stacklens CLI
//!
//! Interactive-profile analysis from the command line: apply call-tree
//! transforms to a captured profile and emit filtered profiles, call
//! trees, or flamegraphs.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use stacklens::commands::{
    execute_filter, execute_flamegraph, execute_transforms, execute_tree, parse_range, ViewArgs,
};
use stacklens::filters::ImplementationFilter;
use stacklens::utils::config::{DEFAULT_FLAMEGRAPH_WIDTH, DEFAULT_TREE_ROWS, SCHEMA_VERSION};

/// Stacklens - transform pipeline for sampled performance profiles
#[derive(Parser, Debug)]
#[command(name = "stacklens")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options shared by every view-producing subcommand.
#[derive(clap::Args, Debug)]
struct ViewFlags {
    /// Path to the profile JSON document
    #[arg(short, long)]
    profile: PathBuf,

    /// Thread index within the profile
    #[arg(short, long, default_value = "0")]
    thread: usize,

    /// Committed time range in ms, as start:end
    #[arg(long)]
    range: Option<String>,

    /// Serialized transform stack, e.g. "ff-5~mf-2"
    #[arg(long, default_value = "")]
    transforms: String,

    /// Implementation filter: combined, js, or cpp
    #[arg(long, default_value = "combined")]
    implementation: String,

    /// Keep only stacks matching this search string
    #[arg(long, default_value = "")]
    search: String,

    /// Invert the call stacks
    #[arg(long)]
    invert: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply the view pipeline and write a filtered profile
    Filter {
        #[command(flatten)]
        view: ViewFlags,

        /// Output path for the filtered profile JSON
        #[arg(short, long, default_value = "filtered.json")]
        output: PathBuf,
    },

    /// Print the aggregated call tree of the derived view
    Tree {
        #[command(flatten)]
        view: ViewFlags,

        /// Maximum number of rows to print
        #[arg(long, default_value_t = DEFAULT_TREE_ROWS)]
        rows: usize,
    },

    /// Render the derived view as an SVG flamegraph
    Flamegraph {
        #[command(flatten)]
        view: ViewFlags,

        /// Output path for the SVG
        #[arg(short, long, default_value = "flamegraph.svg")]
        output: PathBuf,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value_t = DEFAULT_FLAMEGRAPH_WIDTH)]
        width: usize,
    },

    /// Parse and validate a serialized transform stack
    Transforms {
        /// The transform string to parse
        #[arg(short, long)]
        parse: String,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Filter { view, output } => {
            execute_filter(view_args(view)?, output)?;
        }

        Commands::Tree { view, rows } => {
            execute_tree(view_args(view)?, rows)?;
        }

        Commands::Flamegraph {
            view,
            output,
            title,
            width,
        } => {
            execute_flamegraph(view_args(view)?, output, title, width)?;
        }

        Commands::Transforms { parse } => {
            execute_transforms(&parse)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// Convert raw CLI flags into validated command arguments.
fn view_args(flags: ViewFlags) -> Result<ViewArgs> {
    let range = flags.range.as_deref().map(parse_range).transpose()?;
    Ok(ViewArgs {
        profile: flags.profile,
        thread_index: flags.thread,
        range,
        transforms: flags.transforms,
        implementation: ImplementationFilter::from_url_component(&flags.implementation),
        search: flags.search,
        inverted: flags.invert,
    })
}

/// Display version information
fn display_version() {
    println!("Stacklens v{}", env!("CARGO_PKG_VERSION"));
    println!("Profile Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Transform pipeline and call-tree analysis for sampled profiles.");
}
