//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::cli::error::{CliError, CliResult};
use crate::config::{parse_scalar, RawSettings, RawSortConfig};

/// Live hierarchical projection over flat record collections
#[derive(Parser, Debug)]
#[command(name = "treeview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the projection of a records file
    Show {
        /// Records file with [[records]] tables
        #[arg(value_hint = ValueHint::FilePath)]
        records: PathBuf,

        /// Print `index level uid record` lines instead of a tree
        #[arg(long)]
        flat: bool,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Apply a mutation script and print the projected events
    Replay {
        /// Records file with [[records]] tables
        #[arg(value_hint = ValueHint::FilePath)]
        records: PathBuf,

        /// Script file with [[steps]] tables
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show {
        /// Local config file layered over the global one
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
    },

    /// Print a commented config template
    Template,
}

/// Projection settings that can be given on the command line.
#[derive(Args, Debug, Default, Clone)]
pub struct ViewArgs {
    /// Local config file (default: .treeview.toml beside the records file)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Include the root as the first entry
    #[arg(long)]
    pub root: bool,

    /// Parent key of top-level records
    #[arg(long, value_name = "VALUE")]
    pub root_key: Option<String>,

    /// Read nested children from this field instead of parent keys
    #[arg(long, value_name = "FIELD")]
    pub children: Option<String>,

    /// Sort siblings by this field
    #[arg(long, value_name = "FIELD")]
    pub sort: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Group siblings by this field
    #[arg(long, value_name = "FIELD")]
    pub group: Option<String>,

    /// Show only records whose field is truthy
    #[arg(long, value_name = "FIELD")]
    pub filter: Option<String>,
}

impl ViewArgs {
    /// Settings overlay for the flags that were given.
    pub fn overlay(&self) -> CliResult<RawSettings> {
        for (flag, value) in [
            ("--children", &self.children),
            ("--sort", &self.sort),
            ("--group", &self.group),
            ("--filter", &self.filter),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(CliError::InvalidArgs(format!("{flag} needs a field name")));
            }
        }
        Ok(RawSettings {
            children_field: self.children.clone(),
            root_key: self.root_key.as_deref().map(parse_scalar),
            root_enumerable: self.root.then_some(true),
            group_field: self.group.clone(),
            filter_field: self.filter.clone(),
            sort: RawSortConfig {
                field: self.sort.clone(),
                descending: self.desc.then_some(true),
            },
            ..RawSettings::default()
        })
    }
}
