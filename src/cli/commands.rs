//! Command dispatch

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::LiveTree;
use crate::cli::args::{Cli, Commands, ConfigCommands, ViewArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{local_config_path, Settings};
use crate::domain::Record;
use crate::infrastructure::di::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Show {
            records,
            flat,
            view,
        }) => cmd_show(records, *flat, view),
        Some(Commands::Replay {
            records,
            script,
            view,
        }) => cmd_replay(records, script, view),
        Some(Commands::Config { command }) => cmd_config(command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `treeview --help`".into(),
        )),
    }
}

/// Settings for one records file: config files, env, then flags.
fn view_settings(records: &Path, view: &ViewArgs) -> CliResult<Settings> {
    if let Some(path) = view.config.as_deref().filter(|p| !p.exists()) {
        output::warning(&format!("config {} not found, using defaults", path.display()));
    }
    let local = view
        .config
        .clone()
        .unwrap_or_else(|| local_config_path(records));
    let settings = Settings::load(Some(local.as_path()))?.merge_with(&view.overlay()?);
    debug!(?settings, "effective settings");
    Ok(settings)
}

fn print_tree(tree: &LiveTree<Record>, flat: bool) {
    let projection = tree.projection();
    if flat {
        for line in output::flat_lines(projection) {
            output::info(&line);
        }
    } else {
        output::info(&output::to_termtree(projection));
    }
}

#[instrument(skip(view))]
fn cmd_show(records: &Path, flat: bool, view: &ViewArgs) -> CliResult<()> {
    let container = ServiceContainer::new(view_settings(records, view)?);
    let tree = container.live_tree(records)?;
    print_tree(&tree, flat);
    Ok(())
}

#[instrument(skip(view))]
fn cmd_replay(records: &Path, script: &Path, view: &ViewArgs) -> CliResult<()> {
    let container = ServiceContainer::new(view_settings(records, view)?);
    let mut tree = container.live_tree(records)?;
    let script = container.loader.load_script(script)?;

    let total = script.replay(&mut tree, |number, step, events, tree| {
        output::header(&format!("step {number}: {step:?}"));
        if events.is_empty() {
            output::detail(&"no change");
        }
        for event in events {
            output::event(tree.projection(), event);
        }
    })?;

    output::header(&format!("result ({total} events)"));
    print_tree(&tree, false);
    Ok(())
}

fn cmd_config(command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show { config } => {
            let settings = Settings::load(config.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}
