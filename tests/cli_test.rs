//! Tests for command line parsing

use clap::Parser;
use rstest::rstest;

use treeview::cli::args::ConfigCommands;
use treeview::cli::{Cli, CliError, Commands};
use treeview::domain::Value;
use treeview::exitcode;

#[test]
fn given_show_flags_when_parsing_then_overlay_carries_them() {
    // Arrange
    let cli = Cli::try_parse_from([
        "treeview",
        "show",
        "records.toml",
        "--root-key",
        "0",
        "--sort",
        "name",
        "--desc",
        "--group",
        "kind",
    ])
    .expect("parse");

    // Act
    let Some(Commands::Show { view, flat, .. }) = cli.command else {
        panic!("expected show command");
    };
    let overlay = view.overlay().expect("overlay");

    // Assert
    assert!(!flat);
    assert_eq!(overlay.root_key, Some(Value::Int(0)));
    assert_eq!(overlay.sort.field.as_deref(), Some("name"));
    assert_eq!(overlay.sort.descending, Some(true));
    assert_eq!(overlay.group_field.as_deref(), Some("kind"));
    assert_eq!(overlay.root_enumerable, None);
}

#[test]
fn given_desc_without_sort_when_parsing_then_rejected() {
    let result = Cli::try_parse_from(["treeview", "show", "records.toml", "--desc"]);
    assert!(result.is_err());
}

#[rstest]
#[case("--sort")]
#[case("--group")]
#[case("--filter")]
#[case("--children")]
fn given_blank_field_name_when_building_overlay_then_invalid_args(#[case] flag: &str) {
    let cli = Cli::try_parse_from(["treeview", "show", "records.toml", flag, " "]).expect("parse");
    let Some(Commands::Show { view, .. }) = cli.command else {
        panic!("expected show command");
    };

    let error = view.overlay().expect_err("blank field");

    assert!(matches!(error, CliError::InvalidArgs(_)));
    assert_eq!(error.exit_code(), exitcode::USAGE);
}

#[test]
fn given_config_template_when_parsing_then_selects_template() {
    let cli = Cli::try_parse_from(["treeview", "-dd", "config", "template"]).expect("parse");

    assert_eq!(cli.debug, 2);
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommands::Template
        })
    ));
}
