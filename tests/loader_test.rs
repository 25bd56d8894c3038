//! Tests for loading records and scripts from disk

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use treeview::application::Step;
use treeview::config::Settings;
use treeview::domain::{FieldAccess, Value};
use treeview::infrastructure::di::ServiceContainer;
use treeview::infrastructure::traits::RealFileSystem;
use treeview::infrastructure::{InfraError, Loader};

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

const RECORDS: &str = r#"
[[records]]
id = 1
pid = 0
name = "docs"

[[records]]
id = 10
pid = 1
name = "guide"

[[records]]
id = 2
pid = 0
name = "src"
"#;

#[test]
fn given_records_file_when_loading_then_keeps_source_order() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "records.toml", RECORDS);
    let loader = Loader::new(Arc::new(RealFileSystem));

    // Act
    let records = loader.load_records(&path).expect("load records");

    // Assert
    let keys: Vec<Option<Value>> = records.iter().map(|r| r.field("id")).collect();
    assert_eq!(keys, vec![Some(Value::Int(1)), Some(Value::Int(10)), Some(Value::Int(2))]);
    assert_eq!(records[1].field("name"), Some(Value::from("guide")));
}

#[test]
fn given_script_file_when_loading_then_reads_steps() {
    let temp = TempDir::new().unwrap();
    let path = write(
        &temp,
        "script.toml",
        r#"
[[steps]]
op = "move"
from = 0
to = 1

[[steps]]
op = "resume"
"#,
    );
    let loader = Loader::new(Arc::new(RealFileSystem));

    let script = loader.load_script(&path).expect("load script");

    assert_eq!(script.steps, vec![Step::Move { from: 0, to: 1 }, Step::Resume]);
}

#[test]
fn given_missing_file_when_loading_then_reports_io_error() {
    let temp = TempDir::new().unwrap();
    let loader = Loader::new(Arc::new(RealFileSystem));

    let result = loader.load_records(&temp.path().join("absent.toml"));

    assert!(matches!(result, Err(InfraError::Io { .. })));
}

#[test]
fn given_invalid_toml_when_loading_then_reports_parse_error_with_path() {
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "broken.toml", "[[records]]\nid = ");
    let loader = Loader::new(Arc::new(RealFileSystem));

    let result = loader.load_records(&path);

    match result {
        Err(InfraError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn given_container_when_building_live_tree_then_applies_settings() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write(&temp, "records.toml", RECORDS);
    let settings = Settings {
        root_key: Some(Value::Int(0)),
        root_enumerable: true,
        ..Settings::default()
    };

    // Act
    let tree = ServiceContainer::new(settings)
        .live_tree(&path)
        .expect("live tree");

    // Assert
    let uids: Vec<&str> = tree
        .projection()
        .enumerate()
        .map(|(_, node)| node.uid())
        .collect();
    assert_eq!(uids, vec!["0", "1", "10:1", "2"]);
}

#[test]
fn given_directory_when_loading_then_reports_io_error_other_than_not_found() {
    let temp = TempDir::new().unwrap();
    let loader = Loader::new(Arc::new(RealFileSystem));

    let result = loader.load_records(temp.path());

    match result {
        Err(InfraError::Io { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput)
        }
        other => panic!("expected io error, got {other:?}"),
    }
}
