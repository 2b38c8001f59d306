//! Integration test: Loading local sources under a project root

use std::fs;

use visualdata::loading::{DataLoader, LoadOptions, LoadedData};
use visualdata::VisualDataError;

#[test]
fn test_traversal_is_denied_before_dispatch() {
    let tmp = tempfile::tempdir().unwrap();
    let loader = DataLoader::new(tmp.path());

    assert!(matches!(loader.load("../../etc/passwd"), Err(VisualDataError::AccessDenied(_))));
    // No extension would otherwise be UnsupportedFormat; containment is checked first.
    assert!(matches!(loader.load("../secrets"), Err(VisualDataError::AccessDenied(_))));
    assert!(matches!(loader.load("..\\..\\boot.ini"), Err(VisualDataError::AccessDenied(_))));
}

#[test]
fn test_semicolon_delimiter_detected() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("euro.csv"), "name;price;qty\napple;1.5;3\npear;2.25;1\n").unwrap();

    let frame = DataLoader::new(tmp.path()).load_frame("euro.csv").unwrap();
    assert_eq!(frame.column_names(), vec!["name", "price", "qty"]);
    assert_eq!(frame.height(), 2);
    assert_eq!(frame.keys(), &[0, 1]);
}

#[test]
fn test_nested_directory_and_tsv() {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("data/raw")).unwrap();
    fs::write(tmp.path().join("data/raw/m.tsv"), "a\tb\n1\t2\n3\t4\n").unwrap();

    let loader = DataLoader::new(tmp.path());
    let frame = loader.load_frame("data/./raw/../raw/m.tsv").unwrap();
    assert_eq!(frame.width(), 2);
}

#[test]
fn test_json_and_yaml_records() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(
        tmp.path().join("people.json"),
        r#"[{"name": "ann", "address": {"city": "Oslo"}}, {"name": "bo", "address": {"city": "Rome"}}]"#,
    )
    .unwrap();
    fs::write(tmp.path().join("people.yaml"), "- name: ann\n  age: 31\n- name: bo\n  age: 40\n").unwrap();

    let loader = DataLoader::new(tmp.path());
    let json = loader.load_frame("people.json").unwrap();
    assert_eq!(json.column_names(), vec!["name", "address.city"]);
    let yaml = loader.load_frame("people.yaml").unwrap();
    assert_eq!(yaml.height(), 2);
    assert!(yaml.has_column("age"));
}

#[test]
fn test_missing_file_and_unknown_extension() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("notes.docx"), "x").unwrap();
    let loader = DataLoader::new(tmp.path());

    assert!(matches!(loader.load("absent.csv"), Err(VisualDataError::NotFound(_))));
    assert!(matches!(loader.load("notes.docx"), Err(VisualDataError::UnsupportedFormat(_))));
}

#[test]
fn test_text_source_is_not_a_table() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("readme.txt"), "one\ntwo\n").unwrap();
    let loader = DataLoader::new(tmp.path());

    match loader.load("readme.txt").unwrap() {
        LoadedData::Text(text) => assert_eq!(text.lines().count(), 2),
        other => panic!("expected text, got {}", other.kind()),
    }
    assert!(matches!(loader.load_frame("readme.txt"), Err(VisualDataError::InvalidInput(_))));
}

#[test]
fn test_sql_source_requires_query() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("q.sql"), "").unwrap();
    let loader = DataLoader::new(tmp.path());

    assert!(matches!(
        loader.load_with("q.sql", &LoadOptions::default()),
        Err(VisualDataError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        loader.load_with("q.sql", &LoadOptions::default().with_sql("../outside.db", "SELECT 1")),
        Err(VisualDataError::AccessDenied(_))
    ));
}

#[test]
fn test_remote_scheme_and_private_hosts_rejected() {
    let loader = DataLoader::new(".");
    assert!(matches!(
        loader.load("http://127.0.0.1:9/data.csv"),
        Err(VisualDataError::AccessDenied(_))
    ));
    assert!(matches!(
        loader.load("http://localhost/data.csv"),
        Err(VisualDataError::AccessDenied(_))
    ));
    assert!(matches!(
        loader.load("http://"),
        Err(VisualDataError::SourceUnreachable(_))
    ));
}
