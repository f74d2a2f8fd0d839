use clap::Parser;
use cli::args::{Cli, Command};
use cli::commands;

#[test]
fn missing_subcommand_argument_is_rejected_with_a_usage_error() {
    let err = Cli::try_parse_from(["riptide-cli", "put", "onlyrow"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn unknown_subcommand_is_rejected() {
    let err = Cli::try_parse_from(["riptide-cli", "frobnicate"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
}

#[test]
fn no_subcommand_defaults_to_repl() {
    let cli = Cli::try_parse_from(["riptide-cli"]).unwrap();
    assert!(matches!(cli.command, None));
}

#[test]
fn put_then_get_round_trips_through_the_node() {
    let root = tempfile::tempdir().unwrap();
    let node = commands::open_node(root.path(), "default", "default", None).unwrap();

    commands::run(&node, Command::Put { row: "row1".to_string(), value: "hello".to_string() }).unwrap();
    commands::run(&node, Command::Get { row: "row1".to_string() }).unwrap();
}

#[test]
fn delete_then_get_finds_nothing() {
    let root = tempfile::tempdir().unwrap();
    let node = commands::open_node(root.path(), "default", "default", None).unwrap();

    commands::run(&node, Command::Put { row: "row1".to_string(), value: "v1".to_string() }).unwrap();
    commands::run(&node, Command::Delete { row: "row1".to_string() }).unwrap();

    let found = node.get(1, &keycodec::Cell::new(b"row1".to_vec(), b"cf".to_vec(), b"v".to_vec(), engine::LATEST_TIMESTAMP, keycodec::CellType::Put, Vec::new()), 1).unwrap();
    assert!(found.is_empty());
}

#[test]
fn reopening_the_same_data_dir_reuses_the_existing_region() {
    let root = tempfile::tempdir().unwrap();
    {
        let node = commands::open_node(root.path(), "default", "default", None).unwrap();
        commands::run(&node, Command::Put { row: "row1".to_string(), value: "v1".to_string() }).unwrap();
    }

    let reopened = commands::open_node(root.path(), "default", "default", None).unwrap();
    assert_eq!(reopened.region_ids(), vec![1]);
    commands::run(&reopened, Command::Get { row: "row1".to_string() }).unwrap();
}

#[test]
fn flush_and_compact_succeed_on_a_freshly_opened_node() {
    let root = tempfile::tempdir().unwrap();
    let node = commands::open_node(root.path(), "default", "default", None).unwrap();
    commands::run(&node, Command::Put { row: "row1".to_string(), value: "v1".to_string() }).unwrap();
    commands::run(&node, Command::Flush).unwrap();
    commands::run(&node, Command::Compact { major: true }).unwrap();
}

#[test]
fn split_produces_two_new_regions() {
    let root = tempfile::tempdir().unwrap();
    let node = commands::open_node(root.path(), "default", "default", None).unwrap();
    commands::run(&node, Command::Put { row: "a".to_string(), value: "1".to_string() }).unwrap();
    commands::run(&node, Command::Put { row: "z".to_string(), value: "2".to_string() }).unwrap();
    commands::run(&node, Command::Flush).unwrap();

    commands::run(&node, Command::Split { key: "m".to_string() }).unwrap();
    let mut ids = node.region_ids();
    ids.sort();
    assert_eq!(ids, vec![2, 3]);
}
