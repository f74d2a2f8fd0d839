//! Node setup and subcommand execution. One node, one region (id `1`,
//! spanning the whole keyspace, family `cf`, qualifier `v`) — enough surface
//! to exercise every `engine::Node` operation without a catalog.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use config::RegionServerConfig;
use engine::{Node, ScanRequest, SplitRequest, LATEST_TIMESTAMP};
use keycodec::{Cell, CellType};
use observer::{AbortPolicy, ObserverRegistry};
use wal::Durability;

use crate::args::Command;

const FAMILY: &[u8] = b"cf";
const QUALIFIER: &[u8] = b"v";
const ROOT_REGION_ID: u64 = 1;

/// Heap budget the block cache's `size_fraction` is carved out of; the CLI
/// has no larger process to share a heap with, so this is just a constant.
const CACHE_HEAP_BUDGET_BYTES: u64 = 256 * 1024 * 1024;

fn row_cell(row: &str, cell_type: CellType, value: &str) -> Cell {
    Cell::new(row.as_bytes().to_vec(), FAMILY.to_vec(), QUALIFIER.to_vec(), LATEST_TIMESTAMP, cell_type, value.as_bytes().to_vec())
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Opens (or lays out, on first run) the single-region node the CLI drives.
pub fn open_node(data_dir: &Path, namespace: &str, table: &str, config_path: Option<&Path>) -> Result<Node> {
    let mut config = RegionServerConfig::load(config_path).context("loading config")?;
    config::apply_env_overrides(&mut config).context("applying RIPTIDE_* environment overrides")?;
    config.validate().context("validating config")?;

    let cache_capacity_bytes = (CACHE_HEAP_BUDGET_BYTES as f64 * config.block_cache.size_fraction) as u64;
    let observers = Arc::new(ObserverRegistry::new(AbortPolicy::AbortOnError));

    let node = Node::open(data_dir, namespace, table, config, cache_capacity_bytes, observers, None).context("opening node")?;

    if node.region_ids().is_empty() {
        node.create_region(ROOT_REGION_ID, "0000000000000001".to_string(), Vec::new(), Vec::new(), &["cf".to_string()])
            .context("laying out the initial region")?;
    }

    Ok(node)
}

pub fn run(node: &Node, command: Command) -> Result<()> {
    match command {
        Command::Put { row, value } => {
            node.put(ROOT_REGION_ID, row.as_bytes().to_vec(), vec![row_cell(&row, CellType::Put, &value)], Durability::UseDefault)?;
            println!("OK");
        }
        Command::Get { row } => {
            let found = node.get(ROOT_REGION_ID, &row_cell(&row, CellType::Put, ""), 1)?;
            match found.first() {
                Some(cell) => println!("{}", String::from_utf8_lossy(&cell.value)),
                None => println!("(nil)"),
            }
        }
        Command::Delete { row } => {
            node.delete(ROOT_REGION_ID, row.as_bytes().to_vec(), vec![row_cell(&row, CellType::DeleteColumn, "")], Durability::UseDefault)?;
            println!("OK");
        }
        Command::Scan { start, end } => {
            let request = ScanRequest {
                start_row: start.map(|s| s.into_bytes()),
                end_row: end.map(|s| s.into_bytes()),
                ..ScanRequest::default()
            };
            let mut scanner = node.scan(ROOT_REGION_ID, request, now_secs())?;
            let mut total = 0usize;
            loop {
                let rows = scanner.next(64);
                if rows.is_empty() {
                    break;
                }
                for row in &rows {
                    for cell in row {
                        println!("{} -> {}", String::from_utf8_lossy(&cell.row), String::from_utf8_lossy(&cell.value));
                    }
                }
                total += rows.len();
            }
            println!("({total} rows)");
        }
        Command::Flush => {
            node.flush_region(ROOT_REGION_ID)?;
            println!("OK");
        }
        Command::Compact { major } => {
            node.compact_region(ROOT_REGION_ID, major)?;
            println!("OK");
        }
        Command::Split { key } => {
            if key.is_empty() {
                bail!("usage: split <key>");
            }
            let region = node.region(ROOT_REGION_ID)?;
            let max_id = node.region_ids().into_iter().max().unwrap_or(ROOT_REGION_ID);
            let bottom_id = max_id + 1;
            let top_id = max_id + 2;
            let outcome = node.split(SplitRequest {
                region_id: region.region_id(),
                split_key: key.into_bytes(),
                bottom_region_id: bottom_id,
                bottom_encoded_name: format!("{bottom_id:016x}"),
                top_region_id: top_id,
                top_encoded_name: format!("{top_id:016x}"),
            })?;
            println!("OK (bottom={}, top={})", outcome.0.region_id(), outcome.1.region_id());
        }
        Command::Status => {
            println!("{node:?}");
            for region_id in node.region_ids() {
                let region = node.region(region_id)?;
                let info = region.info();
                println!(
                    "region {region_id}: state={:?} start={:?} end={:?} memstore_bytes={}",
                    region.state(),
                    String::from_utf8_lossy(&info.start_key),
                    String::from_utf8_lossy(&info.end_key),
                    region.approx_memstore_size(),
                );
            }
        }
        Command::Repl => unreachable!("handled by the caller before dispatch"),
    }
    Ok(())
}
