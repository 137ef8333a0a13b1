//! Order command - print tables in foreign key dependency order.

use super::load_config;
use crate::error::SnapshotError;
use crate::schema::{split_csv, DependencyGraph, TableFilter};
use crate::source::DuckDbSource;
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;

/// JSON output for the order command
#[derive(Serialize)]
struct OrderJsonOutput {
    schema: String,
    order: Vec<String>,
    self_referential: Vec<String>,
    dangling_references: usize,
}

/// Run the order command
#[allow(clippy::too_many_arguments)]
pub fn run(
    database: Option<PathBuf>,
    schema: Option<String>,
    tables: Option<String>,
    exclude: Option<String>,
    config: Option<PathBuf>,
    check: bool,
    reverse: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config.as_ref())?;

    let database = match database.or(config.database) {
        Some(db) => db,
        None => bail!("no database given: pass --database or set `database` in the config file"),
    };
    if !database.exists() {
        bail!("database file does not exist: {}", database.display());
    }
    let schema = schema.or(config.schema).unwrap_or_else(|| "main".to_string());

    let include = match tables.as_deref() {
        Some(t) => split_csv(Some(t)),
        None => config.tables,
    };
    let exclude = match exclude.as_deref() {
        Some(e) => split_csv(Some(e)),
        None => config.exclude,
    };
    let filter = TableFilter::new(&include, &exclude)?;

    let source = DuckDbSource::open(&database)?;

    if !json {
        eprintln!("Analyzing schema '{}' for dependency order...", schema);
    }

    let mut graph = DependencyGraph::discover(&source, &schema)?;
    graph.retain(&filter);

    if graph.is_empty() {
        eprintln!("No tables found in schema '{}'.", schema);
        return Ok(());
    }

    let mut ordered = match graph.topo_sort() {
        Ok(order) => order,
        Err(e @ SnapshotError::CyclicDependency { .. }) => {
            if check {
                eprintln!("Check FAILED: {}", e);
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    if reverse {
        ordered.reverse();
    }

    if check {
        eprintln!(
            "Check PASSED: {} tables can be ordered by their dependencies.",
            ordered.len()
        );
        return Ok(());
    }

    if json {
        let out = OrderJsonOutput {
            schema,
            self_referential: graph
                .self_referential_tables()
                .into_iter()
                .map(String::from)
                .collect(),
            dangling_references: graph.dangling_references(),
            order: ordered,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (i, table) in ordered.iter().enumerate() {
        println!("{:>4}. {}", i + 1, table);
    }

    let self_refs = graph.self_referential_tables();
    if !self_refs.is_empty() {
        eprintln!("\nSelf-referencing tables: {}", self_refs.join(", "));
    }
    if graph.dangling_references() > 0 {
        eprintln!(
            "Skipped {} foreign key(s) pointing outside the schema.",
            graph.dangling_references()
        );
    }

    Ok(())
}
