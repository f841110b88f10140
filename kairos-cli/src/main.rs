//! Kairos CLI: evaluate and inspect indicator graphs described in TOML.
//!
//! Commands:
//! - `eval`: build a graph and print one node's results over a range of indices
//! - `describe`: build a graph and list its nodes with their domains

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use kairos_core::registry::QueryValue;
use kairos_core::{BuiltGraph, Engine, Granularity, GraphSpec, IndexDomain, IndexKey};
use log::{debug, LevelFilter};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "kairos", about = "Kairos CLI: lazy indicator graphs over append-only series")]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one node over consecutive indices.
    Eval {
        /// Path to a TOML graph file.
        #[arg(long)]
        graph: PathBuf,

        /// Node id to evaluate.
        #[arg(long)]
        node: String,

        /// First index: an integer (instant seconds for time nodes) or an
        /// RFC 3339 timestamp.
        #[arg(long, allow_hyphen_values = true)]
        from: String,

        /// Number of consecutive indices to evaluate.
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
    /// List the nodes of a graph.
    Describe {
        /// Path to a TOML graph file.
        #[arg(long)]
        graph: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

/// One evaluated index.
#[derive(Debug, Serialize)]
struct Row {
    index: String,
    raw: i64,
    time: Option<String>,
    status: &'static str,
    value: Option<f64>,
}

#[derive(Debug, Serialize)]
struct DescribeRow {
    id: String,
    handle: u64,
    kind: &'static str,
    index: IndexDomain,
    value: String,
    granularity: Option<i64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Eval {
            graph,
            node,
            from,
            count,
            format,
        } => run_eval(&graph, &node, &from, count, format),
        Commands::Describe { graph, format } => run_describe(&graph, format),
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp_millis().init();
}

fn load_graph(path: &Path) -> Result<(Engine, BuiltGraph)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read graph file {}", path.display()))?;
    let spec = GraphSpec::from_toml_str(&text)
        .with_context(|| format!("failed to parse graph file {}", path.display()))?;

    let mut engine = Engine::new();
    let built = engine
        .load(&spec)
        .with_context(|| format!("failed to build graph {}", path.display()))?;
    debug!(
        "loaded {} nodes from {} (fingerprint {})",
        built.len(),
        path.display(),
        built.fingerprint
    );
    Ok((engine, built))
}

/// Accept a bare integer or an RFC 3339 timestamp.
fn parse_index(raw: &str) -> Result<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n);
    }
    let dt = raw
        .parse::<DateTime<Utc>>()
        .with_context(|| format!("'{raw}' is neither an integer nor an RFC 3339 timestamp"))?;
    Ok(dt.timestamp())
}

fn status_label(value: &QueryValue) -> &'static str {
    match value {
        QueryValue::Pending => "pending",
        QueryValue::Invalid => "invalid",
        QueryValue::Absent => "absent",
        _ => "ready",
    }
}

fn row(key: IndexKey, value: QueryValue) -> Row {
    let time = match key {
        IndexKey::Time { instant, .. } => {
            DateTime::<Utc>::from_timestamp(instant, 0).map(|dt| dt.to_rfc3339())
        }
        IndexKey::Transaction { .. } | IndexKey::Tick { .. } => None,
    };
    Row {
        index: key.to_string(),
        raw: key.raw(),
        time,
        status: status_label(&value),
        value: value.number(),
    }
}

fn run_eval(graph: &Path, node: &str, from: &str, count: usize, format: Format) -> Result<()> {
    let (engine, built) = load_graph(graph)?;
    let Some(handle) = built.handle(node) else {
        let known: Vec<&str> = built.ids().map(|(id, _)| id).collect();
        bail!("no node '{node}' in graph (known: {})", known.join(", "));
    };

    let info = engine.node_info(handle)?;
    let granularity = info.granularity.map(Granularity::new);
    let start = IndexKey::from_raw(info.index, parse_index(from)?, granularity)
        .with_context(|| format!("node '{node}' is time-indexed but has no granularity"))?;

    let mut rows = Vec::with_capacity(count);
    for step in 0..count as i64 {
        let key = start.advance(step);
        let value = engine
            .query(handle, key)
            .with_context(|| format!("failed to evaluate '{node}' at {key}"))?;
        rows.push(row(key, value));
    }
    write_rows(&rows, format)
}

fn run_describe(graph: &Path, format: Format) -> Result<()> {
    let (engine, built) = load_graph(graph)?;

    let mut rows = Vec::with_capacity(built.len());
    for (id, handle) in built.ids() {
        let info = engine.node_info(handle)?;
        rows.push(DescribeRow {
            id: id.to_string(),
            handle: handle.raw(),
            kind: info.kind,
            index: info.index,
            value: info.value.to_string(),
            granularity: info.granularity,
        });
    }

    match format {
        Format::Json => {
            let out = serde_json::json!({
                "fingerprint": built.fingerprint,
                "nodes": rows,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Format::Csv => {
            eprintln!("fingerprint: {}", built.fingerprint);
            write_rows(&rows, format)
        }
    }
}

fn write_rows<T: Serialize>(rows: &[T], format: Format) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, rows)?;
            writeln!(out)?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
