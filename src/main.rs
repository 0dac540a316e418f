//! polyparse command line interface
//!
//! Usage:
//!   polyparse [OPTIONS] [FILE]
//!   polyparse --help
//!
//! Examples:
//!   polyparse domain.txt                                  # Read and print
//!   polyparse -e '{ [i] : exists a : i = 2a }' --emit json # Dump the model
//!   polyparse -e '[N] -> { [i] : 0 <= i < N }' --contains 5,3
//!   polyparse --kind pw-aff -e '{ [i] -> [floord(i, 2)] }' --contains 7

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use polyparse::frontend::{Object, Parser as Reader};
use polyparse::polyhedral::{Map, PwAff, UnionMap};
use polyparse::utils::errors::{PolyError, PolyResult};
use polyparse::utils::location::SourceMap;
use polyparse::utils::matrix::Int;
use polyparse::Config;
use std::fs;
use std::path::PathBuf;

/// polyparse - integer set and relation reader
#[derive(Parser, Debug)]
#[command(name = "polyparse")]
#[command(version)]
#[command(about = "Read integer sets, relations and piecewise affine expressions", long_about = None)]
struct Cli {
    /// Input file
    #[arg(value_name = "FILE", required_unless_present = "expr")]
    input: Option<PathBuf>,

    /// Read this text instead of a file
    #[arg(short, long, value_name = "TEXT", conflicts_with = "input")]
    expr: Option<String>,

    /// Kind of object to read (default: set, relation or union as found)
    #[arg(short, long)]
    kind: Option<KindArg>,

    /// What to emit
    #[arg(long, default_value = "text")]
    emit: EmitKind,

    /// Test membership of a point (parameters first, comma-separated)
    #[arg(long, value_delimiter = ',', num_args = 1.., allow_negative_numbers = true)]
    contains: Option<Vec<i64>>,

    /// Bound on the values tried for unknown divisions
    #[arg(long, default_value_t = 32)]
    search_radius: u32,

    /// Keep divisions in the order they were created
    #[arg(long)]
    no_sort_divs: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    /// A relation over a single space
    Map,
    /// A set over a single space
    Set,
    /// A union over any number of spaces
    Union,
    /// A piecewise quasi-affine expression
    PwAff,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// The notation it was read in
    Text,
    /// The constraint model as JSON
    Json,
    /// Counts of pieces, constraints and divisions
    Stats,
}

/// What was read.
enum Value {
    Map(Map),
    Union(UnionMap),
    PwAff(PwAff),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("polyparse v{}", polyparse::VERSION);

    let source = match (&cli.expr, &cli.input) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => {
            debug!("Input file: {:?}", path);
            fs::read_to_string(path).with_context(|| format!("Failed to read input file: {:?}", path))?
        }
        (None, None) => bail!("no input given"),
    };

    let config = Config::default()
        .with_search_radius(cli.search_radius)
        .with_sort_divs(!cli.no_sort_divs);
    debug!("Reader config: {:?}", config);

    let value = read(&source, cli.kind, &config).map_err(|e| diagnose(&source, e))?;

    match cli.emit {
        EmitKind::Text => println!("{}", text(&value)),
        EmitKind::Json => println!("{}", json(&value)?),
        EmitKind::Stats => print!("{}", stats(&value)),
    }

    if let Some(point) = &cli.contains {
        let point: Vec<Int> = point.iter().map(|&v| Int::from(v)).collect();
        println!("{}", query(&value, &point, &config)?);
    }
    Ok(())
}

fn read(source: &str, kind: Option<KindArg>, config: &Config) -> PolyResult<Value> {
    let value = match kind {
        None => match Reader::with_config(source, config.clone()).read_object()? {
            Object::Map(map) => Value::Map(map),
            Object::Union(umap) => Value::Union(umap),
        },
        Some(KindArg::Map) => Value::Map(polyparse::read_map_with(source, config)?),
        Some(KindArg::Set) => Value::Map(polyparse::read_set_with(source, config)?),
        Some(KindArg::Union) => Value::Union(polyparse::read_union_map_with(source, config)?),
        Some(KindArg::PwAff) => Value::PwAff(polyparse::read_pw_aff_with(source, config)?),
    };
    Ok(value)
}

/// Quote the offending source line under the error.
fn diagnose(source: &str, err: PolyError) -> anyhow::Error {
    let context = match err.span().and_then(|span| SourceMap::new(source).snippet(&span)) {
        Some(snippet) => format!("Failed to read input\n{}", snippet),
        None => "Failed to read input".to_string(),
    };
    anyhow::Error::new(err).context(context)
}

fn text(value: &Value) -> String {
    match value {
        Value::Map(map) => map.to_string(),
        Value::Union(umap) => umap.to_string(),
        Value::PwAff(pa) => pa.to_string(),
    }
}

fn json(value: &Value) -> Result<String> {
    let out = match value {
        Value::Map(map) => serde_json::to_string_pretty(map)?,
        Value::Union(umap) => serde_json::to_string_pretty(umap)?,
        Value::PwAff(pa) => serde_json::to_string_pretty(pa)?,
    };
    Ok(out)
}

fn stats(value: &Value) -> String {
    let maps: Vec<&Map> = match value {
        Value::Map(map) => vec![map],
        Value::Union(umap) => umap.maps().iter().collect(),
        Value::PwAff(pa) => {
            let mut out = format!("space: {}\npieces: {}\n", pa.space(), pa.n_piece());
            for (i, (dom, aff)) in pa.pieces().iter().enumerate() {
                out.push_str(&format!(
                    "  piece {}: {} basic sets, {} divisions in expression\n",
                    i,
                    dom.n_basic_map(),
                    aff.local_space().n_div()
                ));
            }
            return out;
        }
    };

    let mut out = String::new();
    for map in maps {
        out.push_str(&format!("space: {}\nbasic relations: {}\n", map.space(), map.n_basic_map()));
        for (i, bmap) in map.basic_maps().iter().enumerate() {
            out.push_str(&format!(
                "  basic {}: {} equalities, {} inequalities, {} divisions\n",
                i,
                bmap.n_eq(),
                bmap.n_ineq(),
                bmap.n_div()
            ));
        }
    }
    out
}

fn query(value: &Value, point: &[Int], config: &Config) -> Result<String> {
    match value {
        Value::Map(map) => {
            check_arity(map.space().total(), point)?;
            Ok(map.contains_with(point, config.search_radius)?.to_string())
        }
        Value::Union(umap) => {
            let mut found = false;
            for map in umap.maps().iter().filter(|m| m.space().total() == point.len()) {
                found |= map.contains_with(point, config.search_radius)?;
            }
            Ok(found.to_string())
        }
        Value::PwAff(pa) => {
            check_arity(pa.space().total(), point)?;
            Ok(match pa.eval(point)? {
                Some(v) => v.to_string(),
                None => "undefined".to_string(),
            })
        }
    }
}

fn check_arity(expected: usize, point: &[Int]) -> Result<()> {
    if expected != point.len() {
        bail!("point has {} coordinates, expected {}", point.len(), expected);
    }
    Ok(())
}
