//! CLI commands for scout-import

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rustc_hash::FxHashSet;
use std::path::PathBuf;

use crate::area_index::{AreaDataFile, AreaIndex};
use crate::config::ImportParameter;
use crate::formats::names;
use crate::geo::GeoBox;
use crate::pipeline::{run_import, STAGES};
use crate::types::{TypeConfig, TypeId};

#[derive(Parser)]
#[command(name = "scout-import")]
#[command(about = "Offline map import: way consolidation and area indexing", long_about = None)]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run import steps over a prepared destination directory
    Import(ImportArgs),

    /// List areas whose index cells intersect a bounding box
    Query {
        /// Directory holding areaarea.idx and areas.dat
        #[arg(short, long)]
        destination: PathBuf,

        /// min_lat,min_lon,max_lat,max_lon
        #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true)]
        bbox: GeoBox,

        /// Deepest index level to visit (defaults to the index's own)
        #[arg(long)]
        max_level: Option<u32>,

        /// Restrict to these type names
        #[arg(long = "type")]
        types: Vec<String>,
    },

    /// Print the import steps with their files
    Stages,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Directory with the raw import files; outputs are written here too
    #[arg(short, long)]
    pub destination: Option<PathBuf>,

    /// TOML file with import parameters
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub start_step: Option<u32>,

    #[arg(long)]
    pub end_step: Option<u32>,

    /// Way fragments per merge block
    #[arg(long)]
    pub raw_way_block_size: Option<usize>,

    /// Node references per merge block
    #[arg(long)]
    pub raw_coord_block_size: Option<usize>,

    /// Memory map coord.dat instead of reading through the file
    #[arg(long)]
    pub coord_data_mmap: bool,

    #[arg(long)]
    pub area_index_max_level: Option<u32>,
}

impl ImportArgs {
    /// Parameters from the config file (or defaults) with flags applied on top
    pub fn parameters(&self) -> Result<ImportParameter> {
        let mut params = match &self.config {
            Some(path) => ImportParameter::load(path)?,
            None => ImportParameter::default(),
        };
        if let Some(dest) = &self.destination {
            params.destination = dest.clone();
        }
        if let Some(step) = self.start_step {
            params.start_step = step;
        }
        if let Some(step) = self.end_step {
            params.end_step = step;
        }
        if let Some(size) = self.raw_way_block_size {
            params.raw_way_block_size = size;
        }
        if let Some(size) = self.raw_coord_block_size {
            params.raw_coord_block_size = size;
        }
        if self.coord_data_mmap {
            params.coord_data_memory_mapped = true;
        }
        if let Some(level) = self.area_index_max_level {
            params.area_index_max_level = level;
        }
        params.validate()?;
        Ok(params)
    }
}

fn parse_bbox(s: &str) -> std::result::Result<GeoBox, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<std::result::Result<_, _>>()?;
    let [min_lat, min_lon, max_lat, max_lon] = values[..] else {
        return Err(format!("expected 4 comma separated values, got {}", values.len()));
    };
    let bbox = GeoBox::new(min_lat, min_lon, max_lat, max_lon);
    if !bbox.is_valid() {
        return Err("minimum exceeds maximum".to_string());
    }
    Ok(bbox)
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Import(args) => {
                let params = args.parameters()?;
                tracing::debug!(params = ?params, "import parameters");
                let report = run_import(&params)?;
                println!("✅ Import finished, {} step(s) run", report.locks.len());
                Ok(())
            }

            Commands::Query {
                destination,
                bbox,
                max_level,
                types,
            } => {
                let type_filter = if types.is_empty() {
                    None
                } else {
                    let config = TypeConfig::load(destination.join(names::TYPES))?;
                    Some(resolve_types(&config, &types)?)
                };

                let mut index = AreaIndex::open(destination.join(names::AREA_INDEX))?;
                let max_level = max_level.unwrap_or(index.max_level());
                let spans = index.query(&bbox, max_level, type_filter.as_ref())?;

                let mut data = AreaDataFile::open(destination.join(names::AREAS))?;
                let mut total = 0u64;
                for span in &spans {
                    for area in data.read_span(span)? {
                        let extent = area
                            .bbox()
                            .map(|b| {
                                format!(
                                    "{:.6},{:.6},{:.6},{:.6}",
                                    b.min_lat, b.min_lon, b.max_lat, b.max_lon
                                )
                            })
                            .unwrap_or_default();
                        println!("{}\t{}\t{}", area.id, area.type_id, extent);
                        total += 1;
                    }
                }
                println!("{} areas in {} spans", total, spans.len());
                Ok(())
            }

            Commands::Stages => {
                for stage in STAGES.iter() {
                    println!("Step {}: {} - {}", stage.step, stage.name, stage.description);
                    println!("  in:  {}", stage.inputs.join(", "));
                    println!("  out: {}", stage.outputs.join(", "));
                }
                Ok(())
            }
        }
    }
}

fn resolve_types(config: &TypeConfig, type_names: &[String]) -> Result<FxHashSet<TypeId>> {
    let mut ids = FxHashSet::default();
    for name in type_names {
        let Some(info) = config.iter().find(|t| &t.name == name) else {
            bail!("Unknown type {name:?}");
        };
        ids.insert(info.id);
    }
    Ok(ids)
}
