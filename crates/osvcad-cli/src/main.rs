//! osvcad CLI - build, inspect and view assemblies.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use osvcad::{Assembly, NodeSource, PartSources};
use osvcad_kernel::{CsgKernel, CsgShape};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod viewer;

use config::AssemblyConfig;
use viewer::{Palette, TerminalViewer};

#[derive(Parser)]
#[command(name = "osvcad")]
#[command(about = "Assemble parts into a placement DAG", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an assembly file and write its interchange formats
    Build {
        /// Assembly file (.toml)
        assembly: PathBuf,
        /// Write a JSON snapshot here
        #[arg(long)]
        json: Option<PathBuf>,
        /// Write a YAML graph description here
        #[arg(long)]
        yaml: Option<PathBuf>,
    },
    /// Display information about a JSON snapshot
    Info {
        /// Snapshot file (.json)
        snapshot: PathBuf,
    },
    /// Build an assembly file and show it in the terminal viewer
    Show {
        /// Assembly file (.toml)
        assembly: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            assembly,
            json,
            yaml,
        } => build(&assembly, json.as_deref(), yaml.as_deref())?,
        Commands::Info { snapshot } => show_info(&snapshot)?,
        Commands::Show { assembly } => show(&assembly)?,
    }

    Ok(())
}

fn load_assembly(path: &Path, kernel: &CsgKernel) -> Result<Assembly<CsgShape>> {
    let config = AssemblyConfig::load(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("assembly");
    config.build(base_dir, &PartSources::new(kernel), stem)
}

fn build(path: &Path, json: Option<&Path>, yaml: Option<&Path>) -> Result<()> {
    let kernel = CsgKernel::new();
    let assembly = load_assembly(path, &kernel)?;
    osvcad::resolve_all(&assembly, &kernel).context("resolving placements")?;
    info!(
        nodes = assembly.node_count(),
        edges = assembly.edge_count(),
        "assembly built"
    );

    println!(
        "Built '{}': {} nodes, {} edges",
        assembly.name(),
        assembly.node_count(),
        assembly.edge_count()
    );
    if let Some(out) = json {
        osvcad::write_json(&assembly, out)?;
        println!("Wrote snapshot to {}", out.display());
    }
    if let Some(out) = yaml {
        osvcad::write_yaml(&assembly, out)?;
        println!("Wrote graph description to {}", out.display());
    }
    Ok(())
}

fn source_label(source: &NodeSource) -> String {
    match source {
        NodeSource::Script { path } => format!("script {}", path.display()),
        NodeSource::Step { path } => format!("step {}", path.display()),
        NodeSource::Library { library, part_id } => {
            format!("library {} [{part_id}]", library.display())
        }
        NodeSource::Direct => "direct".to_string(),
    }
}

fn show_info(path: &Path) -> Result<()> {
    let assembly: Assembly<CsgShape> = osvcad::read_json(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;

    println!("Assembly: {}", assembly.name());
    println!("Nodes: {}", assembly.node_count());
    for (id, node) in assembly.nodes() {
        println!(
            "  {id} {} ({}), {} anchors, {} csg nodes",
            node.name(),
            source_label(node.source()),
            node.anchors().len(),
            node.shape().node_count()
        );
        for (key, anchor) in node.anchors() {
            println!(
                "    {key}: {} (dimension {})",
                anchor.description(),
                anchor.dimension()
            );
        }
    }
    println!("Edges: {}", assembly.edge_count());
    for edge in assembly.edges() {
        let t = edge.placement.transform.translation_part();
        println!(
            "  {} {} -> {} translate ({}, {}, {})",
            edge.id, edge.source, edge.target, t.x, t.y, t.z
        );
    }
    Ok(())
}

fn show(path: &Path) -> Result<()> {
    let kernel = CsgKernel::new();
    let assembly = load_assembly(path, &kernel)?;
    let mut palette = Palette::default();
    let mut viewer = TerminalViewer::new(std::io::stdout());
    osvcad::display_assembly(&assembly, &kernel, &mut viewer, || palette.next_color())?;
    Ok(())
}
