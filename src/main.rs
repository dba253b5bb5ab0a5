use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;

use nodeshade::{GraphDescription, HeadlessBackend, NodeRegistry, Precision};

/// Compile a JSON shader graph to GLSL and print both stages.
#[derive(Debug, Parser)]
#[command(name = "nodeshade", version, about)]
struct Args {
    /// Graph description to compile.
    graph: PathBuf,

    /// Override the GLSL version of the description's target.
    #[arg(long)]
    version_number: Option<u32>,

    /// Generate GLSL ES.
    #[arg(long)]
    es: bool,

    /// Desktop profile appended to the version line.
    #[arg(long)]
    profile: Option<String>,

    /// Float precision for ES targets (low, medium, high).
    #[arg(long, value_parser = parse_precision)]
    precision: Option<Precision>,

    /// Print sources without line numbers.
    #[arg(long)]
    raw: bool,

    /// Re-emit the loaded graph as JSON instead of compiling it.
    #[arg(long)]
    dump_graph: bool,
}

fn parse_precision(value: &str) -> Result<Precision, String> {
    match value {
        "low" => Ok(Precision::Low),
        "medium" => Ok(Precision::Medium),
        "high" => Ok(Precision::High),
        other => Err(format!("unknown precision `{other}`")),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let json = std::fs::read_to_string(&args.graph)
        .with_context(|| format!("reading {}", args.graph.display()))?;
    let mut description = GraphDescription::from_json(&json)
        .with_context(|| format!("parsing {}", args.graph.display()))?;

    if let Some(version) = args.version_number {
        description.target.version = version;
    }
    if args.es {
        description.target.es = true;
        description.target.profile = None;
    }
    if let Some(profile) = args.profile {
        description.target.profile = Some(profile);
    }
    if let Some(precision) = args.precision {
        description.target.float_precision = precision;
    }

    if args.dump_graph {
        println!("{}", description.to_json_pretty()?);
        return Ok(());
    }

    let mut program = description.into_program(&NodeRegistry::new())?;
    let mut backend = HeadlessBackend::new();
    let compiled = program.build(&mut backend)?;

    if args.raw {
        print!("{}{}", program.vertex_source(), program.fragment_source());
    } else {
        print!("{}", program.source_code());
    }

    if !compiled {
        bail!("generated program did not link:\n{}", program.log());
    }
    log::info!(
        "compiled {} nodes for {}",
        program.graph().len(),
        program.target().version_line().trim_end()
    );
    Ok(())
}
