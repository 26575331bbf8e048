// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `graft`: run the fusion pass over a JSON graph document.
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use graft_pass::{FusionPass, GraphDocument, PassConfig};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Graph document to optimize
    graph: PathBuf,

    /// Pass config (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the rewritten graph; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the pass report (JSON) here
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Log each rejected anchor
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            PassConfig::from_json(&raw)?
        }
        None => PassConfig::default(),
    };
    let raw = fs::read_to_string(&args.graph)
        .with_context(|| format!("reading graph {}", args.graph.display()))?;
    let mut graph = GraphDocument::from_json(&raw)?.into_graph()?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph loaded"
    );

    let pass = FusionPass::new(config)?;
    let report = pass.run(&mut graph)?;

    let out = GraphDocument::from_graph(&graph).to_json()?;
    match &args.output {
        Some(path) => fs::write(path, out)
            .with_context(|| format!("writing graph {}", path.display()))?,
        None => writeln!(io::stdout().lock(), "{out}")?,
    }
    if let Some(path) = &args.report {
        fs::write(path, report.to_json()?)
            .with_context(|| format!("writing report {}", path.display()))?;
    }
    Ok(())
}
