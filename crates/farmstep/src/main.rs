use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use farm_core::SimContext;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "farmstep",
    about = "Batch runner for deterministic farm simulations"
)]
struct Args {
    /// Farm input JSON documents, one simulation each.
    #[arg(required = true, value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Directory the configured output directories are nested under.
    #[arg(long, value_name = "PATH")]
    output_root: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut completed = 0usize;

    for input in &args.inputs {
        info!(input = %input.display(), "starting run");
        let outcome = SimContext::from_input_path(input, args.output_root.as_deref())
            .and_then(|mut sim| sim.run());
        match outcome {
            Ok(()) => completed += 1,
            Err(err) => error!(input = %input.display(), "run failed: {err:#}"),
        }
    }

    // partial failures are reported but do not sink the whole batch
    if completed == 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
