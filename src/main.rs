//! vital-forest command line entry point.
//!
//! ```text
//! vital-forest [CONFIG] [--load N]
//! ```
//!
//! Without `--load` a new model is trained and registered; with it the Nth
//! registered model is re-scored instead.

use std::path::PathBuf;

use anyhow::{bail, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vital_forest::config::PipelineConfig;
use vital_forest::pipeline::{Pipeline, RunMode};
use vital_forest::registry::Ordinal;

struct Args {
    config: Option<PathBuf>,
    mode: RunMode,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut config = None;
    let mut mode = RunMode::Train;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--load" => {
                let value = args.next().context("--load needs a model number")?;
                let ordinal: Ordinal = value.parse()?;
                mode = RunMode::Load(ordinal);
            }
            "-h" | "--help" => {
                println!("usage: vital-forest [CONFIG] [--load N]");
                std::process::exit(0);
            }
            flag if flag.starts_with('-') => bail!("unknown option {flag}"),
            path if config.is_none() => config = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {extra}"),
        }
    }

    Ok(Args { config, mode })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vital_forest=info,warn")),
        )
        .init();

    let args = parse_args()?;
    let config_path = PipelineConfig::resolve_path(args.config);
    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    info!(
        config = %config_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "vital-forest starting"
    );

    let report = Pipeline::new(config).run(args.mode)?;

    info!(
        train_accuracy = report.training.train_accuracy,
        test_accuracy = report.training.test_accuracy,
        "{}",
        report.training.model_name
    );
    for feature in &report.top_features {
        println!("{feature}");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
