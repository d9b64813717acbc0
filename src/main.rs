use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use rom_eval::workflow::{run_evaluate, run_scale, EvaluateConfig, ParamSource, ScaleConfig};

#[derive(Parser)]
#[command(name = "rom_eval")]
#[command(about = "Reconstruction error statistics for reduced-order autoencoders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ParamArgs {
    /// JSON file with net_dir, net_run, scaling_type and scaler_number
    #[arg(long)]
    params: Option<PathBuf>,
    /// Overrides net_dir from the params file
    #[arg(long)]
    net_dir: Option<String>,
    /// Overrides net_run from the params file
    #[arg(long)]
    net_run: Option<String>,
}

impl From<ParamArgs> for ParamSource {
    fn from(args: ParamArgs) -> Self {
        Self {
            params: args.params,
            net_dir: args.net_dir,
            net_run: args.net_run,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the configured scaling on a snapshot matrix and store the scaled data.
    Scale {
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "U")]
        key: String,
        #[arg(long)]
        out_npz: PathBuf,
        #[arg(long)]
        out_scaler: PathBuf,
    },
    /// Compare a reconstruction against ground truth and report the error statistics.
    Evaluate {
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long)]
        npz: PathBuf,
        /// Fitted scaler JSON; without it the matrices are taken as physical units
        #[arg(long)]
        scaler: Option<PathBuf>,
        #[arg(long, default_value = "ground_truth")]
        reference_key: String,
        #[arg(long, default_value = "prediction")]
        prediction_key: String,
        #[arg(long, default_value = "U")]
        field: String,
        #[arg(long)]
        out_json: Option<PathBuf>,
    },
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

fn cmd_scale(params: ParamArgs, config: ScaleConfig) -> Result<()> {
    let params = ParamSource::from(params).resolve()?;
    run_scale(&params, &config)?;
    println!("Saved scaled data: {}", config.out_npz.display());
    println!("Saved scaler     : {}", config.out_scaler.display());
    Ok(())
}

fn cmd_evaluate(params: ParamArgs, config: EvaluateConfig) -> Result<()> {
    let params = ParamSource::from(params).resolve()?;
    let outcome = run_evaluate(&params, &config)?;
    println!("Saved relative errors: {}", outcome.relative_errors.display());
    if let Some(report) = outcome.report {
        println!("Wrote report: {}", report.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scale {
            params,
            input,
            key,
            out_npz,
            out_scaler,
        } => cmd_scale(
            params,
            ScaleConfig {
                input,
                key,
                out_npz,
                out_scaler,
            },
        ),
        Commands::Evaluate {
            params,
            npz,
            scaler,
            reference_key,
            prediction_key,
            field,
            out_json,
        } => cmd_evaluate(
            params,
            EvaluateConfig {
                npz,
                scaler,
                reference_key,
                prediction_key,
                field,
                out_json,
            },
        ),
    }
}
