//! RSDM Command Line Interface
//!
//! A command-line interface for training, evaluating, and using Support
//! Distribution Machine models on grouped CSV data.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use rsdm::api::{default_c_values, SDM};
use rsdm::core::{Result, SDMError, SolverModel};
use rsdm::data::GroupDataset;
use rsdm::divergence::GaussianL2Divergence;
use rsdm::kernel::{GaussianKernelGroup, Projection};
use rsdm::persistence::SerializableModel;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "rsdm")]
#[command(about = "Support Distribution Machines: classify groups of samples")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "RSDM Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new SDM model
    Train(TrainArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on labeled test data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (CSV: group_id,label,x1..xd)
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Candidate Gaussian kernel bandwidths
    #[arg(long, value_delimiter = ',', default_value = "0.125,0.25,0.5,1,2,4,8")]
    sigma: Vec<f64>,

    /// Multiply each bandwidth by the median training divergence
    #[arg(long)]
    scale_sigma: bool,

    /// Candidate regularization parameters (default: 2^-5, 2^-3, ..., 2^15)
    #[arg(short = 'C', long = "c", value_delimiter = ',')]
    c: Vec<f64>,

    /// Number of cross-validation folds
    #[arg(long, default_value = "10")]
    folds: usize,

    /// Projection applied to training kernel matrices
    #[arg(long, default_value = "psd")]
    projection: CliProjection,

    /// Fit probability estimates
    #[arg(long)]
    probability: bool,

    /// Convergence tolerance
    #[arg(short, long, default_value = "0.001")]
    epsilon: f64,

    /// Maximum SMO iterations per binary problem
    #[arg(short, long, default_value = "10000000")]
    max_iterations: usize,

    /// Stop model selection after this many seconds
    #[arg(long)]
    time_budget: Option<u64>,

    /// Cross-validate C values in parallel
    #[arg(long)]
    parallel: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliProjection {
    /// Clamp negative eigenvalues
    #[value(name = "psd")]
    Psd,
    /// Nearest matrix with unit diagonal
    #[value(name = "covariance")]
    Covariance,
}

impl From<CliProjection> for Projection {
    fn from(cli_projection: CliProjection) -> Self {
        match cli_projection {
            CliProjection::Psd => Projection::Psd,
            CliProjection::Covariance => Projection::Covariance,
        }
    }
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Labeled test data file
    #[arg(long)]
    data: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Training SDM model...");
    info!("Data file: {:?}", args.data);

    let dataset = GroupDataset::from_file(&args.data)?;
    let labels = dataset.labels()?;
    info!(
        "Loaded {} groups with {} dimensions",
        dataset.len(),
        dataset.dim()
    );

    let c_values = if args.c.is_empty() {
        default_c_values()
    } else {
        args.c.clone()
    };
    info!(
        "Grid: sigma={:?} (scaled: {}), C={:?}, folds={}",
        args.sigma, args.scale_sigma, c_values, args.folds
    );

    let kernel_group = GaussianKernelGroup::new(args.sigma.clone(), args.scale_sigma)
        .with_projection(args.projection.into());
    let mut sdm = SDM::new(kernel_group, GaussianL2Divergence::new())
        .with_c_values(c_values)
        .with_folds(args.folds)
        .with_epsilon(args.epsilon)
        .with_max_iterations(args.max_iterations)
        .with_probability(args.probability)
        .with_parallel(args.parallel);
    if let Some(seconds) = args.time_budget {
        sdm = sdm.with_time_budget(Duration::from_secs(seconds));
    }

    let model = sdm.train(dataset.groups(), &labels)?;

    info!("Training completed successfully");
    let model_info = model.info();
    info!("Kernel: {}, C: {}", model_info.kernel, model_info.c);
    info!("Support vectors: {}", model_info.n_support_vectors);

    let serializable = SerializableModel::from_trained(&model);
    serializable.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    let accuracy = model.evaluate(dataset.groups(), &labels)?;
    info!("Training accuracy: {:.2}%", accuracy * 100.0);

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model: SerializableModel = SerializableModel::load_from_file(&args.model)?;
    let model = serializable_model.into_trained(GaussianL2Divergence::new())?;

    info!("Loading prediction data from: {:?}", args.data);
    let dataset = GroupDataset::from_file(&args.data)?;
    let (labels, values) = model.predict(dataset.groups())?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(SDMError::IoError)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    writeln!(writer, "# Predictions for {} groups", labels.len()).map_err(SDMError::IoError)?;
    writeln!(writer, "# Format: group_id predicted_label values...").map_err(SDMError::IoError)?;
    for ((id, label), row) in dataset.ids().iter().zip(&labels).zip(&values) {
        let row: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
        writeln!(writer, "{} {} {}", id, label, row.join(" ")).map_err(SDMError::IoError)?;
    }
    writer.flush().map_err(SDMError::IoError)?;

    if let Some(path) = &args.output {
        info!("Predictions saved to: {path:?}");
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model: SerializableModel = SerializableModel::load_from_file(&args.model)?;

    info!("Loading test data from: {:?}", args.data);
    let dataset = GroupDataset::from_file(&args.data)?;
    let labels = dataset.labels()?;

    println!("=== Model Evaluation ===");
    serializable_model.print_summary();

    let model = serializable_model.into_trained(GaussianL2Divergence::new())?;
    let accuracy = model.evaluate(dataset.groups(), &labels)?;

    println!("\nTest Results:");
    println!("  Groups: {}", dataset.len());
    println!("  Accuracy: {:.2}%", accuracy * 100.0);

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable_model: SerializableModel = SerializableModel::load_from_file(&args.model)?;

    serializable_model.print_summary();

    println!("\nPairwise Models:");
    let classes = serializable_model.solver_model.classes();
    for pair in serializable_model.solver_model.pairs() {
        println!(
            "  {} vs {}: {} support groups, rho {:.6}",
            classes[pair.positive],
            classes[pair.negative],
            pair.support.len(),
            pair.rho
        );
    }

    Ok(())
}
