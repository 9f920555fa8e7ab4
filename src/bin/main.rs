//! medsvm command line interface
//!
//! Trains the per-disease models, inspects persisted artifacts, answers
//! single predictions and runs the HTTP API.

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use medsvm::api::{build_router, AppState};
use medsvm::core::{DiagnosisError, OptimizerConfig, PredictionResult, Result};
use medsvm::kernel::KernelType;
use medsvm::{Disease, ModelStore, PipelineConfig, PredictionService, ScalerFit, TrainingPipeline};
use serde_json::Value;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "medsvm")]
#[command(about = "SVM screening models for diabetes, heart disease and Parkinson's disease")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing diabetes.csv, heart.csv and parkinsons.csv
    #[arg(long, global = true, env = "MEDSVM_DATA_DIR", default_value = "dataset")]
    data_dir: PathBuf,

    /// Directory holding the scaler and model artifacts
    #[arg(long, global = true, env = "MEDSVM_MODEL_DIR", default_value = "models")]
    model_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train and persist the model for one disease, or `all`
    Train(TrainArgs),
    /// Train every kernel family on the same split and report, saving nothing
    CompareKernels(CompareArgs),
    /// Re-score the whole dataset with the persisted model
    Evaluate(DiseaseArg),
    /// Predict a single patient
    Predict(PredictArgs),
    /// Display persisted artifact information
    Info(DiseaseArg),
    /// Run the HTTP prediction API
    Serve(ServeArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// diabetes, heart, parkinsons or all
    target: String,

    #[command(flatten)]
    training: TrainingArgs,
}

#[derive(Args)]
struct CompareArgs {
    disease: Disease,

    #[command(flatten)]
    training: TrainingArgs,
}

#[derive(Args)]
struct DiseaseArg {
    disease: Disease,
}

#[derive(Args)]
#[command(group(ArgGroup::new("input").required(true).args(["values", "json"])))]
struct PredictArgs {
    disease: Disease,

    /// Comma-separated feature values in canonical order
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    values: Option<Vec<f64>>,

    /// JSON object with named fields, as accepted by the HTTP API
    #[arg(long)]
    json: Option<String>,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "MEDSVM_BIND", default_value = "0.0.0.0:5000")]
    bind: String,
}

#[derive(Args)]
struct TrainingArgs {
    /// Seed for the train/test split
    #[arg(long, default_value = "2")]
    seed: u64,

    /// Fraction of rows held out for testing
    #[arg(long, default_value = "0.2")]
    test_ratio: f64,

    /// Kernel function
    #[arg(short, long, default_value = "linear")]
    kernel: CliKernel,

    /// Regularization parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Convergence tolerance
    #[arg(short, long, default_value = "0.001")]
    epsilon: f64,

    /// Maximum passes over the training set
    #[arg(short, long, default_value = "10000")]
    max_iterations: usize,

    /// Kernel cache size in MB
    #[arg(long, default_value = "64")]
    cache_size: usize,

    /// Calibrate probabilities so predictions carry a computed confidence
    #[arg(long)]
    probability: bool,

    /// Rows used to fit the scaler (defaults per disease)
    #[arg(long)]
    scaler_fit: Option<CliScalerFit>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    Linear,
    Poly,
    Rbf,
    Sigmoid,
}

impl From<CliKernel> for KernelType {
    fn from(kernel: CliKernel) -> Self {
        match kernel {
            CliKernel::Linear => KernelType::Linear,
            CliKernel::Poly => KernelType::Poly,
            CliKernel::Rbf => KernelType::Rbf,
            CliKernel::Sigmoid => KernelType::Sigmoid,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliScalerFit {
    /// Fit on every row before splitting
    #[value(name = "full")]
    FullDataset,
    /// Fit on the training split only
    #[value(name = "train")]
    TrainingSplit,
}

impl From<CliScalerFit> for ScalerFit {
    fn from(policy: CliScalerFit) -> Self {
        match policy {
            CliScalerFit::FullDataset => ScalerFit::FullDataset,
            CliScalerFit::TrainingSplit => ScalerFit::TrainingSplit,
        }
    }
}

impl TrainingArgs {
    fn pipeline_config(&self, cli: &Cli) -> PipelineConfig {
        PipelineConfig {
            data_dir: cli.data_dir.clone(),
            model_dir: cli.model_dir.clone(),
            seed: self.seed,
            test_ratio: self.test_ratio,
            kernel: self.kernel.into(),
            optimizer: OptimizerConfig {
                c: self.c,
                epsilon: self.epsilon,
                max_iterations: self.max_iterations,
                cache_size: self.cache_size.saturating_mul(1024 * 1024),
            },
            probability: self.probability,
            scaler_fit: self.scaler_fit.map(Into::into),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match &cli.command {
        Commands::Train(args) => train_command(&cli, args),
        Commands::CompareKernels(args) => compare_command(&cli, args),
        Commands::Evaluate(args) => evaluate_command(&cli, args.disease),
        Commands::Predict(args) => predict_command(&cli, args),
        Commands::Info(args) => info_command(&cli, args.disease),
        Commands::Serve(args) => serve_command(&cli, args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn parse_targets(target: &str) -> Result<Vec<Disease>> {
    if target.eq_ignore_ascii_case("all") {
        Ok(Disease::ALL.to_vec())
    } else {
        Ok(vec![target.parse()?])
    }
}

fn train_command(cli: &Cli, args: &TrainArgs) -> Result<()> {
    let config = args.training.pipeline_config(cli);
    for disease in parse_targets(&args.target)? {
        info!("Training {disease} model...");
        let report = TrainingPipeline::new(disease, config.clone()).run()?;
        println!("{report}");
        println!();
    }
    Ok(())
}

fn compare_command(cli: &Cli, args: &CompareArgs) -> Result<()> {
    let pipeline = TrainingPipeline::new(args.disease, args.training.pipeline_config(cli));
    let comparisons = pipeline.compare_kernels()?;

    for row in &comparisons {
        println!("=== {} kernel ===", row.kernel);
        println!("Training accuracy: {:.4}", row.train_accuracy);
        println!("Test accuracy:     {:.4}", row.test_accuracy);
        println!("Support vectors:   {}", row.n_support_vectors);
        println!();
        println!("{}", row.test_metrics);
        println!();
    }

    if let Some(best) = comparisons
        .iter()
        .max_by(|a, b| a.test_accuracy.total_cmp(&b.test_accuracy))
    {
        println!(
            "Best test accuracy: {} ({:.4})",
            best.kernel, best.test_accuracy
        );
    }
    Ok(())
}

fn evaluate_command(cli: &Cli, disease: Disease) -> Result<()> {
    let store = ModelStore::new(&cli.model_dir);
    let pair = store.load(disease)?;

    let config = PipelineConfig {
        data_dir: cli.data_dir.clone(),
        model_dir: cli.model_dir.clone(),
        ..PipelineConfig::default()
    };
    let report = TrainingPipeline::new(disease, config).rescore(&pair)?;

    if cli.verbose {
        for (i, (predicted, actual)) in report.predictions.iter().enumerate() {
            let mark = if predicted == actual { "" } else { "  <- mismatch" };
            println!("{i:>5}  predicted {predicted}  actual {actual}{mark}");
        }
        println!();
    }

    println!("=== {disease} model on full dataset ===");
    println!("Rows:     {}", report.predictions.len());
    println!("Accuracy: {:.2}%", report.metrics.accuracy() * 100.0);
    println!();
    println!("{}", report.metrics);
    Ok(())
}

fn predict_command(cli: &Cli, args: &PredictArgs) -> Result<()> {
    let service = PredictionService::from_store(ModelStore::new(&cli.model_dir));

    let result = match (&args.values, &args.json) {
        (Some(values), _) => service.predict_vector(args.disease, values)?,
        (None, Some(json)) => {
            let fields = match serde_json::from_str::<Value>(json) {
                Ok(Value::Object(fields)) => fields,
                Ok(_) => {
                    return Err(DiagnosisError::MalformedInput(
                        "--json must be an object".to_string(),
                    ))
                }
                Err(e) => return Err(DiagnosisError::MalformedInput(e.to_string())),
            };
            service.predict(args.disease, &fields)?
        }
        (None, None) => {
            return Err(DiagnosisError::MissingField(
                "--values or --json".to_string(),
            ))
        }
    };

    print_prediction(&result)
}

fn print_prediction(result: &PredictionResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)
        .map_err(|e| DiagnosisError::SerializationError(e.to_string()))?;
    println!("{json}");
    Ok(())
}

fn info_command(cli: &Cli, disease: Disease) -> Result<()> {
    let store = ModelStore::new(&cli.model_dir);
    let pair = store.load(disease)?;
    let info = pair.model.info();
    let schema = disease.config();

    println!("=== {} model ===", schema.display_name);
    println!("Format version:  {}", pair.metadata.format_version);
    println!("Pair id:         {}", pair.metadata.pair_id);
    println!("Created:         {}", pair.metadata.created_at.to_rfc3339());
    println!("Library version: {}", pair.metadata.library_version);
    println!("Kernel:          {:?}", info.kernel);
    println!("Support vectors: {}", info.n_support_vectors);
    println!("Bias:            {:.6}", info.bias);
    println!("Probability:     {}", info.probability);
    println!(
        "Training:        C={}, epsilon={}, {} passes over {} samples",
        info.training.c,
        info.training.epsilon,
        info.training.iterations,
        info.training.n_training_samples
    );

    println!("\nScaler:");
    println!("  {:<26} {:>14} {:>14}", "feature", "mean", "std");
    for ((name, mean), std) in schema
        .feature_columns
        .iter()
        .zip(&pair.scaler.means)
        .zip(&pair.scaler.stds)
    {
        println!("  {name:<26} {mean:>14.6} {std:>14.6}");
    }
    Ok(())
}

fn serve_command(cli: &Cli, args: &ServeArgs) -> Result<()> {
    let service = PredictionService::from_store(ModelStore::new(&cli.model_dir));
    let loaded = service.models_loaded();
    if !(loaded.diabetes || loaded.heart || loaded.parkinsons) {
        warn!(
            "No models found in {}; run `medsvm train all` first",
            cli.model_dir.display()
        );
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let app = build_router(AppState::new(service));
        let listener = tokio::net::TcpListener::bind(&args.bind).await?;
        info!("Listening on {}", args.bind);
        axum::serve(listener, app).await?;
        Ok::<(), DiagnosisError>(())
    })
}
