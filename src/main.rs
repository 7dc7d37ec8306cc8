//! Adherewise: medication adherence scoring CLI.
//!
//! Main entry point. Results are printed to stdout as JSON; logs go to
//! stderr or a file.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adherewise::adapters::ensemble::TrainerConfig;
use adherewise::adapters::sqlite::SqliteStorage;
use adherewise::application::synthesizer::{generate, SynthesizerConfig};
use adherewise::application::{
    AnalyticsService, ArtifactStatus, InteractionService, ModelHandle, PredictionRequest,
    PredictionService, TrainingService,
};
use adherewise::config::{AppConfig, LogMode};
use adherewise::domain::{prescription, MedicineEntry, MedicineInfo, TrainingDataset};
use adherewise::ports::Storage;

#[derive(Parser)]
#[command(name = "adherewise")]
#[command(version, long_about = None)]
#[command(about = "Medication adherence scoring and drug interaction checks")]
struct Cli {
    /// SQLite database path (overrides ADHEREWISE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic labeled dataset as JSON
    Generate {
        /// Number of samples (overrides ADHEREWISE_TRAINING_SAMPLES)
        #[arg(short, long)]
        samples: Option<usize>,

        /// Seed (overrides ADHEREWISE_SEED)
        #[arg(long)]
        seed: Option<u64>,

        /// Leave out the gender column
        #[arg(long)]
        no_gender: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Train the ensemble and make it the active model
    Train {
        /// JSON dataset; a synthetic one is generated when omitted
        #[arg(short, long)]
        dataset: Option<PathBuf>,

        #[arg(short, long)]
        samples: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Small ensembles for a quick run
        #[arg(long)]
        fast: bool,
    },

    /// Score a patient from a JSON request ("-" reads stdin)
    Predict {
        #[arg(default_value = "-")]
        input: String,
    },

    /// Show the active model and assessment statistics
    Status {
        /// Number of recent assessments to aggregate
        #[arg(short, long, default_value = "1000")]
        limit: usize,
    },

    /// Check a regimen for interactions, or list one drug's interactions
    Interactions {
        /// Medicines to check pairwise
        medicines: Vec<String>,

        /// List every interaction of this drug instead
        #[arg(long, conflicts_with = "medicines")]
        drug: Option<String>,
    },

    /// Look up reference info for medicines
    Medicine {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Show totals and class counts of the medicine reference table
    MedicineStats,

    /// Parse prescription text extracted by OCR ("-" reads stdin)
    Prescription {
        #[arg(default_value = "-")]
        input: String,
    },

    /// Add or replace an interaction in the reference table
    ImportInteraction {
        drug_a: String,
        drug_b: String,
        description: String,
    },

    /// Add or replace medicines from a JSON file (one record or a list)
    ImportMedicine { file: PathBuf },

    /// Drop the trained model so predictions fall back to the rules
    Reset {
        /// Also delete the assessment history
        #[arg(long)]
        all: bool,
    },
}

fn init_logging(config: &AppConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let (writer, guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                // Best-effort: a missing directory surfaces on open below
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)
                .with_context(|| format!("opening log file {}", config.log_file.display()))?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    Ok(guard)
}

fn open_storage(path: &Path) -> Result<Arc<SqliteStorage>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    let storage = SqliteStorage::new(path)
        .with_context(|| format!("opening database {}", path.display()))?;
    Ok(Arc::new(storage))
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let _guard = init_logging(&config)?;
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }
    tracing::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Generate {
            samples,
            seed,
            no_gender,
            output,
        } => {
            let dataset = generate(&SynthesizerConfig {
                samples: samples.unwrap_or(config.training_samples),
                seed: seed.unwrap_or(config.seed),
                include_gender: !no_gender,
            });
            let json = serde_json::to_string_pretty(&dataset)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }
        }

        Commands::Train {
            dataset,
            samples,
            seed,
            fast,
        } => {
            let seed = seed.unwrap_or(config.seed);
            let trainer_config = if fast {
                TrainerConfig::fast(seed)
            } else {
                TrainerConfig::with_seed(seed)
            };
            let storage = open_storage(&config.db_path)?;
            let service =
                TrainingService::new(storage, Arc::new(ModelHandle::default()), trainer_config);

            let metrics = match dataset {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let data: TrainingDataset = serde_json::from_str(&raw)?;
                    service.train(&data)?
                }
                None => service.train_synthetic(&SynthesizerConfig {
                    samples: samples.unwrap_or(config.training_samples),
                    seed,
                    include_gender: true,
                })?,
            };
            print_json(&metrics)?;
        }

        Commands::Predict { input } => {
            let request: PredictionRequest = serde_json::from_str(&read_input(&input)?)?;
            let storage = open_storage(&config.db_path)?;
            let model = Arc::new(ModelHandle::default());

            TrainingService::new(Arc::clone(&storage), Arc::clone(&model), TrainerConfig::default())
                .load_from_storage();
            let service = PredictionService::new(model, Arc::clone(&storage), storage);
            print_json(&service.handle(&request)?)?;
        }

        Commands::Status { limit } => {
            let storage = open_storage(&config.db_path)?;
            let training = TrainingService::new(
                Arc::clone(&storage),
                Arc::new(ModelHandle::default()),
                TrainerConfig::default(),
            );
            match training.load_from_storage() {
                ArtifactStatus::Loaded { trained_at, metrics } => {
                    println!("Active model: ensemble, trained {trained_at}");
                    print_json(&metrics)?;
                }
                ArtifactStatus::Unavailable { reason } => {
                    println!("Active model: rule-based ({reason})");
                }
            }
            print_json(&AnalyticsService::new(storage).overview(limit)?)?;
        }

        Commands::Interactions { medicines, drug } => {
            let storage = open_storage(&config.db_path)?;
            let service = InteractionService::new(Arc::clone(&storage), storage);
            match drug {
                Some(drug) => print_json(&service.search_drug(&drug))?,
                None => {
                    let entries: Vec<MedicineEntry> =
                        medicines.into_iter().map(MedicineEntry::Name).collect();
                    print_json(&service.summary(&entries))?;
                }
            }
        }

        Commands::Medicine { names } => {
            let storage = open_storage(&config.db_path)?;
            let service = InteractionService::new(Arc::clone(&storage), storage);
            print_json(&service.medicine_batch(&names))?;
        }

        Commands::MedicineStats => {
            let storage = open_storage(&config.db_path)?;
            let service = InteractionService::new(Arc::clone(&storage), storage);
            print_json(&service.medicine_stats())?;
        }

        Commands::Prescription { input } => {
            print_json(&prescription::process(&read_input(&input)?))?;
        }

        Commands::ImportInteraction {
            drug_a,
            drug_b,
            description,
        } => {
            let storage = open_storage(&config.db_path)?;
            storage.import_interaction(&drug_a, &drug_b, &description)?;
            println!(
                "Imported interaction {drug_a} + {drug_b} ({} known)",
                storage.count_interactions()?
            );
        }

        Commands::ImportMedicine { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let records: Vec<MedicineInfo> = match serde_json::from_str(&raw) {
                Ok(list) => list,
                Err(_) => vec![serde_json::from_str(&raw)?],
            };
            let storage = open_storage(&config.db_path)?;
            for info in &records {
                storage.import_medicine(info)?;
            }
            println!(
                "Imported {} medicine(s) ({} known)",
                records.len(),
                storage.medicine_stats()?.total_medicines
            );
        }

        Commands::Reset { all } => {
            let storage = open_storage(&config.db_path)?;
            if all {
                storage.clear_all()?;
            } else {
                let model = Arc::new(ModelHandle::default());
                TrainingService::new(storage, model, TrainerConfig::default()).reset()?;
            }
            println!("Active model: rule-based");
        }
    }

    Ok(())
}
