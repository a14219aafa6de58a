use anyhow::bail;
use clap::{Parser, Subcommand};
use roster_pipeline::config::PipelineConfig;
use roster_pipeline::observability::logging::init_logging;
use roster_pipeline::pipeline::stages::{
    DartRequest, DartStage, IsfRequest, IsfStage, StageStatus,
};
use roster_pipeline::store::{FsObjectStore, ObjectStore};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "roster-pipeline")]
#[command(about = "Batch roster transform pipeline (ISF and DART stages)")]
#[command(version = "0.1.0")]
struct Cli {
    /// Root directory backing the filesystem object store
    #[arg(long)]
    data_root: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize raw roster objects into chunked ISF artifacts
    IsfTransform {
        /// Job token namespacing the output keys
        #[arg(long)]
        job_id: Option<String>,
        /// Raw object key to process (repeatable)
        #[arg(long = "key")]
        keys: Vec<String>,
        /// JSON invocation payload file overriding the flags
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Validate ISF chunks and remap accepted rows to the load schema
    DartTransform {
        #[arg(long)]
        job_id: Option<String>,
        /// Normalized chunk key to process (repeatable)
        #[arg(long = "key")]
        keys: Vec<String>,
        /// JSON invocation payload file overriding the flags
        #[arg(long)]
        payload: Option<PathBuf>,
    },
    /// Run ISF then DART for one job, threading the job id between stages
    FullPipeline {
        /// Job token; generated when omitted
        #[arg(long)]
        job_id: Option<String>,
        /// Raw object key to process (repeatable)
        #[arg(long = "key")]
        keys: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let config = PipelineConfig::load()?;
    let data_root = cli
        .data_root
        .clone()
        .unwrap_or_else(|| config.data_root.clone());
    let store: Arc<dyn ObjectStore> = Arc::new(FsObjectStore::new(&data_root));

    match cli.command {
        Commands::IsfTransform {
            job_id,
            keys,
            payload,
        } => {
            let request = match payload {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => IsfRequest {
                    s3_keys: keys,
                    job_id: require_job_id(job_id)?,
                },
            };
            let response = IsfStage::new(config, store).run(&request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::DartTransform {
            job_id,
            keys,
            payload,
        } => {
            let request = match payload {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => DartRequest {
                    isf_keys: keys,
                    job_id: require_job_id(job_id)?,
                },
            };
            let response = DartStage::new(config, store)?.run(&request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::FullPipeline { job_id, keys } => {
            let job_id =
                job_id.unwrap_or_else(|| format!("job-{}", Uuid::new_v4().simple()));
            info!("🔄 Running full pipeline for job {}", job_id);

            let isf = IsfStage::new(config.clone(), store.clone());
            let isf_response = isf
                .run(&IsfRequest {
                    s3_keys: keys,
                    job_id: job_id.clone(),
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&isf_response)?);

            if isf_response.status == StageStatus::NoFiles || isf_response.isf_keys.is_empty() {
                info!("No normalized artifacts produced, skipping DART stage");
                return Ok(());
            }

            let dart = DartStage::new(config, store)?;
            let dart_response = dart
                .run(&DartRequest {
                    isf_keys: isf_response.isf_keys.clone(),
                    job_id,
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&dart_response)?);
        }
    }

    Ok(())
}

fn require_job_id(job_id: Option<String>) -> anyhow::Result<String> {
    match job_id {
        Some(job_id) => Ok(job_id),
        None => bail!("--job-id is required unless --payload is given"),
    }
}
