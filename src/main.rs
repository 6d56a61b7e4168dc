use anyhow::Result;
use clap::Parser;
use curve_factory::analysis::{AnalysisSession, AnalysisStatus};
use curve_factory::cli::{parse_data_source, Args};
use curve_factory::display::display_result;
use curve_factory::output::OutputWriter;
use curve_factory::sources::create_source;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize Rayon thread pool for the bootstrap
    let num_threads = std::thread::available_parallelism()
        .map(|x| x.get())
        .unwrap_or(4)
        .max(4);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("rayon-worker-{}", i))
        .build_global()
        .expect("Failed to initialize Rayon thread pool");

    info!("Initialized Rayon thread pool with {} threads", num_threads);

    let args = Args::parse();
    let source_spec = args.source.clone();
    let config = args.into_config()?;

    info!("Starting demand curve analysis with config: {:?}", config);

    let data_source = parse_data_source(&source_spec)?;
    let source = create_source(&data_source).await?;

    // Stream records in from the source
    let (record_tx, mut record_rx) = mpsc::channel(100);
    let fetch_task = tokio::spawn(async move {
        if let Err(e) = source.fetch_records(record_tx).await {
            error!("Error fetching records: {}", e);
        }
    });

    let mut records = Vec::new();
    while let Some(batch) = record_rx.recv().await {
        records.extend(batch);
    }
    fetch_task.await?;

    info!("Collected {} raw records", records.len());

    // Run the analysis as one generation of a session
    let (status_tx, mut status_rx) = mpsc::channel(16);
    let mut session = AnalysisSession::new(Arc::new(records), status_tx);
    let run = session.submit(config.clone());

    let mut final_result = None;
    while let Some(status) = status_rx.recv().await {
        match status {
            AnalysisStatus::Running {
                generation,
                bootstrap,
            } => {
                info!(
                    "Analysis generation {} running (bootstrap: {})",
                    generation, bootstrap
                );
            }
            AnalysisStatus::Completed { generation, result } => {
                info!("Analysis generation {} completed", generation);
                final_result = result;
                break;
            }
            AnalysisStatus::Failed { error, .. } => {
                anyhow::bail!("Analysis failed: {}", error);
            }
        }
    }
    run.await??;

    let Some(result) = final_result else {
        warn!("No result: engine not configured or no valid observations. Exiting.");
        return Ok(());
    };

    // Write the price table and show a preview
    let output_writer = OutputWriter::new();
    let output_path = output_writer.write_points(&config, &result.points).await?;

    display_result(&result);

    info!("Demand curve analysis completed successfully!");
    if let Some(filename) = output_path.file_name() {
        info!("Generated: {}", filename.to_string_lossy());
    }

    Ok(())
}
