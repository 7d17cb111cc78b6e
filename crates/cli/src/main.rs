use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wayfarer_core::collaborators::{
    DuplicateIndexProvider, ImportStatusStore, PersistenceSink, ResourceProbe,
};
use wayfarer_core::destination::csv_template;
use wayfarer_core::options::ImportOptions;
use wayfarer_events::{EventBus, EventRecorder};
use wayfarer_pipeline::{
    HttpResourceProbe, ImportPipeline, InMemoryDestinationStore, InMemoryImportStatusStore,
    PipelineConfig, StaticResourceProbe,
};

/// Validate a destination CSV and optionally import it.
#[derive(Debug, Parser)]
#[command(name = "wayfarer-import", version, about)]
struct Cli {
    /// CSV file to import.
    #[arg(required_unless_present_any = ["template", "status"])]
    file: Option<PathBuf>,

    /// Write the rows after a clean validation (default: validate only).
    #[arg(long)]
    commit: bool,

    /// Replace stored destinations that a row duplicates.
    #[arg(long)]
    overwrite: bool,

    /// Insert duplicate rows instead of skipping them.
    #[arg(long)]
    allow_duplicates: bool,

    /// Rows validated concurrently.
    #[arg(long, default_value_t = wayfarer_core::options::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Abandon the whole run after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the issues as CSV instead of the JSON result.
    #[arg(long)]
    csv_issues: bool,

    /// Print the import template and exit.
    #[arg(long)]
    template: bool,

    /// Print the status record of an earlier import and exit.
    #[arg(long, value_name = "IMPORT_ID")]
    status: Option<uuid::Uuid>,

    /// Treat every image as reachable instead of probing it.
    #[arg(long)]
    skip_image_check: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json_logs: bool,

    /// PostgreSQL connection string; without it an empty in-memory store is used.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,
}

impl Cli {
    fn options(&self) -> ImportOptions {
        ImportOptions {
            validate_only: !self.commit,
            overwrite: self.overwrite,
            skip_duplicates: !self.allow_duplicates,
            batch_size: self.batch_size,
        }
    }
}

struct Stores {
    index: Arc<dyn DuplicateIndexProvider>,
    sink: Arc<dyn PersistenceSink>,
    status: Arc<dyn ImportStatusStore>,
}

async fn connect(database_url: Option<&str>) -> anyhow::Result<Stores> {
    let Some(url) = database_url else {
        tracing::info!("DATABASE_URL not set, using an empty in-memory store");
        let store = Arc::new(InMemoryDestinationStore::new());
        return Ok(Stores {
            index: store.clone(),
            sink: store,
            status: Arc::new(InMemoryImportStatusStore::new()),
        });
    };

    let pool = wayfarer_db::create_pool(url)
        .await
        .context("Failed to connect to database")?;
    wayfarer_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    wayfarer_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let status = wayfarer_db::PgImportStatusStore::new(pool.clone());
    match status.purge_expired().await {
        Ok(0) => {}
        Ok(n) => tracing::debug!(purged = n, "Removed expired import statuses"),
        Err(e) => tracing::warn!(error = %e, "Failed to purge expired import statuses"),
    }

    let store = Arc::new(wayfarer_db::PgDestinationStore::new(pool));
    Ok(Stores {
        index: store.clone(),
        sink: store,
        status: Arc::new(status),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wayfarer_cli=debug,wayfarer_pipeline=debug".into()),
        )
        .with(
            cli.json_logs
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    if cli.template {
        print!("{}", csv_template());
        return Ok(ExitCode::SUCCESS);
    }

    // --- Configuration ---
    let config = PipelineConfig::from_env().context("Invalid import configuration")?;
    tracing::info!(
        max_rows = config.limits.max_rows,
        probe_timeout_ms = config.probe_timeout.as_millis() as u64,
        "Loaded import configuration"
    );

    let stores = connect(cli.database_url.as_deref()).await?;

    if let Some(import_id) = cli.status {
        return match stores.status.get(import_id).await? {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
                Ok(ExitCode::SUCCESS)
            }
            None => bail!("No import status for {import_id} (unknown or expired)"),
        };
    }

    let Some(path) = cli.file.as_ref() else {
        bail!("A CSV file is required");
    };
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let probe: Arc<dyn ResourceProbe> = if cli.skip_image_check {
        Arc::new(StaticResourceProbe::accessible())
    } else {
        Arc::new(HttpResourceProbe::new(config.probe_timeout)?)
    };

    // --- Events ---
    let bus = Arc::new(EventBus::default());
    let recorder = tokio::spawn(EventRecorder::run(bus.subscribe()));

    let pipeline = ImportPipeline::new(config, probe, stores.index, stores.sink, stores.status)
        .with_events(bus.clone());

    let options = cli.options();
    let result = match cli.timeout_secs {
        Some(secs) => {
            pipeline
                .run_with_timeout(&data, &options, Duration::from_secs(secs))
                .await
        }
        None => pipeline.run(&data, &options).await,
    };

    drop(pipeline);
    drop(bus);
    if let Ok(recorded) = recorder.await {
        tracing::debug!(events = recorded, "Event recorder finished");
    }

    if cli.csv_issues {
        print!("{}", result.issues_csv());
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    Ok(if result.errors.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
