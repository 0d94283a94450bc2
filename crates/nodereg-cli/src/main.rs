//! nodereg - Command-line updater for a federated node registry

use anyhow::{bail, Context};
use clap::Parser;
use nodereg_core::{JsonSchemaValidator, RegistryStore, SchemaValidator};
use nodereg_prober::HttpProber;
use nodereg_reconcile::{NodeOutcome, NodeRegistryConfig};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nodereg", version)]
#[command(about = "Poll federated nodes and keep the node registry up to date")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NODEREG_CONFIG", default_value = "nodereg.toml", global = true)]
    config: PathBuf,

    /// Registry file, overriding the config
    #[arg(long, env = "NODEREG_REGISTRY", global = true)]
    registry: Option<PathBuf>,

    /// Registry schema file, overriding the config
    #[arg(long, env = "NODEREG_SCHEMA", global = true)]
    schema: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Probe every node and write the updated registry (default)
    Update {
        /// Report outcomes without writing the registry
        #[arg(long)]
        dry_run: bool,

        /// Number of nodes probed at once
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Check the registry file against the schema
    Validate,
    /// Show every node's last known state
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = NodeRegistryConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(registry) = cli.registry {
        config.registry.registry_path = registry;
    }
    if let Some(schema) = cli.schema {
        config.registry.schema_path = schema;
    }

    match cli.command.unwrap_or(Commands::Update {
        dry_run: false,
        concurrency: None,
    }) {
        Commands::Update {
            dry_run,
            concurrency,
        } => {
            config.run.dry_run |= dry_run;
            if let Some(concurrency) = concurrency {
                config.probe.max_concurrency = concurrency;
            }
            update(&config).await
        }
        Commands::Validate => validate(&config).await,
        Commands::List => list(&config),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("nodereg=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nodereg=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compiles the schema off the async runtime; remote `$ref`s block.
async fn load_validator(path: &Path) -> anyhow::Result<JsonSchemaValidator> {
    let path = path.to_path_buf();
    let display = path.display().to_string();
    let validator = tokio::task::spawn_blocking(move || JsonSchemaValidator::from_file(path))
        .await
        .context("schema compilation task failed")?
        .with_context(|| format!("loading schema {display}"))?;
    Ok(validator)
}

async fn update(config: &NodeRegistryConfig) -> anyhow::Result<()> {
    let store = RegistryStore::new(&config.registry.registry_path);
    let validator = load_validator(&config.registry.schema_path).await?;
    let prober = HttpProber::new(&config.probe)?;
    debug!("Probing with up to {} concurrent nodes", config.probe.concurrency());

    let result = nodereg_reconcile::run(config, &store, Box::new(validator), Box::new(prober))
        .await
        .with_context(|| format!("updating {}", store.path().display()))?;

    for (name, outcome) in result.report.outcomes() {
        match outcome {
            NodeOutcome::Online { .. } => println!("{name}: {outcome}"),
            _ => eprintln!("{name}: {outcome}"),
        }
    }
    println!("{}", result.report);
    if config.run.dry_run {
        println!("dry run: {} not written", store.path().display());
    }
    Ok(())
}

async fn validate(config: &NodeRegistryConfig) -> anyhow::Result<()> {
    let store = RegistryStore::new(&config.registry.registry_path);
    let validator = load_validator(&config.registry.schema_path).await?;
    let document = store
        .load_raw()
        .with_context(|| format!("loading {}", store.path().display()))?;

    let violations = validator.violations(&document);
    if violations.is_empty() {
        println!("{} is valid", store.path().display());
        return Ok(());
    }

    for violation in &violations {
        eprintln!("{violation}");
    }
    bail!(
        "{} is invalid: {} violation(s)",
        store.path().display(),
        violations.len()
    )
}

fn list(config: &NodeRegistryConfig) -> anyhow::Result<()> {
    let store = RegistryStore::new(&config.registry.registry_path);
    let registry = store
        .load()
        .with_context(|| format!("loading {}", store.path().display()))?;

    for (name, record) in registry.iter() {
        let status = record.status.map_or("-", |status| status.as_str());
        let services: Vec<String> = record
            .service_descriptors()
            .into_iter()
            .map(|service| service.name)
            .collect();
        let last_updated = record
            .last_updated
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());

        println!(
            "{:<24} {:<22} {:<12} [{}] {}",
            name,
            status,
            record.version.as_deref().unwrap_or("-"),
            services.join(", "),
            last_updated
        );
    }
    Ok(())
}
