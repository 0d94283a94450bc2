//! The per-node update algorithm.
//!
//! [`Reconciler`] drives one run: probe every node, then settle each node in
//! registry order. Settling a fetched node builds a candidate record from the
//! snapshot, migrates and stamps it, and validates the whole registry with the
//! candidate substituted. The authoritative registry is only written when that
//! validation passes; every failure leaves the node's data exactly as it was
//! and records the failure in `status`.

use crate::{
    clock::{Clock, SystemClock},
    config::NodeRegistryConfig,
    outcome::{InvalidCause, NodeOutcome, RunReport},
    Result,
};

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use nodereg_core::{
    MigrationChain, NodeRecord, NodeStatus, Registry, RegistryStore, SchemaValidator,
    UNKNOWN_VERSION,
};
use nodereg_prober::{NodeProber, ProbeOutcome, ProbePayload};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// A validator the reconciler can hold across await points.
pub type DynValidator = Box<dyn SchemaValidator + Send + Sync>;

/// Result of a run: the final registry and what happened to each node.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Registry to persist.
    pub registry: Registry,

    /// Per-node outcomes in registry order.
    pub report: RunReport,
}

/// Updates every node of a registry from what the node reports.
///
/// # Example
///
/// ```rust,no_run
/// use nodereg_core::{JsonSchemaValidator, RegistryStore};
/// use nodereg_prober::{HttpProber, ProbeConfig};
/// use nodereg_reconcile::Reconciler;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let prober = HttpProber::new(&ProbeConfig::default())?;
/// let validator = JsonSchemaValidator::from_file("node_registry.schema.json")?;
/// let reconciler = Reconciler::new(Box::new(prober), Box::new(validator));
///
/// let store = RegistryStore::new("node_registry.json");
/// let outcome = reconciler.reconcile(store.load()?).await;
/// store.persist(&outcome.registry)?;
/// println!("{}", outcome.report);
/// # Ok(())
/// # }
/// ```
pub struct Reconciler {
    /// Fetches each node's resources.
    prober: Box<dyn NodeProber>,

    /// Whole-document schema check.
    validator: DynValidator,

    /// Steps bringing fetched data to the current shape.
    migrations: MigrationChain,

    /// Source of commit timestamps.
    clock: Box<dyn Clock>,

    /// Probes in flight at once.
    max_concurrency: usize,
}

impl Reconciler {
    /// Creates a reconciler with the current migration chain, the system
    /// clock and a probe concurrency of 4.
    pub fn new(prober: Box<dyn NodeProber>, validator: DynValidator) -> Self {
        Self {
            prober,
            validator,
            migrations: MigrationChain::current(),
            clock: Box::new(SystemClock),
            max_concurrency: 4,
        }
    }

    /// Replaces the migration chain.
    #[must_use]
    pub fn with_migrations(mut self, migrations: MigrationChain) -> Self {
        self.migrations = migrations;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets how many nodes are probed at once. `1` probes sequentially.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Runs one update over `registry`.
    ///
    /// Never fails: per-node failures are recorded in the returned registry's
    /// `status` fields and in the report.
    pub async fn reconcile(&self, registry: Registry) -> Reconciliation {
        let names: Vec<String> = registry.names().map(str::to_owned).collect();
        info!("Updating {} nodes", names.len());

        // Probes have no side effects; running them ahead of settlement is
        // equivalent to interleaving.
        let probes: Vec<ProbeOutcome> = stream::iter(registry.iter())
            .map(|(name, record)| self.prober.probe(name, record))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut registry = registry;
        let mut report = RunReport::new();
        for (name, probe) in names.into_iter().zip(probes) {
            if let Some(outcome) = self.settle(&mut registry, &name, probe) {
                report.push(name, outcome);
            }
        }

        Reconciliation { registry, report }
    }

    /// Applies one node's probe result to the registry.
    fn settle(&self, registry: &mut Registry, name: &str, probe: ProbeOutcome) -> Option<NodeOutcome> {
        let snapshot = registry.get(name)?.clone();

        let outcome = match probe {
            ProbeOutcome::Offline { reason } => {
                warn!("Node '{}' is offline: {}", name, reason);
                NodeOutcome::Offline { reason }
            }
            ProbeOutcome::Unresponsive { role, body } => {
                warn!("Node '{}' is unresponsive: {} body {:?}", name, role, body);
                NodeOutcome::Unresponsive { role, body }
            }
            ProbeOutcome::Fetched(payload) => {
                match self.build_candidate(registry, name, &snapshot, payload) {
                    Ok(candidate) => {
                        let outcome = NodeOutcome::Online {
                            version: candidate.version.clone().unwrap_or_default(),
                            services: candidate.services.as_ref().map_or(0, Vec::len),
                        };
                        registry.insert(name, candidate);
                        info!("Node '{}' updated: {}", name, outcome);
                        return Some(outcome);
                    }
                    Err(cause) => {
                        warn!("Node '{}' has an invalid configuration: {}", name, cause);
                        NodeOutcome::InvalidConfiguration { cause }
                    }
                }
            }
        };

        // Failure: the snapshot stands, only the status changes.
        let mut rolled_back = snapshot;
        rolled_back.status = Some(outcome.status());
        registry.insert(name, rolled_back);
        Some(outcome)
    }

    /// Builds the committed form of `name` from fetched data, or explains why
    /// it cannot be committed. `registry` is not modified.
    fn build_candidate(
        &self,
        registry: &Registry,
        name: &str,
        snapshot: &NodeRecord,
        payload: ProbePayload,
    ) -> std::result::Result<NodeRecord, InvalidCause> {
        let mut candidate = snapshot.clone();
        candidate.version = Some(read_version(&payload.version)?);
        candidate.services = Some(read_services(payload.services)?);

        self.migrations.apply(&mut candidate)?;

        let now = self.commit_time(snapshot.last_updated);
        candidate.status = Some(NodeStatus::Online);
        candidate.last_updated = Some(now);
        candidate.date_added.get_or_insert(now);

        let document = registry
            .to_value_with(name, &candidate)
            .map_err(|e| InvalidCause::Payload(format!("cannot serialize record: {e}")))?;
        self.validator.validate(&document)?;
        debug!("Candidate for '{}' passed validation", name);

        Ok(candidate)
    }

    /// The clock's reading, moved strictly past `previous` if needed.
    fn commit_time(&self, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let now = self.clock.now();
        match previous {
            Some(previous) if now <= previous => previous + Duration::microseconds(1),
            _ => now,
        }
    }
}

fn read_version(body: &Map<String, Value>) -> std::result::Result<String, InvalidCause> {
    match body.get("version") {
        None => Ok(UNKNOWN_VERSION.to_string()),
        Some(Value::String(version)) => Ok(version.clone()),
        Some(other) => Err(InvalidCause::Payload(format!(
            "version field is not a string: {other}"
        ))),
    }
}

fn read_services(mut body: Map<String, Value>) -> std::result::Result<Vec<Value>, InvalidCause> {
    match body.remove("services") {
        None => Ok(Vec::new()),
        Some(Value::Array(services)) => Ok(services),
        Some(other) => Err(InvalidCause::Payload(format!(
            "services field is not an array: {other}"
        ))),
    }
}

/// Loads the registry, reconciles it and persists the result once.
///
/// Persisting is skipped when `config.run.dry_run` is set. Only loading and
/// persisting can fail the run.
pub async fn run(
    config: &NodeRegistryConfig,
    store: &RegistryStore,
    validator: DynValidator,
    prober: Box<dyn NodeProber>,
) -> Result<Reconciliation> {
    let registry = store.load()?;

    let reconciler = Reconciler::new(prober, validator)
        .with_max_concurrency(config.probe.concurrency());
    let reconciliation = reconciler.reconcile(registry).await;

    if config.run.dry_run {
        info!("Dry run, not writing {}", store.path().display());
    } else {
        store.persist(&reconciliation.registry)?;
    }
    info!("{}", reconciliation.report);

    Ok(reconciliation)
}
