//! Converge CLI: applies a YAML desired-state manifest to a cluster.
//!
//! # Usage
//!
//! ```text
//! converge apply cluster.yaml
//! converge apply cluster.yaml --check
//! converge health cluster.yaml
//! ```
//!
//! Each reconciled resource prints one JSON line to stdout; logs go to
//! stderr. The exit code is non-zero when any result failed.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use converge_core::infrastructure::http::HttpClient;
use converge_core::reconcile::{
    effective_validate_certificate, ConnectionStringReconciler, DatabaseReconciler,
    HealthCheckRunner, IndexReconciler, NodeReconciler,
};
use converge_core::types::config::{
    ConnectionStringTask, ConvergeConfig, DatabaseTask, IndexTask, Plan,
};
use converge_core::types::node::NodeSpec;
use converge_core::types::result::ReconcileResult;

/// Converge a document-database cluster toward a declared state
#[derive(Parser, Debug)]
#[command(name = "converge")]
#[command(version)]
struct Args {
    /// Log level used when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: Level,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile nodes, databases, connection strings, then indexes
    Apply {
        manifest: PathBuf,
        /// Report what would change without mutating the cluster
        #[arg(long)]
        check: bool,
    },
    /// Run the manifest's health check
    Health { manifest: PathBuf },
}

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let code = match &args.command {
        Commands::Apply { manifest, check } => apply(manifest, *check),
        Commands::Health { manifest } => health(manifest),
    };
    process::exit(code);
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn load_plan(manifest: &Path) -> Result<Plan, String> {
    ConvergeConfig::load(manifest)
        .and_then(|cfg| cfg.plan())
        .map_err(|e| format!("{}: {}", manifest.display(), e))
}

/// Print one result line; returns whether it failed.
fn report(resource: String, result: ReconcileResult) -> bool {
    let failed = result.failed;
    if failed {
        error!(resource = %resource, msg = %result.msg, "reconcile failed");
    }
    println!("{}", result.with_extra("resource", resource).to_json());
    failed
}

fn apply(manifest: &Path, check: bool) -> i32 {
    let plan = match load_plan(manifest) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("converge: {}", e);
            return 2;
        }
    };
    let mut client = match HttpClient::new(&plan.url, &plan.tls) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("converge: {}", e);
            return 2;
        }
    };
    info!(
        url = %plan.url,
        check,
        nodes = plan.nodes.len(),
        databases = plan.databases.len(),
        connection_strings = plan.connection_strings.len(),
        indexes = plan.indexes.len(),
        "applying manifest"
    );

    let mut failures = 0;

    for spec in &plan.nodes {
        let result = if spec.leader_url() == plan.url {
            reconcile_node(&mut client, spec, &plan, check)
        } else {
            match HttpClient::new(spec.leader_url(), &plan.tls) {
                Ok(mut leader) => reconcile_node(&mut leader, spec, &plan, check),
                Err(e) => ReconcileResult::error(format!("{}: {}", spec.leader_url(), e)),
            }
        };
        failures += report(format!("node/{}", spec.tag()), result) as u32;
    }

    for task in &plan.databases {
        let mut reconciler = DatabaseReconciler::new(&mut client).with_confirmation(plan.wait);
        let (name, result) = match task {
            DatabaseTask::Present(spec) => (&spec.name, reconciler.ensure_present(spec, check)),
            DatabaseTask::Absent { name, options } => {
                (name, reconciler.ensure_absent(name, options, check))
            }
        };
        failures += report(format!("database/{}", name), result) as u32;
    }

    for task in &plan.connection_strings {
        let mut reconciler = ConnectionStringReconciler::new(&mut client);
        let (db, name, result) = match task {
            ConnectionStringTask::Present(spec) => {
                (&spec.db_name, &spec.name, reconciler.ensure_present(spec, check))
            }
            ConnectionStringTask::Absent { db, kind, name } => {
                (db, name, reconciler.ensure_absent(db, *kind, name, check))
            }
        };
        failures += report(format!("connection_string/{}/{}", db, name), result) as u32;
    }

    for task in &plan.indexes {
        let mut reconciler = IndexReconciler::new(&mut client);
        let (db, name, result) = match task {
            IndexTask::Present(spec) => {
                (&spec.db_name, &spec.name, reconciler.ensure_present(spec, check))
            }
            IndexTask::Absent { db, name } => (db, name, reconciler.ensure_absent(db, name, check)),
        };
        failures += report(format!("index/{}/{}", db, name), result) as u32;
    }

    if failures > 0 {
        error!(failures, "manifest did not fully converge");
        1
    } else {
        0
    }
}

fn reconcile_node(leader: &mut HttpClient, spec: &NodeSpec, plan: &Plan, check: bool) -> ReconcileResult {
    NodeReconciler::new(leader)
        .with_confirmation(plan.wait)
        .ensure_present(spec, check)
}

fn health(manifest: &Path) -> i32 {
    let plan = match load_plan(manifest) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("converge: {}", e);
            return 2;
        }
    };
    let Some(spec) = plan.healthcheck else {
        eprintln!("converge: {}: no healthcheck section", manifest.display());
        return 2;
    };

    let (validate, _) = effective_validate_certificate(&spec);
    let probe = HttpClient::builder(&spec.url, &plan.tls)
        .validate_certificate(validate)
        .build();
    let cluster = HttpClient::new(&plan.url, &plan.tls);
    let (probe, cluster) = match (probe, cluster) {
        (Ok(p), Ok(c)) => (p, c),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("converge: {}", e);
            return 2;
        }
    };

    let result = HealthCheckRunner::new(&probe, &cluster).run(&spec);
    if report(format!("health/{}", spec.url), result) {
        1
    } else {
        0
    }
}
