//! Callgraph - contract call graph CLI
//!
//! The `callgraph` command builds call graphs from stub manifests with
//! in-memory stores.
//!
//! ## Commands
//!
//! - `plan`: build the graph and print leaves, dependents and execution chain
//! - `check`: verify that every stub in a manifest can be scheduled

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use callgraph_core::{
    ContractSpecification, DslParser, EngineConfig, GraphBuilder, GraphResult, GraphSummary,
    ManifestFrontend, StubDecomposer,
};
use callgraph_state::fakes::MemoryCallDependentsStore;
use callgraph_state::{CallId, CallRegistry};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "callgraph")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and check contract call graphs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the call graph of a stub manifest and print its execution plan
    Plan {
        /// Path to the stub manifest (JSON)
        manifest: PathBuf,

        /// Contract id (default: the manifest file stem)
        #[arg(long)]
        contract_id: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Skip the check that every call was scheduled
        #[arg(long)]
        no_verify: bool,
    },

    /// Check that every stub in a manifest can be scheduled
    Check {
        /// Path to the stub manifest (JSON)
        manifest: PathBuf,

        /// Contract id substituted for `@root` (default: the manifest file stem)
        #[arg(long)]
        contract_id: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    callgraph_core::telemetry::init_tracing(cli.json, level);

    match cli.command {
        Commands::Plan {
            manifest,
            contract_id,
            format,
            no_verify,
        } => {
            let mut config = EngineConfig::from_env().context("Invalid engine configuration")?;
            if no_verify {
                config = config.with_verify_acyclic(false);
            }
            let report = cmd_plan(&manifest, contract_id.as_deref(), config).await?;
            match format {
                OutputFormat::Text => println!("{}", render_plan_text(&report)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
            Ok(())
        }
        Commands::Check {
            manifest,
            contract_id,
        } => {
            let report = cmd_check(&manifest, contract_id.as_deref())?;
            println!("{}", render_check_text(&report));
            if !report.passed() {
                anyhow::bail!("{} cannot be fully scheduled", manifest.display());
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PlanReport {
    #[serde(flatten)]
    summary: GraphSummary,
    /// Non-empty dependents sets as registered by the build.
    dependents: BTreeMap<CallId, Vec<CallId>>,
}

async fn cmd_plan(
    path: &Path,
    contract_id: Option<&str>,
    config: EngineConfig,
) -> Result<PlanReport> {
    let source = read_manifest(path)?;
    let contract = ContractSpecification::with_id(contract_id_for(path, contract_id), source);

    let dependents = Arc::new(MemoryCallDependentsStore::new());
    let registry = CallRegistry {
        dependents: dependents.clone(),
        ..CallRegistry::in_memory()
    };
    let frontend = Arc::new(ManifestFrontend::new());
    let summary = GraphBuilder::new(Arc::clone(&frontend), frontend, registry)
        .with_config(config)
        .build_graph(&contract)
        .await
        .with_context(|| format!("Failed to build call graph from {}", path.display()))?;

    info!(
        contract_id = %summary.contract_id,
        calls = summary.call_count,
        "call graph built"
    );

    let dependents = dependents
        .entries()?
        .into_iter()
        .filter(|(_, users)| !users.is_empty())
        .map(|(call, users)| (call, users.into_iter().collect()))
        .collect();

    Ok(PlanReport {
        summary,
        dependents,
    })
}

fn render_plan_text(report: &PlanReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    out.push_str(&format!("contract   {}\n", summary.contract_id));
    out.push_str(&format!("digest     {}\n", summary.source_digest));
    out.push_str(&format!("calls      {}\n", summary.call_count));
    out.push_str(&format!("leaves     {}\n", join(&summary.leaf_ids, ", ")));
    out.push_str("dependents\n");
    for (call, users) in &report.dependents {
        out.push_str(&format!("  {} -> {}\n", call, join(users, ", ")));
    }

    let mut chain = vec![summary.contract_id.clone()];
    chain.extend(summary.execution_order.iter().cloned());
    out.push_str(&format!("chain      {}", join(&chain, " -> ")));
    out
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CheckReport {
    call_count: usize,
    scheduled: usize,
    /// Calls on a cycle or waiting on a stub the manifest never lists.
    unscheduled: Vec<CallId>,
    /// First error of the dependencies-first decomposition, if any.
    ordering_error: Option<String>,
}

impl CheckReport {
    fn passed(&self) -> bool {
        self.unscheduled.is_empty() && self.ordering_error.is_none()
    }
}

fn cmd_check(path: &Path, contract_id: Option<&str>) -> Result<CheckReport> {
    let source = read_manifest(path)?;
    let frontend = ManifestFrontend::new();
    let module = frontend.parse(&source)?;
    let expr = frontend.top_level_expr(&module)?;
    let root = contract_id_for(path, contract_id);

    let ordering_error = frontend
        .decompose(&root, &module, expr)
        .find_map(|stub| stub.err())
        .map(|e| e.to_string());

    let graph = module.call_graph(&root);
    let scheduled: HashSet<CallId> = graph.execution_order().collect::<GraphResult<_>>()?;
    let unscheduled: Vec<CallId> = graph
        .call_ids()
        .iter()
        .filter(|id| !scheduled.contains(*id))
        .cloned()
        .collect();

    Ok(CheckReport {
        call_count: graph.len(),
        scheduled: scheduled.len(),
        unscheduled,
        ordering_error,
    })
}

fn render_check_text(report: &CheckReport) -> String {
    let mut out = format!(
        "{} of {} calls scheduled",
        report.scheduled, report.call_count
    );
    if !report.unscheduled.is_empty() {
        out.push_str(&format!(
            "\nnever scheduled: {}",
            join(&report.unscheduled, ", ")
        ));
    }
    if let Some(err) = &report.ordering_error {
        out.push_str(&format!("\nordering: {err}"));
    }
    out
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn read_manifest(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read stub manifest: {}", path.display()))
}

fn contract_id_for(path: &Path, explicit: Option<&str>) -> CallId {
    match explicit {
        Some(id) => CallId::from(id),
        None => CallId::from(
            path.file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("contract"),
        ),
    }
}

fn join(ids: &[CallId], sep: &str) -> String {
    ids.iter()
        .map(CallId::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAMOND: &str = r#"{
        "expr": "Max(Stub('a'), Stub('b'))",
        "stubs": [
            {"call_id": "a", "expr": "Market('NBP')"},
            {"call_id": "b", "expr": "Market('TTF')"},
            {"call_id": "@root", "expr": "Max(Stub('a'), Stub('b'))", "dependencies": ["a", "b"]}
        ]
    }"#;

    const CYCLIC: &str = r#"{
        "expr": "x",
        "stubs": [
            {"call_id": "a", "expr": "1"},
            {"call_id": "x", "expr": "Stub('y')", "dependencies": ["y"]},
            {"call_id": "y", "expr": "Stub('x')", "dependencies": ["x"]},
            {"call_id": "@root", "expr": "Stub('a')", "dependencies": ["a"]}
        ]
    }"#;

    fn write_manifest(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[tokio::test]
    async fn test_plan_uses_file_stem_as_contract_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "swing.json", DIAMOND);

        let report = cmd_plan(&path, None, EngineConfig::default()).await.unwrap();

        assert_eq!(report.summary.contract_id, CallId::from("swing"));
        assert_eq!(report.summary.call_count, 3);
        assert_eq!(
            report.dependents[&CallId::from("a")],
            vec![CallId::from("swing")]
        );
    }

    #[tokio::test]
    async fn test_plan_text_shows_chain_from_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "m.json", DIAMOND);

        let report = cmd_plan(&path, Some("R"), EngineConfig::default())
            .await
            .unwrap();
        let text = render_plan_text(&report);

        assert!(text.contains("leaves     a, b"));
        assert!(text.contains("chain      R -> a -> b -> R"));
    }

    #[tokio::test]
    async fn test_plan_json_flattens_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "m.json", DIAMOND);

        let report = cmd_plan(&path, Some("R"), EngineConfig::default())
            .await
            .unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["execution_order"], serde_json::json!(["a", "b", "R"]));
        assert_eq!(value["dependents"]["b"], serde_json::json!(["R"]));
    }

    #[tokio::test]
    async fn test_plan_missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_plan(
            &dir.path().join("absent.json"),
            None,
            EngineConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("Failed to read stub manifest"));
    }

    #[test]
    fn test_check_passes_well_formed_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "m.json", DIAMOND);

        let report = cmd_check(&path, None).unwrap();

        assert!(report.passed());
        assert_eq!(report.scheduled, 3);
    }

    #[test]
    fn test_check_reports_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_manifest(&dir, "m.json", CYCLIC);

        let report = cmd_check(&path, None).unwrap();

        assert!(!report.passed());
        assert_eq!(
            report.unscheduled,
            vec![CallId::from("x"), CallId::from("y")]
        );
        assert!(report.ordering_error.is_some());
        assert!(render_check_text(&report).contains("never scheduled: x, y"));
    }
}
