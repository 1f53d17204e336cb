//! Process entrypoint: reads [`AppConfig`], wires every crate's reference
//! implementation together, and runs until interrupted (§5 PROCESS
//! LIFECYCLE).
//!
//! This binary is the one place the workspace commits to concrete
//! choices the library crates leave abstract: which [`Store`] backend,
//! which [`MemoryInterface`], which providers sit behind the
//! [`Router`]. Swapping any of those is a matter of changing this file,
//! not the crates it wires.

mod config;
mod handlers;
mod providers;
mod scheduler;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use warden_cron::CronDriver;
use warden_domain::{AgentBundle, ChannelType};
use warden_ingest::{GenericWebhookAdapter, Ingestor};
use warden_policy::ToolCatalog;
use warden_router::{Router, RouterConfig};
use warden_selfupdate::Pipeline as SelfUpdatePipeline;
use warden_step::{OrchestratorStep, StepConfig};
use warden_store::{InMemoryStore, Store};
use warden_task::{spawn_supervisor, PeriodicEntry, Runner};
use warden_tool::{HostExecTool, ToolDyn, ToolRegistry, ToolRuntime};
use warden_trace::{EventLog, InMemoryEventLog};
use warden_turn::NoCompaction;

use config::{AppConfig, ProviderKind};
use handlers::{AgentStepHandler, CompactionHandler, SelfUpdateStage, SelfUpdateStageHandler};
use providers::AlwaysHealthy;
use scheduler::SchedulerTickHandler;

const DEFAULT_CONFIG_PATH: &str = "warden.toml";
const MAX_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    if let Err(err) = run().await {
        tracing::error!(error = %err, "warden exited with an error");
        std::process::exit(1);
    }
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("failed to ingest stdin payload: {0}")]
    Ingest(#[from] warden_ingest::IngestError),
    #[error("failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),
    #[error("stdin payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// `--ingest` reads one JSON payload from stdin and routes it through
/// `warden-ingest` as a CLI-channel delivery, then exits once it has
/// been enqueued. Without it, the process just runs its task runner,
/// cron supervisor, and periodic entries until interrupted — the
/// long-running shape a real inbound channel (HTTP webhook, WhatsApp
/// bridge) would drive via the same `Ingestor`.
fn parse_args() -> (PathBuf, bool) {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut ingest_stdin = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                }
            }
            "--ingest" => ingest_stdin = true,
            other => tracing::warn!(flag = %other, "ignoring unrecognized argument"),
        }
    }
    (config_path, ingest_stdin)
}

async fn run() -> Result<(), AppError> {
    let (config_path, ingest_stdin) = parse_args();

    let cfg = if config_path.exists() {
        AppConfig::load(&config_path)?
    } else {
        tracing::info!(path = %config_path.display(), "no config file found, using defaults");
        AppConfig::default()
    };

    let store: Arc<dyn Store> = build_store(&cfg);
    let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new(true));

    let (tool_registry, tool_catalog) = build_tools();
    let tool_runtime = Arc::new(ToolRuntime::from_registry(
        tool_catalog,
        &tool_registry,
        Arc::clone(&event_log),
        MAX_TOOL_TIMEOUT,
    ));

    let router = Arc::new(build_router(&cfg, Arc::clone(&event_log)));

    let step = Arc::new(OrchestratorStep::new(
        Arc::clone(&store),
        Arc::clone(&event_log),
        router,
        tool_registry,
        tool_runtime,
        Arc::new(warden_memory::NullMemory),
        Box::new(NoCompaction),
        StepConfig {
            max_tokens: cfg.step.max_tokens,
            recent_tail_turns: cfg.step.recent_tail_turns,
            retrieval_k: cfg.step.retrieval_k,
            default_compaction_interval: cfg.step.default_compaction_interval,
            ..StepConfig::default()
        },
    ));

    let agent = AgentBundle {
        agent_id: cfg.agent.agent_id.clone(),
        identity: cfg.agent.identity.clone(),
        persona: cfg.agent.persona.clone(),
        heartbeat: cfg.agent.heartbeat.clone(),
        governance: cfg.governance(),
        is_primary: cfg.agent.is_primary,
    };

    let runner = Runner::new(cfg.runner_config(), Arc::clone(&event_log), "warden-app");
    runner.register(Arc::new(AgentStepHandler::new(Arc::clone(&store), Arc::clone(&step), agent)));
    runner.register(Arc::new(CompactionHandler::new(Arc::clone(&event_log))));

    let selfupdate = Arc::new(SelfUpdatePipeline::new(
        Arc::clone(&store),
        Arc::clone(&event_log),
        cfg.selfupdate_config(),
    ));
    runner.register(Arc::new(SelfUpdateStageHandler::new(SelfUpdateStage::Validate, Arc::clone(&selfupdate))));
    runner.register(Arc::new(SelfUpdateStageHandler::new(SelfUpdateStage::Test, Arc::clone(&selfupdate))));
    runner.register(Arc::new(SelfUpdateStageHandler::new(SelfUpdateStage::Apply, Arc::clone(&selfupdate))));

    let cron_driver = Arc::new(CronDriver::new(
        Arc::clone(&store),
        Arc::clone(&runner),
        Arc::clone(&event_log),
        "warden-cron",
    ));
    runner.register(Arc::new(SchedulerTickHandler::new(Arc::clone(&cron_driver))));

    let supervisor = spawn_supervisor(
        Arc::clone(&runner),
        vec![PeriodicEntry {
            lane: "agent_default".to_string(),
            handler_name: "scheduler_tick".to_string(),
            interval: Duration::from_secs(cfg.cron.tick_interval_secs.max(1)),
            payload: serde_json::json!({}),
        }],
        Duration::from_secs(1),
    );

    let ingestor = Ingestor::new(Arc::clone(&store), Arc::clone(&event_log), Arc::clone(&runner));

    if ingest_stdin {
        ingest_one_from_stdin(&ingestor).await?;
    }

    tracing::info!("warden running; press ctrl-c to shut down");
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for ctrl-c, shutting down anyway");
    }

    tracing::info!("shutdown requested, draining in-flight tasks");
    supervisor.abort();
    runner.shutdown().await;
    tracing::info!("shutdown complete");

    Ok(())
}

async fn ingest_one_from_stdin(ingestor: &Ingestor) -> Result<(), AppError> {
    use std::io::Read;
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    let payload: serde_json::Value = serde_json::from_str(raw.trim())?;
    let adapter = GenericWebhookAdapter::new(ChannelType::Cli);
    let outcome = ingestor.ingest(&adapter, &payload).await?;
    tracing::info!(?outcome, "ingested stdin payload");
    Ok(())
}

fn build_store(cfg: &AppConfig) -> Arc<dyn Store> {
    match cfg.store.backend.as_str() {
        "memory" => Arc::new(InMemoryStore::new()),
        other => {
            tracing::warn!(
                backend = other,
                "no durable Store backend is wired in yet; falling back to the in-memory reference store"
            );
            Arc::new(InMemoryStore::new())
        }
    }
}

/// A single `host_exec` registration: the only tool the reference
/// process exposes out of the box. Real deployments register more
/// through the same `ToolRegistry`/`ToolCatalog` pair.
fn build_tools() -> (ToolRegistry, ToolCatalog) {
    use warden_domain::RiskTier;
    use warden_policy::ToolRegistration as PolicyRegistration;

    let mut registry = ToolRegistry::new();
    let host_exec: Arc<dyn ToolDyn> = Arc::new(HostExecTool::new(
        vec!["PATH".to_string(), "HOME".to_string(), "LANG".to_string()],
        vec![std::env::temp_dir()],
    ));
    registry.register(host_exec);

    let catalog = ToolCatalog::new(vec![PolicyRegistration::simple("host_exec", RiskTier::High)
        .with_path_args(["/cwd"])]);

    (registry, catalog)
}

fn make_provider(kind: ProviderKind, cfg: &AppConfig) -> Arc<dyn warden_router::ErasedProvider> {
    match kind {
        ProviderKind::Anthropic => {
            Arc::new(AlwaysHealthy(warden_provider_anthropic::AnthropicProvider::new(
                cfg.provider.anthropic_api_key.clone(),
            )))
        }
        ProviderKind::OpenAi => Arc::new(AlwaysHealthy(warden_provider_openai::OpenAIProvider::new(
            cfg.provider.openai_api_key.clone(),
        ))),
        ProviderKind::Ollama => Arc::new(AlwaysHealthy(warden_provider_ollama::OllamaProvider::new())),
    }
}

fn build_router(cfg: &AppConfig, event_log: Arc<dyn EventLog>) -> Router {
    Router::new(
        make_provider(cfg.provider.primary, cfg),
        make_provider(cfg.provider.fallback, cfg),
        event_log,
        "warden-router",
        RouterConfig::default(),
    )
}
