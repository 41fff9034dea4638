//! Switchboard CLI - intent routing and remote agent dispatch

use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use switchboard_core::api::{self, AppState};
use switchboard_core::config::{Config, EmbedderKind};
use switchboard_core::dispatch::{ChatRequest, Orchestrator};
use switchboard_core::intent::{
    Embedder, HashingEmbedder, IntentCatalog, IntentClassifier, IntentRouter, RequestContext,
    RoutingDecision, SimilarityClassifier,
};
use switchboard_core::llm::LlmClient;
use switchboard_core::remote::{EndpointRegistry, RemoteAgentClient};
use tracing::info;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(author, version, about = "Intent routing and remote agent dispatch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chat API
    Serve {
        /// Bind host (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show which agent a query would be routed to
    Route {
        query: String,
        /// User info as a JSON object
        #[arg(long)]
        user_info: Option<String>,
        /// Previous queries of the session
        #[arg(long = "history")]
        history: Vec<String>,
        /// Re-evaluate low-confidence decisions with the reasoning service
        #[arg(long)]
        escalate: bool,
    },

    /// Answer a message through the full pipeline
    Ask {
        message: String,
        /// User info as a JSON object
        #[arg(long)]
        user_info: Option<String>,
        #[arg(long)]
        session_id: Option<String>,
        /// Skip the final formatting pass and print the raw orchestration result
        #[arg(long)]
        raw: bool,
    },

    /// Send a message straight to one remote agent
    Dispatch {
        /// Agent name, e.g. order_query_agent
        service: String,
        message: String,
    },

    /// List the routing categories and their example phrases
    Categories,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show every configuration value
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("switchboard=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(host, port).await,

        Commands::Route {
            query,
            user_info,
            history,
            escalate,
        } => {
            let context = build_context(user_info.as_deref(), None, history)?;
            cmd_route(&query, context, escalate, cli.format).await
        }

        Commands::Ask {
            message,
            user_info,
            session_id,
            raw,
        } => cmd_ask(message, user_info.as_deref(), session_id, raw, cli.format).await,

        Commands::Dispatch { service, message } => cmd_dispatch(&service, &message, cli.quiet).await,

        Commands::Categories => cmd_categories(cli.format),

        Commands::Config { action } => cmd_config(action),
    }
}

fn llm_client(config: &Config) -> anyhow::Result<Arc<LlmClient>> {
    let api_key = config
        .llm
        .resolved_api_key()?
        .ok_or_else(|| anyhow!("No API key configured. Set SWITCHBOARD_API_KEY or OPENAI_API_KEY"))?;
    Ok(Arc::new(LlmClient::new(config.llm.clone(), api_key)?))
}

fn load_catalog(config: &Config) -> anyhow::Result<IntentCatalog> {
    match &config.router.intentions_path {
        Some(path) => IntentCatalog::load(path)
            .with_context(|| format!("Failed to load intent catalog: {}", path.display())),
        None => Ok(IntentCatalog::builtin()),
    }
}

fn build_context(
    user_info: Option<&str>,
    session_id: Option<String>,
    history: Vec<String>,
) -> anyhow::Result<RequestContext> {
    let mut context = RequestContext::default().with_previous_queries(history);
    if let Some(raw) = user_info {
        let value: serde_json::Value =
            serde_json::from_str(raw).context("--user-info must be valid JSON")?;
        context = context.with_user_info(value);
    }
    if let Some(id) = session_id {
        context = context.with_session_id(id);
    }
    Ok(context)
}

async fn build_orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let llm = llm_client(config)?;
    let orchestrator = Orchestrator::from_config(config, llm.clone(), llm).await?;
    info!(
        services = orchestrator.registry().len(),
        threshold = config.router.threshold,
        "Orchestrator ready"
    );
    Ok(orchestrator)
}

async fn cmd_serve(host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let addr = config.server.socket_addr()?;

    let orchestrator = build_orchestrator(&config).await?;
    let state = Arc::new(AppState::new(Arc::new(orchestrator)));
    api::serve(state, addr).await?;
    Ok(())
}

async fn cmd_route(
    query: &str,
    context: RequestContext,
    escalate: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = Config::load()?;

    // the hashing embedder needs no credentials
    let llm = match (config.router.embedder, escalate) {
        (EmbedderKind::Hashing, false) => None,
        _ => Some(llm_client(&config)?),
    };
    let embedder: Arc<dyn Embedder> = match (&llm, config.router.embedder) {
        (Some(llm), EmbedderKind::Remote) => llm.clone(),
        _ => Arc::new(HashingEmbedder::default()),
    };

    let classifier = SimilarityClassifier::build(embedder, load_catalog(&config)?).await?;
    let router = Arc::new(IntentRouter::from_config(Arc::new(classifier), &config.router));

    let decision = match llm {
        Some(llm) if escalate => {
            IntentClassifier::new(router, llm)
                .with_escalation_confidence(config.router.escalation_confidence)
                .classify_intent(query, Some(&context))
                .await?
        }
        _ => router.route_with_context(query, Some(&context)).await,
    };

    print_decision(&decision, format)
}

fn print_decision(decision: &RoutingDecision, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(decision)?);
        return Ok(());
    }

    println!("Agent:      {}", decision.selected_agent);
    println!("Confidence: {:.2}", decision.confidence);
    println!("Reasoning:  {}", decision.reasoning);
    if let Some(scores) = &decision.all_scores
        && !scores.is_empty()
    {
        println!("Scores:");
        for (category, score) in scores {
            println!("  {:<30} {:.3}", category.as_str(), score);
        }
    }
    Ok(())
}

async fn cmd_ask(
    message: String,
    user_info: Option<&str>,
    session_id: Option<String>,
    raw: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let orchestrator = build_orchestrator(&config).await?;

    let context = build_context(user_info, session_id, Vec::new())?;
    let request = ChatRequest {
        message,
        user_info: context.user_info,
        session_id: context.session_id,
        history: Vec::new(),
    };

    let answer = if raw {
        orchestrator
            .route_task(&request.message, Some(&request.context()))
            .await?
    } else {
        orchestrator.handle_chat(&request).await?
    };

    if format == OutputFormat::Json {
        println!("{}", serde_json::json!({"status": "success", "result": answer}));
    } else {
        println!("{}", answer);
    }
    Ok(())
}

async fn cmd_dispatch(service: &str, message: &str, quiet: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    let registry = EndpointRegistry::from_config(&config.agents);
    let (_, endpoint) = registry.resolve(service)?;
    let client = RemoteAgentClient::from_config(&config.dispatch)?;

    if !quiet {
        eprintln!("Dispatching to {} at {}", service, endpoint);
    }
    let outcome = client.send_and_wait(endpoint, service, message).await;
    println!("{}", outcome.render(service));

    if outcome.is_completed() {
        Ok(())
    } else {
        Err(anyhow!("Service {} did not complete the task", service))
    }
}

fn cmd_categories(format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load()?;
    let catalog = load_catalog(&config)?;

    if format == OutputFormat::Json {
        let map: serde_json::Map<String, serde_json::Value> = catalog
            .iter()
            .map(|(category, examples)| (category.as_str().to_string(), serde_json::json!(examples)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        println!("{}", catalog.describe());
    }
    Ok(())
}

fn cmd_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            for (key, value) in config.list()? {
                println!("{} = {}", key, value);
            }
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}
