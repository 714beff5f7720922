//! Parley - bounded multi-agent conversations
//!
//! Runs the canned group-chat, crew and research conversations from the
//! command line, or serves a single-agent chat endpoint over HTTP.

mod api;
mod cli;
mod client;
mod config;
mod conversation;
mod error;
mod llm;
mod prompt;
mod responders;
mod scenarios;
mod search;
mod tools;

use api::{create_router, AppState};
use clap::Parser;
use cli::{Cli, Command, LogFormat};
use client::{ChatClient, FrontendRequest};
use config::{ClientSettings, Config};
use conversation::{ConversationEvent, ConversationOutcome};
use llm::ModelRegistry;
use scenarios::{Collaborators, Scenario};
use search::{SearchService, TavilySearch};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "parley=info,tower_http=info".into());
    // Logs stay off stdout, which carries the transcript
    tracing_subscriber::registry()
        .with(filter)
        .with(log_layer(format, std::io::stderr))
        .init();
}

fn log_layer<S, W>(format: LogFormat, writer: W) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_writer(writer).boxed(),
    }
}

async fn run(command: Command) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // `ask` only talks to a running server and needs no credentials
    if let Command::Ask(args) = command {
        let mut settings = ClientSettings::from_env();
        if let Some(url) = args.url {
            settings.chat_url = url;
        }
        let client = ChatClient::new(&settings)?;
        let reply = client
            .submit(FrontendRequest {
                system_prompt: args.system_prompt,
                model_name: args.model,
                query: args.query,
                allow_search: args.allow_search,
            })
            .await?;
        println!("{reply}");
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::from_env()?;
    let registry = Arc::new(ModelRegistry::new(&config.llm)?);
    let search: Option<Arc<dyn SearchService>> = match &config.search {
        Some(settings) => Some(Arc::new(TavilySearch::new(settings)?) as Arc<dyn SearchService>),
        None => None,
    };
    tracing::info!(
        models = ?registry.available_models(),
        default = %registry.default_model_id(),
        search = search.is_some(),
        "LLM registry initialized"
    );

    let scenario = match command {
        Command::Serve(args) => {
            let port = args.port.unwrap_or(config.port);
            serve(
                AppState::new(
                    registry,
                    search,
                    config.llm.max_completion_tokens,
                    config.loop_defaults,
                ),
                port,
            )
            .await?;
            return Ok(ExitCode::SUCCESS);
        }
        command => {
            let llm = registry.default().ok_or("no model configured")?;
            let collab = Collaborators {
                llm,
                search,
                max_completion_tokens: config.llm.max_completion_tokens,
                loop_defaults: config.loop_defaults,
            };
            build_scenario(command, &collab)?
        }
    };

    let outcome = run_scenario(scenario).await?;
    Ok(if outcome.reason.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_scenario(
    command: Command,
    collab: &Collaborators,
) -> Result<Scenario, config::ConfigError> {
    match command {
        Command::GroupChat(args) => scenarios::group_chat::build(
            collab,
            scenarios::group_chat::GroupChatOptions {
                task: args
                    .task
                    .unwrap_or_else(|| scenarios::group_chat::DEFAULT_TASK.to_string()),
                moderated: args.moderated,
                max_turns: args.max_turns,
            },
        ),
        Command::Crew(args) => scenarios::content_crew::build(collab, &args.topic),
        Command::Research(args) => scenarios::fact_check::build(collab, args.question.as_deref()),
        Command::Serve(_) | Command::Ask(_) => Err(config::ConfigError::Setup(
            "not a conversation command".to_string(),
        )),
    }
}

/// Run a scenario, printing each message as it is accepted
async fn run_scenario(scenario: Scenario) -> Result<ConversationOutcome, Box<dyn std::error::Error>> {
    let (tx, mut rx) = broadcast::channel(64);
    let printer = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event printer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current turn");
            interrupt.cancel();
        }
    });

    let outcome = scenario.with_events(tx).with_cancel(cancel).run().await;
    // Sender dropped with the loop, so the printer drains and exits
    printer.await?;
    let outcome = outcome?;

    println!("\n==== {} after {} turn(s)", outcome.reason, outcome.turn_count);
    if let Some(output) = outcome.final_output() {
        println!("\nFinal output:\n\n{output}");
    }
    Ok(outcome)
}

fn print_event(event: &ConversationEvent) {
    match event {
        ConversationEvent::Message { message, .. } => {
            println!("\n[{}] {}:\n{}", message.order, message.sender, message.content);
        }
        ConversationEvent::Retrying {
            speaker,
            attempt,
            error,
            ..
        } => {
            eprintln!("  ({speaker} failed: {error}; retry attempt {attempt})");
        }
        ConversationEvent::TurnStarted { .. } | ConversationEvent::Finished { .. } => {}
    }
}

async fn serve(state: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("Parley chat endpoint listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
