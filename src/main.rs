//! Kube Voice - Entry Point
//!
//! `serve` answers Alexa skill requests over HTTP. `chat` runs the same
//! dispatcher from a terminal, one intent per line, against either a live
//! cluster or a fixture file.

use kube_voice::cluster::{ClusterApi, InMemoryCluster, RestCluster};
use kube_voice::core::config::SKILL_ID_ENV_VAR;
use kube_voice::core::error::{Result, SkillError};
use kube_voice::core::{SessionState, SkillConfig, Slots};
use kube_voice::dispatch::{Dispatcher, HandlerRegistry, RequestInfo, VoiceEvent};
use kube_voice::handlers::SpeechResponse;
use kube_voice::platform::{server, ApplicationGate, AppState};

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Voice commands for Kubernetes and OpenShift
#[derive(Parser, Debug)]
#[command(name = "kube-voice")]
#[command(about = "Answer Alexa skill requests against a Kubernetes or OpenShift cluster")]
struct Args {
    /// TOML configuration file (environment variables override it)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the skill endpoint over HTTP
    Serve,
    /// Talk to the skill from the terminal
    Chat {
        /// Use an in-memory cluster loaded from this fixture
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = SkillConfig::load(args.config.as_deref())?;

    // Logs go to stderr so they do not interleave with chat replies
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("Kube Voice starting...");

    let rt = Runtime::new()?;
    match args.command {
        Command::Serve => rt.block_on(serve(config)),
        Command::Chat { fixture } => {
            let cluster = rt.block_on(connect(&config, fixture.as_deref()))?;
            let dispatcher = Dispatcher::new(HandlerRegistry::standard(), cluster)?;
            chat(&rt, &dispatcher)
        }
    }
}

async fn connect(config: &SkillConfig, fixture: Option<&Path>) -> Result<Arc<dyn ClusterApi>> {
    match fixture {
        Some(path) => {
            tracing::info!("Using fixture cluster from {}", path.display());
            Ok(Arc::new(InMemoryCluster::from_file(path)?))
        }
        None => Ok(Arc::new(RestCluster::connect(&config.cluster).await?)),
    }
}

async fn serve(config: SkillConfig) -> Result<()> {
    if config.accepted_application_ids.is_empty() {
        return Err(SkillError::Config(format!(
            "no accepted application IDs; set {} or accepted_application_ids",
            SKILL_ID_ENV_VAR
        )));
    }
    if config.cluster.api_url.is_none() {
        return Err(SkillError::Config(
            "no API server; set KUBERNETES_API_URL or cluster.api_url".into(),
        ));
    }

    let addr = config.bind_addr()?;
    let cluster = connect(&config, None).await?;
    let dispatcher = Dispatcher::new(HandlerRegistry::standard(), cluster)?;
    let gate = ApplicationGate::new(config.accepted_application_ids.iter().cloned());
    server::serve(AppState::new(dispatcher, gate), addr).await
}

fn chat(rt: &Runtime, dispatcher: &Dispatcher) -> Result<()> {
    println!("\n=== KUBE VOICE ===");
    println!();
    println!("Commands:");
    println!("  launch                    - Open the skill");
    println!("  <Intent> [Key=Value ...]  - Send an intent, e.g. GetServices Namespace=default");
    println!("  session / s               - Show session attributes");
    println!("  intents / i               - List known intents");
    println!("  quit / q                  - Exit");
    println!();

    let info = RequestInfo::new("chat", "chat");
    let mut session = SessionState::new();
    rt.block_on(dispatcher.dispatch(&info, &VoiceEvent::SessionStarted, &mut session))?;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input == "quit" || input == "q" {
            break;
        }

        if input == "session" || input == "s" {
            if session.is_empty() {
                println!("(empty session)");
            }
            for (key, value) in session.iter() {
                println!("  {} = {}", key, value);
            }
            continue;
        }

        if input == "intents" || input == "i" {
            for name in dispatcher.registry().names() {
                println!("  {}", name);
            }
            continue;
        }

        let event = if input == "launch" {
            VoiceEvent::Launch
        } else {
            match parse_intent_line(input) {
                Ok(event) => event,
                Err(message) => {
                    println!("{}", message);
                    continue;
                }
            }
        };

        if let Some(reply) = rt.block_on(dispatcher.dispatch(&info, &event, &mut session))? {
            print_reply(&reply);
            if reply.should_end_session {
                session = SessionState::new();
            }
        }
    }

    rt.block_on(dispatcher.dispatch(&info, &VoiceEvent::SessionEnded, &mut session))?;
    Ok(())
}

/// `<Intent> [Key=Value ...]`
fn parse_intent_line(line: &str) -> std::result::Result<VoiceEvent, String> {
    let mut parts = line.split_whitespace();
    let name = parts.next().ok_or("Usage: <Intent> [Key=Value ...]")?;
    let slots = parts
        .map(|part| {
            part.split_once('=')
                .ok_or_else(|| format!("Slot '{}' is not Key=Value", part))
        })
        .collect::<std::result::Result<Slots, String>>()?;
    Ok(VoiceEvent::Intent {
        name: Some(name.to_string()),
        slots,
    })
}

fn print_reply(reply: &SpeechResponse) {
    println!();
    println!("{}", reply.spoken_text);
    if let (Some(title), Some(body)) = (&reply.card_title, &reply.card_body) {
        println!("  [{}: {}]", title, body);
    }
    println!();
}
