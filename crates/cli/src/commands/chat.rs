//! `doppel chat`: interactive or single-message chat.
//!
//! History lives in this process and is replayed to the pipeline on every
//! call. Turns are also written to the configured store.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use doppel_agent::Pipeline;
use doppel_core::{EventSink, PipelineResult, Role, TranscriptRecord, Turn};
use doppel_store::Store;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DOPPEL_API_KEY, GROQ_API_KEY, OPENAI_API_KEY");
        eprintln!();
        eprintln!("  Or add api_key to {}", super::config_path(config_path).display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let router = doppel_providers::build_from_config(&config)?;
    let provider = router
        .default()
        .ok_or_else(|| format!("Provider '{}' is not configured", config.provider))?;
    let store = doppel_store::open(&config.store).await?;
    let sink: Arc<dyn EventSink> = store.clone();
    let pipeline = Pipeline::from_config(&config, provider, sink)?;

    let mut session = Session::new(pipeline, store);

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let result = session.send(&msg).await;
        eprint!("\r              \r");
        println!("{}", result.text);
        return Ok(());
    }

    println!();
    println!("  Doppel, interactive mode");
    println!();
    println!("  Persona:       {}", session.pipeline.owner_name());
    println!("  Provider:      {}", config.provider);
    println!("  Model:         {}", config.model);
    println!("  Known people:  {}", session.pipeline.roster().len());
    println!("  Conversation:  {}", session.conversation_id);
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        eprint!("  ...");
        let result = session.send(line).await;
        eprint!("\r     \r");
        println!();
        for text_line in result.text.lines() {
            println!("  {} > {text_line}", session.pipeline.owner_name());
        }
        if result.blocked {
            if let Some(reason) = result.reason {
                println!("  [blocked: {reason}]");
            }
        }
        println!();
        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()
}

/// One conversation: the pipeline, its in-process history, and the store
/// the turns are mirrored into.
struct Session {
    pipeline: Pipeline,
    store: Arc<dyn Store>,
    conversation_id: String,
    history: Vec<Turn>,
}

impl Session {
    fn new(pipeline: Pipeline, store: Arc<dyn Store>) -> Self {
        Self {
            pipeline,
            store,
            conversation_id: uuid::Uuid::new_v4().to_string(),
            history: Vec::new(),
        }
    }

    async fn send(&mut self, message: &str) -> PipelineResult {
        let result = self
            .pipeline
            .respond_in(Some(&self.conversation_id), message, &self.history)
            .await;

        self.history.push(Turn::user(message));
        self.history.push(Turn::assistant(result.text.clone()));

        for (role, text) in [(Role::User, message), (Role::Assistant, result.text.as_str())] {
            let record = TranscriptRecord::now(&self.conversation_id, role, text);
            if let Err(e) = self.store.record_turn(record).await {
                tracing::warn!(error = %e, "Failed to store turn");
            }
        }

        result
    }
}
