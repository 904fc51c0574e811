//! `pathcoach chat`: Interactive or single-message coaching.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pathcoach_agent::{ConversationLoop, ConversationRequest, FinalReply, ReplySource, Turn, TurnRole};
use pathcoach_config::AppConfig;
use pathcoach_core::progress::{ChatLog, ChatRole, NewChatEntry};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use super::{load_config, open_store, read_catalog_json};

/// One user's conversation across CLI turns.
pub(crate) struct Session {
    user_id: String,
    system_prompt: Option<String>,
    pathways_json: Option<String>,
    history: Vec<Turn>,
}

impl Session {
    pub(crate) fn new(
        user_id: impl Into<String>,
        system_prompt: Option<String>,
        pathways_json: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            system_prompt,
            pathways_json,
            history: Vec::new(),
        }
    }

    /// The request for the next user message: system prompt, earlier turns,
    /// then the message.
    pub(crate) fn request(&self, message: &str) -> ConversationRequest {
        let mut transcript = Vec::with_capacity(self.history.len() + 2);
        if let Some(prompt) = self.system_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
            transcript.push(Turn::system(prompt));
        }
        transcript.extend(self.history.iter().cloned());
        transcript.push(Turn::user(message));

        ConversationRequest {
            user_id: self.user_id.clone(),
            transcript,
            pathways_json: self.pathways_json.clone(),
        }
    }

    pub(crate) fn record(&mut self, message: &str, reply: &FinalReply) {
        self.history.push(Turn::user(message));
        self.history.push(Turn {
            role: TurnRole::Assistant,
            content: reply.content.clone(),
        });
    }

    pub(crate) async fn ask(
        &mut self,
        conversation: &ConversationLoop,
        chat_log: &dyn ChatLog,
        message: &str,
        timeout: Option<Duration>,
    ) -> anyhow::Result<FinalReply> {
        let request = self.request(message);
        let reply = match timeout {
            Some(limit) => tokio::time::timeout(limit, conversation.run(request))
                .await
                .with_context(|| format!("No reply within {}s", limit.as_secs()))??,
            None => conversation.run(request).await?,
        };

        debug!(rounds = reply.rounds, source = ?reply.source, "Reply ready");
        self.record(message, &reply);
        self.log(chat_log, ChatRole::User, message).await;
        self.log(chat_log, ChatRole::Bot, &reply.content).await;
        Ok(reply)
    }

    async fn log(&self, chat_log: &dyn ChatLog, role: ChatRole, text: &str) {
        let entry = NewChatEntry {
            user_id: self.user_id.clone(),
            role,
            text: text.to_string(),
            pathway_id: None,
        };
        if let Err(e) = chat_log.append(entry).await {
            warn!(error = %e, "Failed to save chat entry");
        }
    }
}

pub async fn run(
    message: Option<String>,
    user: String,
    pathways: Option<PathBuf>,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let config = load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    OPENAI_API_KEY     = 'sk-...'");
        eprintln!("    PATHCOACH_API_KEY  = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        anyhow::bail!("No API key found. See above for setup instructions.");
    }

    let pathways_json = pathways.as_deref().map(read_catalog_json).transpose()?;
    let store = Arc::new(open_store(&config));
    let conversation = ConversationLoop::from_config(&config, store.clone(), store.clone())?;
    let timeout = timeout_secs.map(Duration::from_secs);
    let mut session = Session::new(user, config.conversation.system_prompt.clone(), pathways_json);

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let reply = session.ask(&conversation, &*store, &msg, timeout).await;
        eprint!("\r              \r");
        println!("{}", reply?.content);
        return Ok(());
    }

    println!();
    println!("  PathCoach — Interactive Mode");
    println!();
    println!("  User:      {}", session.user_id);
    println!("  Model:     {}", config.provider.model);
    println!("  Store:     {}", store.path().display());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            prompt()?;
            continue;
        }
        if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
            break;
        }

        eprint!("  ...");
        let result = session.ask(&conversation, &*store, line, timeout).await;
        eprint!("\r     \r");

        match result {
            Ok(reply) => {
                println!();
                let label = match reply.source {
                    ReplySource::Model => "Coach",
                    ReplySource::Fallback => "Coach*",
                };
                for text_line in reply.content.lines() {
                    println!("  {label} > {text_line}");
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e:#}");
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!("  Hasta pronto!");
    println!();
    Ok(())
}

fn prompt() -> anyhow::Result<()> {
    print!("  You > ");
    std::io::stdout().flush()?;
    Ok(())
}
