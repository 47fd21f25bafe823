//! Interactive agent session.
//!
//! Tool-selection rounds run non-streamed so tool_calls can be parsed
//! whole; once the tools have run, the final answer is requested again
//! with streaming so the user sees text as it is generated.

use std::io::{BufRead, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::llm::{ChatClient, LlmError};
use crate::tools::{tool_schemas, ToolRouter};

/// Cap on consecutive tool rounds per question. Keeps a confused model
/// from looping on tool calls forever.
const MAX_TOOL_ROUNDS: usize = 4;

const SYSTEM_PROMPT: &str = "You are a Windows system administration assistant. You answer \
questions about the local machine by calling the provided WMI tools and summarizing their \
output.\n\
\n\
Guidelines:\n\
- Always call a tool to get live data; never invent system facts.\n\
- Pick the most specific tool for the question. Use execute_wql_query only when no \
dedicated tool fits.\n\
- Report sizes in human-readable units and keep answers short and factual.\n\
- If a tool returns an error, explain it plainly and suggest what the user can do \
(for example, re-running from an elevated prompt).";

pub struct AgentSession {
    client: ChatClient,
    router: ToolRouter,
    messages: Vec<Value>,
}

impl AgentSession {
    pub fn new(client: ChatClient, router: ToolRouter) -> Self {
        Self {
            client,
            router,
            messages: vec![json!({"role": "system", "content": SYSTEM_PROMPT})],
        }
    }

    fn reset(&mut self) {
        self.messages.truncate(1);
    }

    /// Answer one question, running tool rounds as needed.
    pub async fn ask(&mut self, question: &str) -> Result<(), LlmError> {
        self.messages
            .push(json!({"role": "user", "content": question}));
        let tools = tool_schemas();

        for round in 0..MAX_TOOL_ROUNDS {
            let spinner = thinking_spinner();
            let outcome = self.client.chat(&self.messages, Some(&tools)).await;
            spinner.finish_and_clear();
            let outcome = outcome?;

            if outcome.tool_calls.is_empty() {
                // The model answered directly without tools.
                if let Some(content) = outcome.content {
                    println!("{}", content);
                    self.messages
                        .push(json!({"role": "assistant", "content": content}));
                    return Ok(());
                }
                break;
            }

            debug!(round, tool_calls = outcome.tool_calls.len(), "tool round");
            self.messages.push(outcome.raw_message.clone());
            for call in &outcome.tool_calls {
                println!(
                    "{} {}",
                    "[tool]".dimmed(),
                    call.function.name.dimmed()
                );
                let result = self
                    .router
                    .call(&call.function.name, &call.function.arguments)
                    .await;
                self.messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result,
                }));
            }
        }

        // Final pass without tools, streamed to the terminal.
        let answer = self.client.chat_stream(&self.messages).await?;
        self.messages
            .push(json!({"role": "assistant", "content": answer}));
        Ok(())
    }

    /// Single-shot mode: one question, then exit.
    pub async fn run_once(&mut self, question: &str) -> Result<(), LlmError> {
        self.ask(question).await
    }

    /// Interactive loop over stdin.
    pub async fn run(&mut self) -> Result<(), LlmError> {
        print_banner(self.client.model(), &self.client.provider().to_string());

        let stdin = std::io::stdin();
        loop {
            print!("{} ", "You>".cyan().bold());
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("stdin read failed: {}", e);
                    break;
                }
            }
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            match input {
                "/exit" | "/quit" => break,
                "/help" => {
                    print_help();
                    continue;
                }
                "/clear" => {
                    self.reset();
                    // Clear screen and move the cursor home.
                    print!("\x1B[2J\x1B[1;1H");
                    let _ = std::io::stdout().flush();
                    println!("{}", "Conversation cleared.".dimmed());
                    continue;
                }
                _ => {}
            }

            if let Err(e) = self.ask(input).await {
                eprintln!("{} {}", "[ERROR]".red().bold(), e);
            }
            println!();
        }
        println!("{}", "Goodbye.".dimmed());
        Ok(())
    }
}

fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

fn print_banner(model: &str, provider: &str) {
    println!("{}", "WMI Agent".green().bold());
    println!(
        "{} {} {} {}",
        "Provider:".dimmed(),
        provider,
        "Model:".dimmed(),
        model
    );
    println!(
        "{}",
        "Ask about this machine in plain language. /help for commands.".dimmed()
    );
    println!();
}

fn print_help() {
    println!("Commands:");
    println!("  /help   Show this help");
    println!("  /clear  Clear the screen and conversation history");
    println!("  /exit   Leave the agent (also /quit)");
}
