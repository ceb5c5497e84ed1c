//! Interactive driver: startup flow, the prompt loop, and action handlers.
//!
//! Every handler reports its own failures to the user and returns to the
//! loop. Only closed input ends the session early.

use std::io;

use colloquy_context::constants::{DEFAULT_CHAT_NAME, DEFAULT_TRANSCRIPT_NAME};
use colloquy_context::{
    ChatState, CompressionError, ConditionLibrary, load_chat_state, render_transcript, save_chat_state,
    write_transcript,
};
use colloquy_core::{Condition, TokenUsage};
use colloquy_logging::{UsageLog, format_cost_line};
use colloquy_settings::{ColloquySettings, PathSettings};
use colloquy_tokens::{RequestCost, format_cost, format_tokens};
use tracing::warn;

use crate::actions::{Action, menu};
use crate::console::{self, Console};
use crate::session::{ChatSession, Compression, SessionError};

/// Whether the loop keeps going.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// The interactive application.
pub struct App {
    session: ChatSession,
    console: Console,
    paths: PathSettings,
    usage_log: Option<UsageLog>,
    conditions: ConditionLibrary,
    /// False when an existing conditions file failed to load; saving would
    /// overwrite it.
    conditions_writable: bool,
}

impl App {
    /// Wrap a session with the configured paths and usage logging.
    pub fn new(session: ChatSession, settings: &ColloquySettings) -> Self {
        Self {
            session,
            console: Console::new(),
            paths: settings.paths.clone(),
            usage_log: settings
                .usage
                .log_usage
                .then(|| UsageLog::new(settings.paths.cost_log_file())),
            conditions: ConditionLibrary::default(),
            conditions_writable: true,
        }
    }

    // ── Startup ──────────────────────────────────────────────────────────

    /// Resume a chat or pick a condition, then announce readiness.
    pub async fn configure(&mut self, resume: Option<&str>) -> io::Result<()> {
        console::banner("STARTING UP!");
        self.load_conditions();

        let resumed = if let Some(name) = resume {
            self.resume_chat(name)
        } else if self.console.confirm("Reload previous chat? [y/N]").await? {
            let prompt = format!(
                "Name of JSON file in chats directory ({}) ['{DEFAULT_CHAT_NAME}']:",
                self.paths.chats_dir
            );
            let name = self.console.question(&prompt).await?;
            self.resume_chat(or_default(&name, DEFAULT_CHAT_NAME))
        } else {
            console::yellow("Skipping...");
            false
        };
        if !resumed {
            console::blank();
            self.choose_condition().await?;
        }

        console::blank();
        let model = self.session.model();
        console::yellow(&format!(
            "Model: {} ({} input tokens per request)",
            model.name,
            format_tokens(self.session.budget())
        ));
        console::green("Chat ready...");
        console::blank();
        Ok(())
    }

    fn load_conditions(&mut self) {
        match ConditionLibrary::load(&self.paths.conditions_file()) {
            Ok(library) => {
                self.conditions = library;
                self.conditions_writable = true;
            }
            Err(e) => {
                console::red(&format!("Conditions: could not load saved conditions: {e}"));
                self.conditions = ConditionLibrary::default();
                self.conditions_writable = false;
            }
        }
    }

    fn resume_chat(&mut self, name: &str) -> bool {
        let path = self.paths.chat_file(name);
        match load_chat_state(&path).and_then(ChatState::restore) {
            Ok(restored) => {
                self.session.restore(restored);
                console::green(&format!(
                    "Chat: {} Messages Loaded",
                    self.session.store().len()
                ));
                if let Some(last) = self.session.store().last() {
                    console::blank();
                    console::green("Previously...");
                    console::normal(last.content());
                }
                true
            }
            Err(e) => {
                console::red(&format!("Chat: Error while loading previous chat: {e}"));
                false
            }
        }
    }

    // ── Loop ─────────────────────────────────────────────────────────────

    /// Run until the user exits.
    pub async fn run(&mut self) -> io::Result<()> {
        loop {
            let input = self.console.question("Prompt:  ['Enter' for options]").await?;
            let flow = if input.is_empty() {
                console::blank();
                self.select_action().await?
            } else {
                self.send(&input).await;
                Flow::Continue
            };
            if flow == Flow::Exit {
                return Ok(());
            }
        }
    }

    async fn select_action(&mut self) -> io::Result<Flow> {
        console::yellow("Select an action:");
        console::yellow(&menu());
        let input = self.console.question("").await?;
        console::blank();
        match Action::parse(&input) {
            Some(action) => self.dispatch(action).await,
            None => {
                console::normal("Try again...");
                console::blank();
                Ok(Flow::Continue)
            }
        }
    }

    async fn dispatch(&mut self, action: Action) -> io::Result<Flow> {
        match action {
            Action::Prompt => {
                let input = self.console.question("Prompt:").await?;
                if !input.is_empty() {
                    self.send(&input).await;
                }
            }
            Action::Save => self.save().await?,
            Action::Transcribe => self.transcribe().await?,
            Action::Memory => self.edit_memory().await?,
            Action::Condition => self.choose_condition().await?,
            Action::Compress => self.compress().await,
            Action::Exit => {
                self.exit().await?;
                return Ok(Flow::Exit);
            }
        }
        Ok(Flow::Continue)
    }

    // ── Prompt / compression ─────────────────────────────────────────────

    async fn send(&mut self, input: &str) {
        if self.session.needs_compression() {
            console::yellow("Compressing via summary...");
        }
        console::yellow("Awaiting reply...");
        let exchange = self.session.prompt_cycle(input).await;
        if let Some(compression) = &exchange.compression {
            self.report_compression(compression);
        }

        match exchange.reply {
            Ok(reply) => {
                console::blank();
                console::green("Response:");
                console::normal(&format!("{}\n", reply.content));
                if reply.excluded > 0 {
                    console::yellow(&format!(
                        "({} older messages did not fit the input budget)",
                        reply.excluded
                    ));
                }
                self.report_cost(&reply.cost, reply.usage);
                console::blank();
                self.autosave();
            }
            Err(SessionError::Request(e)) => {
                console::red(&format!(
                    "Error while requesting chat completion ({}): {e}",
                    e.category()
                ));
                if e.is_retryable() {
                    console::yellow("The prompt was not recorded. Send it again to retry.");
                } else {
                    console::yellow("The prompt was not recorded.");
                }
                console::blank();
            }
            Err(e) => {
                console::red(&format!("Prompt not sent: {e}"));
                console::blank();
            }
        }
    }

    async fn compress(&mut self) {
        console::yellow("Compressing via summary...");
        let result = self.session.compress().await;
        self.report_compression(&result);
    }

    fn report_compression(&self, result: &Result<Compression, CompressionError>) {
        match result {
            Ok(compression) if compression.outcome.is_skipped() => {
                console::yellow("Nothing to compress.");
            }
            Ok(compression) => {
                let outcome = &compression.outcome;
                console::blank();
                console::green("The story so far...");
                console::normal(&outcome.summary);
                console::blank();
                console::yellow(&format!(
                    "History: {} -> {} tokens ({} messages archived)",
                    format_tokens(outcome.tokens_before),
                    format_tokens(outcome.tokens_after),
                    outcome.archived
                ));
                if let Some(cost) = &compression.cost {
                    self.report_cost(cost, outcome.usage);
                }
                self.autosave();
            }
            Err(e) => {
                console::red(&format!("Compression failed, history unchanged: {e}"));
            }
        }
        console::blank();
    }

    fn report_cost(&self, cost: &RequestCost, usage: Option<TokenUsage>) {
        let Some(log) = &self.usage_log else {
            return;
        };
        let line = format_cost_line(cost, self.session.store().len());
        console::yellow(line.trim_end());
        if let Some(usage) = usage {
            console::yellow(&format!("Request Tokens: {}", usage.prompt_tokens));
            console::yellow(&format!("Response Tokens: {}", usage.completion_tokens));
            console::yellow(&format!("Total Tokens: {}", usage.total_tokens()));
        }
        if let Err(e) = log.append(cost, self.session.store().len()) {
            warn!(path = %log.path().display(), error = %e, "failed to append cost log");
        }
    }

    // ── Persistence ──────────────────────────────────────────────────────

    fn autosave(&self) {
        let path = self.paths.autosave_file();
        if let Err(e) = save_chat_state(&path, &self.session.snapshot()) {
            warn!(path = %path.display(), error = %e, "autosave failed");
            console::red(&format!("Chat: autosave failed: {e}"));
        }
    }

    async fn save(&mut self) -> io::Result<()> {
        let name = self
            .console
            .question(&format!("Filename? ['{DEFAULT_CHAT_NAME}']"))
            .await?;
        let path = self.paths.chat_file(or_default(&name, DEFAULT_CHAT_NAME));
        console::yellow("Saving chat to file...");
        match save_chat_state(&path, &self.session.snapshot()) {
            Ok(()) => console::green("Chat: Finished saving to file"),
            Err(e) => console::red(&format!("Chat: Error while saving to file: {e}")),
        }
        console::blank();
        Ok(())
    }

    async fn transcribe(&mut self) -> io::Result<()> {
        let name = self
            .console
            .question(&format!("Filename? ['{DEFAULT_TRANSCRIPT_NAME}']"))
            .await?;
        let assistant_only = self.console.confirm("Responses only? [y/N]").await?;
        let path = self
            .paths
            .transcript_file(or_default(&name, DEFAULT_TRANSCRIPT_NAME));

        console::yellow("Writing chat to file...");
        let text = render_transcript(&self.session.transcribe(assistant_only));
        match write_transcript(&path, &text) {
            Ok(()) => console::green("Chat: Finished writing to file"),
            Err(e) => console::red(&format!("Chat: Error while writing to file: {e}")),
        }
        console::blank();
        Ok(())
    }

    // ── Memory / condition ───────────────────────────────────────────────

    async fn edit_memory(&mut self) -> io::Result<()> {
        match self.session.memory() {
            Some(memory) => {
                console::green("Current memory:");
                console::normal(memory.content());
            }
            None => console::yellow("No memory set."),
        }
        let note = self
            .console
            .question("New memory (Enter to keep, '-' to clear):")
            .await?;
        match note.as_str() {
            "" => {}
            "-" => {
                self.session.clear_memory();
                console::green("Memory cleared");
            }
            _ => match self.session.set_memory(&note) {
                Ok(()) => console::green("Memory updated"),
                Err(e) => console::red(&format!("Memory not updated: {e}")),
            },
        }
        console::blank();
        Ok(())
    }

    async fn choose_condition(&mut self) -> io::Result<()> {
        if let Some(active) = self.session.condition() {
            console::green(&format!("Active condition: {}", active.name()));
        }
        if self.conditions.is_empty() {
            console::yellow("No saved conditions.");
        } else {
            console::green("Saved conditions:");
            for (index, condition) in self.conditions.conditions().iter().enumerate() {
                console::normal(&format!("[{index}] {}", condition.name()));
            }
        }

        let input = self
            .console
            .question("Select a condition number, [N] new, [R] remove, or Enter to skip:")
            .await?;
        match input.to_lowercase().as_str() {
            "" => {}
            "n" => self.add_condition().await?,
            "r" => {
                self.session.set_condition(None);
                console::green("Condition removed");
            }
            other => match other.parse::<usize>().ok().and_then(|i| self.conditions.get(i)) {
                Some(condition) => {
                    console::green(&format!("Condition: {}", condition.name()));
                    self.session.set_condition(Some(condition.clone()));
                }
                None => console::normal("Try again..."),
            },
        }
        Ok(())
    }

    async fn add_condition(&mut self) -> io::Result<()> {
        let name = loop {
            let name = self.console.question("Condition name?").await?;
            if name.is_empty() {
                console::yellow("A condition needs a name.");
            } else if self.conditions.find(&name).is_some() {
                console::yellow(&format!("A condition named \"{name}\" already exists."));
            } else {
                break name;
            }
        };
        let instructions = self.console.question("Instructions?").await?;
        let condition = match Condition::new(name, instructions) {
            Ok(condition) => condition,
            Err(e) => {
                console::red(&format!("Condition not added: {e}"));
                return Ok(());
            }
        };
        let index = self.conditions.add(condition.clone());
        console::green(&format!(
            "Condition [{index}]: {} ({} tokens)",
            condition.name(),
            condition.tokens()
        ));
        self.session.set_condition(Some(condition));

        if !self.conditions_writable {
            console::yellow("Saved conditions could not be read, so they will not be overwritten.");
        } else if self.console.confirm("Save conditions? [y/N]").await? {
            let path = self.paths.conditions_file();
            match self.conditions.save(&path) {
                Ok(()) => console::green("Conditions saved"),
                Err(e) => console::red(&format!("Conditions not saved: {e}")),
            }
        }
        Ok(())
    }

    // ── Exit ─────────────────────────────────────────────────────────────

    async fn exit(&mut self) -> io::Result<()> {
        loop {
            let reply = self
                .console
                .question("Save chat session before quitting? [y/n]")
                .await?;
            match reply.to_lowercase().as_str() {
                "y" => {
                    self.save().await?;
                    break;
                }
                "n" => break,
                _ => {}
            }
        }
        if self.usage_log.is_some() {
            console::yellow(&format!(
                "Session cost: {} over {} requests",
                format_cost(self.session.session_cost()),
                self.session.request_count()
            ));
        }
        console::green("Goodbye!");
        Ok(())
    }
}

fn or_default<'a>(input: &'a str, default: &'a str) -> &'a str {
    if input.is_empty() { default } else { input }
}
