//! Interactive REPL front-end.
//!
//! Renders the conversation transcript and document shelf in the terminal
//! and forwards user intents into the conversation manager and the backend
//! client. Plain input lines become questions; `/`-commands cover the
//! upload, list, select, and delete flows.

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::Path;
use std::sync::Arc;

use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc;
use tracing::warn;

use crate::backend::BackendClient;
use crate::config::LimitsConfig;
use crate::conversation::{Conversation, Document, Message};
use crate::error::ValidationError;

const COMMANDS: &[&str] = &[
    "/upload",
    "/documents",
    "/open",
    "/delete",
    "/help",
    "/quit",
];

/// Rustyline helper providing command completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Terminal front-end over the conversation manager and backend client.
pub struct Repl {
    conversation: Conversation,
    backend: Arc<BackendClient>,
    limits: LimitsConfig,
}

impl Repl {
    pub fn new(
        conversation: Conversation,
        backend: Arc<BackendClient>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            conversation,
            backend,
            limits,
        }
    }

    /// Run the REPL until the user quits.
    ///
    /// `answer_rx` is the conversation's answer channel; replies are printed
    /// from a background task as they resolve, so the prompt never blocks on
    /// an outstanding question.
    pub async fn run(
        self,
        mut answer_rx: mpsc::UnboundedReceiver<Message>,
    ) -> Result<(), ReadlineError> {
        println!("{}", "=== Folio ===".bright_magenta().bold());
        println!(
            "{}",
            "Chat with your PDFs. /help for commands, /quit to exit.".bright_black()
        );
        println!();

        self.load_documents().await;

        let printer = tokio::spawn(async move {
            while let Some(message) = answer_rx.recv().await {
                println!();
                for line in message.content.lines() {
                    println!("{}", line.bright_blue());
                }
            }
        });

        let helper = CliHelper::new();
        let mut rl = Editor::new()?;
        rl.set_helper(Some(helper));

        loop {
            match rl.readline(">> ") {
                Ok(line) => {
                    let trimmed = line.trim();

                    if trimmed.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(&line);

                    if trimmed == "/quit" || trimmed == "quit" || trimmed == "exit" {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }

                    self.dispatch(trimmed).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("{}", "Interrupted. /quit to exit.".yellow());
                }
                Err(ReadlineError::Eof) => {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                Err(err) => {
                    eprintln!("{}", format!("Error: {err:?}").red());
                    break;
                }
            }
        }

        // Answers still in flight are abandoned on exit.
        printer.abort();

        Ok(())
    }

    /// Pull the backend's existing documents into the session, mirroring
    /// the initial shelf load. Failure leaves the session empty but usable.
    async fn load_documents(&self) {
        match self.backend.list_documents().await {
            Ok(documents) => {
                let count = documents.len();
                for document in documents {
                    self.conversation.add_document(document);
                }
                if count > 0 {
                    println!(
                        "{}",
                        format!("Loaded {count} document(s); /documents lists them.")
                            .bright_black()
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to load existing documents");
            }
        }
    }

    async fn dispatch(&self, input: &str) {
        let mut parts = input.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let arg = parts.next().unwrap_or("").trim();

        match command {
            "/upload" => self.upload(arg).await,
            "/documents" | "/docs" => self.show_documents(),
            "/open" => self.open_document(arg),
            "/delete" => self.delete_document(arg).await,
            "/help" => print_help(),
            _ if command.starts_with('/') => {
                println!("{}", "Unknown command; /help lists them.".bright_black());
            }
            _ => self.send_message(input),
        }
    }

    async fn upload(&self, path_arg: &str) {
        if path_arg.is_empty() {
            println!("{}", "Usage: /upload <path-to-pdf>".yellow());
            return;
        }

        let path = Path::new(path_arg);
        let content = match read_validated(path, &self.limits) {
            Ok(content) => content,
            Err(e) => {
                println!("{}", e.to_string().red());
                return;
            }
        };

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        println!("{}", format!("Uploading {filename}...").bright_black());

        match self.backend.upload_document(&filename, content).await {
            Ok(document) => {
                let name = document.filename.clone();
                let ready = document.ready;
                self.conversation.add_document(document);

                if ready {
                    println!("{}", format!("Uploaded {name}; ask away.").green());
                } else {
                    println!(
                        "{}",
                        format!("Uploaded {name}; the backend is still processing it.").yellow()
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, filename = %filename, "Upload failed");
                println!("{}", "Failed to upload file. Please try again.".red());
            }
        }
    }

    fn show_documents(&self) {
        let state = self.conversation.snapshot();

        if state.documents.is_empty() {
            println!(
                "{}",
                "No documents yet. /upload <path> to add one.".bright_black()
            );
            return;
        }

        println!("{}", "Your documents".bright_magenta());
        for (index, document) in state.documents.iter().enumerate() {
            let marker = if state
                .active_document
                .as_ref()
                .is_some_and(|active| active.id == document.id)
            {
                "*"
            } else {
                " "
            };
            let status = if document.ready {
                String::new()
            } else {
                format!(" {}", "(processing...)".yellow())
            };
            println!(
                "{marker} {:>2}. {} [{}]{status}",
                index + 1,
                document.filename,
                format_size(document.size),
            );
        }
    }

    fn open_document(&self, arg: &str) {
        let state = self.conversation.snapshot();
        let Some(document) = resolve_document(&state.documents, arg).cloned() else {
            println!("{}", "No such document; /documents lists them.".yellow());
            return;
        };

        if !document.ready {
            println!(
                "{}",
                format!("{} is still processing; try again shortly.", document.filename).yellow()
            );
            return;
        }

        self.conversation.set_active_document(&document.id);
        println!(
            "{}",
            format!("Now chatting about {}.", document.filename).green()
        );
    }

    async fn delete_document(&self, arg: &str) {
        let state = self.conversation.snapshot();
        let Some(document) = resolve_document(&state.documents, arg).cloned() else {
            println!("{}", "No such document; /documents lists them.".yellow());
            return;
        };

        match self.backend.delete_document(&document.id).await {
            Ok(()) => {
                self.conversation.remove_document(&document.id);
                println!("{}", format!("Deleted {}.", document.filename).green());

                if let Some(active) = self.conversation.snapshot().active_document {
                    println!(
                        "{}",
                        format!("Now chatting about {}.", active.filename).bright_black()
                    );
                }
            }
            Err(e) => {
                // Logged only; the shelf stays as it was.
                warn!(error = %e, doc_id = %document.id, "Delete failed");
            }
        }
    }

    /// Send gating mirrors the composer: no documents, a not-ready active
    /// document, or an outstanding question all refuse the send with a
    /// notice instead of queueing.
    fn send_message(&self, content: &str) {
        let state = self.conversation.snapshot();

        if state.documents.is_empty() {
            println!(
                "{}",
                "Upload a PDF to get started: /upload <path>".bright_black()
            );
            return;
        }

        if state.is_processing {
            println!(
                "{}",
                "Still thinking about the last question; one moment.".yellow()
            );
            return;
        }

        match state.active_document {
            Some(document) if !document.ready => {
                println!(
                    "{}",
                    format!("{} is still processing; try again shortly.", document.filename)
                        .yellow()
                );
            }
            Some(_) => {
                if self.conversation.send_user_message(content) {
                    println!("{}", "Thinking...".bright_black());
                }
            }
            None => {
                println!("{}", "Select a document first: /open <n>".yellow());
            }
        }
    }
}

/// Validate an upload candidate before anything touches the network:
/// extension must be `.pdf` and the file must fit the configured limit.
fn read_validated(path: &Path, limits: &LimitsConfig) -> Result<Vec<u8>, ValidationError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    if !is_pdf {
        return Err(ValidationError::UnsupportedFormat {
            filename: path.display().to_string(),
        });
    }

    let metadata = std::fs::metadata(path).map_err(|e| ValidationError::Unreadable {
        path: path.display().to_string(),
        source: e,
    })?;

    if metadata.len() > limits.max_upload_size_bytes {
        return Err(ValidationError::FileTooLarge {
            size: metadata.len(),
            max: limits.max_upload_size_bytes,
        });
    }

    std::fs::read(path).map_err(|e| ValidationError::Unreadable {
        path: path.display().to_string(),
        source: e,
    })
}

/// Resolve a shelf reference: a 1-based index as printed by `/documents`,
/// or a full document id.
fn resolve_document<'a>(documents: &'a [Document], arg: &str) -> Option<&'a Document> {
    if arg.is_empty() {
        return None;
    }

    if let Ok(index) = arg.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| documents.get(i));
    }

    documents.iter().find(|document| document.id == arg)
}

fn format_size(bytes: u64) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

fn print_help() {
    println!("{}", "Commands".bright_magenta());
    println!("  /upload <path>   upload a PDF and start chatting about it");
    println!("  /documents       list uploaded documents");
    println!("  /open <n>        switch the conversation to document n");
    println!("  /delete <n>      delete document n and its messages");
    println!("  /quit            exit");
    println!("Anything else is sent as a question about the active document.");
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn limits(max: u64) -> LimitsConfig {
        LimitsConfig {
            max_upload_size_bytes: max,
        }
    }

    fn doc(id: &str, filename: &str) -> Document {
        Document {
            id: id.to_string(),
            filename: filename.to_string(),
            upload_date: "2025-06-01T10:00:00".to_string(),
            size: 512,
            ready: true,
        }
    }

    #[test]
    fn rejects_non_pdf_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = read_validated(&path, &limits(1024)).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedFormat { .. }));
    }

    #[test]
    fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&[0u8; 64]).unwrap();

        let err = read_validated(&path, &limits(16)).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { size: 64, max: 16 }));
    }

    #[test]
    fn reads_valid_pdf_regardless_of_extension_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.PDF");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let content = read_validated(&path, &limits(1024)).unwrap();
        assert_eq!(content, b"%PDF-1.7");
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = read_validated(Path::new("/nowhere/ghost.pdf"), &limits(1024)).unwrap_err();
        assert!(matches!(err, ValidationError::Unreadable { .. }));
    }

    #[test]
    fn resolves_by_index_and_id() {
        let documents = vec![doc("a1", "first.pdf"), doc("b2", "second.pdf")];

        assert_eq!(resolve_document(&documents, "1").unwrap().id, "a1");
        assert_eq!(resolve_document(&documents, "2").unwrap().id, "b2");
        assert_eq!(resolve_document(&documents, "b2").unwrap().id, "b2");
        assert!(resolve_document(&documents, "0").is_none());
        assert!(resolve_document(&documents, "3").is_none());
        assert!(resolve_document(&documents, "").is_none());
        assert!(resolve_document(&documents, "missing").is_none());
    }

    #[test]
    fn formats_sizes_for_the_shelf() {
        assert_eq!(format_size(512), "0.5 KB");
        assert_eq!(format_size(48213), "47.1 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
