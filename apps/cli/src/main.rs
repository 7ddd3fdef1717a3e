use std::{io::Write, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{self, Settings},
    AuditSessionController, HttpAuditService, Language, ReplayError, SessionContext,
    SubmitOutcome,
};
use shared::domain::HistoryId;
use storage::{KeyValueStore, MemoryStore, Storage};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "veru", version, about = "Audit the citations in AI-generated text")]
struct Cli {
    /// Audit service base url.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    database_url: Option<String>,
    /// Display language (`en` or `zh`).
    #[arg(long)]
    lang: Option<String>,
    /// Config file; defaults to `veru.toml` in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Keep history in memory only.
    #[arg(long)]
    ephemeral: bool,
    /// Per-attempt request timeout in seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Audit TEXT, a file, a built-in example, or stdin.
    Audit {
        text: Option<String>,
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        #[arg(long, conflicts_with_all = ["text", "file"])]
        example: bool,
    },
    History {
        #[command(subcommand)]
        action: HistoryCommand,
    },
    /// Print built-in sample texts.
    Example {
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        count: u64,
    },
    /// Interactive session.
    Shell,
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    List,
    Show { id: String },
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = resolve_settings(&cli)?;
    let store = open_store(&cli, &settings).await?;
    let context = SessionContext {
        store,
        service: Arc::new(HttpAuditService::new(settings.api_url.clone())),
        ambient_language: Language::from_ambient_locale(|name| std::env::var(name).ok()),
        settings,
    };
    let controller = AuditSessionController::start(&context).await;

    match cli.command {
        Command::Audit {
            text,
            file,
            example,
        } => run_audit(&controller, text, file, example).await,
        Command::History { action } => run_history(&controller, action).await,
        Command::Example { count } => {
            for _ in 0..count {
                println!("{}\n", controller.load_next_example().await);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Shell => run_shell(&controller).await,
    }
}

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = config::load_settings(cli.config.as_deref());
    if let Some(url) = &cli.api_url {
        settings.api_url = url.clone();
    }
    settings.api_url = config::validate_api_url(&settings.api_url)
        .with_context(|| format!("invalid audit service url '{}'", settings.api_url))?;
    if let Some(url) = &cli.database_url {
        settings.database_url = Some(url.clone());
    }
    if let Some(code) = &cli.lang {
        let language = Language::from_code(code)
            .ok_or_else(|| anyhow!("unsupported language '{code}'; expected en or zh"))?;
        settings.language = Some(language);
    }
    if let Some(secs) = cli.timeout_secs {
        settings.request_timeout = Duration::from_secs(secs);
    }
    Ok(settings)
}

async fn open_store(cli: &Cli, settings: &Settings) -> Result<Arc<dyn KeyValueStore>> {
    if cli.ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    let database_url = settings.database_url()?;
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("opening history store at {database_url}"))?;
    storage
        .health_check()
        .await
        .context("history store health check")?;
    Ok(Arc::new(storage))
}

async fn run_audit(
    controller: &AuditSessionController,
    text: Option<String>,
    file: Option<PathBuf>,
    example: bool,
) -> Result<ExitCode> {
    if example {
        controller.load_next_example().await;
    } else {
        let input = match (text, file) {
            (Some(text), _) => text,
            (None, Some(path)) => tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
            (None, None) => {
                let mut buf = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut buf)
                    .await
                    .context("reading text from stdin")?;
                buf
            }
        };
        controller.set_input(input).await;
    }

    Ok(submit_and_render(controller).await)
}

async fn submit_and_render(controller: &AuditSessionController) -> ExitCode {
    let strings = controller.strings().await;
    eprintln!("{}", strings.analyzing);
    let outcome = controller.submit().await;
    let strings = controller.strings().await;

    let code = match outcome {
        SubmitOutcome::Completed(results) => {
            println!("{}", render::render_results(strings, &results));
            ExitCode::SUCCESS
        }
        SubmitOutcome::Rejected(err) => {
            eprintln!("{}", render::validation_text(strings, &err));
            ExitCode::from(2)
        }
        SubmitOutcome::Failed(_) => ExitCode::FAILURE,
        SubmitOutcome::Ignored => {
            eprintln!("{}", strings.busy);
            ExitCode::FAILURE
        }
    };
    print_notice(controller).await;
    code
}

async fn print_notice(controller: &AuditSessionController) {
    if let Some(notice) = controller.take_notice().await {
        eprintln!("{}", notice.text(controller.strings().await));
    }
}

async fn run_history(
    controller: &AuditSessionController,
    action: HistoryCommand,
) -> Result<ExitCode> {
    let strings = controller.strings().await;
    match action {
        HistoryCommand::List => {
            println!("{}", render::render_history(strings, &controller.history().await));
        }
        HistoryCommand::Show { id } => {
            if !show_history_entry(controller, &HistoryId::from(id.as_str())).await {
                return Ok(ExitCode::FAILURE);
            }
        }
        HistoryCommand::Clear { yes } => {
            if !controller.request_clear_history().await {
                println!("{}", strings.no_history_title);
                return Ok(ExitCode::SUCCESS);
            }
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            if yes || confirm(&mut lines, strings.clear_history_confirm).await? {
                controller
                    .confirm_clear_history()
                    .await
                    .context("clearing audit history")?;
                print_notice(controller).await;
            } else {
                controller.cancel_clear_history().await;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn show_history_entry(controller: &AuditSessionController, id: &HistoryId) -> bool {
    let strings = controller.strings().await;
    match controller.select_history(id).await {
        Ok(item) => {
            println!("{}\n", render::render_history_line(strings, &item));
            println!("{}", render::render_results(strings, &item.results));
            true
        }
        Err(ReplayError::NotFound(_)) => {
            eprintln!("{}", strings.history_entry_missing);
            false
        }
        Err(ReplayError::Busy) => {
            eprintln!("{}", strings.busy);
            false
        }
    }
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>, question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "是"))
}

const SHELL_HELP: &str = "\
Type or paste text, then:
  /submit        audit the text typed so far
  /example       load the next sample text
  /history       list past sessions
  /select <id>   replay a past session
  /clear         clear the history
  /lang          switch language
  /quit          leave";

async fn run_shell(controller: &Arc<AuditSessionController>) -> Result<ExitCode> {
    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "session event");
        }
    });

    let strings = controller.strings().await;
    println!("{} | {}", strings.app_title, strings.tagline);
    println!("{SHELL_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft: Vec<String> = Vec::new();
    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let trimmed = line.trim();
        let strings = controller.strings().await;

        match trimmed.split_once(' ').map_or((trimmed, ""), |(c, rest)| (c, rest.trim())) {
            ("/quit", _) => break,
            ("/help", _) => println!("{SHELL_HELP}"),
            ("/submit", _) => {
                if !draft.is_empty() {
                    controller.set_input(draft.join("\n")).await;
                    draft.clear();
                }
                submit_and_render(controller).await;
            }
            ("/example", _) => {
                draft.clear();
                println!("{}", controller.load_next_example().await);
            }
            ("/history", _) => {
                controller.open_history().await;
                println!("{}", render::render_history(strings, &controller.history().await));
            }
            ("/select", id) if !id.is_empty() => {
                show_history_entry(controller, &HistoryId::from(id)).await;
            }
            ("/select", _) => println!("{SHELL_HELP}"),
            ("/clear", _) => {
                if !controller.request_clear_history().await {
                    println!("{}", strings.no_history_title);
                } else if confirm(&mut lines, strings.clear_history_confirm).await? {
                    if let Err(err) = controller.confirm_clear_history().await {
                        tracing::warn!(error = %err, "history clear failed");
                    }
                    print_notice(controller).await;
                } else {
                    controller.cancel_clear_history().await;
                }
                controller.close_history().await;
            }
            ("/lang", _) => {
                let language = controller.toggle_language().await;
                println!("{}", language.strings().language_switched);
            }
            _ => draft.push(line),
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_count_must_be_positive() {
        assert!(Cli::try_parse_from(["veru", "example", "--count", "0"]).is_err());
        let cli = Cli::try_parse_from(["veru", "example", "--count", "3"]).expect("parse");
        assert!(matches!(cli.command, Command::Example { count: 3 }));
        let cli = Cli::try_parse_from(["veru", "example"]).expect("parse");
        assert!(matches!(cli.command, Command::Example { count: 1 }));
    }

    #[test]
    fn zero_timeout_flag_is_rejected() {
        assert!(Cli::try_parse_from(["veru", "--timeout-secs", "0", "shell"]).is_err());
        let cli = Cli::try_parse_from(["veru", "--timeout-secs", "5", "shell"]).expect("parse");
        assert_eq!(cli.timeout_secs, Some(5));
    }
}
