//! Interactive console runner (`nko ask`).
//!
//! Answers a single `--query`, or reads queries line by line from stdin
//! until an exit word or end of input. Logs go to stderr; answers go to
//! stdout.

use anyhow::{bail, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::error;

use nko_assistant_core::models::Query;

use crate::app::AppContext;
use crate::orchestrator::Orchestrator;

const PROMPT: &str = "\nВведите ваш запрос (или 'выход' для завершения): ";
const EXIT_WORDS: [&str; 3] = ["выход", "exit", "quit"];

/// Runs the console. Fails before reading any input when the provider key
/// is missing or the backend does not answer `/ping`.
pub async fn run_console(ctx: AppContext, query: Option<String>, token: Option<String>) -> Result<()> {
    let Some(orchestrator) = ctx.orchestrator() else {
        bail!(
            "{} environment variable is required",
            ctx.config.completion.api_key_env
        );
    };
    ctx.check_backend().await?;

    let mut stdout = std::io::stdout();
    match query {
        Some(text) => {
            let response = orchestrator.answer(Query::new(text, token)).await;
            writeln!(stdout, "{}", response.response)?;
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            console_loop(&orchestrator, stdin, &mut stdout, token).await?;
        }
    }
    Ok(())
}

fn is_exit_word(line: &str) -> bool {
    let word = line.trim().to_lowercase();
    EXIT_WORDS.contains(&word.as_str())
}

async fn console_loop<R, W>(
    orchestrator: &Orchestrator,
    input: R,
    out: &mut W,
    token: Option<String>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                writeln!(out, "\nДо свидания!")?;
                break;
            }
            Err(e) => {
                error!(error = %e, "Error in main loop");
                writeln!(out, "Произошла ошибка: {}", e)?;
                break;
            }
        };
        if is_exit_word(&line) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        writeln!(out, "\nОбрабатываю ваш запрос...")?;
        let response = orchestrator
            .answer(Query::new(line, token.clone()))
            .await;
        writeln!(out, "\nОтвет:\n{}", response.response)?;
    }
    Ok(())
}
