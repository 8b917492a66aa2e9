//! Interactive chat loop over any async line source.

use crate::app::AppContext;
use crate::command::{CommandResponse, ErrorCode, HintKind};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const PROMPT: &str = "You: ";
pub const AGENT_PREFIX: &str = "Agent: ";
pub const EMPTY_LINE_MESSAGE: &str = "Please enter a query or type 'exit' to quit.";
pub const GOODBYE_MESSAGE: &str = "Goodbye! Thanks for using the meeting agent.";

const EXIT_COMMANDS: &[&str] = &["exit", "quit", "bye"];

const BANNER: &str = "Meeting Agent Chat Interface
==================================================
Welcome! I'm your meeting agent assistant.
I can schedule meetings, cancel them and answer questions about them.
Type 'exit' to quit the chat.
==================================================
";

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    EXIT_COMMANDS
        .iter()
        .any(|command| line.eq_ignore_ascii_case(command))
}

/// Run the chat until an exit command or end of input.
///
/// A failing line is reported and the loop continues; only I/O errors on the
/// streams themselves end it early.
pub async fn run_session<R, W>(app: &mut AppContext, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write(output, BANNER).await?;
    let mut lines = input.lines();
    loop {
        write(output, &format!("\n{PROMPT}")).await?;
        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            write(output, &format!("\n{GOODBYE_MESSAGE}\n")).await?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            write(output, &format!("{EMPTY_LINE_MESSAGE}\n")).await?;
            continue;
        }
        if is_exit_command(line) {
            write(output, &format!("{GOODBYE_MESSAGE}\n")).await?;
            break;
        }

        match respond(app, line).await {
            Ok(text) => write(output, &format!("{AGENT_PREFIX}{text}\n")).await?,
            Err(err) => {
                log::error!("Failed to handle {line:?}: {err:#}");
                write(output, &format!("An error occurred: {err:#}\n")).await?;
            }
        }
    }
    Ok(())
}

/// Classify one line, run it, and render the reply.
///
/// A cancel without a meeting id is followed by one search for the
/// description so the user sees the candidate ids.
pub async fn respond(app: &mut AppContext, line: &str) -> Result<String> {
    let request = app.classifier().classify(line, app.history()).await?;
    log::debug!("{line:?} -> {}", request.action.as_str());

    let response = app.handler_mut().execute(request).await;
    let mut text = render_response(&response);

    let follow_up = response
        .next_actions
        .first()
        .filter(|_| response.error_code() == Some(ErrorCode::InvalidRequest));
    if let Some(next) = follow_up {
        log::debug!("Following up with {}: {}", next.action.as_str(), next.reason);
        let follow = app.handler_mut().execute(next.to_request()).await;
        text.push_str("\n\n");
        text.push_str(&render_response(&follow));
    }
    app.history_mut().push(line, text.as_str());
    Ok(text)
}

pub fn render_response(response: &CommandResponse) -> String {
    let mut text = response.message.clone();
    for hint in &response.hints {
        let label = match hint.kind {
            HintKind::Action if response.is_error() => "Hint",
            HintKind::Warn => "Note",
            _ => continue,
        };
        text.push_str(&format!("\n{label}: {}", hint.text));
    }
    text
}

async fn write<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<()> {
    output
        .write_all(text.as_bytes())
        .await
        .context("Failed to write output")?;
    output.flush().await.context("Failed to flush output")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_commands_ignore_case_and_padding() {
        for line in ["exit", " QUIT ", "Bye"] {
            assert!(is_exit_command(line), "{line}");
        }
        for line in ["exit now", "goodbye", ""] {
            assert!(!is_exit_command(line), "{line}");
        }
    }
}
