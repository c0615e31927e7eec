use std::future::Future;
use std::io::Write;

use anyhow::Result;
use teller_agent::runtime::DialogueSession;
use teller_core::interaction::InMemoryInteractionLog;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

pub const BANNER: &str = "Welcome to the Teller banking assistant!\n\
I can help you with:\n\
• Account balance and transaction inquiries\n\
• Loan applications (Personal, Home, Car)\n\
• Card blocking services\n\
• Interest rates and charges information\n\
\n\
Type 'quit' to exit, 'reset' to clear context, 'context' to see what I know, 'history' for this conversation.";

pub const FAREWELL: &str = "Thank you for using the Teller banking assistant. Have a great day!";

#[derive(Debug, PartialEq, Eq)]
enum ReplCommand<'a> {
    Quit,
    Reset,
    Context,
    History,
    Utterance(&'a str),
}

fn parse_line(line: &str) -> ReplCommand<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" | "bye" => ReplCommand::Quit,
        "reset" => ReplCommand::Reset,
        "context" => ReplCommand::Context,
        "history" => ReplCommand::History,
        _ => ReplCommand::Utterance(trimmed),
    }
}

/// Interactive loop over `input` until a quit word, end of input, or `shutdown`.
pub async fn run_repl<R, W, S>(
    session: &mut DialogueSession,
    log: &InMemoryInteractionLog,
    input: R,
    output: &mut W,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    writeln!(output, "{BANNER}")?;
    info!(event_name = "cli.chat.started", session_id = %session.session_id());

    loop {
        write!(output, "\nYou: ")?;
        output.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            () = &mut shutdown => None,
        };
        let Some(line) = line else {
            writeln!(output, "\n{FAREWELL}")?;
            break;
        };

        match parse_line(&line) {
            ReplCommand::Quit => {
                writeln!(output, "{FAREWELL}")?;
                break;
            }
            ReplCommand::Reset => {
                session.reset();
                writeln!(output, "Assistant: Context cleared. How can I help you?")?;
            }
            ReplCommand::Context => {
                let context = serde_json::to_string(&session.state().to_map())?;
                writeln!(output, "Current context: {context}")?;
            }
            ReplCommand::History => {
                let transcript = log.transcript(session.session_id());
                if transcript.is_empty() {
                    writeln!(output, "No conversation yet.")?;
                }
                for (user, bot) in transcript {
                    writeln!(output, "You: {user}\nAssistant: {bot}\n")?;
                }
            }
            ReplCommand::Utterance(utterance) => {
                let reply = session.chat(utterance).await;
                writeln!(output, "Assistant: {reply}")?;
            }
        }
    }

    info!(event_name = "cli.chat.finished", session_id = %session.session_id());
    Ok(())
}
