use teller_agent::runtime::DialogueRuntime;

use super::CommandResult;

/// One turn in a throwaway session.
pub async fn run(runtime: &DialogueRuntime, utterance: &str) -> CommandResult {
    let mut session = runtime.open_session();
    CommandResult::text(session.chat(utterance).await)
}
