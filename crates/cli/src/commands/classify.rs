use teller_agent::classifier::ResilientClassifier;

use super::CommandResult;

/// Prints the classification for `utterance` as pretty JSON.
pub async fn run(classifier: &ResilientClassifier, utterance: &str) -> CommandResult {
    let classification = classifier.classify(utterance).await;
    match serde_json::to_string_pretty(&classification) {
        Ok(output) => CommandResult::text(output),
        Err(error) => CommandResult::failure("classify", "serialization", error.to_string(), 1),
    }
}
