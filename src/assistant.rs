//! Voice assistant round trip: prompt to backend, answer to the speech host.

use crate::client::VisumClient;

pub const ASSISTANT_FALLBACK: &str = "Sorry, I couldn't process your request at this time.";

/// Ask the backend and have the speech host read the answer aloud.
/// Always yields something to show; failures fall back to an apology.
pub async fn ask(client: VisumClient, prompt: String) -> String {
    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        return String::new();
    }

    let answer = match client.get_assistance(&prompt).await {
        Ok(answer) => answer,
        Err(e) => {
            log::error!("Assistant request failed: {}", e);
            ASSISTANT_FALLBACK.to_string()
        }
    };

    // playback is best effort
    let speaker = client.clone();
    let spoken = answer.clone();
    tokio::spawn(async move {
        if let Err(e) = speaker.speak(&spoken).await {
            log::warn!("Speech playback failed: {}", e);
        }
    });

    answer
}
