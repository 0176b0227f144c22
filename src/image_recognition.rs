use crate::api_connection::connection::ApiConnectionError;
use crate::api_connection::endpoints::Provider;

/// Fixed instruction for the vision model. Plain text is expected back, not
/// JSON — the answer re-enters the pipeline through the meal parser.
pub const FOOD_DESCRIPTION_PROMPT: &str = "You are looking at a photo of food. \
Name every food item you can see, with an approximate quantity for each \
(for example: '2 rotis, a bowl of dal and a glass of lassi'). \
Answer in one short plain-text sentence. Do not use JSON or markdown. \
If there is no food in the photo, say so plainly.";

/// Sends the image to the vision-capable provider and returns its free-text
/// food description. No local fallback exists for this step: any error
/// surfaces to the caller, which owns the re-capture/re-upload flow.
pub async fn recognize(
    provider: &Provider,
    image: &[u8],
    mime_type: &str,
) -> Result<String, ApiConnectionError> {
    let text = provider
        .generate_vision(FOOD_DESCRIPTION_PROMPT, image, mime_type)
        .await?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ApiConnectionError::EmptyResponse(
            "vision model returned an empty description".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
