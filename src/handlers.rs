/// Axum handlers for the reading endpoints
use crate::AppState;
use crate::errors::ReadingError;
use crate::generator::TextGenerator;
use crate::models::{ConciseResult, DetailedRequest, DetailedResult, FromPayload, ReadingRequest};
use crate::prompts::{self, CONCISE_FALLBACK, DETAILED_FALLBACK};
use axum::{Json, body::Bytes, extract::State, http::Method};
use tracing::{debug, info, instrument};

/// Produces the short first-pass reading for a three-card spread.
#[instrument(skip(state, body))]
pub async fn concise_interpretation<G: TextGenerator>(
    State(state): State<AppState<G>>,
    body: Bytes,
) -> Result<Json<ConciseResult>, ReadingError> {
    let api_key = state
        .settings
        .credential()
        .ok_or(ReadingError::NotConfigured)?;

    let reading = ReadingRequest::parse(&body)?;
    info!("Generating concise interpretation");

    let request = prompts::concise_request(&reading, &state.settings.concise);
    let generation = state.generator.generate(api_key, &request).await?;

    let interpretation = match generation.first_text() {
        Some(text) => text.to_owned(),
        None => {
            debug!("Model returned no text, using fallback interpretation");
            CONCISE_FALLBACK.to_owned()
        }
    };

    Ok(Json(ConciseResult { interpretation }))
}

/// Expands a concise interpretation (passed back by the caller) into detailed advice.
#[instrument(skip(state, body))]
pub async fn detailed_advice<G: TextGenerator>(
    State(state): State<AppState<G>>,
    body: Bytes,
) -> Result<Json<DetailedResult>, ReadingError> {
    let api_key = state
        .settings
        .credential()
        .ok_or(ReadingError::NotConfigured)?;

    let detailed = DetailedRequest::parse(&body)?;
    info!("Generating detailed advice");

    let request = prompts::detailed_request(&detailed, &state.settings.detailed);
    let generation = state.generator.generate(api_key, &request).await?;

    let advice = match generation.first_text() {
        Some(text) => text.to_owned(),
        None => {
            debug!("Model returned no text, using fallback advice");
            DETAILED_FALLBACK.to_owned()
        }
    };

    Ok(Json(DetailedResult { advice }))
}

/// Answers every non-POST request on the reading paths. The body is never read.
pub async fn method_not_allowed(method: Method) -> ReadingError {
    debug!(%method, "Rejecting non-POST request");
    ReadingError::MethodNotAllowed
}
