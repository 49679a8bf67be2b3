use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::server::routes::error_response;
use crate::server::state::AppState;

/// Proxies browser audio to the Whisper transcription API. The upstream key
/// stays on the server; the extension never sees it.
pub async fn transcribe(State(state): State<AppState>, multipart: Multipart) -> Response {
    let span = tracing::info_span!("transcribe", request_id = %Uuid::new_v4());
    async move {
        let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "OpenAI API key not configured",
            );
        };

        let (file_name, content_type, bytes) = match read_audio_field(multipart).await {
            Ok(upload) => upload,
            Err(response) => return response,
        };

        tracing::info!(file = %file_name, bytes = bytes.len(), "forwarding audio for transcription");

        let part = match reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&content_type)
        {
            Ok(part) => part,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Unsupported content type: {e}"),
                )
            }
        };

        let form = reqwest::multipart::Form::new()
            .text("model", state.config.transcription.model.clone())
            .text("response_format", "json")
            .part("file", part);

        let response = match state
            .http
            .post(&state.config.transcription.api_base)
            .bearer_auth(&api_key)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_GATEWAY,
                    format!("Transcription request failed: {e}"),
                )
            }
        };

        let status = StatusCode::from_u16(response.status().as_u16())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| "Transcription failed".to_string());
            tracing::warn!(status = %status, message = %message, "transcription upstream error");
            return error_response(status, message);
        }

        match response.json::<Value>().await {
            Ok(result) => {
                let text = result["text"].as_str().unwrap_or("").to_string();
                Json(json!({ "status": "success", "text": text })).into_response()
            }
            Err(e) => error_response(
                StatusCode::BAD_GATEWAY,
                format!("Transcription response unreadable: {e}"),
            ),
        }
    }
    .instrument(span)
    .await
}

/// Pulls the `file` part out of the multipart body. Content type defaults to
/// `audio/webm`, matching what the extension's recorder produces.
async fn read_audio_field(mut multipart: Multipart) -> Result<(String, String, Vec<u8>), Response> {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("file") {
                    continue;
                }
                let file_name = field.file_name().unwrap_or("").to_string();
                if file_name.is_empty() {
                    return Err(error_response(
                        StatusCode::BAD_REQUEST,
                        "No audio file selected",
                    ));
                }
                let content_type = field
                    .content_type()
                    .unwrap_or("audio/webm")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => return Ok((file_name, content_type, bytes.to_vec())),
                    Err(e) => {
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read audio file: {e}"),
                        ))
                    }
                }
            }
            Ok(None) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    "No audio file provided",
                ))
            }
            Err(e) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Invalid multipart body: {e}"),
                ))
            }
        }
    }
}
