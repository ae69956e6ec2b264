use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::documents::{self, SourceFormat};
use crate::errors::AppError;
use crate::llm_client::ProviderTag;
use crate::optimizer::store::stored_filename;
use crate::render::{self, DocumentFormat};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub session_id: Uuid,
    pub ats_score: f32,
    pub score_percent: u8,
    pub suggestions: Vec<String>,
    pub optimized_resume: String,
    /// Text extracted from the upload.
    pub resume_text: String,
}

/// Fields of the analyze form. Unknown fields are ignored.
#[derive(Default)]
struct AnalyzeForm {
    resume: Option<(String, Bytes)>,
    job_description: Option<String>,
    provider: Option<String>,
    model: Option<String>,
}

impl AnalyzeForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = AnalyzeForm::default();
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "resume" => {
                    let filename = field.file_name().unwrap_or_default().to_string();
                    let data = field.bytes().await.map_err(multipart_error)?;
                    form.resume = Some((filename, data));
                }
                "job_description" => {
                    form.job_description = Some(field.text().await.map_err(multipart_error)?)
                }
                "provider" => {
                    form.provider = non_blank(field.text().await.map_err(multipart_error)?)
                }
                "model" => form.model = non_blank(field.text().await.map_err(multipart_error)?),
                _ => {}
            }
        }
        Ok(form)
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Validation(format!("Malformed form data: {}", e.body_text()))
    }
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let form = AnalyzeForm::read(&mut multipart).await?;

    // Step 1: Validate the form
    let (raw_filename, data) = form
        .resume
        .ok_or_else(|| AppError::Validation("No resume file uploaded".into()))?;
    if raw_filename.trim().is_empty() {
        return Err(AppError::Validation("No resume file selected".into()));
    }
    let job_description = form
        .job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Job description is required".into()))?;

    let source_format = SourceFormat::from_path(std::path::Path::new(raw_filename.trim()))?;
    let filename = stored_filename(&raw_filename, source_format);

    let provider = form
        .provider
        .clone()
        .unwrap_or_else(|| state.config.default_provider.clone());
    provider.parse::<ProviderTag>()?;
    // An explicit provider without a model uses that provider's default model.
    let model = match (&form.model, &form.provider) {
        (Some(model), _) => model.clone(),
        (None, Some(_)) => String::new(),
        (None, None) => state.config.default_model.clone(),
    };

    // Step 2: Persist the upload and extract its text
    let session_id = Uuid::new_v4();
    let path = state
        .store
        .save_upload(session_id, &filename, &data)
        .await
        .context("Failed to store upload")?;
    info!(%session_id, file = %filename, bytes = data.len(), "Resume uploaded");

    let resume_text = tokio::task::spawn_blocking(move || documents::extract_text(&path))
        .await
        .context("Extraction task panicked")??;

    // Step 3: Optimise and score
    let record = state
        .optimizer
        .optimize(&resume_text, &job_description, &provider, &model)
        .await?;

    // Step 4: Keep the rewrite for later downloads
    state
        .store
        .save_rewritten(session_id, &record.optimized_resume)
        .await
        .context("Failed to store rewritten resume")?;

    Ok(Json(AnalyzeResponse {
        session_id,
        ats_score: record.ats_score,
        score_percent: record.score_percent(),
        suggestions: record.suggestions,
        optimized_resume: record.optimized_resume,
        resume_text,
    }))
}

/// GET /api/v1/download/:session_id/:format
pub async fn handle_download(
    State(state): State<AppState>,
    Path((session_id, format)): Path<(Uuid, String)>,
) -> Result<Response, AppError> {
    let format: DocumentFormat = format
        .parse()
        .map_err(|_| AppError::Validation("Invalid format specified".into()))?;

    let text = state
        .store
        .load_rewritten(session_id)
        .await
        .context("Failed to read rewritten resume")?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "No resume data for session {session_id}. Please analyze a resume first."
            ))
        })?;
    let base = state.store.original_stem(session_id).await;

    let rules = state.style_rules.clone();
    let rendered = tokio::task::spawn_blocking(move || render::render(&text, format, &rules))
        .await
        .context("Render task panicked")??;

    let disposition = format!("attachment; filename=\"{}\"", rendered.file_name(&base));
    info!(%session_id, %format, bytes = rendered.bytes.len(), "Serving rewritten resume");

    Ok((
        [
            (header::CONTENT_TYPE, rendered.mime().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        rendered.bytes,
    )
        .into_response())
}
