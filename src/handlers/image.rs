use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::BytesMut;

use crate::error::{AppError, MessageBody, Result};
use crate::models::{ImageRecord, UploadResponse};
use crate::services::{ImageService, IncomingFile};
use crate::validation::{is_accepted_mime, mime_essence, RejectReason, ValidationIssue};
use crate::AppState;

/// Multipart field carrying the uploaded files
const FILES_FIELD: &str = "files";

fn parse_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid image ID".to_string()))
}

/// List all images, newest first
/// GET /api/images
pub async fn list_images(State(state): State<AppState>) -> Result<Json<Vec<ImageRecord>>> {
    let images = ImageService::list_images(state.store.as_ref()).await?;
    Ok(Json(images))
}

/// Get a single image record
/// GET /api/images/:id
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ImageRecord>> {
    let image = ImageService::get_image(state.store.as_ref(), parse_id(&id)?).await?;
    Ok(Json(image))
}

/// Serve the decoded image bytes
/// GET /images/:id
pub async fn serve_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let image = ImageService::get_image(state.store.as_ref(), parse_id(&id)?).await?;

    if image.data.is_empty() {
        return Err(AppError::NotFound("Image data not found".to_string()));
    }

    let data = image
        .decode_data()
        .map_err(|e| {
            AppError::Internal(format!(
                "Stored data for image {} is not valid base64: {}",
                image.id, e
            ))
        })?;

    let fallback_name: String = image
        .filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let encoded_name = urlencoding::encode(&image.originalname);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, image.mimetype.as_str())
        .header(header::CONTENT_LENGTH, data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "inline; filename=\"{}\"; filename*=UTF-8''{}",
                fallback_name, encoded_name
            ),
        )
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Upload one or more images in a single batch
/// POST /api/images/upload
pub async fn upload_images(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let limits = state.config.upload.limits();
    let mut files: Vec<IncomingFile> = Vec::new();
    let mut issues: Vec<ValidationIssue> = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(format!("Failed to process multipart: {}", e))
    })? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }

        if files.len() + issues.len() >= limits.max_files {
            return Err(AppError::BadRequest(format!(
                "Too many files; at most {} can be uploaded at once",
                limits.max_files
            )));
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .map(mime_essence)
            .filter(|m| m != "application/octet-stream")
            .unwrap_or_else(|| {
                mime_guess::from_path(&name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string()
            });

        // Foreign or oversized parts are drained without buffering
        let mut rejected = (!is_accepted_mime(&mime_type)).then_some(RejectReason::UnsupportedType);
        let mut data = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            AppError::BadRequest(format!("Failed to read file chunk: {}", e))
        })? {
            if rejected.is_some() {
                continue;
            }
            if (data.len() + chunk.len()) as u64 > limits.max_file_size {
                rejected = Some(RejectReason::TooLarge);
                data.clear();
                continue;
            }
            data.extend_from_slice(&chunk);
        }
        if rejected.is_none() && data.is_empty() {
            rejected = Some(RejectReason::Empty);
        }

        match rejected {
            Some(reason) => {
                tracing::debug!("Rejected {} ({}): {}", name, mime_type, reason);
                issues.push(ValidationIssue::new(name, reason));
            }
            None => {
                tracing::debug!("Received {} ({}, {} bytes)", name, mime_type, data.len());
                files.push(IncomingFile {
                    name,
                    mime_type,
                    data: data.freeze(),
                });
            }
        }
    }

    if !issues.is_empty() {
        return Err(AppError::Validation(issues));
    }

    let images = ImageService::upload_batch(state.store.as_ref(), &limits, files).await?;

    let body = UploadResponse {
        message: format!("Successfully uploaded {} image(s)", images.len()),
        images,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// Delete an image
/// DELETE /api/images/:id
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageBody>> {
    ImageService::delete_image(state.store.as_ref(), parse_id(&id)?).await?;
    Ok(Json(MessageBody::new("Image deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("5").unwrap(), 5);
        assert!(matches!(parse_id("abc"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_id(""), Err(AppError::BadRequest(_))));
    }
}
