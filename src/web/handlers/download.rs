//! Download handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};

use crate::share::Download;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, OptionalAuthUser};

/// Build a Content-Disposition value that cannot inject headers.
///
/// Non-ASCII names get an RFC 5987 `filename*` parameter.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    if filename.is_ascii() && sanitized == filename {
        return format!("attachment; filename=\"{filename}\"");
    }

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

fn download_response(download: Download) -> Result<Response, ApiError> {
    let Download { file, content } = download;

    Response::builder()
        .header(header::CONTENT_TYPE, file.mime_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file.name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/files/:file_id/content - Download a file the caller may read.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let download = state.shares.download_file(&principal, &file_id).await?;
    download_response(download)
}

/// GET /api/public/:token/download - Download through a public link.
pub async fn download_by_token(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(principal): OptionalAuthUser,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let download = state
        .shares
        .download_by_token(&token, principal.as_ref())
        .await?;
    download_response(download)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition_header("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_strips_injection() {
        let value = content_disposition_header("evil\r\nSet-Cookie: x=\"1\".txt");
        assert!(!value.contains('\r'));
        assert!(!value.contains('\n'));
        assert!(value.starts_with("attachment; filename=\"evilSet-Cookie: x=_1_.txt\""));
    }

    #[test]
    fn test_content_disposition_unicode() {
        let value = content_disposition_header("résumé.txt");
        assert!(value.contains("filename=\"r_sum_.txt\""));
        assert!(value.contains("filename*=UTF-8''r%C3%A9sum%C3%A9.txt"));
    }
}
