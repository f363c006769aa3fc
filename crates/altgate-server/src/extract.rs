use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections (malformed JSON, wrong content type,
/// wrong field types) surface as `400` [`AppError::BadRequest`] instead of
/// axum's default `415`/`422` plain-text responses.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);
