//! The `{ "data": ... }` envelope of every successful API response.
//!
//! Errors use the `{ "error", "code" }` shape from [`crate::error`] instead.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    /// `200 OK` carrying `data`.
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { data })
    }

    /// `201 Created` carrying the created `data`.
    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Json(Self { data }))
    }
}
