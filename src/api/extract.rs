//! Body and path extractors whose rejections use the `{success, message}` envelope.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequest, FromRequestParts};
use crate::LifecycleError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(LifecycleError))]
pub struct Json<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(LifecycleError))]
pub struct Path<T>(pub T);

impl From<JsonRejection> for LifecycleError {
    fn from(rejection: JsonRejection) -> Self {
        LifecycleError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for LifecycleError {
    fn from(rejection: PathRejection) -> Self {
        LifecycleError::Validation(rejection.body_text())
    }
}
