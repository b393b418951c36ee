use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use super::error::ApiError;
use crate::types::TodoId;

/// JSON body that has been both deserialized and run through its
/// `validator` rules. Rejections come back as `ApiError`.
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// The `{id}` segment of `/todos/{id}`.
pub struct TodoIdPath(pub TodoId);

#[async_trait]
impl<S> FromRequestParts<S> for TodoIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<TodoId>::from_request_parts(parts, state).await?;
        Ok(TodoIdPath(id))
    }
}
