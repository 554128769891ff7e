use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;

/// JsonBody
///
/// A JSON request body whose failures answer like every other `AppError`: a 400 with
/// `{ "message": ... }`. The Content-Type header is not required, and an empty body
/// reads as `T::default()` so handlers report missing fields themselves.
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|err| {
            AppError::bad_request(format!("Invalid request body: {}", err.body_text()))
        })?;
        parse_json_body(&bytes).map(JsonBody)
    }
}

pub(crate) fn parse_json_body<T>(bytes: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|err| AppError::bad_request(format!("Invalid JSON: {err}")))
}

/// ValidatedJson
///
/// `JsonBody<T>` followed by `T::validate()`. Malformed bodies and rule violations both
/// become a 400 with a readable message.
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Default + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(payload) = JsonBody::<T>::from_request(req, state).await?;
        validate_payload(&payload)?;
        Ok(ValidatedJson(payload))
    }
}

/// PathParam
///
/// `Path<T>` with an `AppError` rejection, so `/api/blogs/abc` gets a JSON 400.
pub struct PathParam<T>(pub T);

impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|err| AppError::bad_request(format!("Invalid path: {}", err.body_text())))?;
        Ok(PathParam(value))
    }
}

/// Runs `T::validate()` on a payload the handler has already normalized.
pub(crate) fn validate_payload<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload
        .validate()
        .map_err(|errors| AppError::bad_request(describe(&errors)))
}

/// Joins every field message, sorted by field name so the output is stable.
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let messages: Vec<String> = fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| match &err.message {
                Some(msg) => msg.to_string(),
                None => format!("{field} is invalid"),
            })
        })
        .collect();

    messages.join("; ")
}
