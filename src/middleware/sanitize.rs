use std::collections::HashSet;
use std::ops::Deref;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// A JSON body with markup stripped from every string and operator-looking
/// keys removed, deserialized into `T`.
#[derive(Debug)]
pub struct Sanitized<T>(pub T);

impl<T> Sanitized<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Sanitized<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: DeserializeOwned + 'static> FromRequest for Sanitized<T> {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let body = web::Json::<Value>::from_request(req, payload);
        Box::pin(async move {
            let web::Json(body) = body
                .await
                .map_err(|err| AppError::Validation(err.to_string()))?;
            serde_json::from_value(sanitize(body))
                .map(Sanitized)
                .map_err(|err| AppError::Validation(err.to_string()))
        })
    }
}

pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(strip_tags(text)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .filter(|(key, _)| !key.starts_with('$') && !key.contains('.'))
                .map(|(key, value)| (key, sanitize(value)))
                .collect::<Map<_, _>>(),
        ),
        other => other,
    }
}

fn strip_tags(text: String) -> String {
    if !text.contains('<') {
        return text;
    }
    ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(&text)
        .to_string()
}
