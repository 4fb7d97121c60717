use mongodb::bson::{to_document, Bson, Document};
use serde_json::{Map, Number, Value};

use super::Model;
use crate::error::AppError;

/// Renders a stored document as client JSON: ObjectIds become hex strings,
/// datetimes become RFC 3339 strings, and top-level `hidden` fields are dropped.
pub fn document_to_json(mut document: Document, hidden: &[&str]) -> Value {
    for field in hidden {
        document.remove(*field);
    }
    Value::Object(object(document))
}

pub fn render<T: Model>(record: &T) -> Result<Value, AppError> {
    Ok(document_to_json(to_document(record)?, T::HIDDEN))
}

pub fn render_all<T: Model>(records: &[T]) -> Result<Vec<Value>, AppError> {
    records.iter().map(render).collect()
}

fn object(document: Document) -> Map<String, Value> {
    document
        .into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect()
}

pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(id) => Value::String(id.to_hex()),
        Bson::DateTime(datetime) => match datetime.try_to_rfc3339_string() {
            Ok(formatted) => Value::String(formatted),
            Err(_) => Value::from(datetime.timestamp_millis()),
        },
        Bson::Document(document) => Value::Object(object(document)),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Double(number) => Number::from_f64(number).map_or(Value::Null, Value::Number),
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::String(text) => Value::String(text),
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Null | Bson::Undefined => Value::Null,
        other => other.into_relaxed_extjson(),
    }
}
