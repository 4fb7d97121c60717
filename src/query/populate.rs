use std::collections::HashMap;

use mongodb::bson::{doc, oid::ObjectId, Bson, Document};

use crate::db::{FindSpec, Store};
use crate::error::AppError;

/// Eager join applied to a page of list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    /// Replaces the id stored in `field` with the referenced record, trimmed to `select`.
    Reference {
        field: &'static str,
        collection: &'static str,
        select: &'static [&'static str],
    },
    /// Attaches every record of `collection` whose `foreign_field` points at this one.
    Virtual {
        field: &'static str,
        collection: &'static str,
        foreign_field: &'static str,
    },
}

impl Populate {
    pub async fn apply(&self, store: &dyn Store, documents: &mut [Document]) -> Result<(), AppError> {
        if documents.is_empty() {
            return Ok(());
        }
        match *self {
            Populate::Reference {
                field,
                collection,
                select,
            } => populate_reference(store, documents, field, collection, select).await,
            Populate::Virtual {
                field,
                collection,
                foreign_field,
            } => populate_virtual(store, documents, field, collection, foreign_field).await,
        }
    }
}

async fn populate_reference(
    store: &dyn Store,
    documents: &mut [Document],
    field: &str,
    collection: &str,
    select: &[&str],
) -> Result<(), AppError> {
    let ids: Vec<ObjectId> = documents
        .iter()
        .filter_map(|document| document.get_object_id(field).ok())
        .collect();
    if ids.is_empty() {
        return Ok(());
    }

    let projection = (!select.is_empty()).then(|| {
        select
            .iter()
            .map(|name| (name.to_string(), Bson::Int32(1)))
            .collect::<Document>()
    });
    let spec = FindSpec {
        projection,
        ..FindSpec::default()
    };
    let referenced: HashMap<ObjectId, Document> = store
        .find(collection, doc! { "_id": { "$in": ids } }, spec)
        .await?
        .into_iter()
        .filter_map(|record| record.get_object_id("_id").ok().map(|id| (id, record)))
        .collect();

    for document in documents.iter_mut() {
        let Ok(id) = document.get_object_id(field) else {
            continue;
        };
        let joined = referenced.get(&id).cloned().map_or(Bson::Null, Bson::Document);
        document.insert(field, joined);
    }
    Ok(())
}

async fn populate_virtual(
    store: &dyn Store,
    documents: &mut [Document],
    field: &str,
    collection: &str,
    foreign_field: &str,
) -> Result<(), AppError> {
    let ids: Vec<ObjectId> = documents
        .iter()
        .filter_map(|document| document.get_object_id("_id").ok())
        .collect();

    let spec = FindSpec {
        sort: Some(doc! { "createdAt": 1, "_id": 1 }),
        ..FindSpec::default()
    };
    let mut grouped: HashMap<ObjectId, Vec<Bson>> = HashMap::new();
    for record in store
        .find(collection, doc! { foreign_field: { "$in": ids } }, spec)
        .await?
    {
        if let Ok(owner) = record.get_object_id(foreign_field) {
            grouped.entry(owner).or_default().push(Bson::Document(record));
        }
    }

    for document in documents.iter_mut() {
        let children = document
            .get_object_id("_id")
            .ok()
            .and_then(|id| grouped.remove(&id))
            .unwrap_or_default();
        document.insert(field, children);
    }
    Ok(())
}
