pub mod json;
pub mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::{doc, from_document, oid::ObjectId, to_document, Bson, DateTime, Document};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::AppError;

pub use mongo::MongoStore;

/// Options for a multi-document read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindSpec {
    pub sort: Option<Document>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub projection: Option<Document>,
}

/// Raw document storage.
///
/// Filters use the MongoDB query dialect; updates accept `$set` and `$unset`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ensure_unique_index(&self, collection: &str, keys: &[&str]) -> Result<(), AppError>;

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), AppError>;

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<Document>, AppError>;

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, AppError>;

    /// Applies `update` to the first match and returns the updated document.
    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<Option<Document>, AppError>;

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<bool, AppError>;

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, AppError>;
}

/// How a query-string value is cast before it reaches a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Bool,
    ObjectId,
    Date,
}

pub trait Model: Serialize + DeserializeOwned + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;
    /// Never rendered to clients.
    const HIDDEN: &'static [&'static str] = &[];
    /// Non-string fields that accept filters.
    const FIELDS: &'static [(&'static str, FieldKind)] = &[];

    fn id(&self) -> &ObjectId;

    fn field_kind(path: &str) -> Option<FieldKind> {
        match path {
            "_id" => Some(FieldKind::ObjectId),
            "createdAt" | "updatedAt" => Some(FieldKind::Date),
            _ => Self::FIELDS
                .iter()
                .find(|(name, _)| *name == path)
                .map(|(_, kind)| *kind),
        }
    }
}

/// Records carrying an owning-user reference.
pub trait Owned: Model {
    fn owner(&self) -> &ObjectId;
}

/// Typed access to a [`Store`].
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn Store>,
}

impl Db {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub async fn insert<T: Model>(&self, record: &T) -> Result<(), AppError> {
        self.store.insert_one(T::COLLECTION, to_document(record)?).await
    }

    pub async fn find_by_id<T: Model>(&self, id: &ObjectId) -> Result<Option<T>, AppError> {
        self.find_one(doc! { "_id": *id }).await
    }

    pub async fn find_one<T: Model>(&self, filter: Document) -> Result<Option<T>, AppError> {
        let spec = FindSpec {
            limit: Some(1),
            ..FindSpec::default()
        };
        let found = self.store.find(T::COLLECTION, filter, spec).await?;
        found.into_iter().next().map(decode).transpose()
    }

    pub async fn find<T: Model>(&self, filter: Document) -> Result<Vec<T>, AppError> {
        let spec = FindSpec {
            sort: Some(doc! { "createdAt": 1, "_id": 1 }),
            ..FindSpec::default()
        };
        let found = self.store.find(T::COLLECTION, filter, spec).await?;
        found.into_iter().map(decode).collect()
    }

    /// Runs an update against one record, stamping `updatedAt`.
    pub async fn update_by_id<T: Model>(
        &self,
        id: &ObjectId,
        mut update: Document,
    ) -> Result<Option<T>, AppError> {
        let now = Bson::DateTime(DateTime::now());
        match update.get_mut("$set") {
            Some(Bson::Document(set)) => {
                set.insert("updatedAt", now);
            }
            _ => {
                update.insert("$set", doc! { "updatedAt": now });
            }
        }

        let updated = self
            .store
            .update_one(T::COLLECTION, doc! { "_id": *id }, update)
            .await?;
        updated.map(decode).transpose()
    }

    pub async fn set_fields<T: Model>(
        &self,
        id: &ObjectId,
        fields: Document,
    ) -> Result<Option<T>, AppError> {
        self.update_by_id(id, doc! { "$set": fields }).await
    }

    pub async fn delete_by_id<T: Model>(&self, id: &ObjectId) -> Result<bool, AppError> {
        self.store.delete_one(T::COLLECTION, doc! { "_id": *id }).await
    }

    pub async fn delete_many<T: Model>(&self, filter: Document) -> Result<u64, AppError> {
        self.store.delete_many(T::COLLECTION, filter).await
    }
}

fn decode<T: Model>(document: Document) -> Result<T, AppError> {
    Ok(from_document(document)?)
}

/// Parses a path id. Unparseable ids read as missing records.
pub fn parse_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::NotFound("Resource not found".into()))
}

/// Unique indexes the handlers rely on for conflict detection.
pub async fn ensure_indexes(db: &Db) -> Result<(), AppError> {
    use crate::models::{bootcamp::Bootcamp, review::Review, user::User};

    db.store().ensure_unique_index(User::COLLECTION, &["email"]).await?;
    db.store().ensure_unique_index(Bootcamp::COLLECTION, &["name"]).await?;
    db.store()
        .ensure_unique_index(Review::COLLECTION, &["bootcamp", "user"])
        .await?;
    Ok(())
}
