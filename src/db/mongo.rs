use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::Document,
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Database, IndexModel,
};

use super::{FindSpec, Store};
use crate::error::AppError;

/// [`Store`] backed by a MongoDB database.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ensure_unique_index(&self, collection: &str, keys: &[&str]) -> Result<(), AppError> {
        let mut spec = Document::new();
        for key in keys {
            spec.insert(*key, 1);
        }
        let index = IndexModel::builder()
            .keys(spec)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection(collection).create_index(index, None).await?;
        log::info!("Ensured unique index on {}({})", collection, keys.join(", "));
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), AppError> {
        self.collection(collection).insert_one(document, None).await?;
        Ok(())
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> Result<Vec<Document>, AppError> {
        let mut options = FindOptions::default();
        options.sort = spec.sort;
        options.projection = spec.projection;
        if spec.skip > 0 {
            options.skip = Some(spec.skip);
        }
        options.limit = spec.limit.and_then(|limit| i64::try_from(limit).ok());

        let cursor = self.collection(collection).find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, collection: &str, filter: Document) -> Result<u64, AppError> {
        Ok(self
            .collection(collection)
            .count_documents(filter, None)
            .await?)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<Option<Document>, AppError> {
        let mut options = FindOneAndUpdateOptions::default();
        options.return_document = Some(ReturnDocument::After);

        Ok(self
            .collection(collection)
            .find_one_and_update(filter, update, options)
            .await?)
    }

    async fn delete_one(&self, collection: &str, filter: Document) -> Result<bool, AppError> {
        let result = self.collection(collection).delete_one(filter, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> Result<u64, AppError> {
        let result = self.collection(collection).delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }
}
