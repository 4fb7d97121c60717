//! Bootcamp aggregates derived from child courses and reviews.
//!
//! Values are always recomputed from the live children after a mutation,
//! never adjusted incrementally.

use mongodb::bson::{doc, oid::ObjectId};

use crate::db::Db;
use crate::error::AppError;
use crate::models::{bootcamp::Bootcamp, course::Course, review::Review};

/// Mean tuition rounded up to the next multiple of ten.
pub fn average_cost(tuitions: &[f64]) -> Option<f64> {
    if tuitions.is_empty() {
        return None;
    }
    let mean = tuitions.iter().sum::<f64>() / tuitions.len() as f64;
    Some((mean / 10.0).ceil() * 10.0)
}

pub fn average_rating(ratings: &[f64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().sum::<f64>() / ratings.len() as f64
}

pub async fn recompute_average_cost(db: &Db, bootcamp: &ObjectId) {
    if let Err(err) = try_recompute_average_cost(db, bootcamp).await {
        log::error!("Failed to recompute average cost for bootcamp {}: {}", bootcamp, err);
    }
}

pub async fn recompute_average_rating(db: &Db, bootcamp: &ObjectId) {
    if let Err(err) = try_recompute_average_rating(db, bootcamp).await {
        log::error!("Failed to recompute average rating for bootcamp {}: {}", bootcamp, err);
    }
}

async fn try_recompute_average_cost(db: &Db, bootcamp: &ObjectId) -> Result<(), AppError> {
    let tuitions: Vec<f64> = db
        .find::<Course>(doc! { "bootcamp": *bootcamp })
        .await?
        .into_iter()
        .map(|course| course.tuition)
        .collect();

    let update = match average_cost(&tuitions) {
        Some(cost) => doc! { "$set": { "averageCost": cost } },
        None => doc! { "$unset": { "averageCost": "" } },
    };
    db.update_by_id::<Bootcamp>(bootcamp, update).await?;
    log::debug!("Recomputed average cost for bootcamp {}", bootcamp);
    Ok(())
}

async fn try_recompute_average_rating(db: &Db, bootcamp: &ObjectId) -> Result<(), AppError> {
    let ratings: Vec<f64> = db
        .find::<Review>(doc! { "bootcamp": *bootcamp })
        .await?
        .into_iter()
        .map(|review| f64::from(review.rating))
        .collect();

    db.set_fields::<Bootcamp>(bootcamp, doc! { "averageRating": average_rating(&ratings) })
        .await?;
    log::debug!("Recomputed average rating for bootcamp {}", bootcamp);
    Ok(())
}
