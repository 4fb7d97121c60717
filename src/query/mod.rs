//! List-route query strings translated into store queries.
//!
//! `GET /bootcamps?averageCost[lte]=10000&careers[in]=Business,UI/UX&select=name&sort=-name&page=2`
//! becomes a filter, projection, sort and window over the collection, plus a
//! count probe used for the pagination descriptors.

pub mod populate;

use chrono::{DateTime as ChronoDateTime, NaiveDate};
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde::Serialize;
use serde_json::Value;

use crate::db::{json::document_to_json, Db, FieldKind, FindSpec, Model};
use crate::error::AppError;

pub use populate::Populate;

const RESERVED: [&str; 4] = ["select", "sort", "page", "limit"];
const OPERATORS: [&str; 5] = ["gt", "gte", "lt", "lte", "in"];

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    filters: Vec<(String, String)>,
    select: Option<String>,
    sort: Option<String>,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            select: None,
            sort: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    pub fn parse(query_string: &str) -> Self {
        let mut query = Self::default();
        for (key, value) in url::form_urlencoded::parse(query_string.as_bytes()) {
            match key.as_ref() {
                "select" => query.select = Some(value.into_owned()),
                "sort" => query.sort = Some(value.into_owned()),
                "page" => query.page = positive_or(&value, DEFAULT_PAGE),
                "limit" => query.limit = positive_or(&value, DEFAULT_LIMIT),
                name if name.is_empty() || name.starts_with('$') => {}
                _ => query.filters.push((key.into_owned(), value.into_owned())),
            }
        }
        query
    }

    pub fn start_index(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Builds the store filter, casting values to the kinds `T` declares.
    pub fn filter<T: Model>(&self) -> Result<Document, AppError> {
        let mut fields: Vec<(String, FieldFilter)> = Vec::new();

        for (key, raw) in &self.filters {
            let (field, operator) = split_operator(key);
            if field.is_empty() || field.starts_with('$') || RESERVED.contains(&field) {
                continue;
            }
            let entry = match fields.iter().position(|(name, _)| name == field) {
                Some(index) => &mut fields[index].1,
                None => {
                    fields.push((field.to_string(), FieldFilter::default()));
                    let last = fields.len() - 1;
                    &mut fields[last].1
                }
            };
            let kind = T::field_kind(field);

            match operator {
                None => entry.equals.push(cast(kind, field, raw)?),
                Some("in") => {
                    let values = raw
                        .split(',')
                        .map(|value| cast(kind, field, value))
                        .collect::<Result<Vec<_>, _>>()?;
                    match entry.operators.get_mut("$in") {
                        Some(Bson::Array(existing)) => existing.extend(values),
                        _ => {
                            entry.operators.insert("$in", values);
                        }
                    }
                }
                Some(op) if OPERATORS.contains(&op) => {
                    entry.operators.insert(format!("${op}"), cast(kind, field, raw)?);
                }
                Some(op) if op.starts_with('$') => {}
                Some(op) => {
                    entry.operators.insert(op, raw.as_str());
                }
            }
        }

        let mut filter = Document::new();
        let mut both = Vec::new();
        for (field, entry) in fields {
            let equality = match entry.equals.len() {
                0 => None,
                1 => entry.equals.into_iter().next(),
                _ => Some(Bson::Document(doc! { "$in": entry.equals })),
            };
            match (equality, entry.operators.is_empty()) {
                (Some(value), true) => {
                    filter.insert(field, value);
                }
                (None, false) => {
                    filter.insert(field, entry.operators);
                }
                (Some(value), false) => {
                    both.push(Bson::Document(doc! { field.as_str(): value }));
                    both.push(Bson::Document(doc! { field.as_str(): entry.operators }));
                }
                (None, true) => {}
            }
        }
        if !both.is_empty() {
            filter.insert("$and", both);
        }
        Ok(filter)
    }

    /// Projection from `select`, never exposing hidden fields.
    ///
    /// `-field` entries exclude. Includes win when both kinds are given.
    pub fn projection<T: Model>(&self) -> Option<Document> {
        let select = self.select.as_deref()?;
        let (excluded, included): (Vec<&str>, Vec<&str>) = select
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty() && !field.starts_with('$'))
            .partition(|field| field.starts_with('-'));

        if included.is_empty() {
            let projection: Document = excluded
                .iter()
                .filter_map(|field| field.strip_prefix('-'))
                .filter(|field| !field.is_empty() && !field.starts_with('$'))
                .map(|field| (field.to_string(), Bson::Int32(0)))
                .collect();
            return (!projection.is_empty()).then_some(projection);
        }

        let mut projection = Document::new();
        for field in included {
            let top = field.split('.').next().unwrap_or(field);
            if !T::HIDDEN.contains(&top) {
                projection.insert(field, 1);
            }
        }
        if projection.is_empty() {
            projection.insert("_id", 1);
        }
        Some(projection)
    }

    pub fn sort(&self) -> Document {
        let mut sort = Document::new();
        for field in self.sort.as_deref().unwrap_or_default().split(',') {
            let field = field.trim();
            match field.strip_prefix('-') {
                Some(descending) if !descending.is_empty() => {
                    sort.insert(descending, -1);
                }
                Some(_) => {}
                None if field.is_empty() => {}
                None => {
                    sort.insert(field, 1);
                }
            }
        }
        if sort.is_empty() {
            sort.insert("createdAt", -1);
        }
        sort
    }
}

#[derive(Debug, Default)]
struct FieldFilter {
    equals: Vec<Bson>,
    operators: Document,
}

fn split_operator(key: &str) -> (&str, Option<&str>) {
    match key.split_once('[') {
        Some((field, rest)) => (field, Some(rest.strip_suffix(']').unwrap_or(rest))),
        None => (key, None),
    }
}

/// Reads the leading digits, so `10abc` is 10 and `2.5` is 2.
fn positive_or(raw: &str, default: u64) -> u64 {
    let trimmed = raw.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    match unsigned[..end].parse::<u64>() {
        Ok(value) if value > 0 => value,
        _ => default,
    }
}

fn cast(kind: Option<FieldKind>, field: &str, raw: &str) -> Result<Bson, AppError> {
    let invalid = || AppError::Validation(format!("Invalid value '{raw}' for {field}"));
    let trimmed = raw.trim();

    match kind {
        None => Ok(Bson::String(raw.to_string())),
        Some(FieldKind::Number) => trimmed
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .map(Bson::Double)
            .ok_or_else(invalid),
        Some(FieldKind::Bool) => match trimmed {
            "true" | "1" => Ok(Bson::Boolean(true)),
            "false" | "0" => Ok(Bson::Boolean(false)),
            _ => Err(invalid()),
        },
        Some(FieldKind::ObjectId) => ObjectId::parse_str(trimmed)
            .map(Bson::ObjectId)
            .map_err(|_| invalid()),
        Some(FieldKind::Date) => parse_date(trimmed)
            .map(|millis| Bson::DateTime(DateTime::from_millis(millis)))
            .ok_or_else(invalid),
    }
}

fn parse_date(raw: &str) -> Option<i64> {
    if let Ok(datetime) = ChronoDateTime::parse_from_rfc3339(raw) {
        return Some(datetime.timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp_millis())
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageRef {
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<PageRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<PageRef>,
}

impl Pagination {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self {
            next: (page.saturating_mul(limit) < total).then_some(PageRef { page: page + 1, limit }),
            prev: (page > 1).then(|| PageRef { page: page - 1, limit }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdvancedResults {
    pub success: bool,
    pub count: u64,
    pub pagination: Pagination,
    pub data: Vec<Value>,
}

/// Runs a list query against `T`'s collection and applies `populate` to the page.
pub async fn advanced_results<T: Model>(
    db: &Db,
    query: &ListQuery,
    populate: &[Populate],
) -> Result<AdvancedResults, AppError> {
    let filter = query.filter::<T>()?;
    let total = db.store().count(T::COLLECTION, filter.clone()).await?;

    let spec = FindSpec {
        sort: Some(query.sort()),
        skip: query.start_index(),
        limit: Some(query.limit),
        projection: query.projection::<T>(),
    };
    let mut documents = db.store().find(T::COLLECTION, filter, spec).await?;

    for directive in populate {
        directive.apply(db.store(), &mut documents).await?;
    }

    Ok(AdvancedResults {
        success: true,
        count: total,
        pagination: Pagination::new(query.page, query.limit, total),
        data: documents
            .into_iter()
            .map(|document| document_to_json(document, T::HIDDEN))
            .collect(),
    })
}

/// Single record by id with `populate` applied, rendered for the client.
pub async fn find_populated<T: Model>(
    db: &Db,
    id: &ObjectId,
    populate: &[Populate],
) -> Result<Option<Value>, AppError> {
    let spec = FindSpec {
        limit: Some(1),
        ..FindSpec::default()
    };
    let mut documents = db.store().find(T::COLLECTION, doc! { "_id": *id }, spec).await?;
    for directive in populate {
        directive.apply(db.store(), &mut documents).await?;
    }
    Ok(documents
        .into_iter()
        .next()
        .map(|document| document_to_json(document, T::HIDDEN)))
}
