//! Validates raw source records into [`NormalizedStation`]s.
//!
//! Everything downstream of this module works on the fixed station shape
//! only. Invalid records are dropped and counted, never raised.

use std::fmt;

use indexmap::IndexMap;
use model::{
    raw::{self, RawStation},
    station::{NormalizedStation, Station},
};
use serde_json::Value;
use utility::{geo, id::Id, serde::date_time};

use crate::operator::normalize_operator;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    MissingField(&'static str),
    InvalidField { field: &'static str, value: Value },
    CoordinatesOutOfRange { latitude: f64, longitude: f64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing field '{field}'"),
            Self::InvalidField { field, value } => {
                write!(f, "invalid value for '{field}': {value}")
            }
            Self::CoordinatesOutOfRange {
                latitude,
                longitude,
            } => write!(f, "coordinates out of range: {latitude}, {longitude}"),
        }
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub stations: Vec<NormalizedStation>,
    /// Records dropped because they failed validation.
    pub skipped: usize,
    /// Records superseded by a later record with the same id.
    pub duplicates: usize,
}

/// Validates and deduplicates a batch. When two records share an id, the
/// later one in the batch wins.
pub fn normalize(batch: Vec<RawStation>) -> Normalized {
    let mut by_id: IndexMap<Id<Station>, NormalizedStation> = IndexMap::new();
    let mut skipped = 0;
    let mut duplicates = 0;

    for record in batch {
        match normalize_record(&record) {
            Ok(station) => {
                if by_id.insert(station.id.clone(), station).is_some() {
                    duplicates += 1;
                }
            }
            Err(why) => {
                log::debug!("skipping station record: {why}");
                skipped += 1;
            }
        }
    }

    Normalized {
        stations: by_id.into_values().collect(),
        skipped,
        duplicates,
    }
}

pub fn normalize_record(
    record: &RawStation,
) -> Result<NormalizedStation, ValidationError> {
    let id = station_id(record)?;
    let latitude = coordinate(record, raw::LATITUDE)?;
    let longitude = coordinate(record, raw::LONGITUDE)?;
    if !geo::is_valid_coordinate(latitude, longitude) {
        return Err(ValidationError::CoordinatesOutOfRange {
            latitude,
            longitude,
        });
    }

    Ok(NormalizedStation {
        id,
        name: text(record, raw::NAME),
        address: text(record, raw::ADDRESS),
        operator_name: normalize_operator(record.get_str(raw::OPERATOR_NAME)),
        latitude,
        longitude,
        last_seen_active: record
            .get_str(raw::LAST_SEEN_ACTIVE)
            .and_then(date_time::parse_utc),
    })
}

fn station_id(record: &RawStation) -> Result<Id<Station>, ValidationError> {
    let value = record
        .get(raw::ID)
        .ok_or(ValidationError::MissingField(raw::ID))?;
    let id = match value {
        Value::String(s) => Some(s.trim().to_owned()).filter(|s| !s.is_empty()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    };
    id.map(Id::new).ok_or_else(|| ValidationError::InvalidField {
        field: raw::ID,
        value: value.clone(),
    })
}

fn coordinate(record: &RawStation, field: &'static str) -> Result<f64, ValidationError> {
    let value = record
        .get(field)
        .ok_or(ValidationError::MissingField(field))?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::InvalidField {
        field,
        value: value.clone(),
    })
}

fn text(record: &RawStation, field: &str) -> Option<String> {
    record
        .get_str(field)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}
