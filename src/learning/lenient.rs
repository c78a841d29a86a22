//! Field deserializers for the views read from learner documents.
//!
//! Documents can be changed through the generic collection API, so a field may hold a
//! value of another type than the one the learning service writes. Such a field reads
//! as its default instead of failing the whole view.

use std::collections::BTreeMap;
use bson::{Bson, DateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use crate::util::bson_utils::{as_f64, as_i64};

/// A whole number, doubles are truncated.
pub(crate) fn count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_i64(&Bson::deserialize(deserializer)?).unwrap_or(0))
}

pub(crate) fn optional_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(as_i64(&Bson::deserialize(deserializer)?))
}

/// A document of numbers, non-numeric entries are skipped.
pub(crate) fn percentages<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Bson::deserialize(deserializer)? {
        Bson::Document(doc) => doc
            .iter()
            .filter_map(|(key, value)| as_f64(value).map(|v| (key.clone(), v)))
            .collect(),
        _ => BTreeMap::new(),
    })
}

/// An array, elements of another type are skipped.
pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Bson::deserialize(deserializer)? {
        Bson::Array(values) => values.into_iter().filter_map(|v| bson::from_bson(v).ok()).collect(),
        _ => Vec::new(),
    })
}

pub(crate) fn date<'de, D>(deserializer: D) -> Result<Option<DateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Bson::deserialize(deserializer)?.as_datetime().copied())
}

pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(bson::from_bson(Bson::deserialize(deserializer)?).unwrap_or_default())
}
