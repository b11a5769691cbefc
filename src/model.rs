// Mission record model

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kv::{Item, ItemValue};

/// Mission metadata as stored in the missions table.
///
/// `collection_window_start <= collection_window_end` is owned by the data
/// layer and not checked here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissionRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub priority: i64,
    pub target_satellite_id: String,
    pub observer_satellite_id: String,
    /// Time of closest approach (unix seconds)
    pub tca: i64,
    pub min_range_km: f64,
    pub collection_window_start: i64,
    pub collection_window_end: i64,
    pub collection_type: String,
    pub pointing_target: String,
    pub image_ids: Vec<String>,
}

/// Item could not be read as a mission record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("attribute '{attribute}' has unexpected type (expected {expected})")]
    WrongType {
        attribute: &'static str,
        expected: &'static str,
    },

    #[error("attribute '{attribute}' holds an invalid number '{value}'")]
    InvalidNumber {
        attribute: &'static str,
        value: String,
    },
}

impl MissionRecord {
    /// Build a record from a store item.
    ///
    /// Absent attributes take their zero value; present attributes of the
    /// wrong type are an error.
    pub fn from_item(item: &Item) -> Result<Self, ModelError> {
        Ok(Self {
            id: string_attr(item, "id")?,
            name: string_attr(item, "name")?,
            status: string_attr(item, "status")?,
            priority: number_attr(item, "priority")?,
            target_satellite_id: string_attr(item, "target_satellite_id")?,
            observer_satellite_id: string_attr(item, "observer_satellite_id")?,
            tca: number_attr(item, "tca")?,
            min_range_km: number_attr(item, "min_range_km")?,
            collection_window_start: number_attr(item, "collection_window_start")?,
            collection_window_end: number_attr(item, "collection_window_end")?,
            collection_type: string_attr(item, "collection_type")?,
            pointing_target: string_attr(item, "pointing_target")?,
            image_ids: string_list_attr(item, "image_ids")?,
        })
    }

    /// Inverse of [`MissionRecord::from_item`], used to seed stores
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        let mut put = |name: &str, value: ItemValue| {
            item.insert(name.to_string(), value);
        };
        put("id", ItemValue::Str(self.id.clone()));
        put("name", ItemValue::Str(self.name.clone()));
        put("status", ItemValue::Str(self.status.clone()));
        put("priority", ItemValue::Num(self.priority.to_string()));
        put(
            "target_satellite_id",
            ItemValue::Str(self.target_satellite_id.clone()),
        );
        put(
            "observer_satellite_id",
            ItemValue::Str(self.observer_satellite_id.clone()),
        );
        put("tca", ItemValue::Num(self.tca.to_string()));
        put("min_range_km", ItemValue::Num(self.min_range_km.to_string()));
        put(
            "collection_window_start",
            ItemValue::Num(self.collection_window_start.to_string()),
        );
        put(
            "collection_window_end",
            ItemValue::Num(self.collection_window_end.to_string()),
        );
        put("collection_type", ItemValue::Str(self.collection_type.clone()));
        put("pointing_target", ItemValue::Str(self.pointing_target.clone()));
        put(
            "image_ids",
            ItemValue::List(
                self.image_ids
                    .iter()
                    .map(|id| ItemValue::Str(id.clone()))
                    .collect(),
            ),
        );
        item
    }
}

fn string_attr(item: &Item, attribute: &'static str) -> Result<String, ModelError> {
    match item.get(attribute) {
        None | Some(ItemValue::Null) => Ok(String::new()),
        Some(ItemValue::Str(s)) => Ok(s.clone()),
        Some(_) => Err(ModelError::WrongType {
            attribute,
            expected: "string",
        }),
    }
}

fn number_attr<T>(item: &Item, attribute: &'static str) -> Result<T, ModelError>
where
    T: std::str::FromStr + Default,
{
    match item.get(attribute) {
        None | Some(ItemValue::Null) => Ok(T::default()),
        Some(ItemValue::Num(n)) => n.parse().map_err(|_| ModelError::InvalidNumber {
            attribute,
            value: n.clone(),
        }),
        Some(_) => Err(ModelError::WrongType {
            attribute,
            expected: "number",
        }),
    }
}

fn string_list_attr(item: &Item, attribute: &'static str) -> Result<Vec<String>, ModelError> {
    let wrong_type = ModelError::WrongType {
        attribute,
        expected: "list of strings",
    };
    match item.get(attribute) {
        None | Some(ItemValue::Null) => Ok(Vec::new()),
        Some(ItemValue::StrSet(set)) => Ok(set.clone()),
        Some(ItemValue::List(values)) => values
            .iter()
            .map(|v| match v {
                ItemValue::Str(s) => Ok(s.clone()),
                _ => Err(wrong_type.clone()),
            })
            .collect(),
        Some(_) => Err(wrong_type),
    }
}
