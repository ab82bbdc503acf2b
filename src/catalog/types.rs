use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// One object of the satellite catalog.
///
/// Field names follow the provider's SATCAT records so provider payloads and
/// the local snapshot share one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "SATNAME", alias = "name")]
    pub name: String,
    #[serde(
        rename = "NORAD_CAT_ID",
        alias = "catalogId",
        deserialize_with = "deserialize_catalog_id"
    )]
    pub norad_id: u32,
    #[serde(rename = "INTLDES", default, skip_serializing_if = "Option::is_none")]
    pub intl_designator: Option<String>,
    #[serde(rename = "OBJECT_TYPE", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(rename = "COUNTRY", default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "LAUNCH", default, skip_serializing_if = "Option::is_none")]
    pub launch_date: Option<NaiveDate>,
    #[serde(rename = "DECAY", default, skip_serializing_if = "Option::is_none")]
    pub decay_date: Option<NaiveDate>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, norad_id: u32) -> Self {
        Self {
            name: name.into(),
            norad_id,
            intl_designator: None,
            object_type: None,
            country: None,
            launch_date: None,
            decay_date: None,
        }
    }

    pub fn is_decayed(&self) -> bool {
        self.decay_date.is_some()
    }
}

fn deserialize_catalog_id<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u32),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(id) => Ok(id),
        Repr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
