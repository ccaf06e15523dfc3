//! Upstream wire shapes. Every field is optional so that decoding a body
//! never fails outright; the validator decides what is acceptable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    /// A single day object, a list of day objects, or an error string.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamDay {
    #[serde(default)]
    pub timings: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub date: Option<UpstreamDate>,
    #[serde(default)]
    pub meta: Option<UpstreamMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamDate {
    #[serde(default)]
    pub readable: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub gregorian: Option<UpstreamCalendarDate>,
    #[serde(default)]
    pub hijri: Option<UpstreamCalendarDate>,
}

/// Shared by the gregorian and hijri blocks; both use `DD-MM-YYYY` dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamCalendarDate {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub weekday: Option<UpstreamName>,
    #[serde(default)]
    pub month: Option<UpstreamMonth>,
    #[serde(default)]
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamName {
    #[serde(default)]
    pub en: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamMonth {
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub en: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamMeta {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub method: Option<UpstreamMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpstreamMethod {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
}
