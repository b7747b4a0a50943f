//! The parts of an Open Charge Map point of interest the pipeline reads.
//!
//! Every field is kept as an untyped value so one odd record cannot fail
//! a whole page. Validation is left to the normalizer.

use model::raw::{self, RawStation};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressInfo {
    pub title: Option<Value>,
    pub address_line1: Option<Value>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OperatorInfo {
    pub title: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Poi {
    #[serde(rename = "ID")]
    pub id: Option<Value>,
    pub address_info: Option<AddressInfo>,
    pub operator_info: Option<OperatorInfo>,
    pub date_last_confirmed: Option<Value>,
    pub date_last_status_update: Option<Value>,
}

impl Poi {
    /// Flattens the nested document into the keys the normalizer expects.
    /// The last confirmation date is preferred over the last status update.
    pub fn into_raw(self) -> RawStation {
        let mut station = RawStation::new();
        let address = self.address_info.unwrap_or_default();

        let fields = [
            (raw::ID, self.id),
            (raw::NAME, address.title),
            (raw::ADDRESS, address.address_line1),
            (raw::LATITUDE, address.latitude),
            (raw::LONGITUDE, address.longitude),
            (
                raw::OPERATOR_NAME,
                self.operator_info.and_then(|operator| operator.title),
            ),
            (
                raw::LAST_SEEN_ACTIVE,
                present(self.date_last_confirmed).or(present(self.date_last_status_update)),
            ),
        ];
        for (key, value) in fields {
            if let Some(value) = present(value) {
                station.insert(key, value);
            }
        }
        station
    }
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|value| !value.is_null())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn poi(value: Value) -> Poi {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn flattens_nested_fields() {
        let raw = poi(json!({
            "ID": 12345,
            "AddressInfo": {
                "Title": "Jing'an Supercharger",
                "AddressLine1": "1601 Nanjing West Road",
                "Latitude": 31.2286,
                "Longitude": 121.4453
            },
            "OperatorInfo": { "Title": "Tesla Motors (Worldwide)" },
            "DateLastConfirmed": null,
            "DateLastStatusUpdate": "2025-12-20T08:00:00Z",
            "UsageCost": "free"
        }))
        .into_raw();

        assert_eq!(raw.get(raw::ID), Some(&json!(12345)));
        assert_eq!(raw.get_str(raw::NAME), Some("Jing'an Supercharger"));
        assert_eq!(raw.get(raw::LATITUDE), Some(&json!(31.2286)));
        assert_eq!(raw.get_str(raw::OPERATOR_NAME), Some("Tesla Motors (Worldwide)"));
        assert_eq!(raw.get_str(raw::LAST_SEEN_ACTIVE), Some("2025-12-20T08:00:00Z"));
        assert_eq!(raw.get("UsageCost"), None);
    }

    #[test]
    fn confirmation_date_wins_over_status_update() {
        let raw = poi(json!({
            "ID": 1,
            "DateLastConfirmed": "2025-01-01T00:00:00Z",
            "DateLastStatusUpdate": "2025-06-01T00:00:00Z"
        }))
        .into_raw();
        assert_eq!(raw.get_str(raw::LAST_SEEN_ACTIVE), Some("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn missing_sections_leave_keys_absent() {
        let raw = poi(json!({ "ID": 1 })).into_raw();
        assert_eq!(raw.get(raw::LATITUDE), None);
        assert_eq!(raw.get(raw::OPERATOR_NAME), None);
        assert_eq!(raw.get(raw::LAST_SEEN_ACTIVE), None);
    }
}
