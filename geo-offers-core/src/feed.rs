//! Upstream feed wire format.
//!
//! The provider encodes numbers as strings (`"id": "123"`, `"ecpl": "1.25"`)
//! and is not consistent about it, so every numeric field is held as a raw
//! JSON value and parsed leniently. A value that does not parse counts as
//! zero, except the identifier, which makes the whole record unusable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{compute_rating, ExternalId, Offer};

/// Geo code the provider uses for "worldwide" variants. These are skipped.
pub const WORLD_GEO_CODE: &str = "Wrld";

/// One page of the upstream feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedPage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub offers: Vec<ExternalOffer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalOffer {
    #[serde(default)]
    pub id: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub offer_currency: ExternalCurrency,
    #[serde(default)]
    pub approval_time: Value,
    #[serde(default)]
    pub payment_time: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub site_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logo: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub geo: Vec<ExternalGeo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stat: ExternalStat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalCurrency {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalGeo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalStat {
    #[serde(default)]
    pub ecpl: Value,
}

impl ExternalOffer {
    /// Upstream identifier, if it is an integer or an integer string.
    pub fn external_id(&self) -> Option<ExternalId> {
        match &self.id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn approval_days(&self) -> i64 {
        lenient_int(&self.approval_time)
    }

    pub fn payment_days(&self) -> i64 {
        lenient_int(&self.payment_time)
    }

    pub fn ecpl(&self) -> f64 {
        lenient_float(&self.stat.ecpl)
    }

    /// Expand this record into one offer candidate per geo variant.
    ///
    /// Worldwide variants are dropped. Every candidate carries the parent's
    /// identifier, so candidates of one record collide in the store.
    pub fn candidates(&self, external_id: ExternalId) -> Vec<Offer> {
        let approval_days = self.approval_days();
        let rating = compute_rating(self.ecpl(), approval_days, self.payment_days());

        self.geo
            .iter()
            .filter(|geo| geo.code != WORLD_GEO_CODE)
            .map(|geo| Offer {
                external_id,
                name: self.name.clone(),
                currency: self.offer_currency.name.clone(),
                approval_time: approval_days,
                site_url: self.site_url.clone(),
                logo: self.logo.clone(),
                geo_code: geo.code.clone(),
                geo_name: geo.name.clone(),
                rating,
            })
            .collect()
    }
}

fn lenient_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn lenient_float(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    // Non-finite values would be listed as null and break rating order
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "offers": [{
            "id": "4242",
            "name": "Quick Loan",
            "offer_currency": {"name": "RUB"},
            "approval_time": "30",
            "payment_time": "45",
            "site_url": "https://loan.example",
            "logo": "https://loan.example/logo.png",
            "geo": [
                {"code": "RU", "name": "Russia"},
                {"code": "Wrld", "name": "World"},
                {"code": "KZ", "name": "Kazakhstan"}
            ],
            "stat": {"ecpl": "1.5"}
        }]
    }"#;

    #[test]
    fn test_decode_sample_page() -> Result<(), serde_json::Error> {
        let page: FeedPage = serde_json::from_str(SAMPLE)?;
        assert_eq!(page.offers.len(), 1);
        let offer = &page.offers[0];
        assert_eq!(offer.external_id(), Some(4242));
        assert_eq!(offer.approval_days(), 30);
        assert_eq!(offer.payment_days(), 45);
        assert_eq!(offer.ecpl(), 1.5);
        Ok(())
    }

    #[test]
    fn test_candidates_skip_world_variant() -> Result<(), serde_json::Error> {
        let page: FeedPage = serde_json::from_str(SAMPLE)?;
        let candidates = page.offers[0].candidates(4242);
        let geos: Vec<_> = candidates.iter().map(|c| c.geo_code.as_str()).collect();
        assert_eq!(geos, vec!["RU", "KZ"]);
        assert!(candidates.iter().all(|c| c.external_id == 4242));
        assert!(candidates.iter().all(|c| (c.rating - 500.0).abs() < 1e-9));
        assert_eq!(candidates[0].currency, "RUB");
        assert_eq!(candidates[1].geo_name, "Kazakhstan");
        Ok(())
    }

    #[test]
    fn test_unparsable_numbers_become_zero() -> Result<(), serde_json::Error> {
        let offer: ExternalOffer = serde_json::from_str(
            r#"{"id": "1", "approval_time": "soon", "payment_time": null, "stat": {"ecpl": "n/a"}}"#,
        )?;
        assert_eq!(offer.approval_days(), 0);
        assert_eq!(offer.payment_days(), 0);
        assert_eq!(offer.ecpl(), 0.0);
        Ok(())
    }

    #[test]
    fn test_numeric_fields_accepted() -> Result<(), serde_json::Error> {
        let offer: ExternalOffer = serde_json::from_str(
            r#"{"id": 9, "approval_time": 10, "payment_time": 20, "stat": {"ecpl": 2.25}}"#,
        )?;
        assert_eq!(offer.external_id(), Some(9));
        assert_eq!(offer.approval_days(), 10);
        assert_eq!(offer.payment_days(), 20);
        assert_eq!(offer.ecpl(), 2.25);
        Ok(())
    }

    #[test]
    fn test_non_numeric_id_is_rejected() -> Result<(), serde_json::Error> {
        let offer: ExternalOffer = serde_json::from_str(r#"{"id": "abc"}"#)?;
        assert_eq!(offer.external_id(), None);
        Ok(())
    }

    #[test]
    fn test_nan_ecpl_is_zero() -> Result<(), serde_json::Error> {
        let offer: ExternalOffer = serde_json::from_str(r#"{"id": "1", "stat": {"ecpl": "NaN"}}"#)?;
        assert_eq!(offer.ecpl(), 0.0);
        Ok(())
    }

    #[test]
    fn test_null_lists_are_empty() -> Result<(), serde_json::Error> {
        let page: FeedPage = serde_json::from_str(r#"{"offers": null}"#)?;
        assert!(page.offers.is_empty());
        let offer: ExternalOffer = serde_json::from_str(r#"{"id": "5", "geo": null}"#)?;
        assert!(offer.candidates(5).is_empty());
        Ok(())
    }
}
