//! Date-range and amount-range filters built from query parameters.
//!
//! The builders are pure: they either return a predicate for the persistence
//! layer or a [`FilterError`] that handlers turn into a 400 response.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::validate::{parse_date, parse_number};

/// Raw filter parameters as they arrive in the query string.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FilterParams {
    pub from: Option<String>,
    #[serde(rename = "upTo")]
    pub up_to: Option<String>,
    pub date: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
}

/// Inclusive bounds. Absent bounds are omitted when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range<T> {
    #[serde(rename = "$gte", skip_serializing_if = "Option::is_none")]
    pub gte: Option<T>,
    #[serde(rename = "$lte", skip_serializing_if = "Option::is_none")]
    pub lte: Option<T>,
}

/// `{ date: { $gte?, $lte? } }` or `{}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DateFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Range<DateTime<Utc>>>,
}

/// `{ amount: { $gte?, $lte? } }` or `{}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AmountFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Range<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterError {
    /// `date` was given together with `from` or `upTo`.
    DateWithRange,
    InvalidDate { param: &'static str, reason: String },
    InvalidAmount { param: &'static str, reason: String },
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::DateWithRange => write!(f, "cannot combine date with from/upTo"),
            FilterError::InvalidDate { param, reason } => {
                write!(f, "invalid {} parameter: {}", param, reason)
            }
            FilterError::InvalidAmount { param, reason } => {
                write!(f, "invalid {} parameter, expected a number: {}", param, reason)
            }
        }
    }
}

impl std::error::Error for FilterError {}

/// Build the date predicate from `from`, `upTo` and `date`.
///
/// `date` selects a single day and cannot be mixed with the other two.
/// Lower bounds start at 00:00:00.000 UTC, upper bounds end at 23:59:59.999 UTC.
pub fn handle_date_filter_params(params: &FilterParams) -> Result<DateFilter, FilterError> {
    if params.from.is_none() && params.up_to.is_none() && params.date.is_none() {
        return Ok(DateFilter::default());
    }
    if params.date.is_some() && (params.from.is_some() || params.up_to.is_some()) {
        return Err(FilterError::DateWithRange);
    }

    let from = date_param("from", params.from.as_deref())?;
    let up_to = date_param("upTo", params.up_to.as_deref())?;
    let (from, up_to) = match date_param("date", params.date.as_deref())? {
        Some(day) => (Some(day), Some(day)),
        None => (from, up_to),
    };

    Ok(DateFilter {
        date: Some(Range {
            gte: from.map(start_of_day),
            lte: up_to.map(end_of_day),
        }),
    })
}

/// Build the amount predicate from `min` and `max`.
pub fn handle_amount_filter_params(params: &FilterParams) -> Result<AmountFilter, FilterError> {
    if params.min.is_none() && params.max.is_none() {
        return Ok(AmountFilter::default());
    }

    Ok(AmountFilter {
        amount: Some(Range {
            gte: amount_param("min", params.min.as_deref())?,
            lte: amount_param("max", params.max.as_deref())?,
        }),
    })
}

fn date_param(param: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, FilterError> {
    raw.map(|raw| parse_date(raw).map_err(|reason| FilterError::InvalidDate { param, reason }))
        .transpose()
}

fn amount_param(param: &'static str, raw: Option<&str>) -> Result<Option<f64>, FilterError> {
    raw.map(|raw| parse_number(raw).map_err(|reason| FilterError::InvalidAmount { param, reason }))
        .transpose()
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    start_of_day(day) + TimeDelta::days(1) - TimeDelta::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let mut params = FilterParams::default();
        for (key, value) in pairs {
            let value = Some(value.to_string());
            match *key {
                "from" => params.from = value,
                "upTo" => params.up_to = value,
                "date" => params.date = value,
                "min" => params.min = value,
                "max" => params.max = value,
                _ => panic!("unexpected key {}", key),
            }
        }
        params
    }

    fn utc(raw: &str) -> DateTime<Utc> {
        raw.parse().unwrap()
    }

    #[test]
    fn test_no_date_params_is_empty() {
        let filter = handle_date_filter_params(&FilterParams::default()).unwrap();
        assert_eq!(filter, DateFilter::default());
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({}));
    }

    #[test]
    fn test_single_day() {
        let filter = handle_date_filter_params(&params(&[("date", "2023-05-10")])).unwrap();
        let range = filter.date.unwrap();
        assert_eq!(range.gte, Some(utc("2023-05-10T00:00:00.000Z")));
        assert_eq!(range.lte, Some(utc("2023-05-10T23:59:59.999Z")));
    }

    #[test]
    fn test_from_only() {
        let filter = handle_date_filter_params(&params(&[("from", "2023-04-30")])).unwrap();
        let range = filter.date.unwrap();
        assert_eq!(range.gte, Some(utc("2023-04-30T00:00:00.000Z")));
        assert_eq!(range.lte, None);

        let value = serde_json::to_value(&filter).unwrap();
        assert!(value["date"].get("$gte").is_some());
        assert!(value["date"].get("$lte").is_none());
    }

    #[test]
    fn test_from_and_up_to() {
        let filter = handle_date_filter_params(&params(&[
            ("from", "2023-04-30"),
            ("upTo", "2023-05-02"),
        ]))
        .unwrap();
        let range = filter.date.unwrap();
        assert_eq!(range.gte, Some(utc("2023-04-30T00:00:00.000Z")));
        assert_eq!(range.lte, Some(utc("2023-05-02T23:59:59.999Z")));
    }

    #[test]
    fn test_date_with_range_fails() {
        let err = handle_date_filter_params(&params(&[("date", "2023-05-10"), ("from", "2023-05-01")]))
            .unwrap_err();
        assert_eq!(err, FilterError::DateWithRange);
        assert_eq!(err.to_string(), "cannot combine date with from/upTo");

        let err = handle_date_filter_params(&params(&[("date", "2023-05-10"), ("upTo", "2023-05-11")]))
            .unwrap_err();
        assert_eq!(err, FilterError::DateWithRange);
    }

    #[test]
    fn test_bad_date_format_names_param() {
        let err = handle_date_filter_params(&params(&[("upTo", "10-05-2023")])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidDate { param: "upTo", .. }));
        assert!(err.to_string().contains("upTo"));

        let err = handle_date_filter_params(&params(&[("date", "")])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidDate { param: "date", .. }));
    }

    #[test]
    fn test_no_amount_params_is_empty() {
        let filter = handle_amount_filter_params(&FilterParams::default()).unwrap();
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({}));
    }

    #[test]
    fn test_amount_bounds() {
        let filter = handle_amount_filter_params(&params(&[("min", "10")])).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({ "amount": { "$gte": 10.0 } })
        );

        let filter = handle_amount_filter_params(&params(&[("min", "10"), ("max", "50")])).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({ "amount": { "$gte": 10.0, "$lte": 50.0 } })
        );

        let filter = handle_amount_filter_params(&params(&[("max", "12.75")])).unwrap();
        assert_eq!(filter.amount.unwrap().lte, Some(12.75));
    }

    #[test]
    fn test_non_numeric_amount_fails() {
        let err = handle_amount_filter_params(&params(&[("min", "ten")])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidAmount { param: "min", .. }));

        let err = handle_amount_filter_params(&params(&[("min", "1"), ("max", "lots")])).unwrap_err();
        assert!(matches!(err, FilterError::InvalidAmount { param: "max", .. }));
    }
}
