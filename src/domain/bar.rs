//! Price bar representation.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One period of price activity. Fields the classifier does not read are
/// left in the stored record and never copied here. Only the three prices are
/// required; the date and oscillators are taken as found and never make a bar
/// unreadable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Bar {
    #[serde(default)]
    pub date: Option<Value>,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(rename = "K", default, deserialize_with = "lenient_number")]
    pub k: Option<f64>,
    #[serde(rename = "D", default, deserialize_with = "lenient_number")]
    pub d: Option<f64>,
    #[serde(rename = "J", default, deserialize_with = "lenient_number")]
    pub j: Option<f64>,
}

/// Any non-numeric value reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Value::as_f64))
}

impl Bar {
    pub fn new(high: f64, low: f64, close: f64) -> Self {
        Self {
            date: None,
            high,
            low,
            close,
            k: None,
            d: None,
            j: None,
        }
    }

    /// Finite prices with high >= low.
    pub fn is_well_formed(&self) -> bool {
        [self.high, self.low, self.close].iter().all(|p| p.is_finite()) && self.high >= self.low
    }

    /// The date as display text, whether stored as a string or a number.
    pub fn date_label(&self) -> Option<String> {
        match self.date.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// The last three bars of a series, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct BarWindow {
    pub w1: Bar,
    pub w2: Bar,
    pub w3: Bar,
}

impl BarWindow {
    /// Trailing window of `series`, or `None` with fewer than three bars.
    pub fn trailing(series: &[Bar]) -> Option<Self> {
        match series {
            [.., w1, w2, w3] => Some(Self {
                w1: w1.clone(),
                w2: w2.clone(),
                w3: w3.clone(),
            }),
            _ => None,
        }
    }

    pub fn latest(&self) -> &Bar {
        &self.w3
    }
}
