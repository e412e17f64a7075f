//! The instrument store and read-only views over its records.
//!
//! The store keeps the parsed literal as an insertion-ordered map so that
//! fields the engine does not understand survive a write-back untouched and
//! serialization order equals the order read from the artifact.

use crate::domain::artifact;
use crate::domain::bar::{Bar, BarWindow};
use crate::domain::error::{MalformedInstrument, PendtagError};
use crate::domain::literal;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const NAME_KEY: &str = "name";
pub const SYMBOL_KEY: &str = "symbol";

/// Label written into summaries the reconciler had to create.
pub const AUTO_GENERATED_PATTERN: &str = "自动生成";
pub const NEUTRAL_OSCILLATOR: f64 = 50.0;

/// Where the series, summary and tag live inside an instrument record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Key of the contract record holding series and summary. Empty means
    /// they sit directly on the instrument record.
    pub contract: String,
    pub series: String,
    pub summary: String,
    pub tag: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            contract: "main".to_string(),
            series: "data".to_string(),
            summary: "latestKDJ".to_string(),
            tag: "custom_rule_2".to_string(),
        }
    }
}

impl StoreLayout {
    pub fn contract<'v>(&self, record: &'v Value) -> Option<&'v Map<String, Value>> {
        if self.contract.is_empty() {
            record.as_object()
        } else {
            record.get(&self.contract)?.as_object()
        }
    }

    pub fn contract_mut<'v>(&self, record: &'v mut Value) -> Option<&'v mut Map<String, Value>> {
        if self.contract.is_empty() {
            record.as_object_mut()
        } else {
            record.get_mut(&self.contract)?.as_object_mut()
        }
    }

    /// Same series, summary and tag keys under another contract record.
    pub fn for_contract(&self, contract: &str) -> StoreLayout {
        StoreLayout {
            contract: contract.to_string(),
            ..self.clone()
        }
    }
}

/// Mapping from instrument code to instrument record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Store {
    records: Map<String, Value>,
}

impl Store {
    pub fn from_value(value: Value) -> Result<Self, PendtagError> {
        match value {
            Value::Object(records) => Ok(Self { records }),
            other => Err(PendtagError::StoreShape {
                reason: format!("expected an object at top level, found {}", kind(&other)),
            }),
        }
    }

    /// Parse the literal text extracted from an artifact.
    pub fn parse(literal_text: &str) -> Result<Self, PendtagError> {
        Self::from_value(literal::parse(literal_text)?)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get<'a>(&'a self, code: &'a str, layout: &'a StoreLayout) -> Option<Instrument<'a>> {
        let record = self.records.get(code)?;
        Some(Instrument {
            code,
            record,
            layout,
        })
    }

    /// Instruments in stored order.
    pub fn instruments<'a>(
        &'a self,
        layout: &'a StoreLayout,
    ) -> impl Iterator<Item = Instrument<'a>> + 'a {
        self.records.iter().map(move |(code, record)| Instrument {
            code,
            record,
            layout,
        })
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.records.iter_mut()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.records
    }

    /// Pretty-printed literal for splicing back into the artifact.
    pub fn to_literal(&self) -> String {
        artifact::render(&Value::Object(self.records.clone()))
    }
}

/// Read-only view of one instrument record.
#[derive(Debug, Clone, Copy)]
pub struct Instrument<'a> {
    code: &'a str,
    record: &'a Value,
    layout: &'a StoreLayout,
}

impl<'a> Instrument<'a> {
    pub fn new(code: &'a str, record: &'a Value, layout: &'a StoreLayout) -> Self {
        Self {
            code,
            record,
            layout,
        }
    }

    pub fn code(&self) -> &'a str {
        self.code
    }

    /// Display name if the record carries one.
    pub fn name(&self) -> Option<&'a str> {
        self.record.get(NAME_KEY)?.as_str()
    }

    pub fn symbol(&self) -> Option<&'a str> {
        self.layout.contract(self.record)?.get(SYMBOL_KEY)?.as_str()
    }

    /// Derived summary record, when present and an object.
    pub fn summary(&self) -> Option<&'a Map<String, Value>> {
        self.layout
            .contract(self.record)?
            .get(&self.layout.summary)?
            .as_object()
    }

    /// Current tag value, when it is a string.
    pub fn tag(&self) -> Option<&'a str> {
        self.summary()?.get(&self.layout.tag)?.as_str()
    }

    fn malformed(&self, reason: impl Into<String>) -> MalformedInstrument {
        MalformedInstrument {
            code: self.code.to_string(),
            reason: reason.into(),
        }
    }

    fn series(&self) -> Result<&'a Vec<Value>, MalformedInstrument> {
        let contract = self.layout.contract(self.record).ok_or_else(|| {
            if self.layout.contract.is_empty() {
                self.malformed("record is not an object")
            } else {
                self.malformed(format!("missing '{}' record", self.layout.contract))
            }
        })?;
        contract
            .get(&self.layout.series)
            .ok_or_else(|| self.malformed(format!("missing '{}' series", self.layout.series)))?
            .as_array()
            .ok_or_else(|| self.malformed(format!("'{}' is not an array", self.layout.series)))
    }

    pub fn bar_count(&self) -> usize {
        self.series().map(Vec::len).unwrap_or(0)
    }

    /// The last three bars, `Ok(None)` when the series is shorter than that.
    pub fn trailing_window(&self) -> Result<Option<BarWindow>, MalformedInstrument> {
        let series = self.series()?;
        if series.len() < 3 {
            return Ok(None);
        }
        let offset = series.len() - 3;
        let mut bars = Vec::with_capacity(3);
        for (i, value) in series[offset..].iter().enumerate() {
            let bar = Bar::deserialize(value)
                .map_err(|e| self.malformed(format!("bar {}: {}", offset + i, e)))?;
            if !bar.is_well_formed() {
                let reason = format!("bar {}: high below low or not finite", offset + i);
                return Err(self.malformed(reason));
            }
            bars.push(bar);
        }
        Ok(BarWindow::trailing(&bars))
    }

    /// K and D from the summary, falling back to the newest bar.
    pub fn oscillators(&self, window: &BarWindow) -> Option<(f64, f64)> {
        let from_summary = self.summary().and_then(|s| {
            let k = s.get("K")?.as_f64()?;
            let d = s.get("D")?.as_f64()?;
            Some((k, d))
        });
        from_summary.or_else(|| Some((window.latest().k?, window.latest().d?)))
    }
}

/// Summary record created for an instrument that has none yet.
pub fn auto_summary(latest: &Bar) -> Map<String, Value> {
    let mut summary = Map::new();
    for (key, value) in [("K", latest.k), ("D", latest.d), ("J", latest.j)] {
        summary.insert(key.to_string(), number(value.unwrap_or(NEUTRAL_OSCILLATOR)));
    }
    summary.insert(
        "pattern".to_string(),
        Value::String(AUTO_GENERATED_PATTERN.to_string()),
    );
    summary
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(value: Value) -> Store {
        Store::from_value(value).unwrap()
    }

    fn bar(high: f64, low: f64, close: f64) -> Value {
        json!({"high": high, "low": low, "close": close})
    }

    #[test]
    fn top_level_must_be_object() {
        let err = Store::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, PendtagError::StoreShape { reason } if reason.contains("an array")));
    }

    #[test]
    fn parse_propagates_literal_errors() {
        let err = Store::parse("{a: }").unwrap_err();
        assert!(matches!(err, PendtagError::LiteralParse(_)));
    }

    #[test]
    fn instruments_iterate_in_stored_order() {
        let layout = StoreLayout::default();
        let s = Store::parse("{Z: {}, A: {}, M: {}}").unwrap();
        let codes: Vec<_> = s.instruments(&layout).map(|i| i.code()).collect();
        assert_eq!(codes, vec!["Z", "A", "M"]);
    }

    #[test]
    fn reads_name_symbol_summary_and_tag() {
        let layout = StoreLayout::default();
        let s = store(json!({
            "PK": {
                "name": "花生",
                "main": {
                    "symbol": "PK2605",
                    "latestKDJ": {"K": 45.2, "D": 42.8, "custom_rule_2": "pending_long"},
                    "data": []
                }
            }
        }));
        let pk = s.get("PK", &layout).unwrap();
        assert_eq!(pk.name(), Some("花生"));
        assert_eq!(pk.symbol(), Some("PK2605"));
        assert_eq!(pk.tag(), Some("pending_long"));
        assert_eq!(pk.bar_count(), 0);
    }

    #[test]
    fn sub_contract_view_reads_its_own_record() {
        let main = StoreLayout::default();
        let sub = main.for_contract("sub");
        assert_eq!(sub.summary, main.summary);
        let s = store(json!({"PK": {
            "main": {"symbol": "PK2605", "data": []},
            "sub": {"symbol": "PK2609", "latestKDJ": {"custom_rule_2": "pending_short"}, "data": []}
        }}));
        assert_eq!(s.get("PK", &sub).unwrap().symbol(), Some("PK2609"));
        assert_eq!(s.get("PK", &sub).unwrap().tag(), Some("pending_short"));
        assert_eq!(s.get("PK", &main).unwrap().tag(), None);
    }

    #[test]
    fn trailing_window_skips_short_series() {
        let layout = StoreLayout::default();
        let s = store(json!({"A": {"main": {"data": [bar(2.0, 1.0, 1.5), bar(3.0, 1.0, 2.0)]}}}));
        assert_eq!(s.get("A", &layout).unwrap().trailing_window().unwrap(), None);
    }

    #[test]
    fn trailing_window_reads_only_last_three_bars() {
        let layout = StoreLayout::default();
        let s = store(json!({"A": {"main": {"data": [
            {"broken": true},
            bar(100.0, 90.0, 95.0),
            bar(110.0, 95.0, 108.0),
            bar(108.0, 100.0, 105.0)
        ]}}}));
        let window = s.get("A", &layout).unwrap().trailing_window().unwrap().unwrap();
        assert_eq!(window.w1.high, 100.0);
        assert_eq!(window.w3.close, 105.0);
    }

    #[test]
    fn missing_contract_is_malformed() {
        let layout = StoreLayout::default();
        let s = store(json!({"A": {"name": "x"}}));
        let err = s.get("A", &layout).unwrap().trailing_window().unwrap_err();
        assert_eq!(err.code, "A");
        assert!(err.reason.contains("'main'"));
    }

    #[test]
    fn non_array_series_is_malformed() {
        let layout = StoreLayout::default();
        let s = store(json!({"A": {"main": {"data": "oops"}}}));
        let err = s.get("A", &layout).unwrap().trailing_window().unwrap_err();
        assert!(err.reason.contains("not an array"));
    }

    #[test]
    fn inverted_bar_is_malformed() {
        let layout = StoreLayout::default();
        let s = store(json!({"A": {"main": {"data": [
            bar(2.0, 1.0, 1.5), bar(2.0, 1.0, 1.5), bar(1.0, 2.0, 1.5)
        ]}}}));
        let err = s.get("A", &layout).unwrap().trailing_window().unwrap_err();
        assert!(err.reason.contains("bar 2"));
    }

    #[test]
    fn flat_layout_reads_series_from_record() {
        let layout = StoreLayout {
            contract: String::new(),
            series: "series".into(),
            summary: "derivedSummary".into(),
            tag: "tag".into(),
        };
        let series = vec![bar(1.0, 0.0, 0.5); 3];
        let s = store(json!({"A": {"series": series, "derivedSummary": {"tag": "x"}}}));
        let a = s.get("A", &layout).unwrap();
        assert!(a.trailing_window().unwrap().is_some());
        assert_eq!(a.tag(), Some("x"));
    }

    #[test]
    fn oscillators_prefer_summary_then_latest_bar() {
        let layout = StoreLayout::default();
        let mut latest = Bar::new(3.0, 1.0, 2.0);
        latest.k = Some(70.0);
        latest.d = Some(60.0);
        let window = BarWindow {
            w1: Bar::new(1.0, 0.0, 0.5),
            w2: Bar::new(2.0, 0.0, 1.0),
            w3: latest,
        };
        let with_summary = store(json!({"A": {"main": {"latestKDJ": {"K": 10, "D": 20}}}}));
        assert_eq!(
            with_summary.get("A", &layout).unwrap().oscillators(&window),
            Some((10.0, 20.0))
        );
        let without = store(json!({"A": {"main": {}}}));
        assert_eq!(
            without.get("A", &layout).unwrap().oscillators(&window),
            Some((70.0, 60.0))
        );
    }

    #[test]
    fn auto_summary_uses_latest_bar_or_neutral_default() {
        let mut latest = Bar::new(3.0, 1.0, 2.0);
        latest.k = Some(12.5);
        let summary = auto_summary(&latest);
        assert_eq!(summary["K"], json!(12.5));
        assert_eq!(summary["D"], json!(50.0));
        assert_eq!(summary["J"], json!(50.0));
        assert_eq!(summary["pattern"], json!(AUTO_GENERATED_PATTERN));
        let keys: Vec<_> = summary.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["K", "D", "J", "pattern"]);
    }

    #[test]
    fn to_literal_round_trips() {
        let s = Store::parse("{A: {name: 'x', main: {data: [1, 2.5]}}}").unwrap();
        let reparsed = Store::parse(&s.to_literal()).unwrap();
        assert_eq!(s, reparsed);
    }
}
