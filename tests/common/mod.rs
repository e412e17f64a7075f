#![allow(dead_code)]

use chrono::NaiveDate;
use pendtag::domain::error::PendtagError;
use pendtag::ports::artifact_port::ArtifactPort;
use std::cell::RefCell;

/// In-memory artifact that records every write.
pub struct MockArtifactPort {
    pub content: String,
    pub writes: RefCell<Vec<String>>,
    pub fail_writes: bool,
}

impl MockArtifactPort {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            writes: RefCell::new(Vec::new()),
            fail_writes: false,
        }
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.borrow().len()
    }

    pub fn last_write(&self) -> Option<String> {
        self.writes.borrow().last().cloned()
    }
}

impl ArtifactPort for MockArtifactPort {
    fn read(&self) -> Result<String, PendtagError> {
        Ok(self.content.clone())
    }

    fn write(&self, content: &str) -> Result<(), PendtagError> {
        if self.fail_writes {
            return Err(PendtagError::WriteFailure {
                path: self.location(),
                reason: "disk full".to_string(),
            });
        }
        self.writes.borrow_mut().push(content.to_string());
        Ok(())
    }

    fn location(&self) -> String {
        "memory://futures_data.js".to_string()
    }
}

/// (high, low, close)
pub type Hlc = (f64, f64, f64);

pub const PENDING_LONG: [Hlc; 3] = [
    (100.0, 90.0, 95.0),
    (110.0, 95.0, 108.0),
    (108.0, 100.0, 105.0),
];
pub const ACTIVE_LONG: [Hlc; 3] = [
    (100.0, 90.0, 95.0),
    (110.0, 95.0, 108.0),
    (113.0, 104.0, 112.0),
];
pub const PENDING_SHORT: [Hlc; 3] = [
    (100.0, 90.0, 95.0),
    (98.0, 80.0, 82.0),
    (90.0, 82.0, 85.0),
];
pub const ACTIVE_SHORT: [Hlc; 3] = [
    (100.0, 90.0, 95.0),
    (98.0, 80.0, 82.0),
    (84.0, 76.0, 78.0),
];
pub const NO_PATTERN: [Hlc; 3] = [
    (100.0, 90.0, 95.0),
    (99.0, 91.0, 96.0),
    (98.0, 92.0, 97.0),
];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Daily bars as JS object literals, dated consecutively from `start`.
pub fn bars_literal(start: NaiveDate, bars: &[Hlc]) -> String {
    let items: Vec<String> = bars
        .iter()
        .enumerate()
        .map(|(i, (high, low, close))| {
            let day = start + chrono::Duration::days(i as i64);
            format!(
                "{{ date: '{}', open: {}, high: {}, low: {}, close: {}, volume: 1000 }}",
                day.format("%Y-%m-%d"),
                close,
                high,
                low,
                close
            )
        })
        .collect();
    format!("[{}]", items.join(", "))
}

/// One instrument record in the default layout. `tag` is written into the
/// summary when given; `summary` false omits the summary entirely.
pub fn instrument_literal(
    code: &str,
    name: &str,
    bars: &[Hlc],
    summary: bool,
    tag: Option<&str>,
) -> String {
    let series = bars_literal(date(2026, 2, 2), bars);
    let summary = match (summary, tag) {
        (false, _) => String::new(),
        (true, Some(tag)) => format!(
            ", latestKDJ: {{ K: 62.5, D: 55.1, J: 77.3, pattern: '金叉', custom_rule_2: '{}' }}",
            tag
        ),
        (true, None) => ", latestKDJ: { K: 62.5, D: 55.1, J: 77.3, pattern: '金叉' }".to_string(),
    };
    format!(
        "  '{code}': {{ name: '{name}', main: {{ symbol: '{code}2605', data: {series}{summary} }} }}"
    )
}

/// A complete artifact: preamble, the bound literal, and a trailer.
pub fn artifact_text(instruments: &[String]) -> String {
    format!(
        "// generated 2026-02-04\nconst FUTURES_DATA = {{\n{}\n}};\n\nif (typeof module !== 'undefined') {{ module.exports = FUTURES_DATA; }}\n",
        instruments.join(",\n")
    )
}

pub const ARTIFACT_PREAMBLE: &str = "// generated 2026-02-04\nconst FUTURES_DATA = ";
pub const ARTIFACT_TRAILER: &str =
    ";\n\nif (typeof module !== 'undefined') { module.exports = FUTURES_DATA; }\n";

/// Standard five-instrument store covering every pattern.
pub fn mixed_artifact() -> String {
    artifact_text(&[
        instrument_literal("PK", "花生", &PENDING_LONG, true, None),
        instrument_literal("RB", "螺纹钢", &ACTIVE_LONG, true, None),
        instrument_literal("C", "玉米", &NO_PATTERN, true, Some("pending_long")),
        instrument_literal("SR", "白糖", &PENDING_SHORT, false, None),
        instrument_literal("AG", "白银", &ACTIVE_SHORT, true, Some("pending_short")),
    ])
}
