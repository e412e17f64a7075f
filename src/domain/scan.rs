//! Read-only scan over the store.
//!
//! Runs the classifier over every contract record of every instrument and
//! buckets the results. Each entry remembers the contract it came from; only
//! entries from the tagged contract count as tag candidates. Nothing here
//! mutates the store.

use crate::domain::bar::BarWindow;
use crate::domain::classifier::{self, PendingSide};
use crate::domain::lookup::LookupTable;
use crate::domain::store::{Instrument, Store, StoreLayout};

pub const DEFAULT_SCAN_CONTRACTS: [&str; 2] = ["main", "sub"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Pending long additionally needs K > D, pending short K < D.
    pub require_kdj_cross: bool,
    /// Contract records examined per instrument, in report order. Ignored
    /// for a flat layout.
    pub contracts: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            require_kdj_cross: false,
            contracts: DEFAULT_SCAN_CONTRACTS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A pending setup that has not broken out yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub code: String,
    pub name: String,
    /// Contract key the setup was found under, empty for a flat layout.
    pub contract: String,
    /// Whether `contract` is the one the reconciler tags.
    pub primary: bool,
    pub symbol: String,
    pub date: Option<String>,
    pub w1_high: f64,
    pub w1_low: f64,
    /// `w2.high` for long setups, `w2.low` for short ones.
    pub boundary: f64,
    pub close: f64,
    pub distance_pct: f64,
    /// `w3.low` for long setups, `w3.high` for short ones.
    pub stop: f64,
}

impl PendingEntry {
    /// Points between the breakout level and the stop.
    pub fn risk_points(&self) -> f64 {
        (self.boundary - self.stop).abs()
    }

    /// Risk points as a percentage of the close.
    pub fn risk_pct(&self) -> f64 {
        self.risk_points() / self.close * 100.0
    }
}

/// A setup that has already broken out or down.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEntry {
    pub code: String,
    pub name: String,
    pub contract: String,
    pub symbol: String,
    pub close: f64,
    /// Breakout (`w2.high`) or breakdown (`w2.low`) level.
    pub level: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanReport {
    pub pending_long: Vec<PendingEntry>,
    pub pending_short: Vec<PendingEntry>,
    pub active_long: Vec<ActiveEntry>,
    pub active_short: Vec<ActiveEntry>,
    /// Contract records with a classifiable window.
    pub classified: usize,
    /// Contract records skipped for short or malformed series.
    pub skipped: usize,
    /// Pending setups dropped by the K/D filter.
    pub filtered: usize,
}

impl ScanReport {
    pub fn pending(&self, side: PendingSide) -> &[PendingEntry] {
        match side {
            PendingSide::Long => &self.pending_long,
            PendingSide::Short => &self.pending_short,
        }
    }

    /// `name(code)` labels of the tag candidates in one pending bucket.
    pub fn pending_labels(&self, side: PendingSide) -> Vec<String> {
        self.pending(side)
            .iter()
            .filter(|e| e.primary)
            .map(|e| format!("{}({})", e.name, e.code))
            .collect()
    }
}

struct Labels {
    code: String,
    name: String,
    contract: String,
    symbol: String,
}

fn labels(instrument: &Instrument<'_>, contract: &str, lookup: Option<&LookupTable>) -> Labels {
    let code = instrument.code();
    let name = instrument
        .name()
        .or_else(|| lookup.and_then(|t| t.name_of(code)))
        .unwrap_or(code);
    Labels {
        code: code.to_string(),
        name: name.to_string(),
        contract: contract.to_string(),
        symbol: instrument.symbol().unwrap_or("N/A").to_string(),
    }
}

fn cross_confirms(instrument: &Instrument<'_>, window: &BarWindow, side: PendingSide) -> bool {
    match instrument.oscillators(window) {
        Some((k, d)) => match side {
            PendingSide::Long => k > d,
            PendingSide::Short => k < d,
        },
        None => false,
    }
}

/// One layout per contract key the scan should look at.
fn contract_layouts(layout: &StoreLayout, options: &ScanOptions) -> Vec<StoreLayout> {
    if layout.contract.is_empty() {
        return vec![layout.clone()];
    }
    options
        .contracts
        .iter()
        .map(|key| layout.for_contract(key))
        .collect()
}

pub fn scan(
    store: &Store,
    layout: &StoreLayout,
    options: &ScanOptions,
    lookup: Option<&LookupTable>,
) -> ScanReport {
    let mut report = ScanReport::default();
    let views = contract_layouts(layout, options);

    for (code, record) in store.as_map() {
        for view in &views {
            // only the tagged contract is expected on every record
            if view.contract != layout.contract && record.get(&view.contract).is_none() {
                continue;
            }
            let instrument = Instrument::new(code, record, view);
            scan_contract(&mut report, &instrument, view, layout, options, lookup);
        }
    }

    tracing::info!(
        classified = report.classified,
        skipped = report.skipped,
        pending_long = report.pending_long.len(),
        pending_short = report.pending_short.len(),
        "scan complete"
    );
    report
}

fn scan_contract(
    report: &mut ScanReport,
    instrument: &Instrument<'_>,
    view: &StoreLayout,
    layout: &StoreLayout,
    options: &ScanOptions,
    lookup: Option<&LookupTable>,
) {
    let window = match instrument.trailing_window() {
        Ok(Some(window)) => window,
        Ok(None) => {
            report.skipped += 1;
            return;
        }
        Err(e) => {
            tracing::debug!(error = %e, contract = %view.contract, "skipping instrument");
            report.skipped += 1;
            return;
        }
    };
    report.classified += 1;

    let c = classifier::classify(&window);
    let BarWindow { w1, w2, w3 } = &window;
    let primary = view.contract == layout.contract;

    for side in [PendingSide::Long, PendingSide::Short] {
        let pending = match side {
            PendingSide::Long => c.pending_long(),
            PendingSide::Short => c.pending_short(),
        };
        if !pending {
            continue;
        }
        if options.require_kdj_cross && !cross_confirms(instrument, &window, side) {
            report.filtered += 1;
            continue;
        }
        let l = labels(instrument, &view.contract, lookup);
        let (boundary, distance_pct, stop) = match side {
            PendingSide::Long => (w2.high, classifier::long_distance_pct(&window), w3.low),
            PendingSide::Short => (w2.low, classifier::short_distance_pct(&window), w3.high),
        };
        let entry = PendingEntry {
            code: l.code,
            name: l.name,
            contract: l.contract,
            primary,
            symbol: l.symbol,
            date: w3.date_label(),
            w1_high: w1.high,
            w1_low: w1.low,
            boundary,
            close: w3.close,
            distance_pct,
            stop,
        };
        match side {
            PendingSide::Long => report.pending_long.push(entry),
            PendingSide::Short => report.pending_short.push(entry),
        }
    }

    if c.active_long() {
        let l = labels(instrument, &view.contract, lookup);
        report.active_long.push(ActiveEntry {
            code: l.code,
            name: l.name,
            contract: l.contract,
            symbol: l.symbol,
            close: w3.close,
            level: w2.high,
        });
    }
    if c.active_short() {
        let l = labels(instrument, &view.contract, lookup);
        report.active_short.push(ActiveEntry {
            code: l.code,
            name: l.name,
            contract: l.contract,
            symbol: l.symbol,
            close: w3.close,
            level: w2.low,
        });
    }
}
