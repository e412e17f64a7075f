//! Applies classifier output to each instrument's tag field.
//!
//! The reconciler owns only the `pending_long`/`pending_short` values of the
//! tag field. Any other value is left alone, and a stale pending tag is
//! removed by deleting the key so an absent tag stays distinguishable from an
//! empty one. Running it twice on an unchanged store changes nothing the
//! second time.

use crate::domain::bar::BarWindow;
use crate::domain::classifier::{self, PendingSide};
use crate::domain::store::{Instrument, Store, StoreLayout, auto_summary};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    /// Tag set to the side's value; `changed` is false when it already held it.
    Tagged { side: PendingSide, changed: bool },
    /// A stale pending tag was removed.
    Cleared { previous: PendingSide },
    /// Classified, no pending pattern and no pending tag to remove.
    Unchanged,
    /// Fewer than three bars or a malformed series.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentOutcome {
    pub code: String,
    pub name: String,
    pub outcome: TagOutcome,
}

impl InstrumentOutcome {
    /// `name(code)[L]` style label.
    pub fn label(&self) -> String {
        match self.outcome {
            TagOutcome::Tagged { side, .. } => {
                format!("{}({})[{}]", self.name, self.code, side.marker())
            }
            _ => format!("{}({})", self.name, self.code),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileSummary {
    pub outcomes: Vec<InstrumentOutcome>,
    /// Summaries the reconciler had to create.
    pub summaries_created: usize,
}

impl ReconcileSummary {
    fn count(&self, pred: impl Fn(&TagOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }

    pub fn tagged(&self, side: PendingSide) -> usize {
        self.count(|o| matches!(o, TagOutcome::Tagged { side: s, .. } if *s == side))
    }

    pub fn newly_tagged(&self, side: PendingSide) -> usize {
        self.count(|o| matches!(o, TagOutcome::Tagged { side: s, changed: true } if *s == side))
    }

    pub fn cleared(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::Cleared { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TagOutcome::Skipped))
    }

    /// Whether the store differs from what was loaded.
    pub fn changed(&self) -> bool {
        self.summaries_created > 0
            || self.outcomes.iter().any(|o| {
                matches!(
                    o.outcome,
                    TagOutcome::Tagged { changed: true, .. } | TagOutcome::Cleared { .. }
                )
            })
    }

    /// Labels of every instrument carrying a pending tag after the run.
    pub fn affected(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, TagOutcome::Tagged { .. }))
            .map(InstrumentOutcome::label)
            .collect()
    }

    pub fn cleared_labels(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, TagOutcome::Cleared { .. }))
            .map(InstrumentOutcome::label)
            .collect()
    }
}

/// Reconcile every instrument in store order.
pub fn reconcile(store: &mut Store, layout: &StoreLayout) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    for (code, record) in store.records_mut() {
        let instrument = Instrument::new(code, record, layout);
        let name = instrument.name().unwrap_or(code).to_string();
        let window = match instrument.trailing_window() {
            Ok(Some(window)) => Some(window),
            Ok(None) => {
                let bars = instrument.bar_count();
                tracing::debug!(code = %code, bars, "too few bars, skipping");
                None
            }
            Err(e) => {
                tracing::debug!(code = %code, error = %e, "skipping instrument");
                None
            }
        };

        let outcome = match window {
            Some(window) => apply(record, layout, &window, &mut summary.summaries_created),
            None => TagOutcome::Skipped,
        };
        if outcome != TagOutcome::Skipped {
            tracing::trace!(code = %code, ?outcome, "reconciled");
        }
        summary.outcomes.push(InstrumentOutcome {
            code: code.clone(),
            name,
            outcome,
        });
    }

    summary
}

fn apply(
    record: &mut Value,
    layout: &StoreLayout,
    window: &BarWindow,
    summaries_created: &mut usize,
) -> TagOutcome {
    let Some(contract) = layout.contract_mut(record) else {
        return TagOutcome::Skipped;
    };

    let present = contract
        .get(&layout.summary)
        .is_some_and(|s| !s.is_null());
    if !present {
        contract.insert(
            layout.summary.clone(),
            Value::Object(auto_summary(window.latest())),
        );
        *summaries_created += 1;
    }
    let Some(derived) = contract.get_mut(&layout.summary).and_then(Value::as_object_mut) else {
        tracing::debug!(summary = %layout.summary, "summary is not an object, skipping");
        return TagOutcome::Skipped;
    };

    let current = derived
        .get(&layout.tag)
        .and_then(Value::as_str)
        .and_then(PendingSide::from_tag);

    match classifier::classify(window).pending_tag() {
        Some(side) => {
            let changed = current != Some(side);
            if changed {
                derived.insert(layout.tag.clone(), Value::String(side.tag().to_string()));
            }
            TagOutcome::Tagged { side, changed }
        }
        None => match current {
            Some(previous) => {
                derived.shift_remove(&layout.tag);
                TagOutcome::Cleared { previous }
            }
            None => TagOutcome::Unchanged,
        },
    }
}
