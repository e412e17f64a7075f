//! Listing of the pending tags currently persisted in a store.

use crate::domain::classifier::PendingSide;
use crate::domain::store::{Store, StoreLayout};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedInstrument {
    pub code: String,
    pub name: String,
}

impl TaggedInstrument {
    pub fn label(&self) -> String {
        format!("{}({})", self.name, self.code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagListing {
    pub long: Vec<TaggedInstrument>,
    pub short: Vec<TaggedInstrument>,
}

impl TagListing {
    pub fn side(&self, side: PendingSide) -> &[TaggedInstrument] {
        match side {
            PendingSide::Long => &self.long,
            PendingSide::Short => &self.short,
        }
    }
}

/// Instruments whose tag field holds a pending value, in store order.
pub fn tagged(store: &Store, layout: &StoreLayout) -> TagListing {
    let mut listing = TagListing::default();
    for instrument in store.instruments(layout) {
        let Some(side) = instrument.tag().and_then(PendingSide::from_tag) else {
            continue;
        };
        let entry = TaggedInstrument {
            code: instrument.code().to_string(),
            name: instrument.name().unwrap_or(instrument.code()).to_string(),
        };
        match side {
            PendingSide::Long => listing.long.push(entry),
            PendingSide::Short => listing.short.push(entry),
        }
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lists_pending_tags_only() {
        let store = Store::from_value(json!({
            "C": {"name": "玉米", "main": {"latestKDJ": {"custom_rule_2": "pending_long"}}},
            "OI": {"name": "菜油", "main": {"latestKDJ": {"custom_rule_2": "first_breakout"}}},
            "RB": {"main": {"latestKDJ": {"custom_rule_2": "pending_short"}}},
            "PK": {"name": "花生", "main": {"latestKDJ": {"custom_rule_2": "pending_long"}}},
            "X": {"name": "none"}
        }))
        .unwrap();
        let listing = tagged(&store, &StoreLayout::default());
        let labels: Vec<_> = listing.long.iter().map(TaggedInstrument::label).collect();
        assert_eq!(labels, vec!["玉米(C)", "花生(PK)"]);
        assert_eq!(listing.side(PendingSide::Short)[0].label(), "RB(RB)");
    }
}
