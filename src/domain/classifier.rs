//! Three-bar breakout/pullback classifier.
//!
//! Given the last three bars `w1, w2, w3` (oldest first):
//!
//! - pending long: `w2` rallied above `w1`, `w3` closed above `w1.low` but not
//!   above `w2.high`, and `w3` made a lower high than `w2`.
//! - active long: `w2` rallied above `w1` and `w3` closed above `w2.high`.
//! - pending/active short mirror the long side on the lows.
//!
//! Both pending setups hold at once when `w2` is an outside bar (higher high
//! and lower low than `w1`) and `w3` stays inside both ranges. Such a window
//! is listed on both sides by a scan but tagged long.
//!
//! Only the pending outcomes are ever persisted as a tag.

use crate::domain::bar::BarWindow;
use std::fmt;

pub const PENDING_LONG_TAG: &str = "pending_long";
pub const PENDING_SHORT_TAG: &str = "pending_short";

/// Direction of a persisted pending tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingSide {
    Long,
    Short,
}

impl PendingSide {
    pub fn tag(self) -> &'static str {
        match self {
            PendingSide::Long => PENDING_LONG_TAG,
            PendingSide::Short => PENDING_SHORT_TAG,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            PENDING_LONG_TAG => Some(PendingSide::Long),
            PENDING_SHORT_TAG => Some(PendingSide::Short),
            _ => None,
        }
    }

    /// Single-letter marker used in summaries.
    pub fn marker(self) -> char {
        match self {
            PendingSide::Long => 'L',
            PendingSide::Short => 'S',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pattern {
    PendingLong,
    PendingShort,
    ActiveLong,
    ActiveShort,
    None,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Pattern::PendingLong => "pending-long",
            Pattern::PendingShort => "pending-short",
            Pattern::ActiveLong => "active-long",
            Pattern::ActiveShort => "active-short",
            Pattern::None => "none",
        };
        f.write_str(s)
    }
}

/// Every predicate evaluated over one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Classification {
    pub rally: bool,
    pub support_hold: bool,
    pub not_broken_out: bool,
    pub real_pullback: bool,
    pub broke_out: bool,
    pub drop: bool,
    pub resistance_hold: bool,
    pub not_broken_down: bool,
    pub real_bounce: bool,
    pub broke_down: bool,
}

impl Classification {
    pub fn pending_long(&self) -> bool {
        self.rally && self.support_hold && self.not_broken_out && self.real_pullback
    }

    pub fn pending_short(&self) -> bool {
        self.drop && self.resistance_hold && self.not_broken_down && self.real_bounce
    }

    pub fn active_long(&self) -> bool {
        self.rally && self.broke_out
    }

    pub fn active_short(&self) -> bool {
        self.drop && self.broke_down
    }

    /// The tag to persist. Long wins when both pending flags hold.
    pub fn pending_tag(&self) -> Option<PendingSide> {
        if self.pending_long() {
            Some(PendingSide::Long)
        } else if self.pending_short() {
            Some(PendingSide::Short)
        } else {
            None
        }
    }

    /// Single headline pattern, pending before active, long before short.
    pub fn pattern(&self) -> Pattern {
        if let Some(side) = self.pending_tag() {
            return match side {
                PendingSide::Long => Pattern::PendingLong,
                PendingSide::Short => Pattern::PendingShort,
            };
        }
        if self.active_long() {
            Pattern::ActiveLong
        } else if self.active_short() {
            Pattern::ActiveShort
        } else {
            Pattern::None
        }
    }
}

pub fn classify(window: &BarWindow) -> Classification {
    let BarWindow { w1, w2, w3 } = window;
    Classification {
        rally: w2.high > w1.high,
        support_hold: w3.close > w1.low,
        not_broken_out: w3.close <= w2.high,
        real_pullback: w3.high < w2.high,
        broke_out: w3.close > w2.high,
        drop: w2.low < w1.low,
        resistance_hold: w3.close < w1.high,
        not_broken_down: w3.close >= w2.low,
        real_bounce: w3.low > w2.low,
        broke_down: w3.close < w2.low,
    }
}

/// Distance from the close up to the breakout level, percent of `w2.high`.
pub fn long_distance_pct(window: &BarWindow) -> f64 {
    (window.w2.high - window.w3.close) / window.w2.high * 100.0
}

/// Distance from the breakdown level up to the close, percent of `w2.low`.
pub fn short_distance_pct(window: &BarWindow) -> f64 {
    (window.w3.close - window.w2.low) / window.w2.low * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bar::Bar;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn window(w1: (f64, f64, f64), w2: (f64, f64, f64), w3: (f64, f64, f64)) -> BarWindow {
        BarWindow {
            w1: Bar::new(w1.0, w1.1, w1.2),
            w2: Bar::new(w2.0, w2.1, w2.2),
            w3: Bar::new(w3.0, w3.1, w3.2),
        }
    }

    #[test]
    fn pending_long_scenario() {
        let w = window((100.0, 90.0, 95.0), (110.0, 95.0, 108.0), (108.0, 100.0, 105.0));
        let c = classify(&w);
        assert!(c.rally && c.support_hold && c.not_broken_out && c.real_pullback);
        assert!(c.pending_long());
        assert!(!c.active_long());
        assert_eq!(c.pending_tag(), Some(PendingSide::Long));
        assert_eq!(c.pattern(), Pattern::PendingLong);
        assert_abs_diff_eq!(long_distance_pct(&w), 4.545454, epsilon = 1e-5);
    }

    #[test]
    fn active_long_scenario() {
        let w = window((100.0, 90.0, 95.0), (110.0, 95.0, 108.0), (113.0, 104.0, 112.0));
        let c = classify(&w);
        assert!(!c.not_broken_out);
        assert!(!c.pending_long());
        assert!(c.active_long());
        assert_eq!(c.pending_tag(), None);
        assert_eq!(c.pattern(), Pattern::ActiveLong);
    }

    #[test]
    fn close_at_breakout_level_has_not_broken_out() {
        let w = window((100.0, 90.0, 95.0), (110.0, 95.0, 108.0), (110.0, 100.0, 110.0));
        let c = classify(&w);
        assert!(c.not_broken_out);
        assert!(!c.active_long());
        // equal high means no pullback either
        assert!(!c.pending_long());
    }

    #[test]
    fn no_real_pullback_is_not_pending() {
        // w3 made an equal high: rally and hold, but no pullback
        let w = window((100.0, 90.0, 95.0), (110.0, 95.0, 108.0), (110.0, 100.0, 105.0));
        let c = classify(&w);
        assert!(!c.real_pullback);
        assert_eq!(c.pattern(), Pattern::None);
    }

    #[test]
    fn close_below_support_is_not_pending() {
        let w = window((100.0, 90.0, 95.0), (110.0, 95.0, 108.0), (100.0, 85.0, 89.0));
        let c = classify(&w);
        assert!(!c.support_hold);
        assert!(!c.pending_long());
    }

    #[test]
    fn pending_short_scenario() {
        let w = window((100.0, 90.0, 95.0), (96.0, 80.0, 82.0), (92.0, 84.0, 88.0));
        let c = classify(&w);
        assert!(c.drop && c.resistance_hold && c.not_broken_down && c.real_bounce);
        assert_eq!(c.pending_tag(), Some(PendingSide::Short));
        assert_eq!(c.pattern(), Pattern::PendingShort);
        assert_abs_diff_eq!(short_distance_pct(&w), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn active_short_scenario() {
        let w = window((100.0, 90.0, 95.0), (96.0, 80.0, 82.0), (85.0, 75.0, 78.0));
        let c = classify(&w);
        assert!(c.active_short());
        assert!(!c.pending_short());
        assert_eq!(c.pattern(), Pattern::ActiveShort);
    }

    #[test]
    fn inside_bar_has_no_pattern() {
        let w = window((100.0, 90.0, 95.0), (98.0, 92.0, 96.0), (97.0, 93.0, 95.0));
        let c = classify(&w);
        assert!(!c.rally && !c.drop);
        assert_eq!(c.pattern(), Pattern::None);
        assert_eq!(c.pending_tag(), None);
    }

    #[test]
    fn outside_bar_breakout_is_active_long_only() {
        let w = window((100.0, 90.0, 95.0), (110.0, 80.0, 95.0), (115.0, 85.0, 112.0));
        let c = classify(&w);
        assert!(c.active_long());
        assert!(!c.active_short());
        assert_eq!(c.pattern(), Pattern::ActiveLong);
    }

    #[test]
    fn outside_bar_inside_close_is_pending_both_ways() {
        let w = window((151.4, 105.56, 120.0), (186.25, 94.57, 130.0), (106.88, 106.88, 106.88));
        let c = classify(&w);
        assert!(c.pending_long());
        assert!(c.pending_short());
        assert_eq!(c.pending_tag(), Some(PendingSide::Long));
        assert_eq!(c.pattern(), Pattern::PendingLong);
    }

    #[test]
    fn side_tags_round_trip() {
        for side in [PendingSide::Long, PendingSide::Short] {
            assert_eq!(PendingSide::from_tag(side.tag()), Some(side));
        }
        assert_eq!(PendingSide::from_tag("first_breakout"), None);
        assert_eq!(PendingSide::Short.marker(), 'S');
    }

    #[test]
    fn pattern_display() {
        assert_eq!(Pattern::PendingLong.to_string(), "pending-long");
        assert_eq!(Pattern::None.to_string(), "none");
    }

    fn arb_bar() -> impl Strategy<Value = Bar> {
        (1.0f64..1000.0, 0.0f64..100.0, 0.0f64..=1.0).prop_map(|(low, range, pos)| {
            let high = low + range;
            Bar::new(high, low, low + range * pos)
        })
    }

    proptest! {
        #[test]
        fn pending_tag_follows_flags_long_first(
            w1 in arb_bar(),
            w2 in arb_bar(),
            w3 in arb_bar()
        ) {
            let c = classify(&BarWindow { w1, w2, w3 });
            let expected = if c.pending_long() {
                Some(PendingSide::Long)
            } else if c.pending_short() {
                Some(PendingSide::Short)
            } else {
                None
            };
            prop_assert_eq!(c.pending_tag(), expected);
        }

        #[test]
        fn both_pending_needs_an_outside_bar(w1 in arb_bar(), w2 in arb_bar(), w3 in arb_bar()) {
            let c = classify(&BarWindow { w1, w2, w3 });
            if c.pending_long() && c.pending_short() {
                prop_assert!(c.rally && c.drop);
                prop_assert_eq!(c.pending_tag(), Some(PendingSide::Long));
            }
        }

        #[test]
        fn pending_and_active_are_exclusive_per_side(
            w1 in arb_bar(),
            w2 in arb_bar(),
            w3 in arb_bar()
        ) {
            let c = classify(&BarWindow { w1, w2, w3 });
            prop_assert!(!(c.pending_long() && c.active_long()));
            prop_assert!(!(c.pending_short() && c.active_short()));
        }

        #[test]
        fn pending_long_distance_is_non_negative(
            w1 in arb_bar(),
            w2 in arb_bar(),
            w3 in arb_bar()
        ) {
            let w = BarWindow { w1, w2, w3 };
            if classify(&w).pending_long() {
                prop_assert!(long_distance_pct(&w) >= 0.0);
            }
            if classify(&w).pending_short() {
                prop_assert!(short_distance_pct(&w) >= 0.0);
            }
        }
    }
}
