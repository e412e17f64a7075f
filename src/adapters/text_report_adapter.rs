//! Plain-text report renderer.

use crate::domain::classifier::PendingSide;
use crate::domain::reconcile::ReconcileSummary;
use crate::domain::scan::{ActiveEntry, PendingEntry, ScanReport};
use crate::domain::verify::TagListing;
use crate::ports::report_port::ReportPort;
use std::io::{self, Write};

const WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn rule(out: &mut dyn Write, ch: char) -> io::Result<()> {
        writeln!(out, "{}", ch.to_string().repeat(WIDTH))
    }

    fn heading(
        out: &mut dyn Write,
        name: &str,
        code: &str,
        symbol: &str,
        contract: &str,
    ) -> io::Result<()> {
        if contract.is_empty() {
            writeln!(out, "{} ({}) - {}", name, code, symbol)
        } else {
            writeln!(out, "{} ({}) - {} [{}]", name, code, symbol, contract)
        }
    }

    fn pending_section(
        out: &mut dyn Write,
        title: &str,
        side: PendingSide,
        entries: &[PendingEntry],
    ) -> io::Result<()> {
        writeln!(out, "{} - {} instruments", title, entries.len())?;
        Self::rule(out, '-')?;
        let (boundary_label, boundary_role, stop_label) = match side {
            PendingSide::Long => ("High", "resistance", "Low"),
            PendingSide::Short => ("Low", "support", "High"),
        };
        for e in entries {
            Self::heading(out, &e.name, &e.code, &e.symbol, &e.contract)?;
            writeln!(out, "   w1: High {}, Low {}", e.w1_high, e.w1_low)?;
            writeln!(
                out,
                "   w2: {} {} <- {} (distance {:.2}%)",
                boundary_label, e.boundary, boundary_role, e.distance_pct
            )?;
            match &e.date {
                Some(date) => writeln!(
                    out,
                    "   w3: Close {}, {} {} as of {}",
                    e.close, stop_label, e.stop, date
                )?,
                None => writeln!(out, "   w3: Close {}, {} {}", e.close, stop_label, e.stop)?,
            }
            writeln!(
                out,
                "   risk: {:.1} points ({:.2}%)",
                e.risk_points(),
                e.risk_pct()
            )?;
            writeln!(out)?;
        }
        Ok(())
    }

    fn active_section(
        out: &mut dyn Write,
        title: &str,
        level_label: &str,
        entries: &[ActiveEntry],
    ) -> io::Result<()> {
        writeln!(out, "{} - {} instruments", title, entries.len())?;
        Self::rule(out, '-')?;
        for e in entries {
            Self::heading(out, &e.name, &e.code, &e.symbol, &e.contract)?;
            writeln!(out, "   close {}, {} {}", e.close, level_label, e.level)?;
            writeln!(out)?;
        }
        Ok(())
    }
}

impl ReportPort for TextReportAdapter {
    fn write_scan(&self, report: &ScanReport, out: &mut dyn Write) -> io::Result<()> {
        Self::rule(out, '=')?;
        writeln!(out, "3-bar pending pattern scan")?;
        Self::rule(out, '=')?;
        writeln!(out)?;

        Self::pending_section(out, "Pending Long", PendingSide::Long, &report.pending_long)?;
        writeln!(out)?;
        Self::active_section(out, "Active Long", "broke out above", &report.active_long)?;
        writeln!(out)?;
        Self::pending_section(out, "Pending Short", PendingSide::Short, &report.pending_short)?;
        writeln!(out)?;
        Self::active_section(out, "Active Short", "broke down below", &report.active_short)?;
        writeln!(out)?;

        Self::rule(out, '=')?;
        writeln!(out, "Summary:")?;
        writeln!(out, "  Pending Long: {}", report.pending_long.len())?;
        writeln!(out, "  Active Long: {}", report.active_long.len())?;
        writeln!(out, "  Pending Short: {}", report.pending_short.len())?;
        writeln!(out, "  Active Short: {}", report.active_short.len())?;
        if report.filtered > 0 {
            writeln!(out, "  Filtered by K/D cross: {}", report.filtered)?;
        }
        writeln!(
            out,
            "  Classified: {}, skipped: {}",
            report.classified, report.skipped
        )?;
        Self::rule(out, '=')?;

        for side in [PendingSide::Long, PendingSide::Short] {
            writeln!(out)?;
            writeln!(out, "Instruments to tag {}:", side.tag())?;
            writeln!(out, "{}", report.pending_labels(side).join(", "))?;
        }
        Ok(())
    }

    fn write_patch(
        &self,
        summary: &ReconcileSummary,
        location: &str,
        written: bool,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        Self::rule(out, '=')?;
        if written {
            writeln!(out, "Updated {}", location)?;
        } else {
            writeln!(out, "Dry run, {} not written", location)?;
        }
        writeln!(
            out,
            "Pending Long tagged: {} ({} new)",
            summary.tagged(PendingSide::Long),
            summary.newly_tagged(PendingSide::Long)
        )?;
        writeln!(
            out,
            "Pending Short tagged: {} ({} new)",
            summary.tagged(PendingSide::Short),
            summary.newly_tagged(PendingSide::Short)
        )?;
        writeln!(out, "Stale tags removed: {}", summary.cleared())?;
        if summary.summaries_created > 0 {
            writeln!(out, "Summaries created: {}", summary.summaries_created)?;
        }
        writeln!(out, "Skipped: {}", summary.skipped())?;
        Self::rule(out, '=')?;
        writeln!(out, "Tagged instruments: {}", summary.affected().join(", "))?;
        let cleared = summary.cleared_labels();
        if !cleared.is_empty() {
            writeln!(out, "Cleared instruments: {}", cleared.join(", "))?;
        }
        Ok(())
    }

    fn write_tags(&self, listing: &TagListing, out: &mut dyn Write) -> io::Result<()> {
        for side in [PendingSide::Long, PendingSide::Short] {
            let entries = listing.side(side);
            let title = match side {
                PendingSide::Long => "Pending Long",
                PendingSide::Short => "Pending Short",
            };
            writeln!(out, "{}: {}", title, entries.len())?;
            let labels: Vec<String> = entries.iter().map(|e| e.label()).collect();
            writeln!(out, "{}", labels.join(", "))?;
        }
        Ok(())
    }
}
