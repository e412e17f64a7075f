//! Report rendering port trait.

use crate::domain::reconcile::ReconcileSummary;
use crate::domain::scan::ScanReport;
use crate::domain::verify::TagListing;
use std::io::{self, Write};

/// Port for rendering run results.
pub trait ReportPort {
    fn write_scan(&self, report: &ScanReport, out: &mut dyn Write) -> io::Result<()>;

    /// `written` is false for dry runs.
    fn write_patch(
        &self,
        summary: &ReconcileSummary,
        location: &str,
        written: bool,
        out: &mut dyn Write,
    ) -> io::Result<()>;

    fn write_tags(&self, listing: &TagListing, out: &mut dyn Write) -> io::Result<()>;
}
