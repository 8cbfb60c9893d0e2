use super::UnitReport;
use crate::check::Progress;

pub fn print_summary(reports: &[UnitReport]) {
    let mut rows = 0;
    let mut resolved = 0;
    let mut skipped = 0;
    let mut pending = 0;

    for r in reports {
        rows += r.rows;
        resolved += r.completed + r.skipped;
        skipped += r.progress.skipped;
        pending += r.progress.pending;

        let state = if r.cancelled {
            "CANCELLED"
        } else if r.is_complete() {
            "DONE"
        } else {
            "INCOMPLETE"
        };
        eprintln!(
            "{} [{}/{}]: rows={} scheduled={} completed={} skipped={} deferred={} ({:.1}s)",
            state,
            r.dataset,
            r.unit,
            r.rows,
            r.scheduled,
            r.completed,
            r.skipped,
            r.deferred,
            r.duration_ms as f64 / 1000.0
        );
    }

    eprintln!(
        "Results: units={} rows={} resolved={} skipped_total={} pending={}",
        reports.len(),
        rows,
        resolved,
        skipped,
        pending
    );
}

pub fn print_status(dataset: &str, unit: &str, rows: Option<usize>, progress: &Progress) {
    let rows = rows
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    eprintln!(
        "{}/{}: rows={} materialized={} completed={} skipped={} pending={}",
        dataset, unit, rows, progress.total, progress.completed, progress.skipped, progress.pending
    );
}
