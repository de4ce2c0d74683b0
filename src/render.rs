//! Time-series rendering seam.
//!
//! The drawing backend is a collaborator; the core hands it validated
//! point series and file paths and only cares whether a file came out.

use chrono::{DateTime, Utc};
use std::path::Path;

/// One named latency series, averaged per probe round, oldest first.
pub type Series = (String, Vec<(DateTime<Utc>, f64)>);

pub trait SeriesRenderer: Send + Sync {
    /// Draw the series to `out`. Returning false means nothing was
    /// drawn (for example, too little data); it is not an error.
    fn render(&self, series: &[Series], out: &Path) -> bool;
}

/// Renderer used when no graphics backend is wired in; draws nothing.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl SeriesRenderer for NullRenderer {
    fn render(&self, series: &[Series], out: &Path) -> bool {
        tracing::debug!(
            "no rendering backend, skipping '{}' ({} series)",
            out.display(),
            series.len()
        );
        false
    }
}
