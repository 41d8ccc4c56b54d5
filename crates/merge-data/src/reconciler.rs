//! Aligns a data extract with the canonical label sequence.
//!
//! The extract is first loaded with its own first row as labels.
//! [`assess_header`] decides whether that load is usable; if not, the
//! source is reloaded once with no header row. Either way the canonical
//! labels are then assigned positionally.

use merge_core::columns::{looks_like_placeholder_headers, normalize_labels};
use merge_core::error::{Result, SchemaError};
use merge_core::table::{HeaderMode, Table};
use tracing::info;

use crate::reader::TableSource;

// ── Header assessment ─────────────────────────────────────────────────────────

/// Why a first-row-as-header load was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadReason {
    CountMismatch { found: usize, expected: usize },
    /// Labels look like numbers or `Unnamed` markers.
    PlaceholderHeader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAssessment {
    /// Keep the table as loaded.
    Usable,
    /// Reload the source with [`HeaderMode::NoHeader`].
    Reload(ReloadReason),
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Data table labelled with the canonical sequence.
    pub table: Table,
    /// Set when the header-row load was discarded.
    pub reload: Option<ReloadReason>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Judge a first-row-as-header load against the canonical width.
pub fn assess_header(canonical_len: usize, loaded: &Table) -> HeaderAssessment {
    if loaded.n_cols() != canonical_len {
        HeaderAssessment::Reload(ReloadReason::CountMismatch {
            found: loaded.n_cols(),
            expected: canonical_len,
        })
    } else if looks_like_placeholder_headers(loaded.columns()) {
        HeaderAssessment::Reload(ReloadReason::PlaceholderHeader)
    } else {
        HeaderAssessment::Usable
    }
}

/// Load `source` and relabel it with `canonical`.
///
/// At most one reload is attempted. A width that still differs from
/// `canonical.len()` afterwards is a [`SchemaError::ColumnCountMismatch`].
pub fn reconcile(source: &dyn TableSource, canonical: &[String]) -> Result<Reconciled> {
    let expected = canonical.len();
    info!("Loading data file: {}", source.describe());
    let first = source.load(HeaderMode::FirstRow)?;

    let (mut table, reload) = match assess_header(expected, &first) {
        HeaderAssessment::Usable => (first, None),
        HeaderAssessment::Reload(reason) => {
            match reason {
                ReloadReason::CountMismatch { found, expected } => info!(
                    "Column count mismatch with header row (data={} vs header={}); reloading without header",
                    found, expected
                ),
                ReloadReason::PlaceholderHeader => info!(
                    "Data columns look non-semantic (numeric/Unnamed); reloading without header"
                ),
            }
            let reloaded = source.load(HeaderMode::NoHeader)?;
            info!(
                "Reloaded data without header: {} rows x {} cols",
                reloaded.n_rows(),
                reloaded.n_cols()
            );
            (reloaded, Some(reason))
        }
    };

    if table.n_cols() != expected {
        return Err(SchemaError::ColumnCountMismatch {
            found: table.n_cols(),
            expected,
            reloaded: reload.is_some(),
        }
        .into());
    }

    table.set_columns(canonical.to_vec())?;
    // Canonical labels are already unique; this only guards the invariant.
    table.set_columns(normalize_labels(table.columns()))?;

    info!(
        "Data loaded. Rows: {}, Cols: {}",
        table.n_rows(),
        table.n_cols()
    );

    Ok(Reconciled { table, reload })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
