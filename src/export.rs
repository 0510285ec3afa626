//! Curated CSV export of the committed fact table.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::interfaces::{FactTable, StorageError, FACT_TABLE_NAME};
use crate::model::CombinedDailyMetric;

/// Errors exporting the fact table.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Failed to read fact table: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode {}: {source}", .path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

const EXPORT_HEADER: [&str; 6] = [
    "store_id",
    "dt",
    "revenue",
    "order_count",
    "converted_leads",
    "sessions",
];

/// File the export is written to inside `dir`.
pub fn export_path(dir: &Path) -> PathBuf {
    dir.join(format!("{FACT_TABLE_NAME}.csv"))
}

/// Write every committed row, ordered by (store_id, dt), to
/// `dir/fct_daily_store_metrics.csv`.
///
/// The file is written beside the target and renamed over it, so a reader
/// never sees a partial export. On failure the staging file is removed.
pub async fn export_fact_table(table: &dyn FactTable, dir: &Path) -> Result<PathBuf, ExportError> {
    let rows = table.scan().await?;
    let path = export_path(dir);

    fs::create_dir_all(dir).map_err(io_error(dir))?;
    let staging = path.with_extension("csv.tmp");
    let written = write_rows(&staging, &rows)
        .and_then(|()| fs::rename(&staging, &path).map_err(io_error(&path)));
    if let Err(e) = written {
        // Best effort; the write error is what gets reported.
        let _ = fs::remove_file(&staging);
        return Err(e);
    }

    info!(path = %path.display(), rows = rows.len(), "Fact table exported");
    Ok(path)
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Header is written even when the table is empty.
fn write_rows(path: &Path, rows: &[CombinedDailyMetric]) -> Result<(), ExportError> {
    let csv_error = |source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(csv_error)?;
    writer.write_record(EXPORT_HEADER).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(io_error(path))
}
