//! Weekly holder extracts: headerless TSV files named after their week,
//! e.g. `nft-owners-3rd week.tsv`, with columns
//! `contract, chain, token_or_holder, holder_address`.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use vippulse_core::AppError;
use vippulse_recon::snapshot::parse_week_label;
use vippulse_recon::SnapshotRow;

const CHAIN_COLUMN: usize = 1;
const HOLDER_COLUMN: usize = 3;

/// Extract files under `dir` matching `pattern`, in sorted order.
pub fn discover(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, AppError> {
    let full = dir.join(pattern);
    let mut paths: Vec<PathBuf> = glob::glob(&full.to_string_lossy())
        .map_err(|e| AppError::Config(format!("bad snapshot pattern {pattern:?}: {e}")))?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable snapshot path");
                None
            }
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|f| !f.is_empty())
}

/// Read one extract. Every row carries `label` as its week label.
pub fn read_extract<R: Read>(reader: R, label: &str) -> Result<Vec<SnapshotRow>, AppError> {
    let mut tsv = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in tsv.records() {
        let record = result.map_err(|e| AppError::Input(format!("{label}: {e}")))?;
        rows.push(SnapshotRow::new(
            label,
            non_empty(record.get(CHAIN_COLUMN)),
            non_empty(record.get(HOLDER_COLUMN)),
        ));
    }
    Ok(rows)
}

/// Read every extract matching `pattern` into snapshot rows.
///
/// Files whose name carries no week ordinal, and files that fail to read, are
/// skipped with a warning.
pub fn load_rows(dir: &Path, pattern: &str) -> Result<Vec<SnapshotRow>, AppError> {
    let paths = discover(dir, pattern)?;
    tracing::info!(files = paths.len(), dir = %dir.display(), "Found snapshot extracts");

    let mut rows = Vec::new();
    for path in paths {
        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(week) = parse_week_label(&label) else {
            tracing::warn!(file = %label, "No week ordinal in file name, skipping");
            continue;
        };

        let extract = File::open(&path)
            .map_err(AppError::from)
            .and_then(|file| read_extract(file, &label));
        match extract {
            Ok(extract) => {
                tracing::info!(week, rows = extract.len(), file = %label, "Read snapshot extract");
                rows.extend(extract);
            }
            Err(e) => tracing::warn!(file = %label, error = %e, "Failed to read snapshot extract"),
        }
    }
    Ok(rows)
}
