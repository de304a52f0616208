//! CSV rendering and atomic file output.

use std::path::{Path, PathBuf};

use commute_burden_dataset_models::{DatasetRow, OUTPUT_COLUMNS};

use crate::DatasetError;

/// Renders rows as CSV bytes: the header, then one line per row in the
/// given order.
///
/// # Errors
///
/// * If the CSV writer fails
pub fn render_csv(rows: &[DatasetRow]) -> Result<Vec<u8>, DatasetError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(OUTPUT_COLUMNS)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }
    writer
        .into_inner()
        .map_err(|e| DatasetError::Io(e.into_error()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes `bytes` to a sibling `<name>.tmp` file and renames it onto
/// `path`, creating the parent directory first.
///
/// On failure neither a partial file at `path` nor the temporary file is
/// left behind.
///
/// # Errors
///
/// * If the parent directory cannot be created
/// * If the file cannot be written or renamed
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = std::fs::write(&tmp, bytes).and_then(|()| std::fs::rename(&tmp, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

/// Writes the dataset to `path` with [`write_atomic`].
///
/// # Errors
///
/// * If the CSV cannot be rendered
/// * If the file cannot be written or renamed
pub fn write_dataset(path: &Path, rows: &[DatasetRow]) -> Result<(), DatasetError> {
    let bytes = render_csv(rows)?;
    write_atomic(path, &bytes)?;

    log::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use commute_burden_dataset_models::{AreaRecord, IncomeSegment};

    use super::*;

    fn rows() -> Vec<DatasetRow> {
        ["85001", "85002"]
            .iter()
            .enumerate()
            .map(|(i, zcta)| {
                let mut area = AreaRecord::new(*zcta);
                area.rent_to_income = Some(0.1 * (i as f64 + 1.0));
                DatasetRow {
                    area,
                    area_km2: Some(1.5),
                    zori: None,
                    period: None,
                    stops_per_km2: Some(0.0),
                    pop_density: None,
                    income_segment: Some(IncomeSegment::High),
                }
            })
            .collect()
    }

    #[test]
    fn header_then_rows() {
        let csv = String::from_utf8(render_csv(&rows()).unwrap()).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ZCTA5CE,rent_to_income,pct_rent_burden_30,"));
        assert!(lines[0].ends_with(",income_segment,stops_per_km2,period"));
        assert!(lines[1].starts_with("85001,0.1,,,,"));
        assert!(lines[1].ends_with(",High,0,"));
    }

    #[test]
    fn rendering_is_deterministic() {
        assert_eq!(render_csv(&rows()).unwrap(), render_csv(&rows()).unwrap());
    }

    #[test]
    fn writes_file_and_leaves_no_temp() {
        let dir = std::env::temp_dir().join("commute_burden_output_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("final_zcta_dataset_test.csv");

        write_dataset(&path, &rows()).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, render_csv(&rows()).unwrap());
        assert!(!temp_path(&path).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_rename_removes_the_temp_file() {
        let dir = std::env::temp_dir().join("commute_burden_output_rename_test");
        let _ = std::fs::remove_dir_all(&dir);
        // A non-empty directory at the target makes the rename fail.
        let path = dir.join("final_zcta_dataset_test.csv");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        assert!(matches!(
            write_dataset(&path, &rows()),
            Err(DatasetError::Io(_))
        ));
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_write_leaves_no_output() {
        let dir = std::env::temp_dir().join("commute_burden_output_write_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("boundaries.geojson");
        // A directory where the temp file should go makes the write fail.
        std::fs::create_dir_all(temp_path(&path)).unwrap();

        assert!(write_atomic(&path, b"{}").is_err());
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
