use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;

use crate::error::Result;
use crate::listing::RecordTable;

/// Writes the table's header row and one row per record to `path`.
///
/// Rows go to a sibling `.partial` file first and are renamed into place once
/// complete, so `path` either holds a whole table or is left untouched.
pub fn write_table(path: &Path, table: &RecordTable, delimiter: u8) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let partial = partial_path(path);
    let written = write_rows(&partial, table, delimiter)
        .and_then(|()| fs::rename(&partial, path).map_err(Into::into));
    if written.is_err() {
        let _ = fs::remove_file(&partial);
    }
    written
}

fn write_rows(path: &Path, table: &RecordTable, delimiter: u8) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(table.columns())?;
    for record in table.rows() {
        writer.write_record(record.cells())?;
    }
    writer.flush()?;
    Ok(())
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cities::CityTarget;
    use crate::listing::{ListingFields, ListingRecord};

    fn tmp_dir(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("utah_listings_csv_{name}"));
        let _ = fs::remove_dir_all(&p);
        fs::create_dir_all(&p).unwrap();
        p
    }

    fn table(addresses: &[&str]) -> RecordTable {
        RecordTable::new(addresses.iter().map(|a| record(a)).collect())
    }

    fn record(address: &str) -> ListingRecord {
        ListingRecord::new(
            &CityTarget::lookup("lehi").unwrap(),
            ListingFields {
                mls_number: Some("2001".into()),
                price: Some(500_000),
                address: Some(address.into()),
                beds: Some(3),
                ..Default::default()
            },
        )
    }

    #[test]
    fn header_and_empty_fields_for_missing_values() {
        let path = tmp_dir("header").join("out.csv");
        write_table(&path, &table(&["1 Main St, Lehi"]), b',').unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "mls_number,price,address,city,beds,baths,\
             square_footage,year_built,lot_size,garage,listing_agent"
        );
        assert_eq!(
            lines.next().unwrap(),
            r#"2001,500000,"1 Main St, Lehi",lehi,3,,,,,,"#
        );
        assert!(lines.next().is_none());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn zero_records_still_writes_header() {
        let path = tmp_dir("empty").join("nested/dir/out.tsv");
        write_table(&path, &RecordTable::default(), b'\t').unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("mls_number\tprice\t"));
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tmp_dir("blocked");
        // The target is a non-empty directory, so the final rename fails.
        let target = dir.join("out.csv");
        fs::create_dir_all(target.join("occupied")).unwrap();
        assert!(write_table(&target, &table(&["x"]), b',').is_err());
        assert!(!partial_path(&target).exists());
        assert!(target.is_dir());
    }
}
