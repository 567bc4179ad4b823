//! Durable storage for computed schedules.
//!
//! Every build of an [`AmortizationSchedule`](crate::AmortizationSchedule) hands its rows to a
//! [`ScheduleSink`], addressed by a [`TableKey`]. Writes are best effort: the schedule logs a
//! failed store and keeps its in-memory table.

use crate::error::PersistenceError;
use crate::loan::ScheduleRow;
use rust_decimal::Decimal;
use std::{
    cell::RefCell,
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};

pub const HEADER: [&str; 6] = [
    "Pmt #",
    "Due date",
    "Payment amount",
    "Principal paid",
    "Interest paid",
    "Remaining balance",
];

/// Identity of a stored table: loan label, opening balance and periodic payment.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TableKey {
    pub label: String,
    pub principal: Decimal,
    pub payment: Decimal,
}

impl TableKey {
    pub fn new(label: &str, principal: Decimal, payment: Decimal) -> Self {
        Self {
            label: label.to_string(),
            principal,
            payment,
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.label, self.principal, self.payment)
    }
}

pub trait ScheduleSink {
    fn store(&self, key: &TableKey, rows: &[ScheduleRow]) -> Result<(), PersistenceError>;
}

/// Writes one CSV file per key under `dir`, creating the directory on first use.
#[derive(Clone, Debug)]
pub struct CsvTableSink {
    dir: PathBuf,
}

impl CsvTableSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for `key` inside `dir`. Path separators in the label become `_` so every table
    /// stays directly under `dir`.
    pub fn path_for(&self, key: &TableKey) -> PathBuf {
        let stem: String = key
            .to_string()
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.dir.join(format!("{stem}.csv"))
    }
}

impl ScheduleSink for CsvTableSink {
    fn store(&self, key: &TableKey, rows: &[ScheduleRow]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir)?;

        let mut wtr = csv::Writer::from_path(self.path_for(key))?;
        wtr.write_record(HEADER)?;
        for row in rows {
            wtr.write_record([
                row.pmt_number.to_string(),
                row.pmt_date.format("%Y-%m-%d").to_string(),
                row.pmt_amount.to_string(),
                row.principal_paid.to_string(),
                row.interest_paid.to_string(),
                row.end_balance.to_string(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Keeps the most recent table stored under each key.
#[derive(Default, Debug)]
pub struct MemorySink {
    tables: RefCell<HashMap<TableKey, Vec<ScheduleRow>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TableKey) -> Option<Vec<ScheduleRow>> {
        self.tables.borrow().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.tables.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.borrow().is_empty()
    }
}

impl ScheduleSink for MemorySink {
    fn store(&self, key: &TableKey, rows: &[ScheduleRow]) -> Result<(), PersistenceError> {
        self.tables.borrow_mut().insert(key.clone(), rows.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CsvTableSink, MemorySink, ScheduleSink, TableKey};
    use crate::loan::ScheduleRow;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use test_log::test;

    fn sample_rows() -> Vec<ScheduleRow> {
        vec![
            ScheduleRow::new(
                1,
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                dec!(600.00),
                dec!(595.00),
                dec!(5.00),
                dec!(405.00),
            ),
            ScheduleRow::new(
                2,
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                dec!(407.03),
                dec!(405.00),
                dec!(2.03),
                dec!(0),
            ),
        ]
    }

    #[test]
    fn test_key_file_stem() {
        let key = TableKey::new("Car", dec!(8000.0), dec!(354.22));
        assert_eq!(key.to_string(), "Car-8000.0-354.22");
    }

    #[test]
    fn test_csv_sink_creates_dir_and_writes_table() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvTableSink::new(tmp.path().join("files").join("tables"));
        let key = TableKey::new("Medical", dec!(1000), dec!(600.00));

        sink.store(&key, &sample_rows()).unwrap();

        let text = std::fs::read_to_string(sink.path_for(&key)).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Pmt #,Due date,Payment amount,Principal paid,Interest paid,Remaining balance",
                "1,2024-01-31,600.00,595.00,5.00,405.00",
                "2,2024-02-29,407.03,405.00,2.03,0",
            ]
        );
    }

    #[test]
    fn test_csv_sink_keeps_labels_inside_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let tables = tmp.path().join("tables");
        let sink = CsvTableSink::new(&tables);

        let nested = TableKey::new("Car/Truck", dec!(1000), dec!(600.00));
        assert_eq!(sink.path_for(&nested), tables.join("Car_Truck-1000-600.00.csv"));
        sink.store(&nested, &sample_rows()).unwrap();
        assert!(tables.join("Car_Truck-1000-600.00.csv").is_file());

        let escaping = TableKey::new("../..\\up", dec!(1000), dec!(600.00));
        let path = sink.path_for(&escaping);
        assert_eq!(path.parent(), Some(tables.as_path()));
        assert_eq!(path, tables.join(".._.._up-1000-600.00.csv"));
    }

    #[test]
    fn test_csv_sink_overwrites_same_key() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = CsvTableSink::new(tmp.path());
        let key = TableKey::new("Medical", dec!(1000), dec!(600.00));

        sink.store(&key, &sample_rows()).unwrap();
        sink.store(&key, &sample_rows()[..1]).unwrap();

        let text = std::fs::read_to_string(sink.path_for(&key)).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_csv_sink_reports_unwritable_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("occupied");
        std::fs::write(&blocker, "not a directory").unwrap();

        let sink = CsvTableSink::new(&blocker);
        let key = TableKey::new("Car", dec!(1000), dec!(600.00));
        assert!(sink.store(&key, &sample_rows()).is_err());
    }

    #[test]
    fn test_memory_sink_keeps_latest() {
        let sink = MemorySink::new();
        let key = TableKey::new("Car", dec!(1000), dec!(600.00));
        assert!(sink.is_empty());

        sink.store(&key, &sample_rows()).unwrap();
        sink.store(&key, &sample_rows()[1..]).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get(&key).unwrap().len(), 1);
    }
}
