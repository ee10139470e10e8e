mod receipt;

pub use receipt::render_receipt;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::RecordError;
use crate::models::Bill;

const LEDGER_HEADER: &str = "DateTime,Item,Weight (kg),Price/kg,Total\n";

/// The two durable side effects of finalization. Split behind a trait so
/// the orchestration (and its tests) can retry each effect independently.
pub trait BillSink: Send + Sync {
    /// Append exactly one row to the persistent ledger, creating it with
    /// a header first if absent.
    fn append_ledger(&self, bill: &Bill) -> Result<(), RecordError>;

    /// Render and persist the receipt artifact; never overwrites an
    /// existing receipt for the same timestamp.
    fn write_receipt(&self, bill: &Bill) -> Result<PathBuf, RecordError>;
}

/// File-backed recorder: append-only CSV ledger plus one receipt PNG per
/// finalized bill.
pub struct BillRecorder {
    ledger_path: PathBuf,
    receipt_dir: PathBuf,
}

impl BillRecorder {
    pub fn new(ledger_path: PathBuf, receipt_dir: PathBuf) -> Self {
        Self {
            ledger_path,
            receipt_dir,
        }
    }

    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }

    fn receipt_path(&self, bill: &Bill) -> PathBuf {
        self.receipt_dir.join(format!("bill_{}.png", bill.file_stamp()))
    }
}

impl BillSink for BillRecorder {
    fn append_ledger(&self, bill: &Bill) -> Result<(), RecordError> {
        let exists = self.ledger_path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .map_err(RecordError::Ledger)?;

        // Header and row go out in one append so a crash mid-write can
        // never leave earlier rows corrupted.
        let mut chunk = String::new();
        if !exists {
            chunk.push_str(LEDGER_HEADER);
        }
        chunk.push_str(&bill.ledger_row());

        file.write_all(chunk.as_bytes()).map_err(RecordError::Ledger)?;
        file.flush().map_err(RecordError::Ledger)?;

        info!("ledger row appended to {}", self.ledger_path.display());
        Ok(())
    }

    fn write_receipt(&self, bill: &Bill) -> Result<PathBuf, RecordError> {
        fs::create_dir_all(&self.receipt_dir)
            .map_err(|err| RecordError::Receipt(err.to_string()))?;

        let path = self.receipt_path(bill);
        if path.exists() {
            // A retry inside the same clock second must not clobber an
            // already-successful receipt.
            return Err(RecordError::ReceiptCollision(path));
        }

        let image = render_receipt(bill);
        image
            .save(&path)
            .map_err(|err| RecordError::Receipt(err.to_string()))?;

        info!("receipt saved to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn bill_at_second(second: u32) -> Bill {
        let ts = Utc.with_ymd_and_hms(2026, 8, 24, 14, 30, second).unwrap();
        Bill::new(ts, "apple".into(), 0.452, 120.0)
    }

    fn recorder(dir: &TempDir) -> BillRecorder {
        BillRecorder::new(
            dir.path().join("billing_history.csv"),
            dir.path().join("saved_bills"),
        )
    }

    #[test]
    fn first_append_writes_header_then_row() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder(&dir);

        recorder.append_ledger(&bill_at_second(5)).unwrap();
        let contents = fs::read_to_string(recorder.ledger_path()).unwrap();
        assert_eq!(
            contents,
            "DateTime,Item,Weight (kg),Price/kg,Total\n\
             2026-08-24 14:30:05,apple,0.452,120.00,54.24\n"
        );
    }

    #[test]
    fn later_appends_do_not_repeat_the_header() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder(&dir);

        recorder.append_ledger(&bill_at_second(5)).unwrap();
        recorder.append_ledger(&bill_at_second(6)).unwrap();

        let contents = fs::read_to_string(recorder.ledger_path()).unwrap();
        assert_eq!(contents.matches("DateTime").count(), 1);
        assert_eq!(contents.lines().count(), 3);
    }

    #[test]
    fn receipt_lands_in_the_receipt_dir() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder(&dir);

        let path = recorder.write_receipt(&bill_at_second(5)).unwrap();
        assert!(path.ends_with("bill_2026-08-24_14-30-05.png"));
        assert!(path.exists());
    }

    #[test]
    fn same_second_receipt_collides_instead_of_overwriting() {
        let dir = TempDir::new().unwrap();
        let recorder = recorder(&dir);

        let first = recorder.write_receipt(&bill_at_second(5)).unwrap();
        let first_bytes = fs::read(&first).unwrap();

        let err = recorder.write_receipt(&bill_at_second(5)).unwrap_err();
        assert!(matches!(err, RecordError::ReceiptCollision(_)));
        assert_eq!(fs::read(&first).unwrap(), first_bytes);
    }

    #[test]
    fn ledger_failure_reports_io_cause() {
        let dir = TempDir::new().unwrap();
        // Pointing the ledger at a directory makes the append fail.
        let recorder = BillRecorder::new(dir.path().to_path_buf(), dir.path().join("saved_bills"));
        assert!(matches!(
            recorder.append_ledger(&bill_at_second(5)),
            Err(RecordError::Ledger(_))
        ));
    }
}
