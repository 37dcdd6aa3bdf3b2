//! Run records and the append-only run log.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy::primitives::U256;
use chrono::{DateTime, Local};
use utils::format_units;

/// Decimals of the tomb-fork shares tokens.
pub const SHARES_DECIMALS: u8 = 18;

/// One line of the run log, written for every fork that was harvested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub timestamp: DateTime<Local>,
    pub fork: String,
    /// Raw pending shares before the harvest
    pub pending: U256,
    /// Pending shares valued in raw settlement units
    pub value: U256,
    pub currency: String,
    pub currency_decimals: u8,
    /// Value in raw settlement units of what was sold, or staked when nothing was sold
    pub profit: U256,
}

impl RunRecord {
    /// `timestamp,fork,pending,value,currency,profit`, amounts as fixed-point decimals.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.timestamp.to_rfc3339(),
            self.fork,
            format_units(self.pending, SHARES_DECIMALS),
            format_units(self.value, self.currency_decimals),
            self.currency,
            format_units(self.profit, self.currency_decimals),
        )
    }
}

/// Destination for run records.
pub trait RecordSink {
    fn append(&mut self, record: &RunRecord) -> std::io::Result<()>;
}

impl RecordSink for Vec<RunRecord> {
    fn append(&mut self, record: &RunRecord) -> std::io::Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

/// Run log file; never truncated or read back.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for RunLog {
    fn append(&mut self, record: &RunRecord) -> std::io::Result<()> {
        writeln!(self.file, "{}", record.to_line())?;
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(fork: &str) -> RunRecord {
        RunRecord {
            timestamp: Local.with_ymd_and_hms(2022, 2, 14, 9, 30, 0).unwrap(),
            fork: fork.to_string(),
            pending: U256::from(2_500_000_000_000_000_000u128),
            value: U256::from(150_000_000u64),
            currency: "USDC".to_string(),
            currency_decimals: 6,
            profit: U256::from(15_250_000u64),
        }
    }

    #[test]
    fn line_is_comma_separated_fixed_point() {
        let line = record("BSHARE-FTM").to_line();
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 6);
        assert!(fields[0].starts_with("2022-02-14T09:30:00"));
        assert_eq!(
            &fields[1..],
            &[
                "BSHARE-FTM",
                "2.500000000000000000",
                "150.000000",
                "USDC",
                "15.250000"
            ]
        );
    }

    #[test]
    fn run_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvester.log");

        let mut log = RunLog::open(&path).unwrap();
        log.append(&record("BASED-TOMB")).unwrap();
        drop(log);
        let mut log = RunLog::open(&path).unwrap();
        log.append(&record("BASED-TRI")).unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(",BASED-TOMB,"));
        assert!(lines[1].contains(",BASED-TRI,"));
    }
}
