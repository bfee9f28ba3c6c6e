//! Results ledger.
//!
//! Every completed questionnaire is one row of `<data_dir>/wyniki.csv`:
//!
//! ```text
//! timestamp,date,user,role,objaw,q1,q2,q3,q4,q5,q6,q7,q8,q9,q10,suma
//! 2025-03-14T09:26:53,2025-03-14,jkowal,user,Kompulsje różne:Liczenie,2,3,1,0,4,2,3,1,0,2,18
//! ```
//!
//! Rows are only ever appended. Reads skip rows that do not parse.

use crate::catalog::SymptomKey;
use crate::questionnaire::{SeverityBand, YbocsScores};
use crate::repositories::credentials::Role;
use crate::repositories::shared::lock;
use crate::{YbocsError, YbocsResult};
use chrono::{Local, NaiveDate, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use ybocs_types::Login;

/// Column header of the ledger and of its export.
pub const LEDGER_HEADER: [&str; 16] = [
    "timestamp", "date", "user", "role", "objaw", "q1", "q2", "q3", "q4", "q5", "q6", "q7", "q8",
    "q9", "q10", "suma",
];

/// One stored assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub timestamp: NaiveDateTime,
    pub date: NaiveDate,
    pub login: Login,
    pub role: Role,
    /// Symptom key as written at submission time.
    pub symptom: String,
    pub scores: YbocsScores,
    pub total: u8,
}

impl ResultRow {
    pub fn band(&self) -> SeverityBand {
        SeverityBand::from_total(self.total)
    }
}

/// Input for [`ResultsLedger::append`].
#[derive(Debug, Clone)]
pub struct NewResult {
    pub login: Login,
    pub role: Role,
    pub symptom: SymptomKey,
    /// Raw item scores q1..q10.
    pub scores: Vec<u8>,
    /// Caller-computed total; must agree with the item sum when present.
    pub total: Option<u8>,
    /// Defaults to the current local time.
    pub recorded_at: Option<NaiveDateTime>,
}

/// Date restriction for [`ResultFilter`]. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    Range { start: NaiveDate, end: NaiveDate },
    Day(NaiveDate),
}

impl DateFilter {
    fn matches(&self, date: NaiveDate) -> bool {
        match *self {
            DateFilter::Range { start, end } => start <= date && date <= end,
            DateFilter::Day(day) => date == day,
        }
    }
}

/// Conjunctive row filter; `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub login: Option<Login>,
    pub dates: Option<DateFilter>,
    pub symptom: Option<String>,
}

impl ResultFilter {
    fn matches(&self, row: &ResultRow) -> bool {
        self.login.as_ref().is_none_or(|l| *l == row.login)
            && self.dates.is_none_or(|d| d.matches(row.date))
            && self.symptom.as_deref().is_none_or(|s| s == row.symptom)
    }
}

/// A point of the severity-over-time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeverityPoint {
    pub date: NaiveDate,
    pub total: u8,
    pub band: SeverityBand,
}

/// Severity totals in chronological order, one point per row.
pub fn severity_series(rows: &[ResultRow]) -> Vec<SeverityPoint> {
    let mut sorted: Vec<&ResultRow> = rows.iter().collect();
    sorted.sort_by_key(|row| (row.date, row.timestamp));
    sorted
        .into_iter()
        .map(|row| SeverityPoint {
            date: row.date,
            total: row.total,
            band: row.band(),
        })
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerRecord {
    timestamp: NaiveDateTime,
    date: NaiveDate,
    user: Login,
    role: Role,
    objaw: String,
    q1: u8,
    q2: u8,
    q3: u8,
    q4: u8,
    q5: u8,
    q6: u8,
    q7: u8,
    q8: u8,
    q9: u8,
    q10: u8,
    suma: u8,
}

impl From<&ResultRow> for LedgerRecord {
    fn from(row: &ResultRow) -> Self {
        let [q1, q2, q3, q4, q5, q6, q7, q8, q9, q10] = *row.scores.items();
        Self {
            timestamp: row.timestamp,
            date: row.date,
            user: row.login.clone(),
            role: row.role,
            objaw: row.symptom.clone(),
            q1,
            q2,
            q3,
            q4,
            q5,
            q6,
            q7,
            q8,
            q9,
            q10,
            suma: row.total,
        }
    }
}

impl TryFrom<LedgerRecord> for ResultRow {
    type Error = YbocsError;

    fn try_from(r: LedgerRecord) -> Result<Self, Self::Error> {
        let scores = YbocsScores::new(&[
            r.q1, r.q2, r.q3, r.q4, r.q5, r.q6, r.q7, r.q8, r.q9, r.q10,
        ])?;
        if scores.total() != r.suma {
            return Err(YbocsError::Validation(format!(
                "suma {} does not match item total {}",
                r.suma,
                scores.total()
            )));
        }

        Ok(Self {
            timestamp: r.timestamp,
            date: r.date,
            login: r.user,
            role: r.role,
            symptom: r.objaw,
            scores,
            total: r.suma,
        })
    }
}

/// Append-only store of assessment rows.
#[derive(Debug)]
pub struct ResultsLedger {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl ResultsLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validates and appends one assessment.
    ///
    /// # Errors
    ///
    /// - [`YbocsError::Validation`] if there are not ten scores, a score is out of
    ///   range, or a supplied total disagrees with the item sum
    /// - [`YbocsError::FileWrite`] / [`YbocsError::Csv`] if the ledger cannot be written
    pub fn append(&self, new: NewResult) -> YbocsResult<ResultRow> {
        let scores = YbocsScores::new(&new.scores)?;
        let total = scores.total();
        if let Some(supplied) = new.total.filter(|supplied| *supplied != total) {
            return Err(YbocsError::Validation(format!(
                "suma {supplied} does not match item total {total}"
            )));
        }

        let timestamp = new
            .recorded_at
            .unwrap_or_else(|| Local::now().naive_local())
            .trunc_subsecs(0);

        let row = ResultRow {
            timestamp,
            date: timestamp.date(),
            login: new.login,
            role: new.role,
            symptom: new.symptom.to_string(),
            scores,
            total,
        };

        let _guard = lock(&self.append_lock);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(YbocsError::DirCreation)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(YbocsError::FileWrite)?;
        let len = file.metadata().map_err(YbocsError::FileRead)?.len();
        let is_new = len == 0;

        // A ledger edited by hand may lack its final newline.
        if !is_new && !ends_with_newline(&mut file)? {
            file.write_all(b"\n").map_err(YbocsError::FileWrite)?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(LEDGER_HEADER)?;
        }
        writer.serialize(LedgerRecord::from(&row))?;
        writer.flush().map_err(YbocsError::FileWrite)?;

        tracing::info!(
            login = %row.login,
            symptom = %row.symptom,
            total = row.total,
            "assessment recorded"
        );
        Ok(row)
    }

    /// Every readable row in stored order.
    pub fn all(&self) -> YbocsResult<Vec<ResultRow>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(YbocsError::FileRead(e)),
        };

        let mut reader = csv::Reader::from_reader(file);
        let mut rows = Vec::new();
        for (idx, record) in reader.deserialize::<LedgerRecord>().enumerate() {
            let parsed = record
                .map_err(YbocsError::from)
                .and_then(ResultRow::try_from);
            match parsed {
                Ok(row) => rows.push(row),
                // Data rows start on line 2.
                Err(e) => tracing::warn!(line = idx + 2, "skipping ledger row: {}", e),
            }
        }
        Ok(rows)
    }

    /// Rows matching `filter`.
    ///
    /// Ordered by (date, timestamp) when a login filter is set, otherwise by
    /// (login, date, timestamp).
    pub fn query(&self, filter: &ResultFilter) -> YbocsResult<Vec<ResultRow>> {
        if let Some(DateFilter::Range { start, end }) = filter.dates {
            if start > end {
                return Err(YbocsError::Validation(format!(
                    "date range start {start} is after end {end}"
                )));
            }
        }

        let mut rows: Vec<ResultRow> = self
            .all()?
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect();

        if filter.login.is_some() {
            rows.sort_by(|a, b| (a.date, a.timestamp).cmp(&(b.date, b.timestamp)));
        } else {
            rows.sort_by(|a, b| {
                (&a.login, a.date, a.timestamp).cmp(&(&b.login, b.date, b.timestamp))
            });
        }
        Ok(rows)
    }

    /// The full ledger as CSV bytes, exactly as stored.
    ///
    /// Rows that [`Self::all`] skips are included. A missing or empty ledger
    /// exports the header alone.
    pub fn export_csv(&self) -> YbocsResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) if !bytes.is_empty() => return Ok(bytes),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(YbocsError::FileRead(e)),
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(LEDGER_HEADER)?;
        writer
            .into_inner()
            .map_err(|e| YbocsError::FileWrite(e.into_error()))
    }

    /// Distinct logins present in the ledger.
    pub fn patients(&self) -> YbocsResult<Vec<Login>> {
        let logins: BTreeSet<Login> = self.all()?.into_iter().map(|row| row.login).collect();
        Ok(logins.into_iter().collect())
    }

    /// Distinct symptom keys scored for `login`.
    pub fn symptoms_for(&self, login: &Login) -> YbocsResult<Vec<String>> {
        let symptoms: BTreeSet<String> = self
            .all()?
            .into_iter()
            .filter(|row| row.login == *login)
            .map(|row| row.symptom)
            .collect();
        Ok(symptoms.into_iter().collect())
    }
}

fn ends_with_newline(file: &mut fs::File) -> YbocsResult<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1)).map_err(YbocsError::FileRead)?;
    file.read_exact(&mut last).map_err(YbocsError::FileRead)?;
    Ok(last[0] == b'\n')
}
