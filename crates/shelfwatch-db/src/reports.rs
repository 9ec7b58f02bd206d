//! Per-search report histories stored as JSON documents.
//!
//! Each report name owns `{dir}/{name}.json` with the shape
//! `{"reports": [{title, date, best_item, currency, filters, base_link, products}, ...]}`.
//! Older files hold a single bare report object; those load as a one-element
//! history and are rewritten in the wrapped form on the next append.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use shelfwatch_core::{ProductRecord, SearchFilters};

use crate::ReportError;

/// `date` is written in this format, in local time.
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

mod report_date {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::REPORT_DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&date.format(REPORT_DATE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, REPORT_DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Older writers emit `null` for an empty block instead of leaving it out.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// One persisted run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    #[serde(with = "report_date")]
    pub date: NaiveDateTime,
    /// `None` only when `products` is empty.
    pub best_item: Option<ProductRecord>,
    pub currency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub filters: SearchFilters,
    pub base_link: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub products: Vec<ProductRecord>,
    /// Keys this version does not know about, carried through rewrites.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportHistory {
    pub reports: Vec<Report>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Wrapped(ReportHistory),
    Legacy(Box<Report>),
}

impl ReportHistory {
    /// Parses either the wrapped layout or a legacy single-report document.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the document is neither.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str::<StoredHistory>(raw)? {
            StoredHistory::Wrapped(history) => history,
            StoredHistory::Legacy(report) => {
                tracing::info!(title = %report.title, "upgrading legacy single-report history");
                Self {
                    reports: vec![*report],
                }
            }
        })
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Report> {
        self.reports.last()
    }
}

/// Index of the cheapest record; the earliest one wins a tie.
#[must_use]
pub fn lowest_price_index(records: &[ProductRecord]) -> Option<usize> {
    records
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &ProductRecord)>, (i, record)| match best {
            Some((_, current)) if current.price <= record.price => best,
            _ => Some((i, record)),
        })
        .map(|(i, _)| i)
}

/// Inputs for [`ReportStore::append_report`] besides the records.
#[derive(Debug, Clone)]
pub struct ReportMeta<'a> {
    pub name: &'a str,
    pub filters: SearchFilters,
    pub base_link: &'a str,
    pub currency: &'a str,
}

/// Owns the report directory. The sole writer of report histories.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{dir}/{name}.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidName`] for names that are empty or could
    /// escape the directory.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, ReportError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ReportError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Loads a history; a missing file is an empty history.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the file cannot be read and
    /// [`ReportError::Corrupt`] if it cannot be parsed.
    pub fn load(&self, name: &str) -> Result<ReportHistory, ReportError> {
        let path = self.path_for(name)?;
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ReportHistory::default()),
            Err(source) => {
                return Err(ReportError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        ReportHistory::from_json(&raw).map_err(|source| ReportError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    /// Builds a report for `records`, appends it to the named history and
    /// writes the whole history back.
    ///
    /// A corrupt history file is moved aside to `{name}.json.corrupt-<ts>` and
    /// a fresh history is started. The read-modify-write is not guarded
    /// against concurrent writers of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the history cannot be read, moved aside or
    /// written.
    pub fn append_report(
        &self,
        meta: &ReportMeta<'_>,
        records: Vec<ProductRecord>,
    ) -> Result<Report, ReportError> {
        let report = Report {
            title: meta.name.to_string(),
            date: Local::now().naive_local(),
            best_item: lowest_price_index(&records).map(|i| records[i].clone()),
            currency: meta.currency.to_string(),
            filters: meta.filters,
            base_link: meta.base_link.to_string(),
            products: records,
            extra: BTreeMap::new(),
        };

        let mut history = match self.load(meta.name) {
            Ok(history) => history,
            Err(ReportError::Corrupt { path, source }) => {
                let backup = set_aside(Path::new(&path))?;
                tracing::warn!(
                    path = %path,
                    backup = %backup.display(),
                    error = %source,
                    "report history unreadable; moved aside and starting a new one"
                );
                ReportHistory::default()
            }
            Err(e) => return Err(e),
        };

        history.reports.push(report.clone());
        self.write(meta.name, &history)?;
        tracing::info!(
            report = meta.name,
            reports = history.reports.len(),
            products = report.products.len(),
            "report appended"
        );
        Ok(report)
    }

    /// The most recent report of a history, if any.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn latest(&self, name: &str) -> Result<Option<Report>, ReportError> {
        Ok(self.load(name)?.reports.pop())
    }

    /// Writes a sibling temp file, then renames it over the target.
    fn write(&self, name: &str, history: &ReportHistory) -> Result<(), ReportError> {
        let path = self.path_for(name)?;
        let io_err = |source| ReportError::Io {
            path: path.display().to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;
        let json = serde_json::to_string_pretty(history)?;
        let tmp = self.dir.join(format!(".{name}.json.tmp"));
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;
        Ok(())
    }
}

/// Moves a corrupt file to `{path}.corrupt-<ts>`.
fn set_aside(path: &Path) -> Result<PathBuf, ReportError> {
    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3f");
    let mut backup = path.as_os_str().to_owned();
    backup.push(format!(".corrupt-{stamp}"));
    let backup = PathBuf::from(backup);
    std::fs::rename(path, &backup).map_err(|source| ReportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(backup)
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
