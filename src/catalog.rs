//! Catalog reader - turns raw storage keys into ordered backup artifacts

use crate::error::ParseKeyError;
use crate::models::BackupArtifact;
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use std::str::FromStr;
use tracing::{debug, warn};

/// Parsed backups of one listing, newest first
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub artifacts: Vec<BackupArtifact>,
    /// Keys that were not valid backup paths
    pub skipped: usize,
}

impl FromStr for BackupArtifact {
    type Err = ParseKeyError;

    /// Parse a `YYYY/MM/DD/<database>_<HHMMSS>.<ext>` key.
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = key.split('/').collect();
        let &[year, month, day, file_name] = segments.as_slice() else {
            return Err(ParseKeyError::SegmentCount(segments.len()));
        };

        let year = digits(year, 4, "year")?;
        let month = digits(month, 2, "month")?;
        let day = digits(day, 2, "day")?;

        let (database, time) = split_file_name(file_name)?;
        let hour = digits(&time[0..2], 2, "hour")?;
        let minute = digits(&time[2..4], 2, "minute")?;
        let second = digits(&time[4..6], 2, "second")?;

        let date = NaiveDate::from_ymd_opt(year as i32, month, day)
            .ok_or_else(|| ParseKeyError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))?;
        let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
            ParseKeyError::InvalidTime(format!("{hour:02}:{minute:02}:{second:02}"))
        })?;

        Ok(BackupArtifact {
            captured_at: Utc.from_utc_datetime(&date.and_time(time)),
            path: key.to_string(),
            database: database.to_string(),
        })
    }
}

/// Split `<database>_<HHMMSS>.<ext>` at the last `_` that starts a valid time suffix.
fn split_file_name(file_name: &str) -> Result<(&str, &str), ParseKeyError> {
    let bytes = file_name.as_bytes();
    let split = file_name
        .match_indices('_')
        .map(|(idx, _)| idx)
        .filter(|&idx| {
            let rest = &bytes[idx + 1..];
            rest.len() > 7 && rest[..6].iter().all(u8::is_ascii_digit) && rest[6] == b'.'
        })
        .last()
        .ok_or_else(|| ParseKeyError::FileName(file_name.to_string()))?;

    let database = &file_name[..split];
    if database.is_empty() {
        return Err(ParseKeyError::EmptyDatabase);
    }
    Ok((database, &file_name[split + 1..split + 7]))
}

fn digits(value: &str, len: usize, field: &'static str) -> Result<u32, ParseKeyError> {
    if value.len() != len || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseKeyError::Component {
            field,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| ParseKeyError::Component {
        field,
        value: value.to_string(),
    })
}

/// Parse every listed key and order the valid ones newest first.
///
/// Keys that are not backup paths are logged and dropped; they are never
/// kept or deleted. Equal capture instants are ordered by path, descending.
pub fn build_catalog<I, S>(keys: I) -> Catalog
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut catalog = Catalog::default();

    for key in keys {
        let key = key.as_ref();
        match key.parse::<BackupArtifact>() {
            Ok(artifact) => catalog.artifacts.push(artifact),
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping unrecognised backup key");
                catalog.skipped += 1;
            }
        }
    }

    catalog.artifacts.sort_unstable_by(|a, b| b.cmp(a));
    catalog.artifacts.dedup_by(|a, b| a.path == b.path);

    debug!(
        artifacts = catalog.artifacts.len(),
        skipped = catalog.skipped,
        "Catalog built"
    );
    catalog
}
