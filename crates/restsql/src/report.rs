//! Outcome envelope for write operations.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error carried inside a [`Report`].
///
/// Only the message goes over the wire; the code drives the response status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportError {
    #[serde(skip)]
    pub code: u16,
    pub message: String,
}

impl From<&Error> for ReportError {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Counts for one write request.
///
/// `ok + failed` is the number of top-level write attempts; `affected` is the
/// sum of rows touched across all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Report {
    pub affected: u64,
    pub ok: u64,
    pub failed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportError>,
}

impl Report {
    /// One successful attempt touching `affected` rows.
    pub fn success(affected: u64) -> Self {
        Self {
            affected,
            ok: 1,
            ..Self::default()
        }
    }

    /// One failed attempt.
    pub fn failure(err: &Error) -> Self {
        Self {
            failed: 1,
            error: Some(err.into()),
            ..Self::default()
        }
    }

    /// Fold any write outcome into a report the HTTP layer can send as-is.
    pub fn from_result(result: Result<Report>) -> Self {
        match result {
            Ok(report) => report,
            Err(err) => Self::failure(&err),
        }
    }

    /// Add another report's counts to this one. The latest error wins.
    pub fn absorb(&mut self, other: Report) {
        self.affected += other.affected;
        self.ok += other.ok;
        self.failed += other.failed;
        if other.error.is_some() {
            self.error = other.error;
        }
    }

    /// Count one more attempt from its result.
    pub fn record(&mut self, result: Result<Report>) {
        self.absorb(Self::from_result(result));
    }

    pub fn attempts(&self) -> u64 {
        self.ok + self.failed
    }

    pub fn is_ok(&self) -> bool {
        self.failed == 0 && self.error.is_none()
    }

    /// Status code for the response: the error's, or 200.
    pub fn code(&self) -> u16 {
        self.error.as_ref().map_or(200, |e| e.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_add_up_across_attempts() {
        let mut report = Report::default();
        report.record(Ok(Report::success(1)));
        report.record(Err(Error::not_found("gone")));
        report.record(Ok(Report::success(0)));
        assert_eq!(report.ok, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.attempts(), 3);
        assert_eq!(report.affected, 1);
        assert_eq!(report.code(), 404);
        assert!(!report.is_ok());
    }

    #[test]
    fn serializes_with_service_field_names() {
        let json = serde_json::to_value(Report::success(2)).unwrap();
        assert_eq!(json, serde_json::json!({"Affected": 2, "Ok": 1, "Failed": 0}));

        let json = serde_json::to_value(Report::failure(&Error::malformed_predicate("bad"))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Affected": 0,
                "Ok": 0,
                "Failed": 1,
                "Error": {"Message": "Malformed predicate: bad"}
            })
        );
    }
}
