use std::fmt;

use serde::Serialize;

/// Counts gathered over one migration pass.
///
/// Every entry the cursor yields lands in exactly one of `migrated`,
/// `skipped_corrupt`, `skipped_marker` and `transform_failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Entries yielded by the cursor.
    pub seen: usize,
    pub migrated: usize,
    /// Entries whose composite key was malformed.
    pub skipped_corrupt: usize,
    /// Mechanism markers (empty authid).
    pub skipped_marker: usize,
    /// Records the destination refused.
    pub transform_failed: usize,
    /// Cursor or handle close failures. Informational only.
    pub close_errors: usize,
}

impl MigrationReport {
    /// True when every seen entry is accounted for exactly once.
    pub fn is_consistent(&self) -> bool {
        self.seen == self.migrated + self.skipped_corrupt + self.skipped_marker + self.transform_failed
    }

    /// True when nothing was skipped as corrupt and no write failed.
    pub fn is_clean(&self) -> bool {
        self.skipped_corrupt == 0 && self.transform_failed == 0
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} entries seen: {} migrated, {} corrupt, {} mechanism markers, {} failed writes",
            self.seen, self.migrated, self.skipped_corrupt, self.skipped_marker, self.transform_failed
        )?;
        if self.close_errors > 0 {
            write!(f, " ({} close errors)", self.close_errors)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consistency() {
        let report = MigrationReport {
            seen: 4,
            migrated: 1,
            skipped_corrupt: 1,
            skipped_marker: 1,
            transform_failed: 1,
            close_errors: 0,
        };
        assert!(report.is_consistent());
        assert!(!report.is_clean());

        let report = MigrationReport {
            seen: 5,
            ..report
        };
        assert!(!report.is_consistent());
    }

    #[test]
    fn display_mentions_close_errors_only_when_present() {
        let mut report = MigrationReport {
            seen: 1,
            migrated: 1,
            ..Default::default()
        };
        assert!(!report.to_string().contains("close"));
        report.close_errors = 2;
        assert!(report.to_string().contains("2 close errors"));
    }

    #[test]
    fn serializes_counts() {
        let report = MigrationReport {
            seen: 3,
            migrated: 1,
            skipped_corrupt: 1,
            skipped_marker: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["migrated"], 1);
        assert_eq!(json["skipped_marker"], 1);
        assert_eq!(json["close_errors"], 0);
    }
}
