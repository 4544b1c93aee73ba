use std::path::Path;

use sasldb_core_store::{decode, CredentialWriter, LegacyReader, ReadError};
use sasldb_ll_store::{CursorMove, LLOpener};

use crate::{CancelFlag, MigrateError, MigrationEvent, MigrationReport, MigrationState};

type Observer<'a> = Box<dyn FnMut(&MigrationEvent<'_>) + 'a>;

/// Why the walk stopped before the cursor ran dry.
enum Stop {
    Failed(ReadError),
    Cancelled,
}

/// Drives one cursor over a legacy table and feeds a [`CredentialWriter`].
///
/// A `Migrator` can run several passes; each starts from [`MigrationState::Idle`]
/// semantics and ends in `Done` or `Aborted`.
pub struct Migrator<'a> {
    opener: &'a dyn LLOpener,
    cancel: Option<CancelFlag>,
    observer: Option<Observer<'a>>,
    state: MigrationState,
}

impl<'a> Migrator<'a> {
    pub fn new(opener: &'a dyn LLOpener) -> Self {
        Self {
            opener,
            cancel: None,
            observer: None,
            state: MigrationState::Idle,
        }
    }

    /// Stop at the next record boundary once `flag` is raised.
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Receive every [`MigrationEvent`] as it happens.
    pub fn on_event(mut self, observer: impl FnMut(&MigrationEvent<'_>) + 'a) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> MigrationState {
        self.state
    }

    /// Run one pass over `source`, writing every credential to `writer`.
    ///
    /// The source handle and cursor are released on every path out of this
    /// function. Records already handed to `writer` are never rolled back.
    pub fn migrate<W>(
        &mut self,
        source: impl AsRef<Path>,
        writer: &mut W,
    ) -> Result<MigrationReport, MigrateError>
    where
        W: CredentialWriter + ?Sized,
    {
        let source = source.as_ref();
        self.enter(MigrationState::Opening);

        let mut reader = match LegacyReader::open(self.opener, source) {
            Ok(reader) => reader,
            Err(e) => {
                self.enter(MigrationState::Aborted);
                self.emit(MigrationEvent::Aborted { error: &e });
                return Err(MigrateError::Open(e));
            }
        };

        if let Err(e) = reader.open_cursor() {
            self.enter(MigrationState::Aborted);
            self.emit(MigrationEvent::Aborted { error: &e });
            for close_error in reader.close() {
                self.emit(MigrationEvent::CloseFailed { error: &close_error });
            }
            return Err(MigrateError::Cursor(e));
        }

        log::info!("migrating credentials from {}", source.display());
        self.enter(MigrationState::Iterating);

        let mut report = MigrationReport::default();
        let stop = self.walk(&mut reader, writer, &mut report);

        self.enter(MigrationState::Closing);
        for close_error in reader.close() {
            report.close_errors += 1;
            self.emit(MigrationEvent::CloseFailed { error: &close_error });
        }

        match stop {
            None => {
                self.enter(MigrationState::Done);
                log::info!("migration of {} finished: {}", source.display(), report);
                Ok(report)
            }
            Some(Stop::Failed(e)) => {
                self.enter(MigrationState::Aborted);
                log::error!("migration of {} aborted: {}", source.display(), e);
                self.emit(MigrationEvent::Aborted { error: &e });
                Err(MigrateError::Iteration { source: e, report })
            }
            Some(Stop::Cancelled) => {
                self.enter(MigrationState::Aborted);
                log::warn!("migration of {} cancelled after {} entries", source.display(), report.seen);
                self.emit(MigrationEvent::Cancelled);
                Err(MigrateError::Cancelled { report })
            }
        }
    }

    fn walk<W>(
        &mut self,
        reader: &mut LegacyReader,
        writer: &mut W,
        report: &mut MigrationReport,
    ) -> Option<Stop>
    where
        W: CredentialWriter + ?Sized,
    {
        let mut step = CursorMove::First;

        loop {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                return Some(Stop::Cancelled);
            }

            let (key, value) = match reader.advance(step) {
                Ok(Some(entry)) => entry,
                Ok(None) => return None,
                Err(e) => return Some(Stop::Failed(e)),
            };
            step = CursorMove::Next;
            report.seen += 1;

            self.enter(MigrationState::Decoding);
            match decode(&key, &value) {
                Err(reason) => {
                    self.enter(MigrationState::Skipping);
                    log::warn!("skipping entry: {}", reason);
                    report.skipped_corrupt += 1;
                    self.emit(MigrationEvent::Skipped { key: &key, reason });
                }
                Ok(record) if record.is_mechanism_marker() => {
                    self.enter(MigrationState::Skipping);
                    log::debug!("skipping mechanism marker {}", record);
                    report.skipped_marker += 1;
                    self.emit(MigrationEvent::MarkerSkipped { record: &record });
                }
                Ok(record) => {
                    self.enter(MigrationState::Transforming);
                    self.emit(MigrationEvent::Converting { record: &record });
                    match writer.write_record(&record) {
                        Ok(()) => {
                            log::debug!("migrated {}", record);
                            report.migrated += 1;
                            self.emit(MigrationEvent::Migrated { record: &record });
                        }
                        Err(error) => {
                            log::warn!("failed to write {}: {}", record, error);
                            report.transform_failed += 1;
                            self.emit(MigrationEvent::WriteFailed {
                                record: &record,
                                error: &error,
                            });
                        }
                    }
                }
            }
            self.enter(MigrationState::Iterating);
        }
    }

    fn enter(&mut self, next: MigrationState) {
        debug_assert!(
            self.state.can_enter(next),
            "illegal migration transition {:?} -> {:?}",
            self.state,
            next
        );
        log::trace!("migration state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn emit(&mut self, event: MigrationEvent<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }
}

impl std::fmt::Debug for Migrator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migrator")
            .field("state", &self.state)
            .field("cancel", &self.cancel)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// One pass with no observer and no cancellation.
pub fn migrate<W>(
    opener: &dyn LLOpener,
    source: impl AsRef<Path>,
    writer: &mut W,
) -> Result<MigrationReport, MigrateError>
where
    W: CredentialWriter + ?Sized,
{
    Migrator::new(opener).migrate(source, writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sasldb_core_store::{LegacyRecord, WriteError};
    use sasldb_ll_store::{MemoryOpener, MemoryTable};
    use std::cell::RefCell;

    const SOURCE: &str = "/etc/sasldb2";

    #[derive(Default)]
    struct Recorder {
        written: Vec<LegacyRecord>,
        reject_authid: Option<&'static [u8]>,
    }

    impl CredentialWriter for Recorder {
        fn write_record(&mut self, record: &LegacyRecord) -> Result<(), WriteError> {
            if self.reject_authid == Some(record.authid()) {
                return Err(WriteError::BadParam {
                    message: "rejected".into(),
                });
            }
            self.written.push(record.clone());
            Ok(())
        }
    }

    fn opener(table: MemoryTable) -> MemoryOpener {
        MemoryOpener::new().with_table(SOURCE, table)
    }

    fn three_entry_table() -> MemoryTable {
        MemoryTable::from_entries([
            (&b"alice\0example.com\0userPassword"[..], &b"pw1"[..]),
            (&b"\0example.com\0cmusaslsecretPLAIN"[..], &b""[..]),
            (&b"bob\0\0tooNull\0extra"[..], &b"y"[..]),
        ])
    }

    #[test]
    fn migrates_real_records_and_skips_the_rest() {
        let opener = opener(three_entry_table());
        let mut writer = Recorder::default();

        let mut migrator = Migrator::new(&opener);
        let report = migrator.migrate(SOURCE, &mut writer).unwrap();

        assert_eq!(
            report,
            MigrationReport {
                seen: 3,
                migrated: 1,
                skipped_corrupt: 1,
                skipped_marker: 1,
                transform_failed: 0,
                close_errors: 0,
            }
        );
        assert!(report.is_consistent());
        assert_eq!(
            writer.written,
            vec![LegacyRecord::new(
                &b"alice"[..],
                &b"example.com"[..],
                &b"userPassword"[..],
                &b"pw1"[..]
            )]
        );
        assert_eq!(migrator.state(), MigrationState::Done);
    }

    #[test]
    fn empty_table_is_a_clean_noop() {
        let opener = opener(MemoryTable::new());
        let mut writer = Recorder::default();

        let report = migrate(&opener, SOURCE, &mut writer).unwrap();
        assert_eq!(report, MigrationReport::default());
        assert!(writer.written.is_empty());
    }

    #[test]
    fn handle_and_cursor_released_after_success() {
        let table = three_entry_table();
        let stats = table.stats();
        let opener = opener(table);

        migrate(&opener, SOURCE, &mut Recorder::default()).unwrap();

        assert_eq!(stats.cursors_opened(), 1);
        assert_eq!(stats.cursors_closed(), 1);
        assert_eq!(stats.tables_closed(), 1);
        // three entries plus the final empty advance
        assert_eq!(stats.advances(), 4);
    }

    #[test]
    fn write_failure_does_not_stop_the_walk() {
        let table = MemoryTable::from_entries([
            (&b"alice\0r\0userPassword"[..], &b"1"[..]),
            (&b"bob\0r\0userPassword"[..], &b"2"[..]),
            (&b"carol\0r\0userPassword"[..], &b"3"[..]),
        ]);
        let opener = opener(table);
        let mut writer = Recorder {
            reject_authid: Some(&b"bob"[..]),
            ..Default::default()
        };

        let report = migrate(&opener, SOURCE, &mut writer).unwrap();
        assert_eq!(report.migrated, 2);
        assert_eq!(report.transform_failed, 1);
        assert!(report.is_consistent());
        let authids: Vec<_> = writer.written.iter().map(|r| r.authid().to_vec()).collect();
        assert_eq!(authids, vec![b"alice".to_vec(), b"carol".to_vec()]);
    }

    #[test]
    fn iteration_failure_keeps_written_records_and_reports() {
        let table = MemoryTable::from_entries([
            (&b"alice\0r\0userPassword"[..], &b"1"[..]),
            (&b"bob\0r\0userPassword"[..], &b"2"[..]),
            (&b"carol\0r\0userPassword"[..], &b"3"[..]),
        ])
        .fail_advance_at(2);
        let stats = table.stats();
        let opener = opener(table);
        let mut writer = Recorder::default();
        let mut migrator = Migrator::new(&opener);

        let err = migrator.migrate(SOURCE, &mut writer).unwrap_err();
        match &err {
            MigrateError::Iteration { report, .. } => {
                assert_eq!(report.seen, 2);
                assert_eq!(report.migrated, 2);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(writer.written.len(), 2);
        assert_eq!(stats.cursors_closed(), 1);
        assert_eq!(stats.tables_closed(), 1);
        assert_eq!(migrator.state(), MigrationState::Aborted);
    }

    #[test]
    fn open_failure_touches_nothing() {
        let opener = MemoryOpener::new();
        let mut writer = Recorder::default();

        let err = migrate(&opener, "/missing/sasldb2", &mut writer).unwrap_err();
        assert!(matches!(err, MigrateError::Open(ReadError::Open { .. })));
        assert!(err.to_string().contains("/missing/sasldb2"));
        assert!(writer.written.is_empty());
    }

    #[test]
    fn cursor_failure_releases_handle() {
        let table = three_entry_table().fail_cursor();
        let stats = table.stats();
        let opener = opener(table);

        let err = migrate(&opener, SOURCE, &mut Recorder::default()).unwrap_err();
        assert!(matches!(err, MigrateError::Cursor(_)));
        assert!(err.to_string().starts_with("Making cursor failure"));
        assert_eq!(stats.tables_closed(), 1);
    }

    #[test]
    fn close_failures_are_counted_not_fatal() {
        let table = three_entry_table().fail_cursor_close().fail_table_close();
        let opener = opener(table);

        let report = migrate(&opener, SOURCE, &mut Recorder::default()).unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(report.close_errors, 2);
    }

    #[test]
    fn cancellation_stops_at_record_boundary() {
        let opener = opener(three_entry_table());
        let flag = CancelFlag::new();
        let trigger = flag.clone();
        let mut writer = Recorder::default();

        let mut migrator = Migrator::new(&opener)
            .with_cancel(flag)
            .on_event(move |event| {
                if let MigrationEvent::Migrated { .. } = event {
                    trigger.cancel();
                }
            });

        let err = migrator.migrate(SOURCE, &mut writer).unwrap_err();
        let report = err.partial_report().copied().unwrap();
        assert!(matches!(err, MigrateError::Cancelled { .. }));
        assert_eq!(report.seen, 1);
        assert_eq!(report.migrated, 1);
        assert_eq!(writer.written.len(), 1);
    }

    #[test]
    fn events_arrive_in_walk_order() {
        let opener = opener(three_entry_table());
        let log = RefCell::new(Vec::new());

        let mut migrator = Migrator::new(&opener).on_event(|event| {
            let tag = match event {
                MigrationEvent::Converting { .. } => "converting",
                MigrationEvent::Migrated { .. } => "migrated",
                MigrationEvent::Skipped { .. } => "skipped",
                MigrationEvent::MarkerSkipped { .. } => "marker",
                MigrationEvent::WriteFailed { .. } => "write-failed",
                MigrationEvent::CloseFailed { .. } => "close-failed",
                MigrationEvent::Aborted { .. } => "aborted",
                MigrationEvent::Cancelled => "cancelled",
            };
            log.borrow_mut().push(tag);
        });
        migrator.migrate(SOURCE, &mut Recorder::default()).unwrap();
        drop(migrator);

        assert_eq!(
            log.into_inner(),
            vec!["converting", "migrated", "marker", "skipped"]
        );
    }

    #[test]
    fn migrator_can_run_twice() {
        let opener = opener(three_entry_table());
        let mut migrator = Migrator::new(&opener);

        let first = migrator.migrate(SOURCE, &mut Recorder::default()).unwrap();
        let second = migrator.migrate(SOURCE, &mut Recorder::default()).unwrap();
        assert_eq!(first, second);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use sasldb_core_store::{LegacyRecord, WriteError};
    use sasldb_ll_store::{MemoryOpener, MemoryTable};

    struct Count(usize);

    impl CredentialWriter for Count {
        fn write_record(&mut self, _: &LegacyRecord) -> Result<(), WriteError> {
            self.0 += 1;
            Ok(())
        }
    }

    fn key_part() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(prop_oneof![Just(0u8), Just(b'a'), Just(b'z')], 0..6)
    }

    proptest! {
        #[test]
        fn every_entry_accounted_once(
            entries in prop::collection::vec((key_part(), key_part()), 0..40)
        ) {
            let expected = entries
                .iter()
                .filter(|(key, _)| {
                    key.iter().filter(|&&b| b == 0).count() == 2 && key[0] != 0
                })
                .count();

            let opener = MemoryOpener::new()
                .with_table("/db", MemoryTable::from_entries(entries.clone()));
            let mut writer = Count(0);
            let report = migrate(&opener, "/db", &mut writer).unwrap();

            prop_assert_eq!(report.seen, entries.len());
            prop_assert!(report.is_consistent());
            prop_assert_eq!(report.migrated, expected);
            prop_assert_eq!(writer.0, expected);
        }
    }
}
