use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;

use sasldb_core_store::CredentialWriter;
use sasldb_hash_store::HashFileOpener;
use sasldb_migrate::{CancelFlag, MigrateError, MigrationEvent, MigrationReport, Migrator};
use sasldb_store::SaslDb;
use serde::Serialize;

use crate::{CliError, Config, ReportFormat};

const BANNER: &str = "\
This program will take the sasldb file specified as the
first argument and convert it to the new sasldb format
given as the second argument. Every credential is copied;
the old file is left untouched.

Mechanism marker entries are not converted and entries
with malformed keys are reported and skipped.

Press return to continue.
";

#[derive(Serialize)]
struct Summary<'a> {
    source: &'a Path,
    destination: &'a Path,
    status: &'static str,
    #[serde(flatten)]
    report: &'a MigrationReport,
}

/// Run one conversion.
///
/// `input` answers the confirmation prompt, `out` receives progress and the
/// summary, `err` receives warnings. Raising `cancel` stops the walk at the
/// next record; whatever was converted so far stays in the destination.
pub fn convert(
    config: &Config,
    cancel: &CancelFlag,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<MigrationReport, CliError> {
    preflight(config)?;

    let mut db = SaslDb::open(&config.destination).map_err(|source| CliError::Destination {
        path: config.destination.clone(),
        source,
    })?;
    CredentialWriter::check(&mut db).map_err(CliError::NotReady)?;

    if !config.assume_yes {
        out.write_all(BANNER.as_bytes())?;
        out.flush()?;
        let mut answer = String::new();
        input.read_line(&mut answer)?;
    }

    log::info!(
        "converting {} into {}",
        config.source.display(),
        config.destination.display()
    );
    let opener = HashFileOpener::new();
    let mut output_error: Option<io::Error> = None;
    let outcome = {
        let mut migrator = Migrator::new(&opener)
            .with_cancel(cancel.clone())
            .on_event(|event| {
                if output_error.is_none() {
                    if let Err(e) = show_event(event, out, err) {
                        log::error!("cannot write progress, stopping: {}", e);
                        cancel.cancel();
                        output_error = Some(e);
                    }
                }
            });
        migrator.migrate(&config.source, &mut db)
    };

    let (report, failure) = match outcome {
        Ok(report) => (report, None),
        Err(e) => match e.partial_report().copied() {
            Some(report) => (report, Some(e)),
            None => return Err(e.into()),
        },
    };

    // Whatever reached the destination is kept, even after an abort.
    db.sync().map_err(|source| CliError::Sync {
        path: config.destination.clone(),
        source,
    })?;

    if let Some(e) = output_error {
        log::warn!("{} records converted before output failed", report.migrated);
        return Err(e.into());
    }

    let status = match &failure {
        None if report.is_clean() => "ok",
        None => "warnings",
        Some(MigrateError::Cancelled { .. }) => "cancelled",
        Some(_) => "aborted",
    };
    print_summary(config, status, &report, out)?;

    match failure {
        None => Ok(report),
        Some(e) => Err(e.into()),
    }
}

fn preflight(config: &Config) -> Result<(), CliError> {
    if config.source == config.destination || same_file(&config.source, &config.destination) {
        return Err(CliError::SamePath);
    }
    if config.destination.exists() {
        return Err(CliError::DestinationExists(config.destination.clone()));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn show_event(
    event: &MigrationEvent<'_>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<()> {
    match event {
        MigrationEvent::Converting { record } => {
            write!(out, "Converting: {}...", record)?;
            out.flush()
        }
        MigrationEvent::Migrated { .. } => writeln!(out, "ok"),
        MigrationEvent::WriteFailed { record, error } => {
            writeln!(out, "failed")?;
            writeln!(err, "Warning: could not convert {}: {}", record, error)
        }
        MigrationEvent::Skipped { key, reason } => writeln!(
            err,
            "Warning: skipping entry \"{}\": {}",
            key.escape_ascii(),
            reason
        ),
        MigrationEvent::CloseFailed { error } => writeln!(err, "Warning: {}", error),
        MigrationEvent::MarkerSkipped { .. }
        | MigrationEvent::Aborted { .. }
        | MigrationEvent::Cancelled => Ok(()),
    }
}

fn print_summary(
    config: &Config,
    status: &'static str,
    report: &MigrationReport,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    match config.report {
        ReportFormat::Text => writeln!(out, "{}", report)?,
        ReportFormat::Json => {
            let summary = Summary {
                source: &config.source,
                destination: &config.destination,
                status,
                report,
            };
            serde_json::to_writer_pretty(&mut *out, &summary)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
