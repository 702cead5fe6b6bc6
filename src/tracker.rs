use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::csv_export::{export_to_dir, CsvQuoting, ExportError};
use crate::format::{is_valid_time_format, DEFAULT_TIME_FORMAT};
use crate::log_store::{LogStore, StoreError};
use crate::record::{Log, LogRecord};
use crate::runtime::DisplayTick;
use crate::session::{ActiveSession, SessionController};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub time_format: String,
    pub tick_interval: Duration,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl From<&Config> for TrackerSettings {
    fn from(cfg: &Config) -> Self {
        let time_format = if is_valid_time_format(&cfg.time_format) {
            cfg.time_format.clone()
        } else {
            warn!(format = %cfg.time_format, "invalid time format, using {DEFAULT_TIME_FORMAT}");
            DEFAULT_TIME_FORMAT.to_string()
        };
        Self {
            time_format,
            tick_interval: Duration::from_millis(cfg.tick_millis.max(1)),
        }
    }
}

/// Set when the stored log could not be read at startup, was moved to `backup`,
/// and an empty log was used instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub backup: PathBuf,
    pub reason: String,
}

/// The time tracker: one optional running session plus the persisted log.
/// Every change to the log is written through the store in full.
pub struct Tracker {
    store: Box<dyn LogStore>,
    clock: Box<dyn Clock>,
    session: SessionController,
    log: Log,
    tick: DisplayTick,
    time_format: String,
    recovery: Option<Recovery>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("session", &self.session)
            .field("log", &self.log)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Tracker {
    /// Loads the stored log. A malformed log that the store moved aside is
    /// replaced by an empty one and reported through [`Tracker::recovery`].
    /// A malformed log still in place, and any other store error, is returned
    /// so nothing overwrites it.
    #[instrument(skip_all)]
    pub fn open<S, C>(store: S, clock: C, settings: TrackerSettings) -> Result<Self, StoreError>
    where
        S: LogStore + 'static,
        C: Clock,
    {
        let (records, recovery) = match store.load() {
            Ok(records) => (records, None),
            Err(StoreError::Malformed {
                backup: Some(backup),
                source,
            }) => {
                warn!(error = %source, backup = %backup.display(), "stored log is malformed, starting empty");
                (
                    Vec::new(),
                    Some(Recovery {
                        backup,
                        reason: source.to_string(),
                    }),
                )
            }
            Err(e) => return Err(e),
        };
        info!(count = records.len(), "log loaded");

        Ok(Self {
            store: Box::new(store),
            clock: Box::new(clock),
            session: SessionController::new(),
            log: Log::from_records(records),
            tick: DisplayTick::new(settings.tick_interval),
            time_format: if is_valid_time_format(&settings.time_format) {
                settings.time_format
            } else {
                DEFAULT_TIME_FORMAT.to_string()
            },
            recovery,
        })
    }

    /// Starts a session. Ignored when the name is empty or a task is already running.
    pub fn start(&mut self, task_name: &str, description: &str) -> bool {
        let now = self.clock.now();
        if !self.session.start(task_name, description, now) {
            return false;
        }
        self.tick.arm(Instant::now());
        info!(task = task_name, "session started");
        true
    }

    /// Stops the running session and prepends its record to the log, with
    /// `description` as it reads at stop time. `Ok(None)` when nothing was
    /// running. The record stays in memory even when persisting it fails.
    pub fn stop(&mut self, description: &str) -> Result<Option<LogRecord>, StoreError> {
        let now = self.clock.now();
        let Some(done) = self.session.stop(description, now) else {
            return Ok(None);
        };
        self.tick.disarm();

        let record = done.into_record(&self.time_format);
        info!(task = %record.task, seconds = record.seconds, "session stopped");
        self.log.prepend(record.clone());
        self.persist()?;
        Ok(Some(record))
    }

    /// Refreshes the displayed elapsed time of the running session.
    pub fn on_tick(&mut self) -> u64 {
        let now = self.clock.now();
        self.session.refresh_elapsed(now)
    }

    /// Empties the log and removes it from storage. Needs `confirmed`;
    /// returns whether the log was cleared.
    pub fn clear(&mut self, confirmed: bool) -> Result<bool, StoreError> {
        if !confirmed {
            return Ok(false);
        }
        // Storage first, so a failed removal leaves the log on screen.
        self.store.clear()?;
        let count = self.log.len();
        self.log.clear();
        info!(count, "log cleared");
        Ok(true)
    }

    pub fn export_csv(&self, dir: &Path, quoting: CsvQuoting) -> Result<PathBuf, ExportError> {
        let path = export_to_dir(&self.log, dir, quoting)?;
        info!(path = %path.display(), rows = self.log.len(), "csv exported");
        Ok(path)
    }

    /// Cancels the display tick. A running session is not committed.
    pub fn shutdown(&mut self) {
        self.tick.disarm();
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.save(self.log.records()).map_err(|e| {
            tracing::error!(error = %e, "failed to persist log");
            e
        })
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.session.active()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_active()
    }

    pub fn elapsed(&self) -> u64 {
        self.session.elapsed()
    }

    pub fn total_seconds(&self) -> u64 {
        self.log.total_seconds()
    }

    pub fn recovery(&self) -> Option<&Recovery> {
        self.recovery.as_ref()
    }

    pub fn tick_mut(&mut self) -> &mut DisplayTick {
        &mut self.tick
    }

    pub fn can_start(&self, task_name: &str) -> bool {
        !task_name.is_empty() && !self.is_running()
    }

    pub fn can_stop(&self) -> bool {
        self.is_running()
    }

    pub fn can_export(&self) -> bool {
        !self.log.is_empty()
    }

    pub fn can_clear(&self) -> bool {
        !self.log.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::log_store::{JsonFileLogStore, MemoryLogStore};
    use chrono::{Local, TimeZone};
    use tempfile::tempdir;

    fn clock() -> ManualClock {
        ManualClock::new(Local.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap())
    }

    fn open(store: &MemoryLogStore, clock: &ManualClock) -> Tracker {
        Tracker::open(store.clone(), clock.clone(), TrackerSettings::default()).unwrap()
    }

    #[test]
    fn start_then_stop_records_one_entry() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);

        assert!(tracker.start("Acme", "design work"));
        assert!(tracker.tick_mut().is_armed());
        clock.advance(chrono::Duration::seconds(65));
        let record = tracker.stop("design work").unwrap().unwrap();

        assert_eq!(record.task, "Acme");
        assert_eq!(record.description, "design work");
        assert_eq!(record.duration, "0h 1m");
        assert_eq!(record.seconds, 65);
        assert_eq!(record.start, "09:00:00");
        assert_eq!(record.end, "09:01:05");
        assert_eq!(tracker.log().len(), 1);
        assert!(tracker.active().is_none());
        assert!(!tracker.tick_mut().is_armed());
    }

    #[test]
    fn start_is_noop_on_empty_name_or_running() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);

        assert!(!tracker.start("", "x"));
        assert!(tracker.active().is_none());
        assert!(!tracker.tick_mut().is_armed());

        tracker.start("Acme", "");
        assert!(!tracker.start("Globex", ""));
        assert_eq!(tracker.active().unwrap().task_name, "Acme");
        assert!(tracker.log().is_empty());
        assert_eq!(store.raw(), None);
    }

    #[test]
    fn stop_is_noop_when_idle() {
        let store = MemoryLogStore::new();
        let mut tracker = open(&store, &clock());
        assert_eq!(tracker.stop("").unwrap(), None);
        assert!(tracker.log().is_empty());
        assert_eq!(store.raw(), None);
    }

    #[test]
    fn every_stop_rewrites_store_newest_first() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);

        tracker.start("first", "");
        clock.advance(chrono::Duration::seconds(10));
        tracker.stop("").unwrap();
        tracker.start("second", "");
        clock.advance(chrono::Duration::seconds(20));
        tracker.stop("").unwrap();

        let stored = store.load().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].task, "second");
        assert_eq!(stored[1].task, "first");
        assert_eq!(tracker.total_seconds(), 30);
    }

    #[test]
    fn reload_yields_equal_log() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);
        tracker.start("Acme", "design work");
        clock.advance(chrono::Duration::seconds(3600));
        tracker.stop("design work").unwrap();

        let reloaded = open(&store, &clock);
        assert_eq!(reloaded.log(), tracker.log());
    }

    #[test]
    fn reload_from_file_yields_equal_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.json");
        let clock = clock();
        let mut tracker = Tracker::open(
            JsonFileLogStore::with_path(&path),
            clock.clone(),
            TrackerSettings::default(),
        )
        .unwrap();
        tracker.start("Acme", "design work");
        clock.advance(chrono::Duration::seconds(90));
        tracker.stop("design work").unwrap();

        let reloaded = Tracker::open(
            JsonFileLogStore::with_path(&path),
            clock,
            TrackerSettings::default(),
        )
        .unwrap();
        assert_eq!(reloaded.log(), tracker.log());
    }

    #[test]
    fn total_of_two_records() {
        let store = MemoryLogStore::with_raw(
            r#"[{"task":"a","description":"","start":"09:00:00","end":"10:00:00","duration":"1h 0m","seconds":3600},
                {"task":"b","description":"","start":"10:00:00","end":"10:30:00","duration":"0h 30m","seconds":1800},
                {"task":"c","description":"","start":"11:00:00","end":"11:05:00","duration":"0h 5m"}]"#,
        );
        let tracker = open(&store, &clock());
        assert_eq!(tracker.total_seconds(), 5400);
        assert_eq!(crate::format::format_duration(tracker.total_seconds()), "1h 30m");
    }

    #[test]
    fn clear_needs_confirmation() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);
        tracker.start("Acme", "");
        tracker.stop("").unwrap();

        assert!(!tracker.clear(false).unwrap());
        assert_eq!(tracker.log().len(), 1);
        assert!(store.raw().is_some());
    }

    #[test]
    fn clear_removes_persisted_entry() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);
        tracker.start("Acme", "");
        tracker.stop("").unwrap();

        assert!(tracker.clear(true).unwrap());
        assert!(tracker.log().is_empty());
        assert_eq!(store.raw(), None);

        let reloaded = open(&store, &clock);
        assert!(reloaded.log().is_empty());
    }

    #[test]
    fn malformed_file_starts_empty_with_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, b"{broken").unwrap();

        let tracker = Tracker::open(
            JsonFileLogStore::with_path(&path),
            clock(),
            TrackerSettings::default(),
        )
        .unwrap();
        assert!(tracker.log().is_empty());
        let recovery = tracker.recovery().unwrap();
        assert_eq!(std::fs::read(&recovery.backup).unwrap(), b"{broken");
    }

    #[test]
    fn malformed_log_left_in_place_refuses_to_open() {
        let store = MemoryLogStore::with_raw("{broken");
        let res = Tracker::open(store.clone(), clock(), TrackerSettings::default());
        assert!(matches!(res, Err(StoreError::Malformed { backup: None, .. })));
        assert_eq!(store.raw().as_deref(), Some("{broken"));
    }

    #[test]
    fn description_is_taken_at_stop() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);

        tracker.start("Acme", "draft");
        clock.advance(chrono::Duration::seconds(30));
        let record = tracker.stop("design work, final").unwrap().unwrap();

        assert_eq!(record.task, "Acme");
        assert_eq!(record.description, "design work, final");
        assert_eq!(store.load().unwrap()[0].description, "design work, final");
    }

    #[test]
    fn invalid_time_format_falls_back_on_stop() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let settings = TrackerSettings {
            time_format: "%Q".into(),
            ..TrackerSettings::default()
        };
        let mut tracker = Tracker::open(store, clock.clone(), settings).unwrap();

        tracker.start("Acme", "");
        clock.advance(chrono::Duration::seconds(65));
        let record = tracker.stop("").unwrap().unwrap();
        assert_eq!(record.start, "09:00:00");
        assert_eq!(record.end, "09:01:05");
    }

    #[test]
    fn invalid_time_format_in_config_uses_default() {
        let cfg = Config {
            time_format: "%H:%Q".into(),
            ..Config::default()
        };
        assert_eq!(TrackerSettings::from(&cfg).time_format, DEFAULT_TIME_FORMAT);
    }

    /// Store whose removal always fails.
    struct StuckStore(MemoryLogStore);

    impl LogStore for StuckStore {
        fn load(&self) -> Result<Vec<LogRecord>, StoreError> {
            self.0.load()
        }

        fn save(&self, records: &[LogRecord]) -> Result<(), StoreError> {
            self.0.save(records)
        }

        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: PathBuf::from("log.json"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    #[test]
    fn failed_clear_keeps_log() {
        let inner = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = Tracker::open(
            StuckStore(inner.clone()),
            clock.clone(),
            TrackerSettings::default(),
        )
        .unwrap();
        tracker.start("Acme", "");
        clock.advance(chrono::Duration::seconds(5));
        tracker.stop("").unwrap();

        assert!(tracker.clear(true).is_err());
        assert_eq!(tracker.log().len(), 1);
        assert!(tracker.can_clear());
        assert!(inner.raw().is_some());
    }

    #[test]
    fn tick_refreshes_elapsed_only_while_running() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);

        assert_eq!(tracker.on_tick(), 0);
        tracker.start("Acme", "");
        clock.advance(chrono::Duration::milliseconds(4_200));
        assert_eq!(tracker.on_tick(), 4);
        assert_eq!(tracker.elapsed(), 4);
        assert_eq!(store.raw(), None);

        tracker.stop("").unwrap();
        assert_eq!(tracker.elapsed(), 0);
    }

    #[test]
    fn enablement_rules() {
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);

        assert!(!tracker.can_start(""));
        assert!(tracker.can_start("Acme"));
        assert!(!tracker.can_stop());
        assert!(!tracker.can_export());
        assert!(!tracker.can_clear());

        tracker.start("Acme", "");
        assert!(!tracker.can_start("Acme"));
        assert!(tracker.can_stop());

        tracker.stop("").unwrap();
        assert!(tracker.can_export());
        assert!(tracker.can_clear());
    }

    #[test]
    fn export_writes_csv() {
        let dir = tempdir().unwrap();
        let store = MemoryLogStore::new();
        let clock = clock();
        let mut tracker = open(&store, &clock);

        assert!(matches!(
            tracker.export_csv(dir.path(), CsvQuoting::Necessary),
            Err(ExportError::EmptyLog)
        ));

        tracker.start("Acme", "design work");
        clock.advance(chrono::Duration::seconds(65));
        tracker.stop("design work").unwrap();

        let path = tracker
            .export_csv(dir.path(), CsvQuoting::Necessary)
            .unwrap();
        let contents = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            contents,
            "Commessa,Descrizione,Inizio,Fine,Durata\nAcme,design work,09:00:00,09:01:05,0h 1m\n"
        );
    }

    #[test]
    fn shutdown_disarms_tick_without_committing() {
        let store = MemoryLogStore::new();
        let mut tracker = open(&store, &clock());
        tracker.start("Acme", "");
        tracker.shutdown();
        assert!(!tracker.tick_mut().is_armed());
        assert!(tracker.log().is_empty());
    }

    #[test]
    fn settings_from_config() {
        let cfg = Config {
            time_format: "%H:%M".into(),
            tick_millis: 250,
            ..Config::default()
        };
        let settings = TrackerSettings::from(&cfg);
        assert_eq!(settings.time_format, "%H:%M");
        assert_eq!(settings.tick_interval, Duration::from_millis(250));
    }
}
