use std::sync::mpsc::{self, Receiver, RecvError, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TrackerEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait TrackerEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackerEvent, RecvTimeoutError>;

    /// Block until an event arrives or the source is gone.
    fn recv(&self) -> Result<TrackerEvent, RecvError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<TrackerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                // Windows reports releases too; only presses edit the form.
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    if tx.send(TrackerEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(TrackerEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "terminal event reader stopped");
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn recv(&self) -> Result<TrackerEvent, RecvError> {
        self.rx.recv()
    }
}

/// Periodic display refresh bound to a running session. Armed on start,
/// disarmed on stop; while disarmed no ticks are produced at all.
#[derive(Clone, Copy, Debug)]
pub struct DisplayTick {
    interval: Duration,
    deadline: Option<Instant>,
}

impl DisplayTick {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.interval);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time left before the next tick, `None` when disarmed.
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Schedules the following tick. A tick that fell behind is not replayed.
    pub fn fire(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline {
            let mut next = deadline + self.interval;
            if next <= now {
                next = now + self.interval;
            }
            self.deadline = Some(next);
        }
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<TrackerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TrackerEvent>) -> Self {
        Self { rx }
    }
}

impl TrackerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn recv(&self) -> Result<TrackerEvent, RecvError> {
        self.rx.recv()
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: TrackerEventSource> {
    event_source: E,
}

impl<E: TrackerEventSource> Runner<E> {
    pub fn new(event_source: E) -> Self {
        Self { event_source }
    }

    /// Returns the next event, or `Tick` when the armed tick comes due first.
    /// `None` once the event source is gone.
    pub fn step(&self, tick: &mut DisplayTick) -> Option<TrackerEvent> {
        match tick.time_until(Instant::now()) {
            Some(wait) => match self.event_source.recv_timeout(wait) {
                Ok(ev) => Some(ev),
                Err(RecvTimeoutError::Timeout) => {
                    tick.fire(Instant::now());
                    Some(TrackerEvent::Tick)
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => self.event_source.recv().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_when_armed() {
        let (_tx, rx) = mpsc::channel();
        let runner = Runner::new(TestEventSource::new(rx));
        let mut tick = DisplayTick::new(Duration::from_millis(1));
        tick.arm(Instant::now());

        match runner.step(&mut tick) {
            Some(TrackerEvent::Tick) => {}
            other => panic!("expected Tick, got {:?}", other),
        }
        assert!(tick.is_armed());
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(TrackerEvent::Resize).unwrap();
        let runner = Runner::new(TestEventSource::new(rx));
        let mut tick = DisplayTick::new(Duration::from_millis(10));
        tick.arm(Instant::now());

        match runner.step(&mut tick) {
            Some(TrackerEvent::Resize) => {}
            other => panic!("expected Resize, got {:?}", other),
        }
    }

    #[test]
    fn disarmed_tick_never_fires() {
        let (tx, rx) = mpsc::channel();
        tx.send(TrackerEvent::Resize).unwrap();
        drop(tx);
        let runner = Runner::new(TestEventSource::new(rx));
        let mut tick = DisplayTick::new(Duration::from_millis(1));

        assert!(matches!(runner.step(&mut tick), Some(TrackerEvent::Resize)));
        // Disarmed and the source is gone: no tick is synthesized.
        assert!(runner.step(&mut tick).is_none());
    }

    #[test]
    fn time_until_tracks_deadline() {
        let now = Instant::now();
        let mut tick = DisplayTick::new(Duration::from_secs(1));
        assert_eq!(tick.time_until(now), None);

        tick.arm(now);
        assert_eq!(tick.time_until(now), Some(Duration::from_secs(1)));
        assert_eq!(
            tick.time_until(now + Duration::from_secs(5)),
            Some(Duration::ZERO)
        );

        tick.disarm();
        assert_eq!(tick.time_until(now), None);
    }

    #[test]
    fn fire_skips_missed_ticks() {
        let now = Instant::now();
        let mut tick = DisplayTick::new(Duration::from_secs(1));
        tick.arm(now);

        tick.fire(now + Duration::from_secs(1));
        assert_eq!(
            tick.time_until(now + Duration::from_secs(1)),
            Some(Duration::from_secs(1))
        );

        let late = now + Duration::from_secs(10);
        tick.fire(late);
        assert_eq!(tick.time_until(late), Some(Duration::from_secs(1)));
    }
}
