use prize_wheel_shared::constants::{CELEBRATION_DURATION_MS, COUNTDOWN_TICK_MS, SPIN_DURATION_MS};
use prize_wheel_shared::display::spin_rotation;
use prize_wheel_shared::{ForceOutcome, IndexSource, PendingSpin, SpinAllocator, SpinResult, WheelError};
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Time between deciding a spin and revealing it.
    pub spin_delay: Duration,
    pub celebration: Duration,
    pub countdown_tick: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            spin_delay: Duration::from_millis(SPIN_DURATION_MS),
            celebration: Duration::from_millis(CELEBRATION_DURATION_MS),
            countdown_tick: Duration::from_millis(COUNTDOWN_TICK_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Spin,
    NextSession,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WheelEvent {
    SessionStarted { session: u32, epoch: u64, segments: usize },
    SpinStarted { spin_id: u64, target: usize, rotation: f64 },
    SpinRevealed(SpinResult),
    SpinRefused { reason: String, blocking: bool },
    /// A started spin that will never be revealed.
    SpinCancelled { spin_id: u64 },
    Countdown { session: u32, remaining: String, remaining_secs: u64 },
    CelebrationDismissed { spin_id: u64 },
    RunComplete,
}

#[derive(Debug)]
pub enum ControllerError {
    Closed,
    Join(JoinError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "Wheel controller has stopped"),
            Self::Join(e) => write!(f, "Wheel controller task failed: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Join(e) => Some(e),
            Self::Closed => None,
        }
    }
}

impl From<JoinError> for ControllerError {
    fn from(err: JoinError) -> Self {
        Self::Join(err)
    }
}

/// The presentation layer's side of a running wheel.
pub struct WheelHandle {
    commands: mpsc::Sender<Command>,
    events: mpsc::UnboundedReceiver<WheelEvent>,
    task: JoinHandle<()>,
}

impl WheelHandle {
    pub async fn send(&self, command: Command) -> Result<(), ControllerError> {
        self.commands.send(command).await.map_err(|_| ControllerError::Closed)
    }

    pub async fn spin(&self) -> Result<(), ControllerError> {
        self.send(Command::Spin).await
    }

    pub async fn next_session(&self) -> Result<(), ControllerError> {
        self.send(Command::NextSession).await
    }

    pub async fn next_event(&mut self) -> Option<WheelEvent> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<WheelEvent> {
        self.events.try_recv().ok()
    }

    pub async fn shutdown(self) -> Result<(), ControllerError> {
        // The loop also stops when every sender is gone, so a closed channel is fine here.
        let _ = self.commands.send(Command::Shutdown).await;
        self.task.await?;
        Ok(())
    }
}

/// Starts the wheel's event loop on the current tokio runtime.
pub fn spawn<R>(allocator: SpinAllocator<R>, timings: Timings, force: ForceOutcome) -> WheelHandle
where
    R: IndexSource + Send + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let controller = Controller {
        allocator,
        timings,
        force,
        rotation: 0.0,
        pending: None,
        celebration: None,
        finished: false,
        events: event_tx,
    };
    let task = tokio::spawn(controller.run(command_rx));
    WheelHandle {
        commands: command_tx,
        events: event_rx,
        task,
    }
}

struct Controller<R: IndexSource> {
    allocator: SpinAllocator<R>,
    timings: Timings,
    force: ForceOutcome,
    rotation: f64,
    pending: Option<(PendingSpin, Instant)>,
    celebration: Option<(u64, Instant)>,
    finished: bool,
    events: mpsc::UnboundedSender<WheelEvent>,
}

fn countdown_interval(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl<R: IndexSource> Controller<R> {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut countdown = countdown_interval(self.timings.countdown_tick);
        self.announce_session();

        loop {
            let commit_at = self.pending.as_ref().map(|(_, at)| *at);
            let dismiss_at = self.celebration.map(|(_, at)| at);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Spin) => self.start_spin(),
                    Some(Command::NextSession) => {
                        self.advance_session();
                        countdown = countdown_interval(self.timings.countdown_tick);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                _ = wait_until(commit_at), if commit_at.is_some() => self.reveal(),
                _ = wait_until(dismiss_at), if dismiss_at.is_some() => self.dismiss(),
                _ = countdown.tick(), if !self.finished => {
                    if self.tick() {
                        self.advance_session();
                        countdown = countdown_interval(self.timings.countdown_tick);
                    }
                }
            }
        }
        debug!("Wheel controller stopped");
    }

    fn emit(&self, event: WheelEvent) {
        if self.events.send(event).is_err() {
            debug!("Event dropped, no listener");
        }
    }

    fn announce_session(&self) {
        let session = self.allocator.session();
        info!("Session {} open for {}", session.number, session.countdown.display());
        self.emit(WheelEvent::SessionStarted {
            session: session.number,
            epoch: session.epoch,
            segments: session.catalog.len(),
        });
    }

    fn refuse(&self, err: WheelError) {
        if err.is_silent() {
            debug!("Spin request ignored: {}", err);
            return;
        }
        warn!("Spin refused: {}", err);
        self.emit(WheelEvent::SpinRefused {
            reason: err.to_string(),
            blocking: err.is_blocking(),
        });
    }

    fn start_spin(&mut self) {
        if self.finished {
            self.refuse(WheelError::RunComplete);
            return;
        }
        match self.allocator.decide(self.force) {
            Ok(pending) => {
                let total = self.allocator.session().catalog.len();
                self.rotation = spin_rotation(self.rotation, pending.target(), total);
                self.emit(WheelEvent::SpinStarted {
                    spin_id: pending.spin_id(),
                    target: pending.target(),
                    rotation: self.rotation,
                });
                self.pending = Some((pending, Instant::now() + self.timings.spin_delay));
            }
            Err(err) => self.refuse(err),
        }
    }

    fn reveal(&mut self) {
        let Some((pending, _)) = self.pending.take() else {
            return;
        };
        match self.allocator.commit(pending) {
            Ok(result) => {
                // A newer result replaces whatever celebration is still showing.
                self.celebration = Some((result.spin_id, Instant::now() + self.timings.celebration));
                self.emit(WheelEvent::SpinRevealed(result));
            }
            Err(err) => self.refuse(err),
        }
    }

    fn dismiss(&mut self) {
        if let Some((spin_id, _)) = self.celebration.take() {
            self.emit(WheelEvent::CelebrationDismissed { spin_id });
        }
    }

    /// Returns true when the session ran out of time.
    fn tick(&mut self) -> bool {
        let tick = self.allocator.tick();
        let session = self.allocator.session();
        self.emit(WheelEvent::Countdown {
            session: session.number,
            remaining: session.countdown.display(),
            remaining_secs: tick.remaining_secs,
        });
        if tick.expired {
            info!("Session {} time is up", session.number);
        }
        tick.expired
    }

    fn advance_session(&mut self) {
        if let Some((pending, _)) = self.pending.take() {
            let spin_id = pending.spin_id();
            debug!("Dropping reveal of spin {} on session change", spin_id);
            self.allocator.abandon(pending);
            self.emit(WheelEvent::SpinCancelled { spin_id });
        }
        match self.allocator.next_session() {
            Ok(_) => self.announce_session(),
            Err(WheelError::RunComplete) => {
                info!("All sessions played");
                self.finished = true;
                self.emit(WheelEvent::RunComplete);
            }
            Err(err) => self.refuse(err),
        }
    }
}
