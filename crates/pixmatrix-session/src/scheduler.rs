use pixmatrix_types::config::{MAX_FPS, MIN_FPS};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{debug, info};

/// Timer message posted to the session loop. Only ticks carrying the
/// scheduler's current epoch are honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running { fps: u32, broadcast: bool },
}

/// Cyclic frame timer.
///
/// The timer task never touches session state: it posts [`Tick`]s on a
/// capacity-1 channel and the session applies them between commands. A tick
/// still queued when the channel is full is enough, so later ones are
/// dropped instead of piling up. Every start or stop bumps the epoch, which
/// makes queued ticks from an earlier run stale the moment `stop` returns.
pub struct AnimationScheduler {
    ticks: mpsc::Sender<Tick>,
    state: SchedulerState,
    epoch: u64,
    cursor: usize,
    task: Option<JoinHandle<()>>,
}

impl AnimationScheduler {
    pub fn channel() -> (Self, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel(1);
        (Self::new(tx), rx)
    }

    pub fn new(ticks: mpsc::Sender<Tick>) -> Self {
        Self {
            ticks,
            state: SchedulerState::Idle,
            epoch: 0,
            cursor: 0,
            task: None,
        }
    }

    /// Tick period for a frame rate, clamped to the supported range.
    pub fn period(fps: u32) -> Duration {
        Duration::from_millis(1000 / fps.clamp(MIN_FPS, MAX_FPS) as u64)
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, SchedulerState::Running { .. })
    }

    pub fn broadcast(&self) -> bool {
        matches!(self.state, SchedulerState::Running { broadcast: true, .. })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Tear down any running timer and start a fresh one from frame 0.
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, fps: u32, broadcast: bool) {
        self.teardown();
        let fps = fps.clamp(MIN_FPS, MAX_FPS);
        self.epoch += 1;
        self.cursor = 0;
        self.state = SchedulerState::Running { fps, broadcast };

        let epoch = self.epoch;
        let ticks = self.ticks.clone();
        let period = Self::period(fps);
        self.task = Some(tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately.
            timer.tick().await;
            loop {
                timer.tick().await;
                match ticks.try_send(Tick { epoch }) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        }));
        info!(fps, broadcast, epoch, "animation scheduler started");
    }

    /// Stop the timer. No tick is honoured after this returns.
    pub fn stop(&mut self) -> bool {
        let was_running = self.is_running();
        self.teardown();
        self.epoch += 1;
        self.state = SchedulerState::Idle;
        if was_running {
            info!(epoch = self.epoch, "animation scheduler stopped");
        }
        was_running
    }

    /// Rebuild a running timer from its current parameters. Idle schedulers
    /// stay idle.
    pub fn restart(&mut self) -> bool {
        match self.state {
            SchedulerState::Running { fps, broadcast } => {
                self.start(fps, broadcast);
                true
            }
            SchedulerState::Idle => false,
        }
    }

    pub fn is_current(&self, tick: &Tick) -> bool {
        self.is_running() && tick.epoch == self.epoch
    }

    /// Index of the frame to show for this tick in a sequence of `len`
    /// frames, wrapping back to 0 after the last one.
    pub fn advance(&mut self, len: usize) -> usize {
        let len = len.max(1);
        let index = self.cursor % len;
        self.cursor = (index + 1) % len;
        debug!(index, len, "animation cursor advanced");
        index
    }

    fn teardown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AnimationScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}
