//! Editing session: one frame store, one set of correction parameters, one
//! animation scheduler, and handles to the surface and transport
//! collaborators, driven by a single command loop.

mod scheduler;

pub use scheduler::{AnimationScheduler, SchedulerState, Tick};

use pixmatrix_encoder::PixelEncoder;
use pixmatrix_ops::TelemetryStore;
use pixmatrix_store::FrameStore;
use pixmatrix_surface::EditingSurface;
use pixmatrix_transport::Transport;
use pixmatrix_types::{
    config::{PixmatrixConfig, MAX_FPS, MIN_FPS},
    correction::{ChannelGains, CorrectionParams},
    events::{
        BroadcastEvent, EventPayload, LifecyclePhase, SchedulerEvent, SessionEvent, StoreEvent,
    },
    frame::{FrameBuffer, GridSize},
    PixmatrixError, Result,
};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 256;

/// Discrete inputs the session reacts to.
#[derive(Debug)]
pub enum SessionCommand {
    /// Capture the edit surface and append it as a new frame.
    AddFrame,
    /// Capture the edit surface and overwrite the selected frame.
    CommitEdit,
    /// Select a frame and show it on the edit surface.
    SelectFrame(usize),
    DuplicateFrame(usize),
    DeleteFrame(usize),
    MoveFrameUp(usize),
    MoveFrameDown(usize),
    Reorder(Vec<FrameBuffer>),
    Undo,
    SetBrightness(f64),
    SetGamma(f64),
    SetGains(ChannelGains),
    SetCorrection(CorrectionParams),
    /// Encode the edit surface and hand it to the transport.
    Send,
    SetFrameRate(u32),
    SetBroadcast(bool),
    StartAnimation,
    StopAnimation,
    Status(oneshot::Sender<SessionStatus>),
    Shutdown,
}

/// Point-in-time view of the session for front-ends.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub frames: usize,
    pub selected: usize,
    pub generation: usize,
    pub history_len: usize,
    pub correction: CorrectionParams,
    pub fps: u32,
    pub broadcast: bool,
    pub scheduler: SchedulerState,
}

/// Cloneable handle for posting commands to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    pub async fn send(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| session_error("session loop has stopped"))
    }

    pub async fn status(&self) -> Result<SessionStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Status(tx)).await?;
        rx.await
            .map_err(|_| session_error("session dropped status request"))
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionCommand::Shutdown).await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

pub struct Session<S, T>
where
    S: EditingSurface,
    T: Transport,
{
    store: FrameStore,
    correction: CorrectionParams,
    encoder: PixelEncoder,
    scheduler: AnimationScheduler,
    ticks: mpsc::Receiver<Tick>,
    fps: u32,
    broadcast: bool,
    surface: S,
    transport: T,
    telemetry: TelemetryStore,
    events: broadcast::Sender<SessionEvent>,
    commands: mpsc::Receiver<SessionCommand>,
}

impl<S, T> Session<S, T>
where
    S: EditingSurface,
    T: Transport,
{
    /// Build a session from configuration together with the handle that
    /// feeds its command loop.
    pub fn new(
        config: &PixmatrixConfig,
        surface: S,
        transport: T,
        telemetry: TelemetryStore,
    ) -> (Self, SessionHandle) {
        let size: GridSize = config.matrix.grid();
        let (scheduler, ticks) = AnimationScheduler::channel();
        let (commands_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let handle = SessionHandle {
            commands: commands_tx,
            events: events.clone(),
        };
        let session = Self {
            store: FrameStore::with_depth(FrameBuffer::black(size), config.history.depth),
            correction: config.correction.clamped(),
            encoder: PixelEncoder::new(size),
            scheduler,
            ticks,
            fps: config.animation.fps.clamp(MIN_FPS, MAX_FPS),
            broadcast: config.animation.broadcast,
            surface,
            transport,
            telemetry,
            events,
            commands,
        };
        (session, handle)
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    pub fn correction(&self) -> CorrectionParams {
        self.correction
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            frames: self.store.len(),
            selected: self.store.selected(),
            generation: self.store.generation_index(),
            history_len: self.store.history_len(),
            correction: self.correction,
            fps: self.fps,
            broadcast: self.broadcast,
            scheduler: self.scheduler.state(),
        }
    }

    /// Show the initial frame and announce the session.
    pub async fn boot(&mut self) -> Result<()> {
        self.surface.render_frame(self.store.selected_frame()).await?;
        info!(
            "Session booted with {}x{} grid",
            self.encoder.size().width,
            self.encoder.size().height
        );
        self.publish(SessionEvent::lifecycle(
            LifecyclePhase::Boot,
            Some("session boot complete".into()),
        ))
        .await
    }

    /// Process commands and scheduler ticks one at a time until shutdown or
    /// until every handle is dropped.
    pub async fn run(mut self) -> Result<()> {
        self.publish(SessionEvent::lifecycle(LifecyclePhase::Ready, None))
            .await?;

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        info!("All session handles dropped; shutting down");
                        break;
                    };
                    if matches!(command, SessionCommand::Shutdown) {
                        break;
                    }
                    if let Err(err) = self.handle_command(command).await {
                        warn!("Session command failed: {err}");
                    }
                }
                Some(tick) = self.ticks.recv() => {
                    if let Err(err) = self.handle_tick(tick).await {
                        warn!("Animation tick failed: {err}");
                    }
                }
            }
        }

        self.scheduler.stop();
        self.publish(SessionEvent::lifecycle(LifecyclePhase::Shutdown, None))
            .await?;
        Ok(())
    }

    pub async fn handle_command(&mut self, command: SessionCommand) -> Result<()> {
        debug!(?command, "handling session command");
        match command {
            SessionCommand::AddFrame => {
                let frame = self.surface.capture_current_edit().await?;
                self.ensure_grid(&frame)?;
                let changed = self.store.push(frame);
                self.after_store_change("add", changed).await
            }
            SessionCommand::CommitEdit => {
                let frame = self.surface.capture_current_edit().await?;
                self.ensure_grid(&frame)?;
                let changed = self.store.replace_at(self.store.selected(), frame);
                self.after_store_change("commit", changed).await
            }
            SessionCommand::SelectFrame(index) => {
                self.store.select(index);
                self.surface
                    .render_frame(self.store.selected_frame())
                    .await?;
                self.publish_store("select").await
            }
            SessionCommand::DuplicateFrame(index) => {
                let changed = self.store.duplicate_at(index);
                self.after_store_change("duplicate", changed).await
            }
            SessionCommand::DeleteFrame(index) => {
                let changed = self.store.delete_at(index);
                self.after_store_change("delete", changed).await
            }
            SessionCommand::MoveFrameUp(index) => {
                let changed = self.store.move_up(index);
                self.after_store_change("move-up", changed).await
            }
            SessionCommand::MoveFrameDown(index) => {
                let changed = self.store.move_down(index);
                self.after_store_change("move-down", changed).await
            }
            SessionCommand::Reorder(sequence) => {
                for frame in &sequence {
                    self.ensure_grid(frame)?;
                }
                let changed = self.store.reorder(sequence);
                self.after_store_change("reorder", changed).await
            }
            SessionCommand::Undo => {
                let changed = self.store.undo();
                self.after_store_change("undo", changed).await
            }
            SessionCommand::SetBrightness(brightness) => {
                let params = CorrectionParams {
                    brightness,
                    ..self.correction
                };
                self.apply_and_broadcast(params).await
            }
            SessionCommand::SetGamma(gamma) => {
                let params = CorrectionParams {
                    gamma,
                    ..self.correction
                };
                self.apply_and_broadcast(params).await
            }
            SessionCommand::SetGains(gains) => {
                let params = CorrectionParams {
                    gains,
                    ..self.correction
                };
                self.apply_and_broadcast(params).await
            }
            SessionCommand::SetCorrection(params) => self.apply_and_broadcast(params).await,
            SessionCommand::Send => self.send_current_edit().await,
            SessionCommand::SetFrameRate(fps) => {
                self.fps = fps.clamp(MIN_FPS, MAX_FPS);
                self.refresh_scheduler().await
            }
            SessionCommand::SetBroadcast(enabled) => {
                self.broadcast = enabled;
                self.refresh_scheduler().await
            }
            SessionCommand::StartAnimation => {
                self.scheduler.start(self.fps, self.broadcast);
                self.publish_scheduler().await
            }
            SessionCommand::StopAnimation => {
                self.scheduler.stop();
                self.publish_scheduler().await
            }
            SessionCommand::Status(reply) => {
                // The requester may have given up waiting.
                let _ = reply.send(self.status());
                Ok(())
            }
            SessionCommand::Shutdown => {
                self.scheduler.stop();
                Ok(())
            }
        }
    }

    /// Update the correction parameters and immediately push the edit
    /// surface through the encoder with the new settings.
    pub async fn apply_and_broadcast(&mut self, params: CorrectionParams) -> Result<()> {
        self.correction = params.clamped();
        self.publish(SessionEvent::new(EventPayload::Correction(self.correction)))
            .await?;
        self.send_current_edit().await
    }

    /// Encode whatever the edit surface currently shows and send it.
    pub async fn send_current_edit(&mut self) -> Result<()> {
        let frame = self.surface.capture_current_edit().await?;
        self.broadcast_frame(&frame, None).await
    }

    /// Advance the animation by one frame. Stale ticks are ignored.
    pub async fn handle_tick(&mut self, tick: Tick) -> Result<()> {
        if !self.scheduler.is_current(&tick) {
            debug!(
                tick = tick.epoch,
                current = self.scheduler.epoch(),
                "stale tick ignored"
            );
            return Ok(());
        }

        let sequence = self.store.snapshot();
        let index = self.scheduler.advance(sequence.len());
        let frame = &sequence[index];
        if let Err(err) = self.surface.render_frame(frame).await {
            warn!("Failed to render animation frame {index}: {err}");
        }
        if self.scheduler.broadcast() {
            self.broadcast_frame(frame, Some(index)).await?;
        }
        Ok(())
    }

    async fn broadcast_frame(
        &mut self,
        frame: &FrameBuffer,
        frame_index: Option<usize>,
    ) -> Result<()> {
        self.ensure_grid(frame)?;
        let wire = self.encoder.encode(frame, &self.correction);
        let bytes = wire.len();
        let delivered = match self.transport.send(wire).await {
            Ok(()) => true,
            Err(err) => {
                warn!("Transport rejected wire frame: {err}");
                false
            }
        };
        self.publish(SessionEvent::new(EventPayload::Broadcast(BroadcastEvent {
            frame_index,
            bytes,
            delivered,
        })))
        .await
    }

    /// The grid is fixed for the lifetime of the session.
    fn ensure_grid(&self, frame: &FrameBuffer) -> Result<()> {
        let grid = self.encoder.size();
        if frame.size() == grid {
            return Ok(());
        }
        Err(session_error(format!(
            "frame is {}x{}, matrix is {}x{}",
            frame.width(),
            frame.height(),
            grid.width,
            grid.height
        )))
    }

    async fn after_store_change(&mut self, action: &str, changed: bool) -> Result<()> {
        if !changed {
            debug!(action, "frame store unchanged");
            return Ok(());
        }
        if self.scheduler.restart() {
            debug!(action, "animation rebuilt for new sequence");
        }
        self.publish_store(action).await
    }

    async fn refresh_scheduler(&mut self) -> Result<()> {
        if self.scheduler.is_running() {
            self.scheduler.start(self.fps, self.broadcast);
        }
        self.publish_scheduler().await
    }

    async fn publish_store(&self, action: &str) -> Result<()> {
        self.publish(SessionEvent::new(EventPayload::Store(StoreEvent {
            action: action.to_string(),
            generation: self.store.generation_index(),
            history_len: self.store.history_len(),
            frames: self.store.len(),
            selected: self.store.selected(),
        })))
        .await
    }

    async fn publish_scheduler(&self) -> Result<()> {
        self.publish(SessionEvent::new(EventPayload::Scheduler(SchedulerEvent {
            running: self.scheduler.is_running(),
            fps: self.fps,
            broadcast: self.broadcast,
        })))
        .await
    }

    async fn publish(&self, event: SessionEvent) -> Result<()> {
        // Having no live subscribers is fine.
        let _ = self.events.send(event.clone());
        self.telemetry.record_event(event).await
    }
}

pub fn session_error(message: impl Into<String>) -> PixmatrixError {
    PixmatrixError::Session(message.into())
}
