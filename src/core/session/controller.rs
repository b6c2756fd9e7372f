//! The realtime session controller.
//!
//! One [`SessionController`] drives one call. `run` acquires the capture
//! source, opens the transport and then multiplexes, on a single task:
//!
//! - commands from [`SessionHandle`]s
//! - transport events (audio, transcripts, tool invocations, close)
//! - tool notices (form updates, confirmations, close requests)
//! - capture buffers (while active)
//! - the silence watchdog (while active)
//! - the close deadline set by `close_call`
//!
//! All playback state lives on that task, so a barge-in stops buffers and
//! bumps the turn id before the next server frame can be scheduled.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::events::{SessionCommand, SessionEvent};
use super::handle::SessionHandle;
use super::playback::PlaybackScheduler;
use super::state::SessionState;
use super::watchdog::{SilenceWatchdog, nudge_text};
use crate::core::audio::{AudioInput, AudioOutput, decode, encode, rms};
use crate::core::outcome::{
    BookingStatus, CallLogStore, CallOutcome, CallOutcomeAggregator, EndReason,
};
use crate::core::realtime::{
    FunctionCallRequest, RealtimeAudioData, RealtimeConfig, RealtimeTransport, ToolResponse,
    TransportEvent,
};
use crate::core::tools::{
    ContactForm, SharedConversation, ToolContext, ToolDispatcher, ToolError, ToolNotice,
};
use crate::core::vad::{EnergyVAD, VADConfig, VoiceActivityDetector};
use crate::errors::{SessionError, SessionResult};

/// Text sent when the customer presses the confirm button.
pub fn confirm_request_text(form: &ContactForm) -> String {
    format!(
        "[System: User clicked CONFIRM_REQUEST button. Form Data: Name={}, Phone={}, Product={}. Proceed to submit_report.]",
        form.name, form.phone, form.subject
    )
}

/// Collaborators a session runs against.
#[derive(Clone)]
pub struct SessionComponents {
    pub transport: Arc<dyn RealtimeTransport>,
    pub input: Arc<dyn AudioInput>,
    pub output: Arc<dyn AudioOutput>,
    pub dispatcher: ToolDispatcher,
    pub call_log: Arc<dyn CallLogStore>,
}

pub struct SessionController {
    id: String,
    config: SessionConfig,
    realtime: RealtimeConfig,
    components: SessionComponents,
    conversation: SharedConversation,
    state: Arc<RwLock<SessionState>>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    command_tx: mpsc::UnboundedSender<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionController {
    /// Create an idle session and the receiver for its UI events.
    pub fn new(
        config: SessionConfig,
        realtime: RealtimeConfig,
        components: SessionComponents,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();

        let controller = Self {
            id: Uuid::new_v4().to_string(),
            config,
            realtime,
            components,
            conversation: SharedConversation::new(),
            state: Arc::new(RwLock::new(SessionState::Idle)),
            commands,
            command_tx,
            events,
        };
        (controller, events_rx)
    }

    /// Use an existing conversation container, e.g. one a UI already renders.
    pub fn with_conversation(mut self, conversation: SharedConversation) -> Self {
        self.conversation = conversation;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn conversation(&self) -> &SharedConversation {
        &self.conversation
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(
            self.id.clone(),
            self.command_tx.clone(),
            Arc::clone(&self.state),
            self.conversation.clone(),
        )
    }

    /// Run the session on a new task.
    pub fn spawn(self) -> JoinHandle<SessionResult<CallOutcome>> {
        tokio::spawn(self.run())
    }

    /// Run the call to completion.
    ///
    /// Returns the call record once the session closes. Setup failures
    /// return an error after a `failed` record has been handed to the call
    /// log.
    pub async fn run(self) -> SessionResult<CallOutcome> {
        let SessionController {
            id,
            config,
            realtime,
            components,
            conversation,
            state,
            mut commands,
            command_tx,
            events,
        } = self;
        drop(command_tx);

        let (notice_tx, mut notices) = mpsc::unbounded_channel();
        let tool_ctx =
            ToolContext::new(conversation.clone(), notice_tx).with_language(config.language.clone());

        let mut session = Session {
            vad: EnergyVAD::new(VADConfig::with_threshold(config.barge_in_threshold)),
            watchdog: SilenceWatchdog::new(config.silence_timeout),
            scheduler: PlaybackScheduler::new(Arc::clone(&components.output)),
            aggregator: CallOutcomeAggregator::start(),
            dispatcher: Arc::new(components.dispatcher),
            transport: components.transport,
            input: components.input,
            call_log: components.call_log,
            tool_tasks: JoinSet::new(),
            close_deadline: None,
            id,
            config,
            conversation,
            state,
            events,
            tool_ctx,
        };

        session.transition(SessionState::Connecting);

        if let Err(reason) = session.config.validate() {
            return Err(session.fail_setup(SessionError::InvalidConfiguration(reason)).await);
        }

        // Commands other than Stop received while connecting run once connected
        let mut deferred = Vec::new();

        let acquired = unless_stopped(&mut commands, &mut deferred, session.input.open()).await;
        let capture = match acquired {
            Some(Ok(capture)) => capture,
            Some(Err(e)) => return Err(session.fail_setup(e.into()).await),
            None => {
                info!(session_id = %session.id, "User stopped session while acquiring capture");
                return session.finish(EndReason::UserStop).await;
            }
        };
        let capture_rate = capture.sample_rate;
        let mut capture_frames = Some(capture.frames);

        let opened =
            unless_stopped(&mut commands, &mut deferred, session.transport.open(&realtime)).await;
        let mut transport_events = match opened {
            Some(Ok(events)) => events,
            Some(Err(e)) => {
                session.input.stop();
                drop(capture_frames);
                return Err(session.fail_setup(e.into()).await);
            }
            None => {
                info!(session_id = %session.id, "User stopped session while connecting");
                drop(capture_frames);
                return session.finish(EndReason::UserStop).await;
            }
        };

        info!(
            session_id = %session.id,
            capture_rate,
            provider = %session.transport.provider_info()["provider"],
            "Session transport opened"
        );

        for command in deferred {
            session.on_command(command).await;
        }

        let mut watchdog_tick = interval(session.config.watchdog_interval);
        watchdog_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut commands_open = true;

        let reason = loop {
            let active = session.state() == SessionState::Active;
            let close_deadline = session.close_deadline;

            let flow = tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(command) => session.on_command(command).await,
                    None => {
                        commands_open = false;
                        Flow::Continue
                    }
                },
                event = transport_events.recv() => match event {
                    Some(event) => session.on_transport_event(event).await,
                    None => Flow::End(EndReason::RemoteClosed("event stream ended".to_string())),
                },
                Some(notice) = notices.recv() => session.on_notice(notice),
                frame = next_frame(&mut capture_frames), if active => match frame {
                    Some(frame) => session.on_capture(frame, capture_rate).await,
                    None => {
                        info!(session_id = %session.id, "Capture stream ended");
                        capture_frames = None;
                        Flow::Continue
                    }
                },
                _ = watchdog_tick.tick(), if active => session.on_watchdog_tick().await,
                _ = sleep_until(close_deadline.unwrap_or_else(Instant::now)), if close_deadline.is_some() => {
                    Flow::End(EndReason::AgentClosed)
                }
                Some(_) = session.tool_tasks.join_next(), if !session.tool_tasks.is_empty() => Flow::Continue,
            };

            if let Flow::End(reason) = flow {
                break reason;
            }
        };

        drop(capture_frames);
        session.finish(reason).await
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// Await a setup step, giving up if the user stops first.
async fn unless_stopped<T>(
    commands: &mut mpsc::UnboundedReceiver<SessionCommand>,
    deferred: &mut Vec<SessionCommand>,
    step: impl Future<Output = T>,
) -> Option<T> {
    tokio::pin!(step);
    let mut commands_open = true;
    loop {
        tokio::select! {
            output = &mut step => return Some(output),
            command = commands.recv(), if commands_open => match command {
                Some(SessionCommand::Stop) => return None,
                Some(command) => deferred.push(command),
                None => commands_open = false,
            },
        }
    }
}

async fn next_frame(frames: &mut Option<mpsc::Receiver<Vec<f32>>>) -> Option<Vec<f32>> {
    match frames {
        Some(frames) => frames.recv().await,
        None => std::future::pending().await,
    }
}

enum Flow {
    Continue,
    End(EndReason),
}

/// State owned by the run loop.
struct Session {
    id: String,
    config: SessionConfig,
    conversation: SharedConversation,
    state: Arc<RwLock<SessionState>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    transport: Arc<dyn RealtimeTransport>,
    input: Arc<dyn AudioInput>,
    call_log: Arc<dyn CallLogStore>,
    dispatcher: Arc<ToolDispatcher>,
    tool_ctx: ToolContext,
    tool_tasks: JoinSet<()>,
    vad: EnergyVAD,
    watchdog: SilenceWatchdog,
    scheduler: PlaybackScheduler,
    aggregator: CallOutcomeAggregator,
    close_deadline: Option<Instant>,
}

impl Session {
    fn state(&self) -> SessionState {
        *self.state.read()
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!(session_id = %self.id, "No event subscriber");
        }
    }

    fn transition(&self, next: SessionState) {
        let current = self.state();
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            debug!(session_id = %self.id, from = %current, to = %next, "Ignoring state transition");
            return;
        }
        *self.state.write() = next;
        info!(session_id = %self.id, from = %current, to = %next, "Session state changed");
        self.emit(SessionEvent::StateChanged(next));
    }

    // =========================================================================
    // Transport events
    // =========================================================================

    async fn on_transport_event(&mut self, event: TransportEvent) -> Flow {
        match event {
            TransportEvent::Opened => {
                if self.state() == SessionState::Connecting {
                    self.transition(SessionState::Active);
                    self.watchdog.record_activity();
                }
            }
            TransportEvent::Audio(audio) => {
                self.watchdog.record_activity();
                self.play(audio);
            }
            TransportEvent::Transcript(transcript) => {
                self.watchdog.record_activity();
                debug!(
                    session_id = %self.id,
                    direction = %transcript.direction,
                    text = %transcript.text,
                    "Transcript"
                );
                self.aggregator
                    .record_transcript(transcript.text.clone(), transcript.direction);
                self.emit(SessionEvent::Transcript(transcript));
            }
            TransportEvent::ToolInvocation(call) => {
                self.watchdog.record_activity();
                self.spawn_tool_call(call);
            }
            TransportEvent::Interrupted => {
                debug!(session_id = %self.id, "Server interrupted generation");
                self.scheduler.reset_clock();
            }
            TransportEvent::TurnComplete => {
                debug!(session_id = %self.id, turn_id = self.scheduler.turn_id(), "Agent turn complete");
            }
            TransportEvent::Closed { reason } => {
                info!(session_id = %self.id, reason = %reason, "Transport closed");
                return Flow::End(EndReason::RemoteClosed(reason));
            }
            TransportEvent::Error(e) => {
                error!(session_id = %self.id, error = %e, "Transport error");
                return Flow::End(EndReason::TransportError(e.to_string()));
            }
        }
        Flow::Continue
    }

    fn play(&mut self, audio: RealtimeAudioData) {
        let ticket = self.scheduler.ticket();
        let target_rate = self.scheduler.output_sample_rate();
        match decode(&audio.data, audio.sample_rate, target_rate) {
            Ok(buffer) => {
                self.scheduler.schedule(ticket, buffer);
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, bytes = audio.data.len(), "Dropping undecodable audio frame");
            }
        }
    }

    fn spawn_tool_call(&mut self, call: FunctionCallRequest) {
        let FunctionCallRequest {
            call_id,
            name,
            arguments,
        } = call;
        info!(session_id = %self.id, tool = %name, call_id = %call_id, "Tool invocation");

        let dispatcher = Arc::clone(&self.dispatcher);
        let transport = Arc::clone(&self.transport);
        let ctx = self.tool_ctx.clone();

        self.tool_tasks.spawn(async move {
            // The handler runs on its own task so a panic still yields a response.
            let handler = {
                let name = name.clone();
                tokio::spawn(async move { dispatcher.handle(&name, arguments, &ctx).await })
            };

            let result = match handler.await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    warn!(tool = %name, call_id = %call_id, error = %e, "Tool handler failed");
                    e.to_response()
                }
                Err(e) => {
                    error!(tool = %name, call_id = %call_id, error = %e, "Tool handler panicked");
                    ToolError::Internal(e.to_string()).to_response()
                }
            };

            let response = ToolResponse {
                call_id,
                name,
                result,
            };
            if let Err(e) = transport.send_tool_response(response).await {
                warn!(error = %e, "Failed to send tool response");
            }
        });
    }

    // =========================================================================
    // Capture
    // =========================================================================

    async fn on_capture(&mut self, frame: Vec<f32>, sample_rate: u32) -> Flow {
        let vad = self.vad.process_frame(&frame);

        if vad.is_speech {
            let turn_id = self.scheduler.barge_in();
            self.emit(SessionEvent::BargeIn { turn_id });
            if self.transport.is_ready() {
                if let Err(e) = self.transport.send_interrupt().await {
                    warn!(session_id = %self.id, error = %e, "Failed to send interrupt");
                }
            }
        }
        if vad.is_speech || rms(&frame) > self.config.activity_threshold {
            self.watchdog.record_activity();
        }

        if !self.transport.is_ready() {
            return Flow::Continue;
        }
        match encode(&frame, sample_rate) {
            Ok(wire) => {
                if let Err(e) = self.transport.send_audio(wire).await {
                    debug!(session_id = %self.id, error = %e, "Audio frame not sent");
                }
            }
            Err(e) => warn!(session_id = %self.id, error = %e, "Failed to encode capture buffer"),
        }
        Flow::Continue
    }

    async fn on_watchdog_tick(&mut self) -> Flow {
        if self.watchdog.poll() {
            info!(
                session_id = %self.id,
                silent_secs = self.watchdog.silent_for().as_secs(),
                "User silent, nudging agent"
            );
            self.send_text(&nudge_text(self.watchdog.timeout())).await;
            self.emit(SessionEvent::Nudged);
        }
        Flow::Continue
    }

    // =========================================================================
    // Commands and notices
    // =========================================================================

    async fn on_command(&mut self, command: SessionCommand) -> Flow {
        match command {
            SessionCommand::Stop => {
                info!(session_id = %self.id, "User stopped session");
                return Flow::End(EndReason::UserStop);
            }
            SessionCommand::CloseAfter(delay) => self.schedule_close(delay),
            SessionCommand::SendText(text) => {
                if self.state() == SessionState::Active {
                    self.send_text(&text).await;
                } else {
                    debug!(session_id = %self.id, state = %self.state(), "Text ignored, session not active");
                }
            }
            SessionCommand::ConfirmRequest => self.confirm_request().await,
        }
        Flow::Continue
    }

    async fn confirm_request(&mut self) {
        if self.state() != SessionState::Active {
            debug!(session_id = %self.id, "Confirm ignored, session not active");
            return;
        }
        let snapshot = self.conversation.snapshot();
        if snapshot.booking_status == BookingStatus::Confirmed {
            debug!(session_id = %self.id, "Confirm ignored, booking already confirmed");
            return;
        }
        if !snapshot.form.is_confirmable() {
            warn!(session_id = %self.id, "Confirm ignored, form incomplete");
            return;
        }
        info!(session_id = %self.id, "User confirmed request");
        self.send_text(&confirm_request_text(&snapshot.form)).await;
    }

    fn on_notice(&mut self, notice: ToolNotice) -> Flow {
        match notice {
            ToolNotice::FormUpdated(form) => self.emit(SessionEvent::FormUpdated(form)),
            ToolNotice::ReportConfirmed(summary) => {
                info!(session_id = %self.id, order_id = %summary.order_id, "Report confirmed");
                self.emit(SessionEvent::ReportConfirmed(summary));
            }
            ToolNotice::CloseRequested => {
                info!(session_id = %self.id, grace_ms = self.config.close_grace.as_millis() as u64, "Agent closing call");
                self.schedule_close(self.config.close_grace);
            }
        }
        Flow::Continue
    }

    fn schedule_close(&mut self, delay: Duration) {
        let deadline = Instant::now() + delay;
        self.close_deadline = Some(match self.close_deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self.transition(SessionState::Closing);
    }

    async fn send_text(&self, text: &str) {
        if let Err(e) = self.transport.send_text(text).await {
            warn!(session_id = %self.id, error = %e, "Failed to send text");
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    async fn fail_setup(&mut self, err: SessionError) -> SessionError {
        error!(session_id = %self.id, error = %err, "Session setup failed");

        let reason = EndReason::SetupFailed(err.to_string());
        if let Some(outcome) = self
            .aggregator
            .finalize(&reason, &self.conversation.snapshot())
        {
            self.save_call(&outcome).await;
        }

        self.transition(SessionState::Closed);
        self.emit(SessionEvent::Failed(err.to_string()));
        err
    }

    async fn finish(mut self, reason: EndReason) -> SessionResult<CallOutcome> {
        info!(session_id = %self.id, reason = ?reason, "Ending session");
        self.transition(SessionState::Closing);

        self.input.stop();
        self.scheduler.hard_stop();
        self.drain_tool_calls().await;

        if let Err(e) = self.transport.close().await {
            warn!(session_id = %self.id, error = %e, "Transport close failed");
        }

        let outcome = self
            .aggregator
            .finalize(&reason, &self.conversation.snapshot())
            .ok_or(SessionError::AlreadyFinalized)?;
        self.save_call(&outcome).await;

        self.transition(SessionState::Closed);
        self.emit(SessionEvent::Ended(outcome.clone()));
        Ok(outcome)
    }

    /// Let in-flight tool calls send their responses before the transport closes.
    async fn drain_tool_calls(&mut self) {
        if self.tool_tasks.is_empty() {
            return;
        }
        let pending = self.tool_tasks.len();
        let limit = self.config.tool_drain_timeout;
        let tasks = &mut self.tool_tasks;
        let drained = timeout(limit, async {
            while tasks.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(session_id = %self.id, pending, "Abandoning unfinished tool calls");
            self.tool_tasks.abort_all();
        }
    }

    async fn save_call(&self, outcome: &CallOutcome) {
        if let Err(e) = self.call_log.save_call(outcome).await {
            warn!(session_id = %self.id, call_id = %outcome.id, error = %e, "Failed to save call log");
        }
    }
}
