//! # TUI Adapter
//!
//! The ratatui-specific layer. Handles terminal I/O, renders the UI,
//! translates keyboard events into `core::Action` values and performs the
//! `Effect`s the reducer asks for.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Background work
//!
//! Everything slow runs on tokio and reports back through one
//! `std::sync::mpsc` channel of `Action`s, drained once per loop turn:
//!
//! ```text
//! Effect::SpawnRequest        → provider stream   → ResponseChunk* / ResponseDone
//! Effect::SpawnDecode         → spawn_blocking    → Composer(TextDecoded)
//! Effect::ScheduleAutoSubmit  → sleep             → Composer(AutoSubmit)
//! Effect::Recorder(cmd)       → recorder task     → Composer(RecordingStarted/Stopped)
//! ```
//!
//! ## Redraw Strategy
//!
//! - **Animating** (reply pending, recording): draws every ~80ms.
//! - **Idle**: sleeps up to 500ms, redrawing only on events or resize.
//!
//! A `SteadyBlock` cursor is used because ratatui's `set_cursor_position`
//! resets the terminal's blink timer on every `draw()`, which makes blinking
//! cursors stutter during continuous redraws.

pub mod component;
pub mod components;
pub mod conversation;
pub mod event;
pub mod markdown;
mod ui;

use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, SetCursorStyle, Show};
use crossterm::event::{
    DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use log::{debug, info, warn};
use tokio::task::AbortHandle;

use crate::composer::attachment::parse_dropped_paths;
use crate::composer::device::CommandCapture;
use crate::composer::recorder::{CaptureDevice, Recorder, RecorderHandle};
use crate::composer::{ComposerMsg, DroppedFile};
use crate::core::action::{Action, Effect, update};
use crate::core::config::ResolvedConfig;
use crate::core::state::App;
use crate::inference::{CompletionProvider, CompletionRequest, OpenAiCompatProvider, StreamChunk};
use crate::tui::component::EventHandler;
use crate::tui::components::{
    AttachPrompt, AttachPromptEvent, ComposerBox, ComposerInput, MessageListState,
};
use crate::tui::conversation::ConversationRenderer;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};

const ANIMATION_TICK: Duration = Duration::from_millis(80);
const IDLE_TICK: Duration = Duration::from_millis(500);

/// TUI-specific presentation state (not part of core business logic)
pub struct TuiState {
    pub message_list: MessageListState,
    pub composer_box: ComposerBox,
    pub renderer: ConversationRenderer,
    /// Ctrl+O overlay (None = hidden)
    pub attach_prompt: Option<AttachPrompt>,
    pub pulse_value: f32,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            message_list: MessageListState::new(),
            composer_box: ComposerBox::new(),
            renderer: ConversationRenderer::new(),
            attach_prompt: None,
            pulse_value: 0.0,
        }
    }
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        // The kitty keyboard protocol is what makes Shift+Enter distinguishable.
        // Terminals that don't speak it ignore the push.
        execute!(
            stdout(),
            EnableMouseCapture,
            EnableBracketedPaste,
            Show,
            SetCursorStyle::SteadyBlock,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )?;
        info!("Terminal modes enabled (mouse, bracketed paste, steady block cursor, keyboard enhancement)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(
            stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            DisableBracketedPaste,
            Hide
        );
    }
}

pub fn build_provider(config: &ResolvedConfig) -> Arc<dyn CompletionProvider> {
    if config.api_key.is_none() {
        warn!("No API key configured; requests to {} go out unauthenticated", config.base_url);
    }
    Arc::new(OpenAiCompatProvider::new(
        config.api_key.clone(),
        config.base_url.clone(),
    ))
}

fn build_recorder(config: &ResolvedConfig) -> Recorder {
    let argv = config.recorder_command.clone();
    let stop_timeout = config.stop_timeout;
    Recorder::new(Box::new(move || {
        Box::new(CommandCapture::new(argv.clone(), stop_timeout)) as Box<dyn CaptureDevice>
    }))
}

/// Dropped files arrive as a bracketed paste of their paths. Returns `None`
/// when the paste is ordinary text.
///
/// Only the first path is read; a gesture carries at most one attachment.
fn files_from_paste(text: &str) -> Option<Vec<DroppedFile>> {
    let paths = parse_dropped_paths(text)?;
    let first = paths.first()?;
    info!("Paste recognized as {} dropped file(s)", paths.len());
    if paths.len() > 1 {
        debug!("Ignoring {} extra dropped path(s)", paths.len() - 1);
    }
    match DroppedFile::from_path(first) {
        Ok(file) => Some(vec![file]),
        Err(e) => {
            warn!("Could not read dropped file {}: {e}", first.display());
            Some(Vec::new())
        }
    }
}

/// Performs effects returned by `update()`.
struct EffectRunner {
    tx: mpsc::Sender<Action>,
    recorder: RecorderHandle,
    /// The in-flight request, aborted by Esc
    active_request: Option<AbortHandle>,
}

impl EffectRunner {
    /// Returns true when the app should quit.
    fn run(&mut self, app: &App, effect: Effect) -> bool {
        match effect {
            Effect::None => {}
            Effect::Quit => return true,
            Effect::SpawnRequest => {
                self.active_request = Some(spawn_request(app, self.tx.clone()));
            }
            Effect::SpawnDecode(request) => {
                let tx = self.tx.clone();
                tokio::task::spawn_blocking(move || {
                    let msg = request.decode();
                    if tx.send(Action::Composer(msg)).is_err() {
                        warn!("Failed to deliver decoded text: receiver dropped");
                    }
                });
            }
            Effect::ScheduleAutoSubmit(delay) => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Action::Composer(ComposerMsg::AutoSubmit));
                });
            }
            Effect::Recorder(command) => {
                if !self.recorder.send(command) {
                    warn!("Recorder task is gone; dropped {command:?}");
                }
            }
        }
        false
    }

    fn dispatch(&mut self, app: &mut App, action: Action) -> bool {
        let effect = update(app, action);
        self.run(app, effect)
    }

    fn cancel(&mut self, app: &mut App) {
        if let Some(handle) = self.active_request.take() {
            handle.abort();
        }
        self.dispatch(app, Action::CancelGeneration);
    }
}

pub fn run(config: ResolvedConfig, attach: Option<PathBuf>) -> std::io::Result<()> {
    let provider = build_provider(&config);
    info!("Using provider '{}' with model {}", provider.name(), config.model_name);
    let mut app = App::from_config(provider, &config);
    let mut tui = TuiState::new();

    // Channel for actions from background tasks
    let (tx, rx) = mpsc::channel();

    let recorder_tx = tx.clone();
    let recorder = RecorderHandle::spawn(build_recorder(&config), move |msg| {
        if recorder_tx.send(Action::Composer(msg)).is_err() {
            warn!("Failed to deliver recorder result: receiver dropped");
        }
    });
    let mut effects = EffectRunner {
        tx,
        recorder,
        active_request: None,
    };

    if let Some(path) = attach {
        preattach(&mut app, &mut effects, &path);
    }

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new()?;

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        let animating = app.is_loading() || app.composer.is_recording();
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            tui.composer_box.sync(app.composer.draft());
            let elapsed = start_time.elapsed().as_secs_f32();
            tui.pulse_value = (elapsed * 5.0).sin() * 0.5 + 0.5;
            let spinner_frame = (elapsed * 4.0) as usize;
            terminal.draw(|f| ui::draw_ui(f, &app, &mut tui, spinner_frame))?;
            needs_redraw = false;
        }

        let first_event = poll_event_timeout(if animating { ANIMATION_TICK } else { IDLE_TICK });
        if first_event.is_some() {
            needs_redraw = true;
        }

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            should_quit |= handle_event(event, &mut app, &mut tui, &mut effects);
            tui.composer_box.sync(app.composer.draft());
        }
        if should_quit {
            break;
        }

        // Results of background work
        while let Ok(action) = rx.try_recv() {
            needs_redraw = true;
            debug!("Event loop received: {action:?}");
            if effects.dispatch(&mut app, action) {
                should_quit = true;
            }
        }
        if should_quit {
            break;
        }
    }

    ratatui::restore();
    Ok(())
}

fn preattach(app: &mut App, effects: &mut EffectRunner, path: &Path) {
    match DroppedFile::from_path(path) {
        Ok(file) => {
            effects.dispatch(app, Action::FilesDropped(vec![file]));
        }
        Err(e) => {
            warn!("--attach {}: {e}", path.display());
            app.status_message = format!("Could not attach {}: {e}", path.display());
        }
    }
}

/// Routes one terminal event. Returns true when the app should quit.
fn handle_event(
    event: TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    effects: &mut EffectRunner,
) -> bool {
    match event {
        TuiEvent::Resize => false,
        TuiEvent::ForceQuit => effects.dispatch(app, Action::Quit),

        // The attach prompt is modal while open
        _ if tui.attach_prompt.is_some() => {
            let Some(prompt) = tui.attach_prompt.as_mut() else {
                return false;
            };
            match prompt.handle_event(&event) {
                Some(AttachPromptEvent::Submit(path)) => match DroppedFile::from_path(&path) {
                    Ok(file) => {
                        tui.attach_prompt = None;
                        effects.dispatch(app, Action::FilesDropped(vec![file]))
                    }
                    Err(e) => {
                        prompt.error = Some(e.to_string());
                        false
                    }
                },
                Some(AttachPromptEvent::Cancel) => {
                    tui.attach_prompt = None;
                    false
                }
                None => false,
            }
        }

        TuiEvent::ScrollUp
        | TuiEvent::ScrollDown
        | TuiEvent::ScrollPageUp
        | TuiEvent::ScrollPageDown => {
            tui.message_list.handle_event(&event);
            false
        }
        TuiEvent::Escape => {
            if app.is_loading() {
                effects.cancel(app);
            }
            false
        }
        TuiEvent::OpenAttachPrompt => {
            tui.attach_prompt = Some(AttachPrompt::new());
            false
        }
        TuiEvent::Send => effects.dispatch(app, Action::SendButton),
        TuiEvent::ToggleRecording => effects.dispatch(app, Action::ToggleRecording),
        TuiEvent::ClearAttachment => effects.dispatch(app, Action::ClearAttachment),
        TuiEvent::Paste(ref text) => match files_from_paste(text) {
            Some(files) => effects.dispatch(app, Action::FilesDropped(files)),
            None => edit_draft(&event, app, tui, effects),
        },
        _ => edit_draft(&event, app, tui, effects),
    }
}

fn edit_draft(
    event: &TuiEvent,
    app: &mut App,
    tui: &mut TuiState,
    effects: &mut EffectRunner,
) -> bool {
    match tui.composer_box.handle_event(event) {
        Some(ComposerInput::Changed(text)) => effects.dispatch(app, Action::TextChanged(text)),
        Some(ComposerInput::Enter) => {
            // A fresh submission follows the conversation to the bottom
            tui.message_list.stick_to_bottom = true;
            effects.dispatch(app, Action::Enter { shift: false })
        }
        Some(ComposerInput::Moved) | None => false,
    }
}

/// Streams a completion for the conversation's current request.
///
/// One task runs the provider and forwards its chunks; the error text (if
/// any) is delivered before `ResponseDone` so it lands in the right reply.
fn spawn_request(app: &App, tx: mpsc::Sender<Action>) -> AbortHandle {
    let request = app.conversation.request_id();
    let provider = Arc::clone(&app.provider);
    let messages = app.conversation.request_messages().to_vec();
    let model = app.model_name.clone();
    let system_prompt = app.system_prompt.clone();
    info!(
        "Spawning request #{request} ({} messages) via {}",
        messages.len(),
        provider.name()
    );

    let (chunk_tx, mut chunk_rx) = tokio::sync::mpsc::channel::<StreamChunk>(100);
    let forward_tx = tx.clone();

    let handle = tokio::spawn(async move {
        let stream = provider.stream_completion(
            CompletionRequest {
                messages: &messages,
                model: &model,
                system_prompt: system_prompt.as_deref(),
            },
            chunk_tx,
        );

        let forward = async {
            let started = Instant::now();
            let mut first_content: Option<Duration> = None;
            let mut total_len = 0usize;
            while let Some(chunk) = chunk_rx.recv().await {
                match chunk {
                    StreamChunk::Content(text) => {
                        first_content.get_or_insert_with(|| started.elapsed());
                        total_len += text.len();
                        if forward_tx.send(Action::ResponseChunk { request, text }).is_err() {
                            warn!("Failed to forward ResponseChunk: receiver dropped");
                            return;
                        }
                    }
                    StreamChunk::Completed => debug!("Request #{request} reported completion"),
                }
            }
            info!(
                "Request #{request} stream closed: {total_len} bytes, ttft={:?}, total={:?}",
                first_content,
                started.elapsed()
            );
        };

        let (result, ()) = tokio::join!(stream, forward);
        if let Err(e) = result {
            warn!("Request #{request} failed: {e}");
            let _ = tx.send(Action::ResponseChunk {
                request,
                text: format!("\n[Error: {e}]"),
            });
        }
        if tx.send(Action::ResponseDone { request }).is_err() {
            warn!("Failed to send ResponseDone: receiver dropped");
        }
    });

    handle.abort_handle()
}
