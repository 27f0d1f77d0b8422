/// Viewer host loop
///
/// Owns a `PlaybackSession` and pumps it on the tokio runtime: sleeps until
/// the next engine or simulator deadline, delivers simulated media events,
/// applies user commands and logs every engine event.
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::progress_store::JsonProgressStore;
use crate::simulator::{clock, SimulatedPlatform};
use crate::story::StoryBundle;
use fable_core::{Language, Navigator, TransitionDirection, TransitionPlayer};
use fable_playback::{
    Collaborators, OpenOptions, PlaybackEvent, PlaybackSession, SessionSnapshot, Track,
};
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerExit {
    /// Story finished (or skipped past the last page)
    NextScreen,
    /// User closed the viewer
    Closed,
    /// Nothing left to wait for (auto-play off, no input)
    Stalled,
    /// Run limit reached
    TimedOut,
}

/// Options for one run
#[derive(Debug, Clone, Default)]
pub struct ViewerOptions {
    /// Ignore saved progress
    pub restart: bool,
    /// Override the configured language
    pub language: Option<Language>,
    /// Simulate a tap right after opening (unlocks gesture-gated audio)
    pub tap_on_start: bool,
    /// Stop after this much (clock) time
    pub max_duration: Option<Duration>,
}

/// User input accepted by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    Next,
    Previous,
    PlayPause,
    Restart,
    Language,
    ToggleTrack(Track),
    ToggleAutoPlay,
    Volume(Track, u8),
    Seek(usize),
    Hide,
    Show,
    Tap,
    Status,
    Close,
}

impl FromStr for ViewerCommand {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        let mut words = s.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let arg = words.next();

        let track = |arg: Option<&str>| {
            arg.and_then(Track::from_str)
                .ok_or_else(|| ViewerError::Config(format!("expected a track, got {arg:?}")))
        };
        let number = |arg: Option<&str>| {
            arg.and_then(|a| a.parse::<usize>().ok())
                .ok_or_else(|| ViewerError::Config(format!("expected a number, got {arg:?}")))
        };

        Ok(match command.as_str() {
            "n" | "next" => Self::Next,
            "p" | "prev" | "previous" => Self::Previous,
            "space" | "pause" | "play" => Self::PlayPause,
            "r" | "restart" => Self::Restart,
            "l" | "lang" | "language" => Self::Language,
            "toggle" => Self::ToggleTrack(track(arg)?),
            "auto" => Self::ToggleAutoPlay,
            "vol" | "volume" => {
                let track = track(arg)?;
                let level = number(words.next())?;
                Self::Volume(track, level.min(100) as u8)
            }
            "seek" => Self::Seek(number(arg)?),
            "hide" => Self::Hide,
            "show" => Self::Show,
            "tap" => Self::Tap,
            "s" | "status" => Self::Status,
            "q" | "quit" | "close" => Self::Close,
            other => return Err(ViewerError::Config(format!("unknown command: {other}"))),
        })
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub exit: ViewerExit,
    /// Every page entered, in order
    pub pages_visited: Vec<usize>,
    pub events: Vec<PlaybackEvent>,
    pub final_snapshot: SessionSnapshot,
}

/// Records how the engine asked to leave the viewer
#[derive(Debug, Clone, Default)]
struct ExitRecorder {
    exit: Rc<Cell<Option<ViewerExit>>>,
}

impl Navigator for ExitRecorder {
    fn go_to_next_screen(&mut self) {
        info!("Leaving viewer for the next screen");
        self.exit.set(Some(ViewerExit::NextScreen));
    }

    fn exit_viewer(&mut self) {
        info!("Viewer closed");
        self.exit.set(Some(ViewerExit::Closed));
    }
}

#[derive(Debug, Default)]
struct LoggedTransitions;

impl TransitionPlayer for LoggedTransitions {
    fn play_transition(&mut self, direction: TransitionDirection) {
        debug!(direction = direction.as_str(), "Page transition");
    }
}

enum Wake {
    Timer,
    Command(Option<ViewerCommand>),
}

/// Open the story and run it until it exits, stalls or times out
pub async fn run_story(
    bundle: &StoryBundle,
    config: &ViewerConfig,
    options: ViewerOptions,
    mut commands: Option<UnboundedReceiver<ViewerCommand>>,
) -> Result<RunReport> {
    let platform = SimulatedPlatform::new(config.simulation.clone());
    let navigator = ExitRecorder::default();
    let exit = Rc::clone(&navigator.exit);

    let mut playback = config.playback.clone();
    if let Some(language) = options.language {
        playback.language = language;
    }

    let started = clock();
    let limit = options.max_duration.map(|d| started + d);
    let mut session = PlaybackSession::open(
        bundle.story.clone(),
        bundle,
        Collaborators {
            platform: Box::new(platform.clone()),
            progress: Box::new(JsonProgressStore::new(&config.storage.progress_path)),
            navigator: Box::new(navigator),
            transitions: Box::new(LoggedTransitions),
        },
        playback,
        OpenOptions {
            restart: options.restart,
        },
        started,
    )?;

    if options.tap_on_start {
        session.on_user_gesture(started);
    }

    let mut events = Vec::new();
    let mut pages_visited = Vec::new();

    let outcome = loop {
        let now = clock();
        for event in platform.take_due(now) {
            session.on_media_event(event, now);
        }
        session.poll(now);

        for event in session.drain_events() {
            log_event(&event);
            if let PlaybackEvent::PageChanged { page, .. } = event {
                pages_visited.push(page);
            }
            events.push(event);
        }

        if session.is_closed() {
            break exit.get().unwrap_or(ViewerExit::Closed);
        }
        if limit.is_some_and(|limit| now >= limit) {
            info!(elapsed_ms = (now - started).as_millis() as u64, "Run limit reached");
            break ViewerExit::TimedOut;
        }

        let wake = [session.next_deadline(), platform.next_deadline(), limit]
            .into_iter()
            .flatten()
            .min();
        if wake.is_none() && commands.is_none() {
            info!(page = session.current_page(), "Nothing left to play");
            break ViewerExit::Stalled;
        }

        let woke = tokio::select! {
            () = sleep_until(wake) => Wake::Timer,
            command = next_command(&mut commands) => Wake::Command(command),
        };

        match woke {
            Wake::Timer => {}
            Wake::Command(Some(command)) => apply(&mut session, command, clock()),
            Wake::Command(None) => {
                debug!("Command input closed");
                commands = None;
            }
        }
    };

    let final_snapshot = session.snapshot();
    // Dropping an unclosed session releases media and flushes progress
    drop(session);

    Ok(RunReport {
        exit: outcome,
        pages_visited,
        events,
        final_snapshot,
    })
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

async fn next_command(
    commands: &mut Option<UnboundedReceiver<ViewerCommand>>,
) -> Option<ViewerCommand> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn apply(session: &mut PlaybackSession, command: ViewerCommand, now: Instant) {
    debug!(command = ?command, "Applying command");
    // Every input event counts as a gesture for audio unlock
    session.on_user_gesture(now);

    match command {
        ViewerCommand::Next => session.next(now),
        ViewerCommand::Previous => session.previous(now),
        ViewerCommand::PlayPause => session.toggle_play_pause(now),
        ViewerCommand::Restart => session.restart_page(now),
        ViewerCommand::Language => session.toggle_language(now),
        ViewerCommand::ToggleTrack(track) => session.toggle_track(track, now),
        ViewerCommand::ToggleAutoPlay => session.toggle_auto_play(now),
        ViewerCommand::Volume(track, level) => session.set_volume(track, level, now),
        ViewerCommand::Seek(position) => {
            if !session.seek_sentence(position, now) {
                info!(position, "Cannot seek there");
            }
        }
        ViewerCommand::Hide => session.set_hidden(true, now),
        ViewerCommand::Show => session.set_hidden(false, now),
        ViewerCommand::Tap => {}
        ViewerCommand::Status => match serde_json::to_string(&session.snapshot()) {
            Ok(json) => info!(snapshot = %json, "Status"),
            Err(e) => debug!(error = %e, "Snapshot not serializable"),
        },
        ViewerCommand::Close => session.close(now),
    }
}

fn log_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::PageChanged { page, page_count } => {
            info!(page = page + 1, of = page_count, "Page");
        }
        PlaybackEvent::SentenceChanged {
            sentence: Some(sentence),
        } => info!(sentence, "Sentence"),
        PlaybackEvent::NarrationCompleted { page } => info!(page = page + 1, "Narration done"),
        PlaybackEvent::VideoCompleted { page } => info!(page = page + 1, "Video done"),
        PlaybackEvent::NarrationUnavailable { reason } => {
            info!(reason = %reason, "Narration unavailable, tap to enable audio");
        }
        PlaybackEvent::StoryFinished => info!("Story finished"),
        other => debug!(event = ?other, "Engine event"),
    }
}
