//! core/playback/engine.rs
//! Meditation engine (owner of the session's four tracks).
//!
//! Owns:
//! - the audio backend (output session) and the loaded role tracks
//! - the timeline + its 1 s ticker
//! - the Now-Playing bridge
//!
//! Everything here runs on the engine thread. Asynchronous notifications
//! (bell finished, interruptions) arrive as `PlayerCommand`s on the same
//! channel as UI commands, so state is only ever touched from one place.
//! No Iced imports.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::Instant;

use tracing::{debug, info, warn};

use super::backend::{AudioBackend, FinishCallback, LoadOptions, TrackPlayer};
use super::timeline::{NarrationCue, Ticker, Timeline};
use super::{Interruption, PlayerCommand, PlayerEvent};
use crate::core::artwork::load_artwork;
use crate::core::assets::{AssetLocator, AssetResolver, category_token};
use crate::core::error::PlaybackError;
use crate::core::now_playing::{CommandStatus, NowPlayingBridge, NowPlayingCenter, RemoteCommand};
use crate::core::types::{AudioRole, EngineState, SessionDescriptor};

/// Seeking below this re-arms the intro bell ("restart from the top").
const BELL_REARM_SECONDS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Configured,
    Ready,
    Stopped,
}

pub struct MeditationEngine<B: AudioBackend, L, C> {
    backend: B,
    resolver: AssetResolver<L>,
    now_playing: NowPlayingBridge<C>,
    events: Sender<PlayerEvent>,
    // Loopback into our own command channel (bell completion).
    notifier: Sender<PlayerCommand>,

    artist: String,
    artwork: Option<PathBuf>,

    session: Option<SessionDescriptor>,
    lifecycle: Lifecycle,

    soundscape: Option<B::Track>,
    soundscape_path: Option<PathBuf>,
    opening: Option<B::Track>,
    closing: Option<B::Track>,
    bell: Option<B::Track>,

    timeline: Timeline,
    ticker: Ticker,
    has_played_bell: bool,
    // Countdown parked by a scrub preview until the seek lands.
    scrub_held: bool,

    soundscape_volume: f32,
    narration_volume: f32,

    // Local clocks captured on pause/seek, each relative to its own track start.
    soundscape_timestamp: f64,
    narration_timestamp: f64,
}

impl<B, L, C> MeditationEngine<B, L, C>
where
    B: AudioBackend,
    L: AssetLocator,
    C: NowPlayingCenter,
{
    pub fn new(
        backend: B,
        resolver: AssetResolver<L>,
        center: C,
        events: Sender<PlayerEvent>,
        notifier: Sender<PlayerCommand>,
    ) -> Self {
        Self {
            backend,
            resolver,
            now_playing: NowPlayingBridge::new(center),
            events,
            notifier,
            artist: String::new(),
            artwork: None,
            session: None,
            lifecycle: Lifecycle::Idle,
            soundscape: None,
            soundscape_path: None,
            opening: None,
            closing: None,
            bell: None,
            timeline: Timeline::empty(),
            ticker: Ticker::default(),
            has_played_bell: false,
            scrub_held: false,
            soundscape_volume: 0.5,
            narration_volume: 0.5,
            soundscape_timestamp: 0.0,
            narration_timestamp: 0.0,
        }
    }

    /// Constant metadata shown on the Now-Playing surface.
    pub fn with_now_playing(mut self, artist: impl Into<String>, artwork: Option<PathBuf>) -> Self {
        self.artist = artist.into();
        self.artwork = artwork;
        self
    }

    pub fn state(&self) -> EngineState {
        self.timeline.state()
    }

    // -------------------------------------------------------------------------
    // Command loop
    // -------------------------------------------------------------------------

    pub fn run(&mut self, command_rx: Receiver<PlayerCommand>) {
        loop {
            let received = match self.ticker.timeout(Instant::now()) {
                Some(wait) => command_rx.recv_timeout(wait),
                None => command_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(cmd) => {
                    if self.handle_command(cmd) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if self.ticker.is_due(Instant::now()) {
                self.ticker.advance();
                self.tick();
            }
        }

        self.stop();
        debug!("engine loop exited");
    }

    /// Returns true when the loop should exit.
    pub fn handle_command(&mut self, cmd: PlayerCommand) -> bool {
        let result = match cmd {
            PlayerCommand::Configure(session) => {
                self.configure(session);
                Ok(())
            }
            PlayerCommand::Start => self.start(),
            PlayerCommand::Play => self.play(),
            PlayerCommand::Pause => {
                self.pause();
                Ok(())
            }
            PlayerCommand::Seek(to) => self.seek(to),
            PlayerCommand::ScrubPreview(to) => self.scrub_preview(to),
            PlayerCommand::SetVolumes {
                soundscape,
                narration,
            } => {
                self.set_volumes(soundscape, narration);
                Ok(())
            }
            PlayerCommand::Stop => {
                self.stop();
                Ok(())
            }
            PlayerCommand::Remote(command) => {
                let status = self.handle_remote(command);
                let _ = self
                    .events
                    .send(PlayerEvent::RemoteHandled { command, status });
                Ok(())
            }
            PlayerCommand::Interruption(interruption) => {
                self.handle_interruption(interruption);
                Ok(())
            }
            PlayerCommand::TrackFinished { role, generation } => {
                self.on_track_finished(role, generation);
                Ok(())
            }
            PlayerCommand::Shutdown => return true,
        };

        if let Err(e) = result {
            warn!(error = %e, "command rejected");
            let _ = self.events.send(PlayerEvent::Error(e.to_string()));
        }

        false
    }

    // -------------------------------------------------------------------------
    // Session lifecycle
    // -------------------------------------------------------------------------

    pub fn configure(&mut self, session: SessionDescriptor) {
        if self.lifecycle == Lifecycle::Ready {
            warn!(title = %session.title, "configure ignored while a session is loaded");
            return;
        }
        debug!(title = %session.title, folder = %session.folder, "session configured");
        self.session = Some(session);
        self.lifecycle = Lifecycle::Configured;
    }

    pub fn start(&mut self) -> Result<(), PlaybackError> {
        let session = self.session.clone().ok_or(PlaybackError::NotConfigured)?;
        if self.lifecycle == Lifecycle::Ready {
            debug!("start ignored, session already loaded");
            return Ok(());
        }

        if let Err(e) = self.backend.activate() {
            warn!(error = %e, "continuing without audio output");
        }

        self.timeline = Timeline::empty();
        self.soundscape_path = None;

        let mut loaded = Vec::new();
        for role in AudioRole::ALL {
            let Some((path, track)) = self.load_role(role, &session.folder) else {
                continue;
            };
            let duration = track.duration();
            match role {
                AudioRole::Soundscape => {
                    self.timeline.set_soundscape(duration);
                    self.soundscape = Some(track);
                    self.soundscape_path = Some(path);
                }
                AudioRole::OpeningNarration => {
                    self.timeline.set_opening(duration);
                    self.opening = Some(track);
                }
                AudioRole::ClosingNarration => {
                    self.timeline.set_closing(duration);
                    self.closing = Some(track);
                }
                AudioRole::IntroBell => self.bell = Some(track),
            }
            loaded.push(role);
        }

        self.apply_volumes();
        self.has_played_bell = false;
        self.soundscape_timestamp = 0.0;
        self.narration_timestamp = 0.0;
        self.lifecycle = Lifecycle::Ready;

        info!(
            title = %session.title,
            total = self.state().total_duration,
            closing_start = self.timeline.closing_start(),
            roles = loaded.len(),
            "session loaded"
        );

        let artwork = load_artwork(self.artwork.as_deref(), self.soundscape_path.as_deref());
        self.now_playing.register_commands();
        self.now_playing
            .configure(&session.title, &self.artist, artwork, &self.state());

        let _ = self.events.send(PlayerEvent::Loaded(loaded));
        self.publish();
        Ok(())
    }

    fn load_role(&mut self, role: AudioRole, folder: &str) -> Option<(PathBuf, B::Track)> {
        let Some(path) = self.resolver.resolve(role, folder) else {
            let missing = PlaybackError::ResourceMissing {
                role,
                token: category_token(folder).to_string(),
            };
            debug!(%missing, "role omitted");
            return None;
        };

        let options = match role {
            AudioRole::Soundscape => LoadOptions {
                looping: true,
                on_finish: None,
            },
            AudioRole::IntroBell => {
                let notifier = self.notifier.clone();
                let on_finish: FinishCallback = Arc::new(move |generation| {
                    let _ = notifier.send(PlayerCommand::TrackFinished {
                        role: AudioRole::IntroBell,
                        generation,
                    });
                });
                LoadOptions {
                    looping: false,
                    on_finish: Some(on_finish),
                }
            }
            AudioRole::OpeningNarration | AudioRole::ClosingNarration => LoadOptions::default(),
        };

        match self.backend.load(&path, options) {
            Ok(track) => {
                info!(%role, path = %path.display(), duration = track.duration(), "role loaded");
                Some((path, track))
            }
            Err(e) => {
                warn!(%role, error = %e, "role omitted");
                None
            }
        }
    }

    /// Safe from any state, including never started, and when repeated.
    pub fn stop(&mut self) {
        self.ticker.stop();
        self.scrub_held = false;
        self.has_played_bell = false;
        if self.lifecycle != Lifecycle::Ready {
            return;
        }

        for track in self.tracks_mut() {
            track.stop();
        }
        self.soundscape = None;
        self.soundscape_path = None;
        self.opening = None;
        self.closing = None;
        self.bell = None;

        self.timeline = Timeline::empty();
        self.soundscape_timestamp = 0.0;
        self.narration_timestamp = 0.0;
        self.lifecycle = Lifecycle::Stopped;

        self.now_playing.clear();
        self.now_playing.unregister_commands();
        self.publish();
        info!("session stopped");
    }

    // -------------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------------

    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.ensure_ready()?;
        if self.timeline.is_empty() {
            return Err(PlaybackError::EmptySession);
        }
        if self.timeline.is_playing() {
            return Ok(());
        }

        self.timeline.set_playing(true);

        let gate = !self.has_played_bell && self.bell.is_some();
        if gate {
            if let Some(bell) = self.bell.as_mut() {
                debug!("intro bell gating the timeline");
                bell.play();
            }
        } else {
            self.resume_audio();
            self.start_ticker();
        }

        self.publish();
        self.now_playing.update_playback(&self.state());
        Ok(())
    }

    pub fn pause(&mut self) {
        if !self.timeline.is_playing() {
            return;
        }

        self.timeline.set_playing(false);
        self.ticker.stop();
        self.scrub_held = false;
        self.pause_audio();

        self.publish();
        self.now_playing.update_playback(&self.state());
    }

    pub fn seek(&mut self, to: f64) -> Result<(), PlaybackError> {
        self.ensure_ready()?;
        let target = self.timeline.clamp(to);
        let gating = self.bell_gating();

        if target < BELL_REARM_SECONDS {
            self.rearm_bell();
            if gating {
                if let Some(bell) = self.bell.as_mut() {
                    bell.play();
                }
            }
        } else {
            self.has_played_bell = true;
            if let Some(bell) = self.bell.as_mut() {
                bell.stop();
            }
        }

        self.seek_internal(target);

        if gating && self.has_played_bell {
            debug!("seek cancelled the intro bell");
            self.resume_audio();
            self.start_ticker();
        }
        if self.scrub_held {
            self.scrub_held = false;
            self.start_ticker();
        }

        self.publish();
        self.now_playing.update_playback(&self.state());
        Ok(())
    }

    /// Positional preview during a drag. Never starts anything; a running
    /// countdown is held until the committing `seek`.
    pub fn scrub_preview(&mut self, to: f64) -> Result<(), PlaybackError> {
        self.ensure_ready()?;
        let target = self.timeline.clamp(to);

        if self.ticker.is_active() {
            self.ticker.stop();
            self.scrub_held = true;
        }

        self.timeline.publish_time_from(target);
        self.soundscape_timestamp = target;
        self.narration_timestamp = match self.timeline.cue_at(target) {
            NarrationCue::Opening { offset } | NarrationCue::Closing { offset } => offset,
            NarrationCue::Silent => 0.0,
        };

        self.publish();
        Ok(())
    }

    pub fn set_volumes(&mut self, soundscape: f32, narration: f32) {
        self.soundscape_volume = soundscape.clamp(0.0, 1.0);
        self.narration_volume = narration.clamp(0.0, 1.0);
        self.apply_volumes();
    }

    // -------------------------------------------------------------------------
    // External notifications
    // -------------------------------------------------------------------------

    pub fn on_track_finished(&mut self, role: AudioRole, generation: u64) {
        if role != AudioRole::IntroBell {
            debug!(%role, "finish notification ignored");
            return;
        }
        // Stale: paused, cancelled by a seek, or restarted since.
        if !self.timeline.is_playing() || self.has_played_bell {
            return;
        }
        if self.bell.as_ref().is_none_or(|b| b.generation() != generation) {
            debug!(generation, "finish from an earlier bell pass ignored");
            return;
        }

        debug!("intro bell finished");
        self.has_played_bell = true;
        self.resume_audio();
        self.start_ticker();
        self.publish();
    }

    pub fn handle_remote(&mut self, command: RemoteCommand) -> CommandStatus {
        if !self.now_playing.is_registered() {
            return CommandStatus::CommandFailed;
        }
        if self.timeline.is_empty() {
            return CommandStatus::NoActionableItem;
        }

        let result = match command {
            RemoteCommand::Play => self.play(),
            RemoteCommand::Pause => {
                self.pause();
                Ok(())
            }
            RemoteCommand::TogglePlayPause => {
                if self.timeline.is_playing() {
                    self.pause();
                    Ok(())
                } else {
                    self.play()
                }
            }
        };

        match result {
            Ok(()) => CommandStatus::Success,
            Err(e) => {
                warn!(?command, error = %e, "remote command failed");
                CommandStatus::CommandFailed
            }
        }
    }

    pub fn handle_interruption(&mut self, interruption: Interruption) {
        match interruption {
            Interruption::Began => {
                info!("audio interruption began");
                self.pause();
            }
            Interruption::Ended { should_resume } => {
                // Resuming is left to the user.
                info!(should_resume, "audio interruption ended");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Timeline
    // -------------------------------------------------------------------------

    pub fn tick(&mut self) {
        if !self.timeline.is_playing() {
            self.ticker.stop();
            return;
        }
        if self.scrub_held {
            return;
        }
        if self.timeline.time_remaining() == 0 {
            self.finish_session();
            return;
        }

        let previous = self.timeline.elapsed() as f64;
        self.timeline.step();
        self.publish();
        self.now_playing.update_elapsed(&self.state());

        let elapsed = self.timeline.elapsed() as f64;
        debug!(remaining = self.timeline.time_remaining(), "tick");
        self.check_closing_onset(previous, elapsed);
    }

    fn check_closing_onset(&mut self, previous: f64, elapsed: f64) {
        // Only on the tick that crosses the start.
        if !self.timeline.in_closing(elapsed) || self.timeline.in_closing(previous) {
            return;
        }
        if self.closing.as_ref().is_none_or(|c| c.is_playing()) {
            return;
        }

        if let Some(opening) = self.opening.as_mut() {
            if opening.is_playing() {
                opening.stop();
            }
        }

        let playhead = match &self.soundscape {
            Some(s) if s.is_playing() => s.current_time(),
            _ => elapsed,
        };
        let offset = self.timeline.closing_offset(playhead);
        if let Some(closing) = self.closing.as_mut() {
            info!(offset, "closing narration starting");
            closing.set_current_time(offset);
            closing.play();
        }
        self.narration_timestamp = offset;
    }

    fn finish_session(&mut self) {
        self.ticker.stop();
        self.timeline.set_playing(false);
        self.pause_audio();
        self.rearm_bell();
        self.seek_internal(0.0);

        self.publish();
        self.now_playing.update_playback(&self.state());

        let duration = self.state().total_duration;
        info!(duration, "session finished");
        let _ = self.events.send(PlayerEvent::SessionFinished { duration });
    }

    fn start_ticker(&mut self) {
        if !self.timeline.is_playing() || self.ticker.is_active() {
            return;
        }
        // The logical playhead, not the looping track's clock: a soundscape
        // parked at its very end reads back as 0.
        self.timeline.publish_time_from(self.soundscape_timestamp);
        self.ticker.start(Instant::now());
    }

    // -------------------------------------------------------------------------
    // Audio helpers
    // -------------------------------------------------------------------------

    fn resume_audio(&mut self) {
        // Interruptions can leave outputs muted.
        self.apply_volumes();

        if let Some(soundscape) = self.soundscape.as_mut() {
            soundscape.set_current_time(self.soundscape_timestamp);
            soundscape.play();
        }

        let narration = match self.timeline.cue_at(self.soundscape_timestamp) {
            NarrationCue::Opening { .. } => self.opening.as_mut(),
            NarrationCue::Closing { .. } => self.closing.as_mut(),
            NarrationCue::Silent => None,
        };
        if let Some(track) = narration {
            track.set_current_time(self.narration_timestamp);
            track.play();
        }
    }

    /// Pauses whatever is sounding and records the local clocks.
    fn pause_audio(&mut self) {
        if let Some(soundscape) = self.soundscape.as_mut() {
            if soundscape.is_playing() {
                self.soundscape_timestamp = soundscape.current_time();
                soundscape.pause();
            }
        }

        let mut captured = None;
        for track in [self.opening.as_mut(), self.closing.as_mut()]
            .into_iter()
            .flatten()
        {
            if track.is_playing() {
                captured = Some(track.current_time());
                track.pause();
            }
        }
        self.narration_timestamp = match captured {
            Some(t) => t,
            None => match self.timeline.cue_at(self.soundscape_timestamp) {
                NarrationCue::Opening { offset } | NarrationCue::Closing { offset } => offset,
                NarrationCue::Silent => 0.0,
            },
        };

        if let Some(bell) = self.bell.as_mut() {
            if bell.is_playing() {
                bell.pause();
            }
        }

        debug!(
            soundscape = self.soundscape_timestamp,
            narration = self.narration_timestamp,
            "clocks captured"
        );
    }

    /// Positions every track for `target` and re-derives the eligible
    /// narration. Only starts audio if the main timeline is running.
    fn seek_internal(&mut self, target: f64) {
        let running = self.ticker.is_active() || self.scrub_held;

        self.timeline.publish_time_from(target);
        self.soundscape_timestamp = target;
        if let Some(soundscape) = self.soundscape.as_mut() {
            soundscape.set_current_time(target);
        }

        let (eligible, other, offset) = match self.timeline.cue_at(target) {
            NarrationCue::Opening { offset } => {
                (self.opening.as_mut(), self.closing.as_mut(), offset)
            }
            NarrationCue::Closing { offset } => {
                (self.closing.as_mut(), self.opening.as_mut(), offset)
            }
            NarrationCue::Silent => {
                for track in [self.opening.as_mut(), self.closing.as_mut()]
                    .into_iter()
                    .flatten()
                {
                    track.stop();
                }
                self.narration_timestamp = 0.0;
                return;
            }
        };

        if let Some(other) = other {
            other.stop();
        }
        if let Some(track) = eligible {
            track.set_current_time(offset);
            if running && !track.is_playing() {
                track.play();
            }
        }
        self.narration_timestamp = offset;
    }

    fn rearm_bell(&mut self) {
        self.has_played_bell = false;
        if let Some(bell) = self.bell.as_mut() {
            bell.stop();
            bell.set_current_time(0.0);
        }
    }

    fn bell_gating(&self) -> bool {
        self.timeline.is_playing()
            && !self.ticker.is_active()
            && !self.scrub_held
            && !self.has_played_bell
            && self.bell.is_some()
    }

    fn apply_volumes(&mut self) {
        let (soundscape, narration) = (self.soundscape_volume, self.narration_volume);
        if let Some(track) = self.soundscape.as_mut() {
            track.set_volume(soundscape);
        }
        for track in [self.opening.as_mut(), self.closing.as_mut(), self.bell.as_mut()]
            .into_iter()
            .flatten()
        {
            track.set_volume(narration);
        }
    }

    fn tracks_mut(&mut self) -> impl Iterator<Item = &mut B::Track> {
        [
            self.soundscape.as_mut(),
            self.opening.as_mut(),
            self.closing.as_mut(),
            self.bell.as_mut(),
        ]
        .into_iter()
        .flatten()
    }

    fn ensure_ready(&self) -> Result<(), PlaybackError> {
        if self.lifecycle == Lifecycle::Ready {
            Ok(())
        } else {
            Err(PlaybackError::NotStarted)
        }
    }

    fn publish(&self) {
        let _ = self.events.send(PlayerEvent::State(self.timeline.state()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::now_playing::tests::RecordingCenter;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::path::Path;
    use std::rc::Rc;
    use std::sync::mpsc;

    const SOUNDSCAPE: &str = "audio/calming/soundscape.mp3";
    const OPENING: &str = "audio/calming/opening.mp3";
    const CLOSING: &str = "audio/calming/closing.mp3";
    const BELL: &str = "audio/player/start.mp3";

    #[derive(Debug, Default)]
    struct FakeClock {
        duration: f64,
        looping: bool,
        time: f64,
        playing: bool,
        volume: f32,
        plays: usize,
        generation: u64,
        // Played through; the next play starts a new pass.
        ended: bool,
    }

    struct FakeTrack {
        clock: Rc<RefCell<FakeClock>>,
    }

    impl TrackPlayer for FakeTrack {
        fn duration(&self) -> f64 {
            self.clock.borrow().duration
        }
        fn current_time(&self) -> f64 {
            self.clock.borrow().time
        }
        fn set_current_time(&mut self, seconds: f64) {
            let mut c = self.clock.borrow_mut();
            c.time = if c.looping && c.duration > 0.0 {
                seconds.rem_euclid(c.duration)
            } else {
                seconds.clamp(0.0, c.duration)
            };
            c.generation += 1;
        }
        fn is_playing(&self) -> bool {
            self.clock.borrow().playing
        }
        fn generation(&self) -> u64 {
            self.clock.borrow().generation
        }
        fn play(&mut self) {
            let mut c = self.clock.borrow_mut();
            if c.ended {
                c.ended = false;
                c.generation += 1;
            }
            c.playing = true;
            c.plays += 1;
        }
        fn pause(&mut self) {
            self.clock.borrow_mut().playing = false;
        }
        fn stop(&mut self) {
            let mut c = self.clock.borrow_mut();
            c.playing = false;
            c.generation += 1;
        }
        fn set_volume(&mut self, volume: f32) {
            self.clock.borrow_mut().volume = volume;
        }
    }

    #[derive(Default)]
    struct FakeBackend {
        durations: HashMap<PathBuf, f64>,
        broken: HashSet<PathBuf>,
        clocks: Rc<RefCell<HashMap<PathBuf, Rc<RefCell<FakeClock>>>>>,
        callbacks: Rc<RefCell<HashMap<PathBuf, FinishCallback>>>,
    }

    impl AudioBackend for FakeBackend {
        type Track = FakeTrack;

        fn activate(&mut self) -> Result<(), PlaybackError> {
            Err(PlaybackError::SessionActivation("no device in tests".into()))
        }

        fn load(&mut self, path: &Path, options: LoadOptions) -> Result<FakeTrack, PlaybackError> {
            if self.broken.contains(path) {
                return Err(PlaybackError::Decode {
                    path: path.to_path_buf(),
                    reason: "bad header".into(),
                });
            }
            let clock = Rc::new(RefCell::new(FakeClock {
                duration: self.durations.get(path).copied().unwrap_or(0.0),
                looping: options.looping,
                volume: 1.0,
                ..FakeClock::default()
            }));
            self.clocks
                .borrow_mut()
                .insert(path.to_path_buf(), clock.clone());
            if let Some(cb) = options.on_finish {
                self.callbacks.borrow_mut().insert(path.to_path_buf(), cb);
            }
            Ok(FakeTrack { clock })
        }
    }

    struct SetLocator(HashSet<PathBuf>);

    impl AssetLocator for SetLocator {
        fn locate(&self, relative: &Path) -> Option<PathBuf> {
            self.0.contains(relative).then(|| relative.to_path_buf())
        }
    }

    type TestEngine = MeditationEngine<FakeBackend, SetLocator, RecordingCenter>;

    struct Harness {
        engine: TestEngine,
        clocks: Rc<RefCell<HashMap<PathBuf, Rc<RefCell<FakeClock>>>>>,
        callbacks: Rc<RefCell<HashMap<PathBuf, FinishCallback>>>,
        center: RecordingCenter,
        events: Receiver<PlayerEvent>,
        notices: Receiver<PlayerCommand>,
    }

    impl Harness {
        fn new(files: &[(&str, f64)]) -> Self {
            Self::with_broken(files, &[])
        }

        fn with_broken(files: &[(&str, f64)], broken: &[&str]) -> Self {
            let backend = FakeBackend {
                durations: files.iter().map(|(p, d)| (PathBuf::from(p), *d)).collect(),
                broken: broken.iter().map(PathBuf::from).collect(),
                ..FakeBackend::default()
            };
            let clocks = backend.clocks.clone();
            let callbacks = backend.callbacks.clone();

            let locator = SetLocator(files.iter().map(|(p, _)| PathBuf::from(p)).collect());
            let resolver = AssetResolver::new(locator, vec!["mp3".into()]);
            let center = RecordingCenter::default();
            let (event_tx, events) = mpsc::channel();
            let (notice_tx, notices) = mpsc::channel();

            let engine = MeditationEngine::new(backend, resolver, center.clone(), event_tx, notice_tx)
                .with_now_playing("Inara", None);

            Self {
                engine,
                clocks,
                callbacks,
                center,
                events,
                notices,
            }
        }

        fn started(files: &[(&str, f64)]) -> Self {
            let mut h = Self::new(files);
            h.engine
                .configure(SessionDescriptor::new("Calm", "audio/calming"));
            h.engine.start().unwrap();
            h.drain();
            h
        }

        fn clock(&self, path: &str) -> Rc<RefCell<FakeClock>> {
            self.clocks.borrow()[Path::new(path)].clone()
        }

        fn playing(&self, path: &str) -> bool {
            self.clock(path).borrow().playing
        }

        fn bell_generation(&self) -> u64 {
            self.clock(BELL).borrow().generation
        }

        /// Plays the bell through and redispatches its notification.
        fn finish_bell(&mut self) {
            let clock = self.clock(BELL);
            let generation = {
                let mut c = clock.borrow_mut();
                c.playing = false;
                c.ended = true;
                c.generation
            };
            self.notify_bell_finished(generation);
        }

        /// Fires the bell's finish callback as the audio thread would.
        fn notify_bell_finished(&mut self, generation: u64) {
            let cb = self.callbacks.borrow()[Path::new(BELL)].clone();
            cb(generation);
            while let Ok(cmd) = self.notices.try_recv() {
                assert!(!self.engine.handle_command(cmd));
            }
        }

        fn drain(&self) -> Vec<PlayerEvent> {
            self.events.try_iter().collect()
        }

        fn states(&self) -> Vec<EngineState> {
            self.drain()
                .into_iter()
                .filter_map(|e| match e {
                    PlayerEvent::State(s) => Some(s),
                    _ => None,
                })
                .collect()
        }
    }

    fn full_session() -> Vec<(&'static str, f64)> {
        vec![
            (SOUNDSCAPE, 600.0),
            (OPENING, 60.0),
            (CLOSING, 45.0),
            (BELL, 4.0),
        ]
    }

    #[test]
    fn start_loads_every_role_and_publishes() {
        let mut h = Harness::new(&full_session());
        h.engine
            .configure(SessionDescriptor::new("Calm", "audio/calming"));
        h.engine.start().unwrap();

        let events = h.drain();
        assert!(events.iter().any(|e| matches!(
            e,
            PlayerEvent::Loaded(roles) if roles.len() == 4
        )));
        let state = h.engine.state();
        assert_eq!(state.total_duration, 600);
        assert_eq!(state.time_remaining, 600);
        assert!(!state.is_playing);

        let info = h.center.last().unwrap();
        assert_eq!(info.title, "Calm");
        assert_eq!(info.artist, "Inara");
        assert_eq!(info.duration, 600.0);
        assert_eq!(*h.center.enabled.borrow(), vec![true]);
    }

    #[test]
    fn start_requires_configure() {
        let mut h = Harness::new(&full_session());
        assert!(matches!(h.engine.start(), Err(PlaybackError::NotConfigured)));
        assert!(matches!(h.engine.play(), Err(PlaybackError::NotStarted)));
    }

    #[test]
    fn configure_is_ignored_once_loaded() {
        let mut h = Harness::started(&full_session());
        h.engine
            .configure(SessionDescriptor::new("Other", "audio/focus"));
        assert_eq!(h.engine.session.as_ref().unwrap().title, "Calm");
    }

    #[test]
    fn without_closing_the_start_is_the_end_and_nothing_auto_starts() {
        let mut h = Harness::started(&[(SOUNDSCAPE, 600.0), (OPENING, 60.0)]);
        assert_eq!(h.engine.timeline.closing_start(), 600.0);

        h.engine.seek(595.0).unwrap();
        h.engine.play().unwrap();
        for _ in 0..5 {
            h.engine.tick();
        }
        assert_eq!(h.engine.state().time_remaining, 0);
        assert!(h.engine.closing.is_none());
        assert!(!h.playing(OPENING));
    }

    #[test]
    fn closing_starts_on_the_tick_that_crosses_its_start() {
        let mut h = Harness::started(&[(SOUNDSCAPE, 600.0), (CLOSING, 45.0)]);
        assert_eq!(h.engine.timeline.closing_start(), 555.0);

        h.engine.seek(554.0).unwrap();
        h.engine.play().unwrap();
        assert!(!h.playing(CLOSING));
        h.drain();

        h.engine.tick();
        let states = h.states();
        assert_eq!(states.last().unwrap().time_remaining, 45);
        assert!(h.playing(CLOSING));
        assert_eq!(h.clock(CLOSING).borrow().time, 0.0);

        // Already sounding: later ticks leave it alone.
        h.engine.tick();
        assert_eq!(h.clock(CLOSING).borrow().plays, 1);
    }

    #[test]
    fn closing_onset_stops_a_running_opening() {
        let mut h = Harness::started(&[(SOUNDSCAPE, 100.0), (OPENING, 80.0), (CLOSING, 30.0)]);
        h.engine.seek(69.0).unwrap();
        h.engine.play().unwrap();
        assert!(h.playing(OPENING));

        h.engine.tick();
        assert!(!h.playing(OPENING));
        assert!(h.playing(CLOSING));
    }

    #[test]
    fn bell_gates_the_timeline_until_it_finishes() {
        let mut h = Harness::started(&full_session());
        h.engine.play().unwrap();

        assert!(h.engine.state().is_playing);
        assert!(h.playing(BELL));
        assert!(!h.playing(SOUNDSCAPE));
        assert!(!h.engine.ticker.is_active());
        assert_eq!(h.engine.state().time_remaining, 600);

        h.finish_bell();
        assert!(h.engine.has_played_bell);
        assert!(h.engine.ticker.is_active());
        assert!(h.playing(SOUNDSCAPE));
        assert!(h.playing(OPENING));

        h.engine.tick();
        assert_eq!(h.engine.state().time_remaining, 599);
    }

    #[test]
    fn seek_near_zero_rearms_the_bell_and_later_seeks_cancel_it() {
        let mut h = Harness::started(&full_session());
        h.engine.play().unwrap();
        h.finish_bell();

        h.engine.seek(0.5).unwrap();
        assert!(!h.engine.has_played_bell);

        h.engine.seek(5.0).unwrap();
        assert!(h.engine.has_played_bell);
        assert!(!h.playing(BELL));
    }

    #[test]
    fn seek_past_the_bell_while_gating_starts_the_timeline() {
        let mut h = Harness::started(&full_session());
        h.engine.play().unwrap();
        assert!(h.playing(BELL));

        h.engine.seek(30.0).unwrap();
        assert!(!h.playing(BELL));
        assert!(h.engine.ticker.is_active());
        assert!(h.playing(SOUNDSCAPE));
        assert!(h.playing(OPENING));
        assert_eq!(h.clock(OPENING).borrow().time, 30.0);

        // A late notification from the cancelled bell changes nothing.
        h.finish_bell();
        assert_eq!(h.clock(SOUNDSCAPE).borrow().plays, 1);
    }

    #[test]
    fn seek_publishes_remaining_from_the_floor_of_the_target() {
        let mut h = Harness::started(&full_session());
        for target in [0.0, 0.5, 1.0, 59.9, 300.25, 554.99, 600.0] {
            h.engine.seek(target).unwrap();
            let s = h.states().pop().unwrap();
            assert_eq!(s.time_remaining, 600 - target.floor() as u32);
            approx::assert_abs_diff_eq!(s.progress, target / 600.0, epsilon = 1e-12);
        }

        h.engine.seek(-10.0).unwrap();
        assert_eq!(h.states().pop().unwrap().time_remaining, 600);
        h.engine.seek(10_000.0).unwrap();
        assert_eq!(h.states().pop().unwrap().time_remaining, 0);
    }

    #[test]
    fn seek_switches_narrations_without_overlap() {
        let mut h = Harness::started(&full_session());
        h.engine.seek(5.0).unwrap();
        h.engine.play().unwrap();
        assert!(h.playing(OPENING));

        h.engine.seek(100.0).unwrap();
        assert!(!h.playing(OPENING));
        assert!(!h.playing(CLOSING));

        h.engine.seek(560.0).unwrap();
        assert!(h.playing(CLOSING));
        assert_eq!(h.clock(CLOSING).borrow().time, 5.0);

        h.engine.seek(10.0).unwrap();
        assert!(h.playing(OPENING));
        assert!(!h.playing(CLOSING));
    }

    #[test]
    fn seek_while_paused_does_not_start_narration() {
        let mut h = Harness::started(&full_session());
        h.engine.seek(20.0).unwrap();
        assert!(!h.playing(OPENING));
        assert_eq!(h.clock(OPENING).borrow().time, 20.0);
        assert_eq!(h.engine.narration_timestamp, 20.0);
    }

    #[test]
    fn pause_is_idempotent() {
        let mut h = Harness::started(&full_session());
        h.engine.seek(10.0).unwrap();
        h.engine.play().unwrap();
        h.engine.tick();
        h.clock(SOUNDSCAPE).borrow_mut().time = 11.0;
        h.clock(OPENING).borrow_mut().time = 11.0;
        h.drain();

        h.engine.pause();
        let once = h.engine.state();
        let clocks = (h.engine.soundscape_timestamp, h.engine.narration_timestamp);
        assert_eq!(clocks, (11.0, 11.0));
        assert_eq!(h.states().len(), 1);

        h.engine.pause();
        assert_eq!(h.engine.state(), once);
        assert_eq!(
            (h.engine.soundscape_timestamp, h.engine.narration_timestamp),
            clocks
        );
        assert!(h.states().is_empty());
        assert!(!h.engine.ticker.is_active());
    }

    #[test]
    fn resume_restores_captured_clocks() {
        let mut h = Harness::started(&full_session());
        h.engine.seek(10.0).unwrap();
        h.engine.play().unwrap();
        h.clock(SOUNDSCAPE).borrow_mut().time = 42.0;
        h.clock(OPENING).borrow_mut().time = 42.0;
        h.engine.pause();

        h.clock(SOUNDSCAPE).borrow_mut().time = 0.0;
        h.engine.play().unwrap();
        assert_eq!(h.clock(SOUNDSCAPE).borrow().time, 42.0);
        assert!(h.playing(OPENING));
        assert_eq!(h.clock(OPENING).borrow().time, 42.0);
    }

    #[test]
    fn play_while_playing_is_a_no_op() {
        let mut h = Harness::started(&[(SOUNDSCAPE, 60.0)]);
        h.engine.play().unwrap();
        h.drain();
        h.engine.play().unwrap();
        assert!(h.states().is_empty());
        assert_eq!(h.clock(SOUNDSCAPE).borrow().plays, 1);
    }

    #[test]
    fn seek_to_zero_then_play_rings_the_bell_again() {
        let mut h = Harness::started(&full_session());
        h.engine.play().unwrap();
        h.finish_bell();
        h.engine.tick();
        h.engine.pause();

        h.engine.seek(0.0).unwrap();
        h.engine.play().unwrap();
        assert!(h.playing(BELL));
        assert_eq!(h.clock(BELL).borrow().plays, 2);
        assert_eq!(h.clock(BELL).borrow().time, 0.0);
        assert!(!h.engine.ticker.is_active());
    }

    #[test]
    fn final_tick_pauses_resets_and_reports_completion() {
        let mut h = Harness::started(&[(SOUNDSCAPE, 3.0), (BELL, 2.0)]);
        h.engine.play().unwrap();
        h.finish_bell();
        for _ in 0..3 {
            h.engine.tick();
        }
        assert_eq!(h.engine.state().time_remaining, 0);
        assert!(h.engine.state().is_playing);
        h.drain();

        h.engine.tick();
        let events = h.drain();
        let states: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                PlayerEvent::State(s) => Some(*s),
                _ => None,
            })
            .collect();
        assert_eq!(states.len(), 1);
        assert!(!states[0].is_playing);
        assert_eq!(states[0].time_remaining, 3);
        assert_eq!(states[0].progress, 0.0);
        assert!(matches!(
            events.last(),
            Some(PlayerEvent::SessionFinished { duration: 3 })
        ));

        assert!(!h.engine.ticker.is_active());
        assert!(!h.engine.has_played_bell);
        assert!(!h.playing(SOUNDSCAPE));
        assert_eq!(h.clock(SOUNDSCAPE).borrow().time, 0.0);
    }

    #[test]
    fn missing_roles_degrade_to_a_simpler_session() {
        let mut h = Harness::new(&[(SOUNDSCAPE, 120.0)]);
        h.engine
            .configure(SessionDescriptor::new("Calm", "audio/calming"));
        h.engine.start().unwrap();
        assert!(h.drain().iter().any(|e| matches!(
            e,
            PlayerEvent::Loaded(roles) if roles == &vec![AudioRole::Soundscape]
        )));

        // No bell: the timeline starts right away.
        h.engine.play().unwrap();
        assert!(h.engine.ticker.is_active());
        assert!(h.playing(SOUNDSCAPE));
    }

    #[test]
    fn undecodable_roles_are_omitted() {
        let mut h = Harness::with_broken(&full_session(), &[OPENING]);
        h.engine
            .configure(SessionDescriptor::new("Calm", "audio/calming"));
        h.engine.start().unwrap();
        assert!(h.engine.opening.is_none());
        assert!(h.engine.closing.is_some());
        assert_eq!(h.engine.state().total_duration, 600);
    }

    #[test]
    fn empty_session_cannot_play() {
        let mut h = Harness::started(&[(OPENING, 60.0)]);
        assert_eq!(h.engine.state().total_duration, 0);
        assert!(matches!(h.engine.play(), Err(PlaybackError::EmptySession)));

        h.engine.seek(30.0).unwrap();
        let s = h.states().pop().unwrap();
        assert_eq!(s.time_remaining, 0);
        assert_eq!(s.progress, 0.0);
    }

    #[test]
    fn remote_commands_report_their_outcome() {
        let mut h = Harness::new(&full_session());
        assert_eq!(
            h.engine.handle_remote(RemoteCommand::Play),
            CommandStatus::CommandFailed
        );

        h.engine
            .configure(SessionDescriptor::new("Calm", "audio/calming"));
        h.engine.start().unwrap();
        assert_eq!(
            h.engine.handle_remote(RemoteCommand::TogglePlayPause),
            CommandStatus::Success
        );
        assert!(h.engine.state().is_playing);
        assert_eq!(h.center.last().unwrap().playback_rate, 1.0);

        assert_eq!(
            h.engine.handle_remote(RemoteCommand::TogglePlayPause),
            CommandStatus::Success
        );
        assert!(!h.engine.state().is_playing);
        assert_eq!(h.center.last().unwrap().playback_rate, 0.0);

        let mut empty = Harness::started(&[(BELL, 3.0)]);
        assert_eq!(
            empty.engine.handle_remote(RemoteCommand::Play),
            CommandStatus::NoActionableItem
        );
        empty.engine.stop();
    }

    #[test]
    fn remote_command_through_the_channel_emits_a_receipt() {
        let mut h = Harness::started(&full_session());
        assert!(!h.engine.handle_command(PlayerCommand::Remote(RemoteCommand::Pause)));
        assert!(h.drain().iter().any(|e| matches!(
            e,
            PlayerEvent::RemoteHandled {
                command: RemoteCommand::Pause,
                status: CommandStatus::Success
            }
        )));
    }

    #[test]
    fn stop_is_safe_anytime_and_idempotent() {
        let mut h = Harness::new(&full_session());
        h.engine.stop();
        h.engine.stop();
        assert!(h.center.published.borrow().is_empty());

        h.engine
            .configure(SessionDescriptor::new("Calm", "audio/calming"));
        h.engine.start().unwrap();
        h.engine.play().unwrap();
        h.finish_bell();

        h.engine.stop();
        assert!(!h.engine.ticker.is_active());
        assert!(!h.playing(SOUNDSCAPE));
        assert_eq!(h.center.last(), None);
        assert_eq!(*h.center.enabled.borrow(), vec![true, false]);
        let published = h.center.published.borrow().len();

        h.engine.stop();
        assert_eq!(h.center.published.borrow().len(), published);
        assert!(matches!(h.engine.play(), Err(PlaybackError::NotStarted)));

        // Stopped sessions can be loaded again.
        h.engine.start().unwrap();
        assert_eq!(h.engine.state().total_duration, 600);
    }

    #[test]
    fn interruption_pauses_and_does_not_auto_resume() {
        let mut h = Harness::started(&[(SOUNDSCAPE, 60.0)]);
        h.engine.play().unwrap();

        h.engine.handle_interruption(Interruption::Began);
        assert!(!h.engine.state().is_playing);

        h.engine.handle_interruption(Interruption::Ended {
            should_resume: true,
        });
        assert!(!h.engine.state().is_playing);
        assert!(!h.playing(SOUNDSCAPE));
    }

    #[test]
    fn bell_follows_narration_volume() {
        let mut h = Harness::started(&full_session());
        h.engine.set_volumes(0.2, 1.4);

        assert_eq!(h.clock(SOUNDSCAPE).borrow().volume, 0.2);
        for path in [OPENING, CLOSING, BELL] {
            assert_eq!(h.clock(path).borrow().volume, 1.0);
        }
    }

    #[test]
    fn scrub_preview_never_starts_playback() {
        let mut h = Harness::started(&full_session());
        h.engine.scrub_preview(570.0).unwrap();

        let s = h.states().pop().unwrap();
        assert_eq!(s.time_remaining, 30);
        assert!(!s.is_playing);
        assert!(!h.playing(CLOSING));
        assert!(!h.playing(BELL));
        assert_eq!(h.engine.narration_timestamp, 15.0);
    }

    #[test]
    fn stale_bell_notification_is_ignored_while_paused() {
        let mut h = Harness::started(&full_session());
        h.engine.play().unwrap();
        h.engine.pause();

        let generation = h.bell_generation();
        h.engine.on_track_finished(AudioRole::IntroBell, generation);
        assert!(!h.engine.has_played_bell);
        assert!(!h.playing(SOUNDSCAPE));
    }

    #[test]
    fn bell_finish_counts_while_the_output_still_reports_playing() {
        let mut h = Harness::started(&full_session());
        h.engine.play().unwrap();
        assert!(h.playing(BELL));

        // The sink can still hold the drained source when the notice lands.
        let generation = h.bell_generation();
        h.notify_bell_finished(generation);
        assert!(h.engine.has_played_bell);
        assert!(h.engine.ticker.is_active());
        assert!(h.playing(SOUNDSCAPE));
    }

    #[test]
    fn finish_from_a_replaced_bell_pass_is_ignored() {
        let mut h = Harness::started(&full_session());
        h.engine.play().unwrap();
        let first = h.bell_generation();

        // Seeking to the top while gating restarts the bell.
        h.engine.seek(0.5).unwrap();
        assert!(h.playing(BELL));
        assert_ne!(h.bell_generation(), first);

        h.notify_bell_finished(first);
        assert!(!h.engine.has_played_bell);
        assert!(!h.engine.ticker.is_active());
        assert!(!h.playing(SOUNDSCAPE));

        h.finish_bell();
        assert!(h.engine.has_played_bell);
        assert!(h.engine.ticker.is_active());
    }

    #[test]
    fn scrub_preview_holds_the_countdown_until_the_seek_lands() {
        let mut h = Harness::started(&full_session());
        h.engine.seek(100.0).unwrap();
        h.engine.play().unwrap();
        assert!(h.engine.ticker.is_active());

        // Finger down just before the closing start.
        h.engine.scrub_preview(554.5).unwrap();
        assert!(!h.engine.ticker.is_active());
        h.engine.tick();
        assert_eq!(h.engine.state().time_remaining, 46);
        assert!(!h.playing(CLOSING));
        assert!(h.playing(SOUNDSCAPE));
        assert_eq!(h.clock(SOUNDSCAPE).borrow().time, 100.0);

        h.engine.seek(554.5).unwrap();
        assert!(h.engine.ticker.is_active());
        assert_eq!(h.clock(SOUNDSCAPE).borrow().time, 554.5);
        assert_eq!(h.engine.state().time_remaining, 46);

        h.clock(SOUNDSCAPE).borrow_mut().time = 555.5;
        h.engine.tick();
        assert!(h.playing(CLOSING));
        assert_eq!(h.clock(CLOSING).borrow().time, 0.5);
    }

    #[test]
    fn pause_during_a_scrub_releases_the_hold() {
        let mut h = Harness::started(&[(SOUNDSCAPE, 600.0)]);
        h.engine.play().unwrap();
        h.engine.scrub_preview(300.0).unwrap();
        h.engine.pause();
        assert!(!h.engine.scrub_held);

        h.engine.seek(300.0).unwrap();
        assert!(!h.engine.ticker.is_active());
        assert!(!h.playing(SOUNDSCAPE));

        h.engine.play().unwrap();
        assert!(h.engine.ticker.is_active());
        assert_eq!(h.engine.state().time_remaining, 300);
    }

    #[test]
    fn playing_from_the_very_end_completes_instead_of_restarting() {
        let mut h = Harness::started(&full_session());
        h.engine.seek(600.0).unwrap();
        h.engine.play().unwrap();

        // The looping soundscape reads the end of the file back as its start.
        assert_eq!(h.clock(SOUNDSCAPE).borrow().time, 0.0);
        let s = h.states().pop().unwrap();
        assert!(s.is_playing);
        assert_eq!(s.time_remaining, 0);
        assert_eq!(s.progress, 1.0);
        assert!(!h.playing(BELL));

        h.engine.tick();
        assert!(h.drain().iter().any(|e| matches!(
            e,
            PlayerEvent::SessionFinished { duration: 600 }
        )));
        assert_eq!(h.engine.state().time_remaining, 600);
    }

    #[test]
    fn shutdown_ends_the_loop() {
        let mut h = Harness::started(&full_session());
        assert!(h.engine.handle_command(PlayerCommand::Shutdown));
    }
}
