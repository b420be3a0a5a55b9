//! core/playback/rodio_backend.rs
//! rodio owner: one OutputStream per engine, one Sink per loaded track.
//!
//! Sinks are built lazily from a Symphonia source opened at the track's
//! stored offset, so "set time" is "drop the sink, remember the offset".
//! Without an output stream a track is silent but still keeps a wall-clock
//! position, so the timeline above it behaves the same.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rodio::mixer::Mixer;
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, warn};

use super::backend::{AudioBackend, FinishCallback, LoadOptions, TrackPlayer};
use super::decoder::{EndCallback, open_source_at_ms, probe_duration};
use crate::core::error::PlaybackError;

#[derive(Default)]
pub struct RodioBackend {
    // Keep this alive for the lifetime of the engine!
    stream: Option<OutputStream>,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for RodioBackend {
    type Track = RodioTrack;

    fn activate(&mut self) -> Result<(), PlaybackError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::SessionActivation(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn load(&mut self, path: &Path, options: LoadOptions) -> Result<RodioTrack, PlaybackError> {
        let duration = probe_duration(path)
            .map_err(|reason| PlaybackError::Decode {
                path: path.to_path_buf(),
                reason,
            })?
            .unwrap_or(0.0);

        Ok(RodioTrack {
            path: path.to_path_buf(),
            mixer: self.stream.as_ref().map(|s| s.mixer().clone()),
            duration,
            looping: options.looping,
            on_finish: options.on_finish,
            volume: 1.0,
            sink: None,
            offset: 0.0,
            silent_since: None,
            generation: 0,
        })
    }
}

pub struct RodioTrack {
    path: PathBuf,
    mixer: Option<Mixer>,
    duration: f64,
    looping: bool,
    on_finish: Option<FinishCallback>,
    volume: f32,

    sink: Option<Sink>,
    /// Where the current sink's first source starts (or the paused position).
    offset: f64,
    /// Silent mode: when the wall clock started running.
    silent_since: Option<Instant>,
    generation: u64,
}

impl RodioTrack {
    fn build_sink(&self, mixer: &Mixer) -> Option<Sink> {
        let start_ms = (self.offset * 1000.0).round() as u64;
        let source = match open_source_at_ms(&self.path, start_ms) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot open track for playback");
                return None;
            }
        };

        let sink = Sink::connect_new(mixer);
        sink.set_volume(self.volume);

        if self.looping {
            sink.append(source);
            // Second pass onward restarts at the top of the file.
            match open_source_at_ms(&self.path, 0) {
                Ok(again) => sink.append(again.repeat_infinite()),
                Err(e) => warn!(path = %self.path.display(), error = %e, "loop source unavailable"),
            }
        } else if let Some(cb) = &self.on_finish {
            let (cb, generation) = (cb.clone(), self.generation);
            let on_end: EndCallback = Box::new(move || cb(generation));
            sink.append(source.with_end_callback(on_end));
        } else {
            sink.append(source);
        }

        Some(sink)
    }

    fn wrap(&self, t: f64) -> f64 {
        if self.duration <= 0.0 {
            return t.max(0.0);
        }
        if self.looping {
            t.rem_euclid(self.duration)
        } else {
            t.clamp(0.0, self.duration)
        }
    }

    /// No output (or the file would not open): keep time on the wall clock.
    fn play_silently(&mut self) {
        if !self.looping {
            if let Some(cb) = &self.on_finish {
                // Nothing audible to wait for.
                debug!(path = %self.path.display(), "silent track finishes immediately");
                self.offset = self.duration;
                cb(self.generation);
                return;
            }
        }
        self.silent_since = Some(Instant::now());
    }

    /// Ends the current pass. Anything it still reports is stale.
    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.silent_since = None;
        self.generation += 1;
    }
}

impl TrackPlayer for RodioTrack {
    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_time(&self) -> f64 {
        if let Some(sink) = &self.sink {
            let pos = sink.get_pos().as_secs_f64();
            // Looping sinks hold [offset..end, repeat-from-0]; once the first
            // source is consumed the position is relative to the file start.
            if self.looping && sink.len() <= 1 {
                return self.wrap(pos);
            }
            return self.wrap(self.offset + pos);
        }

        match self.silent_since {
            Some(since) => self.wrap(self.offset + since.elapsed().as_secs_f64()),
            None => self.offset,
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        let was_playing = self.is_playing();
        self.release();
        self.offset = self.wrap(seconds);
        if was_playing {
            self.play();
        }
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_playing(&self) -> bool {
        if let Some(sink) = &self.sink {
            return !sink.is_paused() && !sink.empty();
        }
        self.silent_since.is_some() && (self.looping || self.current_time() < self.duration)
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            if sink.empty() {
                // Played through; start over from the stored offset.
                self.release();
            } else {
                sink.play();
                return;
            }
        }

        match self.mixer.as_ref().and_then(|m| self.build_sink(m)) {
            Some(sink) => {
                sink.play();
                self.sink = Some(sink);
            }
            None => self.play_silently(),
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
            return;
        }
        if self.silent_since.is_some() {
            self.offset = self.current_time();
            self.silent_since = None;
        }
    }

    fn stop(&mut self) {
        self.offset = self.current_time();
        self.release();
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }
}
