//! `MediaOutput` backed by a `rodio` sink on the default output device.
//!
//! Each loaded resource gets its own paused `Sink`. Once the graph is
//! attached every new sink is fed through `EqualizedSource`.

use std::fs::File;
use std::io::BufReader;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::{debug, info, warn};

use crate::error::{PlayerError, Result};
use crate::library::ResourceRef;

use super::graph::{EqualizedSource, GraphTaps};
use super::media::MediaOutput;

pub struct RodioOutput {
    /// `None` when no device could be opened; transport state is still
    /// tracked so the rest of the player keeps working.
    stream: Option<OutputStream>,
    sink: Option<Sink>,
    resource: Option<ResourceRef>,
    duration: Option<f64>,
    /// Position the current sink started at.
    offset: f64,
    taps: Option<GraphTaps>,
    volume: f32,
    rate: f32,
    playing: bool,
}

impl RodioOutput {
    pub fn open() -> Self {
        let stream = match OutputStreamBuilder::open_default_stream() {
            Ok(mut stream) => {
                // rodio logs to stderr when the stream is dropped, which
                // scribbles over the terminal UI.
                stream.log_on_drop(false);
                info!("audio output opened");
                Some(stream)
            }
            Err(e) => {
                let err = PlayerError::NoOutput(e.to_string());
                warn!(error = %err, "continuing without audio output");
                None
            }
        };
        Self {
            stream,
            sink: None,
            resource: None,
            duration: None,
            offset: 0.0,
            taps: None,
            volume: 1.0,
            rate: 1.0,
            playing: false,
        }
    }

    /// Decode `resource` and prepare a paused sink starting at `start_at`.
    fn build(
        &self,
        resource: &ResourceRef,
        start_at: Duration,
    ) -> Result<(Option<Sink>, Option<f64>)> {
        let path = resource.to_path();
        let file = File::open(&path).map_err(|source| PlayerError::ResourceOpen {
            resource: resource.to_string(),
            source,
        })?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| PlayerError::ResourceDecode {
                resource: resource.to_string(),
                reason: e.to_string(),
            })?;
        let total = decoder.total_duration().map(|d| d.as_secs_f64());

        let Some(stream) = &self.stream else {
            return Ok((None, total));
        };

        let sink = Sink::connect_new(stream.mixer());
        let source = decoder.skip_duration(start_at);
        match &self.taps {
            Some(taps) => sink.append(EqualizedSource::new(source, taps.clone())),
            None => sink.append(source),
        }
        sink.pause();
        sink.set_volume(self.volume);
        sink.set_speed(self.rate);
        Ok((Some(sink), total))
    }

    fn replace_sink(&mut self, sink: Option<Sink>) {
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.sink = sink;
    }

    fn rebuild_at(&mut self, secs: f64) {
        let Some(resource) = self.resource.clone() else {
            return;
        };
        match self.build(&resource, Duration::from_secs_f64(secs)) {
            Ok((sink, _)) => {
                self.replace_sink(sink);
                self.offset = secs;
                if self.playing {
                    if let Some(s) = &self.sink {
                        s.play();
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to reopen resource for seek"),
        }
    }
}

impl MediaOutput for RodioOutput {
    fn load(&mut self, resource: &ResourceRef, duration_hint: Option<f64>) -> Result<()> {
        let (sink, total) = self.build(resource, Duration::ZERO)?;
        self.replace_sink(sink);
        self.resource = Some(resource.clone());
        self.duration = total.filter(|d| *d > 0.0).or(duration_hint);
        self.offset = 0.0;
        self.playing = false;
        debug!(%resource, duration = ?self.duration, "resource loaded");
        Ok(())
    }

    fn unload(&mut self) {
        self.replace_sink(None);
        self.resource = None;
        self.duration = None;
        self.offset = 0.0;
        self.playing = false;
    }

    fn is_loaded(&self) -> bool {
        self.resource.is_some()
    }

    fn attach_graph(&mut self, taps: GraphTaps) {
        if self.taps.is_some() {
            warn!("audio graph already attached");
            return;
        }
        self.taps = Some(taps);
        if self.resource.is_some() {
            let at = self.position();
            self.rebuild_at(at);
        }
    }

    fn play(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
        self.playing = self.resource.is_some();
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        self.playing = false;
    }

    fn position(&self) -> f64 {
        let elapsed = self
            .sink
            .as_ref()
            .map_or(0.0, |s| s.get_pos().as_secs_f64());
        self.offset + elapsed
    }

    fn set_position(&mut self, secs: f64) {
        let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
        if self.sink.is_none() {
            self.offset = secs;
            return;
        }
        // a paused or drained sink never answers a seek order
        let live = self.playing && self.sink.as_ref().is_some_and(|s| !s.empty());
        if !live {
            self.rebuild_at(secs);
            return;
        }
        let seeked = self
            .sink
            .as_ref()
            .map(|s| s.try_seek(Duration::from_secs_f64(secs)));
        match seeked {
            Some(Ok(())) => self.offset = 0.0,
            Some(Err(e)) => {
                debug!(error = %e, "seek unsupported, reopening");
                self.rebuild_at(secs);
            }
            None => {}
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
        if let Some(sink) = &self.sink {
            sink.set_speed(rate);
        }
    }

    fn has_ended(&self) -> bool {
        self.resource.is_some() && self.sink.as_ref().is_some_and(Sink::empty)
    }
}
