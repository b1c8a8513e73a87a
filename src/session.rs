use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::conditioner::SignalConditioner;
use crate::config::{DetectionConfig, MonitorConfig, MotionConfig, TrackerConfig};
use crate::detection::{DetectionCandidate, DetectionFilter};
use crate::error::{MonitorError, MonitorResult};
use crate::incident::{Event, EventClassifier};
use crate::sink::Sink;
use crate::tracker::{Track, TrackManager};
use crate::types::{AccelSample, GyroSample, SensorSample};

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Created or stopped; samples are ignored
    Idle,
    /// Conditioning and classifying samples
    Running,
}

/// Which inertial sensors the host actually has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAvailability {
    pub accelerometer: bool,
    pub gyroscope: bool,
}

impl Default for SensorAvailability {
    fn default() -> Self {
        Self {
            accelerometer: true,
            gyroscope: true,
        }
    }
}

/// Session metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: String,
    pub state: SessionState,
    pub accel_sample_count: u64,
    pub gyro_sample_count: u64,
    pub event_count: u64,
}

impl SessionMetadata {
    fn idle() -> Self {
        Self {
            session_id: String::new(),
            start_time: String::new(),
            state: SessionState::Idle,
            accel_sample_count: 0,
            gyro_sample_count: 0,
            event_count: 0,
        }
    }
}

/// Motion-safety pipeline: conditioner and classifier wired to an event sink.
///
/// Not internally synchronized; the host feeds one sample at a time.
pub struct MotionSession<S: Sink<Event>> {
    conditioner: SignalConditioner,
    classifier: EventClassifier,
    availability: SensorAvailability,
    metadata: SessionMetadata,
    sink: S,
}

impl<S: Sink<Event>> MotionSession<S> {
    pub fn new(config: &MotionConfig, sink: S) -> MonitorResult<Self> {
        config.validate()?;
        Ok(Self {
            conditioner: SignalConditioner::new(config),
            classifier: EventClassifier::new(config),
            availability: SensorAvailability::default(),
            metadata: SessionMetadata::idle(),
            sink,
        })
    }

    pub fn from_config(config: &MonitorConfig, sink: S) -> MonitorResult<Self> {
        Self::new(&config.motion, sink)
    }

    /// Transition Idle → Running.
    ///
    /// A missing sensor disables its modality for this session instead of failing.
    pub fn start(&mut self, availability: SensorAvailability) -> MonitorResult<()> {
        if self.metadata.state == SessionState::Running {
            return Err(MonitorError::AlreadyRunning);
        }

        let now = Utc::now();
        self.metadata = SessionMetadata {
            session_id: format!("session_{}", now.timestamp_millis()),
            start_time: now.to_rfc3339(),
            state: SessionState::Running,
            ..SessionMetadata::idle()
        };
        self.availability = availability;

        if !availability.accelerometer {
            log::warn!("no accelerometer: impact and braking detection disabled");
        }
        if !availability.gyroscope {
            log::warn!("no gyroscope: fall detection disabled");
        }
        log::info!("motion session {} started", self.metadata.session_id);
        Ok(())
    }

    /// Transition to Idle and clear all filter and classifier state.
    ///
    /// Safe to call when already stopped.
    pub fn stop(&mut self) {
        if self.metadata.state == SessionState::Running {
            log::info!(
                "motion session {} stopped after {} events",
                self.metadata.session_id,
                self.metadata.event_count
            );
        }
        self.metadata.state = SessionState::Idle;
        self.conditioner.reset();
        self.classifier.reset();
    }

    pub fn is_running(&self) -> bool {
        self.metadata.state == SessionState::Running
    }

    pub fn on_accel(&mut self, sample: &AccelSample) {
        if !self.is_running() || !self.availability.accelerometer {
            return;
        }
        if !sample.is_finite() {
            log::warn!("dropping non-finite accel sample at {} ms", sample.timestamp_ms);
            return;
        }
        self.metadata.accel_sample_count += 1;

        let linear = self.conditioner.condition(&sample.vector());
        for event in self.classifier.process_accel(sample.timestamp_ms, &linear) {
            self.emit(event);
        }
    }

    pub fn on_gyro(&mut self, sample: &GyroSample) {
        if !self.is_running() || !self.availability.gyroscope {
            return;
        }
        if !sample.is_finite() {
            log::warn!("dropping non-finite gyro sample at {} ms", sample.timestamp_ms);
            return;
        }
        self.metadata.gyro_sample_count += 1;

        if let Some(event) = self.classifier.process_gyro(sample) {
            self.emit(event);
        }
    }

    /// Dispatch whichever parts of a combined reading are present
    pub fn on_sample(&mut self, sample: &SensorSample) {
        if let Some(accel) = sample.accel.as_ref() {
            self.on_accel(accel);
        }
        if let Some(gyro) = sample.gyro.as_ref() {
            self.on_gyro(gyro);
        }
    }

    fn emit(&mut self, event: Event) {
        self.metadata.event_count += 1;
        log::info!(
            "{:?} at {} ms (magnitude {:.2})",
            event.kind,
            event.timestamp_ms,
            event.trigger_magnitude
        );
        self.sink.deliver(event);
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

/// Hazard-tracking pipeline: post-processor and track manager wired to a
/// snapshot sink.
pub struct HazardSession<S: Sink<Vec<Track>>> {
    filter: DetectionFilter,
    tracker: TrackManager,
    tracks_created: u64,
    sink: S,
}

impl<S: Sink<Vec<Track>>> HazardSession<S> {
    pub fn new(detection: &DetectionConfig, tracker: &TrackerConfig, sink: S) -> MonitorResult<Self> {
        detection.validate()?;
        tracker.validate()?;
        Ok(Self {
            filter: DetectionFilter::new(detection),
            tracker: TrackManager::new(tracker.clone()),
            tracks_created: 0,
            sink,
        })
    }

    pub fn from_config(config: &MonitorConfig, sink: S) -> MonitorResult<Self> {
        Self::new(&config.detection, &config.tracker, sink)
    }

    /// Decode, filter and track one raw detector frame
    pub fn process_frame(&mut self, raw: &[f32]) -> Vec<Track> {
        let candidates = self.filter.process_raw(raw);
        self.track(candidates)
    }

    /// Filter and track one frame of already-decoded candidates
    pub fn process_candidates(&mut self, candidates: Vec<DetectionCandidate>) -> Vec<Track> {
        let candidates = self.filter.apply(candidates);
        self.track(candidates)
    }

    fn track(&mut self, candidates: Vec<DetectionCandidate>) -> Vec<Track> {
        let known = self.tracker.tracks().iter().map(|t| t.id).max().unwrap_or(0);
        let tracks = self.tracker.update(candidates);
        self.tracks_created += tracks.iter().filter(|t| t.id > known).count() as u64;
        self.sink.deliver(tracks.clone());
        tracks
    }

    /// Total tracks opened since construction or the last reset
    pub fn tracks_created(&self) -> u64 {
        self.tracks_created
    }

    pub fn tracker(&self) -> &TrackManager {
        &self.tracker
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Camera session restart
    pub fn reset(&mut self) {
        log::info!(
            "hazard tracking reset after {} frames",
            self.tracker.frame_id()
        );
        self.tracker.reset();
        self.tracks_created = 0;
    }
}
