use super::pool::FramePool;
use super::progress::ProgressReporter;
use super::sink::RecordingSink;
use super::{RecorderOptions, RecordingProgress, RecordingResult, RecordingStatus, RecordingTarget};
use crate::format::rtp::PayloadExtractor;
use crate::format::rtsp::{FrameEvent, Handshake, RTSPSession, MEDIA_CHANNEL};
use crate::format::ts::PcrTracker;
use crate::{RecError, Result};
use log::{debug, error, info, warn};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

/// Where a recorder is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Connecting,
    Handshaking,
    Streaming,
    Draining,
    Terminated(RecordingStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    EndOfStream,
    TargetReached,
    Cancelled,
}

/// Everything a run owns that must be cleaned up in the drain phase,
/// whichever way the run ends.
struct RunState {
    session: Option<RTSPSession>,
    sink: Option<RecordingSink>,
    tracker: PcrTracker,
    bytes_written: u64,
    media_frames: u64,
    malformed_frames: u64,
    redirects: usize,
}

impl RunState {
    fn new(target: &RecordingTarget) -> Self {
        Self {
            session: None,
            sink: None,
            tracker: PcrTracker::new(target.target_duration),
            bytes_written: 0,
            media_frames: 0,
            malformed_frames: 0,
            redirects: 0,
        }
    }

    fn note_malformed(&mut self, what: &str) {
        self.malformed_frames += 1;
        if self.malformed_frames == 1 {
            warn!("skipping malformed interleaved frame ({})", what);
        } else {
            debug!("skipping malformed interleaved frame ({}), {} so far", what, self.malformed_frames);
        }
    }
}

/// The media path of a streaming run, borrowed from [`RunState`] for the
/// length of the frame loop.
struct Pump<'a> {
    session: &'a mut RTSPSession,
    sink: &'a mut RecordingSink,
    extractor: PayloadExtractor,
    /// Scan every n-th media frame for PCR
    sample_every: u64,
}

/// Records one RTSP stream into one file.
///
/// A recorder is consumed by [`RTSPStreamRecorder::run`], which always
/// returns a [`RecordingResult`]: failures are reported in it rather than
/// raised.
pub struct RTSPStreamRecorder {
    target: RecordingTarget,
    options: RecorderOptions,
    pool: FramePool,
    progress: Option<UnboundedSender<RecordingProgress>>,
    state: RecorderState,
}

impl RTSPStreamRecorder {
    pub fn new(target: RecordingTarget) -> Self {
        Self {
            target,
            options: RecorderOptions::default(),
            pool: FramePool::default(),
            progress: None,
            state: RecorderState::Idle,
        }
    }

    pub fn with_options(mut self, options: RecorderOptions) -> Self {
        self.options = options;
        self
    }

    /// Share frame buffers with other recorders.
    pub fn with_pool(mut self, pool: FramePool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_progress(mut self, tx: UnboundedSender<RecordingProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Receiver for progress updates of the coming run.
    pub fn progress_receiver(&mut self) -> UnboundedReceiver<RecordingProgress> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.progress = Some(tx);
        rx
    }

    pub fn target(&self) -> &RecordingTarget {
        &self.target
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    fn transition(&mut self, next: RecorderState) {
        debug!("{}: {:?} -> {:?}", self.target.url, self.state, next);
        self.state = next;
    }

    pub async fn run(mut self, cancel: CancellationToken) -> RecordingResult {
        let started = Instant::now();
        let mut run = RunState::new(&self.target);
        let mut reporter = ProgressReporter::new(self.progress.take(), self.options.progress_interval);

        info!(
            "recording {} to {} (target {:?}, {})",
            self.target.url,
            self.target.output_path.display(),
            self.target.target_duration,
            self.target.transport
        );

        let outcome = self.drive(&mut run, &mut reporter, &cancel).await;

        self.transition(RecorderState::Draining);
        let mut bytes_written = run.bytes_written;
        let mut drain_error = None;
        if let Some(sink) = run.sink.take() {
            match sink.finish().await {
                Ok(summary) => bytes_written = bytes_written.max(summary.reconciled()),
                Err(e) => {
                    error!("failed to finish {}: {}", self.target.output_path.display(), e);
                    drain_error = Some(e);
                }
            }
        }

        let pcr_elapsed_seconds = run.tracker.elapsed_seconds();
        reporter.finish(bytes_written, pcr_elapsed_seconds);

        if let Some(session) = run.session.take() {
            session.teardown().await;
        }

        let outcome = match (outcome, drain_error) {
            (Ok(_), Some(e)) => Err(e),
            (outcome, _) => outcome,
        };

        let status = if cancel.is_cancelled() {
            RecordingStatus::Cancelled
        } else {
            match &outcome {
                Ok(StopReason::Cancelled) => RecordingStatus::Cancelled,
                Ok(_) => RecordingStatus::Completed,
                Err(_) => RecordingStatus::Failed,
            }
        };

        let error_message = match (&outcome, status) {
            (Err(e), RecordingStatus::Failed) => {
                error!("recording {} failed: {}", self.target.url, e);
                if let Some(response) = e.response() {
                    debug!("server response:\n{}", response);
                }
                Some(e.to_string())
            }
            (Err(e), _) => {
                debug!("error after cancellation of {}: {}", self.target.url, e);
                None
            }
            _ => None,
        };

        let wall = started.elapsed().as_secs_f64();
        info!(
            "recording {} {:?}: {} bytes, {} frames, {} malformed, {} redirects, pcr {:?} s, {:.1} s wall, {:.1} KB/s",
            self.target.url,
            status,
            bytes_written,
            run.media_frames,
            run.malformed_frames,
            run.redirects,
            pcr_elapsed_seconds,
            wall,
            if wall > 0.0 { bytes_written as f64 / 1024.0 / wall } else { 0.0 }
        );

        self.transition(RecorderState::Terminated(status));

        RecordingResult {
            success: status == RecordingStatus::Completed,
            status,
            bytes_written,
            error_message,
            output_path: self.target.output_path.clone(),
            pcr_elapsed_seconds,
            stopped_by_pcr: matches!(outcome, Ok(StopReason::TargetReached)),
        }
    }

    async fn drive(
        &mut self,
        run: &mut RunState,
        reporter: &mut ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<StopReason> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(StopReason::Cancelled),
            established = self.establish(run) => established?,
        }

        // no file is created unless PLAY succeeded
        run.sink = Some(RecordingSink::create(&self.target.output_path).await?);
        self.transition(RecorderState::Streaming);
        self.stream(run, reporter, cancel).await
    }

    /// Connect and handshake, following redirects up to the configured limit.
    async fn establish(&mut self, run: &mut RunState) -> Result<()> {
        loop {
            self.transition(RecorderState::Connecting);
            let session = run.session.insert(
                RTSPSession::connect(
                    &self.target.url,
                    self.target.transport,
                    self.options.connect_timeout,
                    self.options.io_timeout,
                )
                .await?,
            );

            self.transition(RecorderState::Handshaking);
            match session.handshake().await? {
                Handshake::Playing => return Ok(()),
                Handshake::Redirect(location) => {
                    if let Some(previous) = run.session.take() {
                        previous.close().await;
                    }
                    run.redirects += 1;
                    if run.redirects > self.options.max_redirects {
                        return Err(RecError::TooManyRedirects {
                            limit: self.options.max_redirects,
                        });
                    }
                    self.target = self.target.redirected(&location);
                }
            }
        }
    }

    async fn stream(
        &self,
        run: &mut RunState,
        reporter: &mut ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<StopReason> {
        let extractor = PayloadExtractor::new(self.target.transport);
        let sample_every = if run.tracker.has_target() {
            self.options.pcr_sample_interval.max(1)
        } else {
            1
        };

        let (Some(mut session), Some(mut sink)) = (run.session.take(), run.sink.take()) else {
            return Err(RecError::Protocol("streaming started without a session".into()));
        };

        let media = Pump {
            session: &mut session,
            sink: &mut sink,
            extractor,
            sample_every,
        };
        let stop = self.pump(media, run, reporter, cancel).await;

        run.session = Some(session);
        run.sink = Some(sink);
        stop
    }

    async fn pump(
        &self,
        media: Pump<'_>,
        run: &mut RunState,
        reporter: &mut ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<StopReason> {
        let Pump {
            session,
            sink,
            extractor,
            sample_every,
        } = media;
        let mut frames = session.frames();
        loop {
            let mut buf = self.pool.acquire();
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StopReason::Cancelled),
                event = frames.next_frame(&mut buf[..]) => event?,
            };

            let payload = match event {
                FrameEvent::Frame {
                    channel: MEDIA_CHANNEL,
                    payload,
                } => payload,
                FrameEvent::Frame { channel, payload } => {
                    debug!("ignoring {} bytes on interleaved channel {}", payload.len(), channel);
                    continue;
                }
                FrameEvent::Resync => {
                    run.note_malformed("missing '$' marker");
                    continue;
                }
                FrameEvent::EmptyFrame => {
                    run.note_malformed("zero length");
                    continue;
                }
                FrameEvent::EndOfStream => {
                    info!("server closed the stream for {}", self.target.url);
                    return Ok(StopReason::EndOfStream);
                }
            };

            let Some(ts) = extractor.extract(payload) else {
                run.note_malformed("truncated RTP header");
                continue;
            };
            if ts.is_empty() {
                continue;
            }

            sink.write(ts).await?;
            run.bytes_written = sink.bytes_written();
            run.media_frames += 1;

            if run.media_frames % sample_every == 0 && run.tracker.scan(ts) {
                info!(
                    "target duration reached for {} at {:?} s of media",
                    self.target.url,
                    run.tracker.elapsed_seconds()
                );
                return Ok(StopReason::TargetReached);
            }

            reporter.maybe_emit(run.bytes_written, run.tracker.elapsed_seconds());
        }
    }
}
