use super::pool::FramePool;
use super::recorder::RTSPStreamRecorder;
use super::{RecorderOptions, RecordingProgress, RecordingResult, RecordingTarget};
use crate::config::Config;
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Something that can record a target until it ends or is cancelled.
///
/// Schedulers hold a `dyn RecordingService` so tests can substitute a fake
/// recorder for the network one.
#[async_trait]
pub trait RecordingService: Send + Sync {
    async fn record(
        &self,
        target: RecordingTarget,
        progress: Option<UnboundedSender<RecordingProgress>>,
        cancel: CancellationToken,
    ) -> RecordingResult;
}

/// [`RecordingService`] backed by [`RTSPStreamRecorder`].
///
/// Concurrent recordings share one [`FramePool`].
#[derive(Debug, Clone, Default)]
pub struct RTSPRecordingService {
    options: RecorderOptions,
    pool: FramePool,
}

impl RTSPRecordingService {
    pub fn new(options: RecorderOptions) -> Self {
        Self {
            options,
            pool: FramePool::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.recorder_options())
    }

    pub fn options(&self) -> &RecorderOptions {
        &self.options
    }
}

#[async_trait]
impl RecordingService for RTSPRecordingService {
    async fn record(
        &self,
        target: RecordingTarget,
        progress: Option<UnboundedSender<RecordingProgress>>,
        cancel: CancellationToken,
    ) -> RecordingResult {
        let mut recorder = RTSPStreamRecorder::new(target)
            .with_options(self.options.clone())
            .with_pool(self.pool.clone());
        if let Some(tx) = progress {
            recorder = recorder.with_progress(tx);
        }
        recorder.run(cancel).await
    }
}
