use crate::Result;
use bytes::BytesMut;
use log::debug;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Payloads are coalesced up to this many bytes before hitting the file.
pub const BATCH_CAPACITY: usize = 16 * 1024;

#[cfg(windows)]
const FILE_SHARE_READ: u32 = 0x0000_0001;

/// Totals reported when a sink is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkSummary {
    /// Bytes accepted through [`RecordingSink::write`]
    pub bytes_written: u64,
    /// Size of the file on disk after the final flush
    pub file_len: u64,
}

impl SinkSummary {
    /// The larger of the two counts.
    pub fn reconciled(&self) -> u64 {
        self.bytes_written.max(self.file_len)
    }
}

/// Batched writer for the output file.
///
/// The file is truncated on open and readable by other processes while it
/// grows. Bytes count as written once they are accepted into the batch; only
/// [`RecordingSink::finish`] guarantees they reached the file.
#[derive(Debug)]
pub struct RecordingSink {
    file: File,
    path: PathBuf,
    batch: BytesMut,
    bytes_written: u64,
}

impl RecordingSink {
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(windows)]
        options.share_mode(FILE_SHARE_READ);

        let file = options.open(path).await?;
        debug!("opened recording file {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
            batch: BytesMut::with_capacity(BATCH_CAPACITY),
            bytes_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Bytes accepted but not yet handed to the file.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub async fn write(&mut self, payload: &[u8]) -> Result<()> {
        if payload.is_empty() {
            return Ok(());
        }

        if self.batch.len() + payload.len() > BATCH_CAPACITY {
            self.flush_batch().await?;
        }

        if payload.len() > BATCH_CAPACITY {
            self.file.write_all(payload).await?;
        } else {
            self.batch.extend_from_slice(payload);
        }

        self.bytes_written += payload.len() as u64;
        Ok(())
    }

    async fn flush_batch(&mut self) -> Result<()> {
        if !self.batch.is_empty() {
            self.file.write_all(&self.batch).await?;
            self.batch.clear();
        }
        Ok(())
    }

    /// Write out the remaining batch, flush and close the file.
    pub async fn finish(mut self) -> Result<SinkSummary> {
        self.flush_batch().await?;
        self.file.flush().await?;
        let file_len = self.file.metadata().await?.len();
        debug!(
            "closed recording file {} ({} bytes)",
            self.path.display(),
            file_len
        );

        Ok(SinkSummary {
            bytes_written: self.bytes_written,
            file_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_small_writes_are_batched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.ts");
        let mut sink = RecordingSink::create(&path).await.unwrap();

        sink.write(&[0x47; 188]).await.unwrap();
        sink.write(&[0x47; 188]).await.unwrap();
        assert_eq!(sink.bytes_written(), 376);
        assert_eq!(sink.pending(), 376);
        assert_eq!(tokio::fs::metadata(&path).await.unwrap().len(), 0);

        let summary = sink.finish().await.unwrap();
        assert_eq!(summary, SinkSummary { bytes_written: 376, file_len: 376 });
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![0x47; 376]);
    }

    #[tokio::test]
    async fn test_full_batch_is_flushed_before_overflow() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.ts");
        let mut sink = RecordingSink::create(&path).await.unwrap();

        sink.write(&vec![1u8; BATCH_CAPACITY - 10]).await.unwrap();
        sink.write(&[2u8; 20]).await.unwrap();
        assert_eq!(sink.pending(), 20);

        let summary = sink.finish().await.unwrap();
        assert_eq!(summary.file_len, BATCH_CAPACITY as u64 + 10);
        let data = tokio::fs::read(&path).await.unwrap();
        assert_eq!(data[BATCH_CAPACITY - 11], 1);
        assert_eq!(data[BATCH_CAPACITY - 10], 2);
    }

    #[tokio::test]
    async fn test_large_payload_bypasses_batch() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.ts");
        let mut sink = RecordingSink::create(&path).await.unwrap();

        sink.write(&[9u8; 5]).await.unwrap();
        sink.write(&vec![7u8; BATCH_CAPACITY * 2]).await.unwrap();
        assert_eq!(sink.pending(), 0);

        let summary = sink.finish().await.unwrap();
        assert_eq!(summary.reconciled(), 5 + BATCH_CAPACITY as u64 * 2);
        let data = tokio::fs::read(&path).await.unwrap();
        assert_eq!(&data[..6], &[9, 9, 9, 9, 9, 7]);
    }

    #[tokio::test]
    async fn test_creates_parent_and_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("out.ts");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, vec![0u8; 1000]).unwrap();

        let sink = RecordingSink::create(&path).await.unwrap();
        let summary = sink.finish().await.unwrap();
        assert_eq!(summary.file_len, 0);

        let nested = dir.path().join("x").join("y.ts");
        RecordingSink::create(&nested).await.unwrap().finish().await.unwrap();
        assert!(nested.exists());
    }
}
