use crate::format::rtsp::MAX_INTERLEAVED_PAYLOAD;
use bytes::BytesMut;
use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

const DEFAULT_MAX_IDLE: usize = 16;

/// Reusable frame buffers, each large enough for any interleaved payload.
///
/// A recorder takes one buffer per loop iteration and gives it back when the
/// guard drops, so steady-state streaming allocates nothing. Clones share
/// the same pool, which lets concurrent recorders reuse each other's buffers.
#[derive(Clone)]
pub struct FramePool {
    idle: Arc<Mutex<Vec<BytesMut>>>,
    buffer_size: usize,
    max_idle: usize,
}

impl fmt::Debug for FramePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FramePool")
            .field("buffer_size", &self.buffer_size)
            .field("max_idle", &self.max_idle)
            .field("idle", &self.idle_count())
            .finish()
    }
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new(MAX_INTERLEAVED_PAYLOAD, DEFAULT_MAX_IDLE)
    }
}

impl FramePool {
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            idle: Arc::new(Mutex::new(Vec::new())),
            buffer_size,
            max_idle,
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn acquire(&self) -> PooledBuffer {
        let buf = self
            .idle
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::zeroed(self.buffer_size));
        PooledBuffer {
            buf: Some(buf),
            pool: self.clone(),
        }
    }

    fn release(&self, buf: BytesMut) {
        if buf.len() != self.buffer_size {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }
}

/// A buffer on loan from a [`FramePool`].
pub struct PooledBuffer {
    buf: Option<BytesMut>,
    pool: FramePool,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
