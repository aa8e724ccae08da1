use crate::frame::FrameData;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::trace;

/// Small circular buffer of recent frames shared between the camera producer
/// and the decoder consumers. Consumers only ever want the newest frame; the
/// ring exists so a slow consumer never blocks the producer.
pub struct FrameWell {
    slots: Vec<RwLock<Option<FrameData>>>,
    write_index: AtomicUsize,
    capacity: usize,
    frames_pushed: AtomicU64,
}

impl FrameWell {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "frame well capacity must be non-zero");
        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            slots.push(RwLock::new(None));
        }
        Self {
            slots,
            write_index: AtomicUsize::new(0),
            capacity,
            frames_pushed: AtomicU64::new(0),
        }
    }

    /// Push a new frame, overwriting the oldest slot.
    pub async fn push_frame(&self, frame: FrameData) {
        let index = self.write_index.fetch_add(1, Ordering::Relaxed) % self.capacity;
        trace!("Pushing frame {} into well slot {}", frame.id, index);
        *self.slots[index].write().await = Some(frame);
        self.frames_pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the most recently pushed frame, if any.
    pub async fn latest(&self) -> Option<FrameData> {
        if self.frames_pushed.load(Ordering::Relaxed) == 0 {
            return None;
        }
        // write_index points one past the most recent write
        let newest = (self.write_index.load(Ordering::Relaxed) + self.capacity - 1) % self.capacity;
        self.slots[newest].read().await.clone()
    }

    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameFormat;
    use std::time::SystemTime;

    fn frame(id: u64) -> FrameData {
        FrameData::new(id, SystemTime::now(), vec![0; 4], 2, 2, FrameFormat::Gray8)
    }

    #[tokio::test]
    async fn empty_well_has_no_latest() {
        let well = FrameWell::new(4);
        assert!(well.latest().await.is_none());
    }

    #[tokio::test]
    async fn latest_tracks_newest_frame() {
        let well = FrameWell::new(2);
        well.push_frame(frame(1)).await;
        assert_eq!(well.latest().await.unwrap().id, 1);
        well.push_frame(frame(2)).await;
        well.push_frame(frame(3)).await;
        assert_eq!(well.latest().await.unwrap().id, 3);
        assert_eq!(well.frames_pushed(), 3);
    }

    #[tokio::test]
    async fn wraps_past_capacity() {
        let well = FrameWell::new(2);
        for id in 0..10 {
            well.push_frame(frame(id)).await;
        }
        assert_eq!(well.latest().await.unwrap().id, 9);
    }
}
