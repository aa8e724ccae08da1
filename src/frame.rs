use image::GrayImage;
use std::sync::Arc;
use std::time::SystemTime;

/// Pixel format of a captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// 8-bit grayscale, tightly packed. The native detector consumes this
    /// directly without a decode step.
    Gray8,
    /// Motion JPEG. The polling fallback decodes these itself.
    Mjpeg,
}

impl FrameFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            FrameFormat::Gray8 => 1,
            FrameFormat::Mjpeg => 0, // variable, compressed
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, FrameFormat::Mjpeg)
    }
}

/// A single captured frame with shared pixel data
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Unique frame identifier
    pub id: u64,
    /// Timestamp when the frame was captured
    pub timestamp: SystemTime,
    /// Raw frame data (shared ownership, frames are cloned between tasks)
    pub data: Arc<Vec<u8>>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: FrameFormat,
}

impl FrameData {
    pub fn new(
        id: u64,
        timestamp: SystemTime,
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: FrameFormat,
    ) -> Self {
        Self {
            id,
            timestamp,
            data: Arc::new(data),
            width,
            height,
            format,
        }
    }

    /// Expected byte length for uncompressed formats
    pub fn expected_size(&self) -> Option<usize> {
        if self.format.is_compressed() {
            None
        } else {
            Some(self.width as usize * self.height as usize * self.format.bytes_per_pixel())
        }
    }

    pub fn validate_size(&self) -> bool {
        match self.expected_size() {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }

    /// Convert the frame into a grayscale image suitable for QR detection.
    ///
    /// Returns `None` on malformed data; a frame that cannot be converted is
    /// treated as a transient decode miss by callers, never an error.
    pub fn to_luma(&self) -> Option<GrayImage> {
        match self.format {
            FrameFormat::Gray8 => {
                if !self.validate_size() {
                    return None;
                }
                GrayImage::from_raw(self.width, self.height, self.data.as_ref().clone())
            }
            FrameFormat::Mjpeg => image::load_from_memory(self.data.as_ref())
                .ok()
                .map(|img| img.to_luma8()),
        }
    }

    /// Frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
