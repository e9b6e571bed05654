// ABOUTME: Built-in MJPEG plugin (§4.11) — always registered, lowest rank, universally accepted fallback
// ABOUTME: Pulls raw frames from an external display surface and encodes each one to a JPEG buffer

use crate::error::{CaptureError, ConfigError};
use crate::plugin::{FrameCapture, FrameInfo, Plugin};
use jpeg_encoder::{ColorType, Encoder};

/// SPICE's `SPICE_VIDEO_CODEC_TYPE_MJPEG` value — MJPEG is codec id 1 in the
/// reference protocol's codec enumeration.
pub const MJPEG_CODEC_ID: u8 = 1;

/// Raw pixel source the MJPEG plugin pulls from. An external collaborator:
/// this crate only depends on the contract, not on how the guest display is
/// actually grabbed.
pub trait DisplaySurface: Send {
    /// Block until the next frame is available. Returns packed RGBA pixels
    /// plus the frame's dimensions.
    fn grab_frame(&mut self) -> Result<(Vec<u8>, u32, u32), CaptureError>;
}

/// Opens a [`DisplaySurface`] on demand; registered once as a [`Plugin`],
/// this is what `create_capture` calls to obtain a fresh provider.
pub trait DisplaySurfaceFactory: Send + Sync {
    fn open(&self) -> Option<Box<dyn DisplaySurface>>;
}

pub struct MjpegPlugin {
    factory: Box<dyn DisplaySurfaceFactory>,
    quality: u8,
}

impl MjpegPlugin {
    pub fn new(factory: Box<dyn DisplaySurfaceFactory>) -> Self {
        MjpegPlugin { factory, quality: 80 }
    }
}

impl Plugin for MjpegPlugin {
    fn create_capture(&self) -> Option<Box<dyn FrameCapture>> {
        let surface = self.factory.open()?;
        Some(Box::new(MjpegCapture {
            surface,
            quality: self.quality,
            first_frame: true,
        }))
    }

    fn rank(&self) -> u32 {
        // Lowest rank: MJPEG is the fallback every host viewer accepts, not
        // the preferred codec when something better is negotiable.
        0
    }

    fn video_codec_type(&self) -> u8 {
        MJPEG_CODEC_ID
    }

    fn parse_option(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        if key == "mjpeg-quality" {
            let quality: u8 = value.parse().map_err(|_| ConfigError::InvalidOptionValue {
                key: key.to_string(),
                reason: "expected an integer 1-100".to_string(),
            })?;
            if quality == 0 || quality > 100 {
                return Err(ConfigError::InvalidOptionValue {
                    key: key.to_string(),
                    reason: "must be between 1 and 100".to_string(),
                });
            }
            self.quality = quality;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mjpeg"
    }
}

struct MjpegCapture {
    surface: Box<dyn DisplaySurface>,
    quality: u8,
    first_frame: bool,
}

impl FrameCapture for MjpegCapture {
    fn capture_frame(&mut self) -> Result<FrameInfo, CaptureError> {
        let (pixels, width, height) = self.surface.grab_frame()?;

        let mut buffer = Vec::new();
        let encoder = Encoder::new(&mut buffer, self.quality);
        encoder
            .encode(&pixels, width as u16, height as u16, ColorType::Rgba)
            .map_err(|e| CaptureError::ProviderFailed(e.to_string()))?;

        let stream_start = self.first_frame;
        self.first_frame = false;

        Ok(FrameInfo {
            buffer,
            width,
            height,
            stream_start,
        })
    }

    fn video_codec_type(&self) -> u8 {
        MJPEG_CODEC_ID
    }
}
