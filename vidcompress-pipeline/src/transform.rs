//! Frame transform between decoder output and encoder input.
//!
//! The decoder renders into the transform's [`RenderTarget`]; the pipeline
//! then waits for the picture, and draws it rotated and scaled to the
//! output size. Hardware backends implement [`GraphicsBackend`] on top of
//! the GPU; [`SoftwareGraphics`] does the same work on the CPU.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;
use vidcompress_core::error::{CodecError, Error, Result};
use vidcompress_core::format::Rotation;
use vidcompress_hwaccel::codec::{DecodedImage, RenderTarget, RenderedFrame};

/// How long [`FrameTransform::await_new_image`] waits by default.
pub const DEFAULT_FRAME_WAIT: Duration = Duration::from_millis(2500);

/// Output geometry of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSpec {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Rotation applied while drawing.
    pub rotation: Rotation,
    /// Whether frames go to an encoder input surface rather than raw
    /// buffers.
    pub surface_input: bool,
}

/// Per-job frame transform.
pub trait FrameTransform: Send {
    /// Surface handed to the decoder.
    fn render_target(&self) -> Arc<dyn RenderTarget>;

    /// Wait for the decoder's next picture and latch it.
    fn await_new_image(&mut self) -> Result<()>;

    /// Draw the latched picture at the output size, rows top-down.
    fn draw_image(&mut self) -> Result<RenderedFrame>;

    /// Free backend resources. Idempotent.
    fn release(&mut self);
}

/// Creates frame transforms.
pub trait GraphicsBackend: Send + Sync {
    /// Create a transform for one job.
    fn create_transform(&self, spec: &TransformSpec) -> Result<Box<dyn FrameTransform>>;
}

/// Pictures rendered by the decoder and not yet drawn.
#[derive(Debug, Default)]
pub struct ImageQueue {
    images: Mutex<VecDeque<DecodedImage>>,
    ready: Condvar,
}

impl ImageQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pictures waiting.
    pub fn len(&self) -> usize {
        self.images.lock().len()
    }

    /// Check if no picture is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the oldest picture, waiting up to `timeout` for one.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<DecodedImage> {
        let deadline = Instant::now() + timeout;
        let mut images = self.images.lock();
        while images.is_empty() {
            if self.ready.wait_until(&mut images, deadline).timed_out() {
                break;
            }
        }
        images.pop_front()
    }
}

impl RenderTarget for ImageQueue {
    fn queue_image(&self, image: DecodedImage) -> Result<()> {
        self.images.lock().push_back(image);
        self.ready.notify_one();
        Ok(())
    }
}

/// CPU implementation of [`FrameTransform`] using nearest-neighbor scaling.
pub struct SoftwareTransform {
    spec: TransformSpec,
    queue: Arc<ImageQueue>,
    latched: Option<DecodedImage>,
    frame_wait: Duration,
    released: bool,
}

impl SoftwareTransform {
    /// Create a transform for `spec`.
    pub fn new(spec: TransformSpec) -> Result<Self> {
        if spec.width == 0 || spec.height == 0 {
            return Err(Error::invalid_param(format!(
                "transform output must be non-empty, got {}x{}",
                spec.width, spec.height
            )));
        }
        Ok(Self {
            spec,
            queue: Arc::new(ImageQueue::new()),
            latched: None,
            frame_wait: DEFAULT_FRAME_WAIT,
            released: false,
        })
    }

    /// Set how long to wait for a decoded picture.
    #[must_use]
    pub fn with_frame_wait(mut self, frame_wait: Duration) -> Self {
        self.frame_wait = frame_wait;
        self
    }

    /// Output geometry.
    pub fn spec(&self) -> &TransformSpec {
        &self.spec
    }

    /// Whether [`FrameTransform::release`] was called.
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameTransform for SoftwareTransform {
    fn render_target(&self) -> Arc<dyn RenderTarget> {
        self.queue.clone()
    }

    fn await_new_image(&mut self) -> Result<()> {
        if self.released {
            return Err(CodecError::Surface("transform already released".into()).into());
        }
        match self.queue.pop_timeout(self.frame_wait) {
            Some(image) => {
                trace!(pts = image.presentation_time_us, "Latched decoded image");
                self.latched = Some(image);
                Ok(())
            }
            None => Err(CodecError::Surface(format!(
                "no frame within {} ms",
                self.frame_wait.as_millis()
            ))
            .into()),
        }
    }

    fn draw_image(&mut self) -> Result<RenderedFrame> {
        let image = self
            .latched
            .as_ref()
            .ok_or_else(|| CodecError::Surface("no image latched".into()))?;
        draw_rotated(image, self.spec.width, self.spec.height, self.spec.rotation)
    }

    fn release(&mut self) {
        self.latched = None;
        self.released = true;
    }
}

/// Backend producing [`SoftwareTransform`]s.
#[derive(Debug, Clone, Copy)]
pub struct SoftwareGraphics {
    frame_wait: Duration,
}

impl Default for SoftwareGraphics {
    fn default() -> Self {
        Self {
            frame_wait: DEFAULT_FRAME_WAIT,
        }
    }
}

impl SoftwareGraphics {
    /// Create a backend with the default frame wait.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how long transforms wait for a decoded picture.
    #[must_use]
    pub fn with_frame_wait(mut self, frame_wait: Duration) -> Self {
        self.frame_wait = frame_wait;
        self
    }
}

impl GraphicsBackend for SoftwareGraphics {
    fn create_transform(&self, spec: &TransformSpec) -> Result<Box<dyn FrameTransform>> {
        Ok(Box::new(
            SoftwareTransform::new(*spec)?.with_frame_wait(self.frame_wait),
        ))
    }
}

/// Rotate `image` clockwise by `rotation` and scale it to `width` x `height`.
pub fn draw_rotated(
    image: &DecodedImage,
    width: u32,
    height: u32,
    rotation: Rotation,
) -> Result<RenderedFrame> {
    let sw = image.width as usize;
    let sh = image.height as usize;
    if sw == 0 || sh == 0 || image.pixels.len() < sw * sh * 4 {
        return Err(CodecError::Surface(format!(
            "decoded image {}x{} holds {} bytes",
            image.width,
            image.height,
            image.pixels.len()
        ))
        .into());
    }
    let (ow, oh) = (width as usize, height as usize);
    let (rw, rh) = if rotation.swaps_dimensions() {
        (sh, sw)
    } else {
        (sw, sh)
    };

    let mut pixels = vec![0u8; ow * oh * 4];
    for oy in 0..oh {
        let ry = oy * rh / oh;
        for ox in 0..ow {
            let rx = ox * rw / ow;
            let (sx, sy) = match rotation {
                Rotation::Deg0 => (rx, ry),
                Rotation::Deg90 => (ry, sh - 1 - rx),
                Rotation::Deg180 => (sw - 1 - rx, sh - 1 - ry),
                Rotation::Deg270 => (sw - 1 - ry, rx),
            };
            let src = (sy * sw + sx) * 4;
            let dst = (oy * ow + ox) * 4;
            pixels[dst..dst + 4].copy_from_slice(&image.pixels[src..src + 4]);
        }
    }
    Ok(RenderedFrame {
        width,
        height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x1 image: red then blue.
    fn two_pixels() -> DecodedImage {
        DecodedImage {
            width: 2,
            height: 1,
            presentation_time_us: 0,
            pixels: Arc::from(vec![255, 0, 0, 255, 0, 0, 255, 255]),
        }
    }

    fn spec(width: u32, height: u32, rotation: Rotation) -> TransformSpec {
        TransformSpec {
            width,
            height,
            rotation,
            surface_input: true,
        }
    }

    #[test]
    fn test_draw_rotations() {
        let image = two_pixels();
        let red = [255, 0, 0, 255];
        let blue = [0, 0, 255, 255];

        let same = draw_rotated(&image, 2, 1, Rotation::Deg0).unwrap();
        assert_eq!(&same.pixels[..4], &red);

        let cw = draw_rotated(&image, 1, 2, Rotation::Deg90).unwrap();
        assert_eq!(&cw.pixels[..4], &red);
        assert_eq!(&cw.pixels[4..], &blue);

        let flipped = draw_rotated(&image, 2, 1, Rotation::Deg180).unwrap();
        assert_eq!(&flipped.pixels[..4], &blue);

        let ccw = draw_rotated(&image, 1, 2, Rotation::Deg270).unwrap();
        assert_eq!(&ccw.pixels[..4], &blue);
        assert_eq!(&ccw.pixels[4..], &red);
    }

    #[test]
    fn test_draw_scales() {
        let frame = draw_rotated(&two_pixels(), 4, 2, Rotation::Deg0).unwrap();
        assert_eq!(frame.pixels.len(), 4 * 2 * 4);
        assert_eq!(frame.pixels[0], 255);
        assert_eq!(frame.pixels[3 * 4 + 2], 255);
    }

    #[test]
    fn test_draw_rejects_short_image() {
        let image = DecodedImage {
            width: 4,
            height: 4,
            presentation_time_us: 0,
            pixels: Arc::from(vec![0u8; 8]),
        };
        assert!(draw_rotated(&image, 2, 2, Rotation::Deg0).is_err());
    }

    #[test]
    fn test_transform_round_trip() {
        let mut transform = SoftwareTransform::new(spec(2, 1, Rotation::Deg0))
            .unwrap()
            .with_frame_wait(Duration::from_millis(10));
        assert!(transform.draw_image().is_err());

        transform.render_target().queue_image(two_pixels()).unwrap();
        transform.await_new_image().unwrap();
        let frame = transform.draw_image().unwrap();
        assert_eq!((frame.width, frame.height), (2, 1));

        assert!(transform.await_new_image().is_err());
        transform.release();
        transform.release();
        assert!(transform.is_released());
    }

    #[test]
    fn test_rejects_empty_output() {
        assert!(SoftwareTransform::new(spec(0, 10, Rotation::Deg0)).is_err());
        assert!(SoftwareGraphics::new()
            .create_transform(&spec(10, 10, Rotation::Deg90))
            .is_ok());
    }

    #[test]
    fn test_queue_wakes_waiter() {
        let queue = Arc::new(ImageQueue::new());
        let producer = queue.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            producer.queue_image(two_pixels()).unwrap();
        });
        let image = queue.pop_timeout(Duration::from_secs(5));
        handle.join().unwrap();
        assert!(image.is_some());
        assert!(queue.is_empty());
    }
}
