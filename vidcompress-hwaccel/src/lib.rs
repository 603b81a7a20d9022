//! Codec access and device capability handling for vidcompress.
//!
//! Hardware codecs are supplied by the platform through [`CodecCatalog`].
//! This crate decides which encoder a job uses and how its raw input
//! buffers are laid out:
//!
//! - [`CapabilityResolver`] picks the encoder and color format
//! - [`quirks`] holds the per-vendor padding and chroma tables
//! - [`convert_video_frame`] fills raw encoder input from RGBA frames
//!
//! # Example
//!
//! ```ignore
//! use vidcompress_hwaccel::{CapabilityResolver, DevicePlatform};
//!
//! let resolver = CapabilityResolver::new(catalog, DevicePlatform::new("lge", "Nexus 4", 17));
//! let resolved = resolver.resolve("video/avc", 640, 360)?;
//! println!("{} with {}", resolved.codec.name, resolved.profile.color_format);
//! ```

pub mod codec;
pub mod convert;
pub mod error;
pub mod platform;
pub mod quirks;
pub mod resolver;

pub use codec::{
    CodecCatalog, CodecInfo, DecodedImage, EncoderInputSurface, MediaCodec, OutputStatus,
    RenderTarget, RenderedFrame, VideoDecoder, VideoEncoder,
};
pub use convert::convert_video_frame;
pub use error::{HwAccelError, Result};
pub use platform::{DevicePlatform, ROTATION_RENDER_MIN_VERSION, SURFACE_INPUT_MIN_VERSION};
pub use quirks::{BufferLayout, ProcessorFamily, VendorQuirk};
pub use resolver::{
    select_codec, select_color_format, CapabilityResolver, DeviceProfile, ResolvedEncoder,
};
