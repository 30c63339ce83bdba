//! Image decoding and 2D texture upload.
//!
//! Provides [`DecodedImage`] (8-bit pixels, rows flipped for GL's
//! bottom-left origin), the channel-count to device-format mapping, and the
//! owned [`Texture`].

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{DynamicImage, ImageReader};
use thiserror::Error;

use super::context::GraphicsContext;

/// Errors from decoding an image or creating/filling a texture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TextureError {
    /// The image file could not be opened or decoded.
    #[error("failed to load texture {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    /// The device refused to create a texture object.
    #[error("failed to create texture: {0}")]
    Create(String),

    /// Image dimensions do not fit the device's signed size arguments.
    #[error("image of {width}x{height} exceeds device limits")]
    TooLarge { width: u32, height: u32 },

    /// A raw pixel buffer did not match `width * height * channels`.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelCount { expected: usize, actual: usize },

    /// A raw pixel buffer declared zero channels.
    #[error("image must have at least one channel")]
    ZeroChannels,
}

/// Device pixel formats the viewer uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelFormat {
    Red,
    Rgb,
    Rgba,
}

impl ChannelFormat {
    /// Maps a decoded channel count to a device format.
    ///
    /// 1, 3, and 4 channels map directly. Every other count is reported as
    /// [`UnsupportedChannelCount`], whose [`fallback`](UnsupportedChannelCount::fallback)
    /// is [`ChannelFormat::Rgb`].
    pub fn for_channels(channels: u8) -> Result<Self, UnsupportedChannelCount> {
        match channels {
            1 => Ok(ChannelFormat::Red),
            3 => Ok(ChannelFormat::Rgb),
            4 => Ok(ChannelFormat::Rgba),
            other => Err(UnsupportedChannelCount { channels: other }),
        }
    }

    /// The GL format constant, also used as the unsized internal format.
    pub fn gl_format(self) -> u32 {
        match self {
            ChannelFormat::Red => glow::RED,
            ChannelFormat::Rgb => glow::RGB,
            ChannelFormat::Rgba => glow::RGBA,
        }
    }

    /// Bytes per pixel for 8-bit data in this format.
    pub fn channels(self) -> usize {
        match self {
            ChannelFormat::Red => 1,
            ChannelFormat::Rgb => 3,
            ChannelFormat::Rgba => 4,
        }
    }
}

/// Warning: an image's channel count has no direct device format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedChannelCount {
    pub channels: u8,
}

impl UnsupportedChannelCount {
    /// The format used instead.
    pub fn fallback(self) -> ChannelFormat {
        ChannelFormat::Rgb
    }
}

impl fmt::Display for UnsupportedChannelCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported number of channels: {}", self.channels)
    }
}

impl std::error::Error for UnsupportedChannelCount {}

/// Tightly packed 8-bit pixels ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    channels: u8,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wraps a raw pixel buffer.
    ///
    /// # Errors
    ///
    /// `TextureError::ZeroChannels` for `channels == 0`, or
    /// `TextureError::PixelCount` if `pixels` is not exactly
    /// `width * height * channels` bytes.
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Result<Self, TextureError> {
        if channels == 0 {
            return Err(TextureError::ZeroChannels);
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(TextureError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    /// Converts a decoded image, narrowing to 8 bits per channel and
    /// optionally flipping rows so row 0 is the bottom of the picture.
    pub fn from_dynamic(image: DynamicImage, flip_vertically: bool) -> Self {
        let image = if flip_vertically { image.flipv() } else { image };
        let (width, height) = (image.width(), image.height());
        let channels = image.color().channel_count();
        let pixels = match channels {
            1 => image.into_luma8().into_raw(),
            2 => image.into_luma_alpha8().into_raw(),
            3 => image.into_rgb8().into_raw(),
            _ => image.into_rgba8().into_raw(),
        };
        Self {
            width,
            height,
            channels: channels.min(4),
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The device format and matching bytes for upload.
    ///
    /// Channel counts without a device format are logged and expanded to
    /// real RGB data, so the fallback format always describes the bytes.
    pub fn device_pixels(&self) -> (ChannelFormat, Cow<'_, [u8]>) {
        match ChannelFormat::for_channels(self.channels) {
            Ok(format) => (format, Cow::Borrowed(&self.pixels)),
            Err(unsupported) => {
                log::warn!("{unsupported}; uploading as {:?}", unsupported.fallback());
                (
                    unsupported.fallback(),
                    Cow::Owned(expand_to_rgb(self.channels, &self.pixels)),
                )
            }
        }
    }
}

/// Rewrites `channels`-wide pixels as RGB. Pixels with fewer than three
/// channels are treated as gray (+ extras) and replicated.
fn expand_to_rgb(channels: u8, pixels: &[u8]) -> Vec<u8> {
    let channels = channels as usize;
    pixels
        .chunks_exact(channels)
        .flat_map(|px| {
            if channels >= 3 {
                [px[0], px[1], px[2]]
            } else {
                [px[0], px[0], px[0]]
            }
        })
        .collect()
}

/// Decodes the image at `path`, sniffing the format from its contents.
///
/// # Errors
///
/// Returns `TextureError::Decode` if the file is missing, unreadable, or
/// not a supported image.
pub fn decode_image(path: &Path, flip_vertically: bool) -> Result<DecodedImage, TextureError> {
    let decode_err = |message: String| TextureError::Decode {
        path: path.to_path_buf(),
        message,
    };
    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;
    Ok(DecodedImage::from_dynamic(image, flip_vertically))
}

/// Sampling state applied when a texture is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    /// Wrap mode for both S and T (e.g. `glow::REPEAT`).
    pub wrap: u32,
    /// Minification filter (e.g. `glow::LINEAR_MIPMAP_LINEAR`).
    pub min_filter: u32,
    /// Magnification filter (e.g. `glow::LINEAR`).
    pub mag_filter: u32,
    /// Generate the mipmap chain after each upload.
    pub generate_mipmaps: bool,
}

impl TextureConfig {
    /// REPEAT wrapping, trilinear minification, linear magnification, and
    /// mipmaps generated on upload.
    pub fn repeat_mipmapped() -> Self {
        Self {
            wrap: glow::REPEAT,
            min_filter: glow::LINEAR_MIPMAP_LINEAR,
            mag_filter: glow::LINEAR,
            generate_mipmaps: true,
        }
    }
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self::repeat_mipmapped()
    }
}

/// An owned 2D texture object. Deleted exactly once on drop.
pub struct Texture<C: GraphicsContext> {
    gl: Rc<C>,
    texture: C::Texture,
    config: TextureConfig,
}

impl<C: GraphicsContext> Texture<C> {
    /// Creates an empty texture and applies `config`'s sampling state.
    ///
    /// # Errors
    ///
    /// Returns `TextureError::Create` if the device cannot allocate it.
    pub fn create(gl: Rc<C>, config: &TextureConfig) -> Result<Self, TextureError> {
        let texture = gl.create_texture().map_err(TextureError::Create)?;

        gl.bind_texture_2d(Some(texture));
        gl.tex_parameter_2d(glow::TEXTURE_WRAP_S, config.wrap as i32);
        gl.tex_parameter_2d(glow::TEXTURE_WRAP_T, config.wrap as i32);
        gl.tex_parameter_2d(glow::TEXTURE_MIN_FILTER, config.min_filter as i32);
        gl.tex_parameter_2d(glow::TEXTURE_MAG_FILTER, config.mag_filter as i32);
        gl.bind_texture_2d(None);

        Ok(Self {
            gl,
            texture,
            config: *config,
        })
    }

    /// Uploads `image` as level 0 and, if configured, builds mipmaps.
    ///
    /// # Errors
    ///
    /// Returns `TextureError::TooLarge` if a dimension exceeds `i32::MAX`.
    /// Nothing is uploaded in that case.
    pub fn upload(&self, image: &DecodedImage) -> Result<(), TextureError> {
        let too_large = || TextureError::TooLarge {
            width: image.width(),
            height: image.height(),
        };
        let width = i32::try_from(image.width()).map_err(|_| too_large())?;
        let height = i32::try_from(image.height()).map_err(|_| too_large())?;
        let (format, pixels) = image.device_pixels();

        self.gl.bind_texture_2d(Some(self.texture));
        // Rows of 1- and 3-channel images are not 4-byte aligned in general.
        self.gl.unpack_alignment(1);
        self.gl.tex_image_2d(format, width, height, &pixels);
        if self.config.generate_mipmaps {
            self.gl.generate_mipmap_2d();
        }
        self.gl.bind_texture_2d(None);

        log::debug!(
            "uploaded {width}x{height} {format:?} texture {:?}",
            self.texture
        );
        Ok(())
    }

    /// Binds this texture to texture unit `unit` (0-based).
    pub fn bind(&self, unit: u32) {
        self.gl.active_texture(glow::TEXTURE0 + unit);
        self.gl.bind_texture_2d(Some(self.texture));
    }

    pub fn handle(&self) -> C::Texture {
        self.texture
    }

    pub fn config(&self) -> &TextureConfig {
        &self.config
    }
}

impl<C: GraphicsContext> Drop for Texture<C> {
    fn drop(&mut self) {
        self.gl.delete_texture(self.texture);
    }
}
