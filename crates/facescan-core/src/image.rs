//! Decoded pixel buffers, the image codec seam, and input normalization.
//!
//! The engine expects landscape input whose dimensions are multiples of 4.
//! [`normalize`] reshapes any decoded image into that form through the codec's
//! own resize, so the codec decides the interpolation.

use ::image::imageops::{self, FilterType};
use ::image::{ImageBuffer, ImageReader, Luma, Pixel, Rgb, Rgba};
use std::path::Path;
use thiserror::Error;

/// Width and height of the engine input are rounded down to this multiple.
const ENGINE_ALIGNMENT: u32 = 4;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to resize image: {0}")]
    Resize(String),
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u8),
    #[error("image {width}x{height} is too small to normalize")]
    TooSmall { width: u32, height: u32 },
}

/// Owned, decoded pixel data. Dropping the value releases the pixels.
pub trait PixelBuffer {
    fn data(&self) -> &[u8];
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn channels(&self) -> u8;
}

/// Interleaved 8-bit pixel buffer (BGR for three channels).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl DecodedImage {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(ImageError::Decode(format!(
                "expected {expected} bytes for {width}x{height}x{channels}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }
}

impl PixelBuffer for DecodedImage {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn channels(&self) -> u8 {
        self.channels
    }
}

/// External image decoder/resizer.
pub trait ImageCodec {
    type Image: PixelBuffer;

    /// Decode the image file at `path`.
    fn decode(&self, path: &Path) -> Result<Self::Image, ImageError>;

    /// Produce a new buffer of `width` × `height`, keeping the channel count.
    fn resize(&self, image: &Self::Image, width: u32, height: u32) -> Result<Self::Image, ImageError>;
}

/// Target size for the engine: width aligned down to 4, height aligned down to 4
/// and then clamped to the width so the result is never portrait.
pub fn normalized_size(width: u32, height: u32) -> (u32, u32) {
    let aligned_width = width / ENGINE_ALIGNMENT * ENGINE_ALIGNMENT;
    let aligned_height = height / ENGINE_ALIGNMENT * ENGINE_ALIGNMENT;
    (aligned_width, aligned_width.min(aligned_height))
}

/// Resize `image` to [`normalized_size`]. The source buffer is left untouched
/// and both buffers are released independently.
pub fn normalize<C>(codec: &C, image: &C::Image) -> Result<C::Image, ImageError>
where
    C: ImageCodec + ?Sized,
{
    let (width, height) = normalized_size(image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(ImageError::TooSmall {
            width: image.width(),
            height: image.height(),
        });
    }

    tracing::debug!(
        from_width = image.width(),
        from_height = image.height(),
        width,
        height,
        "normalizing image"
    );
    codec.resize(image, width, height)
}

/// [`ImageCodec`] backed by the `image` crate.
///
/// Decodes to three-channel BGR, the engine's native pixel order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRsCodec;

impl ImageCodec for ImageRsCodec {
    type Image = DecodedImage;

    fn decode(&self, path: &Path) -> Result<DecodedImage, ImageError> {
        let decoded = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| ImageError::Decode(format!("{}: {e}", path.display())))?
            .decode()
            .map_err(|e| ImageError::Decode(format!("{}: {e}", path.display())))?;

        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();
        let mut data = rgb.into_raw();
        for px in data.chunks_exact_mut(3) {
            px.swap(0, 2);
        }

        DecodedImage::new(data, width, height, 3)
    }

    fn resize(&self, image: &DecodedImage, width: u32, height: u32) -> Result<DecodedImage, ImageError> {
        let data = match image.channels {
            1 => resize_raw::<Luma<u8>>(image, width, height)?,
            3 => resize_raw::<Rgb<u8>>(image, width, height)?,
            4 => resize_raw::<Rgba<u8>>(image, width, height)?,
            other => return Err(ImageError::UnsupportedChannels(other)),
        };
        DecodedImage::new(data, width, height, image.channels)
    }
}

/// Bilinear resize of an interleaved buffer. Channel order is irrelevant here,
/// so BGR data goes through the `Rgb` pixel type unchanged.
fn resize_raw<P>(image: &DecodedImage, width: u32, height: u32) -> Result<Vec<u8>, ImageError>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    if width == 0 || height == 0 {
        return Err(ImageError::Resize(format!("empty target size {width}x{height}")));
    }
    let buffer = ImageBuffer::<P, &[u8]>::from_raw(image.width, image.height, image.data.as_slice())
        .ok_or_else(|| {
            ImageError::Resize(format!(
                "buffer does not hold {}x{} pixels",
                image.width, image.height
            ))
        })?;
    Ok(imageops::resize(&buffer, width, height, FilterType::Triangle).into_raw())
}
