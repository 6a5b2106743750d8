//! Owned pixel buffers and the file codec boundary.
//!
//! This module provides:
//!
//! - The [`ImageBuffer`] type, an owned raw-pixel image with explicit [`PixelFormat`] metadata.
//! - [`Color`], an 8-bit RGBA color used by all drawing operations.
//! - A variety of [`draw`] functions to overlay annotations onto a buffer.

pub mod draw;

#[cfg(test)]
mod tests;

use std::{fmt, ops::Index, path::Path};

use anyhow::Context;
use embedded_graphics::{pixelcolor::raw::RawU32, prelude::PixelColor};

/// Pixel layout of an [`ImageBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 3 bytes per pixel, R-G-B order.
    Rgb888,
    /// 4 bytes per pixel, R-G-B-A order.
    Rgba8888,
    /// 1 byte per pixel, luminance.
    Gray8,
}

impl PixelFormat {
    /// Returns the number of bytes one pixel occupies in this format.
    #[inline]
    pub fn channels(&self) -> usize {
        match self {
            PixelFormat::Rgb888 => 3,
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// An owned raw-pixel image.
///
/// The buffer is exclusively owned by whoever holds it; the pipeline creates one buffer per input
/// file and drops it at the end of that file's iteration, on every exit path.
pub struct ImageBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl ImageBuffer {
    /// Creates a black image of the given size and format.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![0; width as usize * height as usize * format.channels()],
        }
    }

    /// Loads an image from the filesystem.
    ///
    /// Grayscale sources decode to [`PixelFormat::Gray8`], sources with an alpha channel to
    /// [`PixelFormat::Rgba8888`], everything else to [`PixelFormat::Rgb888`].
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let dynamic = image::open(path)
            .with_context(|| format!("failed to decode '{}'", path.display()))?;

        let color = dynamic.color();
        let buffer = if !color.has_color() {
            let buf = dynamic.to_luma8();
            Self {
                width: buf.width(),
                height: buf.height(),
                format: PixelFormat::Gray8,
                data: buf.into_raw(),
            }
        } else if color.has_alpha() {
            let buf = dynamic.into_rgba8();
            Self {
                width: buf.width(),
                height: buf.height(),
                format: PixelFormat::Rgba8888,
                data: buf.into_raw(),
            }
        } else {
            let buf = dynamic.into_rgb8();
            Self {
                width: buf.width(),
                height: buf.height(),
                format: PixelFormat::Rgb888,
                data: buf.into_raw(),
            }
        };
        Ok(buffer)
    }

    /// Encodes this image as a PNG file.
    ///
    /// PNG is lossless for all three pixel formats, so saving and reloading a buffer yields
    /// identical pixel data.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        self.save_impl(path.as_ref())
    }

    fn save_impl(&self, path: &Path) -> anyhow::Result<()> {
        let color = match self.format {
            PixelFormat::Rgb888 => image::ColorType::Rgb8,
            PixelFormat::Rgba8888 => image::ColorType::Rgba8,
            PixelFormat::Gray8 => image::ColorType::L8,
        };
        image::save_buffer_with_format(
            path,
            &self.data,
            self.width,
            self.height,
            color,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("failed to encode '{}'", path.display()))
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the pixel layout of the underlying data.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Returns the raw pixel data in the layout described by [`Self::format`].
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// Grayscale pixels are widened to an opaque gray [`Color`].
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn get(&self, x: u32, y: u32) -> Color {
        assert!(
            x < self.width && y < self.height,
            "pixel coordinate ({x}, {y}) out of bounds for {self:?}",
        );
        let i = (y as usize * self.width as usize + x as usize) * self.format.channels();
        match self.format {
            PixelFormat::Rgb888 => Color::from_rgb8(self.data[i], self.data[i + 1], self.data[i + 2]),
            PixelFormat::Rgba8888 => Color([
                self.data[i],
                self.data[i + 1],
                self.data[i + 2],
                self.data[i + 3],
            ]),
            PixelFormat::Gray8 => {
                let l = self.data[i];
                Color::from_rgb8(l, l, l)
            }
        }
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// Writing to a [`PixelFormat::Gray8`] buffer stores the color's luminance. The alpha channel
    /// is ignored by [`PixelFormat::Rgb888`] buffers.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        assert!(
            x < self.width && y < self.height,
            "pixel coordinate ({x}, {y}) out of bounds for {self:?}",
        );
        let i = (y as usize * self.width as usize + x as usize) * self.format.channels();
        match self.format {
            PixelFormat::Rgb888 => {
                self.data[i..i + 3].copy_from_slice(&[color.r(), color.g(), color.b()]);
            }
            PixelFormat::Rgba8888 => {
                self.data[i..i + 4].copy_from_slice(&color.0);
            }
            PixelFormat::Gray8 => {
                self.data[i] = color.luma();
            }
        }
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} {:?} ImageBuffer",
            self.width, self.height, self.format
        )
    }
}

/// An 8-bit RGBA color.
///
/// Colors are always in the sRGB color space and use non-premultiplied alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);
    pub const YELLOW: Self = Self([255, 255, 0, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn a(&self) -> u8 {
        self.0[3]
    }

    /// Returns the Rec. 601 luminance of this color.
    pub fn luma(&self) -> u8 {
        let l = u32::from(self.r()) * 299 + u32::from(self.g()) * 587 + u32::from(self.b()) * 114;
        (l / 1000) as u8
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r(),
            self.g(),
            self.b(),
            self.a(),
        )
    }
}

impl Index<usize> for Color {
    type Output = u8;

    #[inline]
    fn index(&self, index: usize) -> &u8 {
        &self.0[index]
    }
}

impl PixelColor for Color {
    type Raw = RawU32;
}
