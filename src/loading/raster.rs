//! Raster images, decoded to RGB.

use ndarray::Array3;
use polars::prelude::*;
use serde::Serialize;

use crate::error::{Result, VisualDataError};
use crate::frame::Frame;

/// Decoded RGB pixels, shape `(height, width, 3)`.
#[derive(Debug, Clone, Serialize)]
pub struct PixelMatrix {
    pub height: usize,
    pub width: usize,
    pub pixels: Array3<u8>,
}

impl PixelMatrix {
    pub fn new(pixels: Array3<u8>) -> Self {
        let (height, width, _) = pixels.dim();
        Self {
            height,
            width,
            pixels,
        }
    }

    /// One row per pixel in row-major order with columns `x, y, R, G, B`.
    pub fn to_frame(&self) -> Result<Frame> {
        let n = self.height * self.width;
        let mut xs = Vec::with_capacity(n);
        let mut ys = Vec::with_capacity(n);
        let mut channels: [Vec<i64>; 3] = [
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        ];
        for y in 0..self.height {
            for x in 0..self.width {
                xs.push(x as i64);
                ys.push(y as i64);
                for (c, channel) in channels.iter_mut().enumerate() {
                    channel.push(self.pixels[[y, x, c]] as i64);
                }
            }
        }
        let [r, g, b] = channels;
        let df = DataFrame::new(vec![
            Column::new("x".into(), xs),
            Column::new("y".into(), ys),
            Column::new("R".into(), r),
            Column::new("G".into(), g),
            Column::new("B".into(), b),
        ])
        .map_err(|e| VisualDataError::Internal(e.to_string()))?;
        Ok(Frame::new(df))
    }
}

pub fn decode_image(bytes: &[u8]) -> Result<PixelMatrix> {
    let rgb = image::load_from_memory(bytes)
        .map_err(|e| VisualDataError::ParseError(format!("invalid image: {}", e)))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixels = Array3::from_shape_vec((height as usize, width as usize, 3), rgb.into_raw())
        .map_err(|e| VisualDataError::Internal(e.to_string()))?;
    Ok(PixelMatrix::new(pixels))
}
