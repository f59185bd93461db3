//! Frame data structures for planar camera content
//!
//! Frames arrive as three 4:2:0 planes (Y, U, V) with per-plane row and pixel
//! strides, the layout camera stacks use for `YUV_420_888` buffers. A pixel
//! stride of 1 is fully planar (I420), 2 is interleaved semi-planar (NV12/NV21
//! backing memory exposed as two overlapping planes).

use std::time::Instant;

use crate::vision::CropError;

/// One plane of a planar frame
#[derive(Debug, Clone)]
pub struct Plane {
    /// Plane bytes, starting at the first sample
    pub data: Vec<u8>,
    /// Distance in bytes between the starts of two consecutive rows
    pub row_stride: usize,
    /// Distance in bytes between two consecutive samples of a row
    pub pixel_stride: usize,
}

impl Plane {
    /// Create a plane with explicit strides
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Create a tightly packed plane (`pixel_stride == 1`, `row_stride == width`)
    pub fn packed(data: Vec<u8>, width: usize) -> Self {
        Self::new(data, width, 1)
    }

    /// Number of bytes needed to address `cols` x `rows` samples.
    ///
    /// Only the last sample of the last row has to be present, so buffers whose
    /// trailing padding was trimmed still validate.
    fn required_len(&self, cols: usize, rows: usize) -> Option<usize> {
        if cols == 0 || rows == 0 {
            return Some(0);
        }
        let last_row = (rows - 1).checked_mul(self.row_stride)?;
        let last_col = (cols - 1).checked_mul(self.pixel_stride)?;
        last_row.checked_add(last_col)?.checked_add(1)
    }

    /// Check that `cols` x `rows` samples can be read without leaving the buffer
    fn check(&self, label: &str, cols: usize, rows: usize) -> Result<(), CropError> {
        if self.pixel_stride == 0 {
            return Err(CropError::MalformedFrame(format!(
                "{label} plane has zero pixel stride"
            )));
        }
        let row_span = (cols.saturating_sub(1))
            .checked_mul(self.pixel_stride)
            .and_then(|span| span.checked_add(1))
            .ok_or_else(|| CropError::MalformedFrame(format!("{label} row span overflow")))?;
        if rows > 1 && self.row_stride < row_span {
            return Err(CropError::MalformedFrame(format!(
                "{label} row stride {} is smaller than the row span {row_span}",
                self.row_stride
            )));
        }
        let required = self
            .required_len(cols, rows)
            .ok_or_else(|| CropError::MalformedFrame(format!("{label} plane size overflow")))?;
        if self.data.len() < required {
            return Err(CropError::MalformedFrame(format!(
                "{label} plane has {} bytes, expected at least {required} for {cols}x{rows} samples",
                self.data.len()
            )));
        }
        Ok(())
    }

    #[inline]
    fn sample(&self, col: usize, row: usize) -> u8 {
        self.data[row * self.row_stride + col * self.pixel_stride]
    }
}

/// A captured camera frame in 4:2:0 planar layout
#[derive(Debug, Clone)]
pub struct PlanarFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Luma plane
    pub y: Plane,
    /// Blue-difference chroma plane
    pub u: Plane,
    /// Red-difference chroma plane
    pub v: Plane,
    /// Clockwise rotation reported by the capture device
    pub rotation_degrees: i32,
    /// Timestamp when frame was captured
    pub timestamp: Instant,
}

impl PlanarFrame {
    /// Create a new frame with no rotation
    pub fn new(width: u32, height: u32, y: Plane, u: Plane, v: Plane) -> Self {
        Self {
            width,
            height,
            y,
            u,
            v,
            rotation_degrees: 0,
            timestamp: Instant::now(),
        }
    }

    /// Set the rotation reported by the capture device
    pub fn with_rotation(mut self, rotation_degrees: i32) -> Self {
        self.rotation_degrees = rotation_degrees;
        self
    }

    /// Build a frame from a contiguous I420 buffer (Y, then U, then V)
    pub fn from_i420(data: &[u8], width: u32, height: u32) -> Result<Self, CropError> {
        let (y_len, c_len) = buffer_lengths(width, height)?;
        let expected = y_len + 2 * c_len;
        if data.len() < expected {
            return Err(CropError::MalformedFrame(format!(
                "I420 buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        let (cw, _) = chroma_dimensions(width, height);
        Ok(Self::new(
            width,
            height,
            Plane::packed(data[..y_len].to_vec(), width as usize),
            Plane::packed(data[y_len..y_len + c_len].to_vec(), cw),
            Plane::packed(data[y_len + c_len..expected].to_vec(), cw),
        ))
    }

    /// Build a frame from a contiguous NV21 buffer (Y, then interleaved V/U)
    pub fn from_nv21(data: &[u8], width: u32, height: u32) -> Result<Self, CropError> {
        let (y_len, c_len) = buffer_lengths(width, height)?;
        let expected = y_len + 2 * c_len;
        if data.len() < expected {
            return Err(CropError::MalformedFrame(format!(
                "NV21 buffer has {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        let (cw, _) = chroma_dimensions(width, height);
        let vu = &data[y_len..expected];
        Ok(Self::new(
            width,
            height,
            Plane::packed(data[..y_len].to_vec(), width as usize),
            Plane::new(vu[1..].to_vec(), cw * 2, 2),
            Plane::new(vu.to_vec(), cw * 2, 2),
        ))
    }

    /// Get frame dimensions as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Check every plane against the declared dimensions
    pub fn validate(&self) -> Result<(), CropError> {
        if self.width == 0 || self.height == 0 {
            return Err(CropError::MalformedFrame(format!(
                "frame has empty dimensions {}x{}",
                self.width, self.height
            )));
        }
        let (cw, ch) = chroma_dimensions(self.width, self.height);
        self.y
            .check("Y", self.width as usize, self.height as usize)?;
        self.u.check("U", cw, ch)?;
        self.v.check("V", cw, ch)?;
        Ok(())
    }

    /// Reassemble the planes into one contiguous NV21 buffer.
    ///
    /// Luma rows come first, followed by chroma pairs in V-then-U order.
    pub fn to_nv21(&self) -> Result<Nv21Frame, CropError> {
        self.validate()?;

        let width = self.width as usize;
        let height = self.height as usize;
        let (cw, ch) = chroma_dimensions(self.width, self.height);
        let mut data = Vec::with_capacity(width * height + 2 * cw * ch);

        if self.y.pixel_stride == 1 {
            for row in 0..height {
                let start = row * self.y.row_stride;
                data.extend_from_slice(&self.y.data[start..start + width]);
            }
        } else {
            for row in 0..height {
                data.extend((0..width).map(|col| self.y.sample(col, row)));
            }
        }

        for row in 0..ch {
            for col in 0..cw {
                data.push(self.v.sample(col, row));
                data.push(self.u.sample(col, row));
            }
        }

        Ok(Nv21Frame {
            width: self.width,
            height: self.height,
            data,
        })
    }
}

/// Contiguous NV21 frame: packed luma followed by interleaved V/U samples.
///
/// Only built by [`PlanarFrame::to_nv21`], so the buffer always covers the
/// declared dimensions.
#[derive(Debug, Clone)]
pub struct Nv21Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Nv21Frame {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whole NV21 buffer
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Luma rows, `width` bytes each
    pub fn y_plane(&self) -> &[u8] {
        &self.data[..self.luma_len()]
    }

    /// Interleaved V/U rows, `2 * chroma width` bytes each
    pub fn vu_plane(&self) -> &[u8] {
        &self.data[self.luma_len()..]
    }

    /// Luma sample at pixel (x, y), `None` outside the frame
    pub fn luma(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width as usize || y >= self.height as usize {
            return None;
        }
        self.data.get(y * self.width as usize + x).copied()
    }

    /// Chroma samples `(u, v)` covering pixel (x, y), `None` outside the frame
    pub fn chroma(&self, x: usize, y: usize) -> Option<(u8, u8)> {
        if x >= self.width as usize || y >= self.height as usize {
            return None;
        }
        let (cw, _) = chroma_dimensions(self.width, self.height);
        let base = self.luma_len() + ((y / 2) * cw + x / 2) * 2;
        let v = *self.data.get(base)?;
        let u = *self.data.get(base + 1)?;
        Some((u, v))
    }

    fn luma_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Dimensions of a 4:2:0 chroma plane; odd sizes round up
pub fn chroma_dimensions(width: u32, height: u32) -> (usize, usize) {
    ((width as usize).div_ceil(2), (height as usize).div_ceil(2))
}

fn buffer_lengths(width: u32, height: u32) -> Result<(usize, usize), CropError> {
    if width == 0 || height == 0 {
        return Err(CropError::MalformedFrame(format!(
            "frame has empty dimensions {width}x{height}"
        )));
    }
    let (cw, ch) = chroma_dimensions(width, height);
    let y_len = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| CropError::MalformedFrame("luma size overflow".to_string()))?;
    Ok((y_len, cw * ch))
}

#[cfg(test)]
pub(crate) mod test_frames {
    use super::*;

    /// Solid-color I420 frame
    pub(crate) fn solid(width: u32, height: u32, y: u8, u: u8, v: u8) -> PlanarFrame {
        let (cw, ch) = chroma_dimensions(width, height);
        PlanarFrame::new(
            width,
            height,
            Plane::packed(vec![y; (width * height) as usize], width as usize),
            Plane::packed(vec![u; cw * ch], cw),
            Plane::packed(vec![v; cw * ch], cw),
        )
    }

    /// Gray frame whose luma encodes the pixel position
    pub(crate) fn gradient(width: u32, height: u32) -> PlanarFrame {
        let mut frame = solid(width, height, 0, 128, 128);
        for row in 0..height as usize {
            for col in 0..width as usize {
                frame.y.data[row * width as usize + col] = (row * 16 + col) as u8;
            }
        }
        frame
    }
}
