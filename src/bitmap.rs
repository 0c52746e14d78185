//! Bit-packed binary raster.
//!
//! Scanlines are arrays of `u64` words; bit (x, y) is the mask
//! `1 << (63 - x % 64)` of word `x / 64`. Rows use the y-up convention:
//! row 0 is the bottom of the image (images loaded via [`Bitmap::from_gray`]
//! are flipped accordingly). Contours are traced on the corner grid, so a
//! pixel (x, y) occupies the unit square [x, x+1] × [y, y+1].

use image::GrayImage;

use crate::error::TraceError;

const WORD_BITS: usize = 64;

/// A width × height binary image with bit-packed scanlines.
///
/// Out-of-bounds reads return `false`; out-of-bounds writes are ignored.
/// Word-level scanning in [`find_next_set`](Bitmap::find_next_set)
/// requires that unused trailing bits of each row are zero; call
/// [`clear_excess`](Bitmap::clear_excess) after writing words directly.
#[derive(Debug, Clone)]
pub struct Bitmap {
    width: u32,
    height: u32,
    words_per_row: usize,
    words: Vec<u64>,
}

impl Bitmap {
    /// Create an all-zero bitmap. Zero dimensions are rejected.
    pub fn new(width: u32, height: u32) -> Result<Self, TraceError> {
        if width == 0 || height == 0 {
            return Err(TraceError::InvalidParameter(format!(
                "bitmap dimensions must be nonzero, got {width}x{height}"
            )));
        }
        let words_per_row = (width as usize).div_ceil(WORD_BITS);
        Ok(Self {
            width,
            height,
            words_per_row,
            words: vec![0; words_per_row * height as usize],
        })
    }

    /// Build a bitmap from a binary grayscale image: non-zero pixels are
    /// foreground. The image's top row becomes the highest bitmap row
    /// (y-up flip).
    pub fn from_gray(img: &GrayImage) -> Result<Self, TraceError> {
        let (w, h) = img.dimensions();
        let mut bm = Self::new(w, h)?;
        for iy in 0..h {
            let y = (h - 1 - iy) as i32;
            for ix in 0..w {
                if img.get_pixel(ix, iy).0[0] > 0 {
                    bm.set(ix as i32, y);
                }
            }
        }
        Ok(bm)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn word_index(&self, x: i32, y: i32) -> usize {
        y as usize * self.words_per_row + (x as usize) / WORD_BITS
    }

    fn mask(x: i32) -> u64 {
        1u64 << (63 - (x as usize % WORD_BITS))
    }

    /// Get pixel at (x, y). Out-of-bounds reads return `false`.
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.in_bounds(x, y) && self.words[self.word_index(x, y)] & Self::mask(x) != 0
    }

    /// Set pixel at (x, y). Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32) {
        if self.in_bounds(x, y) {
            let i = self.word_index(x, y);
            self.words[i] |= Self::mask(x);
        }
    }

    /// Clear pixel at (x, y). Out-of-bounds writes are ignored.
    pub fn clear(&mut self, x: i32, y: i32) {
        if self.in_bounds(x, y) {
            let i = self.word_index(x, y);
            self.words[i] &= !Self::mask(x);
        }
    }

    /// Invert pixel at (x, y). Out-of-bounds writes are ignored.
    pub fn invert(&mut self, x: i32, y: i32) {
        if self.in_bounds(x, y) {
            let i = self.word_index(x, y);
            self.words[i] ^= Self::mask(x);
        }
    }

    /// Set or clear pixel at (x, y).
    pub fn put(&mut self, x: i32, y: i32, value: bool) {
        if value {
            self.set(x, y);
        } else {
            self.clear(x, y);
        }
    }

    /// Zero the whole raster.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Zero the unused trailing bits of every row.
    ///
    /// Required before word-level scanning if words were written through
    /// any channel other than the bounds-checked pixel operations.
    pub fn clear_excess(&mut self) {
        let used = self.width as usize - (self.words_per_row - 1) * WORD_BITS;
        if used == WORD_BITS {
            return;
        }
        let keep = !(!0u64 >> used);
        for y in 0..self.height as usize {
            self.words[y * self.words_per_row + self.words_per_row - 1] &= keep;
        }
    }

    /// Invert bits [min(x, xa), max(x, xa)) on row y.
    ///
    /// The reference column `xa` is word-aligned by construction (it is
    /// derived from a path's point 0), which keeps the fill word-exact.
    pub(crate) fn xor_range(&mut self, x: i32, y: i32, xa: i32) {
        if y < 0 || y as u32 >= self.height {
            return;
        }
        let (lo, hi) = if x < xa { (x, xa) } else { (xa, x) };
        let lo = lo.max(0) as usize;
        let hi = (hi.max(0) as usize).min(self.width as usize);
        if lo >= hi {
            return;
        }
        let row = y as usize * self.words_per_row;
        let (w0, b0) = (lo / WORD_BITS, lo % WORD_BITS);
        let (w1, b1) = (hi / WORD_BITS, hi % WORD_BITS);
        if w0 == w1 {
            // Bits b0..b1 of a single word, counted from the left.
            let m = (!0u64 >> b0) & !(!0u64 >> b1);
            self.words[row + w0] ^= m;
            return;
        }
        self.words[row + w0] ^= !0u64 >> b0;
        for w in w0 + 1..w1 {
            self.words[row + w] ^= !0u64;
        }
        if b1 > 0 {
            self.words[row + w1] ^= !(!0u64 >> b1);
        }
    }

    /// Find the next set pixel in raster order from (x, y): rows are
    /// scanned from y down to 0; within the starting row the scan begins
    /// at the word containing x, in later rows at column 0.
    pub fn find_next_set(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        let y_top = y.min(self.height as i32 - 1);
        if y_top < 0 {
            return None;
        }
        let mut w_start = (x.max(0) as usize) / WORD_BITS;
        for yy in (0..=y_top).rev() {
            let row = yy as usize * self.words_per_row;
            for wi in w_start..self.words_per_row {
                let word = self.words[row + wi];
                if word != 0 {
                    let bit = word.leading_zeros() as usize;
                    return Some(((wi * WORD_BITS + bit) as i32, yy));
                }
            }
            w_start = 0;
        }
        None
    }

    /// Zero all words intersecting the bounding box (rows [y0, y1),
    /// word-rounded columns).
    pub(crate) fn clear_region(&mut self, bbox: &BBox) {
        let w_lo = (bbox.x0.max(0) as usize) / WORD_BITS;
        let w_hi = ((bbox.x1.max(0) as usize).div_ceil(WORD_BITS)).min(self.words_per_row);
        let y_lo = bbox.y0.max(0);
        let y_hi = bbox.y1.min(self.height as i32);
        for y in y_lo..y_hi {
            let row = y as usize * self.words_per_row;
            for w in w_lo..w_hi {
                self.words[row + w] = 0;
            }
        }
    }
}

/// Axis-aligned bounding box over corner coordinates (inclusive maxima).
#[derive(Debug, Clone, Copy)]
pub(crate) struct BBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BBox {
    pub fn of_points(points: &[(i32, i32)]) -> Self {
        let mut bbox = BBox {
            x0: i32::MAX,
            y0: i32::MAX,
            x1: i32::MIN,
            y1: i32::MIN,
        };
        for &(x, y) in points {
            bbox.x0 = bbox.x0.min(x);
            bbox.y0 = bbox.y0.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.y1 = bbox.y1.max(y);
        }
        bbox
    }
}
