use crate::error::Error;
use image::GrayImage;

/// A single channel intensity frame.
///
/// Represents one camera exposure as an 8-bit grayscale grid. The tracker
/// compares small regions of a frame against a template of the target, so
/// the representation favors cheap bounds-checked region extraction over
/// color fidelity.
///
/// Pixels are stored by row.
///
/// ```text
/// +--------+--------+--------+-----+--------+--------+
/// |      0 |      1 |      2 | ... |    w-2 |    w-1 |
/// +--------+--------+--------+-----+--------+--------+
/// |      w |    w+1 |    w+2 | ... |   2w-2 |   2w-1 |
/// +--------+--------+--------+-----+--------+--------+
/// |    ... |    ... |
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    rows: usize,
    cols: usize,

    /// Row major intensity samples.
    pixels: Vec<u8>,
}

impl Frame {
    /// Creates a frame from a row major buffer of intensity samples.
    ///
    /// Returns an error unless `pixels` holds exactly `rows * cols` bytes.
    pub fn from_pixels(rows: usize, cols: usize, pixels: Vec<u8>) -> Result<Self, Error> {
        let expected = rows * cols;
        if pixels.len() != expected {
            return Err(Error::BufferSize {
                rows,
                cols,
                expected,
                len: pixels.len(),
            });
        }

        Ok(Self { rows, cols, pixels })
    }

    /// Creates a frame with every pixel set to `value`.
    pub fn filled(rows: usize, cols: usize, value: u8) -> Self {
        Self {
            rows,
            cols,
            pixels: vec![value; rows * cols],
        }
    }

    /// Creates a frame from a decoded grayscale image.
    pub fn from_luma8(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            rows: height as usize,
            cols: width as usize,
            pixels: image.into_raw(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_slice()
    }

    /// Returns the intensity at (`row`, `col`) if it is inside the frame,
    /// otherwise returns None.
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.rows || col >= self.cols {
            return None;
        }

        self.pixels.get(row * self.cols + col).copied()
    }

    /// Extracts the `rows` by `cols` region centered at (`center_row`,
    /// `center_col`).
    ///
    /// The center is signed because position hypotheses may sit beyond the
    /// frame edge. Returns None unless the whole region lies inside the
    /// frame; a clipped patch would bias the comparison, so near-edge
    /// centers yield no patch at all.
    pub fn patch(
        &self,
        center_row: i32,
        center_col: i32,
        rows: usize,
        cols: usize,
    ) -> Option<Frame> {
        let top = center_row - (rows / 2) as i32;
        let left = center_col - (cols / 2) as i32;
        if top < 0 || left < 0 {
            return None;
        }

        let (top, left) = (top as usize, left as usize);
        if top + rows > self.rows || left + cols > self.cols {
            return None;
        }

        let mut pixels = Vec::with_capacity(rows * cols);
        for row in top..top + rows {
            let start = row * self.cols + left;
            pixels.extend_from_slice(&self.pixels[start..start + cols]);
        }

        Some(Frame { rows, cols, pixels })
    }
}

/// An integer coordinate inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelCoordinate {
    row: usize,
    col: usize,
}

impl PixelCoordinate {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }
}

impl AsRef<PixelCoordinate> for PixelCoordinate {
    fn as_ref(&self) -> &PixelCoordinate {
        self
    }
}

/// Scores how alike two equally sized patches are.
///
/// Computes the mean squared error over pixel intensities and maps it
/// through a Gaussian kernel.
///
/// ```text
/// s = exp(-mse / (2 * sigma^2))
/// ```
///
/// Identical patches score 1.0 and the score decays toward zero as the
/// patches diverge. `sigma` sets how quickly: a larger value tolerates more
/// intensity difference before the score collapses.
///
/// Returns an error if the patches differ in dimensions.
pub fn similarity(a: &Frame, b: &Frame, sigma: f64) -> Result<f64, Error> {
    if a.dimensions() != b.dimensions() {
        return Err(Error::DimensionMismatch {
            a_rows: a.rows,
            a_cols: a.cols,
            b_rows: b.rows,
            b_cols: b.cols,
        });
    }

    let sum: f64 = a
        .pixels
        .iter()
        .zip(b.pixels.iter())
        .map(|(p, q)| {
            let diff = f64::from(*p) - f64::from(*q);
            diff * diff
        })
        .sum();
    let mse = sum / (a.rows * a.cols) as f64;

    Ok((-mse / (2.0 * sigma * sigma)).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use quickcheck::{quickcheck, TestResult};
    use rstest::rstest;

    const SIGMA: f64 = 10.0;

    quickcheck! {
        fn identical_patches_score_one(pixels: Vec<u8>) -> TestResult {
            if pixels.is_empty() {
                return TestResult::discard();
            }

            let frame = Frame::from_pixels(1, pixels.len(), pixels).unwrap();
            match similarity(&frame, &frame, SIGMA) {
                Ok(score) => TestResult::from_bool(score == 1.0),
                Err(_) => TestResult::failed(),
            }
        }

        fn similarity_is_symmetric(a: Vec<u8>, b: Vec<u8>) -> TestResult {
            let len = a.len().min(b.len());
            if len == 0 {
                return TestResult::discard();
            }

            let a = Frame::from_pixels(1, len, a[..len].to_vec()).unwrap();
            let b = Frame::from_pixels(1, len, b[..len].to_vec()).unwrap();

            let ab = similarity(&a, &b, SIGMA).unwrap();
            let ba = similarity(&b, &a, SIGMA).unwrap();
            TestResult::from_bool(ab == ba)
        }

        fn similarity_in_unit_interval(a: Vec<u8>, b: Vec<u8>) -> TestResult {
            let len = a.len().min(b.len());
            if len == 0 {
                return TestResult::discard();
            }

            let a = Frame::from_pixels(1, len, a[..len].to_vec()).unwrap();
            let b = Frame::from_pixels(1, len, b[..len].to_vec()).unwrap();

            let score = similarity(&a, &b, SIGMA).unwrap();
            TestResult::from_bool(score > 0.0 && score <= 1.0)
        }
    }

    #[rstest]
    #[case(2, 3, 3, 2)]
    #[case(4, 4, 4, 5)]
    #[case(1, 1, 2, 2)]
    fn mismatched_dimensions_rejected(
        #[case] a_rows: usize,
        #[case] a_cols: usize,
        #[case] b_rows: usize,
        #[case] b_cols: usize,
    ) {
        let a = Frame::filled(a_rows, a_cols, 0);
        let b = Frame::filled(b_rows, b_cols, 0);
        assert!(matches!(
            similarity(&a, &b, SIGMA),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn wider_kernel_is_more_forgiving() {
        let a = Frame::filled(4, 4, 100);
        let b = Frame::filled(4, 4, 120);

        let narrow = similarity(&a, &b, 10.0).unwrap();
        let wide = similarity(&a, &b, 40.0).unwrap();
        assert!(narrow < wide);
    }

    #[test]
    fn uniform_offset_matches_kernel() {
        let a = Frame::filled(2, 2, 50);
        let b = Frame::filled(2, 2, 60);

        // Every pixel differs by 10, so mse = 100.
        assert_relative_eq!(
            similarity(&a, &b, SIGMA).unwrap(),
            (-100.0 / (2.0 * SIGMA * SIGMA)).exp(),
        );
    }

    #[test]
    fn buffer_size_must_match_dimensions() {
        assert!(matches!(
            Frame::from_pixels(2, 3, vec![0; 5]),
            Err(Error::BufferSize { expected: 6, .. })
        ));
    }

    #[rstest]
    #[case(2, 2, Some(255))]
    #[case(0, 0, Some(1))]
    #[case(4, 2, None)]
    #[case(2, 4, None)]
    fn bounds_checked_access(#[case] row: usize, #[case] col: usize, #[case] expected: Option<u8>) {
        let mut pixels = vec![0u8; 16];
        pixels[0] = 1;
        pixels[2 * 4 + 2] = 255;
        let frame = Frame::from_pixels(4, 4, pixels).unwrap();

        assert_eq!(frame.get(row, col), expected);
    }

    #[rstest]
    #[case(3, 3, true)]
    #[case(1, 1, true)]
    #[case(4, 4, true)]
    #[case(0, 3, false)]
    #[case(3, 0, false)]
    #[case(5, 3, false)]
    #[case(3, 5, false)]
    #[case(-2, 3, false)]
    fn patch_requires_full_overlap(#[case] row: i32, #[case] col: i32, #[case] inside: bool) {
        let frame = Frame::filled(6, 6, 0);
        assert_eq!(frame.patch(row, col, 3, 3).is_some(), inside);
    }

    #[test]
    fn patch_copies_centered_region() {
        // 4x4 ramp so every pixel value is unique.
        let pixels: Vec<u8> = (0..16).collect();
        let frame = Frame::from_pixels(4, 4, pixels).unwrap();

        let patch = frame.patch(2, 1, 2, 2).expect("patch is inside the frame");
        assert_eq!(patch.dimensions(), (2, 2));
        assert_eq!(patch.as_bytes(), &[4, 5, 8, 9]);
    }
}
