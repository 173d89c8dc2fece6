pub mod layout;

/// Side length of the square work-group every dispatch uses.
pub const LOCAL_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    pub stride_x: usize,
    pub stride_y: usize,
}

impl ImageInfo {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            stride_x: 1,
            stride_y: width * 1,
        }
    }

    pub fn image_offset(&self, x: usize, y: usize) -> usize {
        x * self.stride_x + y * self.stride_y
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Origin of the full-image region, `{0, 0, 0}`.
    pub fn origin(&self) -> [usize; 3] {
        [0, 0, 0]
    }

    /// Full-image region, `{W, H, 1}`.
    pub fn region(&self) -> [usize; 3] {
        [self.width, self.height, 1]
    }
}

/// Samples per pixel in interleaved RGB buffers.
pub const RGB_CHANNELS: usize = 3;

/// Samples per pixel in interleaved RGBA buffers.
pub const RGBA_CHANNELS: usize = 4;

fn ceil_div(x: usize, y: usize) -> usize {
    let mut n = x / y;
    if x % y != 0 {
        n += 1;
    }
    n
}

/// Global and local ranges of a 2D dispatch.
///
/// The global range covers the whole image and is rounded up to a multiple
/// of the local size on each axis, so work-items past the image edge must be
/// discarded by the device program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSize {
    pub global: [usize; 2],
    pub local: [usize; 2],
}

impl WorkSize {
    pub fn padded(info: &ImageInfo) -> Self {
        Self {
            global: [
                ceil_div(info.width, LOCAL_SIZE) * LOCAL_SIZE,
                ceil_div(info.height, LOCAL_SIZE) * LOCAL_SIZE,
            ],
            local: [LOCAL_SIZE, LOCAL_SIZE],
        }
    }

    pub fn is_padded(&self, info: &ImageInfo) -> bool {
        self.global != [info.width, info.height]
    }

    pub fn groups(&self) -> [usize; 2] {
        [self.global[0] / self.local[0], self.global[1] / self.local[1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_row_major() {
        let info = ImageInfo::new(7, 3);
        assert_eq!(info.image_offset(0, 0), 0);
        assert_eq!(info.image_offset(6, 0), 6);
        assert_eq!(info.image_offset(0, 1), 7);
        assert_eq!(info.image_offset(6, 2), 20);
        assert_eq!(info.pixel_count(), 21);
    }

    #[test]
    fn region_covers_full_image() {
        let info = ImageInfo::new(640, 480);
        assert_eq!(info.origin(), [0, 0, 0]);
        assert_eq!(info.region(), [640, 480, 1]);
    }

    #[test]
    fn aligned_dimensions_are_not_padded() {
        let info = ImageInfo::new(32, 48);
        let work = WorkSize::padded(&info);
        assert_eq!(work.global, [32, 48]);
        assert_eq!(work.local, [16, 16]);
        assert_eq!(work.groups(), [2, 3]);
        assert!(!work.is_padded(&info));
    }

    #[test]
    fn unaligned_dimensions_round_up() {
        let info = ImageInfo::new(33, 17);
        let work = WorkSize::padded(&info);
        assert_eq!(work.global, [48, 32]);
        assert!(work.is_padded(&info));

        let tiny = ImageInfo::new(1, 1);
        assert_eq!(WorkSize::padded(&tiny).global, [16, 16]);
    }
}
