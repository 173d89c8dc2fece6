//! Normalized Gaussian filter masks.

use crate::errors::*;
use std::f64::consts::PI;

/// Size of a square filter mask.
///
/// `half_extent` is the number of taps on each side of the center, so the
/// mask side is `2 * half_extent + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskExtent {
    pub radius: u32,
    pub half_extent: u32,
}

/// Largest accepted half-extent: a 255×255 mask of 65025 weights.
pub const MAX_HALF_EXTENT: u32 = 127;

fn check_half_extent(half_extent: u32) -> Result<()> {
    if half_extent > MAX_HALF_EXTENT {
        bail!(ErrorKind::InvalidParameter(format!(
            "mask half-extent {} exceeds the maximum of {}",
            half_extent, MAX_HALF_EXTENT
        )));
    }
    Ok(())
}

impl MaskExtent {
    pub fn from_half_extent(half_extent: u32) -> Result<Self> {
        check_half_extent(half_extent)?;
        Ok(Self {
            radius: half_extent * 2,
            half_extent,
        })
    }

    /// Extent derived from the nominal command-line radius.
    ///
    /// The nominal radius is squared to get the filter radius, and the
    /// half-extent is half of that rounded down. The filter therefore grows
    /// quadratically: nominal 1 gives a 1×1 mask, nominal 3 gives 9×9,
    /// nominal 5 gives 25×25.
    pub fn from_nominal_radius(nominal: u32) -> Result<Self> {
        let radius = nominal.checked_mul(nominal).ok_or_else(|| {
            ErrorKind::InvalidParameter(format!("nominal radius {} is too large", nominal))
        })?;
        check_half_extent(radius / 2)?;
        Ok(Self {
            radius,
            half_extent: radius / 2,
        })
    }

    pub fn side(&self) -> usize {
        2 * self.half_extent as usize + 1
    }
}

/// Unnormalized weight of the 2D Gaussian at offset `(x, y)`.
pub fn gaussian_weight(x: i64, y: i64, spread: f64) -> f64 {
    let s = 2.0 * spread * spread;
    let r2 = (x * x + y * y) as f64;
    (-r2 / s).exp() / ((2.0 * PI).sqrt() * spread)
}

/// Square matrix of weights summing to one, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMask {
    extent: MaskExtent,
    weights: Vec<f32>,
}

impl FilterMask {
    pub fn gaussian(extent: MaskExtent, spread: f32) -> Result<Self> {
        if !(spread.is_finite() && spread > 0.0) {
            bail!(ErrorKind::InvalidParameter(format!(
                "spread must be a positive finite number, got {}",
                spread
            )));
        }

        let spread = spread as f64;
        let size = extent.half_extent as i64;
        let mut weights = Vec::with_capacity(extent.side() * extent.side());
        let mut sum = 0.0;

        for y in -size..=size {
            for x in -size..=size {
                let value = gaussian_weight(x, y, spread);
                sum += value;
                weights.push(value);
            }
        }

        // Far tails underflow for tiny spreads but the center is always
        // positive, so the sum cannot be zero.
        Ok(Self {
            extent,
            weights: weights.into_iter().map(|w| (w / sum) as f32).collect(),
        })
    }

    pub fn extent(&self) -> MaskExtent {
        self.extent
    }

    pub fn half_extent(&self) -> u32 {
        self.extent.half_extent
    }

    pub fn side(&self) -> usize {
        self.extent.side()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Weight at offset `(x, y)` from the center.
    pub fn get(&self, x: i64, y: i64) -> f32 {
        let size = self.extent.half_extent as i64;
        let row = (y + size) as usize;
        let col = (x + size) as usize;
        self.weights[row * self.side() + col]
    }

    pub fn sum(&self) -> f32 {
        self.weights.iter().map(|&w| w as f64).sum::<f64>() as f32
    }
}
