#[macro_use]
extern crate error_chain;
extern crate common;
extern crate image;
extern crate opencl3;

pub mod device;
pub mod dispatch;
pub mod errors;
pub mod mask;
pub mod profiler;

use common::{layout, ImageInfo};
use device::{DeviceContext, KernelContract};
use dispatch::KernelDispatcher;
use errors::*;
use image::{DynamicImage, RgbImage};
use mask::{FilterMask, MaskExtent};
use profiler::Profiler;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Device program shipped with the crate.
pub const DEFAULT_KERNEL_SOURCE: &str = include_str!(env!("KERNEL_SOURCE_PATH"));
pub const DEFAULT_ENTRY_POINT: &str = "unsharp_mask";
pub const DEFAULT_SPREAD: f32 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KernelSource {
    Embedded,
    File(PathBuf),
}

impl KernelSource {
    pub fn load(&self) -> Result<String> {
        match *self {
            KernelSource::Embedded => Ok(DEFAULT_KERNEL_SOURCE.to_string()),
            KernelSource::File(ref path) => fs::read_to_string(path)
                .chain_err(|| format!("Could not read kernel source {}", path.display())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: PathBuf,
    pub extent: MaskExtent,
    pub spread: f32,
    pub kernel: KernelSource,
    pub entry_point: String,
}

fn read_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).chain_err(|| format!("Could not open image {}", path.display()))?;
    Ok(match image {
        DynamicImage::ImageRgb8(img) => img,
        other => {
            info!("Converting input image to RGB");
            other.to_rgb8()
        }
    })
}

/// Sharpens `image` on the device held by `ctx`.
pub fn sharpen(ctx: &DeviceContext, image: &RgbImage, mask: &FilterMask) -> Result<RgbImage> {
    let info = ImageInfo::new(image.width() as usize, image.height() as usize);
    let rgba = layout::to_rgba(image.as_raw(), &info);

    let mut dispatcher = KernelDispatcher::new(ctx);
    let output = dispatcher.run(&ctx.contract.entry_point, &rgba, &info, mask)?;

    let rgb = layout::to_rgb(&output, &info);
    RgbImage::from_raw(image.width(), image.height(), rgb)
        .ok_or_else(|| "output buffer does not match image size".into())
}

/// Reads `config.input`, sharpens it and writes `config.output`.
///
/// Nothing is written unless every stage succeeds.
pub fn run_unsharp(config: &Config) -> Result<()> {
    let mut profiler = Profiler::new();

    profiler.step("Reading input image");
    let input_image = read_rgb(&config.input)?;
    info!("Image size: {}×{}", input_image.width(), input_image.height());

    profiler.step("Building filter mask");
    info!(
        "Filter radius {}, half-extent {}, spread {}",
        config.extent.radius, config.extent.half_extent, config.spread
    );
    let mask = FilterMask::gaussian(config.extent, config.spread)?;
    info!("Mask size: {}×{}", mask.side(), mask.side());

    profiler.step("Loading kernel source");
    let source = config.kernel.load()?;

    profiler.step("Initializing OpenCL context");
    let ctx = DeviceContext::initialize(
        &source,
        KernelContract::unsharp_mask(config.entry_point.as_str()),
    )?;

    profiler.step("Running unsharp mask kernel");
    let output_image = sharpen(&ctx, &input_image, &mask)?;

    profiler.step("Saving image");
    output_image
        .save(&config.output)
        .chain_err(|| format!("Error saving output image {}", config.output.display()))?;

    Ok(())
}
