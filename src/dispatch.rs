//! Device memory setup, kernel dispatch and result read-back.

use crate::device::{create_kernel, DeviceContext};
use crate::errors::*;
use crate::mask::FilterMask;
use common::{ImageInfo, WorkSize, RGBA_CHANNELS};
use opencl3::kernel::ExecuteKernel;
use opencl3::memory::{
    Buffer, Image, CL_MEM_COPY_HOST_PTR, CL_MEM_OBJECT_IMAGE2D, CL_MEM_READ_ONLY,
    CL_MEM_READ_WRITE, CL_RGBA, CL_UNORM_INT8,
};
use opencl3::types::{cl_float, cl_image_desc, cl_image_format, cl_int, CL_BLOCKING};
use std::ffi::c_void;
use std::{fmt, mem, ptr};
use tracing::{debug, info};

/// Lifecycle of one dispatch. `Uninitialized` precedes the device context;
/// dispatchers start out `DeviceReady`. `Failed` and `ResultReady` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Uninitialized,
    DeviceReady,
    BuffersAllocated,
    Dispatched,
    ResultReady,
    Failed,
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            DispatchState::Uninitialized => "uninitialized",
            DispatchState::DeviceReady => "device ready",
            DispatchState::BuffersAllocated => "buffers allocated",
            DispatchState::Dispatched => "dispatched",
            DispatchState::ResultReady => "result ready",
            DispatchState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Checks that the host buffers describe a non-empty RGBA image and a
/// well-formed mask before anything is allocated on the device.
pub fn validate_input(rgba: &[u8], info: &ImageInfo, mask: &FilterMask) -> Result<()> {
    if info.width == 0 || info.height == 0 {
        bail!(ErrorKind::InvalidParameter(format!(
            "image must not be empty, got {}x{}",
            info.width, info.height
        )));
    }
    let expected = info.pixel_count() * RGBA_CHANNELS;
    if rgba.len() != expected {
        bail!(ErrorKind::InvalidParameter(format!(
            "RGBA buffer holds {} bytes, {}x{} image needs {}",
            rgba.len(),
            info.width,
            info.height,
            expected
        )));
    }
    if mask.weights().len() != mask.side() * mask.side() {
        bail!(ErrorKind::InvalidParameter(format!(
            "mask of side {} holds {} weights",
            mask.side(),
            mask.weights().len()
        )));
    }
    Ok(())
}

/// Runs one unsharp-mask invocation against a [`DeviceContext`].
///
/// A dispatcher is single-shot: once it has produced a result or failed,
/// a new one has to be created for the next image.
pub struct KernelDispatcher<'a> {
    ctx: &'a DeviceContext,
    state: DispatchState,
}

impl<'a> KernelDispatcher<'a> {
    pub fn new(ctx: &'a DeviceContext) -> Self {
        Self {
            ctx,
            state: DispatchState::DeviceReady,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    fn advance(&mut self, next: DispatchState) {
        debug!("Dispatch: {} -> {}", self.state, next);
        self.state = next;
    }

    /// Sharpens `rgba` (4 bytes per pixel) with `mask` using the kernel
    /// named `entry_point`, returning the 4×W×H output samples.
    ///
    /// The kernel receives `(input, output, mask, half_extent)`.
    pub fn run(
        &mut self,
        entry_point: &str,
        rgba: &[u8],
        info: &ImageInfo,
        mask: &FilterMask,
    ) -> Result<Vec<u8>> {
        if self.state != DispatchState::DeviceReady {
            bail!(ErrorKind::KernelLaunchError(format!(
                "starting dispatch in state '{}'",
                self.state
            )));
        }

        match self.dispatch(entry_point, rgba, info, mask) {
            Ok(pixels) => {
                self.advance(DispatchState::ResultReady);
                Ok(pixels)
            }
            Err(e) => {
                self.advance(DispatchState::Failed);
                Err(e)
            }
        }
    }

    fn dispatch(
        &mut self,
        entry_point: &str,
        rgba: &[u8],
        info: &ImageInfo,
        mask: &FilterMask,
    ) -> Result<Vec<u8>> {
        validate_input(rgba, info, mask)?;
        let context = &self.ctx.context;

        let format = rgba_format();
        let desc = image_desc(info);

        let input_image = unsafe {
            Image::create(
                context,
                CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR,
                &format,
                &desc,
                rgba.as_ptr() as *mut c_void,
            )
        }
        .device_err(|| ErrorKind::DeviceMemoryError("allocating input image".into()))?;

        let mask_buffer = unsafe {
            Buffer::<cl_float>::create(
                context,
                CL_MEM_READ_ONLY | CL_MEM_COPY_HOST_PTR,
                mask.weights().len(),
                mask.weights().as_ptr() as *mut c_void,
            )
        }
        .device_err(|| ErrorKind::DeviceMemoryError("allocating mask buffer".into()))?;

        let output_image = unsafe {
            Image::create(context, CL_MEM_READ_WRITE, &format, &desc, ptr::null_mut())
        }
        .device_err(|| ErrorKind::DeviceMemoryError("allocating output image".into()))?;

        self.advance(DispatchState::BuffersAllocated);

        let kernel = create_kernel(&self.ctx.program, entry_point)?;

        let work = WorkSize::padded(info);
        if work.is_padded(info) {
            info!(
                "Padding global range {}x{} to {}x{}",
                info.width, info.height, work.global[0], work.global[1]
            );
        }
        debug!(
            "Work-groups: {}x{} of {}x{}",
            work.groups()[0],
            work.groups()[1],
            work.local[0],
            work.local[1]
        );

        let radius = mask.half_extent() as cl_int;
        unsafe {
            ExecuteKernel::new(&kernel)
                .set_arg(&input_image)
                .set_arg(&output_image)
                .set_arg(&mask_buffer)
                .set_arg(&radius)
                .set_global_work_sizes(&work.global)
                .set_local_work_sizes(&work.local)
                .enqueue_nd_range(&self.ctx.queue)
        }
        .device_err(|| ErrorKind::KernelLaunchError("enqueueing kernel".into()))?;
        self.advance(DispatchState::Dispatched);

        let origin = info.origin();
        let region = info.region();
        let mut pixels = vec![0u8; rgba.len()];
        // The in-order queue runs the read after the kernel; blocking makes
        // this the only host synchronization point.
        unsafe {
            self.ctx.queue.enqueue_read_image(
                &output_image,
                CL_BLOCKING,
                origin.as_ptr(),
                region.as_ptr(),
                0,
                0,
                pixels.as_mut_ptr() as *mut c_void,
                &[],
            )
        }
        .device_err(|| ErrorKind::KernelLaunchError("reading output image".into()))?;

        Ok(pixels)
    }
}

/// 4 channels of 8-bit unsigned-normalized samples.
fn rgba_format() -> cl_image_format {
    cl_image_format {
        image_channel_order: CL_RGBA,
        image_channel_data_type: CL_UNORM_INT8,
    }
}

fn image_desc(info: &ImageInfo) -> cl_image_desc {
    // All-zero is a valid descriptor: no pitch, no mip levels, no buffer.
    let mut desc: cl_image_desc = unsafe { mem::zeroed() };
    desc.image_type = CL_MEM_OBJECT_IMAGE2D;
    desc.image_width = info.width;
    desc.image_height = info.height;
    desc
}
