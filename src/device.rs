//! OpenCL platform/device discovery and program loading.

use crate::errors::*;
use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{Device, CL_DEVICE_TYPE_GPU};
use opencl3::error_codes::{ClError, CL_DEVICE_NOT_FOUND};
use opencl3::kernel::Kernel;
use opencl3::platform::{get_platforms, Platform};
use opencl3::program::Program;
use tracing::{debug, info, warn};

use common::LOCAL_SIZE;

/// Kind of a single kernel parameter in the device program's signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    ReadOnlyImage2d,
    ReadWriteImage2d,
    ReadOnlyFloatBuffer,
    Int,
}

/// Entry point and parameter signature a device program has to provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelContract {
    pub entry_point: String,
    pub version: u32,
    pub params: Vec<ParamKind>,
}

impl KernelContract {
    pub const UNSHARP_MASK_V1: &'static [ParamKind] = &[
        ParamKind::ReadOnlyImage2d,
        ParamKind::ReadWriteImage2d,
        ParamKind::ReadOnlyFloatBuffer,
        ParamKind::Int,
    ];

    /// `(input image, output image, mask, half-extent)`, version 1.
    pub fn unsharp_mask<S: Into<String>>(entry_point: S) -> Self {
        Self {
            entry_point: entry_point.into(),
            version: 1,
            params: Self::UNSHARP_MASK_V1.to_vec(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Returns the first discovered item, failing when nothing was found.
pub fn select_first<T>(devices: Vec<T>, what: &str) -> Result<T> {
    devices
        .into_iter()
        .next()
        .ok_or_else(|| ErrorKind::DeviceUnavailable(format!("no {} found", what)).into())
}

/// Platforms without a GPU report `CL_DEVICE_NOT_FOUND` instead of an empty
/// list; any other failure is passed on with its OpenCL error text.
pub fn gpu_devices<T>(result: ::std::result::Result<Vec<T>, ClError>) -> Result<Vec<T>> {
    match result {
        Err(ClError(code)) if code == CL_DEVICE_NOT_FOUND => Ok(Vec::new()),
        other => other.device_err(|| ErrorKind::DeviceUnavailable("listing GPU devices".into())),
    }
}

/// Turns a failed program build into a `CompileError` carrying the log.
pub fn compile_error(log: String) -> Error {
    let log = if log.trim().is_empty() {
        "build failed without diagnostic output".to_string()
    } else {
        log
    };
    ErrorKind::CompileError(log).into()
}

/// Looks up `name` in `program`.
pub fn create_kernel(program: &Program, name: &str) -> Result<Kernel> {
    Kernel::create(program, name).device_err(|| ErrorKind::EntryPointNotFound(name.to_string()))
}

/// A single GPU with its context, command queue and built program.
///
/// Everything is released when the context is dropped.
pub struct DeviceContext {
    pub platform: Platform,
    pub device: Device,
    pub context: Context,
    pub queue: CommandQueue,
    pub program: Program,
    pub contract: KernelContract,
}

impl DeviceContext {
    /// Finds the first GPU on the default platform and builds `source` for
    /// it, then checks the program against `contract`.
    pub fn initialize(source: &str, contract: KernelContract) -> Result<Self> {
        let platforms = get_platforms()
            .device_err(|| ErrorKind::DeviceUnavailable("listing OpenCL platforms".into()))?;
        let platform = select_first(platforms, "OpenCL platform")?;
        info!(
            "Platform: {}",
            platform.name().unwrap_or_else(|_| "<unknown>".into())
        );

        let device_ids = gpu_devices(platform.get_devices(CL_DEVICE_TYPE_GPU))?;
        info!("Total GPU devices: {}", device_ids.len());
        for (idx, &id) in device_ids.iter().enumerate() {
            log_device(idx, &Device::new(id));
        }

        let device = Device::new(select_first(device_ids, "GPU device")?);
        let max_wg_size = device
            .max_work_group_size()
            .device_err(|| ErrorKind::DeviceUnavailable("querying max work-group size".into()))?;
        if max_wg_size < LOCAL_SIZE * LOCAL_SIZE {
            bail!(ErrorKind::DeviceUnavailable(format!(
                "device supports work-groups of {} items, {}x{} required",
                max_wg_size, LOCAL_SIZE, LOCAL_SIZE
            )));
        }

        let context = Context::from_device(&device)
            .device_err(|| ErrorKind::DeviceUnavailable("creating context".into()))?;

        // OpenCL 1.2 entry point; create_default_with_properties needs 2.0.
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(&context, 0)
            .device_err(|| ErrorKind::DeviceUnavailable("creating command queue".into()))?;

        let program = Program::create_and_build_from_source(&context, source, "").map_err(|log| {
            warn!("Program build failed");
            compile_error(log)
        })?;

        let ctx = Self {
            platform,
            device,
            context,
            queue,
            program,
            contract,
        };
        ctx.validate_contract()?;

        Ok(ctx)
    }

    /// Checks that the contracted entry point exists and takes the
    /// contracted number of arguments.
    fn validate_contract(&self) -> Result<()> {
        let name = &self.contract.entry_point;
        let kernel = create_kernel(&self.program, name)?;
        let num_args = kernel
            .num_args()
            .device_err(|| ErrorKind::KernelLaunchError("querying kernel arguments".into()))?
            as usize;
        if num_args != self.contract.arity() {
            bail!(ErrorKind::ContractMismatch(
                name.clone(),
                self.contract.arity(),
                num_args
            ));
        }

        debug!(
            "Kernel '{}' matches contract v{} ({} arguments)",
            name, self.contract.version, num_args
        );
        Ok(())
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        debug!("Releasing OpenCL context");
    }
}

fn log_device(idx: usize, device: &Device) {
    let name = device.name().unwrap_or_else(|_| "<unknown>".into());
    let vendor = device.vendor().unwrap_or_else(|_| "<unknown>".into());
    info!("Device {}: {} ({})", idx, name.trim(), vendor.trim());
    if let Ok(memory) = device.global_mem_size() {
        info!("Global memory: {} MiB", memory as f32 / (1 << 20) as f32);
    }
    if let Ok(units) = device.max_compute_units() {
        info!("Compute units: {}", units);
    }
    if let Ok(wg_size) = device.max_work_group_size() {
        info!("Max work-group size: {}", wg_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencl3::error_codes::CL_INVALID_PLATFORM;

    #[test]
    fn empty_device_list_is_unavailable() {
        let err = select_first(Vec::<u32>::new(), "GPU device").unwrap_err();
        match *err.kind() {
            ErrorKind::DeviceUnavailable(ref msg) => assert_eq!(msg, "no GPU device found"),
            ref kind => panic!("unexpected error kind: {}", kind),
        }
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn first_device_is_selected() {
        assert_eq!(select_first(vec![7, 8, 9], "GPU device").unwrap(), 7);
    }

    #[test]
    fn missing_gpu_is_an_empty_list() {
        let devices = gpu_devices::<u32>(Err(ClError(CL_DEVICE_NOT_FOUND))).unwrap();
        assert!(devices.is_empty());
        assert_eq!(gpu_devices(Ok(vec![1u32, 2])).unwrap(), vec![1, 2]);
    }

    #[test]
    fn other_listing_errors_keep_their_cause() {
        let err = gpu_devices::<u32>(Err(ClError(CL_INVALID_PLATFORM))).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        let causes: Vec<String> = err.iter().map(|e| e.to_string()).collect();
        assert!(causes[0].contains("listing GPU devices"));
        assert_eq!(causes.len(), 2);
        assert_eq!(causes[1], ClError(CL_INVALID_PLATFORM).to_string());
    }

    #[test]
    fn compile_errors_always_carry_text() {
        match *compile_error(String::new()).kind() {
            ErrorKind::CompileError(ref log) => assert!(!log.is_empty()),
            ref kind => panic!("unexpected error kind: {}", kind),
        }
        match *compile_error("<source>:3:1: error: expected ';'".into()).kind() {
            ErrorKind::CompileError(ref log) => assert!(log.contains("expected ';'")),
            ref kind => panic!("unexpected error kind: {}", kind),
        }
    }

    #[test]
    fn unsharp_contract_has_four_params() {
        let contract = KernelContract::unsharp_mask("unsharp_mask");
        assert_eq!(contract.arity(), 4);
        assert_eq!(contract.version, 1);
        assert_eq!(contract.params[0], ParamKind::ReadOnlyImage2d);
        assert_eq!(contract.params[3], ParamKind::Int);
    }
}
