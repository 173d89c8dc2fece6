use std::fmt;
use std::io;

error_chain! {
    foreign_links {
        Io(io::Error);
        Image(::image::ImageError);
    }

    errors {
        InvalidParameter(msg: String) {
            description("invalid parameter")
            display("invalid parameter: {}", msg)
        }

        DeviceUnavailable(msg: String) {
            description("no usable compute device")
            display("no usable compute device: {}", msg)
        }

        CompileError(log: String) {
            description("device program failed to build")
            display("device program failed to build:\n{}", log)
        }

        EntryPointNotFound(name: String) {
            description("kernel entry point not found")
            display("kernel entry point '{}' not found in program", name)
        }

        ContractMismatch(name: String, expected: usize, actual: usize) {
            description("kernel signature does not match contract")
            display(
                "kernel '{}' takes {} arguments, contract requires {}",
                name, actual, expected
            )
        }

        DeviceMemoryError(op: String) {
            description("device memory allocation failed")
            display("device memory error while {}", op)
        }

        KernelLaunchError(op: String) {
            description("kernel dispatch failed")
            display("kernel dispatch error while {}", op)
        }
    }
}

impl Error {
    /// Process exit code for this failure kind.
    pub fn exit_code(&self) -> i32 {
        match *self.kind() {
            ErrorKind::InvalidParameter(_) => 2,
            ErrorKind::DeviceUnavailable(_) => 3,
            ErrorKind::CompileError(_) => 4,
            ErrorKind::EntryPointNotFound(_) | ErrorKind::ContractMismatch(..) => 5,
            ErrorKind::DeviceMemoryError(_) => 6,
            ErrorKind::KernelLaunchError(_) => 7,
            _ => 1,
        }
    }
}

/// Attaches an error kind to results coming out of the OpenCL bindings,
/// whose error types only carry their message text.
pub trait DeviceResultExt<T> {
    fn device_err<F, K>(self, callback: F) -> Result<T>
    where
        F: FnOnce() -> K,
        K: Into<ErrorKind>;
}

impl<T, E: fmt::Display> DeviceResultExt<T> for ::std::result::Result<T, E> {
    fn device_err<F, K>(self, callback: F) -> Result<T>
    where
        F: FnOnce() -> K,
        K: Into<ErrorKind>,
    {
        self.map_err(|e| Error::from(e.to_string()))
            .chain_err(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kinds_map_to_distinct_exit_codes() {
        let errors: Vec<Error> = vec![
            ErrorKind::InvalidParameter("spread".into()).into(),
            ErrorKind::DeviceUnavailable("none".into()).into(),
            ErrorKind::CompileError("log".into()).into(),
            ErrorKind::EntryPointNotFound("k".into()).into(),
            ErrorKind::DeviceMemoryError("allocating".into()).into(),
            ErrorKind::KernelLaunchError("enqueueing".into()).into(),
        ];
        let codes: HashSet<i32> = errors.iter().map(Error::exit_code).collect();
        assert!(codes.iter().all(|&code| code > 1));
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn chained_errors_keep_their_kind() {
        let result: Result<()> = Err(io::Error::new(io::ErrorKind::Other, "boom").into());
        let err = result
            .chain_err(|| ErrorKind::KernelLaunchError("reading output image".into()))
            .unwrap_err();
        assert_eq!(err.exit_code(), 7);
        assert!(err.to_string().contains("reading output image"));
        assert_eq!(err.iter().count(), 2);
    }

    #[test]
    fn device_errors_carry_operation_and_cause() {
        let result: ::std::result::Result<(), &str> = Err("CL_OUT_OF_RESOURCES");
        let err = result
            .device_err(|| ErrorKind::DeviceMemoryError("allocating mask buffer".into()))
            .unwrap_err();
        assert_eq!(err.exit_code(), 6);
        let causes: Vec<String> = err.iter().map(|e| e.to_string()).collect();
        assert!(causes[0].contains("allocating mask buffer"));
        assert_eq!(causes[1], "CL_OUT_OF_RESOURCES");
    }

    #[test]
    fn messages_use_generic_exit_code() {
        let err: Error = "something".into();
        assert_eq!(err.exit_code(), 1);
    }
}
