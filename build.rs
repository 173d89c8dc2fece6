use std::env;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let kernel_path = manifest_dir.join("kernel").join("unsharp_mask.cl");

    // Provide the default device program location via env variable
    println!(
        "cargo:rustc-env=KERNEL_SOURCE_PATH={}",
        kernel_path.display()
    );

    // Observe changes in kernel sources
    println!("cargo:rerun-if-changed={}", kernel_path.display());
}
