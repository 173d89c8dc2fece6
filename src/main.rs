use clap::Parser;
use gpu_unsharp::mask::MaskExtent;
use gpu_unsharp::{Config, KernelSource, DEFAULT_ENTRY_POINT, DEFAULT_SPREAD};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "gpu-unsharp")]
#[command(about = "Sharpen an image with a Gaussian unsharp mask on an OpenCL GPU")]
#[command(version)]
struct Cli {
    /// Input image
    #[arg(default_value = "assets/lena.ppm")]
    input: PathBuf,

    /// Output image, format chosen by extension
    #[arg(default_value = "./cl-out.ppm")]
    output: PathBuf,

    /// Nominal radius; the filter radius is its square
    #[arg(default_value_t = 3, conflicts_with = "half_extent")]
    radius: u32,

    /// Mask half-extent, overriding the nominal radius
    #[arg(long)]
    half_extent: Option<u32>,

    /// Standard deviation of the Gaussian
    #[arg(long, default_value_t = DEFAULT_SPREAD)]
    spread: f32,

    /// Device program source (default: built-in unsharp mask)
    #[arg(long)]
    kernel: Option<PathBuf>,

    /// Kernel entry point
    #[arg(long, default_value = DEFAULT_ENTRY_POINT)]
    entry_point: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.half_extent {
        Some(half_extent) => MaskExtent::from_half_extent(half_extent),
        None => MaskExtent::from_nominal_radius(cli.radius),
    }
    .and_then(|extent| {
        gpu_unsharp::run_unsharp(&Config {
            input: cli.input,
            output: cli.output,
            extent,
            spread: cli.spread,
            kernel: cli.kernel.map_or(KernelSource::Embedded, KernelSource::File),
            entry_point: cli.entry_point,
        })
    });

    if let Err(ref e) = result {
        eprintln!("error: {}", e);

        for e in e.iter().skip(1) {
            eprintln!("caused by: {}", e);
        }

        if let Some(backtrace) = e.backtrace() {
            eprintln!("backtrace: {:?}", backtrace);
        }

        process::exit(e.exit_code());
    }
}
