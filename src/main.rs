use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use mesh_viewer::config::{CliArgs, ViewerConfig};
use mesh_viewer::gpu::RecordingContext;
use mesh_viewer::scene::run_headless;

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // Init tracing
    let filter = if args.verbose {
        EnvFilter::new("mesh_viewer=debug")
    } else {
        EnvFilter::new("mesh_viewer=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config: ViewerConfig = args.into();
    config.validate().context("Invalid configuration")?;

    // Configure rayon thread pool
    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure rayon thread pool")?;
    }

    let mut ctx = RecordingContext::without_call_log();
    match run_headless(&config, &mut ctx) {
        Ok(summary) => {
            println!(
                "Done: {} frames, {} triangles in the last frame, {} of {} instances culled, {:.1} fps",
                summary.frames,
                summary.last_frame.triangles,
                summary.last_frame.objects_culled,
                summary.last_frame.objects_culled + summary.last_frame.objects_drawn,
                summary.frames_per_second
            );
            Ok(())
        }
        Err(e) => {
            error!(%e, "Viewer run failed");
            Err(anyhow::anyhow!(e)).context("mesh-viewer run failed")
        }
    }
}
