use upscale_core::config::{validate_resolution, validate_scale};
use upscale_core::models::UpscaleParams;

/// Apply per-run flag overrides to the configured upscale parameters.
pub fn override_params(
    base: UpscaleParams,
    resolution: Option<String>,
    scale: Option<String>,
    no_audio: bool,
) -> anyhow::Result<UpscaleParams> {
    let mut params = base;
    if let Some(resolution) = resolution {
        validate_resolution(&resolution)?;
        params.target_resolution = resolution;
    }
    if let Some(scale) = scale {
        validate_scale(&scale)?;
        params.scale = scale;
    }
    if no_audio {
        params.preserve_audio = false;
    }
    Ok(params)
}

/// Prints status lines to stderr, skipping a line identical to the previous one.
///
/// Progress callbacks fire once per chunk; most of them do not move the percentage.
#[derive(Debug, Default)]
pub struct StatusPrinter {
    last: Option<String>,
}

impl StatusPrinter {
    /// Returns true when the line was new and got printed.
    pub fn print(&mut self, line: String) -> bool {
        if self.last.as_deref() == Some(line.as_str()) {
            return false;
        }
        eprintln!("{}", line);
        self.last = Some(line);
        true
    }
}


/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
