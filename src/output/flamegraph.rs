//! SVG flamegraph output, rendered by inferno from collapsed stack lines.

use inferno::flamegraph::{self, Options};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::utils::config::DEFAULT_FLAMEGRAPH_WIDTH;
use crate::utils::error::OutputError;

/// Flamegraph configuration
#[derive(Debug, Clone)]
pub struct FlamegraphConfig {
    pub title: String,
    pub width: usize,
}

impl Default for FlamegraphConfig {
    fn default() -> Self {
        Self {
            title: "Profile".to_string(),
            width: DEFAULT_FLAMEGRAPH_WIDTH,
        }
    }
}

impl FlamegraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Render collapsed stack lines to an SVG file.
pub fn write_flamegraph(
    lines: &[String],
    output_path: impl AsRef<Path>,
    config: &FlamegraphConfig,
) -> Result<(), OutputError> {
    if lines.is_empty() {
        return Err(OutputError::EmptyStacks);
    }
    let output_path = output_path.as_ref();
    info!(
        "Writing flamegraph with {} stacks to: {}",
        lines.len(),
        output_path.display()
    );

    let mut options = Options::default();
    options.title = config.title.clone();
    options.image_width = Some(config.width);
    options.count_name = "weight".to_string();

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);
    flamegraph::from_lines(&mut options, lines.iter().map(|l| l.as_str()), writer)
        .map_err(|e| OutputError::RenderFailed(e.to_string()))?;

    info!("Flamegraph written successfully");
    Ok(())
}
