//! View command implementations.
//!
//! Every user-facing command runs the same pipeline:
//! 1. Load the profile document
//! 2. Range-filter the selected thread
//! 3. Reduce the transform stack
//! 4. Apply implementation/search filtering and optional inversion
//! 5. Hand the derived thread to the requested output

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

use crate::calltree::{collapsed_lines, compute_call_tree};
use crate::filters::ImplementationFilter;
use crate::output::{write_flamegraph, write_profile, FlamegraphConfig};
use crate::profile::schema::{read_profile, Profile};
use crate::profile::tables::{default_category_index, Thread};
use crate::selectors::{ThreadSelectors, ViewOptions};
use crate::transforms::{
    describe_transform, parse_transforms, stringify_transforms, TransformContext,
};

/// Arguments shared by the view-producing commands.
#[derive(Debug, Clone)]
pub struct ViewArgs {
    /// Path to the profile JSON document
    pub profile: PathBuf,

    /// Which thread of the profile to analyze
    pub thread_index: usize,

    /// Committed time window, as (start, end) in ms
    pub range: Option<(f64, f64)>,

    /// Serialized transform stack (the URL encoding)
    pub transforms: String,

    /// Implementation filter
    pub implementation: ImplementationFilter,

    /// Stack search string; empty matches everything
    pub search: String,

    /// Invert the call stacks after filtering
    pub inverted: bool,
}

/// Parse a "start:end" range argument in milliseconds.
pub fn parse_range(s: &str) -> Result<(f64, f64)> {
    let (start, end) = s
        .split_once(':')
        .context("range must look like start:end, e.g. 10.5:250")?;
    let start: f64 = start.parse().context("range start is not a number")?;
    let end: f64 = end.parse().context("range end is not a number")?;
    if start >= end {
        bail!("range start must be smaller than range end");
    }
    Ok((start, end))
}

/// Validate arguments before doing any work.
pub fn validate_args(args: &ViewArgs) -> Result<()> {
    if !args.profile.exists() {
        bail!("profile file does not exist: {}", args.profile.display());
    }
    Ok(())
}

/// Run the pipeline and return the derived thread plus the loaded profile.
fn derive_thread(args: &ViewArgs) -> Result<(Profile, Arc<Thread>)> {
    info!("Loading profile: {}", args.profile.display());
    let profile = read_profile(&args.profile)
        .with_context(|| format!("Failed to load profile {}", args.profile.display()))?;

    let thread = profile
        .threads
        .get(args.thread_index)
        .with_context(|| format!("No thread at index {}", args.thread_index))?
        .clone();
    debug!(
        "thread {:?}: {} stacks, {} samples",
        thread.name,
        thread.stack_table.len(),
        thread.samples.len()
    );

    let default_category =
        default_category_index(&profile.categories).context("Profile has no default category")?;
    let ctx = TransformContext {
        default_category,
        categories: &profile.categories,
        marker_schemas: &profile.marker_schemas,
    };

    let transforms = parse_transforms(&args.transforms);
    info!("Applying {} transform(s)", transforms.len());
    for transform in &transforms {
        debug!("  {}", describe_transform(&thread, transform));
    }

    let options = ViewOptions {
        range: args.range,
        transforms,
        implementation: args.implementation,
        search: args.search.clone(),
        inverted: args.inverted,
    };

    let mut selectors = ThreadSelectors::new(Arc::new(thread));
    let derived = selectors
        .filtered_thread(&options, &ctx)
        .context("Failed to apply transforms")?;

    Ok((profile, derived))
}

/// Execute the `filter` command: write the derived thread back out as a
/// single-thread profile document.
pub fn execute_filter(args: ViewArgs, output: PathBuf) -> Result<()> {
    validate_args(&args)?;
    let (profile, derived) = derive_thread(&args)?;

    let filtered = Profile {
        categories: profile.categories.clone(),
        marker_schemas: profile.marker_schemas.clone(),
        interval: profile.interval,
        threads: vec![(*derived).clone()],
    };
    write_profile(&filtered, &output).context("Failed to write filtered profile")?;

    println!("Wrote filtered profile: {}", output.display());
    Ok(())
}

/// Execute the `tree` command: print the aggregated call tree.
pub fn execute_tree(args: ViewArgs, max_rows: usize) -> Result<()> {
    validate_args(&args)?;
    let (profile, derived) = derive_thread(&args)?;
    let default_category = default_category_index(&profile.categories)?;

    let tree = compute_call_tree(&derived, default_category);
    print!("{}", tree.render_text(&derived, max_rows));
    Ok(())
}

/// Execute the `flamegraph` command: render the derived thread as SVG.
pub fn execute_flamegraph(
    args: ViewArgs,
    output: PathBuf,
    title: Option<String>,
    width: usize,
) -> Result<()> {
    validate_args(&args)?;
    let (profile, derived) = derive_thread(&args)?;
    let default_category = default_category_index(&profile.categories)?;

    let lines = collapsed_lines(&derived, default_category);
    let mut config = FlamegraphConfig::new();
    if let Some(title) = title {
        config = config.with_title(title);
    }
    config.width = width;

    write_flamegraph(&lines, &output, &config).context("Failed to write flamegraph")?;
    println!("Wrote flamegraph: {}", output.display());
    Ok(())
}

/// Execute the `transforms` command: parse a transform string, report what
/// survived, and print the canonical re-serialization.
pub fn execute_transforms(input: &str) -> Result<()> {
    let segment_count = if input.is_empty() {
        0
    } else {
        input.split('~').count()
    };
    let transforms = parse_transforms(input);

    println!("Parsed {} of {} segment(s)", transforms.len(), segment_count);
    for transform in &transforms {
        println!("  {:?}", transform);
    }
    println!("Canonical: {}", stringify_transforms(&transforms));
    Ok(())
}
