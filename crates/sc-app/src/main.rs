//! Demo entry point: two viewers panning over shared series

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use sc_core::{DataSource, ModelConfig, ViewportModel};
use sc_data::{CoordinatorConfig, CsvSource, LoadCoordinator, SyntheticSource};

mod demo;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting series cache demo");

    let mut model = ViewportModel::new(ModelConfig::default());
    let mut coordinator = LoadCoordinator::new(&CoordinatorConfig::default(), &mut model)?;

    model.add_series(Arc::new(DataSource::new(
        "sine",
        [0xe0, 0x4f, 0x3a, 0xff],
        Arc::new(SyntheticSource::sine(1, 1_000, 500)?),
    )))?;
    model.add_series(Arc::new(DataSource::new(
        "sawtooth",
        [0x3a, 0x8f, 0xe0, 0xff],
        Arc::new(SyntheticSource::new(10, |x| x.rem_euclid(1_000))?),
    )))?;

    // Optional CSV file with `x` and `y` columns
    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        let runtime = tokio::runtime::Runtime::new()?;
        let source = runtime
            .block_on(CsvSource::open(path.clone(), "x", "y"))
            .with_context(|| format!("Failed to load {}", path.display()))?;
        model.add_series(Arc::new(DataSource::new(
            path.display().to_string(),
            [0x6a, 0xc0, 0x4a, 0xff],
            Arc::new(source),
        )))?;
    }

    demo::run(&mut model, &mut coordinator)?;

    info!("Demo finished");
    Ok(())
}
