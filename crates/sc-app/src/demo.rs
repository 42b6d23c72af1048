//! Scripted viewer sessions

use anyhow::Result;
use tracing::info;

use sc_core::{AnchorId, Range, ViewportModel};
use sc_data::LoadCoordinator;

/// One step of a scripted session
struct Step {
    viewer: usize,
    range: Range,
}

const SCRIPT: &[Step] = &[
    Step { viewer: 0, range: Range::new(0, 999) },
    Step { viewer: 1, range: Range::new(500, 1_499) },
    Step { viewer: 0, range: Range::new(250, 1_249) },
    Step { viewer: 1, range: Range::new(5_000, 5_999) },
    Step { viewer: 0, range: Range::new(5_500, 5_599) },
    Step { viewer: 1, range: Range::new(5_200, 5_299) },
];

/// Pan two viewers through the script, loading after every step
pub fn run(model: &mut ViewportModel, coordinator: &mut LoadCoordinator) -> Result<()> {
    let viewers: [AnchorId; 2] = [model.anchor(), model.anchor()];

    for (index, step) in SCRIPT.iter().enumerate() {
        let anchor = viewers[step.viewer];
        model.set_active_range(step.range, anchor);
        coordinator.run_until_idle(model)?;

        info!(
            "Step {}: viewer {} at {}, buffer {}",
            index + 1,
            anchor,
            step.range,
            model.buffer_range()
        );
        report(model, anchor)?;
    }
    Ok(())
}

fn report(model: &ViewportModel, anchor: AnchorId) -> Result<()> {
    let ids: Vec<_> = model.series().map(|source| source.id()).collect();
    for id in ids {
        let source = model.source(id)?;
        let visible = model.points_in_range(id, anchor)?;
        info!(
            "  {:<10} {:>5} visible, {:>6} cached, coverage {:?}",
            source.legend(),
            visible.len(),
            model.point_count(id)?,
            model.coverage(id)?
        );
    }
    Ok(())
}
