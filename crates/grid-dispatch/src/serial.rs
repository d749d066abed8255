//! Single-participant execution.

use synth_common::{Pixel, PhysicsModel};
use tracing::info;

use crate::context::RunContext;
use crate::error::Result;
use crate::progress::{ProgressEvent, ProgressSink};

/// Evaluate every pixel of the region on the coordinator, in raster order.
///
/// Returns the number of pixels written.
pub fn run_serial<M: PhysicsModel>(
    ctx: &mut RunContext,
    model: &M,
    sink: &dyn ProgressSink,
) -> Result<usize> {
    let region = ctx.region().clone();
    let interpolate = ctx.interpolate();

    sink.emit(ProgressEvent::SerialStarted {
        pixels: region.pixel_count(),
    });
    info!(region = %region, pixels = region.pixel_count(), "Running serially");

    let mut written = 0;
    for y in region.y.clone() {
        for x in region.x.clone() {
            let pixel = Pixel::new(x, y);
            let column = ctx.column(pixel)?;
            let synthesis = model.synth(&column, interpolate)?;
            ctx.record_pixel(pixel, &synthesis)?;
            written += 1;
        }
        sink.emit(ProgressEvent::RowCompleted {
            y,
            pixels: region.width(),
        });
    }

    Ok(written)
}
