//! PNG chart of a single measurement run

use crate::config::OutputConfig;
use anyhow::Result;
use meter::ProgressEvent;
use plotters::prelude::*;
use std::path::Path;

/// Only the most recent samples are drawn
pub const CHART_WINDOW: usize = 50;

/// The trailing `CHART_WINDOW` events
pub fn chart_window(events: &[ProgressEvent]) -> &[ProgressEvent] {
    &events[events.len().saturating_sub(CHART_WINDOW)..]
}

/// Upper y bound with 10% headroom; the axis always starts at zero
fn y_upper_bound(events: &[ProgressEvent]) -> f64 {
    let peak = events
        .iter()
        .flat_map(|e| [e.rtt_ms, e.smoothed_jitter_ms])
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    (peak * 1.1).max(1.0)
}

/// Draw RTT and smoothed jitter per sample index
pub fn generate_run_chart(
    title: &str,
    events: &[ProgressEvent],
    output_path: &Path,
    config: &OutputConfig,
) -> Result<()> {
    let window = chart_window(events);
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        anyhow::bail!("No samples to chart");
    };

    let root = BitMapBackend::new(output_path, (config.chart_width, config.chart_height))
        .into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = y_upper_bound(window);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 32).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(first.sample_index..last.sample_index + 1, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Sample")
        .y_desc("Milliseconds")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 20))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            window.iter().map(|e| (e.sample_index, e.rtt_ms)),
            BLUE.stroke_width(2),
        ))?
        .label("RTT")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            window.iter().map(|e| (e.sample_index, e.smoothed_jitter_ms)),
            RED.stroke_width(2),
        ))?
        .label("Jitter (RFC 3550)")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 16))
        .draw()?;

    root.present()?;

    Ok(())
}
