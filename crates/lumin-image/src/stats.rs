//! Exposure-dependent pixel statistics and histograms.
//!
//! A [`HistogramSnapshot`] captures, for one buffer at one exposure:
//! per-channel minimum / average / maximum of the exposure-adjusted
//! values, a 256-bin histogram in linear domain, and a second histogram
//! binned through the sRGB transfer curve (perceptual spacing). Axis
//! tick positions and labels are precomputed per domain so the
//! presentation layer can draw without touching pixel data.
//!
//! Snapshots are immutable once produced and shared via `Arc`; a new
//! exposure produces a new snapshot rather than mutating the old one.
//! Log-scale display of the bin counts is a display-time transform and
//! deliberately not part of the cached data.
//!
//! [`compute`] is meant to run inside an [`AsyncTask`]: it reads the
//! buffer (never mutates), reports progress per row band, and honors
//! cancellation at band boundaries. Within a band, rows are folded in
//! parallel with rayon.
//!
//! [`AsyncTask`]: lumin_sched::AsyncTask

use lumin_core::ImageBuffer;
use lumin_sched::{TaskContext, TaskOutcome};
use rayon::prelude::*;
use tracing::trace;

/// Number of histogram bins per channel and domain.
pub const NUM_BINS: usize = 256;

/// Rows processed between cancellation checkpoints / progress reports.
const BAND_ROWS: u32 = 64;

/// Fractions of the display white point where axis ticks are placed.
const TICK_FRACTIONS: [f32; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

/// Axis tick marks for one histogram domain.
///
/// Positions are normalized bin coordinates in [0, 1]; labels are the
/// corresponding raw (pre-exposure) pixel values.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisTicks {
    /// Normalized positions along the bin axis.
    pub positions: Vec<f32>,
    /// Display labels, one per position.
    pub labels: Vec<String>,
}

/// Immutable statistics for one buffer at one exposure.
#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    /// The exposure (in stops) these statistics were computed at.
    pub exposure: f32,
    /// Per-channel minimum of the exposure-adjusted finite values.
    pub minimum: [f32; 3],
    /// Per-channel average of the exposure-adjusted finite values.
    pub average: [f32; 3],
    /// Per-channel maximum of the exposure-adjusted finite values.
    pub maximum: [f32; 3],
    /// Count of NaN/Inf samples encountered (all channels).
    pub non_finite: u64,
    /// Per-channel bin counts, linear-domain spacing.
    pub linear: [[f32; NUM_BINS]; 3],
    /// Per-channel bin counts, sRGB (perceptual) spacing.
    pub perceptual: [[f32; NUM_BINS]; 3],
    /// Ticks for the linear-domain axis.
    pub linear_ticks: AxisTicks,
    /// Ticks for the perceptual-domain axis.
    pub perceptual_ticks: AxisTicks,
}

impl HistogramSnapshot {
    /// Placeholder snapshot for a null buffer: neutral range, empty bins.
    pub fn empty(exposure: f32) -> Self {
        Self {
            exposure,
            minimum: [0.0; 3],
            average: [0.5; 3],
            maximum: [1.0; 3],
            non_finite: 0,
            linear: [[0.0; NUM_BINS]; 3],
            perceptual: [[0.0; NUM_BINS]; 3],
            linear_ticks: ticks(exposure, false),
            perceptual_ticks: ticks(exposure, true),
        }
    }
}

/// The sRGB transfer curve (IEC 61966-2-1), used for perceptual binning.
#[inline]
pub fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        12.92 * v
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Per-band accumulator, merged across rows and bands.
struct Accum {
    minimum: [f32; 3],
    maximum: [f32; 3],
    // f64 to keep the mean stable over millions of samples.
    sum: [f64; 3],
    finite: [u64; 3],
    non_finite: u64,
    linear: [[f32; NUM_BINS]; 3],
    perceptual: [[f32; NUM_BINS]; 3],
}

impl Accum {
    fn new() -> Self {
        Self {
            minimum: [f32::INFINITY; 3],
            maximum: [f32::NEG_INFINITY; 3],
            sum: [0.0; 3],
            finite: [0; 3],
            non_finite: 0,
            linear: [[0.0; NUM_BINS]; 3],
            perceptual: [[0.0; NUM_BINS]; 3],
        }
    }

    fn sample(&mut self, channel: usize, adjusted: f32) {
        if !adjusted.is_finite() {
            self.non_finite += 1;
            return;
        }
        self.minimum[channel] = self.minimum[channel].min(adjusted);
        self.maximum[channel] = self.maximum[channel].max(adjusted);
        self.sum[channel] += f64::from(adjusted);
        self.finite[channel] += 1;

        let clamped = adjusted.clamp(0.0, 1.0);
        self.linear[channel][bin_index(clamped)] += 1.0;
        self.perceptual[channel][bin_index(linear_to_srgb(clamped))] += 1.0;
    }

    fn merge(mut self, other: Self) -> Self {
        for c in 0..3 {
            self.minimum[c] = self.minimum[c].min(other.minimum[c]);
            self.maximum[c] = self.maximum[c].max(other.maximum[c]);
            self.sum[c] += other.sum[c];
            self.finite[c] += other.finite[c];
            for b in 0..NUM_BINS {
                self.linear[c][b] += other.linear[c][b];
                self.perceptual[c][b] += other.perceptual[c][b];
            }
        }
        self.non_finite += other.non_finite;
        self
    }
}

#[inline]
fn bin_index(normalized: f32) -> usize {
    ((normalized * (NUM_BINS - 1) as f32) as usize).min(NUM_BINS - 1)
}

/// Computes a snapshot of `buffer` at `exposure` (stops).
///
/// The exposure is applied as a `2^exposure` gain before statistics and
/// binning. NaN/Inf samples are excluded from min/avg/max and counted in
/// [`HistogramSnapshot::non_finite`]. Buffers with fewer than three
/// channels have their last channel replicated into the missing ones.
///
/// # Errors
///
/// [`lumin_sched::TaskError::Cancelled`] if cancellation is observed at
/// a band boundary.
pub fn compute(
    buffer: &ImageBuffer,
    exposure: f32,
    ctx: &TaskContext,
) -> TaskOutcome<HistogramSnapshot> {
    if buffer.is_null() {
        return Ok(HistogramSnapshot::empty(exposure));
    }

    let start = std::time::Instant::now();
    let gain = exposure.exp2();
    let height = buffer.height();
    let channels = buffer.channels() as usize;

    let mut total = Accum::new();
    let mut y = 0;
    while y < height {
        ctx.checkpoint()?;
        let band_end = (y + BAND_ROWS).min(height);

        let band = (y..band_end)
            .into_par_iter()
            .map(|row_y| {
                let mut acc = Accum::new();
                let row = buffer.row(row_y);
                for px in row.chunks_exact(channels) {
                    for c in 0..3 {
                        let sc = c.min(channels - 1);
                        acc.sample(c, px[sc] * gain);
                    }
                }
                acc
            })
            .reduce(Accum::new, Accum::merge);

        total = total.merge(band);
        y = band_end;
        ctx.report(y as f32 / height as f32);
    }

    let mut average = [0.0; 3];
    let mut minimum = [0.0; 3];
    let mut maximum = [0.0; 3];
    for c in 0..3 {
        if total.finite[c] > 0 {
            average[c] = (total.sum[c] / total.finite[c] as f64) as f32;
            minimum[c] = total.minimum[c];
            maximum[c] = total.maximum[c];
        }
    }

    trace!(
        exposure,
        elapsed_ms = start.elapsed().as_millis() as u64,
        non_finite = total.non_finite,
        "computed pixel statistics"
    );

    Ok(HistogramSnapshot {
        exposure,
        minimum,
        average,
        maximum,
        non_finite: total.non_finite,
        linear: total.linear,
        perceptual: total.perceptual,
        linear_ticks: ticks(exposure, false),
        perceptual_ticks: ticks(exposure, true),
    })
}

/// Builds axis ticks for one domain at fixed fractions of the display
/// white point (the raw value `2^-exposure` that maps to full scale).
fn ticks(exposure: f32, perceptual: bool) -> AxisTicks {
    let white = (-exposure).exp2();
    let mut positions = Vec::with_capacity(TICK_FRACTIONS.len());
    let mut labels = Vec::with_capacity(TICK_FRACTIONS.len());
    for &t in &TICK_FRACTIONS {
        let position = if perceptual { linear_to_srgb(t) } else { t };
        positions.push(position);
        labels.push(format_tick(t * white));
    }
    AxisTicks { positions, labels }
}

fn format_tick(value: f32) -> String {
    let mut s = format!("{value:.3}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lumin_sched::{ProgressState, TaskError};
    use std::sync::Arc;

    fn ctx() -> TaskContext {
        TaskContext::new(Arc::new(ProgressState::new()))
    }

    #[test]
    fn test_uniform_image_statistics() {
        let img = ImageBuffer::filled(16, 16, &[0.25, 0.5, 0.75]);
        let snap = compute(&img, 0.0, &ctx()).unwrap();

        assert_relative_eq!(snap.minimum[0], 0.25);
        assert_relative_eq!(snap.average[1], 0.5, epsilon = 1e-6);
        assert_relative_eq!(snap.maximum[2], 0.75);
        assert_eq!(snap.non_finite, 0);

        // All mass for a channel lands in a single linear bin.
        let g = &snap.linear[1];
        let total: f32 = g.iter().sum();
        assert_relative_eq!(total, 256.0);
        assert_relative_eq!(g[bin_index(0.5)], 256.0);
    }

    #[test]
    fn test_exposure_shifts_values() {
        let img = ImageBuffer::filled(8, 8, &[0.25, 0.25, 0.25]);
        let snap = compute(&img, 1.0, &ctx()).unwrap();
        // One stop up doubles the adjusted values.
        assert_relative_eq!(snap.average[0], 0.5, epsilon = 1e-6);
        assert_eq!(snap.exposure, 1.0);
        assert_relative_eq!(snap.linear[0][bin_index(0.5)], 64.0);
    }

    #[test]
    fn test_perceptual_binning_differs_from_linear() {
        let img = ImageBuffer::filled(4, 4, &[0.05, 0.05, 0.05]);
        let snap = compute(&img, 0.0, &ctx()).unwrap();
        let lin_bin = bin_index(0.05);
        let srgb_bin = bin_index(linear_to_srgb(0.05));
        assert_ne!(lin_bin, srgb_bin);
        assert_relative_eq!(snap.linear[0][lin_bin], 16.0);
        assert_relative_eq!(snap.perceptual[0][srgb_bin], 16.0);
    }

    #[test]
    fn test_non_finite_samples_counted_and_excluded() {
        let mut img = ImageBuffer::filled(2, 2, &[0.5]);
        img.set_pixel(0, 0, &[f32::NAN]);
        img.set_pixel(1, 0, &[f32::INFINITY]);
        let snap = compute(&img, 0.0, &ctx()).unwrap();
        // Single channel replicated into all three display channels.
        assert_eq!(snap.non_finite, 2 * 3);
        assert_relative_eq!(snap.average[0], 0.5, epsilon = 1e-6);
        assert_relative_eq!(snap.minimum[0], 0.5);
        assert_relative_eq!(snap.maximum[0], 0.5);
    }

    #[test]
    fn test_hdr_values_clamp_into_top_bin() {
        let img = ImageBuffer::filled(4, 4, &[8.0, 8.0, 8.0]);
        let snap = compute(&img, 0.0, &ctx()).unwrap();
        assert_relative_eq!(snap.maximum[0], 8.0);
        assert_relative_eq!(snap.linear[0][NUM_BINS - 1], 16.0);
    }

    #[test]
    fn test_null_buffer_yields_empty_snapshot() {
        let snap = compute(&ImageBuffer::null(), 0.0, &ctx()).unwrap();
        assert_eq!(snap.minimum, [0.0; 3]);
        assert_eq!(snap.maximum, [1.0; 3]);
        assert!(snap.linear[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_cancellation_observed() {
        let state = Arc::new(ProgressState::new());
        state.cancel();
        let ctx = TaskContext::new(state);
        let img = ImageBuffer::new(8, 8, 3);
        assert!(matches!(
            compute(&img, 0.0, &ctx),
            Err(TaskError::Cancelled)
        ));
    }

    #[test]
    fn test_ticks() {
        let t = ticks(0.0, false);
        assert_eq!(t.positions.len(), 5);
        assert_eq!(t.labels[0], "0");
        assert_eq!(t.labels[4], "1");
        assert_eq!(t.labels[2], "0.5");

        let p = ticks(0.0, true);
        // Perceptual spacing pushes mid ticks toward the right.
        assert!(p.positions[2] > t.positions[2]);

        // One stop down doubles the white-point label.
        let down = ticks(-1.0, false);
        assert_eq!(down.labels[4], "2");
    }

    #[test]
    fn test_srgb_curve_endpoints() {
        assert_relative_eq!(linear_to_srgb(0.0), 0.0);
        assert_relative_eq!(linear_to_srgb(1.0), 1.0, epsilon = 1e-6);
        assert!(linear_to_srgb(0.5) > 0.5);
    }
}
