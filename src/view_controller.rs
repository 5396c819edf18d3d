use crate::data_types::{ZoomPriority, ZoomRange};
use crate::utils::{fit_to_range, round_to};

/// Absorbs float error in `len * fraction`, e.g. `10.0 * 0.6`.
const INDEX_EPSILON: f64 = 1e-9;

/// ViewController holds the zoom-window arithmetic of a component
/// independently of any component state, to facilitate testing.
pub struct ViewController;

impl ViewController {
    /// First visible index for a start fraction: `floor(len * fraction)`.
    pub fn start_index_from_fraction(fraction: f64, len: usize) -> usize {
        if len == 0 || fraction.is_nan() {
            return 0;
        }
        let raw = (len as f64 * fraction + INDEX_EPSILON).floor();
        fit_to_range(raw, 0.0, len as f64) as usize
    }

    /// One past the last visible index for an end fraction: `ceil(len * fraction)`.
    pub fn end_index_from_fraction(fraction: f64, len: usize) -> usize {
        if len == 0 || fraction.is_nan() {
            return 0;
        }
        let raw = (len as f64 * fraction - INDEX_EPSILON).ceil();
        fit_to_range(raw, 0.0, len as f64) as usize
    }

    /// Fraction of `index` over `len`, rounded to 5 decimals. 0 when empty.
    pub fn fraction_from_index(index: f64, len: usize) -> f64 {
        if len == 0 {
            return 0.0;
        }
        round_to(index / len as f64, 5)
    }

    /// `1 / span`, clamped into `[1, max_zoom_factor]`.
    pub fn zoom_factor(start: f64, end: f64, max_zoom_factor: f64) -> f64 {
        let span = end - start;
        if span <= 0.0 || span.is_nan() {
            return max_zoom_factor.max(1.0);
        }
        (1.0 / span).clamp(1.0, max_zoom_factor.max(1.0))
    }

    /// Normalizes a requested zoom window.
    ///
    /// An inverted window collapses onto the handle named by the priority.
    /// Both ends are clamped into `[0, 1]`, then the window is widened to
    /// `1 / max_zoom_factor`, moving `end` for `Start` priority and `start`
    /// otherwise. At a boundary the other end moves instead.
    pub fn clamp_zoom(range: ZoomRange, max_zoom_factor: f64) -> ZoomRange {
        let ZoomRange {
            mut start,
            mut end,
            priority,
        } = range;

        if end < start {
            match priority {
                ZoomPriority::Start => end = start,
                ZoomPriority::End => start = end,
            }
        }

        start = fit_to_range(start, 0.0, 1.0);
        end = fit_to_range(end, 0.0, 1.0);

        let min_span = if max_zoom_factor.is_finite() && max_zoom_factor > 0.0 {
            (1.0 / max_zoom_factor).min(1.0)
        } else {
            0.0
        };

        if end - start < min_span {
            match priority {
                ZoomPriority::Start => {
                    end = start + min_span;
                    if end > 1.0 {
                        end = 1.0;
                        start = 1.0 - min_span;
                    }
                }
                ZoomPriority::End => {
                    start = end - min_span;
                    if start < 0.0 {
                        start = 0.0;
                        end = min_span;
                    }
                }
            }
        }

        ZoomRange {
            start,
            end,
            priority,
        }
    }
}
