//! Tunable settings for a managed image.
//!
//! Serde-derived so the presentation layer can persist them between
//! sessions alongside its own view state.

use serde::{Deserialize, Serialize};

/// Default undo depth.
pub const DEFAULT_HISTORY_CAPACITY: usize = 128;

/// Default per-cycle texture upload time budget, in milliseconds.
pub const DEFAULT_UPLOAD_BUDGET_MS: u64 = 100;

/// Default upload chunk size, in pixels.
pub const DEFAULT_UPLOAD_CHUNK_PIXELS: usize = 128 * 128;

/// Settings governing history depth and texture upload pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    /// Maximum number of retained history entries; the oldest entry is
    /// evicted once the depth is exceeded.
    pub history_capacity: usize,
    /// Wall-clock budget for incremental texture uploads per dirty
    /// cycle, in milliseconds.
    pub upload_budget_ms: u64,
    /// Pixels uploaded per chunk (converted to whole scanlines).
    pub upload_chunk_pixels: usize,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            upload_budget_ms: DEFAULT_UPLOAD_BUDGET_MS,
            upload_chunk_pixels: DEFAULT_UPLOAD_CHUNK_PIXELS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ImageOptions::default();
        assert_eq!(opts.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(opts.upload_budget_ms, 100);
        assert_eq!(opts.upload_chunk_pixels, 128 * 128);
    }
}
