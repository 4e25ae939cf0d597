//! Per-frame statistics.

use std::{fmt, time::Duration};

/// What happened during one frame.
///
/// Passes, draw states and draws are counted as skipped when they refer to
/// resources that are not valid, which is normal while resources are still
/// loading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GfxFrameInfo {
    pub frame_index: u64,
    pub n_passes: u32,
    pub n_skipped_passes: u32,
    pub n_applied_draw_states: u32,
    pub n_skipped_draw_states: u32,
    pub n_draws: u32,
    pub n_skipped_draws: u32,
    pub n_instances: u64,
    pub n_buffer_updates: u32,
    /// Time from the previous commit to the commit ending this frame.
    pub duration: Duration,
}

impl GfxFrameInfo {
    pub(crate) fn for_frame(frame_index: u64) -> Self {
        Self {
            frame_index,
            ..Default::default()
        }
    }
}

impl fmt::Display for GfxFrameInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {}: {} passes ({} skipped), {} draw states ({} skipped), {} draws ({} skipped), {} buffer updates, {:.1} ms",
            self.frame_index,
            self.n_passes,
            self.n_skipped_passes,
            self.n_applied_draw_states,
            self.n_skipped_draw_states,
            self.n_draws,
            self.n_skipped_draws,
            self.n_buffer_updates,
            self.duration.as_secs_f64() * 1e3
        )
    }
}
