/// Progress bar over the projections computed by `conebeam project`
pub (super) struct ProjectionBar(ProgressBar);

impl ProjectionBar {

    pub (super) fn new(n_projections: usize) -> Self {
        let bar = ProgressBar::new(n_projections as u64).with_message("projections");
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {wide_bar} {pos}/{len} {msg} ({eta_precise})")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.tick();
        Self(bar)
    }

    pub (super) fn projection_done(&self) { self.0.inc(1) }

    pub (super) fn finish(&self, n_pixels: usize) {
        self.0.finish_with_message(format!("projections: {} pixels", group_digits(n_pixels)));
    }
}

// ----- Imports -----------------------------------------------------------------------------------------
use indicatif::{ProgressBar, ProgressStyle};
use conebeam::utils::group_digits;
