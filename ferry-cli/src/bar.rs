//! Terminal progress bar fed by transfer progress callbacks.

use std::time::Duration;

use ferry::{FileHeader, Progress};
use indicatif::{ProgressBar, ProgressStyle};

pub struct Bar {
    verb: &'static str,
    pb: Option<ProgressBar>,
}

impl Bar {
    pub const fn new(verb: &'static str) -> Self {
        Self { verb, pb: None }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
    }
}

impl Progress for Bar {
    fn on_start(&mut self, header: &FileHeader) {
        let pb = ProgressBar::new(header.size);
        pb.set_style(Self::bar_style());
        pb.set_message(format!("{} {}", self.verb, header.name));
        pb.enable_steady_tick(Duration::from_millis(100));
        self.pb = Some(pb);
    }

    fn on_progress(&mut self, transferred: u64, total: u64) {
        let Some(pb) = &self.pb else { return };
        pb.set_position(transferred);
        // Empty files have nothing to stream; mark them done right away.
        if transferred >= total {
            pb.finish();
        }
    }
}

impl Drop for Bar {
    fn drop(&mut self) {
        if let Some(pb) = self.pb.take()
            && !pb.is_finished()
        {
            pb.abandon();
        }
    }
}
