//! Terminal UI: spinners for slow CLI stages, and a `stderr` writer that
//! keeps log output from trampling them.
//!
//! The writer approach is adapted from `substudy` by Eric Kidd, which is
//! licensed under Apache-2.0 OR MIT.

use std::{borrow::Cow, io, sync::Arc, time::Duration};

use indicatif::{
    MultiProgress, ProgressBar, ProgressDrawTarget, ProgressFinish, ProgressStyle,
};

/// How often spinners redraw.
const SPINNER_TICK: Duration = Duration::from_millis(120);

/// Application UI state. Cheap to clone.
#[derive(Clone)]
pub struct Ui {
    spinners: Arc<MultiProgress>,
}

impl Ui {
    /// Create a UI drawing to `stderr`.
    pub fn init() -> Ui {
        Ui {
            spinners: Arc::new(MultiProgress::new()),
        }
    }

    /// Create a UI which never draws anything.
    #[cfg(test)]
    pub fn init_for_tests() -> Ui {
        Ui {
            spinners: Arc::new(MultiProgress::with_draw_target(
                ProgressDrawTarget::hidden(),
            )),
        }
    }

    /// Stop drawing spinners, because `stdout` carries our real output and may
    /// share a terminal with `stderr`.
    pub fn hide_progress_bars(&self) {
        self.spinners.set_draw_target(ProgressDrawTarget::hidden());
    }

    /// Get a writer for `stderr`, for use with `tracing`.
    pub fn get_stderr_writer(&self) -> SafeStderrWriter {
        SafeStderrWriter { ui: self.clone() }
    }

    /// Start a spinner. It shows `done_msg` once finished or dropped.
    pub fn new_spinner(&self, config: &ProgressConfig<'_>) -> ProgressBar {
        let spinner = self
            .spinners
            .add(ProgressBar::new_spinner().with_style(spinner_style()));
        spinner.set_prefix(config.emoji.to_owned());
        spinner.set_message(config.msg.to_owned());
        spinner.enable_steady_tick(SPINNER_TICK);
        spinner.with_finish(ProgressFinish::WithMessage(Cow::Owned(
            config.done_msg.to_owned(),
        )))
    }

    /// Run `f` with our spinners temporarily cleared from the terminal.
    fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.spinners.suspend(f)
    }
}

/// What a spinner says.
pub struct ProgressConfig<'a> {
    /// Shown before the message.
    pub emoji: &'a str,
    /// Shown while running.
    pub msg: &'a str,
    /// Shown when done.
    pub done_msg: &'a str,
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {prefix:3}{msg} {elapsed:.dim}")
        .expect("spinner template is valid")
}

/// Writes to `stderr`, clearing spinners out of the way first.
#[derive(Clone)]
pub struct SafeStderrWriter {
    ui: Ui,
}

impl io::Write for SafeStderrWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ui.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ui.suspend(|| io::stderr().flush())
    }

    fn write_vectored(&mut self, bufs: &[io::IoSlice<'_>]) -> io::Result<usize> {
        self.ui.suspend(|| io::stderr().write_vectored(bufs))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.ui.suspend(|| io::stderr().write_all(buf))
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for SafeStderrWriter {
    type Writer = SafeStderrWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn spinner_finishes_with_done_message() {
        let ui = Ui::init_for_tests();
        let spinner = ui.new_spinner(&ProgressConfig {
            emoji: "🔍",
            msg: "Working",
            done_msg: "Worked",
        });
        assert_eq!(spinner.message(), "Working");
        assert_eq!(spinner.prefix(), "🔍");
        spinner.finish_using_style();
        assert!(spinner.is_finished());
        assert_eq!(spinner.message(), "Worked");
    }

    #[test]
    fn stderr_writer_accepts_output() {
        let ui = Ui::init_for_tests();
        let mut writer = ui.get_stderr_writer();
        writer.write_all(b"").unwrap();
        writer.flush().unwrap();
    }
}
