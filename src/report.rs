//! User facing reporting.
//!
//! The fetch engine and the walker never log user facing messages directly.
//! They are handed a [`Reporter`] and describe what happens to a *subject*,
//! which is either a dependency name or a directory.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};

pub trait Reporter {
    fn info(&self, subject: &str, message: &str);
    fn warning(&self, subject: &str, message: &str);
    fn error(&self, subject: &str, message: &str);

    /// Starts a progress indicator for `total` units of work.
    fn progress(&self, label: &str, total: u64) -> Box<dyn Progress>;
}

pub trait Progress {
    fn advance(&self, delta: u64);
    fn finish(&self);
}

/// Forwards messages to the `log` facade and draws progress with `indicatif`.
#[derive(Debug, Clone, Default)]
pub struct LogReporter {
    progress_disabled: bool,
}

impl LogReporter {
    pub fn new(progress_disabled: bool) -> Self {
        LogReporter { progress_disabled }
    }
}

impl Reporter for LogReporter {
    fn info(&self, subject: &str, message: &str) {
        info!("{} - {}", subject.bold(), message);
    }

    fn warning(&self, subject: &str, message: &str) {
        warn!("{} - {}", subject.bold(), message);
    }

    fn error(&self, subject: &str, message: &str) {
        error!("{} - {}", subject.bold(), message);
    }

    fn progress(&self, label: &str, total: u64) -> Box<dyn Progress> {
        if self.progress_disabled || !log::log_enabled!(log::Level::Info) {
            return Box::new(NoProgress);
        }
        let bar = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(label.to_string());
        Box::new(BarProgress(bar))
    }
}

struct BarProgress(ProgressBar);

impl Progress for BarProgress {
    fn advance(&self, delta: u64) {
        self.0.inc(delta);
    }

    fn finish(&self) {
        self.0.finish_and_clear();
    }
}

pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&self, _delta: u64) {}

    fn finish(&self) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    };

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Level {
        Info,
        Warning,
        Error,
    }

    /// Keeps every reported message and progress indicator for later
    /// assertions.
    #[derive(Default)]
    pub struct RecordingReporter {
        messages: Mutex<Vec<(Level, String, String)>>,
        progress: Mutex<Vec<Arc<RecordedProgress>>>,
    }

    #[derive(Debug, Default)]
    pub struct RecordedProgress {
        pub label: String,
        pub total: u64,
        advanced: AtomicU64,
        finished: AtomicBool,
    }

    impl RecordedProgress {
        pub fn advanced(&self) -> u64 {
            self.advanced.load(Ordering::SeqCst)
        }

        pub fn finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    impl Progress for Arc<RecordedProgress> {
        fn advance(&self, delta: u64) {
            self.advanced.fetch_add(delta, Ordering::SeqCst);
        }

        fn finish(&self) {
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    impl RecordingReporter {
        pub fn messages(&self, level: Level) -> Vec<(String, String)> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _, _)| *l == level)
                .map(|(_, subject, message)| (subject.clone(), message.clone()))
                .collect()
        }

        pub fn subjects(&self, level: Level) -> Vec<String> {
            self.messages(level)
                .into_iter()
                .map(|(subject, _)| subject)
                .collect()
        }

        pub fn progress_bars(&self) -> Vec<Arc<RecordedProgress>> {
            self.progress.lock().unwrap().clone()
        }

        fn push(&self, level: Level, subject: &str, message: &str) {
            self.messages
                .lock()
                .unwrap()
                .push((level, subject.to_string(), message.to_string()));
        }
    }

    impl Reporter for RecordingReporter {
        fn info(&self, subject: &str, message: &str) {
            self.push(Level::Info, subject, message);
        }

        fn warning(&self, subject: &str, message: &str) {
            self.push(Level::Warning, subject, message);
        }

        fn error(&self, subject: &str, message: &str) {
            self.push(Level::Error, subject, message);
        }

        fn progress(&self, label: &str, total: u64) -> Box<dyn Progress> {
            let progress = Arc::new(RecordedProgress {
                label: label.to_string(),
                total,
                ..RecordedProgress::default()
            });
            self.progress.lock().unwrap().push(progress.clone());
            Box::new(progress)
        }
    }
}
