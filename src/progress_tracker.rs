use std::sync::mpsc::Receiver;

use indicatif::{ProgressBar, ProgressStyle};

use crate::events::ProgressEvent;

/// Renders worker events as a terminal progress bar.
pub struct ProgressTracker {
    progress_bar: ProgressBar,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Uses an existing bar, e.g. a hidden one in tests.
    pub fn with_bar(progress_bar: ProgressBar) -> Self {
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { progress_bar }
    }

    /// Applies one event to the bar.
    pub fn handle(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => {
                self.progress_bar.set_length(*total as u64);
                self.progress_bar.set_position(0);
            }
            ProgressEvent::Progress { .. } => {
                self.progress_bar.set_message(event.status_line());
            }
            ProgressEvent::Saved { index, .. } => {
                self.progress_bar.set_position(*index as u64);
            }
            ProgressEvent::Completed { .. } | ProgressEvent::Cancelled { .. } => {
                self.progress_bar.finish_with_message(event.status_line());
            }
            ProgressEvent::Failed { .. } => {
                self.progress_bar.abandon_with_message(event.status_line());
            }
        }
    }

    /// Drains `events` until the terminal event and returns it.
    pub fn follow(&self, events: &Receiver<ProgressEvent>) -> Option<ProgressEvent> {
        for event in events {
            self.handle(&event);
            if event.is_terminal() {
                return Some(event);
            }
        }
        None
    }

    pub fn position(&self) -> u64 {
        self.progress_bar.position()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}
