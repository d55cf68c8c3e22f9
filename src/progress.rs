//! Advisory progress reporting. Nothing may depend on these updates for
//! correctness.

use serde::Serialize;
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// A session is about to start the next input of a batch.
    LoadingInput,
    Analyzing,
    ProcessingEntries,
    BuildingInterface,
    Done,
    PreparingExport,
    GeneratingArchive,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::LoadingInput => "Loading input",
            Stage::Analyzing => "Analyzing structure",
            Stage::ProcessingEntries => "Processing entries",
            Stage::BuildingInterface => "Building interface",
            Stage::Done => "Done",
            Stage::PreparingExport => "Preparing files for download",
            Stage::GeneratingArchive => "Generating ZIP archive",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    pub stage: Stage,
    /// Between 0 and 100.
    pub percent: f64,
    pub detail: String,
}

pub trait ProgressSink {
    fn report(&self, update: &ProgressUpdate);
}

impl<F: Fn(&ProgressUpdate)> ProgressSink for F {
    fn report(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: &ProgressUpdate) {}
}

/// Forwards updates to a sink while keeping the percentage from going backwards.
pub(crate) struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    last: Cell<f64>,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: Cell::new(0.0),
        }
    }

    pub(crate) fn report(&self, stage: Stage, percent: f64, detail: impl Into<String>) {
        let percent = percent.clamp(0.0, 100.0).max(self.last.get());
        self.last.set(percent);
        self.sink.report(&ProgressUpdate {
            stage,
            percent,
            detail: detail.into(),
        });
    }
}
