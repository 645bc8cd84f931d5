//! Stage-completion events and the observer trait that receives them.
//!
//! The pipeline never prints directly. Hosts pick an observer: [`LogProgress`]
//! forwards to `tracing`, [`NoProgress`] drops everything and
//! [`RecordingProgress`] keeps the sequence for assertions.

use std::path::PathBuf;
use std::sync::Mutex;

/// Something observable happened in the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Source file parsed.
    Loaded {
        path: PathBuf,
        rows: usize,
        columns: usize,
        encoding: &'static str,
    },
    /// A candidate encoding failed and a later one is being tried.
    EncodingFallback {
        failed: &'static str,
        using: &'static str,
    },
    /// Column names normalized and date columns coerced.
    Cleaned {
        rows: usize,
        date_columns: Vec<String>,
    },
    /// Calendar columns derived from `order_date`.
    FeaturesDerived { rows: usize },
    /// Monthly aggregate computed.
    Aggregated { months: usize },
    /// An output artifact was written.
    Saved { path: PathBuf },
}

/// Observer for pipeline progress.
pub trait PipelineProgress: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Discards every event.
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Writes events as `tracing` records.
pub struct LogProgress;

impl PipelineProgress for LogProgress {
    fn on_event(&self, event: &PipelineEvent) {
        match event {
            PipelineEvent::Loaded {
                path,
                rows,
                columns,
                encoding,
            } => tracing::info!(
                path = %path.display(),
                rows,
                columns,
                encoding,
                "data loaded"
            ),
            PipelineEvent::EncodingFallback { failed, using } => {
                tracing::warn!(failed, using, "decoding failed, retrying with fallback encoding")
            }
            PipelineEvent::Cleaned { rows, date_columns } => tracing::info!(
                rows,
                date_columns = %date_columns.join(","),
                "data cleaned and date columns converted"
            ),
            PipelineEvent::FeaturesDerived { rows } => {
                tracing::info!(rows, "time-based features created")
            }
            PipelineEvent::Aggregated { months } => {
                tracing::info!(months, "monthly aggregate computed")
            }
            PipelineEvent::Saved { path } => tracing::info!(path = %path.display(), "saved"),
        }
    }
}

/// Keeps every event in arrival order.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&PipelineEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl PipelineProgress for RecordingProgress {
    fn on_event(&self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_progress_keeps_order() {
        let progress = RecordingProgress::new();
        progress.on_event(&PipelineEvent::FeaturesDerived { rows: 3 });
        progress.on_event(&PipelineEvent::Aggregated { months: 2 });

        assert_eq!(
            progress.events(),
            vec![
                PipelineEvent::FeaturesDerived { rows: 3 },
                PipelineEvent::Aggregated { months: 2 },
            ]
        );
        assert_eq!(
            progress.count(|e| matches!(e, PipelineEvent::Aggregated { .. })),
            1
        );
    }

    #[test]
    fn log_and_noop_progress_do_not_panic() {
        let event = PipelineEvent::EncodingFallback {
            failed: "UTF-8",
            using: "windows-1252",
        };
        LogProgress.on_event(&event);
        NoProgress.on_event(&event);
    }
}
