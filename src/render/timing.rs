//! Build milestones for diagnostics.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    HtmlReady,
    PageLoaded,
    NetworkIdle,
    PdfWritten,
}

impl Milestone {
    pub fn label(self) -> &'static str {
        match self {
            Self::HtmlReady => "HTML generated",
            Self::PageLoaded => "Document loaded",
            Self::NetworkIdle => "Network idled",
            Self::PdfWritten => "PDF written",
        }
    }
}

/// Milestone timestamps of one build.
#[derive(Debug, Clone)]
pub struct Timings {
    start: Instant,
    marks: Vec<(Milestone, Instant)>,
}

impl Timings {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Record a milestone; returns the time since the previous one.
    pub fn mark(&mut self, milestone: Milestone) -> Duration {
        let now = Instant::now();
        let previous = self.marks.last().map_or(self.start, |(_, at)| *at);
        self.marks.push((milestone, now));
        now - previous
    }

    /// Time from the start of the build to `milestone`.
    pub fn elapsed(&self, milestone: Milestone) -> Option<Duration> {
        self.marks
            .iter()
            .find(|(m, _)| *m == milestone)
            .map(|(_, at)| *at - self.start)
    }

    pub fn total(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn milestones(&self) -> impl Iterator<Item = Milestone> + '_ {
        self.marks.iter().map(|(m, _)| *m)
    }
}

/// Seconds with two decimals, as printed in build logs.
pub fn seconds(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}
