use crate::analysis::FieldStatistics;

/// Inputs that force a statistics recompute when they change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsKey {
    pub field: String,
    pub base_revision: u64,
    /// Bumped on every overlay mutation, including repaints of an edited cell.
    pub overlay_revision: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatsTicket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum StatsStatus {
    Idle,
    Calculating,
    Ready(FieldStatistics),
}

/// Tracks recomputes of field statistics that finish after the paint strokes
/// that caused them.
///
/// Only the most recently started computation may complete; an older ticket
/// finishing late is discarded. While one is in flight the last ready result is
/// still available through [`last_ready`](Self::last_ready).
#[derive(Debug)]
pub struct StatsTracker {
    next_ticket: u64,
    pending: Option<(StatsTicket, StatsKey)>,
    computed: Option<StatsKey>,
    status: StatsStatus,
    last_ready: Option<FieldStatistics>,
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self {
            next_ticket: 0,
            pending: None,
            computed: None,
            status: StatsStatus::Idle,
            last_ready: None,
        }
    }
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn needs_recompute(&self, key: &StatsKey) -> bool {
        if let Some((_, pending)) = &self.pending {
            return pending != key;
        }
        self.computed.as_ref() != Some(key)
    }

    pub fn begin(&mut self, key: StatsKey) -> StatsTicket {
        let ticket = StatsTicket(self.next_ticket);
        self.next_ticket += 1;
        self.pending = Some((ticket, key));
        self.status = StatsStatus::Calculating;
        ticket
    }

    /// Returns `false` if `ticket` was superseded.
    pub fn finish(&mut self, ticket: StatsTicket, stats: FieldStatistics) -> bool {
        match self.pending.take() {
            Some((pending, key)) if pending == ticket => {
                self.computed = Some(key);
                self.last_ready = Some(stats.clone());
                self.status = StatsStatus::Ready(stats);
                true
            }
            other => {
                self.pending = other;
                false
            }
        }
    }

    pub fn status(&self) -> &StatsStatus {
        &self.status
    }

    pub fn is_calculating(&self) -> bool {
        matches!(self.status, StatsStatus::Calculating)
    }

    pub fn last_ready(&self) -> Option<&FieldStatistics> {
        self.last_ready.as_ref()
    }
}
