//! Sequencing of asynchronous backend requests.
//!
//! Ordering contract (last request wins):
//! - A response is admitted if it belongs to the most recent request, or to an
//!   older request for the same question (both answers describe the same
//!   thing).
//! - A response for an older, different question is superseded.
//! - Any response issued before the last `clear` is discarded.

use std::collections::BTreeSet;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

/// Handle binding an outstanding request to the question that spawned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub id: RequestId,
    epoch: u64,
    pub question: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Admission {
    Current,
    Superseded { latest: RequestId },
    Cleared,
}

impl Admission {
    pub fn is_current(self) -> bool {
        matches!(self, Admission::Current)
    }
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
    next_id: u64,
    epoch: u64,
    latest: Option<(RequestId, String)>,
    pending: BTreeSet<RequestId>,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, question: impl Into<String>) -> RequestTicket {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        let question = question.into();
        self.latest = Some((id, question.clone()));
        self.pending.insert(id);
        RequestTicket {
            id,
            epoch: self.epoch,
            question,
        }
    }

    pub fn admit(&self, ticket: &RequestTicket) -> Admission {
        if ticket.epoch != self.epoch {
            return Admission::Cleared;
        }
        match &self.latest {
            None => Admission::Cleared,
            Some((id, _)) if *id == ticket.id => Admission::Current,
            Some((_, question)) if *question == ticket.question => Admission::Current,
            Some((id, _)) => Admission::Superseded { latest: *id },
        }
    }

    /// Marks `ticket` as no longer in flight. Admission is unaffected.
    pub fn complete(&mut self, ticket: &RequestTicket) {
        self.pending.remove(&ticket.id);
    }

    /// Invalidates every outstanding ticket.
    pub fn clear(&mut self) {
        self.epoch += 1;
        self.latest = None;
        self.pending.clear();
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, ticket: &RequestTicket) -> bool {
        ticket.epoch == self.epoch && self.pending.contains(&ticket.id)
    }
}
