//! Pure decision tree over already-evaluated facts.

use crate::model::{Event, Status};

/// Escalation that was granted for this occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Escalated {
    /// Priority the event is raised to.
    pub level: i32,
    /// False when the escalation notice itself converged.
    pub notify: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Facts {
    pub masked: bool,
    pub escalation: Option<Escalated>,
    pub converged: bool,
    pub needs_callback: bool,
    pub is_high: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    RaisePriority(i32),
    Record(Status),
    PushCallback,
    Notify { escalated: bool },
    Batch,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    /// Final classification of this occurrence.
    pub outcome: Status,
    /// Side effects, executed in order.
    pub steps: Vec<Step>,
}

impl Decision {
    fn new(outcome: Status, steps: Vec<Step>) -> Self {
        Self { outcome, steps }
    }
}

pub fn decide(event: &Event, facts: &Facts) -> Decision {
    use Step::*;

    if facts.masked {
        return Decision::new(Status::Mask, vec![Record(Status::Mask)]);
    }

    let callback = event.is_alert() && facts.needs_callback;

    if let Some(esc) = facts.escalation {
        let mut steps = vec![RaisePriority(esc.level), Record(Status::Upgrade)];
        if !esc.notify {
            steps.push(Record(Status::Converge));
            return Decision::new(Status::Converge, steps);
        }
        if callback {
            steps.extend([PushCallback, Record(Status::Callback)]);
        }
        steps.extend([Notify { escalated: true }, Record(Status::Send)]);
        return Decision::new(Status::Send, steps);
    }

    if facts.converged {
        return Decision::new(Status::Converge, vec![Record(Status::Converge)]);
    }

    let mut steps = Vec::new();
    if callback {
        steps.extend([PushCallback, Record(Status::Callback)]);
    }

    if !event.has_recipients() {
        steps.push(Record(Status::NoneUser));
        return Decision::new(Status::NoneUser, steps);
    }

    if !facts.is_high {
        steps.push(Batch);
        return Decision::new(Status::Queued, steps);
    }

    steps.extend([Notify { escalated: false }, Record(Status::Send)]);
    Decision::new(Status::Send, steps)
}
