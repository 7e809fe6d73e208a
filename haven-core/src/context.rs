use std::time::Duration;
use tokio::time::Instant;

use crate::trace::TraceContext;

/// Per-request execution context handed explicitly to every collaborator
/// call: the trace being continued and the absolute deadline for the whole
/// workflow.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace: TraceContext,
    pub deadline: Instant,
}

impl RequestContext {
    pub fn new(trace: TraceContext, budget: Duration) -> Self {
        Self {
            trace,
            deadline: Instant::now() + budget,
        }
    }

    /// Fresh root trace, used by background jobs and tests.
    pub fn detached(budget: Duration) -> Self {
        Self::new(TraceContext::new_root(), budget)
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Same deadline, new span under the same trace.
    pub fn child(&self) -> Self {
        Self {
            trace: self.trace.child(),
            deadline: self.deadline,
        }
    }
}
