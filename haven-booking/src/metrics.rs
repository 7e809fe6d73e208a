use prometheus::{opts, IntCounterVec, Registry};

#[derive(Clone)]
pub struct WorkflowMetrics {
    outcomes: IntCounterVec,
}

impl WorkflowMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let outcomes = IntCounterVec::new(
            opts!(
                "haven_workflow_outcomes_total",
                "Reservation workflow results by workflow and outcome"
            ),
            &["workflow", "outcome"],
        )?;
        Ok(Self { outcomes })
    }

    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.outcomes.clone()))
    }

    pub fn record(&self, workflow: &str, outcome: &str) {
        self.outcomes.with_label_values(&[workflow, outcome]).inc();
    }

    pub fn count(&self, workflow: &str, outcome: &str) -> u64 {
        self.outcomes.with_label_values(&[workflow, outcome]).get()
    }
}
