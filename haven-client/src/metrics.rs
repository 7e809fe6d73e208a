use prometheus::{opts, IntCounterVec, Registry};

use crate::circuit_breaker::CircuitState;

/// Counters for outbound traffic. Cloning shares the underlying series.
#[derive(Clone)]
pub struct ClientMetrics {
    /// Labels: `dependency`, `outcome` (ok, rejected, upstream_error, transport_error)
    attempts: IntCounterVec,
    /// Labels: `dependency`, `from`, `to`
    transitions: IntCounterVec,
}

impl ClientMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let attempts = IntCounterVec::new(
            opts!(
                "haven_outbound_attempts_total",
                "Outbound HTTP attempts by dependency and outcome"
            ),
            &["dependency", "outcome"],
        )?;
        let transitions = IntCounterVec::new(
            opts!(
                "haven_circuit_transitions_total",
                "Circuit breaker state transitions"
            ),
            &["dependency", "from", "to"],
        )?;
        Ok(Self {
            attempts,
            transitions,
        })
    }

    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.attempts.clone()))?;
        registry.register(Box::new(self.transitions.clone()))?;
        Ok(())
    }

    pub fn record_attempt(&self, dependency: &str, outcome: &str) {
        self.attempts.with_label_values(&[dependency, outcome]).inc();
    }

    pub fn record_transition(&self, dependency: &str, from: CircuitState, to: CircuitState) {
        self.transitions
            .with_label_values(&[dependency, from.as_str(), to.as_str()])
            .inc();
    }

    pub fn attempts(&self, dependency: &str, outcome: &str) -> u64 {
        self.attempts.with_label_values(&[dependency, outcome]).get()
    }

    pub fn transitions(&self, dependency: &str, from: CircuitState, to: CircuitState) -> u64 {
        self.transitions
            .with_label_values(&[dependency, from.as_str(), to.as_str()])
            .get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_registry() {
        let registry = Registry::new();
        let metrics = ClientMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        metrics.record_attempt("auth", "ok");
        metrics.record_transition("auth", CircuitState::Closed, CircuitState::Open);

        assert_eq!(metrics.attempts("auth", "ok"), 1);
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"haven_outbound_attempts_total".to_string()));
        assert!(names.contains(&"haven_circuit_transitions_total".to_string()));
    }
}
