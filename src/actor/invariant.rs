//! Named invariant predicates evaluated after every act.
//!
//! A failing invariant is a hard per-actor failure: it signals a logic error
//! and counts toward the scheduler's consecutive-failure ceiling.

use std::sync::Arc;

use super::role::RoleDescriptor;
use crate::error::{Result, SimError};
use crate::model::InteractionLog;
use crate::world::WorldSnapshot;

/// Predicate over a produced interaction; `Err` carries the violation detail.
pub type InvariantCheck =
    Arc<dyn Fn(&InteractionLog, &WorldSnapshot) -> std::result::Result<(), String> + Send + Sync>;

/// A named invariant
#[derive(Clone)]
pub struct Invariant {
    name: String,
    check: InvariantCheck,
}

impl std::fmt::Debug for Invariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invariant")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Invariant {
    /// Create an invariant from a predicate
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&InteractionLog, &WorldSnapshot) -> std::result::Result<(), String>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Invariant name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The action must be in the role's permitted set.
    pub fn permitted_action(role: &'static RoleDescriptor) -> Self {
        Self::new("permitted_action", move |log, _| {
            if role.permits(&log.action) {
                Ok(())
            } else {
                Err(format!(
                    "action '{}' is not permitted for {}",
                    log.action, role.kind
                ))
            }
        })
    }

    /// The interaction must not predate the tick that produced it.
    pub fn timestamp_not_before_clock() -> Self {
        Self::new("timestamp_not_before_clock", |log, world| {
            if log.timestamp >= world.timestamp {
                Ok(())
            } else {
                Err(format!(
                    "timestamp {} precedes clock {}",
                    log.timestamp, world.timestamp
                ))
            }
        })
    }

    /// Evaluate against a produced interaction
    pub fn evaluate(&self, log: &InteractionLog, world: &WorldSnapshot) -> Result<()> {
        (self.check)(log, world).map_err(|detail| SimError::InvariantViolation {
            actor: log.actor_id.clone(),
            invariant: self.name.clone(),
            detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stage, StakeholderKind};

    fn world() -> WorldSnapshot {
        WorldSnapshot::new("sim", "Acme", "fintech", Stage::Mvp, 100.0)
    }

    #[test]
    fn test_non_investor_cannot_invest() {
        let inv = Invariant::permitted_action(RoleDescriptor::for_kind(StakeholderKind::Customer));
        let log = InteractionLog::new("sim", "c1", "invest", "system", 100.0);
        let err = inv.evaluate(&log, &world()).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvariantViolation { ref invariant, .. } if invariant == "permitted_action"
        ));

        let ok = InteractionLog::new("sim", "c1", "buy", "system", 100.0);
        assert!(inv.evaluate(&ok, &world()).is_ok());
    }

    #[test]
    fn test_timestamp_invariant() {
        let inv = Invariant::timestamp_not_before_clock();
        let stale = InteractionLog::new("sim", "a", "wait", "system", 99.0);
        assert!(inv.evaluate(&stale, &world()).is_err());
        let fresh = InteractionLog::new("sim", "a", "wait", "system", 100.0);
        assert!(inv.evaluate(&fresh, &world()).is_ok());
    }

    #[test]
    fn test_custom_invariant() {
        let inv = Invariant::new("no_self_target", |log, _| {
            if log.target == log.actor_id {
                Err("targets itself".to_string())
            } else {
                Ok(())
            }
        });
        let log = InteractionLog::new("sim", "a", "criticize", "a", 100.0);
        assert!(inv.evaluate(&log, &world()).is_err());
        assert_eq!(inv.name(), "no_self_target");
    }
}
