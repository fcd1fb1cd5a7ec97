//! Stakeholder actors.
//!
//! An [`Actor`] wraps a persisted [`ActorEntity`](crate::model::ActorEntity)
//! with a role descriptor, bounded memory, an inbox, goals and a set of
//! invariants. Each tick the scheduler calls [`Actor::run_step`]; the step
//! either yields one interaction, yields nothing, or fails hard on an
//! invariant violation.
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`RoleDescriptor`] | Permitted actions and persona per stakeholder kind |
//! | [`MemoryLog`] | Capacity-bounded memory with summarizing eviction |
//! | [`Decision`] | Tolerant parsing of provider output |
//! | [`Invariant`] | Post-action checks |
//! | [`default_roster`] | Initial actors for a venture |

mod decision;
mod invariant;
mod memory;
pub mod prompts;
mod role;
mod runtime;
mod spawner;

pub use decision::{extract_json, Decision, FALLBACK_ACTION};
pub use invariant::{Invariant, InvariantCheck};
pub use memory::{summarize_rule_based, MemoryEntry, MemoryKind, MemoryLog};
pub use role::{RoleDescriptor, COMMON_ACTIONS};
pub use runtime::{Actor, Goal, InboxMessage, Perception, BASE_DIFFICULTY};
pub use spawner::{default_roster, regulator_role};
