//! Resilience layer.
//!
//! Wraps persistence and the actor loop so that partial failures degrade the
//! run instead of crashing it:
//!
//! | Component | Guards against |
//! |-----------|----------------|
//! | [`BatchWriter`] | per-interaction write amplification |
//! | [`ActorPool`] | unbounded per-tick fan-out on large rosters |
//! | [`FailureCeiling`] | runs that keep failing every actor step |
//! | [`ExponentialBackoff`] | transient reasoning-provider failures |
//! | [`CircuitBreaker`] | hammering a provider that is down |

mod batch;
mod breaker;
mod ceiling;
mod pool;
mod retry;

pub use batch::BatchWriter;
pub use breaker::CircuitBreaker;
pub use ceiling::FailureCeiling;
pub use pool::ActorPool;
pub use retry::{ExponentialBackoff, RetryPolicy};
