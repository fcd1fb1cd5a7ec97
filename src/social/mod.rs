//! Social structure between actors.
//!
//! - [`RelationshipGraph`]: petgraph-backed directed edges with clamped,
//!   decaying strengths
//! - [`CoalitionDetector`]: threshold flood-fill over alliance edges
//! - [`converse`] / [`debate`]: provider-driven ally conversations and
//!   rival debates

mod coalition;
mod dialogue;
mod relationships;

pub use coalition::{Coalition, CoalitionDetector};
pub use dialogue::{
    converse, debate, Argument, DebateOutcome, Participant, SocialMemory, Synthesis, Transcript,
    Turn, DEBATE_ROUNDS, MAX_TURNS,
};
pub use relationships::{
    classify, EdgeRecord, RelationType, Relationship, RelationshipGraph, ALLIANCE_ACTIONS,
    RIVALRY_ACTIONS, STRENGTH_STEP,
};
