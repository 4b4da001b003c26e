//! Case routing: the default team catalogue and the router agent that
//! assigns a classified, scored case to a team with an SLA target.

pub mod catalogue;
mod router;

pub use router::RouterAgent;
