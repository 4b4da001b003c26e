//! Team capacity ledger.
//!
//! Generalizes `agentkern-gate`'s `AgentBudget` shape (token/cost/time gas
//! limits with `consume_*` methods returning a `BudgetError` on exhaustion)
//! to "how many cases can a team carry, what's the limit" — the acquire/
//! release-under-lock discipline is the same, just counting cases instead
//! of tokens.

mod ledger;

pub use ledger::{TeamLedger, TreasuryError};
