use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;

use agentkern_types::Team;

#[derive(Debug, Error)]
pub enum TreasuryError {
    #[error("team '{0}' is unknown to the ledger")]
    UnknownTeam(String),
    #[error("team '{0}' is at capacity ({1}/{1})")]
    AtCapacity(String, u32),
}

/// Process-wide team capacity table. `current_load` is mutated only
/// through `acquire`/`release`, each guarded by the team's own mutex
/// (spec.md §3, "Team" invariant; §5, "Team capacity table").
pub struct TeamLedger {
    teams: HashMap<String, Mutex<Team>>,
}

impl TeamLedger {
    pub fn new(teams: Vec<Team>) -> Self {
        Self {
            teams: teams.into_iter().map(|t| (t.name.clone(), Mutex::new(t))).collect(),
        }
    }

    /// Returns an immutable snapshot of every team's current state.
    pub fn snapshot(&self) -> Vec<Team> {
        self.teams.values().map(|m| m.lock().clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Team> {
        self.teams.get(name).map(|m| m.lock().clone())
    }

    /// Claims one unit of capacity on `name`. Refuses when
    /// `current_load >= capacity`; on success `current_load` is
    /// incremented by exactly one, atomically with the capacity check.
    pub fn acquire(&self, name: &str) -> Result<(), TreasuryError> {
        let team_lock = self
            .teams
            .get(name)
            .ok_or_else(|| TreasuryError::UnknownTeam(name.to_string()))?;
        let mut team = team_lock.lock();
        if team.current_load >= team.capacity {
            return Err(TreasuryError::AtCapacity(name.to_string(), team.capacity));
        }
        team.current_load += 1;
        Ok(())
    }

    /// Releases one unit of capacity on `name`, clamped at zero — mirrors
    /// `RouterAgent.update_team_load`'s clamp-at-zero edge case in the
    /// original source, which the distilled spec's acquire/release
    /// invariant implies but doesn't spell out.
    pub fn release(&self, name: &str) -> Result<(), TreasuryError> {
        let team_lock = self
            .teams
            .get(name)
            .ok_or_else(|| TreasuryError::UnknownTeam(name.to_string()))?;
        let mut team = team_lock.lock();
        team.current_load = team.current_load.saturating_sub(1);
        Ok(())
    }

    /// Directly sets a team's load, used by tests to set up pre-state (e.g.
    /// spec.md §8 scenario 4, "Tier-1.current_load = 0.95·capacity").
    pub fn set_load(&self, name: &str, load: u32) -> Result<(), TreasuryError> {
        let team_lock = self
            .teams
            .get(name)
            .ok_or_else(|| TreasuryError::UnknownTeam(name.to_string()))?;
        team_lock.lock().current_load = load;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentkern_types::{CaseType, RiskLevel};

    fn team(name: &str, capacity: u32) -> Team {
        Team {
            name: name.to_string(),
            accepted_types: vec![CaseType::InsuranceClaim],
            max_risk_level: RiskLevel::High,
            capacity,
            current_load: 0,
            sla_target_hours: 24,
        }
    }

    #[test]
    fn acquire_then_release_restores_prior_load() {
        let ledger = TeamLedger::new(vec![team("Tier-1", 10)]);
        ledger.acquire("Tier-1").unwrap();
        assert_eq!(ledger.get("Tier-1").unwrap().current_load, 1);
        ledger.release("Tier-1").unwrap();
        assert_eq!(ledger.get("Tier-1").unwrap().current_load, 0);
    }

    #[test]
    fn acquire_refuses_at_capacity() {
        let ledger = TeamLedger::new(vec![team("Tier-1", 1)]);
        ledger.acquire("Tier-1").unwrap();
        assert!(matches!(
            ledger.acquire("Tier-1"),
            Err(TreasuryError::AtCapacity(_, _))
        ));
    }

    #[test]
    fn release_clamps_at_zero() {
        let ledger = TeamLedger::new(vec![team("Tier-1", 10)]);
        ledger.release("Tier-1").unwrap();
        assert_eq!(ledger.get("Tier-1").unwrap().current_load, 0);
    }

    #[test]
    fn unknown_team_errors() {
        let ledger = TeamLedger::new(vec![]);
        assert!(matches!(
            ledger.acquire("ghost"),
            Err(TreasuryError::UnknownTeam(_))
        ));
    }
}
