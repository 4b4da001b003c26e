use serde::{Deserialize, Serialize};

use crate::case::{CaseType, RiskLevel};

/// A routable team, its declared handling capability, and its current load.
///
/// `current_load` is only ever mutated through `TeamLedger::acquire`/
/// `release` in `agentkern-treasury`, under a per-team mutex; the invariant
/// `0 <= current_load <= capacity` is enforced there, not here. This struct
/// is the value type moved across that boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub accepted_types: Vec<CaseType>,
    pub max_risk_level: RiskLevel,
    pub capacity: u32,
    pub current_load: u32,
    pub sla_target_hours: u32,
}

impl Team {
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            1.0
        } else {
            self.current_load as f64 / self.capacity as f64
        }
    }

    pub fn has_free_capacity(&self) -> bool {
        self.current_load < self.capacity
    }

    pub fn accepts(&self, case_type: CaseType, risk_level: RiskLevel) -> bool {
        self.accepted_types.contains(&case_type) && self.max_risk_level >= risk_level
    }
}
