//! Worker identifiers and team rosters
//!
//! The roster is the universe of valid `next_speaker` answers. It is built
//! fresh for every orchestrator instance.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::research::QUANT_AGENT_ROLE;
use crate::types::{AnalystError, Result};

/// Closed set of workers the graphs can dispatch to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WorkerId {
    InternalDataAgent,
    QuantitativeAnalysisAgent,
    DataVisualizationAgent,
}

impl WorkerId {
    pub const ALL: [WorkerId; 3] = [
        WorkerId::InternalDataAgent,
        WorkerId::QuantitativeAnalysisAgent,
        WorkerId::DataVisualizationAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InternalDataAgent => "internal_data_agent",
            Self::QuantitativeAnalysisAgent => "quantitative_analysis_agent",
            Self::DataVisualizationAgent => "data_visualization_agent",
        }
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkerId {
    type Err = AnalystError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AnalystError::worker(s, "unknown worker"))
    }
}

/// One roster entry: a worker and its one-line capability description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMember {
    pub id: WorkerId,
    pub role: String,
}

impl TeamMember {
    pub fn new(id: WorkerId, role: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    members: Vec<TeamMember>,
}

impl Team {
    /// Build a roster; it must be non-empty and list each worker once
    pub fn new(members: Vec<TeamMember>) -> Result<Self> {
        if members.is_empty() {
            return Err(AnalystError::Config("team roster is empty".to_string()));
        }
        for (i, member) in members.iter().enumerate() {
            if members[..i].iter().any(|m| m.id == member.id) {
                return Err(AnalystError::Config(format!(
                    "worker '{}' is listed twice in the team roster",
                    member.id
                )));
            }
        }
        Ok(Self { members })
    }

    /// Roster of the research graph: the quantitative worker alone
    pub fn research_default() -> Self {
        Self {
            members: vec![TeamMember::new(
                WorkerId::QuantitativeAnalysisAgent,
                QUANT_AGENT_ROLE,
            )],
        }
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    pub fn ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        self.members.iter().map(|m| m.id)
    }

    pub fn member_names(&self) -> Vec<&'static str> {
        self.ids().map(|id| id.as_str()).collect()
    }

    pub fn contains(&self, id: WorkerId) -> bool {
        self.members.iter().any(|m| m.id == id)
    }

    /// Roster as a bullet list, one `name: role` per line
    pub fn members_string(&self) -> String {
        let lines: Vec<String> = self
            .members
            .iter()
            .map(|m| format!("{}: {}", m.id, m.role))
            .collect();
        format!("\n- {}", lines.join("\n- "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_team() {
        let team = Team::research_default();
        assert_eq!(team.member_names(), vec!["quantitative_analysis_agent"]);
        assert_eq!(
            team.members_string(),
            "\n- quantitative_analysis_agent: Can load files, run code, and perform quantitative analysis."
        );
    }

    #[test]
    fn test_team_rejects_duplicates_and_empty() {
        assert!(Team::new(Vec::new()).is_err());
        let dup = vec![
            TeamMember::new(WorkerId::InternalDataAgent, "a"),
            TeamMember::new(WorkerId::InternalDataAgent, "b"),
        ];
        assert!(Team::new(dup).is_err());
    }

    #[test]
    fn test_worker_id_round_trip_names() {
        for id in WorkerId::ALL {
            assert_eq!(id.as_str().parse::<WorkerId>().unwrap(), id);
            assert_eq!(serde_json::to_value(id).unwrap(), id.as_str());
        }
        assert!("finance_agent".parse::<WorkerId>().is_err());
    }
}
