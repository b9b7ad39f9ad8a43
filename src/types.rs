use serde::{Deserialize, Serialize};

// ── Identifiers ────────────────────────────────────────────────────────

pub type EntrantId = u32;
pub type MatchId = u64;
pub type BracketId = uuid::Uuid;

// ── Entrants ───────────────────────────────────────────────────────────

/// A team or player entered into a bracket.
///
/// `seed` is a 1-based rank. Entrants without a seed are placed after all
/// seeded entrants, keeping their input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entrant {
    pub id: EntrantId,
    pub display_name: String,
    #[serde(default)]
    pub seed: Option<u32>,
}

impl Entrant {
    pub fn new(id: EntrantId, display_name: impl Into<String>) -> Self {
        Entrant {
            id,
            display_name: display_name.into(),
            seed: None,
        }
    }

    pub fn seeded(id: EntrantId, display_name: impl Into<String>, seed: u32) -> Self {
        Entrant {
            id,
            display_name: display_name.into(),
            seed: Some(seed),
        }
    }

    /// Seed if it is a usable positive rank.
    pub fn effective_seed(&self) -> Option<u32> {
        self.seed.filter(|seed| *seed > 0)
    }
}

// ── Bracket shape ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BracketType {
    SingleElimination,
    DoubleElimination,
}

/// Which tree a match belongs to. Grand final and its reset live on their
/// own side so `(side, round)` always identifies one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BracketSide {
    Winners,
    Losers,
    GrandFinal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BracketStatus {
    Building,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStatus {
    /// Waiting on a result or on an upstream match.
    Pending,
    /// Has a winner, either scored or by bye.
    Completed,
    /// Can never be played: both feeds were empty, or a grand final reset
    /// that was not needed.
    Skipped,
}

/// How byes are placed when the entrant count is not a power of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SeedingStrategy {
    /// Seed `s` meets seed `P + 1 - s`; byes fall to the top seeds and are
    /// spread across the draw.
    #[default]
    Standard,
    /// Top seeds are paired with byes in seed order, everyone else is paired
    /// with their neighbour in seed order.
    Sequential,
}

impl SeedingStrategy {
    pub fn parse(raw: &str) -> Option<SeedingStrategy> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(SeedingStrategy::Standard),
            "sequential" => Some(SeedingStrategy::Sequential),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BracketOptions {
    pub seeding: SeedingStrategy,
    /// Build a second grand final, played only if the losers-bracket
    /// champion wins the first one. Ignored for single elimination.
    pub grand_final_reset: bool,
}

impl Default for BracketOptions {
    fn default() -> Self {
        BracketOptions {
            seeding: SeedingStrategy::Standard,
            grand_final_reset: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_seed_ignores_zero() {
        assert_eq!(Entrant::seeded(1, "A", 0).effective_seed(), None);
        assert_eq!(Entrant::seeded(1, "A", 3).effective_seed(), Some(3));
        assert_eq!(Entrant::new(1, "A").effective_seed(), None);
    }

    #[test]
    fn test_seeding_strategy_parse() {
        assert_eq!(SeedingStrategy::parse(" Standard "), Some(SeedingStrategy::Standard));
        assert_eq!(SeedingStrategy::parse("SEQUENTIAL"), Some(SeedingStrategy::Sequential));
        assert_eq!(SeedingStrategy::parse("random"), None);
    }

    #[test]
    fn test_entrant_json_uses_camel_case() {
        let entrant: Entrant =
            serde_json::from_str(r#"{"id":7,"displayName":"Hawks"}"#).unwrap();
        assert_eq!(entrant, Entrant::new(7, "Hawks"));
    }
}
