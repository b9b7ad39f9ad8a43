//! Read model handed to renderers, exporters and mailers.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::advancer;
use crate::bracket::{Bracket, Match, SlotSource};
use crate::builder::round_label;
use crate::seeding::rank_order;
use crate::types::{
  BracketId, BracketSide, BracketStatus, BracketType, EntrantId, MatchId, MatchStatus,
};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrantSnapshot {
  pub id: EntrantId,
  pub display_name: String,
  /// Effective rank after ordering, 1-based.
  pub seed: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSnapshot {
  pub entrant_id: Option<EntrantId>,
  pub display_name: Option<String>,
  pub seed: Option<u32>,
  pub score: Option<u32>,
  pub result: Option<String>,
  /// What to show while the slot is empty, e.g. "Winner of 3".
  pub placeholder: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSnapshot {
  pub id: MatchId,
  pub side: BracketSide,
  pub round: u32,
  pub position: u32,
  pub state: MatchStatus,
  pub bye: bool,
  pub winner_id: Option<EntrantId>,
  pub slots: Vec<SlotSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundSnapshot {
  pub side: BracketSide,
  pub round: u32,
  pub label: String,
  pub matches: Vec<MatchSnapshot>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketSnapshot {
  pub id: BracketId,
  #[serde(rename = "type")]
  pub bracket_type: BracketType,
  pub status: BracketStatus,
  pub is_complete: bool,
  pub created_at: DateTime<Utc>,
  pub entrants: Vec<EntrantSnapshot>,
  pub rounds: Vec<RoundSnapshot>,
  pub champion: Option<EntrantSnapshot>,
}

/// Matches grouped by `(side, round)` in display order.
pub(crate) fn group_rounds(bracket: &Bracket) -> BTreeMap<(BracketSide, u32), Vec<&Match>> {
  let mut rounds: BTreeMap<(BracketSide, u32), Vec<&Match>> = BTreeMap::new();
  for m in bracket.matches() {
    rounds.entry((m.side(), m.round())).or_default().push(m);
  }
  for matches in rounds.values_mut() {
    matches.sort_by_key(|m| m.position());
  }
  rounds
}

pub fn snapshot(bracket: &Bracket) -> BracketSnapshot {
  // Rank only: a deserialized bracket is not re-validated here.
  let entrants = rank_order(bracket.entrants())
    .into_iter()
    .enumerate()
    .map(|(idx, e)| EntrantSnapshot {
      id: e.id,
      display_name: e.display_name,
      seed: idx as u32 + 1,
    })
    .collect::<Vec<_>>();
  let by_id: HashMap<EntrantId, &EntrantSnapshot> =
    entrants.iter().map(|e| (e.id, e)).collect();

  let rounds = group_rounds(bracket)
    .into_iter()
    .map(|((side, round), matches)| RoundSnapshot {
      side,
      round,
      label: round_label(side, round, bracket.winners_rounds(), bracket.bracket_type()),
      matches: matches
        .into_iter()
        .map(|m| match_snapshot(m, &by_id))
        .collect(),
    })
    .collect();

  let champion = advancer::champion(bracket)
    .and_then(|id| by_id.get(&id))
    .map(|e| (*e).clone());

  BracketSnapshot {
    id: bracket.id(),
    bracket_type: bracket.bracket_type(),
    status: bracket.status(),
    is_complete: bracket.is_complete(),
    created_at: bracket.created_at(),
    entrants,
    rounds,
    champion,
  }
}

fn match_snapshot(m: &Match, by_id: &HashMap<EntrantId, &EntrantSnapshot>) -> MatchSnapshot {
  let winner_id = m.winner_id();
  let slots = m
    .slots()
    .iter()
    .map(|slot| {
      let entrant = slot.occupant().and_then(|id| by_id.get(&id));
      let result = match (winner_id, slot.occupant()) {
        (Some(winner), Some(id)) if winner == id => Some("win".to_string()),
        (Some(_), Some(_)) => Some("loss".to_string()),
        _ => None,
      };
      let placeholder = match (slot.occupant(), slot.source()) {
        (Some(_), _) => None,
        (None, SlotSource::Bye) => Some("Bye".to_string()),
        (None, SlotSource::Winner(id)) => Some(format!("Winner of {id}")),
        (None, SlotSource::Loser(id)) => Some(format!("Loser of {id}")),
        (None, SlotSource::Seeded(_)) => None,
      };
      SlotSnapshot {
        entrant_id: slot.occupant(),
        display_name: entrant.map(|e| e.display_name.clone()),
        seed: entrant.map(|e| e.seed),
        score: slot.score(),
        result,
        placeholder,
      }
    })
    .collect();

  MatchSnapshot {
    id: m.id(),
    side: m.side(),
    round: m.round(),
    position: m.position(),
    state: m.status(),
    bye: m.is_bye(),
    winner_id,
    slots,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::engine::BracketEngine;
  use crate::types::Entrant;

  #[test]
  fn test_entrants_ranked_by_seed_then_input_order() {
    let entrants = vec![
      Entrant::new(10, "Unseeded"),
      Entrant::seeded(11, "Second", 2),
      Entrant::seeded(12, "First", 1),
    ];
    let engine = BracketEngine::create(entrants, BracketType::SingleElimination).unwrap();
    let ranks: Vec<_> = snapshot(engine.bracket())
      .entrants
      .iter()
      .map(|e| (e.id, e.seed))
      .collect();
    assert_eq!(ranks, vec![(12, 1), (11, 2), (10, 3)]);
  }

  #[test]
  fn test_stored_bracket_with_too_few_entrants_keeps_them() {
    let engine = BracketEngine::create(
      vec![Entrant::new(1, "A"), Entrant::new(2, "B")],
      BracketType::SingleElimination,
    )
    .unwrap();
    let mut value = serde_json::to_value(engine.bracket()).unwrap();
    value["entrants"] = serde_json::json!([{ "id": 1, "displayName": "A" }]);
    let stored: Bracket = serde_json::from_value(value).unwrap();

    let view = snapshot(&stored);
    assert_eq!(view.entrants.len(), 1);
    assert_eq!(view.rounds[0].matches[0].slots[0].display_name.as_deref(), Some("A"));
    assert_eq!(view.rounds[0].matches[0].slots[1].display_name, None);
  }
}
