//! Bracket data model.
//!
//! Matches live in an arena indexed by id; every slot names the upstream
//! match (or seed) it is filled from, and every match lists the downstream
//! slots it feeds. Fields are crate-private: the only way to change a match
//! is through the advancer, so corrections always cascade.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
  BracketId, BracketOptions, BracketSide, BracketStatus, BracketType, Entrant, EntrantId, MatchId,
  MatchStatus,
};

/// Where a slot's occupant comes from. Fixed when the bracket is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotSource {
  Seeded(EntrantId),
  Bye,
  Winner(MatchId),
  Loser(MatchId),
}

impl SlotSource {
  /// Upstream match this slot waits on, if any.
  pub fn upstream(&self) -> Option<MatchId> {
    match self {
      SlotSource::Winner(id) | SlotSource::Loser(id) => Some(*id),
      SlotSource::Seeded(_) | SlotSource::Bye => None,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedKind {
  Winner,
  Loser,
}

/// A downstream slot that consumes this match's winner or loser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feed {
  pub(crate) match_id: MatchId,
  pub(crate) slot: usize,
  pub(crate) kind: FeedKind,
}

impl Feed {
  pub fn match_id(&self) -> MatchId {
    self.match_id
  }

  /// 0 for slot A, 1 for slot B.
  pub fn slot(&self) -> usize {
    self.slot
  }

  pub fn kind(&self) -> FeedKind {
    self.kind
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
  pub(crate) source: SlotSource,
  pub(crate) occupant: Option<EntrantId>,
  pub(crate) score: Option<u32>,
}

impl Slot {
  pub(crate) fn new(source: SlotSource) -> Self {
    Slot {
      source,
      occupant: None,
      score: None,
    }
  }

  pub fn source(&self) -> SlotSource {
    self.source
  }

  pub fn occupant(&self) -> Option<EntrantId> {
    self.occupant
  }

  /// `None` until a result is submitted. Byes never carry a score.
  pub fn score(&self) -> Option<u32> {
    self.score
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
  pub(crate) id: MatchId,
  pub(crate) side: BracketSide,
  pub(crate) round: u32,
  pub(crate) position: u32,
  pub(crate) slots: [Slot; 2],
  pub(crate) status: MatchStatus,
  pub(crate) winner_slot: Option<usize>,
  pub(crate) bye: bool,
  pub(crate) feeds: Vec<Feed>,
}

impl Match {
  pub fn id(&self) -> MatchId {
    self.id
  }

  pub fn side(&self) -> BracketSide {
    self.side
  }

  pub fn round(&self) -> u32 {
    self.round
  }

  /// 1-based position within its round.
  pub fn position(&self) -> u32 {
    self.position
  }

  pub fn slots(&self) -> &[Slot; 2] {
    &self.slots
  }

  pub fn slot_a(&self) -> &Slot {
    &self.slots[0]
  }

  pub fn slot_b(&self) -> &Slot {
    &self.slots[1]
  }

  pub fn score_a(&self) -> Option<u32> {
    self.slots[0].score
  }

  pub fn score_b(&self) -> Option<u32> {
    self.slots[1].score
  }

  pub fn status(&self) -> MatchStatus {
    self.status
  }

  pub fn is_completed(&self) -> bool {
    self.status == MatchStatus::Completed
  }

  pub fn is_skipped(&self) -> bool {
    self.status == MatchStatus::Skipped
  }

  /// Completed without a game because one side was empty.
  pub fn is_bye(&self) -> bool {
    self.bye
  }

  /// Completed from a submitted score, as opposed to a bye.
  pub fn has_result(&self) -> bool {
    self.is_completed() && !self.bye
  }

  /// Pending with both occupants known: a result can be submitted.
  pub fn is_ready(&self) -> bool {
    self.status == MatchStatus::Pending && self.slots.iter().all(|slot| slot.occupant.is_some())
  }

  pub fn winner_id(&self) -> Option<EntrantId> {
    if self.status != MatchStatus::Completed {
      return None;
    }
    self.slots.get(self.winner_slot?)?.occupant
  }

  pub fn loser_id(&self) -> Option<EntrantId> {
    if self.status != MatchStatus::Completed {
      return None;
    }
    let loser_slot = 1usize.checked_sub(self.winner_slot?)?;
    self.slots[loser_slot].occupant
  }

  /// Downstream slots fed by this match.
  pub fn feeds(&self) -> &[Feed] {
    &self.feeds
  }

  pub fn has_entrant(&self, entrant_id: EntrantId) -> bool {
    self.slots.iter().any(|slot| slot.occupant == Some(entrant_id))
  }
}

/// A full elimination bracket. Serializable so the host can persist it and
/// hand it back through `BracketEngine::restore`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
  pub(crate) id: BracketId,
  pub(crate) bracket_type: BracketType,
  pub(crate) options: BracketOptions,
  pub(crate) entrants: Vec<Entrant>,
  pub(crate) created_at: DateTime<Utc>,
  pub(crate) status: BracketStatus,
  pub(crate) padded_size: usize,
  pub(crate) winners_rounds: u32,
  pub(crate) matches: Vec<Match>,
  pub(crate) final_match: MatchId,
  pub(crate) reset_match: Option<MatchId>,
}

impl Bracket {
  pub fn id(&self) -> BracketId {
    self.id
  }

  pub fn bracket_type(&self) -> BracketType {
    self.bracket_type
  }

  pub fn options(&self) -> BracketOptions {
    self.options
  }

  /// Entrants as they were submitted.
  pub fn entrants(&self) -> &[Entrant] {
    &self.entrants
  }

  pub fn entrant(&self, id: EntrantId) -> Option<&Entrant> {
    self.entrants.iter().find(|entrant| entrant.id == id)
  }

  pub fn created_at(&self) -> DateTime<Utc> {
    self.created_at
  }

  pub fn status(&self) -> BracketStatus {
    self.status
  }

  pub fn is_complete(&self) -> bool {
    self.status == BracketStatus::Completed
  }

  /// First-round slot count: next power of two at or above the entrant count.
  pub fn padded_size(&self) -> usize {
    self.padded_size
  }

  pub fn winners_rounds(&self) -> u32 {
    self.winners_rounds
  }

  /// All matches in id order. Upstream matches always come first.
  pub fn matches(&self) -> &[Match] {
    &self.matches
  }

  pub fn match_by_id(&self, id: MatchId) -> Option<&Match> {
    self.index_of(id).map(|idx| &self.matches[idx])
  }

  /// Last winners match for single elimination, first grand final for
  /// double elimination.
  pub fn final_match_id(&self) -> MatchId {
    self.final_match
  }

  pub fn reset_match_id(&self) -> Option<MatchId> {
    self.reset_match
  }

  pub(crate) fn index_of(&self, id: MatchId) -> Option<usize> {
    let idx = usize::try_from(id.checked_sub(1)?).ok()?;
    self.matches.get(idx).filter(|m| m.id == id).map(|_| idx)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn completed(winner_slot: usize) -> Match {
    let mut slots = [Slot::new(SlotSource::Seeded(1)), Slot::new(SlotSource::Seeded(2))];
    slots[0].occupant = Some(1);
    slots[1].occupant = Some(2);
    Match {
      id: 1,
      side: BracketSide::Winners,
      round: 1,
      position: 1,
      slots,
      status: MatchStatus::Completed,
      winner_slot: Some(winner_slot),
      bye: false,
      feeds: Vec::new(),
    }
  }

  #[test]
  fn test_winner_and_loser_from_slot() {
    let m = completed(1);
    assert_eq!(m.winner_id(), Some(2));
    assert_eq!(m.loser_id(), Some(1));
  }

  #[test]
  fn test_out_of_range_winner_slot_has_no_winner_or_loser() {
    let json = serde_json::to_string(&completed(0)).unwrap().replace(r#""winnerSlot":0"#, r#""winnerSlot":2"#);
    let m: Match = serde_json::from_str(&json).unwrap();
    assert_eq!(m.winner_id(), None);
    assert_eq!(m.loser_id(), None);
  }
}
