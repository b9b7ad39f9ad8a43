//! Result recording and winner/loser propagation.
//!
//! Every mutation of a built bracket goes through here. Propagation is a
//! recomputation over the feed graph: a correction or an undo resets every
//! match downstream of the changed one, then `settle` re-derives occupants
//! and byes from slot sources in id order.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::bracket::{Bracket, Match, Slot, SlotSource};
use crate::error::{BracketError, BracketResult};
use crate::types::{BracketStatus, EntrantId, MatchId, MatchStatus};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum RecordOutcome {
  /// First result for the match.
  Recorded,
  /// Same winner and scores as already stored.
  Unchanged,
  /// Same winner, different scores; nothing downstream changes.
  ScoresUpdated,
  /// Winner flipped; these downstream matches were reset.
  Corrected { invalidated: Vec<MatchId> },
}

#[derive(Clone, Copy, Debug)]
enum SlotResolution {
  Ready(EntrantId),
  Pending,
  Empty,
}

pub(crate) fn record_result(
  bracket: &mut Bracket,
  match_id: MatchId,
  score_a: u32,
  score_b: u32,
) -> BracketResult<RecordOutcome> {
  let index = bracket
    .index_of(match_id)
    .ok_or(BracketError::MatchNotFound(match_id))?;
  let winner_slot = validate_result(&bracket.matches[index], score_a, score_b)?;

  let current = &bracket.matches[index];
  let mut invalidated = Vec::new();
  if current.status == MatchStatus::Completed {
    if current.winner_slot == Some(winner_slot) {
      if current.score_a() == Some(score_a) && current.score_b() == Some(score_b) {
        return Ok(RecordOutcome::Unchanged);
      }
      let m = &mut bracket.matches[index];
      m.slots[0].score = Some(score_a);
      m.slots[1].score = Some(score_b);
      return Ok(RecordOutcome::ScoresUpdated);
    }
    invalidated = invalidate_dependents(bracket, match_id);
  }

  let m = &mut bracket.matches[index];
  m.slots[0].score = Some(score_a);
  m.slots[1].score = Some(score_b);
  m.winner_slot = Some(winner_slot);
  m.status = MatchStatus::Completed;
  settle(bracket);

  if invalidated.is_empty() {
    Ok(RecordOutcome::Recorded)
  } else {
    Ok(RecordOutcome::Corrected { invalidated })
  }
}

/// Undo: the match goes back to pending with its occupants intact, and
/// everything fed by it is reset.
pub(crate) fn clear_result(bracket: &mut Bracket, match_id: MatchId) -> BracketResult<Vec<MatchId>> {
  let index = bracket
    .index_of(match_id)
    .ok_or(BracketError::MatchNotFound(match_id))?;
  if !bracket.matches[index].has_result() {
    return Err(BracketError::InvalidResult(format!(
      "match {match_id} has no submitted result to clear"
    )));
  }

  let invalidated = invalidate_dependents(bracket, match_id);
  let m = &mut bracket.matches[index];
  m.status = MatchStatus::Pending;
  m.winner_slot = None;
  m.slots[0].score = None;
  m.slots[1].score = None;
  settle(bracket);
  Ok(invalidated)
}

/// Resolves every pending match whose sources are decided, completes byes,
/// skips matches that can never be played, then re-derives bracket status.
/// Sources always point at lower ids, so one ascending pass reaches the
/// fixed point.
pub(crate) fn settle(bracket: &mut Bracket) {
  for idx in 0..bracket.matches.len() {
    if bracket.matches[idx].status != MatchStatus::Pending {
      continue;
    }
    if apply_reset_condition(bracket, idx) {
      continue;
    }

    let (res_a, res_b) = {
      let m = &bracket.matches[idx];
      (
        resolve_slot(bracket, m.slots[0].source),
        resolve_slot(bracket, m.slots[1].source),
      )
    };

    let m = &mut bracket.matches[idx];
    apply_slot_resolution(&mut m.slots[0], res_a);
    apply_slot_resolution(&mut m.slots[1], res_b);
    auto_advance_if_bye(m, res_a, res_b);
  }
  refresh_status(bracket);
}

/// Winner of the terminal match once the bracket is decided.
pub(crate) fn champion(bracket: &Bracket) -> Option<EntrantId> {
  let final_match = bracket.match_by_id(bracket.final_match)?;
  match bracket.reset_match.and_then(|id| bracket.match_by_id(id)) {
    Some(reset) if reset.status == MatchStatus::Completed => reset.winner_id(),
    Some(reset) if reset.status == MatchStatus::Pending => None,
    _ => final_match.winner_id(),
  }
}

fn validate_result(m: &Match, score_a: u32, score_b: u32) -> BracketResult<usize> {
  if score_a == score_b {
    return Err(BracketError::InvalidResult(format!(
      "match {} cannot end in a tie ({score_a}-{score_b})",
      m.id
    )));
  }
  if m.status == MatchStatus::Skipped {
    return Err(BracketError::InvalidResult(format!(
      "match {} was skipped and cannot be scored",
      m.id
    )));
  }
  if m.bye {
    return Err(BracketError::InvalidResult(format!(
      "match {} is a bye and cannot be scored",
      m.id
    )));
  }
  if m.slots.iter().any(|slot| slot.occupant.is_none()) {
    return Err(BracketError::InvalidResult(format!(
      "match {} is still waiting on an earlier result",
      m.id
    )));
  }
  Ok(if score_a > score_b { 0 } else { 1 })
}

/// Every match reachable through feed edges from `root`, excluding it.
fn collect_dependents(bracket: &Bracket, root: MatchId) -> BTreeSet<MatchId> {
  let mut affected = BTreeSet::new();
  let mut stack: Vec<MatchId> = match bracket.match_by_id(root) {
    Some(m) => m.feeds.iter().map(|feed| feed.match_id).collect(),
    None => return affected,
  };
  while let Some(current) = stack.pop() {
    if !affected.insert(current) {
      continue;
    }
    if let Some(m) = bracket.match_by_id(current) {
      stack.extend(m.feeds.iter().map(|feed| feed.match_id));
    }
  }
  affected
}

fn invalidate_dependents(bracket: &mut Bracket, root: MatchId) -> Vec<MatchId> {
  let affected = collect_dependents(bracket, root);
  for id in &affected {
    if let Some(idx) = bracket.index_of(*id) {
      reset_match(&mut bracket.matches[idx]);
    }
  }
  if !affected.is_empty() {
    debug!(root, invalidated = ?affected, "reset downstream matches");
  }
  affected.into_iter().collect()
}

fn reset_match(m: &mut Match) {
  for slot in m.slots.iter_mut() {
    if slot.source.upstream().is_some() {
      slot.occupant = None;
    }
    slot.score = None;
  }
  m.status = MatchStatus::Pending;
  m.winner_slot = None;
  m.bye = false;
}

/// The reset only happens if the losers-bracket champion (slot B) took the
/// first grand final; otherwise it is skipped.
fn apply_reset_condition(bracket: &mut Bracket, idx: usize) -> bool {
  if bracket.reset_match != Some(bracket.matches[idx].id) {
    return false;
  }
  let Some(grand_final) = bracket.match_by_id(bracket.final_match) else {
    return false;
  };
  if grand_final.status != MatchStatus::Completed || grand_final.winner_slot != Some(0) {
    return false;
  }
  let m = &mut bracket.matches[idx];
  m.status = MatchStatus::Skipped;
  debug!(match_id = m.id, "grand final reset not needed");
  true
}

fn resolve_slot(bracket: &Bracket, source: SlotSource) -> SlotResolution {
  match source {
    SlotSource::Bye => SlotResolution::Empty,
    SlotSource::Seeded(id) => SlotResolution::Ready(id),
    SlotSource::Winner(match_id) => resolve_upstream(bracket, match_id, Match::winner_id),
    SlotSource::Loser(match_id) => resolve_upstream(bracket, match_id, Match::loser_id),
  }
}

fn resolve_upstream(
  bracket: &Bracket,
  match_id: MatchId,
  pick: fn(&Match) -> Option<EntrantId>,
) -> SlotResolution {
  let Some(upstream) = bracket.match_by_id(match_id) else {
    return SlotResolution::Empty;
  };
  match upstream.status {
    MatchStatus::Completed => pick(upstream)
      .map(SlotResolution::Ready)
      .unwrap_or(SlotResolution::Empty),
    MatchStatus::Skipped => SlotResolution::Empty,
    MatchStatus::Pending => SlotResolution::Pending,
  }
}

fn apply_slot_resolution(slot: &mut Slot, resolution: SlotResolution) {
  match resolution {
    SlotResolution::Ready(id) => slot.occupant = Some(id),
    SlotResolution::Empty | SlotResolution::Pending => slot.occupant = None,
  }
}

fn auto_advance_if_bye(m: &mut Match, res_a: SlotResolution, res_b: SlotResolution) {
  let winner_slot = match (res_a, res_b) {
    (SlotResolution::Ready(_), SlotResolution::Empty) => 0,
    (SlotResolution::Empty, SlotResolution::Ready(_)) => 1,
    (SlotResolution::Empty, SlotResolution::Empty) => {
      m.status = MatchStatus::Skipped;
      debug!(match_id = m.id, "both feeds empty, skipping match");
      return;
    }
    _ => return,
  };
  m.status = MatchStatus::Completed;
  m.winner_slot = Some(winner_slot);
  m.bye = true;
  debug!(match_id = m.id, winner = ?m.slots[winner_slot].occupant, "bye advanced");
}

fn refresh_status(bracket: &mut Bracket) {
  let next = match champion(bracket) {
    Some(_) => BracketStatus::Completed,
    None => BracketStatus::InProgress,
  };
  if next == BracketStatus::Completed && bracket.status != BracketStatus::Completed {
    info!(bracket_id = %bracket.id, champion = ?champion(bracket), "bracket completed");
  }
  bracket.status = next;
}
