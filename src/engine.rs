//! `BracketEngine`: owns one bracket from construction to champion.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::advancer::{self, RecordOutcome};
use crate::bracket::{Bracket, Match};
use crate::builder::{self, round_label};
use crate::error::{BracketError, BracketResult};
use crate::seeding;
use crate::snapshot::{self, group_rounds, BracketSnapshot};
use crate::types::{
  BracketId, BracketOptions, BracketSide, BracketStatus, BracketType, Entrant, MatchId,
};

/// One `(side, round)` column of the bracket.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView<'a> {
  pub side: BracketSide,
  pub round: u32,
  pub label: String,
  pub matches: Vec<&'a Match>,
}

/// Single entry point for mutating a bracket. The engine is synchronous and
/// not internally locked; hosts serialize calls per bracket (see
/// `BracketRegistry`).
#[derive(Clone, Debug)]
pub struct BracketEngine {
  bracket: Bracket,
}

impl BracketEngine {
  pub fn create(entrants: Vec<Entrant>, bracket_type: BracketType) -> BracketResult<Self> {
    Self::create_with_options(entrants, bracket_type, BracketOptions::default())
  }

  pub fn create_with_options(
    entrants: Vec<Entrant>,
    bracket_type: BracketType,
    options: BracketOptions,
  ) -> BracketResult<Self> {
    let slots = seeding::assign(&entrants, options.seeding)?;
    let bracket = builder::build(
      Uuid::new_v4(),
      Utc::now(),
      entrants,
      &slots,
      bracket_type,
      options,
    )?;
    info!(
      bracket_id = %bracket.id(),
      ?bracket_type,
      entrants = bracket.entrants().len(),
      matches = bracket.matches().len(),
      "bracket created"
    );
    Ok(BracketEngine { bracket })
  }

  /// Rebuilds a bracket from a persisted copy by replaying its submitted
  /// results. Fails unless the replay lands on exactly the stored state.
  pub fn restore(stored: Bracket) -> BracketResult<Self> {
    let slots = seeding::assign(stored.entrants(), stored.options().seeding)?;
    let mut bracket = builder::build(
      stored.id(),
      stored.created_at(),
      stored.entrants().to_vec(),
      &slots,
      stored.bracket_type(),
      stored.options(),
    )?;

    for m in stored.matches().iter().filter(|m| m.has_result()) {
      let (Some(score_a), Some(score_b)) = (m.score_a(), m.score_b()) else {
        return Err(BracketError::SnapshotMismatch(format!(
          "match {} is completed without scores",
          m.id()
        )));
      };
      advancer::record_result(&mut bracket, m.id(), score_a, score_b)
        .map_err(|e| BracketError::SnapshotMismatch(format!("match {}: {e}", m.id())))?;
    }

    if bracket != stored {
      warn!(bracket_id = %stored.id(), "stored bracket does not match its replay");
      return Err(BracketError::SnapshotMismatch(
        "stored matches differ from the replayed results".to_string(),
      ));
    }
    info!(bracket_id = %bracket.id(), status = ?bracket.status(), "bracket restored");
    Ok(BracketEngine { bracket })
  }

  /// Records a score and propagates it. Re-recording a different winner
  /// discards everything downstream that depended on the old one.
  pub fn record_result(
    &mut self,
    match_id: MatchId,
    score_a: u32,
    score_b: u32,
  ) -> BracketResult<&Bracket> {
    let bracket_id = self.bracket.id();
    let outcome = advancer::record_result(&mut self.bracket, match_id, score_a, score_b)
      .inspect_err(|e| warn!(%bracket_id, match_id, error = %e, "result rejected"))?;
    match outcome {
      RecordOutcome::Recorded => {
        info!(%bracket_id, match_id, score_a, score_b, "result recorded")
      }
      RecordOutcome::Unchanged => {
        info!(%bracket_id, match_id, "result unchanged")
      }
      RecordOutcome::ScoresUpdated => {
        info!(%bracket_id, match_id, score_a, score_b, "scores updated")
      }
      RecordOutcome::Corrected { invalidated } => info!(
        %bracket_id,
        match_id,
        score_a,
        score_b,
        ?invalidated,
        "result corrected"
      ),
    }
    Ok(&self.bracket)
  }

  /// Removes a submitted result along with everything that followed from it.
  pub fn clear_result(&mut self, match_id: MatchId) -> BracketResult<&Bracket> {
    let bracket_id = self.bracket.id();
    let invalidated = advancer::clear_result(&mut self.bracket, match_id)
      .inspect_err(|e| warn!(%bracket_id, match_id, error = %e, "clear rejected"))?;
    info!(%bracket_id, match_id, ?invalidated, "result cleared");
    Ok(&self.bracket)
  }

  pub fn id(&self) -> BracketId {
    self.bracket.id()
  }

  pub fn bracket(&self) -> &Bracket {
    &self.bracket
  }

  pub fn into_bracket(self) -> Bracket {
    self.bracket
  }

  pub fn match_by_id(&self, match_id: MatchId) -> Option<&Match> {
    self.bracket.match_by_id(match_id)
  }

  /// Winners rounds first, then losers rounds, then the grand final.
  pub fn matches_by_round(&self) -> Vec<RoundView<'_>> {
    group_rounds(&self.bracket)
      .into_iter()
      .map(|((side, round), matches)| RoundView {
        side,
        round,
        label: self.round_label(side, round),
        matches,
      })
      .collect()
  }

  pub fn round_label(&self, side: BracketSide, round: u32) -> String {
    round_label(
      side,
      round,
      self.bracket.winners_rounds(),
      self.bracket.bracket_type(),
    )
  }

  pub fn champion(&self) -> Option<&Entrant> {
    advancer::champion(&self.bracket).and_then(|id| self.bracket.entrant(id))
  }

  pub fn is_complete(&self) -> bool {
    self.bracket.is_complete()
  }

  pub fn status(&self) -> BracketStatus {
    self.bracket.status()
  }

  pub fn snapshot(&self) -> BracketSnapshot {
    snapshot::snapshot(&self.bracket)
  }
}
