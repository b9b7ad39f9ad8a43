//! Match-tree construction for single and double elimination.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::advancer;
use crate::bracket::{Bracket, Feed, FeedKind, Match, Slot, SlotSource};
use crate::error::{BracketError, BracketResult};
use crate::seeding::{round_count, SeedSlot};
use crate::types::{
  BracketId, BracketOptions, BracketSide, BracketStatus, BracketType, Entrant, MatchId, MatchStatus,
};

/// Builds the full topology for `slots` and settles the byes it contains.
pub fn build(
  id: BracketId,
  created_at: DateTime<Utc>,
  entrants: Vec<Entrant>,
  slots: &[SeedSlot],
  bracket_type: BracketType,
  options: BracketOptions,
) -> BracketResult<Bracket> {
  let size = slots.len();
  if size < 2 || !size.is_power_of_two() {
    return Err(BracketError::InvalidBracketShape(format!(
      "{size} first-round slots is not a power of two"
    )));
  }
  let rounds = round_count(size);

  let mut tree = MatchArena::default();
  let mut winners_rounds: Vec<Vec<MatchId>> = Vec::with_capacity(rounds);

  let mut first_round = Vec::with_capacity(size / 2);
  for (idx, pair) in slots.chunks(2).enumerate() {
    if pair[0].is_bye() && pair[1].is_bye() {
      return Err(BracketError::InvalidBracketShape(format!(
        "round 1 match {} pairs two byes",
        idx + 1
      )));
    }
    let id = tree.push(
      BracketSide::Winners,
      1,
      idx as u32 + 1,
      seed_source(&pair[0]),
      seed_source(&pair[1]),
    );
    first_round.push(id);
  }
  winners_rounds.push(first_round);

  for round in 2..=rounds {
    let prev = &winners_rounds[round - 2];
    let mut ids = Vec::with_capacity(prev.len() / 2);
    for (idx, pair) in prev.chunks(2).enumerate() {
      let id = tree.push(
        BracketSide::Winners,
        round as u32,
        idx as u32 + 1,
        SlotSource::Winner(pair[0]),
        SlotSource::Winner(pair[1]),
      );
      ids.push(id);
    }
    winners_rounds.push(ids);
  }

  let winners_final = *winners_rounds
    .last()
    .and_then(|round| round.first())
    .ok_or_else(|| BracketError::InvalidBracketShape("missing winners final".to_string()))?;

  let (final_match, reset_match) = match bracket_type {
    BracketType::SingleElimination => (winners_final, None),
    BracketType::DoubleElimination => {
      build_losers_and_grand_final(&mut tree, &winners_rounds, winners_final, options.grand_final_reset)?
    }
  };

  let mut matches = tree.matches;
  link_feeds(&mut matches);
  debug!(
    ?bracket_type,
    padded_size = size,
    rounds,
    matches = matches.len(),
    "built bracket topology"
  );

  let mut bracket = Bracket {
    id,
    bracket_type,
    options,
    entrants,
    created_at,
    status: BracketStatus::Building,
    padded_size: size,
    winners_rounds: rounds as u32,
    matches,
    final_match,
    reset_match,
  };
  advancer::settle(&mut bracket);
  Ok(bracket)
}

/// Losers rounds alternate between a round that halves the field and a
/// round that takes in the losers dropping from the next winners round:
/// `L1` pairs winners-round-1 losers, `L2i` meets `W(i+1)` losers (in
/// reverse order when `i` is odd), `L(2i+1)` pairs adjacent `L2i` winners.
fn build_losers_and_grand_final(
  tree: &mut MatchArena,
  winners_rounds: &[Vec<MatchId>],
  winners_final: MatchId,
  allow_reset: bool,
) -> BracketResult<(MatchId, Option<MatchId>)> {
  let rounds = winners_rounds.len();
  let mut losers_rounds: Vec<Vec<MatchId>> = Vec::new();

  for i in 1..rounds {
    let count = winners_rounds[i].len();
    let odd_round = (i * 2 - 1) as u32;
    let mut odd_ids = Vec::with_capacity(count);
    for j in 0..count {
      let (slot_a, slot_b) = if i == 1 {
        let w1 = &winners_rounds[0];
        (SlotSource::Loser(w1[j * 2]), SlotSource::Loser(w1[j * 2 + 1]))
      } else {
        let prev_even = losers_rounds
          .last()
          .ok_or_else(|| BracketError::InvalidBracketShape("missing losers round".to_string()))?;
        (
          SlotSource::Winner(prev_even[j * 2]),
          SlotSource::Winner(prev_even[j * 2 + 1]),
        )
      };
      odd_ids.push(tree.push(BracketSide::Losers, odd_round, j as u32 + 1, slot_a, slot_b));
    }
    losers_rounds.push(odd_ids);

    // Drop-in order flips every other round so a dropped entrant does not
    // meet someone from the half of the draw it just came through.
    let even_round = (i * 2) as u32;
    let mut even_ids = Vec::with_capacity(count);
    for j in 0..count {
      let dropped = if i % 2 == 1 { count - 1 - j } else { j };
      let slot_a = SlotSource::Winner(losers_rounds[losers_rounds.len() - 1][j]);
      let slot_b = SlotSource::Loser(winners_rounds[i][dropped]);
      even_ids.push(tree.push(BracketSide::Losers, even_round, j as u32 + 1, slot_a, slot_b));
    }
    losers_rounds.push(even_ids);
  }

  let losers_champion = match losers_rounds.last() {
    Some(last_round) => {
      let id = *last_round
        .first()
        .ok_or_else(|| BracketError::InvalidBracketShape("missing losers final".to_string()))?;
      SlotSource::Winner(id)
    }
    None => SlotSource::Loser(winners_final),
  };

  let grand_final = tree.push(
    BracketSide::GrandFinal,
    1,
    1,
    SlotSource::Winner(winners_final),
    losers_champion,
  );
  let reset = allow_reset.then(|| {
    tree.push(
      BracketSide::GrandFinal,
      2,
      1,
      SlotSource::Winner(grand_final),
      SlotSource::Loser(grand_final),
    )
  });
  Ok((grand_final, reset))
}

/// Round label for display. Winners rounds count back from the final;
/// double elimination prefixes them so they never read like the grand final.
pub fn round_label(
  side: BracketSide,
  round: u32,
  winners_rounds: u32,
  bracket_type: BracketType,
) -> String {
  match side {
    BracketSide::Winners => {
      let base = match winners_rounds.checked_sub(round) {
        Some(0) if round > 0 => "Finals".to_string(),
        Some(1) if round > 0 => "Semi-Finals".to_string(),
        Some(2) if round > 0 => "Quarter-Finals".to_string(),
        _ => format!("Round {round}"),
      };
      match bracket_type {
        BracketType::SingleElimination => base,
        BracketType::DoubleElimination => format!("Winners {base}"),
      }
    }
    BracketSide::Losers => format!("Losers Round {round}"),
    BracketSide::GrandFinal => {
      if round <= 1 {
        "Grand Finals".to_string()
      } else {
        "Grand Finals Reset".to_string()
      }
    }
  }
}

#[derive(Default)]
struct MatchArena {
  matches: Vec<Match>,
}

impl MatchArena {
  fn push(
    &mut self,
    side: BracketSide,
    round: u32,
    position: u32,
    slot_a: SlotSource,
    slot_b: SlotSource,
  ) -> MatchId {
    let id = self.matches.len() as MatchId + 1;
    self.matches.push(Match {
      id,
      side,
      round,
      position,
      slots: [Slot::new(slot_a), Slot::new(slot_b)],
      status: MatchStatus::Pending,
      winner_slot: None,
      bye: false,
      feeds: Vec::new(),
    });
    id
  }
}

fn seed_source(slot: &SeedSlot) -> SlotSource {
  match slot {
    SeedSlot::Entrant(entrant) => SlotSource::Seeded(entrant.id),
    SeedSlot::Bye => SlotSource::Bye,
  }
}

fn link_feeds(matches: &mut [Match]) {
  let mut edges = Vec::new();
  for m in matches.iter() {
    for (slot_idx, slot) in m.slots.iter().enumerate() {
      let kind = match slot.source {
        SlotSource::Winner(_) => FeedKind::Winner,
        SlotSource::Loser(_) => FeedKind::Loser,
        SlotSource::Seeded(_) | SlotSource::Bye => continue,
      };
      if let Some(upstream) = slot.source.upstream() {
        edges.push((
          upstream,
          Feed {
            match_id: m.id,
            slot: slot_idx,
            kind,
          },
        ));
      }
    }
  }
  for (upstream, feed) in edges {
    if let Some(m) = matches.get_mut(upstream as usize - 1) {
      m.feeds.push(feed);
    }
  }
}
