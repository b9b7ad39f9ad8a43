//! Entrant ordering and first-round slot placement.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{BracketError, BracketResult};
use crate::types::{Entrant, SeedingStrategy};

/// One first-round slot: a real entrant or padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeedSlot {
  Entrant(Entrant),
  Bye,
}

impl SeedSlot {
  pub fn is_bye(&self) -> bool {
    matches!(self, SeedSlot::Bye)
  }

  pub fn entrant(&self) -> Option<&Entrant> {
    match self {
      SeedSlot::Entrant(entrant) => Some(entrant),
      SeedSlot::Bye => None,
    }
  }
}

/// Orders entrants and lays them out over `padded_size(n)` slots so that
/// adjacent slots `(0,1), (2,3), …` form the round-1 pairings.
pub fn assign(entrants: &[Entrant], strategy: SeedingStrategy) -> BracketResult<Vec<SeedSlot>> {
  let ordered = order_entrants(entrants)?;
  let size = padded_size(ordered.len());
  let slots = match strategy {
    SeedingStrategy::Standard => standard_slots(ordered, size),
    SeedingStrategy::Sequential => sequential_slots(ordered, size),
  };
  debug!(
    entrants = entrants.len(),
    padded_size = size,
    byes = size - entrants.len(),
    ?strategy,
    "assigned seeds"
  );
  Ok(slots)
}

/// Seeded entrants by ascending seed, then unseeded entrants in input order.
/// The position in the returned list is the entrant's effective rank.
pub fn order_entrants(entrants: &[Entrant]) -> BracketResult<Vec<Entrant>> {
  if entrants.len() < 2 {
    return Err(BracketError::InsufficientEntrants {
      count: entrants.len(),
    });
  }

  let mut seen = HashSet::new();
  for entrant in entrants {
    if !seen.insert(entrant.id) {
      return Err(BracketError::DuplicateEntrant(entrant.id));
    }
    if entrant.seed == Some(0) {
      debug!(entrant_id = entrant.id, "seed 0 is not a rank, treating entrant as unseeded");
    }
  }

  Ok(rank_order(entrants))
}

/// Ordering alone, without validation. Stable: ties and unseeded entrants
/// keep their input order.
pub fn rank_order(entrants: &[Entrant]) -> Vec<Entrant> {
  let mut ordered = entrants.to_vec();
  ordered.sort_by_key(|entrant| match entrant.effective_seed() {
    Some(seed) => (0u8, seed),
    None => (1u8, 0),
  });
  ordered
}

/// Smallest power of two that is at least `n`.
pub fn padded_size(n: usize) -> usize {
  n.max(1).next_power_of_two()
}

/// Number of rounds in the winners tree for a padded size.
pub fn round_count(padded_size: usize) -> usize {
  padded_size.max(1).trailing_zeros() as usize
}

/// Rank (1-based) sitting at each slot of a standard draw of `size` slots.
/// Each pair sums to `size + 1`, and the recursive split keeps the top two
/// ranks apart until the final.
pub fn seed_positions(size: u32) -> Vec<u32> {
  let mut seeds = vec![1u32];
  while seeds.len() < size as usize {
    let n = seeds.len() as u32;
    let mut next = Vec::with_capacity(seeds.len() * 2);
    for seed in seeds.iter().copied() {
      next.push(seed);
      next.push((n * 2 + 1).saturating_sub(seed));
    }
    seeds = next;
  }
  seeds
}

fn standard_slots(ordered: Vec<Entrant>, size: usize) -> Vec<SeedSlot> {
  seed_positions(size as u32)
    .into_iter()
    .map(|rank| match ordered.get(rank as usize - 1) {
      Some(entrant) => SeedSlot::Entrant(entrant.clone()),
      None => SeedSlot::Bye,
    })
    .collect()
}

fn sequential_slots(ordered: Vec<Entrant>, size: usize) -> Vec<SeedSlot> {
  let byes = size - ordered.len();
  let mut slots = Vec::with_capacity(size);
  for (rank, entrant) in ordered.into_iter().enumerate() {
    slots.push(SeedSlot::Entrant(entrant));
    if rank < byes {
      slots.push(SeedSlot::Bye);
    }
  }
  slots
}
