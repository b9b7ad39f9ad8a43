//! In-memory home for live brackets.
//!
//! Each bracket sits behind its own mutex, so two result submissions for the
//! same bracket run one after the other while different brackets proceed in
//! parallel. The registry holds no storage client: callers persist the
//! `Bracket` returned from each mutation.
//!
//! Archiving takes the engine out of its mutex, so a submission that looked
//! the bracket up just before the archive finds it gone once it gets the
//! lock.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, RwLock},
};

use thiserror::Error;
use tracing::{info, warn};

use crate::bracket::Bracket;
use crate::engine::BracketEngine;
use crate::error::{BracketError, BracketResult};
use crate::snapshot::BracketSnapshot;
use crate::types::{BracketId, BracketOptions, BracketType, Entrant, MatchId};

pub type SharedEngine = Arc<Mutex<Option<BracketEngine>>>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Bracket not found: {0}")]
    BracketNotFound(BracketId),

    #[error(transparent)]
    Bracket(#[from] BracketError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Default)]
pub struct BracketRegistry {
    brackets: RwLock<HashMap<BracketId, SharedEngine>>,
}

impl BracketRegistry {
    pub fn new() -> Self {
        BracketRegistry::default()
    }

    /// Builds a bracket and registers it. Nothing is registered on failure.
    pub fn create(
        &self,
        entrants: Vec<Entrant>,
        bracket_type: BracketType,
        options: BracketOptions,
    ) -> RegistryResult<Bracket> {
        let engine = BracketEngine::create_with_options(entrants, bracket_type, options)?;
        let bracket = engine.bracket().clone();
        self.insert(engine);
        Ok(bracket)
    }

    /// Registers an engine, replacing any bracket with the same id.
    pub fn insert(&self, engine: BracketEngine) -> BracketId {
        let id = engine.id();
        let mut guard = self.brackets.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(id, Arc::new(Mutex::new(Some(engine))));
        id
    }

    /// Loads a persisted bracket. Validation happens before the registry is
    /// touched.
    pub fn restore(&self, stored: Bracket) -> RegistryResult<Bracket> {
        let engine = BracketEngine::restore(stored)?;
        let bracket = engine.bracket().clone();
        self.insert(engine);
        Ok(bracket)
    }

    /// Lock the bracket, then call `f` with exclusive access to its engine.
    pub fn with_bracket<F, R>(&self, id: BracketId, f: F) -> RegistryResult<R>
    where
        F: FnOnce(&mut BracketEngine) -> BracketResult<R>,
    {
        let shared = self.shared(id)?;
        with_engine(&shared, id, f)
    }

    pub fn record_result(
        &self,
        id: BracketId,
        match_id: MatchId,
        score_a: u32,
        score_b: u32,
    ) -> RegistryResult<Bracket> {
        self.with_bracket(id, |engine| {
            engine
                .record_result(match_id, score_a, score_b)
                .map(Bracket::clone)
        })
    }

    pub fn clear_result(&self, id: BracketId, match_id: MatchId) -> RegistryResult<Bracket> {
        self.with_bracket(id, |engine| engine.clear_result(match_id).map(Bracket::clone))
    }

    pub fn bracket(&self, id: BracketId) -> RegistryResult<Bracket> {
        self.with_bracket(id, |engine| Ok(engine.bracket().clone()))
    }

    pub fn snapshot(&self, id: BracketId) -> RegistryResult<BracketSnapshot> {
        self.with_bracket(id, |engine| Ok(engine.snapshot()))
    }

    /// Drops a bracket from memory and returns its final state for archiving.
    pub fn archive(&self, id: BracketId) -> RegistryResult<Bracket> {
        let shared = {
            let mut guard = self.brackets.write().unwrap_or_else(|e| e.into_inner());
            guard.remove(&id).ok_or(RegistryError::BracketNotFound(id))?
        };
        let engine = lock_engine(&shared, id)
            .take()
            .ok_or(RegistryError::BracketNotFound(id))?;
        let bracket = engine.into_bracket();
        info!(bracket_id = %id, status = ?bracket.status(), "bracket archived");
        Ok(bracket)
    }

    pub fn ids(&self) -> Vec<BracketId> {
        let guard = self.brackets.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<_> = guard.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.brackets.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shared(&self, id: BracketId) -> RegistryResult<SharedEngine> {
        let guard = self.brackets.read().unwrap_or_else(|e| e.into_inner());
        guard.get(&id).cloned().ok_or(RegistryError::BracketNotFound(id))
    }
}

fn with_engine<F, R>(shared: &SharedEngine, id: BracketId, f: F) -> RegistryResult<R>
where
    F: FnOnce(&mut BracketEngine) -> BracketResult<R>,
{
    let mut guard = lock_engine(shared, id);
    let engine = guard.as_mut().ok_or(RegistryError::BracketNotFound(id))?;
    Ok(f(engine)?)
}

// Engine calls validate before mutating, so a panic elsewhere while the lock
// was held cannot have left a half-applied result behind.
fn lock_engine(shared: &SharedEngine, id: BracketId) -> MutexGuard<'_, Option<BracketEngine>> {
    shared.lock().unwrap_or_else(|e| {
        warn!(bracket_id = %id, "recovering poisoned bracket lock");
        e.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn teams(n: u32) -> Vec<Entrant> {
        (1..=n).map(|id| Entrant::seeded(id, format!("Team {id}"), id)).collect()
    }

    #[test]
    fn test_create_and_record() {
        let registry = BracketRegistry::new();
        let bracket = registry
            .create(teams(4), BracketType::SingleElimination, BracketOptions::default())
            .unwrap();
        let updated = registry.record_result(bracket.id(), 1, 2, 0).unwrap();
        assert_eq!(updated.match_by_id(1).unwrap().winner_id(), Some(1));
        assert_eq!(registry.bracket(bracket.id()).unwrap(), updated);
    }

    #[test]
    fn test_failed_create_registers_nothing() {
        let registry = BracketRegistry::new();
        let result = registry.create(teams(1), BracketType::SingleElimination, BracketOptions::default());
        assert!(matches!(
            result,
            Err(RegistryError::Bracket(BracketError::InsufficientEntrants { count: 1 }))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_bracket() {
        let registry = BracketRegistry::new();
        let id = uuid::Uuid::new_v4();
        assert!(matches!(
            registry.record_result(id, 1, 1, 0),
            Err(RegistryError::BracketNotFound(missing)) if missing == id
        ));
    }

    #[test]
    fn test_archive_removes_bracket() {
        let registry = BracketRegistry::new();
        let bracket = registry
            .create(teams(2), BracketType::SingleElimination, BracketOptions::default())
            .unwrap();
        registry.record_result(bracket.id(), 1, 0, 3).unwrap();
        let archived = registry.archive(bracket.id()).unwrap();
        assert!(archived.is_complete());
        assert!(registry.ids().is_empty());
        assert!(matches!(
            registry.archive(bracket.id()),
            Err(RegistryError::BracketNotFound(_))
        ));
    }

    #[test]
    fn test_submission_after_archive_finds_bracket_gone() {
        let registry = BracketRegistry::new();
        let bracket = registry
            .create(teams(4), BracketType::SingleElimination, BracketOptions::default())
            .unwrap();
        // Looked up before the archive, locked after it.
        let stale = registry.shared(bracket.id()).unwrap();
        let archived = registry.archive(bracket.id()).unwrap();

        let result = with_engine(&stale, bracket.id(), |engine| {
            engine.record_result(1, 2, 0).map(|_| ())
        });
        assert!(matches!(
            result,
            Err(RegistryError::BracketNotFound(missing)) if missing == bracket.id()
        ));
        assert!(lock_engine(&stale, bracket.id()).is_none());
        assert_eq!(archived, bracket);
    }

    #[test]
    fn test_restore_registers_persisted_copy() {
        let source = BracketRegistry::new();
        let bracket = source
            .create(teams(6), BracketType::DoubleElimination, BracketOptions::default())
            .unwrap();
        let stored = source.record_result(bracket.id(), 2, 1, 2).unwrap();

        let target = BracketRegistry::new();
        let restored = target.restore(stored.clone()).unwrap();
        assert_eq!(restored, stored);
        assert_eq!(target.ids(), vec![bracket.id()]);
    }

    #[test]
    fn test_parallel_brackets_and_serialized_submissions() {
        let registry = Arc::new(BracketRegistry::new());
        let ids: Vec<_> = (0..4)
            .map(|_| {
                registry
                    .create(teams(8), BracketType::SingleElimination, BracketOptions::default())
                    .unwrap()
                    .id()
            })
            .collect();

        let mut handles = Vec::new();
        for id in ids.iter().copied() {
            for match_id in 1..=4u64 {
                let registry = Arc::clone(&registry);
                handles.push(thread::spawn(move || {
                    registry.record_result(id, match_id, 2, 1).map(|_| ())
                }));
            }
        }
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        for id in ids {
            let bracket = registry.bracket(id).unwrap();
            let semis: Vec<_> = bracket
                .matches()
                .iter()
                .filter(|m| m.round() == 2)
                .map(|m| m.is_ready())
                .collect();
            assert_eq!(semis, vec![true, true]);
        }
    }
}
