use std::collections::BTreeMap;

use crate::coordinator::{InvalidMatchConfig, Match, MatchConfig, MatchId};
use crate::registry::BotRegistry;
use crate::runtime::BotRuntime;

/// Owns the live matches. Ids are handed out sequentially and never reused.
#[derive(Debug, Default)]
pub struct MatchRegistry {
    next_id: u64,
    matches: BTreeMap<MatchId, Match>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        config: MatchConfig,
        bots: &BotRegistry,
        runtime: &BotRuntime,
    ) -> Result<&mut Match, InvalidMatchConfig> {
        let id = MatchId(self.next_id);
        let created = Match::new(id, config, bots, runtime)?;
        self.next_id += 1;
        Ok(self.matches.entry(id).or_insert(created))
    }

    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.matches.get(&id)
    }

    pub fn get_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.get_mut(&id)
    }

    pub fn remove(&mut self, id: MatchId) -> Option<Match> {
        self.matches.remove(&id)
    }

    /// Drop every finished match, returning how many were evicted.
    pub fn evict_finished(&mut self) -> usize {
        let before = self.matches.len();
        self.matches.retain(|_, m| !m.is_over());
        before - self.matches.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = MatchId> + '_ {
        self.matches.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
