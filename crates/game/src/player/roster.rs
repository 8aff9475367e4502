use std::collections::BTreeMap;

use super::state::{Player, PlayerId, Team};

/// All known players keyed by id. Removals requested while a tick is being
/// processed are queued and applied by `flush_removals`.
#[derive(Debug, Default)]
pub struct Roster {
    players: BTreeMap<PlayerId, Player>,
    local_id: Option<PlayerId>,
    pending_removals: Vec<PlayerId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn is_local(&self, id: PlayerId) -> bool {
        self.local_id == Some(id)
    }

    pub fn set_local(&mut self, player: Player) {
        self.local_id = Some(player.id);
        self.players.insert(player.id, player);
    }

    pub fn local(&self) -> Option<&Player> {
        self.local_id.and_then(|id| self.players.get(&id))
    }

    pub fn local_mut(&mut self) -> Option<&mut Player> {
        self.local_id.and_then(|id| self.players.get_mut(&id))
    }

    /// Inserts or refreshes a remote player. Returns true if the id was new.
    pub fn upsert(&mut self, id: PlayerId, name: &str, team: Team, radius: f32) -> bool {
        self.pending_removals.retain(|&pending| pending != id);
        match self.players.get_mut(&id) {
            Some(player) => {
                player.name = name.to_string();
                player.team = team;
                false
            }
            None => {
                self.players.insert(id, Player::new(id, name, team, radius));
                true
            }
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.players.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn remotes_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        let local_id = self.local_id;
        self.players
            .values_mut()
            .filter(move |player| Some(player.id) != local_id)
    }

    pub fn schedule_removal(&mut self, id: PlayerId) {
        if self.players.contains_key(&id) && !self.pending_removals.contains(&id) {
            self.pending_removals.push(id);
        }
    }

    pub fn flush_removals(&mut self) -> Vec<Player> {
        let mut removed = Vec::with_capacity(self.pending_removals.len());
        for id in self.pending_removals.drain(..) {
            if let Some(player) = self.players.remove(&id) {
                removed.push(player);
            }
        }
        removed
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.pending_removals.clear();
        self.local_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_with_local() -> Roster {
        let mut roster = Roster::new();
        roster.set_local(Player::new(1, "me", Team::Blue, 16.0));
        roster
    }

    #[test]
    fn test_upsert_reports_new_players() {
        let mut roster = roster_with_local();

        assert!(roster.upsert(2, "two", Team::Red, 16.0));
        assert!(!roster.upsert(2, "renamed", Team::Blue, 16.0));

        let player = roster.get(2).unwrap();
        assert_eq!(player.name, "renamed");
        assert_eq!(player.team, Team::Blue);
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_removal_is_deferred() {
        let mut roster = roster_with_local();
        roster.upsert(2, "two", Team::Red, 16.0);

        roster.schedule_removal(2);
        roster.schedule_removal(2);
        assert!(roster.contains(2));

        let removed = roster.flush_removals();
        assert_eq!(removed.len(), 1);
        assert!(!roster.contains(2));
    }

    #[test]
    fn test_reannounce_cancels_pending_removal() {
        let mut roster = roster_with_local();
        roster.upsert(2, "two", Team::Red, 16.0);

        roster.schedule_removal(2);
        roster.upsert(2, "two", Team::Red, 16.0);

        assert!(roster.flush_removals().is_empty());
        assert!(roster.contains(2));
    }

    #[test]
    fn test_remotes_exclude_local() {
        let mut roster = roster_with_local();
        roster.upsert(2, "two", Team::Red, 16.0);
        roster.upsert(3, "three", Team::Blue, 16.0);

        let ids: Vec<PlayerId> = roster.remotes_mut().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_clear_resets_local() {
        let mut roster = roster_with_local();
        roster.upsert(2, "two", Team::Red, 16.0);
        roster.schedule_removal(2);

        roster.clear();

        assert!(roster.is_empty());
        assert_eq!(roster.local_id(), None);
        assert!(roster.flush_removals().is_empty());
    }
}
