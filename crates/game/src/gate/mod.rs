//! Edge-triggered gate engagement.
//!
//! The host keeps an aggregate engaged-player count per gate built purely
//! from the +1/-1 deltas clients send, so a notification goes out on each
//! state change and never while the state is stable.

use crate::map::Map;
use crate::net::PacketType;
use crate::player::{PlayerId, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    NotHolding,
    Holding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    Hold,
    Release,
}

impl GateTransition {
    pub fn delta(self) -> i8 {
        match self {
            Self::Hold => 1,
            Self::Release => -1,
        }
    }

    /// GATE_UPDATE announcing this transition on behalf of `player_id`.
    pub fn notification(self, player_id: PlayerId, acting_team: Team) -> PacketType {
        PacketType::GateUpdate {
            player_id,
            team: acting_team,
            progress: 0.0,
            delta: self.delta(),
        }
    }
}

#[derive(Debug, Default)]
pub struct GateTracker {
    state: GateState,
}

impl GateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_holding(&self) -> bool {
        self.state == GateState::Holding
    }

    pub fn update(&mut self, overlapping: bool) -> Option<GateTransition> {
        match (self.state, overlapping) {
            (GateState::NotHolding, true) => {
                self.state = GateState::Holding;
                Some(GateTransition::Hold)
            }
            (GateState::Holding, false) => {
                self.state = GateState::NotHolding;
                Some(GateTransition::Release)
            }
            _ => None,
        }
    }

    /// Forces NOT_HOLDING. Returns the release owed to the host if the
    /// tracker was holding; callers that reset at a round boundary drop it.
    pub fn release(&mut self) -> Option<GateTransition> {
        self.update(false)
    }

    pub fn reset(&mut self) {
        self.state = GateState::NotHolding;
    }
}

/// Change to a gate's engaged count caused by a host GATE_UPDATE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementChange {
    pub gate_team: Team,
    pub previous: u32,
    pub current: u32,
    pub progress: f32,
}

impl EngagementChange {
    /// First opposing player has started holding the gate.
    pub fn became_contested(&self) -> bool {
        self.previous == 0 && self.current > 0
    }
}

/// Applies a host GATE_UPDATE sent on behalf of `acting_team`, which is
/// engaging the opposing team's gate.
pub fn apply_gate_update(
    map: &mut Map,
    acting_team: Team,
    progress: f32,
    delta: i8,
) -> Option<EngagementChange> {
    let gate_team = acting_team.opponent();
    let gate = map.gate_mut(gate_team)?;
    gate.set_progress(progress);
    let previous = gate.apply_engagement(delta);
    Some(EngagementChange {
        gate_team,
        previous,
        current: gate.engaged,
        progress: gate.progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TestingGround;

    #[test]
    fn test_edge_triggered_sequence() {
        let mut tracker = GateTracker::new();
        let overlaps = [false, false, true, true, true, false, true, false];

        let mut holds = Vec::new();
        let mut releases = Vec::new();
        for (tick, &overlapping) in overlaps.iter().enumerate() {
            match tracker.update(overlapping) {
                Some(GateTransition::Hold) => holds.push(tick),
                Some(GateTransition::Release) => releases.push(tick),
                None => {}
            }
        }

        assert_eq!(holds, vec![2, 6]);
        assert_eq!(releases, vec![5, 7]);
    }

    #[test]
    fn test_release_only_when_holding() {
        let mut tracker = GateTracker::new();
        assert_eq!(tracker.release(), None);

        tracker.update(true);
        assert_eq!(tracker.release(), Some(GateTransition::Release));
        assert!(!tracker.is_holding());
    }

    #[test]
    fn test_notification_carries_delta() {
        let packet = GateTransition::Release.notification(9, Team::Red);
        assert_eq!(
            packet,
            PacketType::GateUpdate {
                player_id: 9,
                team: Team::Red,
                progress: 0.0,
                delta: -1,
            }
        );
    }

    #[test]
    fn test_host_update_targets_opposing_gate() {
        let mut map = TestingGround::map();

        let change = apply_gate_update(&mut map, Team::Red, 0.25, 1).unwrap();
        assert_eq!(change.gate_team, Team::Blue);
        assert!(change.became_contested());
        assert_eq!(map.gate(Team::Blue).unwrap().progress, 0.25);

        let change = apply_gate_update(&mut map, Team::Red, 0.3, 1).unwrap();
        assert!(!change.became_contested());
        assert_eq!(change.current, 2);
    }
}
