//! Conflict sanitisation (spec §4.5 step 8): when more than one phase in
//! the same tick would stamp a different status onto the same group, picks
//! a winner by priority and drops the sibling fields the spec marks
//! incompatible with it.
//!
//! The rest of the tick engine avoids this situation structurally — a
//! `processedGroups` set keeps battles and group dispatch from touching the
//! same group twice in one tick — so this module is the backstop for the
//! one case that set doesn't cover: a monster AI decision landing on a
//! group another phase already restamped this tick.

use crate::entities::{Group, GroupStatus};

fn priority(status: GroupStatus) -> u8 {
    match status {
        GroupStatus::Fighting => 10,
        GroupStatus::Building => 8,
        GroupStatus::Gathering => 6,
        GroupStatus::Demobilising => 5,
        GroupStatus::Moving => 4,
        GroupStatus::Idle => 2,
        GroupStatus::Mobilizing | GroupStatus::Crafting | GroupStatus::Fleeing | GroupStatus::Cancelling | GroupStatus::CancellingGather => 1,
    }
}

/// The higher-priority of two statuses proposed for the same group this tick.
#[must_use]
pub fn winning_status(a: GroupStatus, b: GroupStatus) -> GroupStatus {
    if priority(b) > priority(a) {
        b
    } else {
        a
    }
}

/// Clears fields a status transition leaves behind that are incompatible
/// with `winner`.
pub fn scrub_incompatible_fields(group: &mut Group, winner: GroupStatus) {
    match winner {
        GroupStatus::Fighting => {
            group.movement_path.clear();
            group.path_index = None;
            group.move_started = None;
            group.next_move_time = None;
            group.target_x = None;
            group.target_y = None;
        }
        GroupStatus::Moving => {
            group.battle_id = None;
            group.battle_role = None;
            group.battle_side = None;
            group.flee_tick_requested = None;
        }
        _ => {}
    }
}

/// Resolves a group two phases both proposed a status for within one tick:
/// picks the higher-priority status and scrubs fields the loser would have
/// left dangling.
#[must_use]
pub fn sanitise_group(mut group: Group, proposed: GroupStatus) -> Group {
    let winner = winning_status(group.status, proposed);
    group.status = winner;
    scrub_incompatible_fields(&mut group, winner);
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_group() -> Group {
        Group {
            id: "g1".to_string(),
            owner: "p1".to_string(),
            name: None,
            race: None,
            status: GroupStatus::Moving,
            x: 0,
            y: 0,
            units: HashMap::new(),
            items: Default::default(),
            motion: Default::default(),
            movement_path: vec![(0, 0), (1, 0)],
            path_index: Some(0),
            move_started: Some(10),
            next_move_time: Some(20),
            target_x: Some(1),
            target_y: Some(0),
            gathering_biome: None,
            gathering_ticks_remaining: None,
            build_structure_id: None,
            demobilise_structure_id: None,
            storage_destination: None,
            battle_id: Some("b1".to_string()),
            battle_role: None,
            battle_side: None,
            flee_tick_requested: None,
            cancel_request_time: None,
            created_at: 0,
        }
    }

    #[test]
    fn fighting_beats_moving_and_drops_movement_fields() {
        let group = sanitise_group(base_group(), GroupStatus::Fighting);
        assert_eq!(group.status, GroupStatus::Fighting);
        assert!(group.movement_path.is_empty());
        assert_eq!(group.path_index, None);
        assert_eq!(group.next_move_time, None);
        assert_eq!(group.battle_id, Some("b1".to_string()));
    }

    #[test]
    fn moving_does_not_beat_fighting() {
        let mut group = base_group();
        group.status = GroupStatus::Fighting;
        let group = sanitise_group(group, GroupStatus::Moving);
        assert_eq!(group.status, GroupStatus::Fighting);
        assert_eq!(group.battle_id, Some("b1".to_string()));
    }
}
