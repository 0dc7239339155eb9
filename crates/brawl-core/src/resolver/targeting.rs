//! Random target selection.

use rand::seq::IteratorRandom;
use rand::Rng;

use crate::board::{CombatMinion, SideState};
use crate::card::Keywords;

/// Picks the uid of the minion an attack lands on.
///
/// Stealthed minions are excluded unless nothing else is left; among the
/// remaining candidates taunts must be attacked first.
pub(super) fn choose_target<R: Rng + ?Sized>(defender: &SideState<'_>, rng: &mut R) -> Option<u32> {
    let living: Vec<&CombatMinion<'_>> = defender.minions.iter().filter(|m| m.is_alive()).collect();
    let visible: Vec<&CombatMinion<'_>> = living
        .iter()
        .copied()
        .filter(|m| !m.keywords.contains(Keywords::STEALTH))
        .collect();
    let pool = if visible.is_empty() { living } else { visible };

    let taunts: Vec<&CombatMinion<'_>> = pool
        .iter()
        .copied()
        .filter(|m| m.keywords.contains(Keywords::TAUNT))
        .collect();
    let pool = if taunts.is_empty() { pool } else { taunts };

    pool.into_iter().choose(rng).map(|m| m.uid)
}

/// Picks the index of a random living minion satisfying `filter`.
pub(super) fn random_living<R, F>(side: &SideState<'_>, rng: &mut R, filter: F) -> Option<usize>
where
    R: Rng + ?Sized,
    F: Fn(&CombatMinion<'_>) -> bool,
{
    side.minions
        .iter()
        .enumerate()
        .filter(|&(_, m)| m.is_alive() && filter(m))
        .map(|(i, _)| i)
        .choose(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::CombatBoard;
    use crate::snapshot::{BoardSnapshot, MinionSnapshot, Side, SideSnapshot};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn defending(minions: Vec<MinionSnapshot>) -> BoardSnapshot {
        BoardSnapshot::new(SideSnapshot::default(), SideSnapshot::new(minions))
    }

    #[test]
    fn taunt_is_forced() {
        let snapshot = defending(vec![
            MinionSnapshot::vanilla("a", 1, 1),
            MinionSnapshot::vanilla("t", 1, 1).with_keywords(Keywords::TAUNT),
            MinionSnapshot::vanilla("b", 1, 1),
        ]);
        let board = CombatBoard::new(&snapshot);
        let taunt = board.side(Side::Opponent).minions[1].uid;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..50 {
            assert_eq!(choose_target(board.side(Side::Opponent), &mut rng), Some(taunt));
        }
    }

    #[test]
    fn stealth_hides_until_nothing_else_is_left() {
        let snapshot = defending(vec![
            MinionSnapshot::vanilla("s", 1, 1)
                .with_keywords(Keywords::STEALTH | Keywords::TAUNT),
            MinionSnapshot::vanilla("a", 1, 1),
        ]);
        let mut board = CombatBoard::new(&snapshot);
        let hidden = board.side(Side::Opponent).minions[0].uid;
        let open = board.side(Side::Opponent).minions[1].uid;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(choose_target(board.side(Side::Opponent), &mut rng), Some(open));
        }

        board.side_mut(Side::Opponent).minions.remove(1);
        assert_eq!(choose_target(board.side(Side::Opponent), &mut rng), Some(hidden));
    }

    #[test]
    fn no_target_on_empty_board() {
        let snapshot = defending(vec![]);
        let board = CombatBoard::new(&snapshot);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(choose_target(board.side(Side::Opponent), &mut rng), None);
        assert_eq!(random_living(board.side(Side::Opponent), &mut rng, |_| true), None);
    }

    #[test]
    fn random_living_respects_filter() {
        let snapshot = defending(vec![
            MinionSnapshot::vanilla("a", 1, 1).with_keywords(Keywords::DIVINE_SHIELD),
            MinionSnapshot::vanilla("b", 1, 1),
        ]);
        let board = CombatBoard::new(&snapshot);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..20 {
            let pick = random_living(board.side(Side::Opponent), &mut rng, |m| {
                !m.keywords.contains(Keywords::DIVINE_SHIELD)
            });
            assert_eq!(pick, Some(1));
        }
    }
}
