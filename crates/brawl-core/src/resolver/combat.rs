//! The attack loop.
//!
//! # Attack Order
//!
//! 1. The side with more minions attacks first; equal boards use the tie-break
//! 2. Start-of-combat effects resolve, first attacker's side first
//! 3. Sides alternate; each picks its leftmost minion that has not attacked
//!    this cycle, and the cycle resets once every minion has attacked
//! 4. The combat ends when a board is empty, neither side can attack, or the
//!    attack guard trips

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::board::{CombatBoard, CombatMinion};
use crate::card::{Ability, AnomalyEffect, HeroPowerEffect, Keywords, SecretEffect, TokenSpec, Tribe};
use crate::outcome::{CombatResult, TrialOutcome};
use crate::snapshot::{BoardSnapshot, Side};

use super::targeting;
use super::{FirstAttacker, TrialError};

/// One combat in progress.
pub(super) struct Combat<'s> {
    pub(super) board: CombatBoard<'s>,
    pub(super) rng: ChaCha8Rng,
    snapshot: &'s BoardSnapshot,
    attacks: u32,
    max_attacks: u32,
}

impl<'s> Combat<'s> {
    pub(super) fn new(snapshot: &'s BoardSnapshot, rng: ChaCha8Rng, max_attacks: u32) -> Self {
        Self {
            board: CombatBoard::new(snapshot),
            rng,
            snapshot,
            attacks: 0,
            max_attacks,
        }
    }

    /// Runs the combat to its end.
    pub(super) fn run(mut self, policy: FirstAttacker) -> Result<TrialOutcome, TrialError> {
        let first = self.first_attacker(policy);
        trace!(first = %first, "Combat starting");
        self.start_of_combat(first)?;

        let mut attacking = first;
        while !self.board.is_empty(Side::Player) && !self.board.is_empty(Side::Opponent) {
            let Some(attacker) = self.next_attacker(attacking) else {
                if !self.can_attack(attacking.other()) {
                    trace!("Neither side can attack");
                    return Ok(TrialOutcome::tie(self.attacks));
                }
                attacking = attacking.other();
                continue;
            };
            if self.attacks >= self.max_attacks {
                trace!(attacks = self.attacks, "Attack guard reached");
                return Ok(TrialOutcome::tie(self.attacks));
            }
            self.attack(attacking, attacker)?;
            attacking = attacking.other();
        }

        Ok(self.outcome())
    }

    fn first_attacker(&mut self, policy: FirstAttacker) -> Side {
        let player = self.board.count(Side::Player);
        let opponent = self.board.count(Side::Opponent);
        match player.cmp(&opponent) {
            std::cmp::Ordering::Greater => Side::Player,
            std::cmp::Ordering::Less => Side::Opponent,
            std::cmp::Ordering::Equal => match policy {
                FirstAttacker::Player => Side::Player,
                FirstAttacker::Opponent => Side::Opponent,
                FirstAttacker::CoinFlip => {
                    if self.rng.gen_bool(0.5) {
                        Side::Player
                    } else {
                        Side::Opponent
                    }
                }
            },
        }
    }

    fn start_of_combat(&mut self, first: Side) -> Result<(), TrialError> {
        let snapshot = self.snapshot;
        for side in [first, first.other()] {
            let hero_power = &snapshot.side(side).hero_power;
            if hero_power.activated {
                if let HeroPowerEffect::StartOfCombatDamage { amount } = hero_power.effect {
                    trace!(side = %side, amount, "Hero power fires");
                    self.damage_random_enemy(side, amount);
                }
            }

            let triggers: Vec<(u32, i32)> = self
                .board
                .side(side)
                .minions
                .iter()
                .flat_map(|m| {
                    m.abilities().iter().filter_map(move |ability| match ability {
                        Ability::StartOfCombatDamage { amount } => Some((m.uid, *amount)),
                        _ => None,
                    })
                })
                .collect();
            for (uid, amount) in triggers {
                let alive = self
                    .board
                    .side(side)
                    .position(uid)
                    .is_some_and(|i| self.board.side(side).minions[i].is_alive());
                if alive {
                    self.damage_random_enemy(side, amount);
                }
            }
        }
        self.process_deaths(first)
    }

    fn can_attack(&self, side: Side) -> bool {
        self.board
            .side(side)
            .minions
            .iter()
            .any(CombatMinion::can_attack)
    }

    /// Leftmost minion that has not attacked this cycle, resetting the cycle
    /// when every attacker has gone.
    fn next_attacker(&mut self, side: Side) -> Option<u32> {
        if !self.can_attack(side) {
            return None;
        }
        let state = self.board.side_mut(side);
        if !state.minions.iter().any(|m| m.can_attack() && !m.attacked) {
            for minion in &mut state.minions {
                minion.attacked = false;
            }
        }
        state
            .minions
            .iter()
            .find(|m| m.can_attack() && !m.attacked)
            .map(|m| m.uid)
    }

    /// One attack, with as many strikes as the attacker's windfury allows.
    fn attack(&mut self, side: Side, uid: u32) -> Result<(), TrialError> {
        let Some(index) = self.board.side(side).position(uid) else {
            return Ok(());
        };
        let attacker = &mut self.board.side_mut(side).minions[index];
        attacker.attacked = true;
        let strikes = attacker.keywords.strikes();

        for _ in 0..strikes {
            let ready = self
                .board
                .side(side)
                .position(uid)
                .is_some_and(|i| self.board.side(side).minions[i].can_attack());
            if !ready || self.attacks >= self.max_attacks {
                break;
            }
            let Some(target) = targeting::choose_target(self.board.side(side.other()), &mut self.rng)
            else {
                break;
            };
            self.attacks += 1;
            self.strike(side, uid, target)?;
        }
        Ok(())
    }

    fn strike(&mut self, side: Side, attacker_uid: u32, target_uid: u32) -> Result<(), TrialError> {
        let defender = side.other();
        self.attacked_secrets(defender, target_uid);

        let (Some(ai), Some(ti)) = (
            self.board.side(side).position(attacker_uid),
            self.board.side(defender).position(target_uid),
        ) else {
            return Err(TrialError::Internal(
                "attacker or target vanished before the strike".to_string(),
            ));
        };

        let attacker = &mut self.board.side_mut(side).minions[ai];
        attacker.keywords.remove(Keywords::STEALTH);
        let (attack, keywords) = (attacker.attack, attacker.keywords);
        let target = &self.board.side(defender).minions[ti];
        let (counter, counter_keywords) = (target.attack, target.keywords);

        trace!(
            side = %side,
            attacker = %self.board.side(side).minions[ai].card_id,
            target = %target.card_id,
            "Attack"
        );

        let mut hits = vec![ti];
        if keywords.contains(Keywords::CLEAVE) {
            if ti > 0 {
                hits.push(ti - 1);
            }
            if ti + 1 < self.board.count(defender) {
                hits.push(ti + 1);
            }
        }
        let lethal = keywords.is_lethal_touch();
        let mut destroyed = false;
        for i in hits {
            let damaged = self.board.side_mut(defender).minions[i].take_damage(attack, lethal);
            destroyed |= damaged && lethal;
        }
        if destroyed && keywords.contains(Keywords::VENOMOUS) {
            self.board.side_mut(side).minions[ai]
                .keywords
                .remove(Keywords::VENOMOUS);
        }

        let countered = self.board.side_mut(side).minions[ai]
            .take_damage(counter, counter_keywords.is_lethal_touch());
        if countered && counter_keywords.contains(Keywords::VENOMOUS) {
            self.board.side_mut(defender).minions[ti]
                .keywords
                .remove(Keywords::VENOMOUS);
        }

        self.process_deaths(side)
    }

    /// Fires the defender's secrets that trigger when a friendly minion is attacked.
    fn attacked_secrets(&mut self, defender: Side, target_uid: u32) {
        loop {
            let shielded = self
                .board
                .side(defender)
                .position(target_uid)
                .is_some_and(|i| {
                    self.board.side(defender).minions[i]
                        .keywords
                        .contains(Keywords::DIVINE_SHIELD)
                });
            let Some(secret) = self.board.side_mut(defender).take_secret(|s| match s {
                SecretEffect::AutodefenseMatrix => !shielded,
                SecretEffect::SnakeTrap | SecretEffect::VenomstrikeTrap => true,
                _ => false,
            }) else {
                return;
            };
            trace!(side = %defender, secret = ?secret, "Secret triggered");

            match secret {
                SecretEffect::AutodefenseMatrix => {
                    if let Some(i) = self.board.side(defender).position(target_uid) {
                        self.board.side_mut(defender).minions[i]
                            .keywords
                            .insert(Keywords::DIVINE_SHIELD);
                    }
                }
                SecretEffect::SnakeTrap => {
                    let snake = TokenSpec::new("snake", 1, 1).with_tribe(Tribe::Beast);
                    for _ in 0..3 {
                        self.summon_token(defender, usize::MAX, &snake);
                    }
                }
                SecretEffect::VenomstrikeTrap => {
                    let cobra = TokenSpec::new("emperor_cobra", 2, 3)
                        .with_tribe(Tribe::Beast)
                        .with_keywords(Keywords::POISONOUS);
                    self.summon_token(defender, usize::MAX, &cobra);
                }
                _ => {}
            }
        }
    }

    /// Summons a token at `index`; returns false when the board was full.
    pub(super) fn summon_token(&mut self, side: Side, index: usize, token: &TokenSpec) -> bool {
        let counters = self.board.side(side).counters;
        let uid = self.board.allocate_uid();
        self.board
            .summon(side, index, CombatMinion::from_token(uid, token, &counters))
    }

    /// Deals damage to a random living enemy of `side`.
    pub(super) fn damage_random_enemy(&mut self, side: Side, amount: i32) {
        let enemy = side.other();
        if let Some(i) = targeting::random_living(self.board.side(enemy), &mut self.rng, |_| true) {
            self.board.side_mut(enemy).minions[i].take_damage(amount, false);
        }
    }

    fn outcome(&self) -> TrialOutcome {
        let snapshot = self.snapshot;
        let winner = match (
            self.board.is_empty(Side::Player),
            self.board.is_empty(Side::Opponent),
        ) {
            (false, true) => Side::Player,
            (true, false) => Side::Opponent,
            _ => return TrialOutcome::tie(self.attacks),
        };
        let loser = winner.other();

        let mut damage = i32::from(snapshot.side(winner).hero.tavern_tier)
            + self.board.side(winner).tier_total();
        if let Some(anomaly) = &snapshot.globals().anomaly {
            if let AnomalyEffect::BonusHeroDamage { amount } = anomaly.effect {
                damage += amount;
            }
        }
        let cap = snapshot.globals().damage_cap;
        if cap > 0 {
            damage = damage.min(cap);
        }
        let lethal = damage >= snapshot.side(loser).hero.effective_health;

        TrialOutcome {
            result: match winner {
                Side::Player => CombatResult::Win,
                Side::Opponent => CombatResult::Loss,
            },
            damage,
            player_died: lethal && loser == Side::Player,
            opponent_died: lethal && loser == Side::Opponent,
            survivors: u8::try_from(self.board.count(winner)).unwrap_or(u8::MAX),
            attacks: self.attacks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{MinionSnapshot, SecretSnapshot, SideSnapshot};
    use crate::card::CardId;
    use rand::SeedableRng;

    fn combat(snapshot: &BoardSnapshot) -> Combat<'_> {
        Combat::new(snapshot, ChaCha8Rng::seed_from_u64(7), 500)
    }

    #[test]
    fn larger_board_attacks_first() {
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![MinionSnapshot::vanilla("a", 1, 1)]),
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("b", 1, 1),
                MinionSnapshot::vanilla("c", 1, 1),
            ]),
        );
        let mut combat = combat(&snapshot);
        assert_eq!(combat.first_attacker(FirstAttacker::Player), Side::Opponent);
    }

    #[test]
    fn attack_cycle_runs_left_to_right_and_resets() {
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("a", 1, 9),
                MinionSnapshot::vanilla("zero", 0, 9),
                MinionSnapshot::vanilla("b", 1, 9),
            ]),
            SideSnapshot::default(),
        );
        let mut combat = combat(&snapshot);
        let first = combat.next_attacker(Side::Player);
        let a = combat.board.side(Side::Player).minions[0].uid;
        let b = combat.board.side(Side::Player).minions[2].uid;
        assert_eq!(first, Some(a));
        combat.board.side_mut(Side::Player).minions[0].attacked = true;
        assert_eq!(combat.next_attacker(Side::Player), Some(b));
        combat.board.side_mut(Side::Player).minions[2].attacked = true;
        assert_eq!(combat.next_attacker(Side::Player), Some(a));
    }

    #[test]
    fn attacker_choice_ignores_the_seed() {
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("left", 2, 9),
                MinionSnapshot::vanilla("middle", 2, 9),
                MinionSnapshot::vanilla("right", 2, 9),
            ]),
            SideSnapshot::new(vec![MinionSnapshot::vanilla("wall", 0, 50)]),
        );
        for seed in 0..32 {
            let mut combat = Combat::new(&snapshot, ChaCha8Rng::seed_from_u64(seed), 500);
            let order: Vec<usize> = (0..4)
                .filter_map(|_| {
                    let uid = combat.next_attacker(Side::Player)?;
                    let i = combat.board.side(Side::Player).position(uid)?;
                    combat.board.side_mut(Side::Player).minions[i].attacked = true;
                    Some(i)
                })
                .collect();
            assert_eq!(order, vec![0, 1, 2, 0], "seed {seed}");
        }
    }

    #[test]
    fn cleave_hits_neighbours() {
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("hydra", 2, 20).with_keywords(Keywords::CLEAVE)
            ]),
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("l", 1, 2),
                MinionSnapshot::vanilla("m", 1, 2).with_keywords(Keywords::TAUNT),
                MinionSnapshot::vanilla("r", 1, 2),
            ]),
        );
        let mut combat = combat(&snapshot);
        let attacker = combat.board.side(Side::Player).minions[0].uid;
        let target = combat.board.side(Side::Opponent).minions[1].uid;
        combat.strike(Side::Player, attacker, target).unwrap();
        assert!(combat.board.is_empty(Side::Opponent));
        assert_eq!(combat.board.side(Side::Player).minions[0].health, 19);
    }

    #[test]
    fn venomous_is_spent_after_a_kill() {
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("v", 1, 20).with_keywords(Keywords::VENOMOUS)
            ]),
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("x", 1, 10),
                MinionSnapshot::vanilla("y", 1, 10),
            ]),
        );
        let mut combat = combat(&snapshot);
        let attacker = combat.board.side(Side::Player).minions[0].uid;
        let target = combat.board.side(Side::Opponent).minions[0].uid;
        combat.strike(Side::Player, attacker, target).unwrap();
        assert_eq!(combat.board.count(Side::Opponent), 1);
        assert!(!combat.board.side(Side::Player).minions[0]
            .keywords
            .contains(Keywords::VENOMOUS));
    }

    #[test]
    fn mega_windfury_strikes_four_times() {
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![
                MinionSnapshot::vanilla("zapp", 1, 50).with_keywords(Keywords::MEGA_WINDFURY)
            ]),
            SideSnapshot::new(vec![MinionSnapshot::vanilla("wall", 0, 10)]),
        );
        let mut combat = combat(&snapshot);
        let uid = combat.board.side(Side::Player).minions[0].uid;
        combat.attack(Side::Player, uid).unwrap();
        assert_eq!(combat.attacks, 4);
        assert_eq!(combat.board.side(Side::Opponent).minions[0].health, 6);
    }

    #[test]
    fn snake_trap_fills_defending_board() {
        let mut opponent = SideSnapshot::new(vec![MinionSnapshot::vanilla("o", 1, 5)]);
        opponent.secrets.push(SecretSnapshot {
            card_id: CardId::new("snake_trap"),
            effect: SecretEffect::SnakeTrap,
        });
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![MinionSnapshot::vanilla("p", 1, 5)]),
            opponent,
        );
        let mut combat = combat(&snapshot);
        let attacker = combat.board.side(Side::Player).minions[0].uid;
        let target = combat.board.side(Side::Opponent).minions[0].uid;
        combat.strike(Side::Player, attacker, target).unwrap();
        assert_eq!(combat.board.count(Side::Opponent), 4);
        assert!(combat.board.side(Side::Opponent).secrets.is_empty());
    }

    #[test]
    fn autodefense_matrix_shields_the_target() {
        let mut opponent = SideSnapshot::new(vec![MinionSnapshot::vanilla("o", 1, 1)]);
        opponent.secrets.push(SecretSnapshot {
            card_id: CardId::new("autodefense_matrix"),
            effect: SecretEffect::AutodefenseMatrix,
        });
        let snapshot = BoardSnapshot::new(
            SideSnapshot::new(vec![MinionSnapshot::vanilla("p", 3, 5)]),
            opponent,
        );
        let mut combat = combat(&snapshot);
        let attacker = combat.board.side(Side::Player).minions[0].uid;
        let target = combat.board.side(Side::Opponent).minions[0].uid;
        combat.strike(Side::Player, attacker, target).unwrap();
        assert_eq!(combat.board.count(Side::Opponent), 1);
    }
}
