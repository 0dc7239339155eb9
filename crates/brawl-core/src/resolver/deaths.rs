//! Death processing.
//!
//! Dead minions are removed one at a time, attacking side first and left to
//! right. Each removal resolves in order:
//!
//! 1. Friendly-death abilities of the surviving minions
//! 2. The dead minion's deathrattles, summoning where it stood
//! 3. Reborn
//! 4. Death-triggered secrets
//!
//! Effects can kill further minions; the loop runs until no dead minion remains.

use tracing::trace;

use crate::board::CombatMinion;
use crate::card::{Ability, Deathrattle, Keywords, SecretEffect};
use crate::snapshot::Side;

use super::combat::Combat;
use super::targeting;
use super::TrialError;

impl<'s> Combat<'s> {
    pub(super) fn process_deaths(&mut self, first: Side) -> Result<(), TrialError> {
        while let Some((side, index)) = self.board.first_dead(first) {
            let dead = self.board.side_mut(side).minions.remove(index);
            trace!(side = %side, card = %dead.card_id, index, "Minion died");

            self.friendly_death(side, &dead);

            let mut slot = index;
            for deathrattle in dead.deathrattles() {
                slot = self.deathrattle(side, slot, &dead, deathrattle)?;
            }

            if dead.keywords.contains(Keywords::REBORN) {
                let uid = self.board.allocate_uid();
                let mut reborn = dead.revived(uid);
                reborn.keywords.remove(Keywords::REBORN);
                if self.board.summon(side, slot, reborn) {
                    slot += 1;
                }
            }

            self.death_secrets(side, slot, &dead);
        }
        Ok(())
    }

    fn friendly_death(&mut self, side: Side, dead: &CombatMinion<'_>) {
        for minion in self.board.side_mut(side).minions.iter_mut() {
            if !minion.is_alive() {
                continue;
            }
            for ability in minion.abilities() {
                if let Ability::GrowOnFriendlyDeath {
                    attack,
                    health,
                    tribe,
                } = ability
                {
                    if dead.tribe.matches(*tribe) {
                        minion.buff(*attack, *health);
                    }
                }
            }
        }
    }

    /// Resolves one deathrattle; returns the slot for the next summon.
    fn deathrattle(
        &mut self,
        side: Side,
        mut slot: usize,
        dead: &CombatMinion<'_>,
        deathrattle: &Deathrattle,
    ) -> Result<usize, TrialError> {
        match deathrattle {
            Deathrattle::Summon { token, count } => {
                for _ in 0..*count {
                    if !self.summon_token(side, slot, token) {
                        break;
                    }
                    slot += 1;
                }
            }
            Deathrattle::DamageRandomEnemy { amount, times } => {
                for _ in 0..*times {
                    self.damage_random_enemy(side, *amount);
                }
            }
            Deathrattle::BuffRandomFriendly { attack, health } => {
                if let Some(i) = targeting::random_living(self.board.side(side), &mut self.rng, |_| true) {
                    self.board.side_mut(side).minions[i].buff(*attack, *health);
                }
            }
            Deathrattle::BuffAllFriendly { attack, health } => {
                for minion in self.board.side_mut(side).minions.iter_mut() {
                    if minion.is_alive() {
                        minion.buff(*attack, *health);
                    }
                }
            }
            Deathrattle::ShieldRandomFriendly => {
                let pick = targeting::random_living(self.board.side(side), &mut self.rng, |m| {
                    !m.keywords.contains(Keywords::DIVINE_SHIELD)
                });
                if let Some(i) = pick {
                    self.board.side_mut(side).minions[i]
                        .keywords
                        .insert(Keywords::DIVINE_SHIELD);
                }
            }
            Deathrattle::BloodGems { count } => {
                let counters = self.board.side(side).counters;
                for _ in 0..*count {
                    let Some(i) =
                        targeting::random_living(self.board.side(side), &mut self.rng, |_| true)
                    else {
                        break;
                    };
                    self.board.side_mut(side).minions[i]
                        .buff(1 + counters.blood_gem_attack, 1 + counters.blood_gem_health);
                }
            }
            Deathrattle::SummonFromHand => {
                let state = self.board.side(side);
                if state.has_room() && !state.hand.is_empty() {
                    let source = self.board.side_mut(side).hand.remove(0);
                    let uid = self.board.allocate_uid();
                    if self
                        .board
                        .summon(side, slot, CombatMinion::from_snapshot(uid, source))
                    {
                        slot += 1;
                    }
                }
            }
            Deathrattle::Unsupported { reason } => {
                return Err(TrialError::unsupported(&dead.card_id, reason));
            }
        }
        Ok(slot)
    }

    fn death_secrets(&mut self, side: Side, slot: usize, dead: &CombatMinion<'s>) {
        let redemption = self
            .board
            .side_mut(side)
            .take_secret(|s| matches!(s, SecretEffect::Redemption));
        if redemption.is_some() {
            trace!(side = %side, card = %dead.card_id, "Redemption triggered");
            let uid = self.board.allocate_uid();
            self.board.summon(side, slot, dead.revived(uid));
        }

        let avenge = self
            .board
            .side_mut(side)
            .take_secret(|s| matches!(s, SecretEffect::Avenge { .. }));
        if let Some(SecretEffect::Avenge { attack, health }) = avenge {
            if let Some(i) = targeting::random_living(self.board.side(side), &mut self.rng, |_| true) {
                self.board.side_mut(side).minions[i].buff(*attack, *health);
            }
        }
    }
}
