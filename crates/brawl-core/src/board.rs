//! Mutable per-trial combat state.
//!
//! A [`CombatBoard`] is built from a borrowed [`BoardSnapshot`] at the start of
//! each trial. Minions copy the stats they mutate and borrow their effect lists
//! from the snapshot, so creating a board never clones deathrattles or
//! abilities.
//!
//! # Invariants
//!
//! - At most [`MAX_BOARD_SIZE`] minions per side
//! - Minion `uid`s are unique within a board and never reused
//! - Dead minions (health <= 0) stay in place until death processing removes them

use crate::card::{Ability, CardId, Deathrattle, Keywords, Scaling, SecretEffect, TokenSpec, Tribe};
use crate::snapshot::{BoardSnapshot, Counters, HandCard, MinionSnapshot, Side, MAX_BOARD_SIZE};

const EMPTY_DEATHRATTLES: &[Deathrattle] = &[];
const EMPTY_ABILITIES: &[Ability] = &[];

/// A minion fighting in one trial.
#[derive(Debug, Clone)]
pub struct CombatMinion<'s> {
    /// Unique within the trial
    pub uid: u32,
    /// Card id
    pub card_id: CardId,
    /// Current attack
    pub attack: i32,
    /// Current health
    pub health: i32,
    /// Current keywords
    pub keywords: Keywords,
    /// Tavern tier
    pub tier: u8,
    /// Tribe
    pub tribe: Tribe,
    /// Attacked since the side's attack cycle last reset
    pub attacked: bool,
    vanilla_attack: i32,
    base_keywords: Keywords,
    deathrattles: &'s [Deathrattle],
    abilities: &'s [Ability],
}

impl<'s> CombatMinion<'s> {
    /// Copies a snapshot minion.
    #[must_use]
    pub fn from_snapshot(uid: u32, minion: &'s MinionSnapshot) -> Self {
        Self {
            uid,
            card_id: minion.card_id.clone(),
            attack: minion.attack,
            health: minion.health,
            keywords: minion.keywords,
            tier: minion.tier,
            tribe: minion.tribe,
            attacked: false,
            vanilla_attack: minion.vanilla_attack,
            base_keywords: minion.keywords,
            deathrattles: &minion.deathrattles,
            abilities: &minion.abilities,
        }
    }

    /// Creates a token, applying counter scaling and the undead attack bonus.
    #[must_use]
    pub fn from_token(uid: u32, token: &TokenSpec, counters: &Counters) -> Self {
        let bonus = match token.scaling {
            Scaling::None => 0,
            Scaling::EternalLegion => counters.eternal_legion,
            Scaling::ElementalPlays => counters.elemental_plays,
        };
        let mut attack = token.attack + bonus;
        if token.tribe.matches(Tribe::Undead) {
            attack += counters.undead_attack_bonus;
        }
        Self {
            uid,
            card_id: token.card_id.clone(),
            attack,
            health: token.health + bonus,
            keywords: token.keywords,
            tier: token.tier,
            tribe: token.tribe,
            attacked: false,
            vanilla_attack: token.attack,
            base_keywords: token.keywords,
            deathrattles: EMPTY_DEATHRATTLES,
            abilities: EMPTY_ABILITIES,
        }
    }

    /// The copy that returns when this minion is reborn or redeemed: vanilla
    /// attack, 1 health, starting keywords.
    #[must_use]
    pub fn revived(&self, uid: u32) -> Self {
        Self {
            uid,
            attack: self.vanilla_attack,
            health: 1,
            keywords: self.base_keywords,
            attacked: false,
            ..self.clone()
        }
    }

    /// True while health is above zero.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// True when this minion can be chosen to attack.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.is_alive() && self.attack > 0
    }

    /// Deathrattles in trigger order.
    #[must_use]
    pub fn deathrattles(&self) -> &'s [Deathrattle] {
        self.deathrattles
    }

    /// Triggered abilities.
    #[must_use]
    pub fn abilities(&self) -> &'s [Ability] {
        self.abilities
    }

    /// Adds attack and health.
    pub fn buff(&mut self, attack: i32, health: i32) {
        self.attack += attack;
        self.health += health;
    }

    /// Applies one instance of damage.
    ///
    /// Divine shield absorbs the hit. Returns true when health was lost.
    pub fn take_damage(&mut self, amount: i32, lethal_touch: bool) -> bool {
        if amount <= 0 {
            return false;
        }
        if self.keywords.contains(Keywords::DIVINE_SHIELD) {
            self.keywords.remove(Keywords::DIVINE_SHIELD);
            return false;
        }
        self.health -= amount;
        if lethal_touch {
            self.health = self.health.min(0);
        }
        true
    }
}

/// One side's working state.
#[derive(Debug, Clone)]
pub struct SideState<'s> {
    /// Minions, left to right
    pub minions: Vec<CombatMinion<'s>>,
    /// Secrets not yet triggered, in priority order
    pub secrets: Vec<&'s SecretEffect>,
    /// Summonable minions left in hand, in hand order
    pub hand: Vec<&'s MinionSnapshot>,
    /// Counters
    pub counters: Counters,
}

impl<'s> SideState<'s> {
    /// True when the side has room for another minion.
    #[must_use]
    pub fn has_room(&self) -> bool {
        self.minions.len() < MAX_BOARD_SIZE
    }

    /// Index of the minion with `uid`.
    #[must_use]
    pub fn position(&self, uid: u32) -> Option<usize> {
        self.minions.iter().position(|m| m.uid == uid)
    }

    /// Indices of living minions.
    pub fn living(&self) -> impl Iterator<Item = usize> + '_ {
        self.minions
            .iter()
            .enumerate()
            .filter(|(_, m)| m.is_alive())
            .map(|(i, _)| i)
    }

    /// Sum of tavern tiers of living minions.
    #[must_use]
    pub fn tier_total(&self) -> i32 {
        self.minions
            .iter()
            .filter(|m| m.is_alive())
            .map(|m| i32::from(m.tier))
            .sum()
    }

    /// Removes and returns the first secret matching `pred`.
    pub fn take_secret(&mut self, pred: impl Fn(&SecretEffect) -> bool) -> Option<&'s SecretEffect> {
        let index = self.secrets.iter().position(|s| pred(*s))?;
        Some(self.secrets.remove(index))
    }
}

/// Both sides of one trial.
#[derive(Debug, Clone)]
pub struct CombatBoard<'s> {
    sides: [SideState<'s>; 2],
    next_uid: u32,
}

impl<'s> CombatBoard<'s> {
    /// Copies the mutable parts of a snapshot.
    #[must_use]
    pub fn new(snapshot: &'s BoardSnapshot) -> Self {
        let mut next_uid = 0;
        let mut build = |side: Side| {
            let source = snapshot.side(side);
            let minions = source
                .minions
                .iter()
                .take(MAX_BOARD_SIZE)
                .map(|m| {
                    next_uid += 1;
                    CombatMinion::from_snapshot(next_uid, m)
                })
                .collect();
            let hand = source
                .hand
                .iter()
                .filter_map(|card| match card {
                    HandCard::Minion {
                        minion,
                        can_summon: true,
                    } => Some(minion),
                    _ => None,
                })
                .collect();
            SideState {
                minions,
                secrets: source.secrets.iter().map(|s| &s.effect).collect(),
                hand,
                counters: source.counters,
            }
        };
        let player = build(Side::Player);
        let opponent = build(Side::Opponent);
        Self {
            sides: [player, opponent],
            next_uid,
        }
    }

    /// One side.
    #[must_use]
    pub fn side(&self, side: Side) -> &SideState<'s> {
        &self.sides[side.index()]
    }

    /// One side, mutably.
    pub fn side_mut(&mut self, side: Side) -> &mut SideState<'s> {
        &mut self.sides[side.index()]
    }

    /// Number of minions on a side, dead ones included.
    #[must_use]
    pub fn count(&self, side: Side) -> usize {
        self.side(side).minions.len()
    }

    /// True when a side has no minions.
    #[must_use]
    pub fn is_empty(&self, side: Side) -> bool {
        self.side(side).minions.is_empty()
    }

    /// Allocates a fresh minion uid.
    pub fn allocate_uid(&mut self) -> u32 {
        self.next_uid += 1;
        self.next_uid
    }

    /// Inserts a minion at `index` (clamped) when the side has room.
    ///
    /// Returns false when the board is full and the minion is lost.
    pub fn summon(&mut self, side: Side, index: usize, minion: CombatMinion<'s>) -> bool {
        let state = self.side_mut(side);
        if !state.has_room() {
            return false;
        }
        let index = index.min(state.minions.len());
        state.minions.insert(index, minion);
        true
    }

    /// Finds the first dead minion, checking `first` before the other side and
    /// each side left to right.
    #[must_use]
    pub fn first_dead(&self, first: Side) -> Option<(Side, usize)> {
        [first, first.other()].into_iter().find_map(|side| {
            self.side(side)
                .minions
                .iter()
                .position(|m| !m.is_alive())
                .map(|index| (side, index))
        })
    }
}
