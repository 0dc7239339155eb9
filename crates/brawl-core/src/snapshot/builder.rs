//! Converts the log layer's raw combat state into a [`BoardSnapshot`].
//!
//! All card-specific knowledge is applied here from the [`CardTable`], so the
//! resolver only sees structured keywords, deathrattles and abilities.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::card::{
    AnomalyEffect, Attachment, CardId, CardTable, HeroPowerEffect, Keywords, SecretEffect, Tribe,
};

use super::{
    AnomalySnapshot, BoardSnapshot, Counters, GlobalModifiers, HandCard, HeroPowerSnapshot,
    HeroSnapshot, MinionSnapshot, SecretSnapshot, Side, SideSnapshot, UNKNOWN_HERO_HEALTH,
};

/// Card id of a blood gem in hand.
pub const BLOOD_GEM_CARD_ID: &str = "blood_gem";

/// Reasons a snapshot cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The game entity has not been seen in the log.
    #[error("game entity could not be found")]
    MissingGameEntity,
    /// A player entity has not been seen in the log.
    #[error("{0} entity could not be found")]
    MissingPlayer(Side),
    /// A hero is missing from the board.
    #[error("{0} hero could not be found")]
    MissingHero(Side),
    /// The lobby's tribes are not known yet.
    #[error("game has no available races")]
    MissingAvailableRaces,
    /// A board card has not been identified.
    #[error("{side} board has an unknown card at position {position}")]
    UnknownCard {
        /// Owning side
        side: Side,
        /// Zone position of the card
        position: i32,
    },
    /// A board card cannot be simulated.
    #[error("{side} board has unsupported card {card_id}")]
    UnsupportedCard {
        /// Owning side
        side: Side,
        /// The unsupported card
        card_id: String,
    },
}

impl SnapshotError {
    /// True for errors caused by entities missing from the log, as opposed
    /// to cards the simulator cannot handle.
    #[must_use]
    pub fn is_incomplete_input(&self) -> bool {
        matches!(
            self,
            Self::MissingGameEntity | Self::MissingPlayer(_) | Self::MissingHero(_)
        )
    }
}

/// Lobby-wide state from the game entity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGame {
    /// Combat damage cap; 0 when uncapped
    pub damage_cap: i32,
    /// Anomaly card id
    pub anomaly: Option<String>,
}

/// A hero as reported by the log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawHero {
    /// Health
    pub health: i32,
    /// Armor
    pub armor: i32,
    /// Tavern tier
    pub tavern_tier: u8,
}

/// A hero power as reported by the log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawHeroPower {
    /// Card id
    pub card_id: String,
    /// Exhausted tag
    pub exhausted: bool,
    /// Activated tag
    pub activated: bool,
    /// First script data value
    pub data: i32,
    /// Second script data value
    pub data2: i32,
}

/// A minion entity as reported by the log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMinion {
    /// Latest known card id
    pub card_id: String,
    /// Entity id
    pub entity_id: i32,
    /// Board position, 1-based
    pub zone_position: i32,
    /// Attack tag
    pub attack: i32,
    /// Health tag
    pub health: i32,
    /// Taunt tag
    pub taunt: bool,
    /// Divine shield tag
    pub divine_shield: bool,
    /// Poisonous tag
    pub poisonous: bool,
    /// Venomous tag
    pub venomous: bool,
    /// Windfury tag
    pub windfury: bool,
    /// Mega-windfury tag
    pub mega_windfury: bool,
    /// Stealth tag
    pub stealth: bool,
    /// Reborn tag
    pub reborn: bool,
    /// Golden
    pub premium: bool,
    /// Tavern tier tag
    pub tech_level: u8,
    /// Card ids of magnetized parts
    pub modular_parts: Vec<String>,
    /// Card ids of attached enchantments
    pub attached: Vec<String>,
}

/// A card in hand as reported by the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawCard {
    /// A minion card.
    Minion {
        /// The minion entity
        minion: RawMinion,
        /// Marked as unplayable
        #[serde(default)]
        unplayable: bool,
    },
    /// A spell card.
    Spell {
        /// Card id
        card_id: String,
    },
    /// Any other card; an empty id means the card is hidden.
    Other {
        /// Card id
        #[serde(default)]
        card_id: String,
    },
}

/// One player's state as reported by the log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSide {
    /// Hero
    pub hero: Option<RawHero>,
    /// Hero power
    pub hero_power: Option<RawHeroPower>,
    /// Minions in play, any order
    pub board: Vec<RawMinion>,
    /// Hand
    pub hand: Vec<RawCard>,
    /// Secret card ids
    pub secrets: Vec<String>,
    /// Counters from player enchantments
    pub counters: Counters,
}

/// Raw state of both players when combat begins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCombatState {
    /// Game entity
    pub game: Option<RawGame>,
    /// Local player
    pub player: Option<RawSide>,
    /// Opponent
    pub opponent: Option<RawSide>,
    /// Tribes in the lobby
    pub available_races: Option<Vec<Tribe>>,
    /// Turn number
    pub turn: u32,
}

/// Builds snapshots by evaluating the card table over raw log state.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotBuilder<'t> {
    table: &'t CardTable,
}

impl<'t> SnapshotBuilder<'t> {
    /// Creates a builder over a card table.
    #[must_use]
    pub fn new(table: &'t CardTable) -> Self {
        Self { table }
    }

    /// Builds a snapshot.
    ///
    /// Card checks run before entity checks, so a board with an unknown card
    /// reports that even when other entities are also missing.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when a required entity is missing or a board
    /// contains an unknown or unsupported card.
    pub fn build(&self, raw: &RawCombatState) -> Result<BoardSnapshot, SnapshotError> {
        debug!("Snapshotting board state...");

        let sides = [(Side::Player, &raw.player), (Side::Opponent, &raw.opponent)];
        for (side, state) in sides {
            if let Some(state) = state {
                self.check_board(side, state)?;
            }
        }

        let Some(races) = &raw.available_races else {
            error!("Game has no available races. Exiting");
            return Err(SnapshotError::MissingAvailableRaces);
        };
        let Some(game) = &raw.game else {
            debug!("GameEntity could not be found. Exiting.");
            return Err(SnapshotError::MissingGameEntity);
        };
        let player = raw
            .player
            .as_ref()
            .ok_or(SnapshotError::MissingPlayer(Side::Player))?;
        let opponent = raw
            .opponent
            .as_ref()
            .ok_or(SnapshotError::MissingPlayer(Side::Opponent))?;

        let player = self.build_side(Side::Player, player)?;
        let opponent = self.build_side(Side::Opponent, opponent)?;

        info!(
            p_eternal = player.counters.eternal_legion,
            p_undead = player.counters.undead_attack_bonus,
            p_elemental = player.counters.elemental_plays,
            o_eternal = opponent.counters.eternal_legion,
            o_undead = opponent.counters.undead_attack_bonus,
            o_elemental = opponent.counters.elemental_plays,
            "Snapshot counters"
        );

        let globals = GlobalModifiers {
            damage_cap: game.damage_cap,
            anomaly: game.anomaly.as_deref().map(|id| self.anomaly(id)),
            available_tribes: races.clone(),
        };

        Ok(BoardSnapshot::new(player, opponent)
            .with_globals(globals)
            .with_turn(raw.turn))
    }

    /// Converts raw hand cards.
    #[must_use]
    pub fn build_hand(&self, cards: &[RawCard]) -> Vec<HandCard> {
        cards
            .iter()
            .map(|card| match card {
                RawCard::Minion { minion, unplayable } => HandCard::Minion {
                    minion: self.build_minion(minion),
                    can_summon: !unplayable,
                },
                RawCard::Spell { card_id } if card_id == BLOOD_GEM_CARD_ID => HandCard::BloodGem,
                RawCard::Spell { .. } => HandCard::Spell,
                RawCard::Other { card_id } if card_id.is_empty() => HandCard::Unknown,
                RawCard::Other { card_id } => HandCard::Known {
                    card_id: CardId::new(card_id),
                },
            })
            .collect()
    }

    /// Resolves secret card ids; ids missing from the table become unsupported.
    #[must_use]
    pub fn build_secrets(&self, ids: &[String]) -> Vec<SecretSnapshot> {
        ids.iter().map(|id| self.secret(id)).collect()
    }

    /// Converts one raw minion, applying table keywords, modular parts,
    /// attached enchantments and golden stat doubling.
    #[must_use]
    pub fn build_minion(&self, raw: &RawMinion) -> MinionSnapshot {
        let definition = self.table.card(&raw.card_id);
        let golden = raw.premium;

        let mut keywords = Keywords::empty();
        keywords.set(Keywords::TAUNT, raw.taunt);
        keywords.set(Keywords::DIVINE_SHIELD, raw.divine_shield);
        keywords.set(Keywords::POISONOUS, raw.poisonous);
        keywords.set(Keywords::VENOMOUS, raw.venomous);
        keywords.set(Keywords::WINDFURY, raw.windfury);
        keywords.set(Keywords::MEGA_WINDFURY, raw.mega_windfury);
        keywords.set(Keywords::STEALTH, raw.stealth);
        keywords.set(Keywords::REBORN, raw.reborn);

        let mut minion = MinionSnapshot {
            card_id: CardId::new(&raw.card_id),
            game_id: raw.entity_id,
            attack: raw.attack,
            health: raw.health,
            vanilla_attack: raw.attack,
            vanilla_health: raw.health,
            keywords,
            golden,
            tier: raw.tech_level.max(1),
            tribe: Tribe::None,
            deathrattles: Vec::new(),
            abilities: Vec::new(),
        };

        if let Some(def) = definition {
            minion.keywords |= def.keywords;
            minion.tribe = def.tribe;
            if raw.tech_level == 0 && def.tier > 0 {
                minion.tier = def.tier;
            }
            minion.vanilla_attack = def.attack;
            minion.vanilla_health = def.health;
            if golden && !def.premium_implemented {
                minion.vanilla_attack *= 2;
                minion.vanilla_health *= 2;
            }
            minion.deathrattles.extend_from_slice(def.deathrattles_for(golden));
            minion.abilities.extend_from_slice(def.abilities_for(golden));
        } else {
            debug!(card_id = %raw.card_id, "Card not in table, simulating as vanilla");
        }

        for part in &raw.modular_parts {
            if part == &raw.card_id {
                continue;
            }
            if let Some(part_def) = self.table.card(part) {
                minion.keywords |= part_def.keywords;
                minion
                    .deathrattles
                    .extend_from_slice(part_def.deathrattles_for(false));
                minion.abilities.extend_from_slice(part_def.abilities_for(false));
            }
        }

        for enchantment in &raw.attached {
            match self.table.attachment(enchantment) {
                Some(Attachment::Reborn) => minion.keywords |= Keywords::REBORN,
                Some(Attachment::Deathrattle { deathrattle }) => {
                    minion.deathrattles.push(deathrattle.clone());
                }
                Some(Attachment::Keywords { keywords }) => minion.keywords |= *keywords,
                None => trace!(enchantment = %enchantment, "Ignoring attachment"),
            }
        }

        minion
    }

    fn check_board(&self, side: Side, state: &RawSide) -> Result<(), SnapshotError> {
        if let Some(unknown) = state
            .board
            .iter()
            .find(|m| CardId::new(&m.card_id).is_unknown())
        {
            error!("Board has unknown cards. Exiting");
            return Err(SnapshotError::UnknownCard {
                side,
                position: unknown.zone_position,
            });
        }
        if let Some(unsupported) = state
            .board
            .iter()
            .find(|m| self.table.card(&m.card_id).is_some_and(|def| def.unsupported))
        {
            debug!("Board has unsupported cards. Exiting");
            return Err(SnapshotError::UnsupportedCard {
                side,
                card_id: unsupported.card_id.clone(),
            });
        }
        Ok(())
    }

    fn build_side(&self, side: Side, raw: &RawSide) -> Result<SideSnapshot, SnapshotError> {
        let Some(hero) = &raw.hero else {
            error!("Hero(es) could not be found. Exiting.");
            return Err(SnapshotError::MissingHero(side));
        };

        let mut health = hero.health;
        if side == Side::Opponent && health <= 0 {
            health = UNKNOWN_HERO_HEALTH;
        }

        let mut board: Vec<&RawMinion> = raw.board.iter().collect();
        board.sort_by_key(|m| m.zone_position);

        Ok(SideSnapshot {
            minions: board.into_iter().map(|m| self.build_minion(m)).collect(),
            hero: HeroSnapshot {
                effective_health: health + hero.armor,
                tavern_tier: hero.tavern_tier.max(1),
            },
            hero_power: raw
                .hero_power
                .as_ref()
                .map(|hp| self.hero_power(hp))
                .unwrap_or_default(),
            hand: self.build_hand(&raw.hand),
            secrets: self.build_secrets(&raw.secrets),
            counters: raw.counters,
        })
    }

    fn hero_power(&self, raw: &RawHeroPower) -> HeroPowerSnapshot {
        let effect = self
            .table
            .hero_power(&raw.card_id)
            .map(|def| def.effect.clone())
            .unwrap_or(HeroPowerEffect::None);
        HeroPowerSnapshot {
            card_id: raw.card_id.clone(),
            activated: raw.exhausted || raw.activated,
            data: raw.data,
            data2: raw.data2,
            effect,
        }
    }

    fn secret(&self, id: &str) -> SecretSnapshot {
        let effect = self.table.secret(id).cloned().unwrap_or_else(|| {
            debug!(secret = %id, "Secret not in table");
            SecretEffect::Unsupported {
                reason: format!("unrecognized secret {id}"),
            }
        });
        SecretSnapshot {
            card_id: CardId::new(id),
            effect,
        }
    }

    fn anomaly(&self, id: &str) -> AnomalySnapshot {
        AnomalySnapshot {
            card_id: CardId::new(id),
            effect: self.table.anomaly(id).cloned().unwrap_or(AnomalyEffect::None),
        }
    }
}
