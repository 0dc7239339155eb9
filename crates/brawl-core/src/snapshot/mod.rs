//! Immutable description of both boards at the start of combat.
//!
//! A [`BoardSnapshot`] is built once per combat phase and then shared read-only
//! (behind an `Arc`) by every trial. Trials copy the minion state they mutate
//! into their own working board; nothing ever writes to the snapshot.
//!
//! # Example
//!
//! ```
//! use brawl_core::snapshot::{BoardSnapshot, MinionSnapshot, SideSnapshot};
//!
//! let player = SideSnapshot::new(vec![MinionSnapshot::vanilla("ogre", 5, 5)]);
//! let opponent = SideSnapshot::new(vec![MinionSnapshot::vanilla("wisp", 1, 1)]);
//! let snapshot = BoardSnapshot::new(player, opponent);
//!
//! assert_eq!(snapshot.player().minions.len(), 1);
//! assert!(!snapshot.is_complex(6));
//! ```

pub mod builder;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::card::{
    Ability, AnomalyEffect, CardId, Deathrattle, HeroPowerEffect, Keywords, SecretEffect, Tribe,
};

pub use builder::{
    RawCard, RawCombatState, RawGame, RawHero, RawHeroPower, RawMinion, RawSide, SnapshotBuilder,
    SnapshotError,
};

/// Health used for an opponent hero whose health the log reports as zero or less.
pub const UNKNOWN_HERO_HEALTH: i32 = 1000;

/// Maximum minions on one side of the board.
pub const MAX_BOARD_SIZE: usize = 7;

/// One of the two combatants.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The local player
    Player,
    /// The opponent
    Opponent,
}

impl Side {
    /// The other side.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }

    /// Array index for per-side storage.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Player => 0,
            Self::Opponent => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "Player"),
            Self::Opponent => write!(f, "Opponent"),
        }
    }
}

/// A minion as it stands when combat begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinionSnapshot {
    /// Card id
    pub card_id: CardId,
    /// Entity id in the game log
    #[serde(default)]
    pub game_id: i32,
    /// Current attack
    pub attack: i32,
    /// Current health
    pub health: i32,
    /// Vanilla attack, used when the minion is reborn
    pub vanilla_attack: i32,
    /// Vanilla health
    pub vanilla_health: i32,
    /// Keywords
    #[serde(default)]
    pub keywords: Keywords,
    /// Golden version
    #[serde(default)]
    pub golden: bool,
    /// Tavern tier
    #[serde(default)]
    pub tier: u8,
    /// Tribe
    #[serde(default)]
    pub tribe: Tribe,
    /// Deathrattles, own and attached, in trigger order
    #[serde(default)]
    pub deathrattles: Vec<Deathrattle>,
    /// Triggered abilities
    #[serde(default)]
    pub abilities: Vec<Ability>,
}

impl MinionSnapshot {
    /// A keyword-less tier 1 minion whose vanilla stats equal its current stats.
    #[must_use]
    pub fn vanilla(card_id: &str, attack: i32, health: i32) -> Self {
        Self {
            card_id: CardId::new(card_id),
            game_id: 0,
            attack,
            health,
            vanilla_attack: attack,
            vanilla_health: health,
            keywords: Keywords::empty(),
            golden: false,
            tier: 1,
            tribe: Tribe::None,
            deathrattles: Vec::new(),
            abilities: Vec::new(),
        }
    }

    /// Adds keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Keywords) -> Self {
        self.keywords |= keywords;
        self
    }

    /// Sets the tavern tier.
    #[must_use]
    pub fn with_tier(mut self, tier: u8) -> Self {
        self.tier = tier;
        self
    }

    /// Sets the tribe.
    #[must_use]
    pub fn with_tribe(mut self, tribe: Tribe) -> Self {
        self.tribe = tribe;
        self
    }

    /// Appends a deathrattle.
    #[must_use]
    pub fn with_deathrattle(mut self, deathrattle: Deathrattle) -> Self {
        self.deathrattles.push(deathrattle);
        self
    }

    /// Appends an ability.
    #[must_use]
    pub fn with_ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }
}

/// Hero state relevant to damage and lethal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroSnapshot {
    /// Health plus armor
    pub effective_health: i32,
    /// Tavern tier, added to combat damage
    pub tavern_tier: u8,
}

impl Default for HeroSnapshot {
    fn default() -> Self {
        Self {
            effective_health: 40,
            tavern_tier: 1,
        }
    }
}

/// Hero power identity, activation and auxiliary data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroPowerSnapshot {
    /// Card id; empty when the hero has none
    pub card_id: String,
    /// Used this turn
    #[serde(default)]
    pub activated: bool,
    /// First script data value
    #[serde(default)]
    pub data: i32,
    /// Second script data value
    #[serde(default)]
    pub data2: i32,
    /// Combat effect when activated
    #[serde(default)]
    pub effect: HeroPowerEffect,
}

/// A card in hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandCard {
    /// A minion card that may be summoned by combat effects.
    Minion {
        /// The minion it would summon
        minion: MinionSnapshot,
        /// False for cards marked unplayable
        can_summon: bool,
    },
    /// A blood gem.
    BloodGem,
    /// A spell.
    Spell,
    /// Any other identified card.
    Known {
        /// Its card id
        card_id: CardId,
    },
    /// A card whose identity is hidden.
    Unknown,
}

/// An active secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSnapshot {
    /// Card id
    pub card_id: CardId,
    /// What it does
    pub effect: SecretEffect,
}

/// Per-side counters that modify summoned minions and blood gems.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Eternal knights that died this game
    #[serde(default)]
    pub eternal_legion: i32,
    /// Extra attack for undead minions
    #[serde(default)]
    pub undead_attack_bonus: i32,
    /// Elementals played this game
    #[serde(default)]
    pub elemental_plays: i32,
    /// Extra attack granted by each blood gem
    #[serde(default)]
    pub blood_gem_attack: i32,
    /// Extra health granted by each blood gem
    #[serde(default)]
    pub blood_gem_health: i32,
}

/// Everything one side brings into combat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSnapshot {
    /// Minions, left to right
    pub minions: Vec<MinionSnapshot>,
    /// Hero
    #[serde(default)]
    pub hero: HeroSnapshot,
    /// Hero power
    #[serde(default)]
    pub hero_power: HeroPowerSnapshot,
    /// Hand, in hand order
    #[serde(default)]
    pub hand: Vec<HandCard>,
    /// Active secrets, in trigger priority order
    #[serde(default)]
    pub secrets: Vec<SecretSnapshot>,
    /// Counters
    #[serde(default)]
    pub counters: Counters,
}

impl SideSnapshot {
    /// A side with the given minions and defaults for everything else.
    #[must_use]
    pub fn new(minions: Vec<MinionSnapshot>) -> Self {
        Self {
            minions,
            ..Self::default()
        }
    }

    /// Sets hero health and tavern tier.
    #[must_use]
    pub fn with_hero(mut self, effective_health: i32, tavern_tier: u8) -> Self {
        self.hero = HeroSnapshot {
            effective_health,
            tavern_tier,
        };
        self
    }
}

/// Lobby-wide combat modifiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalModifiers {
    /// Maximum hero damage per combat; 0 means uncapped
    #[serde(default)]
    pub damage_cap: i32,
    /// Active anomaly
    #[serde(default)]
    pub anomaly: Option<AnomalySnapshot>,
    /// Tribes in the lobby
    #[serde(default)]
    pub available_tribes: Vec<Tribe>,
}

/// An active anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalySnapshot {
    /// Card id
    pub card_id: CardId,
    /// What it does in combat
    pub effect: AnomalyEffect,
}

/// Frozen description of both boards at combat start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    player: SideSnapshot,
    opponent: SideSnapshot,
    globals: GlobalModifiers,
    turn: u32,
}

impl BoardSnapshot {
    /// Creates a snapshot with no global modifiers on turn 0.
    #[must_use]
    pub fn new(player: SideSnapshot, opponent: SideSnapshot) -> Self {
        Self {
            player,
            opponent,
            globals: GlobalModifiers::default(),
            turn: 0,
        }
    }

    /// Sets the global modifiers.
    #[must_use]
    pub fn with_globals(mut self, globals: GlobalModifiers) -> Self {
        self.globals = globals;
        self
    }

    /// Sets the turn number.
    #[must_use]
    pub fn with_turn(mut self, turn: u32) -> Self {
        self.turn = turn;
        self
    }

    /// A copy of this snapshot with the opponent's hand replaced.
    #[must_use]
    pub fn with_opponent_hand(&self, hand: Vec<HandCard>) -> Self {
        let mut next = self.clone();
        next.opponent.hand = hand;
        next
    }

    /// A copy of this snapshot with the opponent's secrets replaced.
    #[must_use]
    pub fn with_opponent_secrets(&self, secrets: Vec<SecretSnapshot>) -> Self {
        let mut next = self.clone();
        next.opponent.secrets = secrets;
        next
    }

    /// The player's side.
    #[must_use]
    pub fn player(&self) -> &SideSnapshot {
        &self.player
    }

    /// The opponent's side.
    #[must_use]
    pub fn opponent(&self) -> &SideSnapshot {
        &self.opponent
    }

    /// Either side.
    #[must_use]
    pub fn side(&self, side: Side) -> &SideSnapshot {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    /// Global modifiers.
    #[must_use]
    pub fn globals(&self) -> &GlobalModifiers {
        &self.globals
    }

    /// Turn number the snapshot was taken on.
    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    /// True when either board has more than `threshold` minions.
    #[must_use]
    pub fn is_complex(&self, threshold: usize) -> bool {
        self.player.minions.len() > threshold || self.opponent.minions.len() > threshold
    }

    /// True when the opponent has secrets whose effect depends on information
    /// only revealed during combat.
    #[must_use]
    pub fn opponent_has_secrets(&self) -> bool {
        !self.opponent.secrets.is_empty()
    }
}
