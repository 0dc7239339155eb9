//! Card identity, keywords and the declarative effect table.
//!
//! Everything card-specific lives here as data. The resolver never matches on a
//! card id; it only interprets the structured effects a [`CardDefinition`]
//! carries.
//!
//! - [`CardId`]: Cheaply clonable card identifier
//! - [`Keywords`]: Combat keyword flags
//! - [`Tribe`]: Minion type used by tribe-filtered effects
//! - [`effects`]: Deathrattles, abilities, secrets, hero powers, anomalies
//! - [`table`]: The card id to definition lookup

pub mod effects;
pub mod table;

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub use effects::{
    Ability, AnomalyEffect, Deathrattle, HeroPowerEffect, Scaling, SecretEffect, TokenSpec,
};
pub use table::{Attachment, CardDefinition, CardTable, HeroPowerDefinition};

/// Card id used by the log layer for cards it has not identified yet.
pub const UNKNOWN_CARD_ID: &str = "unknown";

/// Identifier of a card in the external card database.
///
/// Wraps an `Arc<str>` so combat state can copy ids around without allocating.
///
/// # Example
///
/// ```
/// use brawl_core::card::CardId;
///
/// let id = CardId::new("harvest_golem");
/// assert_eq!(id.as_str(), "harvest_golem");
/// assert_eq!(id.clone(), id);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CardId(Arc<str>);

impl CardId {
    /// Creates a card id from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(Arc::from(id))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the placeholder id of an unidentified card, or an empty id.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0.is_empty() || &*self.0 == UNKNOWN_CARD_ID
    }
}

impl fmt::Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardId({})", self.0)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CardId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.0.to_string()
    }
}

bitflags! {
    /// Combat keywords carried by a minion.
    ///
    /// `VENOMOUS` behaves like `POISONOUS` but is spent the first time it
    /// destroys something. `MEGA_WINDFURY` grants four attacks per turn and
    /// takes precedence over `WINDFURY`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Keywords: u16 {
        /// Must be attacked before non-taunt minions
        const TAUNT = 1 << 0;
        /// Absorbs the next instance of damage
        const DIVINE_SHIELD = 1 << 1;
        /// Destroys any minion it damages
        const POISONOUS = 1 << 2;
        /// Poisonous, consumed on first use
        const VENOMOUS = 1 << 3;
        /// Attacks twice
        const WINDFURY = 1 << 4;
        /// Attacks four times
        const MEGA_WINDFURY = 1 << 5;
        /// Cannot be targeted until it attacks
        const STEALTH = 1 << 6;
        /// Returns with 1 health the first time it dies
        const REBORN = 1 << 7;
        /// Also damages the minions next to its target
        const CLEAVE = 1 << 8;
    }
}

impl Keywords {
    /// Number of attacks this minion makes each time it is chosen to attack.
    #[must_use]
    pub fn strikes(self) -> u8 {
        if self.contains(Self::MEGA_WINDFURY) {
            4
        } else if self.contains(Self::WINDFURY) {
            2
        } else {
            1
        }
    }

    /// True when damage from this minion destroys its target.
    #[must_use]
    pub fn is_lethal_touch(self) -> bool {
        self.intersects(Self::POISONOUS | Self::VENOMOUS)
    }
}

/// Minion type.
///
/// `All` minions count as every tribe; `None` minions count as none.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tribe {
    /// No tribe
    #[default]
    None,
    /// Beast
    Beast,
    /// Demon
    Demon,
    /// Dragon
    Dragon,
    /// Elemental
    Elemental,
    /// Mech
    Mech,
    /// Murloc
    Murloc,
    /// Naga
    Naga,
    /// Pirate
    Pirate,
    /// Quilboar
    Quilboar,
    /// Undead
    Undead,
    /// Every tribe at once
    All,
}

impl Tribe {
    /// True when a minion of this tribe satisfies a `filter`.
    ///
    /// A `None` filter matches any minion.
    #[must_use]
    pub fn matches(self, filter: Tribe) -> bool {
        match (self, filter) {
            (_, Tribe::None) | (Tribe::All, _) => true,
            (Tribe::None, _) => false,
            (tribe, filter) => tribe == filter || filter == Tribe::All,
        }
    }
}

impl fmt::Display for Tribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Beast => "Beast",
            Self::Demon => "Demon",
            Self::Dragon => "Dragon",
            Self::Elemental => "Elemental",
            Self::Mech => "Mech",
            Self::Murloc => "Murloc",
            Self::Naga => "Naga",
            Self::Pirate => "Pirate",
            Self::Quilboar => "Quilboar",
            Self::Undead => "Undead",
            Self::All => "All",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strikes_follow_windfury_precedence() {
        assert_eq!(Keywords::empty().strikes(), 1);
        assert_eq!(Keywords::WINDFURY.strikes(), 2);
        assert_eq!((Keywords::WINDFURY | Keywords::MEGA_WINDFURY).strikes(), 4);
    }

    #[test]
    fn venomous_counts_as_lethal_touch() {
        assert!(Keywords::VENOMOUS.is_lethal_touch());
        assert!(Keywords::POISONOUS.is_lethal_touch());
        assert!(!Keywords::TAUNT.is_lethal_touch());
    }

    #[test]
    fn tribe_matching() {
        assert!(Tribe::Beast.matches(Tribe::None));
        assert!(Tribe::Beast.matches(Tribe::Beast));
        assert!(!Tribe::Beast.matches(Tribe::Mech));
        assert!(Tribe::All.matches(Tribe::Undead));
        assert!(!Tribe::None.matches(Tribe::Undead));
    }

    #[test]
    fn unknown_card_ids() {
        assert!(CardId::new(UNKNOWN_CARD_ID).is_unknown());
        assert!(CardId::new("").is_unknown());
        assert!(!CardId::new("kaboom_bot").is_unknown());
    }

    #[test]
    fn card_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&CardId::new("imp")).unwrap();
        assert_eq!(json, "\"imp\"");
        let back: CardId = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "imp");
    }
}
