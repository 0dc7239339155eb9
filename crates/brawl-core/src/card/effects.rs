//! Structured effects interpreted by the combat resolver.
//!
//! Each effect is plain data. Values are for the regular version of a card;
//! golden versions list their own effects in the card table.

use serde::{Deserialize, Serialize};

use super::{CardId, Keywords, Tribe};

/// Extra stats applied to a summoned token from a per-side counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Summoned with the listed stats
    #[default]
    None,
    /// +1/+1 for every eternal knight that died this game
    EternalLegion,
    /// +1/+1 for every elemental played this game
    ElementalPlays,
}

/// A minion created during combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSpec {
    /// Card id of the token
    pub card_id: CardId,
    /// Base attack
    pub attack: i32,
    /// Base health
    pub health: i32,
    /// Tavern tier, used for hero damage
    #[serde(default = "default_tier")]
    pub tier: u8,
    /// Token tribe
    #[serde(default)]
    pub tribe: Tribe,
    /// Keywords the token is summoned with
    #[serde(default)]
    pub keywords: Keywords,
    /// Counter-based stat bonus
    #[serde(default)]
    pub scaling: Scaling,
}

fn default_tier() -> u8 {
    1
}

impl TokenSpec {
    /// A vanilla tier 1 token.
    #[must_use]
    pub fn new(card_id: &str, attack: i32, health: i32) -> Self {
        Self {
            card_id: CardId::new(card_id),
            attack,
            health,
            tier: 1,
            tribe: Tribe::None,
            keywords: Keywords::empty(),
            scaling: Scaling::None,
        }
    }

    /// Sets the token tribe.
    #[must_use]
    pub fn with_tribe(mut self, tribe: Tribe) -> Self {
        self.tribe = tribe;
        self
    }

    /// Adds keywords to the token.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Keywords) -> Self {
        self.keywords |= keywords;
        self
    }

    /// Sets counter-based scaling.
    #[must_use]
    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }
}

/// Effect that fires when its minion dies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Deathrattle {
    /// Summon `count` copies of a token where the minion died.
    Summon {
        /// Token to summon
        token: TokenSpec,
        /// Number of copies
        count: u8,
    },
    /// Deal damage to a random enemy minion, `times` times.
    DamageRandomEnemy {
        /// Damage per hit
        amount: i32,
        /// Number of hits
        times: u8,
    },
    /// Give a random friendly minion stats.
    BuffRandomFriendly {
        /// Attack bonus
        attack: i32,
        /// Health bonus
        health: i32,
    },
    /// Give every friendly minion stats.
    BuffAllFriendly {
        /// Attack bonus
        attack: i32,
        /// Health bonus
        health: i32,
    },
    /// Give a random friendly minion without one a divine shield.
    ShieldRandomFriendly,
    /// Play blood gems on random friendly minions.
    BloodGems {
        /// Number of gems
        count: u8,
    },
    /// Summon the first summonable minion from hand.
    SummonFromHand,
    /// An effect the resolver cannot model.
    Unsupported {
        /// What is not modelled
        reason: String,
    },
}

/// Triggered ability of a living minion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Ability {
    /// At the start of combat, deal damage to a random enemy minion.
    StartOfCombatDamage {
        /// Damage dealt
        amount: i32,
    },
    /// Gain stats whenever a friendly minion of `tribe` dies.
    GrowOnFriendlyDeath {
        /// Attack gained
        attack: i32,
        /// Health gained
        health: i32,
        /// Tribe filter; `None` counts every friendly death
        #[serde(default)]
        tribe: Tribe,
    },
    /// An ability the resolver cannot model.
    Unsupported {
        /// What is not modelled
        reason: String,
    },
}

/// Single-use combat secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SecretEffect {
    /// When a friendly minion is attacked, give it a divine shield.
    AutodefenseMatrix,
    /// When a friendly minion dies, return it with 1 health.
    Redemption,
    /// When a friendly minion dies, give a random friendly minion stats.
    Avenge {
        /// Attack bonus
        attack: i32,
        /// Health bonus
        health: i32,
    },
    /// When a friendly minion is attacked, summon three 1/1 snakes.
    SnakeTrap,
    /// When a friendly minion is attacked, summon a 2/3 poisonous cobra.
    VenomstrikeTrap,
    /// A secret the resolver cannot model.
    Unsupported {
        /// What is not modelled
        reason: String,
    },
}

/// Combat effect of an activated hero power.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeroPowerEffect {
    /// No effect during combat
    #[default]
    None,
    /// At the start of combat, deal damage to a random enemy minion.
    StartOfCombatDamage {
        /// Damage dealt
        amount: i32,
    },
    /// An activated effect the resolver cannot model.
    Unsupported {
        /// What is not modelled
        reason: String,
    },
}

/// Combat effect of the lobby-wide anomaly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyEffect {
    /// No effect during combat
    #[default]
    None,
    /// Extra damage dealt to the losing hero.
    BonusHeroDamage {
        /// Damage added before the cap
        amount: i32,
    },
    /// An anomaly the resolver cannot model.
    Unsupported {
        /// What is not modelled
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_builder_accumulates() {
        let token = TokenSpec::new("microbot", 1, 1)
            .with_tribe(Tribe::Mech)
            .with_keywords(Keywords::TAUNT)
            .with_scaling(Scaling::EternalLegion);
        assert_eq!(token.tribe, Tribe::Mech);
        assert!(token.keywords.contains(Keywords::TAUNT));
        assert_eq!(token.scaling, Scaling::EternalLegion);
    }

    #[test]
    fn deathrattle_json_is_tagged() {
        let json = r#"{"kind":"damage_random_enemy","amount":4,"times":1}"#;
        let dr: Deathrattle = serde_json::from_str(json).unwrap();
        assert_eq!(dr, Deathrattle::DamageRandomEnemy { amount: 4, times: 1 });
    }

    #[test]
    fn token_tier_defaults_to_one() {
        let json = r#"{"card_id":"plant","attack":1,"health":1}"#;
        let token: TokenSpec = serde_json::from_str(json).unwrap();
        assert_eq!(token.tier, 1);
        assert_eq!(token.scaling, Scaling::None);
    }
}
