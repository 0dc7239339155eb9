//! Card id to structured modifier lookup.
//!
//! The table is evaluated once per snapshot by the builder. A card missing from
//! the table is simulated as a vanilla minion using the stats and keyword tags
//! the log reported for it.

use std::borrow::Borrow;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::effects::{
    Ability, AnomalyEffect, Deathrattle, HeroPowerEffect, Scaling, SecretEffect, TokenSpec,
};
use super::{CardId, Keywords, Tribe};

impl Borrow<str> for CardId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

fn yes() -> bool {
    true
}

/// Structured description of a minion card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Display name
    pub name: String,
    /// Tavern tier
    #[serde(default)]
    pub tier: u8,
    /// Tribe
    #[serde(default)]
    pub tribe: Tribe,
    /// Vanilla attack of the regular version
    pub attack: i32,
    /// Vanilla health of the regular version
    pub health: i32,
    /// Keywords the log does not report as tags (cleave, mega-windfury)
    #[serde(default)]
    pub keywords: Keywords,
    /// False when the golden version has no implementation of its own and is
    /// simulated as the regular card with doubled vanilla stats
    #[serde(default = "yes")]
    pub premium_implemented: bool,
    /// Deathrattles of the regular version
    #[serde(default)]
    pub deathrattles: Vec<Deathrattle>,
    /// Deathrattles of the golden version, when they differ
    #[serde(default)]
    pub golden_deathrattles: Option<Vec<Deathrattle>>,
    /// Triggered abilities of the regular version
    #[serde(default)]
    pub abilities: Vec<Ability>,
    /// Triggered abilities of the golden version, when they differ
    #[serde(default)]
    pub golden_abilities: Option<Vec<Ability>>,
    /// Revealing this card in the opponent's hand warrants a re-run
    #[serde(default)]
    pub relevant_in_hand: bool,
    /// The resolver cannot simulate boards containing this card
    #[serde(default)]
    pub unsupported: bool,
}

impl CardDefinition {
    /// A minion definition with no effects.
    #[must_use]
    pub fn minion(name: &str, tier: u8, tribe: Tribe, attack: i32, health: i32) -> Self {
        Self {
            name: name.to_string(),
            tier,
            tribe,
            attack,
            health,
            keywords: Keywords::empty(),
            premium_implemented: true,
            deathrattles: Vec::new(),
            golden_deathrattles: None,
            abilities: Vec::new(),
            golden_abilities: None,
            relevant_in_hand: false,
            unsupported: false,
        }
    }

    /// Adds a deathrattle to the regular version.
    #[must_use]
    pub fn deathrattle(mut self, deathrattle: Deathrattle) -> Self {
        self.deathrattles.push(deathrattle);
        self
    }

    /// Adds a deathrattle to the golden version.
    #[must_use]
    pub fn golden_deathrattle(mut self, deathrattle: Deathrattle) -> Self {
        self.golden_deathrattles
            .get_or_insert_with(Vec::new)
            .push(deathrattle);
        self
    }

    /// Adds an ability to the regular version.
    #[must_use]
    pub fn ability(mut self, ability: Ability) -> Self {
        self.abilities.push(ability);
        self
    }

    /// Adds an ability to the golden version.
    #[must_use]
    pub fn golden_ability(mut self, ability: Ability) -> Self {
        self.golden_abilities
            .get_or_insert_with(Vec::new)
            .push(ability);
        self
    }

    /// Adds keywords the log does not report.
    #[must_use]
    pub fn keywords(mut self, keywords: Keywords) -> Self {
        self.keywords |= keywords;
        self
    }

    /// Marks the golden version as unimplemented.
    #[must_use]
    pub fn no_premium(mut self) -> Self {
        self.premium_implemented = false;
        self
    }

    /// Marks the card as relevant when revealed in hand.
    #[must_use]
    pub fn relevant_in_hand(mut self) -> Self {
        self.relevant_in_hand = true;
        self
    }

    /// Marks the card as unsupported.
    #[must_use]
    pub fn unsupported(mut self) -> Self {
        self.unsupported = true;
        self
    }

    /// Deathrattles for the regular or golden version.
    #[must_use]
    pub fn deathrattles_for(&self, golden: bool) -> &[Deathrattle] {
        match (&self.golden_deathrattles, golden) {
            (Some(list), true) => list,
            _ => &self.deathrattles,
        }
    }

    /// Abilities for the regular or golden version.
    #[must_use]
    pub fn abilities_for(&self, golden: bool) -> &[Ability] {
        match (&self.golden_abilities, golden) {
            (Some(list), true) => list,
            _ => &self.abilities,
        }
    }
}

/// Modifier contributed by an enchantment attached to a minion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    /// The minion gains reborn.
    Reborn,
    /// The minion gains an extra deathrattle.
    Deathrattle {
        /// The granted deathrattle
        deathrattle: Deathrattle,
    },
    /// The minion gains keywords.
    Keywords {
        /// The granted keywords
        keywords: Keywords,
    },
}

/// Structured description of a hero power.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroPowerDefinition {
    /// Display name
    pub name: String,
    /// Effect during combat when activated
    #[serde(default)]
    pub effect: HeroPowerEffect,
    /// Lethal predictions against this hero power are not trusted
    #[serde(default)]
    pub skip_lethal_validation: bool,
    /// A death of the hero holding this power is not trusted as a mismatch
    #[serde(default)]
    pub skip_death_validation: bool,
}

/// Lookup from card ids to structured modifiers.
///
/// # Example
///
/// ```
/// use brawl_core::card::CardTable;
///
/// let table = CardTable::standard();
/// let golem = table.card("harvest_golem").unwrap();
/// assert_eq!(golem.deathrattles.len(), 1);
/// assert!(table.card("not_a_card").is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardTable {
    #[serde(default)]
    cards: HashMap<CardId, CardDefinition>,
    #[serde(default)]
    attachments: HashMap<CardId, Attachment>,
    #[serde(default)]
    secrets: HashMap<CardId, SecretEffect>,
    #[serde(default)]
    hero_powers: HashMap<CardId, HeroPowerDefinition>,
    #[serde(default)]
    anomalies: HashMap<CardId, AnomalyEffect>,
}

impl CardTable {
    /// An empty table.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a table from JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the document does not describe a table.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Looks up a minion card.
    #[must_use]
    pub fn card(&self, id: &str) -> Option<&CardDefinition> {
        self.cards.get(id)
    }

    /// Looks up an enchantment.
    #[must_use]
    pub fn attachment(&self, id: &str) -> Option<&Attachment> {
        self.attachments.get(id)
    }

    /// Looks up a secret.
    #[must_use]
    pub fn secret(&self, id: &str) -> Option<&SecretEffect> {
        self.secrets.get(id)
    }

    /// Looks up a hero power.
    #[must_use]
    pub fn hero_power(&self, id: &str) -> Option<&HeroPowerDefinition> {
        self.hero_powers.get(id)
    }

    /// Looks up an anomaly.
    #[must_use]
    pub fn anomaly(&self, id: &str) -> Option<&AnomalyEffect> {
        self.anomalies.get(id)
    }

    /// Adds or replaces a minion card.
    pub fn insert_card(&mut self, id: &str, definition: CardDefinition) {
        self.cards.insert(CardId::new(id), definition);
    }

    /// Adds or replaces an enchantment.
    pub fn insert_attachment(&mut self, id: &str, attachment: Attachment) {
        self.attachments.insert(CardId::new(id), attachment);
    }

    /// Adds or replaces a secret.
    pub fn insert_secret(&mut self, id: &str, effect: SecretEffect) {
        self.secrets.insert(CardId::new(id), effect);
    }

    /// Adds or replaces a hero power.
    pub fn insert_hero_power(&mut self, id: &str, definition: HeroPowerDefinition) {
        self.hero_powers.insert(CardId::new(id), definition);
    }

    /// Adds or replaces an anomaly.
    pub fn insert_anomaly(&mut self, id: &str, effect: AnomalyEffect) {
        self.anomalies.insert(CardId::new(id), effect);
    }

    /// Number of minion cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// True when the table has no minion cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The built-in table of commonly seen cards.
    #[must_use]
    #[allow(clippy::too_many_lines)]
    pub fn standard() -> Self {
        let mut table = Self::empty();

        table.insert_card(
            "harvest_golem",
            CardDefinition::minion("Harvest Golem", 2, Tribe::Mech, 2, 3)
                .deathrattle(summon(TokenSpec::new("damaged_golem", 2, 1).with_tribe(Tribe::Mech), 1))
                .golden_deathrattle(summon(
                    TokenSpec::new("damaged_golem", 4, 2).with_tribe(Tribe::Mech),
                    1,
                )),
        );
        table.insert_card(
            "kaboom_bot",
            CardDefinition::minion("Kaboom Bot", 2, Tribe::Mech, 2, 2)
                .deathrattle(Deathrattle::DamageRandomEnemy { amount: 4, times: 1 })
                .golden_deathrattle(Deathrattle::DamageRandomEnemy { amount: 4, times: 2 }),
        );
        table.insert_card(
            "selfless_hero",
            CardDefinition::minion("Selfless Hero", 1, Tribe::None, 2, 1)
                .deathrattle(Deathrattle::ShieldRandomFriendly)
                .golden_deathrattle(Deathrattle::ShieldRandomFriendly)
                .golden_deathrattle(Deathrattle::ShieldRandomFriendly),
        );
        table.insert_card(
            "scavenging_hyena",
            CardDefinition::minion("Scavenging Hyena", 1, Tribe::Beast, 2, 2)
                .ability(Ability::GrowOnFriendlyDeath {
                    attack: 2,
                    health: 1,
                    tribe: Tribe::Beast,
                })
                .golden_ability(Ability::GrowOnFriendlyDeath {
                    attack: 4,
                    health: 2,
                    tribe: Tribe::Beast,
                }),
        );
        table.insert_card(
            "spawn_of_nzoth",
            CardDefinition::minion("Spawn of N'Zoth", 2, Tribe::None, 2, 2)
                .deathrattle(Deathrattle::BuffAllFriendly { attack: 1, health: 1 })
                .golden_deathrattle(Deathrattle::BuffAllFriendly { attack: 2, health: 2 }),
        );
        table.insert_card(
            "rat_pack",
            CardDefinition::minion("Rat Pack", 2, Tribe::Beast, 2, 2)
                .deathrattle(summon(TokenSpec::new("rat", 1, 1).with_tribe(Tribe::Beast), 2))
                .golden_deathrattle(summon(TokenSpec::new("rat", 2, 2).with_tribe(Tribe::Beast), 2)),
        );
        table.insert_card(
            "imprisoner",
            CardDefinition::minion("Imprisoner", 2, Tribe::Demon, 3, 3)
                .deathrattle(summon(TokenSpec::new("imp", 1, 1).with_tribe(Tribe::Demon), 1))
                .golden_deathrattle(summon(TokenSpec::new("imp", 2, 2).with_tribe(Tribe::Demon), 1)),
        );
        table.insert_card(
            "red_whelp",
            CardDefinition::minion("Red Whelp", 1, Tribe::Dragon, 1, 2)
                .ability(Ability::StartOfCombatDamage { amount: 1 })
                .golden_ability(Ability::StartOfCombatDamage { amount: 2 }),
        );
        table.insert_card(
            "cave_hydra",
            CardDefinition::minion("Cave Hydra", 4, Tribe::Beast, 2, 4)
                .keywords(Keywords::CLEAVE)
                .no_premium(),
        );
        table.insert_card(
            "foe_reaper_4000",
            CardDefinition::minion("Foe Reaper 4000", 6, Tribe::Mech, 6, 9)
                .keywords(Keywords::CLEAVE)
                .no_premium(),
        );
        table.insert_card(
            "zapp_slywick_golden",
            CardDefinition::minion("Zapp Slywick", 6, Tribe::None, 14, 20)
                .keywords(Keywords::MEGA_WINDFURY),
        );
        table.insert_card(
            "replicating_menace",
            CardDefinition::minion("Replicating Menace", 3, Tribe::Mech, 3, 1)
                .deathrattle(summon(microbot(1), 3))
                .golden_deathrattle(summon(microbot(2), 3)),
        );
        table.insert_card(
            "eternal_summoner",
            CardDefinition::minion("Eternal Summoner", 5, Tribe::Undead, 3, 1)
                .deathrattle(summon(eternal_knight(), 1))
                .golden_deathrattle(summon(eternal_knight(), 2)),
        );
        table.insert_card(
            "lich_summoner",
            CardDefinition::minion("Lich Summoner", 3, Tribe::Undead, 2, 4)
                .deathrattle(summon(TokenSpec::new("skeleton", 1, 1).with_tribe(Tribe::Undead), 2))
                .golden_deathrattle(summon(
                    TokenSpec::new("skeleton", 2, 2).with_tribe(Tribe::Undead),
                    2,
                )),
        );
        table.insert_card(
            "wildfire_conduit",
            CardDefinition::minion("Wildfire Conduit", 4, Tribe::Elemental, 4, 4).deathrattle(
                summon(
                    TokenSpec::new("ember", 2, 2)
                        .with_tribe(Tribe::Elemental)
                        .with_scaling(Scaling::ElementalPlays),
                    1,
                ),
            ),
        );
        table.insert_card(
            "gemsworn_boar",
            CardDefinition::minion("Gemsworn Boar", 3, Tribe::Quilboar, 3, 3)
                .deathrattle(Deathrattle::BloodGems { count: 2 })
                .golden_deathrattle(Deathrattle::BloodGems { count: 4 }),
        );
        table.insert_card(
            "reinforcement_caller",
            CardDefinition::minion("Reinforcement Caller", 4, Tribe::None, 3, 4)
                .deathrattle(Deathrattle::SummonFromHand)
                .golden_deathrattle(Deathrattle::SummonFromHand)
                .golden_deathrattle(Deathrattle::SummonFromHand),
        );
        table.insert_card(
            "unstable_portal",
            CardDefinition::minion("Unstable Portal", 3, Tribe::None, 2, 2).deathrattle(
                Deathrattle::Unsupported {
                    reason: "summons a random minion from the card pool".to_string(),
                },
            ),
        );
        table.insert_card(
            "free_flying_feathermane",
            CardDefinition::minion("Free-Flying Feathermane", 5, Tribe::Beast, 5, 5)
                .relevant_in_hand(),
        );
        table.insert_card(
            "professor_putricide_festergut",
            CardDefinition::minion("Festergut", 4, Tribe::Undead, 3, 6).unsupported(),
        );

        table.insert_attachment("reborn_rite_enchantment", Attachment::Reborn);
        table.insert_attachment(
            "replicating_menace_enchantment",
            Attachment::Deathrattle {
                deathrattle: summon(microbot(1), 3),
            },
        );
        table.insert_attachment(
            "replicating_menace_enchantment_golden",
            Attachment::Deathrattle {
                deathrattle: summon(microbot(2), 3),
            },
        );
        table.insert_attachment(
            "living_spores_enchantment",
            Attachment::Deathrattle {
                deathrattle: summon(TokenSpec::new("plant", 1, 1), 2),
            },
        );
        table.insert_attachment(
            "earth_invocation_enchantment",
            Attachment::Deathrattle {
                deathrattle: summon(
                    TokenSpec::new("earth_elemental", 1, 1).with_tribe(Tribe::Elemental),
                    1,
                ),
            },
        );

        table.insert_secret("autodefense_matrix", SecretEffect::AutodefenseMatrix);
        table.insert_secret("redemption", SecretEffect::Redemption);
        table.insert_secret(
            "avenge",
            SecretEffect::Avenge {
                attack: 3,
                health: 2,
            },
        );
        table.insert_secret("snake_trap", SecretEffect::SnakeTrap);
        table.insert_secret("venomstrike_trap", SecretEffect::VenomstrikeTrap);
        table.insert_secret(
            "ice_block",
            SecretEffect::Unsupported {
                reason: "prevents lethal damage to the hero".to_string(),
            },
        );

        table.insert_hero_power(
            "prestidigitation",
            HeroPowerDefinition {
                name: "Prestidigitation".to_string(),
                effect: HeroPowerEffect::None,
                skip_lethal_validation: true,
                skip_death_validation: false,
            },
        );
        table.insert_hero_power(
            "kel'thuzad",
            HeroPowerDefinition {
                name: "Kel'Thuzad".to_string(),
                effect: HeroPowerEffect::None,
                skip_lethal_validation: false,
                skip_death_validation: true,
            },
        );
        table.insert_hero_power(
            "reborn_rites",
            HeroPowerDefinition {
                name: "Reborn Rites".to_string(),
                ..HeroPowerDefinition::default()
            },
        );
        table.insert_hero_power(
            "opening_salvo",
            HeroPowerDefinition {
                name: "Opening Salvo".to_string(),
                effect: HeroPowerEffect::StartOfCombatDamage { amount: 3 },
                ..HeroPowerDefinition::default()
            },
        );
        table.insert_hero_power(
            "rapid_reanimation",
            HeroPowerDefinition {
                name: "Rapid Reanimation".to_string(),
                effect: HeroPowerEffect::Unsupported {
                    reason: "reanimation target is resolved outside combat".to_string(),
                },
                ..HeroPowerDefinition::default()
            },
        );

        table.insert_anomaly(
            "blood_in_the_water",
            AnomalyEffect::BonusHeroDamage { amount: 2 },
        );
        table.insert_anomaly(
            "shifting_sands",
            AnomalyEffect::Unsupported {
                reason: "rewrites minion stats between attacks".to_string(),
            },
        );

        table
    }
}

fn summon(token: TokenSpec, count: u8) -> Deathrattle {
    Deathrattle::Summon { token, count }
}

fn microbot(stats: i32) -> TokenSpec {
    TokenSpec::new("microbot", stats, stats).with_tribe(Tribe::Mech)
}

fn eternal_knight() -> TokenSpec {
    TokenSpec::new("eternal_knight", 4, 1)
        .with_tribe(Tribe::Undead)
        .with_scaling(Scaling::EternalLegion)
}
