//! Text command front end.
//!
//! Commands are a keyword followed by arguments. Arguments are split on
//! whitespace, with the last argument taking the rest of the line; when a
//! name itself has spaces, separate arguments with `|` instead:
//!
//! ```text
//! EXPLORE Gon high school
//! FIGHT Killua Zoldyck | Library Ghoul
//! ```
//!
//! [`CommandProcessor`] executes a parsed command against a [`GameService`]
//! and renders the reply. Errors never escape; they become a one-line message.

use std::sync::Arc;

use log::{debug, warn};

use crate::game::catalogue::enemy_names;
use crate::game::encounter::{EncounterSession, RoundOutcome, RoundReport};
use crate::game::errors::{ErrorKind, GameError};
use crate::game::locations::Location;
use crate::game::service::{GameService, Profile, SearchOutcome};
use crate::game::shop::format_shop_listing;
use crate::game::types::{CharacterRecord, NenType};
use crate::logutil::escape_log;
use crate::metrics;

#[derive(Debug, Clone, PartialEq)]
pub enum GameCommand {
    Create { name: String, nen: Option<String> },
    Delete(String),
    List,
    Rename { name: String, new_name: String },
    /// `None` clears the nickname.
    Nick { name: String, nickname: Option<String> },
    Profile(String),
    Explore { name: String, location: String },
    Leave(String),
    Locations,
    Shop,
    Buy { name: String, item: String },
    Sell { name: String, item: String },
    Remove { name: String, item: String },
    Heal { name: String, item: String },
    Roll(String),
    Encounter(String),
    Fight { name: String, enemy: String },
    Search(String),
    Attack(String),
    Flee(String),
    SetLevel { name: String, level: String },
    Choose(String),
    Weather,
    Help,
    /// Known keyword with bad arguments; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

/// Split `rest` into at most `max` arguments. See module docs.
fn split_args(rest: &str, max: usize) -> Vec<String> {
    let rest = rest.trim();
    if rest.is_empty() {
        return Vec::new();
    }
    if rest.contains('|') {
        return rest
            .splitn(max, '|')
            .map(|s| s.trim().to_string())
            .collect();
    }
    let collapsed = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.splitn(max, ' ').map(|s| s.to_string()).collect()
}

fn two_args(rest: &str) -> Option<(String, String)> {
    let mut args = split_args(rest, 2).into_iter();
    let first = args.next().filter(|s| !s.is_empty())?;
    let second = args.next().filter(|s| !s.is_empty())?;
    Some((first, second))
}

fn one_arg(rest: &str) -> Option<String> {
    let arg = rest.trim();
    if arg.is_empty() || arg.contains('|') {
        None
    } else {
        Some(arg.to_string())
    }
}

pub fn parse_command(input: &str) -> GameCommand {
    let input = input.trim();
    let (keyword, rest) = match input.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r),
        None => (input, ""),
    };
    let keyword = keyword.to_ascii_uppercase();

    macro_rules! named {
        ($variant:ident, $usage:expr) => {
            match one_arg(rest) {
                Some(name) => GameCommand::$variant(name),
                None => GameCommand::Usage($usage),
            }
        };
    }
    macro_rules! pair {
        ($variant:ident, $second:ident, $usage:expr) => {
            match two_args(rest) {
                Some((name, $second)) => GameCommand::$variant { name, $second },
                None => GameCommand::Usage($usage),
            }
        };
    }

    match keyword.as_str() {
        "CREATE" => create_command(rest),
        "DELETE" => named!(Delete, "Usage: DELETE <name>"),
        "LIST" | "CHARS" => GameCommand::List,
        "RENAME" => pair!(Rename, new_name, "Usage: RENAME <name> <new name>"),
        "NICK" => {
            let args = split_args(rest, 2);
            match args.as_slice() {
                [name] if !name.is_empty() => GameCommand::Nick {
                    name: name.clone(),
                    nickname: None,
                },
                [name, nick] if !name.is_empty() && !nick.is_empty() => GameCommand::Nick {
                    name: name.clone(),
                    nickname: Some(nick.clone()),
                },
                _ => GameCommand::Usage("Usage: NICK <name> [nickname]"),
            }
        }
        "PROFILE" | "STATS" | "INV" => named!(Profile, "Usage: PROFILE <name>"),
        "EXPLORE" | "GO" => pair!(Explore, location, "Usage: EXPLORE <name> <area>"),
        "LEAVE" => named!(Leave, "Usage: LEAVE <name>"),
        "LOCATIONS" | "AREAS" => GameCommand::Locations,
        "SHOP" => GameCommand::Shop,
        "BUY" => pair!(Buy, item, "Usage: BUY <name> <item>"),
        "SELL" => pair!(Sell, item, "Usage: SELL <name> <item>"),
        "REMOVE" | "DISCARD" => pair!(Remove, item, "Usage: REMOVE <name> <item>"),
        "HEAL" | "USE" => pair!(Heal, item, "Usage: HEAL <name> <item>"),
        "ROLL" => match one_arg(rest) {
            Some(expr) => GameCommand::Roll(expr),
            None => GameCommand::Roll("1d20".to_string()),
        },
        "ENCOUNTER" => named!(Encounter, "Usage: ENCOUNTER <name>"),
        "FIGHT" => pair!(Fight, enemy, "Usage: FIGHT <name> <enemy>"),
        "SEARCH" | "LOOT" => named!(Search, "Usage: SEARCH <name>"),
        "ATTACK" | "A" => named!(Attack, "Usage: ATTACK <name>"),
        "FLEE" | "RUN" => named!(Flee, "Usage: FLEE <name>"),
        "SETLEVEL" => pair!(SetLevel, level, "Usage: SETLEVEL <name> <level>"),
        "CHOOSE" => {
            if rest.trim().is_empty() {
                GameCommand::Usage("Usage: CHOOSE a, b, c")
            } else {
                GameCommand::Choose(rest.trim().to_string())
            }
        }
        "WEATHER" => GameCommand::Weather,
        "HELP" | "?" => GameCommand::Help,
        _ => GameCommand::Unknown(input.to_string()),
    }
}

/// `CREATE <name> [nen]`. A trailing word that names a Nen type is taken as the type.
fn create_command(rest: &str) -> GameCommand {
    const USAGE: &str = "Usage: CREATE <name> [nen type]";
    if rest.contains('|') {
        return match two_args(rest) {
            Some((name, nen)) => GameCommand::Create {
                name,
                nen: Some(nen),
            },
            None => GameCommand::Usage(USAGE),
        };
    }
    let words: Vec<&str> = rest.split_whitespace().collect();
    match words.as_slice() {
        [] => GameCommand::Usage(USAGE),
        [.., last] if words.len() > 1 && NenType::parse(last).is_some() => GameCommand::Create {
            name: words[..words.len() - 1].join(" "),
            nen: Some(last.to_string()),
        },
        _ => GameCommand::Create {
            name: words.join(" "),
            nen: None,
        },
    }
}

pub const HELP_TEXT: &str = "\
Characters: CREATE <name> [nen], LIST, PROFILE <name>, RENAME <name> <new>, NICK <name> [nick], DELETE <name>
Areas: LOCATIONS, EXPLORE <name> <area>, LEAVE <name>, SEARCH <name>
Combat: ENCOUNTER <name>, FIGHT <name> <enemy>, ATTACK <name>, FLEE <name>
Items: SHOP, BUY/SELL/REMOVE/HEAL <name> <item>
Fun: ROLL [NdM], CHOOSE a, b, c, WEATHER
Use | between arguments that contain spaces.";

/// Runs parsed commands for one owner and renders replies.
pub struct CommandProcessor {
    service: Arc<GameService>,
}

impl CommandProcessor {
    pub fn new(service: Arc<GameService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &GameService {
        &self.service
    }

    /// Parse, execute and render. Always returns a reply.
    pub fn handle(&self, owner: &str, input: &str) -> String {
        let command = parse_command(input);
        debug!(
            "command from {}: {}",
            escape_log(owner),
            escape_log(input)
        );
        let result = self.execute(owner, command);
        metrics::inc_commands(result.is_err());
        match result {
            Ok(reply) => reply,
            Err(err) => {
                if err.kind() == ErrorKind::StorageUnavailable {
                    warn!("command failed for {}: {}", escape_log(owner), err);
                }
                err.user_message()
            }
        }
    }

    pub fn execute(&self, owner: &str, command: GameCommand) -> Result<String, GameError> {
        let svc = &self.service;
        match command {
            GameCommand::Create { name, nen } => {
                let c = svc.create_character(owner, &name, nen.as_deref())?;
                let mut out = format!(
                    "Created {} (Lv {}, {} HP, {} GP).",
                    c.name, c.level, c.hp, c.gp
                );
                if let Some(nen) = c.nen_type {
                    out.push_str(&format!(" Nen: {}.", nen));
                }
                out.push_str(&format!(" EXPLORE {} <area> to begin.", c.name));
                Ok(out)
            }
            GameCommand::Delete(name) => {
                let c = svc.delete_character(owner, &name)?;
                Ok(format!("{} has been deleted.", c.name))
            }
            GameCommand::List => {
                let characters = svc.list_characters(owner)?;
                if characters.is_empty() {
                    return Ok("You have no characters. CREATE <name> to make one.".to_string());
                }
                let mut out = String::from("Your characters:");
                for c in &characters {
                    out.push_str(&format!("\n- {}", summary_line(c)));
                }
                Ok(out)
            }
            GameCommand::Rename { name, new_name } => {
                let c = svc.rename_character(owner, &name, &new_name)?;
                Ok(format!("{} is now known as {}.", name, c.name))
            }
            GameCommand::Nick { name, nickname } => {
                let c = svc.set_nickname(owner, &name, nickname.as_deref())?;
                Ok(match &c.nickname {
                    Some(nick) => format!("{} will be called {}.", c.name, nick),
                    None => format!("Cleared {}'s nickname.", c.name),
                })
            }
            GameCommand::Profile(name) => Ok(render_profile(&svc.profile(owner, &name)?)),
            GameCommand::Explore { name, location } => {
                let report = svc.explore(owner, &name, &location)?;
                let profile = report.location.profile();
                let mut out = format!(
                    "{} enters the {}. {}",
                    report.character.display_name(),
                    report.location,
                    profile.description
                );
                if let Some(warning) = report.warning {
                    out.push_str(&format!("\n{}", warning));
                }
                let enemies = svc.store().enemies_in(report.location)?;
                let names = enemy_names(&enemies, report.location);
                if !names.is_empty() {
                    out.push_str(&format!("\nEnemies here: {}", names.join(", ")));
                }
                Ok(out)
            }
            GameCommand::Leave(name) => {
                let c = svc.leave(owner, &name)?;
                Ok(format!("{} heads home.", c.display_name()))
            }
            GameCommand::Locations => Ok(render_locations()),
            GameCommand::Shop => Ok(format_shop_listing()),
            GameCommand::Buy { name, item } => {
                let (c, item) = svc.buy(owner, &name, &item)?;
                Ok(format!(
                    "Bought {} for {} GP. {} GP left.",
                    item.name, item.value, c.gp
                ))
            }
            GameCommand::Sell { name, item } => {
                let sale = svc.sell(owner, &name, &item)?;
                Ok(format!(
                    "Sold {} for {} GP. {} GP now.",
                    sale.item.name, sale.refund, sale.character.gp
                ))
            }
            GameCommand::Remove { name, item } => {
                let item = svc.remove_item(owner, &name, &item)?;
                Ok(format!("Discarded {}.", item.name))
            }
            GameCommand::Heal { name, item } => {
                let report = svc.heal(owner, &name, &item)?;
                Ok(format!(
                    "Used {}: +{} HP ({}/{}).",
                    report.item.name,
                    report.healed,
                    report.character.hp,
                    report.character.max_hp()
                ))
            }
            GameCommand::Roll(expr) => {
                let roll = svc.roll(&expr)?;
                let dice: Vec<String> = roll.rolls.iter().map(|r| r.to_string()).collect();
                if roll.rolls.len() == 1 {
                    Ok(format!("Rolled {}: {}", roll.spec, roll.total))
                } else {
                    Ok(format!(
                        "Rolled {}: {} = {}",
                        roll.spec,
                        dice.join(" + "),
                        roll.total
                    ))
                }
            }
            GameCommand::Encounter(name) => match svc.random_encounter(owner, &name)? {
                Some(session) => Ok(render_encounter_start(&session)),
                None => Ok("Nothing stirs. This area is quiet.".to_string()),
            },
            GameCommand::Fight { name, enemy } => {
                let session = svc.fight(owner, &name, &enemy)?;
                Ok(render_encounter_start(&session))
            }
            GameCommand::Search(name) => match svc.search(owner, &name)? {
                SearchOutcome::Ambush(session) => Ok(format!(
                    "Ambush! {}",
                    render_encounter_start(&session)
                )),
                SearchOutcome::Found {
                    item,
                    xp_gained,
                    gp_gained,
                    leveled_up,
                    character,
                } => {
                    let mut out = format!(
                        "Found {}: {} (+{} XP, +{} GP)",
                        item.name, item.description, xp_gained, gp_gained
                    );
                    if leveled_up {
                        out.push_str(&format!("\nLevel up! Now level {}.", character.level));
                    }
                    Ok(out)
                }
                SearchOutcome::Nothing => Ok("You search around but find nothing.".to_string()),
            },
            GameCommand::Attack(name) => Ok(render_round(&svc.attack(owner, &name)?)),
            GameCommand::Flee(name) => Ok(render_round(&svc.flee(owner, &name)?)),
            GameCommand::SetLevel { name, level } => {
                let level: u8 = level.trim().parse().map_err(|_| {
                    GameError::Validation(format!("'{}' is not a level.", level.trim()))
                })?;
                let c = svc.set_level(owner, &name, level)?;
                Ok(format!("{} is now level {}.", c.name, c.level))
            }
            GameCommand::Choose(options) => Ok(format!("I choose: {}", svc.choose(&options)?)),
            GameCommand::Weather => Ok(format!("Current weather: {}", svc.weather())),
            GameCommand::Help => Ok(HELP_TEXT.to_string()),
            GameCommand::Usage(usage) => Ok(usage.to_string()),
            GameCommand::Unknown(input) => Ok(format!(
                "Unknown command '{}'. Type HELP.",
                input.split_whitespace().next().unwrap_or("")
            )),
        }
    }
}

fn summary_line(c: &CharacterRecord) -> String {
    let place = c
        .active_location
        .map(|l| l.name())
        .unwrap_or("home");
    format!(
        "{} Lv{} HP {}/{} GP {} @ {}",
        c.display_name(),
        c.level,
        c.hp,
        c.max_hp(),
        c.gp,
        place
    )
}

fn render_profile(profile: &Profile) -> String {
    let c = &profile.character;
    let mut out = format!("=== {} ===", c.name);
    if let Some(nick) = &c.nickname {
        out.push_str(&format!("\nAKA {}", nick));
    }
    if let Some(nen) = c.nen_type {
        out.push_str(&format!("\nNen: {}", nen));
    }
    out.push_str(&format!(
        "\nLevel {} | XP {}/{} | HP {}/{} | GP {}",
        c.level,
        c.xp,
        crate::game::progression::xp_required(c.level),
        c.hp,
        c.max_hp(),
        c.gp
    ));
    out.push_str(&format!(
        "\nArea: {}",
        c.active_location.map(|l| l.name()).unwrap_or("none")
    ));
    if c.is_knocked_out() {
        out.push_str("\nKnocked out! HEAL to recover.");
    }
    if let Some(session) = &profile.encounter {
        out.push_str(&format!(
            "\nFighting {} ({}/{} HP)",
            session.enemy_name, session.enemy_hp, session.max_enemy_hp
        ));
    }
    if profile.inventory.is_empty() {
        out.push_str("\nInventory: empty");
    } else {
        out.push_str("\nInventory:");
        for item in &profile.inventory {
            out.push_str(&format!("\n- {} ({} GP)", item.name, item.value));
            if item.hp_effect != 0 {
                out.push_str(&format!(" {:+} HP", item.hp_effect));
            }
        }
    }
    out
}

fn render_locations() -> String {
    let mut out = String::from("Areas:");
    for location in Location::ALL {
        let p = location.profile();
        out.push_str(&format!(
            "\n- {} (Lv {}+, enemy HP {}-{}, hits {}-{})",
            location,
            p.min_level,
            p.enemy_hp.start(),
            p.enemy_hp.end(),
            p.damage.start(),
            p.damage.end()
        ));
    }
    out
}

fn render_encounter_start(session: &EncounterSession) -> String {
    format!(
        "A {} appears! ({} HP)\n{}\nATTACK or FLEE?",
        session.enemy_name, session.enemy_hp, session.enemy_description
    )
}

fn render_round(report: &RoundReport) -> String {
    let s = &report.session;
    let mut out = match report.rolls {
        Some(rolls) => format!("You rolled {}, {} rolled {}. ", rolls.player, s.enemy_name, rolls.enemy),
        None => String::new(),
    };
    match &report.outcome {
        RoundOutcome::Tie => out.push_str("Stalemate! Nobody lands a hit."),
        RoundOutcome::PlayerHit { damage } => out.push_str(&format!(
            "You hit for {}. {} has {}/{} HP.",
            damage, s.enemy_name, s.enemy_hp, s.max_enemy_hp
        )),
        RoundOutcome::EnemyHit {
            damage,
            hp,
            critically_wounded,
        } => {
            out.push_str(&format!("{} hits you for {}. You have {} HP.", s.enemy_name, damage, hp));
            if *critically_wounded {
                out.push_str(" You're badly hurt! Consider FLEE.");
            }
        }
        RoundOutcome::Victory(v) => {
            out.push_str(&format!(
                "You hit for {} and defeat the {}! +{} XP.",
                v.damage, s.enemy_name, v.xp_gained
            ));
            if v.leveled_up {
                out.push_str(&format!(" Level up! Now level {}.", v.new_level));
            }
            if let Some(item) = &v.loot {
                out.push_str(&format!(" It dropped {}.", item.name));
            }
        }
        RoundOutcome::Defeat { damage } => out.push_str(&format!(
            "{} hits you for {}. You've been knocked out! HEAL to recover.",
            s.enemy_name, damage
        )),
        RoundOutcome::Fled => {
            out.push_str(&format!("You escape from the {}.", s.enemy_name))
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keywords_case_insensitively() {
        assert_eq!(parse_command("list"), GameCommand::List);
        assert_eq!(parse_command("  HeLp "), GameCommand::Help);
        assert_eq!(parse_command("weather"), GameCommand::Weather);
        assert_eq!(parse_command("attack Gon"), GameCommand::Attack("Gon".into()));
        assert!(matches!(parse_command("dance"), GameCommand::Unknown(_)));
    }

    #[test]
    fn last_argument_takes_the_rest() {
        assert_eq!(
            parse_command("explore Gon   high  school"),
            GameCommand::Explore {
                name: "Gon".into(),
                location: "high school".into()
            }
        );
        assert_eq!(
            parse_command("buy Gon Health Potion"),
            GameCommand::Buy {
                name: "Gon".into(),
                item: "Health Potion".into()
            }
        );
    }

    #[test]
    fn pipe_separates_multi_word_names() {
        assert_eq!(
            parse_command("fight Killua Zoldyck | Library Ghoul"),
            GameCommand::Fight {
                name: "Killua Zoldyck".into(),
                enemy: "Library Ghoul".into()
            }
        );
        assert_eq!(
            parse_command("rename Gon | Gon Freecss"),
            GameCommand::Rename {
                name: "Gon".into(),
                new_name: "Gon Freecss".into()
            }
        );
        assert!(matches!(parse_command("fight Gon |"), GameCommand::Usage(_)));
    }

    #[test]
    fn create_detects_trailing_nen_type() {
        assert_eq!(
            parse_command("create Killua Zoldyck transmuter"),
            GameCommand::Create {
                name: "Killua Zoldyck".into(),
                nen: Some("transmuter".into())
            }
        );
        assert_eq!(
            parse_command("create Gon Freecss"),
            GameCommand::Create {
                name: "Gon Freecss".into(),
                nen: None
            }
        );
        assert_eq!(
            parse_command("create Emitter"),
            GameCommand::Create {
                name: "Emitter".into(),
                nen: None
            }
        );
        assert!(matches!(parse_command("create"), GameCommand::Usage(_)));
    }

    #[test]
    fn missing_arguments_produce_usage() {
        assert!(matches!(parse_command("fight Gon"), GameCommand::Usage(_)));
        assert!(matches!(parse_command("delete"), GameCommand::Usage(_)));
        assert_eq!(parse_command("roll"), GameCommand::Roll("1d20".into()));
        assert_eq!(
            parse_command("nick Gon"),
            GameCommand::Nick {
                name: "Gon".into(),
                nickname: None
            }
        );
    }
}
