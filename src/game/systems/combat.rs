//! Combat tick
//!
//! Once per tick every registered player gains one speed tick; fighters gain
//! a second one. A fighter whose counter exceeds `Speed() + 3` spends it on
//! one attack exchange against their opponent.

use tracing::{debug, info};

use crate::game::constants::combat::{FULL_HIT_THRESHOLD, HIT_THRESHOLD, SPEED_SLACK};
use crate::game::dice::Dice;
use crate::game::player::{PlayerId, Status};
use crate::game::registry::Registry;
use crate::game::transition::Event;

/// How an attack landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blow {
    Miss,
    Punch,
    Kick,
}

impl Blow {
    /// Classify a contest result
    pub fn from_result(result: i32) -> Self {
        if result < HIT_THRESHOLD {
            Blow::Miss
        } else if result < FULL_HIT_THRESHOLD {
            Blow::Punch
        } else {
            Blow::Kick
        }
    }

    /// Damage dealt given the attacker's full damage
    pub fn damage(self, full: u16) -> u16 {
        match self {
            Blow::Miss => 0,
            Blow::Punch => full / 2,
            Blow::Kick => full,
        }
    }

    /// Verb from the attacker's side
    pub fn verb(self) -> &'static str {
        match self {
            Blow::Miss => "miss",
            Blow::Punch => "punch",
            Blow::Kick => "kick",
        }
    }

    /// Verb from the defender's side
    pub fn third_person(self) -> &'static str {
        match self {
            Blow::Miss => "misses",
            Blow::Punch => "punches",
            Blow::Kick => "kicks",
        }
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Attack exchanges resolved
    pub exchanges: usize,
    /// Fights ended by a kill
    pub kills: usize,
    /// Fights ended because the opponent vanished
    pub forfeits: usize,
}

/// Contest value: `attack + rnd + rnd - defence - rnd`
pub fn contest(attack: u16, defence: u16, dice: &mut impl Dice) -> i32 {
    let first = i32::from(dice.roll());
    let second = i32::from(dice.roll());
    let third = i32::from(dice.roll());
    i32::from(attack) + first + second - i32::from(defence) - third
}

/// Advance every player's speed counter and resolve due exchanges
///
/// The caller holds the registry lock for the whole pass. Each player present
/// at the start of the tick is visited once; anyone disconnected mid-tick by
/// a failed send is skipped.
pub fn tick(registry: &mut Registry, dice: &mut impl Dice) -> TickReport {
    let mut report = TickReport::default();

    for id in registry.ids() {
        let Some(player) = registry.get_mut(id) else {
            continue;
        };

        player.spd = player.spd.saturating_add(1);
        if player.status() != Status::Fighting {
            continue;
        }
        player.spd = player.spd.saturating_add(1);
        if player.spd <= player.speed() + SPEED_SLACK {
            continue;
        }
        player.spd = 0;

        let opponent = player.opponent();
        match opponent.filter(|opp| is_engaged(registry, *opp, id)) {
            Some(opp) => {
                report.exchanges += 1;
                if exchange(registry, id, opp, dice) {
                    report.kills += 1;
                }
            }
            None => {
                forfeit(registry, id);
                report.forfeits += 1;
            }
        }
    }
    report
}

/// The opponent is still in the arena with `attacker`
fn is_engaged(registry: &Registry, opponent: PlayerId, attacker: PlayerId) -> bool {
    registry
        .get(opponent)
        .is_some_and(|p| p.status() == Status::Fighting && p.opponent() == Some(attacker))
}

/// The opponent is gone; the attacker wins by default
fn forfeit(registry: &mut Registry, id: PlayerId) {
    if let Some(player) = registry.get_mut(id) {
        if player.apply(Event::FightOver).is_ok() {
            player.record.kills += 1;
            player.record.wins += 1;
            player.set_opponent(None);
            info!("{} wins by default", player.name());
        }
    }
    let _ = registry.deliver(id, "Your opponent has vanished into the crowd.");
}

/// Resolve one exchange; returns whether it was lethal
fn exchange(registry: &mut Registry, attacker: PlayerId, defender: PlayerId, dice: &mut impl Dice) -> bool {
    let (Some(a), Some(d)) = (registry.get(attacker), registry.get(defender)) else {
        return false;
    };
    let (attack, full_damage) = (a.attack(), a.damage());
    let attacker_name = a.name().to_string();
    let defender_name = d.name().to_string();

    let result = contest(attack, d.defence(), dice);
    let blow = Blow::from_result(result);
    let dealt = blow.damage(full_damage);

    let lethal = match registry.get_mut(defender) {
        Some(d) => {
            d.dam = d.dam.saturating_add(dealt);
            d.dam > d.health()
        }
        None => false,
    };
    debug!(
        "{} vs {}: result {} ({:?}), {} damage",
        attacker_name, defender_name, result, blow, dealt
    );

    if lethal {
        if let Some(winner) = registry.get_mut(attacker) {
            if winner.apply(Event::FightOver).is_ok() {
                winner.record.kills += 1;
                winner.record.wins += 1;
                winner.set_opponent(None);
            }
        }
        if let Some(loser) = registry.get_mut(defender) {
            if loser.apply(Event::FightOver).is_ok() {
                loser.record.losses += 1;
                loser.set_opponent(None);
            }
        }
        info!("{} has killed {}", attacker_name, defender_name);
    }

    let _ = registry.deliver(attacker, format!("You {} your opponent!", blow.verb()));
    let _ = registry.deliver(defender, format!("Your opponent {} you!", blow.third_person()));
    if lethal {
        registry.broadcast(
            &format!("[{} has killed {} in the arena!]", attacker_name, defender_name),
            |_| true,
            None,
        );
    }
    lethal
}
