//! Command dispatch
//!
//! The first token of a line picks the command (case-insensitive); the rest
//! are its arguments. Every handler runs with the registry lock held, so it
//! sees and mutates a consistent world. Rejections become reply text; only a
//! failed reply to the issuer is an error.

use tracing::{debug, info};

use crate::game::outbox::SendError;
use crate::game::player::{GameRules, Player, PlayerId, Stat, Status};
use crate::game::registry::Registry;
use crate::game::systems::challenge::{self, AcceptError, ChallengeError};
use crate::game::systems::character::{self, CreateError};
use crate::game::systems::training::{self, TrainingError};
use crate::net::game_session::ShutdownFlag;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Reply failed: {0}")]
    Reply(#[from] SendError),
    #[error("Player {0} is not registered")]
    UnknownPlayer(PlayerId),
}

pub type CommandResult = Result<(), CommandError>;

type Handler = fn(&mut CommandContext<'_>, &[&str]) -> CommandResult;

const COMMANDS: &[(&str, Handler)] = &[
    ("quit", quit),
    ("who", who),
    ("commands", commands),
    ("shutdown", shutdown),
    ("say", say),
    ("chat", chat),
    ("emote", emote),
    ("create", create),
    ("score", score),
    ("train", train),
    ("str", train_stat),
    ("dex", train_stat),
    ("sta", train_stat),
    ("siz", train_stat),
    ("wit", train_stat),
    ("leave", leave),
    ("challenge", issue_challenge),
    ("accept", accept_challenge),
];

/// Everything a handler may touch while the lock is held
pub struct CommandContext<'a> {
    pub registry: &'a mut Registry,
    pub id: PlayerId,
    pub rules: &'a GameRules,
    pub shutdown: &'a ShutdownFlag,
    pub password: &'a str,
}

impl CommandContext<'_> {
    fn player(&self) -> Result<&Player, CommandError> {
        self.registry
            .get(self.id)
            .ok_or(CommandError::UnknownPlayer(self.id))
    }

    fn player_mut(&mut self) -> Result<&mut Player, CommandError> {
        self.registry
            .get_mut(self.id)
            .ok_or(CommandError::UnknownPlayer(self.id))
    }

    fn status(&self) -> Result<Status, CommandError> {
        self.player().map(Player::status)
    }

    fn name(&self) -> Result<String, CommandError> {
        self.player().map(|p| p.name().to_string())
    }

    /// Send a line to the issuer; a failure disconnects them
    fn reply(&mut self, text: impl Into<String>) -> CommandResult {
        self.registry.deliver(self.id, text)?;
        Ok(())
    }

    /// Send to every player with `status` except the issuer
    fn tell_status(&mut self, status: Status, text: &str) {
        self.registry
            .broadcast(text, |p| p.status() == status, Some(self.id));
    }
}

/// Run the command named by `tokens[0]`
pub fn dispatch(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    let Some(first) = tokens.first() else {
        return Ok(());
    };
    let status = ctx.status()?;
    let keyword = first.to_lowercase();
    debug!("{} ({}): {}", ctx.id, status, keyword);

    let handler = COMMANDS
        .iter()
        .find(|(name, _)| *name == keyword)
        .map(|(_, handler)| *handler);
    match handler {
        Some(handler) if status != Status::Fighting => handler(ctx, tokens),
        _ => unrecognised(ctx, tokens),
    }
}

/// Commands on offer for each status, as listed by `commands`
pub fn available(status: Status) -> Option<&'static str> {
    match status {
        Status::Crowd => Some("quit who commands say emote create"),
        Status::Citizen => Some("quit who commands shutdown say chat emote score train"),
        Status::Training => {
            Some("quit who commands shutdown say chat emote score str dex sta siz wit leave")
        }
        Status::Gladiator => Some("quit who commands say chat emote score challenge accept"),
        Status::Challenger => Some("quit who commands say chat emote score challenge"),
        Status::Fighting => None,
    }
}

fn plurality(count: usize) -> &'static str {
    if count == 1 {
        "person"
    } else {
        "people"
    }
}

fn unrecognised(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    let word = tokens.first().copied().unwrap_or_default();
    ctx.reply(format!(
        "Unrecognised command '{}'. Type 'commands' to list available options.",
        word
    ))
}

fn quit(ctx: &mut CommandContext<'_>, _tokens: &[&str]) -> CommandResult {
    ctx.registry.disconnect(ctx.id);
    Ok(())
}

fn who(ctx: &mut CommandContext<'_>, _tokens: &[&str]) -> CommandResult {
    let mut lines: Vec<(String, String)> = ctx
        .registry
        .players()
        .filter(|p| p.is_visible())
        .map(|p| {
            let line = format!(
                "{} (Won:{} Lost:{} Kills:{})",
                p.name(),
                p.record.wins,
                p.record.losses,
                p.record.kills
            );
            (p.name().to_string(), line)
        })
        .collect();
    lines.sort();

    let visible = lines.len();
    let crowd = ctx.registry.len() - visible;
    for (_, line) in lines {
        ctx.reply(line)?;
    }
    ctx.reply(format!(
        "Total of {} visible {}, with {} other {} in the crowd.",
        visible,
        plurality(visible),
        crowd,
        plurality(crowd)
    ))
}

fn commands(ctx: &mut CommandContext<'_>, _tokens: &[&str]) -> CommandResult {
    match available(ctx.status()?) {
        Some(list) => ctx.reply(list),
        None => Ok(()),
    }
}

fn shutdown(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if ctx.status()? == Status::Crowd {
        return unrecognised(ctx, tokens);
    }
    let Some(password) = tokens.get(1) else {
        return ctx.reply("Syntax: shutdown <password>");
    };
    if *password != ctx.password {
        return ctx.reply("Incorrect password.");
    }

    let name = ctx.name()?;
    if ctx.shutdown.request(name.clone()) {
        info!("Shutdown requested by {}", name);
    }
    Ok(())
}

fn say(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if tokens.len() == 1 {
        return ctx.reply("Syntax: say <sentence>");
    }
    let text = tokens[1..].join(" ");
    let status = ctx.status()?;
    let name = ctx.name()?;
    ctx.tell_status(status, &format!("{} says '{}'", name, text));
    ctx.reply(format!("You say '{}'", text))
}

fn chat(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if ctx.status()? == Status::Crowd {
        return unrecognised(ctx, tokens);
    }
    if tokens.len() == 1 {
        return ctx.reply("Syntax: chat <sentence>");
    }
    let text = tokens[1..].join(" ");
    let name = ctx.name()?;
    ctx.registry.broadcast(
        &format!("{} chats '{}'", name, text),
        Player::is_visible,
        Some(ctx.id),
    );
    ctx.reply(format!("You chat '{}'", text))
}

fn emote(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if tokens.len() == 1 {
        return ctx.reply("Syntax: emote <action>");
    }
    let status = ctx.status()?;
    let name = ctx.name()?;
    // The issuer sees their own emote
    ctx.registry.broadcast(
        &format!("{} {}", name, tokens[1..].join(" ")),
        |p| p.status() == status,
        None,
    );
    Ok(())
}

fn create(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if ctx.status()? != Status::Crowd {
        return unrecognised(ctx, tokens);
    }
    let Some(requested) = tokens.get(1) else {
        return ctx.reply("Syntax: create <name>");
    };

    match character::create(ctx.registry, ctx.id, requested) {
        Ok(name) => {
            ctx.registry.broadcast(
                &format!("{} steps from the crowd.", name),
                |_| true,
                Some(ctx.id),
            );
            ctx.reply("You step from the crowd.")
        }
        Err(e @ (CreateError::BadLength | CreateError::NameTaken)) => ctx.reply(e.to_string()),
        Err(CreateError::Transition(_)) => unrecognised(ctx, tokens),
        Err(CreateError::UnknownPlayer(id)) => Err(CommandError::UnknownPlayer(id)),
    }
}

fn score(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if ctx.status()? == Status::Crowd {
        return unrecognised(ctx, tokens);
    }
    let card = score_card(ctx.player()?);
    ctx.reply(card)
}

fn score_card(p: &Player) -> String {
    format!(
        "<<<<<===--------[ Score ]--------===>>>>>\n\
         \tName:{}\n\
         \tWin-Loss-Kill: {} - {} - {}\n\
         <<<<<===-------------------------===>>>>>\n\
         \tStr:{} Dex:{} Sta:{} Siz:{} Wit:{}\n\
         \tAtt:{} Def:{} Dam:{}\n\
         \tWounds:{} ({}) Speed:{}\n\
         <<<<<===-------------------------===>>>>>",
        p.name(),
        p.record.wins,
        p.record.losses,
        p.record.kills,
        p.stats.get(Stat::Str),
        p.stats.get(Stat::Dex),
        p.stats.get(Stat::Sta),
        p.stats.get(Stat::Siz),
        p.stats.get(Stat::Wit),
        p.attack(),
        p.defence(),
        p.damage(),
        p.wounds(),
        p.health(),
        p.speed()
    )
}

fn train(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if ctx.status()? != Status::Citizen {
        return unrecognised(ctx, tokens);
    }
    if training::enter(ctx.player_mut()?).is_err() {
        return unrecognised(ctx, tokens);
    }

    let name = ctx.name()?;
    ctx.tell_status(Status::Citizen, &format!("{} walks to the training room.", name));
    ctx.tell_status(Status::Training, &format!("{} enters the training room.", name));
    ctx.reply("You walk to the training room.  To get back, type 'leave'.")
}

fn train_stat(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    let stat = match Stat::from_keyword(tokens[0]) {
        Some(stat) if ctx.status()? == Status::Training => stat,
        _ => return unrecognised(ctx, tokens),
    };
    let rules = ctx.rules;

    match training::train(ctx.player_mut()?, stat, rules) {
        Ok(value) => {
            let left = ctx.player()?.stats_left(rules);
            ctx.reply(format!(
                "{} trained to {} ({} points left).",
                stat.name(),
                value,
                left
            ))
        }
        Err(TrainingError::Train(e)) => ctx.reply(e.to_string()),
        Err(TrainingError::NotTraining(_)) => unrecognised(ctx, tokens),
    }
}

fn leave(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if ctx.status()? != Status::Training {
        return unrecognised(ctx, tokens);
    }
    let rules = ctx.rules;
    let now = match training::leave(ctx.player_mut()?, rules) {
        Ok(status) => status,
        Err(_) => return unrecognised(ctx, tokens),
    };

    let name = ctx.name()?;
    debug!("{} left training as {}", name, now);
    ctx.tell_status(Status::Training, &format!("{} leaves the training room.", name));
    let arrival = format!("{} arrives from the training room.", name);
    ctx.tell_status(Status::Citizen, &arrival);
    ctx.tell_status(Status::Gladiator, &arrival);
    ctx.reply("You leave the training room.")
}

fn issue_challenge(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if !ctx.status()?.is_duelist() {
        return unrecognised(ctx, tokens);
    }
    let Some(target_name) = tokens.get(1) else {
        return ctx.reply("Syntax: challenge <gladiator>");
    };

    match challenge::challenge(ctx.registry, ctx.id, target_name) {
        Ok(target) => {
            let name = ctx.name()?;
            if ctx
                .registry
                .deliver(target, format!("{} challenges you to a fight.", name))
                .is_err()
            {
                return Ok(());
            }
            let opponent = ctx
                .registry
                .get(target)
                .map(|p| p.name().to_string())
                .unwrap_or_default();
            ctx.reply(format!("You challenge {} to a fight.", opponent))
        }
        Err(
            e @ (ChallengeError::NoSuchGladiator(_)
            | ChallengeError::TargetNotGladiator
            | ChallengeError::SelfChallenge),
        ) => ctx.reply(e.to_string()),
        Err(ChallengeError::NotADuelist(_)) => unrecognised(ctx, tokens),
        Err(ChallengeError::UnknownPlayer(id)) => Err(CommandError::UnknownPlayer(id)),
    }
}

fn accept_challenge(ctx: &mut CommandContext<'_>, tokens: &[&str]) -> CommandResult {
    if !ctx.status()?.is_duelist() {
        return unrecognised(ctx, tokens);
    }
    let challenger = match challenge::pending_challenger(ctx.registry, ctx.id) {
        Ok(challenger) => challenger,
        Err(e) => return reject_accept(ctx, tokens, e),
    };

    // Tell the challenger first; if they are gone nothing changes
    let name = ctx.name()?;
    if ctx
        .registry
        .deliver(challenger, format!("{} accepts your challenge!", name))
        .is_err()
    {
        return Ok(());
    }
    if let Err(e) = challenge::accept(ctx.registry, ctx.id) {
        return reject_accept(ctx, tokens, e);
    }

    let opponent = ctx
        .registry
        .get(challenger)
        .map(|p| p.name().to_string())
        .unwrap_or_default();
    info!("{} and {} entered the arena", name, opponent);
    ctx.registry.broadcast(
        &format!("[{} and {} have entered the arena]", name, opponent),
        |_| true,
        None,
    );
    ctx.reply("Ok.")
}

fn reject_accept(ctx: &mut CommandContext<'_>, tokens: &[&str], error: AcceptError) -> CommandResult {
    match error {
        AcceptError::NotChallenged => ctx.reply(error.to_string()),
        AcceptError::NotADuelist(_) => unrecognised(ctx, tokens),
        AcceptError::UnknownPlayer(id) => Err(CommandError::UnknownPlayer(id)),
    }
}
