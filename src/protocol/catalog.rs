//! Request presets for the replies that need a decoder.
//!
//! Each preset pairs a [`Command`] with the [`CastSpec`] that shapes its reply. The wider
//! command surface is built directly with [`Command`] and submitted without a cast.

use crate::protocol::cast::{CastSpec, Caster, Field, BOOLEAN, NUMBER};
use crate::protocol::command::Command;
use crate::protocol::multivalue::{
    admin_list, ban_list, map_indices, map_list, map_rounds, player_table, team_scores,
};

/// A command together with the shape of its successful reply.
#[derive(Debug, Clone)]
pub struct Request {
    pub command: Command,
    pub cast: Option<CastSpec>,
}

impl Request {
    pub fn new(command: Command, cast: Option<CastSpec>) -> Self {
        Self { command, cast }
    }

    pub fn into_parts(self) -> (Command, Option<CastSpec>) {
        (self.command, self.cast)
    }
}

/// Which players a `listPlayers` query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerSubset {
    All,
    Team(u8),
    Squad { team: u8, squad: u8 },
}

impl PlayerSubset {
    fn words(self) -> Vec<String> {
        match self {
            PlayerSubset::All => vec!["all".into()],
            PlayerSubset::Team(team) => vec!["team".into(), team.to_string()],
            PlayerSubset::Squad { team, squad } => {
                vec!["squad".into(), team.to_string(), squad.to_string()]
            }
        }
    }
}

pub fn version() -> Request {
    Request::new(
        Command::new("version"),
        Some(CastSpec::record([Field::text("game"), Field::cast("version", NUMBER)])),
    )
}

pub fn server_info() -> Request {
    Request::new(
        Command::new("serverInfo"),
        Some(CastSpec::record([
            Field::text("serverName"),
            Field::cast("currentPlayerCount", NUMBER),
            Field::cast("maxPlayerCount", NUMBER),
            Field::text("currentGameMode"),
            Field::text("currentMap"),
            Field::cast("roundsPlayed", NUMBER),
            Field::cast("roundsTotal", NUMBER),
            Field::cast("scores", Caster::Decoder(team_scores)),
            Field::text("onlineState"),
            Field::cast("ranked", BOOLEAN),
            Field::cast("punkBuster", BOOLEAN),
            Field::cast("hasGamePassword", BOOLEAN),
            Field::cast("serverUpTime", NUMBER),
            Field::cast("roundTime", NUMBER),
        ])),
    )
}

pub fn list_players(subset: PlayerSubset) -> Request {
    Request::new(
        Command::new("listPlayers").args(subset.words()),
        Some(CastSpec::scalar(Caster::Decoder(player_table))),
    )
}

/// `offset` pages through long ban lists.
pub fn ban_list_entries(offset: Option<u32>) -> Request {
    Request::new(
        Command::new("banList.list").args(offset),
        Some(CastSpec::scalar(Caster::Decoder(ban_list))),
    )
}

pub fn map_list_entries() -> Request {
    Request::new(
        Command::new("mapList.list"),
        Some(CastSpec::scalar(Caster::Decoder(map_list))),
    )
}

pub fn map_list_indices() -> Request {
    Request::new(
        Command::new("mapList.getMapIndices"),
        Some(CastSpec::scalar(Caster::Decoder(map_indices))),
    )
}

pub fn map_list_rounds() -> Request {
    Request::new(
        Command::new("mapList.getRounds"),
        Some(CastSpec::scalar(Caster::Decoder(map_rounds))),
    )
}

pub fn game_admins() -> Request {
    Request::new(
        Command::new("gameAdmin.list"),
        Some(CastSpec::scalar(Caster::Decoder(admin_list))),
    )
}

/// Read the event switch, or set it when `enabled` is given.
pub fn events_enabled(enabled: Option<bool>) -> Request {
    Request::new(
        Command::new("admin.eventsEnabled").args(enabled),
        Some(CastSpec::scalar(BOOLEAN)),
    )
}
