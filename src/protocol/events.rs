//! Server-originated events.
//!
//! Known event names have a fixed positional layout which is decoded with the same
//! record engine used for responses; unknown names carry only their raw words.

use crate::protocol::cast::{CastSpec, Caster, Field, BOOLEAN, NUMBER};
use crate::protocol::multivalue::{player_table, team_scores};
use crate::protocol::value::{Record, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    pub name: String,
    pub words: Vec<String>,
    /// Named fields for known event names.
    pub fields: Option<Record>,
}

impl ServerEvent {
    pub fn new(name: String, words: Vec<String>) -> Self {
        let fields = layout(&name).and_then(|spec| match spec.apply(&words) {
            Value::Record(record) => Some(record),
            _ => None,
        });
        Self {
            name,
            words,
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.as_ref().and_then(|f| f.get(name))
    }

    /// Portion of the name before the first dot (`player` for `player.onJoin`).
    pub fn namespace(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }
}

/// Field layout of a known event.
pub fn layout(name: &str) -> Option<CastSpec> {
    let fields = match name {
        "player.onAuthenticated" => vec![Field::text("name")],
        "player.onJoin" => vec![Field::text("name"), Field::text("guid")],
        "player.onLeave" => vec![
            Field::text("name"),
            Field::cast("playerInfo", Caster::Decoder(player_table)),
        ],
        "player.onSpawn" => vec![Field::text("name"), Field::cast("teamId", NUMBER)],
        "player.onKill" => vec![
            Field::text("killer"),
            Field::text("victim"),
            Field::text("weapon"),
            Field::cast("headshot", BOOLEAN),
        ],
        "player.onChat" => vec![
            Field::text("name"),
            Field::text("text"),
            Field::text("subset"),
        ],
        "player.onSquadChange" | "player.onTeamChange" => vec![
            Field::text("name"),
            Field::cast("teamId", NUMBER),
            Field::cast("squadId", NUMBER),
        ],
        "punkBuster.onMessage" => vec![Field::text("message")],
        "server.onLevelLoaded" => vec![
            Field::text("levelName"),
            Field::text("gameMode"),
            Field::cast("roundsPlayed", NUMBER),
            Field::cast("roundsTotal", NUMBER),
        ],
        "server.onRoundOver" => vec![Field::cast("winningTeamId", NUMBER)],
        "server.onRoundOverPlayers" => {
            vec![Field::cast("players", Caster::Decoder(player_table))]
        }
        "server.onRoundOverTeamScores" => {
            vec![Field::cast("scores", Caster::Decoder(team_scores))]
        }
        _ => return None,
    };
    Some(CastSpec::Record(fields))
}
