//! Response decoding through the public CastSpec API.

#![allow(clippy::unwrap_used)]

use rcon_protocol::protocol::cast::{CastSpec, Caster, Field, BOOLEAN, NUMBER};
use rcon_protocol::protocol::catalog;
use rcon_protocol::protocol::multivalue::{
    admin_list, ban_list, map_indices, map_list, map_rounds, player_table, team_scores,
};
use rcon_protocol::{Record, ServerEvent, Value};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn record(pairs: &[(&str, Value)]) -> Value {
    Value::Record(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<Record>(),
    )
}

#[test]
fn paired_scores() {
    let value = CastSpec::scalar(Caster::Decoder(team_scores)).apply(&words(&["2", "10", "20", "50"]));
    assert_eq!(
        value,
        record(&[
            ("scores", Value::List(vec![Value::Int(10), Value::Int(20)])),
            ("targetScore", Value::Int(50)),
        ])
    );
}

#[test]
fn paired_scores_with_absurd_count_take_what_arrived() {
    let cast = CastSpec::scalar(Caster::Decoder(team_scores));

    assert_eq!(
        cast.apply(&words(&["99999999999", "1"])),
        record(&[
            ("scores", Value::List(vec![])),
            ("targetScore", Value::Int(1)),
        ])
    );
    assert_eq!(
        cast.apply(&words(&["18446744073709551615"])),
        record(&[
            ("scores", Value::List(vec![])),
            ("targetScore", Value::Null),
        ])
    );
}

#[test]
fn round_over_scores_event_with_absurd_count() {
    let event = ServerEvent::new(
        "server.onRoundOverTeamScores".into(),
        words(&["99999999999", "1"]),
    );
    assert_eq!(
        event.field("scores").and_then(|s| s.get("targetScore")),
        Some(&Value::Int(1))
    );
}

#[test]
fn player_table_with_numeric_columns() {
    let value = CastSpec::scalar(Caster::Decoder(player_table))
        .apply(&words(&["2", "name", "teamId", "1", "Alice", "2"]));
    assert_eq!(
        value,
        Value::List(vec![record(&[
            ("name", Value::from("Alice")),
            ("teamId", Value::Int(2)),
        ])])
    );
}

#[test]
fn player_table_with_zero_rows() {
    let value = CastSpec::scalar(Caster::Decoder(player_table))
        .apply(&words(&["2", "name", "teamId", "0"]));
    assert_eq!(value, Value::List(vec![]));
}

#[test]
fn empty_response_still_builds_a_default() {
    let value = CastSpec::scalar(Caster::Decoder(player_table)).apply(&[]);
    assert_eq!(value, Value::List(vec![]));

    let value = CastSpec::scalar(NUMBER).apply(&[]);
    assert!(value.is_null());
}

#[test]
fn ban_list_runs_to_end_of_message() {
    let value = CastSpec::scalar(Caster::Decoder(ban_list)).apply(&words(&[
        "name", "Cheater", "perm", "0", "aimbot", //
        "guid", "EA_1234", "seconds", "3600", "tk",
    ]));
    let list = value.as_list().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].get("id"), Some(&Value::from("Cheater")));
    assert_eq!(list[1].get("idType"), Some(&Value::from("guid")));
    assert_eq!(list[1].get("time"), Some(&Value::from("3600")));
    assert_eq!(list[1].get("reason"), Some(&Value::from("tk")));
}

#[test]
fn admin_list_keeps_complete_records_only() {
    let value = CastSpec::scalar(Caster::Decoder(admin_list))
        .apply(&words(&["alice", "1", "bob", "3", "carol"]));
    let list = value.as_list().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[1].get("name"), Some(&Value::from("bob")));
    assert_eq!(list[1].get("restrictionLevel"), Some(&Value::Int(3)));
}

#[test]
fn map_list_is_count_driven() {
    let value = CastSpec::scalar(Caster::Decoder(map_list)).apply(&words(&[
        "2", "2", "MP_001", "ConquestLarge0", "1", "MP_003", "RushLarge0", "ignored",
    ]));
    let list = value.as_list().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].get("rounds"), Some(&Value::Int(2)));
    assert_eq!(list[1].get("mapName"), Some(&Value::from("MP_003")));
    assert_eq!(list[1].get("gameMode"), Some(&Value::from("RushLarge0")));
}

#[test]
fn index_and_round_pairs() {
    let indices = CastSpec::scalar(Caster::Decoder(map_indices)).apply(&words(&["3", "4"]));
    assert_eq!(
        indices,
        record(&[
            ("currentMapIndex", Value::Int(3)),
            ("nextMapIndex", Value::Int(4)),
        ])
    );

    let rounds = CastSpec::scalar(Caster::Decoder(map_rounds)).apply(&words(&["0", "2"]));
    assert_eq!(rounds.get("totalRounds"), Some(&Value::Int(2)));
}

#[test]
fn record_with_trailing_unterminated_list() {
    let spec = CastSpec::record([
        Field::text("server"),
        Field::Skip,
        Field::cast("admins", Caster::Decoder(admin_list)),
    ]);
    let value = spec.apply(&words(&["main", "x", "alice", "1", "bob", "2"]));
    assert_eq!(value.get("server"), Some(&Value::from("main")));
    assert_eq!(value.as_record().unwrap().len(), 2);
    assert_eq!(value.get("admins").and_then(Value::as_list).map(<[_]>::len), Some(2));
}

#[test]
fn extra_words_beyond_fields_are_ignored() {
    let spec = CastSpec::record([Field::text("game"), Field::cast("ranked", BOOLEAN)]);
    let value = spec.apply(&words(&["BF3", "true", "surplus", "words"]));
    assert_eq!(
        value,
        record(&[("game", Value::from("BF3")), ("ranked", Value::Bool(true))])
    );
}

#[test]
fn record_over_no_words_is_empty() {
    let (_, cast) = catalog::version().into_parts();
    assert_eq!(cast.unwrap().apply(&[]), Value::Record(Record::new()));
}
