//! Incremental decoders for variable-length sub-payloads.
//!
//! A decoder is built from the first word of its sub-payload, then fed one word at a
//! time until it reports completion. Some shapes (ban entries, admin lists) carry no
//! count and never finish on their own; the engine closes them at end of message and
//! takes whatever complete records they have accumulated.

use crate::protocol::cast::{number, text, ScalarFn};
use crate::protocol::value::{Record, Value};

/// Capability interface for multi-word values.
pub trait MultiValueDecoder: Send {
    /// Consume the next word.
    fn give(&mut self, word: &str);

    /// No further words are needed.
    fn is_finished(&self) -> bool;

    /// The accumulated value. Valid at any point, including before completion.
    fn extract(self: Box<Self>) -> Value;
}

/// Numeric player-table columns; every other column is text.
pub const NUMERIC_PLAYER_COLUMNS: &[&str] = &["teamId", "squadId", "kills", "deaths", "score"];

pub const BAN_FIELDS: &[(&str, ScalarFn)] = &[
    ("idType", text),
    ("id", text),
    ("banType", text),
    ("time", text),
    ("reason", text),
];

pub const MAP_FIELDS: &[(&str, ScalarFn)] = &[
    ("rounds", number),
    ("mapName", text),
    ("gameMode", text),
];

pub const ADMIN_FIELDS: &[(&str, ScalarFn)] = &[("name", text), ("restrictionLevel", number)];

fn parse_count(word: Option<&str>) -> usize {
    word.and_then(|w| w.trim().parse().ok()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Paired scores
// ---------------------------------------------------------------------------

/// `count`, then `count` scores, then the target score.
#[derive(Debug)]
pub struct TeamScores {
    expected: usize,
    values: Vec<Value>,
}

impl TeamScores {
    pub fn new(first: Option<&str>) -> Self {
        // The count is server-supplied; never size anything from it up front.
        let expected = first.map_or(0, |_| parse_count(first).saturating_add(1));
        Self {
            expected,
            values: Vec::new(),
        }
    }
}

impl MultiValueDecoder for TeamScores {
    fn give(&mut self, word: &str) {
        self.values.push(number(Some(word)));
    }

    fn is_finished(&self) -> bool {
        self.values.len() >= self.expected
    }

    fn extract(mut self: Box<Self>) -> Value {
        let target = self.values.pop().unwrap_or(Value::Null);
        let mut record = Record::new();
        record.insert("scores".into(), Value::List(self.values));
        record.insert("targetScore".into(), target);
        Value::Record(record)
    }
}

// ---------------------------------------------------------------------------
// Player table
// ---------------------------------------------------------------------------

/// Self-describing columnar table: column count, column names, row count, rows.
#[derive(Debug)]
pub struct PlayerTable {
    column_count: usize,
    columns: Vec<String>,
    row_count: Option<usize>,
    cursor: usize,
    current: Record,
    rows: Vec<Value>,
}

impl PlayerTable {
    pub fn new(first: Option<&str>) -> Self {
        Self {
            column_count: parse_count(first),
            columns: Vec::new(),
            // Without a header there is nothing to wait for.
            row_count: if first.is_none() { Some(0) } else { None },
            cursor: 0,
            current: Record::new(),
            rows: Vec::new(),
        }
    }

    fn cast_cell(column: &str, word: &str) -> Value {
        if NUMERIC_PLAYER_COLUMNS.contains(&column) {
            number(Some(word))
        } else {
            text(Some(word))
        }
    }
}

impl MultiValueDecoder for PlayerTable {
    fn give(&mut self, word: &str) {
        if self.columns.len() < self.column_count {
            self.columns.push(word.to_string());
            return;
        }

        let Some(row_count) = self.row_count else {
            self.row_count = Some(parse_count(Some(word)));
            return;
        };

        if self.rows.len() >= row_count {
            return;
        }

        let column = &self.columns[self.cursor];
        let cell = Self::cast_cell(column, word);
        self.current.insert(column.clone(), cell);
        self.cursor += 1;

        if self.cursor == self.column_count {
            self.cursor = 0;
            let row = std::mem::take(&mut self.current);
            self.rows.push(Value::Record(row));
        }
    }

    fn is_finished(&self) -> bool {
        match self.row_count {
            Some(rows) => self.column_count == 0 || self.rows.len() >= rows,
            None => false,
        }
    }

    fn extract(self: Box<Self>) -> Value {
        Value::List(self.rows)
    }
}

// ---------------------------------------------------------------------------
// Fixed-layout record lists
// ---------------------------------------------------------------------------

/// A list of fixed-width records, either count-prefixed or running to end of message.
pub struct RecordList {
    layout: &'static [(&'static str, ScalarFn)],
    expected: Option<usize>,
    current: Record,
    records: Vec<Value>,
}

impl RecordList {
    /// Count-prefixed list: the first word is the number of records.
    pub fn counted(layout: &'static [(&'static str, ScalarFn)], first: Option<&str>) -> Self {
        Self {
            layout,
            expected: Some(parse_count(first)),
            current: Record::new(),
            records: Vec::new(),
        }
    }

    /// Unterminated list: the first word already belongs to the first record.
    pub fn unterminated(layout: &'static [(&'static str, ScalarFn)], first: Option<&str>) -> Self {
        let mut list = Self {
            layout,
            expected: None,
            current: Record::new(),
            records: Vec::new(),
        };
        if let Some(word) = first {
            list.give(word);
        }
        list
    }
}

impl MultiValueDecoder for RecordList {
    fn give(&mut self, word: &str) {
        if self.is_finished() {
            return;
        }
        let (name, cast) = self.layout[self.current.len()];
        self.current.insert(name.to_string(), cast(Some(word)));

        if self.current.len() == self.layout.len() {
            let record = std::mem::take(&mut self.current);
            self.records.push(Value::Record(record));
        }
    }

    fn is_finished(&self) -> bool {
        match self.expected {
            Some(count) => self.records.len() >= count,
            None => false,
        }
    }

    fn extract(self: Box<Self>) -> Value {
        Value::List(self.records)
    }
}

// ---------------------------------------------------------------------------
// Two-word pairs
// ---------------------------------------------------------------------------

/// Exactly two numeric words mapped to two names.
#[derive(Debug)]
pub struct NumberPair {
    first_name: &'static str,
    second_name: &'static str,
    first: Value,
    second: Option<Value>,
}

impl NumberPair {
    pub fn new(first_name: &'static str, second_name: &'static str, first: Option<&str>) -> Self {
        Self {
            first_name,
            second_name,
            first: number(first),
            second: None,
        }
    }
}

impl MultiValueDecoder for NumberPair {
    fn give(&mut self, word: &str) {
        if self.second.is_none() {
            self.second = Some(number(Some(word)));
        }
    }

    fn is_finished(&self) -> bool {
        self.second.is_some()
    }

    fn extract(self: Box<Self>) -> Value {
        let mut record = Record::new();
        record.insert(self.first_name.into(), self.first);
        record.insert(self.second_name.into(), self.second.unwrap_or(Value::Null));
        Value::Record(record)
    }
}

// ---------------------------------------------------------------------------
// Factories (the `Caster::Decoder` constructors)
// ---------------------------------------------------------------------------

pub fn team_scores(first: Option<&str>) -> Box<dyn MultiValueDecoder> {
    Box::new(TeamScores::new(first))
}

pub fn player_table(first: Option<&str>) -> Box<dyn MultiValueDecoder> {
    Box::new(PlayerTable::new(first))
}

pub fn ban_list(first: Option<&str>) -> Box<dyn MultiValueDecoder> {
    Box::new(RecordList::unterminated(BAN_FIELDS, first))
}

pub fn map_list(first: Option<&str>) -> Box<dyn MultiValueDecoder> {
    Box::new(RecordList::counted(MAP_FIELDS, first))
}

pub fn map_indices(first: Option<&str>) -> Box<dyn MultiValueDecoder> {
    Box::new(NumberPair::new("currentMapIndex", "nextMapIndex", first))
}

pub fn map_rounds(first: Option<&str>) -> Box<dyn MultiValueDecoder> {
    Box::new(NumberPair::new("currentRound", "totalRounds", first))
}

pub fn admin_list(first: Option<&str>) -> Box<dyn MultiValueDecoder> {
    Box::new(RecordList::unterminated(ADMIN_FIELDS, first))
}
