//! Rule-driven conversion of response words into typed values.
//!
//! A [`CastSpec`] is supplied per request. It is either a single [`Caster`] (scalar
//! result) or an ordered list of [`Field`]s (record result). A caster is explicitly one
//! of two things: a plain conversion of one word, or a constructor for a
//! [`MultiValueDecoder`] that consumes a variable number of words.

use std::borrow::Cow;
use std::fmt;

use tracing::trace;

use crate::protocol::multivalue::MultiValueDecoder;
use crate::protocol::value::{Record, Value};

/// Plain conversion. Receives `None` when the response carried no words at all.
pub type ScalarFn = fn(Option<&str>) -> Value;

/// Decoder constructor, handed the first word of its sub-payload.
pub type DecoderFactory = fn(Option<&str>) -> Box<dyn MultiValueDecoder>;

#[derive(Clone, Copy)]
pub enum Caster {
    Scalar(ScalarFn),
    Decoder(DecoderFactory),
}

impl fmt::Debug for Caster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Caster::Scalar(_) => f.write_str("Caster::Scalar"),
            Caster::Decoder(_) => f.write_str("Caster::Decoder"),
        }
    }
}

/// One entry of a record CastSpec.
#[derive(Debug, Clone)]
pub enum Field {
    /// Copy the word verbatim as text.
    Text(Cow<'static, str>),
    /// Convert with the given caster.
    Cast(Cow<'static, str>, Caster),
    /// Consume one word without assigning it.
    Skip,
}

impl Field {
    pub fn text(name: impl Into<Cow<'static, str>>) -> Self {
        Field::Text(name.into())
    }

    pub fn cast(name: impl Into<Cow<'static, str>>, caster: Caster) -> Self {
        Field::Cast(name.into(), caster)
    }
}

#[derive(Debug, Clone)]
pub enum CastSpec {
    Scalar(Caster),
    Record(Vec<Field>),
}

impl CastSpec {
    pub fn scalar(caster: Caster) -> Self {
        CastSpec::Scalar(caster)
    }

    pub fn record(fields: impl IntoIterator<Item = Field>) -> Self {
        CastSpec::Record(fields.into_iter().collect())
    }

    /// Convert response words (status already removed) into a value.
    pub fn apply(&self, words: &[String]) -> Value {
        match self {
            CastSpec::Scalar(caster) => cast_scalar(*caster, words),
            CastSpec::Record(fields) => Value::Record(cast_record(fields, words)),
        }
    }
}

fn cast_scalar(caster: Caster, words: &[String]) -> Value {
    let first = words.first().map(String::as_str);
    match caster {
        Caster::Scalar(f) => f(first),
        Caster::Decoder(factory) => {
            let mut decoder = factory(first);
            for word in words.iter().skip(1) {
                if decoder.is_finished() {
                    break;
                }
                decoder.give(word);
            }
            decoder.extract()
        }
    }
}

fn cast_record(fields: &[Field], words: &[String]) -> Record {
    let mut record = Record::new();
    let mut fields = fields.iter();
    let mut active: Option<(&str, Box<dyn MultiValueDecoder>)> = None;

    for word in words {
        if let Some((name, mut decoder)) = active.take() {
            decoder.give(word);
            if decoder.is_finished() {
                record.insert(name.to_string(), decoder.extract());
            } else {
                active = Some((name, decoder));
            }
            continue;
        }

        let Some(field) = fields.next() else {
            trace!(extra = words.len(), "Ignoring words beyond the cast fields");
            break;
        };

        match field {
            Field::Skip => {}
            Field::Text(name) => {
                record.insert(name.to_string(), Value::Text(word.clone()));
            }
            Field::Cast(name, Caster::Scalar(f)) => {
                record.insert(name.to_string(), f(Some(word.as_str())));
            }
            Field::Cast(name, Caster::Decoder(factory)) => {
                let decoder = factory(Some(word.as_str()));
                if decoder.is_finished() {
                    record.insert(name.to_string(), decoder.extract());
                } else {
                    active = Some((name.as_ref(), decoder));
                }
            }
        }
    }

    // Unterminated shapes are closed by the end of the message.
    if let Some((name, decoder)) = active {
        record.insert(name.to_string(), decoder.extract());
    }

    record
}

// ---------------------------------------------------------------------------
// Scalar casters
// ---------------------------------------------------------------------------

pub fn text(word: Option<&str>) -> Value {
    word.map_or(Value::Null, |w| Value::Text(w.to_string()))
}

/// Integer when possible, float otherwise, `Null` when neither parses.
pub fn number(word: Option<&str>) -> Value {
    let Some(word) = word.map(str::trim) else {
        return Value::Null;
    };
    if let Ok(n) = word.parse::<i64>() {
        return Value::Int(n);
    }
    match word.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::Float(f),
        _ => Value::Null,
    }
}

/// Only the exact word `"true"` is true.
pub fn boolean(word: Option<&str>) -> Value {
    word.map_or(Value::Null, |w| Value::Bool(w == "true"))
}

pub const TEXT: Caster = Caster::Scalar(text);
pub const NUMBER: Caster = Caster::Scalar(number);
pub const BOOLEAN: Caster = Caster::Scalar(boolean);
