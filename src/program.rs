//! The compiled program: a `GameData` mapping of passages, plus optional
//! JSON caching so a host doesn't have to re-tokenize static sources on
//! every load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::Command;
use crate::error::LoadError;
use crate::parser::parse_passage;
use crate::preprocessor::{count_lines, split_passages};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub commands: Vec<Command>,
}

pub type GameData = HashMap<String, Passage>;

/// A compiled program. `Serialize`/`Deserialize` let a host cache this to
/// disk keyed on source hash and skip re-parsing on the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub passages: GameData,
    /// Line count of the original source, after the same BOM-strip/CRLF
    /// normalisation the preprocessor applies. Carried alongside the parsed
    /// passages (and into the JSON cache) purely as load-summary metadata
    /// for a host's diagnostics/log output; the VM itself never reads it.
    pub line_count: usize,
}

impl Program {
    /// Split `source` into passages and parse each one. Fails fast on the
    /// first parse error encountered; does not validate cross-passage
    /// jump/call/selection targets, which remain runtime errors.
    pub fn parse(source: &str) -> Result<Program, LoadError> {
        let mut passages = GameData::new();
        for raw in split_passages(source) {
            let commands = parse_passage(&raw.name, &raw.body, raw.start_line)?;
            passages.insert(raw.name, Passage { commands });
        }
        if !passages.contains_key("Start") {
            return Err(LoadError::MissingStart);
        }
        Ok(Program { passages, line_count: count_lines(source) })
    }

    pub fn to_json(&self) -> Result<String, LoadError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Program, LoadError> {
        Ok(serde_json::from_str(json)?)
    }
}
