//! Constrained natural-language parsing.
//!
//! A bounded, line-oriented grammar for sketching machines in prose:
//!
//! ```text
//! States: idle, working, done
//! Events: start, finish
//! From idle to working when start
//! From working to done when finish
//! ```
//!
//! Each non-empty line matches one of four case-insensitive patterns:
//! `states:`/`events:` declaration lists, the full transition form
//! `from S to T when E` (`→` and `on` are synonyms), or the short form
//! `S -> T`, whose event defaults to `trigger`. The output is a
//! [`MachineDocument`], so both the parser and the structured loaders
//! share downstream compilation.

use crate::document::{EventDoc, MachineDocument, StateDoc, TransitionDoc};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

/// The default event name for short-form transitions.
pub const DEFAULT_EVENT: &str = "trigger";

/// Parses the constrained line grammar into machine documents.
pub struct DefinitionParser {
    states_line: Regex,
    events_line: Regex,
    full_transition: Regex,
    simple_transition: Regex,
}

impl DefinitionParser {
    pub fn new() -> Self {
        // Patterns are fixed; compilation cannot fail.
        Self {
            states_line: Regex::new(r"(?i)^states?:\s*([A-Za-z0-9_,\s]+)$")
                .expect("hard-coded pattern"),
            events_line: Regex::new(r"(?i)^events?:\s*([A-Za-z0-9_,\s]+)$")
                .expect("hard-coded pattern"),
            full_transition: Regex::new(r"(?i)^from\s+(\w+)\s+(?:to|→)\s+(\w+)\s+(?:when|on)\s+(\w+)$")
                .expect("hard-coded pattern"),
            simple_transition: Regex::new(r"(?i)^(\w+)\s+(?:→|->|to)\s+(\w+)$")
                .expect("hard-coded pattern"),
        }
    }

    /// Parses a description into a machine document.
    ///
    /// States and events referenced by transitions but never declared are
    /// inferred; duplicates are idempotent. The initial state is the first
    /// state in declaration order. A description from which no state can
    /// be derived fails with `EmptyDefinition`.
    pub fn parse(&self, description: &str) -> Result<MachineDocument, ConfigError> {
        let mut doc = MachineDocument {
            name: "parsed_machine".to_string(),
            description: "generated from natural language".to_string(),
            ..Default::default()
        };
        let mut states_seen: HashSet<String> = HashSet::new();
        let mut events_seen: HashSet<String> = HashSet::new();

        for line in description.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(caps) = self.states_line.captures(line) {
                for name in caps[1].split(',') {
                    add_state(&mut doc, &mut states_seen, name.trim());
                }
                continue;
            }

            if let Some(caps) = self.events_line.captures(line) {
                for name in caps[1].split(',') {
                    add_event(&mut doc, &mut events_seen, name.trim());
                }
                continue;
            }

            // The full form must win over the short form: "from a to b
            // when go" also matches the short pattern as "a to b".
            if let Some(caps) = self.full_transition.captures(line) {
                doc.transitions
                    .push(TransitionDoc::new(&caps[1], &caps[3], &caps[2]));
                continue;
            }

            if let Some(caps) = self.simple_transition.captures(line) {
                doc.transitions
                    .push(TransitionDoc::new(&caps[1], DEFAULT_EVENT, &caps[2]));
                continue;
            }

            tracing::debug!(line, "skipping unrecognized line");
        }

        // Infer anything a transition references but no declaration named.
        let transitions = doc.transitions.clone();
        for t in &transitions {
            add_state(&mut doc, &mut states_seen, &t.from);
            add_state(&mut doc, &mut states_seen, &t.to);
            add_event(&mut doc, &mut events_seen, &t.event);
        }

        if doc.states.is_empty() {
            return Err(ConfigError::EmptyDefinition);
        }

        doc.initial_state = doc.states[0].name.clone();
        Ok(doc)
    }
}

impl Default for DefinitionParser {
    fn default() -> Self {
        Self::new()
    }
}

fn add_state(doc: &mut MachineDocument, seen: &mut HashSet<String>, name: &str) {
    if !name.is_empty() && seen.insert(name.to_string()) {
        doc.states.push(StateDoc::named(name));
    }
}

fn add_event(doc: &mut MachineDocument, seen: &mut HashSet<String>, name: &str) {
    if !name.is_empty() && seen.insert(name.to_string()) {
        doc.events.push(EventDoc::named(name));
    }
}
