use std::sync::Mutex;

use crate::path::is_key;
use crate::value::Value;

#[derive(Clone, Debug)]
pub enum Op {
    Write(Value),
    Reset,
}

impl Op {
    fn as_value(&self) -> Option<&Value> {
        match self {
            Op::Write(v) => Some(v),
            Op::Reset => None,
        }
    }
}

enum State {
    Building(Vec<(String, Op)>),
    Sealed {
        prefix: String,
        entries: Vec<(String, Op)>,
    },
}

pub struct Changeset {
    state: Mutex<State>,
}

impl Changeset {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Building(Vec::new())),
        }
    }

    pub fn new_write(key: &str, value: Value) -> Self {
        let cs = Self::new();
        cs.add_write(key, value);
        cs
    }

    // Last-writer-wins on the same absolute key.
    pub fn add_write(&self, key: &str, value: Value) {
        self.add(key, Op::Write(value));
    }

    pub fn add_reset(&self, key: &str) {
        self.add(key, Op::Reset);
    }

    fn add(&self, key: &str, op: Op) {
        if !is_key(key) {
            tracing::warn!(key, "refusing to add invalid key to changeset");
            return;
        }
        let mut state = self.state.lock().unwrap();
        match &mut *state {
            State::Building(entries) => {
                if let Some(existing) = entries.iter_mut().find(|(k, _)| k.as_str() == key) {
                    existing.1 = op;
                } else {
                    entries.push((key.to_string(), op));
                }
            }
            State::Sealed { .. } => {
                tracing::warn!(key, "refusing to mutate a sealed changeset");
            }
        }
    }

    // Idempotent. A single-entry changeset's prefix is the full key and
    // its one relative key is empty.
    pub fn seal(&self) {
        let mut state = self.state.lock().unwrap();
        if matches!(&*state, State::Sealed { .. }) {
            return;
        }
        let State::Building(entries) = std::mem::replace(&mut *state, State::Building(Vec::new()))
        else {
            unreachable!()
        };

        let (prefix, entries) = match entries.len() {
            0 => ("/".to_string(), Vec::new()),
            1 => {
                let (key, op) = entries.into_iter().next().unwrap();
                (key, vec![(String::new(), op)])
            }
            _ => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                let prefix = longest_common_dir_prefix(&keys);
                let entries = entries
                    .into_iter()
                    .map(|(k, op)| {
                        let rel = k[prefix.len()..].to_string();
                        (rel, op)
                    })
                    .collect();
                (prefix, entries)
            }
        };

        *state = State::Sealed { prefix, entries };
    }

    pub fn describe(&self) -> (String, Vec<String>, Vec<Op>) {
        self.seal();
        let state = self.state.lock().unwrap();
        match &*state {
            State::Sealed { prefix, entries } => {
                let keys = entries.iter().map(|(k, _)| k.clone()).collect();
                let ops = entries.iter().map(|(_, op)| op.clone()).collect();
                (prefix.clone(), keys, ops)
            }
            State::Building(_) => unreachable!("seal() always transitions to Sealed"),
        }
    }

    pub fn is_single_entry(&self) -> bool {
        self.entry_count() == 1
    }

    fn entry_count(&self) -> usize {
        match &*self.state.lock().unwrap() {
            State::Building(entries) => entries.len(),
            State::Sealed { entries, .. } => entries.len(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Op> {
        let state = self.state.lock().unwrap();
        match &*state {
            State::Building(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == key)
                .map(|(_, op)| op.clone()),
            State::Sealed { prefix, entries } => entries.iter().find_map(|(rel, op)| {
                if format!("{prefix}{rel}") == key {
                    Some(op.clone())
                } else {
                    None
                }
            }),
        }
    }

    pub fn for_each(&self, mut f: impl FnMut(&str, Option<&Value>)) {
        let state = self.state.lock().unwrap();
        match &*state {
            State::Building(entries) => {
                for (key, op) in entries {
                    f(key, op.as_value());
                }
            }
            State::Sealed { prefix, entries } => {
                for (rel, op) in entries {
                    let abs = format!("{prefix}{rel}");
                    f(&abs, op.as_value());
                }
            }
        }
    }
}

impl Default for Changeset {
    fn default() -> Self {
        Self::new()
    }
}

// Trimmed back to the last `/` so the result is always a valid dir.
fn longest_common_dir_prefix(keys: &[&str]) -> String {
    debug_assert!(!keys.is_empty());
    let mut prefix = keys[0].to_string();
    for k in &keys[1..] {
        let common_len = prefix
            .bytes()
            .zip(k.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(common_len);
    }
    match prefix.rfind('/') {
        Some(idx) => prefix[..=idx].to_string(),
        None => "/".to_string(),
    }
}
