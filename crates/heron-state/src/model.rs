use crate::error::{Error, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Id of the initial pseudo-state.
pub const INITIAL_STATE_ID: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Finite and strictly positive in both directions.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

fn check_size(id: &str, size: Option<Dimensions>) -> Result<()> {
    match size {
        Some(d) if !d.is_valid() => Err(Error::InvalidSize {
            id: id.to_string(),
            width: d.width,
            height: d.height,
        }),
        _ => Ok(()),
    }
}

/// A finite-state machine as handed over by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateChart {
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: String,
    /// Rendered size; the layout falls back to its configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimensions>,
    /// Opaque to the layout, passed through to snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
    #[serde(default)]
    pub action: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Dimensions>,
}

impl State {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: None,
            payload: None,
        }
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some(Dimensions::new(width, height));
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_initial(&self) -> bool {
        self.id == INITIAL_STATE_ID
    }
}

impl Transition {
    pub fn new(id: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            trigger: None,
            action: Vec::new(),
            size: None,
        }
    }

    pub fn with_trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    pub fn with_action<I, S>(mut self, action: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action = action.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

impl StateChart {
    pub fn new(states: Vec<State>, transitions: Vec<Transition>) -> Self {
        Self {
            states,
            transitions,
        }
    }

    /// States plus transitions: the measure admission control compares against its limit.
    pub fn node_count(&self) -> usize {
        self.states.len() + self.transitions.len()
    }

    pub fn validate(&self) -> Result<()> {
        let mut ids: FxHashSet<&str> = FxHashSet::default();
        for s in &self.states {
            if !ids.insert(s.id.as_str()) {
                return Err(Error::DuplicateState { id: s.id.clone() });
            }
            check_size(&s.id, s.size)?;
        }
        for t in &self.transitions {
            check_size(&t.id, t.size)?;
            for end in [&t.from, &t.to] {
                if !ids.contains(end.as_str()) {
                    return Err(Error::UnknownState {
                        transition: t.id.clone(),
                        state: end.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
