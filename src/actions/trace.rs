//! Diagnostic traces for "why is this action disabled".
//!
//! Built fresh on every call to
//! [`ActionExecutor::debug_action`](super::ActionExecutor::debug_action).
//! Nothing in the engine reads them back.

use serde::{Deserialize, Serialize};

use super::selection::{Choice, SelectionType};
use crate::core::PlayerId;

/// Outcome of one labeled condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionTrace {
    pub label: String,
    pub passed: bool,
    /// Why the condition failed.
    pub reason: Option<String>,
}

/// What one selection offered and what happened to the supplied value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDebugInfo {
    pub name: String,
    pub kind: SelectionType,
    /// Valid choices given the earlier supplied values.
    pub choices: Vec<Choice>,
    pub choice_count: usize,
    /// Any value within the selection's constraints is accepted.
    pub free_input: bool,
    /// No choice leads to a complete action.
    pub dead_end: bool,
    /// The supplied value, rendered.
    pub supplied: Option<String>,
    /// Why the supplied value was refused.
    pub rejection: Option<String>,
}

/// Full availability report for one action and player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDebugInfo {
    pub action: String,
    pub player: PlayerId,
    pub available: bool,
    /// Every condition, evaluated without short-circuiting.
    pub conditions: Vec<ConditionTrace>,
    pub selections: Vec<SelectionDebugInfo>,
    /// The lookahead search ran out of budget and answered optimistically.
    pub search_exhausted: bool,
    /// First reason the action is unavailable.
    pub failure: Option<String>,
}

impl ActionDebugInfo {
    /// Labels of the conditions that failed.
    pub fn failed_conditions(&self) -> impl Iterator<Item = &str> {
        self.conditions
            .iter()
            .filter(|c| !c.passed)
            .map(|c| c.label.as_str())
    }

    #[must_use]
    pub fn selection(&self, name: &str) -> Option<&SelectionDebugInfo> {
        self.selections.iter().find(|s| s.name == name)
    }
}

impl std::fmt::Display for ActionDebugInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.available { "available" } else { "unavailable" };
        writeln!(f, "{} for {}: {status}", self.action, self.player)?;
        for condition in &self.conditions {
            let mark = if condition.passed { "ok" } else { "FAIL" };
            write!(f, "  [{mark}] {}", condition.label)?;
            if let Some(reason) = &condition.reason {
                write!(f, " ({reason})")?;
            }
            writeln!(f)?;
        }
        for selection in &self.selections {
            write!(f, "  {} ({:?}): ", selection.name, selection.kind)?;
            if selection.free_input {
                write!(f, "free input")?;
            } else {
                write!(f, "{} choices", selection.choice_count)?;
            }
            if selection.dead_end {
                write!(f, ", dead end")?;
            }
            if let Some(rejection) = &selection.rejection {
                write!(f, ", rejected: {rejection}")?;
            }
            writeln!(f)?;
        }
        if self.search_exhausted {
            writeln!(f, "  (search budget exhausted)")?;
        }
        Ok(())
    }
}
