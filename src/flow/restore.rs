//! Restoring saved positions against a possibly changed flow tree.
//!
//! Frames are checked root first. The longest prefix that still matches the
//! tree is kept and the flow runs on from there; everything below the first
//! mismatch is discarded and reported.

use std::sync::Arc;

use smallvec::SmallVec;
use tracing::warn;

use super::engine::FlowEngine;
use super::node::{FlowDefinition, FlowNode};
use super::position::{FlowPosition, FrameState, PositionStep};
use super::state::RestoreReport;
use crate::core::{DefinitionError, PlayerId};
use crate::rules::GameRules;

impl<G: GameRules> FlowEngine<G> {
    /// Resume from a saved position.
    ///
    /// Never fails: an unusable position degrades to the longest valid
    /// prefix, or to a fresh start from the root.
    pub fn try_restore(&mut self, game: &mut G, position: FlowPosition) -> RestoreReport {
        let definition = Arc::clone(&self.definition);
        let player_count = game.player_count();

        let mut steps = position.steps.into_vec();
        let mut reason = None;
        let mut node = Some(&definition.root);
        let mut split = steps.len();
        for (i, step) in steps.iter().enumerate() {
            let Some(current) = node else {
                reason = Some(format!("'{}' has no child to run", steps[i - 1].name));
                split = i;
                break;
            };
            if let Err(why) = check_step(current, step, player_count) {
                reason = Some(why);
                split = i;
                break;
            }
            node = current.child_for(&step.frame);
        }
        let discarded = steps.split_off(split);
        let kept = FlowPosition {
            steps: SmallVec::from_vec(steps),
        };

        let exact = discarded.is_empty() && !kept.is_empty();
        if kept.is_empty() && discarded.is_empty() {
            reason = Some("saved position is empty".to_string());
        }
        if !discarded.is_empty() {
            warn!(
                kept = kept.depth(),
                dropped = discarded.len(),
                reason = reason.as_deref().unwrap_or_default(),
                "saved flow position truncated"
            );
        }

        let restored = kept.depth();
        self.set_position(kept);
        if restored == 0 {
            self.enter_root(game);
        }
        if let Err(err) = self.run(game) {
            warn!(error = %err, "flow could not continue after restore");
            reason = Some(err.to_string());
        }

        RestoreReport {
            restored,
            discarded,
            exact,
            reason,
        }
    }

    /// Swap in `definition` and restore the current position against it.
    pub fn reload_and_restore(
        &mut self,
        game: &mut G,
        definition: FlowDefinition<G>,
    ) -> Result<RestoreReport, DefinitionError> {
        self.reload(definition)?;
        let position = self.position.clone();
        Ok(self.try_restore(game, position))
    }
}

/// Check one saved frame against the node it claims to belong to.
fn check_step<G>(node: &FlowNode<G>, step: &PositionStep, player_count: usize) -> Result<(), String> {
    if node.kind() != step.kind {
        return Err(format!(
            "'{}' was a {:?} node, found {:?}",
            step.name,
            step.kind,
            node.kind()
        ));
    }
    if node.name() != step.name {
        return Err(format!("expected node '{}', found '{}'", step.name, node.name()));
    }
    if !step.frame.fits(step.kind) {
        return Err(format!("frame of '{}' does not fit a {:?} node", step.name, step.kind));
    }

    let seats_valid = |players: &[PlayerId]| players.iter().all(|p| p.is_valid(player_count));
    let in_bounds = match (node, &step.frame) {
        (FlowNode::Sequence(n), FrameState::Sequence { index }) => *index <= n.children.len(),
        (_, FrameState::EachPlayer { players, index }) => *index <= players.len() && seats_valid(players),
        (_, FrameState::ForEach { items, index }) => *index <= items.len(),
        (_, FrameState::Branch { arm: Some(_), done: false }) => node.child_for(&step.frame).is_some(),
        (_, FrameState::ActionStep { player, .. }) => player.is_valid(player_count),
        (_, FrameState::Simultaneous { awaiting, responses }) => {
            seats_valid(awaiting) && responses.iter().all(|r| r.player.is_valid(player_count))
        }
        _ => true,
    };
    if in_bounds {
        Ok(())
    } else {
        Err(format!("progress of '{}' is out of range", step.name))
    }
}
