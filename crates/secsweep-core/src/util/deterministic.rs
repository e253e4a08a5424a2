//! Deterministic ordering helpers.
//!
//! Reports must be byte-identical for identical inputs, so every ordering
//! that reaches a report is decided here rather than by execution order.

use crate::steps::catalog::Step;

/// Sort `(declaration index, step)` pairs by `(phase, declaration index)`.
///
/// This is the presentation order of a plan and of the step table in every
/// report; it must not depend on which worker finished first.
pub fn sort_steps_by_priority(steps: &mut [(usize, &Step)]) {
    steps.sort_by(|(ia, a), (ib, b)| (a.phase, *ia).cmp(&(b.phase, *ib)));
}
