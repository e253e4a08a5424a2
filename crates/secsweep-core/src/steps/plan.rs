//! Run planning: select and order catalog steps for a configuration.
//!
//! Planning is a pure function of the catalog and the run configuration.
//! It never mutates the catalog, and an empty plan is a valid outcome.

use tracing::debug;

use crate::config::RunConfig;
use crate::steps::catalog::{Catalog, Step};
use crate::util::deterministic::sort_steps_by_priority;

/// Select the steps that apply to `config`, in presentation order.
///
/// A step is admitted when:
/// - its focus tags intersect the requested focus (any step under `All`)
/// - the requested level is at least the step's `required_for_level`
///
/// Admitted steps are ordered by phase, ties broken by catalog declaration
/// order.
pub fn plan<'c>(catalog: &'c Catalog, config: &RunConfig) -> Vec<&'c Step> {
    let mut selected: Vec<(usize, &Step)> = catalog
        .steps()
        .iter()
        .enumerate()
        .filter(|(_, s)| config.focus.admits(&s.focus_tags))
        .filter(|(_, s)| config.level >= s.required_for_level)
        .collect();

    sort_steps_by_priority(&mut selected);

    debug!(
        level = %config.level,
        focus = %config.focus,
        "Planned {} of {} catalog steps",
        selected.len(),
        catalog.len()
    );

    selected.into_iter().map(|(_, s)| s).collect()
}
