//! Destructive-union merge of component state deltas.
//!
//! A delta only ever touches the sub-object of the component that produced
//! it, so merges of different components commute.

use crate::core::types::{EnvState, StateDelta};

/// Merge `delta` into the sub-object owned by `component`.
///
/// Fields present in `delta` overwrite existing fields; other fields of the
/// component are preserved. Fields of other components are never touched.
pub fn merge_delta(state: &mut EnvState, component: &str, delta: StateDelta) {
    let target = state.component_mut(component);
    for (key, value) in delta {
        target.insert(key, value);
    }
}

/// Merge every component sub-object of `update` into `base`.
pub fn merge_state(base: &mut EnvState, update: EnvState) {
    for (component, fields) in update.into_components() {
        merge_delta(base, &component, fields);
    }
}
