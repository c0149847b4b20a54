//! Global kernel-descriptor cache.
//!
//! Maps operator descriptions to shared layernorm-ba descriptors so every
//! kernel built for the same configuration reads the same constant buffers.
//! Uses papaya's lock-free HashMap for thread-safe access.
//!
//! # Thread Safety
//!
//! All operations are thread-safe. Racing first builds of one description
//! each run [`LayernormBaKd::build`], but exactly one result is kept and
//! handed to every caller.

use std::sync::{Arc, OnceLock};

use normjit_ir::OperatorDesc;
use papaya::HashMap;

use crate::Result;
use crate::layernorm_ba::LayernormBaKd;

// Descriptors live until explicitly cleared via clear_all().
static DESCRIPTORS: OnceLock<HashMap<OperatorDesc, Arc<LayernormBaKd>>> = OnceLock::new();

fn descriptors() -> &'static HashMap<OperatorDesc, Arc<LayernormBaKd>> {
    DESCRIPTORS.get_or_init(HashMap::new)
}

/// Get the cached descriptor for `op_desc`, building it on first use.
///
/// Build errors are returned to the caller and not cached.
pub fn get_or_build_descriptor(op_desc: &OperatorDesc) -> Result<Arc<LayernormBaKd>> {
    let map = descriptors();
    let guard = map.guard();

    if let Some(cached) = map.get(op_desc, &guard) {
        return Ok(Arc::clone(cached));
    }

    let built = Arc::new(LayernormBaKd::build(op_desc)?);

    // If another thread beat us, use theirs.
    use papaya::{Compute, Operation};
    match map.compute(
        op_desc.clone(),
        |entry| match entry {
            Some((_, existing)) => Operation::Abort(Arc::clone(existing)),
            None => Operation::Insert(Arc::clone(&built)),
        },
        &guard,
    ) {
        Compute::Inserted(_, kd) => Ok(Arc::clone(kd)),
        Compute::Aborted(kd) => Ok(kd),
        _ => Ok(built),
    }
}

/// Clear all cached descriptors.
///
/// Kernels keep their own `Arc`, so descriptors in use stay alive.
pub fn clear_all() {
    let guard = descriptors().guard();
    descriptors().clear(&guard);
}

/// Snapshot of every cached descriptor.
pub fn cached_descriptors() -> Vec<Arc<LayernormBaKd>> {
    let map = descriptors();
    let guard = map.guard();
    map.iter(&guard).map(|(_, kd)| Arc::clone(kd)).collect()
}
