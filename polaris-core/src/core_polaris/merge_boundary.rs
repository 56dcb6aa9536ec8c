//! When a buffered remote meta change becomes safe to apply
//!
//! The server log delivers every intermediate rename and move, not a minimal
//! diff. Applying a change as soon as it arrives can alias two objects over a
//! name the log has already superseded, or hide a real conflict behind one.
//! A change received while the log is known to extend to `high_water` is held
//! until the remote cursor has consumed the log at least that far, so any
//! later change touching the same names or parents has been seen.

/// Boundary for a change at `received_tick` when the log reaches `remote_high_water`
pub fn merge_boundary(received_tick: i64, remote_high_water: i64) -> i64 {
    received_tick.max(remote_high_water)
}

/// Whether a change buffered with `boundary` may be applied at `remote_epoch`
pub fn is_safe_to_apply(boundary: i64, remote_epoch: Option<i64>) -> bool {
    remote_epoch.is_some_and(|epoch| epoch >= boundary)
}
