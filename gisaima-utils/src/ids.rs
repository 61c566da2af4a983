//! ID generation for entities addressed by opaque string keys (groups,
//! battles, structures, upgrades, crafts, chat events).

use uuid::Uuid;

/// Generates a fresh random entity id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
