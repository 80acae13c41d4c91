//! Attack simulations. Each test states the attack and asserts that nothing
//! lands outside the storage root.

mod hostile_snapshot;
mod path_traversal;
