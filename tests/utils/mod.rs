// Test utilities - shared infrastructure for integration tests
#![allow(dead_code)]

pub mod actions;
pub mod assertions;
pub mod setup;

// Re-export commonly used items
#[allow(unused_imports)]
pub use actions::{player_at, view_of};
#[allow(unused_imports)]
pub use assertions::{assert_no_foreign_cards_on_wire, assert_private_view};
#[allow(unused_imports)]
pub use setup::{TestClient, TestSetup, TestSetupBuilder};
