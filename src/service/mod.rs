//! Request handling: the coordinator and its HTTP surface.

mod coordinator;
mod server;

pub use coordinator::{CoordinatorSettings, RequestCoordinator};
pub use server::{AppState, router};
