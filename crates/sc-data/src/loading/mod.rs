//! Turning buffer-window changes into loader calls

mod coordinator;
mod pending;

pub use coordinator::LoadCoordinator;
