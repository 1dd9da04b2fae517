//! A small runnable sample project demonstrating the engine end to end:
//! an in-memory embedded-engine/authenticator pair, a cascading
//! `region -> city` parameter set, and a seed -> federate model chain.

pub mod auth;
pub mod engine;
pub mod project;

pub use auth::{DemoAuthenticator, DemoUser};
pub use engine::{FixedExternalConnection, InMemoryEngine};
