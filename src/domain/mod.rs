//! Capability implementations: tools, prompt templates and file resources
//!
//! Holds the registries the dispatcher routes to and the validation helpers they share.

pub mod prompts;
pub mod resources;
pub mod tools;
pub mod utils;
