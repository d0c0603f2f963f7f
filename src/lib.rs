pub mod config;
pub mod errors;
pub mod extract;
pub mod pipeline;
pub mod project;
pub mod prompts;
pub mod sandbox;
pub mod util;
