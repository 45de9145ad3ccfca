pub mod classify;
pub mod embedder;
pub mod extract;
pub mod keypool;
pub mod pipeline;
pub mod prompts;
pub mod runtime;
pub mod summarize;
pub mod worker;

pub use keypool::KeyPool;
pub use runtime::Runtime;
pub use worker::Worker;
