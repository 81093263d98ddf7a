pub mod board;
pub mod client;
pub mod columns;
pub mod frontmatter;
pub mod host;
pub mod loader;
pub mod naming;
pub mod storage;
pub mod sync;
pub mod trash;
pub mod types;
pub mod watcher;
