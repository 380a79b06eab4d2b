//! In-process backends used by tests and local runs without Postgres/Redis.

mod content;
mod session;

pub use content::MemoryBackend;
pub use session::{MemoryAvatarStore, MemoryImageStaging, MemoryTokenList};
