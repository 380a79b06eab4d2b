pub(crate) mod clean_stream;
pub mod local_avatar_store;
pub mod local_image_staging;
pub mod traits;
pub mod webp;
