pub mod comment;
pub mod engagement;
pub mod post;
pub mod reply;
pub mod shared;
pub mod topic;
pub mod user;
