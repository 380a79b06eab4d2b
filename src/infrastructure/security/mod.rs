pub mod jwt;
pub mod passwords;
