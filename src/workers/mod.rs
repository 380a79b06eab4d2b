pub mod avatar_cleanup;
pub mod engagement_reconcile;
pub mod image_cleanup;
pub mod token_sweep;
