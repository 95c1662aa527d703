mod backfill;
mod resolve;

pub use backfill::cmd_backfill_show;
pub use resolve::cmd_resolve;
