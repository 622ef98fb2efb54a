pub mod backfill;
pub mod report;
pub mod setup;
pub mod ui;
