mod backfill;
mod cache;
mod config;
