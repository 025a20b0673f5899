//! Domain logic for the chip labeling service.
//!
//! Everything in this crate is pure: no file or network I/O. Persistence
//! lives in `chiplabel-store`, orchestration in `chiplabel-queue`.

pub mod chip_status;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod history;
pub mod tiles;
pub mod types;
