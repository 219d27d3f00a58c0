//! Data layer: raw tables, cleaning, and filtering.
//!
//! Architecture:
//! ```text
//!  URL / path (.csv / .json / .parquet)
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  fetch + parse → RawTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  clean    │  schema check, numeric coercion → BlockDataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  grade bound + class set → visible indices
//!   └──────────┘
//! ```

pub mod clean;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
