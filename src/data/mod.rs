//! Data layer: signal decoding, run loading and sample metadata.
//!
//! Architecture:
//! ```text
//!   SAMPLE01.D/
//!     DAD1A.ch ──────────────┐            SAMPLE.XML / Report.TXT
//!                            ▼                      │
//!   ┌────────┐  scale  ┌─────────┐  N  ┌───────────┐ │
//!   │ header │ ──────▶ │ decoder │ ──▶ │ time_axis │ │
//!   └────────┘         └─────────┘     └───────────┘ │
//!        │                                  │        ▼
//!        └────────────▶  Trace  ◀───────────┘   ┌──────────┐
//!                          │                    │ metadata │
//!                          ▼                    └──────────┘
//!                     ┌────────┐                     │
//!                     │ loader │ ◀───────────────────┘
//!                     └────────┘   LoadedRun
//! ```

pub mod decoder;
pub mod error;
pub mod header;
pub mod loader;
pub mod metadata;
pub mod model;
pub mod time_axis;
