//! Fixture-driven replay tests for the intent-annotator span store.
//!
//! Test cases are `.ann` files: a text with inline `«label:text»` markers
//! followed by `> ` replay steps (add, clear, edit, expect).
//!
//! ## Modules
//!
//! - [`parser`] - Parses `.ann` fixture files
//! - [`fixture`] - Fixture data structures
//! - [`loader`] - Fixture discovery and loading
//! - [`runner`] - Replays steps and collects mismatches
//! - [`errors`] - Error types for the harness

pub mod errors;
pub mod fixture;
pub mod loader;
pub mod parser;
pub mod runner;

pub use errors::{SpecError, SpecResult};
pub use fixture::{AddExpect, AnnFixture, ReplayStep, SpanMarker, Step, Target};
pub use loader::{discover_fixtures, load_all_fixtures, load_fixture, FixtureFile};
pub use parser::{parse_fixture, parse_spans, parse_step};
pub use runner::{run_fixture, ReplayReport, StepFailure};
