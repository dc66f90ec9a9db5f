//! Source lookups for failure analysis
//!
//! - `step_locator` - Failed step text to the handler implementing it
//! - `related` - Handler surroundings to page/service declarations
//! - `snippet` - Numbered source windows shared by both

pub mod related;
pub mod snippet;
pub mod step_locator;

pub use related::{CodeRole, ConventionRole, RelatedCodeFinder, RelatedCodeSnippet};
pub use step_locator::{StepDefinitionLocator, StepDefinitionMatch};
