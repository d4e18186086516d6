//! Demographic parameter space: the category table, persona sampling and
//! the per-dimension breakdown of a persona population.

pub mod analysis;
pub mod persona;
pub mod table;

pub use analysis::{DemographicAggregator, DemographicSummary, DimensionBreakdown};
pub use persona::{Persona, PersonaGenerator};
pub use table::DemographicCategoryTable;
