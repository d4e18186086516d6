//! Demographic breakdown of the personas behind a batch of conversations.
//!
//! Unlike a plain frequency count, every category in the table appears in the
//! output, with a zero count when no persona drew it. Dimensions and
//! categories come out in table order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::persona::Persona;
use super::table::DemographicCategoryTable;
use crate::error::{Result, SimError};

/// Counts and percentages for one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionBreakdown {
    pub raw_counts: IndexMap<String, usize>,
    pub percentages: IndexMap<String, f64>,
}

/// Dimension name to its breakdown.
pub type DemographicSummary = IndexMap<String, DimensionBreakdown>;

/// Reduces personas into per-dimension counts over the full category table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemographicAggregator;

impl DemographicAggregator {
    pub fn summarize<'a, I>(personas: I, table: &DemographicCategoryTable) -> Result<DemographicSummary>
    where
        I: IntoIterator<Item = &'a Persona>,
    {
        let personas: Vec<&Persona> = personas.into_iter().collect();
        if personas.is_empty() {
            return Err(SimError::empty_input(
                "demographic summary needs at least one persona",
            ));
        }
        let total = personas.len() as f64;

        let mut summary = DemographicSummary::new();
        for (dimension, categories) in table.iter() {
            let mut raw_counts: IndexMap<String, usize> =
                categories.iter().map(|c| (c.clone(), 0)).collect();

            for persona in &personas {
                match persona.get(dimension) {
                    Some(value) => match raw_counts.get_mut(value) {
                        Some(count) => *count += 1,
                        None => log::warn!(
                            "Persona value '{}' is not a '{}' category; ignored",
                            value,
                            dimension
                        ),
                    },
                    None => log::warn!("Persona has no value for dimension '{}'", dimension),
                }
            }

            let percentages = raw_counts
                .iter()
                .map(|(category, &count)| (category.clone(), round2(count as f64 / total * 100.0)))
                .collect();

            summary.insert(
                dimension.to_string(),
                DimensionBreakdown {
                    raw_counts,
                    percentages,
                },
            );
        }
        Ok(summary)
    }
}

/// Round to two decimal places, halves to even.
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
