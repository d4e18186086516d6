//! Synthetic buyer personas.

use std::collections::BTreeMap;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::table::DemographicCategoryTable;
use crate::error::{Result, SimError};

/// One synthetic customer profile: exactly one label per table dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Persona {
    traits: BTreeMap<String, String>,
}

impl Persona {
    pub fn new(traits: BTreeMap<String, String>) -> Self {
        Self { traits }
    }

    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.traits.get(dimension).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.traits.iter().map(|(d, v)| (d.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }
}

impl FromIterator<(String, String)> for Persona {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Renders as `dimension: label` pairs separated by `; `, the form embedded
/// in prompts.
impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (dimension, value) in &self.traits {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", dimension, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Samples personas uniformly and independently per dimension.
#[derive(Debug, Clone, Copy, Default)]
pub struct PersonaGenerator;

impl PersonaGenerator {
    /// Sample one persona using the thread-local RNG.
    pub fn generate(table: &DemographicCategoryTable) -> Result<Persona> {
        Self::generate_with_rng(table, &mut rand::thread_rng())
    }

    /// Sample one persona from the supplied RNG.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        table: &DemographicCategoryTable,
        rng: &mut R,
    ) -> Result<Persona> {
        if table.is_empty() {
            return Err(SimError::config("cannot sample from an empty demographic table"));
        }
        table
            .iter()
            .map(|(dimension, categories)| {
                categories
                    .choose(rng)
                    .map(|c| (dimension.to_string(), c.clone()))
                    .ok_or_else(|| {
                        SimError::config(format!("dimension '{}' has no categories", dimension))
                    })
            })
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Persona::new)
    }

    /// Sample `count` personas.
    pub fn generate_batch(table: &DemographicCategoryTable, count: usize) -> Result<Vec<Persona>> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| Self::generate_with_rng(table, &mut rng))
            .collect()
    }
}
