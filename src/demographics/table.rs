//! The demographic category table.
//!
//! A [`DemographicCategoryTable`] is the authoritative set of allowed labels
//! per dimension. It is used both for sampling personas and for completing
//! the category space when aggregating.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SimError};

/// Mapping from dimension name to its ordered list of category labels.
///
/// Dimensions keep the order they were declared in. Validated on
/// construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IndexMap<String, Vec<String>>", into = "IndexMap<String, Vec<String>>")]
pub struct DemographicCategoryTable {
    dimensions: IndexMap<String, Vec<String>>,
}

impl DemographicCategoryTable {
    /// Build a table, rejecting empty tables, empty dimensions and duplicate
    /// labels within a dimension.
    pub fn new(dimensions: IndexMap<String, Vec<String>>) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(SimError::config("demographic table has no dimensions"));
        }
        for (dimension, categories) in &dimensions {
            if dimension.trim().is_empty() {
                return Err(SimError::config("demographic dimension name is blank"));
            }
            if categories.is_empty() {
                return Err(SimError::config(format!(
                    "dimension '{}' has no categories",
                    dimension
                )));
            }
            let mut seen = HashSet::new();
            for category in categories {
                if !seen.insert(category.as_str()) {
                    return Err(SimError::config(format!(
                        "dimension '{}' lists category '{}' more than once",
                        dimension, category
                    )));
                }
            }
        }
        Ok(Self { dimensions })
    }

    /// Build a table from a JSON-like value.
    ///
    /// Accepts either a bare `{dimension: [labels]}` object or one wrapped in
    /// a top-level `"demographics"` object. A wrapper with sibling keys is
    /// rejected; a top-level `"demographics"` list is an ordinary dimension.
    pub fn from_value(value: Value) -> Result<Self> {
        let inner = match value {
            Value::Object(mut map) if map.get(WRAPPER_KEY).is_some_and(Value::is_object) => {
                if map.len() > 1 {
                    return Err(SimError::config(format!(
                        "demographic table mixes a '{}' wrapper with top-level dimensions",
                        WRAPPER_KEY
                    )));
                }
                map.remove(WRAPPER_KEY).unwrap_or(Value::Null)
            }
            other => other,
        };

        let object = match inner {
            Value::Object(map) => map,
            _ => {
                return Err(SimError::config(
                    "demographic table must be an object of dimension -> category list",
                ))
            }
        };

        let mut dimensions = IndexMap::new();
        for (dimension, categories) in object {
            let list = categories.as_array().ok_or_else(|| {
                SimError::config(format!("dimension '{}' must be a list", dimension))
            })?;
            let labels = list
                .iter()
                .map(|c| {
                    c.as_str().map(str::to_string).ok_or_else(|| {
                        SimError::config(format!(
                            "dimension '{}' contains a non-string category",
                            dimension
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            dimensions.insert(dimension, labels);
        }
        Self::new(dimensions)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| SimError::config(format!("invalid demographic JSON: {}", e)))?;
        Self::from_value(value)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)
            .map_err(|e| SimError::config(format!("invalid demographic YAML: {}", e)))?;
        Self::from_value(value)
    }

    /// Load a table from disk. `.yaml`/`.yml` files are read as YAML,
    /// anything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SimError::config(format!(
                "cannot read demographic table '{}': {}",
                path.display(),
                e
            ))
        })?;
        let table = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text)?,
            _ => Self::from_json_str(&text)?,
        };
        log::info!(
            "Loaded demographic table from {} ({} dimensions)",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Iterate over `(dimension, categories)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.dimensions
            .iter()
            .map(|(d, c)| (d.as_str(), c.as_slice()))
    }

    pub fn categories(&self, dimension: &str) -> Option<&[String]> {
        self.dimensions.get(dimension).map(Vec::as_slice)
    }

    pub fn contains(&self, dimension: &str, category: &str) -> bool {
        self.categories(dimension)
            .map(|cats| cats.iter().any(|c| c == category))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

impl TryFrom<IndexMap<String, Vec<String>>> for DemographicCategoryTable {
    type Error = SimError;

    fn try_from(dimensions: IndexMap<String, Vec<String>>) -> Result<Self> {
        Self::new(dimensions)
    }
}

impl From<DemographicCategoryTable> for IndexMap<String, Vec<String>> {
    fn from(table: DemographicCategoryTable) -> Self {
        table.dimensions
    }
}

impl Default for DemographicCategoryTable {
    fn default() -> Self {
        let dimensions = DEFAULT_DIMENSIONS
            .iter()
            .map(|(name, cats)| {
                (
                    name.to_string(),
                    cats.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();
        Self { dimensions }
    }
}

/// Key that may wrap the dimensions in a table file.
const WRAPPER_KEY: &str = "demographics";

/// Built-in category table used when no table file is configured.
const DEFAULT_DIMENSIONS: &[(&str, &[&str])] = &[
    (
        "religion",
        &[
            "Christianity",
            "Islam",
            "Judaism",
            "Hinduism",
            "Buddhism",
            "Atheism/Agnosticism/Non-religious",
            "Sikhism",
            "Other",
        ],
    ),
    (
        "race",
        &[
            "White",
            "Black or African American",
            "Asian",
            "American Indian or Alaska Native",
            "Native Hawaiian or Pacific Islander",
            "Multiracial",
            "Other",
        ],
    ),
    ("sex", &["Male", "Female"]),
    ("age", &["18-24", "25-34", "35-44", "45-54", "55-64", "65+"]),
    (
        "political_affiliation",
        &[
            "Democrat",
            "Republican",
            "Independent",
            "Libertarian",
            "Green Party",
            "Other",
            "Unaffiliated",
        ],
    ),
    (
        "location",
        &[
            "New York City",
            "Los Angeles",
            "Chicago",
            "Houston",
            "Dallas",
            "Washington, D.C.",
            "San Francisco",
            "Philadelphia",
            "Atlanta",
            "Boston",
        ],
    ),
    (
        "income",
        &[
            "<$25,000",
            "$25,000-$50,000",
            "$50,000-$75,000",
            "$75,000-$100,000",
            "$100,000-$1M",
            "$1M-$10M",
            "$10M-$100M",
        ],
    ),
    (
        "sexual_orientation",
        &[
            "Heterosexual",
            "Homosexual",
            "Bisexual",
            "Asexual",
            "Pansexual",
            "Queer",
            "Other",
        ],
    ),
    ("marital_status", &["Married", "Single", "Divorced", "Widowed"]),
    ("children", &["Yes", "No"]),
    ("property_owner", &["Yes", "No"]),
    (
        "industry",
        &[
            "Technology",
            "Healthcare",
            "Finance",
            "Education",
            "Manufacturing",
            "Retail",
            "Construction",
            "Agriculture",
            "Service Industry",
            "Other",
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_table_is_valid() {
        let table = DemographicCategoryTable::default();
        assert_eq!(table.len(), 12);
        assert_eq!(table.categories("sex").unwrap(), ["Male", "Female"]);
        let dims: IndexMap<String, Vec<String>> = table.clone().into();
        assert!(DemographicCategoryTable::new(dims).is_ok());
    }

    #[test]
    fn test_rejects_empty_table() {
        let err = DemographicCategoryTable::new(IndexMap::new()).unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
    }

    #[test]
    fn test_rejects_empty_dimension() {
        let mut dims = IndexMap::new();
        dims.insert("sex".to_string(), vec![]);
        let err = DemographicCategoryTable::new(dims).unwrap_err();
        assert!(err.to_string().contains("'sex' has no categories"));
    }

    #[test]
    fn test_rejects_duplicate_category() {
        let mut dims = IndexMap::new();
        dims.insert(
            "children".to_string(),
            vec!["Yes".to_string(), "Yes".to_string()],
        );
        assert!(DemographicCategoryTable::new(dims).is_err());
    }

    #[test]
    fn test_from_json_with_wrapper_key() {
        let table = DemographicCategoryTable::from_json_str(
            r#"{"demographics": {"sex": ["Male", "Female"], "children": ["Yes", "No"]}}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.contains("children", "No"));
        assert!(!table.contains("children", "Maybe"));
    }

    #[test]
    fn test_from_json_bare_object() {
        let table = DemographicCategoryTable::from_json_str(r#"{"sex": ["Male"]}"#).unwrap();
        assert_eq!(table.categories("sex").unwrap(), ["Male"]);
    }

    #[test]
    fn test_from_json_rejects_non_string_category() {
        let err = DemographicCategoryTable::from_json_str(r#"{"age": [18, 25]}"#).unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = "demographics:\n  sex:\n    - Male\n    - Female\n";
        let table = DemographicCategoryTable::from_yaml_str(yaml).unwrap();
        assert_eq!(table.categories("sex").unwrap().len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"income": ["low", "high"]}}"#).unwrap();
        let table = DemographicCategoryTable::load(file.path()).unwrap();
        assert_eq!(table.categories("income").unwrap(), ["low", "high"]);
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = DemographicCategoryTable::load("/nonexistent/demographics.json").unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
    }

    #[test]
    fn test_keeps_declared_order() {
        let table = DemographicCategoryTable::from_json_str(
            r#"{"sex": ["Male", "Female"], "age": ["65+", "18-24"]}"#,
        )
        .unwrap();
        let names: Vec<&str> = table.iter().map(|(d, _)| d).collect();
        assert_eq!(names, ["sex", "age"]);
        assert_eq!(table.categories("age").unwrap(), ["65+", "18-24"]);

        let default = DemographicCategoryTable::default();
        assert_eq!(default.iter().next().unwrap().0, "religion");
    }

    #[test]
    fn test_rejects_wrapper_with_sibling_dimensions() {
        let err = DemographicCategoryTable::from_json_str(
            r#"{"demographics": {"sex": ["Male"]}, "age": ["18-24"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
        assert!(err.to_string().contains("wrapper"));
    }

    #[test]
    fn test_dimension_named_demographics() {
        let table = DemographicCategoryTable::from_json_str(
            r#"{"demographics": ["urban", "rural"], "sex": ["Male"]}"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.categories("demographics").unwrap(), ["urban", "rural"]);
    }

    #[test]
    fn test_deserialize_validates() {
        let result: std::result::Result<DemographicCategoryTable, _> =
            serde_json::from_str(r#"{"sex": []}"#);
        assert!(result.is_err());
    }
}
