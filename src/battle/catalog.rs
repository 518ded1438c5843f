use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::points::Points;

static STANDARD_CATALOG: Lazy<ScoringCatalog> = Lazy::new(|| ScoringCatalog {
    criteria: vec![
        Criterion::new("Fatality", Points::whole(3)),
        Criterion::new("Punch Line", Points::whole(2)),
        Criterion::new("Bom", Points::whole(1)),
        Criterion::new("Regular", Points::from_centi(50)),
        Criterion::new("Flow", Points::from_centi(50)),
        Criterion::new("C/C", Points::from_centi(50)),
        Criterion::new("Presença", Points::from_centi(50)),
        Criterion::new("Showman", Points::from_centi(50)),
        Criterion::new("Erro Grave", Points::ZERO),
    ],
});

/// 评分项：名称唯一，分值固定。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Criterion {
    pub name: String,
    pub points: Points,
}

impl Criterion {
    pub fn new(name: impl Into<String>, points: Points) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum CatalogError {
    #[error("unknown criterion `{name}`")]
    UnknownCriterion { name: String },
    #[error("criterion `{name}` is listed more than once")]
    DuplicateCriterion { name: String },
    #[error("criterion names must not be blank")]
    BlankName,
    #[error("scoring catalog must contain at least one criterion")]
    Empty,
}

/// 有序的评分项目录，顺序只影响展示与导出。
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ScoringCatalog {
    criteria: Vec<Criterion>,
}

impl ScoringCatalog {
    pub fn try_new(criteria: Vec<Criterion>) -> Result<Self, CatalogError> {
        if criteria.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for criterion in &criteria {
            if criterion.name.trim().is_empty() {
                return Err(CatalogError::BlankName);
            }
            if !seen.insert(criterion.name.as_str()) {
                return Err(CatalogError::DuplicateCriterion {
                    name: criterion.name.clone(),
                });
            }
        }
        Ok(Self { criteria })
    }

    /// 内置目录（Fatality=3 … Erro Grave=0）。
    pub fn standard() -> &'static ScoringCatalog {
        &STANDARD_CATALOG
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn lookup(&self, name: &str) -> Result<&Criterion, CatalogError> {
        self.criteria
            .iter()
            .find(|criterion| criterion.name == name)
            .ok_or_else(|| CatalogError::UnknownCriterion {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.criteria
            .iter()
            .position(|criterion| criterion.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.criteria.iter().map(|criterion| criterion.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl Default for ScoringCatalog {
    fn default() -> Self {
        Self::standard().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_keeps_display_order() {
        let names: Vec<&str> = ScoringCatalog::standard().names().collect();
        assert_eq!(
            names,
            vec![
                "Fatality",
                "Punch Line",
                "Bom",
                "Regular",
                "Flow",
                "C/C",
                "Presença",
                "Showman",
                "Erro Grave"
            ]
        );
    }

    #[test]
    fn lookup_returns_point_value() {
        let catalog = ScoringCatalog::standard();
        let punch = catalog.lookup("Punch Line").expect("Punch Line exists");
        assert_eq!(punch.points, Points::whole(2));
        let erro = catalog.lookup("Erro Grave").expect("Erro Grave exists");
        assert!(erro.points.is_zero());
    }

    #[test]
    fn lookup_is_exact_match() {
        let catalog = ScoringCatalog::standard();
        assert_eq!(
            catalog.lookup("fatality"),
            Err(CatalogError::UnknownCriterion {
                name: "fatality".into()
            })
        );
    }

    #[test]
    fn rejects_duplicates_blank_names_and_empty_lists() {
        let duplicate = vec![
            Criterion::new("Flow", Points::whole(1)),
            Criterion::new("Flow", Points::whole(2)),
        ];
        assert_eq!(
            ScoringCatalog::try_new(duplicate),
            Err(CatalogError::DuplicateCriterion {
                name: "Flow".into()
            })
        );
        assert_eq!(
            ScoringCatalog::try_new(vec![Criterion::new("  ", Points::ZERO)]),
            Err(CatalogError::BlankName)
        );
        assert_eq!(ScoringCatalog::try_new(Vec::new()), Err(CatalogError::Empty));
    }
}
