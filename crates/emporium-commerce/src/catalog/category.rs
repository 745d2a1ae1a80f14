//! Product categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::CategoryId;
use crate::CommerceError;

const NAME_MIN_CHARS: usize = 3;
const NAME_MAX_CHARS: usize = 100;

/// A flat grouping of products. Names are unique among live categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when the category is soft-deleted. Products keep pointing at it.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewCategory {
    pub fn validate(&self) -> Result<(), CommerceError> {
        validate_name(&self.name)
    }

    /// Build the stored category. Call [`NewCategory::validate`] first.
    pub fn into_category(self, now: DateTime<Utc>) -> Category {
        Category {
            id: CategoryId::generate(),
            name: self.name.trim().to_string(),
            description: self.description.filter(|d| !d.is_empty()),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Editable category fields. An empty description clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.is_empty() {
            return Err(CommerceError::validation("patch has no fields to update"));
        }
        match &self.name {
            Some(name) => validate_name(name),
            None => Ok(()),
        }
    }

    pub fn apply(self, category: &mut Category, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            category.name = name.trim().to_string();
        }
        if let Some(description) = self.description {
            category.description = Some(description).filter(|d| !d.is_empty());
        }
        category.updated_at = now;
    }
}

fn validate_name(name: &str) -> Result<(), CommerceError> {
    let chars = name.trim().chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
        return Err(CommerceError::validation(format!(
            "category name must be {} to {} characters",
            NAME_MIN_CHARS, NAME_MAX_CHARS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_length_bounds() {
        let input = |name: &str| NewCategory {
            name: name.into(),
            description: None,
        };
        assert!(input("Lighting").validate().is_ok());
        assert!(input(" ab ").validate().is_err());
        assert!(input(&"x".repeat(101)).validate().is_err());
    }

    #[test]
    fn test_into_category_trims_name() {
        let category = NewCategory {
            name: "  Lighting ".into(),
            description: Some(String::new()),
        }
        .into_category(Utc::now());
        assert_eq!(category.name, "Lighting");
        assert_eq!(category.description, None);
        assert!(!category.is_deleted());
    }

    #[test]
    fn test_patch_clears_description() {
        let now = Utc::now();
        let mut category = NewCategory {
            name: "Lighting".into(),
            description: Some("Lamps and bulbs".into()),
        }
        .into_category(now);

        let patch = CategoryPatch {
            description: Some(String::new()),
            ..CategoryPatch::default()
        };
        patch.validate().unwrap();
        patch.apply(&mut category, now);
        assert_eq!(category.name, "Lighting");
        assert_eq!(category.description, None);
    }

    #[test]
    fn test_empty_patch_rejected() {
        assert!(CategoryPatch::default().validate().is_err());
    }
}
