//! The closed set of categories a file can be sorted into.
//!
//! A [`Category`] can only be obtained from a [`Taxonomy`], so every category
//! value in flight is either a configured category or the fallback sentinel.
//! Model output is never turned into a category without going through
//! [`Taxonomy::resolve`].

use std::fmt;
use std::sync::Arc;

use crate::config::ConfigError;

/// Categories used when no configuration file overrides them, in declaration order.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "HR",
    "Finance",
    "Academics",
    "Projects",
    "Marketing",
    "Personal",
];

/// Sentinel category for files no classifier was confident about.
pub const DEFAULT_FALLBACK: &str = "Review_Required";

/// A member of a [`Taxonomy`]: a configured category or the fallback sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    name: Arc<str>,
    fallback: bool,
}

impl Category {
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Whether this is the "needs human review" sentinel.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Ordered, immutable category set plus its fallback sentinel.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    categories: Vec<Category>,
    fallback: Category,
}

impl Taxonomy {
    /// Build a taxonomy from category names in declaration order.
    ///
    /// Names are trimmed. Rejects an empty list, blank or duplicate names, and a
    /// fallback name that collides with a regular category.
    pub fn new<I, S>(names: I, fallback: &str) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fallback = fallback.trim();
        if fallback.is_empty() {
            return Err(ConfigError::Invalid("fallback category name is empty".into()));
        }

        let mut categories: Vec<Category> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid("category name is empty".into()));
            }
            if name == fallback {
                return Err(ConfigError::FallbackCollision(name.to_string()));
            }
            if categories.iter().any(|c| c.as_str() == name) {
                return Err(ConfigError::DuplicateCategory(name.to_string()));
            }
            categories.push(Category {
                name: Arc::from(name),
                fallback: false,
            });
        }

        if categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }

        Ok(Self {
            categories,
            fallback: Category {
                name: Arc::from(fallback),
                fallback: true,
            },
        })
    }

    /// Look up a regular category by exact (case-sensitive) name.
    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.as_str() == name)
    }

    /// Map an untrusted name onto the closed set: a known category, or the fallback.
    pub fn resolve(&self, name: &str) -> Category {
        self.get(name).cloned().unwrap_or_else(|| self.fallback.clone())
    }

    pub fn fallback(&self) -> &Category {
        &self.fallback
    }

    /// Regular categories in declaration order (fallback excluded).
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Comma-separated category list for model prompts.
    pub fn prompt_list(&self) -> String {
        self.categories
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|name| Category {
                    name: Arc::from(*name),
                    fallback: false,
                })
                .collect(),
            fallback: Category {
                name: Arc::from(DEFAULT_FALLBACK),
                fallback: true,
            },
        }
    }
}
