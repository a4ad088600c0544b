use serde::{Deserialize, Serialize};
use std::fmt;

/// Spending category. This is a closed set; anything the rules table cannot
/// place lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Shopping,
    Bills,
    Healthcare,
    Education,
    Travel,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Food,
        Category::Transport,
        Category::Entertainment,
        Category::Shopping,
        Category::Bills,
        Category::Healthcare,
        Category::Education,
        Category::Travel,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Entertainment => "entertainment",
            Category::Shopping => "shopping",
            Category::Bills => "bills",
            Category::Healthcare => "healthcare",
            Category::Education => "education",
            Category::Travel => "travel",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword rules for inferring a category from free-form merchant or
/// description text.
///
/// Rules are evaluated in order and matching is case-insensitive substring
/// search, so this is best-effort classification, not a guarantee. The table
/// is a value so callers can supply their own rules instead of patching the
/// built-in list.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    rules: Vec<(Category, Vec<&'static str>)>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            rules: vec![
                (
                    Category::Food,
                    vec![
                        "restaurant", "coffee", "cafe", "grocer", "food", "pizza", "burger",
                        "deli", "bakery",
                    ],
                ),
                (
                    Category::Transport,
                    vec!["uber", "lyft", "gas", "fuel", "parking", "transit", "metro", "taxi"],
                ),
                (
                    Category::Entertainment,
                    vec!["cinema", "movie", "netflix", "spotify", "game", "concert", "theater"],
                ),
                (
                    Category::Shopping,
                    vec!["amazon", "store", "mall", "clothing", "shop", "retail", "market"],
                ),
                (
                    Category::Bills,
                    vec![
                        "electric", "utility", "utilities", "water", "internet", "phone", "rent",
                        "insurance", "subscription",
                    ],
                ),
                (
                    Category::Healthcare,
                    vec!["pharmacy", "doctor", "medical", "dental", "clinic", "hospital"],
                ),
                (
                    Category::Education,
                    vec!["tuition", "school", "university", "course", "book", "udemy"],
                ),
                (
                    Category::Travel,
                    vec!["airline", "flight", "hotel", "airbnb", "travel", "rental car"],
                ),
            ],
        }
    }
}

impl CategoryRules {
    pub fn new(rules: Vec<(Category, Vec<&'static str>)>) -> Self {
        Self { rules }
    }

    /// Classify free-form text. First matching rule wins; no match is `Other`.
    pub fn classify(&self, text: &str) -> Category {
        let haystack = text.to_lowercase();
        for (category, keywords) in &self.rules {
            if keywords.iter().any(|kw| haystack.contains(kw)) {
                return *category;
            }
        }
        Category::Other
    }
}
