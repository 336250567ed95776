//! Keyword-based category inference for expense descriptions.

use std::fmt;

/// The closed set of expense categories. Every description classifies to
/// exactly one of these; `Other` is the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Groceries,
    Dining,
    Attractions,
    Transportation,
    Education,
    Fitness,
    Massage,
    Shakes,
    Orders,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "Groceries",
            Category::Dining => "Dining",
            Category::Attractions => "Attractions",
            Category::Transportation => "Transportation",
            Category::Education => "Education",
            Category::Fitness => "Fitness",
            Category::Massage => "Massage",
            Category::Shakes => "Shakes",
            Category::Orders => "Orders",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Declaration order is the tie-break: the first category with a matching
// keyword wins, so e.g. "fast food delivery" is Groceries (via "food"), not
// Dining or Orders.
const RULES: &[(Category, &[&str])] = &[
    (
        Category::Groceries,
        &[
            "groceries",
            "food",
            "supermarket",
            "market",
            "store",
            "shop",
            "household",
            "cleaning",
        ],
    ),
    (
        Category::Dining,
        &[
            "dinner",
            "lunch",
            "breakfast",
            "restaurant",
            "cafe",
            "food",
            "eat",
            "meal",
            "fast food",
            "delivery",
        ],
    ),
    (
        Category::Attractions,
        &[
            "attraction",
            "museum",
            "theme park",
            "tourist",
            "entertainment",
            "park",
            "waterfall",
            "boat",
            "tour",
            "sightseeing",
            "ticket",
            "entrance",
        ],
    ),
    (
        Category::Transportation,
        &[
            "taxi",
            "uber",
            "bolt",
            "grab",
            "bus",
            "train",
            "transport",
            "gas",
            "fuel",
            "car rental",
            "scooter rental",
            "rental",
            "metro",
            "subway",
        ],
    ),
    (
        Category::Education,
        &[
            "course",
            "book",
            "learning",
            "education",
            "study",
            "class",
            "school",
            "university",
            "college",
            "training",
        ],
    ),
    (
        Category::Fitness,
        &[
            "gym", "fitness", "sport", "exercise", "workout", "training", "yoga", "pilates",
            "swimming", "running",
        ],
    ),
    (
        Category::Massage,
        &["massage", "spa", "wellness", "therapy", "relaxation"],
    ),
    (
        Category::Shakes,
        &[
            "shake", "smoothie", "juice", "fruit", "drink", "beverage", "fresh", "blend",
        ],
    ),
    (
        Category::Orders,
        &[
            "order", "lazada", "decathlon", "amazon", "online", "shopping", "delivery",
            "purchase", "buy",
        ],
    ),
];

/// Maps a description to its category by case-insensitive keyword substring
/// matching over the declared rule order. Pure and total.
pub fn classify(description: &str) -> Category {
    let lowered = description.to_lowercase();
    for (category, keywords) in RULES {
        if keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return *category;
        }
    }
    Category::Other
}
