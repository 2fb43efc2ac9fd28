//! Place category helpers
//!
//! Categories travel as free-form strings from the backends. These helpers
//! infer a category when a backend omits it and map categories to the marker
//! color tag used on the map.

use serde::{Deserialize, Serialize};

/// Category assigned when nothing better is known
pub const DEFAULT_CATEGORY: &str = "other";

const INFERENCE_RULES: &[(&[&str], &str)] = &[
    (&["restaurant", "café", "cafe", "bar", "bistro", "brasserie"], "restaurants"),
    (&["hotel", "hostel", "auberge"], "lodging"),
    (&["shop", "store", "boutique", "magasin", "market"], "shopping"),
    (&["museum", "musée", "park", "parc", "cinema", "theatre"], "leisure"),
    (&["pharmacy", "pharmacie", "hospital", "clinic"], "health"),
];

/// Infer a category from a place name
#[must_use]
pub fn infer_category(name: &str) -> &'static str {
    let lowered = name.to_lowercase();
    INFERENCE_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
        .map_or(DEFAULT_CATEGORY, |(_, category)| category)
}

/// Marker color derived from a place category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Orange,
    Purple,
    Green,
    Red,
    Pink,
    Indigo,
    Teal,
    #[default]
    Blue,
}

impl ColorTag {
    /// Pick the color for a category (case-insensitive)
    #[must_use]
    pub fn for_category(category: &str) -> Self {
        match category.trim().to_lowercase().as_str() {
            "restaurants" | "restaurant" | "food" => Self::Orange,
            "lodging" | "hotels" | "hébergements" => Self::Purple,
            "shopping" | "shops" | "commerces" => Self::Green,
            "leisure" | "loisirs" => Self::Red,
            "health" | "santé" => Self::Pink,
            "education" | "éducation" => Self::Indigo,
            "services" => Self::Teal,
            _ => Self::Blue,
        }
    }

    /// Hex color used when drawing
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Orange => "#f97316",
            Self::Purple => "#a855f7",
            Self::Green => "#22c55e",
            Self::Red => "#ef4444",
            Self::Pink => "#ec4899",
            Self::Indigo => "#6366f1",
            Self::Teal => "#14b8a6",
            Self::Blue => "#3b82f6",
        }
    }
}
