//! Skin-condition categories, severity bands, and per-category counts.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::bands::band_lookup;

/// A detectable skin-condition category.
///
/// The declaration order is the order used everywhere results are listed:
/// recommendation blocks, report findings, and admin views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Acne,
    Wrinkle,
    Eyebag,
    Redness,
}

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Self; 4] = [Self::Acne, Self::Wrinkle, Self::Eyebag, Self::Redness];

    /// Machine key used in URLs, JSON, and model names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Acne => "acne",
            Self::Wrinkle => "wrinkle",
            Self::Eyebag => "eyebag",
            Self::Redness => "redness",
        }
    }

    /// Human-readable (Turkish) name shown to users.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Acne => "Sivilce",
            Self::Wrinkle => "Kırışıklık",
            Self::Eyebag => "Göz Altı Torbası",
            Self::Redness => "Kızarıklık",
        }
    }

    /// Counting unit: redness is reported in regions, everything else in items.
    #[must_use]
    pub const fn unit(self) -> &'static str {
        match self {
            Self::Redness => "bölge",
            _ => "adet",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "acne" => Ok(Self::Acne),
            "wrinkle" => Ok(Self::Wrinkle),
            "eyebag" => Ok(Self::Eyebag),
            "redness" => Ok(Self::Redness),
            _ => Err(format!("invalid category: {s}")),
        }
    }
}

/// Severity of a single finding, derived from its count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Severity bands as `(lower_bound, severity)`, highest bound first.
pub const SEVERITY_BANDS: &[(u32, Severity)] = &[
    (6, Severity::High),
    (3, Severity::Medium),
    (0, Severity::Low),
];

impl Severity {
    /// Classify a count: Low below 3, Medium below 6, High otherwise.
    #[must_use]
    pub fn from_count(count: u32) -> Self {
        band_lookup(SEVERITY_BANDS, count).unwrap_or(Self::Low)
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Düşük",
            Self::Medium => "Orta",
            Self::High => "Yüksek",
        }
    }

    /// Hex color used for web and PDF rendering.
    #[must_use]
    pub const fn color_hex(self) -> &'static str {
        match self {
            Self::Low => "#2ECC71",
            Self::Medium => "#F1C40F",
            Self::High => "#E74C3C",
        }
    }

    /// RGB triple of [`Severity::color_hex`].
    #[must_use]
    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Low => (0x2E, 0xCC, 0x71),
            Self::Medium => (0xF1, 0xC4, 0x0F),
            Self::High => (0xE7, 0x4C, 0x3C),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detection counts for the four condition categories.
///
/// Counts are unsigned, so they can never be negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConditionCounts {
    pub acne: u32,
    pub wrinkle: u32,
    pub eyebag: u32,
    pub redness: u32,
}

impl ConditionCounts {
    /// Create counts in canonical category order.
    #[must_use]
    pub const fn new(acne: u32, wrinkle: u32, eyebag: u32, redness: u32) -> Self {
        Self {
            acne,
            wrinkle,
            eyebag,
            redness,
        }
    }

    /// Count for one category.
    #[must_use]
    pub const fn get(&self, category: Category) -> u32 {
        match category {
            Category::Acne => self.acne,
            Category::Wrinkle => self.wrinkle,
            Category::Eyebag => self.eyebag,
            Category::Redness => self.redness,
        }
    }

    /// Set the count for one category.
    pub fn set(&mut self, category: Category, count: u32) {
        match category {
            Category::Acne => self.acne = count,
            Category::Wrinkle => self.wrinkle = count,
            Category::Eyebag => self.eyebag = count,
            Category::Redness => self.redness = count,
        }
    }

    /// Iterate `(category, count)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }

    /// Whether any category has at least one detection.
    #[must_use]
    pub fn has_any(&self) -> bool {
        self.iter().any(|(_, count)| count > 0)
    }
}

/// Anything that exposes the four per-category counts.
///
/// Implemented by persisted analyses so the pure scoring functions can run
/// on them directly.
pub trait HasConditionCounts {
    /// The four counts of this record.
    fn condition_counts(&self) -> ConditionCounts;
}

impl HasConditionCounts for ConditionCounts {
    fn condition_counts(&self) -> ConditionCounts {
        *self
    }
}
