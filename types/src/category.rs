//! Report categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification attached to a report.
///
/// Reporters send a signed byte; any code outside the known range is
/// counted as [`Category::OtherSpam`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// The number was confirmed as a legitimate caller.
    Valid,
    Fraud,
    Marketing,
    Survey,
    Political,
    OtherSpam,
}

impl Category {
    /// All categories, in persisted counter order.
    pub const ALL: [Category; 6] = [
        Category::Valid,
        Category::Fraud,
        Category::Marketing,
        Category::Survey,
        Category::Political,
        Category::OtherSpam,
    ];

    /// Map a wire code to a category.
    pub fn from_code(code: i8) -> Self {
        match code {
            0 => Self::Valid,
            1 => Self::Fraud,
            2 => Self::Marketing,
            3 => Self::Survey,
            4 => Self::Political,
            _ => Self::OtherSpam,
        }
    }

    /// Canonical wire code.
    pub fn code(&self) -> i8 {
        match self {
            Self::Valid => 0,
            Self::Fraud => 1,
            Self::Marketing => 2,
            Self::Survey => 3,
            Self::Political => 4,
            Self::OtherSpam => 5,
        }
    }

    /// Position of this category's counter in a persisted aggregate.
    pub fn slot(&self) -> usize {
        self.code() as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Fraud => "fraud",
            Self::Marketing => "marketing",
            Self::Survey => "survey",
            Self::Political => "political",
            Self::OtherSpam => "other_spam",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_code(category.code()), category);
        }
    }

    #[test]
    fn unknown_codes_are_other_spam() {
        assert_eq!(Category::from_code(5), Category::OtherSpam);
        assert_eq!(Category::from_code(42), Category::OtherSpam);
        assert_eq!(Category::from_code(-1), Category::OtherSpam);
    }

    #[test]
    fn slots_are_dense() {
        let slots: Vec<usize> = Category::ALL.iter().map(Category::slot).collect();
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5]);
    }
}
