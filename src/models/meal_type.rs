use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Meal slot of a diet plan entry. Stored as its integer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub const ALL: [MealType; 3] = [MealType::Breakfast, MealType::Lunch, MealType::Dinner];

    pub fn index(self) -> i64 {
        match self {
            MealType::Breakfast => 0,
            MealType::Lunch => 1,
            MealType::Dinner => 2,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(MealType::Breakfast),
            1 => Some(MealType::Lunch),
            2 => Some(MealType::Dinner),
            _ => None,
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MealType::Breakfast => write!(f, "breakfast"),
            MealType::Lunch => write!(f, "lunch"),
            MealType::Dinner => write!(f, "dinner"),
        }
    }
}

impl FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breakfast" | "0" => Ok(MealType::Breakfast),
            "lunch" | "1" => Ok(MealType::Lunch),
            "dinner" | "2" => Ok(MealType::Dinner),
            _ => Err(format!(
                "Invalid meal type '{}'. Valid options: breakfast, lunch, dinner",
                s
            )),
        }
    }
}
