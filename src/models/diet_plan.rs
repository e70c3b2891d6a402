use serde::{Deserialize, Serialize};
use std::fmt;

use super::meal_type::MealType;

/// A food entry on a user's diet checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietPlan {
    pub id: Option<i64>,
    pub user_id: i64,
    pub food: String,
    pub meal_type: MealType,
}

impl DietPlan {
    pub fn new(user_id: i64, food: impl Into<String>, meal_type: MealType) -> Self {
        Self {
            id: None,
            user_id,
            food: food.into(),
            meal_type,
        }
    }
}

impl fmt::Display for DietPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<9} {}", self.meal_type, self.food)
    }
}
