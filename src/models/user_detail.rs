use serde::{Deserialize, Serialize};
use std::fmt;

/// Profile data for a user. Keyed by `user_id`; at most one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    pub user_id: i64,
    pub age: i32,
    pub height: f64,
    pub weight: f64,
    pub birthday: String,
    pub gender: String,
    pub goal: String,
}

impl UserDetail {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            age: 0,
            height: 0.0,
            weight: 0.0,
            birthday: String::new(),
            gender: String::new(),
            goal: String::new(),
        }
    }

    /// Body mass index from height in centimetres and weight in kilograms.
    pub fn bmi(&self) -> Option<f64> {
        if self.height <= 0.0 || self.weight <= 0.0 {
            return None;
        }
        let metres = self.height / 100.0;
        Some(self.weight / (metres * metres))
    }
}

impl fmt::Display for UserDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Age: {}", self.age)?;
        writeln!(f, "Height: {} cm", self.height)?;
        writeln!(f, "Weight: {} kg", self.weight)?;
        if let Some(bmi) = self.bmi() {
            writeln!(f, "BMI: {:.1}", bmi)?;
        }
        writeln!(f, "Birthday: {}", self.birthday)?;
        writeln!(f, "Gender: {}", self.gender)?;
        write!(f, "Goal: {}", self.goal)
    }
}
