use serde::{Deserialize, Serialize};
use std::fmt;

/// An exercise on a user's workout checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: Option<i64>,
    pub user_id: i64,
    pub content: String,
    pub target_sets: i32,
    pub completed_sets: i32,
}

impl WorkoutPlan {
    pub fn new(user_id: i64, content: impl Into<String>, target_sets: i32) -> Self {
        Self {
            id: None,
            user_id,
            content: content.into(),
            target_sets,
            completed_sets: 0,
        }
    }

    pub fn with_completed_sets(mut self, completed_sets: i32) -> Self {
        self.completed_sets = completed_sets;
        self
    }

    /// Fraction of target sets completed, clamped to `[0, 1]`.
    ///
    /// Always `0.0` when there is no positive target.
    pub fn progress(&self) -> f64 {
        if self.target_sets <= 0 {
            return 0.0;
        }
        (f64::from(self.completed_sets) / f64::from(self.target_sets)).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.target_sets > 0 && self.completed_sets >= self.target_sets
    }

    /// Marks one more set as done, never going past a positive target.
    pub fn record_set(&mut self) {
        if self.target_sets > 0 && self.completed_sets >= self.target_sets {
            return;
        }
        self.completed_sets = self.completed_sets.saturating_add(1);
    }
}

impl fmt::Display for WorkoutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_complete() { "x" } else { " " };
        write!(
            f,
            "[{}] {} ({}/{} sets, {:.0}%)",
            mark,
            self.content,
            self.completed_sets,
            self.target_sets,
            self.progress() * 100.0
        )
    }
}
