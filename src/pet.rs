use serde::{Deserialize, Serialize};

/// Health points are bounded to this range after every mutation.
pub const HEALTH_MIN: i32 = 0;
pub const HEALTH_MAX: i32 = 100;

/// Health thresholds used when an interaction rescores the mood.
pub const HAPPY_THRESHOLD: i32 = 70;
pub const SAD_THRESHOLD: i32 = 30;

/// Sentiment scores outside this range are clamped before they are applied.
pub const MOOD_IMPACT_MIN: i32 = -10;
pub const MOOD_IMPACT_MAX: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Sad,
    Neutral,
    Happy,
}

impl Mood {
    /// One step toward Happy. Saturates at Happy.
    pub fn step_up(self) -> Mood {
        match self {
            Mood::Sad => Mood::Neutral,
            Mood::Neutral => Mood::Happy,
            Mood::Happy => Mood::Happy,
        }
    }

    /// One step toward Sad. Saturates at Sad.
    pub fn step_down(self) -> Mood {
        match self {
            Mood::Happy => Mood::Neutral,
            Mood::Neutral => Mood::Sad,
            Mood::Sad => Mood::Sad,
        }
    }

    /// Mood derived from health thresholds, used after interaction scoring.
    pub fn from_health(health_points: i32) -> Mood {
        if health_points >= HAPPY_THRESHOLD {
            Mood::Happy
        } else if health_points <= SAD_THRESHOLD {
            Mood::Sad
        } else {
            Mood::Neutral
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mood::Sad => write!(f, "sad"),
            Mood::Neutral => write!(f, "neutral"),
            Mood::Happy => write!(f, "happy"),
        }
    }
}

impl std::str::FromStr for Mood {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "sad" => Ok(Mood::Sad),
            "neutral" => Ok(Mood::Neutral),
            "happy" => Ok(Mood::Happy),
            _ => Err(anyhow::anyhow!("Unknown mood: {}", s)),
        }
    }
}

/// Category returned by the food image classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoodCategory {
    Food,
    JunkFood,
    NonFood,
}

impl FoodCategory {
    pub fn health_delta(self) -> i32 {
        match self {
            FoodCategory::Food => 10,
            FoodCategory::JunkFood => 5,
            FoodCategory::NonFood => 0,
        }
    }

    /// Feeding overrides the mood outright instead of stepping it.
    pub fn mood_override(self) -> Mood {
        match self {
            FoodCategory::Food => Mood::Happy,
            FoodCategory::JunkFood => Mood::Sad,
            FoodCategory::NonFood => Mood::Neutral,
        }
    }
}

impl std::fmt::Display for FoodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FoodCategory::Food => write!(f, "food"),
            FoodCategory::JunkFood => write!(f, "junk_food"),
            FoodCategory::NonFood => write!(f, "non_food"),
        }
    }
}

impl std::str::FromStr for FoodCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "food" => Ok(FoodCategory::Food),
            "junk_food" => Ok(FoodCategory::JunkFood),
            "non_food" => Ok(FoodCategory::NonFood),
            _ => Err(anyhow::anyhow!("Unknown food category: {}", s)),
        }
    }
}

/// Persisted pet state for one user.
///
/// Invariant: `HEALTH_MIN <= health_points <= HEALTH_MAX` after every
/// mutator application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetState {
    pub health_points: i32,
    pub mood: Mood,
}

impl Default for PetState {
    fn default() -> Self {
        PetState {
            health_points: HEALTH_MAX,
            mood: Mood::Neutral,
        }
    }
}

impl PetState {
    /// Completing a todo steps the mood one level toward Happy.
    /// Health is unchanged. Idempotence of the triggering todo is the
    /// gateway's job, not this function's.
    pub fn apply_todo_completion(self) -> PetState {
        PetState {
            health_points: self.health_points,
            mood: self.mood.step_up(),
        }
    }

    /// Feeding adds the category's health delta and sets the mood from
    /// the category directly. Unlike the todo path, this is an override,
    /// not a step.
    pub fn apply_food_classification(self, category: FoodCategory) -> PetState {
        PetState {
            health_points: clamp_health(self.health_points + category.health_delta()),
            mood: category.mood_override(),
        }
    }

    /// An interaction score moves health by the (clamped) impact and
    /// rescores the mood from the health thresholds.
    pub fn apply_interaction_score(self, mood_impact: i32) -> PetState {
        let impact = mood_impact.clamp(MOOD_IMPACT_MIN, MOOD_IMPACT_MAX);
        let health_points = clamp_health(self.health_points + impact);
        PetState {
            health_points,
            mood: Mood::from_health(health_points),
        }
    }

    /// One scheduled health tick. Mood regression runs on its own sweep.
    pub fn apply_decay_tick(self) -> PetState {
        PetState {
            health_points: (self.health_points - 1).max(HEALTH_MIN),
            mood: self.mood,
        }
    }
}

fn clamp_health(value: i32) -> i32 {
    value.clamp(HEALTH_MIN, HEALTH_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = PetState::default();
        assert_eq!(state.health_points, 100);
        assert_eq!(state.mood, Mood::Neutral);
    }

    #[test]
    fn test_mood_ordering() {
        assert!(Mood::Sad < Mood::Neutral);
        assert!(Mood::Neutral < Mood::Happy);
    }

    #[test]
    fn test_todo_completion_steps_mood() {
        let state = PetState {
            health_points: 50,
            mood: Mood::Sad,
        };

        let state = state.apply_todo_completion();
        assert_eq!(state.mood, Mood::Neutral);
        assert_eq!(state.health_points, 50);

        let state = state.apply_todo_completion();
        assert_eq!(state.mood, Mood::Happy);
    }

    #[test]
    fn test_todo_completion_noop_at_happy() {
        let state = PetState {
            health_points: 80,
            mood: Mood::Happy,
        };

        let after = state.apply_todo_completion();
        assert_eq!(after, state);
    }

    #[test]
    fn test_food_adds_health_and_overrides_mood() {
        let state = PetState {
            health_points: 40,
            mood: Mood::Sad,
        };

        let after = state.apply_food_classification(FoodCategory::Food);
        assert_eq!(after.health_points, 50);
        assert_eq!(after.mood, Mood::Happy);

        let after = state.apply_food_classification(FoodCategory::JunkFood);
        assert_eq!(after.health_points, 45);
        assert_eq!(after.mood, Mood::Sad);

        let after = state.apply_food_classification(FoodCategory::NonFood);
        assert_eq!(after.health_points, 40);
        assert_eq!(after.mood, Mood::Neutral);
    }

    #[test]
    fn test_food_clamps_at_max() {
        let state = PetState {
            health_points: 95,
            mood: Mood::Neutral,
        };

        let after = state.apply_food_classification(FoodCategory::Food);
        assert_eq!(after.health_points, 100);
        assert_eq!(after.mood, Mood::Happy);
    }

    #[test]
    fn test_interaction_score_thresholds() {
        let state = PetState {
            health_points: 65,
            mood: Mood::Neutral,
        };

        // 65 + 10 = 75 -> happy
        let after = state.apply_interaction_score(10);
        assert_eq!(after.health_points, 75);
        assert_eq!(after.mood, Mood::Happy);

        // 65 - 10 = 55 -> neutral
        let after = state.apply_interaction_score(-10);
        assert_eq!(after.health_points, 55);
        assert_eq!(after.mood, Mood::Neutral);

        let low = PetState {
            health_points: 35,
            mood: Mood::Neutral,
        };

        // 35 - 10 = 25 -> sad
        let after = low.apply_interaction_score(-10);
        assert_eq!(after.health_points, 25);
        assert_eq!(after.mood, Mood::Sad);
    }

    #[test]
    fn test_interaction_score_clamps_impact() {
        let state = PetState {
            health_points: 50,
            mood: Mood::Neutral,
        };

        // An out-of-range impact is treated as +/-10, not applied raw.
        let after = state.apply_interaction_score(100);
        assert_eq!(after.health_points, 60);

        let after = state.apply_interaction_score(-100);
        assert_eq!(after.health_points, 40);
    }

    #[test]
    fn test_interaction_score_clamps_health() {
        let state = PetState {
            health_points: 98,
            mood: Mood::Happy,
        };
        assert_eq!(state.apply_interaction_score(10).health_points, 100);

        let state = PetState {
            health_points: 3,
            mood: Mood::Sad,
        };
        assert_eq!(state.apply_interaction_score(-10).health_points, 0);
    }

    #[test]
    fn test_decay_tick() {
        let state = PetState {
            health_points: 97,
            mood: Mood::Happy,
        };

        let after = state.apply_decay_tick();
        assert_eq!(after.health_points, 96);
        assert_eq!(after.mood, Mood::Happy);
    }

    #[test]
    fn test_decay_tick_floors_at_zero() {
        let state = PetState {
            health_points: 0,
            mood: Mood::Sad,
        };

        assert_eq!(state.apply_decay_tick().health_points, 0);
    }

    #[test]
    fn test_health_invariant_holds_across_mutators() {
        let extremes = [0, 1, 50, 99, 100];
        for hp in extremes {
            let state = PetState {
                health_points: hp,
                mood: Mood::Neutral,
            };

            for next in [
                state.apply_todo_completion(),
                state.apply_food_classification(FoodCategory::Food),
                state.apply_food_classification(FoodCategory::JunkFood),
                state.apply_interaction_score(10),
                state.apply_interaction_score(-10),
                state.apply_decay_tick(),
            ] {
                assert!(next.health_points >= HEALTH_MIN);
                assert!(next.health_points <= HEALTH_MAX);
            }
        }
    }

    #[test]
    fn test_mood_string_round_trip() {
        for mood in [Mood::Sad, Mood::Neutral, Mood::Happy] {
            let parsed: Mood = mood.to_string().parse().unwrap();
            assert_eq!(parsed, mood);
        }

        for category in [FoodCategory::Food, FoodCategory::JunkFood, FoodCategory::NonFood] {
            let parsed: FoodCategory = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }
}
