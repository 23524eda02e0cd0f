//! Built-in catalog of fallback workouts.
//!
//! One canned workout per archetype. Entries are stored in fixed order so
//! that the generated output is identical from run to run.

use crate::types::{ExercisePhase, WorkoutCategory};
use once_cell::sync::Lazy;

/// Workout archetypes the fallback generator can produce
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Archetype {
    UpperBody,
    LowerBody,
    Core,
    Cardio,
    FullBody,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::UpperBody,
        Archetype::LowerBody,
        Archetype::Core,
        Archetype::Cardio,
        Archetype::FullBody,
    ];
}

/// How an exercise is loaded
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Load {
    /// Always bodyweight, whatever the request says
    Bodyweight,
    /// Takes the requested equipment; `dumbbell_lbs` applies with free weights
    Equipment { dumbbell_lbs: f64 },
}

/// One exercise in a catalog workout
#[derive(Clone, Debug)]
pub struct CatalogExercise {
    pub name: &'static str,
    pub description: &'static str,
    pub phase: ExercisePhase,
    pub sets: u32,
    pub reps: Option<u32>,
    /// Seconds
    pub duration: Option<u32>,
    pub rest_between_sets: u32,
    pub load: Load,
    pub notes: &'static str,
}

/// A canned workout for one archetype
#[derive(Clone, Debug)]
pub struct CatalogWorkout {
    pub archetype: Archetype,
    pub name: &'static str,
    pub description: &'static str,
    pub category: WorkoutCategory,
    pub exercises: Vec<CatalogExercise>,
    pub notes: &'static str,
}

/// The complete fallback catalog
#[derive(Clone, Debug)]
pub struct Catalog {
    pub workouts: Vec<CatalogWorkout>,
}

impl Catalog {
    /// Workout for an archetype
    ///
    /// A catalog missing the archetype answers with its first entry; an empty
    /// one defers to the default catalog, which [`Catalog::validate`] keeps
    /// complete.
    pub fn workout(&self, archetype: Archetype) -> &CatalogWorkout {
        if let Some(workout) = self.workouts.iter().find(|w| w.archetype == archetype) {
            return workout;
        }
        match self.workouts.first() {
            Some(first) => {
                tracing::warn!("Catalog has no {:?} workout, using '{}'", archetype, first.name);
                first
            }
            None => {
                tracing::warn!("Catalog is empty, using the default catalog");
                get_default_catalog().workout(archetype)
            }
        }
    }
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

#[allow(clippy::too_many_arguments)]
fn bodyweight(
    name: &'static str,
    description: &'static str,
    phase: ExercisePhase,
    sets: u32,
    reps: Option<u32>,
    duration: Option<u32>,
    rest_between_sets: u32,
    notes: &'static str,
) -> CatalogExercise {
    CatalogExercise {
        name,
        description,
        phase,
        sets,
        reps,
        duration,
        rest_between_sets,
        load: Load::Bodyweight,
        notes,
    }
}

fn loaded(
    name: &'static str,
    description: &'static str,
    sets: u32,
    reps: u32,
    dumbbell_lbs: f64,
    notes: &'static str,
) -> CatalogExercise {
    CatalogExercise {
        name,
        description,
        phase: ExercisePhase::Main,
        sets,
        reps: Some(reps),
        duration: None,
        rest_between_sets: 60,
        load: Load::Equipment { dumbbell_lbs },
        notes,
    }
}

/// Builds the default catalog
pub fn build_default_catalog() -> Catalog {
    use ExercisePhase::*;

    let upper_body = CatalogWorkout {
        archetype: Archetype::UpperBody,
        name: "Upper Body Strength",
        description: "Comprehensive upper body workout targeting chest, back, shoulders, and arms",
        category: WorkoutCategory::Strength,
        exercises: vec![
            bodyweight(
                "Push-ups",
                "Start in plank position, lower body until chest nearly touches ground, push back up",
                Warmup,
                2,
                Some(5),
                None,
                30,
                "Modify by doing knee push-ups if needed",
            ),
            loaded(
                "Dumbbell Rows",
                "Bend forward, pull dumbbell to chest while keeping back straight",
                3,
                12,
                15.0,
                "Focus on squeezing shoulder blades together",
            ),
            loaded(
                "Shoulder Press",
                "Press dumbbells overhead while keeping core engaged",
                3,
                10,
                12.0,
                "Keep back straight, don't arch",
            ),
            bodyweight(
                "Tricep Dips",
                "Use chair or bench, lower body by bending elbows, push back up",
                Main,
                3,
                Some(10),
                None,
                60,
                "Keep elbows close to body",
            ),
            bodyweight(
                "Arm Circles",
                "Stand with arms out, make small circles forward and backward",
                Cooldown,
                1,
                None,
                Some(60),
                0,
                "Gentle stretching for shoulders",
            ),
        ],
        notes: "This is a fallback workout while AI is unavailable. It targets all major upper body muscle groups with proper warm-up and cool-down.",
    };

    let lower_body = CatalogWorkout {
        archetype: Archetype::LowerBody,
        name: "Lower Body Strength",
        description: "Leg-focused workout building the quads, hamstrings, glutes, and calves",
        category: WorkoutCategory::Strength,
        exercises: vec![
            bodyweight(
                "Leg Swings",
                "Hold a wall for balance and swing each leg forward and back",
                Warmup,
                1,
                Some(10),
                None,
                0,
                "Swing both directions on each leg",
            ),
            loaded(
                "Goblet Squats",
                "Hold a weight at your chest, sit back and down until thighs are parallel",
                3,
                12,
                20.0,
                "Keep chest up and knees tracking over toes",
            ),
            loaded(
                "Romanian Deadlifts",
                "Hinge at the hips with a slight knee bend, lower the weight along your legs",
                3,
                10,
                20.0,
                "Keep the back flat throughout",
            ),
            loaded(
                "Reverse Lunges",
                "Step back into a lunge, lower the back knee toward the floor, return to standing",
                3,
                10,
                12.0,
                "Reps are per leg",
            ),
            bodyweight(
                "Calf Raises",
                "Rise onto the balls of your feet, pause, lower slowly",
                Main,
                3,
                Some(15),
                None,
                45,
                "Use a step for extra range",
            ),
            bodyweight(
                "Hamstring Stretch",
                "Sit with one leg extended and reach toward your toes",
                Cooldown,
                1,
                None,
                Some(60),
                0,
                "Hold each side without bouncing",
            ),
        ],
        notes: "This is a fallback workout while AI is unavailable. It works the major lower body muscle groups with a warm-up and stretch.",
    };

    let core = CatalogWorkout {
        archetype: Archetype::Core,
        name: "Core Stability",
        description: "Abdominal and trunk workout for stability and control",
        category: WorkoutCategory::Strength,
        exercises: vec![
            bodyweight(
                "Cat-Cow",
                "On hands and knees, alternate arching and rounding the spine",
                Warmup,
                1,
                Some(10),
                None,
                0,
                "Move with the breath",
            ),
            bodyweight(
                "Plank",
                "Hold a straight line from head to heels on forearms and toes",
                Main,
                3,
                None,
                Some(45),
                45,
                "Squeeze glutes, don't let hips sag",
            ),
            bodyweight(
                "Dead Bugs",
                "On your back, extend opposite arm and leg while keeping the low back down",
                Main,
                3,
                Some(10),
                None,
                45,
                "Reps are per side",
            ),
            loaded(
                "Russian Twists",
                "Sit leaning back with feet raised, rotate the torso side to side",
                3,
                16,
                10.0,
                "Count each side as one rep",
            ),
            bodyweight(
                "Child's Pose",
                "Kneel, sit back on your heels and reach your arms forward",
                Cooldown,
                1,
                None,
                Some(60),
                0,
                "Breathe into the lower back",
            ),
        ],
        notes: "This is a fallback workout while AI is unavailable. It trains the core from several angles with a gentle cool-down.",
    };

    let cardio = CatalogWorkout {
        archetype: Archetype::Cardio,
        name: "Cardio Conditioning",
        description: "Bodyweight intervals to raise the heart rate and build endurance",
        category: WorkoutCategory::Cardio,
        exercises: vec![
            bodyweight(
                "Marching in Place",
                "March with high knees and pumping arms at an easy pace",
                Warmup,
                1,
                None,
                Some(120),
                0,
                "Gradually increase the pace",
            ),
            bodyweight(
                "Jumping Jacks",
                "Jump feet out while raising arms overhead, then return",
                Main,
                3,
                None,
                Some(45),
                30,
                "Step out instead of jumping for low impact",
            ),
            bodyweight(
                "Mountain Climbers",
                "From a plank, drive knees toward the chest one at a time",
                Main,
                3,
                None,
                Some(30),
                30,
                "Keep hips level",
            ),
            loaded(
                "Squat to Press",
                "Squat down, then drive up and press the weight overhead in one motion",
                3,
                12,
                10.0,
                "Move continuously between reps",
            ),
            bodyweight(
                "Walking Recovery",
                "Walk slowly and let the breathing settle",
                Cooldown,
                1,
                None,
                Some(120),
                0,
                "Finish with light stretching",
            ),
        ],
        notes: "This is a fallback workout while AI is unavailable. It alternates work and short rests to build conditioning.",
    };

    let full_body = CatalogWorkout {
        archetype: Archetype::FullBody,
        name: "Full Body Workout",
        description: "Balanced session covering legs, push, pull, and core",
        category: WorkoutCategory::FullBody,
        exercises: vec![
            bodyweight(
                "Jumping Jacks",
                "Jump feet out while raising arms overhead, then return",
                Warmup,
                1,
                None,
                Some(60),
                0,
                "Keep a light, steady rhythm",
            ),
            loaded(
                "Squats",
                "Stand shoulder-width apart, sit back and down, drive up through the heels",
                3,
                12,
                20.0,
                "Keep weight in the heels",
            ),
            bodyweight(
                "Push-ups",
                "Start in plank position, lower body until chest nearly touches ground, push back up",
                Main,
                3,
                Some(10),
                None,
                60,
                "Modify by doing knee push-ups if needed",
            ),
            loaded(
                "Bent-over Rows",
                "Hinge forward and pull the weight toward your lower ribs",
                3,
                12,
                15.0,
                "Squeeze shoulder blades at the top",
            ),
            bodyweight(
                "Plank",
                "Hold a straight line from head to heels on forearms and toes",
                Main,
                2,
                None,
                Some(30),
                30,
                "Squeeze glutes, don't let hips sag",
            ),
            bodyweight(
                "Standing Quad Stretch",
                "Balance on one leg and pull the other heel toward your glutes",
                Cooldown,
                1,
                None,
                Some(60),
                0,
                "Hold each side",
            ),
        ],
        notes: "This is a fallback workout while AI is unavailable. It covers every major muscle group with a warm-up and cool-down.",
    };

    Catalog {
        workouts: vec![upper_body, lower_body, core, cardio, full_body],
    }
}

impl Catalog {
    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for archetype in Archetype::ALL {
            let count = self
                .workouts
                .iter()
                .filter(|w| w.archetype == archetype)
                .count();
            if count != 1 {
                errors.push(format!(
                    "Archetype {:?} has {} workouts, expected exactly 1",
                    archetype, count
                ));
            }
        }

        for workout in &self.workouts {
            if workout.name.is_empty() {
                errors.push(format!("{:?} workout has empty name", workout.archetype));
            }
            if workout.exercises.is_empty() {
                errors.push(format!("Workout '{}' has no exercises", workout.name));
            }

            for exercise in &workout.exercises {
                if exercise.name.is_empty() {
                    errors.push(format!("Workout '{}' has unnamed exercise", workout.name));
                }
                if exercise.reps.is_none() && exercise.duration.is_none() {
                    errors.push(format!(
                        "Exercise '{}' in '{}' has neither reps nor duration",
                        exercise.name, workout.name
                    ));
                }
                if let Load::Equipment { dumbbell_lbs } = exercise.load {
                    if dumbbell_lbs <= 0.0 {
                        errors.push(format!(
                            "Exercise '{}' has non-positive weight {}",
                            exercise.name, dumbbell_lbs
                        ));
                    }
                }
            }

            let phases: Vec<_> = workout.exercises.iter().map(|e| e.phase).collect();
            if phases.first() != Some(&ExercisePhase::Warmup) {
                errors.push(format!("Workout '{}' does not open with a warm-up", workout.name));
            }
            if phases.last() != Some(&ExercisePhase::Cooldown) {
                errors.push(format!("Workout '{}' does not end with a cool-down", workout.name));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_catalog_defers_to_default() {
        let empty = Catalog { workouts: vec![] };
        assert_eq!(empty.workout(Archetype::LowerBody).name, "Lower Body Strength");
    }

    #[test]
    fn test_missing_archetype_uses_first_workout() {
        let mut catalog = build_default_catalog();
        catalog.workouts.retain(|w| w.archetype != Archetype::Cardio);
        assert_eq!(catalog.workout(Archetype::Cardio).name, "Upper Body Strength");
    }

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.workouts.len(), 5);
    }

    #[test]
    fn test_every_archetype_has_a_workout() {
        let catalog = get_default_catalog();
        for archetype in Archetype::ALL {
            assert_eq!(catalog.workout(archetype).archetype, archetype);
        }
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_validate_reports_missing_archetype() {
        let mut catalog = build_default_catalog();
        catalog.workouts.retain(|w| w.archetype != Archetype::Cardio);
        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("Cardio")));
    }
}
