//! Prompt construction for workout generation and coaching calls.

use crate::coaching::ExerciseRequest;
use crate::types::{PerformanceRecord, SessionSummary, StructuredWorkout};
use serde::Serialize;

const SYSTEM_PROMPT: &str = r#"You are an expert fitness trainer and workout planner. Create detailed, safe, and effective workout routines.

Key Guidelines:
- Always include proper warm-up exercises (5-10 minutes)
- Always include cool-down stretches (5-10 minutes)
- Provide specific sets, reps, and rest periods
- Consider user's available time and equipment
- Suggest appropriate weights based on fitness level
- Include exercise descriptions and form tips
- Ensure balanced muscle group targeting

Format your response as JSON with this structure:
{
  "name": "Workout Name",
  "description": "Brief description",
  "estimatedDuration": 45,
  "category": "strength|cardio|full_body|flexibility",
  "exercises": [
    {
      "name": "Exercise Name",
      "description": "How to perform",
      "category": "warmup|main|cooldown",
      "sets": 3,
      "reps": 10,
      "duration": null,
      "restBetweenSets": 60,
      "equipment": "bodyweight|weights|bands",
      "weight": null,
      "bandStrength": null,
      "notes": "Form tips or modifications"
    }
  ],
  "aiNotes": "Additional recommendations from AI"
}"#;

const OPTIMIZE_SYSTEM_PROMPT: &str = r#"You are an expert fitness trainer. Analyze and optimize workout routines based on user feedback and performance history.

Provide specific recommendations for:
- Exercise substitutions
- Set/rep adjustments
- Weight modifications
- Rest period optimization
- Exercise order improvements
- Warm-up and cool-down additions

Format your response as JSON with this structure:
{
  "optimizations": [
    {
      "type": "substitution|adjustment|addition|removal",
      "exerciseName": "Current exercise name",
      "suggestion": "Specific recommendation",
      "reason": "Why this change is beneficial"
    }
  ],
  "newRoutine": {
    "name": "Optimized Workout Name",
    "description": "Updated description",
    "estimatedDuration": 45,
    "exercises": [...]
  },
  "aiNotes": "Summary of changes and reasoning"
}"#;

const REPLACEMENT_SYSTEM_PROMPT: &str = r#"You are an expert fitness trainer. Suggest alternative exercises that target the same muscle groups and provide similar benefits.

Consider:
- User's available equipment
- Exercise difficulty level
- Muscle group targeting
- Injury prevention
- Variety and progression

Format response as JSON:
{
  "originalExercise": "Exercise name",
  "replacements": [
    {
      "name": "Alternative exercise name",
      "description": "How to perform",
      "equipment": "required equipment",
      "difficulty": "beginner|intermediate|advanced",
      "reason": "Why this is a good replacement"
    }
  ]
}"#;

const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are an expert fitness trainer analyzing workout performance data. Provide insights and recommendations for improvement.

Analyze:
- Performance trends
- Weight progression
- Exercise difficulty ratings
- Rest periods
- Overall workout effectiveness

Format response as JSON:
{
  "insights": [
    {
      "type": "trend|recommendation|warning",
      "title": "Insight title",
      "description": "Detailed explanation",
      "action": "Recommended action"
    }
  ],
  "recommendations": [
    {
      "category": "weight|reps|rest|form",
      "suggestion": "Specific recommendation",
      "reason": "Why this helps"
    }
  ]
}"#;

const EXERCISE_SYSTEM_PROMPT: &str = r#"You are an expert fitness trainer and exercise specialist. Create detailed, safe, and effective exercises based on user requests.

Key Guidelines:
- Always prioritize safety and proper form
- Provide clear, step-by-step instructions
- Consider available equipment and user fitness level
- Include target muscle groups and benefits
- Add safety tips and modifications when appropriate

Format your response as JSON with this structure:
{
  "name": "Exercise Name",
  "description": "Brief description of the exercise",
  "category": "strength|cardio|flexibility|balance|sports",
  "equipment": "bodyweight|dumbbells|resistance_bands|barbell|kettlebell|cardio_machine",
  "instructions": "Step-by-step instructions for proper form",
  "safetyTips": "Important safety considerations",
  "targetMuscles": "Primary and secondary muscle groups targeted"
}"#;

/// A prompt split the way chat-style APIs expect it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// Single-string form for providers without a system role
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Build the workout generation prompt
///
/// History, when present, is passed through as JSON so the model can see
/// recent loads and how hard they felt.
pub fn workout_prompt(request: &str, history: &[PerformanceRecord]) -> Prompt {
    let mut user = format!("Create a workout routine based on this request: \"{}\"\n", request);

    if !history.is_empty() {
        user.push_str(&format!(
            "\nUser's recent workout history: {}\n",
            to_prompt_json(history, "workout history", "[]")
        ));
    }

    user.push_str("\nPlease create a complete workout that fits the user's needs and preferences.");

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Ask for changes to an existing routine
pub fn optimization_prompt(
    routine: &StructuredWorkout,
    history: &[PerformanceRecord],
    request: &str,
) -> Prompt {
    let user = format!(
        "Optimize this workout routine: {}\n\nUser's request: \"{}\"\n\nUser's workout history: {}\n\nPlease provide specific, actionable recommendations.",
        to_prompt_json(routine, "routine", "{}"),
        request,
        to_prompt_json(history, "workout history", "[]")
    );
    Prompt {
        system: OPTIMIZE_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Ask for alternatives to one exercise
pub fn replacement_prompt(exercise_name: &str, reason: &str, history: &[PerformanceRecord]) -> Prompt {
    let user = format!(
        "Suggest replacements for: {}\n\nReason for replacement: {}\n\nUser's equipment and history: {}",
        exercise_name,
        reason,
        to_prompt_json(history, "workout history", "[]")
    );
    Prompt {
        system: REPLACEMENT_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Ask for insights on one logged session
pub fn analysis_prompt(session: &SessionSummary, history: &[PerformanceRecord]) -> Prompt {
    let user = format!(
        "Analyze this workout session: {}\n\nUser's recent history: {}",
        to_prompt_json(session, "session", "{}"),
        to_prompt_json(history, "workout history", "[]")
    );
    Prompt {
        system: ANALYSIS_SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Ask for a single new exercise
pub fn exercise_prompt(request: &ExerciseRequest) -> Prompt {
    let mut user = format!(
        "Create a detailed exercise based on this description: \"{}\"",
        request.description()
    );
    if let Some(equipment) = &request.equipment {
        user.push_str(&format!(" Equipment available: {}", equipment));
    }
    if let Some(muscles) = &request.target_muscles {
        user.push_str(&format!(" Target muscles: {}", muscles));
    }
    if let Some(difficulty) = &request.difficulty {
        user.push_str(&format!(" Difficulty level: {}", difficulty));
    }
    user.push_str(
        "\n\nPlease provide:\n\
         - Exercise name\n\
         - Description\n\
         - Category (strength, cardio, flexibility, etc.)\n\
         - Equipment needed\n\
         - Step-by-step instructions\n\
         - Safety tips\n\
         - Target muscle groups\n\n\
         Format as JSON with these fields: name, description, category, equipment, instructions, safetyTips, targetMuscles",
    );
    Prompt {
        system: EXERCISE_SYSTEM_PROMPT.to_string(),
        user,
    }
}

fn to_prompt_json<T: Serialize + ?Sized>(value: &T, what: &str, empty: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::warn!("Could not serialize {} for prompt: {}", what, e);
        empty.to_string()
    })
}
