use clap::{Parser, Subcommand};
use repforge_core::catalog::get_default_catalog;
use repforge_core::coaching::{
    GeneratedExercise, OptimizationPlan, PerformanceAnalysis, ReplacementSuggestions,
};
use repforge_core::history::{recent_performance, session_summary};
use repforge_core::*;
use serde::Serialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Sessions of history attached to `generate --with-history`
const HISTORY_SESSIONS: usize = 5;

#[derive(Parser)]
#[command(name = "repforge")]
#[command(about = "Workout generation and routine management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Act as this user
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a workout from a free-form request
    Generate {
        /// What you want, e.g. "30 minute upper body with dumbbells"
        request: String,

        /// Send recent workout history to the providers
        #[arg(long)]
        with_history: bool,

        /// Save the result as a new routine
        #[arg(long)]
        save: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Generate a time-boxed workout for one focus area
    Quick {
        /// Available minutes
        #[arg(long)]
        minutes: u32,

        /// Focus area (legs, core, upper body, ...)
        #[arg(long)]
        focus: String,

        /// Save the result as a new routine
        #[arg(long)]
        save: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Replace every exercise on a routine from a JSON file
    Replace {
        routine_id: i64,

        /// File containing {"exercises": [...]}, or - for stdin
        #[arg(long)]
        file: PathBuf,
    },

    /// Show a routine and its exercises
    Show {
        routine_id: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Summaries of recent completed sessions
    History {
        /// Number of sessions to show
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Ask the providers to improve a saved routine
    Optimize {
        routine_id: i64,

        /// What to change, e.g. "less time on warm-up"
        request: String,

        /// Replace the routine's exercises with the suggested routine
        #[arg(long)]
        apply: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Suggest alternatives to an exercise
    Replacements {
        /// Exercise to replace
        exercise: String,

        /// Why it needs replacing
        #[arg(long)]
        reason: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Get insights on a logged session
    Analyze {
        session_id: i64,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Describe a new exercise
    Exercise {
        /// What the exercise should do, e.g. "hip opener for runners"
        description: String,

        /// Equipment available
        #[arg(long)]
        equipment: Option<String>,

        /// Muscles to target
        #[arg(long)]
        target_muscles: Option<String>,

        /// beginner, intermediate or advanced
        #[arg(long)]
        difficulty: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check each configured provider
    Status,
}

/// Resolved config, database path and user for one invocation
struct Context {
    config: Config,
    db_path: PathBuf,
    user_id: String,
}

impl Context {
    fn open_db(&self) -> Result<Database> {
        Database::open(&self.db_path)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateOutput<'a> {
    #[serde(flatten)]
    result: &'a GenerationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    routine_id: Option<i64>,
}

fn main() -> ExitCode {
    // Initialize logging
    repforge_core::logging::init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = Context {
        db_path: cli
            .db
            .unwrap_or_else(|| config.data.database_path.clone()),
        user_id: cli.user.unwrap_or_else(|| config.user.id.clone()),
        config,
    };
    tracing::debug!(db = %ctx.db_path.display(), user = %ctx.user_id, "Resolved context");

    match cli.command {
        Commands::Generate {
            request,
            with_history,
            save,
            json,
        } => {
            let mut request = GenerationRequest::new(request)?;
            if with_history {
                let db = ctx.open_db()?;
                request = request.with_history(recent_performance(&db, &ctx.user_id, HISTORY_SESSIONS)?);
            }
            cmd_generate(&ctx, &request, save, json)
        }
        Commands::Quick {
            minutes,
            focus,
            save,
            json,
        } => cmd_generate(&ctx, &GenerationRequest::quick(minutes, &focus)?, save, json),
        Commands::Replace { routine_id, file } => cmd_replace(&ctx, routine_id, &file),
        Commands::Show { routine_id, json } => cmd_show(&ctx, routine_id, json),
        Commands::History { limit } => cmd_history(&ctx, limit),
        Commands::Optimize {
            routine_id,
            request,
            apply,
            json,
        } => cmd_optimize(&ctx, routine_id, &request, apply, json),
        Commands::Replacements {
            exercise,
            reason,
            json,
        } => cmd_replacements(&ctx, &exercise, reason.as_deref(), json),
        Commands::Analyze { session_id, json } => cmd_analyze(&ctx, session_id, json),
        Commands::Exercise {
            description,
            equipment,
            target_muscles,
            difficulty,
            json,
        } => {
            let mut request = ExerciseRequest::new(description)?;
            request.equipment = equipment;
            request.target_muscles = target_muscles;
            request.difficulty = difficulty;
            cmd_exercise(&ctx, &request, json)
        }
        Commands::Status => cmd_status(&ctx),
    }
}

fn cmd_generate(ctx: &Context, request: &GenerationRequest, save: bool, json: bool) -> Result<()> {
    // The fallback generator draws from the built-in catalog
    let errors = get_default_catalog().validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::Other("Invalid catalog".into()));
    }

    let orchestrator = GenerationOrchestrator::from_config(&ctx.config)?;
    let result = orchestrator.generate(request);

    let routine_id = if save {
        let mut db = ctx.open_db()?;
        let saved = RoutineSyncEngine::new(&ctx.user_id).save_workout(&mut db, &result.workout)?;
        Some(saved.routine.id)
    } else {
        None
    };

    if json {
        let output = GenerateOutput {
            result: &result,
            routine_id,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    display_result(&result);
    if let Some(id) = routine_id {
        println!("\n✓ Saved as routine {}", id);
    }
    Ok(())
}

fn cmd_replace(ctx: &Context, routine_id: i64, file: &Path) -> Result<()> {
    let body = if file == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };

    let specs = parse_replace_request(&body)?;
    let mut db = ctx.open_db()?;
    let exercises =
        RoutineSyncEngine::new(&ctx.user_id).replace_exercises(&mut db, routine_id, &specs)?;

    println!(
        "✓ Routine {} now has {} exercise(s)",
        routine_id,
        exercises.len()
    );
    for exercise in &exercises {
        println!("  {}", format_persisted(exercise));
    }
    Ok(())
}

fn cmd_show(ctx: &Context, routine_id: i64, json: bool) -> Result<()> {
    let db = ctx.open_db()?;
    let routine = db
        .get_routine(routine_id)?
        .ok_or(Error::RoutineNotFound(routine_id))?;
    let exercises = db.routine_exercises(routine_id)?;

    if json {
        let saved = SavedRoutine { routine, exercises };
        println!("{}", serde_json::to_string_pretty(&saved)?);
        return Ok(());
    }

    println!("=== {} ===", routine.name);
    if let Some(description) = &routine.description {
        println!("{}", description);
    }
    println!(
        "Category: {} | Estimated duration: {} min",
        routine.category.as_deref().unwrap_or("-"),
        routine
            .estimated_duration
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".into())
    );
    println!();

    if exercises.is_empty() {
        println!("No exercises yet.");
    }
    for exercise in &exercises {
        println!("  {}", format_persisted(exercise));
        if !exercise.notes.is_empty() {
            println!("     {}", exercise.notes);
        }
    }
    Ok(())
}

fn cmd_history(ctx: &Context, limit: usize) -> Result<()> {
    let db = ctx.open_db()?;
    let sessions = db.recent_sessions(&ctx.user_id, limit)?;

    if sessions.is_empty() {
        println!("No completed sessions yet.");
        return Ok(());
    }

    for session in sessions {
        let summary = session_summary(&db, session.id)?;
        println!(
            "{}  {} ({} min, {} sets)",
            summary.session.started_at.format("%Y-%m-%d %H:%M"),
            summary.routine_name,
            summary.duration_minutes,
            summary.total_sets
        );
        for exercise in &summary.exercises {
            println!(
                "    {} {} x{}{}",
                exercise.difficulty.emoji(),
                exercise.name,
                exercise.sets,
                exercise
                    .weight
                    .map(|w| format!(" @ {:.1} lbs", w))
                    .unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn cmd_optimize(ctx: &Context, routine_id: i64, request: &str, apply: bool, json: bool) -> Result<()> {
    let mut db = ctx.open_db()?;
    let routine = db
        .get_routine(routine_id)?
        .ok_or(Error::RoutineNotFound(routine_id))?;
    let current = StructuredWorkout::from_saved(&routine, &db.routine_exercises(routine_id)?);
    let history = recent_performance(&db, &ctx.user_id, HISTORY_SESSIONS)?;

    let orchestrator = GenerationOrchestrator::from_config(&ctx.config)?;
    let plan = orchestrator.optimize_routine(&current, &history, request)?;

    let applied = match (&plan.answer.new_routine, apply && !plan.degraded) {
        (Some(new_routine), true) if !new_routine.exercises.is_empty() => {
            let specs: Vec<ExerciseSpec> = new_routine
                .exercises
                .iter()
                .map(ExerciseSpec::from_workout_exercise)
                .collect();
            Some(RoutineSyncEngine::new(&ctx.user_id).replace_exercises(&mut db, routine_id, &specs)?)
        }
        _ => None,
    };
    if apply && applied.is_none() {
        tracing::warn!("No usable routine in the optimization reply; routine {} left as is", routine_id);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    display_plan(&plan.answer, &plan.provenance, plan.degraded);
    match applied {
        Some(exercises) => {
            println!("\n✓ Routine {} now has {} exercise(s)", routine_id, exercises.len());
            for exercise in &exercises {
                println!("  {}", format_persisted(exercise));
            }
        }
        None if apply => println!("\nNo routine changes were applied."),
        None => {}
    }
    Ok(())
}

fn cmd_replacements(ctx: &Context, exercise: &str, reason: Option<&str>, json: bool) -> Result<()> {
    let db = ctx.open_db()?;
    let history = recent_performance(&db, &ctx.user_id, HISTORY_SESSIONS)?;

    let orchestrator = GenerationOrchestrator::from_config(&ctx.config)?;
    let suggestions = orchestrator.suggest_replacements(exercise, reason, &history)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&suggestions)?);
        return Ok(());
    }
    display_replacements(&suggestions.answer, &suggestions.provenance);
    Ok(())
}

fn cmd_analyze(ctx: &Context, session_id: i64, json: bool) -> Result<()> {
    let db = ctx.open_db()?;
    let summary = session_summary(&db, session_id)?;
    let history = recent_performance(&db, &ctx.user_id, HISTORY_SESSIONS)?;

    let orchestrator = GenerationOrchestrator::from_config(&ctx.config)?;
    let analysis = orchestrator.analyze_session(&summary, &history)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }
    println!("=== {} ({}) ===", summary.routine_name, summary.session.started_at.format("%Y-%m-%d"));
    display_analysis(&analysis.answer, &analysis.provenance);
    Ok(())
}

fn cmd_exercise(ctx: &Context, request: &ExerciseRequest, json: bool) -> Result<()> {
    let orchestrator = GenerationOrchestrator::from_config(&ctx.config)?;
    let exercise = orchestrator.generate_exercise(request)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&exercise)?);
        return Ok(());
    }
    display_exercise(&exercise.answer, &exercise.provenance, exercise.degraded);
    Ok(())
}

fn cmd_status(ctx: &Context) -> Result<()> {
    let orchestrator = GenerationOrchestrator::from_config(&ctx.config)?;
    let statuses = orchestrator.check_status();

    if statuses.is_empty() {
        println!("No providers configured; generation will use the fallback workout.");
        return Ok(());
    }

    for (provider, status) in statuses {
        match status {
            Ok(status) => println!("✓ {} ({}): {}", provider, status.model, status.message),
            Err(e) => println!("✗ {}: {}", provider, e),
        }
    }
    Ok(())
}

// ========== Display ==========

fn display_result(result: &GenerationResult) {
    let workout = &result.workout;

    if result.degraded {
        println!(
            "⚠ {} did not return a structured workout; its reply is shown below.\n",
            result.provenance
        );
    }

    println!("=== {} ===", workout.name);
    if result.is_fallback() && !result.failures.is_empty() {
        println!(
            "Source: fallback ({} provider(s) unavailable)",
            result.failures.len()
        );
    } else {
        println!("Source: {}", result.provenance);
    }
    println!(
        "Category: {} | Estimated duration: {} min",
        workout.category.as_str(),
        workout
            .estimated_duration
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".into())
    );
    if let Some(description) = &workout.description {
        println!("\n{}", description);
    }

    if !workout.exercises.is_empty() {
        println!();
    }
    for (i, exercise) in workout.exercises.iter().enumerate() {
        println!("{:>2}. {}", i + 1, format_exercise(exercise));
        if let Some(notes) = &exercise.notes {
            println!("    {}", notes);
        }
    }

    if let Some(notes) = &workout.ai_notes {
        println!("\nNotes: {}", notes);
    }
}

fn display_plan(plan: &OptimizationPlan, provenance: &str, degraded: bool) {
    if degraded {
        println!("⚠ {} did not return structured changes; its reply is shown below.\n", provenance);
    } else {
        println!("Source: {}\n", provenance);
    }

    for optimization in &plan.optimizations {
        let target = optimization.exercise_name.as_deref().unwrap_or("routine");
        println!("- [{:?}] {}: {}", optimization.kind, target, optimization.suggestion);
        if let Some(reason) = &optimization.reason {
            println!("    {}", reason);
        }
    }
    if let Some(new_routine) = plan.new_routine.as_ref().filter(|_| !degraded) {
        println!("\nSuggested routine: {}", new_routine.name);
        for (i, exercise) in new_routine.exercises.iter().enumerate() {
            println!("{:>2}. {}", i + 1, format_exercise(exercise));
        }
    }
    if let Some(notes) = &plan.ai_notes {
        println!("\nNotes: {}", notes);
    }
}

fn display_replacements(suggestions: &ReplacementSuggestions, provenance: &str) {
    println!("Alternatives to {} (source: {})", suggestions.original_exercise, provenance);
    if suggestions.replacements.is_empty() {
        println!("  No structured suggestions.");
    }
    for replacement in &suggestions.replacements {
        let mut line = format!("  - {}", replacement.name);
        if let Some(difficulty) = &replacement.difficulty {
            line.push_str(&format!(" [{}]", difficulty));
        }
        if let Some(equipment) = &replacement.equipment {
            line.push_str(&format!(" ({})", equipment));
        }
        println!("{}", line);
        if let Some(reason) = &replacement.reason {
            println!("      {}", reason);
        }
    }
    if let Some(notes) = &suggestions.ai_notes {
        println!("\nNotes: {}", notes);
    }
}

fn display_analysis(analysis: &PerformanceAnalysis, provenance: &str) {
    println!("Source: {}", provenance);
    if !analysis.insights.is_empty() {
        println!("\nInsights:");
    }
    for insight in &analysis.insights {
        println!("  - [{}] {}", insight.kind, insight.title);
        if let Some(description) = &insight.description {
            println!("      {}", description);
        }
        if let Some(action) = &insight.action {
            println!("      → {}", action);
        }
    }
    if !analysis.recommendations.is_empty() {
        println!("\nRecommendations:");
    }
    for recommendation in &analysis.recommendations {
        println!("  - [{}] {}", recommendation.category, recommendation.suggestion);
    }
    if let Some(notes) = &analysis.ai_notes {
        println!("\nNotes: {}", notes);
    }
}

fn display_exercise(exercise: &GeneratedExercise, provenance: &str, degraded: bool) {
    if degraded {
        println!("⚠ {} did not return a structured exercise; its reply is shown below.\n", provenance);
    }
    println!("=== {} ===", exercise.name);
    if !degraded {
        println!("Source: {}", provenance);
    }
    let fields = [
        ("Category", &exercise.category),
        ("Equipment", &exercise.equipment),
        ("Targets", &exercise.target_muscles),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label, value);
        }
    }
    if let Some(description) = exercise.description.as_ref().filter(|_| !degraded) {
        println!("\n{}", description);
    }
    if let Some(instructions) = &exercise.instructions {
        println!("\n{}", instructions);
    }
    if let Some(tips) = &exercise.safety_tips {
        println!("\nSafety: {}", tips);
    }
}

fn format_exercise(exercise: &WorkoutExercise) -> String {
    let volume = match (exercise.reps, exercise.duration) {
        (Some(reps), _) => format!("{} x {}", exercise.sets.unwrap_or(1), reps),
        (None, Some(seconds)) => format!("{} x {}s", exercise.sets.unwrap_or(1), seconds),
        (None, None) => format!("{} set(s)", exercise.sets.unwrap_or(1)),
    };

    let mut line = format!("{} [{}] {}", exercise.name, exercise.category.as_str(), volume);
    if let Some(rest) = exercise.rest_between_sets.filter(|&r| r > 0) {
        line.push_str(&format!(", rest {}s", rest));
    }
    match &exercise.weight {
        Some(WeightInput::Number(lbs)) => line.push_str(&format!(" @ {} lbs", lbs)),
        Some(WeightInput::Text(text)) => line.push_str(&format!(" @ {}", text)),
        None => {}
    }
    if let Some(band) = &exercise.band_strength {
        line.push_str(&format!(" ({} band)", band));
    }
    if let Some(equipment) = &exercise.equipment {
        line.push_str(&format!(" ({})", equipment));
    }
    line
}

fn format_persisted(exercise: &PersistedExercise) -> String {
    let volume = match (exercise.modality, exercise.duration) {
        (Modality::Time, Some(seconds)) => format!("{} x {}s", exercise.sets, seconds),
        _ => format!("{} x {}", exercise.sets, exercise.reps),
    };

    let mut line = format!(
        "{}. {} [{}] {}, rest {}s",
        exercise.order, exercise.name, exercise.category, volume, exercise.rest_between_sets
    );
    if let Some(weight) = exercise.weight {
        line.push_str(&format!(" @ {:.1} lbs", weight));
    }
    if let Some(band) = &exercise.band_strength {
        line.push_str(&format!(" ({} band)", band));
    }
    line
}
