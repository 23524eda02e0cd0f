//! Integration tests for the repforge binary.
//!
//! These tests verify end-to-end behavior including:
//! - Generation falling back to the built-in workouts with no providers
//! - Saving a generated workout and reading it back
//! - Replacing a routine's exercises from a JSON file or stdin
//! - Rejected replacements leaving the routine untouched
//! - Coaching commands against a local OpenAI-compatible stub

use assert_cmd::Command;
use predicates::prelude::*;
use repforge_core::{Database, Difficulty, NewSetPerformance};
use serde_json::{json, Value};
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Helper to get the path to the CLI binary
fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repforge"));
    cmd.env_remove("OPENAI_API_KEY").env_remove("GEMINI_API_KEY");
    cmd
}

/// Config with no providers and the database inside `dir`
fn write_config(dir: &Path) -> PathBuf {
    let config_path = dir.join("config.toml");
    let db_path = dir.join("repforge.db");
    fs::write(
        &config_path,
        format!(
            "providers = []\n\n[data]\ndatabase_path = \"{}\"\n",
            db_path.display()
        ),
    )
    .expect("Failed to write config");
    config_path
}

/// Config with one OpenAI-compatible provider at `base_url`, sharing the
/// database written by [`write_config`]
fn write_provider_config(dir: &Path, base_url: &str) -> PathBuf {
    let config_path = dir.join("provider.toml");
    let db_path = dir.join("repforge.db");
    fs::write(
        &config_path,
        format!(
            "[data]\ndatabase_path = \"{}\"\n\n[[providers]]\nid = \"local\"\nkind = \"openai\"\nbase_url = \"{}\"\napi_key = \"test-key\"\ntimeout_secs = 5\n",
            db_path.display(),
            base_url
        ),
    )
    .expect("Failed to write config");
    config_path
}

/// Serve one chat completion whose message content is `content`
///
/// Returns the base URL and a handle yielding the request body.
fn serve_completion(content: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let body = json!({
        "choices": [{"message": {"content": content}, "finish_reason": "stop"}]
    })
    .to_string();

    let handle = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut content_length = 0;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap();
                }
            }
        }
        let mut request_body = vec![0; content_length];
        reader.read_exact(&mut request_body).unwrap();

        let mut stream = reader.into_inner();
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        )
        .unwrap();
        stream.flush().unwrap();
        String::from_utf8(request_body).unwrap()
    });

    (base_url, handle)
}

/// Generate and save a fallback workout, returning the new routine id
fn save_generated(config: &Path, request: &str) -> i64 {
    let output = cli()
        .arg("--config")
        .arg(config)
        .args(["generate", request, "--save", "--json"])
        .output()
        .expect("Failed to run repforge");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("stdout is JSON");
    json["routineId"].as_i64().expect("routineId present")
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Workout generation and routine management",
        ));
}

#[test]
fn test_generate_without_providers_uses_fallback() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["generate", "20 minutes of upper body", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["provenance"], "fallback");
    assert_eq!(json["degraded"], false);
    assert_eq!(json["workout"]["name"], "Upper Body Strength");
    assert_eq!(json["workout"]["estimatedDuration"], 20);
    assert!(json.get("routineId").is_none());
}

#[test]
fn test_generate_text_output() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .args(["generate", "legs please"])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Lower Body Strength ==="))
        .stdout(predicate::str::contains("Source: fallback"))
        .stdout(predicate::str::contains("Goblet Squats"));
}

#[test]
fn test_generate_rejects_blank_request() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .args(["generate", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workout request is required"));
}

#[test]
fn test_quick_workout() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["quick", "--minutes", "15", "--focus", "core", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["provenance"], "fallback");
    assert_eq!(json["workout"]["name"], "Core Stability");
    assert_eq!(json["workout"]["estimatedDuration"], 15);
}

#[test]
fn test_save_then_show() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    let routine_id = save_generated(&config, "upper body with dumbbells");
    assert!(temp_dir.path().join("repforge.db").exists());

    cli()
        .arg("--config")
        .arg(&config)
        .args(["show", &routine_id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("=== Upper Body Strength ==="))
        .stdout(predicate::str::contains("1. Push-ups"));
}

#[test]
fn test_replace_from_file() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());
    let routine_id = save_generated(&config, "full body");

    let body = temp_dir.path().join("exercises.json");
    fs::write(
        &body,
        r#"{"exercises": [
            {"name": "Plank", "type": "time", "time": "45"},
            {"name": "Goblet Squat", "sets": "4", "weight": "15 lbs"}
        ]}"#,
    )
    .unwrap();

    cli()
        .arg("--config")
        .arg(&config)
        .args(["replace", &routine_id.to_string(), "--file"])
        .arg(&body)
        .assert()
        .success()
        .stdout(predicate::str::contains("now has 2 exercise(s)"));

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["show", &routine_id.to_string(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    let exercises = json["exercises"].as_array().unwrap();
    assert_eq!(exercises.len(), 2);
    assert_eq!(exercises[0]["name"], "Plank");
    assert_eq!(exercises[0]["duration"], 45);
    assert_eq!(exercises[1]["order"], 2);
    assert_eq!(exercises[1]["sets"], 4);
    assert_eq!(exercises[1]["weight"], 15.0);
}

#[test]
fn test_replace_from_stdin() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());
    let routine_id = save_generated(&config, "cardio");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["replace", &routine_id.to_string(), "--file", "-"])
        .write_stdin(r#"{"exercises": [{"name": "Jump Rope", "type": "time"}]}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Jump Rope"));
}

#[test]
fn test_replace_invalid_entry_keeps_routine() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());
    let routine_id = save_generated(&config, "upper body");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["replace", &routine_id.to_string(), "--file", "-"])
        .write_stdin(r#"{"exercises": [{"name": "Farmer Carry"}, {"name": ""}]}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("index 1"));

    // Previous exercises are still there
    cli()
        .arg("--config")
        .arg(&config)
        .args(["show", &routine_id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Push-ups"))
        .stdout(predicate::str::contains("Farmer Carry").not());
}

#[test]
fn test_replace_requires_array() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());
    let routine_id = save_generated(&config, "core");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["replace", &routine_id.to_string(), "--file", "-"])
        .write_stdin(r#"{"exercises": {"name": "Plank"}}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Exercises must be an array"));
}

#[test]
fn test_replace_unknown_routine() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .args(["replace", "999", "--file", "-"])
        .write_stdin(r#"{"exercises": []}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("999"));
}

#[test]
fn test_status_without_providers() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No providers configured"));
}

#[test]
fn test_history_empty() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No completed sessions yet."));
}

#[test]
fn test_db_flag_overrides_config() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());
    let other_db = temp_dir.path().join("other.db");

    cli()
        .arg("--config")
        .arg(&config)
        .arg("--db")
        .arg(&other_db)
        .args(["generate", "core", "--save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Saved as routine"));

    assert!(other_db.exists());
    assert!(!temp_dir.path().join("repforge.db").exists());
}

#[test]
fn test_exercise_from_provider() {
    let temp_dir = setup_test_dir();
    let (base_url, server) = serve_completion(
        r#"{"name": "Banded Clamshell", "category": "strength", "equipment": "resistance_bands", "instructions": "Lie on your side", "safetyTips": "Move slowly", "targetMuscles": "glutes"}"#,
    );
    let config = write_provider_config(temp_dir.path(), &base_url);

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["exercise", "hip stability", "--equipment", "resistance_bands", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "Banded Clamshell");
    assert_eq!(json["safetyTips"], "Move slowly");
    assert_eq!(json["provenance"], "local");
    assert_eq!(json["degraded"], false);

    let request = server.join().unwrap();
    assert!(request.contains("hip stability"));
    assert!(request.contains("Equipment available: resistance_bands"));
}

#[test]
fn test_exercise_unreadable_reply() {
    let temp_dir = setup_test_dir();
    let (base_url, _server) = serve_completion("Stand on one leg for a while.");
    let config = write_provider_config(temp_dir.path(), &base_url);

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["exercise", "balance", "--equipment", "dumbbells", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "AI Generated Exercise");
    assert_eq!(json["equipment"], "dumbbells");
    assert_eq!(json["targetMuscles"], "various");
    assert_eq!(json["instructions"], "Stand on one leg for a while.");
    assert_eq!(json["degraded"], true);
}

#[test]
fn test_exercise_without_providers_fails() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .args(["exercise", "hip opener"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No provider answered the exercise request"));
}

#[test]
fn test_optimize_apply_rewrites_routine() {
    let temp_dir = setup_test_dir();
    let routine_id = save_generated(&write_config(temp_dir.path()), "core");

    let reply = json!({
        "optimizations": [{"type": "substitution", "exerciseName": "Crunches", "suggestion": "Use dead bugs"}],
        "newRoutine": {
            "name": "Core Stability v2",
            "exercises": [
                {"name": "Dead Bug", "sets": 3, "reps": 12, "notes": "Keep your back flat"},
                {"name": "Side Plank", "sets": 2, "duration": 30}
            ]
        },
        "aiNotes": "Spine friendly"
    })
    .to_string();
    let (base_url, server) = serve_completion(&reply);
    let config = write_provider_config(temp_dir.path(), &base_url);

    cli()
        .arg("--config")
        .arg(&config)
        .args(["optimize", &routine_id.to_string(), "easier on my back", "--apply"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Use dead bugs"))
        .stdout(predicate::str::contains("now has 2 exercise(s)"));

    let request = server.join().unwrap();
    assert!(request.contains("easier on my back"));
    assert!(request.contains("Core Stability"));

    let output = cli()
        .arg("--config")
        .arg(&config)
        .args(["show", &routine_id.to_string(), "--json"])
        .output()
        .unwrap();
    let json: Value = serde_json::from_slice(&output.stdout).unwrap();
    let exercises = json["exercises"].as_array().unwrap();
    assert_eq!(exercises[0]["name"], "Dead Bug");
    assert_eq!(exercises[0]["instructions"], "Keep your back flat");
    assert_eq!(exercises[1]["name"], "Side Plank");
}

#[test]
fn test_optimize_unknown_routine() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .args(["optimize", "404", "shorter"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Routine 404 not found"));
}

#[test]
fn test_replacements_from_provider() {
    let temp_dir = setup_test_dir();
    let (base_url, server) = serve_completion(
        r#"Here you go: {"originalExercise": "Barbell Squat", "replacements": [{"name": "Goblet Squat", "difficulty": "beginner", "equipment": "dumbbells"}]}"#,
    );
    let config = write_provider_config(temp_dir.path(), &base_url);

    cli()
        .arg("--config")
        .arg(&config)
        .args(["replacements", "Barbell Squat", "--reason", "no rack"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alternatives to Barbell Squat"))
        .stdout(predicate::str::contains("- Goblet Squat [beginner] (dumbbells)"));

    assert!(server.join().unwrap().contains("Reason for replacement: no rack"));
}

#[test]
fn test_analyze_logged_session() {
    let temp_dir = setup_test_dir();
    let db_path = temp_dir.path().join("repforge.db");
    let session_id = {
        let db = Database::open(&db_path).unwrap();
        let session = db.start_session("demo-user", None).unwrap();
        db.record_set(&NewSetPerformance {
            session_id: session.id,
            exercise_name: "Deadlift".into(),
            set_number: 1,
            reps: Some(5),
            weight: Some(225.0),
            difficulty: Some(Difficulty::Hard),
            ..Default::default()
        })
        .unwrap();
        db.complete_session(session.id, None).unwrap();
        session.id
    };

    let (base_url, server) = serve_completion(
        r#"{"insights": [{"type": "warning", "title": "Heavy single set"}], "recommendations": [{"category": "rest", "suggestion": "Rest 3 minutes"}]}"#,
    );
    let config = write_provider_config(temp_dir.path(), &base_url);

    cli()
        .arg("--config")
        .arg(&config)
        .args(["analyze", &session_id.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Custom Workout"))
        .stdout(predicate::str::contains("[warning] Heavy single set"))
        .stdout(predicate::str::contains("[rest] Rest 3 minutes"));

    assert!(server.join().unwrap().contains("Deadlift"));
}

#[test]
fn test_analyze_unknown_session() {
    let temp_dir = setup_test_dir();
    let config = write_config(temp_dir.path());

    cli()
        .arg("--config")
        .arg(&config)
        .args(["analyze", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workout session 42 not found"));
}
