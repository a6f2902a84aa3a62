mod transport;

use clap::{Parser, Subcommand, ValueEnum};
use component_form::{get_answer_schema, resolve_states};
use form_spec::{
    AnswerValue, DerivedState, DerivedStateMap, FillSession, Form, SubmitError, ValidationError,
    ValidationResult, resolve, validate,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use transport::FileTransport;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form rule engine CLI",
    long_about = "Resolves conditional logic, validates answers and submits forms from JSON files"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Show which sections and questions are visible, enabled, required or skipped.
    Resolve {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional JSON file mapping question ids to answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Validate answers against a form definition.
    Validate {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Validate, assemble and store a submission as a JSON file.
    Submit {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Directory receiving `<id>.submission.json`.
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        /// Treat the submitter as logged in (for forms that require login).
        #[arg(long)]
        authenticated: bool,
    },
    /// Print the JSON Schema of form definitions, or of a form's submission payload.
    Schema {
        /// Form definition; when given, prints the payload schema for its current answers.
        #[arg(long, value_name = "FORM")]
        form: Option<PathBuf>,
        /// Answers used to decide which questions are included.
        #[arg(long, value_name = "ANSWERS", requires = "form")]
        answers: Option<PathBuf>,
    },
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Resolve {
            form,
            answers,
            format,
        } => run_resolve(form, answers, format),
        Command::Validate { form, answers } => run_validate(form, answers),
        Command::Submit {
            form,
            answers,
            out,
            authenticated,
        } => run_submit(form, answers, out, authenticated),
        Command::Schema { form, answers } => run_schema(form, answers),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_env("FORM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_form(path: &Path) -> CliResult<(Form, String)> {
    let form_json = fs::read_to_string(path)?;
    let form: Form = serde_json::from_str(&form_json)?;
    Ok((form, form_json))
}

/// Reads `{ questionId: value }`; `null` entries count as unanswered.
fn load_answers(path: Option<&Path>) -> CliResult<BTreeMap<String, AnswerValue>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let contents = fs::read_to_string(path)?;
    let raw: BTreeMap<String, Option<AnswerValue>> = serde_json::from_str(&contents)?;
    Ok(raw
        .into_iter()
        .filter_map(|(question_id, value)| value.map(|value| (question_id, value)))
        .collect())
}

fn component_config(form_json: &str) -> String {
    json!({ "form_json": form_json }).to_string()
}

fn run_resolve(
    form_path: PathBuf,
    answers_path: Option<PathBuf>,
    format: OutputFormat,
) -> CliResult<()> {
    let (form, form_json) = load_form(&form_path)?;
    let answers = load_answers(answers_path.as_deref())?;

    match format {
        OutputFormat::Json => {
            let answers_json = serde_json::to_string(&answers)?;
            let response = resolve_states(&form.id, &component_config(&form_json), &answers_json);
            let value: Value = serde_json::from_str(&response)?;
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                return Err(error.to_string().into());
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            let answer_set = form_spec::AnswerSet::with_answers(form.id.clone(), answers);
            let states = resolve(&form, &answer_set);
            println!("{}", render_states(&form, &states));
        }
    }
    Ok(())
}

fn run_validate(form_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let (form, _) = load_form(&form_path)?;
    let answers = load_answers(Some(answers_path.as_path()))?;
    let answer_set = form_spec::AnswerSet::with_answers(form.id.clone(), answers);

    let result = validate(&form, &answer_set);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn run_submit(
    form_path: PathBuf,
    answers_path: PathBuf,
    out_dir: PathBuf,
    authenticated: bool,
) -> CliResult<()> {
    let (form, _) = load_form(&form_path)?;
    let answers = load_answers(Some(answers_path.as_path()))?;

    let mut session = FillSession::new(form).with_authenticated(authenticated);
    for (question_id, value) in answers {
        session.set_answer(question_id, value)?;
    }

    let transport = FileTransport::new(out_dir);
    let runtime = tokio::runtime::Runtime::new()?;
    match runtime.block_on(session.submit(&transport)) {
        Ok(submission) => {
            println!("{}", serde_json::to_string_pretty(&submission)?);
            if let Some(message) = &session.form().settings.success_message {
                eprintln!("{}", message);
            }
            Ok(())
        }
        Err(SubmitError::Rejected(rejected)) => {
            print_errors(&rejected.errors);
            Err(rejected.into())
        }
        Err(err) => Err(err.into()),
    }
}

fn run_schema(form_path: Option<PathBuf>, answers_path: Option<PathBuf>) -> CliResult<()> {
    let Some(form_path) = form_path else {
        let schema = schemars::schema_for!(Form);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    };

    let (form, form_json) = load_form(&form_path)?;
    let answers = load_answers(answers_path.as_deref())?;
    let response = get_answer_schema(
        &form.id,
        &component_config(&form_json),
        &serde_json::to_string(&answers)?,
    );
    let value: Value = serde_json::from_str(&response)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn describe_state(state: &DerivedState) -> String {
    let mut flags = vec![if state.visible { "visible" } else { "hidden" }];
    if !state.enabled {
        flags.push("disabled");
    }
    if state.required {
        flags.push("required");
    }
    if state.skipped {
        flags.push("skipped");
    }
    flags.join(", ")
}

fn render_states(form: &Form, states: &DerivedStateMap) -> String {
    let mut lines = vec![format!("Form: {} ({})", form.title, form.id)];

    for section in form.ordered_sections() {
        let Some(section_state) = states.section(&section.id) else {
            continue;
        };
        lines.push(format!(
            "Section {} ({}): {}",
            section.id,
            section.title,
            describe_state(section_state)
        ));
        for question in section.ordered_questions() {
            if let Some(state) = states.question(&question.id) {
                lines.push(format!(" - {}: {}", question.id, describe_state(state)));
            }
        }
    }

    if !states.diagnostics.is_empty() {
        lines.push("Inert conditions:".to_string());
        for diagnostic in &states.diagnostics {
            lines.push(format!(
                " - {}: {}",
                diagnostic.condition_id,
                diagnostic.reason.as_str()
            ));
        }
    }

    lines.join("\n")
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {}", error.path, error.message);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            result.unknown_fields.join(", ")
        );
    }
}

fn print_errors(errors: &[ValidationError]) {
    eprintln!("Validation errors:");
    for error in errors {
        eprintln!("  {}: {}", error.path, error.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::TempDir;

    const FORM: &str = include_str!("../../form-spec/tests/fixtures/membership_form.json");

    fn write_inputs(dir: &Path, answers: &Value) -> (PathBuf, PathBuf) {
        let form_path = dir.join("membership.form.json");
        let answers_path = dir.join("answers.json");
        fs::write(&form_path, FORM).expect("write form");
        fs::write(&answers_path, answers.to_string()).expect("write answers");
        (form_path, answers_path)
    }

    fn complete_answers() -> Value {
        json!({
            "name": "Lois",
            "age": 70,
            "baptized": "no",
            "baptism_date": "1960-01-01"
        })
    }

    #[test]
    fn describe_state_lists_flags() {
        let state = DerivedState {
            visible: false,
            enabled: false,
            required: false,
            skipped: true,
        };
        assert_eq!(describe_state(&state), "hidden, disabled, skipped");
        assert_eq!(describe_state(&DerivedState::visible(true)), "visible, required");
    }

    #[test]
    fn render_states_reports_inert_conditions() {
        let form: Form = serde_json::from_str(FORM).expect("form");
        let states = resolve(&form, &form_spec::AnswerSet::new("membership"));
        let text = render_states(&form, &states);
        assert!(text.contains("Section baptism (Baptism): hidden"));
        assert!(text.contains(" - name: visible, required"));
        assert!(text.contains(" - c-legacy: target does not exist in this form"));
    }

    #[test]
    fn resolve_command_prints_json_states() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let (form_path, answers_path) =
            write_inputs(temp_dir.path(), &json!({ "baptized": "yes" }));

        let output = Command::cargo_bin("form-cli")?
            .arg("resolve")
            .arg("--form")
            .arg(&form_path)
            .arg("--answers")
            .arg(&answers_path)
            .arg("--format")
            .arg("json")
            .output()?;
        assert!(output.status.success());
        let states: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(states["sections"]["baptism"]["visible"], true);
        assert_eq!(states["questions"]["baptism_date"]["required"], true);
        Ok(())
    }

    #[test]
    fn validate_command_fails_on_missing_answers() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let (form_path, answers_path) = write_inputs(temp_dir.path(), &json!({ "name": "Lois" }));

        Command::cargo_bin("form-cli")?
            .arg("validate")
            .arg("--form")
            .arg(&form_path)
            .arg("--answers")
            .arg(&answers_path)
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn validate_command_accepts_complete_answers() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let (form_path, answers_path) = write_inputs(temp_dir.path(), &complete_answers());

        let output = Command::cargo_bin("form-cli")?
            .arg("validate")
            .arg("--form")
            .arg(&form_path)
            .arg("--answers")
            .arg(&answers_path)
            .output()?;
        assert!(output.status.success());
        assert!(String::from_utf8(output.stdout)?.contains("Validation result: valid"));
        Ok(())
    }

    #[test]
    fn submit_command_writes_submission() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let (form_path, answers_path) = write_inputs(workspace.path(), &complete_answers());
        let out_dir = workspace.path().join("submissions");

        Command::cargo_bin("form-cli")?
            .arg("submit")
            .arg("--form")
            .arg(&form_path)
            .arg("--answers")
            .arg(&answers_path)
            .arg("--out")
            .arg(&out_dir)
            .assert()
            .success();

        let written = fs::read_dir(&out_dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        assert_eq!(written.len(), 1);
        let submission: Value = serde_json::from_str(&fs::read_to_string(&written[0])?)?;
        assert_eq!(submission["formId"], "membership");
        assert_eq!(submission["status"], "submitted");
        let answered = submission["answers"]
            .as_array()
            .expect("answers")
            .iter()
            .filter_map(|answer| answer["questionId"].as_str())
            .collect::<Vec<_>>();
        assert!(answered.contains(&"name"));
        assert!(!answered.contains(&"baptism_date"));
        Ok(())
    }

    #[test]
    fn submit_command_refuses_invalid_answers() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let (form_path, answers_path) = write_inputs(workspace.path(), &json!({ "age": 10 }));
        let out_dir = workspace.path().join("submissions");

        Command::cargo_bin("form-cli")?
            .arg("submit")
            .arg("--form")
            .arg(&form_path)
            .arg("--answers")
            .arg(&answers_path)
            .arg("--out")
            .arg(&out_dir)
            .assert()
            .failure();
        assert!(!out_dir.exists());
        Ok(())
    }

    #[test]
    fn schema_command_describes_forms() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("form-cli")?.arg("schema").output()?;
        assert!(output.status.success());
        let schema: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(schema["title"], "Form");
        assert!(schema["properties"].get("sections").is_some());
        Ok(())
    }
}
