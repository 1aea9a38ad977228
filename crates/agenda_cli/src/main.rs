use agenda_cli::cli::{Cli, Command, parse_config_overrides};
use agenda_core::config::{Config, load_config_with_fallback, merge_overrides};
use agenda_core::datetime::{
    CanonicalDate, TimeValue, normalize_time, parse_freeform_date, parse_time,
};
use agenda_core::dialogue::{DialogueRequest, WebhookRequest};
use agenda_core::error::{AppError, ParseFailure};
use agenda_core::model::Task;
use agenda_core::storage::{DocumentStore, JsonStore, StoredDocument};
use agenda_core::webhook::Webhook;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use serde_json::Value;
use std::io::{self, BufRead, Read};
use std::path::Path;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "AGENDA_LOG";

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Tarea")]
    name: String,
    #[tabled(rename = "Fecha")]
    date: String,
    #[tabled(rename = "Hora")]
    time: String,
    #[tabled(rename = "Estado")]
    status: String,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn resolve_config(raw_overrides: &[String]) -> Result<Config, AppError> {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        warn!(code = err.code(), message = err.message(), "config ignored; using defaults");
    }
    let overrides = parse_config_overrides(raw_overrides)?;
    Ok(merge_overrides(&loaded.config, &overrides))
}

fn reference_day(raw: Option<&str>) -> Result<Date, AppError> {
    match raw {
        Some(text) => CanonicalDate::parse_display(text)
            .and_then(|date| date.to_date())
            .ok_or_else(|| AppError::invalid_input(format!("--today must be DD/MM/YYYY, got '{text}'"))),
        None => {
            let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
            Ok(OffsetDateTime::now_utc().to_offset(offset).date())
        }
    }
}

fn read_request(path: Option<&Path>) -> Result<DialogueRequest, AppError> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?,
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .map_err(|err| AppError::io(err.to_string()))?;
            content
        }
    };
    let request: WebhookRequest = serde_json::from_str(&content)
        .map_err(|err| AppError::invalid_input(format!("invalid request JSON: {err}")))?;
    Ok(DialogueRequest::from(request))
}

fn date_failure(failure: ParseFailure) -> AppError {
    AppError::invalid_input(format!("{} ({})", failure, failure.code()))
}

fn time_kind(value: &TimeValue) -> &'static str {
    match value {
        TimeValue::Unspecified => "unspecified",
        TimeValue::Resolved(_) => "resolved",
        TimeValue::AwaitingMeridiem { .. } => "awaiting_meridiem",
        TimeValue::Opaque(_) => "opaque",
    }
}

fn load_tasks(store: &JsonStore, config: &Config) -> Result<Vec<(StoredDocument, Task)>, AppError> {
    let documents = store.list_all(&config.collection)?;
    let mut tasks = Vec::with_capacity(documents.len());
    for document in documents {
        let task: Task = serde_json::from_value(Value::Object(document.record.clone()))
            .map_err(|err| AppError::invalid_data(format!("{}: {}", document.reference.id, err)))?;
        tasks.push((document, task));
    }
    Ok(tasks)
}

fn print_tasks_plain(tasks: &[(StoredDocument, Task)]) {
    if tasks.is_empty() {
        println!("No tasks stored.");
        return;
    }

    let rows = tasks.iter().enumerate().map(|(index, (_, task))| TaskRow {
        index: index + 1,
        name: task.name.clone(),
        date: task.date.clone(),
        time: task.time.clone(),
        status: task.status.clone(),
    });
    let mut table = Table::new(rows);
    table.with(Style::modern());
    println!("{table}");
}

fn print_tasks_json(tasks: &[(StoredDocument, Task)]) {
    let payload: Vec<Value> = tasks
        .iter()
        .map(|(document, task)| {
            serde_json::json!({
                "id": document.reference.id,
                "tarea": task.name,
                "fecha": task.date,
                "hora": task.time,
                "estado": task.status,
                "canonical": task.canonical,
            })
        })
        .collect();
    println!("{}", Value::Array(payload));
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_command(cli: Cli, interactive: bool) -> Result<(), AppError> {
    let config = resolve_config(&cli.config_override)?;

    match cli.command {
        Command::Handle { request, today } => {
            if interactive && request.is_none() {
                return Err(AppError::invalid_input(
                    "--request is required in the interactive session",
                ));
            }
            let today = reference_day(today.as_deref())?;
            let request = read_request(request.as_deref())?;
            let mut store = JsonStore::from_env()?;

            let response = Webhook::new(&mut store, &config, today).handle(&request);
            let rendered = serde_json::to_string_pretty(&response)
                .map_err(|err| AppError::invalid_data(err.to_string()))?;
            println!("{rendered}");
        }
        Command::ParseDate { text, today } => {
            let today = reference_day(today.as_deref())?;
            let parsed = parse_freeform_date(&text, today).map_err(date_failure)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "input": text,
                        "display": parsed.display,
                        "day": parsed.date.day(),
                        "month": parsed.date.month(),
                        "year": parsed.date.year(),
                    })
                );
            } else {
                println!("{}", parsed.display);
            }
        }
        Command::ParseTime { text } => {
            let value = parse_time(&text);
            let normalized = normalize_time(&text, config.time_mode);
            let canonical = value
                .canonical()
                .map(|time| time.render_twenty_four_hour());
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "input": text,
                        "normalized": normalized,
                        "kind": time_kind(&value),
                        "canonical": canonical,
                    })
                );
            } else {
                let detail = match &value {
                    TimeValue::AwaitingMeridiem { .. } => {
                        ParseFailure::AmbiguousMeridiem(text.trim().to_string()).to_string()
                    }
                    _ => canonical.unwrap_or_else(|| "-".to_string()),
                };
                println!("{normalized} | {} | {detail}", time_kind(&value));
            }
        }
        Command::List => {
            let store = JsonStore::from_env()?;
            let tasks = load_tasks(&store, &config)?;
            if cli.json {
                print_tasks_json(&tasks);
            } else {
                print_tasks_plain(&tasks);
            }
        }
    }

    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("agenda".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                println!("{err}");
                continue;
            }
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli, true) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli, false) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{reference_day, split_command_line};
    use time::macros::date;

    #[test]
    fn split_command_line_keeps_quoted_text_together() {
        let args = split_command_line("parse-date \"10 de diciembre\" --today 01/01/2026").unwrap();
        assert_eq!(
            args,
            vec!["parse-date", "10 de diciembre", "--today", "01/01/2026"]
        );
    }

    #[test]
    fn split_command_line_rejects_unterminated_quote() {
        let err = split_command_line("parse-date \"10 de").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn reference_day_parses_display_dates() {
        assert_eq!(reference_day(Some("10/12/2025")).unwrap(), date!(2025 - 12 - 10));
        assert!(reference_day(Some("31/02/2025")).is_err());
        assert!(reference_day(Some("mañana")).is_err());
    }
}
