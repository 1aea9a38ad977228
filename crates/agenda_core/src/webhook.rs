use crate::config::{Config, MeridiemPolicy};
use crate::datetime::{
    CanonicalDate, CanonicalTime, DateWindow, TimeValue, chronological, normalize_time,
    parse_freeform_date, parse_time,
};
use crate::dialogue::meridiem::cleared_context;
use crate::dialogue::{
    DialogueRequest, MERIDIEM_CONTEXT, MeridiemOutcome, MeridiemPrompt, PendingAction,
    PendingTask, ResolvedTime, WebhookResponse,
};
use crate::error::{AppError, ParseFailure};
use crate::model::{CanonicalStamp, PENDING_STATUS, Task};
use crate::storage::{DocumentRef, DocumentStore, Record};
use serde_json::Value;
use time::Date;
use tracing::{debug, error, info, warn};

const DATE_EXAMPLE: &str = "Ejemplo: `10 de diciembre de 2025` o `10/12/2025`.";
const STORE_APOLOGY: &str =
    "Lo siento, no pude acceder a tus tareas en este momento. Inténtalo de nuevo más tarde.";
const UNKNOWN_REQUEST: &str = "No entendí tu solicitud.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    CreateTask,
    ConfirmMeridiem,
    ListTasks,
    DeleteTask,
    ChangeStatus,
    ModifyTask,
    Reminders,
    WeeklySummary,
    RecommendTask,
    Unknown,
}

impl Intent {
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "CrearTarea" => Self::CreateTask,
            "ConfirmarMeridiem" => Self::ConfirmMeridiem,
            "VerTareas" => Self::ListTasks,
            "EliminarTarea" => Self::DeleteTask,
            "CambiarEstadoTarea" => Self::ChangeStatus,
            "ModificarTarea" => Self::ModifyTask,
            "Recordatorios" => Self::Reminders,
            "ResumenSemanal" => Self::WeeklySummary,
            "RecomendarTarea" => Self::RecommendTask,
            _ => Self::Unknown,
        }
    }
}

/// New values for a task's schedule. `None` leaves the field as stored.
#[derive(Debug, Clone, Default)]
struct ScheduleChange {
    date: Option<(String, CanonicalDate)>,
    time: Option<(String, Option<CanonicalTime>)>,
}

/// Answers one dialogue turn against a document store.
///
/// `today` is the reference day for reminders, the weekly window and dates
/// typed without a year.
pub struct Webhook<'a, S: DocumentStore + ?Sized> {
    store: &'a mut S,
    config: &'a Config,
    today: Date,
}

impl<'a, S: DocumentStore + ?Sized> Webhook<'a, S> {
    pub fn new(store: &'a mut S, config: &'a Config, today: Date) -> Self {
        Self {
            store,
            config,
            today,
        }
    }

    /// Never fails: store errors become a generic apology.
    pub fn handle(&mut self, request: &DialogueRequest) -> WebhookResponse {
        let intent = Intent::from_name(&request.intent_name);
        debug!(intent = ?intent, name = %request.intent_name, "dispatching dialogue turn");

        match self.dispatch(intent, request) {
            Ok(response) => response,
            Err(err) => {
                error!(
                    intent = ?intent,
                    code = err.code(),
                    message = err.message(),
                    "task store request failed"
                );
                WebhookResponse::text(STORE_APOLOGY)
            }
        }
    }

    fn dispatch(
        &mut self,
        intent: Intent,
        request: &DialogueRequest,
    ) -> Result<WebhookResponse, AppError> {
        match intent {
            Intent::CreateTask => self.create_task(request),
            Intent::ConfirmMeridiem => self.confirm_meridiem(request),
            Intent::ListTasks => self.list_tasks(),
            Intent::DeleteTask => self.delete_task(request),
            Intent::ChangeStatus => self.change_status(request),
            Intent::ModifyTask => self.modify_task(request),
            Intent::Reminders => self.reminders(),
            Intent::WeeklySummary => self.weekly_summary(),
            Intent::RecommendTask => self.recommend_task(),
            // A free-form reply while the am/pm question is open.
            Intent::Unknown if request.context(MERIDIEM_CONTEXT).is_some() => {
                self.confirm_meridiem(request)
            }
            Intent::Unknown => Ok(WebhookResponse::text(UNKNOWN_REQUEST)),
        }
    }

    fn create_task(&mut self, request: &DialogueRequest) -> Result<WebhookResponse, AppError> {
        let name = request.param("tarea").trim();
        if name.is_empty() {
            return Ok(WebhookResponse::text(
                "Necesito el nombre de la tarea para registrarla.",
            ));
        }

        let parsed = match parse_freeform_date(request.param("fecha"), self.today) {
            Ok(parsed) => parsed,
            Err(failure) => {
                return Ok(date_failure_reply(
                    &failure,
                    "Error en registrar la tarea, necesito una fecha completa. Por favor crea la tarea de nuevo.",
                ));
            }
        };

        let raw_time = request.param("hora");
        let time = parse_time(raw_time);
        if let Some(prompt) = self.meridiem_prompt(&time, || PendingTask {
            action: PendingAction::Create,
            name: name.to_string(),
            date: Some(parsed.display.clone()),
            canonical_date: Some(parsed.date),
            hour_text: raw_time.trim().to_string(),
            hour: 0,
            minute: 0,
        }) {
            return Ok(ask_meridiem(request, &prompt, None));
        }

        let parsed = parsed.with_time(time);
        let task = Task {
            name: name.to_string(),
            date: parsed.display.clone(),
            time: normalize_time(raw_time, self.config.time_mode),
            status: PENDING_STATUS.to_string(),
            canonical: Some(CanonicalStamp {
                date: parsed.date,
                time: parsed.time.canonical(),
            }),
        };
        self.insert(&task)?;

        Ok(WebhookResponse::text(format!(
            "Tarea registrada:\n{}",
            task.summary_line()
        )))
    }

    fn confirm_meridiem(&mut self, request: &DialogueRequest) -> Result<WebhookResponse, AppError> {
        let prompt = request
            .context(MERIDIEM_CONTEXT)
            .and_then(MeridiemPrompt::from_context);
        let Some(prompt) = prompt else {
            return Ok(WebhookResponse::text(
                "No tengo ninguna tarea esperando am o pm.",
            ));
        };

        let reply = match request.param("meridiem").trim() {
            "" => request.query_text.as_str(),
            value => value,
        };
        let context_name = request.context_name(MERIDIEM_CONTEXT);

        match prompt.answer(reply) {
            MeridiemOutcome::Resolved(resolved) => {
                let response = match resolved.pending.action {
                    PendingAction::Create => self.create_resolved(&resolved)?,
                    PendingAction::Modify => self.modify_resolved(&resolved)?,
                };
                Ok(response.with_context(cleared_context(context_name)))
            }
            MeridiemOutcome::Rejected(prompt) => {
                debug!(
                    task = %prompt.pending.name,
                    remaining_turns = prompt.remaining_turns,
                    "meridiem reply rejected"
                );
                Ok(ask_meridiem(
                    request,
                    &prompt,
                    Some("Solo entiendo \"am\" o \"pm\"."),
                ))
            }
            MeridiemOutcome::Expired(pending) => {
                warn!(task = %pending.name, "meridiem follow-up expired; change abandoned");
                Ok(WebhookResponse::text(format!(
                    "No recibí am o pm, así que no guardé los cambios de la tarea \"{}\". Inténtalo de nuevo cuando quieras.",
                    pending.name
                ))
                .with_context(cleared_context(context_name)))
            }
        }
    }

    fn create_resolved(&mut self, resolved: &ResolvedTime) -> Result<WebhookResponse, AppError> {
        let pending = &resolved.pending;
        let task = Task {
            name: pending.name.clone(),
            date: pending.date.clone().unwrap_or_default(),
            time: resolved.display(self.config.time_mode),
            status: PENDING_STATUS.to_string(),
            canonical: pending.canonical_date.map(|date| CanonicalStamp {
                date,
                time: Some(resolved.time),
            }),
        };
        self.insert(&task)?;

        Ok(WebhookResponse::text(format!(
            "Tarea registrada:\n{}",
            task.summary_line()
        )))
    }

    fn modify_resolved(&mut self, resolved: &ResolvedTime) -> Result<WebhookResponse, AppError> {
        let pending = &resolved.pending;
        let change = ScheduleChange {
            date: pending.date.clone().zip(pending.canonical_date),
            time: Some((resolved.display(self.config.time_mode), Some(resolved.time))),
        };
        self.apply_schedule_change(&pending.name, &change)
    }

    fn list_tasks(&mut self) -> Result<WebhookResponse, AppError> {
        let tasks = self.load_tasks()?;
        if tasks.is_empty() {
            return Ok(WebhookResponse::text("No tienes tareas registradas."));
        }

        let mut reply = String::from("Tareas registradas\n\n");
        for (index, (_, task)) in tasks.iter().enumerate() {
            reply.push_str(&format!(
                "{}. {}\n   Fecha: {}\n   Hora: {}\n   Estado: {}\n\n",
                index + 1,
                task.name,
                task.date,
                task.time,
                task.status
            ));
        }
        Ok(WebhookResponse::text(reply))
    }

    fn delete_task(&mut self, request: &DialogueRequest) -> Result<WebhookResponse, AppError> {
        let name = request.param("tarea").trim();
        if name.is_empty() {
            let tasks = self.load_tasks()?;
            if tasks.is_empty() {
                return Ok(WebhookResponse::text("No tienes tareas para eliminar."));
            }
            let mut reply = String::from("Dime el nombre exacto de la tarea que deseas eliminar:\n");
            for (_, task) in &tasks {
                reply.push_str(&format!("• {} — {} {}\n", task.name, task.date, task.time));
            }
            return Ok(WebhookResponse::text(reply));
        }

        let documents = self.find_by_name(name)?;
        if documents.is_empty() {
            return Ok(not_found(name));
        }
        for reference in &documents {
            self.store.delete_by_ref(reference)?;
        }
        info!(task = %name, count = documents.len(), "tasks deleted");

        Ok(WebhookResponse::text(format!(
            "Tarea \"{name}\" eliminada correctamente."
        )))
    }

    fn change_status(&mut self, request: &DialogueRequest) -> Result<WebhookResponse, AppError> {
        let name = request.param("tarea").trim();
        let status = request.param("estado").trim();

        let documents = self.find_by_name(name)?;
        if documents.is_empty() {
            return Ok(not_found(name));
        }
        if status.is_empty() {
            return Ok(WebhookResponse::text(format!(
                "Dime el nuevo estado de la tarea \"{name}\"."
            )));
        }

        for reference in &documents {
            let mut partial = Record::new();
            partial.insert("estado".to_string(), Value::from(status));
            self.store.update_by_ref(reference, partial)?;
        }
        info!(task = %name, status = %status, "task status changed");

        Ok(WebhookResponse::text(format!(
            "Se actualizó la tarea \"{name}\" a estado \"{status}\"."
        )))
    }

    fn modify_task(&mut self, request: &DialogueRequest) -> Result<WebhookResponse, AppError> {
        let name = request.param("tarea").trim();
        let raw_date = request.param("fecha");
        let raw_time = request.param("hora");

        if raw_date.trim().is_empty() && raw_time.trim().is_empty() {
            return Ok(WebhookResponse::text(
                "Para modificar una tarea dime todo en una sola frase.\n\
                 Por ejemplo: \"cambia la fecha de economía 2 al 10 de diciembre de 2025\" o\n\
                 \"cambia la hora de sistemas inteligentes a las 3 pm\".",
            ));
        }

        if self.find_by_name(name)?.is_empty() {
            return Ok(not_found(name));
        }

        let mut change = ScheduleChange::default();
        if !raw_date.trim().is_empty() {
            match parse_freeform_date(raw_date, self.today) {
                Ok(parsed) => change.date = Some((parsed.display, parsed.date)),
                Err(failure) => {
                    return Ok(date_failure_reply(
                        &failure,
                        "Para modificar la fecha necesito una *fecha completa*.",
                    ));
                }
            }
        }

        if !raw_time.trim().is_empty() {
            let time = parse_time(raw_time);
            if let Some(prompt) = self.meridiem_prompt(&time, || PendingTask {
                action: PendingAction::Modify,
                name: name.to_string(),
                date: change.date.as_ref().map(|(display, _)| display.clone()),
                canonical_date: change.date.as_ref().map(|(_, date)| *date),
                hour_text: raw_time.trim().to_string(),
                hour: 0,
                minute: 0,
            }) {
                return Ok(ask_meridiem(request, &prompt, None));
            }
            change.time = Some((
                normalize_time(raw_time, self.config.time_mode),
                time.canonical(),
            ));
        }

        self.apply_schedule_change(name, &change)
    }

    fn reminders(&mut self) -> Result<WebhookResponse, AppError> {
        let due_today: Vec<Task> = self
            .load_tasks()?
            .into_iter()
            .map(|(_, task)| task)
            .filter(|task| !task.is_completed() && task.day() == Some(self.today))
            .collect();

        if due_today.is_empty() {
            return Ok(WebhookResponse::text("Hoy no tienes tareas pendientes 🎉"));
        }

        let mut reply = String::from("Estas son tus tareas para hoy:\n");
        for task in &due_today {
            reply.push_str(&format!("• {} — {} — ({})\n", task.name, task.time, task.status));
        }
        Ok(WebhookResponse::text(reply))
    }

    fn weekly_summary(&mut self) -> Result<WebhookResponse, AppError> {
        let window = DateWindow::week_of(self.today);
        let tasks = self.load_tasks()?.into_iter().map(|(_, task)| task);
        let this_week: Vec<Task> = chronological(tasks, Task::instant)
            .into_iter()
            .filter(|(instant, _)| window.contains(instant))
            .map(|(_, task)| task)
            .collect();

        if this_week.is_empty() {
            return Ok(WebhookResponse::text(
                "No tienes tareas registradas para esta semana 🙌",
            ));
        }

        let mut reply = format!("Esta semana tienes {} tareas:\n", this_week.len());
        for task in &this_week {
            reply.push_str(&task.summary_line());
            reply.push('\n');
        }
        Ok(WebhookResponse::text(reply))
    }

    fn recommend_task(&mut self) -> Result<WebhookResponse, AppError> {
        let pending = self
            .load_tasks()?
            .into_iter()
            .map(|(_, task)| task)
            .filter(|task| !task.is_completed());
        let next = chronological(pending, Task::instant).into_iter().next();

        let Some((_, task)) = next else {
            return Ok(WebhookResponse::text("No tienes tareas pendientes 🎉"));
        };

        Ok(WebhookResponse::text(format!(
            "Te recomiendo realizar primero:\n{}\nEs la tarea más cercana en el tiempo.",
            task.summary_line()
        )))
    }

    /// Builds the follow-up prompt when policy requires asking for am/pm.
    fn meridiem_prompt(
        &self,
        time: &TimeValue,
        pending: impl FnOnce() -> PendingTask,
    ) -> Option<MeridiemPrompt> {
        let TimeValue::AwaitingMeridiem { hour, minute } = time else {
            return None;
        };
        if self.config.meridiem_policy == MeridiemPolicy::StoreRaw {
            return None;
        }
        let pending = PendingTask {
            hour: *hour,
            minute: *minute,
            ..pending()
        };
        info!(task = %pending.name, hour = *hour, minute = *minute, "waiting for am/pm");
        Some(MeridiemPrompt::begin(pending, self.config.context_lifespan))
    }

    fn apply_schedule_change(
        &mut self,
        name: &str,
        change: &ScheduleChange,
    ) -> Result<WebhookResponse, AppError> {
        let documents = self.store.query_by_field(
            &self.config.collection,
            "tarea",
            &Value::from(name),
        )?;
        if documents.is_empty() {
            return Ok(not_found(name));
        }

        for document in &documents {
            let mut task = task_from_record(&document.record)?;
            if let Some((display, _)) = &change.date {
                task.date = display.clone();
            }
            if let Some((display, _)) = &change.time {
                task.time = display.clone();
            }

            let date = match &change.date {
                Some((_, date)) => Some(*date),
                None => task
                    .canonical
                    .map(|stamp| stamp.date)
                    .or_else(|| CanonicalDate::parse_display(&task.date)),
            };
            let time = match &change.time {
                Some((_, time)) => *time,
                None => task
                    .canonical
                    .and_then(|stamp| stamp.time)
                    .or_else(|| parse_time(&task.time).canonical()),
            };

            let mut partial = Record::new();
            partial.insert("fecha".to_string(), Value::from(task.date));
            partial.insert("hora".to_string(), Value::from(task.time));
            partial.insert(
                "canonical".to_string(),
                match date {
                    Some(date) => to_json(&CanonicalStamp { date, time })?,
                    None => Value::Null,
                },
            );
            self.store.update_by_ref(&document.reference, partial)?;
        }
        info!(task = %name, count = documents.len(), "task schedule modified");

        Ok(WebhookResponse::text(format!(
            "La tarea \"{name}\" fue modificada correctamente."
        )))
    }

    fn insert(&mut self, task: &Task) -> Result<(), AppError> {
        let record = match to_json(task)? {
            Value::Object(fields) => fields,
            _ => return Err(AppError::invalid_data("task must serialize to an object")),
        };
        let id = self.store.add(&self.config.collection, record)?;
        info!(task = %task.name, id = %id, fecha = %task.date, hora = %task.time, "task created");
        Ok(())
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<DocumentRef>, AppError> {
        Ok(self
            .store
            .query_by_field(&self.config.collection, "tarea", &Value::from(name))?
            .into_iter()
            .map(|document| document.reference)
            .collect())
    }

    /// Tasks in store order. Records that are not tasks are skipped.
    fn load_tasks(&self) -> Result<Vec<(DocumentRef, Task)>, AppError> {
        let documents = self.store.list_all(&self.config.collection)?;
        let mut tasks = Vec::with_capacity(documents.len());
        for document in documents {
            match task_from_record(&document.record) {
                Ok(task) => tasks.push((document.reference, task)),
                Err(err) => {
                    warn!(id = %document.reference.id, error = %err, "skipping malformed task record")
                }
            }
        }
        Ok(tasks)
    }
}

fn task_from_record(record: &Record) -> Result<Task, AppError> {
    serde_json::from_value(Value::Object(record.clone()))
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|err| AppError::invalid_data(err.to_string()))
}

fn ask_meridiem(
    request: &DialogueRequest,
    prompt: &MeridiemPrompt,
    preface: Option<&str>,
) -> WebhookResponse {
    let question = match preface {
        Some(preface) => format!("{preface} {}", prompt.question()),
        None => prompt.question(),
    };
    WebhookResponse::text(question)
        .with_context(prompt.to_context(request.context_name(MERIDIEM_CONTEXT)))
}

fn not_found(name: &str) -> WebhookResponse {
    WebhookResponse::text(format!("No encontré la tarea \"{name}\"."))
}

fn date_failure_reply(failure: &ParseFailure, lead: &str) -> WebhookResponse {
    let reason = match failure {
        ParseFailure::RelativeOrAmbiguousDate(text) => {
            format!("\"{text}\" no es una fecha fija.")
        }
        ParseFailure::InvalidCalendarDate { day, month, year } => {
            format!("La fecha {day:02}/{month:02}/{year} no existe en el calendario.")
        }
        ParseFailure::UnknownMonthName(month) => format!("No reconozco el mes \"{month}\"."),
        ParseFailure::UnrecognizedFormat(_) | ParseFailure::AmbiguousMeridiem(_) => {
            "No entendí la fecha.".to_string()
        }
    };
    debug!(code = failure.code(), "date rejected");
    WebhookResponse::text(format!("{lead}\n{reason}\n{DATE_EXAMPLE}"))
}

#[cfg(test)]
mod tests {
    use super::{Intent, Webhook};
    use crate::config::{Config, MeridiemPolicy};
    use crate::datetime::TimeMode;
    use crate::dialogue::{Context, DialogueRequest, MERIDIEM_CONTEXT, WebhookResponse};
    use crate::error::AppError;
    use crate::storage::{DocumentRef, DocumentStore, MemoryStore, Record, StoredDocument};
    use serde_json::{Value, json};
    use time::Date;
    use time::macros::date;

    const TODAY: Date = date!(2025 - 12 - 10);

    fn turn(store: &mut MemoryStore, config: &Config, request: DialogueRequest) -> WebhookResponse {
        Webhook::new(store, config, TODAY).handle(&request)
    }

    fn create(name: &str, fecha: &str, hora: &str) -> DialogueRequest {
        DialogueRequest::new("CrearTarea")
            .with_param("tarea", name)
            .with_param("fecha", fecha)
            .with_param("hora", hora)
    }

    fn tasks(store: &MemoryStore) -> Vec<Record> {
        store
            .list_all("tareas")
            .unwrap()
            .into_iter()
            .map(|document| document.record)
            .collect()
    }

    fn seed(store: &mut MemoryStore, name: &str, fecha: &str, hora: &str, estado: &str) {
        let Value::Object(record) = json!({
            "tarea": name,
            "fecha": fecha,
            "hora": hora,
            "estado": estado
        }) else {
            unreachable!()
        };
        store.add("tareas", record).unwrap();
    }

    fn follow_up(response: &WebhookResponse) -> Context {
        response.output_contexts.as_ref().unwrap()[0].clone()
    }

    #[test]
    fn intent_names_map_to_handlers() {
        assert_eq!(Intent::from_name("CrearTarea"), Intent::CreateTask);
        assert_eq!(Intent::from_name("ResumenSemanal"), Intent::WeeklySummary);
        assert_eq!(Intent::from_name("Saludo"), Intent::Unknown);
    }

    #[test]
    fn unknown_intent_gets_fallback_reply() {
        let mut store = MemoryStore::new();
        let response = turn(&mut store, &Config::default(), DialogueRequest::new("Saludo"));
        assert_eq!(response.fulfillment_text, "No entendí tu solicitud.");
        assert!(response.output_contexts.is_none());
    }

    #[test]
    fn create_with_explicit_meridiem_persists_immediately() {
        let mut store = MemoryStore::new();
        let response = turn(
            &mut store,
            &Config::default(),
            create("leer", "10 de diciembre de 2025", "3 pm"),
        );

        assert_eq!(
            response.fulfillment_text,
            "Tarea registrada:\n• leer — 10/12/2025 3 pm — (pendiente)"
        );
        let stored = tasks(&store);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["fecha"], "10/12/2025");
        assert_eq!(stored[0]["estado"], "pendiente");
        assert_eq!(stored[0]["canonical"]["time"]["hour"], 15);
    }

    #[test]
    fn bare_hour_waits_for_meridiem_then_persists() {
        let mut store = MemoryStore::new();
        let config = Config::default();

        let asked = turn(&mut store, &config, create("leer", "10 de diciembre de 2025", "3"));
        assert!(asked.fulfillment_text.contains("am o pm"));
        assert!(tasks(&store).is_empty());

        let context = follow_up(&asked);
        assert_eq!(context.name, MERIDIEM_CONTEXT);
        assert_eq!(context.lifespan_count, 2);

        let confirm = DialogueRequest::new("ConfirmarMeridiem")
            .with_param("meridiem", "pm")
            .with_context(context);
        let done = turn(&mut store, &config, confirm);

        assert_eq!(
            done.fulfillment_text,
            "Tarea registrada:\n• leer — 10/12/2025 3 pm — (pendiente)"
        );
        assert_eq!(follow_up(&done).lifespan_count, 0);
        let stored = tasks(&store);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["hora"], "3 pm");
    }

    #[test]
    fn invalid_meridiem_reply_reprompts_then_expires() {
        let mut store = MemoryStore::new();
        let config = Config::default();

        let asked = turn(&mut store, &config, create("leer", "10/12/2025", "7"));
        let retry = turn(
            &mut store,
            &config,
            DialogueRequest {
                query_text: "por la tarde".to_string(),
                ..DialogueRequest::new("ConfirmarMeridiem")
            }
            .with_context(follow_up(&asked)),
        );
        assert!(retry.fulfillment_text.starts_with("Solo entiendo"));
        assert_eq!(follow_up(&retry).lifespan_count, 1);

        let expired = turn(
            &mut store,
            &config,
            DialogueRequest::new("Saludo")
                .with_param("meridiem", "luego")
                .with_context(follow_up(&retry)),
        );
        assert!(expired.fulfillment_text.contains("no guardé"));
        assert_eq!(follow_up(&expired).lifespan_count, 0);
        assert!(tasks(&store).is_empty());
    }

    #[test]
    fn confirmation_without_context_is_explained() {
        let mut store = MemoryStore::new();
        let response = turn(
            &mut store,
            &Config::default(),
            DialogueRequest::new("ConfirmarMeridiem").with_param("meridiem", "am"),
        );
        assert_eq!(
            response.fulfillment_text,
            "No tengo ninguna tarea esperando am o pm."
        );
    }

    #[test]
    fn store_raw_policy_keeps_bare_hour() {
        let mut store = MemoryStore::new();
        let config = Config {
            meridiem_policy: MeridiemPolicy::StoreRaw,
            ..Config::default()
        };

        let response = turn(&mut store, &config, create("leer", "10/12/2025", "3"));

        assert!(response.fulfillment_text.starts_with("Tarea registrada"));
        let stored = tasks(&store);
        assert_eq!(stored[0]["hora"], "3");
        assert_eq!(stored[0]["canonical"]["time"], Value::Null);
    }

    #[test]
    fn twelve_hour_mode_renders_twenty_four_hour_input() {
        let mut store = MemoryStore::new();
        let config = Config {
            time_mode: TimeMode::TwelveHour,
            ..Config::default()
        };

        turn(&mut store, &config, create("leer", "10/12/2025", "15:30"));

        assert_eq!(tasks(&store)[0]["hora"], "3:30 pm");
    }

    #[test]
    fn colon_time_in_twelve_hour_range_asks_for_meridiem() {
        let mut store = MemoryStore::new();
        let config = Config::default();

        let asked = turn(&mut store, &config, create("correr", "10/12/2025", "7:30"));
        assert!(asked.fulfillment_text.contains("am o pm"));
        assert!(tasks(&store).is_empty());
        assert_eq!(follow_up(&asked).parameters["minute"], 30);

        let done = turn(
            &mut store,
            &config,
            DialogueRequest::new("ConfirmarMeridiem")
                .with_param("meridiem", "pm")
                .with_context(follow_up(&asked)),
        );

        assert_eq!(
            done.fulfillment_text,
            "Tarea registrada:\n• correr — 10/12/2025 7:30 pm — (pendiente)"
        );
        let stored = &tasks(&store)[0];
        assert_eq!(stored["canonical"]["time"]["hour"], 19);
        assert_eq!(stored["canonical"]["time"]["minute"], 30);
    }

    #[test]
    fn zero_padded_colon_time_is_stored_directly() {
        let mut store = MemoryStore::new();
        let response = turn(
            &mut store,
            &Config::default(),
            create("correr", "10/12/2025", "07:30"),
        );

        assert!(response.fulfillment_text.starts_with("Tarea registrada"));
        assert_eq!(tasks(&store)[0]["canonical"]["time"]["hour"], 7);
    }

    #[test]
    fn non_ascii_hour_is_kept_as_typed() {
        let mut store = MemoryStore::new();
        turn(&mut store, &Config::default(), create("leer", "10/12/2025", "３"));

        let stored = &tasks(&store)[0];
        assert_eq!(stored["hora"], "３");
        assert_eq!(stored["canonical"]["time"], Value::Null);
    }

    #[test]
    fn relative_dates_are_refused_with_example() {
        let mut store = MemoryStore::new();
        let response = turn(&mut store, &Config::default(), create("leer", "mañana", "3 pm"));

        assert!(response.fulfillment_text.contains("necesito una fecha completa"));
        assert!(response.fulfillment_text.contains("10/12/2025"));
        assert!(tasks(&store).is_empty());
    }

    #[test]
    fn impossible_dates_are_refused() {
        let mut store = MemoryStore::new();
        let response = turn(&mut store, &Config::default(), create("leer", "31/04/2025", ""));

        assert!(response.fulfillment_text.contains("no existe"));
        assert!(tasks(&store).is_empty());
    }

    #[test]
    fn list_and_delete_by_name() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        seed(&mut store, "leer", "10/12/2025", "3 pm", "pendiente");
        seed(&mut store, "correr", "11/12/2025", "7 am", "pendiente");

        let listed = turn(&mut store, &config, DialogueRequest::new("VerTareas"));
        assert!(listed.fulfillment_text.starts_with("Tareas registradas\n\n1. leer"));
        assert!(listed.fulfillment_text.contains("2. correr\n   Fecha: 11/12/2025"));

        let prompt = turn(&mut store, &config, DialogueRequest::new("EliminarTarea"));
        assert!(prompt.fulfillment_text.contains("• correr — 11/12/2025 7 am"));

        let deleted = turn(
            &mut store,
            &config,
            DialogueRequest::new("EliminarTarea").with_param("tarea", "leer"),
        );
        assert_eq!(deleted.fulfillment_text, "Tarea \"leer\" eliminada correctamente.");
        assert_eq!(tasks(&store).len(), 1);

        let missing = turn(
            &mut store,
            &config,
            DialogueRequest::new("EliminarTarea").with_param("tarea", "leer"),
        );
        assert_eq!(missing.fulfillment_text, "No encontré la tarea \"leer\".");
    }

    #[test]
    fn empty_store_replies() {
        let mut store = MemoryStore::new();
        let config = Config::default();

        let listed = turn(&mut store, &config, DialogueRequest::new("VerTareas"));
        assert_eq!(listed.fulfillment_text, "No tienes tareas registradas.");
        let weekly = turn(&mut store, &config, DialogueRequest::new("ResumenSemanal"));
        assert_eq!(
            weekly.fulfillment_text,
            "No tienes tareas registradas para esta semana 🙌"
        );
        let recommend = turn(&mut store, &config, DialogueRequest::new("RecomendarTarea"));
        assert_eq!(recommend.fulfillment_text, "No tienes tareas pendientes 🎉");
    }

    #[test]
    fn change_status_updates_every_match() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        seed(&mut store, "leer", "10/12/2025", "3 pm", "pendiente");

        let response = turn(
            &mut store,
            &config,
            DialogueRequest::new("CambiarEstadoTarea")
                .with_param("tarea", "leer")
                .with_param("estado", "completada"),
        );

        assert_eq!(
            response.fulfillment_text,
            "Se actualizó la tarea \"leer\" a estado \"completada\"."
        );
        assert_eq!(tasks(&store)[0]["estado"], "completada");
    }

    #[test]
    fn modify_date_keeps_time_and_refreshes_canonical() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        seed(&mut store, "leer", "10/12/2025", "3 pm", "pendiente");

        let response = turn(
            &mut store,
            &config,
            DialogueRequest::new("ModificarTarea")
                .with_param("tarea", "leer")
                .with_param("fecha", "12 de diciembre de 2025"),
        );

        assert_eq!(
            response.fulfillment_text,
            "La tarea \"leer\" fue modificada correctamente."
        );
        let stored = &tasks(&store)[0];
        assert_eq!(stored["fecha"], "12/12/2025");
        assert_eq!(stored["hora"], "3 pm");
        assert_eq!(stored["canonical"]["date"]["day"], 12);
        assert_eq!(stored["canonical"]["time"]["hour"], 15);
    }

    #[test]
    fn modify_with_bare_hour_asks_first() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        seed(&mut store, "leer", "10/12/2025", "3 pm", "pendiente");

        let asked = turn(
            &mut store,
            &config,
            DialogueRequest::new("ModificarTarea")
                .with_param("tarea", "leer")
                .with_param("hora", "8"),
        );
        assert_eq!(tasks(&store)[0]["hora"], "3 pm");

        let done = turn(
            &mut store,
            &config,
            DialogueRequest::new("ConfirmarMeridiem")
                .with_param("meridiem", "am")
                .with_context(follow_up(&asked)),
        );
        assert_eq!(
            done.fulfillment_text,
            "La tarea \"leer\" fue modificada correctamente."
        );
        let stored = &tasks(&store)[0];
        assert_eq!(stored["hora"], "8 am");
        assert_eq!(stored["fecha"], "10/12/2025");
    }

    #[test]
    fn modify_requires_something_to_change() {
        let mut store = MemoryStore::new();
        let response = turn(
            &mut store,
            &Config::default(),
            DialogueRequest::new("ModificarTarea").with_param("tarea", "leer"),
        );
        assert!(response.fulfillment_text.starts_with("Para modificar una tarea"));
    }

    #[test]
    fn reminders_list_today_pending_only() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        seed(&mut store, "leer", "10/12/2025", "3 pm", "pendiente");
        seed(&mut store, "correr", "10/12/2025", "7 am", "completada");
        seed(&mut store, "nadar", "11/12/2025", "9 am", "pendiente");
        seed(&mut store, "dormir", "10/12/2025", "tarde", "pendiente");

        let response = turn(&mut store, &config, DialogueRequest::new("Recordatorios"));

        assert_eq!(
            response.fulfillment_text,
            "Estas son tus tareas para hoy:\n• leer — 3 pm — (pendiente)\n• dormir — tarde — (pendiente)\n"
        );
    }

    #[test]
    fn weekly_summary_is_chronological_within_monday_to_sunday() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        seed(&mut store, "viernes", "12/12/2025", "9 am", "pendiente");
        seed(&mut store, "lunes", "08/12/2025", "3 pm", "pendiente");
        seed(&mut store, "proxima", "15/12/2025", "8 am", "pendiente");
        seed(&mut store, "domingo", "14/12/2025", "11 pm", "completada");

        let response = turn(&mut store, &config, DialogueRequest::new("ResumenSemanal"));

        assert_eq!(
            response.fulfillment_text,
            "Esta semana tienes 3 tareas:\n\
             • lunes — 08/12/2025 3 pm — (pendiente)\n\
             • viernes — 12/12/2025 9 am — (pendiente)\n\
             • domingo — 14/12/2025 11 pm — (completada)\n"
        );
    }

    #[test]
    fn recommendation_skips_completed_tasks() {
        let mut store = MemoryStore::new();
        let config = Config::default();
        seed(&mut store, "hecha", "01/12/2025", "8 am", "terminado");
        seed(&mut store, "tarde", "20/12/2025", "5 pm", "pendiente");
        seed(&mut store, "pronto", "11/12/2025", "7 am", "pendiente");

        let response = turn(&mut store, &config, DialogueRequest::new("RecomendarTarea"));

        assert_eq!(
            response.fulfillment_text,
            "Te recomiendo realizar primero:\n• pronto — 11/12/2025 7 am — (pendiente)\nEs la tarea más cercana en el tiempo."
        );
    }

    struct BrokenStore;

    impl DocumentStore for BrokenStore {
        fn add(&mut self, _collection: &str, _record: Record) -> Result<String, AppError> {
            Err(AppError::io("disk unavailable"))
        }

        fn query_by_field(
            &self,
            _collection: &str,
            _field: &str,
            _value: &Value,
        ) -> Result<Vec<StoredDocument>, AppError> {
            Err(AppError::io("disk unavailable"))
        }

        fn update_by_ref(&mut self, _reference: &DocumentRef, _partial: Record) -> Result<(), AppError> {
            Err(AppError::io("disk unavailable"))
        }

        fn delete_by_ref(&mut self, _reference: &DocumentRef) -> Result<(), AppError> {
            Err(AppError::io("disk unavailable"))
        }

        fn list_all(&self, _collection: &str) -> Result<Vec<StoredDocument>, AppError> {
            Err(AppError::io("disk unavailable"))
        }
    }

    #[test]
    fn store_failures_become_an_apology() {
        let mut store = BrokenStore;
        let config = Config::default();
        let response =
            Webhook::new(&mut store, &config, TODAY).handle(&DialogueRequest::new("VerTareas"));

        assert!(response.fulfillment_text.starts_with("Lo siento"));
    }
}
