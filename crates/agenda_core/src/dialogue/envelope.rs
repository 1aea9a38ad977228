use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Conversation-scoped key/value blob with a turn-count expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub name: String,
    #[serde(default)]
    pub lifespan_count: u32,
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,
}

impl Context {
    /// Last path segment of the context name.
    ///
    /// The platform sends fully qualified names
    /// (`projects/p/agent/sessions/s/contexts/esperando-meridiem`).
    pub fn short_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Inbound webhook payload as posted by the dialogue platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    #[serde(default)]
    pub session: String,
    pub query_result: QueryResult,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub query_text: String,
    #[serde(default)]
    pub intent: IntentRef,
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,
    #[serde(default)]
    pub output_contexts: Vec<Context>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    #[serde(default)]
    pub display_name: String,
}

/// Outbound reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_contexts: Option<Vec<Context>>,
}

impl WebhookResponse {
    pub fn text<T: Into<String>>(text: T) -> Self {
        Self {
            fulfillment_text: text.into(),
            output_contexts: None,
        }
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.output_contexts
            .get_or_insert_with(Vec::new)
            .push(context);
        self
    }
}

/// Platform-independent view of one user turn: an intent name, flat text
/// parameters and the contexts still alive in the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueRequest {
    pub session: String,
    pub intent_name: String,
    pub query_text: String,
    pub parameters: BTreeMap<String, String>,
    pub contexts: Vec<Context>,
}

impl DialogueRequest {
    pub fn new<N: Into<String>>(intent_name: N) -> Self {
        Self {
            intent_name: intent_name.into(),
            ..Self::default()
        }
    }

    pub fn with_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_context(mut self, context: Context) -> Self {
        self.contexts.push(context);
        self
    }

    /// Parameter value, or an empty string when absent.
    pub fn param(&self, key: &str) -> &str {
        self.parameters.get(key).map(String::as_str).unwrap_or("")
    }

    /// A live context by short name. Contexts with no remaining lifespan are
    /// treated as gone.
    pub fn context(&self, short_name: &str) -> Option<&Context> {
        self.contexts
            .iter()
            .find(|context| context.short_name() == short_name && context.lifespan_count > 0)
    }

    /// Fully qualified name for a context in this request's session.
    pub fn context_name(&self, short_name: &str) -> String {
        if self.session.is_empty() {
            short_name.to_string()
        } else {
            format!("{}/contexts/{}", self.session, short_name)
        }
    }
}

impl From<WebhookRequest> for DialogueRequest {
    fn from(request: WebhookRequest) -> Self {
        let query = request.query_result;
        let parameters = query
            .parameters
            .iter()
            .map(|(key, value)| (key.clone(), parameter_text(value)))
            .collect();

        Self {
            session: request.session,
            intent_name: query.intent.display_name,
            query_text: query.query_text,
            parameters,
            contexts: query.output_contexts,
        }
    }
}

/// Renders a platform parameter as the text the handlers expect.
///
/// Date/time entities arrive as objects carrying `date_time`; lists keep
/// their first element.
pub fn parameter_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items.first().map(parameter_text).unwrap_or_default(),
        Value::Object(fields) => ["date_time", "date", "time"]
            .iter()
            .find_map(|key| fields.get(*key))
            .map(parameter_text)
            .unwrap_or_default(),
    }
}
