//! Message rendering for outbound notifications, using the minijinja
//! templating engine with strict undefined-variable behaviour.

use minijinja::Environment;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{Alert, NotificationKind};

/// Error type for the TemplateService.
#[derive(Debug, Error)]
pub enum TemplateServiceError {
    /// No template is registered under the requested name.
    #[error("No template registered under '{0}'")]
    UnknownTemplate(String),

    /// The template failed to render against the given context.
    #[error("Failed to render template")]
    RenderError(#[from] minijinja::Error),
}

/// The typed context an alert message renders against. One shape covers
/// the problem/recovery/acknowledgement/test kinds; rollup messages add
/// the alerting count.
#[derive(Debug, Serialize)]
pub struct AlertContext<'a> {
    /// Display name of the contact being notified.
    pub contact: &'a str,
    /// The check, displayed `entity:name`.
    pub check: String,
    /// The reported condition name.
    pub condition: &'a str,
    /// The notification severity name.
    pub severity: String,
    /// The notification kind name.
    pub kind: &'a str,
    /// Summary from the transition.
    pub summary: &'a str,
    /// Details from the transition.
    pub details: &'a str,
    /// Transition time, Unix seconds.
    pub time: i64,
    /// Number of checks alerting on the medium, for rollup messages.
    pub alerting_count: usize,
}

impl<'a> AlertContext<'a> {
    /// Builds the render context for an alert.
    pub fn from_alert(alert: &'a Alert) -> Self {
        Self {
            contact: &alert.contact_name,
            check: alert.check.to_string(),
            condition: alert.condition.as_str(),
            severity: alert.severity.to_string(),
            kind: alert.kind.as_str(),
            summary: &alert.summary,
            details: &alert.details,
            time: alert.time,
            alerting_count: alert.alerting_count,
        }
    }
}

const PROBLEM_TEMPLATE: &str =
    "PROBLEM: {{ check }} is {{ condition | upper }} at {{ time }}: {{ summary }}";
const RECOVERY_TEMPLATE: &str =
    "RECOVERY: {{ check }} returned to OK at {{ time }}: {{ summary }}";
const ACKNOWLEDGEMENT_TEMPLATE: &str =
    "ACKNOWLEDGEMENT: {{ check }} acknowledged by {{ contact }}: {{ summary }}";
const TEST_TEMPLATE: &str = "TEST: test notification for {{ check }}";
const ROLLUP_TEMPLATE: &str =
    "ROLLUP: {{ alerting_count }} checks failing, latest {{ check }} {{ condition | upper }}: \
     {{ summary }}";

/// A service for rendering notification messages from named templates.
///
/// Template sources are plain strings; undefined context variables are a
/// render error rather than silent empty output.
pub struct TemplateService {
    env: Environment<'static>,
    sources: HashMap<String, String>,
}

impl TemplateService {
    /// Creates a service with the built-in default templates registered
    /// under the notification kind names plus `rollup`.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);

        let mut sources = HashMap::new();
        sources.insert(NotificationKind::Problem.as_str().to_string(), PROBLEM_TEMPLATE.into());
        sources.insert(NotificationKind::Recovery.as_str().to_string(), RECOVERY_TEMPLATE.into());
        sources.insert(
            NotificationKind::Acknowledgement.as_str().to_string(),
            ACKNOWLEDGEMENT_TEMPLATE.into(),
        );
        sources.insert(NotificationKind::Test.as_str().to_string(), TEST_TEMPLATE.into());
        sources.insert("rollup".to_string(), ROLLUP_TEMPLATE.into());

        Self { env, sources }
    }

    /// Registers or replaces a template source under a name.
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(name.into(), source.into());
    }

    /// Renders the named template with the given context.
    pub fn render<C: Serialize>(
        &self,
        name: &str,
        context: C,
    ) -> Result<String, TemplateServiceError> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| TemplateServiceError::UnknownTemplate(name.to_string()))?;
        Ok(self.env.render_str(source, context)?)
    }

    /// Renders the message for an alert: the template named after its
    /// notification kind, or `rollup` when the alert is a rollup.
    pub fn render_alert(&self, alert: &Alert) -> Result<String, TemplateServiceError> {
        let name = if alert.rollup { "rollup" } else { alert.kind.as_str() };
        self.render(name, AlertContext::from_alert(alert))
    }
}

impl Default for TemplateService {
    fn default() -> Self {
        Self::new()
    }
}
