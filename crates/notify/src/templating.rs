//! Minijinja template rendering for reminder titles and messages.
//!
//! Templates are arbitrary user strings from the config file, so a fresh
//! [`minijinja::Environment`] is created per render call. Templates are
//! validated once when the renderer is built.

use crate::traits::{Notification, NotifyError};

pub const DEFAULT_TITLE_TEMPLATE: &str = "{{ icon }} {{ label }} for {{ pet }}";
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "{{ dose }} due at {{ due_at }} ({{ status }})";

/// Data available to reminder templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReminderContext {
    /// Pet display name.
    pub pet: String,
    /// Medication name or feeding label.
    pub label: String,
    /// Dose or amount, as entered.
    pub dose: String,
    /// `"medication"` or `"feeding"`.
    pub kind: String,
    /// Due time, `YYYY-MM-DD HH:MM`.
    pub due_at: String,
    /// Status label (e.g. `"overdue"`, `"due today"`).
    pub status: String,
    /// Human-readable recurrence (e.g. `"every 8h"`).
    pub recurrence: String,
}

impl ReminderContext {
    fn icon(&self) -> &'static str {
        if self.kind == "feeding" {
            "🍽️"
        } else {
            "💊"
        }
    }
}

#[derive(serde::Serialize)]
struct RenderScope<'a> {
    #[serde(flatten)]
    ctx: &'a ReminderContext,
    icon: &'static str,
}

/// Renders reminder notifications from a title and a message template.
#[derive(Debug, Clone)]
pub struct ReminderRenderer {
    title_template: String,
    message_template: String,
}

impl ReminderRenderer {
    /// Build a renderer, validating both templates.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if either template has syntax errors.
    pub fn new(
        title_template: impl Into<String>,
        message_template: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let renderer = Self {
            title_template: title_template.into(),
            message_template: message_template.into(),
        };
        validate(&renderer.title_template)?;
        validate(&renderer.message_template)?;
        Ok(renderer)
    }

    /// Render a full notification, with pet/label/due metadata attached.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if rendering fails.
    pub fn render(&self, ctx: &ReminderContext) -> Result<Notification, NotifyError> {
        let title = render_str(&self.title_template, ctx)?;
        let message = render_str(&self.message_template, ctx)?;
        Ok(Notification::new(title, message)
            .with_meta("pet", ctx.pet.clone())
            .with_meta("label", ctx.label.clone())
            .with_meta("due_at", ctx.due_at.clone())
            .with_meta("status", ctx.status.clone()))
    }

    /// Render with the built-in templates, never failing.
    pub fn render_fallback(ctx: &ReminderContext) -> Notification {
        Notification::new(
            format!("{} {} for {}", ctx.icon(), ctx.label, ctx.pet),
            format!("{} due at {} ({})", ctx.dose, ctx.due_at, ctx.status),
        )
        .with_meta("pet", ctx.pet.clone())
        .with_meta("label", ctx.label.clone())
        .with_meta("due_at", ctx.due_at.clone())
        .with_meta("status", ctx.status.clone())
    }
}

impl Default for ReminderRenderer {
    fn default() -> Self {
        Self {
            title_template: DEFAULT_TITLE_TEMPLATE.to_string(),
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
        }
    }
}

/// Build a configured minijinja environment with custom filters.
fn build_env() -> minijinja::Environment<'static> {
    let mut env = minijinja::Environment::new();
    env.add_filter("lower", lower_filter);
    env.add_filter("upper", upper_filter);
    env
}

fn render_str(template_str: &str, ctx: &ReminderContext) -> Result<String, NotifyError> {
    let env = build_env();
    let scope = RenderScope {
        ctx,
        icon: ctx.icon(),
    };
    env.render_str(template_str, &scope)
        .map_err(|e| NotifyError::Template(e.to_string()))
}

/// Check that a template string parses, without evaluating it.
pub fn validate(template_str: &str) -> Result<(), NotifyError> {
    let env = build_env();
    env.template_from_str(template_str)
        .map_err(|e| NotifyError::Template(e.to_string()))?;
    Ok(())
}

/// Custom filter: lowercase a string.
fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

/// Custom filter: uppercase a string.
fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> ReminderContext {
        ReminderContext {
            pet: "Biscuit".to_string(),
            label: "Apoquel".to_string(),
            dose: "1 tab".to_string(),
            kind: "medication".to_string(),
            due_at: "2026-10-18 08:00".to_string(),
            status: "overdue".to_string(),
            recurrence: "every 12h".to_string(),
        }
    }

    #[test]
    fn default_templates_render() {
        let n = ReminderRenderer::default().render(&sample_context()).unwrap();
        assert_eq!(n.title, "💊 Apoquel for Biscuit");
        assert_eq!(n.message, "1 tab due at 2026-10-18 08:00 (overdue)");
        assert_eq!(n.metadata["pet"], "Biscuit");
        assert_eq!(n.metadata["status"], "overdue");
    }

    #[test]
    fn fallback_matches_default_templates() {
        let ctx = sample_context();
        let rendered = ReminderRenderer::default().render(&ctx).unwrap();
        assert_eq!(ReminderRenderer::render_fallback(&ctx), rendered);
    }

    #[test]
    fn feeding_icon() {
        let mut ctx = sample_context();
        ctx.kind = "feeding".to_string();
        ctx.label = "Dinner".to_string();
        let n = ReminderRenderer::default().render(&ctx).unwrap();
        assert_eq!(n.title, "🍽️ Dinner for Biscuit");
    }

    #[test]
    fn custom_templates_with_filters() {
        let renderer =
            ReminderRenderer::new("{{ pet | upper }}", "{{ label | lower }} ({{ recurrence }})").unwrap();
        let n = renderer.render(&sample_context()).unwrap();
        assert_eq!(n.title, "BISCUIT");
        assert_eq!(n.message, "apoquel (every 12h)");
    }

    #[test]
    fn invalid_template_is_rejected_at_construction() {
        let result = ReminderRenderer::new("{{ unclosed", DEFAULT_MESSAGE_TEMPLATE);
        assert!(matches!(result, Err(NotifyError::Template(_))));
    }

    #[test]
    fn validate_valid_template() {
        assert!(validate("{{ pet }} {% if status == 'overdue' %}!{% endif %}").is_ok());
    }
}
