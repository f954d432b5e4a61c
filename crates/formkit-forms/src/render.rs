//! Rendering of [`FormView`] trees.
//!
//! [`FormRenderer`] walks a view tree bottom-up. For each node it asks the
//! [`Theme`] for a template, trying the field's unique block prefix first
//! and then its type chain from most to least specific, and hands the
//! serialized view to the [`Renderer`]. Rendered children are passed to
//! the parent as `children_html`.
//!
//! [`HtmlRenderer`] is a small built-in [`Renderer`] for the templates of
//! [`DefaultTheme`]. It escapes every value and emits plain markup.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use formkit_core::utils::text::escape_html;
use formkit_core::{FormkitError, FormkitResult, Value};

use crate::interfaces::{Renderer, Theme};
use crate::view::FormView;

// ============================================================
// Theme
// ============================================================

/// Maps the built-in block prefixes to the [`HtmlRenderer`] templates.
#[derive(Debug, Clone)]
pub struct DefaultTheme {
    name: String,
}

impl DefaultTheme {
    /// Creates the theme under the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for DefaultTheme {
    fn default() -> Self {
        Self::new("default")
    }
}

impl Theme for DefaultTheme {
    fn name(&self) -> &str {
        &self.name
    }

    fn template_for(&self, block_prefix: &str) -> Option<String> {
        let template = match block_prefix {
            "form" => "form",
            "choice" => "choice",
            "checkbox" => "checkbox",
            "textarea" => "textarea",
            "button" => "button",
            "field" => "input",
            _ => return None,
        };
        Some(template.to_string())
    }

    fn css_classes(&self, input_type: &str) -> Vec<String> {
        let class = match input_type {
            "checkbox" | "radio" => "form-check-input",
            "submit" | "reset" | "button" => "btn",
            "hidden" | "form" => return Vec::new(),
            "select" => "form-select",
            _ => "form-control",
        };
        vec![class.to_string()]
    }
}

// ============================================================
// FormRenderer
// ============================================================

/// Renders view trees through a theme and a renderer.
#[derive(Clone)]
pub struct FormRenderer {
    renderer: Arc<dyn Renderer>,
    theme: Arc<dyn Theme>,
}

impl std::fmt::Debug for FormRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormRenderer")
            .field("theme", &self.theme.name())
            .finish_non_exhaustive()
    }
}

impl Default for FormRenderer {
    fn default() -> Self {
        Self::new(Arc::new(HtmlRenderer), Arc::new(DefaultTheme::default()))
    }
}

impl FormRenderer {
    /// Creates a renderer.
    pub fn new(renderer: Arc<dyn Renderer>, theme: Arc<dyn Theme>) -> Self {
        Self { renderer, theme }
    }

    /// Returns the template used for `view`.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::RenderError`] if no prefix maps to an
    /// existing template.
    pub fn template_for(&self, view: &FormView) -> FormkitResult<String> {
        std::iter::once(&view.unique_block_prefix)
            .chain(view.block_prefixes.iter().rev())
            .filter_map(|prefix| self.theme.template_for(prefix))
            .find(|template| self.renderer.exists(template))
            .ok_or_else(|| {
                FormkitError::RenderError(format!(
                    "no template for \"{}\" (block prefixes: {})",
                    view.full_name,
                    view.block_prefixes.join(", ")
                ))
            })
    }

    /// Renders `view` and its children.
    ///
    /// # Errors
    ///
    /// Returns an error if a template is missing or the renderer fails.
    pub fn render(&self, view: &FormView) -> FormkitResult<String> {
        let mut children_html = String::new();
        for child in &view.children {
            children_html.push_str(&self.render(child)?);
        }

        let template = self.template_for(view)?;
        let mut context = view.to_context()?;
        if let Some(map) = context.as_map_mut() {
            map.remove("children");
            map.insert("children_html".to_string(), Value::String(children_html));
            let classes = self.theme.css_classes(&view.input_type);
            if let (false, Some(Value::Map(attr))) = (classes.is_empty(), map.get_mut("attr")) {
                attr.entry("class".to_string())
                    .or_insert_with(|| Value::String(classes.join(" ")));
            }
        }

        tracing::debug!(field = %view.full_name, template = %template, "rendering field");
        self.renderer.render(&template, &context)
    }
}

// ============================================================
// HtmlRenderer
// ============================================================

const TEMPLATES: [&str; 6] = ["input", "textarea", "checkbox", "choice", "button", "form"];

/// Renders the [`DefaultTheme`] templates as plain HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, template_id: &str, context: &Value) -> FormkitResult<String> {
        let ctx = Ctx(context);
        let html = match template_id {
            "input" => render_input(&ctx),
            "textarea" => wrap(&ctx, &format!(
                "<textarea{}>{}</textarea>",
                control_attrs(&ctx, None),
                escape_html(&ctx.string("value"))
            )),
            "checkbox" => render_checkbox(&ctx),
            "choice" => render_choice(&ctx),
            "button" => format!(
                r#"<button type="{}"{}>{}</button>"#,
                escape_html(&ctx.string("input_type")),
                control_attrs(&ctx, None),
                escape_html(&ctx.string("label"))
            ),
            "form" => format!(
                r#"<div id="{}">{}{}</div>"#,
                escape_html(&ctx.string("id")),
                render_errors(&ctx),
                ctx.string("children_html")
            ),
            other => return Err(FormkitError::RenderError(format!("unknown template \"{other}\""))),
        };
        Ok(html)
    }

    fn exists(&self, template_id: &str) -> bool {
        TEMPLATES.contains(&template_id)
    }
}

/// Read access to a view context.
struct Ctx<'a>(&'a Value);

impl Ctx<'_> {
    fn string(&self, key: &str) -> String {
        self.0.get(key).map(Value::to_view_string).unwrap_or_default()
    }

    fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    fn list(&self, key: &str) -> &[Value] {
        self.0.get(key).and_then(Value::as_list).unwrap_or_default()
    }
}

fn render_attrs(attrs: &BTreeMap<String, String>) -> String {
    attrs
        .iter()
        .fold(String::new(), |mut out, (key, value)| {
            let _ = write!(out, r#" {}="{}""#, escape_html(key), escape_html(value));
            out
        })
}

/// `id`, `name`, the `attr` map, and the `required`/`disabled` flags.
fn control_attrs(ctx: &Ctx<'_>, name_suffix: Option<&str>) -> String {
    let mut attrs: BTreeMap<String, String> = ctx
        .0
        .get("attr")
        .and_then(Value::as_map)
        .map(|attr| {
            attr.iter()
                .map(|(key, value)| (key.clone(), value.to_view_string()))
                .collect()
        })
        .unwrap_or_default();
    attrs.insert("id".to_string(), ctx.string("id"));
    attrs.insert(
        "name".to_string(),
        format!("{}{}", ctx.string("full_name"), name_suffix.unwrap_or_default()),
    );

    let mut out = render_attrs(&attrs);
    for flag in ["required", "disabled"] {
        if ctx.flag(flag) {
            let _ = write!(out, " {flag}");
        }
    }
    out
}

fn render_errors(ctx: &Ctx<'_>) -> String {
    let errors = ctx.list("errors");
    if errors.is_empty() {
        return String::new();
    }
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape_html(&e.to_view_string())))
        .collect();
    format!(r#"<ul class="errors">{items}</ul>"#)
}

fn wrap(ctx: &Ctx<'_>, control: &str) -> String {
    let help = match ctx.string("help") {
        help if help.is_empty() => String::new(),
        help => format!(r#"<small class="help">{}</small>"#, escape_html(&help)),
    };
    format!(
        r#"<div class="field"><label for="{}">{}</label>{control}{}{help}</div>"#,
        escape_html(&ctx.string("id")),
        escape_html(&ctx.string("label")),
        render_errors(ctx)
    )
}

fn render_input(ctx: &Ctx<'_>) -> String {
    let input_type = ctx.string("input_type");
    let control = format!(
        r#"<input type="{}"{} value="{}">"#,
        escape_html(&input_type),
        control_attrs(ctx, None),
        escape_html(&ctx.string("value"))
    );
    if input_type == "hidden" {
        control
    } else {
        wrap(ctx, &control)
    }
}

fn render_checkbox(ctx: &Ctx<'_>) -> String {
    let value = match ctx.string("value") {
        value if value.is_empty() => "1".to_string(),
        value => value,
    };
    let checked = if ctx.flag("checked") { " checked" } else { "" };
    wrap(ctx, &format!(
        r#"<input type="checkbox"{} value="{}"{checked}>"#,
        control_attrs(ctx, None),
        escape_html(&value)
    ))
}

fn render_choice(ctx: &Ctx<'_>) -> String {
    let multiple = ctx.flag("multiple");
    let suffix = multiple.then_some("[]");
    let choices = ctx.list("choices");
    let choice_field = |choice: &Value, key: &str| choice.get(key).map(Value::to_view_string).unwrap_or_default();
    let is_selected = |choice: &Value| choice.get("selected").and_then(Value::as_bool).unwrap_or(false);

    if ctx.flag("expanded") {
        let input_type = if multiple { "checkbox" } else { "radio" };
        let name = format!("{}{}", ctx.string("full_name"), suffix.unwrap_or_default());
        let id = ctx.string("id");
        let control: String = choices
            .iter()
            .enumerate()
            .map(|(index, choice)| {
                format!(
                    r#"<label><input type="{input_type}" id="{}_{index}" name="{}" value="{}"{}> {}</label>"#,
                    escape_html(&id),
                    escape_html(&name),
                    escape_html(&choice_field(choice, "value")),
                    if is_selected(choice) { " checked" } else { "" },
                    escape_html(&choice_field(choice, "label"))
                )
            })
            .collect();
        return wrap(ctx, &control);
    }

    let mut options = String::new();
    let placeholder = ctx.string("placeholder");
    if !placeholder.is_empty() && !multiple {
        let _ = write!(options, r#"<option value="">{}</option>"#, escape_html(&placeholder));
    }
    for choice in choices {
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            escape_html(&choice_field(choice, "value")),
            if is_selected(choice) { " selected" } else { "" },
            escape_html(&choice_field(choice, "label"))
        );
    }
    let multiple_attr = if multiple { " multiple" } else { "" };
    wrap(ctx, &format!(
        "<select{}{multiple_attr}>{options}</select>",
        control_attrs(ctx, suffix)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuildContext;
    use crate::form::Form;
    use serde_json::json;

    fn signup() -> Form {
        let context = BuildContext::default();
        let mut builder = context.create_form_builder("signup").unwrap();
        builder
            .add_email("email", json!({"required": true, "attr": {"placeholder": "you@example.com"}}))
            .unwrap()
            .add_select(
                "plan",
                json!({"choices": {"free": "Free", "pro": "Pro <beta>"}, "placeholder": "Pick one"}),
            )
            .unwrap()
            .add_hidden("ref", ())
            .unwrap()
            .add_submit("save", ())
            .unwrap();
        builder.get_form().unwrap()
    }

    #[test]
    fn test_theme_templates() {
        let theme = DefaultTheme::default();
        assert_eq!(theme.name(), "default");
        assert_eq!(theme.template_for("field").as_deref(), Some("input"));
        assert_eq!(theme.template_for("email"), None);
        assert_eq!(theme.css_classes("email"), ["form-control"]);
        assert!(theme.css_classes("hidden").is_empty());
    }

    #[test]
    fn test_template_walks_most_specific_first() {
        let form = signup();
        let view = form.create_view().unwrap();
        let renderer = FormRenderer::default();
        assert_eq!(renderer.template_for(&view).unwrap(), "form");
        assert_eq!(renderer.template_for(view.child("email").unwrap()).unwrap(), "input");
        assert_eq!(renderer.template_for(view.child("plan").unwrap()).unwrap(), "choice");
        assert_eq!(renderer.template_for(view.child("save").unwrap()).unwrap(), "button");
    }

    #[test]
    fn test_render_form_markup() {
        let mut form = signup();
        form.set_data(Value::from(json!({"email": "a&b@example.com", "plan": "pro"})))
            .unwrap();
        let html = FormRenderer::default().render(&form.create_view().unwrap()).unwrap();

        assert!(html.starts_with(r#"<div id="signup">"#));
        assert!(html.contains(
            r#"<input type="email" class="form-control" id="signup_email" name="signup[email]" placeholder="you@example.com" required value="a&amp;b@example.com">"#
        ));
        assert!(html.contains(r#"<option value="">Pick one</option>"#));
        assert!(html.contains(r#"<option value="pro" selected>Pro &lt;beta&gt;</option>"#));
        assert!(html.contains(r#"<input type="hidden" id="signup_ref" name="signup[ref]" value="">"#));
        assert!(html.contains(r#"<button type="submit" class="btn" id="signup_save" name="signup[save]">Save</button>"#));
    }

    #[test]
    fn test_render_errors() {
        let mut form = signup();
        form.submit(Value::from(json!({"plan": "gold"}))).unwrap();
        let view = form.create_view().unwrap();
        let html = FormRenderer::default().render(view.child("email").unwrap()).unwrap();
        assert!(html.contains(r#"<ul class="errors"><li>The email field is required.</li></ul>"#));
    }

    #[derive(Debug)]
    struct Bare;

    impl Theme for Bare {
        fn name(&self) -> &str {
            "bare"
        }

        fn template_for(&self, block_prefix: &str) -> Option<String> {
            (block_prefix == "_signup_email").then(|| "input".to_string())
        }
    }

    #[test]
    fn test_unique_prefix_and_missing_template() {
        let form = signup();
        let view = form.create_view().unwrap();
        let renderer = FormRenderer::new(Arc::new(HtmlRenderer), Arc::new(Bare));
        assert_eq!(renderer.template_for(view.child("email").unwrap()).unwrap(), "input");
        assert!(matches!(
            renderer.render(&view),
            Err(FormkitError::RenderError(_))
        ));
    }

    #[test]
    fn test_unknown_template_is_error() {
        assert!(HtmlRenderer.render("carousel", &Value::Null).is_err());
        assert!(!HtmlRenderer.exists("carousel"));
    }
}
