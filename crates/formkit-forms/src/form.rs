//! The form tree.
//!
//! A [`Form`] node pairs a shared [`FieldDescriptor`] with per-request
//! state: model data, view data, submission state and errors. Compound
//! nodes own their children; a child knows its parent only by path.
//!
//! Submission runs in four steps on the root:
//!
//! 1. the CSRF token is checked before any other input is trusted;
//! 2. every leaf trims its raw value, applies `empty_data` and reverse
//!    transforms it into model data;
//! 3. the rules of every node run against the gathered model data;
//! 4. each violation is attached to the node at its path, then errors of
//!    nodes with `error_bubbling` move up to their parents.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use formkit_core::logging::form_span;
use formkit_core::{FormkitError, FormkitResult, Value};
use formkit_validation::{ExecutionContext, Rule, Violation};

use crate::builder::BuildContext;
use crate::errors::{ErrorList, FormError};
use crate::mapper::{DataMapper, PropertyPath, PropertyPathMapper};
use crate::request::parse_urlencoded;
use crate::types::{FieldDescriptor, EXTRA_FIELDS_MESSAGE};
use crate::view::FormView;

/// The message of the form-level error added for a bad CSRF token.
pub const CSRF_ERROR_MESSAGE: &str = "The CSRF token is invalid. Please try to resubmit the form.";

const INVALID_MESSAGE: &str = "This value is not valid.";

/// Where a form is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormState {
    /// Built, possibly holding initial data.
    #[default]
    Ready,
    /// Submitted once; data can no longer be set.
    Submitted,
}

/// A node of a form tree.
#[derive(Debug, Clone)]
pub struct Form {
    descriptor: Arc<FieldDescriptor>,
    path: String,
    full_name: String,
    context: BuildContext,
    mapper: Arc<dyn DataMapper>,
    form_rules: Vec<Rule>,
    children: Vec<Form>,
    initial_model: Value,
    initial_view: Value,
    model_data: Value,
    view_data: Value,
    state: FormState,
    errors: ErrorList,
    transformation_failed: bool,
    clicked: bool,
}

impl Form {
    pub(crate) fn new(
        descriptor: Arc<FieldDescriptor>,
        path: String,
        full_name: String,
        context: BuildContext,
    ) -> Self {
        Self {
            descriptor,
            path,
            full_name,
            context,
            mapper: Arc::new(PropertyPathMapper),
            form_rules: Vec::new(),
            children: Vec::new(),
            initial_model: Value::Null,
            initial_view: Value::Null,
            model_data: Value::Null,
            view_data: Value::Null,
            state: FormState::Ready,
            errors: ErrorList::new(),
            transformation_failed: false,
            clicked: false,
        }
    }

    pub(crate) fn set_mapper(&mut self, mapper: Arc<dyn DataMapper>) {
        self.mapper = mapper;
    }

    pub(crate) fn set_form_rules(&mut self, rules: Vec<Rule>) {
        self.form_rules = rules;
    }

    pub(crate) fn push_child(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Applies `data` options, children first so a parent's data wins.
    pub(crate) fn initialize(&mut self) -> FormkitResult<()> {
        for child in &mut self.children {
            child.initialize()?;
        }
        if let Some(data) = self.descriptor.option("data").cloned() {
            self.set_data(data)?;
        }
        Ok(())
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// The field name.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    fn display_name(&self) -> &str {
        if self.name().is_empty() {
            "form"
        } else {
            self.name()
        }
    }

    /// The dotted path from the root; empty for the root itself.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The HTML name, e.g. `user[address][city]`.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The HTML id, e.g. `user_address_city`.
    pub fn id(&self) -> String {
        self.full_name.replace('[', "_").replace(']', "")
    }

    /// The shared field configuration.
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.descriptor
    }

    /// The build context.
    pub const fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Returns `true` for the root of the tree.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns `true` if this node holds children.
    pub fn is_compound(&self) -> bool {
        self.descriptor.is_compound()
    }

    /// Returns `true` for buttons.
    pub fn is_button(&self) -> bool {
        self.descriptor.is_type("button")
    }

    /// Returns `true` if this node's data is read from and written to its
    /// parent's data.
    pub fn is_mapped(&self) -> bool {
        self.descriptor.is_mapped() && !self.is_button()
    }

    // ── Children ─────────────────────────────────────────────────────

    /// The children in insertion order.
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Returns `true` if a direct child named `name` exists.
    pub fn has(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name() == name)
    }

    /// Returns the descendant at a dotted or bracketed path relative to this
    /// node. The empty path returns the node itself.
    pub fn get(&self, path: &str) -> Option<&Self> {
        PropertyPath::new(path)
            .segments()
            .iter()
            .try_fold(self, |node, segment| {
                node.children.iter().find(|c| c.name() == segment.as_str())
            })
    }

    /// Mutable variant of [`get`](Self::get).
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Self> {
        let path = PropertyPath::new(path);
        let mut node = self;
        for segment in path.segments() {
            node = node
                .children
                .iter_mut()
                .find(|c| c.name() == segment.as_str())?;
        }
        Some(node)
    }

    // ── Data ─────────────────────────────────────────────────────────

    /// Sets the model data. Compound forms distribute it to their mapped
    /// children and keep it as the base their own data is gathered into.
    /// On error the form and its children keep their previous data.
    ///
    /// # Errors
    ///
    /// Returns [`FormkitError::InvalidState`] after submission, or
    /// [`FormkitError::Transformation`] if the value cannot be shown.
    pub fn set_data(&mut self, data: Value) -> FormkitResult<()> {
        if self.is_submitted() {
            return Err(FormkitError::InvalidState(format!(
                "cannot set data on \"{}\" after it was submitted",
                self.display_name()
            )));
        }
        if self.is_compound() {
            let mut children = self.children.clone();
            self.mapper.map_data_to_forms(&data, &mut children)?;
            self.children = children;
            self.initial_view = Value::Null;
        } else {
            let view = self
                .descriptor
                .transformers()
                .transform(&data)
                .map_err(|e| e.at_field(&self.path))?;
            self.initial_view = view.clone();
            self.view_data = view;
        }
        self.initial_model = data.clone();
        self.model_data = data;
        Ok(())
    }

    /// The model data. For compound forms this is the data they were given
    /// with every mapped child's data written over it.
    pub fn get_data(&self) -> Value {
        if !self.is_compound() {
            return self.model_data.clone();
        }
        let mut data = match &self.model_data {
            Value::Map(_) => self.model_data.clone(),
            _ => Value::Map(BTreeMap::new()),
        };
        self.mapper.map_forms_to_data(&self.children, &mut data);
        data
    }

    /// The view data: the submitted or transformed value of a leaf, or a
    /// map of the children's view data.
    pub fn get_view_data(&self) -> Value {
        if !self.is_compound() {
            return self.view_data.clone();
        }
        Value::Map(
            self.children
                .iter()
                .filter(|c| !c.is_button())
                .map(|c| (c.name().to_string(), c.get_view_data()))
                .collect(),
        )
    }

    // ── Submission ───────────────────────────────────────────────────

    /// The lifecycle state.
    pub const fn state(&self) -> FormState {
        self.state
    }

    /// Returns `true` once the form was submitted.
    pub fn is_submitted(&self) -> bool {
        self.state == FormState::Submitted
    }

    /// Returns `true` if the submitted value could not be reverse
    /// transformed.
    pub const fn transformation_failed(&self) -> bool {
        self.transformation_failed
    }

    /// Returns `true` for a button that was part of the submission.
    pub const fn is_clicked(&self) -> bool {
        self.clicked
    }

    /// Returns the first clicked button in the tree.
    pub fn clicked_button(&self) -> Option<&Self> {
        if self.clicked {
            return Some(self);
        }
        self.children.iter().find_map(Self::clicked_button)
    }

    /// Submits raw data to the root form. Fields missing from `submitted`
    /// are treated as submitted empty.
    ///
    /// Invalid input is not an error: it is recorded on the tree and
    /// reported by [`is_valid`](Self::is_valid) and
    /// [`get_errors`](Self::get_errors).
    ///
    /// # Errors
    ///
    /// - [`FormkitError::AlreadySubmitted`] on a second call.
    /// - [`FormkitError::InvalidState`] if this is not the root.
    /// - [`FormkitError::Csrf`] if CSRF protection is on and the token is
    ///   missing or invalid. No field is submitted in that case.
    pub fn submit(&mut self, submitted: Value) -> FormkitResult<()> {
        self.submit_with(&submitted, true)
    }

    /// Like [`submit`](Self::submit), but fields missing from `submitted`
    /// keep their current data.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`submit`](Self::submit).
    pub fn submit_partial(&mut self, submitted: Value) -> FormkitResult<()> {
        self.submit_with(&submitted, false)
    }

    fn submit_with(&mut self, submitted: &Value, clear_missing: bool) -> FormkitResult<()> {
        if !self.is_root() {
            return Err(FormkitError::InvalidState(format!(
                "only the root form can be submitted, not \"{}\"",
                self.path
            )));
        }
        if self.is_submitted() {
            return Err(FormkitError::AlreadySubmitted(self.display_name().to_string()));
        }

        let span = form_span(self.display_name());
        let _guard = span.enter();

        if let Err(err) = self.check_csrf(submitted) {
            self.state = FormState::Submitted;
            return Err(err);
        }
        self.submit_node(Some(submitted), clear_missing);
        self.validate();

        let errors = self.get_errors(true);
        tracing::debug!(
            valid = !errors.has_blocking(),
            errors = errors.len(),
            "form submitted"
        );
        Ok(())
    }

    /// The name of the CSRF token field when protection is on.
    pub fn csrf_field_name(&self) -> Option<&str> {
        let enabled = self.is_root()
            && self
                .descriptor
                .option("csrf_protection")
                .and_then(Value::as_bool)
                .unwrap_or(false);
        if !enabled {
            return None;
        }
        self.descriptor.option("csrf_field_name").and_then(Value::as_str)
    }

    /// The id CSRF tokens of this form are bound to: the `csrf_token_id`
    /// option, or the form name.
    pub fn csrf_token_id(&self) -> String {
        self.descriptor
            .option("csrf_token_id")
            .and_then(Value::as_str)
            .unwrap_or_else(|| self.display_name())
            .to_string()
    }

    fn check_csrf(&mut self, submitted: &Value) -> FormkitResult<()> {
        let Some(field) = self.csrf_field_name() else {
            return Ok(());
        };
        let token = submitted.get(field).and_then(Value::as_str).unwrap_or("");
        let token_id = self.csrf_token_id();
        let valid = self
            .context
            .csrf_provider()
            .is_some_and(|provider| provider.is_token_valid(&token_id, token));
        if valid {
            return Ok(());
        }

        tracing::warn!(form = self.display_name(), "rejected submission with an invalid CSRF token");
        self.errors.push(
            FormError::new(CSRF_ERROR_MESSAGE)
                .with_cause("csrf")
                .with_origin(self.path.clone()),
        );
        Err(FormkitError::Csrf(CSRF_ERROR_MESSAGE.to_string()))
    }

    fn submit_node(&mut self, raw: Option<&Value>, clear_missing: bool) {
        self.state = FormState::Submitted;
        if self.is_button() {
            self.clicked = raw.is_some_and(|v| !v.is_null());
            return;
        }
        if self.descriptor.is_disabled() {
            self.mark_submitted();
            return;
        }
        if self.is_compound() {
            self.submit_compound(raw, clear_missing);
        } else {
            self.submit_leaf(raw);
        }
    }

    fn mark_submitted(&mut self) {
        self.state = FormState::Submitted;
        for child in &mut self.children {
            child.mark_submitted();
        }
    }

    fn submit_compound(&mut self, raw: Option<&Value>, clear_missing: bool) {
        let fields = match raw {
            Some(Value::Map(fields)) => Some(fields),
            None | Some(Value::Null) => None,
            Some(other) => {
                let shown = other.to_view_string();
                self.fail_transformation(&shown, "expected a map of field values");
                None
            }
        };

        for child in &mut self.children {
            let value = fields.and_then(|f| f.get(child.name()));
            if value.is_none() && !clear_missing {
                child.mark_submitted();
                continue;
            }
            child.submit_node(value, clear_missing);
        }

        if let Some(fields) = fields {
            self.check_extra_fields(fields);
        }
    }

    fn check_extra_fields(&mut self, fields: &BTreeMap<String, Value>) {
        let allowed = self
            .descriptor
            .option("allow_extra_fields")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if allowed {
            return;
        }
        let extra: Vec<&str> = fields
            .keys()
            .map(String::as_str)
            .filter(|key| !self.has(key))
            .collect();
        if extra.is_empty() {
            return;
        }

        let template = self
            .descriptor
            .option("extra_fields_message")
            .and_then(Value::as_str)
            .unwrap_or(EXTRA_FIELDS_MESSAGE);
        let mut parameters = BTreeMap::new();
        parameters.insert("extra_fields".to_string(), extra.join(", "));
        let error = FormError::from_template(template, parameters)
            .at_path(self.path.clone())
            .with_cause("extra_fields")
            .with_origin(self.path.clone());
        self.errors.push(error);
    }

    fn submit_leaf(&mut self, raw: Option<&Value>) {
        let mut view = raw.cloned().unwrap_or(Value::Null);
        if self.descriptor.trims() {
            if let Value::String(s) = &view {
                let trimmed = s.trim();
                if trimmed.len() != s.len() {
                    view = Value::String(trimmed.to_string());
                }
            }
        }
        if view.is_empty() && !self.descriptor.empty_data().is_null() {
            view = self.descriptor.empty_data().clone();
        }

        match self.descriptor.transformers().reverse_transform(&view) {
            Ok(model) => self.model_data = model,
            Err(err) => {
                self.model_data = Value::Null;
                self.fail_transformation(&view.to_view_string(), &err.to_string());
            }
        }
        self.view_data = view;
    }

    fn fail_transformation(&mut self, value: &str, cause: &str) {
        self.transformation_failed = true;
        let template = self
            .descriptor
            .option("invalid_message")
            .and_then(Value::as_str)
            .unwrap_or(INVALID_MESSAGE);
        let mut parameters = BTreeMap::new();
        parameters.insert("value".to_string(), value.to_string());
        self.errors.push(
            FormError::from_template(template, parameters)
                .at_path(self.path.clone())
                .with_cause(cause)
                .with_origin(self.path.clone()),
        );
        tracing::debug!(field = self.path.as_str(), cause, "transformation failed");
    }

    // ── Validation ───────────────────────────────────────────────────

    fn validation_groups(&self) -> Vec<String> {
        self.descriptor
            .option("validation_groups")
            .and_then(Value::as_list)
            .map(|groups| groups.iter().map(Value::to_view_string).collect())
            .unwrap_or_default()
    }

    fn validate(&mut self) {
        let data = self.get_data();
        let groups = self.validation_groups();
        let group_refs: Vec<&str> = groups.iter().map(String::as_str).collect();
        let selected = (!group_refs.is_empty()).then_some(group_refs.as_slice());
        let now = Utc::now().with_timezone(&self.context.settings().time_zone());

        let mut context = ExecutionContext::new(&data).with_now(now);
        self.collect_violations(&mut context, selected);
        let violations = context.into_violations();

        for violation in violations {
            self.attach(violation);
        }
        self.bubble_errors();
    }

    fn collect_violations(&self, context: &mut ExecutionContext<'_>, groups: Option<&[&str]>) {
        if self.is_button() || self.descriptor.is_disabled() || self.transformation_failed {
            return;
        }
        for child in &self.children {
            child.collect_violations(context, groups);
        }

        context.set_path(self.path.as_str());
        let gathered;
        let value = if self.is_compound() {
            gathered = self.get_data();
            &gathered
        } else {
            &self.model_data
        };
        self.descriptor.rules().validate(value, context, groups);
        for rule in &self.form_rules {
            if groups.map_or(true, |groups| rule.applies_to(groups)) {
                rule.check(value, context);
            }
        }
    }

    /// The path of the deepest existing node at or above `path`.
    fn nearest_node_path(&self, path: &str) -> String {
        let mut candidate = path;
        loop {
            if candidate.is_empty() || self.get(candidate).is_some() {
                return candidate.to_string();
            }
            candidate = candidate.rsplit_once('.').map_or("", |(parent, _)| parent);
        }
    }

    fn attach(&mut self, violation: Violation) {
        let owner = self.nearest_node_path(&violation.path);
        let error = FormError::from(violation).with_origin(owner.clone());
        if let Some(node) = self.get_mut(&owner) {
            node.errors.push(error);
        }
    }

    /// Moves errors of bubbling children into their parents, deepest first.
    fn bubble_errors(&mut self) {
        let mut lifted = Vec::new();
        for child in &mut self.children {
            child.bubble_errors();
            if child.descriptor.error_bubbling() && !child.errors.is_empty() {
                lifted.extend(std::mem::take(&mut child.errors));
            }
        }
        for error in lifted {
            self.errors.push(error.with_origin(self.path.clone()));
        }
    }

    /// Returns `true` if the form was submitted and neither it nor any
    /// descendant holds a blocking error.
    pub fn is_valid(&self) -> bool {
        self.is_submitted() && !self.get_errors(true).has_blocking()
    }

    /// The errors owned by this node.
    pub const fn errors(&self) -> &ErrorList {
        &self.errors
    }

    /// This node's errors, followed by every descendant's when `deep`.
    pub fn get_errors(&self, deep: bool) -> ErrorList {
        let mut all = self.errors.clone();
        if deep {
            for child in &self.children {
                all.extend(child.get_errors(true));
            }
        }
        all
    }

    /// Adds an error to this node. Errors without a path take this node's.
    pub fn add_error(&mut self, mut error: FormError) {
        if error.path.is_none() && !self.is_root() {
            error = error.at_path(self.path.clone());
        }
        if error.origin.is_none() {
            error = error.with_origin(self.path.clone());
        }
        self.errors.push(error);
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Submits the form if `request` carries data for it.
    ///
    /// A named form looks for its name as a key; an unnamed form treats any
    /// non-empty request as its submission. Returns whether the form was
    /// submitted.
    ///
    /// # Errors
    ///
    /// Returns any error [`submit`](Self::submit) returns.
    pub fn handle_request(&mut self, request: &Value) -> FormkitResult<bool> {
        let submitted = if self.name().is_empty() {
            request
                .as_map()
                .filter(|fields| !fields.is_empty())
                .map(|_| request.clone())
        } else {
            request.get(self.name()).cloned()
        };
        match submitted {
            Some(data) => {
                self.submit(data)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Parses an `application/x-www-form-urlencoded` body and handles it
    /// like [`handle_request`](Self::handle_request).
    ///
    /// # Errors
    ///
    /// Returns any error [`submit`](Self::submit) returns.
    pub fn handle_urlencoded(&mut self, body: &str) -> FormkitResult<bool> {
        self.handle_request(&parse_urlencoded(body))
    }

    /// Returns the tree to its pre-submission state with its initial data.
    pub fn reset(&mut self) {
        self.state = FormState::Ready;
        self.errors.clear();
        self.transformation_failed = false;
        self.clicked = false;
        self.model_data = self.initial_model.clone();
        self.view_data = self.initial_view.clone();
        for child in &mut self.children {
            child.reset();
        }
    }

    /// Builds the view tree used for rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if a CSRF token cannot be generated.
    pub fn create_view(&self) -> FormkitResult<FormView> {
        FormView::build(self)
    }
}
