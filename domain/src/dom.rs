use crate::html::format_html;
use crate::store::KeyedMutexStore;
use crate::template::{to_json_dump, Renderer};
use crate::Data;
use fanout::{Manager, Op, Operation};
use log::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Where handler errors are displayed, and the template used to render them.
pub const ERROR_SELECTOR: &str = "#lv-error";
pub const ERROR_TEMPLATE: &str = "lv-error";

/// Container flash messages are appended to, and their template.
pub const FLASH_SELECTOR: &str = "#lv-flash";
pub const FLASH_TEMPLATE: &str = "lv-flash-message";

/// Keys never persisted from mutation data.
pub const DEFAULT_TEMPORARY_KEYS: &[&str] = &["action", "selector", "target", "targets", "template"];

#[derive(Debug, Clone, Copy, Default)]
pub struct DomOptions {
    /// Pretty-print rendered fragments before sending them.
    pub format_html: bool,
    /// Log every rendered fragment together with its data.
    pub debug_log: bool,
}

/// DOM mutations for one socket session.
///
/// Every mutation broadcasts an operation to the session's topic and then
/// persists its data into the user's store, minus the keys marked temporary.
/// A fresh `Dom` starts with [`DEFAULT_TEMPORARY_KEYS`].
#[derive(Clone)]
pub struct Dom {
    manager: Arc<Manager>,
    topic: Option<String>,
    store: Arc<KeyedMutexStore>,
    renderer: Arc<dyn Renderer>,
    temporary_keys: Vec<String>,
    options: DomOptions,
}

impl Dom {
    pub fn new(
        manager: Arc<Manager>,
        topic: Option<String>,
        store: Arc<KeyedMutexStore>,
        renderer: Arc<dyn Renderer>,
        options: DomOptions,
    ) -> Self {
        Self {
            manager,
            topic,
            store,
            renderer,
            temporary_keys: DEFAULT_TEMPORARY_KEYS.iter().map(|k| k.to_string()).collect(),
            options,
        }
    }

    pub fn store(&self) -> &KeyedMutexStore {
        &self.store
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Mark keys that must not be persisted by later mutations of this session.
    pub fn temporary<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.temporary_keys.extend(keys.into_iter().map(Into::into));
    }

    pub fn set_attributes(&self, selector: &str, data: Data) {
        self.send(Operation::new(
            Op::SetAttributes,
            selector,
            Value::Object(data.clone()),
        ));
        self.persist(data);
    }

    pub fn remove_attributes(&self, selector: &str, names: &[&str]) {
        self.send(Operation::new(Op::RemoveAttributes, selector, names.into()));
    }

    /// Set `data-*` attributes. Keys may be given as `data-foo-bar` or
    /// `foo-bar`; both are sent and stored as `fooBar`.
    pub fn set_dataset(&self, selector: &str, data: Data) {
        let dataset: Data = data
            .into_iter()
            .map(|(key, value)| (dataset_key(&key), value))
            .collect();

        self.send(Operation::new(
            Op::Dataset,
            selector,
            Value::Object(dataset.clone()),
        ));
        self.persist(dataset);
    }

    pub fn toggle_class_list<I, S>(&self, selector: &str, classes: I)
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let class_list: Data = classes
            .into_iter()
            .map(|(class, on)| (class.into(), Value::Bool(on)))
            .collect();

        self.send(Operation::new(
            Op::ClassList,
            selector,
            Value::Object(class_list.clone()),
        ));
        self.persist(class_list);
    }

    pub fn add_class(&self, selector: &str, class: &str) {
        self.send(Operation::new(Op::AddClass, selector, class.into()));
        self.persist(Data::from_iter([(class.to_string(), Value::Bool(true))]));
    }

    pub fn remove_class(&self, selector: &str, class: &str) {
        self.send(Operation::new(Op::RemoveClass, selector, class.into()));
        self.persist(Data::from_iter([(class.to_string(), Value::Bool(false))]));
    }

    pub fn set_value(&self, selector: &str, value: impl Into<Value>) {
        self.send(Operation::new(Op::SetValue, selector, value.into()));
    }

    pub fn set_inner_html(&self, selector: &str, html: impl Into<String>) {
        self.send(Operation::new(
            Op::SetInnerHtml,
            selector,
            Value::String(html.into()),
        ));
    }

    /// Render `template` with `data` and morph the result into `selector`.
    /// A render failure is logged and the operation dropped.
    pub fn morph(&self, selector: &str, template: &str, data: Data) {
        if self.emit_fragment(Op::Morph, selector, template, &data) {
            self.persist(data);
        }
    }

    pub fn append(&self, selector: &str, template: &str, data: Data) {
        self.fragment(Op::Append, selector, template, data);
    }

    pub fn prepend(&self, selector: &str, template: &str, data: Data) {
        self.fragment(Op::Prepend, selector, template, data);
    }

    pub fn replace(&self, selector: &str, template: &str, data: Data) {
        self.fragment(Op::Replace, selector, template, data);
    }

    pub fn before(&self, selector: &str, template: &str, data: Data) {
        self.fragment(Op::Before, selector, template, data);
    }

    pub fn after(&self, selector: &str, template: &str, data: Data) {
        self.fragment(Op::After, selector, template, data);
    }

    /// Render a template and apply it with any fragment operation kind.
    pub fn fragment(&self, op: Op, selector: &str, template: &str, data: Data) {
        if self.emit_fragment(op, selector, template, &data) {
            self.persist(data);
        }
    }

    pub fn remove(&self, selector: &str) {
        self.send(Operation::new(Op::Remove, selector, Value::Null));
    }

    pub fn reload(&self) {
        self.send(Operation::reload());
    }

    /// Append a flash message to [`FLASH_SELECTOR`] and remove it again after
    /// `duration`. The message element is expected to carry `id="{{ flash_id }}"`.
    /// Must be called from within a tokio runtime.
    pub fn flash(&self, duration: Duration, mut data: Data) -> String {
        let flash_id = format!("flash-{}", uuid::Uuid::new_v4().simple());
        data.insert("flash_id".to_string(), Value::String(flash_id.clone()));

        if !self.emit_fragment(Op::Append, FLASH_SELECTOR, FLASH_TEMPLATE, &data) {
            return flash_id;
        }

        let dom = self.clone();
        let selector = format!("#{flash_id}");
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            dom.remove(&selector);
        });
        flash_id
    }

    /// Broadcast a prebuilt operation to this session's topic.
    pub fn send(&self, operation: Operation) {
        match &self.topic {
            Some(topic) => {
                self.manager.send_to_topic(topic, operation);
            }
            None => debug!(
                "Session has no topic, dropping {} operation for {}",
                operation.op, operation.selector
            ),
        }
    }

    /// Show an error banner. The message is not persisted.
    pub fn show_error(&self, user_message: &str) {
        let data = Data::from_iter([(
            "error".to_string(),
            Value::String(user_message.to_string()),
        )]);
        self.emit_fragment(Op::Morph, ERROR_SELECTOR, ERROR_TEMPLATE, &data);
    }

    pub fn clear_error(&self) {
        self.emit_fragment(Op::Morph, ERROR_SELECTOR, ERROR_TEMPLATE, &Data::new());
    }

    // Returns whether an operation was sent.
    fn emit_fragment(&self, op: Op, selector: &str, template: &str, data: &Data) -> bool {
        let html = match self.renderer.render(template, data) {
            Ok(html) => html,
            Err(e) => {
                error!(
                    "Failed rendering template {template}: {e}, with data =>\n{}",
                    to_json_dump(data)
                );
                return false;
            }
        };
        if self.options.debug_log {
            debug!(
                "Rendered template {template} with data =>\n{}",
                to_json_dump(data)
            );
        }

        let html = if self.options.format_html {
            format_html(&html)
        } else {
            html
        };

        self.send(Operation::new(op, selector, Value::String(html)));
        true
    }

    fn persist(&self, mut data: Data) {
        strip_temporary_keys(&mut data, &self.temporary_keys);
        if data.is_empty() {
            return;
        }
        if let Err(e) = self.store.put(data) {
            error!("Failed persisting session data: {e}");
        }
    }
}

/// Drop every key in `keys` from `data`.
pub fn strip_temporary_keys(data: &mut Data, keys: &[String]) {
    for key in keys {
        data.remove(key);
    }
}

/// `data-foo-bar` and `foo-bar` both become `fooBar`.
pub fn dataset_key(attribute: &str) -> String {
    kebab_to_camel_case(attribute.strip_prefix("data-").unwrap_or(attribute))
}

/// Uppercase the character after each `-` and drop the `-`.
pub fn kebab_to_camel_case(kebab: &str) -> String {
    let mut camel = String::with_capacity(kebab.len());
    let mut upper_next = false;
    for c in kebab.chars() {
        if upper_next {
            camel.extend(c.to_uppercase());
            upper_next = false;
        } else if c == '-' {
            upper_next = true;
        } else {
            camel.push(c);
        }
    }
    camel
}
