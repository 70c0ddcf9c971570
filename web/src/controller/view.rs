use crate::controller::ControllerOptions;
use crate::templates::{TemplateFiles, Templates};
use async_trait::async_trait;
use axum::http::{request::Parts, StatusCode};
use domain::template::to_json_dump;
use domain::{Data, EventHandler, Renderer, Result};
use log::*;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Body written when a page fails to render and no error page is configured.
pub const GENERIC_ERROR_BODY: &str = "something went wrong";

/// Produces the status and initial data for a page before it is rendered.
///
/// Closures `Fn(&Parts) -> (StatusCode, Data)` implement this trait.
#[async_trait]
pub trait OnMount: Send + Sync {
    async fn on_mount(&self, parts: &Parts) -> (StatusCode, Data);
}

#[async_trait]
impl<F> OnMount for F
where
    F: Fn(&Parts) -> (StatusCode, Data) + Send + Sync,
{
    async fn on_mount(&self, parts: &Parts) -> (StatusCode, Data) {
        self(parts)
    }
}

enum PageSource {
    File(PathBuf),
    Compiled(Templates),
}

/// Builder for one live page: its templates, mount callback and event handlers.
///
/// Anything left unset falls back to the controller's options.
pub struct View {
    page: PageSource,
    layout: Option<PathBuf>,
    layout_content_name: Option<String>,
    partials: Option<Vec<PathBuf>>,
    extensions: Option<Vec<String>>,
    error_page: Option<PageSource>,
    on_mount: Option<Arc<dyn OnMount>>,
    handlers: HashMap<String, Arc<dyn EventHandler>>,
    catch_all: Option<Arc<dyn EventHandler>>,
}

impl View {
    /// A view whose page template is read from `page`.
    pub fn new(page: impl Into<PathBuf>) -> Self {
        Self::with_source(PageSource::File(page.into()))
    }

    /// A view over an already compiled template set.
    pub fn from_templates(templates: Templates) -> Self {
        Self::with_source(PageSource::Compiled(templates))
    }

    fn with_source(page: PageSource) -> Self {
        Self {
            page,
            layout: None,
            layout_content_name: None,
            partials: None,
            extensions: None,
            error_page: None,
            on_mount: None,
            handlers: HashMap::new(),
            catch_all: None,
        }
    }

    pub fn layout(mut self, layout: impl Into<PathBuf>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn layout_content_name(mut self, name: impl Into<String>) -> Self {
        self.layout_content_name = Some(name.into());
        self
    }

    pub fn partials<I, P>(mut self, partials: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.partials = Some(partials.into_iter().map(Into::into).collect());
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Page rendered inside the layout when mounting fails or returns an
    /// error status. Gets `status` and `reason` on top of the mount data.
    pub fn error_page(mut self, page: impl Into<PathBuf>) -> Self {
        self.error_page = Some(PageSource::File(page.into()));
        self
    }

    pub fn error_templates(mut self, templates: Templates) -> Self {
        self.error_page = Some(PageSource::Compiled(templates));
        self
    }

    pub fn on_mount(mut self, on_mount: impl OnMount + 'static) -> Self {
        self.on_mount = Some(Arc::new(on_mount));
        self
    }

    /// Handle events with this `id`.
    pub fn handler(mut self, id: impl Into<String>, handler: impl EventHandler + 'static) -> Self {
        self.handlers.insert(id.into(), Arc::new(handler));
        self
    }

    /// Handle every event without a handler of its own.
    pub fn catch_all(mut self, handler: impl EventHandler + 'static) -> Self {
        self.catch_all = Some(Arc::new(handler));
        self
    }

    pub(crate) fn compile(self, options: &ControllerOptions) -> Result<LiveView> {
        let files = |content: PathBuf| TemplateFiles {
            layout: self.layout.clone().unwrap_or_else(|| options.layout.clone()),
            content_name: self
                .layout_content_name
                .clone()
                .unwrap_or_else(|| options.layout_content_name.clone()),
            content: Some(content),
            partials: self
                .partials
                .clone()
                .unwrap_or_else(|| options.partials.clone()),
            extensions: self
                .extensions
                .clone()
                .unwrap_or_else(|| options.extensions.clone()),
        };

        let templates = match self.page {
            PageSource::File(page) => Templates::from_files(files(page))?,
            PageSource::Compiled(templates) => templates,
        };
        let error_templates = match self.error_page {
            Some(PageSource::File(page)) => Some(Arc::new(Templates::from_files(files(page))?)),
            Some(PageSource::Compiled(templates)) => Some(Arc::new(templates)),
            None => None,
        };

        Ok(LiveView {
            templates: Arc::new(templates),
            error_templates,
            on_mount: self.on_mount,
            handlers: self.handlers,
            catch_all: self.catch_all,
        })
    }
}

/// The outcome of a mount: what to answer with, and the data to seed the
/// user's store with once the socket connects.
pub(crate) struct Mounted {
    pub status: StatusCode,
    pub body: String,
    /// Present only when the page itself rendered.
    pub data: Option<Data>,
}

/// A view with its templates compiled, shared by every request to its route.
pub(crate) struct LiveView {
    pub(crate) templates: Arc<Templates>,
    error_templates: Option<Arc<Templates>>,
    on_mount: Option<Arc<dyn OnMount>>,
    handlers: HashMap<String, Arc<dyn EventHandler>>,
    catch_all: Option<Arc<dyn EventHandler>>,
}

impl LiveView {
    /// The handler registered for `id`, or the catch-all.
    pub(crate) fn handler_for(&self, id: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(id).or(self.catch_all.as_ref())
    }

    pub(crate) fn reload_templates(&self) {
        if let Err(e) = self.templates.reload() {
            error!("Failed reloading templates: {e}");
        }
        if let Some(error_templates) = &self.error_templates {
            if let Err(e) = error_templates.reload() {
                error!("Failed reloading error templates: {e}");
            }
        }
    }

    pub(crate) async fn mount(&self, parts: &Parts, app_name: &str, reload: bool) -> Mounted {
        let (status, mut data) = match &self.on_mount {
            Some(on_mount) => on_mount.on_mount(parts).await,
            None => (StatusCode::OK, Data::new()),
        };
        data.insert("app_name".to_string(), Value::String(app_name.to_string()));

        if reload {
            self.reload_templates();
        }

        if status.as_u16() > 299 {
            let body = self
                .render_error_page(status, &data)
                .unwrap_or_else(|| builtin_error_page(status));
            return Mounted {
                status,
                body,
                data: None,
            };
        }

        match self.templates.render_layout(&data) {
            Ok(body) => Mounted {
                status,
                body,
                data: Some(data),
            },
            Err(e) => {
                error!(
                    "Failed rendering page {} for {}: {e}, with data =>\n{}",
                    self.templates.layout_name(),
                    parts.uri.path(),
                    to_json_dump(&data)
                );
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = self
                    .render_error_page(status, &data)
                    .unwrap_or_else(|| GENERIC_ERROR_BODY.to_string());
                Mounted {
                    status,
                    body,
                    data: None,
                }
            }
        }
    }

    fn render_error_page(&self, status: StatusCode, data: &Data) -> Option<String> {
        let error_templates = self.error_templates.as_ref()?;
        let mut data = data.clone();
        data.insert("status".to_string(), Value::from(status.as_u16()));
        data.insert(
            "reason".to_string(),
            Value::from(status.canonical_reason().unwrap_or_default()),
        );
        match error_templates.render_layout(&data) {
            Ok(html) => Some(html),
            Err(e) => {
                error!(
                    "Failed rendering error page: {e}, with data =>\n{}",
                    to_json_dump(&data)
                );
                None
            }
        }
    }
}

fn builtin_error_page(status: StatusCode) -> String {
    format!(
        "<div id=\"lv-error-page\">\n  <h1>{}</h1>\n  <p>{}</p>\n  <p><a href=\"javascript:history.back()\">back</a> | <a href=\"/\">home</a></p>\n</div>",
        status.as_u16(),
        status.canonical_reason().unwrap_or("error")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use domain::Context;

    fn parts(path: &str) -> Parts {
        Request::builder()
            .uri(path)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn page(source: &str) -> Templates {
        Templates::from_sources("index", [("index", source)]).unwrap()
    }

    fn compile(view: View) -> LiveView {
        view.compile(&ControllerOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn mount_renders_layout_with_mount_data_and_app_name() {
        let view = compile(
            View::from_templates(page("{{ app_name }}:{{ count }}"))
                .on_mount(|_: &Parts| (StatusCode::OK, domain::data!({"count": 4}))),
        );

        let mounted = view.mount(&parts("/"), "shop", false).await;

        assert_eq!(mounted.status, StatusCode::OK);
        assert_eq!(mounted.body, "shop:4");
        let data = mounted.data.unwrap();
        assert_eq!(data["count"], 4);
        assert_eq!(data["app_name"], "shop");
    }

    #[tokio::test]
    async fn error_status_uses_builtin_page_without_error_view() {
        let view = compile(
            View::from_templates(page("never"))
                .on_mount(|_: &Parts| (StatusCode::NOT_FOUND, Data::new())),
        );

        let mounted = view.mount(&parts("/missing"), "shop", false).await;

        assert_eq!(mounted.status, StatusCode::NOT_FOUND);
        assert!(mounted.body.contains("404"));
        assert!(mounted.body.contains("back"));
        assert!(mounted.body.contains("href=\"/\""));
        assert!(mounted.data.is_none());
    }

    #[tokio::test]
    async fn error_status_uses_error_view_when_configured() {
        let view = compile(
            View::from_templates(page("never"))
                .error_templates(page("oops {{ status }} {{ reason }}"))
                .on_mount(|_: &Parts| (StatusCode::FORBIDDEN, Data::new())),
        );

        let mounted = view.mount(&parts("/"), "shop", false).await;

        assert_eq!(mounted.body, "oops 403 Forbidden");
    }

    #[tokio::test]
    async fn render_failure_falls_back_to_generic_body() {
        let templates =
            Templates::from_sources("index", [("index", "{% include \"missing\" %}")]).unwrap();
        let view = compile(View::from_templates(templates));

        let mounted = view.mount(&parts("/"), "shop", false).await;

        assert_eq!(mounted.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(mounted.body, GENERIC_ERROR_BODY);
        assert!(mounted.data.is_none());
    }

    #[test]
    fn registered_handlers_win_over_catch_all() {
        let view = compile(
            View::from_templates(page(""))
                .handler("save", |_: &mut Context| -> Result<()> { Ok(()) })
                .catch_all(|_: &mut Context| -> Result<()> { Ok(()) }),
        );

        let save = view.handler_for("save").unwrap();
        let other = view.handler_for("other").unwrap();
        assert!(!Arc::ptr_eq(save, other));
    }

    #[test]
    fn unknown_events_have_no_handler_without_catch_all() {
        let view = compile(
            View::from_templates(page(""))
                .handler("save", |_: &mut Context| -> Result<()> { Ok(()) }),
        );
        assert!(view.handler_for("delete").is_none());
    }
}
