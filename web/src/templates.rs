//! File discovery and the minijinja-backed [`Renderer`] used by views.
//!
//! Every template is registered under its file stem, so
//! `templates/partials/count.html` renders as `count`. The page template is
//! additionally registered under the layout's content name, which lets the
//! layout pull it in with `{% include "content" %}`.

use domain::error::{Error as DomainError, Result};
use domain::{Data, Renderer};
use log::*;
use minijinja::{AutoEscape, Environment};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_EXTENSIONS: &[&str] = &[".html", ".tmpl"];

/// Expand `path` into the template files it names.
///
/// A file is returned when its extension matches, a directory is walked
/// recursively, and a missing path yields nothing. Results are sorted so
/// later files deterministically win on duplicate stems.
pub fn find(path: impl AsRef<Path>, extensions: &[String]) -> Vec<PathBuf> {
    let path = path.as_ref();
    if path.is_file() {
        return if has_extension(path, extensions) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }
    if !path.is_dir() {
        debug!("Template path {} does not exist, skipping", path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable template entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|file| has_extension(file, extensions))
        .collect();
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(extension))
}

/// The name a template file is registered under.
pub fn template_name(path: &Path) -> Option<String> {
    path.file_stem()?.to_str().map(str::to_string)
}

/// Where a view's templates live on disk.
#[derive(Debug, Clone)]
pub struct TemplateFiles {
    pub layout: PathBuf,
    pub content_name: String,
    /// Page rendered inside the layout. Must be a single file.
    pub content: Option<PathBuf>,
    pub partials: Vec<PathBuf>,
    pub extensions: Vec<String>,
}

impl TemplateFiles {
    fn load(&self) -> Result<Vec<(String, String)>> {
        let mut sources = Vec::new();
        for root in &self.partials {
            for file in find(root, &self.extensions) {
                sources.push(read_template(&file)?);
            }
        }
        if let Some(content) = &self.content {
            let (name, source) = read_template(content)?;
            if name != self.content_name {
                sources.push((name, source.clone()));
            }
            sources.push((self.content_name.clone(), source));
        }
        sources.push(read_template(&self.layout)?);
        Ok(sources)
    }
}

fn read_template(path: &Path) -> Result<(String, String)> {
    let name = template_name(path)
        .ok_or_else(|| DomainError::config(format!("{} is not a template file", path.display())))?;
    let source = std::fs::read_to_string(path)
        .map_err(|e| DomainError::config(format!("reading {}: {e}", path.display())))?;
    Ok((name, source))
}

fn build_environment(sources: Vec<(String, String)>) -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    for (name, source) in sources {
        env.add_template_owned(name, source)
            .map_err(DomainError::config)?;
    }
    Ok(env)
}

/// A compiled template set. Reloading swaps the whole set at once, so a
/// render never sees a half-updated environment.
pub struct Templates {
    files: Option<TemplateFiles>,
    layout_name: String,
    env: RwLock<Environment<'static>>,
}

impl Templates {
    /// Compile every template named by `files`. Fails on the first missing
    /// file or syntax error.
    pub fn from_files(files: TemplateFiles) -> Result<Self> {
        let layout_name = template_name(&files.layout).ok_or_else(|| {
            DomainError::config(format!("{} is not a template file", files.layout.display()))
        })?;
        let env = build_environment(files.load()?)?;
        info!(
            "Compiled templates for layout {} (content: {:?})",
            files.layout.display(),
            files.content
        );
        Ok(Self {
            files: Some(files),
            layout_name,
            env: RwLock::new(env),
        })
    }

    /// Compile in-memory sources. There is nothing to reload from.
    pub fn from_sources<I, N, S>(layout_name: impl Into<String>, sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let sources = sources
            .into_iter()
            .map(|(name, source)| (name.into(), source.into()))
            .collect();
        Ok(Self {
            files: None,
            layout_name: layout_name.into(),
            env: RwLock::new(build_environment(sources)?),
        })
    }

    pub fn layout_name(&self) -> &str {
        &self.layout_name
    }

    pub fn render_layout(&self, data: &Data) -> Result<String> {
        self.render(&self.layout_name, data)
    }
}

impl Renderer for Templates {
    fn render(&self, name: &str, data: &Data) -> Result<String> {
        let env = self.env.read();
        let template = env.get_template(name).map_err(DomainError::render)?;
        template.render(data).map_err(DomainError::render)
    }

    fn reload(&self) -> Result<()> {
        let Some(files) = &self.files else {
            return Ok(());
        };
        let env = build_environment(files.load()?)?;
        *self.env.write() = env;
        trace!("Reloaded templates for layout {}", files.layout.display());
        Ok(())
    }
}
