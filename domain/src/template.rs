use crate::error::Result;
use crate::Data;

/// Executes a named template against a data map.
///
/// Implementations own template discovery and compilation; the domain layer
/// only asks for rendered HTML.
pub trait Renderer: Send + Sync {
    fn render(&self, name: &str, data: &Data) -> Result<String>;

    /// Re-read template sources. Called before each render when the template
    /// cache is disabled.
    fn reload(&self) -> Result<()> {
        Ok(())
    }
}

/// Indented JSON for log lines; falls back to the serializer's error text.
pub fn to_json_dump(data: &Data) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| e.to_string())
}
