use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::info;

pub const CONTEXT_SEPARATOR: &str = "\n\nRelevant Context:\n";

const VERIFICATION_PLACEHOLDER: &str = "{verification_steps}";
const RESOLUTION_PLACEHOLDER: &str = "{resolution_steps}";

#[derive(Debug)]
pub enum PromptError {
    MissingField(String),
    InvalidField(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::MissingField(key) => write!(f, "Prompt field '{}' is missing or empty", key),
            PromptError::InvalidField(msg) => write!(f, "Invalid prompt configuration: {}", msg),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// Persona and interaction policy sent as the system prompt.
///
/// `system_template` may reference `{verification_steps}` and `{resolution_steps}`;
/// each placeholder is replaced by its list, rendered once when the file is loaded.
#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub system_template: String,
    #[serde(default)]
    pub verification_steps: Vec<String>,
    #[serde(default)]
    pub resolution_steps: Vec<String>,
    #[serde(skip)]
    base_prompt: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl PromptConfig {
    pub fn from_json(json: &str) -> Result<Self, PromptError> {
        let mut config: PromptConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.base_prompt = config.render();
        Ok(config)
    }

    fn validate(&self) -> Result<(), PromptError> {
        if self.system_template.trim().is_empty() {
            return Err(PromptError::MissingField("system_template".to_string()));
        }
        for (placeholder, field, steps) in [
            (VERIFICATION_PLACEHOLDER, "verification_steps", &self.verification_steps),
            (RESOLUTION_PLACEHOLDER, "resolution_steps", &self.resolution_steps),
        ] {
            if self.system_template.contains(placeholder) && steps.is_empty() {
                return Err(PromptError::MissingField(field.to_string()));
            }
            if let Some(pos) = steps.iter().position(|s| s.trim().is_empty()) {
                return Err(PromptError::InvalidField(format!("{}[{}] is blank", field, pos)));
            }
        }
        Ok(())
    }

    fn render(&self) -> String {
        let verification = self.verification_steps
            .iter()
            .enumerate()
            .map(|(i, step)| format!("  {}. {}", i + 1, step))
            .collect::<Vec<_>>()
            .join("\n");
        let resolution = self.resolution_steps
            .iter()
            .map(|step| format!("- {}", step))
            .collect::<Vec<_>>()
            .join("\n");

        self.system_template
            .replace(VERIFICATION_PLACEHOLDER, &verification)
            .replace(RESOLUTION_PLACEHOLDER, &resolution)
    }

    /// The rendered persona/policy text, without any retrieved context.
    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let path = path.as_ref();
    // Taken before the read so an edit racing the read is seen as a change next time.
    let modified = fs::metadata(path)?.modified().ok();
    let file_content = fs::read_to_string(path)?;
    let mut config = PromptConfig::from_json(&file_content)?;
    config.last_loaded = modified;
    info!(
        "Loaded prompt configuration from {} ({} verification steps, {} resolution steps)",
        path.display(),
        config.verification_steps.len(),
        config.resolution_steps.len()
    );
    Ok(Arc::new(config))
}

/// Reloads when the file's modification time differs from the one recorded at load.
pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = fs::metadata(&path)?;

    if let Ok(modified) = metadata.modified() {
        if current_config.last_loaded != Some(modified) {
            info!("Prompts file changed, reloading...");
            return load_prompts(path).map(Some);
        }
    }
    Ok(None)
}

/// Appends retrieved context to the base prompt; empty context leaves it untouched.
pub fn compose(base_prompt: &str, context: &str) -> String {
    if context.is_empty() {
        return base_prompt.to_string();
    }
    let mut prompt = String::with_capacity(base_prompt.len() + CONTEXT_SEPARATOR.len() + context.len());
    prompt.push_str(base_prompt);
    prompt.push_str(CONTEXT_SEPARATOR);
    prompt.push_str(context);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const SAMPLE: &str = r#"{
        "system_template": "You are Sarah.\nAsk for:\n{verification_steps}\nThen:\n{resolution_steps}",
        "verification_steps": ["Last name", "Payment date"],
        "resolution_steps": ["Offer payment options"]
    }"#;

    #[test]
    fn renders_steps_into_template() {
        let config = PromptConfig::from_json(SAMPLE).unwrap();
        assert_eq!(
            config.base_prompt(),
            "You are Sarah.\nAsk for:\n  1. Last name\n  2. Payment date\nThen:\n- Offer payment options"
        );
    }

    #[test]
    fn compose_without_context_returns_base_prompt() {
        let composed = compose("Base policy", "");
        assert_eq!(composed, "Base policy");
        assert!(!composed.contains("Relevant Context"));
    }

    #[test]
    fn compose_appends_context_after_separator() {
        assert_eq!(
            compose("Base policy", "Rent is due on the 1st."),
            "Base policy\n\nRelevant Context:\nRent is due on the 1st."
        );
    }

    #[test]
    fn rejects_blank_template() {
        let err = PromptConfig::from_json(r#"{"system_template": "   "}"#).unwrap_err();
        assert!(matches!(err, PromptError::MissingField(ref f) if f == "system_template"));
    }

    #[test]
    fn rejects_placeholder_without_steps() {
        let err = PromptConfig::from_json(
            r#"{"system_template": "Verify:\n{verification_steps}"}"#
        ).unwrap_err();
        assert!(matches!(err, PromptError::MissingField(ref f) if f == "verification_steps"));
    }

    #[test]
    fn rejects_blank_step() {
        let err = PromptConfig::from_json(
            r#"{"system_template": "x", "resolution_steps": ["ok", " "]}"#
        ).unwrap_err();
        assert!(matches!(err, PromptError::InvalidField(_)));
    }

    #[test]
    fn template_without_placeholders_is_used_verbatim() {
        let config = PromptConfig::from_json(r#"{"system_template": "Be brief."}"#).unwrap();
        assert_eq!(config.base_prompt(), "Be brief.");
    }

    #[test]
    fn reload_only_when_file_changed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let loaded = load_prompts(file.path()).unwrap();
        assert!(reload_prompts_if_changed(file.path(), &loaded).unwrap().is_none());

        let mut never_loaded = (*loaded).clone();
        never_loaded.last_loaded = None;
        let reloaded = reload_prompts_if_changed(file.path(), &Arc::new(never_loaded)).unwrap();
        assert!(reloaded.is_some());
    }

    #[test]
    fn file_dated_in_the_future_is_not_reloaded_repeatedly() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let ahead = SystemTime::now() + Duration::from_secs(60);
        file.as_file().set_modified(ahead).unwrap();

        let loaded = load_prompts(file.path()).unwrap();
        for _ in 0..3 {
            assert!(reload_prompts_if_changed(file.path(), &loaded).unwrap().is_none());
        }

        file.as_file().set_modified(ahead + Duration::from_secs(1)).unwrap();
        assert!(reload_prompts_if_changed(file.path(), &loaded).unwrap().is_some());
    }

    #[test]
    fn shipped_prompt_configuration_is_valid() {
        let config = load_prompts(concat!(env!("CARGO_MANIFEST_DIR"), "/config/prompts.json")).unwrap();
        assert!(config.base_prompt().contains("  1. Last name"));
        assert!(!config.base_prompt().contains("{verification_steps}"));
    }
}
