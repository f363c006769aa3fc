use async_trait::async_trait;

use crate::language::PromptLanguage;

/// Placeholder replaced by the generated description.
pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";

/// Template used when the caller does not send one.
pub const DEFAULT_TEMPLATE: &str = DESCRIPTION_PLACEHOLDER;

/// Longest description we ask the model for, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 120;

/// An image that has already been decoded, bounded and re-encoded.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Vision-capable completion backend.
///
/// Production wires an OpenAI-compatible client; tests inject fakes. Any
/// failure (timeout, bad status, empty choice list) is returned as an error
/// and never replaced with fallback text. Surrounding whitespace in the
/// returned text is trimmed by the caller.
#[async_trait]
pub trait DescriptionModel: Send + Sync + 'static {
    async fn describe(
        &self,
        image: &PreparedImage,
        language: PromptLanguage,
    ) -> anyhow::Result<String>;
}

/// Substitute `description` into every `{description}` placeholder.
///
/// A blank template is treated as the default one.
pub fn render_template(template: Option<&str>, description: &str) -> String {
    let template = match template {
        Some(t) if !t.trim().is_empty() => t,
        _ => DEFAULT_TEMPLATE,
    };
    template.replace(DESCRIPTION_PLACEHOLDER, description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_is_description_only() {
        assert_eq!(render_template(None, "a red bike"), "a red bike");
        assert_eq!(render_template(Some("  "), "a red bike"), "a red bike");
    }

    #[test]
    fn placeholder_is_substituted_everywhere() {
        assert_eq!(
            render_template(Some("Foto: {description} | {description}"), "praia"),
            "Foto: praia | praia"
        );
    }

    #[test]
    fn template_without_placeholder_is_returned_verbatim() {
        assert_eq!(render_template(Some("Logo"), "ignored"), "Logo");
    }
}
