use crate::describe::MAX_DESCRIPTION_CHARS;

/// Language the vision model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptLanguage {
    #[default]
    PtBr,
    EnUs,
}

impl PromptLanguage {
    /// Resolve the optional `lang` request field. Unknown codes fall back to
    /// the default rather than failing the request.
    pub fn from_code(code: Option<&str>) -> Self {
        match code.map(|c| c.trim().to_ascii_lowercase()) {
            Some(c) if c == "en-us" || c == "en" || c == "en_us" => PromptLanguage::EnUs,
            _ => PromptLanguage::PtBr,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PromptLanguage::PtBr => "pt-BR",
            PromptLanguage::EnUs => "en-US",
        }
    }

    /// Fixed instruction sent alongside the image.
    pub fn instruction(&self) -> String {
        match self {
            PromptLanguage::PtBr => format!(
                "Descreva esta imagem em português do Brasil em no máximo \
                 {MAX_DESCRIPTION_CHARS} caracteres. O texto será usado como atributo alt \
                 e deve ser objetivo e otimizado para SEO. Responda apenas com a descrição."
            ),
            PromptLanguage::EnUs => format!(
                "Describe this image in American English in at most \
                 {MAX_DESCRIPTION_CHARS} characters. The text will be used as an alt \
                 attribute and should be objective and SEO-friendly. Reply with the \
                 description only."
            ),
        }
    }
}
