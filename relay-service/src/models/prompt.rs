/// User-submitted text for a single generation request.
///
/// No length or content validation is applied; an empty prompt is forwarded
/// to the provider unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Builds a prompt from an optional form field. An absent field is the
    /// empty prompt, not an error.
    pub fn from_field(field: Option<String>) -> Self {
        Self(field.unwrap_or_default())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}
