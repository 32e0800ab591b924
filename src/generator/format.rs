use crate::contracts::ValidationError;

/// Placeholder substituted with the generated string.
pub const PLACEHOLDER: &str = "{fuzzed_string}";

/// An output template split around its single placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputFormat {
    prefix: String,
    suffix: String,
}

impl OutputFormat {
    pub fn parse(template: &str) -> Result<Self, ValidationError> {
        let Some(at) = template.find(PLACEHOLDER) else {
            return Err(ValidationError::MissingPlaceholder(template.to_string()));
        };
        let (prefix, rest) = template.split_at(at);
        let suffix = &rest[PLACEHOLDER.len()..];
        if suffix.contains(PLACEHOLDER) {
            return Err(ValidationError::RepeatedPlaceholder(template.to_string()));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Substitutes `fuzzed` into the template.
    pub fn render(&self, fuzzed: &str) -> String {
        let mut out = String::with_capacity(self.prefix.len() + fuzzed.len() + self.suffix.len());
        out.push_str(&self.prefix);
        out.push_str(fuzzed);
        out.push_str(&self.suffix);
        out
    }

    /// True for the bare `{fuzzed_string}` template.
    pub fn is_identity(&self) -> bool {
        self.prefix.is_empty() && self.suffix.is_empty()
    }
}
