use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::contracts::ValidationError;
use crate::generator::format::{OutputFormat, PLACEHOLDER};
use crate::generator::render::{ByteRenderer, CharacterRenderer, RendererKind};

/// A validated generation request.
///
/// Only obtainable through [`AttemptSpec::builder`], so every spec in hand
/// has already passed validation.
#[derive(Clone)]
pub struct AttemptSpec {
    length: usize,
    minimum: u32,
    maximum: u32,
    prohibited: BTreeSet<char>,
    /// Prohibited characters joined in sorted order, as persisted with each attempt.
    prohibited_text: Arc<str>,
    format: OutputFormat,
    renderer: Arc<dyn CharacterRenderer>,
}

impl AttemptSpec {
    pub fn builder() -> AttemptSpecBuilder {
        AttemptSpecBuilder::default()
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    #[inline]
    pub fn maximum(&self) -> u32 {
        self.maximum
    }

    pub fn prohibited(&self) -> &BTreeSet<char> {
        &self.prohibited
    }

    pub fn prohibited_text(&self) -> &Arc<str> {
        &self.prohibited_text
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.format
    }

    pub fn renderer(&self) -> &Arc<dyn CharacterRenderer> {
        &self.renderer
    }

    #[inline]
    pub fn is_prohibited(&self, c: char) -> bool {
        !self.prohibited.is_empty() && self.prohibited.contains(&c)
    }

    /// Renders `digits` into `buf`, replacing its contents.
    /// Returns false as soon as a prohibited character is produced.
    pub(crate) fn render_digits(&self, digits: &[u32], buf: &mut String) -> bool {
        buf.clear();
        for &digit in digits {
            let c = self.renderer.render(digit);
            if self.is_prohibited(c) {
                return false;
            }
            buf.push(c);
        }
        true
    }
}

impl fmt::Debug for AttemptSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptSpec")
            .field("length", &self.length)
            .field("minimum", &self.minimum)
            .field("maximum", &self.maximum)
            .field("prohibited", &self.prohibited)
            .field("format", &self.format)
            .field("renderer", &self.renderer.name())
            .finish()
    }
}

/// Builder for [`AttemptSpec`]. Defaults: five characters over `0..=255`
/// rendered as bytes, nothing prohibited, bare `{fuzzed_string}` template.
pub struct AttemptSpecBuilder {
    length: usize,
    minimum: u32,
    maximum: u32,
    prohibited: Vec<String>,
    output_format: String,
    renderer: Arc<dyn CharacterRenderer>,
}

impl Default for AttemptSpecBuilder {
    fn default() -> Self {
        Self {
            length: 5,
            minimum: 0,
            maximum: 255,
            prohibited: Vec::new(),
            output_format: PLACEHOLDER.to_string(),
            renderer: Arc::new(ByteRenderer),
        }
    }
}

impl AttemptSpecBuilder {
    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn minimum(mut self, minimum: u32) -> Self {
        self.minimum = minimum;
        self
    }

    pub fn maximum(mut self, maximum: u32) -> Self {
        self.maximum = maximum;
        self
    }

    pub fn range(self, minimum: u32, maximum: u32) -> Self {
        self.minimum(minimum).maximum(maximum)
    }

    /// Adds prohibited entries. Each must be exactly one character.
    pub fn prohibit<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prohibited.extend(entries.into_iter().map(Into::into));
        self
    }

    pub fn prohibit_chars<I>(mut self, chars: I) -> Self
    where
        I: IntoIterator<Item = char>,
    {
        self.prohibited.extend(chars.into_iter().map(String::from));
        self
    }

    pub fn output_format(mut self, template: impl Into<String>) -> Self {
        self.output_format = template.into();
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn CharacterRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn renderer_kind(self, kind: RendererKind) -> Self {
        self.renderer(kind.renderer())
    }

    pub fn build(self) -> Result<AttemptSpec, ValidationError> {
        if self.length == 0 {
            return Err(ValidationError::ZeroLength);
        }
        if self.minimum > self.maximum {
            return Err(ValidationError::InvertedRange {
                minimum: self.minimum,
                maximum: self.maximum,
            });
        }
        self.renderer.check_range(self.minimum, self.maximum)?;

        let prohibited = parse_prohibited(&self.prohibited)?;
        let prohibited_text: Arc<str> = prohibited.iter().collect::<String>().into();
        let format = OutputFormat::parse(&self.output_format)?;

        Ok(AttemptSpec {
            length: self.length,
            minimum: self.minimum,
            maximum: self.maximum,
            prohibited,
            prohibited_text,
            format,
            renderer: self.renderer,
        })
    }
}

/// Checks that every entry is exactly one character.
pub fn parse_prohibited<S: AsRef<str>>(entries: &[S]) -> Result<BTreeSet<char>, ValidationError> {
    let mut set = BTreeSet::new();
    for entry in entries {
        let entry = entry.as_ref();
        let mut chars = entry.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                set.insert(c);
            }
            _ => return Err(ValidationError::ProhibitedEntry(entry.to_string())),
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::render::FnRenderer;

    #[test]
    fn defaults_build() {
        let spec = AttemptSpec::builder().build().unwrap();
        assert_eq!(spec.length(), 5);
        assert_eq!(spec.minimum(), 0);
        assert_eq!(spec.maximum(), 255);
        assert!(spec.prohibited().is_empty());
        assert_eq!(&**spec.prohibited_text(), "");
        assert!(spec.output_format().is_identity());
    }

    #[test]
    fn zero_length_fails_fast() {
        let err = AttemptSpec::builder().length(0).build().unwrap_err();
        assert_eq!(err, ValidationError::ZeroLength);
    }

    #[test]
    fn inverted_range_fails_fast() {
        let err = AttemptSpec::builder().range(10, 9).build().unwrap_err();
        assert_eq!(err, ValidationError::InvertedRange { minimum: 10, maximum: 9 });
    }

    #[test]
    fn byte_renderer_caps_maximum() {
        let err = AttemptSpec::builder().maximum(300).build().unwrap_err();
        assert!(matches!(err, ValidationError::RendererRange { maximum: 300, .. }));
    }

    #[test]
    fn custom_renderer_declares_its_own_range() {
        let spec = AttemptSpec::builder()
            .range(0, 1000)
            .renderer(Arc::new(FnRenderer::new(1000, |_| 'x')))
            .build();
        assert!(spec.is_ok());
    }

    #[test]
    fn multi_character_prohibited_entry_fails() {
        let err = AttemptSpec::builder().prohibit(["a", "bc"]).build().unwrap_err();
        assert_eq!(err, ValidationError::ProhibitedEntry("bc".into()));
        let err = AttemptSpec::builder().prohibit([""]).build().unwrap_err();
        assert_eq!(err, ValidationError::ProhibitedEntry(String::new()));
    }

    #[test]
    fn prohibited_text_is_sorted_and_deduplicated() {
        let spec = AttemptSpec::builder()
            .prohibit(["c", "a", "c"])
            .prohibit_chars(['b'])
            .build()
            .unwrap();
        assert_eq!(&**spec.prohibited_text(), "abc");
    }

    #[test]
    fn template_without_placeholder_fails() {
        let err = AttemptSpec::builder().output_format("static").build().unwrap_err();
        assert!(matches!(err, ValidationError::MissingPlaceholder(_)));
    }

    #[test]
    fn render_digits_stops_on_prohibited() {
        let spec = AttemptSpec::builder().prohibit(["B"]).build().unwrap();
        let mut buf = String::new();
        assert!(spec.render_digits(&[65, 67], &mut buf));
        assert_eq!(buf, "AC");
        assert!(!spec.render_digits(&[65, 66], &mut buf));
    }
}
