use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::contracts::ValidationError;

/// Maps a counter digit to the character placed in an attempt.
///
/// Implementations declare the largest value they can render; generation
/// refuses ranges outside it before producing anything.
pub trait CharacterRenderer: Send + Sync {
    /// Short name used in error messages.
    fn name(&self) -> &'static str;

    /// Largest value accepted by [`render`](Self::render).
    fn limit(&self) -> u32;

    /// Checks that every value in `minimum..=maximum` renders.
    ///
    /// The default only bounds `maximum`; renderers with gaps override it.
    fn check_range(&self, _minimum: u32, maximum: u32) -> Result<(), ValidationError> {
        if maximum > self.limit() {
            return Err(ValidationError::RendererRange {
                renderer: self.name(),
                maximum,
                limit: self.limit(),
            });
        }
        Ok(())
    }

    /// Renders a value that passed [`check_range`](Self::check_range).
    fn render(&self, value: u32) -> char;
}

/// One character per byte value, `0..=255` to U+0000..=U+00FF.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteRenderer;

impl CharacterRenderer for ByteRenderer {
    fn name(&self) -> &'static str {
        "byte"
    }

    fn limit(&self) -> u32 {
        u32::from(u8::MAX)
    }

    #[inline]
    fn render(&self, value: u32) -> char {
        char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

/// Unicode scalar values. Ranges touching the surrogate block are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeRenderer;

const SURROGATES: std::ops::RangeInclusive<u32> = 0xD800..=0xDFFF;

impl CharacterRenderer for UnicodeRenderer {
    fn name(&self) -> &'static str {
        "unicode"
    }

    fn limit(&self) -> u32 {
        char::MAX as u32
    }

    fn check_range(&self, minimum: u32, maximum: u32) -> Result<(), ValidationError> {
        if maximum > self.limit() {
            return Err(ValidationError::RendererRange {
                renderer: self.name(),
                maximum,
                limit: self.limit(),
            });
        }
        if minimum <= *SURROGATES.end() && maximum >= *SURROGATES.start() {
            return Err(ValidationError::UnrenderableRange {
                renderer: self.name(),
                minimum,
                maximum,
            });
        }
        Ok(())
    }

    #[inline]
    fn render(&self, value: u32) -> char {
        char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

/// Wraps a caller-supplied mapping with an explicit limit.
pub struct FnRenderer<F> {
    limit: u32,
    f: F,
}

impl<F> FnRenderer<F>
where
    F: Fn(u32) -> char + Send + Sync,
{
    pub fn new(limit: u32, f: F) -> Self {
        Self { limit, f }
    }
}

impl<F> CharacterRenderer for FnRenderer<F>
where
    F: Fn(u32) -> char + Send + Sync,
{
    fn name(&self) -> &'static str {
        "custom"
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    #[inline]
    fn render(&self, value: u32) -> char {
        (self.f)(value)
    }
}

impl<F> fmt::Debug for FnRenderer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRenderer").field("limit", &self.limit).finish()
    }
}

/// Renderers selectable from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    #[default]
    Byte,
    Unicode,
}

impl RendererKind {
    pub fn renderer(self) -> Arc<dyn CharacterRenderer> {
        match self {
            RendererKind::Byte => Arc::new(ByteRenderer),
            RendererKind::Unicode => Arc::new(UnicodeRenderer),
        }
    }
}

impl FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "byte" | "chr" => Ok(RendererKind::Byte),
            "unicode" => Ok(RendererKind::Unicode),
            other => Err(format!("unknown renderer `{}` (expected byte or unicode)", other)),
        }
    }
}
