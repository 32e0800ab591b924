//! Fixed-length string generation over a character range.
//!
//! Two modes share one validated [`AttemptSpec`]:
//! - [`generate_sequential`] walks every combination in odometer order
//! - [`generate_random`] draws each position independently, forever
//!
//! Both are lazy iterators of [`AttemptRecord`]s. Validation happens when the
//! spec is built and when a stream is created, never mid-stream.

mod counter;
mod format;
mod random;
mod render;
mod sequential;
mod spec;

pub use counter::{Increment, RadixCounter};
pub use format::{OutputFormat, PLACEHOLDER};
pub use random::RandomAttempts;
pub use render::{ByteRenderer, CharacterRenderer, FnRenderer, RendererKind, UnicodeRenderer};
pub use sequential::SequentialAttempts;
pub use spec::{parse_prohibited, AttemptSpec, AttemptSpecBuilder};

use crate::attempt::{AttemptRecord, RecordTarget};
use crate::contracts::ValidationError;

/// Every allowed combination of `spec`, as detached records.
pub fn generate_sequential(spec: &AttemptSpec) -> Result<SequentialAttempts, ValidationError> {
    SequentialAttempts::new(spec.clone(), None)
}

/// Endless random attempts for `spec`, as detached records.
pub fn generate_random(spec: &AttemptSpec) -> Result<RandomAttempts, ValidationError> {
    RandomAttempts::new(spec.clone(), None)
}

/// Sequential attempts whose outcome is recorded into `target`.
pub fn sequential_into(
    spec: &AttemptSpec,
    target: RecordTarget,
) -> Result<SequentialAttempts, ValidationError> {
    SequentialAttempts::new(spec.clone(), Some(target))
}

/// Random attempts whose outcome is recorded into `target`.
pub fn random_into(spec: &AttemptSpec, target: RecordTarget) -> Result<RandomAttempts, ValidationError> {
    RandomAttempts::new(spec.clone(), Some(target))
}

/// Either generation mode behind one iterator type.
#[derive(Debug)]
pub enum Attempts {
    Sequential(SequentialAttempts),
    Random(RandomAttempts),
}

impl Iterator for Attempts {
    type Item = AttemptRecord;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Attempts::Sequential(it) => it.next(),
            Attempts::Random(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Attempts::Sequential(it) => it.size_hint(),
            Attempts::Random(it) => it.size_hint(),
        }
    }
}
