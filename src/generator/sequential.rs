use std::iter::FusedIterator;

use crate::attempt::{AttemptRecord, RecordTarget};
use crate::contracts::ValidationError;
use crate::generator::counter::{Increment, RadixCounter};
use crate::generator::spec::AttemptSpec;

/// Every combination of the spec's range, in odometer order.
///
/// Combinations containing a prohibited character are skipped. The sequence
/// ends when the counter is exhausted and keeps no resumable cursor: a fresh
/// call with the same spec starts over from all-`minimum`.
#[derive(Debug, Clone)]
pub struct SequentialAttempts {
    spec: AttemptSpec,
    counter: RadixCounter,
    started: bool,
    target: Option<RecordTarget>,
    buf: String,
}

impl SequentialAttempts {
    pub(crate) fn new(
        spec: AttemptSpec,
        target: Option<RecordTarget>,
    ) -> Result<Self, ValidationError> {
        let counter = RadixCounter::new(spec.length(), spec.minimum(), spec.maximum())?;
        let buf = String::with_capacity(spec.length());
        Ok(Self {
            spec,
            counter,
            started: false,
            target,
            buf,
        })
    }

    /// Digits of the most recently visited combination.
    pub fn position(&self) -> &[u32] {
        self.counter.digits()
    }

    pub fn is_exhausted(&self) -> bool {
        self.counter.is_exhausted()
    }
}

impl Iterator for SequentialAttempts {
    type Item = AttemptRecord;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.started {
                if self.counter.increment() == Increment::Exhausted {
                    return None;
                }
            } else {
                self.started = true;
            }

            if !self.spec.render_digits(self.counter.digits(), &mut self.buf) {
                continue;
            }

            let value = self.spec.output_format().render(&self.buf);
            return Some(AttemptRecord::new(
                value,
                self.spec.prohibited_text().clone(),
                self.target.clone(),
            ));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.counter.is_exhausted() {
            return (0, Some(0));
        }
        let upper = self
            .counter
            .combinations()
            .and_then(|n| usize::try_from(n).ok());
        (0, upper)
    }
}

impl FusedIterator for SequentialAttempts {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::generator::render::FnRenderer;

    fn chr(v: u32) -> char {
        char::from_u32(v).unwrap()
    }

    fn values(spec: AttemptSpec) -> Vec<String> {
        SequentialAttempts::new(spec, None)
            .unwrap()
            .map(AttemptRecord::into_value)
            .collect()
    }

    #[test]
    fn radix_three_length_two_yields_nine_in_order() {
        let spec = AttemptSpec::builder().length(2).range(0, 2).build().unwrap();
        let got = values(spec);
        let mut expected = Vec::new();
        for a in 0..=2 {
            for b in 0..=2 {
                expected.push([chr(a), chr(b)].iter().collect::<String>());
            }
        }
        assert_eq!(got, expected);
    }

    #[test]
    fn prohibited_middle_value_leaves_four() {
        let spec = AttemptSpec::builder()
            .length(2)
            .range(0, 2)
            .prohibit_chars([chr(1)])
            .build()
            .unwrap();
        let got = values(spec);
        let expected: Vec<String> = [(0, 0), (0, 2), (2, 0), (2, 2)]
            .iter()
            .map(|&(a, b)| [chr(a), chr(b)].iter().collect())
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn prohibited_first_and_last_combinations_are_skipped() {
        let spec = AttemptSpec::builder()
            .length(2)
            .range(65, 66)
            .prohibit(["A"])
            .build()
            .unwrap();
        assert_eq!(values(spec), vec!["BB".to_string()]);
    }

    #[test]
    fn everything_prohibited_yields_nothing() {
        let spec = AttemptSpec::builder()
            .length(3)
            .range(65, 65)
            .prohibit(["A"])
            .build()
            .unwrap();
        assert!(values(spec).is_empty());
    }

    #[test]
    fn output_format_wraps_each_attempt() {
        let spec = AttemptSpec::builder()
            .length(1)
            .range(97, 98)
            .output_format("<{fuzzed_string}>")
            .build()
            .unwrap();
        assert_eq!(values(spec), vec!["<a>", "<b>"]);
    }

    #[test]
    fn template_characters_are_not_checked_against_prohibited() {
        let spec = AttemptSpec::builder()
            .length(1)
            .range(97, 97)
            .prohibit(["<"])
            .output_format("<{fuzzed_string}>")
            .build()
            .unwrap();
        assert_eq!(values(spec), vec!["<a>"]);
    }

    #[test]
    fn custom_renderer_is_used() {
        let spec = AttemptSpec::builder()
            .length(2)
            .range(0, 1)
            .renderer(Arc::new(FnRenderer::new(1, |v| if v == 0 { 'x' } else { 'y' })))
            .build()
            .unwrap();
        assert_eq!(values(spec), vec!["xx", "xy", "yx", "yy"]);
    }

    #[test]
    fn iterator_is_fused_after_exhaustion() {
        let spec = AttemptSpec::builder().length(1).range(0, 0).build().unwrap();
        let mut it = SequentialAttempts::new(spec, None).unwrap();
        assert!(it.next().is_some());
        assert!(it.next().is_none());
        assert!(it.next().is_none());
        assert!(it.is_exhausted());
    }

    #[test]
    fn records_carry_prohibited_text() {
        let spec = AttemptSpec::builder()
            .length(1)
            .range(97, 99)
            .prohibit(["b"])
            .build()
            .unwrap();
        let records: Vec<_> = SequentialAttempts::new(spec, None).unwrap().collect();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.prohibited() == "b"));
    }

    #[test]
    fn abandoning_midway_has_no_side_effects() {
        let spec = AttemptSpec::builder().length(3).range(0, 9).build().unwrap();
        let first: Vec<_> = SequentialAttempts::new(spec.clone(), None)
            .unwrap()
            .take(5)
            .map(AttemptRecord::into_value)
            .collect();
        let again: Vec<_> = SequentialAttempts::new(spec, None)
            .unwrap()
            .take(5)
            .map(AttemptRecord::into_value)
            .collect();
        assert_eq!(first, again);
    }
}
