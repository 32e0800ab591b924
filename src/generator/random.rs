use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::attempt::{AttemptRecord, RecordTarget};
use crate::contracts::ValidationError;
use crate::generator::spec::AttemptSpec;

/// An endless stream of independently drawn attempts.
///
/// Each position is drawn uniformly from `minimum..maximum` (half-open) and
/// redrawn while it renders to a prohibited character. Construction fails if
/// no value in that range is acceptable, so the redraw loop always terminates.
#[derive(Debug)]
pub struct RandomAttempts<R = StdRng> {
    spec: AttemptSpec,
    rng: R,
    target: Option<RecordTarget>,
    buf: String,
}

impl RandomAttempts<StdRng> {
    /// A stream seeded from the operating system.
    pub(crate) fn new(
        spec: AttemptSpec,
        target: Option<RecordTarget>,
    ) -> Result<Self, ValidationError> {
        Self::with_rng(spec, StdRng::from_entropy(), target)
    }
}

impl<R: Rng> RandomAttempts<R> {
    /// A stream driven by a caller-supplied generator.
    pub fn with_rng(
        spec: AttemptSpec,
        rng: R,
        target: Option<RecordTarget>,
    ) -> Result<Self, ValidationError> {
        check_satisfiable(&spec)?;
        let buf = String::with_capacity(spec.length());
        Ok(Self {
            spec,
            rng,
            target,
            buf,
        })
    }

    fn draw(&mut self) -> char {
        let renderer = self.spec.renderer();
        loop {
            let value = self.rng.gen_range(self.spec.minimum()..self.spec.maximum());
            let c = renderer.render(value);
            if !self.spec.is_prohibited(c) {
                return c;
            }
        }
    }
}

impl<R: Rng> Iterator for RandomAttempts<R> {
    type Item = AttemptRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        for _ in 0..self.spec.length() {
            let c = self.draw();
            self.buf.push(c);
        }
        let value = self.spec.output_format().render(&self.buf);
        Some(AttemptRecord::new(
            value,
            self.spec.prohibited_text().clone(),
            self.target.clone(),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

/// Fails unless some value in `minimum..maximum` renders to an allowed character.
///
/// Stops at the first acceptable value, which is usually `minimum` itself.
fn check_satisfiable(spec: &AttemptSpec) -> Result<(), ValidationError> {
    let renderer = spec.renderer();
    let satisfiable =
        (spec.minimum()..spec.maximum()).any(|v| !spec.is_prohibited(renderer.render(v)));
    if satisfiable {
        Ok(())
    } else {
        Err(ValidationError::UnsatisfiableSampling {
            minimum: spec.minimum(),
            maximum: spec.maximum(),
        })
    }
}
