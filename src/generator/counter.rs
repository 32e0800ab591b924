use crate::contracts::ValidationError;

/// Result of advancing a [`RadixCounter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    /// The counter moved to the next combination.
    Advanced,
    /// Every combination has been visited. The digits are left at all-`maximum`.
    Exhausted,
}

/// Fixed-width mixed-radix odometer.
///
/// Each digit ranges over `minimum..=maximum`. Position 0 is the most
/// significant digit, the last position the least significant.
///
/// # Invariants
/// - Starts at all-`minimum`
/// - Reports `Exhausted` only after `radix^length - 1` advances
/// - Once exhausted, `increment` keeps returning `Exhausted` without touching the digits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadixCounter {
    digits: Vec<u32>,
    minimum: u32,
    maximum: u32,
    exhausted: bool,
}

impl RadixCounter {
    pub fn new(length: usize, minimum: u32, maximum: u32) -> Result<Self, ValidationError> {
        if length == 0 {
            return Err(ValidationError::ZeroLength);
        }
        if minimum > maximum {
            return Err(ValidationError::InvertedRange { minimum, maximum });
        }
        Ok(Self {
            digits: vec![minimum; length],
            minimum,
            maximum,
            exhausted: false,
        })
    }

    /// Current digits, most significant first.
    #[inline]
    pub fn digits(&self) -> &[u32] {
        &self.digits
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of values each digit takes.
    #[inline]
    pub fn radix(&self) -> u64 {
        u64::from(self.maximum - self.minimum) + 1
    }

    /// Total number of combinations, or `None` if it does not fit in a `u128`.
    pub fn combinations(&self) -> Option<u128> {
        let radix = u128::from(self.radix());
        let mut total: u128 = 1;
        for _ in 0..self.digits.len() {
            total = total.checked_mul(radix)?;
        }
        Some(total)
    }

    /// Advances to the next combination.
    ///
    /// Walks from the least significant digit toward the most significant one
    /// while a carry is pending. Digits at `maximum` wrap to `minimum`; the
    /// first digit below `maximum` absorbs the carry. A carry out of the most
    /// significant digit marks the counter exhausted, leaving every digit at
    /// `maximum`.
    pub fn increment(&mut self) -> Increment {
        if self.exhausted {
            return Increment::Exhausted;
        }

        // All-maximum means the carry would leave the counter. Checked before
        // wrapping anything so the terminal snapshot stays intact.
        if self.digits.iter().all(|&d| d == self.maximum) {
            self.exhausted = true;
            return Increment::Exhausted;
        }

        let mut carry = true;
        for digit in self.digits.iter_mut().rev() {
            if !carry {
                break;
            }
            if *digit < self.maximum {
                *digit += 1;
                carry = false;
            } else {
                *digit = self.minimum;
            }
        }
        debug_assert!(!carry, "carry escaped a counter that was not at all-maximum");

        Increment::Advanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_length_is_rejected() {
        assert_eq!(RadixCounter::new(0, 0, 1), Err(ValidationError::ZeroLength));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            RadixCounter::new(2, 5, 4),
            Err(ValidationError::InvertedRange { minimum: 5, maximum: 4 })
        ));
    }

    #[test]
    fn odometer_order_with_carry() {
        let mut c = RadixCounter::new(2, 0, 2).unwrap();
        let mut seen = vec![c.digits().to_vec()];
        while c.increment() == Increment::Advanced {
            seen.push(c.digits().to_vec());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
                vec![2, 0],
                vec![2, 1],
                vec![2, 2],
            ]
        );
    }

    #[test]
    fn terminal_state_is_all_maximum() {
        let mut c = RadixCounter::new(3, 1, 2).unwrap();
        while c.increment() == Increment::Advanced {}
        assert!(c.is_exhausted());
        assert_eq!(c.digits(), &[2, 2, 2]);
    }

    #[test]
    fn exhausted_counter_stays_exhausted() {
        let mut c = RadixCounter::new(1, 0, 0).unwrap();
        assert_eq!(c.increment(), Increment::Exhausted);
        assert_eq!(c.increment(), Increment::Exhausted);
        assert_eq!(c.digits(), &[0]);
    }

    #[test]
    fn single_value_range_has_one_combination() {
        let mut c = RadixCounter::new(4, 7, 7).unwrap();
        assert_eq!(c.combinations(), Some(1));
        assert!(!c.is_exhausted());
        assert_eq!(c.increment(), Increment::Exhausted);
    }

    #[test]
    fn advances_exactly_radix_pow_length_minus_one_times() {
        let mut c = RadixCounter::new(3, 10, 13).unwrap();
        let mut advances = 0u64;
        while c.increment() == Increment::Advanced {
            assert!(!c.is_exhausted());
            advances += 1;
        }
        assert_eq!(advances, 4u64.pow(3) - 1);
    }

    #[test]
    fn long_counters_do_not_recurse() {
        let mut c = RadixCounter::new(100_000, 0, 1).unwrap();
        assert_eq!(c.increment(), Increment::Advanced);
        assert_eq!(c.digits()[99_999], 1);
        assert_eq!(c.increment(), Increment::Advanced);
        assert_eq!(c.digits()[99_998], 1);
        assert_eq!(c.digits()[99_999], 0);
        assert_eq!(c.combinations(), None);
    }
}
