//! Bonus application stack: Flat → %Inc → More → Clamp.
//!
//! Every actor stat that auras can modify is computed through the same order
//! so that applying and removing modifiers in any sequence gives the same
//! result.

/// A single bonus that can be applied to a stat value.
///
/// - **Flat**: additive, applied first (e.g. +50 armor)
/// - **Increased**: percentages summed together, then multiplied once
/// - **More**: multipliers applied one after another (e.g. 20 = ×1.2, -10 = ×0.9)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bonus {
    Flat(i32),
    Increased(i32),
    More(i32),
}

/// A collection of bonuses applied in a fixed order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BonusStack {
    bonuses: Vec<Bonus>,
}

impl BonusStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bonus: Bonus) {
        self.bonuses.push(bonus);
    }

    pub fn extend(&mut self, bonuses: impl IntoIterator<Item = Bonus>) {
        self.bonuses.extend(bonuses);
    }

    /// Applies all bonuses to `base` and clamps the result.
    ///
    /// ```text
    /// result = clamp((base + flat_sum) × (1 + inc_sum/100) × Π(1 + more/100), min, max)
    /// ```
    pub fn apply(&self, base: i32, min: i32, max: i32) -> i32 {
        let flat_sum: i64 = self
            .bonuses
            .iter()
            .filter_map(|b| match b {
                Bonus::Flat(v) => Some(i64::from(*v)),
                _ => None,
            })
            .sum();

        let inc_sum: i64 = self
            .bonuses
            .iter()
            .filter_map(|b| match b {
                Bonus::Increased(p) => Some(i64::from(*p)),
                _ => None,
            })
            .sum();

        let after_inc = ((i64::from(base) + flat_sum) * (100 + inc_sum)) / 100;

        let after_more = self
            .bonuses
            .iter()
            .filter_map(|b| match b {
                Bonus::More(p) => Some(i64::from(*p)),
                _ => None,
            })
            .fold(after_inc, |acc, more| (acc * (100 + more)) / 100);

        after_more.clamp(i64::from(min), i64::from(max)) as i32
    }

    pub fn apply_unclamped(&self, base: i32) -> i32 {
        self.apply(base, i32::MIN, i32::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.bonuses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bonuses.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_in_layer_order() {
        let mut stack = BonusStack::new();
        stack.add(Bonus::Flat(100));
        stack.add(Bonus::Increased(10));
        stack.add(Bonus::Increased(15));
        stack.add(Bonus::More(20));

        // (400 + 100) × 1.25 × 1.2 = 750
        assert_eq!(stack.apply(400, 0, 10_000), 750);
    }

    #[test]
    fn negative_more_reduces_and_clamps() {
        let mut stack = BonusStack::new();
        stack.add(Bonus::More(-50));
        stack.add(Bonus::Flat(-900));

        // (500 - 900) × 0.5 = -200, clamped to 0
        assert_eq!(stack.apply(500, 0, 1_000), 0);
        assert_eq!(stack.apply_unclamped(500), -200);
    }

    #[test]
    fn empty_stack_is_identity() {
        let stack = BonusStack::new();
        assert!(stack.is_empty());
        assert_eq!(stack.apply_unclamped(42), 42);
    }
}
