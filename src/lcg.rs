// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A tiny seeded pseudo-random number generator.
//!
//! Every parameter of a rendered fractal is drawn from this stream, so
//! the stream itself is part of the wire contract: two machines given
//! the same seed must draw the same sequence, forever.  That rules out
//! anything platform-dependent.  What's left is the classic 32-bit
//! linear congruential generator with the Numerical Recipes constants,
//! advanced with explicit wraparound arithmetic so debug builds behave
//! like release builds.
//!
//! This is not a statistically serious generator and does not need to
//! be; it only has to scatter a handful of view parameters across
//! their ranges, identically everywhere.

const MULTIPLIER: u32 = 1_664_525;
const INCREMENT: u32 = 1_013_904_223;

/// A deterministic stream of floats in `[0, 1]`, fully determined by a
/// 32-bit seed.
#[derive(Copy, Clone, Debug)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Constructor.  The seed is the complete identity of the stream.
    pub fn new(seed: u32) -> Lcg {
        Lcg { state: seed }
    }

    /// Advances the state one step and returns it scaled into the unit
    /// interval.  The divisor is `2^32 - 1`, so the largest possible
    /// state maps to exactly 1.0.
    pub fn next(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        f64::from(self.state) / f64::from(u32::max_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = Lcg::new(99);
        let mut b = Lcg::new(99);
        for _ in 0..1000 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn known_sequence_for_seed_42() {
        // Pinned against an independent implementation of the same
        // recurrence.  Any change to the constants, the wraparound, or
        // the divisor shows up here first.
        let mut rng = Lcg::new(42);
        let expected = [
            0.25234517484259444,
            0.08812504543180695,
            0.5772811983659121,
            0.22255426603894546,
            0.37566019719831184,
            0.025663904851689914,
        ];
        for &want in expected.iter() {
            assert_eq!(rng.next(), want);
        }
    }

    #[test]
    fn draws_stay_in_unit_interval() {
        let mut rng = Lcg::new(0xDEAD_BEEF);
        for _ in 0..10_000 {
            let r = rng.next();
            assert!(r >= 0.0 && r <= 1.0);
        }
    }

    #[test]
    fn extreme_seeds_do_not_overflow() {
        let mut hi = Lcg::new(u32::max_value());
        let mut lo = Lcg::new(0);
        for _ in 0..100 {
            hi.next();
            lo.next();
        }
    }
}
