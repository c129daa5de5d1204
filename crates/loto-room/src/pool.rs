//! The 1–90 number universe and one game's drawn/undrawn split.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::RoomError;

/// Lowest number that can be drawn.
pub const MIN_NUMBER: u8 = 1;
/// Highest number that can be drawn.
pub const MAX_NUMBER: u8 = 90;

/// Tracks which numbers have been drawn in the current game.
///
/// The drawn sequence is append-only. A draw always picks from the undrawn
/// complement, so a number can never come out twice.
#[derive(Debug, Clone)]
pub struct NumberPool {
    sequence: Vec<u8>,
    drawn: [bool; MAX_NUMBER as usize + 1],
}

impl NumberPool {
    /// A fresh pool with nothing drawn.
    pub fn new() -> Self {
        Self {
            sequence: Vec::with_capacity(MAX_NUMBER as usize),
            drawn: [false; MAX_NUMBER as usize + 1],
        }
    }

    /// Numbers drawn so far, in draw order.
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Returns `true` if `number` has been drawn this game.
    pub fn is_drawn(&self, number: u8) -> bool {
        self.drawn.get(usize::from(number)).copied().unwrap_or(false)
    }

    /// Numbers still in the pool, ascending.
    pub fn undrawn(&self) -> Vec<u8> {
        (MIN_NUMBER..=MAX_NUMBER).filter(|&n| !self.is_drawn(n)).collect()
    }

    /// How many numbers are still in the pool.
    pub fn remaining(&self) -> usize {
        usize::from(MAX_NUMBER) - self.sequence.len()
    }

    /// Draws one undrawn number uniformly at random.
    ///
    /// # Errors
    /// Returns [`RoomError::Exhausted`] once all 90 numbers are out.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<u8, RoomError> {
        let number = *self.undrawn().choose(rng).ok_or(RoomError::Exhausted)?;
        self.record(number)?;
        Ok(number)
    }

    /// Appends a specific number to the drawn sequence.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidArgument`] if the number is outside 1–90
    /// or has already been drawn.
    pub fn record(&mut self, number: u8) -> Result<(), RoomError> {
        if !(MIN_NUMBER..=MAX_NUMBER).contains(&number) {
            return Err(RoomError::InvalidArgument(format!(
                "{number} is outside {MIN_NUMBER}-{MAX_NUMBER}"
            )));
        }
        if self.is_drawn(number) {
            return Err(RoomError::InvalidArgument(format!(
                "{number} has already been drawn"
            )));
        }
        self.drawn[usize::from(number)] = true;
        self.sequence.push(number);
        Ok(())
    }
}

impl Default for NumberPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_new_pool_is_full() {
        let pool = NumberPool::new();
        assert_eq!(pool.remaining(), 90);
        assert_eq!(pool.undrawn().len(), 90);
        assert!(pool.sequence().is_empty());
    }

    #[test]
    fn test_draws_every_number_exactly_once() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pool = NumberPool::new();
        let mut seen = HashSet::new();
        for _ in 0..90 {
            let n = pool.draw(&mut rng).unwrap();
            assert!((1..=90).contains(&n));
            assert!(seen.insert(n), "{n} drawn twice");
        }
        assert_eq!(pool.remaining(), 0);
        assert_eq!(pool.sequence().len(), 90);
        assert!(matches!(pool.draw(&mut rng), Err(RoomError::Exhausted)));
    }

    #[test]
    fn test_record_rejects_duplicates_and_out_of_range() {
        let mut pool = NumberPool::new();
        pool.record(45).unwrap();
        assert!(pool.is_drawn(45));
        assert!(pool.record(45).is_err());
        assert!(pool.record(0).is_err());
        assert!(pool.record(91).is_err());
        assert_eq!(pool.sequence(), &[45]);
    }

    #[test]
    fn test_draw_only_picks_from_undrawn() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut pool = NumberPool::new();
        for n in 1..=89 {
            pool.record(n).unwrap();
        }
        assert_eq!(pool.undrawn(), vec![90]);
        assert_eq!(pool.draw(&mut rng).unwrap(), 90);
    }

    #[test]
    fn test_is_drawn_out_of_range_is_false() {
        let pool = NumberPool::new();
        assert!(!pool.is_drawn(0));
        assert!(!pool.is_drawn(200));
    }
}
