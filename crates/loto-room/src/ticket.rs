//! Ticket generation.
//!
//! A player's whole ticket set is cut from one set of nine shuffled column
//! pools, one per decade. Numbers are popped, never put back, so no number
//! appears twice across the tickets of a single call. Each call builds fresh
//! pools: two players may well share numbers.

use std::ops::RangeInclusive;

use loto_protocol::Ticket;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

/// Numbers allowed in each column, left to right.
pub const COLUMN_RANGES: [RangeInclusive<u8>; Ticket::COLS] = [
    1..=9,
    10..=19,
    20..=29,
    30..=39,
    40..=49,
    50..=59,
    60..=69,
    70..=79,
    80..=90,
];

/// A column never holds more numbers than there are rows.
const MAX_PER_COLUMN: usize = Ticket::ROWS;

/// Generates `count` tickets for one player.
///
/// `count` is expected to be in 1..=5 already (see
/// [`RoomSettings`](loto_protocol::RoomSettings)); larger values still
/// produce tickets but the pools may run dry, in which case the affected
/// cells are left empty.
pub fn generate_tickets<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Ticket> {
    let mut pools = ColumnPools::shuffled(rng);
    (0..count)
        .map(|i| {
            let tickets_after = count - i - 1;
            generate_one(&mut pools, tickets_after, rng)
        })
        .collect()
}

/// Returns `true` if the ticket satisfies every structural rule: 15 numbers,
/// 5 per row, 1–3 per column, each number in its column's decade, and
/// columns ascending top to bottom.
pub fn is_well_formed(ticket: &Ticket) -> bool {
    if ticket.numbers().count() != Ticket::NUMBERS {
        return false;
    }
    let rows_ok = (0..Ticket::ROWS).all(|r| {
        ticket
            .row_numbers(r)
            .is_some_and(|nums| nums.len() == Ticket::NUMBERS_PER_ROW)
    });
    let cols_ok = COLUMN_RANGES.iter().enumerate().all(|(c, range)| {
        let nums = ticket.column_numbers(c);
        (1..=MAX_PER_COLUMN).contains(&nums.len())
            && nums.iter().all(|n| range.contains(n))
            && nums.windows(2).all(|w| w[0] < w[1])
    });
    rows_ok && cols_ok
}

/// The nine per-column pools shared by one player's ticket set.
struct ColumnPools([Vec<u8>; Ticket::COLS]);

impl ColumnPools {
    fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(std::array::from_fn(|c| {
            let mut nums: Vec<u8> = COLUMN_RANGES[c].clone().collect();
            nums.shuffle(rng);
            nums
        }))
    }

    fn remaining(&self, col: usize) -> usize {
        self.0[col].len()
    }

    fn pop(&mut self, col: usize) -> Option<u8> {
        self.0[col].pop()
    }
}

fn generate_one<R: Rng + ?Sized>(
    pools: &mut ColumnPools,
    tickets_after: usize,
    rng: &mut R,
) -> Ticket {
    let counts = column_counts(pools, tickets_after, rng);
    let rows = assign_rows(&counts, rng);

    let mut grid = [[0u8; Ticket::COLS]; Ticket::ROWS];
    for (col, col_rows) in rows.iter().enumerate() {
        // Short pool: the trailing cells stay empty.
        let mut nums: Vec<u8> = (0..col_rows.len()).filter_map(|_| pools.pop(col)).collect();
        nums.sort_unstable();
        for (&row, n) in col_rows.iter().zip(nums) {
            grid[row][col] = n;
        }
    }
    Ticket::from_rows(grid)
}

/// Decides how many numbers each column contributes: one each, then six
/// extra slots spread over random columns, at most three per column.
///
/// A column's ceiling also keeps one number in reserve for every ticket
/// still to be cut from the same pools.
fn column_counts<R: Rng + ?Sized>(
    pools: &ColumnPools,
    tickets_after: usize,
    rng: &mut R,
) -> [usize; Ticket::COLS] {
    let ceiling: [usize; Ticket::COLS] = std::array::from_fn(|c| {
        MAX_PER_COLUMN.min(pools.remaining(c).saturating_sub(tickets_after))
    });

    let mut counts = [1usize; Ticket::COLS];
    let mut extra = Ticket::NUMBERS - Ticket::COLS;
    while extra > 0 {
        let open: Vec<usize> = (0..Ticket::COLS).filter(|&c| counts[c] < ceiling[c]).collect();
        let Some(&col) = open.choose(rng) else {
            break;
        };
        counts[col] += 1;
        extra -= 1;
    }
    counts
}

/// Picks the rows each column fills so that every row ends up with five
/// numbers. Columns needing the most rows go first; each takes the rows
/// with the fewest numbers so far.
fn assign_rows<R: Rng + ?Sized>(
    counts: &[usize; Ticket::COLS],
    rng: &mut R,
) -> [Vec<usize>; Ticket::COLS] {
    let mut order: Vec<usize> = (0..Ticket::COLS).collect();
    order.shuffle(rng);
    order.sort_by(|a, b| counts[*b].cmp(&counts[*a]));

    let mut row_load = [0usize; Ticket::ROWS];
    let mut rows: [Vec<usize>; Ticket::COLS] = Default::default();
    for col in order {
        let mut by_load = [0, 1, 2];
        by_load.sort_by_key(|&r| row_load[r]);
        let mut picked = by_load[..counts[col].min(Ticket::ROWS)].to_vec();
        picked.sort_unstable();
        for &r in &picked {
            row_load[r] += 1;
        }
        rows[col] = picked;
    }
    rows
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_every_ticket_is_well_formed() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            for count in 1..=5 {
                for ticket in generate_tickets(count, &mut rng) {
                    assert!(
                        is_well_formed(&ticket),
                        "seed {seed}, count {count}: {ticket:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_generates_requested_count() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(generate_tickets(1, &mut rng).len(), 1);
        assert_eq!(generate_tickets(5, &mut rng).len(), 5);
        assert!(generate_tickets(0, &mut rng).is_empty());
    }

    #[test]
    fn test_no_number_repeats_within_one_call() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let tickets = generate_tickets(5, &mut rng);
            let mut seen = HashSet::new();
            for n in tickets.iter().flat_map(|t| t.numbers()) {
                assert!(seen.insert(n), "seed {seed}: {n} repeated");
            }
            assert_eq!(seen.len(), 5 * Ticket::NUMBERS);
        }
    }

    #[test]
    fn test_separate_calls_use_fresh_pools() {
        // Ten single-ticket calls take 150 numbers from a universe of 90:
        // repeats across calls are unavoidable, and that is fine.
        let mut rng = StdRng::seed_from_u64(9);
        let all: Vec<u8> = (0..10)
            .flat_map(|_| generate_tickets(1, &mut rng))
            .flat_map(|t| t.numbers().collect::<Vec<_>>())
            .collect();
        let distinct: HashSet<u8> = all.iter().copied().collect();
        assert_eq!(all.len(), 150);
        assert!(distinct.len() < all.len());
    }

    #[test]
    fn test_column_counts_sum_to_fifteen() {
        let mut rng = StdRng::seed_from_u64(3);
        let pools = ColumnPools::shuffled(&mut rng);
        for _ in 0..100 {
            let counts = column_counts(&pools, 0, &mut rng);
            assert_eq!(counts.iter().sum::<usize>(), Ticket::NUMBERS);
            assert!(counts.iter().all(|c| (1..=3).contains(c)));
        }
    }

    #[test]
    fn test_column_counts_respect_reserved_numbers() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut pools = ColumnPools::shuffled(&mut rng);
        // Leave column 0 with 5 numbers while 4 tickets still follow:
        // only one number may be used now.
        while pools.remaining(0) > 5 {
            pools.pop(0);
        }
        for _ in 0..50 {
            let counts = column_counts(&pools, 4, &mut rng);
            assert_eq!(counts[0], 1);
        }
    }

    #[test]
    fn test_assign_rows_balances_five_per_row() {
        let counts = [3, 3, 2, 2, 1, 1, 1, 1, 1];
        let mut rng = StdRng::seed_from_u64(5);
        let rows = assign_rows(&counts, &mut rng);
        let mut per_row = [0; 3];
        for (col, col_rows) in rows.iter().enumerate() {
            assert_eq!(col_rows.len(), counts[col]);
            for &r in col_rows {
                per_row[r] += 1;
            }
        }
        assert_eq!(per_row, [5, 5, 5]);
    }

    #[test]
    fn test_exhausted_pool_leaves_cells_empty() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut pools = ColumnPools::shuffled(&mut rng);
        while pools.pop(4).is_some() {}
        let ticket = generate_one(&mut pools, 0, &mut rng);
        assert!(ticket.column_numbers(4).is_empty());
        assert!(ticket.numbers().count() < Ticket::NUMBERS);
    }

    #[test]
    fn test_well_formed_rejects_bad_grids() {
        let good = Ticket::from_rows([
            [1, 0, 23, 0, 41, 0, 65, 0, 80],
            [0, 14, 0, 35, 44, 51, 0, 77, 0],
            [7, 0, 0, 38, 0, 52, 69, 0, 86],
        ]);
        assert!(is_well_formed(&good));

        let descending = Ticket::from_rows([
            [7, 0, 23, 0, 41, 0, 65, 0, 80],
            [0, 14, 0, 35, 44, 51, 0, 77, 0],
            [1, 0, 0, 38, 0, 52, 69, 0, 86],
        ]);
        assert!(!is_well_formed(&descending));

        let wrong_decade = Ticket::from_rows([
            [1, 0, 23, 0, 41, 0, 65, 0, 80],
            [0, 24, 0, 35, 44, 51, 0, 77, 0],
            [7, 0, 0, 38, 0, 52, 69, 0, 86],
        ]);
        assert!(!is_well_formed(&wrong_decade));
    }
}
