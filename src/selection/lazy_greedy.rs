//! Lazy greedy maximization of a submodular objective.
//!
//! Every candidate sits in a max-heap keyed by the last gain computed for it,
//! tagged with the round in which that gain was computed. Under diminishing
//! returns a stale gain is an upper bound on the current one, so only the
//! heap top needs re-evaluation: once its refreshed gain still orders before
//! the next entry's stale bound, no other candidate can beat it.
//!
//! Candidates are ordered by gain, then by lower index. [`lazy_greedy`]
//! produces the same sequence as [`naive_greedy`], which re-evaluates every
//! remaining candidate in every round.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use ordered_float::OrderedFloat;
use tracing::trace;

use crate::error::SelectionError;

use super::objective::SubmodularObjective;

/// A candidate with the gain computed for it in `round`.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    gain: OrderedFloat<f64>,
    index: usize,
    round: usize,
}

impl HeapEntry {
    fn evaluate<O>(objective: &O, selected: &[usize], index: usize) -> Self
    where
        O: SubmodularObjective + ?Sized,
    {
        Self {
            gain: OrderedFloat(objective.marginal_gain(selected, index)),
            index,
            round: selected.len(),
        }
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.gain
            .cmp(&other.gain)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// Selects `budget` elements of `universe` by lazy greedy maximization.
///
/// Returns the elements in selection order. `objective.commit` is called on
/// each element as soon as it is accepted. A zero budget returns immediately
/// without evaluating the objective.
///
/// # Errors
///
/// Returns `SelectionError` if the budget exceeds the universe, or if the
/// universe repeats a candidate or names one outside the objective.
pub fn lazy_greedy<O>(
    objective: &mut O,
    universe: &[usize],
    budget: usize,
) -> Result<Vec<usize>, SelectionError>
where
    O: SubmodularObjective + ?Sized,
{
    if budget == 0 {
        return Ok(Vec::new());
    }
    validate_universe(objective.universe_size(), universe, budget)?;

    let mut selected: Vec<usize> = Vec::with_capacity(budget);
    let mut heap: BinaryHeap<HeapEntry> = universe
        .iter()
        .map(|&index| HeapEntry::evaluate(&*objective, &selected, index))
        .collect();
    let mut evaluations = universe.len();

    while selected.len() < budget {
        let Some(top) = heap.pop() else {
            break;
        };

        let accepted = if top.round == selected.len() {
            top
        } else {
            let refreshed = HeapEntry::evaluate(&*objective, &selected, top.index);
            evaluations += 1;
            match heap.peek() {
                Some(next) if *next > refreshed => {
                    heap.push(refreshed);
                    continue;
                }
                _ => refreshed,
            }
        };

        trace!(
            index = accepted.index,
            gain = accepted.gain.into_inner(),
            round = selected.len(),
            "accepted candidate"
        );
        selected.push(accepted.index);
        objective.commit(accepted.index);
    }

    trace!(
        selected = selected.len(),
        evaluations,
        "lazy greedy finished"
    );
    Ok(selected)
}

/// Reference greedy that re-evaluates every remaining candidate each round.
///
/// Quadratic in the universe size; useful for checking [`lazy_greedy`] and
/// for objectives without diminishing returns.
pub fn naive_greedy<O>(
    objective: &mut O,
    universe: &[usize],
    budget: usize,
) -> Result<Vec<usize>, SelectionError>
where
    O: SubmodularObjective + ?Sized,
{
    if budget == 0 {
        return Ok(Vec::new());
    }
    validate_universe(objective.universe_size(), universe, budget)?;

    let mut remaining: Vec<usize> = universe.to_vec();
    let mut selected: Vec<usize> = Vec::with_capacity(budget);

    while selected.len() < budget {
        let best = remaining
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                (position, HeapEntry::evaluate(&*objective, &selected, index))
            })
            .max_by(|a, b| a.1.cmp(&b.1));

        let Some((position, entry)) = best else {
            break;
        };

        remaining.swap_remove(position);
        selected.push(entry.index);
        objective.commit(entry.index);
    }

    Ok(selected)
}

fn validate_universe(size: usize, universe: &[usize], budget: usize) -> Result<(), SelectionError> {
    if budget > universe.len() {
        return Err(SelectionError::BudgetExceedsUniverse {
            budget,
            universe: universe.len(),
        });
    }

    let mut seen = HashSet::with_capacity(universe.len());
    for &index in universe {
        if index >= size {
            return Err(SelectionError::CandidateOutOfRange { index, size });
        }
        if !seen.insert(index) {
            return Err(SelectionError::DuplicateCandidate(index));
        }
    }
    Ok(())
}
