use std::collections::{BTreeMap, BTreeSet};

use ordered_float::OrderedFloat;

use super::{best_relations::BestRelations, measures::DependencyMeasures};

/// Number of decimals relative-to-best values are rounded to
const RELATIVE_TO_BEST_DECIMALS: i32 = 7;

/// Turn exact counts per key into counts of all keys greater or equal
fn accumulate_from_top<K: Ord + Copy>(mut counts: BTreeMap<K, usize>) -> BTreeMap<K, usize> {
    let mut total = 0;
    for count in counts.values_mut().rev() {
        total += *count;
        *count = total;
    }
    counts
}

///
/// Number of event pairs with at least `k` direct successions, for every observed positive `k`
///
pub fn positive_observations_threshold_values(
    measures: &DependencyMeasures<'_>,
) -> BTreeMap<u64, usize> {
    let mut counts: BTreeMap<u64, usize> = BTreeMap::new();
    for ds in measures
        .stats
        .direct_succession
        .iter()
        .filter(|ds| **ds > 0)
    {
        *counts.entry(*ds).or_default() += 1;
    }
    accumulate_from_top(counts)
}

///
/// Number of pairs of events of different activities with a dependency measure of at least `m`,
/// for every observed positive measure `m`
///
pub fn dependency_threshold_values(
    measures: &DependencyMeasures<'_>,
) -> BTreeMap<OrderedFloat<f64>, usize> {
    let n = measures.index.num_events();
    let mut counts: BTreeMap<OrderedFloat<f64>, usize> = BTreeMap::new();
    for i in 0..n {
        for j in (0..n).filter(|j| !measures.index.same_activity(i, *j)) {
            let measure = measures.dependency(i, j);
            if measure > 0.0 {
                *counts.entry(OrderedFloat(measure)).or_default() += 1;
            }
        }
    }
    accumulate_from_top(counts)
}

///
/// All distinct differences between the best outgoing measure of an event and its other measures
///
/// Values are rounded to 7 decimals and sorted ascending.
///
pub fn relative_to_best_values(measures: &DependencyMeasures<'_>) -> Vec<f64> {
    let best = BestRelations::compute(measures);
    let n = measures.index.num_events();
    let scale = 10f64.powi(RELATIVE_TO_BEST_DECIMALS);
    let values: BTreeSet<OrderedFloat<f64>> = (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .map(|(i, j)| {
            let value = best.best_output_measure[i] - measures.dependency(i, j);
            // Avoid distinct entries for 0.0 and -0.0
            OrderedFloat((value * scale).round() / scale + 0.0)
        })
        .collect();
    values.into_iter().map(|v| v.0).collect()
}
