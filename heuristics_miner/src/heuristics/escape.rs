use std::collections::HashSet;

use crate::heuristics_net::heuristics_net_struct::HeuristicsNet;

///
/// Check whether flow reaching `x` can still end without passing `y`
///
/// * `false` if `x` was already visited on the current path or `x == y`
/// * `true` if `x` has no outputs
/// * `false` if `x` has an output subset consisting of `y` only
/// * otherwise `true` iff every output subset of `x` has some member that can escape
///
/// Every branch of the recursion gets its own copy of `visited`.
///
pub fn can_escape(net: &HeuristicsNet, x: usize, y: usize, visited: &HashSet<usize>) -> bool {
    if visited.contains(&x) || x == y {
        return false;
    }
    let outputs = net.output_set(x);
    if outputs.all_elements().is_empty() {
        return true;
    }
    if outputs
        .subsets_with_element(y)
        .iter()
        .any(|subset| subset.len() == 1)
    {
        return false;
    }
    outputs.subsets.iter().all(|subset| {
        subset.iter().any(|m| {
            let mut path = visited.clone();
            path.insert(x);
            can_escape(net, *m, y, &path)
        })
    })
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::*;
    use crate::{
        event_log::event_index::{EventIndex, LifecycleType},
        heuristics_net::heuristics_net_struct::OrSet,
    };

    fn net_with_outputs(outputs: Vec<Vec<Vec<usize>>>) -> HeuristicsNet {
        let mut index = EventIndex::new();
        for i in 0..outputs.len() {
            index.insert(&format!("e{i}"), LifecycleType::Complete);
        }
        let n = outputs.len();
        let mut net = HeuristicsNet::new(index, DMatrix::zeros(n, n));
        for (i, subsets) in outputs.into_iter().enumerate() {
            net.set_output_set(i, OrSet::from_subsets(subsets));
        }
        net
    }

    #[test]
    fn never_escapes_to_itself() {
        let net = net_with_outputs(vec![vec![vec![1]], vec![vec![0]], vec![]]);
        for x in 0..3 {
            assert!(!can_escape(&net, x, x, &HashSet::new()));
        }
    }

    #[test]
    fn sinks_always_escape() {
        let net = net_with_outputs(vec![vec![vec![1]], vec![vec![2]], vec![]]);
        assert!(can_escape(&net, 2, 0, &HashSet::new()));
        assert!(can_escape(&net, 2, 1, &HashSet::new()));
    }

    #[test]
    fn unique_successor_blocks() {
        // 0 -> 1 -> 2
        let net = net_with_outputs(vec![vec![vec![1]], vec![vec![2]], vec![]]);
        assert!(!can_escape(&net, 0, 1, &HashSet::new()));
        // 0 reaches the sink 2 only through 1
        assert!(!can_escape(&net, 0, 2, &HashSet::new()));
    }

    #[test]
    fn alternative_path_escapes() {
        // 0 -> (1 xor 3), 1 -> 2, 3 -> 4 (sink), 2 sink
        let net = net_with_outputs(vec![
            vec![vec![1, 3]],
            vec![vec![2]],
            vec![],
            vec![vec![4]],
            vec![],
        ]);
        assert!(can_escape(&net, 0, 2, &HashSet::new()));
        assert!(!can_escape(&net, 1, 2, &HashSet::new()));
    }

    #[test]
    fn and_subsets_all_need_an_escape() {
        // 0 -> 1 and 2 (two subsets), 1 -> 3, 2 -> 3, 3 and 4 are sinks
        let net = net_with_outputs(vec![
            vec![vec![1], vec![2]],
            vec![vec![3]],
            vec![vec![3]],
            vec![],
            vec![],
        ]);
        assert!(!can_escape(&net, 0, 3, &HashSet::new()));
        assert!(can_escape(&net, 0, 4, &HashSet::new()));
    }

    #[test]
    fn cycles_do_not_escape() {
        // 0 -> (1 xor 2), 1 -> 0, 2 -> 3
        let net = net_with_outputs(vec![
            vec![vec![1, 2]],
            vec![vec![0]],
            vec![vec![3]],
            vec![],
        ]);
        // The loop back to 0 is blocked by the visited set, 2 is a unique successor path to 3
        assert!(!can_escape(&net, 0, 3, &HashSet::new()));
        assert!(!can_escape(&net, 1, 0, &HashSet::new()));
        let visited: HashSet<usize> = [0].into_iter().collect();
        assert!(!can_escape(&net, 0, 1, &visited));
    }
}
