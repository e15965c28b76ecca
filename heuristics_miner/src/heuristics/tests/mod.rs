use crate::{
    event_log::{event_index::LifecycleType, lifecycle_projection::EventLogLifecycleProjection},
    heuristics::{config::HeuristicsMinerConfig, miner::HeuristicsMiner},
    import_xes_slice, XESImportOptions,
};

fn claims_miner(config: HeuristicsMinerConfig) -> HeuristicsMiner {
    let bytes = include_bytes!("../../../test_data/xes/claims_lifecycle.xes");
    let log = import_xes_slice(bytes, false, XESImportOptions::default()).unwrap();
    HeuristicsMiner::from_event_log(&log, config)
}

fn sequential_trace(activities: &[&'static str]) -> Vec<(&'static str, &'static str, i64)> {
    let mut trace = Vec::new();
    for (k, a) in activities.iter().enumerate() {
        trace.push((*a, "start", 10 * k as i64));
        trace.push((*a, "complete", 10 * k as i64 + 5));
    }
    trace
}

#[test]
fn sequential_pair_statistics() {
    let log = EventLogLifecycleProjection::from_traces(vec![vec![
        ("A", "start", 0),
        ("A", "complete", 10),
        ("B", "start", 20),
        ("B", "complete", 30),
    ]]);
    let mut miner = HeuristicsMiner::new(log, HeuristicsMinerConfig::default());
    let stats = &miner.make_basic_relations().stats;
    // A start, A complete, B start, B complete
    assert_eq!(stats.direct_succession[(1, 2)], 1);
    assert_eq!(stats.parallel[(0, 1)], 0);
    assert_eq!(stats.parallel[(1, 0)], 0);
}

#[test]
fn overlapping_pair_statistics() {
    let log = EventLogLifecycleProjection::from_traces(vec![vec![
        ("A", "start", 0),
        ("B", "start", 4),
        ("A", "complete", 10),
        ("B", "complete", 12),
    ]]);
    let mut miner = HeuristicsMiner::new(log, HeuristicsMinerConfig::default());
    let stats = &miner.make_basic_relations().stats;
    assert_eq!(stats.parallel[(0, 1)], 1);
    assert_eq!(stats.parallel[(1, 0)], 1);
    assert_eq!(stats.overlap_time[(0, 1)], 6);
    assert_eq!(stats.overlap_time[(1, 0)], 6);
}

#[test]
fn claims_log_net() {
    let mut miner = claims_miner(HeuristicsMinerConfig::default());
    assert!(miner.model_producible());
    let index = miner.log().index.clone();
    let ev = |a: &str, lc: LifecycleType| index.event_of(a, &lc).unwrap();
    let (reg_s, reg_c) = (
        ev("register", LifecycleType::Start),
        ev("register", LifecycleType::Complete),
    );
    let (an_s, an_c) = (
        ev("analyze", LifecycleType::Start),
        ev("analyze", LifecycleType::Complete),
    );
    let (no_s, no_c) = (
        ev("notify", LifecycleType::Start),
        ev("notify", LifecycleType::Complete),
    );
    let (ar_s, ar_c) = (
        ev("archive", LifecycleType::Start),
        ev("archive", LifecycleType::Complete),
    );

    let result = miner.mine();
    let net = &result.net;
    assert_eq!(net.start_tasks(), &[reg_s]);
    assert_eq!(net.end_tasks(), &[ar_c]);
    // analyze and notify run in parallel: AND-split and AND-join
    assert_eq!(net.output_set(reg_c).subsets, vec![vec![an_s], vec![no_s]]);
    assert_eq!(net.input_set(ar_s).subsets, vec![vec![an_c], vec![no_c]]);
    assert_eq!(net.output_set(an_s).subsets, vec![vec![an_c]]);
    assert_eq!(net.output_set(no_s).subsets, vec![vec![no_c]]);
    assert!((net.dependency_measures()[(reg_c, an_s)] - 12.0 / 13.0).abs() < 1e-12);
    assert_eq!(net.direct_succession_count(an_c, ar_s), 12);
    assert_eq!(net.number_of_connections(), 8);
    assert_eq!(result.noise.total(), 0);

    // Every trace fits
    assert_eq!(result.replay.missing_tokens, 0);
    assert_eq!(result.replay.tokens_left, 0);
    assert_eq!(net.fitness(), Some(1.0));
    assert_eq!(net.edge(reg_c, no_s).1, 12);

    let analyze = index.transition_id("analyze").unwrap();
    let notify = index.transition_id("notify").unwrap();
    let stats = &miner.make_basic_relations().stats;
    assert_eq!(stats.parallel[(analyze, notify)], 12);
    assert_eq!(stats.parallel[(notify, analyze)], 12);
    // 15 minutes of overlap per trace
    assert_eq!(stats.overlap_time[(analyze, notify)], 12 * 15 * 60 * 1000);
    assert!((result.overlap.time[(analyze, notify)] - 0.75 * 0.75).abs() < 1e-12);
    assert!((result.overlap.cardinality[(analyze, notify)] - 1.0).abs() < 1e-12);
}

#[test]
fn mining_is_idempotent() {
    let config = HeuristicsMinerConfig {
        use_long_distance_dependency: true,
        ..HeuristicsMinerConfig::default()
    };
    let mut miner = claims_miner(config.clone());
    let first = miner.mine();
    let second = miner.mine();
    assert_eq!(first.net, second.net);
    assert_eq!(first.noise, second.noise);
    let fresh = claims_miner(config).mine();
    assert_eq!(first.net, fresh.net);
    assert_eq!(first.and_measures, fresh.and_measures);
}

#[test]
fn basic_relations_are_cached() {
    let mut miner = claims_miner(HeuristicsMinerConfig::default());
    assert!(!miner.basic_relations_made());
    let loose = miner.mine();
    assert!(miner.basic_relations_made());

    // Thresholds change the net, but not the basic relations
    let stats_before = miner.make_basic_relations().clone();
    miner.set_config(HeuristicsMinerConfig {
        positive_observations_threshold: 13,
        use_all_connected_heuristics: false,
        ..HeuristicsMinerConfig::default()
    });
    assert!(miner.basic_relations_made());
    let strict = miner.mine();
    assert_eq!(miner.make_basic_relations(), &stats_before);
    // Only the start to completion bridges remain
    assert_eq!(strict.net.number_of_connections(), 4);
    assert_eq!(loose.net.number_of_connections(), 8);

    miner.reset_basic_relations();
    assert!(!miner.basic_relations_made());
}

#[test]
fn long_range_dependency_follows_divisor() {
    let log = EventLogLifecycleProjection::from_traces(vec![sequential_trace(&["A", "B"]); 10]);
    let a_s = log.index.event_of("A", &LifecycleType::Start).unwrap();
    let b_c = log.index.event_of("B", &LifecycleType::Complete).unwrap();
    let mut miner = HeuristicsMiner::new(log, HeuristicsMinerConfig::default());
    assert!((miner.long_range_dependency()[(a_s, b_c)] - 10.0 / 11.0).abs() < 1e-12);

    miner.set_config(HeuristicsMinerConfig {
        dependency_divisor: 5.0,
        ..HeuristicsMinerConfig::default()
    });
    assert!(miner.basic_relations_made());
    assert!((miner.long_range_dependency()[(a_s, b_c)] - 10.0 / 15.0).abs() < 1e-12);
}

#[test]
fn symmetric_statistics() {
    let mut miner = claims_miner(HeuristicsMinerConfig::default());
    let stats = &miner.make_basic_relations().stats;
    assert_eq!(stats.parallel, stats.parallel.transpose());
    assert_eq!(stats.overlap_time, stats.overlap_time.transpose());
}

#[test]
fn long_distance_dependencies() {
    let mut traces = vec![sequential_trace(&["A", "B", "D", "E", "G"]); 10];
    traces.extend(vec![sequential_trace(&["A", "C", "D", "F", "G"]); 10]);
    let log = EventLogLifecycleProjection::from_traces(traces);
    let index = log.index.clone();
    let ev = |a: &str, lc: LifecycleType| index.event_of(a, &lc).unwrap();
    let b_c = ev("B", LifecycleType::Complete);
    let c_c = ev("C", LifecycleType::Complete);
    let d_s = ev("D", LifecycleType::Start);
    let e_s = ev("E", LifecycleType::Start);
    let f_s = ev("F", LifecycleType::Start);
    let a_c = ev("A", LifecycleType::Complete);
    let g_c = ev("G", LifecycleType::Complete);

    let mut miner = HeuristicsMiner::new(log, HeuristicsMinerConfig::default());
    let without = miner.mine().net;
    assert_eq!(without.output_set(b_c).subsets, vec![vec![d_s]]);
    assert_eq!(without.number_of_connections(), 15);

    miner.set_config(HeuristicsMinerConfig {
        use_long_distance_dependency: true,
        ..HeuristicsMinerConfig::default()
    });
    let with = miner.mine().net;
    assert!(with.output_set(b_c).subsets.contains(&vec![e_s]));
    assert!(with.input_set(e_s).subsets.contains(&vec![b_c]));
    assert!(with.output_set(c_c).subsets.contains(&vec![f_s]));
    assert!((with.dependency_measures()[(b_c, e_s)] - 10.0 / 11.0).abs() < 1e-12);
    // G always follows A: no informative long distance edge
    assert_eq!(with.dependency_measures()[(a_c, g_c)], 0.0);
    // B and C complete both gain edges to the start and completion of their partner
    assert_eq!(with.number_of_connections(), 19);
}

#[test]
fn empty_log_produces_no_model() {
    let mut miner = HeuristicsMiner::new(
        EventLogLifecycleProjection::default(),
        HeuristicsMinerConfig::default(),
    );
    assert!(!miner.model_producible());
    let result = miner.mine();
    assert_eq!(result.net.num_events(), 0);
    assert_eq!(result.replay.traces, 0);
}

#[test]
fn threshold_exploration() {
    let mut miner = claims_miner(HeuristicsMinerConfig::default());
    let observations = miner.positive_observations_threshold_values();
    // Four complete to start successions, each observed 12 times
    assert_eq!(observations.get(&12), Some(&4));
    assert_eq!(observations.len(), 1);
    let dependencies = miner.dependency_threshold_values();
    assert_eq!(dependencies.values().copied().max(), Some(4));
    let relative = miner.relative_to_best_values();
    assert_eq!(relative.first(), Some(&0.0));
}
