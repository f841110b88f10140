//! Loading TOML graph descriptions into the registry.

use kairos_core::registry::{QueryValue, ValueDomain};
use kairos_core::{ConfigError, Engine, GraphSpec, IndexKey, NodeKind};

const DEMO: &str = include_str!("../../demos/crossover.toml");

fn minute(step: i64) -> IndexKey {
    IndexKey::Time {
        instant: step * 60,
        granularity: 60,
    }
}

#[test]
fn demo_graph_builds_every_node() {
    let spec = GraphSpec::from_toml_str(DEMO).unwrap();
    let mut engine = Engine::new();
    let built = engine.load(&spec).unwrap();

    // the ema node adds an implicit seed
    assert_eq!(built.len(), spec.nodes.len());
    assert_eq!(engine.len(), spec.nodes.len() + 1);
    assert_eq!(built.fingerprint, spec.fingerprint().unwrap());

    let signal = built.handle("signal").unwrap();
    assert_eq!(engine.node_info(signal).unwrap().value, ValueDomain::Signal);
    let zone = built.handle("zone").unwrap();
    assert_eq!(engine.node_info(zone).unwrap().granularity, Some(60));
}

#[test]
fn demo_graph_crossovers() {
    let spec = GraphSpec::from_toml_str(DEMO).unwrap();
    let mut engine = Engine::new();
    let built = engine.load(&spec).unwrap();
    let signal = built.handle("signal").unwrap();

    let codes: Vec<QueryValue> = (0..13)
        .map(|step| engine.query(signal, minute(step)).unwrap())
        .collect();

    // slow SMA(4) is defined from step 3
    assert_eq!(codes[2], QueryValue::Invalid);
    assert_eq!(codes[12], QueryValue::Pending);
    // fast falls below slow once the series turns down
    assert!(codes[3..12].contains(&QueryValue::Signal(-1)));
    assert!(codes[3..12]
        .iter()
        .all(|c| matches!(c, QueryValue::Signal(-1..=1))));
}

#[test]
fn ema_defaults_and_explicit_seed() {
    let text = r#"
        [[node]]
        id = "close"
        type = "dense"
        index = "transaction"
        values = [1.0, 1.0, 1.0, 1.0, 1.0, 3.0, 3.0, 3.0, 3.0, 3.0]

        [[node]]
        id = "seed"
        type = "sma"
        index = "transaction"
        source = "close"
        period = 2

        [[node]]
        id = "ema"
        type = "ema"
        index = "transaction"
        source = "close"
        seed = "seed"
        period = 3
        accuracy = 0.9
    "#;
    let spec = GraphSpec::from_toml_str(text).unwrap();
    match &spec.nodes[2].kind {
        NodeKind::Ema { capacity, .. } => assert_eq!(*capacity, 1024),
        other => panic!("unexpected {other:?}"),
    }

    let mut engine = Engine::new();
    let built = engine.load(&spec).unwrap();
    let ema = built.handle("ema").unwrap();
    let at = |id| engine.query(ema, IndexKey::Transaction { id }).unwrap();
    assert_eq!(at(4), QueryValue::Invalid);
    assert_eq!(at(5), QueryValue::Real(2.0));
    assert_eq!(at(9), QueryValue::Real(2.9375));
}

#[test]
fn sparse_entries_and_gap_fill() {
    let text = r#"
        [[node]]
        id = "quotes"
        type = "sparse"
        index = "tick"
        entries = [
            { at = 0, value = 1.0 },
            { at = 1, value = 2.0 },
            { at = 3, value = 4.0 },
        ]

        [[node]]
        id = "filled"
        type = "gap_fill"
        index = "tick"
        source = "quotes"
        max_run = 1
    "#;
    let spec = GraphSpec::from_toml_str(text).unwrap();
    let mut engine = Engine::new();
    let built = engine.load(&spec).unwrap();

    let quotes = built.handle("quotes").unwrap();
    let filled = built.handle("filled").unwrap();
    let tick = |id| IndexKey::Tick { id };
    assert_eq!(engine.query(quotes, tick(2)).unwrap(), QueryValue::Absent);
    assert_eq!(engine.query(filled, tick(2)).unwrap(), QueryValue::Real(2.0));
    assert_eq!(engine.query(filled, tick(4)).unwrap(), QueryValue::Pending);
}

#[test]
fn cross_domain_reference_reports_node() {
    let text = r#"
        [[node]]
        id = "a"
        type = "dense"
        index = "tick"

        [[node]]
        id = "b"
        type = "dense"
        index = "transaction"

        [[node]]
        id = "x"
        type = "cross"
        index = "tick"
        a = "a"
        b = "b"
    "#;
    let spec = GraphSpec::from_toml_str(text).unwrap();
    match Engine::new().load(&spec) {
        Err(ConfigError::Registry { node, .. }) => assert_eq!(node, "x"),
        other => panic!("unexpected {other:?}"),
    }
}
