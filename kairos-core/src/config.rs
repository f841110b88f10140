//! Serializable indicator graph description.
//!
//! A graph file is a list of `[[node]]` tables built in order; a node may only
//! reference nodes declared above it.
//!
//! ```toml
//! [[node]]
//! id = "close"
//! type = "dense"
//! index = "time"
//! granularity = 60
//! offset = 0
//! values = [1.0, 2.0, 3.0]
//!
//! [[node]]
//! id = "fast"
//! type = "sma"
//! index = "time"
//! granularity = 60
//! source = "close"
//! period = 2
//! ```

use crate::registry::{CombineOp, Engine, Handle, IndexDomain, IndexKey, RegistryError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Errors that can occur while loading or building a graph description.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse graph: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Duplicate node id: {0}")]
    DuplicateId(String),
    #[error("Node '{node}' references unknown node '{reference}'")]
    UnknownReference { node: String, reference: String },
    #[error("Node '{0}' is time-indexed but has no granularity")]
    MissingGranularity(String),
    #[error("Node '{node}' declares index '{declared}' but its sources are '{actual}'")]
    IndexMismatch {
        node: String,
        declared: IndexDomain,
        actual: IndexDomain,
    },
    #[error("Node '{node}' declares granularity {declared}s but resolves to {actual:?}")]
    GranularityMismatch {
        node: String,
        declared: i64,
        actual: Option<i64>,
    },
    #[error("Node '{node}': {source}")]
    Registry {
        node: String,
        #[source]
        source: RegistryError,
    },
}

fn default_accuracy() -> f64 {
    0.99
}

fn default_capacity() -> usize {
    1024
}

/// Complete graph: nodes in build order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GraphSpec {
    #[serde(rename = "node", default)]
    pub nodes: Vec<NodeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeSpec {
    pub id: String,
    /// Index domain. Sources default to `time`; derived nodes take their
    /// sources' domain and, when this is set, must agree with it.
    #[serde(default)]
    pub index: Option<IndexDomain>,
    /// Seconds per step. Required for time-indexed sources; checked against
    /// the resolved granularity on derived nodes.
    #[serde(default)]
    pub granularity: Option<i64>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// One slot of a sparse source. A missing `value` records an absence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SparseEntry {
    pub at: i64,
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Dense {
        #[serde(default)]
        offset: i64,
        #[serde(default)]
        values: Vec<f64>,
    },
    Sparse {
        #[serde(default)]
        offset: i64,
        #[serde(default)]
        entries: Vec<SparseEntry>,
    },
    TimeMap {
        #[serde(default)]
        offset: i64,
        target_granularity: i64,
        #[serde(default)]
        instants: Vec<i64>,
    },
    Cached {
        source: String,
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    Sma {
        source: String,
        period: usize,
    },
    /// Seeded by an SMA of the same period unless `seed` names a node.
    Ema {
        source: String,
        #[serde(default)]
        seed: Option<String>,
        period: usize,
        #[serde(default = "default_accuracy")]
        accuracy: f64,
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    Slope {
        source: String,
    },
    GapFill {
        source: String,
        max_run: usize,
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    Envelope {
        source: String,
        percent: f64,
    },
    Cross {
        a: String,
        b: String,
    },
    Zone {
        base: String,
        positive: Vec<String>,
        negative: Vec<String>,
    },
    Combine {
        op: CombineOp,
        sources: Vec<String>,
    },
    Reindex {
        values: String,
        map: String,
    },
    RunCount {
        source: String,
        #[serde(default = "default_capacity")]
        capacity: usize,
    },
    Resample {
        source: String,
        target_granularity: i64,
    },
}

/// Handles of a built graph, by node id.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BuiltGraph {
    pub fingerprint: String,
    handles: BTreeMap<String, Handle>,
}

impl BuiltGraph {
    pub fn handle(&self, id: &str) -> Option<Handle> {
        self.handles.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = (&str, Handle)> {
        self.handles.iter().map(|(id, h)| (id.as_str(), *h))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl GraphSpec {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// BLAKE3 hash of the canonical JSON form.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Create every node in `engine`, in declaration order.
    pub fn build(&self, engine: &mut Engine) -> Result<BuiltGraph, ConfigError> {
        let mut handles = BTreeMap::new();
        for node in &self.nodes {
            if handles.contains_key(&node.id) {
                return Err(ConfigError::DuplicateId(node.id.clone()));
            }
            let handle = build_node(node, engine, &handles)?;
            check_declared(node, engine, handle)?;
            handles.insert(node.id.clone(), handle);
        }
        Ok(BuiltGraph {
            fingerprint: self.fingerprint()?,
            handles,
        })
    }
}

impl Engine {
    /// Build a graph description into this engine.
    pub fn load(&mut self, spec: &GraphSpec) -> Result<BuiltGraph, ConfigError> {
        spec.build(self)
    }
}

/// Compare the node's declared index and granularity with what was built.
fn check_declared(node: &NodeSpec, engine: &Engine, handle: Handle) -> Result<(), ConfigError> {
    let info = engine.node_info(handle).map_err(|source| ConfigError::Registry {
        node: node.id.clone(),
        source,
    })?;
    if let Some(declared) = node.index {
        if declared != info.index {
            return Err(ConfigError::IndexMismatch {
                node: node.id.clone(),
                declared,
                actual: info.index,
            });
        }
    }
    if let Some(declared) = node.granularity {
        if Some(declared) != info.granularity {
            return Err(ConfigError::GranularityMismatch {
                node: node.id.clone(),
                declared,
                actual: info.granularity,
            });
        }
    }
    Ok(())
}

fn index_key(node: &NodeSpec, raw: i64) -> Result<IndexKey, ConfigError> {
    Ok(match node.index.unwrap_or(IndexDomain::Time) {
        IndexDomain::Time => IndexKey::Time {
            instant: raw,
            granularity: node
                .granularity
                .ok_or_else(|| ConfigError::MissingGranularity(node.id.clone()))?,
        },
        IndexDomain::Transaction => IndexKey::Transaction { id: raw },
        IndexDomain::Tick => IndexKey::Tick { id: raw },
    })
}

fn build_node(
    node: &NodeSpec,
    engine: &mut Engine,
    handles: &BTreeMap<String, Handle>,
) -> Result<Handle, ConfigError> {
    let get = |reference: &str| {
        handles
            .get(reference)
            .copied()
            .ok_or_else(|| ConfigError::UnknownReference {
                node: node.id.clone(),
                reference: reference.to_string(),
            })
    };
    let get_all = |references: &[String]| {
        references
            .iter()
            .map(|r| get(r.as_str()))
            .collect::<Result<Vec<_>, _>>()
    };
    let registry = |source: RegistryError| ConfigError::Registry {
        node: node.id.clone(),
        source,
    };

    let handle = match &node.kind {
        NodeKind::Dense { offset, values } => engine
            .create_dense(index_key(node, *offset)?, values.clone())
            .map_err(registry)?,
        NodeKind::Sparse { offset, entries } => {
            let handle = engine
                .create_sparse(index_key(node, *offset)?, &[])
                .map_err(registry)?;
            for entry in entries {
                engine
                    .set(handle, index_key(node, entry.at)?, entry.value)
                    .map_err(registry)?;
            }
            handle
        }
        NodeKind::TimeMap {
            offset,
            target_granularity,
            instants,
        } => engine
            .create_time_map(index_key(node, *offset)?, *target_granularity, instants)
            .map_err(registry)?,
        NodeKind::Cached { source, capacity } => {
            engine.create_cached(get(source)?, *capacity).map_err(registry)?
        }
        NodeKind::Sma { source, period } => {
            engine.create_sma(get(source)?, *period).map_err(registry)?
        }
        NodeKind::Ema {
            source,
            seed,
            period,
            accuracy,
            capacity,
        } => {
            let source = get(source)?;
            let seed = match seed {
                Some(seed) => get(seed)?,
                None => engine.create_sma(source, *period).map_err(registry)?,
            };
            engine
                .create_ema(source, seed, *period, *accuracy, *capacity)
                .map_err(registry)?
        }
        NodeKind::Slope { source } => engine.create_slope(get(source)?).map_err(registry)?,
        NodeKind::GapFill {
            source,
            max_run,
            capacity,
        } => engine
            .create_gap_fill(get(source)?, *max_run, *capacity)
            .map_err(registry)?,
        NodeKind::Envelope { source, percent } => engine
            .create_envelope(get(source)?, *percent)
            .map_err(registry)?,
        NodeKind::Cross { a, b } => engine.create_cross(get(a)?, get(b)?).map_err(registry)?,
        NodeKind::Zone {
            base,
            positive,
            negative,
        } => engine
            .create_zone(get(base)?, &get_all(positive)?, &get_all(negative)?)
            .map_err(registry)?,
        NodeKind::Combine { op, sources } => engine
            .create_combine(*op, &get_all(sources)?)
            .map_err(registry)?,
        NodeKind::Reindex { values, map } => engine
            .create_reindex(get(values)?, get(map)?)
            .map_err(registry)?,
        NodeKind::RunCount { source, capacity } => engine
            .create_run_count(get(source)?, *capacity)
            .map_err(registry)?,
        NodeKind::Resample {
            source,
            target_granularity,
        } => engine
            .create_resample(get(source)?, *target_granularity)
            .map_err(registry)?,
    };
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::QueryValue;

    const GRAPH: &str = r#"
        [[node]]
        id = "close"
        type = "dense"
        index = "tick"
        values = [1.0, 2.0, 3.0, 4.0, 5.0]

        [[node]]
        id = "ma3"
        type = "sma"
        index = "tick"
        source = "close"
        period = 3

        [[node]]
        id = "upper"
        type = "envelope"
        index = "tick"
        source = "ma3"
        percent = 10
    "#;

    #[test]
    fn parse_and_build() {
        let spec = GraphSpec::from_toml_str(GRAPH).unwrap();
        assert_eq!(spec.nodes.len(), 3);
        assert_eq!(
            spec.nodes[1].kind,
            NodeKind::Sma {
                source: "close".into(),
                period: 3
            }
        );

        let mut engine = Engine::new();
        let built = engine.load(&spec).unwrap();
        assert_eq!(built.len(), 3);
        let upper = built.handle("upper").unwrap();
        match engine.query(upper, IndexKey::Tick { id: 2 }).unwrap() {
            QueryValue::Real(v) => assert!((v - 2.2).abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fingerprint_tracks_parameters() {
        let a = GraphSpec::from_toml_str(GRAPH).unwrap();
        let b = GraphSpec::from_toml_str(&GRAPH.replace("period = 3", "period = 4")).unwrap();
        assert_eq!(a.fingerprint().unwrap(), a.clone().fingerprint().unwrap());
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn forward_reference_is_rejected() {
        let text = r#"
            [[node]]
            id = "ma"
            type = "sma"
            index = "tick"
            source = "close"
            period = 2

            [[node]]
            id = "close"
            type = "dense"
            index = "tick"
        "#;
        let spec = GraphSpec::from_toml_str(text).unwrap();
        let err = Engine::new().load(&spec).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownReference { ref reference, .. } if reference == "close"));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let text = r#"
            [[node]]
            id = "x"
            type = "dense"
            index = "tick"

            [[node]]
            id = "x"
            type = "dense"
            index = "tick"
        "#;
        let spec = GraphSpec::from_toml_str(text).unwrap();
        assert!(matches!(
            Engine::new().load(&spec),
            Err(ConfigError::DuplicateId(id)) if id == "x"
        ));
    }

    #[test]
    fn time_node_needs_granularity() {
        let text = r#"
            [[node]]
            id = "close"
            type = "dense"
            values = [1.0]
        "#;
        let spec = GraphSpec::from_toml_str(text).unwrap();
        assert!(matches!(
            Engine::new().load(&spec),
            Err(ConfigError::MissingGranularity(_))
        ));
    }

    #[test]
    fn registry_errors_carry_node_id() {
        let text = r#"
            [[node]]
            id = "close"
            type = "dense"
            index = "tick"

            [[node]]
            id = "bad"
            type = "sma"
            index = "tick"
            source = "close"
            period = 0
        "#;
        let spec = GraphSpec::from_toml_str(text).unwrap();
        let err = Engine::new().load(&spec).unwrap_err();
        assert!(err.to_string().starts_with("Node 'bad':"));
    }

    #[test]
    fn derived_nodes_inherit_domain() {
        let text = r#"
            [[node]]
            id = "close"
            type = "dense"
            index = "tick"
            values = [1.0, 2.0]

            [[node]]
            id = "ma"
            type = "sma"
            source = "close"
            period = 2
        "#;
        let spec = GraphSpec::from_toml_str(text).unwrap();
        let mut engine = Engine::new();
        let built = engine.load(&spec).unwrap();
        let ma = built.handle("ma").unwrap();
        assert_eq!(
            engine.query(ma, IndexKey::Tick { id: 1 }).unwrap(),
            QueryValue::Real(1.5)
        );
    }

    #[test]
    fn declared_domain_must_match_sources() {
        let base = r#"
            [[node]]
            id = "close"
            type = "dense"
            granularity = 60
            values = [1.0, 2.0]

            [[node]]
            id = "ma"
            type = "sma"
            source = "close"
            period = 2
        "#;
        let wrong_index = GraphSpec::from_toml_str(&format!("{base}index = \"tick\"\n")).unwrap();
        assert!(matches!(
            Engine::new().load(&wrong_index),
            Err(ConfigError::IndexMismatch { ref node, declared: IndexDomain::Tick, actual: IndexDomain::Time }) if node == "ma"
        ));

        let wrong_step = GraphSpec::from_toml_str(&format!("{base}granularity = 30\n")).unwrap();
        assert!(matches!(
            Engine::new().load(&wrong_step),
            Err(ConfigError::GranularityMismatch { declared: 30, actual: Some(60), .. })
        ));

        let agreeing =
            GraphSpec::from_toml_str(&format!("{base}index = \"time\"\ngranularity = 60\n")).unwrap();
        assert!(Engine::new().load(&agreeing).is_ok());
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let text = r#"
            [[node]]
            id = "x"
            type = "median"
        "#;
        assert!(matches!(
            GraphSpec::from_toml_str(text),
            Err(ConfigError::Parse(_))
        ));
    }
}
