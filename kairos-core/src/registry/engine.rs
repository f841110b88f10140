//! Engine: handle table plus one typed graph per index domain.
//!
//! Nodes live in the graph of their index domain and are stored as shared
//! trait objects, one variant per value domain. Dependents hold their own
//! `Rc` to each source, so destroying a handle never invalidates them.

use super::error::RegistryError;
use super::wire::{IndexDomain, IndexKey, ValueDomain, WirePresence, WireResult, WireStatus};
use super::Handle;
use crate::combinator::{Cross, CrossState, FuncN, Reindex, Zone, ZoneId};
use crate::eval::{EvalResult, Presence};
use crate::index::{Granularity, Sequence, TickId, Time, TransactionId};
use crate::indicator::{Indicator, IndicatorExt};
use crate::source::{DenseSeries, SparseSeries};
use crate::transform::{Cached, Ema, Envelope, GapFill, Resample, RunCount, Slope, Sma};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

type Result<T> = std::result::Result<T, RegistryError>;

pub type RealNode<S> = Rc<dyn Indicator<Seq = S, Val = f64>>;
pub type SignalNode<S> = Rc<dyn Indicator<Seq = S, Val = i32>>;
pub type SparseNode<S> = Rc<dyn Indicator<Seq = S, Val = Presence<f64>>>;

// ─── Node storage ────────────────────────────────────────────────────

#[derive(Clone)]
enum Node<S: Sequence> {
    Real(RealNode<S>),
    Signal(SignalNode<S>),
    Sparse(SparseNode<S>),
    TimeMap {
        map: Rc<DenseSeries<S, Time>>,
        target: Granularity,
    },
}

impl<S: Sequence> Node<S> {
    fn value_domain(&self) -> ValueDomain {
        match self {
            Node::Real(_) => ValueDomain::Real,
            Node::Signal(_) => ValueDomain::Signal,
            Node::Sparse(_) => ValueDomain::Sparse,
            Node::TimeMap { .. } => ValueDomain::TimeMap,
        }
    }
}

enum Writer<S: Sequence> {
    Dense(Rc<DenseSeries<S, f64>>),
    Sparse(Rc<SparseSeries<S, f64>>),
}

struct Entry<S: Sequence> {
    node: Node<S>,
    writer: Option<Writer<S>>,
    granularity: Option<Granularity>,
    kind: &'static str,
}

impl<S: Sequence> Entry<S> {
    fn derived(node: Node<S>, granularity: Option<Granularity>, kind: &'static str) -> Self {
        Self {
            node,
            writer: None,
            granularity,
            kind,
        }
    }

    fn mismatch(&self, handle: Handle, expected: ValueDomain) -> RegistryError {
        RegistryError::ValueDomainMismatch {
            handle,
            expected,
            actual: self.node.value_domain(),
        }
    }

    fn real(&self, handle: Handle) -> Result<RealNode<S>> {
        match &self.node {
            Node::Real(node) => Ok(Rc::clone(node)),
            _ => Err(self.mismatch(handle, ValueDomain::Real)),
        }
    }

    fn signal(&self, handle: Handle) -> Result<SignalNode<S>> {
        match &self.node {
            Node::Signal(node) => Ok(Rc::clone(node)),
            _ => Err(self.mismatch(handle, ValueDomain::Signal)),
        }
    }

    fn sparse(&self, handle: Handle) -> Result<SparseNode<S>> {
        match &self.node {
            Node::Sparse(node) => Ok(Rc::clone(node)),
            _ => Err(self.mismatch(handle, ValueDomain::Sparse)),
        }
    }
}

pub(crate) struct Graph<S: Sequence> {
    entries: HashMap<Handle, Entry<S>>,
}

impl<S: Sequence> Default for Graph<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

// ─── Index domains ───────────────────────────────────────────────────

/// Ties a concrete index type to its domain tag and its graph in the engine.
pub(crate) trait DomainIndex: Sequence + 'static {
    const DOMAIN: IndexDomain;

    fn from_key(key: IndexKey) -> Result<Self>;

    fn granularity(&self) -> Option<Granularity> {
        None
    }

    fn graph(engine: &Engine) -> &Graph<Self>;

    fn graph_mut(engine: &mut Engine) -> &mut Graph<Self>;
}

fn domain_mismatch(expected: IndexDomain, key: IndexKey) -> RegistryError {
    RegistryError::IndexDomainMismatch {
        expected,
        actual: key.domain(),
    }
}

pub(crate) fn granularity_from_seconds(seconds: i64) -> Result<Granularity> {
    if seconds <= 0 {
        return Err(RegistryError::invalid(
            "granularity",
            format!("must be positive, got {seconds}"),
        ));
    }
    Ok(Granularity::new(seconds))
}

fn aligned_time(instant: i64, granularity: Granularity) -> Result<Time> {
    if !granularity.is_aligned(instant) {
        return Err(RegistryError::invalid(
            "instant",
            format!("{instant} is not aligned to {granularity}"),
        ));
    }
    Ok(Time::new(instant, granularity))
}

impl DomainIndex for Time {
    const DOMAIN: IndexDomain = IndexDomain::Time;

    fn from_key(key: IndexKey) -> Result<Self> {
        match key {
            IndexKey::Time {
                instant,
                granularity,
            } => aligned_time(instant, granularity_from_seconds(granularity)?),
            other => Err(domain_mismatch(Self::DOMAIN, other)),
        }
    }

    fn granularity(&self) -> Option<Granularity> {
        Some(Time::granularity(self))
    }

    fn graph(engine: &Engine) -> &Graph<Self> {
        &engine.time
    }

    fn graph_mut(engine: &mut Engine) -> &mut Graph<Self> {
        &mut engine.time
    }
}

impl DomainIndex for TransactionId {
    const DOMAIN: IndexDomain = IndexDomain::Transaction;

    fn from_key(key: IndexKey) -> Result<Self> {
        match key {
            IndexKey::Transaction { id } => Ok(TransactionId(id)),
            other => Err(domain_mismatch(Self::DOMAIN, other)),
        }
    }

    fn graph(engine: &Engine) -> &Graph<Self> {
        &engine.transaction
    }

    fn graph_mut(engine: &mut Engine) -> &mut Graph<Self> {
        &mut engine.transaction
    }
}

impl DomainIndex for TickId {
    const DOMAIN: IndexDomain = IndexDomain::Tick;

    fn from_key(key: IndexKey) -> Result<Self> {
        match key {
            IndexKey::Tick { id } => Ok(TickId(id)),
            other => Err(domain_mismatch(Self::DOMAIN, other)),
        }
    }

    fn graph(engine: &Engine) -> &Graph<Self> {
        &engine.tick
    }

    fn graph_mut(engine: &mut Engine) -> &mut Graph<Self> {
        &mut engine.tick
    }
}

/// Run `$body` with `$S` bound to the index type of `$domain`.
macro_rules! with_domain {
    ($domain:expr, $S:ident => $body:expr) => {
        match $domain {
            IndexDomain::Time => {
                type $S = Time;
                $body
            }
            IndexDomain::Transaction => {
                type $S = TransactionId;
                $body
            }
            IndexDomain::Tick => {
                type $S = TickId;
                $body
            }
        }
    };
}

// ─── Public records ──────────────────────────────────────────────────

/// Reduction applied by a combine node across its sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineOp {
    Sum,
    /// First source minus every other source.
    Difference,
    Product,
    Mean,
    Min,
    Max,
}

impl CombineOp {
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            CombineOp::Sum => values.iter().sum(),
            CombineOp::Difference => match values.split_first() {
                Some((first, rest)) => rest.iter().fold(*first, |acc, v| acc - v),
                None => 0.0,
            },
            CombineOp::Product => values.iter().product(),
            CombineOp::Mean => values.iter().sum::<f64>() / values.len() as f64,
            CombineOp::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            CombineOp::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Query result of any value domain, for callers that do not know it upfront.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum QueryValue {
    Pending,
    Invalid,
    Real(f64),
    Signal(i32),
    Present(f64),
    Absent,
    Instant(i64),
}

impl QueryValue {
    fn lift<V>(result: EvalResult<V>, ready: impl FnOnce(V) -> QueryValue) -> QueryValue {
        match result {
            EvalResult::Ready(v) => ready(v),
            EvalResult::Pending => QueryValue::Pending,
            EvalResult::Invalid => QueryValue::Invalid,
        }
    }

    pub fn status(&self) -> WireStatus {
        match self {
            QueryValue::Pending => WireStatus::Pending,
            QueryValue::Invalid => WireStatus::Invalid,
            _ => WireStatus::Ready,
        }
    }

    /// Numeric payload, if any.
    pub fn number(&self) -> Option<f64> {
        match *self {
            QueryValue::Real(v) | QueryValue::Present(v) => Some(v),
            QueryValue::Signal(v) => Some(f64::from(v)),
            QueryValue::Instant(v) => Some(v as f64),
            QueryValue::Pending | QueryValue::Invalid | QueryValue::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    pub handle: Handle,
    pub kind: &'static str,
    pub index: IndexDomain,
    pub value: ValueDomain,
    pub granularity: Option<i64>,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Caller-owned registry of indicator nodes.
#[derive(Default)]
pub struct Engine {
    time: Graph<Time>,
    transaction: Graph<TransactionId>,
    tick: Graph<TickId>,
    domains: HashMap<Handle, IndexDomain>,
    next_handle: u64,
}

fn require_positive(name: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(RegistryError::invalid(name, "must be >= 1"));
    }
    Ok(())
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.domains.contains_key(&handle)
    }

    pub fn domain_of(&self, handle: Handle) -> Result<IndexDomain> {
        self.domains
            .get(&handle)
            .copied()
            .ok_or(RegistryError::UnknownHandle(handle))
    }

    fn entry<S: DomainIndex>(&self, handle: Handle) -> Result<&Entry<S>> {
        S::graph(self)
            .entries
            .get(&handle)
            .ok_or(RegistryError::UnknownHandle(handle))
    }

    fn insert<S: DomainIndex>(&mut self, entry: Entry<S>) -> Handle {
        self.next_handle += 1;
        let handle = Handle::new(self.next_handle);
        debug!(
            "created {} node {handle}: {} -> {}",
            entry.kind,
            S::DOMAIN,
            entry.node.value_domain()
        );
        S::graph_mut(self).entries.insert(handle, entry);
        self.domains.insert(handle, S::DOMAIN);
        handle
    }

    /// Index domain shared by every handle in `handles`.
    fn common_domain(&self, handles: &[Handle]) -> Result<IndexDomain> {
        let (first, rest) = handles
            .split_first()
            .ok_or_else(|| RegistryError::invalid("sources", "at least one source is required"))?;
        let expected = self.domain_of(*first)?;
        for handle in rest {
            let actual = self.domain_of(*handle)?;
            if actual != expected {
                return Err(RegistryError::IndexDomainMismatch { expected, actual });
            }
        }
        Ok(expected)
    }

    /// Granularity shared by every handle in `handles` (time domain only).
    fn common_granularity<S: DomainIndex>(&self, handles: &[Handle]) -> Result<Option<Granularity>> {
        let mut common: Option<Granularity> = None;
        for handle in handles {
            let g = self.entry::<S>(*handle)?.granularity;
            match (common, g) {
                (Some(expected), Some(actual)) if expected != actual => {
                    return Err(RegistryError::GranularityMismatch { expected, actual });
                }
                (None, g) => common = g,
                _ => {}
            }
        }
        Ok(common)
    }

    fn reals<S: DomainIndex>(&self, handles: &[Handle]) -> Result<Vec<RealNode<S>>> {
        handles
            .iter()
            .map(|h| self.entry::<S>(*h)?.real(*h))
            .collect()
    }

    // ─── Sources ─────────────────────────────────────────────────────

    /// Dense real-valued source starting at `offset`.
    pub fn create_dense(&mut self, offset: IndexKey, values: Vec<f64>) -> Result<Handle> {
        with_domain!(offset.domain(), S => self.build_dense::<S>(offset, values))
    }

    fn build_dense<S: DomainIndex>(&mut self, offset: IndexKey, values: Vec<f64>) -> Result<Handle> {
        let start = S::from_key(offset)?;
        let series = Rc::new(DenseSeries::from_vec(start, values));
        let node: RealNode<S> = series.clone();
        Ok(self.insert(Entry {
            node: Node::Real(node),
            writer: Some(Writer::Dense(series)),
            granularity: start.granularity(),
            kind: "dense",
        }))
    }

    /// Sparse real-valued source; `None` entries mark absent slots.
    pub fn create_sparse(&mut self, offset: IndexKey, values: &[Option<f64>]) -> Result<Handle> {
        with_domain!(offset.domain(), S => self.build_sparse::<S>(offset, values))
    }

    fn build_sparse<S: DomainIndex>(&mut self, offset: IndexKey, values: &[Option<f64>]) -> Result<Handle> {
        let start = S::from_key(offset)?;
        let series = Rc::new(SparseSeries::from_options(start, values.iter().copied()));
        let node: SparseNode<S> = series.clone();
        Ok(self.insert(Entry {
            node: Node::Sparse(node),
            writer: Some(Writer::Sparse(series)),
            granularity: start.granularity(),
            kind: "sparse",
        }))
    }

    /// Map from `offset`'s domain to time instants at `target_seconds` granularity.
    pub fn create_time_map(&mut self, offset: IndexKey, target_seconds: i64, instants: &[i64]) -> Result<Handle> {
        with_domain!(offset.domain(), S => self.build_time_map::<S>(offset, target_seconds, instants))
    }

    fn build_time_map<S: DomainIndex>(
        &mut self,
        offset: IndexKey,
        target_seconds: i64,
        instants: &[i64],
    ) -> Result<Handle> {
        let start = S::from_key(offset)?;
        let target = granularity_from_seconds(target_seconds)?;
        let times = instants
            .iter()
            .map(|&instant| aligned_time(instant, target))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.insert(Entry {
            node: Node::TimeMap {
                map: Rc::new(DenseSeries::from_vec(start, times)),
                target,
            },
            writer: None,
            granularity: start.granularity(),
            kind: "time_map",
        }))
    }

    /// Append to a dense source.
    pub fn append(&mut self, handle: Handle, value: f64) -> Result<()> {
        with_domain!(self.domain_of(handle)?, S => {
            match &self.entry::<S>(handle)?.writer {
                Some(Writer::Dense(series)) => {
                    series.append(value);
                    Ok(())
                }
                _ => Err(RegistryError::NotWritable(handle)),
            }
        })
    }

    /// Append an instant to a time map.
    pub fn append_instant(&mut self, handle: Handle, instant: i64) -> Result<()> {
        with_domain!(self.domain_of(handle)?, S => {
            match &self.entry::<S>(handle)?.node {
                Node::TimeMap { map, target } => {
                    map.append(aligned_time(instant, *target)?);
                    Ok(())
                }
                _ => Err(RegistryError::NotWritable(handle)),
            }
        })
    }

    /// Write to a sparse source. `None` records an explicit absence.
    pub fn set(&mut self, handle: Handle, key: IndexKey, value: Option<f64>) -> Result<()> {
        with_domain!(self.domain_of(handle)?, S => self.write_sparse::<S>(handle, key, value))
    }

    fn write_sparse<S: DomainIndex>(&mut self, handle: Handle, key: IndexKey, value: Option<f64>) -> Result<()> {
        let (entry, seq) = self.resolve::<S>(handle, key)?;
        let series = match &entry.writer {
            Some(Writer::Sparse(series)) => series,
            _ => return Err(RegistryError::NotWritable(handle)),
        };
        if seq < series.offset() {
            return Err(RegistryError::OutOfOrderWrite {
                handle,
                reason: format!("{key} is before the series offset"),
            });
        }
        if let Some(hw) = series.high_water() {
            if seq <= hw {
                return Err(RegistryError::OutOfOrderWrite {
                    handle,
                    reason: format!("{key} is not past the high-water mark"),
                });
            }
        }
        match value {
            Some(v) => series.set(seq, v),
            None => series.mark_absent(seq),
        }
        Ok(())
    }

    // ─── Transforms ──────────────────────────────────────────────────

    pub fn create_cached(&mut self, source: Handle, capacity: usize) -> Result<Handle> {
        require_positive("capacity", capacity)?;
        with_domain!(self.domain_of(source)?, S => self.build_cached::<S>(source, capacity))
    }

    fn build_cached<S: DomainIndex>(&mut self, source: Handle, capacity: usize) -> Result<Handle> {
        let entry = self.entry::<S>(source)?;
        let node = match &entry.node {
            Node::Real(n) => Node::Real(Rc::new(Cached::new(Rc::clone(n), capacity))),
            Node::Signal(n) => Node::Signal(Rc::new(Cached::new(Rc::clone(n), capacity))),
            Node::Sparse(n) => Node::Sparse(Rc::new(Cached::new(Rc::clone(n), capacity))),
            Node::TimeMap { .. } => return Err(entry.mismatch(source, ValueDomain::Real)),
        };
        let granularity = entry.granularity;
        Ok(self.insert(Entry::derived(node, granularity, "cached")))
    }

    pub fn create_sma(&mut self, source: Handle, period: usize) -> Result<Handle> {
        require_positive("period", period)?;
        with_domain!(self.domain_of(source)?, S => {
            let entry = self.entry::<S>(source)?;
            let node: RealNode<S> = Rc::new(Sma::new(entry.real(source)?, period));
            let granularity = entry.granularity;
            Ok(self.insert(Entry::derived(Node::Real(node), granularity, "sma")))
        })
    }

    /// Exponential average of `source`, seeded by `seed` (typically an SMA).
    pub fn create_ema(
        &mut self,
        source: Handle,
        seed: Handle,
        period: usize,
        accuracy: f64,
        capacity: usize,
    ) -> Result<Handle> {
        require_positive("period", period)?;
        require_positive("capacity", capacity)?;
        if !(accuracy > 0.0 && accuracy < 1.0) {
            return Err(RegistryError::invalid(
                "accuracy",
                format!("must be in (0, 1), got {accuracy}"),
            ));
        }
        with_domain!(self.common_domain(&[source, seed])?, S => {
            let granularity = self.common_granularity::<S>(&[source, seed])?;
            let src = self.entry::<S>(source)?.real(source)?;
            let seed_node = self.entry::<S>(seed)?.real(seed)?;
            let node: RealNode<S> = Rc::new(Ema::new(src, seed_node, period, accuracy, capacity));
            Ok(self.insert(Entry::derived(Node::Real(node), granularity, "ema")))
        })
    }

    pub fn create_slope(&mut self, source: Handle) -> Result<Handle> {
        with_domain!(self.domain_of(source)?, S => {
            let entry = self.entry::<S>(source)?;
            let node: RealNode<S> = Rc::new(Slope::new(entry.real(source)?));
            let granularity = entry.granularity;
            Ok(self.insert(Entry::derived(Node::Real(node), granularity, "slope")))
        })
    }

    /// Forward-fill a sparse source across at most `max_run` absent slots.
    pub fn create_gap_fill(&mut self, source: Handle, max_run: usize, capacity: usize) -> Result<Handle> {
        require_positive("capacity", capacity)?;
        with_domain!(self.domain_of(source)?, S => {
            let entry = self.entry::<S>(source)?;
            let node: RealNode<S> = Rc::new(GapFill::new(entry.sparse(source)?, max_run, capacity));
            let granularity = entry.granularity;
            Ok(self.insert(Entry::derived(Node::Real(node), granularity, "gap_fill")))
        })
    }

    /// Band at `percent` above (or below, if negative) the source.
    pub fn create_envelope(&mut self, source: Handle, percent: f64) -> Result<Handle> {
        if !percent.is_finite() {
            return Err(RegistryError::invalid("percent", format!("must be finite, got {percent}")));
        }
        with_domain!(self.domain_of(source)?, S => {
            let entry = self.entry::<S>(source)?;
            let node: RealNode<S> = Rc::new(Envelope::from_percent(entry.real(source)?, percent));
            let granularity = entry.granularity;
            Ok(self.insert(Entry::derived(Node::Real(node), granularity, "envelope")))
        })
    }

    /// Length of the run of equal values ending at each index, as a signal.
    pub fn create_run_count(&mut self, source: Handle, capacity: usize) -> Result<Handle> {
        require_positive("capacity", capacity)?;
        with_domain!(self.domain_of(source)?, S => self.build_run_count::<S>(source, capacity))
    }

    fn build_run_count<S: DomainIndex>(&mut self, source: Handle, capacity: usize) -> Result<Handle> {
        fn code(n: usize) -> i32 {
            i32::try_from(n).unwrap_or(i32::MAX)
        }
        let entry = self.entry::<S>(source)?;
        let node: SignalNode<S> = match &entry.node {
            Node::Real(n) => Rc::new(RunCount::new(Rc::clone(n), capacity).map(code)),
            Node::Signal(n) => Rc::new(RunCount::new(Rc::clone(n), capacity).map(code)),
            Node::Sparse(n) => Rc::new(RunCount::new(Rc::clone(n), capacity).map(code)),
            Node::TimeMap { .. } => return Err(entry.mismatch(source, ValueDomain::Real)),
        };
        let granularity = entry.granularity;
        Ok(self.insert(Entry::derived(Node::Signal(node), granularity, "run_count")))
    }

    /// Re-express a time-indexed real source at another granularity.
    pub fn create_resample(&mut self, source: Handle, target_seconds: i64) -> Result<Handle> {
        let actual = self.domain_of(source)?;
        if actual != IndexDomain::Time {
            return Err(RegistryError::IndexDomainMismatch {
                expected: IndexDomain::Time,
                actual,
            });
        }
        let target = granularity_from_seconds(target_seconds)?;
        let entry = self.entry::<Time>(source)?;
        let source_granularity = entry
            .granularity
            .ok_or_else(|| RegistryError::invalid("source", "time node without granularity"))?;
        let node: SparseNode<Time> = Rc::new(Resample::new(entry.real(source)?, source_granularity, target));
        Ok(self.insert(Entry::derived(Node::Sparse(node), Some(target), "resample")))
    }

    // ─── Combinators ─────────────────────────────────────────────────

    /// Crossover of `a` over `b`, as signal codes 0 / +1 / -1.
    pub fn create_cross(&mut self, a: Handle, b: Handle) -> Result<Handle> {
        with_domain!(self.common_domain(&[a, b])?, S => {
            let granularity = self.common_granularity::<S>(&[a, b])?;
            let a_node = self.entry::<S>(a)?.real(a)?;
            let b_node = self.entry::<S>(b)?.real(b)?;
            let node: SignalNode<S> = Rc::new(Cross::new(a_node, b_node).map(CrossState::code));
            Ok(self.insert(Entry::derived(Node::Signal(node), granularity, "cross")))
        })
    }

    /// Zone of `base` against ascending `positive` and descending `negative` lines.
    pub fn create_zone(&mut self, base: Handle, positive: &[Handle], negative: &[Handle]) -> Result<Handle> {
        let all: Vec<Handle> = std::iter::once(base)
            .chain(positive.iter().copied())
            .chain(negative.iter().copied())
            .collect();
        with_domain!(self.common_domain(&all)?, S => {
            let granularity = self.common_granularity::<S>(&all)?;
            let zone = Zone::new(
                self.entry::<S>(base)?.real(base)?,
                self.reals::<S>(positive)?,
                self.reals::<S>(negative)?,
            );
            let node: SignalNode<S> = Rc::new(zone.map(|z: ZoneId| z.0));
            Ok(self.insert(Entry::derived(Node::Signal(node), granularity, "zone")))
        })
    }

    /// Pointwise reduction of several real sources.
    pub fn create_combine(&mut self, op: CombineOp, sources: &[Handle]) -> Result<Handle> {
        with_domain!(self.common_domain(sources)?, S => {
            let granularity = self.common_granularity::<S>(sources)?;
            let inputs = self.reals::<S>(sources)?;
            let node: RealNode<S> = Rc::new(FuncN::new(inputs, move |vals: &[f64]| op.apply(vals)));
            Ok(self.insert(Entry::derived(Node::Real(node), granularity, "combine")))
        })
    }

    /// Read the time-indexed `values` through the time map `map`.
    pub fn create_reindex(&mut self, values: Handle, map: Handle) -> Result<Handle> {
        let actual = self.domain_of(values)?;
        if actual != IndexDomain::Time {
            return Err(RegistryError::IndexDomainMismatch {
                expected: IndexDomain::Time,
                actual,
            });
        }
        with_domain!(self.domain_of(map)?, S => self.build_reindex::<S>(values, map))
    }

    fn build_reindex<S: DomainIndex>(&mut self, values: Handle, map: Handle) -> Result<Handle> {
        let map_entry = self.entry::<S>(map)?;
        let (lookup, target) = match &map_entry.node {
            Node::TimeMap { map: lookup, target } => (Rc::clone(lookup), *target),
            _ => return Err(map_entry.mismatch(map, ValueDomain::TimeMap)),
        };
        let granularity = map_entry.granularity;

        let value_entry = self.entry::<Time>(values)?;
        if let Some(actual) = value_entry.granularity {
            if actual != target {
                return Err(RegistryError::GranularityMismatch {
                    expected: target,
                    actual,
                });
            }
        }
        let node = match &value_entry.node {
            Node::Real(v) => Node::Real(Rc::new(Reindex::new(Rc::clone(v), lookup)) as RealNode<S>),
            Node::Signal(v) => Node::Signal(Rc::new(Reindex::new(Rc::clone(v), lookup)) as SignalNode<S>),
            Node::Sparse(v) => Node::Sparse(Rc::new(Reindex::new(Rc::clone(v), lookup)) as SparseNode<S>),
            Node::TimeMap { .. } => return Err(value_entry.mismatch(values, ValueDomain::Real)),
        };
        Ok(self.insert(Entry::derived(node, granularity, "reindex")))
    }

    /// Drop a handle. Dependents keep their own reference to the node.
    pub fn destroy(&mut self, handle: Handle) -> Result<()> {
        let domain = self.domain_of(handle)?;
        with_domain!(domain, S => {
            S::graph_mut(self).entries.remove(&handle);
        });
        self.domains.remove(&handle);
        debug!("destroyed node {handle}");
        Ok(())
    }

    // ─── Queries ─────────────────────────────────────────────────────

    fn resolve<S: DomainIndex>(&self, handle: Handle, key: IndexKey) -> Result<(&Entry<S>, S)> {
        let entry = self.entry::<S>(handle)?;
        let seq = S::from_key(key)?;
        if let (Some(expected), Some(actual)) = (entry.granularity, seq.granularity()) {
            if expected != actual {
                return Err(RegistryError::GranularityMismatch { expected, actual });
            }
        }
        Ok((entry, seq))
    }

    pub fn value_real(&self, handle: Handle, key: IndexKey) -> Result<WireResult<f64>> {
        with_domain!(self.domain_of(handle)?, S => {
            let (entry, seq) = self.resolve::<S>(handle, key)?;
            Ok(entry.real(handle)?.value(seq).into())
        })
    }

    pub fn value_signal(&self, handle: Handle, key: IndexKey) -> Result<WireResult<i32>> {
        with_domain!(self.domain_of(handle)?, S => {
            let (entry, seq) = self.resolve::<S>(handle, key)?;
            Ok(entry.signal(handle)?.value(seq).into())
        })
    }

    pub fn value_sparse(&self, handle: Handle, key: IndexKey) -> Result<WireResult<WirePresence<f64>>> {
        with_domain!(self.domain_of(handle)?, S => {
            let (entry, seq) = self.resolve::<S>(handle, key)?;
            let wire: EvalResult<WirePresence<f64>> =
                entry.sparse(handle)?.value(seq).map(WirePresence::from);
            Ok(wire.into())
        })
    }

    /// Evaluate any node, whatever its value domain.
    pub fn query(&self, handle: Handle, key: IndexKey) -> Result<QueryValue> {
        with_domain!(self.domain_of(handle)?, S => {
            let (entry, seq) = self.resolve::<S>(handle, key)?;
            Ok(match &entry.node {
                Node::Real(n) => QueryValue::lift(n.value(seq), QueryValue::Real),
                Node::Signal(n) => QueryValue::lift(n.value(seq), QueryValue::Signal),
                Node::Sparse(n) => QueryValue::lift(n.value(seq), |p| match p {
                    Presence::Present(v) => QueryValue::Present(v),
                    Presence::Absent => QueryValue::Absent,
                }),
                Node::TimeMap { map, .. } => {
                    QueryValue::lift(map.value(seq), |t| QueryValue::Instant(t.instant()))
                }
            })
        })
    }

    pub fn node_info(&self, handle: Handle) -> Result<NodeInfo> {
        with_domain!(self.domain_of(handle)?, S => {
            let entry = self.entry::<S>(handle)?;
            Ok(NodeInfo {
                handle,
                kind: entry.kind,
                index: S::DOMAIN,
                value: entry.node.value_domain(),
                granularity: entry.granularity.map(Granularity::seconds),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(id: i64) -> IndexKey {
        IndexKey::Tick { id }
    }

    #[test]
    fn dense_sma_through_handles() {
        let mut engine = Engine::new();
        let src = engine.create_dense(tick(0), vec![1.0, 2.0, 3.0]).unwrap();
        let sma = engine.create_sma(src, 2).unwrap();

        assert_eq!(engine.value_real(sma, tick(0)).unwrap().status, WireStatus::Invalid);
        assert_eq!(engine.value_real(sma, tick(2)).unwrap().value, 2.5);
        assert_eq!(engine.value_real(sma, tick(3)).unwrap().status, WireStatus::Pending);

        engine.append(src, 5.0).unwrap();
        assert_eq!(engine.value_real(sma, tick(3)).unwrap().value, 4.0);
    }

    #[test]
    fn rejects_domain_and_parameter_errors() {
        let mut engine = Engine::new();
        let ticks = engine.create_dense(tick(0), vec![1.0]).unwrap();
        let txs = engine
            .create_dense(IndexKey::Transaction { id: 0 }, vec![1.0])
            .unwrap();

        assert!(matches!(
            engine.create_cross(ticks, txs),
            Err(RegistryError::IndexDomainMismatch { .. })
        ));
        assert!(matches!(
            engine.create_sma(ticks, 0),
            Err(RegistryError::InvalidParam { name: "period", .. })
        ));
        assert!(matches!(
            engine.create_ema(ticks, ticks, 3, 1.5, 8),
            Err(RegistryError::InvalidParam { name: "accuracy", .. })
        ));
        assert!(matches!(
            engine.value_real(ticks, IndexKey::Transaction { id: 0 }),
            Err(RegistryError::IndexDomainMismatch { .. })
        ));
    }

    #[test]
    fn value_domain_is_checked() {
        let mut engine = Engine::new();
        let src = engine.create_dense(tick(0), vec![1.0, 2.0]).unwrap();
        let cross = engine.create_cross(src, src).unwrap();
        assert!(matches!(
            engine.value_real(cross, tick(0)),
            Err(RegistryError::ValueDomainMismatch { .. })
        ));
        assert_eq!(engine.value_signal(cross, tick(1)).unwrap().value, 0);
        assert!(matches!(
            engine.create_gap_fill(src, 1, 4),
            Err(RegistryError::ValueDomainMismatch { .. })
        ));
    }

    #[test]
    fn time_granularity_is_checked() {
        let mut engine = Engine::new();
        let s5 = engine
            .create_dense(IndexKey::Time { instant: 0, granularity: 5 }, vec![1.0])
            .unwrap();
        let m1 = engine
            .create_dense(IndexKey::Time { instant: 0, granularity: 60 }, vec![1.0])
            .unwrap();
        assert!(matches!(
            engine.create_combine(CombineOp::Sum, &[s5, m1]),
            Err(RegistryError::GranularityMismatch { .. })
        ));
        assert!(matches!(
            engine.value_real(s5, IndexKey::Time { instant: 0, granularity: 60 }),
            Err(RegistryError::GranularityMismatch { .. })
        ));
        assert!(matches!(
            engine.create_dense(IndexKey::Time { instant: 3, granularity: 5 }, vec![]),
            Err(RegistryError::InvalidParam { name: "instant", .. })
        ));
    }

    #[test]
    fn sparse_writes_must_advance() {
        let mut engine = Engine::new();
        let src = engine.create_sparse(tick(0), &[Some(1.0)]).unwrap();
        engine.set(src, tick(2), Some(3.0)).unwrap();
        assert!(matches!(
            engine.set(src, tick(1), Some(2.0)),
            Err(RegistryError::OutOfOrderWrite { .. })
        ));
        assert_eq!(
            engine.query(src, tick(1)).unwrap(),
            QueryValue::Absent
        );
        assert!(matches!(engine.append(src, 1.0), Err(RegistryError::NotWritable(_))));
    }

    #[test]
    fn destroy_keeps_dependents_alive() {
        let mut engine = Engine::new();
        let src = engine.create_dense(tick(0), vec![1.0, 3.0]).unwrap();
        let slope = engine.create_slope(src).unwrap();
        engine.destroy(src).unwrap();

        assert!(!engine.contains(src));
        assert_eq!(engine.value_real(slope, tick(1)).unwrap().value, 2.0);
        assert_eq!(
            engine.value_real(src, tick(1)),
            Err(RegistryError::UnknownHandle(src))
        );
        assert_eq!(engine.destroy(src), Err(RegistryError::UnknownHandle(src)));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn combine_ops() {
        assert_eq!(CombineOp::Sum.apply(&[1.0, 2.0, 3.0]), 6.0);
        assert_eq!(CombineOp::Difference.apply(&[10.0, 2.0, 3.0]), 5.0);
        assert_eq!(CombineOp::Product.apply(&[2.0, 4.0]), 8.0);
        assert_eq!(CombineOp::Mean.apply(&[2.0, 4.0]), 3.0);
        assert_eq!(CombineOp::Min.apply(&[2.0, -4.0]), -4.0);
        assert_eq!(CombineOp::Max.apply(&[2.0, -4.0]), 2.0);
    }

    #[test]
    fn node_info_reports_tags() {
        let mut engine = Engine::new();
        let src = engine
            .create_dense(IndexKey::Time { instant: 0, granularity: 60 }, vec![1.0])
            .unwrap();
        let info = engine.node_info(src).unwrap();
        assert_eq!(info.kind, "dense");
        assert_eq!(info.index, IndexDomain::Time);
        assert_eq!(info.value, ValueDomain::Real);
        assert_eq!(info.granularity, Some(60));
    }
}
