use super::{
    AliasOracle, DeclaredTypeOracle, NodeContainer, PointsToOracle,
    RangeAnalysisConfig, RangeResult, TypeRangeOracle,
};
use hls_ir::{Function, Id};
use std::collections::{HashMap, hash_map::Entry};

/// Solved graphs of several functions. A graph is rebuilt when the
/// function has changed since it was analyzed.
pub struct RangeAnalysisCache {
    config: RangeAnalysisConfig,
    types: Box<dyn TypeRangeOracle>,
    alias: Box<dyn AliasOracle>,
    entries: HashMap<Id, NodeContainer>,
    /// Number of graphs built so far.
    builds: u64,
}

impl RangeAnalysisCache {
    pub fn new(config: RangeAnalysisConfig) -> Self {
        Self::with_oracles(
            config,
            Box::new(DeclaredTypeOracle),
            Box::new(PointsToOracle),
        )
    }

    pub fn with_oracles(
        config: RangeAnalysisConfig,
        types: Box<dyn TypeRangeOracle>,
        alias: Box<dyn AliasOracle>,
    ) -> Self {
        Self {
            config,
            types,
            alias,
            entries: HashMap::new(),
            builds: 0,
        }
    }

    /// Solved graph of `func`, computing it if missing or stale.
    pub fn get(&mut self, func: &Function) -> RangeResult<&NodeContainer> {
        let (types, alias) = (self.types.as_ref(), self.alias.as_ref());
        match self.entries.entry(func.name) {
            Entry::Occupied(e) if e.get().version() == func.version => {
                Ok(e.into_mut())
            }
            entry => {
                log::debug!(
                    "analyzing ranges of `{}` at version {}",
                    func.name,
                    func.version
                );
                let mut nc = NodeContainer::new(self.config.clone());
                nc.build(func, types, alias)?;
                nc.solve()?;
                self.builds += 1;
                Ok(match entry {
                    Entry::Occupied(mut e) => {
                        e.insert(nc);
                        e.into_mut()
                    }
                    Entry::Vacant(e) => e.insert(nc),
                })
            }
        }
    }

    /// Drop the graph of `name`.
    pub fn invalidate(&mut self, name: Id) -> bool {
        self.entries.remove(&name).is_some()
    }

    pub fn builds(&self) -> u64 {
        self.builds
    }
}
