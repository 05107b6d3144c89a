//! Multi-hop version chains
//!
//! A subsystem that changed across several releases describes each step
//! once, from one model version to the previous one. Transforming for an
//! older target then applies the hops in order, each consuming the output of
//! the one before.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{BuildResult, BuilderError};
use crate::transform::context::ModelVersion;
use crate::transform::description::builder::{ResourceTransformationDescriptionBuilder, TransformationDescription};

/// Collects the per-hop builders of one subsystem
#[derive(Debug)]
pub struct ChainedTransformationDescriptionBuilder {
    subsystem: String,
    current: ModelVersion,
    hops: BTreeMap<(ModelVersion, ModelVersion), ResourceTransformationDescriptionBuilder>,
}

impl ChainedTransformationDescriptionBuilder {
    /// Chain for `subsystem` whose newest model version is `current`
    pub fn new(subsystem: impl Into<String>, current: ModelVersion) -> Self {
        Self {
            subsystem: subsystem.into(),
            current,
            hops: BTreeMap::new(),
        }
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn current_version(&self) -> ModelVersion {
        self.current
    }

    /// Builder for the hop from `from` down to `to`
    pub fn create_builder(
        &mut self,
        from: ModelVersion,
        to: ModelVersion,
    ) -> &mut ResourceTransformationDescriptionBuilder {
        let subsystem = self.subsystem.clone();
        self.hops
            .entry((from, to))
            .or_insert_with(|| ResourceTransformationDescriptionBuilder::for_subsystem(&subsystem))
    }

    /// Hop descriptions to apply, in order, for each of `targets`
    ///
    /// Fails when a target cannot be reached from the current version.
    pub fn build(self, targets: &[ModelVersion]) -> BuildResult<BTreeMap<ModelVersion, Vec<TransformationDescription>>> {
        let mut next: BTreeMap<ModelVersion, (ModelVersion, TransformationDescription)> = BTreeMap::new();
        for ((from, to), builder) in self.hops {
            if to >= from {
                return Err(BuilderError::Invalid(format!(
                    "Hop {} -> {} of subsystem '{}' does not go to an older version",
                    from, to, self.subsystem
                )));
            }
            if next.insert(from, (to, builder.build())).is_some() {
                return Err(BuilderError::Invalid(format!(
                    "Subsystem '{}' has more than one hop from {}",
                    self.subsystem, from
                )));
            }
        }

        let mut chains = BTreeMap::new();
        for &target in targets {
            let mut version = self.current;
            let mut chain = Vec::new();
            while version != target {
                let broken = || BuilderError::BrokenChain {
                    from: version.to_string(),
                    to: target.to_string(),
                };
                let (to, description) = next.get(&version).ok_or_else(broken)?;
                if *to < target {
                    return Err(broken());
                }
                chain.push(description.clone());
                version = *to;
            }
            debug!(subsystem = %self.subsystem, target = %target, hops = chain.len(), "Built transformation chain");
            chains.insert(target, chain);
        }
        Ok(chains)
    }
}
