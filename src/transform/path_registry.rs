//! Address-keyed configuration trie
//!
//! Each node holds an optional config and, per child key, a map of literal
//! children plus a separate wildcard child. Lookups prefer the literal
//! child over the wildcard for every segment.

use std::collections::BTreeMap;

use tracing::trace;

use crate::model::{PathAddress, PathElement};

/// Children registered under one key
#[derive(Debug, Clone)]
struct KeyedChildren<T> {
    literal: BTreeMap<String, PathAddressConfigRegistry<T>>,
    wildcard: Option<Box<PathAddressConfigRegistry<T>>>,
}

impl<T> Default for KeyedChildren<T> {
    fn default() -> Self {
        Self {
            literal: BTreeMap::new(),
            wildcard: None,
        }
    }
}

/// Trie of configs keyed by path element
#[derive(Debug, Clone)]
pub struct PathAddressConfigRegistry<T> {
    config: Option<T>,
    children: BTreeMap<String, KeyedChildren<T>>,
}

impl<T> Default for PathAddressConfigRegistry<T> {
    fn default() -> Self {
        Self {
            config: None,
            children: BTreeMap::new(),
        }
    }
}

impl<T> PathAddressConfigRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config stored at this node
    pub fn config(&self) -> Option<&T> {
        self.config.as_ref()
    }

    pub fn config_mut(&mut self) -> Option<&mut T> {
        self.config.as_mut()
    }

    /// Store `config` at `address`, returning any config it replaces
    pub fn register(&mut self, address: &PathAddress, config: T) -> Option<T> {
        self.node_mut(address).config.replace(config)
    }

    /// Node at `address` (wildcards taken literally), created on demand
    pub fn node_mut(&mut self, address: &PathAddress) -> &mut PathAddressConfigRegistry<T> {
        let mut node = self;
        for element in address.iter() {
            let keyed = node.children.entry(element.key().to_string()).or_default();
            node = if element.is_wildcard() {
                &mut **keyed.wildcard.get_or_insert_with(Box::default)
            } else {
                keyed.literal.entry(element.value().to_string()).or_default()
            };
        }
        node
    }

    /// Child node matching `element`; a literal child wins over the wildcard
    pub fn child(&self, element: &PathElement) -> Option<&PathAddressConfigRegistry<T>> {
        let keyed = self.children.get(element.key())?;
        if !element.is_wildcard() {
            if let Some(literal) = keyed.literal.get(element.value()) {
                return Some(literal);
            }
        }
        keyed.wildcard.as_deref()
    }

    /// Node matching `address`, following literal-then-wildcard per segment
    pub fn node(&self, address: &PathAddress) -> Option<&PathAddressConfigRegistry<T>> {
        address
            .iter()
            .try_fold(self, |node, element| node.child(element))
    }

    /// Config registered for `address`, or `None` when unmanaged
    pub fn get_config(&self, address: &PathAddress) -> Option<&T> {
        let found = self.node(address).and_then(|node| node.config());
        trace!(address = %address, found = found.is_some(), "Path registry lookup");
        found
    }

    /// Configs of every matched node from the root down to `address`
    ///
    /// Stops at the first segment with no matching node.
    pub fn configs_along(&self, address: &PathAddress) -> Vec<(usize, &T)> {
        let mut found = Vec::new();
        let mut node = self;
        if let Some(config) = node.config() {
            found.push((0, config));
        }
        for (depth, element) in address.iter().enumerate() {
            match node.child(element) {
                Some(child) => node = child,
                None => break,
            }
            if let Some(config) = node.config() {
                found.push((depth + 1, config));
            }
        }
        found
    }

    /// Whether no config is registered anywhere in this trie
    pub fn is_empty(&self) -> bool {
        self.config.is_none()
            && self.children.values().all(|keyed| {
                keyed.literal.values().all(PathAddressConfigRegistry::is_empty)
                    && keyed.wildcard.as_deref().map_or(true, PathAddressConfigRegistry::is_empty)
            })
    }
}
