//! Write-once binding table from step name to deployed address.

use std::collections::HashMap;

use alloy_core::primitives::Address;

use crate::{
    Identity,
    error::ConfigError,
    plan::{AbiValue, InputSpec},
};

/// Addresses of the steps completed so far, in completion order.
#[derive(Debug, Clone, Default)]
pub struct AddressResolver {
    order: Vec<String>,
    addresses: HashMap<String, Address>,
}

impl AddressResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the address of a completed step. A step can be resolved only once.
    pub fn set(&mut self, name: &str, address: Address) -> Result<(), ConfigError> {
        if self.addresses.contains_key(name) {
            return Err(ConfigError::AlreadyResolved(name.to_string()));
        }
        self.addresses.insert(name.to_string(), address);
        self.order.push(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Address, ConfigError> {
        self.addresses
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnresolvedReference(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.addresses.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resolved `(step, address)` pairs in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.addresses[name]))
    }

    /// Turn declared inputs into concrete argument values.
    ///
    /// Fails on the first step reference that has not been resolved yet.
    pub fn resolve_inputs(
        &self,
        inputs: &[InputSpec],
        identity: &Identity,
    ) -> Result<Vec<AbiValue>, ConfigError> {
        inputs
            .iter()
            .map(|input| match input {
                InputSpec::Literal(value) => Ok(value.clone()),
                InputSpec::Identity => Ok(AbiValue::Address(identity.address())),
                InputSpec::Step(name) => self.get(name).map(AbiValue::Address),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_set_then_get() {
        let mut resolver = AddressResolver::new();
        resolver.set("auth", addr(1)).unwrap();

        assert_eq!(resolver.get("auth"), Ok(addr(1)));
        assert!(resolver.contains("auth"));
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_set_is_write_once() {
        let mut resolver = AddressResolver::new();
        resolver.set("auth", addr(1)).unwrap();

        assert_eq!(
            resolver.set("auth", addr(2)),
            Err(ConfigError::AlreadyResolved("auth".into()))
        );
        assert_eq!(resolver.get("auth"), Ok(addr(1)));
    }

    #[test]
    fn test_get_missing_is_unresolved() {
        let resolver = AddressResolver::new();
        assert_eq!(
            resolver.get("wallet"),
            Err(ConfigError::UnresolvedReference("wallet".into()))
        );
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_iter_keeps_completion_order() {
        let mut resolver = AddressResolver::new();
        resolver.set("zeta", addr(1)).unwrap();
        resolver.set("alpha", addr(2)).unwrap();

        let names: Vec<_> = resolver.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_resolve_inputs_substitutes_references() {
        let identity = Identity::new(addr(0xaa));
        let mut resolver = AddressResolver::new();
        resolver.set("auth", addr(1)).unwrap();

        let args = resolver
            .resolve_inputs(
                &[
                    InputSpec::Identity,
                    InputSpec::step("auth"),
                    InputSpec::Literal(AbiValue::Bool(true)),
                ],
                &identity,
            )
            .unwrap();

        assert_eq!(
            args,
            vec![
                AbiValue::Address(addr(0xaa)),
                AbiValue::Address(addr(1)),
                AbiValue::Bool(true),
            ]
        );
    }

    #[test]
    fn test_resolve_inputs_fails_on_unresolved() {
        let identity = Identity::new(addr(0xaa));
        let resolver = AddressResolver::new();

        let result = resolver.resolve_inputs(&[InputSpec::step("spentSet")], &identity);
        assert_eq!(
            result,
            Err(ConfigError::UnresolvedReference("spentSet".into()))
        );
    }
}
