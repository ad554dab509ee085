//! Routing policy
//!
//! A static table built once at startup with one entry per interface. Lookup
//! is keyed by the source interface only; frame content never picks a route.

use crate::codec::DecodeHook;
use crate::config::BridgeConfig;
use crate::types::TopologyError;
use std::collections::HashMap;

/// Position of a bus in the bridge's bus list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(pub usize);

/// What happens to frames read from one interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingEntry {
    pub source: BusId,
    pub destination: Option<BusId>,
    pub decode: Option<DecodeHook>,
}

/// Read-only source → (destination, decoder) table
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    entries: Vec<RoutingEntry>,
}

impl RoutingPolicy {
    /// Resolve the configured routes against the configured interfaces
    ///
    /// Bus ids follow the order of `config.interfaces`. Interfaces without a
    /// route get an entry that neither forwards nor decodes.
    pub fn from_config(config: &BridgeConfig) -> Result<Self, TopologyError> {
        if config.interfaces.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut ids: HashMap<&str, BusId> = HashMap::new();
        for (index, interface) in config.interfaces.iter().enumerate() {
            if ids.insert(interface.name.as_str(), BusId(index)).is_some() {
                return Err(TopologyError::DuplicateInterface(interface.name.clone()));
            }
        }

        let resolve = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| TopologyError::UnknownInterface(name.to_string()))
        };

        let mut entries: Vec<RoutingEntry> = (0..config.interfaces.len())
            .map(|index| RoutingEntry {
                source: BusId(index),
                destination: None,
                decode: None,
            })
            .collect();
        let mut routed = vec![false; entries.len()];

        for route in &config.routes {
            let source = resolve(&route.source)?;
            if routed[source.0] {
                return Err(TopologyError::DuplicateRoute(route.source.clone()));
            }
            routed[source.0] = true;

            let destination = route.destination.as_deref().map(resolve).transpose()?;
            entries[source.0] = RoutingEntry {
                source,
                destination,
                decode: route.decode,
            };
        }

        log::debug!("Routing table: {:?}", entries);
        Ok(Self { entries })
    }

    /// Entry for frames read from `source`
    pub fn route(&self, source: BusId) -> Option<&RoutingEntry> {
        self.entries.get(source.0)
    }

    /// Number of interfaces covered by the table
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    #[test]
    fn test_default_ring() {
        let policy = RoutingPolicy::from_config(&BridgeConfig::default()).unwrap();
        assert_eq!(policy.len(), 3);
        assert_eq!(policy.route(BusId(0)).unwrap().destination, Some(BusId(1)));
        assert_eq!(policy.route(BusId(1)).unwrap().destination, Some(BusId(2)));
        assert_eq!(policy.route(BusId(2)).unwrap().destination, Some(BusId(0)));
        assert_eq!(policy.route(BusId(0)).unwrap().decode, Some(DecodeHook::J1939));
        assert!(policy.route(BusId(3)).is_none());
    }

    #[test]
    fn test_unrouted_interface_is_monitor_only() {
        let config = BridgeConfig::empty()
            .add_interface("a", 500_000)
            .add_interface("b", 500_000)
            .add_route(RouteConfig::new("a").forward_to("b"));
        let policy = RoutingPolicy::from_config(&config).unwrap();

        let entry = policy.route(BusId(1)).unwrap();
        assert_eq!(entry.source, BusId(1));
        assert_eq!(entry.destination, None);
        assert_eq!(entry.decode, None);
    }

    #[test]
    fn test_unknown_destination_rejected() {
        let config = BridgeConfig::empty()
            .add_interface("a", 500_000)
            .add_route(RouteConfig::new("a").forward_to("z"));
        assert_eq!(
            RoutingPolicy::from_config(&config).unwrap_err(),
            TopologyError::UnknownInterface("z".into())
        );
    }

    #[test]
    fn test_duplicates_rejected() {
        let config = BridgeConfig::empty()
            .add_interface("a", 500_000)
            .add_interface("a", 250_000);
        assert_eq!(
            RoutingPolicy::from_config(&config).unwrap_err(),
            TopologyError::DuplicateInterface("a".into())
        );

        let config = BridgeConfig::empty()
            .add_interface("a", 500_000)
            .add_interface("b", 500_000)
            .add_route(RouteConfig::new("a").forward_to("b"))
            .add_route(RouteConfig::new("a"));
        assert_eq!(
            RoutingPolicy::from_config(&config).unwrap_err(),
            TopologyError::DuplicateRoute("a".into())
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(
            RoutingPolicy::from_config(&BridgeConfig::empty()).unwrap_err(),
            TopologyError::Empty
        );
    }
}
