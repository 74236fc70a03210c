//! Output registry deciding which hotplug notifications are real transitions.
//!
//! The X server may report the same connection state several times in a row
//! (mode changes, CRTC reassignments, duplicate notifies during a hotplug
//! storm). The registry remembers which outputs are currently connected so
//! only genuine connect/disconnect transitions are reported.

use crate::error::RegistryError;

/// Default number of outputs tracked at once.
pub const DEFAULT_CAPACITY: usize = 16;

/// Default maximum output name length in bytes.
pub const DEFAULT_MAX_NAME_LEN: usize = 256;

/// Result of feeding one observation to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Output was absent and is now tracked.
    NewlyConnected,
    /// Output was already tracked as connected.
    AlreadyConnected,
    /// Output was tracked and has been removed.
    NewlyDisconnected,
    /// Output was not tracked, nothing to remove.
    AlreadyDisconnected,
}

impl Outcome {
    /// Line prefix to print for this outcome, if it is a transition.
    pub fn marker(&self) -> Option<char> {
        match self {
            Outcome::NewlyConnected => Some('+'),
            Outcome::NewlyDisconnected => Some('-'),
            Outcome::AlreadyConnected | Outcome::AlreadyDisconnected => None,
        }
    }
}

/// Bounded set of currently connected output names.
///
/// Lookups are a linear scan; a machine has a handful of outputs at most.
#[derive(Debug, Clone)]
pub struct OutputRegistry {
    /// Connected output names, in insertion order
    connected: Vec<String>,
    /// Maximum number of tracked outputs
    capacity: usize,
    /// Maximum accepted name length in bytes
    max_name_len: usize,
}

impl OutputRegistry {
    /// Create an empty registry tracking at most `capacity` outputs.
    pub fn new(capacity: usize, max_name_len: usize) -> Self {
        Self {
            connected: Vec::with_capacity(capacity),
            capacity,
            max_name_len,
        }
    }

    /// Record that `name` is now connected (`connecting == true`) or
    /// disconnected, and report whether that was a state change.
    ///
    /// Invalid names and connections beyond capacity are rejected without
    /// touching the registry.
    pub fn update(&mut self, name: &str, connecting: bool) -> Result<Outcome, RegistryError> {
        self.check_name(name)?;

        match self.position(name) {
            Some(_) if connecting => Ok(Outcome::AlreadyConnected),
            Some(index) => {
                self.connected.remove(index);
                Ok(Outcome::NewlyDisconnected)
            }
            None if !connecting => Ok(Outcome::AlreadyDisconnected),
            None if self.is_full() => Err(RegistryError::CapacityExceeded {
                name: name.to_string(),
                capacity: self.capacity,
            }),
            None => {
                self.connected.push(name.to_string());
                Ok(Outcome::NewlyConnected)
            }
        }
    }

    fn check_name(&self, name: &str) -> Result<(), RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if name.len() > self.max_name_len {
            return Err(RegistryError::NameTooLong {
                len: name.len(),
                max: self.max_name_len,
            });
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.connected.iter().position(|n| n == name)
    }

    /// Check whether `name` is currently tracked as connected.
    #[cfg(test)]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterate over connected output names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connected.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.connected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.connected.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for OutputRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_MAX_NAME_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_connect_twice_reports_once() {
        let mut registry = OutputRegistry::default();
        assert_eq!(registry.update("HDMI-1", true), Ok(Outcome::NewlyConnected));
        assert_eq!(registry.update("HDMI-1", true), Ok(Outcome::AlreadyConnected));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_connect_then_disconnect() {
        let mut registry = OutputRegistry::default();
        assert_eq!(registry.update("DP-2", true), Ok(Outcome::NewlyConnected));
        assert_eq!(registry.update("DP-2", false), Ok(Outcome::NewlyDisconnected));
        assert!(!registry.contains("DP-2"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_disconnect_unseen_output() {
        let mut registry = OutputRegistry::default();
        assert_eq!(registry.update("VGA-1", false), Ok(Outcome::AlreadyDisconnected));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_capacity_exceeded_keeps_existing_entries() {
        let mut registry = OutputRegistry::default();
        for i in 0..DEFAULT_CAPACITY {
            let name = format!("OUT-{}", i);
            assert_eq!(registry.update(&name, true), Ok(Outcome::NewlyConnected));
        }
        assert!(registry.is_full());

        let result = registry.update("OUT-16", true);
        assert_eq!(
            result,
            Err(RegistryError::CapacityExceeded {
                name: "OUT-16".to_string(),
                capacity: DEFAULT_CAPACITY,
            })
        );
        assert!(!registry.contains("OUT-16"));

        // Every earlier output is still tracked and removable
        for i in 0..DEFAULT_CAPACITY {
            let name = format!("OUT-{}", i);
            assert!(registry.contains(&name));
            assert_eq!(registry.update(&name, false), Ok(Outcome::NewlyDisconnected));
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_slot_freed_after_disconnect() {
        let mut registry = OutputRegistry::new(1, DEFAULT_MAX_NAME_LEN);
        assert_eq!(registry.update("eDP-1", true), Ok(Outcome::NewlyConnected));
        assert!(registry.update("HDMI-1", true).is_err());
        assert_eq!(registry.update("eDP-1", false), Ok(Outcome::NewlyDisconnected));
        assert_eq!(registry.update("HDMI-1", true), Ok(Outcome::NewlyConnected));
    }

    #[test]
    fn test_full_registry_still_reports_known_outputs() {
        let mut registry = OutputRegistry::new(1, DEFAULT_MAX_NAME_LEN);
        registry.update("eDP-1", true).unwrap();
        assert_eq!(registry.update("eDP-1", true), Ok(Outcome::AlreadyConnected));
        assert_eq!(registry.update("DP-1", false), Ok(Outcome::AlreadyDisconnected));
    }

    #[test]
    fn test_name_validation() {
        let mut registry = OutputRegistry::new(4, 8);
        assert_eq!(registry.update("", true), Err(RegistryError::EmptyName));
        assert_eq!(
            registry.update("VERY-LONG-NAME", true),
            Err(RegistryError::NameTooLong { len: 14, max: 8 })
        );
        assert_eq!(registry.update("12345678", true), Ok(Outcome::NewlyConnected));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_names_keep_insertion_order() {
        let mut registry = OutputRegistry::default();
        registry.update("A", true).unwrap();
        registry.update("B", true).unwrap();
        registry.update("C", true).unwrap();
        registry.update("B", false).unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn test_outcome_markers() {
        assert_eq!(Outcome::NewlyConnected.marker(), Some('+'));
        assert_eq!(Outcome::NewlyDisconnected.marker(), Some('-'));
        assert_eq!(Outcome::AlreadyConnected.marker(), None);
        assert_eq!(Outcome::AlreadyDisconnected.marker(), None);
    }

    fn observation_strategy() -> impl Strategy<Value = (String, bool)> {
        (prop::sample::select(vec!["eDP-1", "HDMI-1", "HDMI-2", "DP-1", "DP-2", "DP-3", "VGA-1"]), any::<bool>())
            .prop_map(|(name, connecting)| (name.to_string(), connecting))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// The registry behaves like a bounded set: no duplicates, never over
        /// capacity, and every transition agrees with a plain HashSet model.
        #[test]
        fn prop_registry_matches_set_model(
            capacity in 1usize..=6,
            observations in prop::collection::vec(observation_strategy(), 0..64),
        ) {
            let mut registry = OutputRegistry::new(capacity, DEFAULT_MAX_NAME_LEN);
            let mut model: HashSet<String> = HashSet::new();

            for (name, connecting) in observations {
                let result = registry.update(&name, connecting);
                let was_present = model.contains(&name);

                match (was_present, connecting) {
                    (true, true) => prop_assert_eq!(result, Ok(Outcome::AlreadyConnected)),
                    (true, false) => {
                        model.remove(&name);
                        prop_assert_eq!(result, Ok(Outcome::NewlyDisconnected));
                    }
                    (false, false) => prop_assert_eq!(result, Ok(Outcome::AlreadyDisconnected)),
                    (false, true) if model.len() >= capacity => {
                        let is_capacity_error =
                            matches!(result, Err(RegistryError::CapacityExceeded { .. }));
                        prop_assert!(is_capacity_error);
                    }
                    (false, true) => {
                        model.insert(name.clone());
                        prop_assert_eq!(result, Ok(Outcome::NewlyConnected));
                    }
                }

                let names: Vec<&str> = registry.names().collect();
                let unique: HashSet<&str> = names.iter().copied().collect();
                prop_assert_eq!(names.len(), unique.len(), "Registry holds duplicates");
                prop_assert!(registry.len() <= capacity, "Registry exceeded capacity");
                prop_assert_eq!(registry.len(), model.len());
            }
        }

        /// Repeating the same observation never produces a second transition.
        #[test]
        fn prop_repeated_observation_is_idempotent(
            observation in observation_strategy(),
            repeats in 2usize..8,
        ) {
            let (name, connecting) = observation;
            let mut registry = OutputRegistry::default();
            let transitions = (0..repeats)
                .filter(|_| matches!(registry.update(&name, connecting), Ok(o) if o.marker().is_some()))
                .count();
            prop_assert_eq!(transitions, usize::from(connecting));
        }
    }
}
