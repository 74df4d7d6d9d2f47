//! Wi-Fi networks reported by a unit, and the credentials sent back to it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Wi-Fi network the unit can see.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub name: String,
}

impl WifiNetwork {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for WifiNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// De-duplicated list of networks decoded from a device report.
///
/// Both transports produce this shape so network selection downstream does
/// not care which transport filled it.  Entries keep the order in which they
/// were first seen; later duplicates and empty names are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkList {
    networks: Vec<WifiNetwork>,
}

impl NetworkList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from raw names, skipping empty names and duplicates.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::new();
        for name in names {
            list.insert(name.as_ref());
        }
        list
    }

    /// Appends `name` unless it is empty or already present.
    ///
    /// Returns `true` when the list grew.
    pub fn insert(&mut self, name: &str) -> bool {
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.networks.push(WifiNetwork::new(name));
        true
    }

    /// Returns `true` if a network called `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.networks.iter().any(|n| n.name == name)
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WifiNetwork> {
        self.networks.iter()
    }

    /// Returns the network names in first-seen order.
    pub fn names(&self) -> Vec<&str> {
        self.networks.iter().map(|n| n.name.as_str()).collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for NetworkList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_names(iter)
    }
}

/// Wi-Fi credentials typed in by the user.
///
/// Held only in session memory.  The password is redacted from `Debug` output
/// so it cannot leak through structured logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: String,
    pub password: String,
}

impl Credentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }

    /// Returns the `<ssid>|<password>` body shared by both provisioning transports.
    pub fn to_pipe_payload(&self) -> String {
        format!("{}|{}", self.ssid, self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_names_drops_duplicates_and_empty_names() {
        // Arrange / Act
        let list = NetworkList::from_names(["Home", "", "Office", "Home"]);

        // Assert
        assert_eq!(list.names(), vec!["Home", "Office"]);
    }

    #[test]
    fn test_insert_reports_whether_list_grew() {
        let mut list = NetworkList::new();
        assert!(list.insert("Home"));
        assert!(!list.insert("Home"));
        assert!(!list.insert(""));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_collect_into_network_list() {
        let list: NetworkList = vec!["a", "b", "a"].into_iter().collect();
        assert_eq!(list.len(), 2);
        assert!(list.contains("b"));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        // Arrange
        let creds = Credentials::new("Home_WiFi", "secret1");

        // Act
        let rendered = format!("{creds:?}");

        // Assert
        assert!(rendered.contains("Home_WiFi"));
        assert!(!rendered.contains("secret1"), "password must not appear in Debug");
    }

    #[test]
    fn test_credentials_pipe_payload() {
        let creds = Credentials::new("Home_WiFi", "secret1");
        assert_eq!(creds.to_pipe_payload(), "Home_WiFi|secret1");
    }
}
