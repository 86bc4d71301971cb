//! Network profile and server settings

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{ClientError, Result};

/// Port the bridge listens on unless `PORT` says otherwise.
pub const DEFAULT_API_PORT: u16 = 8080;

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkProfile {
    pub client: ClientSection,
    #[serde(default)]
    pub organizations: Vec<OrganizationConfig>,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    /// Organization whose admins `enroll_org_admin` acts for.
    pub organization: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationConfig {
    pub name: String,
    #[serde(default)]
    pub msp_id: String,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub peers: Vec<String>,
    #[serde(default)]
    pub registrations: Vec<Registration>,
}

/// A user registered with an organization's CA, waiting to be enrolled.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub user_id: String,
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default)]
    pub chaincodes: Vec<String>,
    /// Empty means every organization peer joined the channel.
    #[serde(default)]
    pub peers: Vec<String>,
}

impl NetworkProfile {
    pub fn from_toml(source: &str) -> Result<Self> {
        let mut profile: NetworkProfile = toml::from_str(source)?;

        for org in &mut profile.organizations {
            if org.msp_id.is_empty() {
                org.msp_id = default_msp_id(&org.name);
            }
        }
        let all_peers = profile.all_peers();
        for channel in &mut profile.channels {
            if channel.peers.is_empty() {
                channel.peers = all_peers.clone();
            }
        }

        profile.validate()?;
        Ok(profile)
    }

    pub fn organization(&self, name: &str) -> Option<&OrganizationConfig> {
        self.organizations.iter().find(|o| o.name == name)
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Every peer of every organization, in declaration order.
    pub fn all_peers(&self) -> Vec<String> {
        self.organizations
            .iter()
            .flat_map(|o| o.peers.iter().cloned())
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.organizations.is_empty() {
            return Err(ClientError::Config(
                "at least one organization must be configured".to_string(),
            ));
        }
        if self.channels.is_empty() {
            return Err(ClientError::Config(
                "at least one channel must be configured".to_string(),
            ));
        }
        if self.organizations.iter().any(|o| o.name.is_empty()) {
            return Err(ClientError::Config(
                "organization name cannot be empty".to_string(),
            ));
        }
        if self.channels.iter().any(|c| c.name.is_empty()) {
            return Err(ClientError::Config("channel name cannot be empty".to_string()));
        }
        if self.organization(&self.client.organization).is_none() {
            return Err(ClientError::Config(format!(
                "client organization {} is not defined",
                self.client.organization
            )));
        }

        let known: HashSet<String> = self.all_peers().into_iter().collect();
        for channel in &self.channels {
            if let Some(peer) = channel.peers.iter().find(|p| !known.contains(*p)) {
                return Err(ClientError::Config(format!(
                    "channel {} references unknown peer {}",
                    channel.name, peer
                )));
            }
        }

        Ok(())
    }
}

/// Read and validate the network profile at `path`.
pub fn load_profile(path: &Path) -> Result<NetworkProfile> {
    let source = fs::read_to_string(path).map_err(|e| {
        ClientError::Config(format!("unable to read {}: {}", path.display(), e))
    })?;
    NetworkProfile::from_toml(&source)
}

/// Listening port, taken from `PORT` when it holds a valid number.
pub fn api_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_API_PORT)
}

fn default_msp_id(org: &str) -> String {
    format!("{}MSP", org)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
        [client]
        organization = "Org1"

        [[organizations]]
        name = "Org1"
        admins = ["admin"]
        peers = ["peer0.org1", "peer1.org1"]
        registrations = [{ user_id = "appuser", secret = "pw" }]

        [[organizations]]
        name = "Org2"
        msp_id = "SecondMSP"
        peers = ["peer0.org2"]

        [[channels]]
        name = "mychannel"
        chaincodes = ["kvstore"]

        [[channels]]
        name = "private"
        chaincodes = ["kvstore"]
        peers = ["peer0.org1"]
    "#;

    #[test]
    fn test_profile_defaults() {
        let profile = NetworkProfile::from_toml(PROFILE).unwrap();
        assert_eq!(profile.organization("Org1").unwrap().msp_id, "Org1MSP");
        assert_eq!(profile.organization("Org2").unwrap().msp_id, "SecondMSP");
        assert_eq!(
            profile.channel("mychannel").unwrap().peers,
            vec!["peer0.org1", "peer1.org1", "peer0.org2"]
        );
        assert_eq!(profile.channel("private").unwrap().peers, vec!["peer0.org1"]);
    }

    #[test]
    fn test_profile_rejects_unknown_client_org() {
        let source = PROFILE.replace(r#"organization = "Org1""#, r#"organization = "Org9""#);
        let err = NetworkProfile::from_toml(&source).unwrap_err();
        assert!(matches!(err, ClientError::Config(msg) if msg.contains("Org9")));
    }

    #[test]
    fn test_profile_rejects_unknown_channel_peer() {
        let source = PROFILE.replace(r#"peers = ["peer0.org1"]"#, r#"peers = ["peer7"]"#);
        let err = NetworkProfile::from_toml(&source).unwrap_err();
        assert!(matches!(err, ClientError::Config(msg) if msg.contains("peer7")));
    }

    #[test]
    fn test_profile_requires_channels() {
        let source = r#"
            [client]
            organization = "Org1"
            [[organizations]]
            name = "Org1"
        "#;
        assert!(matches!(
            NetworkProfile::from_toml(source),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_profile_rejects_malformed_toml() {
        assert!(matches!(
            NetworkProfile::from_toml("[client"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_shipped_devnet_profile_is_valid() {
        let profile = NetworkProfile::from_toml(include_str!("../config/devnet.toml")).unwrap();
        assert_eq!(profile.client.organization, "Org1");
        assert_eq!(profile.channel("mychannel").unwrap().peers.len(), 3);
    }

    #[test]
    fn test_load_profile_missing_file() {
        let err = load_profile(Path::new("/nonexistent/profile.toml")).unwrap_err();
        assert!(matches!(err, ClientError::Config(msg) if msg.contains("unable to read")));
    }
}
