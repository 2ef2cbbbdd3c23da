//! Network Monitoring Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tracing::debug;

/// Desktop network monitor implementation
///
/// Provides basic connectivity detection via a TCP reachability probe.
///
/// Note: Platform-specific implementations (Linux netlink, macOS
/// SystemConfiguration, Windows WinAPI) would be more robust but require
/// additional dependencies.
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
}

impl DesktopNetworkMonitor {
    /// Create a new network monitor with the default probe target
    pub fn new() -> Self {
        Self {
            probe_addr: "8.8.8.8:53".to_string(),
            probe_timeout: Duration::from_secs(5),
        }
    }

    /// Create a monitor probing a custom address
    pub fn with_probe_addr(probe_addr: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            probe_addr: probe_addr.into(),
            probe_timeout,
        }
    }

    /// Check network connectivity by attempting a TCP connection
    async fn check_connectivity(&self) -> NetworkStatus {
        match tokio::time::timeout(
            self.probe_timeout,
            tokio::net::TcpStream::connect(&self.probe_addr),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) | Err(_) => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.check_connectivity().await;

        let info = NetworkInfo {
            status,
            network_type: if status == NetworkStatus::Connected {
                // Desktop can't easily distinguish WiFi from Ethernet without
                // platform-specific APIs
                Some(NetworkType::Other)
            } else {
                None
            },
            // Desktop connections are typically not metered
            is_metered: false,
        };

        debug!(status = ?status, "Network info updated");

        Ok(info)
    }
}
