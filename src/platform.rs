//! Minimal platform model: hosts and links.
//!
//! Stands in for a full discrete-event kernel's host/link model, scoped to
//! exactly what the head controller needs to compute action durations:
//! compute speed, RAM/core/disk capacity, and link bandwidth/latency.

use std::collections::HashMap;

/// A named compute host: the head node, a compute node, or the remote
/// image repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Host {
    pub name: String,
    pub cores: u32,
    pub ram_bytes: u64,
    pub disk_bytes: u64,
    /// Compute speed in floating-point operations per second.
    pub flop_rate: f64,
}

impl Host {
    pub fn new(name: impl Into<String>, cores: u32, ram_bytes: u64, disk_bytes: u64, flop_rate: f64) -> Self {
        Self {
            name: name.into(),
            cores,
            ram_bytes,
            disk_bytes,
            flop_rate,
        }
    }

    /// Simulated seconds to perform `flops` floating-point operations on one core.
    pub fn compute_seconds(&self, flops: f64) -> f64 {
        if self.flop_rate <= 0.0 {
            return 0.0;
        }
        flops / self.flop_rate
    }
}

/// A network link between two named endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub bandwidth_bytes_per_sec: f64,
    pub latency_secs: f64,
}

impl Link {
    pub fn new(bandwidth_bytes_per_sec: f64, latency_secs: f64) -> Self {
        Self {
            bandwidth_bytes_per_sec,
            latency_secs,
        }
    }

    /// Simulated seconds to transfer `bytes` over this link.
    pub fn transfer_seconds(&self, bytes: u64) -> f64 {
        if self.bandwidth_bytes_per_sec <= 0.0 {
            return self.latency_secs;
        }
        self.latency_secs + (bytes as f64) / self.bandwidth_bytes_per_sec
    }
}

/// The federation's hosts and links, supplied at `HeadController` construction.
#[derive(Debug, Clone)]
pub struct Platform {
    pub head_node: Host,
    pub repository: Host,
    pub compute_nodes: Vec<Host>,
    /// Link used between the head node and the remote repository.
    pub repository_link: Link,
    /// Link used between the head node and each compute node (uniform for simplicity).
    pub head_to_node_link: Link,
}

impl Platform {
    pub fn compute_host(&self, name: &str) -> Option<&Host> {
        self.compute_nodes.iter().find(|h| h.name == name)
    }

    pub fn compute_host_names(&self) -> Vec<String> {
        self.compute_nodes.iter().map(|h| h.name.clone()).collect()
    }

    /// Map of compute node name to RAM capacity in bytes.
    pub fn ram_capacities(&self) -> HashMap<String, u64> {
        self.compute_nodes
            .iter()
            .map(|h| (h.name.clone(), h.ram_bytes))
            .collect()
    }

    /// The largest RAM capacity across all compute nodes, used to validate
    /// `ram_limit` at registration time.
    pub fn max_node_ram(&self) -> u64 {
        self.compute_nodes.iter().map(|h| h.ram_bytes).max().unwrap_or(0)
    }
}
