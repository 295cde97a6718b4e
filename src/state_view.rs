//! StateView: a read-only snapshot of the system given to the scheduler.

use std::collections::{HashMap, HashSet};

use crate::function::Image;
use crate::platform::Platform;
use crate::residency::{ImageResidency, NodeBudgets};

/// A borrowed snapshot of compute-node capacity and image residency. The
/// scheduler may read but never mutate; the controller mutates only after
/// `schedule` returns.
pub struct StateView<'a> {
    platform: &'a Platform,
    budgets: &'a NodeBudgets,
    residency: &'a ImageResidency,
}

impl<'a> StateView<'a> {
    pub fn new(platform: &'a Platform, budgets: &'a NodeBudgets, residency: &'a ImageResidency) -> Self {
        Self {
            platform,
            budgets,
            residency,
        }
    }

    pub fn compute_hosts(&self) -> Vec<String> {
        self.platform.compute_host_names()
    }

    pub fn available_cores(&self) -> HashMap<String, u32> {
        self.platform
            .compute_host_names()
            .into_iter()
            .map(|n| {
                let cores = self.budgets.available_cores(&n);
                (n, cores)
            })
            .collect()
    }

    pub fn available_ram(&self) -> HashMap<String, u64> {
        self.platform
            .compute_host_names()
            .into_iter()
            .map(|n| {
                let ram = self.budgets.available_ram(&n);
                (n, ram)
            })
            .collect()
    }

    pub fn available_disk(&self) -> HashMap<String, u64> {
        self.platform
            .compute_host_names()
            .into_iter()
            .map(|n| {
                let disk = self.budgets.available_disk(&n);
                (n, disk)
            })
            .collect()
    }

    pub fn is_image_on_node(&self, node: &str, image: &Image) -> bool {
        self.residency.is_on_node_disk(node, image)
    }

    pub fn is_image_being_copied(&self, node: &str, image: &Image) -> bool {
        self.residency.is_copying(node, image)
    }

    pub fn is_image_in_ram(&self, node: &str, image: &Image) -> bool {
        self.residency.is_in_ram(node, image)
    }

    pub fn is_image_being_loaded(&self, node: &str, image: &Image) -> bool {
        self.residency.is_loading(node, image)
    }

    pub fn images_being_copied(&self, node: &str) -> HashSet<Image> {
        self.residency.images_being_copied(node)
    }

    pub fn images_being_loaded(&self, node: &str) -> HashSet<Image> {
        self.residency.images_being_loaded(node)
    }

    pub fn is_image_on_head_disk(&self, image: &Image) -> bool {
        self.residency.on_head_disk.contains(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Host, Link};

    fn platform() -> Platform {
        Platform {
            head_node: Host::new("head", 4, 1 << 30, 1 << 30, 1.0e9),
            repository: Host::new("repo", 1, 0, 0, 1.0),
            compute_nodes: vec![Host::new("n0", 4, 64 << 30, 1 << 40, 1.0e9)],
            repository_link: Link::new(1.0e9, 0.0),
            head_to_node_link: Link::new(1.0e9, 0.0),
        }
    }

    #[test]
    fn view_reflects_residency_and_budgets() {
        let platform = platform();
        let mut residency = ImageResidency::new();
        let budgets = NodeBudgets::new([("n0".to_string(), 4, 64 << 30, 1 << 40)], 1 << 30);
        let image = Image::new("img", 100);
        residency.start_copy("n0", image.clone());

        let view = StateView::new(&platform, &budgets, &residency);
        assert!(view.is_image_being_copied("n0", &image));
        assert!(!view.is_image_on_node("n0", &image));
        assert_eq!(view.compute_hosts(), vec!["n0".to_string()]);
        assert_eq!(view.available_cores()["n0"], 4);
    }
}
