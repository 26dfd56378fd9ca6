// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Generic resource-grouped container shared by all four signal types.
//!
//! Every OTLP signal is, at the top level, a list of "resource X" groups, each
//! carrying a list of per-signal items (spans, data points, log records,
//! profile samples). Batch splitting (see `otelcol_core_batch`) needs to
//! preserve those resource-group boundaries where possible, so the split
//! logic is written once here instead of once per signal.

use crate::attribute::AttributeValue;
use std::collections::HashMap;

/// Attributes attached to a resource (e.g. `service.name`).
pub type ResourceAttrs = HashMap<String, AttributeValue>;

/// Something whose encoded size can be estimated, for the `byte_size`
/// operation pipeline data containers expose.
pub trait EstimateSize {
    /// Estimated number of bytes the encoded form of `self` would occupy.
    fn estimate_size(&self) -> usize;
}

impl EstimateSize for ResourceAttrs {
    fn estimate_size(&self) -> usize {
        self.iter()
            .map(|(k, v)| k.len() + v.estimate_size())
            .sum()
    }
}

/// One resource's worth of signal items.
#[derive(Debug, Clone, Default)]
pub struct ResourceGroup<I> {
    /// The resource's attributes.
    pub resource: ResourceAttrs,
    /// The items (spans / data points / log records / profile samples)
    /// reported under this resource.
    pub items: Vec<I>,
}

impl<I> ResourceGroup<I> {
    /// Creates a new, empty resource group.
    #[must_use]
    pub fn new(resource: ResourceAttrs) -> Self {
        Self {
            resource,
            items: Vec::new(),
        }
    }
}

/// A list of resource groups: the shape every signal container shares.
#[derive(Debug, Clone, Default)]
pub struct Container<I> {
    /// The resource groups, in arrival order.
    pub groups: Vec<ResourceGroup<I>>,
}

impl<I: EstimateSize> Container<I> {
    /// Total number of items (spans / points / records / samples) across all
    /// resource groups.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    /// Estimated encoded byte size across all resource groups.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.groups
            .iter()
            .map(|g| g.resource.estimate_size() + g.items.iter().map(EstimateSize::estimate_size).sum::<usize>())
            .sum()
    }

    /// Drains `self` and appends its resource groups onto `dst`, in
    /// O(resource-groups) time. `self` is left empty.
    pub fn move_and_append_to(&mut self, dst: &mut Self) {
        dst.groups.append(&mut self.groups);
    }

    /// Returns true if there are no items in any resource group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.items.is_empty())
    }

    /// Splits off exactly `n` items into a new container, preferring to move
    /// whole resource groups and only splitting a group's item list when a
    /// whole group would overflow `n`. `self` retains the remainder.
    ///
    /// Resource groups left fully empty by the split are dropped from `self`
    /// (an empty group carries no information a downstream consumer needs).
    #[must_use]
    pub fn split_off(&mut self, n: usize) -> Self {
        let mut out = Container { groups: Vec::new() };
        let mut remaining = n;
        let mut i = 0;
        while i < self.groups.len() && remaining > 0 {
            let group_len = self.groups[i].items.len();
            if group_len == 0 {
                i += 1;
                continue;
            }
            if group_len <= remaining {
                let g = self.groups.remove(i);
                remaining -= group_len;
                out.groups.push(g);
                // `remove` shifted the next group into index `i`; don't advance.
            } else {
                let resource = self.groups[i].resource.clone();
                let taken: Vec<I> = self.groups[i].items.drain(0..remaining).collect();
                out.groups.push(ResourceGroup {
                    resource,
                    items: taken,
                });
                remaining = 0;
                i += 1;
            }
        }
        out
    }
}

/// Capabilities a consumer advertises to callers wrapping it (limiter wiring,
/// batching). Mirrors the teacher's consumer capability negotiation: a
/// consumer that mutates the data it's handed forces upstream wrappers to
/// clone before further reuse. No consumer in this core sets `mutates_data`,
/// but the field is real API surface any future node can rely on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Whether the consumer mutates the data passed to it in place.
    pub mutates_data: bool,
}

/// Operations the rest of the core needs from a signal container, implemented
/// once for every `Container<I>` regardless of which signal `I` belongs to.
pub trait PipelineData: Sized {
    /// Number of items (spans / points / records / samples).
    fn item_count(&self) -> usize;
    /// Estimated encoded byte size.
    fn byte_size(&self) -> usize;
    /// Drains `self` into `dst`, appending its contents.
    fn move_and_append_to(&mut self, dst: &mut Self);
    /// True if there are no items at all.
    fn is_empty(&self) -> bool;
}

impl<I: EstimateSize> PipelineData for Container<I> {
    fn item_count(&self) -> usize {
        Container::item_count(self)
    }

    fn byte_size(&self) -> usize {
        Container::byte_size(self)
    }

    fn move_and_append_to(&mut self, dst: &mut Self) {
        Container::move_and_append_to(self, dst)
    }

    fn is_empty(&self) -> bool {
        Container::is_empty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(u8);

    impl EstimateSize for Item {
        fn estimate_size(&self) -> usize {
            1
        }
    }

    fn group(n: usize) -> ResourceGroup<Item> {
        let mut g = ResourceGroup::new(ResourceAttrs::new());
        g.items = (0..n).map(Item).collect();
        g
    }

    #[test]
    fn item_count_sums_across_groups() {
        let c = Container {
            groups: vec![group(3), group(2)],
        };
        assert_eq!(c.item_count(), 5);
    }

    #[test]
    fn move_and_append_drains_source() {
        let mut src = Container {
            groups: vec![group(3)],
        };
        let mut dst: Container<Item> = Container::default();
        src.move_and_append_to(&mut dst);
        assert!(src.is_empty());
        assert_eq!(dst.item_count(), 3);
    }

    #[test]
    fn split_off_prefers_whole_groups() {
        let mut c = Container {
            groups: vec![group(3), group(4)],
        };
        let taken = c.split_off(3);
        assert_eq!(taken.item_count(), 3);
        assert_eq!(c.item_count(), 4);
        assert_eq!(taken.groups.len(), 1);
    }

    #[test]
    fn split_off_splits_within_a_group_when_necessary() {
        let mut c = Container {
            groups: vec![group(10)],
        };
        let taken = c.split_off(4);
        assert_eq!(taken.item_count(), 4);
        assert_eq!(c.item_count(), 6);
    }

    #[test]
    fn split_off_never_exceeds_cap_across_groups() {
        let mut c = Container {
            groups: vec![group(2), group(2), group(2)],
        };
        let taken = c.split_off(3);
        assert_eq!(taken.item_count(), 3);
        assert_eq!(c.item_count(), 3);
    }

    #[test]
    fn capabilities_default_does_not_claim_mutation() {
        assert_eq!(Capabilities::default(), Capabilities { mutates_data: false });
    }
}
