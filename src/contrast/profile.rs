//! Per-side force bookkeeping
//!
//! Layout is fixed for a battle: bucket 0 is the ground aggregate, bucket 1
//! the space aggregate, then one bucket per contrast category in table
//! order. The aggregates double as the uncategorized catch-all buckets.

use serde::{Deserialize, Serialize};

use super::table::ContrastTable;
use crate::core::types::{CategoryMask, Domain};

pub const GROUND_TOTAL: usize = 0;
pub const SPACE_TOTAL: usize = 1;

/// Slack allowed when comparing category sums against an aggregate
const INVARIANT_TOLERANCE: f32 = 1e-3;

/// Remaining force of one category (or aggregate) for one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceBucket {
    pub category: CategoryMask,
    pub force: f32,
    pub is_ground: bool,
}

/// A side's remaining strength broken down by category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForceProfile {
    buckets: Vec<ForceBucket>,
}

impl ForceProfile {
    /// Zeroed profile for a battle in `domain`
    ///
    /// Category buckets belong to the battle's domain.
    pub fn for_domain(table: &ContrastTable, domain: Domain) -> Self {
        let is_ground = !domain.is_space();
        let mut buckets = Vec::with_capacity(table.len() + 2);
        buckets.push(ForceBucket {
            category: CategoryMask::NONE,
            force: 0.0,
            is_ground: true,
        });
        buckets.push(ForceBucket {
            category: CategoryMask::NONE,
            force: 0.0,
            is_ground: false,
        });
        buckets.extend(table.categories().map(|category| ForceBucket {
            category,
            force: 0.0,
            is_ground,
        }));
        Self { buckets }
    }

    pub fn buckets(&self) -> &[ForceBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn bucket(&self, index: usize) -> Option<&ForceBucket> {
        self.buckets.get(index)
    }

    pub fn force(&self, index: usize) -> f32 {
        self.buckets.get(index).map(|b| b.force).unwrap_or(0.0)
    }

    /// Index of the uncategorized bucket for a domain
    pub fn catch_all_index(is_ground: bool) -> usize {
        if is_ground {
            GROUND_TOTAL
        } else {
            SPACE_TOTAL
        }
    }

    pub fn aggregate(&self, domain: Domain) -> f32 {
        self.force(domain.aggregate_index())
    }

    pub fn set_aggregate(&mut self, domain: Domain, force: f32) {
        if let Some(bucket) = self.buckets.get_mut(domain.aggregate_index()) {
            bucket.force = force;
        }
    }

    /// First category bucket the mask falls into
    pub fn category_index(&self, categories: CategoryMask) -> Option<usize> {
        self.buckets
            .iter()
            .enumerate()
            .skip(2)
            .find(|(_, bucket)| bucket.category.intersects(categories))
            .map(|(index, _)| index)
    }

    /// Fold a unit's strength into its first matching category and the
    /// domain aggregate
    ///
    /// The aggregate always receives the strength, even for units no
    /// category matches.
    pub fn add_force(&mut self, domain: Domain, categories: CategoryMask, power: f32) {
        if let Some(index) = self.category_index(categories) {
            self.buckets[index].force += power;
        }
        if let Some(bucket) = self.buckets.get_mut(domain.aggregate_index()) {
            bucket.force += power;
        }
    }

    /// Remove force from a bucket
    pub fn subtract(&mut self, index: usize, amount: f32) {
        if let Some(bucket) = self.buckets.get_mut(index) {
            bucket.force -= amount;
        }
    }

    /// Sum of positive buckets, and whether any bucket was positive
    pub fn total_positive(&self) -> (f32, bool) {
        self.buckets
            .iter()
            .filter(|bucket| bucket.force > 0.0)
            .fold((0.0, false), |(total, _), bucket| (total + bucket.force, true))
    }

    /// Sum of the category buckets on one side of the ground/space split
    pub fn category_sum(&self, is_ground: bool) -> f32 {
        self.buckets
            .iter()
            .skip(2)
            .filter(|bucket| bucket.is_ground == is_ground)
            .map(|bucket| bucket.force)
            .sum()
    }

    /// Clamp every bucket at zero and scale category buckets down so they
    /// never exceed their domain aggregate
    pub fn clamp_and_rebalance(&mut self) {
        for bucket in &mut self.buckets {
            if bucket.force < 0.0 {
                bucket.force = 0.0;
            }
        }

        for is_ground in [true, false] {
            let aggregate = self.force(Self::catch_all_index(is_ground));
            let sum = self.category_sum(is_ground);
            if sum <= aggregate {
                continue;
            }
            let scale = if sum > 0.0 { aggregate / sum } else { 0.0 };
            for bucket in self.buckets.iter_mut().skip(2) {
                if bucket.is_ground == is_ground {
                    bucket.force *= scale;
                }
            }
        }
    }

    /// Whether every domain's category sum stays within its aggregate and
    /// no bucket is negative
    pub fn holds_invariant(&self) -> bool {
        let non_negative = self.buckets.iter().all(|bucket| bucket.force >= 0.0);
        non_negative
            && [true, false].iter().all(|is_ground| {
                let aggregate = self.force(Self::catch_all_index(*is_ground));
                self.category_sum(*is_ground) <= aggregate + INVARIANT_TOLERANCE * aggregate.max(1.0)
            })
    }
}
