//! Calling-region construction, partitioning and shard assignment.
//!
//! The calling span starts as every reconciled contig end to end, optionally
//! narrowed by include specs and cut by exclude specs. The span is then split
//! into bounded-size pieces in a fixed genomic order (contig order, then
//! start order) and, when shard parameters are set, each piece is kept by
//! exactly one shard via round-robin on the piece index. Every downstream
//! consumer depends on that ordering staying stable.

use crate::contigs::Contig;
use crate::core::errors::{Error, Result};
use crate::ranges::{RangeSet, Region};
use rustc_hash::FxHashMap;

/// Build the set of regions to call from whole-contig spans, an optional
/// include list and an optional exclude list (region literals or BED paths).
///
/// An empty result is a hard error: it almost always means the include or
/// exclude specs name contigs differently than the reference does.
pub fn build_calling_regions(
    contigs: &[Contig],
    regions_to_include: &[String],
    regions_to_exclude: &[String],
) -> Result<RangeSet> {
    let full_span = RangeSet::from_contigs(contigs);

    let mut calling_regions = if regions_to_include.is_empty() {
        full_span
    } else {
        let includes = RangeSet::from_regions(regions_to_include, Some(contigs))?;
        full_span.intersection(&includes)
    };

    if !regions_to_exclude.is_empty() {
        let excludes = RangeSet::from_regions(regions_to_exclude, Some(contigs))?;
        calling_regions.exclude_regions(&excludes);
    }

    if calling_regions.is_empty() {
        return Err(Error::EmptyCallingRegions);
    }
    Ok(calling_regions)
}

/// Partition the calling span into pieces of at most `partition_size` bp and,
/// when `shard` is `(task_id, num_shards)`, keep piece `i` iff
/// `i % num_shards == task_id`.
pub fn regions_to_process(
    contigs: &[Contig],
    partition_size: u64,
    calling_regions: Option<&RangeSet>,
    shard: Option<(u32, u32)>,
) -> Result<Vec<Region>> {
    if partition_size == 0 {
        return Err(Error::config("partition size must be >= 1"));
    }
    if let Some((task_id, num_shards)) = shard {
        if num_shards == 0 {
            return Err(Error::config("num_shards must be >= 1"));
        }
        if task_id >= num_shards {
            return Err(Error::config(format!(
                "task_id={} should be >= 0 and < num_shards={}",
                task_id, num_shards
            )));
        }
    }

    let mut regions = RangeSet::from_contigs(contigs);
    if let Some(calling) = calling_regions {
        regions = regions.intersection(calling);
    }
    let partitioned = regions.partition(partition_size);

    Ok(match shard {
        Some((task_id, num_shards)) => partitioned
            .into_iter()
            .enumerate()
            .filter(|(i, _)| (*i as u64) % u64::from(num_shards) == u64::from(task_id))
            .map(|(_, r)| r)
            .collect(),
        None => partitioned,
    })
}

/// Keep only regions containing at least one known variant position.
///
/// `variant_positions` are 1-bp-or-wider point intervals, grouped and sorted
/// per contig here; a single merge-scan then decides each region. Regions on
/// contigs with no variants at all are dropped. Purely a scheduling
/// optimization: callers must not use it when reference-site (gVCF) output
/// is wanted.
pub fn filter_regions_by_vcf(regions: Vec<Region>, variant_positions: &[Region]) -> Vec<Region> {
    fn by_contig(regions: Vec<Region>) -> (Vec<String>, FxHashMap<String, Vec<Region>>) {
        let mut order = Vec::new();
        let mut map: FxHashMap<String, Vec<Region>> = FxHashMap::default();
        for region in regions {
            let key = region.reference_name.to_string();
            if !map.contains_key(&key) {
                order.push(key.clone());
            }
            map.entry(key).or_default().push(region);
        }
        for list in map.values_mut() {
            list.sort_by_key(|r| (r.start, r.end));
        }
        (order, map)
    }

    let (contig_order, mut region_map) = by_contig(regions);
    let (_, variant_map) = by_contig(variant_positions.to_vec());

    let mut kept = Vec::new();
    for contig in contig_order {
        let variants = match variant_map.get(&contig) {
            Some(v) => v,
            None => continue,
        };
        let regions = region_map.remove(&contig).expect("contig in order list");
        let (mut ri, mut vi) = (0, 0);
        while ri < regions.len() && vi < variants.len() {
            let region = &regions[ri];
            let variant = &variants[vi];
            if variant.start >= region.start && variant.start < region.end {
                kept.push(region.clone());
                ri += 1;
                vi += 1;
            } else if region.end <= variant.start {
                ri += 1;
            } else {
                vi += 1;
            }
        }
    }
    kept
}
