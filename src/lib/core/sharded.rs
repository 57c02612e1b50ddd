//! Sharded output filespecs.
//!
//! A spec of the form `name@N` or `name@N.ext` fans one logical stream out
//! over `N` shard files named `name-SSSSS-of-NNNNN[.ext]`, so per-shard
//! output can be globbed or concatenated back into one stream afterward.

use crate::core::errors::{Error, Result};

/// A parsed `name@N[.ext]` spec. `suffix` keeps its leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardedFileSpec {
    pub basename: String,
    pub num_shards: u32,
    pub suffix: String,
}

/// Parse a sharded filespec. Returns `None` for plain, unsharded paths.
pub fn parse_sharded_file_spec(spec: &str) -> Option<ShardedFileSpec> {
    let (basename, rest) = spec.rsplit_once('@')?;
    if basename.is_empty() {
        return None;
    }
    let digits_end = rest
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .map(|(i, c)| i + c.len_utf8())
        .last()?;
    let num_shards: u32 = rest[..digits_end].parse().ok()?;
    let suffix = &rest[digits_end..];
    if !suffix.is_empty() && !suffix.starts_with('.') {
        return None;
    }
    Some(ShardedFileSpec {
        basename: basename.to_string(),
        num_shards,
        suffix: suffix.to_string(),
    })
}

pub fn is_sharded_file_spec(spec: &str) -> bool {
    parse_sharded_file_spec(spec).is_some()
}

/// Concrete filename for one shard of a parsed spec.
pub fn sharded_filename(spec: &ShardedFileSpec, shard: u32) -> String {
    format!(
        "{}-{:05}-of-{:05}{}",
        spec.basename, shard, spec.num_shards, spec.suffix
    )
}

/// Resolve a filespec against the run's shard parameters.
///
/// A sharded spec must agree with the configured shard count, and a run with
/// more than one shard refuses unsharded specs so that two shard processes
/// never open the same concrete path.
pub fn resolve_filespec(spec: &str, shard: Option<(u32, u32)>) -> Result<String> {
    match parse_sharded_file_spec(spec) {
        Some(parsed) => {
            if parsed.num_shards == 0 {
                return Err(Error::config(format!(
                    "output spec {:?} declares zero shards",
                    spec
                )));
            }
            let (task_id, num_shards) = shard.ok_or_else(|| {
                Error::config(format!(
                    "output spec {:?} is sharded but no shard parameters are configured",
                    spec
                ))
            })?;
            if parsed.num_shards != num_shards {
                return Err(Error::config(format!(
                    "output spec {:?} declares {} shards but the run is configured for {}",
                    spec, parsed.num_shards, num_shards
                )));
            }
            Ok(sharded_filename(&parsed, task_id))
        }
        None => match shard {
            Some((_, num_shards)) if num_shards > 1 => Err(Error::config(format!(
                "output spec {:?} must be sharded (name@{}) when running {} shards",
                spec, num_shards, num_shards
            ))),
            _ => Ok(spec.to_string()),
        },
    }
}
