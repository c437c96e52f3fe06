use std::collections::{BTreeMap, BTreeSet};

/// Paint colors handed out to pods when no palette is configured.
pub const DEFAULT_PALETTE: &[&str] = &[
    "blue",
    "green",
    "magenta",
    "cyan",
    "yellow",
    "red",
    "lightblue",
    "lightgreen",
    "lightmagenta",
    "lightcyan",
];

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a. Fixed output across builds and toolchains.
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Pick a paint color for an entry ID based on its hash.
///
/// The same ID always gets the same color within a palette, on every run.
pub fn get_paint<'a>(id: &str, palette: &'a [String]) -> &'a str {
    if palette.is_empty() {
        return "white";
    }
    let hash = fnv1a(id.as_bytes());
    &palette[(hash % palette.len() as u64) as usize]
}

/// Pods that appear with exactly one container.
pub fn single_container_pods<'a, I>(sources: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut containers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (pod, container) in sources {
        if pod.is_empty() {
            continue;
        }
        containers.entry(pod).or_default().insert(container);
    }
    containers
        .into_iter()
        .filter(|(_, c)| c.len() == 1)
        .map(|(pod, _)| pod.to_string())
        .collect()
}
