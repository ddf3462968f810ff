use std::collections::{BTreeSet, HashMap, VecDeque};

use symbolpack_core::ResolvedPackage;

/// Keys of every processed package reachable from `roots` through recorded
/// dependency lists. Packages left behind by invalidated resolutions are
/// not reachable and drop out.
pub(crate) fn reachable_packages(
    roots: &[String],
    processed: &HashMap<String, ResolvedPackage>,
) -> BTreeSet<String> {
    let mut reachable = BTreeSet::new();
    let mut frontier: VecDeque<&str> = roots.iter().map(String::as_str).collect();

    while let Some(key) = frontier.pop_front() {
        let Some(package) = processed.get(key) else {
            continue;
        };
        if !reachable.insert(key.to_string()) {
            continue;
        }
        for dependency in &package.dependencies {
            let dependency_key = dependency.package_id.to_ascii_lowercase();
            if !reachable.contains(&dependency_key) {
                if let Some((known, _)) = processed.get_key_value(&dependency_key) {
                    frontier.push_back(known.as_str());
                }
            }
        }
    }

    reachable
}
