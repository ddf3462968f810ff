pub const ARTIFACT_EXTENSION: &str = "app";
pub const DESCRIPTOR_EXTENSION: &str = "nuspec";
pub const DEPENDENCIES_EXTENSION: &str = "deps.json";

const SYMBOLS_QUALIFIER: &str = "symbols";
const INVALID_PATH_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

pub fn sanitize_path_segment(input: &str) -> String {
    input
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_whitespace() || ch.is_control() || INVALID_PATH_CHARS.contains(&ch) {
                '_'
            } else {
                ch
            }
        })
        .collect()
}

/// Reduces a feed package id to the stem used for cache file names: the
/// trailing app GUID and the `symbols` qualifier are dropped, the rest is
/// made path-safe.
pub fn clean_package_id(package_id: &str) -> String {
    let mut segments: Vec<&str> = package_id.trim().split('.').collect();
    if segments.len() > 1 && segments.last().is_some_and(|last| is_guid(last)) {
        segments.pop();
    }
    segments.retain(|segment| !segment.eq_ignore_ascii_case(SYMBOLS_QUALIFIER));

    let stem = segments.join(".");
    if stem.is_empty() {
        return sanitize_path_segment(package_id);
    }
    sanitize_path_segment(&stem)
}

pub fn artifact_file_name(package_id: &str, version: &str) -> String {
    format!(
        "{}.{}.{ARTIFACT_EXTENSION}",
        clean_package_id(package_id),
        sanitize_path_segment(version)
    )
}

pub fn dependencies_file_name(package_id: &str, version: &str) -> String {
    format!(
        "{}.{}.{DEPENDENCIES_EXTENSION}",
        clean_package_id(package_id),
        sanitize_path_segment(version)
    )
}

/// File name used by caches populated before versions were tracked.
pub fn legacy_artifact_file_name(package_id: &str) -> String {
    format!("{}.{ARTIFACT_EXTENSION}", clean_package_id(package_id))
}

fn is_guid(value: &str) -> bool {
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8_usize, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|ch| ch.is_ascii_hexdigit()))
}
