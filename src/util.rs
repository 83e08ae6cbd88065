use std::path::PathBuf;

pub const INPUT_FILE: &str = "ClusterLatlong.xlsx";
pub const OUTPUT_FILE: &str = "cluster_map.html";

pub fn default_paths() -> (PathBuf, PathBuf) {
    (PathBuf::from(INPUT_FILE), PathBuf::from(OUTPUT_FILE))
}
