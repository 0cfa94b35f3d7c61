use std::path::PathBuf;
use std::{env, fs};

/// Per-test scratch directory under `target/test`, mirroring the teacher's
/// `get_tmp_folder` (`record_persist/tests/main.rs`).
pub fn tmp_folder(test_name: &str) -> String {
    let mut path_buf = env::current_dir().unwrap();
    path_buf.push("target");
    path_buf.push("test");
    path_buf.push(test_name);
    let _ = fs::remove_dir_all(&path_buf);
    path_buf.into_os_string().into_string().expect("invalid path")
}

/// Locates the single rolled file `TableWriter` produced under `dir/table_name`.
pub fn written_file(dir: &str, table_name: &str) -> PathBuf {
    let mut table_dir = PathBuf::from(dir);
    table_dir.push(table_name);
    let mut files: Vec<PathBuf> = fs::read_dir(&table_dir)
        .unwrap_or_else(|e| panic!("no files under {table_dir:?}: {e}"))
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|ext| ext == "parquet").unwrap_or(false))
        .collect();
    files.sort();
    files.into_iter().next().unwrap_or_else(|| panic!("no .parquet file under {table_dir:?}"))
}
