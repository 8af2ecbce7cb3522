use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum StoreConfig {
    Memory,
    Jsonl { dir: PathBuf },
}
