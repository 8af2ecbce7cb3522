use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub enum IndexConfig {
    Pinecone(PineconeConfig),
    Memory,
}

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index: String,
    /// Data-plane host; looked up through the control plane when absent
    pub host: Option<String>,
    pub control_host: String,
    pub dimension: usize,
    pub cloud: String,
    pub region: String,
    pub retry: RetryPolicy,
}
