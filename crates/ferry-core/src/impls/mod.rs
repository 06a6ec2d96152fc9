//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **MemoryStore** / **FileStore**: KeyValueStore
//! - **HttpSubmitter**: RemoteSubmitter（reqwest）
//! - **ManualConnectivity** / **HttpProbe**: Connectivity

pub mod file_store;
pub mod http_probe;
pub mod http_submitter;
pub mod manual_connectivity;
pub mod memory_store;

pub use self::file_store::FileStore;
pub use self::http_probe::{HttpProbe, ProbeHandle};
pub use self::http_submitter::HttpSubmitter;
pub use self::manual_connectivity::ManualConnectivity;
pub use self::memory_store::MemoryStore;
