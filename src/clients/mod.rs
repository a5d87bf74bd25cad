pub mod artifact_store;
pub mod hidden;
pub mod rbmq;
pub mod tls;
