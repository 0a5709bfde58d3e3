//! Infrastructure clients: object storage and payment providers.

pub mod payments;
pub mod storage;
