pub mod provisioner;
pub mod storage;
pub mod upload_service;
