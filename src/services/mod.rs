pub mod admin_service;
pub mod auth_service;
pub mod cloud_bucket;
pub mod disk_bucket;
pub mod keys;
pub mod storage_service;
