//! Data models for the admin storage service.
//!
//! `object` describes what goes in and out of a bucket, `content` the two
//! curated JSON documents, and `user` the identity produced by authentication.

pub mod content;
pub mod object;
pub mod user;
