//! vocab-acl - access-control-list authorization for vocabulary management
//!
//! This library provides the ACL model, its relational store and the
//! authorization decision API. It exposes all modules for testing purposes.

pub mod authz;
pub mod directory_sync;
pub mod entities;
pub mod settings;
pub mod storage;
