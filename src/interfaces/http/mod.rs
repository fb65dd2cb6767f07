//! HTTP REST API
//!
//! - `common`: response envelope, pagination, error mapping
//! - `middleware`: bearer-token authentication
//! - `modules`: one directory per resource (dto + handlers)
//! - `router`: route table and Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiContext, ApiDoc};
