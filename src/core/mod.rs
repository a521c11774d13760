//! Core library modules for the UAST dashboard backend

pub mod backend_client;
pub mod protocol;
pub mod uast;
pub mod uast_query;
