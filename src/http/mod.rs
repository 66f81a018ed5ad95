//! HTTP protocol layer module
//!
//! Canned response builders and the conversion from an executed request
//! context into a hyper response.

pub mod response;

pub use response::{
    build_404_response, build_405_response, build_413_response, build_text_response, from_context,
};
