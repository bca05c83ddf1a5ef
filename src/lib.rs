#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod channel;
pub mod client;
pub mod error;
pub mod ws;

pub use client::Client;

pub type Result<T> = std::result::Result<T, error::Error>;
