pub mod aggregate;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod resolver;
pub mod rotator;
pub mod source;

pub use client::RtpiClient;
pub use error::Error;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
