pub mod acquirer;
pub mod aggregator;
pub mod bindings;
pub mod camera;
pub mod eventlogger;
pub mod microphone;
pub mod pipeline;
pub mod reader;
