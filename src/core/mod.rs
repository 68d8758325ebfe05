// plc-logtrace - core/mod.rs
//
// Core ingestion engine: lexical primitives, the string interner, the
// data model, the parser framework, the batch pipeline, result
// aggregation, signal-state reconstruction, and chunked time-window
// storage.
//
// Dependencies: standard library, chrono, serde, regex, rayon, ahash,
// parking_lot. Must NOT depend on any UI/platform/app layer.

pub mod aggregate;
pub mod chunk;
pub mod chunk_manager;
pub mod intern;
pub mod lexical;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod state;
