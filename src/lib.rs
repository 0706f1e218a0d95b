#![deny(missing_docs)]

//! Core library for the financial report ingestion pipeline.

/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// PDF partitioning backends.
pub mod partition;
/// Pipeline stages and their reports.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Page records and their on-disk form.
pub mod records;
/// Chat-completion summarization client.
pub mod summarization;
