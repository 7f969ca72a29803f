//! End-to-end tests for the ingestion pipeline

mod pipeline_tests;
