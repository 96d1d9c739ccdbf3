//! 持久化适配层

pub mod csv_store;

pub use csv_store::{ApplicationRow, CsvLedgerStore, CsvRecordSink, MemoryRecordSink, RecordSink};
