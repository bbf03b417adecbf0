pub mod scan;

pub use scan::{ScanPipeline, ScanReport, ScanSettings, SkippedVideo};
