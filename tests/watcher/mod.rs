//! Watcher module tests.

mod discovery_test;
mod parser_test;

/// Verify the public watcher types are exported from the library.
#[test]
fn test_all_watcher_types_exported() {
    use runner_agent::watcher::{
        Extracted, FileDiscovery, Fold, FoldStrategy, JobAccumulator, LineMatcher, LogParser,
        MatcherKind, MemorySeenFiles, PatternError, PatternExtractor, SeenFiles, WatcherError,
        DEFAULT_FILE_PREFIX,
    };

    let _ = FileDiscovery::new(DEFAULT_FILE_PREFIX);
    let _ = MemorySeenFiles::new().is_empty();
    let _ = PatternExtractor::new().unwrap();
    let _ = LogParser::with_default_patterns().unwrap();
    let _ = JobAccumulator::new();
    let _: Fold<Extracted> = Fold::new(FoldStrategy::FirstWins);
    let _: fn(&str) -> Result<LineMatcher, PatternError> =
        |pattern| LineMatcher::new(MatcherKind::Workflow, pattern);
    let _: fn(&WatcherError) -> &std::path::Path = WatcherError::path;
}
