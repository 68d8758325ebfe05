// plc-logtrace - core/parser/registry.rs
//
// Name-keyed parser table plus a designated default. `detect` walks
// parsers in registration order and returns the first whose `can_parse`
// accepts the file; `parse` either dispatches to an explicitly named
// parser or runs detection, producing a single synthesized
// `ParseError` when neither resolves.

use crate::core::model::{ParseError, ParseResult};
use crate::core::parser::traits::Parser;
use std::path::Path;
use std::sync::Arc;

pub struct ParserRegistry {
    parsers: Vec<Arc<dyn Parser>>,
    default_parser: Option<Arc<dyn Parser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
            default_parser: None,
        }
    }

    /// Builds the registry with every concrete parser this crate ships,
    /// in the order `can_parse` should be tried, with `default_parser`
    /// as the designated fallback.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::plc_debug::PlcDebugParser::new()), false);
        registry.register(Arc::new(super::plc_tab::PlcTabParser::new()), false);
        registry.register(Arc::new(super::mcs_log::McsLogParser::new()), false);
        registry.register(Arc::new(super::csv_signal::CsvSignalParser::new()), false);
        registry.register(Arc::new(super::default_parser::DefaultParser::new()), true);
        registry
    }

    /// Inserts `parser`, optionally marking it the fallback used when no
    /// other registered parser's `can_parse` accepts a file.
    pub fn register(&mut self, parser: Arc<dyn Parser>, is_default: bool) {
        if is_default {
            self.default_parser = Some(Arc::clone(&parser));
        }
        self.parsers.push(parser);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Parser>> {
        self.parsers.iter().find(|p| p.name() == name).cloned()
    }

    /// Returns the first registered parser (in insertion order) whose
    /// `can_parse` accepts `path`, falling back to the default parser.
    pub fn detect(&self, path: &Path) -> Option<Arc<dyn Parser>> {
        self.parsers
            .iter()
            .find(|p| p.can_parse(path))
            .cloned()
            .or_else(|| self.default_parser.clone())
    }

    /// Parses `path` with the parser named `name`, or via `detect` if
    /// `name` is `None`.
    pub fn parse(
        &self,
        path: &Path,
        name: Option<&str>,
        workers: usize,
        use_processes: bool,
    ) -> ParseResult {
        let parser = match name {
            Some(name) => match self.get(name) {
                Some(p) => p,
                None => {
                    return ParseResult::failed(
                        ParseError::whole(format!("Parser '{name}' not found")).with_file(path),
                    )
                }
            },
            None => match self.detect(path) {
                Some(p) => p,
                None => {
                    return ParseResult::failed(
                        ParseError::whole("No suitable parser found").with_file(path),
                    )
                }
            },
        };
        parser.parse(path, workers, use_processes)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_with_unknown_name_reports_literal_error() {
        let registry = ParserRegistry::builtin();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "anything").unwrap();
        let result = registry.parse(file.path(), Some("nope"), 1, false);
        assert_eq!(result.errors[0].reason, "Parser 'nope' not found");
    }

    #[test]
    fn detect_falls_back_to_bracket_parser_for_plc_debug_lines() {
        let registry = ParserRegistry::builtin();
        let mut file = NamedTempFile::new().unwrap();
        for _ in 0..5 {
            writeln!(
                file,
                "2024-01-01 10:00:00.000 [Debug] [/AreaA/Line01/Robot-01@Main] [INPUT1:I_MOVE_IN] (Boolean) : ON"
            )
            .unwrap();
        }
        let parser = registry.detect(file.path()).unwrap();
        assert_eq!(parser.name(), "plc_debug");
    }
}
