//! Incremental source loading driven by the tag scanner.

use std::mem;

use anyhow::{Result, bail};
use quill_config::QuillConfig;
use quill_lexer::{ScanResult, TagBoundaryScanner};
use quill_types::TagRegistry;

use crate::common::init_tracing;

/// Accumulates chunks until the buffered text no longer ends mid-tag.
struct ChunkLoader<'r> {
    scanner: TagBoundaryScanner<'r>,
    buffer: String,
    flushed: Vec<(String, ScanResult)>,
}

impl<'r> ChunkLoader<'r> {
    fn new(registry: &'r TagRegistry) -> Self {
        Self {
            scanner: TagBoundaryScanner::new(registry),
            buffer: String::new(),
            flushed: Vec::new(),
        }
    }

    fn push(&mut self, chunk: &str) -> Result<()> {
        self.buffer.push_str(chunk);
        let result = self.scanner.scan(&self.buffer);
        if result.needs_more_input() {
            return Ok(());
        }
        if result.is_malformed() {
            bail!("malformed template near {:?}", self.buffer);
        }
        self.flushed.push((mem::take(&mut self.buffer), result));
        Ok(())
    }

    fn finish(self) -> Result<Vec<(String, ScanResult)>> {
        if !self.buffer.is_empty() {
            bail!("template ends mid-tag: {:?}", self.buffer);
        }
        Ok(self.flushed)
    }
}

#[test]
fn truncated_tags_are_buffered_until_complete() -> Result<()> {
    init_tracing();
    let registry = TagRegistry::default();
    let mut loader = ChunkLoader::new(&registry);

    for chunk in ["Hello ", "#fo", "r(x in xs): #(", "x) #end", "for\n", "bye"] {
        loader.push(chunk)?;
    }
    let flushed = loader.finish()?;

    let texts: Vec<&str> = flushed.iter().map(|(text, _)| text.as_str()).collect();
    assert_eq!(texts, ["Hello ", "#for(x in xs): #(", "x) #endfor\n", "bye"]);
    assert_eq!(flushed[0].1, ScanResult::NoTagMarks);
    assert_eq!(flushed[1].1, ScanResult::WellFormedSoFar);
    assert_eq!(flushed[3].1, ScanResult::NoTagMarks);
    Ok(())
}

#[test]
fn unknown_tag_stops_loading() {
    let registry = TagRegistry::default();
    let mut loader = ChunkLoader::new(&registry);
    loader.push("ok ").unwrap();
    let err = loader.push("#bogus(1)").unwrap_err();
    assert!(err.to_string().contains("malformed"));
}

#[test]
fn dangling_tag_at_end_is_an_error() {
    let registry = TagRegistry::default();
    let mut loader = ChunkLoader::new(&registry);
    loader.push("tail #").unwrap();
    assert!(loader.finish().is_err());
}

#[test]
fn configured_registry_drives_the_scanner() -> Result<()> {
    let config = QuillConfig::from_toml_str(
        r#"
        [tags]
        indicator = "@"
        openers = ["section"]
        closers = ["endsection"]
        "#,
    )?;
    let scanner = TagBoundaryScanner::new(config.tag_registry());

    assert_eq!(scanner.scan("#for(x) is prose here"), ScanResult::NoTagMarks);
    assert_eq!(
        scanner.scan("@section(main): body @endsection\n"),
        ScanResult::WellFormedSoFar
    );
    assert!(scanner.scan("@for(x)").is_malformed());
    assert!(scanner.scan("body @sect").needs_more_input());
    Ok(())
}
