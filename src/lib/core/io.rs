use crate::core::errors::Result;
use crate::core::fs::is_gzipped;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Open a readable source, decompressing by extension. `-` reads stdin.
pub fn get_reader<P: AsRef<Path>>(path: P) -> Result<Box<dyn Read>> {
    let raw_reader: Box<dyn Read> = if path.as_ref() == Path::new("-") {
        Box::new(io::stdin())
    } else {
        Box::new(BufReader::new(File::open(path.as_ref())?))
    };
    if is_gzipped(path) {
        Ok(Box::new(MultiGzDecoder::new(raw_reader)))
    } else {
        Ok(raw_reader)
    }
}

/// Open a writable sink, compressing by extension. `-` writes stdout.
pub fn get_writer<P: AsRef<Path>>(path: P) -> Result<Box<dyn Write>> {
    let raw_writer: Box<dyn Write> = if path.as_ref() == Path::new("-") {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(File::create(path.as_ref())?))
    };
    if is_gzipped(path) {
        Ok(Box::new(GzEncoder::new(raw_writer, Compression::default())))
    } else {
        Ok(raw_writer)
    }
}

/// Build a headered, tab-separated CSV writer on top of [`get_writer`].
pub fn get_tsv_writer<P: AsRef<Path>>(path: P) -> Result<csv::Writer<Box<dyn Write>>> {
    Ok(csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(get_writer(path)?))
}
