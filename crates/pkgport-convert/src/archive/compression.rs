//! Compression codecs for package archives.

use std::io::{self, Read, Write};
use std::path::Path;

/// Compression wrapped around the tar stream, detected from the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// `.tar.bz2`, the canonical conda package format.
    Bzip2,
    /// `.tar.gz` / `.tgz`.
    Gzip,
    /// `.tar.xz`.
    Xz,
}

impl Compression {
    /// Detect compression from a path's file name.
    ///
    /// Returns `None` for anything that is not a recognized package name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".tar.bz2") {
            Some(Self::Bzip2)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Gzip)
        } else if name.ends_with(".tar.xz") {
            Some(Self::Xz)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bzip2 => "bzip2",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
        }
    }

    /// Wrap a reader with the matching decoder.
    pub(crate) fn decoder<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
        }
    }

    /// Wrap a writer with the matching encoder.
    pub(crate) fn encoder<W: Write>(&self, writer: W) -> Encoder<W> {
        match self {
            Self::Bzip2 => Encoder::Bzip2(bzip2::write::BzEncoder::new(
                writer,
                bzip2::Compression::best(),
            )),
            Self::Gzip => Encoder::Gzip(flate2::write::GzEncoder::new(
                writer,
                flate2::Compression::default(),
            )),
            Self::Xz => Encoder::Xz(xz2::write::XzEncoder::new(writer, 6)),
        }
    }
}

/// Streaming encoder for one of the supported formats.
pub(crate) enum Encoder<W: Write> {
    Bzip2(bzip2::write::BzEncoder<W>),
    Gzip(flate2::write::GzEncoder<W>),
    Xz(xz2::write::XzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    /// Flush the trailer and hand back the inner writer.
    pub(crate) fn finish(self) -> io::Result<W> {
        match self {
            Self::Bzip2(encoder) => encoder.finish(),
            Self::Gzip(encoder) => encoder.finish(),
            Self::Xz(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Bzip2(encoder) => encoder.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
            Self::Xz(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Bzip2(encoder) => encoder.flush(),
            Self::Gzip(encoder) => encoder.flush(),
            Self::Xz(encoder) => encoder.flush(),
        }
    }
}
