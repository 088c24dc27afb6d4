use crate::error::{Error, Result};
use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Raw file content as fetched from the source host.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Path from the repository root
    pub path: String,

    /// Undecoded content
    pub bytes: Vec<u8>,
}

/// A file whose content decoded cleanly to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextFile {
    /// Path from the repository root
    pub path: String,

    /// Decoded content
    pub text: String,

    /// Name of the encoding the content was decoded with
    pub encoding: &'static str,
}

impl FileEntry {
    /// Creates a new entry.
    #[must_use]
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }

    /// Decodes the content under its detected encoding.
    ///
    /// # Algorithm
    ///
    /// 1. A byte-order mark selects its encoding directly
    /// 2. Content with NUL bytes is binary and has no usable text encoding
    /// 3. Otherwise the encoding is guessed statistically and the bytes are
    ///    decoded strictly, without replacement characters
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if no usable encoding is found or the bytes
    /// are malformed under the detected encoding.
    pub fn decode(self) -> Result<TextFile> {
        let (encoding, body) = match Encoding::for_bom(&self.bytes) {
            Some((encoding, bom_len)) => (encoding, &self.bytes[bom_len..]),
            None => {
                if memchr::memchr(0, &self.bytes).is_some() {
                    return Err(Error::decode(
                        self.path,
                        "no usable text encoding detected (content looks binary)",
                    ));
                }
                (detect_encoding(&self.bytes), self.bytes.as_slice())
            }
        };

        let text = encoding
            .decode_without_bom_handling_and_without_replacement(body)
            .ok_or_else(|| {
                Error::decode(
                    &self.path,
                    format!("content is not valid {}", encoding.name()),
                )
            })?
            .into_owned();

        Ok(TextFile {
            path: self.path,
            text,
            encoding: encoding.name(),
        })
    }
}

fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}
