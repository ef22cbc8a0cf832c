use compression_codecs::{EncodeV2, deflate::DeflateEncoder, gzip::GzipEncoder};
use compression_core::Level;
use std::fmt;

/// Supported compression codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Codec {
    /// Gzip compression.
    Gzip,
    /// Raw deflate compression.
    Deflate,
}

impl Codec {
    /// Codecs in the order they are tried during negotiation.
    pub const PRIORITY: [Codec; 2] = [Codec::Gzip, Codec::Deflate];

    /// Returns the Content-Encoding header value for this codec.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Deflate => "deflate",
        }
    }

    /// Creates a new encoder for this codec.
    ///
    /// Gzip uses the default level, deflate the fastest one.
    pub fn encoder(&self) -> Box<dyn EncodeV2 + Send> {
        match self {
            Codec::Gzip => Box::new(GzipEncoder::new(Level::Default.into())),
            Codec::Deflate => Box::new(DeflateEncoder::new(Level::Fastest.into())),
        }
    }

    fn bit(self) -> u8 {
        match self {
            Codec::Gzip => 0b01,
            Codec::Deflate => 0b10,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_encoding())
    }
}

/// The set of codecs a negotiator is allowed to choose from.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "Vec<Codec>", into = "Vec<Codec>"))]
pub struct CodecSet(u8);

impl CodecSet {
    /// A set with no codecs; every request is served as identity.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Gzip and deflate.
    pub const fn all() -> Self {
        Self(0b11)
    }

    /// Gzip only.
    pub const fn gzip_only() -> Self {
        Self(0b01)
    }

    /// Returns whether `codec` is part of the set.
    pub fn contains(&self, codec: Codec) -> bool {
        self.0 & codec.bit() != 0
    }

    /// Returns a copy of the set with `codec` added.
    pub fn with(self, codec: Codec) -> Self {
        Self(self.0 | codec.bit())
    }

    /// Returns a copy of the set with `codec` removed.
    pub fn without(self, codec: Codec) -> Self {
        Self(self.0 & !codec.bit())
    }

    /// Returns whether the set holds no codec.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the codecs of the set in priority order.
    pub fn iter(&self) -> impl Iterator<Item = Codec> + '_ {
        Codec::PRIORITY
            .into_iter()
            .filter(move |codec| self.contains(*codec))
    }

    /// Picks the codec to use for the given Accept-Encoding value.
    ///
    /// The raw header value is searched for each codec's Content-Encoding
    /// token as a plain substring, case-sensitively and in priority order; the
    /// first one found wins. Weights (`q=`) and the order in which the client
    /// lists its encodings are not considered, so `"deflate, gzip;q=0.1"`
    /// still selects gzip.
    pub fn select(&self, accept_encoding: &str) -> Option<Codec> {
        self.iter()
            .find(|codec| accept_encoding.contains(codec.content_encoding()))
    }
}

impl Default for CodecSet {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for CodecSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Codec> for CodecSet {
    fn from_iter<I: IntoIterator<Item = Codec>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<Vec<Codec>> for CodecSet {
    fn from(codecs: Vec<Codec>) -> Self {
        codecs.into_iter().collect()
    }
}

impl From<CodecSet> for Vec<Codec> {
    fn from(set: CodecSet) -> Self {
        set.iter().collect()
    }
}
