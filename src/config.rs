use crate::generator::{DomGenerator, Generator, WriterGenerator};

/// Which XML generator backend serializes values and envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorKind {
    /// Tags formatted straight into a string buffer.
    Writer,
    /// In-memory element tree serialized on flush.
    Dom,
}

/// Serialization and parsing settings.
///
/// Each client, server, request and response owns its copy, so two servers
/// in one process can use different generators or encodings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub encoding: String,
    pub generator: GeneratorKind,
    /// Number of fractional digits written for doubles before trimming.
    pub precision: usize,
    /// Parse wire `i8` into a big integer instead of a native integer.
    pub use_bigint_for_i8: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            encoding: "UTF-8".to_string(),
            generator: GeneratorKind::Writer,
            precision: 14,
            use_bigint_for_i8: false,
        }
    }
}

impl Config {
    pub fn with_encoding(mut self, encoding: &str) -> Config {
        self.encoding = encoding.to_string();
        self
    }

    pub fn with_generator(mut self, generator: GeneratorKind) -> Config {
        self.generator = generator;
        self
    }

    /// A fresh generator of the configured kind and encoding.
    pub fn generator(&self) -> Box<dyn Generator> {
        match self.generator {
            GeneratorKind::Writer => Box::new(WriterGenerator::new(&self.encoding)),
            GeneratorKind::Dom => Box::new(DomGenerator::new(&self.encoding)),
        }
    }
}
