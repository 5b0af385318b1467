/// Codec behaviour switches.
/// Build with `CborConfig::builder().foo(...).build()`, or start from a preset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CborConfig {
    /// Write arrays and maps with their element count in the header instead of
    /// the indefinite-length start byte and a trailing break.
    pub definite_lengths: bool,

    /// Skip structure keys that the target type does not know instead of failing.
    pub ignore_unknown_keys: bool,

    /// Write a field's integer label as its key when the schema declares one.
    /// Decoding always accepts both the name and the label.
    pub prefer_labels: bool,

    pub write_key_tags: bool,
    pub write_value_tags: bool,
    pub write_object_tags: bool,

    pub verify_key_tags: bool,
    pub verify_value_tags: bool,
    pub verify_object_tags: bool,

    /// Maximum nesting of arrays, maps and structures accepted while decoding.
    pub max_depth: usize,
}

impl Default for CborConfig {
    /// Everything off, indefinite lengths, `max_depth` 256.
    fn default() -> Self {
        CborConfig::builder().build()
    }
}

impl CborConfig {
    /// Start building a config with defaults matching [`CborConfig::default`].
    pub fn builder() -> CborConfigBuilder {
        CborConfigBuilder {
            definite_lengths: false,
            ignore_unknown_keys: false,
            prefer_labels: false,
            write_key_tags: false,
            write_value_tags: false,
            write_object_tags: false,
            verify_key_tags: false,
            verify_value_tags: false,
            verify_object_tags: false,
            max_depth: 256,
        }
    }

    /// Settings for COSE (RFC 9052) structures: definite lengths, integer labels,
    /// and every kind of tag written and verified.
    pub fn cose_compliant() -> Self {
        CborConfig::builder()
            .definite_lengths(true)
            .prefer_labels(true)
            .write_tags(true)
            .verify_tags(true)
            .build()
    }
}

/// Fluent builder for `CborConfig`.
#[derive(Clone, Debug)]
pub struct CborConfigBuilder {
    definite_lengths: bool,
    ignore_unknown_keys: bool,
    prefer_labels: bool,
    write_key_tags: bool,
    write_value_tags: bool,
    write_object_tags: bool,
    verify_key_tags: bool,
    verify_value_tags: bool,
    verify_object_tags: bool,
    max_depth: usize,
}

impl CborConfigBuilder {
    pub fn definite_lengths(mut self, on: bool) -> Self {
        self.definite_lengths = on;
        self
    }
    pub fn ignore_unknown_keys(mut self, on: bool) -> Self {
        self.ignore_unknown_keys = on;
        self
    }
    pub fn prefer_labels(mut self, on: bool) -> Self {
        self.prefer_labels = on;
        self
    }
    pub fn write_key_tags(mut self, on: bool) -> Self {
        self.write_key_tags = on;
        self
    }
    pub fn write_value_tags(mut self, on: bool) -> Self {
        self.write_value_tags = on;
        self
    }
    pub fn write_object_tags(mut self, on: bool) -> Self {
        self.write_object_tags = on;
        self
    }
    /// Sets all three `write_*_tags` switches.
    pub fn write_tags(self, on: bool) -> Self {
        self.write_key_tags(on)
            .write_value_tags(on)
            .write_object_tags(on)
    }
    pub fn verify_key_tags(mut self, on: bool) -> Self {
        self.verify_key_tags = on;
        self
    }
    pub fn verify_value_tags(mut self, on: bool) -> Self {
        self.verify_value_tags = on;
        self
    }
    pub fn verify_object_tags(mut self, on: bool) -> Self {
        self.verify_object_tags = on;
        self
    }
    /// Sets all three `verify_*_tags` switches.
    pub fn verify_tags(self, on: bool) -> Self {
        self.verify_key_tags(on)
            .verify_value_tags(on)
            .verify_object_tags(on)
    }
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Finalize and return the config. A `max_depth` of zero is raised to one so
    /// that a single top-level container can still be decoded.
    pub fn build(self) -> CborConfig {
        CborConfig {
            definite_lengths: self.definite_lengths,
            ignore_unknown_keys: self.ignore_unknown_keys,
            prefer_labels: self.prefer_labels,
            write_key_tags: self.write_key_tags,
            write_value_tags: self.write_value_tags,
            write_object_tags: self.write_object_tags,
            verify_key_tags: self.verify_key_tags,
            verify_value_tags: self.verify_value_tags,
            verify_object_tags: self.verify_object_tags,
            max_depth: self.max_depth.max(1),
        }
    }
}
