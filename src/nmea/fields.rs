//! Comma-separated field view over one NMEA sentence

/// Upper bound on fields kept from one sentence
pub const MAX_FIELDS: usize = 32;

/// Borrowed field slices of a single sentence
///
/// Field 0 is the address (`$GNGGA`). Splitting stops at `*`, so the checksum
/// never shows up as a field. Empty fields are kept as empty slices so that
/// positional indices stay aligned with the sentence layout.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    slots: [&'a str; MAX_FIELDS],
    len: usize,
}

impl<'a> Fields<'a> {
    /// Splits `line` on `,` up to the first `*`, keeping at most `max_fields`
    ///
    /// `max_fields` is clamped to [`MAX_FIELDS`].
    pub fn split(line: &'a str, max_fields: usize) -> Self {
        let max_fields = max_fields.min(MAX_FIELDS);
        let data = match line.find('*') {
            Some(star) => &line[..star],
            None => line,
        };

        let mut fields = Fields {
            slots: [""; MAX_FIELDS],
            len: 0,
        };
        if data.is_empty() {
            return fields;
        }
        for field in data.split(',').take(max_fields) {
            fields.slots[fields.len] = field;
            fields.len += 1;
        }
        fields
    }

    /// Number of fields found
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw field at `index`, empty or not
    pub fn raw(&self, index: usize) -> Option<&'a str> {
        if index < self.len {
            Some(self.slots[index])
        } else {
            None
        }
    }

    /// Field at `index`, `None` when missing or empty
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.raw(index).filter(|field| !field.is_empty())
    }

    /// Field at `index` parsed as `T`, `None` when missing, empty or malformed
    pub fn parse<T: core::str::FromStr>(&self, index: usize) -> Option<T> {
        self.get(index).and_then(|field| field.trim().parse().ok())
    }

    /// First character of the field at `index`
    pub fn first_char(&self, index: usize) -> Option<char> {
        self.get(index).and_then(|field| field.chars().next())
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.slots[..self.len].iter().copied()
    }
}
