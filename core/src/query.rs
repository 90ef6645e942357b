//! Query-string parameters.
//!
//! `Params` keeps insertion order and allows repeated keys. Values that are
//! `Null` (including a `None` converted from an `Option`) or empty text are
//! dropped at encoding time, so callers can pass optional filters straight
//! through.

/// A scalar query value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl QueryValue {
    /// String form, or `None` for values that must be omitted.
    fn render(&self) -> Option<String> {
        match self {
            QueryValue::Null => None,
            QueryValue::Text(text) if text.is_empty() => None,
            QueryValue::Text(text) => Some(text.clone()),
            QueryValue::Int(n) => Some(n.to_string()),
            QueryValue::Float(n) => Some(n.to_string()),
            QueryValue::Bool(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Text(value.clone())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

macro_rules! int_query_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for QueryValue {
            fn from(value: $ty) -> Self {
                QueryValue::Int(i64::from(value))
            }
        })*
    };
}

int_query_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(n) => QueryValue::Int(n),
            Err(_) => QueryValue::Text(value.to_string()),
        }
    }
}

impl From<usize> for QueryValue {
    fn from(value: usize) -> Self {
        QueryValue::from(value as u64)
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Ordered list of query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Vec<(String, QueryValue)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Repeated keys are kept.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Percent-encoded `k=v&...` of the surviving pairs, or `None` when every
    /// pair was filtered out.
    pub fn encode(&self) -> Option<String> {
        let pairs: Vec<String> = self
            .0
            .iter()
            .filter_map(|(key, value)| {
                let value = value.render()?;
                Some(format!(
                    "{}={}",
                    urlencoding::encode(key),
                    urlencoding::encode(&value)
                ))
            })
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("&"))
        }
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
