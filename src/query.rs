use std::convert::TryFrom;
use std::fmt;

use serde_json::Value;

use crate::Error;

/// A query parameter value. The API only understands these four kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    // floats print in shortest round-trip form, never with an exponent
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(s) => f.write_str(s),
            QueryValue::Int(i) => write!(f, "{}", i),
            QueryValue::Float(x) => write!(f, "{}", x),
            QueryValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
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

impl From<f32> for QueryValue {
    fn from(value: f32) -> Self {
        QueryValue::Float(f64::from(value))
    }
}

macro_rules! int_query_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::Int(i64::from(value))
                }
            }
        )*
    };
}

int_query_value!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_int_query_value {
    ($($ty:ty),*) => {
        $(
            // values beyond i64 keep their exact digits as a string
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    i64::try_from(value)
                        .map(QueryValue::Int)
                        .unwrap_or_else(|_| QueryValue::Str(value.to_string()))
                }
            }
        )*
    };
}

wide_int_query_value!(isize, usize, u64);

/// Insertion-ordered query parameters.
///
/// ```
/// use ox3_client::QueryParams;
///
/// let params = QueryParams::new().push("offset", 0).push("limit", 500);
/// assert_eq!(params.encode(), "offset=0&limit=500");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<QueryValue>,
    {
        self.pairs.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `key=value` pairs joined by `&`, form-urlencoded.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            serializer.append_pair(key, &value.to_string());
        }
        serializer.finish()
    }
}

impl<K, V> std::iter::FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<QueryValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        QueryParams {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TryFrom<(&str, &Value)> for QueryValue {
    type Error = Error;

    fn try_from((key, value): (&str, &Value)) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(QueryValue::Str(s.clone())),
            Value::Bool(b) => Ok(QueryValue::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(QueryValue::Int)
                .or_else(|| n.as_f64().map(QueryValue::Float))
                .ok_or_else(|| Error::UnsupportedParameter(key.to_string())),
            _ => Err(Error::UnsupportedParameter(key.to_string())),
        }
    }
}

/// Converts a JSON object of scalars. Nested objects, arrays and nulls are
/// rejected with [`Error::UnsupportedParameter`] naming the offending key.
impl TryFrom<&Value> for QueryParams {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let object = match value {
            Value::Object(object) => object,
            _ => return Err(Error::UnsupportedParameter(String::new())),
        };
        let pairs = object
            .iter()
            .map(|(key, value)| Ok((key.clone(), QueryValue::try_from((key.as_str(), value))?)))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(QueryParams { pairs })
    }
}
