//! Structured input sources: trees of values looked up by (dotted) name.

use std::{collections::BTreeMap, fs, path::Path, time::Duration};

use crate::{
    value::{parse_duration, FromValue, Generic, Kind, Value},
    Error, Result,
};

/// A node of an input source tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Int(isize),
    Int64(i64),
    Uint(usize),
    Uint64(u64),
    Float64(f64),
    String(String),
    Duration(Duration),
    Generic(Box<dyn Generic>),
    Seq(Vec<Node>),
    Map(BTreeMap<String, Node>),
}

impl Node {
    /// Best-effort name of the node's type, empty for `Null`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Null => "",
            Node::Bool(_) => "bool",
            Node::Int(_) => "int",
            Node::Int64(_) => "int64",
            Node::Uint(_) => "uint",
            Node::Uint64(_) => "uint64",
            Node::Float64(_) => "float64",
            Node::String(_) => "string",
            Node::Duration(_) => "duration",
            Node::Generic(_) => "generic",
            Node::Seq(_) => "seq",
            Node::Map(_) => "map",
        }
    }

    fn integer(&self) -> Option<i128> {
        match *self {
            Node::Int(it) => Some(it as i128),
            Node::Int64(it) => Some(i128::from(it)),
            Node::Uint(it) => Some(it as i128),
            Node::Uint64(it) => Some(i128::from(it)),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Node {
    fn from(json: serde_json::Value) -> Node {
        use serde_json::Value as Json;

        match json {
            Json::Null => Node::Null,
            Json::Bool(it) => Node::Bool(it),
            Json::Number(it) => {
                if let Some(int) = it.as_i64() {
                    isize::try_from(int).map_or(Node::Int64(int), Node::Int)
                } else if let Some(uint) = it.as_u64() {
                    Node::Uint64(uint)
                } else {
                    Node::Float64(it.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(it) => Node::String(it),
            Json::Array(items) => Node::Seq(items.into_iter().map(Node::from).collect()),
            Json::Object(map) => Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect()),
        }
    }
}

/// A read-only tree of configuration values.
///
/// Implementors provide [`lookup`](InputSource::lookup); typed access is
/// layered on top. A missing key is never an error, a key holding a value of
/// the wrong type is.
pub trait InputSource {
    /// Where the values come from, for diagnostics.
    fn source(&self) -> &str;

    fn lookup(&self, name: &str) -> Option<&Node>;

    /// Looks `name` up and converts it to `kind`.
    fn get(&self, name: &str, kind: Kind) -> Result<Option<Value>> {
        match self.lookup(name) {
            Some(node) => coerce(name, node, kind).map(Some),
            None => Ok(None),
        }
    }

    fn bool(&self, name: &str) -> Result<bool> {
        typed(self, name)
    }
    fn int(&self, name: &str) -> Result<isize> {
        typed(self, name)
    }
    fn int64(&self, name: &str) -> Result<i64> {
        typed(self, name)
    }
    fn uint(&self, name: &str) -> Result<usize> {
        typed(self, name)
    }
    fn uint64(&self, name: &str) -> Result<u64> {
        typed(self, name)
    }
    fn float64(&self, name: &str) -> Result<f64> {
        typed(self, name)
    }
    fn string(&self, name: &str) -> Result<String> {
        typed(self, name)
    }
    fn duration(&self, name: &str) -> Result<Duration> {
        typed(self, name)
    }
    fn int_slice(&self, name: &str) -> Result<Vec<isize>> {
        typed(self, name)
    }
    fn int64_slice(&self, name: &str) -> Result<Vec<i64>> {
        typed(self, name)
    }
    fn uint_slice(&self, name: &str) -> Result<Vec<usize>> {
        typed(self, name)
    }
    fn uint64_slice(&self, name: &str) -> Result<Vec<u64>> {
        typed(self, name)
    }
    fn float64_slice(&self, name: &str) -> Result<Vec<f64>> {
        typed(self, name)
    }
    fn string_slice(&self, name: &str) -> Result<Vec<String>> {
        typed(self, name)
    }

    fn generic(&self, name: &str) -> Result<Option<Box<dyn Generic>>> {
        Ok(self.get(name, Kind::Generic)?.as_ref().and_then(<Box<dyn Generic>>::from_value))
    }
}

fn typed<T, S>(src: &S, name: &str) -> Result<T>
where
    T: FromValue + Default,
    S: InputSource + ?Sized,
{
    Ok(src.get(name, T::KIND)?.as_ref().and_then(T::from_value).unwrap_or_default())
}

fn coerce(name: &str, node: &Node, kind: Kind) -> Result<Value> {
    let mismatch = || Error::TypeMismatch {
        name: name.to_string(),
        expected: kind,
        actual: node.type_name().to_string(),
    };

    if let Some(elem) = kind.element() {
        let items = match node {
            Node::Seq(it) => it,
            _ => return Err(mismatch()),
        };
        let items = items
            .iter()
            .enumerate()
            .map(|(i, it)| coerce(&format!("{name}[{i}]"), it, elem))
            .collect::<Result<Vec<_>>>()?;
        return Value::merge(kind, items).ok_or_else(mismatch);
    }

    let value = match (kind, node) {
        (Kind::Bool, Node::Bool(it)) => Value::Bool(*it),
        (Kind::String, Node::String(it)) => Value::String(it.clone()),
        (Kind::Float64, Node::Float64(it)) => Value::Float64(*it),
        (Kind::Float64, _) => Value::Float64(node.integer().ok_or_else(mismatch)? as f64),
        (Kind::Int, _) => Value::Int(narrow(node).ok_or_else(mismatch)?),
        (Kind::Int64, _) => Value::Int64(narrow(node).ok_or_else(mismatch)?),
        (Kind::Uint, _) => Value::Uint(narrow(node).ok_or_else(mismatch)?),
        (Kind::Uint64, _) => Value::Uint64(narrow(node).ok_or_else(mismatch)?),
        (Kind::Duration, Node::Duration(it)) => Value::Duration(*it),
        (Kind::Duration, Node::String(it)) => {
            Value::Duration(parse_duration(it).map_err(|_| mismatch())?)
        }
        (Kind::Generic, Node::Generic(it)) => Value::Generic(it.clone()),
        _ => return Err(mismatch()),
    };
    Ok(value)
}

fn narrow<T: TryFrom<i128>>(node: &Node) -> Option<T> {
    node.integer().and_then(|it| T::try_from(it).ok())
}

/// An [`InputSource`] over an in-memory map, such as a decoded config file.
///
/// A name that is not a top-level key but contains `.` is walked as a path
/// through nested maps: `db.pool.size` finds `{"db": {"pool": {"size": 8}}}`.
#[derive(Debug, Clone, Default)]
pub struct MapInputSource {
    source: String,
    tree: BTreeMap<String, Node>,
}

impl MapInputSource {
    pub fn new(source: impl Into<String>, tree: BTreeMap<String, Node>) -> MapInputSource {
        MapInputSource { source: source.into(), tree }
    }

    /// The top level of `json` has to be an object.
    pub fn from_json(source: impl Into<String>, json: serde_json::Value) -> Result<MapInputSource> {
        let source = source.into();
        match Node::from(json) {
            Node::Map(tree) => Ok(MapInputSource { source, tree }),
            other => Err(Error::msg(format!(
                "input source {source} has to be a map, not {}",
                other.type_name()
            ))),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<MapInputSource> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|source| Error::Io { path: path.to_path_buf(), source })?;
        let source_name = path.display().to_string();
        let json = serde_json::from_str(&text)
            .map_err(|source| Error::Json { source_name: source_name.clone(), source })?;
        MapInputSource::from_json(source_name, json)
    }
}

impl InputSource for MapInputSource {
    fn source(&self) -> &str {
        &self.source
    }

    fn lookup(&self, name: &str) -> Option<&Node> {
        self.tree.get(name).or_else(|| nested(&self.tree, name))
    }
}

fn nested<'a>(tree: &'a BTreeMap<String, Node>, name: &str) -> Option<&'a Node> {
    let (path, leaf) = name.rsplit_once('.')?;
    let mut node = tree;
    for section in path.split('.') {
        match node.get(section)? {
            Node::Map(child) => node = child,
            _ => return None,
        }
    }
    node.get(leaf)
}
