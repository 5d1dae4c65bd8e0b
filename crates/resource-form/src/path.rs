//! Addressing of locations inside nested resource values and control trees.
//!
//! A [`Path`] is an ordered list of [`Segment`]s. Object keys are addressed by
//! [`Segment::Key`], array slots by [`Segment::Index`]. Paths are the only
//! correspondence between a resource value and a control tree, which is why
//! lookups are type-sensitive: `Index(0)` never matches the object key `"0"`.
//!
//! The free functions in this module ([`get`], [`has`], [`set`] and [`unset`])
//! operate on [`serde_json::Value`]s and never panic on missing paths.
use std::{fmt::Display, iter::Peekable, str::CharIndices, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::{OptionExt, Snafu, ensure};

/// The error type for [`Path`] parsing.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParsePathError {
    #[snafu(display("path {input:?} contains an empty segment at byte {position}"))]
    EmptySegment { input: String, position: usize },

    #[snafu(display("path {input:?} is missing a '.' separator at byte {position}"))]
    MissingSeparator { input: String, position: usize },

    #[snafu(display("path {input:?} has an unterminated bracket starting at byte {position}"))]
    UnterminatedBracket { input: String, position: usize },

    #[snafu(display("path {input:?} contains the invalid bracket segment {segment:?}"))]
    InvalidBracketSegment { input: String, segment: String },
}

/// A single step of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    /// Position inside an array.
    Index(usize),

    /// Key of an object.
    Key(String),
}

impl Segment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Key(_) => None,
        }
    }

    /// Keys which can be written without brackets in the textual path form.
    fn is_plain_key(key: &str) -> bool {
        !key.is_empty()
            && !key.bytes().all(|b| b.is_ascii_digit())
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// An ordered sequence of [`Segment`]s addressing a location in a nested
/// structure. The empty path addresses the root.
///
/// Paths render as `metadata.name` or `spec.template.spec.containers[0].image`.
/// Keys which are not plain identifiers are quoted, for example
/// `metadata.labels["app.kubernetes.io/name"]`. The same syntax is accepted by
/// [`FromStr`]:
///
/// ```
/// use resource_form::{path, path::Path};
///
/// let parsed: Path = "spec.containers[0].name".parse().unwrap();
/// assert_eq!(parsed, path!("spec", "containers", 0, "name"));
/// assert_eq!(parsed.to_string(), "spec.containers[0].name");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Segment>);

impl Path {
    /// Returns the empty path, which addresses the root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.0.pop()
    }

    /// Returns a new path with `segment` appended.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// Returns the path without its last segment, [`None`] for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.0.iter()
    }
}

impl AsRef<[Segment]> for Path {
    fn as_ref(&self) -> &[Segment] {
        &self.0
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl From<&[Segment]> for Path {
    fn from(segments: &[Segment]) -> Self {
        Self(segments.to_vec())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Path {
    type IntoIter = std::slice::Iter<'a, Segment>;
    type Item = &'a Segment;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if Segment::is_plain_key(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                Segment::Key(key) => {
                    let escaped = key.replace('\\', "\\\\").replace('"', "\\\"");
                    write!(f, "[\"{escaped}\"]")?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ParsePathError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut path = Self::root();
        if input.is_empty() || input == "." {
            return Ok(path);
        }

        let mut chars = input.char_indices().peekable();
        // True at the start of the input and directly after a '.'
        let mut expect_segment = true;
        let mut after_dot = false;

        while let Some(&(position, c)) = chars.peek() {
            match c {
                '.' => {
                    ensure!(!expect_segment, EmptySegmentSnafu { input, position });
                    chars.next();
                    expect_segment = true;
                    after_dot = true;
                }
                '[' => {
                    chars.next();
                    path.push(parse_bracket(input, position, &mut chars)?);
                    expect_segment = false;
                    after_dot = false;
                }
                _ => {
                    ensure!(expect_segment, MissingSeparatorSnafu { input, position });
                    let mut raw = String::new();
                    while let Some(&(_, c)) = chars.peek() {
                        if c == '.' || c == '[' {
                            break;
                        }
                        raw.push(c);
                        chars.next();
                    }
                    path.push(match raw.parse::<usize>() {
                        Ok(index) => Segment::Index(index),
                        Err(_) => Segment::Key(raw),
                    });
                    expect_segment = false;
                    after_dot = false;
                }
            }
        }

        ensure!(
            !after_dot,
            EmptySegmentSnafu {
                input,
                position: input.len()
            }
        );

        Ok(path)
    }
}

fn parse_bracket(
    input: &str,
    start: usize,
    chars: &mut Peekable<CharIndices<'_>>,
) -> Result<Segment, ParsePathError> {
    let mut raw = String::new();

    if chars.peek().is_some_and(|&(_, c)| c == '"') {
        chars.next();
        loop {
            let (_, c) = chars.next().context(UnterminatedBracketSnafu {
                input,
                position: start,
            })?;
            match c {
                '\\' => {
                    let (_, escaped) = chars.next().context(UnterminatedBracketSnafu {
                        input,
                        position: start,
                    })?;
                    raw.push(escaped);
                }
                '"' => break,
                c => raw.push(c),
            }
        }
        let (_, closing) = chars.next().context(UnterminatedBracketSnafu {
            input,
            position: start,
        })?;
        ensure!(
            closing == ']',
            InvalidBracketSegmentSnafu {
                input,
                segment: raw
            }
        );
        return Ok(Segment::Key(raw));
    }

    loop {
        let (_, c) = chars.next().context(UnterminatedBracketSnafu {
            input,
            position: start,
        })?;
        if c == ']' {
            break;
        }
        raw.push(c);
    }

    raw.trim()
        .parse::<usize>()
        .ok()
        .map(Segment::Index)
        .context(InvalidBracketSegmentSnafu {
            input,
            segment: raw,
        })
}

/// Builds a [`Path`] from string (key) and integer (index) segments.
///
/// ```
/// use resource_form::path;
///
/// let path = path!("spec", "containers", 0, "image");
/// assert_eq!(path.to_string(), "spec.containers[0].image");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::path::Path::root()
    };
    ($($segment:expr),+ $(,)?) => {{
        let mut path = $crate::path::Path::root();
        $(
            path.push($crate::path::Segment::from($segment));
        )+
        path
    }};
}

/// Returns the value at `path`, or [`None`] if any segment along the path is
/// missing.
pub fn get<'a>(value: &'a Value, path: &Path) -> Option<&'a Value> {
    get_segments(value, path.segments())
}

/// Mutable variant of [`get`].
pub fn get_mut<'a>(value: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    get_segments_mut(value, path.segments())
}

/// Returns whether every segment of `path` exists in `value`.
pub fn has(value: &Value, path: &Path) -> bool {
    get(value, path).is_some()
}

/// Deep-writes `new_value` at `path`.
///
/// Missing intermediates are created: an object if the following segment is a
/// key, an array if it is an index. Intermediates of the wrong kind (including
/// scalars) are replaced. Writing past the end of an array pads it with
/// `null`. An empty path replaces `value` entirely.
pub fn set(value: &mut Value, path: &Path, new_value: Value) {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        *value = new_value;
        return;
    };

    let mut current = value;
    for (segment, next) in parents.iter().zip(&segments[1..]) {
        current = child_or_insert(current, segment, next);
    }

    *slot_or_insert(current, last) = new_value;
}

/// Removes the value at `path` and returns it.
///
/// Object keys are removed. Array slots are replaced by `null`, so the indices
/// of siblings stay untouched. Missing paths are a no-op.
pub fn unset(value: &mut Value, path: &Path) -> Option<Value> {
    let (last, parents) = path.segments().split_last()?;
    let parent = get_segments_mut(value, parents)?;

    match (last, parent) {
        (Segment::Key(key), Value::Object(map)) => map.remove(key),
        (Segment::Index(index), Value::Array(items)) => {
            items.get_mut(*index).map(|slot| slot.take())
        }
        _ => None,
    }
}

fn get_segments<'a>(value: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key),
            (Segment::Index(index), Value::Array(items)) => items.get(*index),
            _ => None,
        })
}

fn get_segments_mut<'a>(value: &'a mut Value, segments: &[Segment]) -> Option<&'a mut Value> {
    segments
        .iter()
        .try_fold(value, |current, segment| match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key),
            (Segment::Index(index), Value::Array(items)) => items.get_mut(*index),
            _ => None,
        })
}

/// Returns the slot for `segment` in `current`, converting `current` into the
/// required container kind first.
fn slot_or_insert<'a>(current: &'a mut Value, segment: &Segment) -> &'a mut Value {
    match segment {
        Segment::Key(key) => ensure_object(current)
            .entry(key.clone())
            .or_insert(Value::Null),
        Segment::Index(index) => {
            let items = ensure_array(current);
            if items.len() <= *index {
                items.resize(index + 1, Value::Null);
            }
            &mut items[*index]
        }
    }
}

fn child_or_insert<'a>(current: &'a mut Value, segment: &Segment, next: &Segment) -> &'a mut Value {
    let slot = slot_or_insert(current, segment);
    let fits = match next {
        Segment::Key(_) => slot.is_object(),
        Segment::Index(_) => slot.is_array(),
    };
    if !fits {
        *slot = match next {
            Segment::Key(_) => Value::Object(Map::new()),
            Segment::Index(_) => Value::Array(Vec::new()),
        };
    }
    slot
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    let Value::Object(map) = value else {
        unreachable!("value was just replaced by an object")
    };
    map
}

fn ensure_array(value: &mut Value) -> &mut Vec<Value> {
    if !value.is_array() {
        *value = Value::Array(Vec::new());
    }
    let Value::Array(items) = value else {
        unreachable!("value was just replaced by an array")
    };
    items
}
