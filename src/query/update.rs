use std::fmt;
use bson::Bson;
use crate::error::{Error, Result};
use crate::util::bson_utils::is_numeric;

/// A dot-separated field path, e.g. `progress.Reading`.
///
/// A path always has at least one segment and no segment is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpdatePath {
    segments: Vec<String>,
}

impl UpdatePath {
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::InvalidRequest("Update path cannot be empty".to_string()));
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::InvalidRequest(format!(
                "Update path '{}' contains an empty field name",
                path
            )));
        }
        Ok(UpdatePath { segments })
    }

    /// The segments leading to the parent of the target field.
    pub fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The name of the target field inside its parent.
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// The dotted representation of the first `len` segments.
    pub fn prefix(&self, len: usize) -> String {
        self.segments[..len].join(".")
    }
}

impl fmt::Display for UpdatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

/// Represents an argument that can be a single value or multiple values via `$each`.
#[derive(Debug, Clone, PartialEq)]
pub enum EachOrSingle<T> {
    /// A single value to push.
    Single(T),
    /// `$each`: A list of values to push, in order.
    Each(Vec<T>),
}

/// Represents a single update operation.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// `$set`: Sets the value of a field.
    Set { path: UpdatePath, value: Bson },
    /// `$inc`: Increments a field by a specified amount.
    Inc { path: UpdatePath, amount: Bson },
    /// Increments a field and clamps the result to `cap` in the same step.
    IncCapped { path: UpdatePath, amount: Bson, cap: Bson },
    /// `$max`: Replaces the field if the given value is greater.
    Max { path: UpdatePath, value: Bson },
    /// `$push`: Appends values to an array.
    Push { path: UpdatePath, values: EachOrSingle<Bson> },
}

impl UpdateOp {
    /// Operators run in stages: `$set`, then increments, then `$max`, then `$push`.
    pub(crate) fn stage(&self) -> u8 {
        match self {
            UpdateOp::Set { .. } => 0,
            UpdateOp::Inc { .. } | UpdateOp::IncCapped { .. } => 1,
            UpdateOp::Max { .. } => 2,
            UpdateOp::Push { .. } => 3,
        }
    }

    pub fn path(&self) -> &UpdatePath {
        match self {
            UpdateOp::Set { path, .. }
            | UpdateOp::Inc { path, .. }
            | UpdateOp::IncCapped { path, .. }
            | UpdateOp::Max { path, .. }
            | UpdateOp::Push { path, .. } => path,
        }
    }
}

/// A typed update, built either by [`parse_update`](crate::query::parser::parse_update)
/// or with the builder methods below.
///
/// ```
/// use tutordb::query::update::UpdateExpr;
///
/// let update = UpdateExpr::new()
///     .inc_capped("progress.Reading", 5, 100)?
///     .push("completed_works", "Reading quiz")?;
/// assert_eq!(update.ops().len(), 2);
/// # Ok::<(), tutordb::error::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpr {
    ops: Vec<UpdateOp>,
}

impl UpdateExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn add(&mut self, op: UpdateOp) {
        self.ops.push(op);
    }

    pub fn set(mut self, path: &str, value: impl Into<Bson>) -> Result<Self> {
        self.add(UpdateOp::Set { path: UpdatePath::parse(path)?, value: value.into() });
        Ok(self)
    }

    pub fn inc(mut self, path: &str, amount: impl Into<Bson>) -> Result<Self> {
        let amount = numeric_operand("$inc", amount.into())?;
        self.add(UpdateOp::Inc { path: UpdatePath::parse(path)?, amount });
        Ok(self)
    }

    pub fn inc_capped(mut self, path: &str, amount: impl Into<Bson>, cap: impl Into<Bson>) -> Result<Self> {
        let amount = numeric_operand("$inc", amount.into())?;
        let cap = numeric_operand("cap", cap.into())?;
        self.add(UpdateOp::IncCapped { path: UpdatePath::parse(path)?, amount, cap });
        Ok(self)
    }

    pub fn max(mut self, path: &str, value: impl Into<Bson>) -> Result<Self> {
        let value = numeric_operand("$max", value.into())?;
        self.add(UpdateOp::Max { path: UpdatePath::parse(path)?, value });
        Ok(self)
    }

    pub fn push(mut self, path: &str, value: impl Into<Bson>) -> Result<Self> {
        self.add(UpdateOp::Push {
            path: UpdatePath::parse(path)?,
            values: EachOrSingle::Single(value.into()),
        });
        Ok(self)
    }

    pub fn push_each<I, V>(mut self, path: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        self.add(UpdateOp::Push {
            path: UpdatePath::parse(path)?,
            values: EachOrSingle::Each(values.into_iter().map(Into::into).collect()),
        });
        Ok(self)
    }

    /// Validates the semantic correctness of the update expression.
    pub fn validate(&self) -> Result<()> {
        if self.ops.is_empty() {
            return Err(Error::InvalidRequest("Update document cannot be empty".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn numeric_operand(op_name: &str, value: Bson) -> Result<Bson> {
    if is_numeric(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidRequest(format!(
            "Invalid {} value; must be a number but was {:?}",
            op_name, value
        )))
    }
}
