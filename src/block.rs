use serde::Deserialize;

pub const PROCEDURES_CALL: &str = "procedures_call";

/// A value that can live in a procedure parameter or execution context.
///
/// `Null` is a present value; an absent one is `None` at the lookup site.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Bool(bool),
  Number(f64),
  String(String),
  List(Vec<Value>),
  /// Id of some runtime entity, e.g. a target or a broadcast.
  #[serde(skip_deserializing)]
  Reference(String),
}

impl From<f64> for Value {
  fn from(number: f64) -> Self {
    Value::Number(number)
  }
}

impl From<bool> for Value {
  fn from(boolean: bool) -> Self {
    Value::Bool(boolean)
  }
}

impl From<&str> for Value {
  fn from(string: &str) -> Self {
    Value::String(string.to_string())
  }
}

impl From<String> for Value {
  fn from(string: String) -> Self {
    Value::String(string)
  }
}

/// Extra data attached to procedure blocks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mutation {
  #[serde(default)]
  pub proccode: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
  pub opcode: String,
  #[serde(default)]
  pub next: Option<String>,
  #[serde(default)]
  pub top_level: bool,
  #[serde(default)]
  pub mutation: Option<Mutation>,
}

impl Block {
  pub fn new(opcode: &str) -> Self {
    Block {
      opcode: opcode.to_string(),
      next: None,
      top_level: false,
      mutation: None,
    }
  }

  /// The procedure signature, if this block calls a procedure.
  pub fn proccode(&self) -> Option<&str> {
    if self.opcode != PROCEDURES_CALL {
      return None;
    }
    self.mutation.as_ref().map(|mutation| mutation.proccode.as_str())
  }
}
