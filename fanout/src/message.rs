use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Kind of client-side DOM mutation carried by an `Operation`.
///
/// The vocabulary is open: `Custom` carries kinds understood only by an
/// application's own client script.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    SetAttributes,
    RemoveAttributes,
    ClassList,
    Dataset,
    AddClass,
    RemoveClass,
    SetValue,
    SetInnerHtml,
    Morph,
    Reload,
    // Fragment actions
    Append,
    Prepend,
    Replace,
    Before,
    After,
    Remove,
    Custom(String),
}

impl Op {
    pub fn as_str(&self) -> &str {
        match self {
            Op::SetAttributes => "setAttributes",
            Op::RemoveAttributes => "removeAttributes",
            Op::ClassList => "classlist",
            Op::Dataset => "dataset",
            Op::AddClass => "addClass",
            Op::RemoveClass => "removeClass",
            Op::SetValue => "setValue",
            Op::SetInnerHtml => "innerHTML",
            Op::Morph => "morph",
            Op::Reload => "reload",
            Op::Append => "append",
            Op::Prepend => "prepend",
            Op::Replace => "replace",
            Op::Before => "before",
            Op::After => "after",
            Op::Remove => "remove",
            Op::Custom(name) => name,
        }
    }
}

impl From<&str> for Op {
    fn from(name: &str) -> Self {
        match name {
            "setAttributes" => Op::SetAttributes,
            "removeAttributes" => Op::RemoveAttributes,
            "classlist" => Op::ClassList,
            "dataset" => Op::Dataset,
            "addClass" => Op::AddClass,
            "removeClass" => Op::RemoveClass,
            "setValue" => Op::SetValue,
            "innerHTML" => Op::SetInnerHtml,
            "morph" => Op::Morph,
            "reload" => Op::Reload,
            "append" => Op::Append,
            "prepend" => Op::Prepend,
            "replace" => Op::Replace,
            "before" => Op::Before,
            "after" => Op::After,
            "remove" => Op::Remove,
            other => Op::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Op {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Op {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name.is_empty() {
            return Err(de::Error::custom("operation kind must not be empty"));
        }
        Ok(Op::from(name.as_str()))
    }
}

/// One DOM-patch instruction as it goes over the wire:
/// `{"op": ..., "selector": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub op: Op,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub value: Value,
}

impl Operation {
    pub fn new(op: Op, selector: impl Into<String>, value: Value) -> Self {
        Self {
            op,
            selector: selector.into(),
            value,
        }
    }

    pub fn reload() -> Self {
        Self::new(Op::Reload, "", Value::Null)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub operation: Operation,
    pub scope: MessageScope,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageScope {
    /// Send to every connection subscribed to one topic
    Topic { topic: String },
    /// Send to every connection of every topic
    All,
}
