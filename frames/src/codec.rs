//! Protobuf codec for [`Frame`].
//!
//! The envelope is a fixed protobuf message; the JSON payload rides in a
//! `google.protobuf.Value`. That type has one number kind (`double`), so every
//! integer in `data` comes back as a float. Typed decoders in this crate go
//! through `lenient` to cope.
//!
//! Status tags on the wire: request = 0, done = 1, error = 2. Any other tag is
//! rejected.

use prost::Message;
use prost_types::value::Kind;
use serde_json::{Map, Number, Value};

use crate::{Frame, Status};

/// Failure decoding a binary websocket message.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode protobuf frame: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("invalid frame status: {0}")]
    InvalidStatus(i32),
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    id: String,
    #[prost(string, optional, tag = "2")]
    parent_id: Option<String>,
    #[prost(int64, tag = "3")]
    ts: i64,
    #[prost(string, optional, tag = "5")]
    from: Option<String>,
    #[prost(string, tag = "6")]
    syscall: String,
    #[prost(int32, tag = "7")]
    status: i32,
    #[prost(message, optional, tag = "8")]
    data: Option<prost_types::Value>,
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        match status {
            Status::Request => 0,
            Status::Done => 1,
            Status::Error => 2,
        }
    }
}

impl TryFrom<i32> for Status {
    type Error = CodecError;

    fn try_from(tag: i32) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(Self::Request),
            1 => Ok(Self::Done),
            2 => Ok(Self::Error),
            other => Err(CodecError::InvalidStatus(other)),
        }
    }
}

/// Encode a frame for a binary websocket message.
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    WireFrame {
        id: frame.id.clone(),
        parent_id: frame.parent_id.clone(),
        ts: frame.ts,
        from: frame.from.clone(),
        syscall: frame.syscall.clone(),
        status: frame.status.into(),
        data: Some(to_proto(&frame.data)),
    }
    .encode_to_vec()
}

/// Decode a binary websocket message. A missing payload decodes as `{}`.
///
/// # Errors
///
/// [`CodecError::Decode`] for bytes that are not a frame,
/// [`CodecError::InvalidStatus`] for an unknown status tag.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    Ok(Frame {
        status: Status::try_from(wire.status)?,
        data: wire.data.as_ref().map_or_else(|| Value::Object(Map::new()), from_proto),
        id: wire.id,
        parent_id: wire.parent_id,
        ts: wire.ts,
        from: wire.from,
        syscall: wire.syscall,
    })
}

fn to_proto(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => Kind::NullValue(prost_types::NullValue::NullValue.into()),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(prost_types::ListValue { values: items.iter().map(to_proto).collect() }),
        Value::Object(fields) => Kind::StructValue(prost_types::Struct {
            fields: fields.iter().map(|(key, field)| (key.clone(), to_proto(field))).collect(),
        }),
    };
    prost_types::Value { kind: Some(kind) }
}

/// Non-finite numbers have no JSON form and become null.
fn from_proto(value: &prost_types::Value) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => Value::Array(list.values.iter().map(from_proto).collect()),
        Some(Kind::StructValue(fields)) => Value::Object(
            fields.fields.iter().map(|(key, field)| (key.clone(), from_proto(field))).collect(),
        ),
    }
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;
