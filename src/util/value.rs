//! Attribute value types.

use std::fmt;

use glam::{Vec2, Vec3, Vec4};
use serde_json::Value as Json;

use super::{Error, Result};

/// Declared type of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    /// Interned identifier string
    Token,
    /// Boolean
    Bool,
    /// Signed 32-bit integer
    Int,
    /// 32-bit float
    Float,
    /// 2-component float vector
    Float2,
    /// 3-component float vector
    Float3,
    /// 4-component float vector
    Float4,
    /// RGB color
    Color3f,
    /// Surface normal
    Normal3f,
    /// Free-form string
    String,
    /// Asset path
    Asset,
}

impl ValueType {
    /// All types, for lookups and help output.
    pub const ALL: [ValueType; 11] = [
        Self::Token, Self::Bool, Self::Int, Self::Float, Self::Float2, Self::Float3,
        Self::Float4, Self::Color3f, Self::Normal3f, Self::String, Self::Asset,
    ];

    /// Type name as written in scene descriptions.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Color3f => "color3f",
            Self::Normal3f => "normal3f",
            Self::String => "string",
            Self::Asset => "asset",
        }
    }

    /// Look up a type by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Number of float components for vector types.
    const fn components(self) -> Option<usize> {
        match self {
            Self::Float2 => Some(2),
            Self::Float3 | Self::Color3f | Self::Normal3f => Some(3),
            Self::Float4 => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An attribute value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Token value.
    Token(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i32),
    /// Float value.
    Float(f32),
    /// Vec2 value.
    Float2(Vec2),
    /// Vec3 value.
    Float3(Vec3),
    /// Vec4 value.
    Float4(Vec4),
    /// Color3 value (RGB).
    Color3f(Vec3),
    /// Normal value.
    Normal3f(Vec3),
    /// String value.
    String(String),
    /// Asset path value.
    Asset(String),
}

impl Value {
    /// Type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Token(_) => ValueType::Token,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Float2(_) => ValueType::Float2,
            Self::Float3(_) => ValueType::Float3,
            Self::Float4(_) => ValueType::Float4,
            Self::Color3f(_) => ValueType::Color3f,
            Self::Normal3f(_) => ValueType::Normal3f,
            Self::String(_) => ValueType::String,
            Self::Asset(_) => ValueType::Asset,
        }
    }

    /// Token shorthand.
    pub fn token(s: impl Into<String>) -> Self {
        Self::Token(s.into())
    }

    /// Get as token or string if possible.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Token(s) | Self::String(s) | Self::Asset(s) => Some(s),
            _ => None,
        }
    }

    /// Get as float if possible.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Get as vec3 if possible.
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Self::Float3(v) | Self::Color3f(v) | Self::Normal3f(v) => Some(*v),
            _ => None,
        }
    }

    /// Decode a JSON value as `ty`.
    ///
    /// Vectors are JSON arrays of numbers; tokens, strings and assets are
    /// JSON strings.
    pub fn from_json(ty: ValueType, json: &Json) -> Result<Self> {
        let mismatch = || Error::InvalidValue(format!("{} is not a valid {}", json, ty));

        if let Some(n) = ty.components() {
            let arr = json.as_array().filter(|a| a.len() == n).ok_or_else(mismatch)?;
            let mut c = [0f32; 4];
            for (dst, v) in c.iter_mut().zip(arr) {
                *dst = v.as_f64().ok_or_else(mismatch)? as f32;
            }
            return Ok(match ty {
                ValueType::Float2 => Self::Float2(Vec2::new(c[0], c[1])),
                ValueType::Float3 => Self::Float3(Vec3::new(c[0], c[1], c[2])),
                ValueType::Color3f => Self::Color3f(Vec3::new(c[0], c[1], c[2])),
                ValueType::Normal3f => Self::Normal3f(Vec3::new(c[0], c[1], c[2])),
                _ => Self::Float4(Vec4::from_array(c)),
            });
        }

        match ty {
            ValueType::Token => json.as_str().map(Self::token),
            ValueType::String => json.as_str().map(|s| Self::String(s.to_string())),
            ValueType::Asset => json.as_str().map(|s| Self::Asset(s.to_string())),
            ValueType::Bool => json.as_bool().map(Self::Bool),
            ValueType::Int => json
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Self::Int),
            ValueType::Float => json.as_f64().map(|v| Self::Float(v as f32)),
            _ => None,
        }
        .ok_or_else(mismatch)
    }

    /// Encode as JSON (inverse of [`Value::from_json`]).
    pub fn to_json(&self) -> Json {
        match self {
            Self::Token(s) | Self::String(s) | Self::Asset(s) => Json::from(s.as_str()),
            Self::Bool(v) => Json::from(*v),
            Self::Int(v) => Json::from(*v),
            Self::Float(v) => Json::from(*v as f64),
            Self::Float2(v) => Json::from(v.to_array().map(f64::from).to_vec()),
            Self::Float3(v) | Self::Color3f(v) | Self::Normal3f(v) => {
                Json::from(v.to_array().map(f64::from).to_vec())
            }
            Self::Float4(v) => Json::from(v.to_array().map(f64::from).to_vec()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(s) | Self::String(s) => write!(f, "{:?}", s),
            Self::Asset(s) => write!(f, "@{}@", s),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Float2(v) => write!(f, "({}, {})", v.x, v.y),
            Self::Float3(v) | Self::Color3f(v) | Self::Normal3f(v) => {
                write!(f, "({}, {}, {})", v.x, v.y, v.z)
            }
            Self::Float4(v) => write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_names() {
        for ty in ValueType::ALL {
            assert_eq!(ValueType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(ValueType::from_name("double"), None);
    }

    #[test]
    fn test_from_json() {
        let v = Value::from_json(ValueType::Color3f, &json!([0.8, 0.2, 0.1])).unwrap();
        assert_eq!(v.value_type(), ValueType::Color3f);
        assert!((v.as_vec3().unwrap().x - 0.8).abs() < 1e-6);

        assert_eq!(Value::from_json(ValueType::Token, &json!("id")).unwrap(), Value::token("id"));
        assert_eq!(Value::from_json(ValueType::Int, &json!(3)).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_from_json_mismatch() {
        assert!(Value::from_json(ValueType::Float3, &json!([1.0, 2.0])).is_err());
        assert!(Value::from_json(ValueType::Token, &json!(1)).is_err());
        assert!(Value::from_json(ValueType::Int, &json!(1.5)).is_err());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
        assert_eq!(Value::token("a").as_str(), Some("a"));
        assert_eq!(Value::Bool(true).as_str(), None);
        assert_eq!(Value::Float(0.5).to_json(), json!(0.5));
    }
}
