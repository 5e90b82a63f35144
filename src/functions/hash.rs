// Hash and encoding builtins

use std::hash::Hasher;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use siphasher::sip::SipHasher24;

use crate::context::ContextReader;
use crate::evaluator::EvalError;
use crate::functions::arg;
use crate::registry::{FunctionCategory::Hash, FunctionDef};
use crate::signature::Signature;
use crate::utils::first_text;
use crate::value::Value;

pub(crate) static FUNCTIONS: &[FunctionDef] = &[
    FunctionDef::new("hash.md5", Hash, Signature::exact(1), md5_hex),
    FunctionDef::new("hash.sha1", Hash, Signature::exact(1), sha1_hex),
    FunctionDef::new("hash.sha256", Hash, Signature::exact(1), sha256_hex),
    FunctionDef::new("hash.sip", Hash, Signature::exact(1), sip),
    FunctionDef::new("encoding.b64encode", Hash, Signature::exact(1), b64encode),
    FunctionDef::new("encoding.b64decode", Hash, Signature::exact(1), b64decode),
];

/// Input text; a string list contributes its first element.
fn input(args: &[Value]) -> Result<String, EvalError> {
    match arg(args, 0) {
        Value::Absent => Err(EvalError::Missing),
        Value::ByteSlice(b) => Ok(String::from_utf8_lossy(b).into_owned()),
        other => first_text(other).ok_or_else(|| other.mismatch("string")),
    }
}

fn md5_hex(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(args)?;
    Ok(Value::String(format!("{:x}", Md5::digest(text.as_bytes()))))
}

fn sha1_hex(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(args)?;
    Ok(Value::String(format!("{:x}", Sha1::digest(text.as_bytes()))))
}

fn sha256_hex(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(args)?;
    Ok(Value::String(format!("{:x}", Sha256::digest(text.as_bytes()))))
}

/// SipHash-2-4 with keys (0, 1), reinterpreted as a signed integer.
fn sip(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(args)?;
    let mut hasher = SipHasher24::new_with_keys(0, 1);
    hasher.write(text.as_bytes());
    Ok(Value::Int(hasher.finish() as i64))
}

fn b64encode(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(args)?;
    Ok(Value::String(STANDARD.encode(text.as_bytes())))
}

fn b64decode(_: &dyn ContextReader, args: &[Value]) -> Result<Value, EvalError> {
    let text = input(args)?;
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| EvalError::InvalidInput(format!("base64: {}", e)))?;
    String::from_utf8(bytes)
        .map(Value::String)
        .map_err(|_| EvalError::InvalidInput("base64 payload is not UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::call;

    fn hello() -> Vec<Value> {
        vec![Value::string("hello")]
    }

    #[test]
    fn test_digests() {
        assert_eq!(
            call("hash.md5", hello()),
            Ok(Value::string("5d41402abc4b2a76b9719d911017c592"))
        );
        assert_eq!(
            call("hash.sha1", hello()),
            Ok(Value::string("aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"))
        );
        assert_eq!(
            call("hash.sha256", hello()),
            Ok(Value::string(
                "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
            ))
        );
        assert_eq!(call("hash.md5", vec![Value::Absent]), Err(EvalError::Missing));
    }

    #[test]
    fn test_sip() {
        assert_eq!(
            call("hash.sip", vec![Value::string("http://www.google.com?q=123")]),
            Ok(Value::Int(5673948842516703987))
        );
        assert_eq!(call("hash.sip", hello()), Ok(Value::Int(-8380129865243219425)));
    }

    #[test]
    fn test_base64() {
        assert_eq!(call("encoding.b64encode", hello()), Ok(Value::string("aGVsbG8=")));
        assert_eq!(
            call("encoding.b64decode", vec![Value::string("aGVsbG8=")]),
            Ok(Value::string("hello"))
        );
        assert!(call("encoding.b64decode", vec![Value::string("!!not base64")]).is_err());
        // 0xff 0xfe is valid base64 but not UTF-8
        assert!(call("encoding.b64decode", vec![Value::string("//4=")]).is_err());
    }

    #[test]
    fn test_base64_round_trip() {
        for text in ["", "a", "hello world", "ünïcødé"] {
            let encoded = call("encoding.b64encode", vec![Value::string(text)]).unwrap();
            assert_eq!(call("encoding.b64decode", vec![encoded]), Ok(Value::string(text)));
        }
    }

    #[test]
    fn test_list_uses_first_element() {
        assert_eq!(
            call("hash.md5", vec![Value::strings(["hello", "world"])]),
            call("hash.md5", hello())
        );
    }
}
