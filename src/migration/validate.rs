//! Typed record transforms and their erased form.
//!
//! A transform is any `Fn(I) -> Result<O, E>` where `I` can be decoded from a
//! stored record, `O` can be encoded back into one and `E` converts into a
//! boxed error. Those requirements are trait bounds on [`TypedTransform`], so
//! a transform with the wrong shape does not compile. What remains to check
//! at build time is whether a reverse transform really undoes a forward one,
//! which [`check_inverse`] does from the [`TransformSignature`] captured when
//! the transform was erased.

use std::any::TypeId;
use std::marker::PhantomData;

use crate::error::{BoxError, RecordError, VersioningError, VersioningResult};
use crate::key::Key;
use crate::traits::codec::{RecordDecode, RecordEncode};

/// Runtime identity of a record type, kept for inverse checks and logs.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

/// Input and output record types of a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformSignature {
    pub input: TypeInfo,
    pub output: TypeInfo,
}

impl TransformSignature {
    pub fn of<I: 'static, O: 'static>() -> Self {
        Self {
            input: TypeInfo::of::<I>(),
            output: TypeInfo::of::<O>(),
        }
    }

    /// True when `self` maps `other`'s output type back to its input type.
    pub fn is_inverse_of(&self, other: &TransformSignature) -> bool {
        self.input == other.output && self.output == other.input
    }
}

impl std::fmt::Display for TransformSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.input.name, self.output.name)
    }
}

/// Fails with [`VersioningError::NotInverse`] unless `down` takes what `up`
/// produces and produces what `up` takes.
pub fn check_inverse(up: &TransformSignature, down: &TransformSignature) -> VersioningResult<()> {
    if down.is_inverse_of(up) {
        Ok(())
    } else {
        log::debug!("transform.not_inverse up=({}) down=({})", up, down);
        Err(VersioningError::NotInverse)
    }
}

/// A transform with its record types erased, so steps over different types
/// can sit in one list.
pub trait RecordTransform: Send + Sync {
    fn signature(&self) -> TransformSignature;

    /// Decode `bytes`, run the transform and hand back the value still
    /// unencoded. Failures name `key`.
    fn apply(&self, key: &Key, bytes: &[u8]) -> Result<Box<dyn RecordEncode + Send>, RecordError>;
}

/// A typed transform function, erased through [`RecordTransform`].
pub struct TypedTransform<F, I, O, E> {
    func: F,
    _types: PhantomData<fn(I) -> Result<O, E>>,
}

impl<F, I, O, E> TypedTransform<F, I, O, E>
where
    F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    I: RecordDecode + 'static,
    O: RecordEncode + Send + 'static,
    E: Into<BoxError> + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _types: PhantomData,
        }
    }
}

impl<F, I, O, E> RecordTransform for TypedTransform<F, I, O, E>
where
    F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    I: RecordDecode + 'static,
    O: RecordEncode + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn signature(&self) -> TransformSignature {
        TransformSignature::of::<I, O>()
    }

    fn apply(&self, key: &Key, bytes: &[u8]) -> Result<Box<dyn RecordEncode + Send>, RecordError> {
        let input = I::decode_record(bytes).map_err(|source| RecordError::Decode {
            key: key.clone(),
            source,
        })?;
        let output = (self.func)(input).map_err(|e| RecordError::Transform {
            key: key.clone(),
            source: e.into(),
        })?;
        Ok(Box::new(output))
    }
}
