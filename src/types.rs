//! C-family static types and target layout queries.
//!
//! Types are plain data so translation units can be loaded from JSON. Size
//! and alignment questions go through [`TargetInfo`], which owns the data
//! model (LP64 or ILP32) and the record layout algorithm.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Builtin integer kinds, including the three character types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntKind {
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
}

impl IntKind {
    pub fn spelling(&self) -> &'static str {
        match self {
            IntKind::Char => "char",
            IntKind::SChar => "signed char",
            IntKind::UChar => "unsigned char",
            IntKind::Short => "short",
            IntKind::UShort => "unsigned short",
            IntKind::Int => "int",
            IntKind::UInt => "unsigned int",
            IntKind::Long => "long",
            IntKind::ULong => "unsigned long",
            IntKind::LongLong => "long long",
            IntKind::ULongLong => "unsigned long long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FloatKind {
    Float,
    Double,
    LongDouble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    #[default]
    Struct,
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

/// A struct or union. `fields: None` is a forward declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordType {
    pub name: String,
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub fields: Option<Vec<Field>>,
}

impl RecordType {
    pub fn field_index(&self, member: &str) -> Option<usize> {
        self.fields
            .as_ref()?
            .iter()
            .position(|f| f.name == member)
    }
}

/// Array bound as the front-end saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArraySize {
    /// `T[N]`
    Constant(u64),
    /// `T[]`
    Incomplete,
    /// `T[n]` with a runtime bound (VLA).
    Variable,
    /// `T[N]` where `N` is a template parameter.
    Dependent,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Void,
    Bool,
    Int(IntKind),
    Float(FloatKind),
    Pointer(Box<Type>),
    #[serde(rename = "objc_object_pointer")]
    ObjCObjectPointer(Box<Type>),
    Array {
        element: Box<Type>,
        size: ArraySize,
    },
    Record(RecordType),
    Enum {
        name: String,
        underlying: IntKind,
    },
    /// Unresolved template/generic parameter.
    TypeParam(String),
    Function {
        ret: Box<Type>,
        #[serde(default)]
        params: Vec<Type>,
    },
}

impl Type {
    pub fn char() -> Self {
        Type::Int(IntKind::Char)
    }

    pub fn int() -> Self {
        Type::Int(IntKind::Int)
    }

    /// `size_t` on the supported data models.
    pub fn size_t() -> Self {
        Type::Int(IntKind::ULong)
    }

    pub fn pointer_to(self) -> Self {
        Type::Pointer(Box::new(self))
    }

    pub fn array_of(self, len: u64) -> Self {
        Type::Array {
            element: Box::new(self),
            size: ArraySize::Constant(len),
        }
    }

    pub fn vla_of(self) -> Self {
        Type::Array {
            element: Box::new(self),
            size: ArraySize::Variable,
        }
    }

    pub fn structure<'a>(name: &str, fields: impl IntoIterator<Item = (&'a str, Type)>) -> Self {
        Type::Record(RecordType {
            name: name.to_string(),
            kind: RecordKind::Struct,
            fields: Some(
                fields
                    .into_iter()
                    .map(|(name, ty)| Field {
                        name: name.to_string(),
                        ty,
                    })
                    .collect(),
            ),
        })
    }

    pub fn union<'a>(name: &str, fields: impl IntoIterator<Item = (&'a str, Type)>) -> Self {
        match Type::structure(name, fields) {
            Type::Record(mut rec) => {
                rec.kind = RecordKind::Union;
                Type::Record(rec)
            }
            other => other,
        }
    }

    /// Forward-declared `struct name;` with no body.
    pub fn opaque(name: &str) -> Self {
        Type::Record(RecordType {
            name: name.to_string(),
            kind: RecordKind::Struct,
            fields: None,
        })
    }

    pub fn type_param(name: &str) -> Self {
        Type::TypeParam(name.to_string())
    }

    /// Integer in the C sense: bool, character and integer kinds, enums.
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Bool | Type::Int(_) | Type::Enum { .. })
    }

    /// Plain data pointer (`T *`).
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    /// Data pointer or Objective-C object pointer.
    pub fn is_any_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_) | Type::ObjCObjectPointer(_))
    }

    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) | Type::ObjCObjectPointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// Incomplete types cannot be sized: `void`, `T[]`, forward-declared records.
    pub fn is_incomplete(&self) -> bool {
        match self {
            Type::Void => true,
            Type::Array { element, size } => {
                matches!(size, ArraySize::Incomplete) || element.is_incomplete()
            }
            Type::Record(rec) => rec.fields.is_none(),
            _ => false,
        }
    }

    /// Whether the type mentions an unresolved template parameter.
    pub fn is_dependent(&self) -> bool {
        match self {
            Type::TypeParam(_) => true,
            Type::Pointer(inner) | Type::ObjCObjectPointer(inner) => inner.is_dependent(),
            Type::Array { element, size } => {
                matches!(size, ArraySize::Dependent) || element.is_dependent()
            }
            Type::Record(rec) => rec
                .fields
                .iter()
                .flatten()
                .any(|field| field.ty.is_dependent()),
            Type::Function { ret, params } => {
                ret.is_dependent() || params.iter().any(Type::is_dependent)
            }
            _ => false,
        }
    }

    pub fn is_dependent_sized_array(&self) -> bool {
        matches!(
            self,
            Type::Array {
                size: ArraySize::Dependent,
                ..
            }
        )
    }

    /// Whether any array bound in the type is a runtime value.
    pub fn is_variably_modified(&self) -> bool {
        match self {
            Type::Array { element, size } => {
                matches!(size, ArraySize::Variable) || element.is_variably_modified()
            }
            _ => false,
        }
    }

    /// Size is a compile-time constant. Only meaningful for complete,
    /// non-dependent types.
    pub fn is_constant_size(&self) -> bool {
        !self.is_variably_modified() && !matches!(self, Type::Function { .. })
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Bool => f.write_str("_Bool"),
            Type::Int(kind) => f.write_str(kind.spelling()),
            Type::Float(FloatKind::Float) => f.write_str("float"),
            Type::Float(FloatKind::Double) => f.write_str("double"),
            Type::Float(FloatKind::LongDouble) => f.write_str("long double"),
            Type::Pointer(inner) | Type::ObjCObjectPointer(inner) => write!(f, "{inner} *"),
            Type::Array { element, size } => match size {
                ArraySize::Constant(n) => write!(f, "{element}[{n}]"),
                ArraySize::Incomplete => write!(f, "{element}[]"),
                ArraySize::Variable => write!(f, "{element}[*]"),
                ArraySize::Dependent => write!(f, "{element}[N]"),
            },
            Type::Record(rec) => match rec.kind {
                RecordKind::Struct => write!(f, "struct {}", rec.name),
                RecordKind::Union => write!(f, "union {}", rec.name),
            },
            Type::Enum { name, .. } => write!(f, "enum {name}"),
            Type::TypeParam(name) => f.write_str(name),
            Type::Function { ret, params } => {
                let params: Vec<String> = params.iter().map(ToString::to_string).collect();
                write!(f, "{ret} ({})", params.join(", "))
            }
        }
    }
}

/// Nullable static type, as attached to expressions.
///
/// Front-ends may omit a type; every query on a null type answers `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualType(pub Option<Type>);

impl QualType {
    pub fn null() -> Self {
        Self(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<&Type> {
        self.0.as_ref()
    }

    pub fn is_pointer(&self) -> bool {
        self.get().is_some_and(Type::is_pointer)
    }

    pub fn is_any_pointer(&self) -> bool {
        self.get().is_some_and(Type::is_any_pointer)
    }

    pub fn is_integer(&self) -> bool {
        self.get().is_some_and(Type::is_integer)
    }

    pub fn pointee(&self) -> Option<&Type> {
        self.get().and_then(Type::pointee)
    }
}

impl From<Type> for QualType {
    fn from(ty: Type) -> Self {
        Self(Some(ty))
    }
}

/// Integer/pointer widths of the analyzed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataModel {
    /// 64-bit `long` and pointers.
    #[default]
    Lp64,
    /// 32-bit `int`, `long` and pointers.
    Ilp32,
}

/// Computed layout of a struct or union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    pub size: u64,
    pub align: u64,
    /// Byte offset of each field, in declaration order.
    pub field_offsets: Vec<u64>,
}

/// Answers size, alignment and offset queries for a data model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetInfo {
    pub data_model: DataModel,
}

impl TargetInfo {
    pub fn new(data_model: DataModel) -> Self {
        Self { data_model }
    }

    fn pointer_width(&self) -> u64 {
        match self.data_model {
            DataModel::Lp64 => 8,
            DataModel::Ilp32 => 4,
        }
    }

    fn int_size(&self, kind: IntKind) -> u64 {
        match kind {
            IntKind::Char | IntKind::SChar | IntKind::UChar => 1,
            IntKind::Short | IntKind::UShort => 2,
            IntKind::Int | IntKind::UInt => 4,
            IntKind::Long | IntKind::ULong => self.pointer_width(),
            IntKind::LongLong | IntKind::ULongLong => 8,
        }
    }

    fn int_align(&self, kind: IntKind) -> u64 {
        self.int_size(kind).min(self.pointer_width())
    }

    fn float_size_align(&self, kind: FloatKind) -> (u64, u64) {
        match (kind, self.data_model) {
            (FloatKind::Float, _) => (4, 4),
            (FloatKind::Double, DataModel::Lp64) => (8, 8),
            (FloatKind::Double, DataModel::Ilp32) => (8, 4),
            (FloatKind::LongDouble, DataModel::Lp64) => (16, 16),
            (FloatKind::LongDouble, DataModel::Ilp32) => (12, 4),
        }
    }

    /// Size in bytes including trailing padding, or `None` when the type
    /// has no statically known size.
    pub fn size_in_chars(&self, ty: &Type) -> Option<u64> {
        if ty.is_incomplete() || ty.is_dependent() || !ty.is_constant_size() {
            return None;
        }
        self.size_unchecked(ty)
    }

    fn size_unchecked(&self, ty: &Type) -> Option<u64> {
        match ty {
            Type::Void | Type::Function { .. } | Type::TypeParam(_) => None,
            Type::Bool => Some(1),
            Type::Int(kind) => Some(self.int_size(*kind)),
            Type::Enum { underlying, .. } => Some(self.int_size(*underlying)),
            Type::Float(kind) => Some(self.float_size_align(*kind).0),
            Type::Pointer(_) | Type::ObjCObjectPointer(_) => Some(self.pointer_width()),
            Type::Array { element, size } => match size {
                ArraySize::Constant(n) => self.size_unchecked(element)?.checked_mul(*n),
                // Flexible array members occupy no storage.
                ArraySize::Incomplete => Some(0),
                ArraySize::Variable | ArraySize::Dependent => None,
            },
            Type::Record(rec) => self.record_layout(rec).map(|layout| layout.size),
        }
    }

    pub fn align_in_chars(&self, ty: &Type) -> Option<u64> {
        match ty {
            Type::Void | Type::Function { .. } | Type::TypeParam(_) => None,
            Type::Bool => Some(1),
            Type::Int(kind) => Some(self.int_align(*kind)),
            Type::Enum { underlying, .. } => Some(self.int_align(*underlying)),
            Type::Float(kind) => Some(self.float_size_align(*kind).1),
            Type::Pointer(_) | Type::ObjCObjectPointer(_) => Some(self.pointer_width()),
            Type::Array { element, .. } => self.align_in_chars(element),
            Type::Record(rec) => self.record_layout(rec).map(|layout| layout.align),
        }
    }

    /// Lay out a complete record. Only the last struct field may be a
    /// flexible array member.
    pub fn record_layout(&self, rec: &RecordType) -> Option<RecordLayout> {
        let fields = rec.fields.as_ref()?;
        let mut offset = 0u64;
        let mut size = 0u64;
        let mut align = 1u64;
        let mut field_offsets = Vec::with_capacity(fields.len());

        for (idx, field) in fields.iter().enumerate() {
            let is_flexible = matches!(
                field.ty,
                Type::Array {
                    size: ArraySize::Incomplete,
                    ..
                }
            );
            if is_flexible && (rec.kind == RecordKind::Union || idx + 1 != fields.len()) {
                return None;
            }
            if !is_flexible && (field.ty.is_incomplete() || field.ty.is_dependent()) {
                return None;
            }

            let field_align = self.align_in_chars(&field.ty)?;
            let field_size = self.size_unchecked(&field.ty)?;
            align = align.max(field_align);

            match rec.kind {
                RecordKind::Struct => {
                    offset = round_up(offset, field_align)?;
                    field_offsets.push(offset);
                    offset = offset.checked_add(field_size)?;
                    size = offset;
                }
                RecordKind::Union => {
                    field_offsets.push(0);
                    size = size.max(field_size);
                }
            }
        }

        Some(RecordLayout {
            size: round_up(size, align)?,
            align,
            field_offsets,
        })
    }

    /// `offsetof(record, member)` for a complete record type.
    pub fn offset_of(&self, record: &Type, member: &str) -> Option<u64> {
        let Type::Record(rec) = record else {
            return None;
        };
        let idx = rec.field_index(member)?;
        self.record_layout(rec)?.field_offsets.get(idx).copied()
    }
}

/// `None` when padding `value` up to `align` leaves the `u64` range.
fn round_up(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        return Some(value);
    }
    value.checked_next_multiple_of(align)
}
