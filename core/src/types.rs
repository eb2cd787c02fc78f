//! Type hints for command parameters.
//!
//! A [`TypeHint`] describes what a parameter accepts. It doubles as the
//! declared type (which decides how the command line is parsed) and, through
//! [`Marker::Parse`], carries an optional parse override used only by
//! validation.

use std::fmt;

use crate::field::Constraints;

/// Side-channel metadata attached with [`TypeHint::Annotated`].
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// Validate with this type instead of the annotated base type.
    Parse(TypeHint),
    /// Free-form documentation; ignored by validation.
    Doc(String),
}

/// Shorthand for [`Marker::Parse`].
///
/// # Examples
///
/// ```
/// use command_model_core::{TypeHint, parse, resolve_override};
///
/// let hint = TypeHint::Int.annotated([parse(TypeHint::positive_int())]);
/// assert_eq!(resolve_override(&hint), TypeHint::positive_int());
/// ```
pub fn parse(ty: TypeHint) -> Marker {
    Marker::Parse(ty)
}

/// A parameter type.
///
/// # Examples
///
/// ```
/// use command_model_core::TypeHint;
///
/// let hint = TypeHint::optional(TypeHint::list(TypeHint::Int));
/// assert_eq!(hint.to_string(), "list[int] | None");
/// assert!(hint.base().is_sequence());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHint {
    /// Anything; passed through unchanged.
    Any,
    /// Only `null`.
    None,
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// Finite float.
    Float,
    /// String.
    Str,
    /// A string holding JSON, decoded during validation.
    Json,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// RFC 3339 date-time, or `YYYY-MM-DDTHH:MM:SS` without offset.
    DateTime,
    /// One of a fixed set of strings.
    Choice(Vec<String>),
    /// Ordered list of items.
    List(Box<TypeHint>),
    /// List with duplicates removed, first occurrence kept.
    Set(Box<TypeHint>),
    /// Any one of the members, tried in order.
    Union(Vec<TypeHint>),
    /// Base type plus value constraints.
    Constrained(Box<TypeHint>, Box<Constraints>),
    /// Base type plus markers.
    Annotated(Box<TypeHint>, Vec<Marker>),
}

impl TypeHint {
    /// `T | None`.
    pub fn optional(inner: TypeHint) -> Self {
        Self::Union(vec![inner, Self::None])
    }

    /// `list[T]`.
    pub fn list(item: TypeHint) -> Self {
        Self::List(Box::new(item))
    }

    /// `set[T]`.
    pub fn set(item: TypeHint) -> Self {
        Self::Set(Box::new(item))
    }

    /// One of the given strings.
    pub fn choice<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Choice(choices.into_iter().map(Into::into).collect())
    }

    /// `self` with `constraints` applied after coercion.
    pub fn constrained(self, constraints: Constraints) -> Self {
        Self::Constrained(Box::new(self), Box::new(constraints))
    }

    /// `Annotated[self, markers...]`.
    pub fn annotated<I>(self, markers: I) -> Self
    where
        I: IntoIterator<Item = Marker>,
    {
        Self::Annotated(Box::new(self), markers.into_iter().collect())
    }

    /// `Annotated[self, Parse(ty)]`.
    pub fn parse_as(self, ty: TypeHint) -> Self {
        self.annotated([Marker::Parse(ty)])
    }

    /// Integer `> 0`.
    pub fn positive_int() -> Self {
        Self::Int.constrained(Constraints::default().gt(0.0))
    }

    /// Integer `>= 0`.
    pub fn non_negative_int() -> Self {
        Self::Int.constrained(Constraints::default().ge(0.0))
    }

    /// Integer `< 0`.
    pub fn negative_int() -> Self {
        Self::Int.constrained(Constraints::default().lt(0.0))
    }

    /// Integer `<= 0`.
    pub fn non_positive_int() -> Self {
        Self::Int.constrained(Constraints::default().le(0.0))
    }

    /// Float `> 0`.
    pub fn positive_float() -> Self {
        Self::Float.constrained(Constraints::default().gt(0.0))
    }

    /// Strips `Annotated`, `Constrained` and optionality down to the type the
    /// command line should carry.
    ///
    /// A union reduces to its single non-`None` member; other unions are
    /// returned as they are.
    pub fn base(&self) -> &TypeHint {
        match self {
            Self::Annotated(inner, _) | Self::Constrained(inner, _) => inner.base(),
            Self::Union(members) => {
                let mut rest = members.iter().filter(|m| **m != Self::None);
                match (rest.next(), rest.next()) {
                    (Some(only), None) => only.base(),
                    _ => self,
                }
            }
            _ => self,
        }
    }

    /// Returns `true` for lists and sets.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::List(_) | Self::Set(_))
    }

    /// Item type of a list or set.
    pub fn item(&self) -> Option<&TypeHint> {
        match self {
            Self::List(item) | Self::Set(item) => Some(item),
            _ => None,
        }
    }

    /// Returns `true` if `null` is an accepted value.
    pub fn is_optional(&self) -> bool {
        match self {
            Self::None | Self::Any => true,
            Self::Union(members) => members.iter().any(Self::is_optional),
            Self::Annotated(inner, _) | Self::Constrained(inner, _) => inner.is_optional(),
            _ => false,
        }
    }

    fn short_name(&self) -> Option<&'static str> {
        let Self::Constrained(inner, c) = self else {
            return None;
        };
        let bare = Constraints {
            gt: c.gt,
            ge: c.ge,
            lt: c.lt,
            le: c.le,
            ..Constraints::default()
        };
        if bare != **c {
            return None;
        }
        let zero = Some(0.0);
        match (inner.as_ref(), c.gt, c.ge, c.lt, c.le) {
            (Self::Int, g, None, None, None) if g == zero => Some("PositiveInt"),
            (Self::Int, None, g, None, None) if g == zero => Some("NonNegativeInt"),
            (Self::Int, None, None, l, None) if l == zero => Some("NegativeInt"),
            (Self::Int, None, None, None, l) if l == zero => Some("NonPositiveInt"),
            (Self::Float, g, None, None, None) if g == zero => Some("PositiveFloat"),
            _ => None,
        }
    }
}

/// Returns the type validation should use for `hint`.
///
/// An `Annotated` hint carrying a [`Marker::Parse`] resolves to the marker's
/// type. Unions are rebuilt with each member resolved on its own, so
/// `Optional[Annotated[X, Parse(Y)]]` becomes `Optional[Y]`. Anything else is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use command_model_core::{TypeHint, resolve_override};
///
/// let declared = TypeHint::optional(TypeHint::Int.parse_as(TypeHint::positive_int()));
/// assert_eq!(
///     resolve_override(&declared),
///     TypeHint::optional(TypeHint::positive_int()),
/// );
/// assert_eq!(resolve_override(&TypeHint::Str), TypeHint::Str);
/// ```
pub fn resolve_override(hint: &TypeHint) -> TypeHint {
    let hint = match hint {
        TypeHint::Annotated(_, markers) => markers
            .iter()
            .find_map(|marker| match marker {
                Marker::Parse(ty) => Some(ty),
                Marker::Doc(_) => None,
            })
            .unwrap_or(hint),
        _ => hint,
    };
    match hint {
        TypeHint::Union(members) => TypeHint::Union(members.iter().map(resolve_override).collect()),
        other => other.clone(),
    }
}

/// Returns `true` if a descriptor declaring `resolved` may serve as the
/// default of a parameter annotated `declared`.
///
/// The types match if they are equal, if they are equal once `Annotated`
/// wrappers are stripped, or if `resolved` matches any member of a `declared`
/// union.
pub fn is_compatible(declared: &TypeHint, resolved: &TypeHint) -> bool {
    if declared == resolved {
        return true;
    }
    match (declared, resolved) {
        (TypeHint::Annotated(inner, _), _) => is_compatible(inner, resolved),
        (_, TypeHint::Annotated(inner, _)) => is_compatible(declared, inner),
        (TypeHint::Union(members), _) => members.iter().any(|m| is_compatible(m, resolved)),
        _ => false,
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(ty) => write!(f, "Parse({ty})"),
            Self::Doc(doc) => write!(f, "Doc({doc:?})"),
        }
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.short_name() {
            return f.write_str(name);
        }
        match self {
            Self::Any => f.write_str("Any"),
            Self::None => f.write_str("None"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Str => f.write_str("str"),
            Self::Json => f.write_str("Json"),
            Self::Date => f.write_str("date"),
            Self::DateTime => f.write_str("datetime"),
            Self::Choice(choices) => {
                let quoted: Vec<String> = choices.iter().map(|c| format!("'{c}'")).collect();
                write!(f, "Literal[{}]", quoted.join(", "))
            }
            Self::List(item) => write!(f, "list[{item}]"),
            Self::Set(item) => write!(f, "set[{item}]"),
            Self::Union(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" | "))
            }
            Self::Constrained(inner, _) => write!(f, "constrained-{inner}"),
            Self::Annotated(inner, markers) => {
                write!(f, "Annotated[{inner}")?;
                for marker in markers {
                    write!(f, ", {marker}")?;
                }
                f.write_str("]")
            }
        }
    }
}
